//! Lexical binding queries over a parsed module.
//!
//! `swc`'s resolver tags every identifier with a syntax context. Identifiers
//! that reference no declaration get the *unresolved* mark; declared names get
//! a context unique to their scope. A call to `echo` is a macro candidate only
//! while `echo` is unresolved, which is exactly what makes a local
//! `const echo = ...` shadow the macro import.

use swc_core::common::{Mark, SyntaxContext};
use swc_core::ecma::ast::{Ident, Module};
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

/// The scope marks of one transformation.
///
/// Must be created inside the transformation's `GLOBALS` scope, since marks
/// are allocated from the hygiene globals.
#[derive(Debug, Clone, Copy)]
pub struct ScopeIndex {
    unresolved: Mark,
    top_level: Mark,
    typescript: bool,
}

impl ScopeIndex {
    pub fn new(typescript: bool) -> Self {
        Self {
            unresolved: Mark::new(),
            top_level: Mark::new(),
            typescript,
        }
    }

    /// Recomputes every identifier's binding after the tree was edited.
    pub fn refresh(&self, module: &mut Module) {
        module.visit_mut_with(&mut ContextReset);
        module.visit_mut_with(&mut resolver(self.unresolved, self.top_level, self.typescript));
    }

    /// True if `ident` refers to no lexical binding.
    ///
    /// Identifiers inserted since the last refresh carry the empty context and
    /// count as unbound until the next refresh says otherwise.
    pub fn is_unbound(&self, ident: &Ident) -> bool {
        ident.ctxt == SyntaxContext::empty() || ident.ctxt.outer() == self.unresolved
    }
}

/// Clears resolver output so the next resolver run starts from scratch.
struct ContextReset;

impl VisitMut for ContextReset {
    fn visit_mut_ident(&mut self, ident: &mut Ident) {
        ident.ctxt = SyntaxContext::empty();
    }
}
