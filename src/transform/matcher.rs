//! Call-site matcher: decides whether a callee names a macro.
//!
//! Only two callee shapes can be macro calls:
//!
//! - `name(...)` where `name` is unbound and a named binding owns it;
//! - `ns.name(...)` / `ns['name'](...)` where `ns` is unbound and a namespace
//!   binding owns it.
//!
//! When several bindings share a local name, the most recently collected one
//! decides, even if it is of the wrong kind for the callee shape.

use swc_core::ecma::ast::{Callee, Expr, Ident, Lit, MemberProp};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::ast::ScopeIndex;
use crate::macros::Macro;
use crate::transform::imports::ImportBinding;

/// What a macro-shaped callee resolves to.
#[derive(Debug, Clone)]
pub enum Resolution {
    Macro { mac: Macro, module: String },
    /// The callee belongs to a macro import, but the module has no such macro.
    Unknown { name: String, module: String },
}

/// Resolves `callee`; `None` means an ordinary call.
pub fn resolve_callee(
    callee: &Callee,
    bindings: &[ImportBinding],
    scope: &ScopeIndex,
) -> Option<Resolution> {
    let Callee::Expr(expr) = callee else {
        return None;
    };
    match &**expr {
        Expr::Ident(ident) => match lookup(ident, bindings, scope)? {
            ImportBinding::Named {
                module,
                export,
                target,
                ..
            } => Some(match target {
                Some(mac) => Resolution::Macro {
                    mac: mac.clone(),
                    module: module.clone(),
                },
                None => Resolution::Unknown {
                    name: export.clone(),
                    module: module.clone(),
                },
            }),
            ImportBinding::Namespace { .. } => None,
        },
        Expr::Member(member) => {
            let Expr::Ident(object) = &*member.obj else {
                return None;
            };
            let ImportBinding::Namespace { module, macros, .. } = lookup(object, bindings, scope)?
            else {
                return None;
            };
            let name = property_name(&member.prop)?;
            Some(match macros.iter().find(|m| m.name() == name) {
                Some(mac) => Resolution::Macro {
                    mac: mac.clone(),
                    module: module.clone(),
                },
                None => Resolution::Unknown {
                    name,
                    module: module.clone(),
                },
            })
        }
        _ => None,
    }
}

fn lookup<'b>(
    ident: &Ident,
    bindings: &'b [ImportBinding],
    scope: &ScopeIndex,
) -> Option<&'b ImportBinding> {
    if !scope.is_unbound(ident) {
        return None;
    }
    bindings.iter().rev().find(|b| b.local() == &*ident.sym)
}

fn property_name(prop: &MemberProp) -> Option<String> {
    match prop {
        MemberProp::Ident(name) => Some(name.sym.to_string()),
        MemberProp::Computed(computed) => match &*computed.expr {
            Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
                .quasis
                .first()
                .and_then(|q| q.cooked.as_ref())
                .map(|c| c.to_string()),
            _ => None,
        },
        MemberProp::PrivateName(_) => None,
    }
}

// ============================================================================
// MACRO DETECTION
// ============================================================================

/// Finds calls that currently resolve to a known macro.
pub(crate) struct MacroCallFinder<'b> {
    bindings: &'b [ImportBinding],
    scope: &'b ScopeIndex,
    found: bool,
}

impl<'b> MacroCallFinder<'b> {
    pub fn new(bindings: &'b [ImportBinding], scope: &'b ScopeIndex) -> Self {
        Self {
            bindings,
            scope,
            found: false,
        }
    }

    pub fn contains<N: VisitWith<Self>>(mut self, node: &N) -> bool {
        node.visit_with(&mut self);
        self.found
    }
}

impl Visit for MacroCallFinder<'_> {
    fn visit_call_expr(&mut self, call: &swc_core::ecma::ast::CallExpr) {
        if self.found {
            return;
        }
        if let Some(Resolution::Macro { .. }) = resolve_callee(&call.callee, self.bindings, self.scope) {
            self.found = true;
            return;
        }
        call.visit_children_with(self);
    }
}
