//! The call context handed to every macro handler.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use swc_core::common::{Span, Spanned};
use swc_core::ecma::ast::{CallExpr, Expr, ExprOrSpread};

use crate::ast::sweep::removed_marker;

// ============================================================================
// STATE CONTAINERS
// ============================================================================

/// A handler-defined key-value store. Values may be of any `'static` type;
/// reading with the wrong type behaves like a missing key.
#[derive(Default)]
pub struct StateMap {
    entries: HashMap<String, Box<dyn Any>>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any>(&mut self, key: impl Into<String>, value: T) -> Option<Box<dyn Any>> {
        self.entries.insert(key.into(), Box::new(value))
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)?.downcast_mut()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for StateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// ============================================================================
// CALL CONTEXT
// ============================================================================

/// A 1-based line and column in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One macro invocation.
///
/// The context owns nothing: it borrows the call's expression slot and the
/// driver's state. After [`replace_with`](Self::replace_with) or
/// [`remove`](Self::remove) the call is gone and the argument accessors see
/// nothing.
pub struct MacroContext<'a> {
    pub(crate) slot: &'a mut Expr,
    pub(crate) file_path: &'a str,
    pub(crate) source: &'a str,
    pub(crate) dev: bool,
    pub(crate) ssr: bool,
    pub(crate) macro_name: &'a str,
    pub(crate) module: &'a str,
    pub(crate) span: Span,
    pub(crate) location: Option<Location>,
    pub(crate) traversal_state: &'a mut StateMap,
    pub(crate) transform_state: &'a mut StateMap,
}

impl<'a> MacroContext<'a> {
    pub fn file_path(&self) -> &str {
        self.file_path
    }

    /// The file's original text, before any expansion.
    pub fn source(&self) -> &str {
        self.source
    }

    pub fn is_dev(&self) -> bool {
        self.dev
    }

    pub fn is_ssr(&self) -> bool {
        self.ssr
    }

    pub fn macro_name(&self) -> &str {
        self.macro_name
    }

    /// The virtual module the macro was imported from.
    pub fn module(&self) -> &str {
        self.module
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Where the call is in the original source; `None` for calls that an
    /// earlier expansion synthesized.
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// The call itself, while it has not been replaced.
    pub fn call(&self) -> Option<&CallExpr> {
        self.slot.as_call()
    }

    pub fn call_mut(&mut self) -> Option<&mut CallExpr> {
        self.slot.as_mut_call()
    }

    pub fn args(&self) -> &[ExprOrSpread] {
        self.call().map(|call| call.args.as_slice()).unwrap_or_default()
    }

    /// The `index`-th argument, unless it is a spread.
    pub fn arg(&self, index: usize) -> Option<&Expr> {
        match self.args().get(index)? {
            ExprOrSpread { spread: None, expr } => Some(&**expr),
            ExprOrSpread { spread: Some(_), .. } => None,
        }
    }

    pub fn args_mut(&mut self) -> Option<&mut Vec<ExprOrSpread>> {
        self.call_mut().map(|call| &mut call.args)
    }

    /// True once the call site was replaced or removed.
    pub fn is_detached(&self) -> bool {
        self.call().is_none()
    }

    /// Replaces the whole call expression with `expr`.
    pub fn replace_with(&mut self, expr: Expr) {
        *self.slot = expr;
    }

    /// Removes the call. A call that is a whole statement takes the statement
    /// with it; anywhere else it becomes `void 0`.
    pub fn remove(&mut self) {
        *self.slot = removed_marker();
    }

    /// The current expression at the call site.
    pub fn current(&self) -> &Expr {
        &*self.slot
    }

    /// State that lives for one pass over the file.
    pub fn traversal_state(&mut self) -> &mut StateMap {
        &mut *self.traversal_state
    }

    /// State that lives for the whole transformation of the file.
    pub fn transform_state(&mut self) -> &mut StateMap {
        &mut *self.transform_state
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        slot: &'a mut Expr,
        file_path: &'a str,
        source: &'a str,
        flags: (bool, bool),
        macro_name: &'a str,
        module: &'a str,
        location: Option<Location>,
        traversal_state: &'a mut StateMap,
        transform_state: &'a mut StateMap,
    ) -> Self {
        let span = slot.span();
        Self {
            slot,
            file_path,
            source,
            dev: flags.0,
            ssr: flags.1,
            macro_name,
            module,
            span,
            location,
            traversal_state,
            transform_state,
        }
    }
}
