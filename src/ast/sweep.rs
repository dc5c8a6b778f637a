//! Cleanup of call sites removed by handlers.
//!
//! [`MacroContext::remove`](crate::transform::MacroContext::remove) cannot
//! delete the enclosing statement itself, because it only holds the call's
//! expression slot. It leaves a marker there instead and [`RemovalSweep`]
//! resolves the markers once the enclosing top-level item is done:
//!
//! | Marker position                        | Result            |
//! |----------------------------------------|-------------------|
//! | whole expression of a list statement   | statement dropped |
//! | whole expression of a lone statement   | `;`               |
//! | anywhere else                          | `void 0`          |

use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::{EmptyStmt, Expr, Invalid, ModuleItem, Stmt};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::ast::toolkit::Toolkit;

/// The expression left behind by a removed call.
pub fn removed_marker() -> Expr {
    Expr::Invalid(Invalid { span: DUMMY_SP })
}

/// The parser never produces `Invalid` for source it accepts, so the variant
/// is free to mean "removed".
pub fn is_removed(expr: &Expr) -> bool {
    matches!(expr, Expr::Invalid(_))
}

pub fn is_removed_stmt(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(expr_stmt) if is_removed(&expr_stmt.expr))
}

pub fn is_removed_item(item: &ModuleItem) -> bool {
    matches!(item, ModuleItem::Stmt(stmt) if is_removed_stmt(stmt))
}

/// Resolves removal markers in a subtree.
pub struct RemovalSweep;

impl VisitMut for RemovalSweep {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        items.retain(|item| !is_removed_item(item));
        items.visit_mut_children_with(self);
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        stmts.retain(|stmt| !is_removed_stmt(stmt));
        stmts.visit_mut_children_with(self);
    }

    fn visit_mut_stmt(&mut self, stmt: &mut Stmt) {
        if is_removed_stmt(stmt) {
            *stmt = Stmt::Empty(EmptyStmt { span: DUMMY_SP });
            return;
        }
        stmt.visit_mut_children_with(self);
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if is_removed(expr) {
            *expr = Toolkit::undefined();
            return;
        }
        expr.visit_mut_children_with(self);
    }
}
