//! The mutation helper surface for tier-3 handlers.
//!
//! Handlers reach the whole program through a [`Helper`]. Paths are indices
//! into the program body, valid at the moment they are returned; any later
//! insertion before them shifts them.
//!
//! While a macro runs, the top-level item that contains its call is detached
//! from the body and its slot holds an empty statement. [`Helper::is_pending`]
//! reports those slots; they read as `;` and cannot be modified.

use serde::{Deserialize, Serialize};
use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::{
    EmptyStmt, Expr, ImportDecl, ImportDefaultSpecifier, ImportNamedSpecifier, ImportPhase,
    ImportSpecifier, ImportStarAsSpecifier, ModuleDecl, ModuleExportName, ModuleItem, Stmt, Str,
};

use crate::ast::{ScopeIndex, Toolkit};
use crate::transform::imports::ImportBinding;
use crate::transform::matcher::MacroCallFinder;

// ============================================================================
// IMPORT SPECIFICATIONS
// ============================================================================

/// A structured import, keyed by module name. Deserializes from the five
/// object shapes hosts send, most specific first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportSpec {
    /// `import * as namespaceName from 'moduleName'`
    #[serde(rename_all = "camelCase")]
    Namespace {
        module_name: String,
        namespace_name: String,
    },
    /// `import { exportName as localName } from 'moduleName'`
    #[serde(rename_all = "camelCase")]
    Aliased {
        module_name: String,
        export_name: String,
        local_name: String,
    },
    /// `import { exportName } from 'moduleName'`
    #[serde(rename_all = "camelCase")]
    Named {
        module_name: String,
        export_name: String,
    },
    /// `import defaultName from 'moduleName'`
    #[serde(rename_all = "camelCase")]
    Default {
        module_name: String,
        default_name: String,
    },
    /// `import 'moduleName'`
    #[serde(rename_all = "camelCase")]
    Bare { module_name: String },
}

impl ImportSpec {
    pub fn bare(module: impl Into<String>) -> Self {
        ImportSpec::Bare {
            module_name: module.into(),
        }
    }

    pub fn default_import(module: impl Into<String>, name: impl Into<String>) -> Self {
        ImportSpec::Default {
            module_name: module.into(),
            default_name: name.into(),
        }
    }

    pub fn named(module: impl Into<String>, export: impl Into<String>) -> Self {
        ImportSpec::Named {
            module_name: module.into(),
            export_name: export.into(),
        }
    }

    pub fn aliased(module: impl Into<String>, export: impl Into<String>, local: impl Into<String>) -> Self {
        ImportSpec::Aliased {
            module_name: module.into(),
            export_name: export.into(),
            local_name: local.into(),
        }
    }

    pub fn namespace(module: impl Into<String>, name: impl Into<String>) -> Self {
        ImportSpec::Namespace {
            module_name: module.into(),
            namespace_name: name.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        match self {
            ImportSpec::Namespace { module_name, .. }
            | ImportSpec::Aliased { module_name, .. }
            | ImportSpec::Named { module_name, .. }
            | ImportSpec::Default { module_name, .. }
            | ImportSpec::Bare { module_name } => module_name,
        }
    }

    /// True if `decl` already provides this import. `loose` ignores local
    /// names, so it answers "is the export imported at all".
    pub fn is_satisfied_by(&self, decl: &ImportDecl, loose: bool) -> bool {
        if decl.type_only || &*decl.src.value != self.module_name() {
            return false;
        }
        let mut specifiers = decl.specifiers.iter();
        match self {
            ImportSpec::Bare { .. } => loose || decl.specifiers.is_empty(),
            ImportSpec::Default { default_name, .. } => specifiers.any(|spec| {
                matches!(spec, ImportSpecifier::Default(d) if loose || &*d.local.sym == default_name.as_str())
            }),
            ImportSpec::Namespace { namespace_name, .. } => specifiers.any(|spec| {
                matches!(spec, ImportSpecifier::Namespace(n) if loose || &*n.local.sym == namespace_name.as_str())
            }),
            ImportSpec::Named { export_name, .. } => specifiers.any(|spec| {
                named_parts(spec).is_some_and(|(export, local)| {
                    export == export_name.as_str() && (loose || local == export_name.as_str())
                })
            }),
            ImportSpec::Aliased {
                export_name,
                local_name,
                ..
            } => specifiers.any(|spec| {
                named_parts(spec).is_some_and(|(export, local)| {
                    export == export_name.as_str() && (loose || local == local_name.as_str())
                })
            }),
        }
    }

    /// Builds the import declaration.
    pub fn to_item(&self) -> ModuleItem {
        let specifiers = match self {
            ImportSpec::Bare { .. } => Vec::new(),
            ImportSpec::Default { default_name, .. } => {
                vec![ImportSpecifier::Default(ImportDefaultSpecifier {
                    span: DUMMY_SP,
                    local: Toolkit::ident(default_name),
                })]
            }
            ImportSpec::Namespace { namespace_name, .. } => {
                vec![ImportSpecifier::Namespace(ImportStarAsSpecifier {
                    span: DUMMY_SP,
                    local: Toolkit::ident(namespace_name),
                })]
            }
            ImportSpec::Named { export_name, .. } => {
                vec![ImportSpecifier::Named(ImportNamedSpecifier {
                    span: DUMMY_SP,
                    local: Toolkit::ident(export_name),
                    imported: None,
                    is_type_only: false,
                })]
            }
            ImportSpec::Aliased {
                export_name,
                local_name,
                ..
            } => vec![ImportSpecifier::Named(ImportNamedSpecifier {
                span: DUMMY_SP,
                local: Toolkit::ident(local_name),
                imported: (export_name != local_name)
                    .then(|| ModuleExportName::Ident(Toolkit::ident(export_name))),
                is_type_only: false,
            })],
        };
        ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
            span: DUMMY_SP,
            specifiers,
            src: Box::new(Str {
                span: DUMMY_SP,
                value: self.module_name().into(),
                raw: None,
            }),
            type_only: false,
            with: None,
            phase: ImportPhase::Evaluation,
        }))
    }
}

/// `(export name, local name)` of a value named specifier.
fn named_parts(spec: &ImportSpecifier) -> Option<(&str, &str)> {
    let ImportSpecifier::Named(named) = spec else {
        return None;
    };
    if named.is_type_only {
        return None;
    }
    let local = &*named.local.sym;
    let export = match &named.imported {
        Some(ModuleExportName::Ident(ident)) => &*ident.sym,
        Some(ModuleExportName::Str(s)) => &*s.value,
        None => local,
    };
    Some((export, local))
}

/// Finds an import satisfying `spec` in any program body.
pub fn find_import(items: &[ModuleItem], spec: &ImportSpec, loose: bool) -> Option<usize> {
    items.iter().position(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) => spec.is_satisfied_by(decl, loose),
        _ => false,
    })
}

fn is_import(item: &ModuleItem) -> bool {
    matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(_)))
}

// ============================================================================
// PROGRAM BODY
// ============================================================================

/// The program body plus the slots of items detached for expansion.
///
/// Detached items nest: expanding item `a` may expand item `b` on request, so
/// holes form a stack and are filled in reverse order.
#[derive(Debug, Default)]
pub(crate) struct Body {
    pub items: Vec<ModuleItem>,
    holes: Vec<usize>,
}

fn placeholder() -> ModuleItem {
    ModuleItem::Stmt(Stmt::Empty(EmptyStmt { span: DUMMY_SP }))
}

impl Body {
    pub fn new(items: Vec<ModuleItem>) -> Self {
        Self {
            items,
            holes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_hole(&self, index: usize) -> bool {
        self.holes.contains(&index)
    }

    /// Takes item `index` out of the body, leaving a placeholder.
    pub fn detach(&mut self, index: usize) -> ModuleItem {
        let item = std::mem::replace(&mut self.items[index], placeholder());
        self.holes.push(index);
        item
    }

    /// Puts `item` back into the most recent hole; returns its index.
    pub fn reattach(&mut self, item: ModuleItem) -> usize {
        let index = self.pop_hole();
        self.items[index] = item;
        index
    }

    /// Drops the most recent hole instead of filling it; returns the index
    /// the next item now occupies.
    pub fn discard(&mut self) -> usize {
        let index = self.pop_hole();
        self.remove(index);
        index
    }

    fn pop_hole(&mut self) -> usize {
        match self.holes.pop() {
            Some(index) => index,
            None => unreachable!("reattach without a matching detach"),
        }
    }

    pub fn insert_all(&mut self, at: usize, items: Vec<ModuleItem>) -> Vec<usize> {
        let count = items.len();
        self.items.splice(at..at, items);
        for hole in &mut self.holes {
            if *hole >= at {
                *hole += count;
            }
        }
        (at..at + count).collect()
    }

    pub fn remove(&mut self, index: usize) -> ModuleItem {
        let item = self.items.remove(index);
        for hole in &mut self.holes {
            if *hole > index {
                *hole -= 1;
            }
        }
        item
    }
}

// ============================================================================
// HELPER
// ============================================================================

/// Whole-program access for a running macro.
pub struct Helper<'a> {
    pub(crate) body: &'a mut Body,
    pub(crate) bindings: &'a [ImportBinding],
    pub(crate) scope: &'a ScopeIndex,
}

impl<'a> Helper<'a> {
    pub(crate) fn new(body: &'a mut Body, bindings: &'a [ImportBinding], scope: &'a ScopeIndex) -> Self {
        Self {
            body,
            bindings,
            scope,
        }
    }

    pub fn items(&self) -> &[ModuleItem] {
        &self.body.items
    }

    pub fn item(&self, index: usize) -> Option<&ModuleItem> {
        self.body.items.get(index)
    }

    /// `None` for pending items.
    pub fn item_mut(&mut self, index: usize) -> Option<&mut ModuleItem> {
        if self.body.is_hole(index) {
            return None;
        }
        self.body.items.get_mut(index)
    }

    /// True if `index` holds an item that is detached for expansion, such as
    /// the one containing the current call.
    pub fn is_pending(&self, index: usize) -> bool {
        self.body.is_hole(index)
    }

    pub fn find_import(&self, spec: &ImportSpec, loose: bool) -> Option<usize> {
        find_import(&self.body.items, spec, loose)
    }

    /// Ensures each spec is imported, adding missing ones before all other
    /// imports. Returns one path per spec, in input order.
    pub fn prepend_imports(&mut self, specs: &[ImportSpec]) -> Vec<usize> {
        self.ensure_imports(specs, 0)
    }

    /// Like [`prepend_imports`](Self::prepend_imports), but adds missing
    /// imports after the last existing one.
    pub fn append_imports(&mut self, specs: &[ImportSpec]) -> Vec<usize> {
        let at = self
            .body
            .items
            .iter()
            .rposition(is_import)
            .map_or(0, |last| last + 1);
        self.ensure_imports(specs, at)
    }

    fn ensure_imports(&mut self, specs: &[ImportSpec], at: usize) -> Vec<usize> {
        enum Slot {
            Existing(usize),
            New(usize),
        }
        let mut missing: Vec<&ImportSpec> = Vec::new();
        let slots: Vec<Slot> = specs
            .iter()
            .map(|spec| {
                if let Some(index) = self.find_import(spec, false) {
                    Slot::Existing(index)
                } else if let Some(offset) = missing.iter().position(|m| *m == spec) {
                    Slot::New(offset)
                } else {
                    missing.push(spec);
                    Slot::New(missing.len() - 1)
                }
            })
            .collect();

        let count = missing.len();
        self.body
            .insert_all(at, missing.into_iter().map(ImportSpec::to_item).collect());
        if count > 0 {
            tracing::trace!(count, at, "inserted imports");
        }
        slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Existing(index) if index >= at => index + count,
                Slot::Existing(index) => index,
                Slot::New(offset) => at + offset,
            })
            .collect()
    }

    /// Inserts items at the very start of the program.
    pub fn prepend_to_body(&mut self, items: Vec<ModuleItem>) -> Vec<usize> {
        self.body.insert_all(0, items)
    }

    pub fn append_to_body(&mut self, items: Vec<ModuleItem>) -> Vec<usize> {
        let at = self.body.len();
        self.body.insert_all(at, items)
    }

    /// For each path, whether that item contains a call that currently
    /// resolves to a known macro.
    ///
    /// A pending item always reports `true`, including the one holding the
    /// current call after [`MacroContext::replace_with`] or
    /// [`MacroContext::remove`]. Its contents are not visible until the
    /// running macro returns.
    ///
    /// [`MacroContext::replace_with`]: crate::transform::MacroContext::replace_with
    /// [`MacroContext::remove`]: crate::transform::MacroContext::remove
    pub fn contains_macros(&self, paths: &[usize]) -> Vec<bool> {
        paths
            .iter()
            .map(|&index| {
                if self.body.is_hole(index) {
                    return true;
                }
                self.body
                    .items
                    .get(index)
                    .is_some_and(|item| MacroCallFinder::new(self.bindings, self.scope).contains(item))
            })
            .collect()
    }

    /// Whether `expr` (typically an argument) contains a known macro call.
    pub fn expr_contains_macros(&self, expr: &Expr) -> bool {
        MacroCallFinder::new(self.bindings, self.scope).contains(expr)
    }
}
