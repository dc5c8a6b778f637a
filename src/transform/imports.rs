//! Import binding tracker.
//!
//! Finds top-level imports of registered macro modules, turns their specifiers
//! into [`ImportBinding`]s, and retires the import declarations: they are
//! deleted, or rewritten to a bare `import 'mod'` when imports are kept for
//! dependency tracking.
//!
//! # Summary Table
//! | Specifier                    | Binding     | Macros                             |
//! |------------------------------|-------------|------------------------------------|
//! | `import m from 'mod'`        | `Namespace` | every macro of `mod`               |
//! | `import * as m from 'mod'`   | `Namespace` | every macro of `mod`               |
//! | `import { a as b } from ...` | `Named`     | macro `a`, or none if not exported |
//! | `import type ...`            | none        | left in place                      |

use swc_core::ecma::ast::{ImportDecl, ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem};

use crate::macros::{Macro, MacroRegistry};

/// A local name that denotes one or more macros.
#[derive(Debug, Clone)]
pub enum ImportBinding {
    Namespace {
        local: String,
        module: String,
        macros: Vec<Macro>,
    },
    Named {
        local: String,
        module: String,
        export: String,
        /// `None` when the module exports no macro called `export`. Only an
        /// actual call turns that into an error.
        target: Option<Macro>,
    },
}

impl ImportBinding {
    pub fn local(&self) -> &str {
        match self {
            ImportBinding::Namespace { local, .. } | ImportBinding::Named { local, .. } => local,
        }
    }

    pub fn module(&self) -> &str {
        match self {
            ImportBinding::Namespace { module, .. } | ImportBinding::Named { module, .. } => module,
        }
    }
}

/// Collects bindings from every macro import in `items`, retiring the imports.
pub fn collect_bindings(
    items: &mut Vec<ModuleItem>,
    registry: &MacroRegistry,
    keep_imports: bool,
) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    items.retain_mut(|item| match consume_import(item, registry, keep_imports) {
        Some(consumed) => {
            bindings.extend(consumed.bindings);
            consumed.keep_item
        }
        None => true,
    });
    bindings
}

/// The result of consuming one macro import.
#[derive(Debug)]
pub(crate) struct Consumed {
    pub bindings: Vec<ImportBinding>,
    /// False when the caller must delete the item.
    pub keep_item: bool,
}

/// Consumes `item` if it imports a macro module; `None` otherwise.
pub(crate) fn consume_import(
    item: &mut ModuleItem,
    registry: &MacroRegistry,
    keep_imports: bool,
) -> Option<Consumed> {
    let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
        return None;
    };
    if decl.type_only {
        return None;
    }
    let module = decl.src.value.to_string();
    let macros = registry.macros(&module)?;

    let bindings = bindings_for(decl, &module, macros);
    // Type-only specifiers are erased later by the TypeScript toolchain; keep them.
    decl.specifiers.retain(is_type_only);
    decl.with = None;
    let keep_item = !decl.specifiers.is_empty() || keep_imports;
    tracing::trace!(module = %module, bindings = bindings.len(), keep_item, "consumed macro import");
    Some(Consumed { bindings, keep_item })
}

fn bindings_for(decl: &ImportDecl, module: &str, macros: &[Macro]) -> Vec<ImportBinding> {
    decl.specifiers
        .iter()
        .filter(|spec| !is_type_only(spec))
        .map(|spec| match spec {
            ImportSpecifier::Default(default) => ImportBinding::Namespace {
                local: default.local.sym.to_string(),
                module: module.to_string(),
                macros: macros.to_vec(),
            },
            ImportSpecifier::Namespace(namespace) => ImportBinding::Namespace {
                local: namespace.local.sym.to_string(),
                module: module.to_string(),
                macros: macros.to_vec(),
            },
            ImportSpecifier::Named(named) => {
                let export = match &named.imported {
                    Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                    Some(ModuleExportName::Str(s)) => s.value.to_string(),
                    None => named.local.sym.to_string(),
                };
                let target = macros.iter().find(|m| m.name() == export).cloned();
                ImportBinding::Named {
                    local: named.local.sym.to_string(),
                    module: module.to_string(),
                    export,
                    target,
                }
            }
        })
        .collect()
}

fn is_type_only(spec: &ImportSpecifier) -> bool {
    matches!(spec, ImportSpecifier::Named(named) if named.is_type_only)
}
