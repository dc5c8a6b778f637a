//! # vmacro Transform Driver
//!
//! Expands macro calls in one source file until nothing is left to expand.
//!
//! ## Pipeline
//!
//! ```text
//! parse ─▶ collect imports ─┬─ no bindings ─▶ Outcome::Untouched
//!                           └─▶ pass ─▶ collect imports ─▶ pass ─▶ ... ─▶ print
//! ```
//!
//! Each pass walks the whole program once and applies every macro call it
//! can resolve. Passes repeat while the previous one applied something. The
//! pass count is bounded by [`TransformOptions::max_passes`]; reaching it is a
//! [`MacroError::MaxPassesExceeded`].
//!
//! ## Isolation
//!
//! A transformation owns its tree, bindings, state maps and hygiene marks.
//! Nothing is shared between files except the read-only registry, so hosts
//! may transform different files on different threads.
//!
//! ## Summary Table
//! | Module     | Role                                           |
//! |------------|------------------------------------------------|
//! | `imports`  | macro imports → bindings                       |
//! | `matcher`  | callee → macro, unknown name, or ordinary call |
//! | `context`  | what a handler sees of its own call            |
//! | `helper`   | what a handler sees of the whole program       |
//! | `expand`   | the pass itself                                |

pub mod context;
mod expand;
pub mod helper;
pub mod imports;
pub mod matcher;

use serde::Serialize;
use swc_core::common::{Globals, GLOBALS};

use crate::ast::{ScopeIndex, SourceSyntax, SourceText};
use crate::errors::MacroError;
use crate::macros::MacroRegistry;

pub use crate::config::TransformOptions;
pub use context::{Location, MacroContext, StateMap};
pub use helper::{find_import, Helper, ImportSpec};
pub use imports::{collect_bindings, ImportBinding};
pub use matcher::{resolve_callee, Resolution};

use expand::Expansion;

/// What [`transform`] did with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file imports no macros; use the original text.
    Untouched,
    /// Macros were expanded. The code is returned even if it happens to be
    /// identical to the input.
    Transformed(Output),
}

impl Outcome {
    pub fn is_untouched(&self) -> bool {
        matches!(self, Outcome::Untouched)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Outcome::Untouched => None,
            Outcome::Transformed(output) => Some(&output.code),
        }
    }

    pub fn into_output(self) -> Option<Output> {
        match self {
            Outcome::Untouched => None,
            Outcome::Transformed(output) => Some(output),
        }
    }
}

/// A transformed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    pub code: String,
    /// Passes that applied at least one macro.
    pub passes: usize,
    /// Every macro application, in order.
    pub trace: Vec<ExpansionStep>,
}

/// One macro application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionStep {
    pub pass: usize,
    pub macro_name: String,
    pub module: String,
    /// `None` for calls synthesized by an earlier expansion.
    pub location: Option<Location>,
}

/// Expands every macro call in `source`.
///
/// # Errors
/// The first failure aborts the file; no partial output is returned.
pub fn transform(
    registry: &MacroRegistry,
    source: &str,
    file_path: &str,
    options: &TransformOptions,
) -> Result<Outcome, MacroError> {
    let max_passes = options.effective_max_passes();
    let text = SourceText::new(file_path, source, SourceSyntax::from_path(file_path));
    GLOBALS.set(&Globals::new(), || run(registry, &text, options, max_passes))
}

fn run(
    registry: &MacroRegistry,
    text: &SourceText,
    options: &TransformOptions,
    max_passes: usize,
) -> Result<Outcome, MacroError> {
    let mut shell = text.parse_module()?;
    let bindings = collect_bindings(&mut shell.body, registry, options.keep_imports);
    if bindings.is_empty() {
        tracing::trace!(file = %text.path, "no macro imports");
        return Ok(Outcome::Untouched);
    }

    let items = std::mem::take(&mut shell.body);
    let scope = ScopeIndex::new(text.syntax.is_typescript());
    let mut expansion = Expansion::new(registry, text, options, scope, bindings, items);
    expansion.refresh_scope(&mut shell);

    let mut pass = 0;
    let mut applied_passes = 0;
    loop {
        if pass >= max_passes {
            return Err(MacroError::MaxPassesExceeded {
                file: text.path.clone(),
                max_passes,
            });
        }
        pass += 1;
        let applied = expansion.run_pass(pass)?;
        let found = expansion.collect_new_bindings();
        if found > 0 {
            tracing::debug!(file = %text.path, pass, found, "new macro imports");
        }
        expansion.refresh_scope(&mut shell);
        if applied == 0 {
            break;
        }
        applied_passes += 1;
    }

    let (items, trace) = expansion.finish();
    shell.body = items;
    let code = text.print_module(&shell)?;
    tracing::debug!(file = %text.path, passes = applied_passes, expansions = trace.len(), "transformed");
    Ok(Outcome::Transformed(Output {
        code,
        passes: applied_passes,
        trace,
    }))
}
