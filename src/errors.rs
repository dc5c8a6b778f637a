//! vmacro error handling.
//!
//! Every failure the crate reports is a [`MacroError`]. Errors are grouped by
//! the phase that raises them:
//!
//! - **Definition**: a malformed macro or provider ([`MacroError::Definition`]).
//! - **Registration**: version mismatches and duplicate names
//!   ([`MacroError::IncompatibleVersion`], [`MacroError::DuplicateRegistration`]).
//! - **Transform**: per-file failures while expanding macros. These abort the
//!   whole file; no partial output is ever returned.
//!
//! Errors tied to a call site carry a [`SourceSite`] so that `miette` can
//! render a labelled snippet of the offending file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

/// The error type handlers return. Any `Send + Sync` error converts into it via `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// SOURCE SITES - where in a file an error happened
// ============================================================================

/// A located span inside a transformed file.
#[derive(Debug, Clone)]
pub struct SourceSite {
    pub source: Arc<NamedSource<String>>,
    pub span: SourceSpan,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl fmt::Display for SourceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Unified error type for macro definition, registration and expansion.
#[derive(Debug, Error)]
pub enum MacroError {
    #[error("invalid macro definition `{name}`: {reason}")]
    Definition { name: String, reason: String },

    #[error("{subject} was built for compatibility version {found}, but the runtime expects {expected}")]
    IncompatibleVersion {
        subject: String,
        found: u32,
        expected: u32,
    },

    #[error("{}", describe_duplicate(.module, .macro_name))]
    DuplicateRegistration {
        module: String,
        macro_name: Option<String>,
    },

    #[error("`{name}` is imported from `{module}`, which exports no macro of that name ({})", at(.file, .site))]
    UnknownMacro {
        name: String,
        module: String,
        file: String,
        site: Option<SourceSite>,
    },

    #[error("macro `{macro_name}` made an invalid expansion request ({}): {reason}", at(.file, .site))]
    InvalidYield {
        macro_name: String,
        file: String,
        reason: String,
        site: Option<SourceSite>,
    },

    #[error("macro expansion in {file} did not settle within {max_passes} passes")]
    MaxPassesExceeded { file: String, max_passes: usize },

    #[error("macro `{macro_name}` failed ({})", at(.file, .site))]
    Handler {
        macro_name: String,
        file: String,
        site: Option<SourceSite>,
        #[source]
        source: HandlerError,
    },

    #[error("failed to parse {file}: {message}")]
    Parse {
        file: String,
        message: String,
        site: Option<SourceSite>,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_duplicate(module: &str, macro_name: &Option<String>) -> String {
    match macro_name {
        Some(name) => format!("macro `{name}` is registered twice in module `{module}`"),
        None => format!("module `{module}` is already registered"),
    }
}

fn at(file: &str, site: &Option<SourceSite>) -> String {
    match site {
        Some(site) => format!("{file}:{site}"),
        None => file.to_string(),
    }
}

/// Which phase of the macro lifecycle raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Definition,
    Registration,
    Transform,
    Environment,
}

impl MacroError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Definition { .. } => ErrorCategory::Definition,
            Self::IncompatibleVersion { .. } | Self::DuplicateRegistration { .. } => {
                ErrorCategory::Registration
            }
            Self::UnknownMacro { .. }
            | Self::InvalidYield { .. }
            | Self::MaxPassesExceeded { .. }
            | Self::Handler { .. }
            | Self::Parse { .. } => ErrorCategory::Transform,
            Self::Config { .. } | Self::Io { .. } => ErrorCategory::Environment,
        }
    }

    /// Error code suffix used for diagnostic codes.
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Definition { .. } => "definition",
            Self::IncompatibleVersion { .. } => "incompatible_version",
            Self::DuplicateRegistration { .. } => "duplicate_registration",
            Self::UnknownMacro { .. } => "unknown_macro",
            Self::InvalidYield { .. } => "invalid_yield",
            Self::MaxPassesExceeded { .. } => "max_passes_exceeded",
            Self::Handler { .. } => "handler",
            Self::Parse { .. } => "parse",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }

    /// The call site or parse location this error points at, if any.
    pub fn site(&self) -> Option<&SourceSite> {
        match self {
            Self::UnknownMacro { site, .. }
            | Self::InvalidYield { site, .. }
            | Self::Handler { site, .. }
            | Self::Parse { site, .. } => site.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::UnknownMacro { .. } => "not exported by the macro module",
            Self::InvalidYield { .. } => "requested from this call",
            Self::Handler { .. } => "macro call failed here",
            Self::Parse { .. } => "syntax error",
            _ => "here",
        }
    }

    fn help_text(&self) -> Option<String> {
        match self {
            Self::IncompatibleVersion { .. } => Some(
                "rebuild the macro package against the same vmacro release as the host".into(),
            ),
            Self::UnknownMacro { name, module, .. } => Some(format!(
                "check the spelling of `{name}` or register it in `{module}`"
            )),
            Self::InvalidYield { .. } => Some(
                "a macro may only request expansion of its arguments or of unrelated program items"
                    .into(),
            ),
            Self::MaxPassesExceeded { .. } => Some(
                "a macro probably re-emits a call to itself; make sure every handler replaces or removes its call site"
                    .into(),
            ),
            _ => None,
        }
    }
}

impl Diagnostic for MacroError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("vmacro::{}", self.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help_text()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.site()
            .map(|site| site.source.as_ref() as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let site = self.site()?;
        let label = LabeledSpan::new_with_span(Some(self.primary_label().to_string()), site.span);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Prints a `MacroError` with full miette diagnostics to stderr.
pub fn print_error(error: MacroError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
