pub use crate::ast::{SourceSyntax, Toolkit};
pub use crate::config::{PluginConfig, TransformOptions};
pub use crate::errors::{print_error, ErrorCategory, HandlerError, HandlerResult, MacroError, SourceSite};
pub use crate::macros::{define_macro, define_provider, Macro, MacroRegistry, MacroTask, Request, Step};
pub use crate::transform::{transform, Helper, ImportSpec, MacroContext, Outcome, Output};

pub mod ast;
pub mod config;
pub mod errors;
pub mod macros;
pub mod transform;
