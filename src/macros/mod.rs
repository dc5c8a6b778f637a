//! # vmacro Macro Definitions
//!
//! This module owns everything about *what* a macro is, as opposed to how calls
//! are found and expanded (see [`crate::transform`]).
//!
//! ## Core Principles
//!
//! - **Immutable definitions**: a [`Macro`] never changes after [`define_macro`]
//!   builds it. Clones share the same definition.
//! - **Explicit capabilities**: the [`Handler`] variant fixes what a handler
//!   receives (context, toolkit, helper) at build time.
//! - **Versioned**: macros and providers carry a compatibility stamp checked at
//!   registration ([`compat`]).
//! - **Registered once**: the [`MacroRegistry`] is filled before any file is
//!   transformed and only read afterwards.

pub mod compat;
pub mod declarations;
pub mod definition;
pub mod registry;
pub mod task;

pub use compat::{ensure_compatible, Stamped, COMPAT_VERSION};
pub use declarations::{render_declarations, render_module_declaration};
pub use definition::{define_macro, is_valid_identifier, Handler, HandlerTier, Macro, MacroBuilder};
pub use registry::{
    define_provider, MacroRegistry, ModuleEntry, ModuleExport, ModuleExportTable, Provider,
    MACRO_MODULE_PLACEHOLDER,
};
pub use task::{MacroTask, Request, Step};
