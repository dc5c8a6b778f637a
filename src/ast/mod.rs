//! # vmacro Syntax Layer
//!
//! Everything that touches `swc` directly lives here, so the transform driver
//! reads in terms of files, scopes and removals rather than parser plumbing.
//!
//! ## Summary Table
//! | Module    | Provides                                   |
//! |-----------|--------------------------------------------|
//! | `source`  | per-file parse, print, and error locations |
//! | `toolkit` | node builders and snippet parsing          |
//! | `scope`   | "is this identifier bound?" queries        |
//! | `sweep`   | cleanup of removed call sites              |

pub mod scope;
pub mod source;
pub mod sweep;
pub mod toolkit;

pub use scope::ScopeIndex;
pub use source::{SourceSyntax, SourceText};
pub use sweep::RemovalSweep;
pub use toolkit::Toolkit;
