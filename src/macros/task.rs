//! Cooperative macro handlers.
//!
//! A cooperative handler is an explicit state machine. The driver calls
//! [`MacroTask::resume`] repeatedly; each call either asks the driver to expand
//! some subtrees first ([`Step::Expand`]) or finishes ([`Step::Done`]). Requests
//! are drained synchronously, one at a time and in order, before the task is
//! resumed again, so a task always observes the expanded form of whatever it
//! asked for.
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Reverse { expanded: bool }
//!
//! impl MacroTask for Reverse {
//!     fn resume(&mut self, cx: &mut MacroContext<'_>, _: &Toolkit, _: &mut Helper<'_>)
//!         -> Result<Step, HandlerError>
//!     {
//!         if !self.expanded {
//!             self.expanded = true;
//!             return Ok(Step::Expand(vec![Request::Argument(0)]));
//!         }
//!         let text = cx.arg(0).and_then(Toolkit::string_value).ok_or("expected a string")?;
//!         cx.replace_with(Toolkit::string(text.chars().rev().collect::<String>()));
//!         Ok(Step::Done)
//!     }
//! }
//! ```

use crate::ast::Toolkit;
use crate::errors::HandlerError;
use crate::transform::{Helper, MacroContext};

/// A resumable handler body.
pub trait MacroTask {
    /// Runs the task until it needs an expansion or is finished.
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        toolkit: &Toolkit,
        helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError>;
}

/// What a task wants next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Expand these subtrees, then resume. An empty list simply resumes.
    Expand(Vec<Request>),
    /// The handler is finished.
    Done,
}

impl Step {
    pub fn expand(request: Request) -> Self {
        Step::Expand(vec![request])
    }
}

/// A subtree a task wants expanded before it continues.
///
/// Only the current call's arguments and whole top-level items can be
/// requested. To expand a deeper node, request the top-level item that holds
/// it, or an argument that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// The n-th argument of the current call.
    Argument(usize),
    /// Every argument of the current call, left to right.
    Arguments,
    /// A top-level program item, by index. Must not contain the current call.
    Item(usize),
    /// An import declaration, by index. Its bindings are collected at once so
    /// macros it imports become callable in the same pass.
    Import(usize),
}
