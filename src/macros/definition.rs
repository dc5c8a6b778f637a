//! Macro definitions and the builder that produces them.
//!
//! A [`Macro`] is immutable once built: a validated name, a [`Handler`], the
//! rendered type declaration text, and a compatibility stamp. Build one with
//! [`define_macro`]:
//!
//! ```rust,ignore
//! let echo = define_macro("echo")?
//!     .with_signature("(msg: string): void", Some("Logs `msg` three times over."))
//!     .with_toolkit_handler(|cx, _toolkit| {
//!         let msg = cx.arg(0).and_then(Toolkit::string_value).ok_or("expected a string")?;
//!         cx.replace_with(Toolkit::call(
//!             Toolkit::member(Toolkit::ident_expr("console"), "log"),
//!             vec![Toolkit::string(msg.repeat(3))],
//!         ));
//!         Ok(())
//!     })?;
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::Toolkit;
use crate::errors::{HandlerResult, MacroError};
use crate::macros::compat::{Stamped, COMPAT_VERSION};
use crate::macros::task::MacroTask;
use crate::transform::{Helper, MacroContext};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[_$\p{L}][_$\p{L}\p{Nd}]*$").expect("identifier pattern is valid")
});

/// Returns true if `name` is usable as a macro (and therefore JavaScript) identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

// ============================================================================
// HANDLERS
// ============================================================================

pub type ContextFn = dyn Fn(&mut MacroContext<'_>) -> HandlerResult + Send + Sync;
pub type ToolkitFn = dyn Fn(&mut MacroContext<'_>, &Toolkit) -> HandlerResult + Send + Sync;
pub type HelperFn =
    dyn Fn(&mut MacroContext<'_>, &Toolkit, &mut Helper<'_>) -> HandlerResult + Send + Sync;
pub type TaskFactory = dyn Fn() -> Box<dyn MacroTask> + Send + Sync;

/// The capabilities a handler receives at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandlerTier {
    ContextOnly,
    WithToolkit,
    WithHelper,
}

/// A macro body.
///
/// The first three variants auto-expand: nested macro calls in the arguments
/// are expanded before the function runs. [`Handler::Task`] builds a fresh
/// [`MacroTask`] per call, which decides itself what to expand and when.
#[derive(Clone)]
pub enum Handler {
    ContextOnly(Arc<ContextFn>),
    WithToolkit(Arc<ToolkitFn>),
    WithHelper(Arc<HelperFn>),
    Task(Arc<TaskFactory>),
}

impl Handler {
    pub fn tier(&self) -> HandlerTier {
        match self {
            Handler::ContextOnly(_) => HandlerTier::ContextOnly,
            Handler::WithToolkit(_) => HandlerTier::WithToolkit,
            Handler::WithHelper(_) | Handler::Task(_) => HandlerTier::WithHelper,
        }
    }

    pub fn is_cooperative(&self) -> bool {
        matches!(self, Handler::Task(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Handler::ContextOnly(_) => "ContextOnly",
            Handler::WithToolkit(_) => "WithToolkit",
            Handler::WithHelper(_) => "WithHelper",
            Handler::Task(_) => "Task",
        };
        write!(f, "Handler::{kind}")
    }
}

// ============================================================================
// MACRO
// ============================================================================

struct MacroInner {
    name: String,
    handler: Handler,
    type_text: String,
    version: u32,
}

/// A named, versioned compile-time function. Cheap to clone.
#[derive(Clone)]
pub struct Macro {
    inner: Arc<MacroInner>,
}

impl Macro {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn handler(&self) -> &Handler {
        &self.inner.handler
    }

    pub fn tier(&self) -> HandlerTier {
        self.inner.handler.tier()
    }

    /// The exported declarations for this macro, ready to go inside `declare module`.
    pub fn type_text(&self) -> &str {
        &self.inner.type_text
    }

    /// Re-stamps the macro with another compatibility version.
    ///
    /// Hosts use this when loading definitions compiled against a different
    /// release; registration then reports the mismatch.
    pub fn with_compat_version(&self, version: u32) -> Macro {
        Macro {
            inner: Arc::new(MacroInner {
                name: self.inner.name.clone(),
                handler: self.inner.handler.clone(),
                type_text: self.inner.type_text.clone(),
                version,
            }),
        }
    }
}

impl Stamped for Macro {
    fn compat_version(&self) -> u32 {
        self.inner.version
    }

    fn describe(&self) -> String {
        format!("macro `{}`", self.inner.name)
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.inner.name)
            .field("handler", &self.inner.handler)
            .field("version", &self.inner.version)
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Clone)]
struct Signature {
    text: String,
    comment: Option<String>,
}

impl Signature {
    fn render(&self, name: &str) -> String {
        let mut out = String::new();
        if let Some(comment) = &self.comment {
            out.push_str("/**\n");
            for line in comment.lines() {
                let line = line.trim_end();
                if line.is_empty() {
                    out.push_str(" *\n");
                } else {
                    out.push_str(" * ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            out.push_str(" */\n");
        }
        let text = self.text.trim().trim_end_matches(';');
        out.push_str(&format!("export function {name}{text};"));
        out
    }
}

/// Starts a macro definition. Fails unless `name` has identifier syntax.
pub fn define_macro(name: impl Into<String>) -> Result<MacroBuilder, MacroError> {
    let name = name.into();
    if !is_valid_identifier(&name) {
        return Err(MacroError::definition(
            name,
            "macro names must be valid identifiers",
        ));
    }
    Ok(MacroBuilder {
        name,
        custom_types: Vec::new(),
        signatures: Vec::new(),
    })
}

/// Collects type text and signatures; finished by one of the `with_*handler` methods.
#[derive(Debug, Clone)]
pub struct MacroBuilder {
    name: String,
    custom_types: Vec<String>,
    signatures: Vec<Signature>,
}

impl MacroBuilder {
    /// Adds free-form declaration text (interfaces, type aliases) emitted before the signatures.
    pub fn with_custom_type(mut self, text: impl Into<String>) -> Self {
        self.custom_types.push(text.into());
        self
    }

    /// Adds a call signature such as `(msg: string): void` or `<T>(value: T): T`.
    pub fn with_signature(mut self, signature: impl Into<String>, comment: Option<&str>) -> Self {
        self.signatures.push(Signature {
            text: signature.into(),
            comment: comment.map(str::to_string),
        });
        self
    }

    pub fn with_handler<F>(self, handler: F) -> Result<Macro, MacroError>
    where
        F: Fn(&mut MacroContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.finish(Handler::ContextOnly(Arc::new(handler)))
    }

    pub fn with_toolkit_handler<F>(self, handler: F) -> Result<Macro, MacroError>
    where
        F: Fn(&mut MacroContext<'_>, &Toolkit) -> HandlerResult + Send + Sync + 'static,
    {
        self.finish(Handler::WithToolkit(Arc::new(handler)))
    }

    pub fn with_helper_handler<F>(self, handler: F) -> Result<Macro, MacroError>
    where
        F: Fn(&mut MacroContext<'_>, &Toolkit, &mut Helper<'_>) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.finish(Handler::WithHelper(Arc::new(handler)))
    }

    /// Finishes with a cooperative handler; `factory` builds one task per call.
    pub fn with_task<F, T>(self, factory: F) -> Result<Macro, MacroError>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: MacroTask + 'static,
    {
        self.finish(Handler::Task(Arc::new(move || {
            Box::new(factory()) as Box<dyn MacroTask>
        })))
    }

    fn finish(self, handler: Handler) -> Result<Macro, MacroError> {
        if self.signatures.is_empty() {
            return Err(MacroError::definition(
                self.name,
                "at least one signature is required before a handler",
            ));
        }
        if let Some(bad) = self
            .signatures
            .iter()
            .find(|s| !s.text.trim_start().starts_with(['(', '<']))
        {
            return Err(MacroError::definition(
                self.name,
                format!("signature `{}` must start with a parameter list", bad.text),
            ));
        }

        let type_text = self
            .custom_types
            .iter()
            .cloned()
            .chain(self.signatures.iter().map(|s| s.render(&self.name)))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Macro {
            inner: Arc::new(MacroInner {
                name: self.name,
                handler,
                type_text,
                version: COMPAT_VERSION,
            }),
        })
    }
}
