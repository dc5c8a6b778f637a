//! Per-file parsing and printing.
//!
//! A [`SourceText`] owns everything `swc` needs for one file: the source map,
//! the registered source file, and the comment store. Comments collected while
//! parsing are handed back to the emitter, so they survive the round trip.

use std::sync::Arc;

use miette::NamedSource;
use serde::{Deserialize, Serialize};
use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceFile, SourceMap, Span, Spanned};
use swc_core::ecma::ast::{EsVersion, Module};
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::codegen::{Config, Emitter};
use swc_core::ecma::parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax};

use crate::errors::{MacroError, SourceSite};

/// The dialect a file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSyntax {
    /// ECMAScript with JSX enabled.
    EcmaScript,
    TypeScript,
    /// TypeScript with JSX enabled.
    Tsx,
}

impl SourceSyntax {
    /// Picks the dialect from a file extension; unknown extensions parse as ECMAScript.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.split(['?', '#']).next().unwrap_or(ext))
            .unwrap_or_default();
        match ext {
            "ts" | "mts" | "cts" => SourceSyntax::TypeScript,
            "tsx" => SourceSyntax::Tsx,
            _ => SourceSyntax::EcmaScript,
        }
    }

    pub fn is_typescript(self) -> bool {
        !matches!(self, SourceSyntax::EcmaScript)
    }

    pub(crate) fn to_swc(self) -> Syntax {
        match self {
            SourceSyntax::EcmaScript => Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            }),
            SourceSyntax::TypeScript => Syntax::Typescript(TsSyntax {
                tsx: false,
                ..Default::default()
            }),
            SourceSyntax::Tsx => Syntax::Typescript(TsSyntax {
                tsx: true,
                ..Default::default()
            }),
        }
    }
}

/// One file being transformed.
pub struct SourceText {
    pub path: String,
    pub syntax: SourceSyntax,
    pub(crate) cm: Lrc<SourceMap>,
    pub(crate) file: Lrc<SourceFile>,
    pub(crate) comments: SingleThreadedComments,
    named: Arc<NamedSource<String>>,
}

impl SourceText {
    pub fn new(path: &str, source: &str, syntax: SourceSyntax) -> Self {
        let cm: Lrc<SourceMap> = Default::default();
        let file = cm.new_source_file(FileName::Custom(path.to_string()).into(), source.to_string());
        Self {
            path: path.to_string(),
            syntax,
            cm,
            file,
            comments: SingleThreadedComments::default(),
            named: Arc::new(NamedSource::new(path, source.to_string())),
        }
    }

    /// The original, untransformed text.
    pub fn text(&self) -> &str {
        self.named.inner()
    }

    pub fn parse_module(&self) -> Result<Module, MacroError> {
        let mut recovered = Vec::new();
        let module = parse_file_as_module(
            &self.file,
            self.syntax.to_swc(),
            EsVersion::latest(),
            Some(&self.comments as &dyn Comments),
            &mut recovered,
        )
        .map_err(|err| self.parse_error(err))?;
        // Recoverable errors still mean the source is not valid; refuse it.
        if let Some(err) = recovered.into_iter().next() {
            return Err(self.parse_error(err));
        }
        Ok(module)
    }

    pub fn print_module(&self, module: &Module) -> Result<String, MacroError> {
        emit_module(&self.cm, Some(&self.comments as &dyn Comments), module).map_err(|source| {
            MacroError::Io {
                path: self.path.clone().into(),
                source,
            }
        })
    }

    /// Maps a span of this file to a labelled site. Spans from other files
    /// (synthesized or parsed from snippets) have none.
    pub fn site(&self, span: Span) -> Option<SourceSite> {
        if span.is_dummy() || span.lo < self.file.start_pos || span.hi > self.file.end_pos {
            return None;
        }
        let loc = self.cm.lookup_char_pos(span.lo);
        let offset = (span.lo.0 - self.file.start_pos.0) as usize;
        let len = (span.hi.0 - span.lo.0) as usize;
        Some(SourceSite {
            source: Arc::clone(&self.named),
            span: (offset, len).into(),
            line: loc.line,
            column: loc.col_display + 1,
        })
    }

    fn parse_error(&self, err: swc_core::ecma::parser::error::Error) -> MacroError {
        MacroError::Parse {
            file: self.path.clone(),
            message: err.kind().msg().to_string(),
            site: self.site(err.span()),
        }
    }
}

/// Prints a module with the non-minifying emitter.
pub fn emit_module(
    cm: &Lrc<SourceMap>,
    comments: Option<&dyn Comments>,
    module: &Module,
) -> std::io::Result<String> {
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: cm.clone(),
            comments,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter.emit_module(module)?;
    }
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
