//! Transform options and host plugin configuration.
//!
//! [`TransformOptions`] is what a single `transform` call needs.
//! [`PluginConfig`] is the on-disk form a host integration loads once (JSON or
//! YAML) and turns into options per build mode.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::MacroError;

pub const DEFAULT_MAX_PASSES: usize = 5;
/// One pass to expand and one to confirm nothing is left.
pub const MIN_MAX_PASSES: usize = 2;

// ============================================================================
// TRANSFORM OPTIONS
// ============================================================================

/// Options for one file transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TransformOptions {
    /// Development build; handed to handlers.
    pub dev: bool,
    /// Server-side build; handed to handlers.
    pub ssr: bool,
    /// Rewrite consumed macro imports to bare `import 'mod'` instead of
    /// deleting them, so file watchers keep the dependency edge.
    pub keep_imports: bool,
    /// Upper bound on expansion passes, including the final pass that finds
    /// nothing left to expand.
    pub max_passes: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            dev: false,
            ssr: false,
            keep_imports: false,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl TransformOptions {
    /// Development defaults: `dev` on and macro imports kept.
    pub fn development() -> Self {
        Self {
            dev: true,
            keep_imports: true,
            ..Self::default()
        }
    }

    pub fn with_ssr(mut self, ssr: bool) -> Self {
        self.ssr = ssr;
        self
    }

    pub fn with_keep_imports(mut self, keep_imports: bool) -> Self {
        self.keep_imports = keep_imports;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// The pass bound actually enforced.
    pub fn effective_max_passes(&self) -> usize {
        if self.max_passes < MIN_MAX_PASSES {
            tracing::warn!(
                requested = self.max_passes,
                used = MIN_MAX_PASSES,
                "max_passes is below the minimum; clamping"
            );
            return MIN_MAX_PASSES;
        }
        self.max_passes
    }
}

// ============================================================================
// PLUGIN CONFIG
// ============================================================================

/// Host-level configuration. Unset fields fall back to mode-dependent defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginConfig {
    pub max_passes: Option<usize>,
    /// Defaults to the dev flag.
    pub keep_imports: Option<bool>,
    /// Where to write the generated `declare module` file, if anywhere.
    pub type_declarations: Option<PathBuf>,
}

impl PluginConfig {
    pub fn from_json(text: &str) -> Result<Self, MacroError> {
        serde_json::from_str(text).map_err(|e| MacroError::config(format!("JSON: {e}")))
    }

    pub fn from_yaml(text: &str) -> Result<Self, MacroError> {
        // An empty YAML document is a null, not an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| MacroError::config(format!("YAML: {e}")))
    }

    /// Loads a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, MacroError> {
        let text = std::fs::read_to_string(path).map_err(|source| MacroError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match ext.as_deref() {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => Err(MacroError::config(format!(
                "{}: expected a .json, .yaml or .yml file",
                path.display()
            ))),
        }?;
        tracing::debug!(path = %path.display(), ?config, "loaded plugin config");
        Ok(config)
    }

    /// Options for one build mode.
    pub fn transform_options(&self, dev: bool, ssr: bool) -> TransformOptions {
        TransformOptions {
            dev,
            ssr,
            keep_imports: self.keep_imports.unwrap_or(dev),
            max_passes: self.max_passes.unwrap_or(DEFAULT_MAX_PASSES),
        }
    }
}
