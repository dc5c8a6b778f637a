//! Macro registry: the table of virtual modules and the macros they export.
//!
//! The registry is built once at startup and then shared read-only by every
//! transformation (it is `Send + Sync`). Registration and transformation are
//! separate phases; nothing in the transform path mutates the registry.
//!
//! # Invariants
//! - A module name is registered at most once, whether it exports macros or source text.
//! - Within one module, macro names are unique.
//! - Every macro and provider carries the runtime's compatibility stamp.
//!
//! # Summary Table
//! | Method              | Fails on duplicate module | Checks version | Notes                          |
//! |---------------------|---------------------------|----------------|--------------------------------|
//! | register_macros     | Yes                       | Yes            | Also fails on duplicate macro  |
//! | register_module     | Yes                       | No             | Plain source-text module       |
//! | register_provider   | Yes (all-or-nothing)      | Yes            | Merges a whole provider        |
//! | resolve / load      | N/A                       | N/A            | Host bundler hooks             |

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::errors::MacroError;
use crate::macros::compat::{ensure_compatible, Stamped, COMPAT_VERSION};
use crate::macros::declarations::render_declarations;
use crate::macros::definition::Macro;
use crate::transform::{self, Outcome, TransformOptions};

/// Placeholder content for a module whose exports are all macros.
///
/// By the time the bundler loads such a module the transform has already
/// inlined every call, so it only needs to exist.
pub const MACRO_MODULE_PLACEHOLDER: &str = "export {}\n";

// ============================================================================
// MODULE EXPORT TABLE
// ============================================================================

/// What a virtual module exports.
#[derive(Debug, Clone)]
pub enum ModuleExport {
    Macros(Vec<Macro>),
    Source(String),
}

/// One registered virtual module.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub export: ModuleExport,
    /// Declaration text accumulated for `declare module '<name>'`.
    pub types: Vec<String>,
}

impl ModuleEntry {
    pub fn macros(&self) -> Option<&[Macro]> {
        match &self.export {
            ModuleExport::Macros(macros) => Some(macros),
            ModuleExport::Source(_) => None,
        }
    }
}

/// Module name → exports, kept sorted so declaration output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ModuleExportTable {
    modules: BTreeMap<String, ModuleEntry>,
}

impl ModuleExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: &str) -> Option<&ModuleEntry> {
        self.modules.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleEntry)> {
        self.modules.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn insert_macros(&mut self, module: &str, macros: Vec<Macro>) -> Result<(), MacroError> {
        self.ensure_vacant(module)?;
        let mut seen = HashSet::new();
        for mac in &macros {
            ensure_compatible(mac)?;
            if !seen.insert(mac.name()) {
                return Err(MacroError::DuplicateRegistration {
                    module: module.to_string(),
                    macro_name: Some(mac.name().to_string()),
                });
            }
        }
        let types = macros.iter().map(|m| m.type_text().to_string()).collect();
        self.modules.insert(
            module.to_string(),
            ModuleEntry {
                export: ModuleExport::Macros(macros),
                types,
            },
        );
        Ok(())
    }

    pub fn insert_source(&mut self, module: &str, source: impl Into<String>) -> Result<(), MacroError> {
        self.ensure_vacant(module)?;
        self.modules.insert(
            module.to_string(),
            ModuleEntry {
                export: ModuleExport::Source(source.into()),
                types: Vec::new(),
            },
        );
        Ok(())
    }

    /// Appends declaration text to an already registered module.
    pub fn add_types(&mut self, module: &str, text: impl Into<String>) -> Result<(), MacroError> {
        let entry = self.modules.get_mut(module).ok_or_else(|| {
            MacroError::definition(module, "types can only be added to a registered module")
        })?;
        entry.types.push(text.into());
        Ok(())
    }

    fn ensure_vacant(&self, module: &str) -> Result<(), MacroError> {
        if module.is_empty() {
            return Err(MacroError::definition(module, "module names must not be empty"));
        }
        if self.modules.contains_key(module) {
            return Err(MacroError::DuplicateRegistration {
                module: module.to_string(),
                macro_name: None,
            });
        }
        Ok(())
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// A versioned batch of virtual modules, registered as one unit.
#[derive(Debug, Clone)]
pub struct Provider {
    id: String,
    version: u32,
    exports: ModuleExportTable,
}

/// Starts a provider named `id`.
pub fn define_provider(id: impl Into<String>) -> Provider {
    Provider {
        id: id.into(),
        version: COMPAT_VERSION,
        exports: ModuleExportTable::new(),
    }
}

impl Provider {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exports(&self) -> &ModuleExportTable {
        &self.exports
    }

    pub fn with_macros(mut self, module: &str, macros: Vec<Macro>) -> Result<Self, MacroError> {
        self.exports.insert_macros(module, macros)?;
        Ok(self)
    }

    pub fn with_module(mut self, module: &str, source: impl Into<String>) -> Result<Self, MacroError> {
        self.exports.insert_source(module, source)?;
        Ok(self)
    }

    pub fn with_types(mut self, module: &str, text: impl Into<String>) -> Result<Self, MacroError> {
        self.exports.add_types(module, text)?;
        Ok(self)
    }

    /// See [`Macro::with_compat_version`].
    pub fn with_compat_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl Stamped for Provider {
    fn compat_version(&self) -> u32 {
        self.version
    }

    fn describe(&self) -> String {
        format!("provider `{}`", self.id)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// The process-wide table of virtual modules. Construct once, pass by reference.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    table: ModuleExportTable,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ModuleExportTable {
        &self.table
    }

    /// Registers `macros` as the exports of virtual module `module`.
    ///
    /// # Errors
    /// `DuplicateRegistration` if the module exists or two macros share a name;
    /// `IncompatibleVersion` if a macro carries a foreign stamp.
    pub fn register_macros(&mut self, module: &str, macros: Vec<Macro>) -> Result<(), MacroError> {
        self.table.insert_macros(module, macros)?;
        tracing::debug!(module, "registered macro module");
        Ok(())
    }

    /// Registers a virtual module backed by plain source text.
    pub fn register_module(&mut self, module: &str, source: impl Into<String>) -> Result<(), MacroError> {
        self.table.insert_source(module, source)?;
        tracing::debug!(module, "registered source module");
        Ok(())
    }

    /// Merges every module of `provider`. Nothing is registered if any module collides.
    pub fn register_provider(&mut self, provider: Provider) -> Result<(), MacroError> {
        ensure_compatible(&provider)?;
        if let Some((module, _)) = provider
            .exports
            .iter()
            .find(|(module, _)| self.table.contains(module))
        {
            return Err(MacroError::DuplicateRegistration {
                module: module.to_string(),
                macro_name: None,
            });
        }
        let id = provider.id;
        for (module, entry) in provider.exports.modules {
            self.table.modules.insert(module, entry);
        }
        tracing::debug!(provider = %id, "registered provider");
        Ok(())
    }

    /// The macros exported by `module`, or `None` if it is not a macro module.
    pub fn macros(&self, module: &str) -> Option<&[Macro]> {
        self.table.get(module).and_then(ModuleEntry::macros)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.table.modules.keys().map(String::as_str)
    }

    /// Bundler resolve hook: claims `id` if it names a registered virtual module.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.table
            .modules
            .get_key_value(id)
            .map(|(name, _)| name.as_str())
    }

    /// Bundler load hook: the content of a resolved virtual module.
    pub fn load(&self, id: &str) -> Option<Cow<'_, str>> {
        match &self.table.get(id)?.export {
            ModuleExport::Source(source) => Some(Cow::Borrowed(source.as_str())),
            ModuleExport::Macros(_) => Some(Cow::Borrowed(MACRO_MODULE_PLACEHOLDER)),
        }
    }

    /// One `declare module` block per registered module.
    pub fn type_declarations(&self) -> String {
        render_declarations(&self.table)
    }

    /// Writes [`type_declarations`](Self::type_declarations) to `path`, creating parent directories.
    pub fn write_type_declarations(&self, path: &Path) -> Result<(), MacroError> {
        let io_err = |source| MacroError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.type_declarations()).map_err(io_err)
    }

    /// Expands every macro call in `source`. See [`transform::transform`].
    pub fn transform(
        &self,
        source: &str,
        file_path: &str,
        options: &TransformOptions,
    ) -> Result<Outcome, MacroError> {
        transform::transform(self, source, file_path, options)
    }
}
