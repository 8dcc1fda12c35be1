//! Configuration: the `stash.toml` module document and resolved settings.
pub mod settings;
pub mod toml_loader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::paths;
use crate::render::Variables;

pub use settings::{Settings, SettingsOverrides};

/// File name of the module document inside the dotfiles root.
pub const CONFIG_FILE_NAME: &str = "stash.toml";

/// Variable that always holds the absolute dotfiles root.
pub const DOTFILE_DIR_VAR: &str = "dotfile_dir";

/// The `stash.toml` document.
///
/// ```toml
/// [variables]
/// accent = "ff8800"
///
/// [modules.nvim]
/// target = "~/.config/nvim"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StashConfig {
    /// Global template variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: Variables,
    /// Configured modules, keyed by name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// Settings of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModuleConfig {
    /// Publish directory; defaults to `~/.config/<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

impl StashConfig {
    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist, or an
    /// error if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_document(path)
    }

    /// Write the document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        toml_loader::write_document(path, self)
    }

    /// Add an empty `[modules.<name>]` table unless one exists. Returns
    /// whether the document changed.
    pub fn ensure_module(&mut self, name: &str) -> bool {
        if self.modules.contains_key(name) {
            return false;
        }
        self.modules.insert(name.to_string(), ModuleConfig::default());
        true
    }

    /// Publish directory of module `name`, with `~` expanded against `home`.
    #[must_use]
    pub fn module_target(&self, name: &str, home: &Path) -> PathBuf {
        self.modules
            .get(name)
            .and_then(|m| m.target.as_deref())
            .map_or_else(
                || home.join(".config").join(name),
                |target| paths::expand_home(target, home),
            )
    }

    /// Variables for a render: `dotfile_dir` overlaid by `[variables]`.
    #[must_use]
    pub fn variables_for(&self, dotfiles_root: &Path) -> Variables {
        let mut variables = Variables::new();
        variables.insert(
            DOTFILE_DIR_VAR.to_string(),
            Value::String(dotfiles_root.to_string_lossy().into_owned()),
        );
        variables.extend(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables
    }
}
