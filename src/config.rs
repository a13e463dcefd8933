//! Configuration System
//!
//! Layered configuration for the tree view: built-in defaults, the user-level
//! config file, an explicit config file, then `CANOPY_*` environment overrides.
//! Nested keys use a double underscore, e.g. `CANOPY_TREE__SELECTED_CLASS`.

use crate::error::TreeError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// Rendering and selection behavior
    #[serde(default)]
    pub tree: TreeSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rendering and selection behavior of a tree view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Glyph shown for objects without a `type` capability
    #[serde(default = "default_glyph")]
    pub default_glyph: String,

    /// Indicator appended to labels of linked objects
    #[serde(default = "default_link_glyph")]
    pub link_glyph: String,

    /// Marker class carried by the selected node
    #[serde(default = "default_selected_class")]
    pub selected_class: String,

    /// Expand ancestors of a selected object so it becomes visible
    #[serde(default = "default_true")]
    pub expand_to_selection: bool,

    /// Model field used as the node label
    #[serde(default = "default_label_field")]
    pub label_field: String,
}

fn default_glyph() -> String {
    "o".to_string()
}

fn default_link_glyph() -> String {
    "\u{2192}".to_string()
}

fn default_selected_class() -> String {
    "selected".to_string()
}

fn default_true() -> bool {
    true
}

fn default_label_field() -> String {
    "name".to_string()
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            default_glyph: default_glyph(),
            link_glyph: default_link_glyph(),
            selected_class: default_selected_class(),
            expand_to_selection: default_true(),
            label_field: default_label_field(),
        }
    }
}

impl TreeSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.selected_class.trim().is_empty() {
            return Err("selected_class cannot be empty".to_string());
        }
        if self.selected_class.contains(char::is_whitespace) {
            return Err(format!(
                "selected_class must be a single class name, got '{}'",
                self.selected_class
            ));
        }
        if self.label_field.trim().is_empty() {
            return Err("label_field cannot be empty".to_string());
        }
        Ok(())
    }
}

impl CanopyConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        self.tree
            .validate()
            .map_err(|e| TreeError::Config(format!("tree: {}", e)))
    }
}

/// Loads [`CanopyConfig`] from layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, user config file, optional explicit file, then environment.
    pub fn load(explicit: Option<&Path>) -> Result<CanopyConfig, TreeError> {
        let mut builder = builder_with_defaults()?;

        if let Some(user_path) = user_config_path().filter(|p| p.exists()) {
            debug!(config_path = %user_path.display(), "Loading user configuration");
            builder = builder.add_source(File::from(user_path).required(false));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(TreeError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        let config: CanopyConfig = builder
            .add_source(
                Environment::with_prefix("CANOPY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file on top of the defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<CanopyConfig, TreeError> {
        let config: CanopyConfig = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, TreeError> {
    let defaults = TreeSettings::default();
    Ok(Config::builder()
        .set_default("tree.default_glyph", defaults.default_glyph)?
        .set_default("tree.link_glyph", defaults.link_glyph)?
        .set_default("tree.selected_class", defaults.selected_class)?
        .set_default("tree.expand_to_selection", defaults.expand_to_selection)?
        .set_default("tree.label_field", defaults.label_field)?)
}

/// `$XDG_CONFIG_HOME/canopy/config.toml` or the platform equivalent.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "canopy")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
