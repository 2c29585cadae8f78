//! Hierarchy Configuration
//!
//! Host-facing options for the collection hierarchy. Every field has a
//! default, so a partial JSON file (or no file at all) yields a usable
//! configuration.
//!
//! Options can come from three places:
//!
//! - a JSON file, via [`TreeConfig::load`] / [`TreeConfig::from_json_str`]
//! - the host's `collection_tree_*` key/value options, via [`TreeConfig::from_host_options`]
//! - code, via `TreeConfig { .., ..Default::default() }`

use crate::services::collection_index::{IndexOptions, Ordering, ParentMode, Visibility};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// SQL identifier accepted for node source table and column names
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]{0,63}$";

/// Host option keys
pub const OPTION_ALPHA_ORDER: &str = "collection_tree_alpha_order";
pub const OPTION_BROWSE_ONLY_ROOT: &str = "collection_tree_browse_only_root";
pub const OPTION_EXPAND_SUBCOLLECTIONS: &str = "collection_tree_expand_subcollections";
pub const OPTION_DISPLAY_ALL_PUBLIC: &str = "collection_tree_display_all_public_collections";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the hierarchy reads collection records from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSourceConfig {
    pub table: String,
    pub id_column: String,
    pub title_column: String,
    pub public_column: String,
}

impl Default for NodeSourceConfig {
    fn default() -> Self {
        Self {
            table: "collections".to_string(),
            id_column: "id".to_string(),
            title_column: "title".to_string(),
            public_column: "public".to_string(),
        }
    }
}

impl NodeSourceConfig {
    /// Check every name is a plain SQL identifier
    ///
    /// Names are interpolated into queries, so anything else is rejected.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("table", &self.table),
            ("id_column", &self.id_column),
            ("title_column", &self.title_column),
            ("public_column", &self.public_column),
        ] {
            if !is_valid_identifier(value) {
                return Err(format!(
                    "node_source.{} must be a plain SQL identifier, got '{}'",
                    field, value
                ));
            }
        }
        Ok(())
    }
}

/// Returns true when `name` is safe to interpolate as a table or column name
pub fn is_valid_identifier(name: &str) -> bool {
    static IDENTIFIER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(IDENTIFIER_PATTERN).ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(name))
}

/// Who is looking at the hierarchy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    /// May see non-public collections
    pub can_view_private: bool,
    /// Request comes from the admin side of the host
    pub admin_context: bool,
}

impl Viewer {
    pub const fn public() -> Self {
        Self {
            can_view_private: false,
            admin_context: false,
        }
    }

    pub const fn admin() -> Self {
        Self {
            can_view_private: true,
            admin_context: true,
        }
    }
}

/// Collection hierarchy options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Order siblings by name instead of by id
    pub alpha_order: bool,

    /// Public browse lists only root collections
    pub browse_only_root: bool,

    /// Item search within a collection also matches its descendants
    pub expand_subcollections: bool,

    /// Public viewers see every public collection, re-attached under its
    /// nearest public ancestor
    pub display_all_public_collections: bool,

    /// Indentation unit for flattened select labels
    pub padding: String,

    pub untitled_label: String,
    pub unavailable_label: String,

    pub node_source: NodeSourceConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            alpha_order: false,
            browse_only_root: false,
            expand_subcollections: false,
            display_all_public_collections: false,
            padding: "-".to_string(),
            untitled_label: "[Untitled]".to_string(),
            unavailable_label: "[Unavailable]".to_string(),
            node_source: NodeSourceConfig::default(),
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.padding.is_empty() {
            return Err("padding cannot be empty".to_string());
        }

        if self.untitled_label.trim().is_empty() {
            return Err("untitled_label cannot be empty".to_string());
        }

        if self.unavailable_label.trim().is_empty() {
            return Err("unavailable_label cannot be empty".to_string());
        }

        self.node_source.validate()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults when the file is missing
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!("Loaded hierarchy configuration from {:?}", path);
        Ok(config)
    }

    /// Build from the host's flat option table
    ///
    /// Flags are stored by the host as `"1"` / `"0"`; unknown keys are ignored
    /// and absent keys keep their defaults.
    pub fn from_host_options(options: &HashMap<String, String>) -> Self {
        let flag = |key: &str| options.get(key).map(|value| parse_flag(value));
        let defaults = Self::default();

        Self {
            alpha_order: flag(OPTION_ALPHA_ORDER).unwrap_or(defaults.alpha_order),
            browse_only_root: flag(OPTION_BROWSE_ONLY_ROOT).unwrap_or(defaults.browse_only_root),
            expand_subcollections: flag(OPTION_EXPAND_SUBCOLLECTIONS)
                .unwrap_or(defaults.expand_subcollections),
            display_all_public_collections: flag(OPTION_DISPLAY_ALL_PUBLIC)
                .unwrap_or(defaults.display_all_public_collections),
            ..defaults
        }
    }

    /// Index options for a viewer
    ///
    /// Viewers who may see private collections always get the declared
    /// hierarchy. Public viewers get the public-only view, re-parented under
    /// public ancestors when `display_all_public_collections` is on.
    pub fn index_options(&self, viewer: Viewer) -> IndexOptions {
        let ordering = if self.alpha_order {
            Ordering::Alphabetic
        } else {
            Ordering::Natural
        };

        if viewer.can_view_private {
            return IndexOptions {
                visibility: Visibility::All,
                parent_mode: ParentMode::Declared,
                ordering,
            };
        }

        let parent_mode = if self.display_all_public_collections {
            ParentMode::PublicAncestor
        } else {
            ParentMode::Declared
        };

        IndexOptions {
            visibility: Visibility::PublicOnly,
            parent_mode,
            ordering,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = TreeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.padding, "-");
        assert_eq!(config.untitled_label, "[Untitled]");
        assert_eq!(config.node_source.table, "collections");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TreeConfig::from_json_str(r#"{"alpha_order": true}"#).unwrap();
        assert!(config.alpha_order);
        assert_eq!(config.unavailable_label, "[Unavailable]");
        assert_eq!(config.node_source.title_column, "title");
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let json = r#"{"node_source": {"table": "collections; DROP TABLE x"}}"#;
        let err = TreeConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        assert!(is_valid_identifier("omeka_collections"));
        assert!(!is_valid_identifier("1table"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_rejects_empty_padding() {
        let config = TreeConfig {
            padding: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_options() {
        let mut options = HashMap::new();
        options.insert(OPTION_ALPHA_ORDER.to_string(), "1".to_string());
        options.insert(OPTION_BROWSE_ONLY_ROOT.to_string(), "0".to_string());
        options.insert(OPTION_DISPLAY_ALL_PUBLIC.to_string(), "1".to_string());
        options.insert("unrelated_option".to_string(), "1".to_string());

        let config = TreeConfig::from_host_options(&options);
        assert!(config.alpha_order);
        assert!(!config.browse_only_root);
        assert!(!config.expand_subcollections);
        assert!(config.display_all_public_collections);
    }

    #[test]
    fn test_index_options_per_viewer() {
        let config = TreeConfig {
            alpha_order: true,
            display_all_public_collections: true,
            ..Default::default()
        };

        let admin = config.index_options(Viewer::admin());
        assert_eq!(admin.visibility, Visibility::All);
        assert_eq!(admin.parent_mode, ParentMode::Declared);
        assert_eq!(admin.ordering, Ordering::Alphabetic);

        let public = config.index_options(Viewer::public());
        assert_eq!(public.visibility, Visibility::PublicOnly);
        assert_eq!(public.parent_mode, ParentMode::PublicAncestor);
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeConfig::load(temp_dir.path().join("missing.json"))
            .await
            .unwrap();
        assert_eq!(config, TreeConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tree.json");
        tokio::fs::write(&path, r#"{"padding": "--", "browse_only_root": true}"#)
            .await
            .unwrap();

        let config = TreeConfig::load(&path).await.unwrap();
        assert_eq!(config.padding, "--");
        assert!(config.browse_only_root);
    }
}
