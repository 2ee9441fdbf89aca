//! Behavior configuration and the validated relation registry

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Suffix used when none is configured: `tagsIds` / `tags_ids` address `tags`
pub const DEFAULT_SUFFIX: &str = "ids";

/// Raw configuration as written by the user
///
/// ```toml
/// relations = ["tags", "categories"]
/// suffix = "ids"
///
/// [aliases]
/// tag_list = "tags"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Relation names managed by the behavior
    pub relations: Vec<String>,
    /// Property-name suffix marking the identifier view of a relation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Explicit property name -> relation name table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

impl BehaviorConfig {
    pub fn new<I, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BehaviorConfig {
            relations: relations.into_iter().map(Into::into).collect(),
            suffix: None,
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_alias(mut self, property: impl Into<String>, relation: impl Into<String>) -> Self {
        self.aliases.insert(property.into(), relation.into());
        self
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse relation behavior config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Default location: `<config dir>/relsync/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("relsync")
            .join("config.toml")
    }
}

/// Validated set of managed relations plus property-name resolution
#[derive(Debug, Clone)]
pub struct RelationRegistry {
    relations: Vec<String>,
    suffix: String,
    aliases: BTreeMap<String, String>,
}

impl RelationRegistry {
    /// Validate a configuration. Any problem is a [`SyncError::Configuration`].
    pub fn new(config: BehaviorConfig) -> Result<Self> {
        if config.relations.is_empty() {
            return Err(SyncError::Configuration(
                "relations must be set and contain at least one relation name".to_string(),
            ));
        }

        let mut relations: Vec<String> = Vec::with_capacity(config.relations.len());
        for name in config.relations {
            if name.trim().is_empty() {
                return Err(SyncError::Configuration(
                    "relation names cannot be empty".to_string(),
                ));
            }
            if relations.contains(&name) {
                return Err(SyncError::Configuration(format!(
                    "relation '{}' is listed more than once",
                    name
                )));
            }
            relations.push(name);
        }

        let suffix = config.suffix.unwrap_or_else(|| DEFAULT_SUFFIX.to_string());
        if suffix.is_empty() {
            return Err(SyncError::Configuration("suffix cannot be empty".to_string()));
        }

        for (property, relation) in &config.aliases {
            if !relations.contains(relation) {
                return Err(SyncError::Configuration(format!(
                    "alias '{}' points to unconfigured relation '{}'",
                    property, relation
                )));
            }
            if relations.contains(property) {
                return Err(SyncError::Configuration(format!(
                    "alias '{}' shadows a relation of the same name",
                    property
                )));
            }
        }

        let registry = RelationRegistry {
            relations,
            suffix,
            aliases: config.aliases,
        };

        // A suffixed property must never be a relation name itself,
        // otherwise `get("tagsids")` would be ambiguous.
        for name in &registry.relations {
            if let Some(base) = registry.property_base(name) {
                if registry.contains(base) {
                    return Err(SyncError::Configuration(format!(
                        "relation '{}' collides with the '{}' property of relation '{}'",
                        name, registry.suffix, base
                    )));
                }
            }
        }

        log::debug!(
            "Relation registry: relations={:?}, suffix='{}', aliases={}",
            registry.relations,
            registry.suffix,
            registry.aliases.len()
        );

        Ok(registry)
    }

    /// Configured relation names, in configuration order
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// Case-sensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.relations.iter().any(|r| r == name)
    }

    /// Fail with `UnknownRelation` unless `name` is configured
    pub fn require(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(SyncError::unknown_relation(
                name,
                "not in the configured relation list",
            ))
        }
    }

    /// Map a property name to the relation it exposes.
    ///
    /// Alias table first, then suffix stripping. The suffix is compared
    /// ASCII case-insensitively (`tagsIds`), the relation name is not.
    pub fn resolve_property<'a>(&'a self, property: &'a str) -> Option<&'a str> {
        if let Some(relation) = self.aliases.get(property) {
            return Some(relation.as_str());
        }

        let base = self.property_base(property)?;
        self.contains(base).then_some(base)
    }

    /// Property name under which a relation's identifiers are exposed
    pub fn property_name(&self, relation: &str) -> String {
        self.aliases
            .iter()
            .find(|(_, target)| target.as_str() == relation)
            .map(|(property, _)| property.clone())
            .unwrap_or_else(|| format!("{}{}", relation, self.suffix))
    }

    /// Relation part of a suffixed property name, with an optional `_` separator
    fn property_base<'a>(&self, property: &'a str) -> Option<&'a str> {
        let base = self.strip_suffix(property)?;
        Some(base.strip_suffix('_').unwrap_or(base))
    }

    fn strip_suffix<'a>(&self, property: &'a str) -> Option<&'a str> {
        let len = self.suffix.len();
        if property.len() <= len || !property.is_char_boundary(property.len() - len) {
            return None;
        }

        let (base, tail) = property.split_at(property.len() - len);
        tail.eq_ignore_ascii_case(&self.suffix).then_some(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RelationRegistry {
        RelationRegistry::new(BehaviorConfig::new(["tags", "categories"]).with_alias("labels", "tags"))
            .unwrap()
    }

    #[test]
    fn test_empty_relations_rejected() {
        let err = RelationRegistry::new(BehaviorConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cases = vec![
            BehaviorConfig::new(["tags", "tags"]),
            BehaviorConfig::new(["tags", " "]),
            BehaviorConfig::new(["tags"]).with_suffix(""),
            BehaviorConfig::new(["tags"]).with_alias("labels", "missing"),
            BehaviorConfig::new(["tags", "categories"]).with_alias("categories", "tags"),
            BehaviorConfig::new(["tags", "tagsids"]),
            BehaviorConfig::new(["tags", "tags_ids"]),
            BehaviorConfig::new(["tags", "tags_IDS"]),
        ];

        for config in cases {
            let err = RelationRegistry::new(config.clone()).unwrap_err();
            assert!(
                matches!(err, SyncError::Configuration(_)),
                "expected configuration error for {:?}",
                config
            );
        }
    }

    #[test]
    fn test_resolve_property_by_suffix() {
        let registry = registry();

        assert_eq!(registry.resolve_property("tagsIds"), Some("tags"));
        assert_eq!(registry.resolve_property("tagsids"), Some("tags"));
        assert_eq!(registry.resolve_property("categories_ids"), Some("categories"));
        assert_eq!(registry.resolve_property("tags"), None);
        assert_eq!(registry.resolve_property("ids"), None);
        // relation names stay case-sensitive
        assert_eq!(registry.resolve_property("TagsIds"), None);
    }

    #[test]
    fn test_resolve_property_prefers_alias() {
        let registry = registry();

        assert_eq!(registry.resolve_property("labels"), Some("tags"));
        assert_eq!(registry.property_name("tags"), "labels");
        assert_eq!(registry.property_name("categories"), "categoriesids");
    }

    #[test]
    fn test_require_unknown_relation() {
        let err = registry().require("authors").unwrap_err();
        assert!(err.is_unknown_relation());
    }

    #[test]
    fn test_config_from_toml() {
        let config = BehaviorConfig::from_toml_str(
            r#"
relations = ["tags", "categories"]
suffix = "Raw"

[aliases]
tag_list = "tags"
"#,
        )
        .unwrap();

        assert_eq!(config.relations, vec!["tags", "categories"]);
        assert_eq!(config.suffix.as_deref(), Some("Raw"));

        let registry = RelationRegistry::new(config).unwrap();
        assert_eq!(registry.resolve_property("tagsRaw"), Some("tags"));
        assert_eq!(registry.resolve_property("tag_list"), Some("tags"));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "relations = [\"tags\"]\n").unwrap();

        let config = BehaviorConfig::load(&path).unwrap();
        assert_eq!(config, BehaviorConfig::new(["tags"]));

        assert!(BehaviorConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
