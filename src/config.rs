use anyhow::{anyhow, Result};
use colored::Colorize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Entry name to specifier, in configuration order. The order decides
    /// entry-chunk ordering and shared-chunk naming ties.
    pub entry: IndexMap<String, String>,
    /// Extract modules reachable from several entries into shared chunks
    /// instead of duplicating them.
    pub splitting: bool,
    /// Duplicate a worker chunk's dependencies into it so the worker loads
    /// without any shared chunk.
    pub isolate_workers: bool,
    pub tree_shaking: bool,
    pub fold_constants: bool,
}

const DEFAULT_CONFIG: &str = r#"
{
    "entry": {},
    "splitting": false,
    "isolateWorkers": true,
    "treeShaking": true,
    "foldConstants": true
}
"#;

impl Config {
    pub fn new(user_config: Option<&str>) -> Result<Self> {
        match user_config {
            Some(content) => serde_json::from_str::<Config>(content)
                .map_err(|e| anyhow!("{}: {}", "config error".red(), e)),
            None => Ok(Config::default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // The derived deserializer evaluates the container-level
        // serde(default) unconditionally, so this impl must not itself go
        // through serde_json or the two recurse forever. The values mirror
        // DEFAULT_CONFIG.
        Self {
            entry: IndexMap::new(),
            splitting: false,
            isolate_workers: true,
            tree_shaking: true,
            fold_constants: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.entry.is_empty());
        assert!(!config.splitting);
        assert!(config.isolate_workers);
        assert!(config.tree_shaking);
        assert!(config.fold_constants);
    }

    #[test]
    fn test_partial_user_config_keeps_defaults() {
        let config = Config::new(Some(r#"{ "splitting": true }"#)).unwrap();
        assert!(config.splitting);
        assert!(config.isolate_workers);
    }

    #[test]
    fn test_entry_order_is_kept() {
        let config = Config::new(Some(
            r#"{ "entry": { "main": "./src/main.js", "admin": "./src/admin.js" } }"#,
        ))
        .unwrap();
        let names: Vec<&str> = config.entry.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["main", "admin"]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(Config::new(Some(r#"{ "splitting": "yes" }"#)).is_err());
    }
}
