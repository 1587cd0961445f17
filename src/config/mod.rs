use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::features::Feature;

const DEFAULT_CREDITS: u32 = 100;

fn default_credits() -> u32 {
    DEFAULT_CREDITS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local credit balance shown in the dashboard
    #[serde(default = "default_credits")]
    pub credits: u32,

    /// Desktop notification when a feature runs
    #[serde(default)]
    pub notifications: bool,

    /// Where the local storage file lives (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// Extra features, or overrides of built-in ones by id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,

    /// Hex color overrides keyed by theme slot (accent, danger, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub theme: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credits: DEFAULT_CREDITS,
            notifications: false,
            features: Vec::new(),
            theme: HashMap::new(),
            storage_path: None,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("creditgate");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Drop configured features that could never be shown
        let mut clean_config = self.clone();
        clean_config
            .features
            .retain(|f| !f.id.trim().is_empty() && !f.name.trim().is_empty());

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Storage file location, honoring the override
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage_path
            .clone()
            .or_else(crate::storage::LocalStorage::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            credits: 42,
            notifications: true,
            features: vec![Feature {
                id: "photo-audit".to_string(),
                name: "사진 점검".to_string(),
                credits: 3,
                detail: None,
            }],
            theme: HashMap::from([("accent".to_string(), "#ffc107".to_string())]),
            storage_path: Some(PathBuf::from("/tmp/creditgate/storage.toml")),
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.credits, 42);
        assert_eq!(deserialized.features, config.features);
        assert_eq!(deserialized.theme.get("accent").map(String::as_str), Some("#ffc107"));
        assert_eq!(deserialized.storage_path, config.storage_path);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.credits, DEFAULT_CREDITS);
        assert!(!config.notifications);
        assert!(config.features.is_empty());
    }
}
