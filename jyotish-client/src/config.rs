use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JyotishConfig {
    /// Base URL of the jyotish backend, e.g. "http://localhost:8000"
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for JyotishConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

impl JyotishConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("jyotish")
            .join("config.toml"))
    }

    /// Load config from disk. Returns default config if the file doesn't
    /// exist. `JYOTISH_API_URL` in the environment wins over both.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("JYOTISH_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(&path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_localhost() {
        let config = JyotishConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: JyotishConfig = toml::from_str("").unwrap();
        assert_eq!(config.api_url, default_api_url());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = JyotishConfig {
            api_url: "https://api.example.com".to_string(),
        };
        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: JyotishConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.api_url, config.api_url);
    }
}
