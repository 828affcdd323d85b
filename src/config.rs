//! Operator CLI configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the JSON state document the CLI reads and rewrites
    pub state_path: String,

    /// Asset account that holds every fund's pooled deposits
    pub custodian: String,
}

impl Config {
    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        let config_path = Self::path();

        let config_str = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config file: {}", config_path))?;

        let config: Config =
            toml::from_str(&config_str).context("Failed to parse config TOML")?;

        Ok(config)
    }

    /// Config file location: `CUSTODY_CONFIG` env override, else `custody.toml`
    pub fn path() -> String {
        std::env::var("CUSTODY_CONFIG").unwrap_or_else(|_| "custody.toml".to_string())
    }

    pub fn default_local() -> Self {
        Self {
            state_path: "custody-state.json".to_string(),
            custodian: "custody-vault".to_string(),
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, toml_str).context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default_local();
        assert_eq!(config.state_path, "custody-state.json");
        assert_eq!(config.custodian, "custody-vault");
    }
}
