//! # Configuration Management Module
//!
//! TOML configuration for the petconomy engine and its operator console.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where the sled database lives
//! - [`LoggingConfig`] - log level and optional log file
//! - [`EconomyConfig`] - daily and work claim windows and payouts
//! - [`MinigameSettings`] - success curve, scene weights and per-activity tuning
//! - [`RateLimitSettings`] - anti-spam window for rate-limited activities
//! - [`PetSettings`] - neglect threshold, recall floor and exploration quota
//!
//! Every section is optional in the file; missing sections and fields fall back
//! to the defaults shown below.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use petconomy::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Database: {}", config.storage.db_path().display());
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//!
//! [economy.daily]
//! cooldown_secs = 86400
//! min = 100
//! max = 250
//!
//! [minigame]
//! base_success = 0.8
//!
//! [minigame.fishing]
//! cooldown_secs = 120
//! k = 0.35
//!
//! [rate_limit]
//! window_ms = 60000
//! max_hits = 5
//!
//! [pets]
//! neglect_threshold_hours = 48
//! ```

use anyhow::{anyhow, bail, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::economy::{ActivityKind, MinigameSettings, PetSettings, RateLimitSettings, RewardRange};

/// Longest window accepted for any cooldown, threshold or rate-limit setting.
pub const MAX_WINDOW_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// sled directory; defaults to `<data_dir>/economy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("economy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// A cooldown-gated currency claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimConfig {
    pub cooldown_secs: i64,
    pub min: i64,
    pub max: i64,
}

impl ClaimConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs.max(0))
    }

    pub fn reward(&self) -> RewardRange {
        RewardRange::new(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EconomyConfig {
    pub daily: ClaimConfig,
    pub work: ClaimConfig,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            daily: ClaimConfig {
                cooldown_secs: 24 * 60 * 60,
                min: 100,
                max: 250,
            },
            work: ClaimConfig {
                cooldown_secs: 60 * 60,
                min: 25,
                max: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub economy: EconomyConfig,
    pub minigame: MinigameSettings,
    pub rate_limit: RateLimitSettings,
    pub pets: PetSettings,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Reject values the engine cannot use: non-finite or out-of-range
    /// probabilities and windows too large to add to a timestamp.
    pub fn validate(&self) -> Result<()> {
        let minigame = &self.minigame;
        for (name, value) in [
            ("minigame.base_success", minigame.base_success),
            ("minigame.lower_bound", minigame.lower_bound),
            ("minigame.upper_bound", minigame.upper_bound),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be between 0 and 1, got {}", name, value);
            }
        }
        if minigame.lower_bound > minigame.upper_bound {
            bail!(
                "minigame.lower_bound ({}) exceeds minigame.upper_bound ({})",
                minigame.lower_bound,
                minigame.upper_bound
            );
        }
        for kind in ActivityKind::ALL {
            let tuning = minigame.tuning(kind);
            if !tuning.k.is_finite() {
                bail!("minigame.{}.k must be a finite number", kind.as_str());
            }
            if let Some(secs) = tuning.cooldown_secs {
                check_window(&format!("minigame.{}.cooldown_secs", kind.as_str()), secs)?;
            }
        }
        check_window("economy.daily.cooldown_secs", self.economy.daily.cooldown_secs)?;
        check_window("economy.work.cooldown_secs", self.economy.work.cooldown_secs)?;
        check_window("rate_limit.window_ms", self.rate_limit.window_ms / 1000)?;
        check_window(
            "pets.neglect_threshold_hours",
            self.pets.neglect_threshold_hours.saturating_mul(60 * 60),
        )?;
        Ok(())
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

fn check_window(name: &str, secs: i64) -> Result<()> {
    if !(0..=MAX_WINDOW_SECS).contains(&secs) {
        bail!("{} is out of range: {}", name, secs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.economy.daily.cooldown(), Duration::hours(24));
        assert_eq!(config.economy.daily.reward(), RewardRange::new(100, 250));
        assert_eq!(config.economy.work.reward(), RewardRange::new(25, 60));
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.pets.neglect_threshold_hours, 48);
        assert_eq!(
            config.minigame.tuning(ActivityKind::Fishing).cooldown(),
            Some(Duration::seconds(120))
        );
        assert_eq!(config.minigame.tuning(ActivityKind::Foraging).cooldown(), None);
    }

    #[test]
    fn test_db_path_defaults_under_data_dir() {
        let storage = StorageConfig {
            data_dir: "/srv/bot".to_string(),
            db_path: None,
        };
        assert_eq!(storage.db_path(), PathBuf::from("/srv/bot/economy"));
        let storage = StorageConfig {
            db_path: Some("/var/lib/economy".to_string()),
            ..storage
        };
        assert_eq!(storage.db_path(), PathBuf::from("/var/lib/economy"));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [minigame.mining]
            cooldown_secs = 30
            k = 0.5

            [pets]
            neglect_threshold_hours = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.minigame.mining.cooldown_secs, Some(30));
        assert_eq!(config.minigame.fishing.cooldown_secs, Some(120));
        assert_eq!(config.pets.neglect_threshold_hours, 12);
        assert_eq!(config.pets.return_care_floor, 30);
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[test]
    fn test_default_config_serde_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_unusable_values_are_rejected() {
        let mut config = Config::default();
        config.minigame.lower_bound = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.minigame.lower_bound = 0.9;
        config.minigame.upper_bound = 0.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pets.neglect_threshold_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.minigame.fishing.cooldown_secs = Some(-5);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_nan_bounds() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[minigame]\nupper_bound = nan\n").unwrap();
        let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("minigame.upper_bound"), "{}", err);
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded, Config::default());
    }
}
