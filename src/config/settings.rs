//! Configuration settings for Laer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chat: ChatSettings,
    pub capabilities: CapabilitySettings,
    pub artifacts: ArtifactSettings,
    pub weather: WeatherSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.laer".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat and orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// LLM model driving the orchestrator.
    pub model: String,
    /// Maximum number of capability-invocation rounds per turn.
    pub step_budget: usize,
    /// Maximum number of conversation messages kept per session.
    pub history_limit: usize,
    /// Request timeout for OpenAI API calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            step_budget: 8,
            history_limit: 30,
            request_timeout_secs: 300,
        }
    }
}

/// Capability configuration.
///
/// Per-capability model overrides fall back to the chat model when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct CapabilitySettings {
    /// Capability names disabled for every turn.
    pub disabled: Vec<String>,
    /// Model override for the tutor capability.
    pub tutor_model: Option<String>,
    /// Model override for the analyst capability.
    pub analyst_model: Option<String>,
    /// Model override for quiz generation.
    pub quiz_model: Option<String>,
    /// Model override for study plan generation.
    pub planner_model: Option<String>,
    /// Model override for artifact updates.
    pub update_model: Option<String>,
}

impl CapabilitySettings {
    /// Resolve a capability model override against the chat model.
    pub fn model_for<'a>(&'a self, override_model: &'a Option<String>, chat: &'a str) -> &'a str {
        override_model.as_deref().unwrap_or(chat)
    }
}

/// Artifact store provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStoreProvider {
    /// SQLite-backed store (default).
    #[default]
    Sqlite,
    /// In-memory store, useful for ephemeral sessions and testing.
    Memory,
}

impl std::str::FromStr for ArtifactStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(ArtifactStoreProvider::Sqlite),
            "memory" => Ok(ArtifactStoreProvider::Memory),
            _ => Err(format!("Unknown artifact store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ArtifactStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactStoreProvider::Sqlite => write!(f, "sqlite"),
            ArtifactStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Artifact persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// Store provider (sqlite, memory).
    pub provider: ArtifactStoreProvider,
    /// Path to the SQLite database (for the sqlite provider).
    pub sqlite_path: String,
    /// Default owner recorded on saved artifacts.
    pub owner: Option<String>,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            provider: ArtifactStoreProvider::Sqlite,
            sqlite_path: "~/.laer/artifacts.db".to_string(),
            owner: None,
        }
    }
}

/// Weather capability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// Geocoding endpoint (Open-Meteo compatible).
    pub geocoding_url: String,
    /// Forecast endpoint (Open-Meteo compatible).
    pub forecast_url: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LaerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("laer")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded artifact database path.
    pub fn artifacts_db_path(&self) -> PathBuf {
        Self::expand_path(&self.artifacts.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_round_trip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.chat.model, settings.chat.model);
        assert_eq!(parsed.chat.step_budget, 8);
        assert_eq!(parsed.artifacts.provider, ArtifactStoreProvider::Sqlite);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            [chat]
            model = "gpt-4.1"
            step_budget = 3
            "#,
        )
        .unwrap();

        assert_eq!(parsed.chat.model, "gpt-4.1");
        assert_eq!(parsed.chat.step_budget, 3);
        assert_eq!(parsed.general.log_level, "info");
        assert!(parsed.capabilities.disabled.is_empty());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(
            "memory".parse::<ArtifactStoreProvider>().unwrap(),
            ArtifactStoreProvider::Memory
        );
        assert!("postgres".parse::<ArtifactStoreProvider>().is_err());
    }
}
