use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::voice::synthesizer::VoiceParams;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub speech: SpeechConfig,
    pub summary: SummaryConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8622 } // VOCA on a phone keypad
    }
}

/// Generative-text backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Instructions used when a session is started without its own.
    pub default_instructions: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Some("openai-chat".to_string()),
            api_endpoint: None,
            api_key: None,
            model: None,
            default_instructions: "You are a helpful meeting assistant.".to_string(),
        }
    }
}

/// Text-to-speech backend configuration. Synthesis is enabled only when an
/// API key is present; otherwise responses are recorded text-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub language_code: String,
    pub voice_name: String,
    pub sample_rate_hertz: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let voice = VoiceParams::default();
        Self {
            api_endpoint: None,
            api_key: None,
            language_code: voice.language_code,
            voice_name: voice.voice_name,
            sample_rate_hertz: voice.sample_rate_hertz,
        }
    }
}

impl SpeechConfig {
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            language_code: self.language_code.clone(),
            voice_name: self.voice_name.clone(),
            sample_rate_hertz: self.sample_rate_hertz,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Generate a meeting summary when a call ends.
    pub enabled: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
