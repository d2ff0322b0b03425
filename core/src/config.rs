//! Configuration
//!
//! Layered configuration for the chat pipeline, loaded with the following
//! priority (highest first):
//!
//! 1. Environment variables (`PITCHLINE_*`)
//! 2. TOML configuration file
//! 3. Default values
//!
//! The configuration file follows the XDG Base Directory layout:
//! `$XDG_CONFIG_HOME/pitchline/pitchline.toml` (typically
//! `~/.config/pitchline/pitchline.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoint]
//! url = "http://192.168.0.104:5000/process_prompt"
//! wire = "prompt"
//!
//! [chat]
//! model = "llama3.2:1b"
//! mode = "accumulating"
//! format = "plain"
//! system_prompt = "You are a helpful marketing assistant."
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{OutputFormat, PortalBackend, WireBody};
use crate::protocol::ProtocolMode;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was syntactically valid TOML but not a recognized setting.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Resolved configuration for the chat pipeline.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Inference endpoint URL.
    pub endpoint: String,
    /// JSON body shape the endpoint accepts.
    pub wire: WireBody,
    /// Model identifier for chat-completion-style payloads.
    pub model: String,
    /// Message assembly mode (per-deployment protocol variant).
    pub mode: ProtocolMode,
    /// Desired output shape, selecting the default system prompt.
    pub format: OutputFormat,
    /// Explicit system prompt override.
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: PortalBackend::DEFAULT_ENDPOINT.to_string(),
            wire: WireBody::default(),
            model: "llama3.2:1b".to_string(),
            mode: ProtocolMode::default(),
            format: OutputFormat::default(),
            system_prompt: None,
        }
    }
}

impl ChatConfig {
    /// Build configuration from environment variables alone.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `PITCHLINE_*` environment variables onto this config.
    ///
    /// Unparseable mode/format/wire values are logged and ignored rather
    /// than failing startup.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("PITCHLINE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("PITCHLINE_MODEL") {
            self.model = model;
        }
        if let Ok(mode) = std::env::var("PITCHLINE_MODE") {
            match ProtocolMode::parse(&mode) {
                Some(mode) => self.mode = mode,
                None => tracing::warn!(value = %mode, "Ignoring invalid PITCHLINE_MODE"),
            }
        }
        if let Ok(format) = std::env::var("PITCHLINE_FORMAT") {
            match OutputFormat::parse(&format) {
                Some(format) => self.format = format,
                None => tracing::warn!(value = %format, "Ignoring invalid PITCHLINE_FORMAT"),
            }
        }
        if let Ok(wire) = std::env::var("PITCHLINE_WIRE") {
            match WireBody::parse(&wire) {
                Some(wire) => self.wire = wire,
                None => tracing::warn!(value = %wire, "Ignoring invalid PITCHLINE_WIRE"),
            }
        }
        if let Ok(system) = std::env::var("PITCHLINE_SYSTEM_PROMPT") {
            self.system_prompt = Some(system);
        }
    }

    /// Overlay a parsed TOML file onto this config.
    ///
    /// Unrecognized mode/format/wire names in the file are validation
    /// errors: a file is deliberate configuration, unlike ambient env vars.
    pub fn apply_file(&mut self, file: PitchlineToml) -> Result<(), ConfigError> {
        if let Some(url) = file.endpoint.url {
            self.endpoint = url;
        }
        if let Some(wire) = file.endpoint.wire {
            self.wire = WireBody::parse(&wire)
                .ok_or_else(|| ConfigError::Validation(format!("unknown wire body: {wire}")))?;
        }
        if let Some(model) = file.chat.model {
            self.model = model;
        }
        if let Some(mode) = file.chat.mode {
            self.mode = ProtocolMode::parse(&mode)
                .ok_or_else(|| ConfigError::Validation(format!("unknown protocol mode: {mode}")))?;
        }
        if let Some(format) = file.chat.format {
            self.format = OutputFormat::parse(&format)
                .ok_or_else(|| ConfigError::Validation(format!("unknown output format: {format}")))?;
        }
        if let Some(system) = file.chat.system_prompt {
            self.system_prompt = Some(system);
        }
        Ok(())
    }
}

/// Endpoint section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointToml {
    /// Inference endpoint URL.
    pub url: Option<String>,
    /// JSON body shape: `prompt` or `chat`.
    pub wire: Option<String>,
}

/// Chat section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Model identifier.
    pub model: Option<String>,
    /// Protocol variant: `discrete` or `accumulating`.
    pub mode: Option<String>,
    /// Output format: `plain`, `table`, or `document`.
    pub format: Option<String>,
    /// System prompt override.
    pub system_prompt: Option<String>,
}

/// Top-level TOML configuration structure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchlineToml {
    /// Endpoint configuration section.
    pub endpoint: EndpointToml,
    /// Chat configuration section.
    pub chat: ChatToml,
}

/// Default configuration file path under the XDG config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pitchline").join("pitchline.toml"))
}

/// Load configuration: defaults, then the default config file when present,
/// then environment variables.
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();
    if let Some(path) = default_config_path() {
        if path.exists() {
            config.apply_file(read_toml(&path)?)?;
        }
    }
    config.apply_env();
    Ok(config)
}

/// Load configuration from an explicit file path plus environment.
pub fn load_config_from_path(path: &Path) -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();
    config.apply_file(read_toml(path)?)?;
    config.apply_env();
    Ok(config)
}

fn read_toml(path: &Path) -> Result<PitchlineToml, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.endpoint, PortalBackend::DEFAULT_ENDPOINT);
        assert_eq!(config.model, "llama3.2:1b");
        assert_eq!(config.mode, ProtocolMode::Accumulating);
        assert_eq!(config.format, OutputFormat::Plain);
        assert_eq!(config.system_prompt, None);
    }

    #[test]
    fn test_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[endpoint]\nurl = \"http://10.0.0.9:5000/process_prompt\"\n\n\
             [chat]\nmode = \"discrete\"\nformat = \"table\"\nmodel = \"llama3.2:3b\""
        )
        .unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.9:5000/process_prompt");
        assert_eq!(config.mode, ProtocolMode::Discrete);
        assert_eq!(config.format, OutputFormat::TableSummary);
        assert_eq!(config.model, "llama3.2:3b");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chat]\nmodel = \"llama3.1\"").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.endpoint, PortalBackend::DEFAULT_ENDPOINT);
        assert_eq!(config.mode, ProtocolMode::Accumulating);
    }

    #[test]
    fn test_unknown_mode_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chat]\nmode = \"simultaneous\"").unwrap();

        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_broken_toml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chat\nmodel=").unwrap();

        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overlay() {
        std::env::set_var("PITCHLINE_MODEL", "llama-env");
        std::env::set_var("PITCHLINE_MODE", "discrete");
        std::env::set_var("PITCHLINE_FORMAT", "not-a-format");

        let config = ChatConfig::from_env();
        assert_eq!(config.model, "llama-env");
        assert_eq!(config.mode, ProtocolMode::Discrete);
        // Invalid values are ignored, not fatal.
        assert_eq!(config.format, OutputFormat::Plain);

        std::env::remove_var("PITCHLINE_MODEL");
        std::env::remove_var("PITCHLINE_MODE");
        std::env::remove_var("PITCHLINE_FORMAT");
    }
}
