//! Configuration file parser for ~/.config/keypilot/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos. The file is reloadable at runtime; the
//! demo driver reloads it on SIGHUP.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key sequence overrides. Keys are command names, values are sequences.
    pub keymap: HashMap<String, String>,

    /// Glob-like address patterns where the interpreter is disabled.
    pub exclusions: Vec<String>,

    /// Lines scrolled by a step motion.
    pub scroll_step: usize,

    /// Animate scroll motions where the page supports it.
    pub smooth_scrolling: bool,

    /// Characters used to build hint labels, lowest-first.
    pub hint_alphabet: String,

    /// Disambiguation window for ambiguous key sequences, in milliseconds.
    pub sequence_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keymap: HashMap::new(),
            exclusions: Vec::new(),
            scroll_step: 60,
            smooth_scrolling: true,
            hint_alphabet: crate::hints::DEFAULT_ALPHABET.to_string(),
            sequence_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to warn about unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "keymap",
                "exclusions",
                "scroll_step",
                "smooth_scrolling",
                "hint_alphabet",
                "sequence_timeout_ms",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            overrides = config.keymap.len(),
            exclusions = config.exclusions.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The hint alphabet as characters, falling back to the default when the
    /// configured value is unusable.
    pub fn hint_alphabet_chars(&self) -> Vec<char> {
        let mut chars: Vec<char> = Vec::new();
        for c in self.hint_alphabet.to_lowercase().chars() {
            if c.is_alphabetic() && !chars.contains(&c) {
                chars.push(c);
            }
        }
        if chars.is_empty() {
            tracing::warn!(
                alphabet = %self.hint_alphabet,
                "Unusable hint alphabet, falling back to default"
            );
            return crate::hints::DEFAULT_ALPHABET.chars().collect();
        }
        chars
    }

    /// The sequence disambiguation window. A zero timeout fires deferred
    /// commands on the next tick, which still satisfies the resolver contract.
    pub fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
