//! agl configuration
//!
//! Settings for scenes and the animation runner, loaded from `agl.toml` with
//! `AGL_*` environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "agl.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AglConfig {
    /// Animation runner settings
    pub animation: AnimationConfig,
    /// Scene rendering settings
    pub rendering: RenderingConfig,
    /// Window/headless surface size
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// When false, animations jump straight to their target values
    pub enabled: bool,
    /// Default transition length in milliseconds
    pub duration_ms: u32,
    /// Frame clock interval in milliseconds
    pub frame_interval_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderingConfig {
    /// Frame clear colour, packed 0xRRGGBBAA
    pub background: u32,
    /// Enable the render cache on newly created actors
    pub cache_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 300,
            frame_interval_ms: 1000 / 60,
        }
    }
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            background: 0x000000ff,
            cache_by_default: false,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 640, height: 480 }
    }
}

fn env_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

/// Parse `0xRRGGBBAA`, `#RRGGBBAA` or plain hex.
fn parse_colour(val: &str) -> Option<u32> {
    let hex = val
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('#');
    u32::from_str_radix(hex, 16).ok()
}

impl AglConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `agl.toml` from the current directory, or defaults if it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Override values with `AGL_*` environment variables when present
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("AGL_ANIMATIONS") {
            self.animation.enabled = env_flag(&val);
        }
        if let Ok(val) = std::env::var("AGL_TRANSITION_MS") {
            if let Ok(ms) = val.parse::<u32>() {
                self.animation.duration_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("AGL_FRAME_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u32>() {
                if ms > 0 {
                    self.animation.frame_interval_ms = ms;
                }
            }
        }
        if let Ok(val) = std::env::var("AGL_BACKGROUND") {
            if let Some(colour) = parse_colour(&val) {
                self.rendering.background = colour;
            }
        }
        if let Ok(val) = std::env::var("AGL_CACHE") {
            self.rendering.cache_by_default = env_flag(&val);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from agl.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AglConfig::default();
        assert!(config.animation.enabled);
        assert_eq!(config.animation.duration_ms, 300);
        assert_eq!(config.animation.frame_interval_ms, 16);
        assert_eq!(config.rendering.background, 0x000000ff);
        assert!(!config.rendering.cache_by_default);
        assert_eq!((config.window.width, config.window.height), (640, 480));
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = AglConfig::default();
        config.rendering.background = 0x336699ff;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AglConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: AglConfig = toml::from_str("[animation]\nduration_ms = 120\n").unwrap();
        assert_eq!(parsed.animation.duration_ms, 120);
        assert!(parsed.animation.enabled);
        assert_eq!(parsed.window.width, 640);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = AglConfig::load_from_file("/nonexistent/agl.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("agl-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[rendering]\ncache_by_default = true\n").unwrap();
        let config = AglConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(config.rendering.cache_by_default);
    }

    #[test]
    fn test_parse_error() {
        let path = std::env::temp_dir().join(format!("agl-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[animation\n").unwrap();
        let err = AglConfig::load_from_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_parse_colour() {
        assert_eq!(parse_colour("0xff00ffff"), Some(0xff00ffff));
        assert_eq!(parse_colour("#10203040"), Some(0x10203040));
        assert_eq!(parse_colour("nope"), None);
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("AGL_ANIMATIONS", "false");
            std::env::set_var("AGL_TRANSITION_MS", "50");
            std::env::set_var("AGL_BACKGROUND", "0x112233ff");
        }

        let mut config = AglConfig::default();
        config.merge_with_env();

        assert!(!config.animation.enabled);
        assert_eq!(config.animation.duration_ms, 50);
        assert_eq!(config.rendering.background, 0x112233ff);

        unsafe {
            std::env::remove_var("AGL_ANIMATIONS");
            std::env::remove_var("AGL_TRANSITION_MS");
            std::env::remove_var("AGL_BACKGROUND");
        }
    }
}
