use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure for featdoc
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Feature file loading settings
    pub loader: LoaderSettings,
}

/// Settings for reading and decoding feature files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderSettings {
    /// Encoding label used for files without a byte order mark
    pub fallback_encoding: String,
    /// Read buffer size in bytes
    pub buffer_size: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            fallback_encoding: "utf-8".to_string(),
            buffer_size: 8 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get configuration file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User-specific config
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(&home).join(".featdoc").join("config.toml"));
            paths.push(PathBuf::from(&home).join(".config").join("featdoc").join("config.toml"));
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/featdoc/config.toml"));

        // Current directory
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join(".featdoc.toml"));
            paths.push(current_dir.join("featdoc.toml"));
        }

        paths
    }

    /// Load configuration with automatic path discovery
    pub fn load() -> ConfigResult<Self> {
        Self::load_with_paths(&Self::config_paths())
    }

    /// Load configuration with custom search paths
    pub fn load_with_paths(paths: &[PathBuf]) -> ConfigResult<Self> {
        for path in paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return default configuration if no config file found
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.loader.buffer_size == 0 {
            return Err(ConfigError::Validation(
                "Buffer size must be greater than 0".to_string(),
            ));
        }
        if encoding_rs::Encoding::for_label(self.loader.fallback_encoding.trim().as_bytes())
            .is_none()
        {
            return Err(ConfigError::Validation(format!(
                "Unknown fallback encoding '{}'",
                self.loader.fallback_encoding
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.loader.fallback_encoding, "utf-8");
        assert_eq!(config.loader.buffer_size, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
            [loader]
            fallback_encoding = "windows-1252"
            buffer_size = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.loader.fallback_encoding, "windows-1252");
        assert_eq!(config.loader.buffer_size, 4096);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = Config::from_toml_str("[loader]\nbuffer_size = 16\n").unwrap();
        assert_eq!(config.loader.fallback_encoding, "utf-8");
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_validation_errors() {
        let zero = Config::from_toml_str("[loader]\nbuffer_size = 0\n");
        assert!(matches!(zero, Err(ConfigError::Validation(_))));

        let unknown = Config::from_toml_str("[loader]\nfallback_encoding = \"klingon\"\n");
        assert!(matches!(unknown, Err(ConfigError::Validation(msg)) if msg.contains("klingon")));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(Config::from_toml_str("[loader"), Err(ConfigError::Toml(_))));
        assert!(matches!(
            Config::from_toml_str("[loader]\ncolour = \"red\"\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_with_paths_first_existing_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(&first, "[loader]\nbuffer_size = 1\n").unwrap();
        fs::write(&second, "[loader]\nbuffer_size = 2\n").unwrap();

        let config = Config::load_with_paths(&[missing, first, second]).unwrap();
        assert_eq!(config.loader.buffer_size, 1);
    }

    #[test]
    fn test_load_with_no_paths_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with_paths(&[dir.path().join("none.toml")]).unwrap();
        assert_eq!(config, Config::default());
    }
}
