use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::ChallengeCatalog;

/// Project directory holding configuration and data
pub const PROJECT_DIR: &str = ".promptcraft";

/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "PROMPTCRAFT_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid pass_threshold: {0}. Must be between 0 and 100")]
    InvalidPassThreshold(f64),

    #[error("Invalid jpeg_quality: {0}. Must be between 1 and 100")]
    InvalidJpegQuality(u8),

    #[error("Invalid max_canvas_dimension: {0}. Must be at least 1")]
    InvalidCanvasDimension(u32),

    #[error("Invalid requests_per_second: {0}. Must be zero (unlimited) or positive")]
    InvalidRateLimit(f64),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid challenge catalog: {0}")]
    InvalidCatalog(#[from] crate::domain::error::CatalogError),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Storage path cannot be empty")]
    EmptyStoragePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .promptcraft/config.yaml (project config, created by init)
    /// 3. .promptcraft/local.yaml (local overrides, optional)
    /// 4. Environment variables (PROMPTCRAFT_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(PROJECT_DIR)
    }

    /// Same as [`load`](Self::load), rooted at `dir` instead of `.promptcraft`
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, environment still applied
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        ChallengeCatalog::new(config.catalog.clone())?;

        let threshold = config.scoring.pass_threshold;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::InvalidPassThreshold(threshold));
        }

        let rps = config.scoring.requests_per_second;
        if !rps.is_finite() || rps < 0.0 {
            return Err(ConfigError::InvalidRateLimit(rps));
        }

        if config.scoring.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(config.scoring.max_tokens));
        }

        if config.generation.initial_backoff_ms > config.generation.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.generation.initial_backoff_ms,
                config.generation.max_backoff_ms,
            ));
        }

        if !(1..=100).contains(&config.compositor.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(config.compositor.jpeg_quality));
        }

        if config.compositor.max_canvas_dimension == 0 {
            return Err(ConfigError::InvalidCanvasDimension(
                config.compositor.max_canvas_dimension,
            ));
        }

        if config.storage.path.trim().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }

        if config.storage.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.storage.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }

    /// Default `config.yaml` written by `promptcraft init`
    pub fn default_yaml() -> String {
        DEFAULT_CONFIG_YAML.to_string()
    }
}

const DEFAULT_CONFIG_YAML: &str = r#"# Promptcraft configuration
#
# Environment variables override this file: PROMPTCRAFT_SCORING__PASS_THRESHOLD=80

scoring:
  base_url: https://api.anthropic.com
  model: claude-3-5-sonnet-20241022
  # api_key: falls back to ANTHROPIC_API_KEY
  max_tokens: 1024
  timeout_secs: 120
  requests_per_second: 2.0
  # Minimum similarity score (0-100) that counts as a pass
  pass_threshold: 70.0

generation:
  base_url: https://api.openai.com/v1
  model: dall-e-3
  # api_key: falls back to OPENAI_API_KEY
  size: 1024x1024
  timeout_secs: 120
  max_retries: 2
  initial_backoff_ms: 1000
  max_backoff_ms: 30000

compositor:
  # jpeg or png
  format: jpeg
  jpeg_quality: 85
  max_canvas_dimension: 8192

storage:
  path: .promptcraft/promptcraft.db
  max_connections: 5

logging:
  level: warn
  format: pretty
  # log_dir: .promptcraft/logs
  rotation: daily

# Challenges in play order. Omit to use the built-in catalog.
# catalog:
#   - id: lighthouse
#     name: Lighthouse at Dusk
#     description: Recreate a lone lighthouse on a rocky shore under an orange dusk sky.
#     target_image: .promptcraft/targets/lighthouse.jpg
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Challenge, CompositeFormat, DEFAULT_PASS_THRESHOLD};
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.scoring.pass_threshold - DEFAULT_PASS_THRESHOLD).abs() < f64::EPSILON);
        assert_eq!(config.storage.path, ".promptcraft/promptcraft.db");
        assert_eq!(config.compositor.format, CompositeFormat::Jpeg);
        assert_eq!(config.catalog.len(), 3);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_default_yaml_parses_and_validates() {
        let config: Config =
            serde_yaml::from_str(&ConfigLoader::default_yaml()).expect("YAML should parse");
        assert_eq!(config.catalog.len(), 3);
        ConfigLoader::validate(&config).expect("Default YAML should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
scoring:
  pass_threshold: 80
compositor:
  format: png
catalog:
  - id: one
    name: One
    description: First
    target_image: https://example.com/one.png
  - id: two
    name: Two
    description: Second
    target_image: targets/two.png
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert!((config.scoring.pass_threshold - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.compositor.format, CompositeFormat::Png);
        assert_eq!(config.catalog[0].id.as_str(), "one");
        assert!(config.catalog[0].target_image.is_remote());
        assert!(!config.catalog[1].target_image.is_remote());
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = Config::default();
        config.scoring.pass_threshold = 100.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidPassThreshold(_))
        ));

        config.scoring.pass_threshold = -1.0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.scoring.pass_threshold = 0.0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_jpeg_quality() {
        let mut config = Config::default();
        config.compositor.jpeg_quality = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidJpegQuality(0))
        ));

        config.compositor.jpeg_quality = 101;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidJpegQuality(101))
        ));
    }

    #[test]
    fn test_validate_empty_catalog() {
        let config = Config {
            catalog: vec![],
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_catalog_ids() {
        let challenge = Challenge::new("dup", "Dup", "goal", "a.png".parse().unwrap());
        let config = Config {
            catalog: vec![challenge.clone(), challenge],
            ..Default::default()
        };
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_backoff() {
        let mut config = Config::default();
        config.generation.initial_backoff_ms = 5_000;
        config.generation.max_backoff_ms = 1_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(5_000, 1_000))
        ));
    }

    #[test]
    fn test_validate_storage() {
        let mut config = Config::default();
        config.storage.path = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyStoragePath)
        ));

        let mut config = Config::default();
        config.storage.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_load_from_dir_merges_local_over_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "scoring:\n  pass_threshold: 60\nlogging:\n  level: info\n",
        )
        .unwrap();
        fs::write(dir.path().join("local.yaml"), "scoring:\n  pass_threshold: 65\n").unwrap();

        temp_env::with_var_unset("PROMPTCRAFT_SCORING__PASS_THRESHOLD", || {
            let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
            assert!((config.scoring.pass_threshold - 65.0).abs() < f64::EPSILON);
            assert_eq!(config.logging.level, "info");
        });
    }

    #[test]
    fn test_env_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "scoring:\n  pass_threshold: 60\n").unwrap();

        temp_env::with_var("PROMPTCRAFT_SCORING__PASS_THRESHOLD", Some("85.5"), || {
            let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
            assert!((config.scoring.pass_threshold - 85.5).abs() < f64::EPSILON);
        });
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "compositor:\n  jpeg_quality: 0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }
}
