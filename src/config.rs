//! Configuration loader - YAML dashboard manifest + .env settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Bounds and default of the marker-size slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSizeConfig {
    pub min: u32,
    pub max: u32,
    pub step: u32,
    pub default: u32,
}

impl Default for PointSizeConfig {
    fn default() -> Self {
        Self {
            min: 5,
            max: 20,
            step: 1,
            default: 10,
        }
    }
}

impl PointSizeConfig {
    /// Clamp a requested size into the slider range
    pub fn clamp(&self, size: i64) -> u32 {
        size.clamp(self.min as i64, self.max as i64) as u32
    }
}

/// Dashboard configuration loaded from dashboard.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    pub subtitle: String,
    pub palettes: Vec<[String; 3]>,
    pub tick_interval_ms: u64,
    pub point_size: PointSizeConfig,
    /// CSV to load instead of the bundled iris table
    pub dataset: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let palette = |a: &str, b: &str, c: &str| [a.to_string(), b.to_string(), c.to_string()];
        Self {
            app_name: "ColorSplash".to_string(),
            subtitle: "Interactive Rust App for Docker & Kubernetes".to_string(),
            palettes: vec![
                palette("#4F46E5", "#22D3EE", "#F59E0B"),
                palette("#EC4899", "#8B5CF6", "#10B981"),
                palette("#FB7185", "#34D399", "#3B82F6"),
            ],
            tick_interval_ms: 1000,
            point_size: PointSizeConfig::default(),
            dataset: None,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.palettes.is_empty() {
            return Err(ConfigError::Invalid("at least one palette is required".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        let ps = &self.point_size;
        if ps.min > ps.max || ps.step == 0 {
            return Err(ConfigError::Invalid(format!(
                "point_size range {}..={} step {} is empty",
                ps.min, ps.max, ps.step
            )));
        }
        if !(ps.min..=ps.max).contains(&ps.default) {
            return Err(ConfigError::Invalid(format!(
                "point_size default {} outside {}..={}",
                ps.default, ps.min, ps.max
            )));
        }
        Ok(())
    }
}

/// Process settings loaded from the environment / .env
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: String,
    pub web_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 5000,
            log_dir: "logs".to_string(),
            web_dir: "web".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from .env file and the process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Settings {
            port: lookup("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            log_dir: lookup("LOG_DIR").unwrap_or(defaults.log_dir),
            web_dir: lookup("WEB_DIR").unwrap_or(defaults.web_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.palettes.len(), 3);
        assert_eq!(config.point_size.default, 10);
    }

    #[test]
    fn test_shipped_yaml_matches_defaults() {
        let shipped = Config::from_yaml(include_str!("../dashboard.yaml")).unwrap();
        let defaults = Config::default();
        assert_eq!(shipped.palettes, defaults.palettes);
        assert_eq!(shipped.point_size, defaults.point_size);
        assert_eq!(shipped.app_name, defaults.app_name);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("app_name: Splashy\ntick_interval_ms: 500\n").unwrap();
        assert_eq!(config.app_name, "Splashy");
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.point_size, PointSizeConfig::default());
    }

    #[test]
    fn test_empty_palettes_rejected() {
        let err = Config::from_yaml("palettes: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_default_point_size_outside_range_rejected() {
        let yaml = "point_size: { min: 5, max: 20, step: 1, default: 30 }\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_clamp_point_size() {
        let ps = PointSizeConfig::default();
        assert_eq!(ps.clamp(1), 5);
        assert_eq!(ps.clamp(12), 12);
        assert_eq!(ps.clamp(99), 20);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.yaml");
        std::fs::write(&path, "subtitle: hello\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.subtitle, "hello");
    }

    #[test]
    fn test_settings_port_default_and_override() {
        let empty: HashMap<&str, &str> = HashMap::new();
        let settings = Settings::from_lookup(|k| empty.get(k).map(|v| v.to_string()));
        assert_eq!(settings.port, 5000);

        let env = HashMap::from([("PORT", "8123"), ("LOG_DIR", "/tmp/cs")]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.port, 8123);
        assert_eq!(settings.log_dir, "/tmp/cs");
        assert_eq!(settings.web_dir, "web");
    }

    #[test]
    fn test_settings_bad_port_falls_back() {
        let settings = Settings::from_lookup(|k| (k == "PORT").then(|| "nope".to_string()));
        assert_eq!(settings.port, 5000);
    }
}
