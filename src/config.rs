//! Configuration for the order core.
//!
//! Values come from an optional TOML file, then environment overrides.
//! Every field has a default so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Coordinate;

pub const ENV_SUBMIT_URL: &str = "GROWER_SUBMIT_URL";
pub const ENV_INVENTORY_URL: &str = "GROWER_INVENTORY_URL";
pub const ENV_MAPBOX_TOKEN: &str = "MAPBOX_ACCESS_TOKEN";
pub const ENV_STORE_PATH: &str = "GROWER_STORE_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub routing: RoutingConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub submit_url: String,
    pub inventory_url: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            submit_url: "http://localhost:3000/api/submit".to_string(),
            inventory_url: "http://localhost:3000/api/inventory".to_string(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub base_url: String,
    pub access_token: String,
    /// Warehouse location every delivery distance is measured from.
    pub origin: Coordinate,
    pub request_timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            access_token: String::new(),
            origin: Coordinate::new(-120.2602, 37.1230),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cooldown_secs: u64,
    pub draft_ttl_days: u64,
    pub store_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            draft_ttl_days: 7,
            store_path: PathBuf::from("grower-direct-store.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl EndpointsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RoutingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.draft_ttl_days * 24 * 60 * 60)
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.submit_url.trim().is_empty() {
            bail!("endpoints.submit_url must not be empty");
        }
        if self.endpoints.inventory_url.trim().is_empty() {
            bail!("endpoints.inventory_url must not be empty");
        }
        if self.routing.base_url.trim().is_empty() {
            bail!("routing.base_url must not be empty");
        }
        let origin = self.routing.origin;
        if !(-180.0..=180.0).contains(&origin.longitude) || !(-90.0..=90.0).contains(&origin.latitude) {
            bail!("routing.origin {} is not a valid longitude,latitude pair", origin);
        }
        if self.session.draft_ttl_days == 0 {
            bail!("session.draft_ttl_days must be at least 1");
        }
        Ok(())
    }
}

/// Builds a [`Config`] from a file, a TOML string and the environment.
#[derive(Debug)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { path: None, use_env: true }
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skips environment overrides; tests use this to stay hermetic.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn load(&self) -> Result<Config> {
        let mut config = match &self.path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Config::default(),
        };

        if self.use_env {
            apply_overrides(&mut config, |key| std::env::var(key).ok());
        }

        config.validate()?;
        debug!(config = ?config.session, "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Config> {
        toml::from_str(raw).context("Failed to parse TOML configuration")
    }
}

/// Applies environment overrides, read through `lookup` so they can be tested.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = lookup(ENV_SUBMIT_URL) {
        config.endpoints.submit_url = url;
    }
    if let Some(url) = lookup(ENV_INVENTORY_URL) {
        config.endpoints.inventory_url = url;
    }
    if let Some(token) = lookup(ENV_MAPBOX_TOKEN) {
        config.routing.access_token = token;
    }
    if let Some(path) = lookup(ENV_STORE_PATH) {
        config.session.store_path = PathBuf::from(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ConfigLoader::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session.cooldown(), Duration::from_secs(300));
        assert_eq!(config.session.draft_ttl(), Duration::from_secs(604_800));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = ConfigLoader::from_toml(
            r#"
            [routing]
            access_token = "pk.test"
            origin = { longitude = -119.5, latitude = 36.9 }

            [session]
            cooldown_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.access_token, "pk.test");
        assert_eq!(config.routing.origin, Coordinate::new(-119.5, 36.9));
        assert_eq!(config.routing.base_url, "https://api.mapbox.com");
        assert_eq!(config.session.cooldown_secs, 60);
        assert_eq!(config.session.draft_ttl_days, 7);
    }

    #[test]
    fn test_env_overrides_win_and_blank_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_SUBMIT_URL, "https://growerdirect.example/api/submit"),
            (ENV_MAPBOX_TOKEN, "pk.env"),
            (ENV_STORE_PATH, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.endpoints.submit_url, "https://growerdirect.example/api/submit");
        assert_eq!(config.routing.access_token, "pk.env");
        assert_eq!(config.session.store_path, SessionConfig::default().store_path);
    }

    #[test]
    fn test_invalid_origin_fails_validation() {
        let mut config = Config::default();
        config.routing.origin = Coordinate::new(37.1, -200.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loader_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).without_env().load().unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_loader_reports_missing_file() {
        let err = ConfigLoader::new().with_file("/nonexistent/grower.toml").without_env().load().unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
