use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TTL_SECS;

pub const CONFIG_ENV: &str = "ATTENDANCE_CONFIG";
pub const DATA_ENV: &str = "ATTENDANCE_DATA";

/// Runtime configuration, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file holding the registrant records.
    pub data_path: PathBuf,
    pub cache_ttl_secs: i64,
    /// Only analyse records whose first extras tag is set.
    pub reported_only: bool,
    pub watch_interval_secs: u64,
    pub filters: FilterDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("attendance-data.json"),
            cache_ttl_secs: DEFAULT_TTL_SECS,
            reported_only: true,
            watch_interval_secs: 5,
            filters: FilterDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    pub show_scanned_only: bool,
}

impl AppConfig {
    /// Loads `path`, or the file named by `ATTENDANCE_CONFIG`, falling back to
    /// defaults when neither is given. `ATTENDANCE_DATA` overrides the data path.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };

        if let Some(data_path) = std::env::var_os(DATA_ENV) {
            config.data_path = PathBuf::from(data_path);
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.cache_ttl_secs.max(0))
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn watch_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.watch_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
data_path = "/srv/orientation/attendance.json"

[filters]
show_scanned_only = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(
            config.data_path,
            PathBuf::from("/srv/orientation/attendance.json")
        );
        assert!(config.filters.show_scanned_only);
        assert!(config.reported_only);
        assert_eq!(config.cache_ttl_secs, DEFAULT_TTL_SECS);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "cache_ttl_secs = \"soon\"").unwrap();

        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn durations_are_clamped() {
        let config = AppConfig {
            cache_ttl_secs: -5,
            watch_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), chrono::Duration::zero());
        assert_eq!(config.watch_interval(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn oversized_ttl_saturates() {
        let config = AppConfig {
            cache_ttl_secs: 100_000_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), chrono::Duration::MAX);
    }
}
