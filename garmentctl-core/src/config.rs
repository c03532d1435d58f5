use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::store::pool::DEFAULT_MAX_CONNECTIONS;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const TIMEOUT_VAR: &str = "GARMENTCTL_TIMEOUT_SECS";
pub const SEED_VAR: &str = "GARMENTCTL_SEED";

const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Load `.env` from the current directory.
///
/// dotenvy never overwrites variables that are already set, so the process
/// environment wins over the file.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded .env from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file in current directory"),
        Err(e) => warn!("Failed to load .env: {}", e),
    }
}

/// Get the garmentctl config directory path (~/.garmentctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".garmentctl"))
}

/// `garmentctl.toml` contents. Every field is optional and only overrides
/// what it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub seed: Option<PathBuf>,

    #[serde(default)]
    pub schema: Option<PathBuf>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl FileConfig {
    /// Read a config file, returning `None` when it is missing or unparsable.
    pub fn read(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Settings for one harness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub database_url: Option<String>,
    pub seed_path: PathBuf,
    pub schema_path: PathBuf,
    /// Wall-clock budget for fixture reset plus every step
    pub timeout: Duration,
    pub max_connections: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            seed_path: PathBuf::from("sql/data.sql"),
            schema_path: PathBuf::from("sql/schema.sql"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl HarnessConfig {
    /// Load configuration
    ///
    /// Priority order (highest to lowest):
    /// 1. Process environment (after `.env` in the current directory)
    /// 2. ./garmentctl.toml
    /// 3. ~/.garmentctl/config.toml
    /// 4. Built-in defaults
    pub fn load() -> Result<Self> {
        load_dotenv();

        let mut config = Self::default();
        if let Some(global) = config_dir()
            .map(|dir| dir.join("config.toml"))
            .and_then(|path| FileConfig::read(&path))
        {
            config.apply_file(global);
        }
        if let Some(local) = FileConfig::read(Path::new("garmentctl.toml")) {
            config.apply_file(local);
        }
        config.apply_env(|key| std::env::var(key).ok())?;

        info!(
            seed = %config.seed_path.display(),
            timeout = ?config.timeout,
            database = config.database_url.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(seed) = file.seed {
            self.seed_path = seed;
        }
        if let Some(schema) = file.schema {
            self.schema_path = schema;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(max) = file.max_connections {
            self.max_connections = max;
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(seed) = lookup(SEED_VAR) {
            self.seed_path = PathBuf::from(seed);
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                HarnessError::config(format!("{TIMEOUT_VAR} must be whole seconds, got '{raw}'"))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: Option<PathBuf>) -> Self {
        if let Some(seed) = seed {
            self.seed_path = seed;
        }
        self
    }

    pub fn with_schema(mut self, schema: Option<PathBuf>) -> Self {
        if let Some(schema) = schema {
            self.schema_path = schema;
        }
        self
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.timeout = Duration::from_secs(secs);
        }
        self
    }

    /// The connection string, or a configuration error when it is absent.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| HarnessError::config(format!("{DATABASE_URL_VAR} not set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.seed_path, PathBuf::from("sql/data.sql"));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn missing_database_url_is_config_error() {
        let config = HarnessConfig::default();
        let err = config.require_database_url().unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
        assert!(err.to_string().contains("DATABASE_URL not set"));
    }

    #[test]
    fn blank_database_url_counts_as_missing() {
        let mut config = HarnessConfig::default();
        config.apply_env(env(&[(DATABASE_URL_VAR, "  ")])).unwrap();
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = HarnessConfig::default();
        config
            .apply_env(env(&[
                (DATABASE_URL_VAR, "postgres://localhost/garments"),
                (TIMEOUT_VAR, "12"),
                (SEED_VAR, "fixtures/seed.sql"),
            ]))
            .unwrap();

        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://localhost/garments"
        );
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.seed_path, PathBuf::from("fixtures/seed.sql"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut config = HarnessConfig::default();
        let err = config.apply_env(env(&[(TIMEOUT_VAR, "five")])).unwrap_err();
        assert!(err.to_string().contains("GARMENTCTL_TIMEOUT_SECS"));
    }

    #[test]
    fn file_config_overrides_only_what_it_sets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 9\nseed = \"other.sql\"").unwrap();

        let parsed = FileConfig::read(file.path()).unwrap();
        let mut config = HarnessConfig::default();
        config.apply_file(parsed);

        assert_eq!(config.timeout, Duration::from_secs(9));
        assert_eq!(config.seed_path, PathBuf::from("other.sql"));
        assert_eq!(config.schema_path, PathBuf::from("sql/schema.sql"));
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn unparsable_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();
        assert!(FileConfig::read(file.path()).is_none());
    }

    #[test]
    fn cli_overrides_win() {
        let config = HarnessConfig::default()
            .with_seed(Some(PathBuf::from("cli.sql")))
            .with_timeout_secs(Some(30))
            .with_schema(None);
        assert_eq!(config.seed_path, PathBuf::from("cli.sql"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.schema_path, PathBuf::from("sql/schema.sql"));
    }

    #[test]
    fn test_config_dir_returns_path() {
        if let Some(path) = config_dir() {
            assert!(path.ends_with(".garmentctl"));
        }
    }
}
