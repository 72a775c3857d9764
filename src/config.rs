use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::report::{
    OrphanThresholds, DEFAULT_ORPHAN_COUNT_THRESHOLD, DEFAULT_ORPHAN_SPENDING_THRESHOLD_BPS,
};

fn default_grouping() -> String {
    "month".to_string()
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Report defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Grouping used when the request does not name one.
    pub default_grouping: String,

    /// Target currency used when the request does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_to: Option<String>,

    /// Orphan count threshold used when no settings are stored.
    pub orphan_count_threshold: i64,

    /// Orphan spending threshold (basis points) used when no settings are stored.
    pub orphan_spending_threshold_bps: i64,

    /// Upper bound on each storage or FX call. `"0s"` disables it.
    #[serde(
        default = "default_call_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub call_timeout: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_grouping: default_grouping(),
            convert_to: None,
            orphan_count_threshold: DEFAULT_ORPHAN_COUNT_THRESHOLD,
            orphan_spending_threshold_bps: DEFAULT_ORPHAN_SPENDING_THRESHOLD_BPS,
            call_timeout: default_call_timeout(),
        }
    }
}

impl ReportConfig {
    pub fn thresholds(&self) -> OrphanThresholds {
        OrphanThresholds {
            count_threshold: self.orphan_count_threshold,
            spending_threshold_bps: self.orphan_spending_threshold_bps,
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (!self.call_timeout.is_zero()).then_some(self.call_timeout)
    }
}

/// FX rate lookup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// How many days before a transaction a stored close rate may come from.
    pub lookback_days: u32,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self { lookback_days: 7 }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    pub report: ReportConfig,

    pub fx: FxConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub report: ReportConfig,
    pub fx: FxConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./tallybook.toml` if it exists in current directory
/// 2. `tallybook/tallybook.toml` under the platform data directory
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("tallybook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("tallybook").join("tallybook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            report: config.report,
            fx: config.fx,
            config_path,
        })
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the directory the config would live in is the data
    /// directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self {
            data_dir: config_dir.to_path_buf(),
            report: ReportConfig::default(),
            fx: FxConfig::default(),
            config_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/home/user/budget");
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/budget")
        );
    }

    #[test]
    fn test_relative_and_absolute_data_dir() {
        let config_dir = Path::new("/home/user/budget");
        let relative = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        let absolute = Config {
            data_dir: Some(PathBuf::from("/var/tallybook")),
            ..Default::default()
        };
        assert_eq!(
            relative.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/budget/data")
        );
        assert_eq!(
            absolute.resolve_data_dir(config_dir),
            PathBuf::from("/var/tallybook")
        );
    }

    #[test]
    fn test_load_empty_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("tallybook.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config, Config::default());
        assert_eq!(config.report.default_grouping, "month");
        assert_eq!(config.report.thresholds(), OrphanThresholds::default());
        assert_eq!(config.report.call_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.fx.lookback_days, 7);

        Ok(())
    }

    #[test]
    fn test_load_report_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("tallybook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[report]")?;
        writeln!(file, "default_grouping = \"week\"")?;
        writeln!(file, "convert_to = \"EUR\"")?;
        writeln!(file, "orphan_count_threshold = 10")?;
        writeln!(file, "call_timeout = \"0s\"")?;
        writeln!(file, "[fx]")?;
        writeln!(file, "lookback_days = 3")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.report.default_grouping, "week");
        assert_eq!(config.report.convert_to.as_deref(), Some("EUR"));
        assert_eq!(
            config.report.thresholds(),
            OrphanThresholds {
                count_threshold: 10,
                spending_threshold_bps: 500,
            }
        );
        assert_eq!(config.report.call_timeout(), None);
        assert_eq!(config.fx.lookback_days, 3);

        Ok(())
    }

    #[test]
    fn test_invalid_timeout_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("tallybook.toml");
        std::fs::write(&config_path, "[report]\ncall_timeout = \"soon\"\n")?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("tallybook.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.report, ReportConfig::default());

        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("tallybook.toml");
        std::fs::write(&config_path, "data_dir = \"./data\"\n")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("data"));

        Ok(())
    }
}
