//! Runtime settings: `depscan.toml`, then `DEPSCAN_*` environment variables

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "depscan.toml";

/// Which matcher implementation runs an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Persistent worker pool fed line by line in lock-step.
    #[default]
    Streaming,
    /// Sequential scan of every file for every candidate; fine for small trees.
    DoubleScan,
}

impl FromStr for MatchStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" => Ok(MatchStrategy::Streaming),
            "double-scan" | "double_scan" => Ok(MatchStrategy::DoubleScan),
            other => Err(CoreError::Config(format!("unknown strategy `{other}`"))),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Streaming => write!(f, "streaming"),
            MatchStrategy::DoubleScan => write!(f, "double-scan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one checkout per repository.
    pub repository_directory: PathBuf,
    /// Directory where graph snapshots are written.
    pub analysis_directory: PathBuf,
    /// Matcher worker count.
    pub threads: usize,
    pub strategy: MatchStrategy,
    /// Upper bound on a single matcher round before the run is aborted.
    pub round_timeout_secs: u64,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository_directory: PathBuf::from("repositories"),
            analysis_directory: PathBuf::from("analysis"),
            threads: default_threads(),
            strategy: MatchStrategy::default(),
            round_timeout_secs: 60,
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

/// Number of CPU cores, but at least 2.
fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2)
}

impl Settings {
    /// Load settings from `path` (or `depscan.toml` if present), then apply
    /// environment overrides. A `.env` file is honoured.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let _ = dotenvy::dotenv();

        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(SETTINGS_FILE).is_file() => Self::from_file(Path::new(SETTINGS_FILE))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> CoreResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `DEPSCAN_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DEPSCAN_REPOSITORY_DIRECTORY") {
            self.repository_directory = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DEPSCAN_ANALYSIS_DIRECTORY") {
            self.analysis_directory = PathBuf::from(dir);
        }
        if let Some(threads) = lookup("DEPSCAN_THREADS") {
            self.threads = parse_number("DEPSCAN_THREADS", &threads)?;
        }
        if let Some(strategy) = lookup("DEPSCAN_STRATEGY") {
            self.strategy = strategy.parse()?;
        }
        if let Some(secs) = lookup("DEPSCAN_ROUND_TIMEOUT_SECS") {
            self.round_timeout_secs = parse_number("DEPSCAN_ROUND_TIMEOUT_SECS", &secs)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.threads == 0 {
            return Err(CoreError::Config("threads must be at least 1".to_string()));
        }
        if self.round_timeout_secs == 0 {
            return Err(CoreError::Config(
                "round_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key} must be a number, got `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.threads >= 2);
        assert_eq!(settings.strategy, MatchStrategy::Streaming);
        settings.validate().unwrap();
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml(
            r#"
repository_directory = "/srv/repos"
threads = 5
strategy = "double-scan"
"#,
        )
        .unwrap();
        assert_eq!(settings.repository_directory, PathBuf::from("/srv/repos"));
        assert_eq!(settings.threads, 5);
        assert_eq!(settings.strategy, MatchStrategy::DoubleScan);
        assert_eq!(settings.analysis_directory, PathBuf::from("analysis"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEPSCAN_THREADS", "3"),
            ("DEPSCAN_STRATEGY", "streaming"),
            ("DEPSCAN_ANALYSIS_DIRECTORY", "/tmp/graphs"),
        ]);
        let mut settings = Settings::from_toml("strategy = \"double-scan\"").unwrap();
        settings
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.threads, 3);
        assert_eq!(settings.strategy, MatchStrategy::Streaming);
        assert_eq!(settings.analysis_directory, PathBuf::from("/tmp/graphs"));
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|k| (k == "DEPSCAN_THREADS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DEPSCAN_THREADS"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let settings = Settings {
            threads: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
