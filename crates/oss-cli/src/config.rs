//! `ossync.toml`: where the two replicas live and how loudly to log.
//!
//! ```toml
//! [source]
//! root = "./replica-a"
//! prefix = "acc1"
//!
//! [destination]
//! root = "./replica-b"
//! prefix = "acc1"
//!
//! [log]
//! level = "info"
//! ```
//!
//! Relative roots are resolved against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::cli::Side;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub source: StoreSection,
    pub destination: StoreSection,
    #[serde(default)]
    pub log: LogSection,
}

/// One replica: a filesystem root and the key prefix inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    pub root: PathBuf,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LogSection {
    pub fn level(&self) -> anyhow::Result<tracing::Level> {
        self.level
            .parse()
            .with_context(|| format!("unknown log level {:?}", self.level))
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config =
            Self::parse(&text).with_context(|| format!("in config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.source.root = base.join(&config.source.root);
            config.destination.root = base.join(&config.destination.root);
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.source == self.destination {
            bail!("source and destination name the same replica");
        }
        self.log.level()?;
        Ok(())
    }

    pub fn side(&self, side: Side) -> &StoreSection {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [source]
        root = "./replica-a"
        prefix = "acc1"

        [destination]
        root = "./replica-b"
        prefix = "acc1"

        [log]
        level = "debug"
    "#;

    #[test]
    fn parses_full_config() {
        let config = AppConfig::parse(FULL).unwrap();
        assert_eq!(config.source.root, PathBuf::from("./replica-a"));
        assert_eq!(config.destination.prefix, "acc1");
        assert_eq!(config.log.level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(config.side(Side::Destination), &config.destination);
    }

    #[test]
    fn log_and_prefix_default() {
        let config = AppConfig::parse(
            r#"
            [source]
            root = "a"
            [destination]
            root = "b"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.prefix, "");
        assert_eq!(config.log, LogSection::default());
        assert_eq!(config.log.level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn missing_destination_is_rejected() {
        assert!(AppConfig::parse("[source]\nroot = \"a\"\n").is_err());
    }

    #[test]
    fn identical_replicas_are_rejected() {
        let err = AppConfig::parse(
            "[source]\nroot = \"a\"\nprefix = \"p\"\n[destination]\nroot = \"a\"\nprefix = \"p\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("same replica"));
    }

    #[test]
    fn same_root_with_different_prefixes_is_fine() {
        AppConfig::parse(
            "[source]\nroot = \"a\"\nprefix = \"x\"\n[destination]\nroot = \"a\"\nprefix = \"y\"\n",
        )
        .unwrap();
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(AppConfig::parse(
            "[source]\nroot = \"a\"\n[destination]\nroot = \"b\"\n[log]\nlevel = \"loud\"\n"
        )
        .is_err());
    }

    #[test]
    fn load_resolves_roots_against_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ossync.toml");
        fs::write(&path, FULL).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.source.root, dir.path().join("./replica-a"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/ossync.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
