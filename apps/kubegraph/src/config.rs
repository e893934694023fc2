//! # Configuration
//!
//! Optional `kubegraph.toml`:
//!
//! ```toml
//! [scan]
//! extensions = ["yaml", "yml"]
//! recursive = true
//!
//! [validate]
//! fail_on_warnings = false
//!
//! [log]
//! format = "text"   # or "json"
//! ```
//!
//! Every key is optional. A missing default file means defaults; a file named
//! explicitly with `--config` must exist.

use kubegraph_core::KubegraphError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "kubegraph.toml";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "KUBEGRAPH_LOG_FORMAT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scan: ScanConfig,
    pub validate: ValidateConfig,
    pub log: LogConfig,
}

/// How directories given on the command line are searched for manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// File extensions treated as manifests, without the dot.
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            recursive: true,
        }
    }
}

impl ScanConfig {
    /// Whether `path` has one of the manifest extensions (case-insensitive).
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidateConfig {
    /// Treat warnings as failures for the exit status.
    pub fail_on_warnings: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// The format from `KUBEGRAPH_LOG_FORMAT`, if set to a known value.
    pub fn from_env() -> Option<Self> {
        match std::env::var(LOG_FORMAT_ENV).ok()?.as_str() {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl Config {
    /// Parse config text.
    pub fn from_toml(text: &str) -> Result<Self, KubegraphError> {
        toml::from_str(text).map_err(|e| KubegraphError::DeserializationError(e.to_string()))
    }

    /// Load the config.
    ///
    /// With `path`, that file must exist. Without, `kubegraph.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, KubegraphError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.is_file() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            KubegraphError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let config = Config::from_toml("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.extensions, vec!["yaml", "yml"]);
        assert!(config.scan.recursive);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml("[validate]\nfail_on_warnings = true\n[log]\nformat = \"json\"\n")
            .expect("parse");
        assert!(config.validate.fail_on_warnings);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.scan.recursive);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_toml("[scan]\ndepth = 3\n"),
            Err(KubegraphError::DeserializationError(_))
        ));
    }

    #[test]
    fn extension_match_ignores_case() {
        let scan = ScanConfig::default();
        assert!(scan.matches(Path::new("deploy/app.YAML")));
        assert!(scan.matches(Path::new("svc.yml")));
        assert!(!scan.matches(Path::new("README.md")));
        assert!(!scan.matches(Path::new("Makefile")));
    }
}
