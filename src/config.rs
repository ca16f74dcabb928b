//! Configuration file handling.
//!
//! This module provides loading and saving of vulnrelay configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/vulnrelay/config.toml`
//! - macOS: `~/Library/Application Support/vulnrelay/config.toml`
//! - Windows: `%APPDATA%\vulnrelay\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! report_path = "trivy-report.sarif"
//! server_url = "https://sonar.example.com"
//! login = "squ_token"
//! rule_repository = "trivy"
//! settle_delay_secs = 5
//! default_format = "table"
//!
//! [ignore]
//! packages = ["lodash*", "@types/*"]
//! rules = ["CVE-2021-12345"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::model::Finding;

/// Application configuration.
///
/// Command-line flags override the corresponding fields; the file only
/// provides defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SARIF report to ingest.
    ///
    /// Default: `trivy-report.sarif`
    pub report_path: String,

    /// Base URL of the issue-tracker server.
    pub server_url: Option<String>,

    /// Login for the tracker: a username or a token.
    pub login: Option<String>,

    /// Password for the tracker login; blank for token auth.
    pub password: String,

    /// Rule repository vulnerability issues are filed under.
    ///
    /// Default: `trivy`
    pub rule_repository: String,

    /// Seconds to wait before the first issue search, giving the server
    /// time to finish its background tasks.
    ///
    /// Default: 5
    pub settle_delay_secs: u64,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Ignore list configuration for suppressing known findings.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Configuration for ignoring specific packages or rules.
///
/// Use this to suppress known false positives or accepted risks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names to suppress. Supports glob patterns
    /// (e.g., "lodash*", "@types/*").
    pub packages: Vec<String>,

    /// Rule ids to suppress (e.g., "CVE-2021-12345").
    pub rules: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a finding should be suppressed.
    pub fn should_ignore(&self, finding: &Finding) -> bool {
        self.rules.iter().any(|id| id == &finding.rule_id)
            || self.packages.iter().any(|pattern| {
                if pattern.contains('*') {
                    glob_match(pattern, &finding.package_name)
                } else {
                    pattern == &finding.package_name
                }
            })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    // Check middle parts
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_path: "trivy-report.sarif".to_string(),
            server_url: None,
            login: None,
            password: String::new(),
            rule_repository: "trivy".to_string(),
            settle_delay_secs: 5,
            default_format: "table".to_string(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vulnrelay")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(package: &str, rule_id: &str) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            package_name: package.to_string(),
            ..Finding::default()
        }
    }

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("lodash", "lodash"));
        assert!(!glob_match("lodash", "underscore"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("lodash*", "lodash"));
        assert!(glob_match("lodash*", "lodash-es"));
        assert!(!glob_match("lodash*", "underscore"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*log4j-core", "org.apache.logging.log4j:log4j-core"));
        assert!(!glob_match("*log4j-core", "org.apache.logging.log4j:log4j-api"));
    }

    #[test]
    fn test_glob_match_scoped() {
        assert!(glob_match("@types/*", "@types/node"));
        assert!(!glob_match("@types/*", "@babel/core"));
    }

    #[test]
    fn test_ignore_by_package() {
        let ignore = IgnoreConfig {
            packages: vec!["lodash".to_string(), "@types/*".to_string()],
            rules: vec![],
        };

        assert!(ignore.should_ignore(&finding("lodash", "CVE-1")));
        assert!(ignore.should_ignore(&finding("@types/node", "CVE-2")));
        assert!(!ignore.should_ignore(&finding("underscore", "CVE-3")));
    }

    #[test]
    fn test_ignore_by_rule() {
        let ignore = IgnoreConfig {
            packages: vec![],
            rules: vec!["CVE-2021-12345".to_string()],
        };

        assert!(ignore.should_ignore(&finding("anything", "CVE-2021-12345")));
        assert!(!ignore.should_ignore(&finding("anything", "CVE-2022-99999")));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.report_path, "trivy-report.sarif");
        assert_eq!(config.rule_repository, "trivy");
        assert_eq!(config.settle_delay_secs, 5);
        assert_eq!(config.default_format, "table");
        assert!(config.server_url.is_none());
        assert!(config.ignore.packages.is_empty());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.server_url = Some("https://sonar.example.com".to_string());
        config.ignore.packages.push("lodash*".to_string());

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server_url.as_deref(), Some("https://sonar.example.com"));
        assert_eq!(parsed.ignore.packages, vec!["lodash*"]);
    }
}
