use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::catalog::lenient_rule_list;
use crate::rules::policy::Policy;
use crate::rules::RuleId;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".apiprobe.toml";

/// Top-level configuration from `.apiprobe.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause between probes, in milliseconds.
    pub test_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Overrides the base URL extracted from the document.
    pub base_url: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_delay_ms: 100,
            request_timeout_secs: 10,
            base_url: None,
        }
    }
}

impl RunConfig {
    pub fn test_delay(&self) -> Duration {
        Duration::from_millis(self.test_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rules enabled when no explicit selection is given.
    #[serde(default = "default_enabled", deserialize_with = "lenient_rule_list")]
    pub enabled: Vec<RuleId>,
}

fn default_enabled() -> Vec<RuleId> {
    RuleId::ALL
        .iter()
        .copied()
        .filter(|r| r.enabled_by_default())
        .collect()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# apiprobe configuration

[run]
# Pause between probes, in milliseconds.
test_delay_ms = 100
# Per-request timeout, in seconds.
request_timeout_secs = 10
# Override the base URL taken from the document's servers/host fields.
# base_url = "http://localhost:3000"

[rules]
# Rules enabled by default when none are selected explicitly.
enabled = [
  "REQUIRED_CHECK",
  "WHITESPACE",
  "NO_STRING",
  "MAX_STRING",
  "MAX_NUMBER",
  "MIN_NUMBER",
  "EMAIL_CHECK",
  "PHONE_CHECK",
]

[policy]
# Minimum severity of an accepted probe that fails the run (low, medium, high).
fail_on = "high"

# Rule IDs to ignore entirely.
# ignore_rules = ["WHITESPACE"]
"#
    }
}
