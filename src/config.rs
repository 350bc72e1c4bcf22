//! Monitor configuration and its validation

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::constants::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::types::Vendor;

static HOST_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap());

fn default_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

/// SSH login details; secrets are never read from the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshSettings {
    pub username: Option<String>,
    pub port: Option<u16>,
    pub key_file: Option<PathBuf>,
    /// `SHA256:` host key fingerprint to pin
    pub host_key: Option<String>,
}

/// What to watch and how often
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// Switch hostname or IP address
    pub device_id: String,
    pub vendor: Vendor,
    /// Seconds between cycles; 0 runs a single cycle
    pub poll_interval_seconds: u64,
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub ssh: SshSettings,
}

impl MonitorConfig {
    pub fn new(device_id: impl Into<String>, vendor: Vendor, poll_interval_seconds: u64) -> Self {
        Self {
            device_id: device_id.into(),
            vendor,
            poll_interval_seconds,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            ssh: SshSettings::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: MonitorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn run_once(&self) -> bool {
        self.poll_interval_seconds == 0
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_host(&self.device_id) {
            return Err(Error::InvalidConfig(format!(
                "`{}` is neither an IP address nor a hostname",
                self.device_id
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(Error::InvalidConfig("command timeout must be at least one second".into()));
        }
        Ok(())
    }
}

/// IP address or RFC 1123 hostname
pub fn is_valid_host(value: &str) -> bool {
    if value.parse::<IpAddr>().is_ok() {
        return true;
    }
    !value.is_empty() && value.len() <= 253 && value.split('.').all(|label| HOST_LABEL.is_match(label))
}

/// Polling interval as typed by a user: a non-negative whole number of seconds
pub fn parse_interval(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidConfig(format!("interval must be a number >= 0, got `{}`", value.trim())))
}
