use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

// ─── Probe definitions ───────────────────────────────────────────

/// One configured probe: a shell command whose stdout is a gauge sample.
/// Immutable after load; `name` is the registry key for the process
/// lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeDefinition {
    /// Metric name, e.g. "raid_degraded"
    pub name: String,
    /// Help text shown next to the metric in the exposition output
    pub help: String,
    /// Shell command line, run through `sh -c`
    pub cmd: String,
}

// ─── Config document ─────────────────────────────────────────────

/// The whole TOML config file.
///
/// ```toml
/// update_period_sec = 5
/// port = 9300
///
/// [[metrics]]
/// name = "up"
/// help = "Whether the box considers itself up"
/// cmd  = "echo 1"
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Seconds between full sampling passes, lower bound 1
    pub update_period_sec: u64,
    /// TCP port for the HTTP listener
    pub port: u16,
    /// Ordered list of probes; sampled in this order every pass
    #[serde(default)]
    pub metrics: Vec<ProbeDefinition>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("update_period_sec must be at least 1")]
    InvalidPeriod,
    #[error("probe `{0}` is not a valid metric name")]
    InvalidName(String),
    #[error("duplicate probe name `{0}`")]
    DuplicateName(String),
}

impl Config {
    /// Read and validate the config file. Any error here is fatal at
    /// startup — the caller reports it and exits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.update_period_sec == 0 {
            return Err(ConfigError::InvalidPeriod);
        }

        let mut seen = HashSet::new();
        for probe in &self.metrics {
            if !is_valid_metric_name(&probe.name) {
                return Err(ConfigError::InvalidName(probe.name.clone()));
            }
            if !seen.insert(probe.name.as_str()) {
                return Err(ConfigError::DuplicateName(probe.name.clone()));
            }
        }
        Ok(())
    }
}

/// Prometheus metric name charset: `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg = Config::parse(
            r#"
            update_period_sec = 5
            port = 9300

            [[metrics]]
            name = "up"
            help = "Whether the box considers itself up"
            cmd  = "echo 1"

            [[metrics]]
            name = "load_avg_1m"
            help = "1-minute load average"
            cmd  = "cut -d' ' -f1 /proc/loadavg"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.update_period_sec, 5);
        assert_eq!(cfg.port, 9300);
        assert_eq!(cfg.metrics.len(), 2);
        assert_eq!(cfg.metrics[0].name, "up");
        assert_eq!(cfg.metrics[1].cmd, "cut -d' ' -f1 /proc/loadavg");
    }

    #[test]
    fn empty_probe_list_is_allowed() {
        let cfg = Config::parse("update_period_sec = 1\nport = 9300\n").unwrap();
        assert!(cfg.metrics.is_empty());
    }

    #[test]
    fn rejects_zero_period() {
        let err = Config::parse("update_period_sec = 0\nport = 9300\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPeriod));
    }

    #[test]
    fn rejects_negative_period() {
        // u64 deserialization refuses negatives before validation runs
        let err = Config::parse("update_period_sec = -5\nport = 9300\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_missing_port() {
        let err = Config::parse("update_period_sec = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_probe_names() {
        let err = Config::parse(
            r#"
            update_period_sec = 5
            port = 9300

            [[metrics]]
            name = "up"
            help = "first"
            cmd  = "echo 1"

            [[metrics]]
            name = "up"
            help = "second"
            cmd  = "echo 2"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(name) if name == "up"));
    }

    #[test]
    fn rejects_invalid_metric_names() {
        for bad in ["", "1up", "has-dash", "has space", "ünïcode"] {
            let raw = format!(
                "update_period_sec = 5\nport = 9300\n\n[[metrics]]\nname = \"{bad}\"\nhelp = \"h\"\ncmd = \"echo 1\"\n"
            );
            let err = Config::parse(&raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidName(_)),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn accepts_colon_and_underscore_names() {
        assert!(is_valid_metric_name("node:raid_degraded"));
        assert!(is_valid_metric_name("_private"));
    }
}
