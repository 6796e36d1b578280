//! Configuration types for the DNS range cache
//!
//! The configuration is normally produced by a front-end (environment
//! variables in `dnsranged`, or a JSON document). Validation happens once,
//! at provisioning time; refresh loops never see an invalid configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Refresh interval used when none (or zero) is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Main DNS range configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsRangeConfig {
    /// DNS names to look up
    pub hosts: Vec<String>,

    /// Refresh interval. Zero or absent means [`DEFAULT_INTERVAL`].
    #[serde(default)]
    pub interval: Interval,

    /// How a "name not found" answer is treated
    #[serde(default)]
    pub not_found: NotFoundPolicy,

    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped (with a log line) instead of
    /// stalling the refresh loops.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl DnsRangeConfig {
    /// Create a configuration for the given hosts with defaults for everything else
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            interval: Interval::default(),
            not_found: NotFoundPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the refresh interval
    pub fn with_interval(mut self, interval: impl Into<Interval>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Set the not-found policy
    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    /// Parse a JSON configuration document
    ///
    /// ```json
    /// { "hosts": ["cloudflared"], "interval": "1m", "not_found": "empty" }
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::config(format!("invalid configuration: {e}")))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(Error::config("dns ip range: no host names provided"));
        }

        for host in &self.hosts {
            if host.trim().is_empty() {
                return Err(Error::config("host name cannot be empty"));
            }
            if host.chars().any(char::is_whitespace) {
                return Err(Error::config(format!(
                    "host name {host:?} contains whitespace"
                )));
            }
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }

        self.refresh_interval()?;

        Ok(())
    }

    /// The effective refresh interval, with the default applied
    pub fn refresh_interval(&self) -> Result<Duration> {
        self.interval.resolve()
    }

    /// Configured hosts in order, with repeats removed
    pub fn unique_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            if !hosts.contains(host) {
                hosts.push(host.clone());
            }
        }
        hosts
    }
}

fn default_event_channel_capacity() -> usize {
    256
}

/// A configured refresh interval
///
/// Accepts the same shapes as the host process: a duration string
/// (`"90s"`, `"1m30s"`, `"2d"`) or an integer number of nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Interval {
    /// Integer nanoseconds
    Nanos(i64),
    /// Duration string
    Text(String),
}

impl Interval {
    /// Resolve to a concrete interval
    ///
    /// Zero maps to [`DEFAULT_INTERVAL`]; negative values are rejected.
    pub fn resolve(&self) -> Result<Duration> {
        let interval = match self {
            Interval::Nanos(nanos) if *nanos < 0 => {
                return Err(Error::config("interval cannot be negative"));
            }
            Interval::Nanos(nanos) => Duration::from_nanos(nanos.unsigned_abs()),
            Interval::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Duration::ZERO
                } else {
                    match parse_signed_duration(text)? {
                        (true, value) if !value.is_zero() => {
                            return Err(Error::config("interval cannot be negative"));
                        }
                        (_, value) => value,
                    }
                }
            }
        };

        if interval.is_zero() {
            Ok(DEFAULT_INTERVAL)
        } else {
            Ok(interval)
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Nanos(0)
    }
}

impl From<Duration> for Interval {
    fn from(duration: Duration) -> Self {
        Interval::Nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Interval {
    fn from(text: &str) -> Self {
        Interval::Text(text.to_string())
    }
}

impl From<String> for Interval {
    fn from(text: String) -> Self {
        Interval::Text(text)
    }
}

/// How a resolver's "name not found" answer is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundPolicy {
    /// Report it like any other resolution failure
    #[default]
    Error,
    /// Treat it as a successful lookup with zero addresses
    Empty,
}

impl FromStr for NotFoundPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(NotFoundPolicy::Error),
            "empty" => Ok(NotFoundPolicy::Empty),
            other => Err(Error::config(format!(
                "not-found policy {other:?} is not valid (expected \"error\" or \"empty\")"
            ))),
        }
    }
}

/// Parse a non-negative duration string such as `"1m30s"` or `"2d"`
///
/// Groups of `<integer><unit>` are summed. Units are those of
/// [`humantime::parse_duration`] (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`
/// and their long forms). A bare `"0"` is accepted without a unit.
pub fn parse_duration(text: &str) -> Result<Duration> {
    match parse_signed_duration(text)? {
        (true, value) if !value.is_zero() => Err(Error::config(format!(
            "duration {text:?} cannot be negative"
        ))),
        (_, value) => Ok(value),
    }
}

fn parse_signed_duration(text: &str) -> Result<(bool, Duration)> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if rest == "0" {
        return Ok((negative, Duration::ZERO));
    }

    let value = humantime::parse_duration(rest)
        .map_err(|e| Error::config(format!("invalid duration {text:?}: {e}")))?;
    Ok((negative, value))
}
