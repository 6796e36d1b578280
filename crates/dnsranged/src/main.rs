// # dnsranged - DNS Range Daemon
//
// This is a THIN integration layer. All resolution and refresh logic lives
// in dnsrange-core; this binary only wires configuration, logging and
// signals around it.
//
// The dnsranged daemon is responsible for:
// 1. Reading configuration from environment variables (and an optional JSON file)
// 2. Initializing logging and the runtime
// 3. Provisioning the DNS range
// 4. Periodically reporting the current address ranges
// 5. Stopping the refresh loops on SIGTERM/SIGINT
//
// ## Configuration
//
// - `DNSRANGE_CONFIG`: Path to a JSON config file (optional)
// - `DNSRANGE_HOSTS`: Comma or whitespace separated host names
// - `DNSRANGE_INTERVAL`: Refresh interval (e.g. `1m`, `90s`; default 1m)
// - `DNSRANGE_NOT_FOUND`: `error` (default) or `empty`
// - `DNSRANGE_REPORT_INTERVAL`: How often to log the current ranges (default 60s)
// - `DNSRANGE_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// Environment variables override values from the JSON file.
//
// ## Example
//
// ```bash
// export DNSRANGE_HOSTS=cloudflared,tunnel.internal
// export DNSRANGE_INTERVAL=5m
//
// dnsranged
// ```

use anyhow::{Context, Result};
use dnsrange_core::config::parse_duration;
use dnsrange_core::{DnsRange, DnsRangeConfig, Interval, NotFoundPolicy, RangeEvent};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long to wait for the refresh loops after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    range: DnsRangeConfig,
    report_interval: Duration,
    log_level: Level,
}

impl Config {
    /// Load configuration from the optional JSON file and environment variables
    fn from_env() -> Result<Self> {
        let mut range = match env::var("DNSRANGE_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading DNSRANGE_CONFIG file {path}"))?;
                DnsRangeConfig::from_json(&text)
                    .with_context(|| format!("parsing DNSRANGE_CONFIG file {path}"))?
            }
            Err(_) => DnsRangeConfig::new(Vec::<String>::new()),
        };

        if let Ok(hosts) = env::var("DNSRANGE_HOSTS") {
            range.hosts = split_hosts(&hosts);
        }

        if let Ok(interval) = env::var("DNSRANGE_INTERVAL") {
            range.interval = Interval::Text(interval);
        }

        if let Ok(policy) = env::var("DNSRANGE_NOT_FOUND") {
            range.not_found = policy
                .parse::<NotFoundPolicy>()
                .context("DNSRANGE_NOT_FOUND")?;
        }

        let report_interval = match env::var("DNSRANGE_REPORT_INTERVAL") {
            Ok(text) => parse_duration(&text).context("DNSRANGE_REPORT_INTERVAL")?,
            Err(_) => Duration::from_secs(60),
        };

        let log_level = parse_log_level(
            &env::var("DNSRANGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        )?;

        Ok(Self {
            range,
            report_interval,
            log_level,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.range.hosts.is_empty() {
            anyhow::bail!(
                "DNSRANGE_HOSTS must contain at least one host. \
                Set it via: export DNSRANGE_HOSTS=cloudflared,tunnel.internal"
            );
        }

        if self.report_interval.is_zero() {
            anyhow::bail!("DNSRANGE_REPORT_INTERVAL must be greater than zero");
        }

        self.range.validate()?;

        Ok(())
    }
}

fn split_hosts(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNSRANGE_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting dnsranged daemon");
    info!("Configuration loaded: {} host(s)", config.range.hosts.len());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (range, events) = match DnsRange::provision_with_system_resolver(config.range).await {
            Ok(provisioned) => provisioned,
            Err(e) => {
                error!("Provisioning failed: {}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(&range, events, config.report_interval).await {
            error!("Daemon error: {:#}", e);
            range.shutdown();
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Report ranges until a shutdown signal arrives, then stop the refresh loops
async fn run_daemon(
    range: &DnsRange,
    mut events: mpsc::Receiver<RangeEvent>,
    report_interval: Duration,
) -> Result<()> {
    info!("Refresh interval: {:?}", range.interval());
    report(range);

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    let mut reporter = tokio::time::interval(report_interval);
    reporter.tick().await;

    let signal = loop {
        tokio::select! {
            signal = &mut shutdown => break signal?,

            _ = reporter.tick() => report(range),

            Some(event) = events.recv() => log_event(&event),
        }
    };

    info!("Received shutdown signal: {}", signal);
    range.shutdown();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, range.wait_stopped()).await {
        Ok(()) => {
            info!("All DNS watchers stopped");
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!(
            "DNS watchers did not stop within {:?}",
            SHUTDOWN_TIMEOUT
        )),
    }
}

fn report(range: &DnsRange) {
    let ranges = range.get_address_ranges();
    let rendered: Vec<String> = ranges.iter().map(ToString::to_string).collect();
    info!(count = ranges.len(), ranges = %rendered.join(", "), "current address ranges");
}

fn log_event(event: &RangeEvent) {
    match event {
        RangeEvent::RefreshFailed { host, retry_in, .. } => {
            warn!(host = %host, retry_in = ?retry_in, "host degraded");
        }
        other => debug!(event = ?other, "engine event"),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
