//! Test doubles and common utilities for contract tests
//!
//! This module provides a scripted resolver that records when it was asked,
//! and a tracing layer that captures log lines so tests can assert on them.

#![allow(dead_code)]

use dnsrange_core::error::{Error, Result};
use dnsrange_core::traits::HostResolver;
use dnsrange_core::{DnsRange, DnsRangeConfig, RangeEvent};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One scripted resolver answer
#[derive(Debug, Clone)]
pub enum Answer {
    /// Successful lookup returning these address strings
    Addresses(Vec<&'static str>),
    /// The name does not exist
    NotFound,
    /// Any other resolver failure
    Fail(&'static str),
}

impl Answer {
    pub fn addresses(addresses: &[&'static str]) -> Self {
        Answer::Addresses(addresses.to_vec())
    }
}

/// A resolver that replays scripted answers per host
///
/// Each host has a queue of answers. Answers are consumed in order; the
/// last one repeats forever. Hosts without a script are not found.
#[derive(Default)]
pub struct ScriptedResolver {
    scripts: Mutex<HashMap<String, VecDeque<Answer>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the answers for `host`
    pub fn with(self, host: &str, answers: Vec<Answer>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), answers.into());
        self
    }

    /// Append an answer to `host`'s script
    pub fn push(&self, host: &str, answer: Answer) {
        self.scripts
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push_back(answer);
    }

    /// Instants at which `host` was looked up
    pub fn calls_for(&self, host: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Number of lookups of `host`
    pub fn call_count(&self, host: &str) -> usize {
        self.calls_for(host).len()
    }

    /// Total number of lookups
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_answer(&self, host: &str) -> Answer {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(host) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Answer::NotFound),
            None => Answer::NotFound,
        }
    }
}

#[async_trait::async_trait]
impl HostResolver for ScriptedResolver {
    async fn lookup_host(&self, host: &str) -> Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), Instant::now()));

        match self.next_answer(host) {
            Answer::Addresses(addresses) => {
                Ok(addresses.into_iter().map(String::from).collect())
            }
            Answer::NotFound => Err(Error::host_not_found(host)),
            Answer::Fail(message) => Err(Error::resolution(host, message)),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// Provision a range over a shared scripted resolver
pub async fn provision(
    config: DnsRangeConfig,
    resolver: &Arc<ScriptedResolver>,
) -> Result<(DnsRange, mpsc::Receiver<RangeEvent>)> {
    DnsRange::provision(config, Arc::clone(resolver) as Arc<dyn HostResolver>).await
}

/// Parse an address into its single-address prefix
pub fn prefix(ip: &str) -> ipnet::IpNet {
    ipnet::IpNet::from(ip.parse::<IpAddr>().unwrap())
}

/// Current ranges rendered as sorted strings
pub fn sorted_ranges(range: &DnsRange) -> Vec<String> {
    let mut ranges: Vec<String> = range
        .get_address_ranges()
        .iter()
        .map(ToString::to_string)
        .collect();
    ranges.sort();
    ranges
}

/// Drain every event currently buffered in the channel
pub fn drain_events(rx: &mut mpsc::Receiver<RangeEvent>) -> Vec<RangeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let every runnable task make progress without advancing the clock much
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// A captured log line
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogLine {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A tracing layer that records every event
#[derive(Clone, Default)]
pub struct CapturedLogs {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the thread-local default subscriber
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines at `level` whose message is `message`
    pub fn find(&self, level: Level, message: &str) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.level == level && line.message == message)
            .cloned()
            .collect()
    }
}

struct LineVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

impl<S> Layer<S> for CapturedLogs
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        self.lines.lock().unwrap().push(LogLine {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}
