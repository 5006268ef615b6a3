//! Event source abstraction: turns raw cost logs into per-symbol event streams.

use crate::config::MalformedPolicy;
use crate::domain::{Event, EventError, FillMessage, RequestMessage, Source, Symbol};
use crate::fees::FeeOracle;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

pub mod log_file;
pub mod log_parser;
pub mod mock;

pub use log_file::LogFileSource;
pub use log_parser::{LogParser, RawRecord};
pub use mock::MockEventSource;

/// Source of the chronological request/fill log.
#[async_trait]
pub trait EventSource: Send + Sync + fmt::Debug {
    /// Load every event, grouped per symbol in log order.
    async fn load_events(&self) -> Result<RawEvents, IngestError>;
}

/// Events grouped per symbol plus the records that could not be used.
#[derive(Debug, Clone, Default)]
pub struct RawEvents {
    pub events: BTreeMap<Symbol, Vec<Event>>,
    pub skipped: Vec<SkippedRecord>,
}

impl RawEvents {
    pub fn total_events(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}

/// A log record rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub source: Source,
    pub line_no: u64,
    /// Known when the line got far enough to name its symbol.
    pub symbol: Option<Symbol>,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("lz4 decode error in {path}: {message}")]
    Lz4 { path: String, message: String },
    #[error("malformed record at {origin}:{line_no}: {error}")]
    Malformed {
        origin: Source,
        line_no: u64,
        #[source]
        error: EventError,
    },
}

/// Builds events from log lines, tracking each symbol's previous target.
pub struct EventBuilder<'a> {
    fees: &'a dyn FeeOracle,
    crossing_opp: bool,
    policy: MalformedPolicy,
    previous_targets: HashMap<Symbol, i64>,
    out: RawEvents,
}

impl<'a> EventBuilder<'a> {
    pub fn new(fees: &'a dyn FeeOracle, crossing_opp: bool, policy: MalformedPolicy) -> Self {
        Self {
            fees,
            crossing_opp,
            policy,
            previous_targets: HashMap::new(),
            out: RawEvents::default(),
        }
    }

    /// Feed one raw line. Rejected lines are skipped or fail per the policy.
    pub fn push_line(&mut self, source: &Source, line_no: u64, line: &str) -> Result<(), IngestError> {
        let result = LogParser::parse_line(line, source, line_no)
            .and_then(|record| record.map(|r| self.build(r)).transpose());

        match result {
            Ok(Some(event)) => {
                self.out
                    .events
                    .entry(event.symbol().clone())
                    .or_default()
                    .push(event);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(error) => match self.policy {
                MalformedPolicy::Abort => Err(IngestError::Malformed {
                    origin: source.clone(),
                    line_no,
                    error,
                }),
                MalformedPolicy::Skip => {
                    let symbol = LogParser::symbol_hint(line);
                    tracing::warn!(
                        source = %source,
                        line_no,
                        symbol = symbol.as_ref().map(|s| s.as_str()).unwrap_or("?"),
                        error = %error,
                        "Skipping malformed record"
                    );
                    self.out.skipped.push(SkippedRecord {
                        source: source.clone(),
                        line_no,
                        symbol,
                        reason: error.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }

    fn build(&mut self, record: RawRecord) -> Result<Event, EventError> {
        match record {
            RawRecord::Request(line) => {
                // Explicit presence check: the first request of a symbol has no previous target.
                let previous = self.previous_targets.get(&line.symbol).copied();
                let msg = RequestMessage::new(line, previous, self.crossing_opp)?;
                self.previous_targets.insert(msg.symbol.clone(), msg.target);
                Ok(Event::Request(msg))
            }
            RawRecord::Fill(line) => Ok(Event::Fill(FillMessage::new(line, self.fees)?)),
        }
    }

    pub fn finish(self) -> RawEvents {
        self.out
    }
}
