//! The replayable event stream and construction errors.

use crate::domain::{Decimal, FillMessage, RequestMessage, Symbol, TimeUs};
use crate::fees::FeeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing events from raw records.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("missing bid/ask for {symbol} at {time}")]
    MissingQuote { symbol: String, time: TimeUs },
    #[error("zero-size fill for {symbol} at {time}")]
    ZeroSize { symbol: String, time: TimeUs },
    #[error("request for {symbol} at {time} has no delta to open an intent with")]
    ZeroDelta { symbol: String, time: TimeUs },
    #[error(transparent)]
    Fee(#[from] FeeError),
}

/// One entry of a symbol's chronological log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Request(RequestMessage),
    Fill(FillMessage),
}

impl Event {
    pub fn time(&self) -> TimeUs {
        match self {
            Event::Request(m) => m.time,
            Event::Fill(f) => f.time,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            Event::Request(m) => &m.symbol,
            Event::Fill(f) => &f.symbol,
        }
    }

    pub fn mid(&self) -> Decimal {
        match self {
            Event::Request(m) => m.mid(),
            Event::Fill(f) => f.mid(),
        }
    }
}

impl From<RequestMessage> for Event {
    fn from(value: RequestMessage) -> Self {
        Event::Request(value)
    }
}

impl From<FillMessage> for Event {
    fn from(value: FillMessage) -> Self {
        Event::Fill(value)
    }
}
