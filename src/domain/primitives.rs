//! Domain primitives: TimeUs, Symbol, Source, Venue, Liquidity.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: i64 = 1_000_000;

/// Time of day in microseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeUs(pub i64);

impl TimeUs {
    /// Create a TimeUs from microseconds.
    pub fn new(us: i64) -> Self {
        TimeUs(us)
    }

    /// Build from whole seconds since midnight.
    pub fn from_secs(secs: i64) -> Self {
        TimeUs(secs * MICROS_PER_SEC)
    }

    /// Get the underlying microseconds value.
    pub fn as_us(&self) -> i64 {
        self.0
    }

    /// Seconds since midnight, exact.
    pub fn as_secs(&self) -> Decimal {
        Decimal::from_scaled(self.0, 6)
    }

    /// Format as `HH:MM:SS.mmm`.
    pub fn hhmmss(&self) -> String {
        let total_ms = self.0 / 1_000;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let millis = total_ms % 60_000;
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours,
            minutes,
            millis / 1_000,
            millis % 1_000
        )
    }
}

impl std::fmt::Display for TimeUs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hhmmss())
    }
}

/// Instrument symbol (e.g., "USB", "BPOP").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a Symbol from a string.
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into())
    }

    /// Get the symbol as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Originating server/log tag of an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Source(pub String);

impl Source {
    pub fn new(source: impl Into<String>) -> Self {
        Source(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component, used when grouping by server instance.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution venue (ECN) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Venue(pub String);

impl Venue {
    pub fn new(venue: impl Into<String>) -> Self {
        Venue(venue.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an execution added or removed resting liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Add,
    Remove,
    Other,
}

impl Liquidity {
    /// Map the one-letter log flag (`A`, `R`) to a liquidity kind.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "A" => Liquidity::Add,
            "R" => Liquidity::Remove,
            _ => Liquidity::Other,
        }
    }
}

impl std::fmt::Display for Liquidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liquidity::Add => write!(f, "add"),
            Liquidity::Remove => write!(f, "remove"),
            Liquidity::Other => write!(f, "other"),
        }
    }
}

/// Direction of a signed share quantity: -1, 0 or +1.
pub fn sign(x: i64) -> i64 {
    x.signum()
}
