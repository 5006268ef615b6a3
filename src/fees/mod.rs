//! Fee oracle: prices the venue and regulatory fees of one execution.
//!
//! Positive fees are costs; rebates are negative venue fees.

use crate::domain::{Decimal, Liquidity, Symbol, Venue};
use thiserror::Error;

pub mod schedule;

pub use schedule::{FeeSchedule, GlobalFees, Tape};

/// The two fee components charged on one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeQuote {
    pub venue_fee: Decimal,
    pub other_fee: Decimal,
}

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid fee table row: {0}")]
    InvalidRow(String),
    #[error("invalid number {value:?} for {field}")]
    InvalidNumber { field: String, value: String },
    #[error("missing fee setting: {0}")]
    MissingSetting(String),
    #[error("unknown venue: {0}")]
    UnknownVenue(String),
    #[error("unknown listing exchange {exchange} for {symbol}")]
    UnknownExchange { symbol: String, exchange: String },
    #[error("venue {venue} has no {liquidity} rate for tape {tape}")]
    MissingRate {
        venue: String,
        tape: Tape,
        liquidity: Liquidity,
    },
}

/// Pure lookup of the fees charged on an execution.
pub trait FeeOracle: Send + Sync {
    fn quote(
        &self,
        symbol: &Symbol,
        venue: &Venue,
        signed_size: i64,
        price: Decimal,
        liquidity: Liquidity,
    ) -> Result<FeeQuote, FeeError>;
}

/// Oracle that charges nothing, for runs without fee tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroFees;

impl FeeOracle for ZeroFees {
    fn quote(
        &self,
        _symbol: &Symbol,
        _venue: &Venue,
        _signed_size: i64,
        _price: Decimal,
        _liquidity: Liquidity,
    ) -> Result<FeeQuote, FeeError> {
        Ok(FeeQuote::default())
    }
}
