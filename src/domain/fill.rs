//! Fill types representing trade executions.

use crate::domain::{sign, Decimal, EventError, Liquidity, Source, Symbol, TimeUs, Venue};
use crate::fees::FeeOracle;
use serde::{Deserialize, Serialize};

/// Tokenized fields of one fill log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillLine {
    pub time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    pub venue: Venue,
    /// Signed size: positive buys, negative sells.
    pub size: i64,
    pub price: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub liquidity: Liquidity,
    /// Line number within the source, used to tell identical executions apart.
    pub seq: u64,
}

/// An execution report with its fees attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillMessage {
    pub fill_key: String,
    pub time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    pub venue: Venue,
    pub size: i64,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub liquidity: Liquidity,
    pub other_fees: Decimal,
    pub venue_fee: Decimal,
}

impl FillMessage {
    /// Build a fill message, pricing its fees through the oracle.
    ///
    /// # Errors
    /// Returns `EventError::MissingQuote` without bid/ask, `EventError::ZeroSize`
    /// for empty executions, and propagates fee lookup failures.
    pub fn new(line: FillLine, fees: &dyn FeeOracle) -> Result<Self, EventError> {
        let (bid, ask) = match (line.bid, line.ask) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                return Err(EventError::MissingQuote {
                    symbol: line.symbol.to_string(),
                    time: line.time,
                })
            }
        };
        if line.size == 0 {
            return Err(EventError::ZeroSize {
                symbol: line.symbol.to_string(),
                time: line.time,
            });
        }

        let quote = fees.quote(
            &line.symbol,
            &line.venue,
            line.size,
            line.price,
            line.liquidity,
        )?;

        let fill_key = Self::compute_fill_key(
            &line.source,
            &line.symbol,
            &line.venue,
            line.time,
            line.size,
            &line.price,
            line.seq,
        );

        Ok(FillMessage {
            fill_key,
            time: line.time,
            symbol: line.symbol,
            source: line.source,
            venue: line.venue,
            size: line.size,
            price: line.price,
            bid,
            ask,
            liquidity: line.liquidity,
            other_fees: quote.other_fee,
            venue_fee: quote.venue_fee,
        })
    }

    /// Generate a stable unique key for an execution.
    pub fn compute_fill_key(
        source: &Source,
        symbol: &Symbol,
        venue: &Venue,
        time: TimeUs,
        size: i64,
        price: &Decimal,
        seq: u64,
    ) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(source.as_str());
        hasher.update(symbol.as_str());
        hasher.update(venue.as_str());
        hasher.update(time.as_us().to_le_bytes());
        hasher.update(size.to_le_bytes());
        hasher.update(price.to_canonical_string());
        hasher.update(seq.to_le_bytes());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    /// The matchable fill carrying the full execution.
    pub fn into_fill(self) -> Fill {
        Fill {
            fill_key: self.fill_key,
            time: self.time,
            symbol: self.symbol,
            source: self.source,
            venue: self.venue,
            size: self.size,
            price: self.price,
            bid: self.bid,
            ask: self.ask,
            liquidity: self.liquidity,
            other_fees: self.other_fees,
            venue_fee: self.venue_fee,
        }
    }
}

/// A matchable execution, or a portion of one.
///
/// `size` shrinks toward zero as portions are extracted; the fees always
/// belong to the shares that are still in `size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Key of the execution this fill (or portion) came from.
    pub fill_key: String,
    pub time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    pub venue: Venue,
    pub size: i64,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub liquidity: Liquidity,
    pub other_fees: Decimal,
    pub venue_fee: Decimal,
}

impl Fill {
    pub fn direction(&self) -> i64 {
        sign(self.size)
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    /// Shares not yet matched against any intent.
    pub fn is_open(&self) -> bool {
        self.size != 0
    }

    /// Split off `partial` shares as a new portion, pro-rating the fees.
    ///
    /// # Panics
    /// Panics if `partial` is zero, has the wrong sign, or exceeds `size`.
    pub fn extract(&mut self, partial: i64) -> Fill {
        assert!(
            partial != 0 && sign(partial) == self.direction() && partial.abs() <= self.size.abs(),
            "cannot extract {} from fill of {}",
            partial,
            self.size
        );

        let (other_fees, venue_fee) = if partial == self.size {
            (self.other_fees, self.venue_fee)
        } else {
            let (part, whole) = (Decimal::from(partial), Decimal::from(self.size));
            (self.other_fees * part / whole, self.venue_fee * part / whole)
        };

        self.size -= partial;
        self.other_fees = self.other_fees - other_fees;
        self.venue_fee = self.venue_fee - venue_fee;

        Fill {
            size: partial,
            other_fees,
            venue_fee,
            ..self.clone()
        }
    }
}
