//! Size-change instructions issued by the trading algorithm.

use crate::domain::{sign, Decimal, EventError, OppLost, Source, Symbol, TimeUs};
use serde::{Deserialize, Serialize};

/// Tokenized fields of one request log line, before any per-symbol state is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    /// Absolute position reported on the line.
    pub position: i64,
    /// Quantity still to trade on top of `position`.
    pub qty: i64,
    /// `None` for stop requests, which carry no aggressiveness.
    pub aggressiveness: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

/// One size-change instruction for a symbol at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    /// New absolute desired position.
    pub target: i64,
    /// `target - previous target`; shrinks toward zero while matched.
    pub delta_target: i64,
    pub aggressiveness: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub is_stop_request: bool,
    /// Price opportunity losses at the near touch instead of the mid.
    pub crossing_opp: bool,
}

impl RequestMessage {
    /// Build a request from a tokenized line.
    ///
    /// `previous_target` is the symbol's last recorded target. When absent, the
    /// position reported on the line is the base, so the first request of a
    /// symbol carries exactly its `qty`.
    ///
    /// # Errors
    /// Returns `EventError::MissingQuote` if the line has no bid or ask.
    pub fn new(
        line: RequestLine,
        previous_target: Option<i64>,
        crossing_opp: bool,
    ) -> Result<Self, EventError> {
        let (bid, ask) = match (line.bid, line.ask) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                return Err(EventError::MissingQuote {
                    symbol: line.symbol.to_string(),
                    time: line.time,
                })
            }
        };

        let target = line.position + line.qty;
        let base = previous_target.unwrap_or(line.position);

        Ok(RequestMessage {
            time: line.time,
            symbol: line.symbol,
            source: line.source,
            target,
            delta_target: target - base,
            is_stop_request: line.aggressiveness.is_none(),
            aggressiveness: line.aggressiveness.unwrap_or_default(),
            bid,
            ask,
            crossing_opp,
        })
    }

    pub fn direction(&self) -> i64 {
        sign(self.delta_target)
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    /// Near-touch price: the bid for a buy-direction delta, the ask for a sell.
    pub fn near_touch(&self) -> Decimal {
        match self.direction() {
            1 => self.bid,
            -1 => self.ask,
            _ => self.mid(),
        }
    }

    /// Price at which an opportunity loss caused by this request is valued.
    pub fn reference_price(&self) -> Decimal {
        if self.crossing_opp {
            self.near_touch()
        } else {
            self.mid()
        }
    }

    /// Whether any of the delta is still unabsorbed.
    pub fn is_open(&self) -> bool {
        self.delta_target != 0
    }

    /// Consume `partial` shares of the delta as a lost opportunity.
    ///
    /// `partial` is expressed in the direction of the intent being reduced,
    /// which opposes this request's own direction.
    ///
    /// # Panics
    /// Panics if `partial` does not oppose the delta or exceeds it.
    pub fn extract_opp_lost(&mut self, partial: i64) -> OppLost {
        assert!(
            sign(partial) == -self.direction() && partial.abs() <= self.delta_target.abs(),
            "opp-lost of {} cannot be taken from delta {}",
            partial,
            self.delta_target
        );

        let lost = OppLost {
            size: partial,
            price: self.reference_price(),
            time: self.time,
            due_to_stop: self.is_stop_request,
        };
        self.delta_target += partial;
        lost
    }
}
