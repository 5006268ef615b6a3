//! Size that was intended but will never be filled.

use crate::domain::{Decimal, TimeUs};
use serde::{Deserialize, Serialize};

/// A portion of an intent that was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OppLost {
    /// Signed, in the direction of the intent it was taken from.
    pub size: i64,
    /// Reference price at the moment of loss.
    pub price: Decimal,
    pub time: TimeUs,
    /// Caused by a stop/end-of-session event rather than a target reduction.
    pub due_to_stop: bool,
}

impl OppLost {
    /// Notional of the lost size at its reference price.
    pub fn notional(&self) -> Decimal {
        (Decimal::from(self.size) * self.price).abs()
    }
}
