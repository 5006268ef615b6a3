//! Domain types for execution-cost reconstruction.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeUs, Symbol, Source, Venue, Liquidity
//! - Request and fill events built from tokenized log lines
//! - Timestamp ordering guard for deterministic replay

pub mod decimal;
pub mod event;
pub mod fill;
pub mod opp_lost;
pub mod ordering;
pub mod primitives;
pub mod request;

pub use decimal::{weighted_average, Decimal};
pub use event::{Event, EventError};
pub use fill::{Fill, FillLine, FillMessage};
pub use opp_lost::OppLost;
pub use ordering::OrderingGuard;
pub use primitives::{sign, Liquidity, Source, Symbol, TimeUs, Venue};
pub use request::{RequestLine, RequestMessage};
