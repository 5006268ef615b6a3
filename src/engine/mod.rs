//! Pure computation engine for request/fill reconciliation and cost attribution.

pub mod basket;
pub mod reconciler;
pub mod trade_request;

pub use basket::BasketStats;
pub use reconciler::{reconcile_symbol, ReconcileError, ReconcileOutcome, Reconciler};
pub use trade_request::{CostStats, TradeRequest, TradeRequestKind};
