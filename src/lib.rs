pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fees;
pub mod orchestration;
pub mod report;

pub use config::Config;
pub use datasource::{EventSource, IngestError, LogFileSource, MockEventSource, RawEvents};
pub use domain::{Decimal, Event, Fill, OppLost, RequestMessage, Symbol, TimeUs};
pub use engine::{BasketStats, CostStats, ReconcileError, Reconciler, TradeRequest, TradeRequestKind};
pub use error::AppError;
pub use fees::{FeeOracle, FeeSchedule, ZeroFees};
pub use orchestration::{AnalysisOutcome, Analyzer};
pub use report::{CostReport, ReportOptions};
