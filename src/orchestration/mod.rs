pub mod analyzer;

pub use analyzer::{AnalysisError, AnalysisOutcome, Analyzer, FailedSymbol};
