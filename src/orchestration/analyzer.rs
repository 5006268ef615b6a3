use crate::datasource::{EventSource, IngestError, RawEvents, SkippedRecord};
use crate::domain::{Symbol, TimeUs};
use crate::engine::{reconcile_symbol, ReconcileError, ReconcileOutcome, TradeRequest};
use futures::future::join_all;
use thiserror::Error;

/// Runs every symbol's replay and collects the results.
#[derive(Debug, Clone)]
pub struct Analyzer {
    end_of_session: TimeUs,
}

/// A symbol whose replay could not be trusted.
#[derive(Debug)]
pub struct FailedSymbol {
    pub symbol: Symbol,
    pub error: ReconcileError,
}

#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    /// Sorted by symbol.
    pub outcomes: Vec<ReconcileOutcome>,
    pub failed: Vec<FailedSymbol>,
    pub skipped: Vec<SkippedRecord>,
}

impl AnalysisOutcome {
    /// Every completed intent across all reconciled symbols.
    pub fn completed(&self) -> impl Iterator<Item = &TradeRequest> {
        self.outcomes.iter().flat_map(|o| o.completed.iter())
    }

    pub fn total_forced(&self) -> usize {
        self.outcomes.iter().map(|o| o.forced).sum()
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("replay of {symbol} did not finish: {message}")]
    Task { symbol: Symbol, message: String },
}

impl Analyzer {
    pub fn new(end_of_session: TimeUs) -> Self {
        Self { end_of_session }
    }

    /// Load events from `source` and reconcile them.
    pub async fn analyze(&self, source: &dyn EventSource) -> Result<AnalysisOutcome, AnalysisError> {
        let raw = source.load_events().await?;
        self.run(raw).await
    }

    /// Reconcile all symbols concurrently. A symbol that fails keeps its
    /// typed error; the others still complete.
    pub async fn run(&self, raw: RawEvents) -> Result<AnalysisOutcome, AnalysisError> {
        let end_of_session = self.end_of_session;
        let RawEvents { events, skipped } = raw;

        let (symbols, handles): (Vec<Symbol>, Vec<_>) = events
            .into_iter()
            .map(|(symbol, events)| {
                let task_symbol = symbol.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    reconcile_symbol(task_symbol, events, end_of_session)
                });
                (symbol, handle)
            })
            .unzip();

        let mut outcome = AnalysisOutcome {
            skipped,
            ..AnalysisOutcome::default()
        };

        for (symbol, joined) in symbols.into_iter().zip(join_all(handles).await) {
            let result = joined.map_err(|e| AnalysisError::Task {
                symbol: symbol.clone(),
                message: e.to_string(),
            })?;
            match result {
                Ok(done) => outcome.outcomes.push(done),
                Err(error) => {
                    tracing::error!(symbol = %symbol, error = %error, "Reconciliation failed");
                    outcome.failed.push(FailedSymbol { symbol, error });
                }
            }
        }

        tracing::info!(
            symbols = outcome.outcomes.len(),
            failed = outcome.failed.len(),
            completed = outcome.completed().count(),
            forced = outcome.total_forced(),
            "Reconciliation finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockEventSource;
    use crate::domain::{
        Decimal, Event, FillLine, FillMessage, Liquidity, RequestLine, RequestMessage, Source,
        Venue,
    };
    use crate::fees::ZeroFees;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn req(symbol: &str, secs: i64, previous: i64, target: i64) -> Event {
        RequestMessage::new(
            RequestLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new(symbol),
                source: Source::new("srv1.log"),
                position: previous,
                qty: target - previous,
                aggressiveness: Some(d("1")),
                bid: Some(d("20.00")),
                ask: Some(d("20.02")),
            },
            Some(previous),
            false,
        )
        .unwrap()
        .into()
    }

    fn fill(symbol: &str, secs: i64, size: i64) -> Event {
        FillMessage::new(
            FillLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new(symbol),
                source: Source::new("srv1.log"),
                venue: Venue::new("ISLD"),
                size,
                price: d("20.01"),
                bid: Some(d("20.00")),
                ask: Some(d("20.02")),
                liquidity: Liquidity::Add,
                seq: secs as u64,
            },
            &ZeroFees,
        )
        .unwrap()
        .into()
    }

    #[tokio::test]
    async fn reconciles_symbols_independently() {
        let source = MockEventSource::new()
            .with_event(req("BBB", 1, 0, 100))
            .with_event(req("AAA", 2, 0, -50))
            .with_event(fill("BBB", 3, 100))
            .with_event(fill("AAA", 4, -20));

        let outcome = Analyzer::new(TimeUs::from_secs(57_600))
            .analyze(&source)
            .await
            .unwrap();

        let symbols: Vec<_> = outcome.outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
        assert_eq!(outcome.completed().count(), 2);
        assert_eq!(outcome.total_forced(), 1);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn out_of_order_symbol_fails_alone() {
        let source = MockEventSource::new()
            .with_event(req("AAA", 10, 0, 100))
            .with_event(fill("AAA", 5, 100))
            .with_event(req("BBB", 1, 0, 100));

        let outcome = Analyzer::new(TimeUs::from_secs(57_600))
            .analyze(&source)
            .await
            .unwrap();

        assert_eq!(outcome.outcomes.len(), 1);
        assert_eq!(outcome.outcomes[0].symbol, Symbol::new("BBB"));
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].symbol, Symbol::new("AAA"));
        assert!(matches!(
            outcome.failed[0].error,
            ReconcileError::OutOfOrder { .. }
        ));
    }
}
