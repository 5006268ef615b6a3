//! Per-symbol replay of requests and fills against the queue of open intents.

use super::trade_request::TradeRequest;
use crate::domain::{
    Decimal, Event, EventError, Fill, OrderingGuard, RequestMessage, Symbol, TimeUs,
};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{symbol}: event at {time} arrived after {previous}")]
    OutOfOrder {
        symbol: Symbol,
        time: TimeUs,
        previous: TimeUs,
    },
    #[error("event for {found} fed to the {expected} replay")]
    SymbolMismatch { expected: Symbol, found: Symbol },
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Completed intents of one symbol.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub symbol: Symbol,
    pub completed: Vec<TradeRequest>,
    /// Intents still open at end of stream and completed as stop losses.
    pub forced: usize,
}

/// Replays one symbol's events in time order.
///
/// Requests sweep the open queue newest-first; fills sweep it oldest-first.
/// Unmatched fill quantity opens an over-fill at the front of the queue.
#[derive(Debug)]
pub struct Reconciler {
    symbol: Symbol,
    open: VecDeque<TradeRequest>,
    current_aggressiveness: Option<Decimal>,
    last_mid_price: Option<Decimal>,
    ordering: OrderingGuard,
    completed: Vec<TradeRequest>,
}

impl Reconciler {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            open: VecDeque::new(),
            current_aggressiveness: None,
            last_mid_price: None,
            ordering: OrderingGuard::new(),
            completed: Vec::new(),
        }
    }

    /// Open intents, in queue order.
    pub fn open_requests(&self) -> impl Iterator<Item = &TradeRequest> {
        self.open.iter()
    }

    pub fn completed(&self) -> &[TradeRequest] {
        &self.completed
    }

    pub fn last_mid_price(&self) -> Option<Decimal> {
        self.last_mid_price
    }

    /// Apply one event.
    ///
    /// # Errors
    /// Fails on events older than one already applied, and on events of another symbol.
    /// Nothing is mutated when an error is returned.
    pub fn process(&mut self, event: Event) -> Result<(), ReconcileError> {
        if event.symbol() != &self.symbol {
            return Err(ReconcileError::SymbolMismatch {
                expected: self.symbol.clone(),
                found: event.symbol().clone(),
            });
        }
        let time = event.time();
        self.ordering
            .observe(time)
            .map_err(|previous| ReconcileError::OutOfOrder {
                symbol: self.symbol.clone(),
                time,
                previous,
            })?;

        self.last_mid_price = Some(event.mid());
        match event {
            Event::Request(msg) => self.on_request(msg),
            Event::Fill(msg) => {
                self.on_fill(msg.into_fill());
                Ok(())
            }
        }
    }

    fn on_request(&mut self, mut msg: RequestMessage) -> Result<(), ReconcileError> {
        for i in (0..self.open.len()).rev() {
            let entity = &mut self.open[i];
            entity.apply_request(&mut msg);
            if entity.is_complete() {
                self.retire(i);
            }
        }

        if msg.is_open() {
            self.open.push_back(TradeRequest::open(&msg)?);
        }
        self.current_aggressiveness = Some(msg.aggressiveness);
        Ok(())
    }

    fn on_fill(&mut self, mut fill: Fill) {
        let mut i = 0;
        while i < self.open.len() && fill.is_open() {
            let entity = &mut self.open[i];
            entity.apply_fill(&mut fill);
            if entity.is_complete() {
                self.retire(i);
            } else {
                i += 1;
            }
        }

        if fill.is_open() {
            tracing::debug!(
                symbol = %self.symbol,
                time = %fill.time,
                residual = fill.size,
                "Fill exceeds open intents, opening over-fill"
            );
            let aggressiveness = self.current_aggressiveness.unwrap_or_default();
            self.open
                .push_front(TradeRequest::over_fill(fill, aggressiveness));
        }
    }

    fn retire(&mut self, index: usize) {
        if let Some(done) = self.open.remove(index) {
            self.completed.push(done);
        }
    }

    /// End the stream. Open intents become stop losses at the last mid,
    /// stamped `end_of_session`.
    pub fn finish(mut self, end_of_session: TimeUs) -> ReconcileOutcome {
        let forced = self.open.len();
        if forced > 0 {
            tracing::warn!(
                symbol = %self.symbol,
                forced,
                "Open trade requests at end of stream, completing at end of session with last mid"
            );
        }

        let price = self.last_mid_price.unwrap_or_default();
        while let Some(mut entity) = self.open.pop_front() {
            entity.force_complete(price, end_of_session);
            self.completed.push(entity);
        }

        ReconcileOutcome {
            symbol: self.symbol,
            completed: self.completed,
            forced,
        }
    }
}

/// Replay a whole symbol and close it at `end_of_session`.
pub fn reconcile_symbol<I>(
    symbol: Symbol,
    events: I,
    end_of_session: TimeUs,
) -> Result<ReconcileOutcome, ReconcileError>
where
    I: IntoIterator<Item = Event>,
{
    let mut reconciler = Reconciler::new(symbol);
    for event in events {
        reconciler.process(event)?;
    }
    Ok(reconciler.finish(end_of_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FillLine, FillMessage, Liquidity, RequestLine, Source, Venue};
    use crate::engine::TradeRequestKind;
    use crate::fees::ZeroFees;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn req(secs: i64, previous: i64, target: i64) -> Event {
        RequestMessage::new(
            RequestLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new("X"),
                source: Source::new("srv1.log"),
                position: previous,
                qty: target - previous,
                aggressiveness: Some(d("1.0")),
                bid: Some(d("9.99")),
                ask: Some(d("10.01")),
            },
            Some(previous),
            false,
        )
        .unwrap()
        .into()
    }

    fn fill(secs: i64, size: i64, price: &str) -> Event {
        FillMessage::new(
            FillLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new("X"),
                source: Source::new("srv1.log"),
                venue: Venue::new("ARCA"),
                size,
                price: d(price),
                bid: Some(d("10.00")),
                ask: Some(d("10.10")),
                liquidity: Liquidity::Remove,
                seq: secs as u64,
            },
            &ZeroFees,
        )
        .unwrap()
        .into()
    }

    fn eod() -> TimeUs {
        TimeUs::from_secs(16 * 3600)
    }

    #[test]
    fn request_sweep_reduces_newest_intent_first() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(req(1, 0, 300)).unwrap();
        r.process(req(2, 300, 500)).unwrap();
        r.process(req(3, 500, 400)).unwrap();

        let open: Vec<_> = r.open_requests().map(|t| t.size_left()).collect();
        assert_eq!(open, vec![300, 100]);
    }

    #[test]
    fn fill_sweep_fills_oldest_intent_first() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(req(1, 0, 300)).unwrap();
        r.process(req(2, 300, 500)).unwrap();
        r.process(fill(3, 350, "10.00")).unwrap();

        assert_eq!(r.completed().len(), 1);
        assert_eq!(r.completed()[0].init_size, 300);
        let open: Vec<_> = r.open_requests().map(|t| t.size_left()).collect();
        assert_eq!(open, vec![150]);
    }

    #[test]
    fn reversal_request_closes_intent_and_opens_opposite() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(req(1, 0, 300)).unwrap();
        r.process(req(2, 300, -200)).unwrap();

        assert_eq!(r.completed().len(), 1);
        assert_eq!(r.completed()[0].total_opp_lost(), 300);
        let open: Vec<_> = r.open_requests().map(|t| t.init_size).collect();
        assert_eq!(open, vec![-200]);
    }

    #[test]
    fn over_fill_goes_to_front_and_is_filled_first() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(req(1, 0, 100)).unwrap();
        r.process(fill(2, -30, "10.00")).unwrap();

        let kinds: Vec<_> = r.open_requests().map(|t| (t.kind, t.init_size)).collect();
        assert_eq!(
            kinds,
            vec![
                (TradeRequestKind::OverFill, 30),
                (TradeRequestKind::Requested, 100)
            ]
        );

        r.process(fill(3, 50, "10.05")).unwrap();
        assert_eq!(r.completed().len(), 1);
        assert_eq!(r.completed()[0].kind, TradeRequestKind::OverFill);
        assert_eq!(r.open_requests().next().unwrap().size_left(), 80);
    }

    #[test]
    fn over_fill_before_any_request_uses_zero_aggressiveness() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(fill(1, -40, "10.00")).unwrap();
        let over = r.open_requests().next().unwrap();
        assert_eq!(over.init_size, 40);
        assert_eq!(over.initial_aggressiveness(), Decimal::zero());
    }

    #[test]
    fn out_of_order_event_is_rejected_without_side_effects() {
        let mut r = Reconciler::new(Symbol::new("X"));
        r.process(req(10, 0, 100)).unwrap();
        let err = r.process(fill(5, 100, "10.00")).unwrap_err();
        match err {
            ReconcileError::OutOfOrder {
                symbol,
                time,
                previous,
            } => {
                assert_eq!(symbol, Symbol::new("X"));
                assert_eq!(time, TimeUs::from_secs(5));
                assert_eq!(previous, TimeUs::from_secs(10));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(r.open_requests().next().unwrap().size_left(), 100);
    }

    #[test]
    fn foreign_symbol_is_rejected() {
        let mut r = Reconciler::new(Symbol::new("Y"));
        assert!(matches!(
            r.process(req(1, 0, 100)),
            Err(ReconcileError::SymbolMismatch { .. })
        ));
    }

    #[test]
    fn finish_forces_open_intents_at_last_mid() {
        let outcome = reconcile_symbol(
            Symbol::new("X"),
            vec![req(1, 0, 1000), fill(2, 400, "10.02")],
            eod(),
        )
        .unwrap();

        assert_eq!(outcome.forced, 1);
        assert_eq!(outcome.completed.len(), 1);
        let tr = &outcome.completed[0];
        assert_eq!(tr.opp_losts().len(), 1);
        let lost = &tr.opp_losts()[0];
        assert_eq!(lost.size, 600);
        assert!(lost.due_to_stop);
        assert_eq!(lost.time, eod());
        assert_eq!(lost.price, d("10.05"));
    }

    #[test]
    fn finish_without_open_intents_forces_nothing() {
        let outcome = reconcile_symbol(
            Symbol::new("X"),
            vec![req(1, 0, 100), fill(2, 100, "10.00")],
            eod(),
        )
        .unwrap();
        assert_eq!(outcome.forced, 0);
        assert_eq!(outcome.completed.len(), 1);
    }
}
