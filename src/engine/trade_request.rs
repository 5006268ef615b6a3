//! The unit of account: one intent to move a position, and what became of it.

use crate::domain::{
    sign, weighted_average, Decimal, EventError, Fill, OppLost, RequestMessage, Source, Symbol,
    TimeUs,
};
use serde::Serialize;

/// How an intent came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeRequestKind {
    /// Opened by a request the open intents could not absorb.
    Requested,
    /// Opened by execution beyond every open intent. Never part of requested flow.
    OverFill,
}

/// Derived statistics of a completed intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostStats {
    pub avg_fill_price: Decimal,
    /// Seconds after open, weighted by fill size.
    pub avg_fill_time: Decimal,
    pub avg_opp_price: Decimal,
    /// Seconds after open, weighted by lost size.
    pub avg_opp_time: Decimal,
    /// Excludes fees.
    pub dollar_slippage: Decimal,
    pub dollar_opp_cost: Decimal,
    pub dollar_flow_actual: Decimal,
    pub dollar_flow_opp_one_side: Decimal,
    pub fill_rate: Decimal,
    /// Notional of non-stop opportunity losses, the cost of trading back.
    pub round_trip_opp_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub kind: TradeRequestKind,
    pub open_time: TimeUs,
    pub symbol: Symbol,
    pub source: Source,
    /// Signed, fixed at creation.
    pub init_size: i64,
    pub bid: Decimal,
    pub ask: Decimal,
    pub basis_price: Decimal,
    pub spread_cost_basis: Decimal,
    size_left: i64,
    fills: Vec<Fill>,
    opp_losts: Vec<OppLost>,
    aggressiveness: Vec<(Decimal, TimeUs)>,
    total_filled: i64,
    total_opp_lost: i64,
    total_other_fees: Decimal,
    total_venue_fees: Decimal,
    stats: Option<CostStats>,
}

impl TradeRequest {
    /// Open an intent for the unabsorbed delta of `msg`.
    ///
    /// # Errors
    /// Returns `EventError::ZeroDelta` when the request has nothing left to open.
    pub fn open(msg: &RequestMessage) -> Result<Self, EventError> {
        if msg.delta_target == 0 {
            return Err(EventError::ZeroDelta {
                symbol: msg.symbol.to_string(),
                time: msg.time,
            });
        }

        let basis_price = msg.mid();
        let spread_cost_basis = if basis_price.is_positive() {
            Decimal::from(msg.delta_target.abs()) * (msg.ask - msg.bid)
        } else {
            Decimal::zero()
        };

        Ok(TradeRequest {
            kind: TradeRequestKind::Requested,
            open_time: msg.time,
            symbol: msg.symbol.clone(),
            source: msg.source.clone(),
            init_size: msg.delta_target,
            bid: msg.bid,
            ask: msg.ask,
            basis_price,
            spread_cost_basis,
            size_left: msg.delta_target,
            fills: Vec::new(),
            opp_losts: Vec::new(),
            aggressiveness: vec![(msg.aggressiveness, msg.time)],
            total_filled: 0,
            total_opp_lost: 0,
            total_other_fees: Decimal::zero(),
            total_venue_fees: Decimal::zero(),
            stats: None,
        })
    }

    /// Open an intent to unwind the unmatched remainder of a fill.
    ///
    /// The remainder's fees stay with the new intent; its basis is the fill price.
    ///
    /// # Panics
    /// Panics if the fill has no shares left.
    pub fn over_fill(fill: Fill, aggressiveness: Decimal) -> Self {
        assert!(fill.is_open(), "over-fill from an exhausted fill");

        TradeRequest {
            kind: TradeRequestKind::OverFill,
            open_time: fill.time,
            symbol: fill.symbol,
            source: fill.source,
            init_size: -fill.size,
            bid: fill.bid,
            ask: fill.ask,
            basis_price: fill.price,
            spread_cost_basis: Decimal::zero(),
            size_left: -fill.size,
            fills: Vec::new(),
            opp_losts: Vec::new(),
            aggressiveness: vec![(aggressiveness, fill.time)],
            total_filled: 0,
            total_opp_lost: 0,
            total_other_fees: fill.other_fees,
            total_venue_fees: fill.venue_fee,
            stats: None,
        }
    }

    pub fn direction(&self) -> i64 {
        sign(self.init_size)
    }

    pub fn size_left(&self) -> i64 {
        self.size_left
    }

    pub fn is_open(&self) -> bool {
        self.size_left != 0
    }

    pub fn is_complete(&self) -> bool {
        self.size_left == 0
    }

    pub fn is_over_fill(&self) -> bool {
        self.kind == TradeRequestKind::OverFill
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn opp_losts(&self) -> &[OppLost] {
        &self.opp_losts
    }

    /// `(aggressiveness, time)` changes seen while open, oldest first.
    pub fn aggressiveness_history(&self) -> &[(Decimal, TimeUs)] {
        &self.aggressiveness
    }

    pub fn initial_aggressiveness(&self) -> Decimal {
        self.aggressiveness
            .first()
            .map(|(aggr, _)| *aggr)
            .unwrap_or_default()
    }

    pub fn latest_aggressiveness(&self) -> Decimal {
        self.aggressiveness
            .last()
            .map(|(aggr, _)| *aggr)
            .unwrap_or_default()
    }

    /// Signed shares matched against fills.
    pub fn total_filled(&self) -> i64 {
        self.total_filled
    }

    /// Signed shares abandoned.
    pub fn total_opp_lost(&self) -> i64 {
        self.total_opp_lost
    }

    pub fn total_other_fees(&self) -> Decimal {
        self.total_other_fees
    }

    pub fn total_venue_fees(&self) -> Decimal {
        self.total_venue_fees
    }

    /// Statistics, present once the intent is complete.
    pub fn cost_stats(&self) -> Option<&CostStats> {
        self.stats.as_ref()
    }

    /// Reconcile a request against this intent.
    ///
    /// A request pointing the other way reduces both the intent and the
    /// request's delta; the overlap is recorded as lost opportunity.
    pub fn apply_request(&mut self, msg: &mut RequestMessage) {
        if !self.is_open() {
            return;
        }

        if msg.is_open() && msg.direction() == -self.direction() {
            let overlap = self.direction() * self.size_left.abs().min(msg.delta_target.abs());
            self.opp_losts.push(msg.extract_opp_lost(overlap));
            self.size_left -= overlap;
            self.total_opp_lost += overlap;
        }

        if self.is_open() && msg.aggressiveness != self.latest_aggressiveness() {
            self.aggressiveness.push((msg.aggressiveness, msg.time));
        }

        if self.is_complete() {
            self.calc_stats();
        }
    }

    /// Match as much of `fill` as this intent still needs.
    pub fn apply_fill(&mut self, fill: &mut Fill) {
        if !self.is_open() || !fill.is_open() || fill.direction() != self.direction() {
            return;
        }

        let matched = self.direction() * self.size_left.abs().min(fill.size.abs());
        let portion = fill.extract(matched);
        self.total_other_fees += portion.other_fees;
        self.total_venue_fees += portion.venue_fee;
        self.fills.push(portion);
        self.size_left -= matched;
        self.total_filled += matched;

        if self.is_complete() {
            self.calc_stats();
        }
    }

    /// Abandon whatever is left at `price`, as if stopped at `time`.
    pub fn force_complete(&mut self, price: Decimal, time: TimeUs) {
        if self.is_complete() {
            return;
        }

        self.opp_losts.push(OppLost {
            size: self.size_left,
            price,
            time,
            due_to_stop: true,
        });
        self.total_opp_lost += self.size_left;
        self.size_left = 0;
        self.calc_stats();
    }

    /// Compute statistics once the intent is complete. Later calls return the stored result.
    pub fn calc_stats(&mut self) -> Option<&CostStats> {
        if self.is_open() {
            return None;
        }
        if self.stats.is_none() {
            self.stats = Some(self.compute_stats());
        }
        self.stats.as_ref()
    }

    fn compute_stats(&self) -> CostStats {
        let open_secs = self.open_time.as_secs();

        let (avg_fill_price, avg_fill_time) = if self.total_filled != 0 {
            (
                weighted_average(self.fills.iter().map(|f| (f.price, Decimal::from(f.size)))),
                weighted_average(
                    self.fills
                        .iter()
                        .map(|f| (f.time.as_secs(), Decimal::from(f.size))),
                ) - open_secs,
            )
        } else {
            (Decimal::zero(), Decimal::zero())
        };

        let (avg_opp_price, avg_opp_time) = if self.total_opp_lost != 0 {
            (
                weighted_average(
                    self.opp_losts
                        .iter()
                        .map(|o| (o.price, Decimal::from(o.size))),
                ),
                weighted_average(
                    self.opp_losts
                        .iter()
                        .map(|o| (o.time.as_secs(), Decimal::from(o.size))),
                ) - open_secs,
            )
        } else {
            (Decimal::zero(), Decimal::zero())
        };

        let filled = Decimal::from(self.total_filled);
        let lost = Decimal::from(self.total_opp_lost);

        CostStats {
            avg_fill_price,
            avg_fill_time,
            avg_opp_price,
            avg_opp_time,
            dollar_slippage: filled * (avg_fill_price - self.basis_price),
            dollar_opp_cost: lost * (avg_opp_price - self.basis_price),
            dollar_flow_actual: filled.abs() * self.basis_price,
            dollar_flow_opp_one_side: lost.abs() * self.basis_price,
            fill_rate: filled.checked_ratio(Decimal::from(self.init_size)),
            round_trip_opp_usd: self
                .opp_losts
                .iter()
                .filter(|o| !o.due_to_stop)
                .map(OppLost::notional)
                .sum(),
        }
    }
}
