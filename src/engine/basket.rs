//! Summary metrics over any collection of completed intents.

use super::trade_request::TradeRequest;
use crate::domain::{weighted_average, Decimal};
use serde::Serialize;

/// Dollar and basis-point totals for a basket of completed intents.
///
/// Over-fills never count toward requested flow or spread basis, but their
/// costs and fees do count. Intents still open contribute nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BasketStats {
    pub entity_count: usize,
    pub dollar_flow_actual: Decimal,
    pub dollar_flow_opp_one_side: Decimal,
    /// Fill price against basis only.
    pub price_slippage: Decimal,
    /// `price_slippage` plus venue fees.
    pub dollar_slippage: Decimal,
    pub dollar_opp_cost: Decimal,
    pub other_fees: Decimal,
    pub venue_fees: Decimal,
    pub total_dollar_lost: Decimal,
    pub shares_requested: i64,
    pub shares_filled: i64,
    /// Seconds, weighted by each intent's dollar flow.
    pub avg_fill_time: Decimal,
    /// Filled flow plus one side of the lost flow.
    pub dollars_requested: Decimal,
    pub dollars_requested_round_trip: Decimal,
    pub spread_basis: Decimal,
    pub bps_slippage: Decimal,
    pub bps_opp_lost: Decimal,
    pub bps_total: Decimal,
    /// Half the quoted spread over requested dollars, in bps.
    pub spread_basis_bps: Decimal,
    pub fill_rate_shares: Decimal,
    pub fill_rate_usd: Decimal,
}

impl BasketStats {
    pub fn from_requests<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a TradeRequest>,
    {
        let mut s = BasketStats::default();
        let mut round_trip = Decimal::zero();
        let mut fill_times = Vec::new();

        for tr in requests {
            let Some(stats) = tr.cost_stats() else {
                continue;
            };
            s.entity_count += 1;

            if !tr.is_over_fill() {
                s.dollar_flow_actual += stats.dollar_flow_actual;
                s.dollar_flow_opp_one_side += stats.dollar_flow_opp_one_side;
                s.spread_basis += tr.spread_cost_basis;
            }

            s.price_slippage += stats.dollar_slippage;
            s.dollar_opp_cost += stats.dollar_opp_cost;
            s.other_fees += tr.total_other_fees();
            s.venue_fees += tr.total_venue_fees();
            s.shares_requested += tr.init_size.abs();
            s.shares_filled += tr.total_filled().abs();
            round_trip += stats.round_trip_opp_usd;
            fill_times.push((stats.avg_fill_time, stats.dollar_flow_actual));
        }

        s.dollar_slippage = s.price_slippage + s.venue_fees;
        s.total_dollar_lost = s.dollar_slippage + s.dollar_opp_cost;

        s.avg_fill_time = if s.shares_filled != 0 {
            weighted_average(fill_times)
        } else {
            Decimal::zero()
        };

        s.dollars_requested = s.dollar_flow_actual + s.dollar_flow_opp_one_side;
        s.dollars_requested_round_trip = s.dollars_requested + round_trip;

        if s.dollars_requested.is_positive() {
            let bps = Decimal::bps_per_unit();
            s.bps_slippage = s.dollar_slippage / s.dollars_requested * bps;
            s.bps_opp_lost = s.dollar_opp_cost / s.dollars_requested * bps;
            s.spread_basis_bps =
                s.spread_basis / s.dollars_requested * bps / Decimal::from(2);
            s.fill_rate_usd = s.dollar_flow_actual / s.dollars_requested;
            if s.shares_requested != 0 {
                s.fill_rate_shares =
                    Decimal::from(s.shares_filled) / Decimal::from(s.shares_requested);
            }
        }
        s.bps_total = s.bps_slippage + s.bps_opp_lost;

        s
    }
}
