//! Cost report: the basket statistics sliced every way the desk looks at them.

use crate::config::MAX_TIME_BUCKET_SECS;
use crate::datasource::SkippedRecord;
use crate::domain::{Decimal, TimeUs};
use crate::engine::{BasketStats, TradeRequest};
use crate::orchestration::AnalysisOutcome;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub mod render;

pub use render::render;

/// Knobs for slicing the completed intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Clamped to `1..=MAX_TIME_BUCKET_SECS`.
    pub time_bucket_secs: i64,
    pub top_symbols: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            time_bucket_secs: 600,
            top_symbols: 20,
        }
    }
}

/// Statistics of one slice, labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub stats: BasketStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverFillSummary {
    pub count: usize,
    /// Slippage (with venue fees) plus opportunity cost of all over-fills.
    pub dollars_lost: Decimal,
}

/// Symbols ranked by cost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolRankings {
    pub worst_by_dollars: Vec<GroupStats>,
    pub worst_by_bps: Vec<GroupStats>,
    pub best_by_dollars: Vec<GroupStats>,
    pub best_by_bps: Vec<GroupStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSymbolReport {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostReport {
    pub overall: BasketStats,
    pub buy: BasketStats,
    pub sell: BasketStats,
    pub over_fills: OverFillSummary,
    /// Keyed by initial aggressiveness, in `[a, a + 0.1)` buckets.
    pub by_aggressiveness: Vec<GroupStats>,
    /// Keyed by open time.
    pub by_time: Vec<GroupStats>,
    pub by_symbol: Vec<GroupStats>,
    /// Keyed by log file name.
    pub by_source: Vec<GroupStats>,
    pub rankings: SymbolRankings,
    pub forced_completions: usize,
    pub skipped: Vec<SkippedRecord>,
    pub failed_symbols: Vec<FailedSymbolReport>,
}

impl CostReport {
    pub fn build(outcome: &AnalysisOutcome, options: ReportOptions) -> Self {
        let all: Vec<&TradeRequest> = outcome.completed().collect();

        let over: Vec<&TradeRequest> = all.iter().copied().filter(|t| t.is_over_fill()).collect();
        let over_stats = BasketStats::from_requests(over.iter().copied());

        let by_aggressiveness = group(&all, aggressiveness_bucket)
            .into_iter()
            .map(|(bucket, members)| GroupStats {
                key: aggressiveness_label(bucket),
                stats: BasketStats::from_requests(members),
            })
            .collect();

        let bucket_us = options.time_bucket_secs.clamp(1, MAX_TIME_BUCKET_SECS) * 1_000_000;
        let by_time = group(&all, |t| t.open_time.as_us().div_euclid(bucket_us))
            .into_iter()
            .map(|(bucket, members)| GroupStats {
                key: time_label(bucket, bucket_us),
                stats: BasketStats::from_requests(members),
            })
            .collect();

        let by_symbol: Vec<GroupStats> = outcome
            .outcomes
            .iter()
            .map(|o| GroupStats {
                key: o.symbol.to_string(),
                stats: BasketStats::from_requests(&o.completed),
            })
            .collect();

        let by_source = group(&all, |t| t.source.short_name().to_string())
            .into_iter()
            .map(|(source, members)| GroupStats {
                key: source,
                stats: BasketStats::from_requests(members),
            })
            .collect();

        let rankings = rank_symbols(&by_symbol, options.top_symbols);

        CostReport {
            overall: BasketStats::from_requests(all.iter().copied()),
            buy: BasketStats::from_requests(all.iter().copied().filter(|t| t.direction() == 1)),
            sell: BasketStats::from_requests(all.iter().copied().filter(|t| t.direction() == -1)),
            over_fills: OverFillSummary {
                count: over.len(),
                dollars_lost: over_stats.total_dollar_lost,
            },
            by_aggressiveness,
            by_time,
            by_symbol,
            by_source,
            rankings,
            forced_completions: outcome.total_forced(),
            skipped: outcome.skipped.clone(),
            failed_symbols: outcome
                .failed
                .iter()
                .map(|f| FailedSymbolReport {
                    symbol: f.symbol.to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

fn group<'a, K, F>(requests: &[&'a TradeRequest], key: F) -> BTreeMap<K, Vec<&'a TradeRequest>>
where
    K: Ord,
    F: Fn(&TradeRequest) -> K,
{
    let mut groups: BTreeMap<K, Vec<&'a TradeRequest>> = BTreeMap::new();
    for tr in requests {
        groups.entry(key(*tr)).or_default().push(*tr);
    }
    groups
}

/// Tenths of the initial aggressiveness, rounded down.
pub fn aggressiveness_bucket(tr: &TradeRequest) -> i64 {
    (tr.initial_aggressiveness() * Decimal::from(10))
        .floor()
        .trunc_i64()
}

fn aggressiveness_label(bucket: i64) -> String {
    format!(
        "[{:4.1},{:4.1})",
        bucket as f64 / 10.0,
        (bucket + 1) as f64 / 10.0
    )
}

fn time_label(bucket: i64, bucket_us: i64) -> String {
    let hm = |us: i64| {
        let t = TimeUs::new(us).hhmmss();
        t[..5].to_string()
    };
    format!("{}-{}", hm(bucket * bucket_us), hm((bucket + 1) * bucket_us))
}

fn rank_symbols(by_symbol: &[GroupStats], top: usize) -> SymbolRankings {
    SymbolRankings {
        worst_by_dollars: top_by(by_symbol, top, |a, b| {
            b.stats.total_dollar_lost.cmp(&a.stats.total_dollar_lost)
        }),
        worst_by_bps: top_by(by_symbol, top, |a, b| b.stats.bps_total.cmp(&a.stats.bps_total)),
        best_by_dollars: top_by(by_symbol, top, |a, b| {
            a.stats.total_dollar_lost.cmp(&b.stats.total_dollar_lost)
        }),
        best_by_bps: top_by(by_symbol, top, |a, b| a.stats.bps_total.cmp(&b.stats.bps_total)),
    }
}

/// First `n` groups under `cmp`, ties broken by key.
fn top_by<F>(groups: &[GroupStats], n: usize, cmp: F) -> Vec<GroupStats>
where
    F: Fn(&GroupStats, &GroupStats) -> Ordering,
{
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| cmp(a, b).then_with(|| a.key.cmp(&b.key)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockEventSource, SkippedRecord};
    use crate::domain::{
        Event, FillLine, FillMessage, Liquidity, RequestLine, RequestMessage, Source, Symbol,
        Venue,
    };
    use crate::fees::ZeroFees;
    use crate::orchestration::Analyzer;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn req(symbol: &str, source: &str, secs: i64, target: i64, aggr: &str) -> Event {
        RequestMessage::new(
            RequestLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new(symbol),
                source: Source::new(source),
                position: 0,
                qty: target,
                aggressiveness: Some(d(aggr)),
                bid: Some(d("10.00")),
                ask: Some(d("10.00")),
            },
            Some(0),
            false,
        )
        .unwrap()
        .into()
    }

    fn fill(symbol: &str, secs: i64, size: i64, price: &str) -> Event {
        FillMessage::new(
            FillLine {
                time: TimeUs::from_secs(secs),
                symbol: Symbol::new(symbol),
                source: Source::new("/logs/a.log"),
                venue: Venue::new("BATS"),
                size,
                price: d(price),
                bid: Some(d("10.00")),
                ask: Some(d("10.00")),
                liquidity: Liquidity::Add,
                seq: secs as u64,
            },
            &ZeroFees,
        )
        .unwrap()
        .into()
    }

    async fn report() -> CostReport {
        let source = MockEventSource::new()
            // AAA: buy 100, filled 1.00 worse than mid.
            .with_event(req("AAA", "/logs/a.log", 36_000, 100, "1.25"))
            .with_event(fill("AAA", 36_010, 100, "11.00"))
            // BBB: sell 100, filled 0.10 better than mid.
            .with_event(req("BBB", "/logs/b.log", 36_700, -100, "2.0"))
            .with_event(fill("BBB", 36_710, -100, "10.10"))
            // CCC: buy 50, over-filled by 10.
            .with_event(req("CCC", "/logs/a.log", 37_000, 50, "1.2"))
            .with_event(fill("CCC", 37_010, 60, "10.00"))
            .with_skipped(SkippedRecord {
                source: Source::new("/logs/a.log"),
                line_no: 7,
                symbol: Some(Symbol::new("AAA")),
                reason: "malformed record".to_string(),
            });
        let outcome = Analyzer::new(TimeUs::from_secs(57_600))
            .analyze(&source)
            .await
            .unwrap();
        CostReport::build(
            &outcome,
            ReportOptions {
                time_bucket_secs: 600,
                top_symbols: 2,
            },
        )
    }

    #[tokio::test]
    async fn splits_by_side_and_counts_over_fills() {
        let report = report().await;
        assert_eq!(report.overall.entity_count, 4);
        assert_eq!(report.buy.entity_count, 2);
        // The over-fill wants to sell back the extra 10 shares.
        assert_eq!(report.sell.entity_count, 2);
        assert_eq!(report.over_fills.count, 1);
        assert_eq!(report.forced_completions, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.failed_symbols.is_empty());
    }

    #[tokio::test]
    async fn buckets_by_aggressiveness_time_and_source() {
        let report = report().await;

        let aggr: Vec<_> = report.by_aggressiveness.iter().map(|g| g.key.as_str()).collect();
        // The over-fill inherits 1.2, so two entities share that bucket.
        assert_eq!(aggr, vec!["[ 1.2, 1.3)", "[ 2.0, 2.1)"]);
        assert_eq!(report.by_aggressiveness[0].stats.entity_count, 3);

        let times: Vec<_> = report.by_time.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(times, vec!["10:00-10:10", "10:10-10:20"]);

        let sources: Vec<_> = report.by_source.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(sources, vec!["a.log", "b.log"]);
    }

    #[test]
    fn oversized_time_bucket_is_clamped_to_a_day() {
        let report = CostReport::build(
            &AnalysisOutcome::default(),
            ReportOptions {
                time_bucket_secs: 10_000_000_000_000,
                top_symbols: 20,
            },
        );
        assert!(report.by_time.is_empty());
        assert_eq!(time_label(0, MAX_TIME_BUCKET_SECS * 1_000_000), "00:00-24:00");
    }

    #[tokio::test]
    async fn ranks_symbols_by_cost() {
        let report = report().await;
        let worst: Vec<_> = report
            .rankings
            .worst_by_dollars
            .iter()
            .map(|g| g.key.as_str())
            .collect();
        assert_eq!(worst, vec!["AAA", "CCC"]);
        let best: Vec<_> = report
            .rankings
            .best_by_bps
            .iter()
            .map(|g| g.key.as_str())
            .collect();
        assert_eq!(best, vec!["BBB", "CCC"]);
    }
}
