//! Text and JSON renderings of a [`CostReport`].

use super::{CostReport, GroupStats};
use crate::config::ReportMode;
use crate::domain::Decimal;
use crate::engine::BasketStats;
use std::fmt;

const TABLE_HEADER: &str = "               | Total $      | Fill %  |  Sec |  Venue Fee | Other Fee|   Slip      | in bps  |  Opp       | in bps | Total      | bps    | 1/2 spd";

pub fn render(report: &CostReport, mode: ReportMode) -> Result<String, serde_json::Error> {
    match mode {
        ReportMode::Detailed => Ok(Detailed(report).to_string()),
        ReportMode::Table => Ok(Table(report).to_string()),
        ReportMode::Json => serde_json::to_string_pretty(report),
    }
}

fn pct(x: Decimal) -> f64 {
    (x * Decimal::hundred()).to_f64()
}

/// Multi-line block with fees and round-trip flow.
struct StatsBlock<'a>(&'a BasketStats);

impl fmt::Display for StatsBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(
            f,
            "\t${:11.2} requested ({:6.2}% fill) ({:11.2} with round-trip for opp'ed) {:4.0} secs avg",
            s.dollars_requested.to_f64(),
            pct(s.fill_rate_usd),
            s.dollars_requested_round_trip.to_f64(),
            s.avg_fill_time.to_f64(),
        )?;
        writeln!(
            f,
            "\t\tvenue_fees = {:8.2}\tother_fees = {:8.2}",
            s.venue_fees.to_f64(),
            s.other_fees.to_f64(),
        )?;
        write!(
            f,
            "\t\t${:+9.2} ({:+6.2} bps) slip, ${:+9.2} ({:+6.2} bps) opp",
            s.dollar_slippage.to_f64(),
            s.bps_slippage.to_f64(),
            s.dollar_opp_cost.to_f64(),
            s.bps_opp_lost.to_f64(),
        )
    }
}

/// One table row, matching [`TABLE_HEADER`].
struct StatsRow<'a>(&'a BasketStats);

impl fmt::Display for StatsRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(
            f,
            " | ${:11.2} | {:6.2}% | {:4.0} | {:10.2} | {:8.2} |  ${:+9.2} | {:+6.2}  | ${:+9.2} | {:+6.2} | ${:+9.2} | {:+6.2} | {:6.2}",
            s.dollars_requested.to_f64(),
            pct(s.fill_rate_usd),
            s.avg_fill_time.to_f64(),
            s.venue_fees.to_f64(),
            s.other_fees.to_f64(),
            s.dollar_slippage.to_f64(),
            s.bps_slippage.to_f64(),
            s.dollar_opp_cost.to_f64(),
            s.bps_opp_lost.to_f64(),
            s.total_dollar_lost.to_f64(),
            s.bps_total.to_f64(),
            s.spread_basis_bps.to_f64(),
        )
    }
}

/// Single-line summary used for symbols and sources.
struct ShortLine<'a>(&'a BasketStats);

impl fmt::Display for ShortLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(
            f,
            "${:11.2} ({:6.2}% fill): ${:+8.2} ({:+7.2} bps) slip, ${:8.2} ({:+7.2} bps) opp, {:4.0} sec",
            s.dollars_requested.to_f64(),
            pct(s.fill_rate_usd),
            s.dollar_slippage.to_f64(),
            s.bps_slippage.to_f64(),
            s.dollar_opp_cost.to_f64(),
            s.bps_opp_lost.to_f64(),
            s.avg_fill_time.to_f64(),
        )
    }
}

/// Symbols that requested any dollars, in report order.
fn write_symbols(f: &mut fmt::Formatter<'_>, report: &CostReport) -> fmt::Result {
    writeln!(f, "\nPer symbol:")?;
    for g in report
        .by_symbol
        .iter()
        .filter(|g| g.stats.dollars_requested.is_positive())
    {
        writeln!(f, "{:<5}: {}", g.key, ShortLine(&g.stats))?;
    }
    Ok(())
}

fn write_rankings(f: &mut fmt::Formatter<'_>, report: &CostReport) -> fmt::Result {
    let total = report.by_symbol.len();
    let sections: [(&str, &Vec<GroupStats>); 4] = [
        ("worst symbols", &report.rankings.worst_by_dollars),
        ("worst symbols", &report.rankings.worst_by_bps),
        ("best symbols", &report.rankings.best_by_dollars),
        ("best symbols", &report.rankings.best_by_bps),
    ];
    for (i, (title, groups)) in sections.iter().enumerate() {
        let unit = if i % 2 == 0 { "$" } else { "bps" };
        writeln!(
            f,
            "\n{} {} (out of {}) {}-wise:",
            groups.len(),
            title,
            total,
            unit
        )?;
        for g in groups.iter() {
            writeln!(f, "{:<5}: {}", g.key, ShortLine(&g.stats))?;
        }
    }
    Ok(())
}

fn write_diagnostics(f: &mut fmt::Formatter<'_>, report: &CostReport) -> fmt::Result {
    if report.forced_completions > 0 {
        writeln!(
            f,
            "\n{} trade requests completed at end of session",
            report.forced_completions
        )?;
    }
    if !report.skipped.is_empty() {
        writeln!(f, "\nSkipped {} malformed records:", report.skipped.len())?;
        for s in &report.skipped {
            writeln!(
                f,
                "  {}:{} {}: {}",
                s.source.short_name(),
                s.line_no,
                s.symbol.as_ref().map(|s| s.as_str()).unwrap_or("?"),
                s.reason
            )?;
        }
    }
    if !report.failed_symbols.is_empty() {
        writeln!(f, "\nFailed symbols:")?;
        for failed in &report.failed_symbols {
            writeln!(f, "  {}: {}", failed.symbol, failed.error)?;
        }
    }
    Ok(())
}

struct Detailed<'a>(&'a CostReport);

impl fmt::Display for Detailed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "Total Cost:  {}\n", StatsBlock(&r.overall))?;
        writeln!(f, "Buy   Cost:  {}\n", StatsBlock(&r.buy))?;
        writeln!(f, "Sell  Cost:  {}\n", StatsBlock(&r.sell))?;
        writeln!(
            f,
            "\nOver Fills: {} cases, lost ${:.2}",
            r.over_fills.count,
            r.over_fills.dollars_lost.to_f64()
        )?;

        writeln!(f, "\nPer aggr level:")?;
        for g in &r.by_aggressiveness {
            writeln!(f, "{}: {}\n", g.key, StatsBlock(&g.stats))?;
        }

        writeln!(
            f,
            "\nPer time basket (the time refers only to the opening of the trade requests)"
        )?;
        for g in &r.by_time {
            writeln!(f, "{} : {}\n", g.key, StatsBlock(&g.stats))?;
        }

        write_symbols(f, r)?;
        write_rankings(f, r)?;

        writeln!(f, "\nPer input file (server instance)")?;
        for g in &r.by_source {
            writeln!(f, "{}: {}", g.key, ShortLine(&g.stats))?;
        }

        write_diagnostics(f, r)
    }
}

struct Table<'a>(&'a CostReport);

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "{}", TABLE_HEADER)?;
        writeln!(f, "Overall Cost  {}", StatsRow(&r.overall))?;
        writeln!(f, "Buy           {}", StatsRow(&r.buy))?;
        writeln!(f, "Sell          {}", StatsRow(&r.sell))?;
        writeln!(
            f,
            "\nOver Fills: {} cases, lost ${:.2}",
            r.over_fills.count,
            r.over_fills.dollars_lost.to_f64()
        )?;

        writeln!(f, "\nPer aggr level:")?;
        for g in &r.by_aggressiveness {
            writeln!(f, "{}   {}", g.key, StatsRow(&g.stats))?;
        }

        writeln!(
            f,
            "\nPer time basket (the time refers only to the opening of the trade requests)"
        )?;
        writeln!(f, "{}", TABLE_HEADER)?;
        for g in &r.by_time {
            writeln!(f, "{}   {}", g.key, StatsRow(&g.stats))?;
        }

        write_symbols(f, r)?;
        write_rankings(f, r)?;

        writeln!(f, "\nPer input file (server instance)")?;
        for g in &r.by_source {
            let s = &g.stats;
            writeln!(
                f,
                "{}  {:11.2} {:6.2} {:+8.2} {:8.2}",
                g.key,
                s.dollars_requested.to_f64(),
                pct(s.fill_rate_usd),
                s.dollar_slippage.to_f64(),
                s.dollar_opp_cost.to_f64(),
            )?;
        }

        write_diagnostics(f, r)
    }
}
