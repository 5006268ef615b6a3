//! Tokenizing request and fill lines of the algorithm's cost log.
//!
//! Request:
//! `2011/07/29 10:41:30.642829 INFO REQ USB currPos: 7998 qty: 2 at aggr 3.500 (26.01,26.02) [orderID: 1]`
//!
//! Stop request:
//! `2011/07/29 10:43:14.350830 INFO REQ BPOP pos: 0 (qtyLeft: 0) (2.31,2.32) #stop`
//!
//! Fill:
//! `2011/07/29 10:41:33.561628 INFO FILL USB BATS 2@26.01 (26.01,26.02) A (orderID: 1, seqnum: 240994095) Algo: JOIN_QUEUE`

use crate::domain::{
    Decimal, EventError, FillLine, Liquidity, RequestLine, Source, Symbol, TimeUs, Venue,
};
use chrono::Timelike;

/// A tokenized log record, not yet bound to per-symbol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Request(RequestLine),
    Fill(FillLine),
}

/// Stateless tokenizer for single log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogParser;

impl LogParser {
    /// Parse one line. Returns `Ok(None)` for blank lines and `#implicit` records.
    pub fn parse_line(
        line: &str,
        source: &Source,
        seq: u64,
    ) -> Result<Option<RawRecord>, EventError> {
        let (live, comment) = match line.split_once('#') {
            Some((live, comment)) => (live, comment),
            None => (line, ""),
        };
        if comment.trim().starts_with("implicit") || live.trim().is_empty() {
            return Ok(None);
        }

        let tokens: Vec<&str> = live.split_whitespace().collect();
        if tokens.len() < 5 {
            return Err(malformed("too few fields", line));
        }

        let time = parse_time(tokens[1]).ok_or_else(|| malformed("bad timestamp", line))?;
        let symbol = Symbol::new(tokens[4]);

        match tokens[3] {
            "REQ" => parse_request(&tokens, time, symbol, source, line).map(|r| Some(RawRecord::Request(r))),
            "FILL" => parse_fill(&tokens, time, symbol, source, seq, line).map(|f| Some(RawRecord::Fill(f))),
            other => Err(EventError::Malformed(format!(
                "unknown record type {:?}: {}",
                other,
                line.trim_end()
            ))),
        }
    }

    /// Best-effort symbol of a line that may not parse.
    pub fn symbol_hint(line: &str) -> Option<Symbol> {
        let live = line.split('#').next().unwrap_or(line);
        let tokens: Vec<&str> = live.split_whitespace().collect();
        match tokens.get(3) {
            Some(&"REQ") | Some(&"FILL") => tokens.get(4).map(|s| Symbol::new(*s)),
            _ => None,
        }
    }
}

fn malformed(what: &str, line: &str) -> EventError {
    EventError::Malformed(format!("{}: {}", what, line.trim_end()))
}

/// `HH:MM:SS[.ffffff]` to microseconds since midnight.
pub fn parse_time(token: &str) -> Option<TimeUs> {
    let t = chrono::NaiveTime::parse_from_str(token, "%H:%M:%S%.f").ok()?;
    let micros = t.num_seconds_from_midnight() as i64 * 1_000_000 + (t.nanosecond() / 1_000) as i64;
    Some(TimeUs::new(micros))
}

/// `(BID,ASK)` to its two prices. Either side may be absent.
fn parse_quote(token: Option<&str>, line: &str) -> Result<(Option<Decimal>, Option<Decimal>), EventError> {
    let Some(token) = token else {
        return Ok((None, None));
    };
    let inner = token.trim_start_matches('(').trim_end_matches(')');
    let (bid, ask) = inner.split_once(',').unwrap_or((inner, ""));
    let side = |s: &str| -> Result<Option<Decimal>, EventError> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        Decimal::from_str_canonical(s)
            .map(Some)
            .map_err(|_| malformed("bad bid/ask", line))
    };
    Ok((side(bid)?, side(ask)?))
}

fn is_quote_token(token: &str) -> bool {
    token.starts_with('(') && token.ends_with(')') && token.contains(',')
}

/// Value following `key` in the token list.
fn value_after<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| *t == key)
        .and_then(|i| tokens.get(i + 1).copied())
}

fn parse_int(token: Option<&str>, what: &str, line: &str) -> Result<i64, EventError> {
    token
        .map(|t| t.trim_end_matches(')'))
        .and_then(|t| t.parse::<i64>().ok())
        .ok_or_else(|| malformed(what, line))
}

fn parse_request(
    tokens: &[&str],
    time: TimeUs,
    symbol: Symbol,
    source: &Source,
    line: &str,
) -> Result<RequestLine, EventError> {
    let rest = &tokens[5..];
    let is_stop = rest.contains(&"pos:") && rest.contains(&"(qtyLeft:");

    let (position, qty, aggressiveness) = if is_stop {
        (
            parse_int(value_after(rest, "pos:"), "bad position", line)?,
            parse_int(value_after(rest, "(qtyLeft:"), "bad qtyLeft", line)?,
            None,
        )
    } else {
        let aggr = value_after(rest, "aggr")
            .and_then(|t| Decimal::from_str_canonical(t).ok())
            .ok_or_else(|| malformed("bad aggressiveness", line))?;
        (
            parse_int(value_after(rest, "currPos:"), "bad position", line)?,
            parse_int(value_after(rest, "qty:"), "bad qty", line)?,
            Some(aggr),
        )
    };

    let (bid, ask) = parse_quote(rest.iter().copied().find(|t| is_quote_token(t)), line)?;

    Ok(RequestLine {
        time,
        symbol,
        source: source.clone(),
        position,
        qty,
        aggressiveness,
        bid,
        ask,
    })
}

fn parse_fill(
    tokens: &[&str],
    time: TimeUs,
    symbol: Symbol,
    source: &Source,
    seq: u64,
    line: &str,
) -> Result<FillLine, EventError> {
    let venue = tokens
        .get(5)
        .map(|v| Venue::new(*v))
        .ok_or_else(|| malformed("missing venue", line))?;

    let (size, price) = tokens
        .get(6)
        .and_then(|t| t.split_once('@'))
        .ok_or_else(|| malformed("missing SIZE@PRICE", line))?;
    let size = size
        .parse::<i64>()
        .map_err(|_| malformed("bad fill size", line))?;
    let price = Decimal::from_str_canonical(price).map_err(|_| malformed("bad fill price", line))?;

    let quote_token = tokens.get(7).copied().filter(|t| is_quote_token(t));
    let (bid, ask) = parse_quote(quote_token, line)?;
    let liquidity_index = if quote_token.is_some() { 8 } else { 7 };
    let liquidity = tokens
        .get(liquidity_index)
        .map(|flag| Liquidity::from_flag(flag))
        .unwrap_or(Liquidity::Other);

    Ok(FillLine {
        time,
        symbol,
        source: source.clone(),
        venue,
        size,
        price,
        bid,
        ask,
        liquidity,
        seq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn src() -> Source {
        Source::new("srv1.log")
    }

    #[test]
    fn parses_request_line() {
        let line = "2011/07/29 10:41:30.642829 INFO REQ USB currPos: 7998 qty: 2 at aggr 3.500 (26.01,26.02) [orderID: 1]";
        let Some(RawRecord::Request(r)) = LogParser::parse_line(line, &src(), 1).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(r.symbol.as_str(), "USB");
        assert_eq!(r.position, 7998);
        assert_eq!(r.qty, 2);
        assert_eq!(r.aggressiveness, Some(d("3.5")));
        assert_eq!(r.bid, Some(d("26.01")));
        assert_eq!(r.ask, Some(d("26.02")));
        assert_eq!(r.time, TimeUs::new((10 * 3600 + 41 * 60 + 30) * 1_000_000 + 642_829));
    }

    #[test]
    fn parses_stop_request_line() {
        let line = "2011/07/29 10:43:14.350830 INFO REQ BPOP pos: 0 (qtyLeft: 0) (2.31,2.32) #stop";
        let Some(RawRecord::Request(r)) = LogParser::parse_line(line, &src(), 2).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(r.position, 0);
        assert_eq!(r.qty, 0);
        assert_eq!(r.aggressiveness, None);
        assert_eq!(r.bid, Some(d("2.31")));
    }

    #[test]
    fn parses_fill_line() {
        let line = "2011/07/29 10:41:33.561628 INFO FILL USB BATS -2@26.01 (26.01,26.02) R (orderID: 1, seqnum: 240994095) Algo: JOIN_QUEUE";
        let Some(RawRecord::Fill(f)) = LogParser::parse_line(line, &src(), 7).unwrap() else {
            panic!("expected fill");
        };
        assert_eq!(f.venue.as_str(), "BATS");
        assert_eq!(f.size, -2);
        assert_eq!(f.price, d("26.01"));
        assert_eq!(f.liquidity, Liquidity::Remove);
        assert_eq!(f.seq, 7);
    }

    #[test]
    fn fill_without_quote_parses_with_missing_bid_ask() {
        let line = "2011/07/29 10:41:33.561628 INFO FILL USB BATS 2@26.01 A";
        let Some(RawRecord::Fill(f)) = LogParser::parse_line(line, &src(), 1).unwrap() else {
            panic!("expected fill");
        };
        assert_eq!(f.bid, None);
        assert_eq!(f.liquidity, Liquidity::Add);
    }

    #[test]
    fn implicit_and_blank_lines_are_ignored() {
        let implicit = "2011/07/29 10:41:30.1 INFO REQ USB currPos: 0 qty: 2 at aggr 1 (1,2) #implicit";
        assert_eq!(LogParser::parse_line(implicit, &src(), 1).unwrap(), None);
        assert_eq!(LogParser::parse_line("   ", &src(), 2).unwrap(), None);
    }

    #[test]
    fn malformed_lines_are_errors() {
        let bad_time = "2011/07/29 25:99 INFO REQ USB currPos: 0 qty: 2 at aggr 1 (1,2)";
        assert!(matches!(
            LogParser::parse_line(bad_time, &src(), 1),
            Err(EventError::Malformed(_))
        ));

        let bad_size = "2011/07/29 10:41:33.5 INFO FILL USB BATS x@26.01 (26.01,26.02) A";
        assert!(matches!(
            LogParser::parse_line(bad_size, &src(), 1),
            Err(EventError::Malformed(_))
        ));

        let unknown = "2011/07/29 10:41:33.5 INFO CXL USB BATS";
        assert!(matches!(
            LogParser::parse_line(unknown, &src(), 1),
            Err(EventError::Malformed(_))
        ));
    }

    #[test]
    fn symbol_hint_survives_bad_lines() {
        let line = "2011/07/29 10:41:33.5 INFO FILL USB BATS x@26.01";
        assert_eq!(LogParser::symbol_hint(line), Some(Symbol::new("USB")));
        assert_eq!(LogParser::symbol_hint("junk"), None);
    }

    #[test]
    fn parse_time_whole_seconds() {
        assert_eq!(parse_time("16:00:00"), Some(TimeUs::from_secs(57_600)));
        assert_eq!(parse_time("nope"), None);
    }
}
