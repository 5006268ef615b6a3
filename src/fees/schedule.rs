//! Table-driven fee schedule loaded from brokerage, global and exchange files.

use super::{FeeError, FeeOracle, FeeQuote};
use crate::domain::{Decimal, Liquidity, Symbol, Venue};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const NA_CELL: &str = "N.A.";
const NA_FEE_PER_SHARE: i64 = 10_000_000;
const BROKERAGE_ROW: &str = "BROKERAGE_FEE_PER_SHARE";

/// Consolidated tape a listing exchange reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tape {
    A,
    B,
    C,
}

impl Tape {
    /// Map a listing exchange to its tape.
    pub fn from_exchange(exchange: &str) -> Option<Self> {
        match exchange {
            "NYSE" => Some(Tape::A),
            "ARCA" | "AMEX" => Some(Tape::B),
            "ISLD" | "NSDQ" | "NASDAQ" | NA_CELL => Some(Tape::C),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tape::A => write!(f, "A"),
            Tape::B => write!(f, "B"),
            Tape::C => write!(f, "C"),
        }
    }
}

/// Per-share rates charged by one venue, by tape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VenueRates {
    take: HashMap<Tape, Decimal>,
    add: HashMap<Tape, Decimal>,
}

impl VenueRates {
    fn rate(&self, tape: Tape, liquidity: Liquidity) -> Option<Decimal> {
        match liquidity {
            Liquidity::Add => self.add.get(&tape).copied(),
            Liquidity::Remove => self.take.get(&tape).copied(),
            Liquidity::Other => Some(Decimal::zero()),
        }
    }
}

/// Regulatory fees applied to sells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalFees {
    pub sec_fee_per_million_dollars: Decimal,
    pub sec_min_fee: Decimal,
    pub nasd_fee_per_share: Decimal,
    pub nasd_min_fee: Decimal,
    pub nasd_max_fee: Decimal,
}

impl GlobalFees {
    /// SEC Section 31 fee, charged on the dollar value of sells.
    pub fn sec_fee(&self, signed_size: i64, price: Decimal) -> Decimal {
        if signed_size >= 0 {
            return Decimal::zero();
        }
        let dollars = Decimal::from(signed_size.abs()) * price;
        let fee = (dollars / Decimal::from(1_000_000) * self.sec_fee_per_million_dollars).round_dp(2);
        if fee < self.sec_min_fee {
            self.sec_min_fee
        } else {
            fee
        }
    }

    /// NASD trading activity fee: per share on sells, rounded up to the cent.
    pub fn nasd_fee(&self, signed_size: i64) -> Decimal {
        if signed_size >= 0 {
            return Decimal::zero();
        }
        let fee = (self.nasd_fee_per_share * Decimal::from(signed_size.abs())).ceil_dp(2);
        if fee < self.nasd_min_fee {
            self.nasd_min_fee
        } else if fee > self.nasd_max_fee {
            self.nasd_max_fee
        } else {
            fee
        }
    }
}

/// Fee oracle backed by the brokerage, global and exchange tables.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    brokerage_fee_per_share: Decimal,
    venues: HashMap<String, VenueRates>,
    global: GlobalFees,
    symbol_tapes: HashMap<Symbol, Tape>,
}

impl FeeSchedule {
    /// Load the three tables from disk.
    pub fn load(
        brokerage_path: impl AsRef<Path>,
        global_path: impl AsRef<Path>,
        exchanges_path: impl AsRef<Path>,
    ) -> Result<Self, FeeError> {
        Self::from_readers(
            open(brokerage_path.as_ref())?,
            open(global_path.as_ref())?,
            open(exchanges_path.as_ref())?,
        )
    }

    pub fn from_readers<B: Read, G: Read, E: Read>(
        brokerage: B,
        global: G,
        exchanges: E,
    ) -> Result<Self, FeeError> {
        let (brokerage_fee_per_share, venues) = parse_brokerage_table(brokerage)?;
        let global = parse_global_fees(global)?;
        let symbol_tapes = parse_exchanges(exchanges)?;

        tracing::info!(
            venues = venues.len(),
            symbols = symbol_tapes.len(),
            "Loaded fee schedule"
        );

        Ok(Self {
            brokerage_fee_per_share,
            venues,
            global,
            symbol_tapes,
        })
    }

    pub fn global(&self) -> &GlobalFees {
        &self.global
    }

    /// Tape of the symbol's listing exchange; tape A when the symbol is unlisted.
    pub fn tape_of(&self, symbol: &Symbol) -> Tape {
        self.symbol_tapes.get(symbol).copied().unwrap_or(Tape::A)
    }

    pub fn venue_fee(
        &self,
        symbol: &Symbol,
        venue: &Venue,
        signed_size: i64,
        liquidity: Liquidity,
    ) -> Result<Decimal, FeeError> {
        let rates = self
            .venues
            .get(venue.as_str())
            .ok_or_else(|| FeeError::UnknownVenue(venue.to_string()))?;
        let tape = self.tape_of(symbol);
        let rate = rates
            .rate(tape, liquidity)
            .ok_or_else(|| FeeError::MissingRate {
                venue: venue.to_string(),
                tape,
                liquidity,
            })?;
        Ok(Decimal::from(signed_size.abs()) * rate)
    }

    /// Brokerage plus regulatory fees.
    pub fn other_fees(&self, signed_size: i64, price: Decimal) -> Decimal {
        Decimal::from(signed_size.abs()) * self.brokerage_fee_per_share
            + self.global.sec_fee(signed_size, price)
            + self.global.nasd_fee(signed_size)
    }
}

impl FeeOracle for FeeSchedule {
    fn quote(
        &self,
        symbol: &Symbol,
        venue: &Venue,
        signed_size: i64,
        price: Decimal,
        liquidity: Liquidity,
    ) -> Result<FeeQuote, FeeError> {
        Ok(FeeQuote {
            venue_fee: self.venue_fee(symbol, venue, signed_size, liquidity)?,
            other_fee: self.other_fees(signed_size, price),
        })
    }
}

fn open(path: &Path) -> Result<std::fs::File, FeeError> {
    std::fs::File::open(path).map_err(|source| FeeError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn reader<R: Read>(input: R, comments: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(if comments { Some(b'#') } else { None })
        .from_reader(input)
}

/// Non-empty trimmed cells of a row.
fn cells(record: &csv::StringRecord) -> Vec<String> {
    record
        .iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(field: &str, value: &str) -> Result<Decimal, FeeError> {
    Decimal::from_str_canonical(value).map_err(|_| FeeError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn parse_brokerage_table<R: Read>(
    input: R,
) -> Result<(Decimal, HashMap<String, VenueRates>), FeeError> {
    let mut rows = reader(input, false).into_records();

    let header = loop {
        match rows.next() {
            Some(record) => {
                let row = cells(&record?);
                if !row.is_empty() {
                    break row;
                }
            }
            None => return Err(FeeError::InvalidRow("empty brokerage table".to_string())),
        }
    };
    let first = header
        .first()
        .and_then(|c| c.strip_prefix('#'))
        .ok_or_else(|| FeeError::InvalidRow("brokerage table header must start with '#'".to_string()))?;
    let mut names: Vec<String> = vec![first.trim().to_string()];
    names.extend(header.iter().skip(1).cloned());
    names.retain(|n| !n.is_empty());

    let mut brokerage_fee_per_share = None;
    let mut venues = HashMap::new();

    for record in rows {
        let row = cells(&record?);
        if row.is_empty() {
            continue;
        }
        if row[0] == BROKERAGE_ROW {
            if row.len() != 2 {
                return Err(FeeError::InvalidRow(row.join(",")));
            }
            brokerage_fee_per_share = Some(parse_number(BROKERAGE_ROW, &row[1])?);
            continue;
        }
        if row.len() != names.len() {
            return Err(FeeError::InvalidRow(row.join(",")));
        }

        let mut venue_name = None;
        let mut rates = VenueRates::default();
        for (name, value) in names.iter().zip(row.iter()) {
            if name == "ECN" {
                venue_name = Some(value.clone());
                continue;
            }
            let rate = if value == NA_CELL {
                Decimal::from(NA_FEE_PER_SHARE)
            } else {
                parse_number(name, value)?
            };
            let Some((tape, kind)) = parse_rate_column(name) else {
                continue;
            };
            match kind {
                "TAKE" => {
                    rates.take.insert(tape, rate);
                }
                "ADD" => {
                    rates.add.insert(tape, rate);
                }
                // ROUTE columns are validated but never priced.
                _ => {}
            }
        }

        let venue_name =
            venue_name.ok_or_else(|| FeeError::InvalidRow("brokerage table has no ECN column".to_string()))?;
        venues.insert(venue_name, rates);
    }

    let brokerage_fee_per_share =
        brokerage_fee_per_share.ok_or_else(|| FeeError::MissingSetting(BROKERAGE_ROW.to_string()))?;
    Ok((brokerage_fee_per_share, venues))
}

/// `TAPE_B_ADD` -> (B, "ADD").
fn parse_rate_column(name: &str) -> Option<(Tape, &str)> {
    let rest = name.strip_prefix("TAPE_")?;
    let (tape, kind) = rest.split_once('_')?;
    let tape = match tape {
        "A" => Tape::A,
        "B" => Tape::B,
        "C" => Tape::C,
        _ => return None,
    };
    matches!(kind, "TAKE" | "ADD" | "ROUTE").then_some((tape, kind))
}

fn parse_global_fees<R: Read>(input: R) -> Result<GlobalFees, FeeError> {
    let mut settings: HashMap<String, Decimal> = HashMap::new();
    for record in reader(input, true).into_records() {
        let row = cells(&record?);
        if row.is_empty() {
            continue;
        }
        if row.len() != 2 {
            return Err(FeeError::InvalidRow(row.join(",")));
        }
        settings.insert(row[0].clone(), parse_number(&row[0], &row[1])?);
    }

    let get = |key: &str| {
        settings
            .get(key)
            .copied()
            .ok_or_else(|| FeeError::MissingSetting(key.to_string()))
    };

    Ok(GlobalFees {
        sec_fee_per_million_dollars: get("SEC_FEE_PER_MILLION_DOLLARS")?,
        sec_min_fee: get("SEC_MIN_FEE")?,
        nasd_fee_per_share: get("NASD_FEE_PER_SHARE")?,
        nasd_min_fee: get("NASD_MIN_FEE")?,
        nasd_max_fee: get("NASD_MAX_FEE")?,
    })
}

fn parse_exchanges<R: Read>(input: R) -> Result<HashMap<Symbol, Tape>, FeeError> {
    let mut tapes = HashMap::new();
    for record in reader(input, true).into_records() {
        let row = cells(&record?);
        if row.is_empty() {
            continue;
        }
        if row.len() != 2 {
            return Err(FeeError::InvalidRow(row.join(",")));
        }
        let tape = Tape::from_exchange(&row[1]).ok_or_else(|| FeeError::UnknownExchange {
            symbol: row[0].clone(),
            exchange: row[1].clone(),
        })?;
        tapes.insert(Symbol::new(row[0].clone()), tape);
    }
    Ok(tapes)
}
