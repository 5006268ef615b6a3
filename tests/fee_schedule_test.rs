use execcost::domain::{Liquidity, Venue};
use execcost::fees::{FeeError, FeeOracle, Tape};
use execcost::{Decimal, FeeSchedule, Symbol};
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn write_tables(dir: &TempDir, exchanges: &str) -> (String, String, String) {
    let write = |name: &str, content: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    };
    (
        write(
            "brokerage.csv",
            "#ECN, TAPE_A_TAKE, TAPE_A_ADD, TAPE_B_TAKE, TAPE_B_ADD, TAPE_C_TAKE, TAPE_C_ADD\n\
             BROKERAGE_FEE_PER_SHARE, 0.001\n\
             ISLD, 0.003, -0.002, 0.003, -0.002, 0.003, -0.0025\n",
        ),
        write(
            "global.csv",
            "# regulatory\n\
             SEC_FEE_PER_MILLION_DOLLARS, 22.10\n\
             SEC_MIN_FEE, 0.01\n\
             NASD_FEE_PER_SHARE, 0.000119\n\
             NASD_MIN_FEE, 0.01\n\
             NASD_MAX_FEE, 5.95\n",
        ),
        write("exchanges.csv", exchanges),
    )
}

#[test]
fn test_load_from_disk_and_quote() {
    let dir = TempDir::new().unwrap();
    let (b, g, e) = write_tables(&dir, "MSFT,NASDAQ\nGE,NYSE\n");
    let schedule = FeeSchedule::load(b, g, e).unwrap();

    assert_eq!(schedule.tape_of(&Symbol::new("MSFT")), Tape::C);
    assert_eq!(schedule.tape_of(&Symbol::new("GE")), Tape::A);

    let quote = schedule
        .quote(
            &Symbol::new("MSFT"),
            &Venue::new("ISLD"),
            -1000,
            d("25.00"),
            Liquidity::Add,
        )
        .unwrap();
    assert_eq!(quote.venue_fee, d("-2.5"));
    // Brokerage 1.00, SEC 0.5525 -> 0.55, NASD 0.119 -> 0.12.
    assert_eq!(quote.other_fee, d("1.67"));

    let buy = schedule
        .quote(&Symbol::new("GE"), &Venue::new("ISLD"), 1000, d("25.00"), Liquidity::Remove)
        .unwrap();
    assert_eq!(buy.venue_fee, d("3"));
    assert_eq!(buy.other_fee, d("1"));
}

#[test]
fn test_missing_table_is_io_error() {
    let dir = TempDir::new().unwrap();
    let (b, g, _) = write_tables(&dir, "");
    let missing = dir.path().join("nope.csv");
    let err = FeeSchedule::load(b, g, missing).unwrap_err();
    assert!(matches!(err, FeeError::Io { .. }));
}

#[test]
fn test_unknown_listing_exchange_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (b, g, e) = write_tables(&dir, "XYZ,LSE\n");
    let err = FeeSchedule::load(b, g, e).unwrap_err();
    assert!(matches!(err, FeeError::UnknownExchange { .. }));
}

#[test]
fn test_unknown_venue_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (b, g, e) = write_tables(&dir, "GE,NYSE\n");
    let schedule = FeeSchedule::load(b, g, e).unwrap();
    let err = schedule
        .quote(&Symbol::new("GE"), &Venue::new("EDGX"), 100, d("10"), Liquidity::Add)
        .unwrap_err();
    assert!(matches!(err, FeeError::UnknownVenue(_)));
}
