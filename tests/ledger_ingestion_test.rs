use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xirrfolio::analysis::{build_report, ReportMode, SymbolSelection};
use xirrfolio::datasource::{load_ledger, read_aliases, read_tradebooks, AliasTable};
use xirrfolio::domain::DataQualityWarning;
use xirrfolio::{Decimal, Symbol, TradeType};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn valuation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 12, 31).unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

const HEADER: &str = "symbol,isin,trade_date,exchange,trade_type,quantity,price\n";

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(
        dir,
        "tradebook-2021.csv",
        &format!(
            "{}INFY,INE009A01021,2021-03-01,NSE,SELL,5,1400\n\
             AEL-BE,INE423A01024,2021-02-01,NSE,buy,2,900\n",
            HEADER
        ),
    );
    write(
        dir,
        "tradebook-2020.csv",
        &format!(
            "{}infy,INE009A01021,2020-01-15,NSE,buy,10,700\n\
             TCS,INE467B01029,2020-02-01,NSE,bonus,1,0\n\
             TCS,INE467B01029,not-a-date,NSE,buy,1,2000\n\
             MINDTREE,INE018I01017,15-06-2020,NSE,buy,3,1000\n",
            HEADER
        ),
    );
    // Ignored: wrong prefix.
    write(dir, "notes.csv", "symbol,trade_date\nXYZ,2020-01-01\n");
    write(
        dir,
        "holdings.csv",
        "Instrument,Qty.,Avg. cost,LTP\nINFY,5,700,1700\nLTIM,3,1000,5000\nBAD,x,1,1\n",
    );
    write(dir, "aliases.csv", "MINDTREE, LTIM\nONLY_ONE_COLUMN\n");
    temp
}

#[test]
fn test_load_ledger_normalises_and_skips() {
    let temp = fixture();
    let dir = temp.path();
    let ledger = load_ledger(
        dir,
        "holdings.csv",
        Some(&dir.join("aliases.csv")),
        valuation_date(),
    )
    .unwrap();

    // Files are read in name order: 2020 before 2021.
    let symbols: Vec<&str> = ledger.trades.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["INFY", "LTIM", "INFY", "AEL"]);
    assert_eq!(ledger.trades[0].trade_type, TradeType::Buy);
    assert_eq!(ledger.trades[2].trade_type, TradeType::Sell);
    assert_eq!(
        ledger.trades[1].trade_date,
        NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()
    );

    assert_eq!(ledger.holdings.len(), 2);
    assert!(ledger
        .holdings
        .iter()
        .all(|t| t.trade_type == TradeType::Sell && t.trade_date == valuation_date()));
    assert_eq!(ledger.holdings[1].symbol, Symbol::new("LTIM"));
    assert_eq!(ledger.holdings[1].price, d("5000"));

    assert_eq!(ledger.warnings.len(), 3);
    assert!(matches!(
        &ledger.warnings[0],
        DataQualityWarning::UnrecognizedTradeType { value, .. } if value == "bonus"
    ));
    assert!(matches!(
        &ledger.warnings[1],
        DataQualityWarning::InvalidRecord { origin, .. } if origin.starts_with("tradebook-2020.csv:")
    ));
    assert!(matches!(
        &ledger.warnings[2],
        DataQualityWarning::InvalidRecord { origin, .. } if origin.starts_with("holdings.csv:")
    ));
}

#[test]
fn test_missing_holdings_and_aliases_are_tolerated() {
    let temp = fixture();
    let dir = temp.path();
    let ledger = load_ledger(
        dir,
        "no-such-holdings.csv",
        Some(&dir.join("no-such-aliases.csv")),
        valuation_date(),
    )
    .unwrap();
    assert!(ledger.holdings.is_empty());
    // Without aliases MINDTREE keeps its own name.
    assert!(ledger.trades.iter().any(|t| t.symbol.as_str() == "MINDTREE"));
}

#[test]
fn test_read_aliases_skips_malformed_rows() {
    let temp = fixture();
    let table = read_aliases(&temp.path().join("aliases.csv")).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.normalize("MINDTREE"), Symbol::new("LTIM"));
}

#[test]
fn test_tradebook_missing_required_column_fails() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "tradebook-x.csv",
        "symbol,trade_date,trade_type,quantity\nINFY,2020-01-01,buy,1\n",
    );
    assert!(read_tradebooks(temp.path(), &AliasTable::new()).is_err());
}

#[test]
fn test_missing_directory_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");
    assert!(read_tradebooks(&missing, &AliasTable::new()).is_err());
}

#[test]
fn test_report_over_loaded_ledger() {
    let temp = fixture();
    let dir = temp.path();
    let ledger = load_ledger(
        dir,
        "holdings.csv",
        Some(&dir.join("aliases.csv")),
        valuation_date(),
    )
    .unwrap();

    let report = build_report(
        &ledger.with_holdings(),
        &ledger.warnings,
        ReportMode::Xirr,
        &SymbolSelection::All,
    );
    assert!(report.portfolio_xirr.as_ref().unwrap().is_ok());

    let infy = &report.symbols.results[&Symbol::new("INFY")];
    // -7000 + 7000 + 8500
    assert_eq!(infy.profit, d("8500"));
    assert_eq!(infy.percent_return, d("121.43"));
    assert!(infy.rate.is_ok());

    assert_eq!(report.symbols.symbols_with_no_sells, vec![Symbol::new("AEL")]);
    assert!(report.render().contains("symbols_with_no_sells"));
}
