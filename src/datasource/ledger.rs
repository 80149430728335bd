//! Ledger normalisation from brokerage CSV exports.
//!
//! Produces validated trade records from tradebook files and from a holdings
//! export (current holdings treated as sells on the valuation date). Rows that
//! cannot be used are skipped with a data-quality warning.

use super::{parse_date_flexible, DataSourceError};
use crate::domain::{
    DataQualityWarning, Decimal, Symbol, TradeRecord, TradeType, UnrecognizedTradeType,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

const TRADEBOOK_PREFIX: &str = "tradebook-";
const TRADEBOOK_SUFFIX: &str = ".csv";
const TRADEBOOK_COLUMNS: [&str; 5] = ["symbol", "trade_date", "trade_type", "quantity", "price"];
const HOLDINGS_COLUMNS: [&str; 3] = ["Instrument", "Qty.", "LTP"];

/// Normalised trades plus everything skipped on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Executed trades from the tradebooks.
    pub trades: Vec<TradeRecord>,
    /// Current holdings as notional sells on the valuation date.
    pub holdings: Vec<TradeRecord>,
    pub warnings: Vec<DataQualityWarning>,
}

impl Ledger {
    pub fn extend(&mut self, other: Ledger) {
        self.trades.extend(other.trades);
        self.holdings.extend(other.holdings);
        self.warnings.extend(other.warnings);
    }

    /// Executed trades followed by the holdings-as-sells.
    pub fn with_holdings(&self) -> Vec<TradeRecord> {
        self.trades.iter().chain(&self.holdings).cloned().collect()
    }

    /// Distinct symbols across trades and holdings, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.trades
            .iter()
            .chain(&self.holdings)
            .map(|t| t.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Static symbol substitution table (old name -> current name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        self.aliases
            .insert(from.trim().to_uppercase(), to.trim().to_uppercase());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Cut any exchange series suffix (`AEL-BE` -> `AEL`), then apply the alias.
    pub fn normalize(&self, raw: &str) -> Symbol {
        let base = raw.trim().split('-').next().unwrap_or_default().to_uppercase();
        match self.aliases.get(&base) {
            Some(alias) => {
                debug!(from = %base, to = %alias, "Replacing symbol alias");
                Symbol::new(alias)
            }
            None => Symbol::new(base),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTradeRow {
    symbol: String,
    trade_date: String,
    trade_type: String,
    quantity: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct RawHoldingRow {
    #[serde(rename = "Instrument")]
    instrument: String,
    #[serde(rename = "Qty.")]
    quantity: String,
    #[serde(rename = "LTP")]
    ltp: String,
}

/// Read a two-column alias file. A missing file yields an empty table.
///
/// # Errors
/// Fails only if an existing file cannot be read.
pub fn read_aliases(path: &Path) -> Result<AliasTable, DataSourceError> {
    let mut table = AliasTable::new();
    if !path.exists() {
        warn!(path = %path.display(), "Alias file not found");
        return Ok(table);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| io_error(path, e))?;

    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        match (record.len(), record.get(0), record.get(1)) {
            (2, Some(from), Some(to)) => table.insert(from, to),
            (_, Some(first), _) if record.len() > 1 || !first.is_empty() => {
                warn!(row = ?record, "Skipping alias row with incorrect number of values");
            }
            _ => {}
        }
    }
    Ok(table)
}

/// Read every `tradebook-*.csv` in `dir`, in filename order.
///
/// # Errors
/// Fails if the directory cannot be listed, a file cannot be read, or a file
/// lacks one of the required columns.
pub fn read_tradebooks(dir: &Path, aliases: &AliasTable) -> Result<Ledger, DataSourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(TRADEBOOK_PREFIX) && n.ends_with(TRADEBOOK_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut ledger = Ledger::default();
    for path in paths {
        info!(path = %path.display(), "Reading tradebook");
        ledger.extend(read_tradebook(&path, aliases)?);
    }
    Ok(ledger)
}

fn read_tradebook(path: &Path, aliases: &AliasTable) -> Result<Ledger, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| io_error(path, e))?;
    let headers = reader.headers().map_err(|e| parse_error(path, e))?.clone();
    require_columns(path, &headers, &TRADEBOOK_COLUMNS)?;

    let mut ledger = Ledger::default();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        let origin = origin(path, &record);
        let row: RawTradeRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(e) => {
                skip(&mut ledger, DataQualityWarning::InvalidRecord {
                    origin,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match trade_from_row(&row, aliases, &origin) {
            Ok(trade) => ledger.trades.push(trade),
            Err(warning) => skip(&mut ledger, warning),
        }
    }
    Ok(ledger)
}

fn trade_from_row(
    row: &RawTradeRow,
    aliases: &AliasTable,
    origin: &str,
) -> Result<TradeRecord, DataQualityWarning> {
    let invalid = |reason: String| DataQualityWarning::InvalidRecord {
        origin: origin.to_string(),
        reason,
    };

    let trade_type: TradeType =
        row.trade_type
            .parse()
            .map_err(|UnrecognizedTradeType(value)| DataQualityWarning::UnrecognizedTradeType {
                origin: origin.to_string(),
                value,
            })?;
    let trade_date = parse_date_flexible(&row.trade_date)
        .ok_or_else(|| invalid(format!("bad trade_date {:?}", row.trade_date)))?;
    let quantity = Decimal::from_str_canonical(&row.quantity)
        .map_err(|_| invalid(format!("bad quantity {:?}", row.quantity)))?;
    let price = Decimal::from_str_canonical(&row.price)
        .map_err(|_| invalid(format!("bad price {:?}", row.price)))?;

    TradeRecord::new(aliases.normalize(&row.symbol), trade_date, trade_type, quantity, price)
        .map_err(|e| invalid(e.to_string()))
}

/// Convert a holdings export into sell trades at the last traded price,
/// dated `valuation_date`, returned in [`Ledger::holdings`]. A missing file
/// yields an empty ledger.
///
/// # Errors
/// Fails if an existing file cannot be read or lacks required columns.
pub fn read_holdings_as_sells(
    path: &Path,
    aliases: &AliasTable,
    valuation_date: NaiveDate,
) -> Result<Ledger, DataSourceError> {
    let mut ledger = Ledger::default();
    if !path.exists() {
        warn!(path = %path.display(), "Holdings file not found, no present value added");
        return Ok(ledger);
    }
    info!(path = %path.display(), "Reading holdings");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| io_error(path, e))?;
    let headers = reader.headers().map_err(|e| parse_error(path, e))?.clone();
    require_columns(path, &headers, &HOLDINGS_COLUMNS)?;

    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        let origin = origin(path, &record);
        let parsed = record
            .deserialize::<RawHoldingRow>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(|row| {
                let quantity = Decimal::from_str_canonical(&row.quantity)
                    .map_err(|_| format!("bad quantity {:?}", row.quantity))?;
                let price = Decimal::from_str_canonical(&row.ltp)
                    .map_err(|_| format!("bad LTP {:?}", row.ltp))?;
                TradeRecord::new(
                    aliases.normalize(&row.instrument),
                    valuation_date,
                    TradeType::Sell,
                    quantity,
                    price,
                )
                .map_err(|e| e.to_string())
            });
        match parsed {
            Ok(trade) => ledger.holdings.push(trade),
            Err(reason) => skip(&mut ledger, DataQualityWarning::InvalidRecord { origin, reason }),
        }
    }
    debug!(holdings = ledger.holdings.len(), "Converted holdings to sell trades");
    Ok(ledger)
}

/// Assemble the full ledger: tradebooks plus holdings-as-sells.
///
/// # Errors
/// Propagates any file-level failure; row-level problems become warnings.
pub fn load_ledger(
    dir: &Path,
    holdings_file: &str,
    aliases_file: Option<&Path>,
    valuation_date: NaiveDate,
) -> Result<Ledger, DataSourceError> {
    let aliases = match aliases_file {
        Some(path) => read_aliases(path)?,
        None => AliasTable::new(),
    };

    let mut ledger = read_tradebooks(dir, &aliases)?;
    ledger.extend(read_holdings_as_sells(
        &dir.join(holdings_file),
        &aliases,
        valuation_date,
    )?);

    if let Some(last) = ledger.trades.iter().map(|t| t.trade_date).max() {
        if last > valuation_date && !ledger.holdings.is_empty() {
            warn!(last_trade = %last, valuation_date = %valuation_date, "Trades recorded after the valuation date");
        }
    }
    info!(
        trades = ledger.trades.len(),
        holdings = ledger.holdings.len(),
        skipped = ledger.warnings.len(),
        "Ledger loaded"
    );
    Ok(ledger)
}

fn skip(ledger: &mut Ledger, warning: DataQualityWarning) {
    warn!("{}", warning);
    ledger.warnings.push(warning);
}

fn origin(path: &Path, record: &csv::StringRecord) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match record.position() {
        Some(pos) => format!("{}:{}", name, pos.line()),
        None => name,
    }
}

fn require_columns(
    path: &Path,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), DataSourceError> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(DataSourceError::ParseError(format!(
                "{}: missing column {}",
                path.display(),
                column
            )));
        }
    }
    Ok(())
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> DataSourceError {
    DataSourceError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn parse_error(path: &Path, e: csv::Error) -> DataSourceError {
    DataSourceError::ParseError(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalize_cuts_series_suffix() {
        let table = AliasTable::new();
        assert_eq!(table.normalize("AEL-BE"), Symbol::new("AEL"));
        assert_eq!(table.normalize(" infy "), Symbol::new("INFY"));
    }

    #[test]
    fn test_alias_normalize_applies_alias_after_cut() {
        let mut table = AliasTable::new();
        table.insert("MINDTREE", "LTIM");
        assert_eq!(table.normalize("MINDTREE-EQ"), Symbol::new("LTIM"));
        assert_eq!(table.normalize("mindtree"), Symbol::new("LTIM"));
    }

    #[test]
    fn test_trade_from_row_flags_unknown_trade_type() {
        let row = RawTradeRow {
            symbol: "INFY".to_string(),
            trade_date: "2020-01-01".to_string(),
            trade_type: "bonus".to_string(),
            quantity: "1".to_string(),
            price: "0".to_string(),
        };
        let err = trade_from_row(&row, &AliasTable::new(), "t.csv:2").unwrap_err();
        assert_eq!(
            err,
            DataQualityWarning::UnrecognizedTradeType {
                origin: "t.csv:2".to_string(),
                value: "bonus".to_string()
            }
        );
    }

    #[test]
    fn test_trade_from_row_rejects_zero_quantity() {
        let row = RawTradeRow {
            symbol: "INFY".to_string(),
            trade_date: "2020-01-01".to_string(),
            trade_type: "buy".to_string(),
            quantity: "0".to_string(),
            price: "10".to_string(),
        };
        let err = trade_from_row(&row, &AliasTable::new(), "t.csv:2").unwrap_err();
        assert!(matches!(err, DataQualityWarning::InvalidRecord { .. }));
    }

    #[test]
    fn test_trade_from_row_rejects_out_of_range_consideration() {
        let row = RawTradeRow {
            symbol: "BIG".to_string(),
            trade_date: "2020-01-01".to_string(),
            trade_type: "buy".to_string(),
            quantity: "100000000000000000".to_string(),
            price: "10000000000000".to_string(),
        };
        match trade_from_row(&row, &AliasTable::new(), "t.csv:3").unwrap_err() {
            DataQualityWarning::InvalidRecord { origin, reason } => {
                assert_eq!(origin, "t.csv:3");
                assert!(reason.starts_with("consideration of"), "{}", reason);
            }
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_ledger_symbols_are_distinct_and_sorted() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mk = |s: &str| {
            TradeRecord::new(Symbol::new(s), date, TradeType::Buy, Decimal::from(1), Decimal::from(1))
                .unwrap()
        };
        let ledger = Ledger {
            trades: vec![mk("B"), mk("A")],
            holdings: vec![mk("C"), mk("B")],
            warnings: vec![],
        };
        assert_eq!(
            ledger.symbols(),
            vec![Symbol::new("A"), Symbol::new("B"), Symbol::new("C")]
        );
        assert_eq!(ledger.with_holdings().len(), 4);
    }
}
