//! Close-price loading and nearest-preceding lookup.

use super::{parse_date_flexible, DataSourceError, PricePoint, PriceSource};
use crate::domain::{Decimal, Symbol};
use crate::engine::PriceLookup;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RawPriceRow {
    symbol: String,
    date: String,
    close: String,
}

/// Prices read from a `symbol,date,close` CSV file.
///
/// The file is parsed once up front; rows that do not parse are logged and
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceSource {
    path: PathBuf,
    closes: HashMap<Symbol, Vec<PricePoint>>,
}

impl CsvPriceSource {
    /// # Errors
    /// Fails if the file cannot be opened or has no `symbol`, `date`, `close` columns.
    pub fn from_path(path: &Path) -> Result<Self, DataSourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataSourceError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut closes: HashMap<Symbol, Vec<PricePoint>> = HashMap::new();
        let mut rejected = 0usize;
        for row in reader.deserialize::<RawPriceRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Deserialize { .. }) => {
                    rejected += 1;
                    debug!(error = %e, "Skipping price row");
                    continue;
                }
                Err(e) => {
                    return Err(DataSourceError::ParseError(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            let (Some(date), Ok(close)) = (
                parse_date_flexible(&row.date),
                Decimal::from_str_canonical(&row.close),
            ) else {
                rejected += 1;
                continue;
            };
            closes
                .entry(Symbol::new(&row.symbol))
                .or_default()
                .push(PricePoint { date, close });
        }

        if rejected > 0 {
            warn!(path = %path.display(), rejected, "Dropped unparseable price rows");
        }
        info!(path = %path.display(), symbols = closes.len(), "Loaded price file");
        Ok(Self {
            path: path.to_path_buf(),
            closes,
        })
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn fetch_closes(&self, symbol: &Symbol) -> Result<Vec<PricePoint>, DataSourceError> {
        let points = self.closes.get(symbol).cloned().unwrap_or_default();
        if points.is_empty() {
            debug!(symbol = %symbol, path = %self.path.display(), "Symbol not in price file");
        }
        Ok(points)
    }
}

/// In-memory closes keyed by symbol, with nearest-preceding-date lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTable {
    closes: HashMap<Symbol, BTreeMap<NaiveDate, Decimal>>,
    unavailable: Vec<Symbol>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, date: NaiveDate, close: Decimal) {
        self.closes.entry(symbol).or_default().insert(date, close);
    }

    /// Symbols the source failed to provide during [`PriceTable::load`].
    pub fn unavailable(&self) -> &[Symbol] {
        &self.unavailable
    }

    pub fn symbol_count(&self) -> usize {
        self.closes.len()
    }

    /// Fetch closes for every symbol concurrently.
    ///
    /// A symbol whose fetch fails is recorded as unavailable; valuation later
    /// skips it.
    pub async fn load(source: &dyn PriceSource, symbols: &[Symbol]) -> Self {
        let fetches = symbols.iter().map(|symbol| async move {
            (symbol.clone(), source.fetch_closes(symbol).await)
        });
        let results = join_all(fetches).await;

        let mut table = Self::new();
        for (symbol, result) in results {
            match result {
                Ok(points) if !points.is_empty() => {
                    for point in points {
                        table.insert(symbol.clone(), point.date, point.close);
                    }
                }
                Ok(_) => {
                    warn!(symbol = %symbol, "No prices returned");
                    table.unavailable.push(symbol);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Price fetch failed");
                    table.unavailable.push(symbol);
                }
            }
        }
        table.unavailable.sort();
        info!(
            loaded = table.symbol_count(),
            unavailable = table.unavailable.len(),
            "Price table ready"
        );
        table
    }
}

impl PriceLookup for PriceTable {
    fn close_price(&self, symbol: &Symbol, date: NaiveDate) -> Option<Decimal> {
        self.closes
            .get(symbol)?
            .range(..=date)
            .next_back()
            .map(|(_, close)| *close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockPriceSource;
    use std::io::Write;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_lookup_uses_nearest_preceding_close() {
        let mut table = PriceTable::new();
        let sym = Symbol::new("INFY");
        table.insert(sym.clone(), date(1, 5), Decimal::from(100));
        table.insert(sym.clone(), date(1, 8), Decimal::from(105));

        assert_eq!(table.close_price(&sym, date(1, 4)), None);
        assert_eq!(table.close_price(&sym, date(1, 5)), Some(Decimal::from(100)));
        // Weekend: fall back to Friday's close.
        assert_eq!(table.close_price(&sym, date(1, 7)), Some(Decimal::from(100)));
        assert_eq!(table.close_price(&sym, date(2, 1)), Some(Decimal::from(105)));
        assert_eq!(table.close_price(&Symbol::new("TCS"), date(2, 1)), None);
    }

    #[test]
    fn test_csv_source_reads_and_drops_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "symbol,date,close").unwrap();
        writeln!(file, "infy,2024-01-05,100.5").unwrap();
        writeln!(file, "INFY,not-a-date,1").unwrap();
        writeln!(file, "TCS,2024-01-05,abc").unwrap();
        file.flush().unwrap();

        let source = CsvPriceSource::from_path(file.path()).unwrap();
        let infy = source.closes.get(&Symbol::new("INFY")).unwrap();
        assert_eq!(infy.len(), 1);
        assert_eq!(infy[0].close, Decimal::from_str_canonical("100.5").unwrap());
        assert!(!source.closes.contains_key(&Symbol::new("TCS")));
    }

    #[tokio::test]
    async fn test_csv_source_unknown_symbol_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "symbol,date,close").unwrap();
        writeln!(file, "INFY,2024-01-05,100").unwrap();
        file.flush().unwrap();

        let source = CsvPriceSource::from_path(file.path()).unwrap();
        assert!(source.fetch_closes(&Symbol::new("TCS")).await.unwrap().is_empty());
        assert_eq!(source.fetch_closes(&Symbol::new("INFY")).await.unwrap().len(), 1);

        let table = PriceTable::load(&source, &[Symbol::new("INFY"), Symbol::new("TCS")]).await;
        assert_eq!(table.unavailable(), &[Symbol::new("TCS")]);
    }

    #[test]
    fn test_csv_source_missing_file() {
        let err = CsvPriceSource::from_path(Path::new("/nonexistent/prices.csv")).unwrap_err();
        assert!(matches!(err, DataSourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_records_unavailable_symbols() {
        let source = MockPriceSource::new()
            .with_closes(Symbol::new("AAA"), vec![(date(1, 2), Decimal::from(10))])
            .with_failure(Symbol::new("BBB"));
        let symbols = vec![Symbol::new("AAA"), Symbol::new("BBB"), Symbol::new("CCC")];

        let table = PriceTable::load(&source, &symbols).await;
        assert_eq!(table.symbol_count(), 1);
        assert_eq!(table.unavailable(), &[Symbol::new("BBB"), Symbol::new("CCC")]);
        assert_eq!(
            table.close_price(&Symbol::new("AAA"), date(3, 1)),
            Some(Decimal::from(10))
        );
    }
}
