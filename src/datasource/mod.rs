//! Collaborators that feed the engine: ledger files and close prices.

use crate::domain::{Decimal, Symbol};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

pub mod ledger;
pub mod mock;
pub mod prices;

pub use ledger::{load_ledger, read_aliases, read_holdings_as_sells, read_tradebooks, AliasTable, Ledger};
pub use mock::MockPriceSource;
pub use prices::{CsvPriceSource, PriceTable};

/// A daily close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Source of historical close prices.
///
/// Implementations may be slow (files, remote APIs); callers fan out across
/// symbols and treat per-symbol failures as skips.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// All known closes for `symbol`, in any order. Unknown symbols yield an
    /// empty vector.
    async fn fetch_closes(&self, symbol: &Symbol) -> Result<Vec<PricePoint>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// File could not be opened or read.
    Io { path: String, message: String },
    /// Malformed CSV or missing required columns.
    ParseError(String),
    /// Symbol unknown to the source.
    NotFound(String),
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

/// Parse a date in the formats brokerage exports commonly use.
pub(crate) fn parse_date_flexible(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%d-%m-%Y").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
