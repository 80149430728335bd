//! Mock price source for testing without files.

use super::{DataSourceError, PricePoint, PriceSource};
use crate::domain::{Decimal, Symbol};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Mock price source that returns predefined closes.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    closes: HashMap<Symbol, Vec<PricePoint>>,
    failing: HashSet<Symbol>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add closes for a symbol.
    pub fn with_closes(mut self, symbol: Symbol, closes: Vec<(NaiveDate, Decimal)>) -> Self {
        self.closes
            .entry(symbol)
            .or_default()
            .extend(closes.into_iter().map(|(date, close)| PricePoint { date, close }));
        self
    }

    /// Make fetches for a symbol fail.
    pub fn with_failure(mut self, symbol: Symbol) -> Self {
        self.failing.insert(symbol);
        self
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_closes(&self, symbol: &Symbol) -> Result<Vec<PricePoint>, DataSourceError> {
        if self.failing.contains(symbol) {
            return Err(DataSourceError::Other(format!("mock failure for {}", symbol)));
        }
        Ok(self.closes.get(symbol).cloned().unwrap_or_default())
    }
}
