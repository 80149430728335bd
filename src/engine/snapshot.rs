use crate::domain::{Decimal, Symbol};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Quantity held of one security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: Symbol,
    /// Running signed total; only negative when the ledger is inconsistent.
    pub quantity: Decimal,
}

/// Holdings as of the close of one trade date.
///
/// Never mutated once emitted by the tracker. Zero-quantity holdings are
/// never present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub as_of_date: NaiveDate,
    pub holdings: BTreeMap<Symbol, Holding>,
    /// Cumulative buy consideration up to and including `as_of_date`.
    pub cashflow_in: Decimal,
    /// Cumulative sell consideration up to and including `as_of_date`.
    pub cashflow_out: Decimal,
}

impl Snapshot {
    /// The empty portfolio before any trade.
    pub fn inception(as_of_date: NaiveDate) -> Self {
        Self {
            as_of_date,
            holdings: BTreeMap::new(),
            cashflow_in: Decimal::zero(),
            cashflow_out: Decimal::zero(),
        }
    }

    /// Held quantity, zero when the symbol is not held.
    pub fn quantity(&self, symbol: &Symbol) -> Decimal {
        self.holdings
            .get(symbol)
            .map(|h| h.quantity)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.holdings.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inception_snapshot_is_empty() {
        let date = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        let snapshot = Snapshot::inception(date);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.as_of_date, date);
        assert_eq!(snapshot.quantity(&Symbol::new("ANY")), Decimal::zero());
        assert!(snapshot.cashflow_in.is_zero());
        assert!(snapshot.cashflow_out.is_zero());
    }
}
