use crate::domain::{Decimal, Symbol};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::Snapshot;

/// Close price for a symbol on `date`, or the nearest earlier available date.
///
/// Implemented by price tables and by plain closures.
pub trait PriceLookup {
    fn close_price(&self, symbol: &Symbol, date: NaiveDate) -> Option<Decimal>;
}

impl<F> PriceLookup for F
where
    F: Fn(&Symbol, NaiveDate) -> Option<Decimal>,
{
    fn close_price(&self, symbol: &Symbol, date: NaiveDate) -> Option<Decimal> {
        self(symbol, date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValue {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub price: Decimal,
    pub market_value: Decimal,
}

/// Market value of a snapshot. Symbols without a price are listed in `skipped`
/// and excluded from `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketValue {
    pub as_of_date: NaiveDate,
    pub total: Decimal,
    pub positions: Vec<PositionValue>,
    pub skipped: Vec<Symbol>,
}

impl MarketValue {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Value a snapshot at its own date.
pub fn value_at(snapshot: &Snapshot, prices: &impl PriceLookup) -> MarketValue {
    value_on(snapshot, prices, snapshot.as_of_date)
}

/// Value a snapshot's holdings with close prices from `date`.
pub fn value_on(snapshot: &Snapshot, prices: &impl PriceLookup, date: NaiveDate) -> MarketValue {
    let mut positions = Vec::with_capacity(snapshot.holdings.len());
    let mut skipped = Vec::new();
    let mut total = Decimal::zero();

    for holding in snapshot.holdings.values() {
        let Some(price) = prices.close_price(&holding.symbol, date) else {
            warn!(symbol = %holding.symbol, date = %date, "No close price, skipping from valuation");
            skipped.push(holding.symbol.clone());
            continue;
        };
        let valued = holding
            .quantity
            .checked_mul(price)
            .and_then(|market_value| Some((market_value, total.checked_add(market_value)?)));
        match valued {
            Some((market_value, new_total)) => {
                total = new_total;
                positions.push(PositionValue {
                    symbol: holding.symbol.clone(),
                    quantity: holding.quantity,
                    price,
                    market_value,
                });
            }
            None => {
                warn!(symbol = %holding.symbol, date = %date, price = %price, "Market value out of range, skipping from valuation");
                skipped.push(holding.symbol.clone());
            }
        }
    }

    MarketValue {
        as_of_date: date,
        total,
        positions,
        skipped,
    }
}
