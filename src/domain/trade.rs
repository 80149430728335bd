//! Trade record: a single buy or sell event in the ledger.

use crate::domain::{Decimal, Symbol, TradeType};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// A single buy/sell event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub trade_date: NaiveDate,
    pub trade_type: TradeType,
    /// Always strictly positive; direction comes from `trade_type`.
    pub quantity: Decimal,
    /// Currency per unit, never negative.
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeRecordError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("quantity must be > 0, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("price must be >= 0, got {0}")]
    NegativePrice(Decimal),
    #[error("quantity {0} exceeds 1e18")]
    QuantityOutOfRange(Decimal),
    #[error("consideration of {quantity} @ {price} exceeds 1e18")]
    ConsiderationOutOfRange { quantity: Decimal, price: Decimal },
}

/// Upper bound on quantity and on quantity * price. Keeps running totals over
/// any realistic ledger well inside the decimal range.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000_000;

impl TradeRecord {
    /// Create a validated trade record.
    ///
    /// # Errors
    /// Fails when the symbol is empty, the quantity is not strictly positive,
    /// or the price is negative.
    pub fn new(
        symbol: Symbol,
        trade_date: NaiveDate,
        trade_type: TradeType,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Self, TradeRecordError> {
        if symbol.is_empty() {
            return Err(TradeRecordError::EmptySymbol);
        }
        if !quantity.is_positive() {
            return Err(TradeRecordError::NonPositiveQuantity(quantity));
        }
        if price.is_negative() {
            return Err(TradeRecordError::NegativePrice(price));
        }
        let limit = Decimal::from(MAX_AMOUNT);
        if quantity > limit {
            return Err(TradeRecordError::QuantityOutOfRange(quantity));
        }
        match quantity.checked_mul(price) {
            Some(consideration) if consideration <= limit => {}
            _ => return Err(TradeRecordError::ConsiderationOutOfRange { quantity, price }),
        }
        Ok(Self {
            symbol,
            trade_date,
            trade_type,
            quantity,
            price,
        })
    }

    /// Quantity with the direction applied: Buy = +qty, Sell = -qty.
    pub fn signed_quantity(&self) -> Decimal {
        match self.trade_type {
            TradeType::Buy => self.quantity,
            TradeType::Sell => -self.quantity,
        }
    }

    /// Unsigned consideration (quantity * price), bounded by [`MAX_AMOUNT`].
    pub fn consideration(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Cash flow from the investor's point of view: buys are money out (negative),
    /// sells are money in (positive).
    pub fn signed_cash_flow(&self) -> Decimal {
        match self.trade_type {
            TradeType::Buy => -self.consideration(),
            TradeType::Sell => self.consideration(),
        }
    }
}
