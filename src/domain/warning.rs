//! Non-fatal conditions surfaced alongside results.
//!
//! Warnings never abort a replay or a report. They are logged where they are
//! raised and handed back to the caller as structured values.

use crate::domain::{Decimal, Symbol};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Suspicious or unusable input data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataQualityWarning {
    /// A row whose trade type is neither buy nor sell. The row is skipped.
    #[serde(rename_all = "camelCase")]
    UnrecognizedTradeType { origin: String, value: String },
    /// A row that could not be turned into a valid trade record. The row is skipped.
    #[serde(rename_all = "camelCase")]
    InvalidRecord { origin: String, reason: String },
    /// Total bought and total sold quantities differ for a symbol.
    #[serde(rename_all = "camelCase")]
    QuantityMismatch {
        symbol: Symbol,
        bought: Decimal,
        sold: Decimal,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::UnrecognizedTradeType { origin, value } => {
                write!(f, "{}: skipped row with trade type {:?}", origin, value)
            }
            DataQualityWarning::InvalidRecord { origin, reason } => {
                write!(f, "{}: skipped invalid row ({})", origin, reason)
            }
            DataQualityWarning::QuantityMismatch {
                symbol,
                bought,
                sold,
            } => write!(
                f,
                "symbol {}: buy quantity ({}) != sell quantity ({})",
                symbol, bought, sold
            ),
        }
    }
}

/// A holding driven below zero by the replay.
///
/// Usually a missing trade, an unrecorded split, or a bad alias. The
/// negative quantity is kept as-is in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeQuantityWarning {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub quantity: Decimal,
}

impl fmt::Display for NegativeQuantityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symbol {} went negative ({}) on {}",
            self.symbol, self.quantity, self.date
        )
    }
}
