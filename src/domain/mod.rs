//! Domain types for the trade ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Symbol, TradeType
//! - The validated TradeRecord
//! - Stable date ordering and grouping for deterministic replay
//! - Structured warning types

pub mod decimal;
pub mod ordering;
pub mod primitives;
pub mod trade;
pub mod warning;

pub use decimal::Decimal;
pub use ordering::{group_by_date, sort_trades_by_date};
pub use primitives::{Symbol, TradeType, UnrecognizedTradeType};
pub use trade::{TradeRecord, TradeRecordError, MAX_AMOUNT};
pub use warning::{DataQualityWarning, NegativeQuantityWarning};
