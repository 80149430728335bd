use crate::domain::{
    group_by_date, sort_trades_by_date, Decimal, NegativeQuantityWarning, Symbol, TradeRecord,
    TradeType,
};
use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use super::{Holding, Snapshot, SnapshotStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("trade group for {date} contains a trade dated {found}")]
    DateMismatch { date: NaiveDate, found: NaiveDate },
    #[error("trade group for {date} does not follow snapshot at {current}")]
    NonIncreasingDate { date: NaiveDate, current: NaiveDate },
}

/// Snapshot produced by one date transition plus any invariant violations seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub snapshot: Snapshot,
    pub warnings: Vec<NegativeQuantityWarning>,
}

/// Replays trade-date groups into successive snapshots.
///
/// Each transition clones the previous snapshot into a private working copy,
/// applies the day's trades, and freezes the result. Earlier snapshots stay
/// valid for lookups.
pub struct HoldingsTracker {
    current: Snapshot,

    // Outputs accumulated during processing.
    store: SnapshotStore,
    warnings: Vec<NegativeQuantityWarning>,
}

impl HoldingsTracker {
    /// Start from an empty portfolio at `inception_date`.
    pub fn new(inception_date: NaiveDate) -> Self {
        let current = Snapshot::inception(inception_date);
        let mut store = SnapshotStore::new();
        store.push_unchecked(current.clone());
        Self {
            current,
            store,
            warnings: Vec::new(),
        }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Apply one date's trades to `current`, producing the next snapshot.
    ///
    /// # Errors
    /// Fails if any trade is not dated `date`, or if `date` is not after the
    /// snapshot being advanced.
    pub fn apply(
        current: &Snapshot,
        date: NaiveDate,
        trades: &[TradeRecord],
    ) -> Result<ApplyOutcome, TrackerError> {
        if date <= current.as_of_date {
            return Err(TrackerError::NonIncreasingDate {
                date,
                current: current.as_of_date,
            });
        }
        if let Some(stray) = trades.iter().find(|t| t.trade_date != date) {
            return Err(TrackerError::DateMismatch {
                date,
                found: stray.trade_date,
            });
        }
        Ok(Self::apply_group(current, date, trades))
    }

    /// Process one date group, recording the snapshot and warnings.
    ///
    /// # Errors
    /// Same conditions as [`HoldingsTracker::apply`].
    pub fn process_day(
        &mut self,
        date: NaiveDate,
        trades: &[TradeRecord],
    ) -> Result<&Snapshot, TrackerError> {
        let outcome = Self::apply(&self.current, date, trades)?;
        self.record(outcome);
        Ok(&self.current)
    }

    fn record(&mut self, outcome: ApplyOutcome) {
        self.warnings.extend(outcome.warnings);
        self.store.push_unchecked(outcome.snapshot.clone());
        self.current = outcome.snapshot;
    }

    fn apply_group(current: &Snapshot, date: NaiveDate, trades: &[TradeRecord]) -> ApplyOutcome {
        let mut next = current.clone();
        next.as_of_date = date;

        // Symbols in first-touch order so warnings come out in input order.
        let mut touched: Vec<&Symbol> = Vec::new();

        for trade in trades {
            debug!(
                date = %date,
                symbol = %trade.symbol,
                trade_type = %trade.trade_type,
                quantity = %trade.quantity,
                price = %trade.price,
                "Applying trade"
            );

            let holding = next
                .holdings
                .entry(trade.symbol.clone())
                .or_insert_with(|| Holding {
                    symbol: trade.symbol.clone(),
                    quantity: Decimal::zero(),
                });
            holding.quantity += trade.signed_quantity();

            match trade.trade_type {
                TradeType::Buy => next.cashflow_in += trade.consideration(),
                TradeType::Sell => next.cashflow_out += trade.consideration(),
            }

            if !touched.contains(&&trade.symbol) {
                touched.push(&trade.symbol);
            }
        }

        // Checked once per day: ordering inside a day carries no meaning.
        let mut warnings = Vec::new();
        for symbol in touched {
            let quantity = next.quantity(symbol);
            if quantity.is_zero() {
                next.holdings.remove(symbol);
            } else if quantity.is_negative() {
                let warning = NegativeQuantityWarning {
                    symbol: symbol.clone(),
                    date,
                    quantity,
                };
                warn!(symbol = %symbol, date = %date, quantity = %quantity, "Holding went negative");
                warnings.push(warning);
            }
        }

        ApplyOutcome {
            snapshot: next,
            warnings,
        }
    }

    /// Get the accumulated outputs.
    pub fn into_outputs(self) -> (SnapshotStore, Vec<NegativeQuantityWarning>) {
        (self.store, self.warnings)
    }
}

/// Snapshots for every trade date plus the invariant violations met on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    pub store: SnapshotStore,
    pub warnings: Vec<NegativeQuantityWarning>,
}

/// Replay the full ledger from inception (first trade date minus one day).
///
/// An empty ledger yields an empty store.
pub fn reconstruct_snapshots(trades: &[TradeRecord]) -> Replay {
    let mut sorted = trades.to_vec();
    sort_trades_by_date(&mut sorted);

    let Some(first) = sorted.first() else {
        return Replay::default();
    };
    let inception = first
        .trade_date
        .checked_sub_days(Days::new(1))
        .unwrap_or(first.trade_date);

    let mut tracker = HoldingsTracker::new(inception);
    for (date, group) in group_by_date(&sorted) {
        // Groups are strictly ascending and single-dated by construction.
        let outcome = HoldingsTracker::apply_group(tracker.current(), date, group);
        tracker.record(outcome);
    }

    let (store, warnings) = tracker.into_outputs();
    debug!(
        snapshots = store.len(),
        warnings = warnings.len(),
        "Reconstructed snapshots"
    );
    Replay { store, warnings }
}

impl SnapshotStore {
    /// Insert a snapshot the tracker already knows to be in order.
    fn push_unchecked(&mut self, snapshot: Snapshot) {
        let date = snapshot.as_of_date;
        if let Err(e) = self.add(date, snapshot) {
            warn!(error = %e, "Dropped out-of-order snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(symbol: &str, on: NaiveDate, trade_type: TradeType, qty: i64) -> TradeRecord {
        TradeRecord::new(
            Symbol::new(symbol),
            on,
            trade_type,
            Decimal::from(qty),
            Decimal::from(10),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_does_not_mutate_previous_snapshot() {
        let start = Snapshot::inception(date(2020, 1, 1));
        let day = date(2020, 1, 2);
        let outcome =
            HoldingsTracker::apply(&start, day, &[trade("A", day, TradeType::Buy, 5)]).unwrap();

        assert!(start.is_empty());
        assert_eq!(outcome.snapshot.quantity(&Symbol::new("A")), Decimal::from(5));
        assert_eq!(outcome.snapshot.cashflow_in, Decimal::from(50));
    }

    #[test]
    fn test_apply_rejects_mixed_dates() {
        let start = Snapshot::inception(date(2020, 1, 1));
        let day = date(2020, 1, 2);
        let other = date(2020, 1, 3);
        let err = HoldingsTracker::apply(&start, day, &[trade("A", other, TradeType::Buy, 1)])
            .unwrap_err();
        assert_eq!(err, TrackerError::DateMismatch { date: day, found: other });
    }

    #[test]
    fn test_apply_rejects_non_increasing_date() {
        let start = Snapshot::inception(date(2020, 1, 5));
        let day = date(2020, 1, 5);
        let err = HoldingsTracker::apply(&start, day, &[]).unwrap_err();
        assert!(matches!(err, TrackerError::NonIncreasingDate { .. }));
    }

    #[test]
    fn test_intraday_sell_before_buy_is_not_negative() {
        let start = Snapshot::inception(date(2020, 1, 1));
        let day = date(2020, 1, 2);
        let outcome = HoldingsTracker::apply(
            &start,
            day,
            &[
                trade("A", day, TradeType::Sell, 3),
                trade("A", day, TradeType::Buy, 3),
            ],
        )
        .unwrap();
        assert!(outcome.warnings.is_empty());
        assert!(outcome.snapshot.is_empty());
        assert_eq!(outcome.snapshot.cashflow_in, Decimal::from(30));
        assert_eq!(outcome.snapshot.cashflow_out, Decimal::from(30));
    }

    #[test]
    fn test_process_day_accumulates_store() {
        let mut tracker = HoldingsTracker::new(date(2020, 1, 1));
        let d2 = date(2020, 1, 2);
        let d3 = date(2020, 1, 3);
        tracker
            .process_day(d2, &[trade("A", d2, TradeType::Buy, 2)])
            .unwrap();
        tracker
            .process_day(d3, &[trade("A", d3, TradeType::Sell, 3)])
            .unwrap();

        let (store, warnings) = tracker.into_outputs();
        assert_eq!(store.len(), 3);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].quantity, Decimal::from(-1));
    }

    #[test]
    fn test_reconstruct_empty_ledger() {
        let replay = reconstruct_snapshots(&[]);
        assert!(replay.store.is_empty());
        assert!(replay.warnings.is_empty());
    }
}
