//! Market value over time from reconstructed snapshots.

use crate::engine::{
    value_on, MarketValue, PresentValue, PriceLookup, SnapshotStore, SnapshotStoreError,
};
use chrono::{Days, NaiveDate};

/// Present-value marker for the holdings in force on `date`, priced on `date`.
///
/// The returned [`MarketValue`] says which symbols had no price and were left
/// out of the marker amount.
///
/// # Errors
/// `NotFound` if `date` precedes portfolio inception.
pub fn present_value_at(
    store: &SnapshotStore,
    prices: &impl PriceLookup,
    date: NaiveDate,
) -> Result<(PresentValue, MarketValue), SnapshotStoreError> {
    let snapshot = store.closest_preceding_snapshot(date)?;
    let value = value_on(snapshot, prices, date);
    Ok((
        PresentValue {
            date,
            amount: value.total,
        },
        value,
    ))
}

/// Portfolio value every `step_days` from `from` through `to`.
///
/// Dates before inception are skipped. A zero step is treated as one day.
pub fn value_history(
    store: &SnapshotStore,
    prices: &impl PriceLookup,
    from: NaiveDate,
    to: NaiveDate,
    step_days: u64,
) -> Vec<MarketValue> {
    let Some(inception) = store.inception_date() else {
        return Vec::new();
    };
    let step = Days::new(step_days.max(1));

    let mut values = Vec::new();
    let mut date = from.max(inception);
    while date <= to {
        if let Ok(snapshot) = store.closest_preceding_snapshot(date) {
            values.push(value_on(snapshot, prices, date));
        }
        match date.checked_add_days(step) {
            Some(next) => date = next,
            None => break,
        }
    }
    values
}
