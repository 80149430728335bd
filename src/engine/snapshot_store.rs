use super::Snapshot;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotStoreError {
    /// The requested date precedes portfolio inception (or the store is empty).
    #[error("no snapshot at or before {date}")]
    NotFound { date: NaiveDate },
    #[error("snapshot for {date} added after {latest}; dates must be non-decreasing")]
    OutOfOrder { date: NaiveDate, latest: NaiveDate },
}

/// Date-keyed snapshots in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    snapshots: BTreeMap<NaiveDate, Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot. Adding the latest date again replaces it.
    ///
    /// # Errors
    /// `OutOfOrder` if `date` is earlier than the latest stored date.
    pub fn add(&mut self, date: NaiveDate, snapshot: Snapshot) -> Result<(), SnapshotStoreError> {
        if let Some(latest) = self.latest_date() {
            if date < latest {
                return Err(SnapshotStoreError::OutOfOrder { date, latest });
            }
        }
        self.snapshots.insert(date, snapshot);
        Ok(())
    }

    /// Latest snapshot whose date is `<= date`.
    ///
    /// # Errors
    /// `NotFound` if `date` precedes the first stored snapshot.
    pub fn closest_preceding_snapshot(
        &self,
        date: NaiveDate,
    ) -> Result<&Snapshot, SnapshotStoreError> {
        self.snapshots
            .range(..=date)
            .next_back()
            .map(|(_, snapshot)| snapshot)
            .ok_or(SnapshotStoreError::NotFound { date })
    }

    /// Date of the first stored snapshot (portfolio inception).
    pub fn inception_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next_back().copied()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.values().next_back()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
