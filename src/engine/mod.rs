//! Pure computation engine: holdings replay, cash flows, XIRR, valuation.
//!
//! Nothing here performs I/O. Inputs are already-materialised trade records
//! and, for valuation, a synchronous price lookup.

pub mod cashflow;
pub mod holdings_tracker;
pub mod snapshot;
pub mod snapshot_store;
pub mod valuation;
pub mod xirr;

pub use cashflow::{build_cash_flows, CashFlow, CashFlowSeries, PresentValue};
pub use holdings_tracker::{reconstruct_snapshots, ApplyOutcome, HoldingsTracker, Replay, TrackerError};
pub use snapshot::{Holding, Snapshot};
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};
pub use valuation::{value_at, value_on, MarketValue, PositionValue, PriceLookup};
pub use xirr::{Rate, XirrError};
