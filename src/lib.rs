pub mod analysis;
pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod runner;

pub use analysis::{build_report, PortfolioReport, ReportMode, SymbolSelection};
pub use config::Config;
pub use datasource::{DataSourceError, Ledger, PriceSource, PriceTable};
pub use domain::{Decimal, Symbol, TradeRecord, TradeType};
pub use engine::{reconstruct_snapshots, Snapshot, SnapshotStore, XirrError};
pub use error::AppError;
