//! Returns analysis built on the engine: portfolio and per-symbol XIRR,
//! valuation history, and the text report.

pub mod history;
pub mod report;
pub mod returns;

pub use history::{present_value_at, value_history};
pub use report::{build_report, format_rate, PortfolioReport};
pub use returns::{
    compute_per_symbol_xirr, compute_portfolio_xirr, ReportMode, SymbolReturn,
    SymbolReturnsReport, SymbolSelection,
};
