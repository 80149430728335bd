//! Plain-text rendering of a returns report.

use super::returns::{
    compute_per_symbol_xirr, compute_portfolio_xirr, ReportMode, SymbolReturn,
    SymbolReturnsReport, SymbolSelection,
};
use crate::domain::{DataQualityWarning, NegativeQuantityWarning, Symbol, TradeRecord};
use crate::engine::{reconstruct_snapshots, Rate, XirrError};
use std::fmt::{self, Write as _};

/// Rankings are only printed for portfolios larger than this.
const RANKING_THRESHOLD: usize = 10;
const RANKING_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub mode: ReportMode,
    /// Computed in [`ReportMode::Xirr`] only.
    pub portfolio_xirr: Option<Result<Rate, XirrError>>,
    pub symbols: SymbolReturnsReport,
    pub ledger_warnings: Vec<DataQualityWarning>,
    pub negative_quantities: Vec<NegativeQuantityWarning>,
}

/// Run the full analysis over a normalised ledger.
pub fn build_report(
    trades: &[TradeRecord],
    ledger_warnings: &[DataQualityWarning],
    mode: ReportMode,
    selection: &SymbolSelection,
) -> PortfolioReport {
    let replay = reconstruct_snapshots(trades);
    let portfolio_xirr = match mode {
        ReportMode::Xirr => Some(compute_portfolio_xirr(trades, None)),
        ReportMode::TradeHistory => None,
    };
    PortfolioReport {
        mode,
        portfolio_xirr,
        symbols: compute_per_symbol_xirr(trades, mode, selection),
        ledger_warnings: ledger_warnings.to_vec(),
        negative_quantities: replay.warnings,
    }
}

pub fn format_rate(rate: &Result<Rate, XirrError>) -> String {
    match rate {
        Ok(r) => format!("{:.2}%", r * 100.0),
        Err(XirrError::InsufficientCashFlows) => "n/a".to_string(),
        Err(e) => format!("n/a ({})", e),
    }
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PortfolioReport {
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(rate) = &self.portfolio_xirr {
            let _ = writeln!(out, "Portfolio XIRR: {}", format_rate(rate));
            let _ = writeln!(out);
        }

        if self.mode == ReportMode::TradeHistory && !self.symbols.trade_history.is_empty() {
            let _ = writeln!(out, "Trade history:");
            let _ = writeln!(
                out,
                "{:<12} {:<12} {:<5} {:>12} {:>12}",
                "date", "symbol", "type", "quantity", "price"
            );
            for t in &self.symbols.trade_history {
                let _ = writeln!(
                    out,
                    "{:<12} {:<12} {:<5} {:>12} {:>12}",
                    t.trade_date.to_string(),
                    t.symbol.as_str(),
                    t.trade_type.to_string(),
                    t.quantity.to_string(),
                    t.price.to_string()
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "XIRR for individual stocks:");
        write_table(&mut out, self.symbols.results.iter());

        if self.symbols.results.len() > RANKING_THRESHOLD {
            let sections = [
                ("Top 10 absolute profit trades", self.symbols.top_by_profit(RANKING_SIZE)),
                ("Top 10 absolute loss trades", self.symbols.bottom_by_profit(RANKING_SIZE)),
                ("Top 10 % return trades", self.symbols.top_by_percent_return(RANKING_SIZE)),
                ("Top 10 % loss trades", self.symbols.bottom_by_percent_return(RANKING_SIZE)),
            ];
            for (title, rows) in sections {
                let _ = writeln!(out, "\n----- {} -----", title);
                write_table(&mut out, rows.into_iter());
            }
        }

        write_symbol_list(
            &mut out,
            "symbols_with_no_sells (XIRR not calculated)",
            &self.symbols.symbols_with_no_sells,
        );
        write_symbol_list(
            &mut out,
            "symbols_with_no_buys (XIRR not calculated)",
            &self.symbols.symbols_with_no_buys,
        );

        let warnings: Vec<String> = self
            .ledger_warnings
            .iter()
            .chain(self.symbols.warnings.iter())
            .map(|w| w.to_string())
            .chain(self.negative_quantities.iter().map(|w| w.to_string()))
            .collect();
        if !warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings:");
            for w in warnings {
                let _ = writeln!(out, "  {}", w);
            }
        }

        out
    }
}

fn write_table<'a>(out: &mut String, rows: impl Iterator<Item = (&'a Symbol, &'a SymbolReturn)>) {
    let _ = writeln!(
        out,
        "{:<16} {:>12} {:>16} {:>12}",
        "symbol", "xirr", "profit", "return_made"
    );
    for (symbol, result) in rows {
        let _ = writeln!(
            out,
            "{:<16} {:>12} {:>16} {:>12}",
            symbol.as_str(),
            format_rate(&result.rate),
            result.profit.to_string(),
            format!("{}%", result.percent_return)
        );
    }
}

fn write_symbol_list(out: &mut String, title: &str, symbols: &[Symbol]) {
    if symbols.is_empty() {
        return;
    }
    let joined: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
    let _ = writeln!(out, "\n{}:", title);
    let _ = writeln!(out, "{}", joined.join(", "));
}
