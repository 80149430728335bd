//! Portfolio-level and per-symbol money-weighted returns.

use crate::domain::{
    sort_trades_by_date, DataQualityWarning, Decimal, Symbol, TradeRecord, TradeType,
};
use crate::engine::{build_cash_flows, PresentValue, Rate, XirrError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// What the per-symbol pass produces besides rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Rates, profit and return for the selected symbols.
    Xirr,
    /// Same, plus the date-sorted trades of the selected symbols.
    TradeHistory,
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xirr" => Ok(ReportMode::Xirr),
            "trade_history" => Ok(ReportMode::TradeHistory),
            other => Err(format!("must be xirr or trade_history, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSelection {
    All,
    Only(Symbol),
}

impl SymbolSelection {
    pub fn includes(&self, symbol: &Symbol) -> bool {
        match self {
            SymbolSelection::All => true,
            SymbolSelection::Only(target) => target == symbol,
        }
    }
}

/// Outcome for one symbol. A failed rate never affects other symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReturn {
    pub rate: Result<Rate, XirrError>,
    /// Net of all cash flows: sells minus buys.
    pub profit: Decimal,
    /// `profit / total acquisitions * 100`, rounded to 2 places; 0 without buys.
    pub percent_return: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolReturnsReport {
    pub results: BTreeMap<Symbol, SymbolReturn>,
    pub symbols_with_no_sells: Vec<Symbol>,
    pub symbols_with_no_buys: Vec<Symbol>,
    pub warnings: Vec<DataQualityWarning>,
    /// Populated in [`ReportMode::TradeHistory`] only.
    pub trade_history: Vec<TradeRecord>,
}

impl SymbolReturnsReport {
    /// Up to `n` symbols with the highest profit, best first.
    pub fn top_by_profit(&self, n: usize) -> Vec<(&Symbol, &SymbolReturn)> {
        self.ranked(n, |a, b| b.profit.cmp(&a.profit))
    }

    /// Up to `n` symbols with the lowest profit, worst first.
    pub fn bottom_by_profit(&self, n: usize) -> Vec<(&Symbol, &SymbolReturn)> {
        self.ranked(n, |a, b| a.profit.cmp(&b.profit))
    }

    pub fn top_by_percent_return(&self, n: usize) -> Vec<(&Symbol, &SymbolReturn)> {
        self.ranked(n, |a, b| b.percent_return.cmp(&a.percent_return))
    }

    pub fn bottom_by_percent_return(&self, n: usize) -> Vec<(&Symbol, &SymbolReturn)> {
        self.ranked(n, |a, b| a.percent_return.cmp(&b.percent_return))
    }

    fn ranked<F>(&self, n: usize, cmp: F) -> Vec<(&Symbol, &SymbolReturn)>
    where
        F: Fn(&SymbolReturn, &SymbolReturn) -> Ordering,
    {
        let mut entries: Vec<_> = self.results.iter().collect();
        // Stable over the symbol-ordered map, so ties stay alphabetical.
        entries.sort_by(|(_, a), (_, b)| cmp(a, b));
        entries.truncate(n);
        entries
    }
}

/// XIRR of the whole ledger, optionally marked to a present value.
///
/// # Errors
/// `InsufficientCashFlows` without at least one buy and one sell (or positive
/// present value); otherwise whatever the solver reports.
pub fn compute_portfolio_xirr(
    trades: &[TradeRecord],
    present_value: Option<PresentValue>,
) -> Result<Rate, XirrError> {
    let series = build_cash_flows(trades, present_value);
    if !series.has_sell {
        warn!("No sell trades found for portfolio");
    }
    if !series.has_buy {
        warn!("No buy trades found for portfolio");
    }
    let rate = series.xirr();
    match &rate {
        Ok(r) => info!(rate = *r, flows = series.flows.len(), "Portfolio XIRR"),
        Err(e) => warn!(error = %e, "Portfolio XIRR unavailable"),
    }
    rate
}

/// Per-symbol XIRR, profit and percent return.
///
/// Symbols lacking buys or sells are listed and get `InsufficientCashFlows`;
/// buy/sell quantity mismatches become data-quality warnings.
pub fn compute_per_symbol_xirr(
    trades: &[TradeRecord],
    mode: ReportMode,
    selection: &SymbolSelection,
) -> SymbolReturnsReport {
    let mut by_symbol: BTreeMap<&Symbol, Vec<TradeRecord>> = BTreeMap::new();
    for trade in trades.iter().filter(|t| selection.includes(&t.symbol)) {
        by_symbol.entry(&trade.symbol).or_default().push(trade.clone());
    }

    if !trades.iter().any(|t| t.trade_type == TradeType::Sell) {
        warn!("There are 0 sell trades in the ledger");
    }

    let mut report = SymbolReturnsReport::default();
    for (symbol, mut symbol_trades) in by_symbol {
        sort_trades_by_date(&mut symbol_trades);
        debug!(symbol = %symbol, trades = symbol_trades.len(), "Computing symbol returns");

        if let Some(warning) = quantity_mismatch(symbol, &symbol_trades) {
            warn!("{}", warning);
            report.warnings.push(warning);
        }

        let series = build_cash_flows(&symbol_trades, None);
        let profit = series.net();
        let acquisitions = -series.total_acquisitions();
        let percent_return = percent_return(symbol, profit, acquisitions);

        let rate = if !series.has_buy {
            report.symbols_with_no_buys.push(symbol.clone());
            Err(XirrError::InsufficientCashFlows)
        } else if !series.has_sell {
            report.symbols_with_no_sells.push(symbol.clone());
            Err(XirrError::InsufficientCashFlows)
        } else {
            series.xirr()
        };
        if let Err(e) = &rate {
            debug!(symbol = %symbol, error = %e, "Symbol XIRR unavailable");
        }

        if mode == ReportMode::TradeHistory {
            report.trade_history.extend(symbol_trades);
        }

        report.results.insert(
            symbol.clone(),
            SymbolReturn {
                rate,
                profit,
                percent_return,
            },
        );
    }

    if mode == ReportMode::TradeHistory {
        sort_trades_by_date(&mut report.trade_history);
    }
    report
}

/// `profit / acquisitions * 100` to 2 places; 0 without acquisitions or
/// when the ratio does not fit in a decimal.
fn percent_return(symbol: &Symbol, profit: Decimal, acquisitions: Decimal) -> Decimal {
    if acquisitions.is_zero() {
        return Decimal::zero();
    }
    match profit
        .checked_div(acquisitions)
        .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
    {
        Some(percent) => percent.round_dp(2),
        None => {
            warn!(symbol = %symbol, profit = %profit, acquisitions = %acquisitions, "Percent return out of range, reporting 0");
            Decimal::zero()
        }
    }
}

fn quantity_mismatch(symbol: &Symbol, trades: &[TradeRecord]) -> Option<DataQualityWarning> {
    let mut bought = Decimal::zero();
    let mut sold = Decimal::zero();
    for trade in trades {
        match trade.trade_type {
            TradeType::Buy => bought += trade.quantity,
            TradeType::Sell => sold += trade.quantity,
        }
    }
    (bought != sold).then(|| DataQualityWarning::QuantityMismatch {
        symbol: symbol.clone(),
        bought,
        sold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(symbol: &str, on: NaiveDate, trade_type: TradeType, qty: i64, price: i64) -> TradeRecord {
        TradeRecord::new(
            Symbol::new(symbol),
            on,
            trade_type,
            Decimal::from(qty),
            Decimal::from(price),
        )
        .unwrap()
    }

    #[test]
    fn test_report_mode_parse() {
        assert_eq!("xirr".parse::<ReportMode>(), Ok(ReportMode::Xirr));
        assert_eq!("trade_history".parse::<ReportMode>(), Ok(ReportMode::TradeHistory));
        assert!("summary".parse::<ReportMode>().is_err());
    }

    #[test]
    fn test_profit_and_percent_return() {
        let trades = vec![
            trade("AAA", date(2020, 1, 1), TradeType::Buy, 10, 100),
            trade("AAA", date(2020, 7, 1), TradeType::Sell, 10, 130),
        ];
        let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);
        let aaa = &report.results[&Symbol::new("AAA")];
        assert_eq!(aaa.profit, Decimal::from(300));
        assert_eq!(aaa.percent_return, Decimal::from(30));
        assert!(aaa.rate.as_ref().map(|r| *r > 0.3).unwrap_or(false));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_percent_return_overflow_falls_back_to_zero() {
        let d = |s: &str| Decimal::from_str_canonical(s).unwrap();
        let trades = vec![
            TradeRecord::new(
                Symbol::new("TINY"),
                date(2020, 1, 1),
                TradeType::Buy,
                d("0.0000000001"),
                d("0.0000000001"),
            )
            .unwrap(),
            TradeRecord::new(
                Symbol::new("TINY"),
                date(2020, 6, 1),
                TradeType::Sell,
                d("1"),
                d("10000000000"),
            )
            .unwrap(),
            trade("AAA", date(2020, 1, 1), TradeType::Buy, 10, 100),
            trade("AAA", date(2020, 7, 1), TradeType::Sell, 10, 130),
        ];
        let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);

        let tiny = &report.results[&Symbol::new("TINY")];
        assert_eq!(tiny.percent_return, Decimal::zero());
        assert!(tiny.profit.is_positive());
        // The other symbol is unaffected.
        assert_eq!(
            report.results[&Symbol::new("AAA")].percent_return,
            Decimal::from(30)
        );
    }

    #[test]
    fn test_percent_return_rounds_to_two_places() {
        let trades = vec![
            trade("AAA", date(2020, 1, 1), TradeType::Buy, 3, 100),
            trade("AAA", date(2020, 7, 1), TradeType::Sell, 3, 110),
        ];
        let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);
        // 30 / 300 = 10%
        assert_eq!(
            report.results[&Symbol::new("AAA")].percent_return,
            Decimal::from(10)
        );

        let trades = vec![
            trade("BBB", date(2020, 1, 1), TradeType::Buy, 3, 100),
            trade("BBB", date(2020, 7, 1), TradeType::Sell, 1, 101),
        ];
        let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);
        // (101 - 300) / 300 = -66.333..%
        assert_eq!(
            report.results[&Symbol::new("BBB")].percent_return,
            Decimal::from_str_canonical("-66.33").unwrap()
        );
    }

    #[test]
    fn test_selection_only_restricts_symbols() {
        let trades = vec![
            trade("AAA", date(2020, 1, 1), TradeType::Buy, 1, 1),
            trade("BBB", date(2020, 1, 1), TradeType::Buy, 1, 1),
        ];
        let report = compute_per_symbol_xirr(
            &trades,
            ReportMode::Xirr,
            &SymbolSelection::Only(Symbol::new("BBB")),
        );
        assert_eq!(report.results.len(), 1);
        assert!(report.results.contains_key(&Symbol::new("BBB")));
    }

    #[test]
    fn test_trade_history_mode_collects_sorted_trades() {
        let trades = vec![
            trade("AAA", date(2020, 5, 1), TradeType::Sell, 1, 2),
            trade("AAA", date(2020, 1, 1), TradeType::Buy, 1, 1),
            trade("BBB", date(2020, 3, 1), TradeType::Buy, 1, 1),
        ];
        let report = compute_per_symbol_xirr(
            &trades,
            ReportMode::TradeHistory,
            &SymbolSelection::Only(Symbol::new("AAA")),
        );
        assert_eq!(report.trade_history.len(), 2);
        assert_eq!(report.trade_history[0].trade_date, date(2020, 1, 1));
        assert_eq!(report.trade_history[1].trade_date, date(2020, 5, 1));

        let plain = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);
        assert!(plain.trade_history.is_empty());
    }

    #[test]
    fn test_rankings() {
        let mut trades = Vec::new();
        for (symbol, sell_price) in [("AAA", 90), ("BBB", 150), ("CCC", 120)] {
            trades.push(trade(symbol, date(2020, 1, 1), TradeType::Buy, 1, 100));
            trades.push(trade(symbol, date(2021, 1, 1), TradeType::Sell, 1, sell_price));
        }
        let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &SymbolSelection::All);

        let top: Vec<_> = report.top_by_profit(2).iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(top, vec!["BBB", "CCC"]);
        let bottom: Vec<_> = report
            .bottom_by_percent_return(1)
            .iter()
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(bottom, vec!["AAA"]);
    }

    #[test]
    fn test_portfolio_xirr_with_present_value() {
        let trades = vec![trade("AAA", date(2021, 1, 1), TradeType::Buy, 10, 100)];
        let pv = PresentValue {
            date: date(2022, 1, 1),
            amount: Decimal::from(1100),
        };
        let rate = compute_portfolio_xirr(&trades, Some(pv)).unwrap();
        assert!((rate - 0.10).abs() < 1e-6);
        assert_eq!(
            compute_portfolio_xirr(&trades, None),
            Err(XirrError::InsufficientCashFlows)
        );
    }
}
