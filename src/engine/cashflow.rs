//! Signed, dated cash-flow series derived from trades.

use crate::domain::{Decimal, TradeRecord, TradeType};
use chrono::NaiveDate;
use serde::Serialize;

use super::xirr::{self, Rate, XirrError};

/// One dated amount. Negative = money out (buy), positive = money in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self { date, amount }
    }
}

/// Notional liquidation value of the remaining holdings on a valuation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentValue {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Chronological cash flows plus the facts the solver layer needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowSeries {
    pub flows: Vec<CashFlow>,
    pub has_buy: bool,
    /// True for a real sell or a positive present-value marker.
    pub has_sell: bool,
}

impl CashFlowSeries {
    /// Sum of all flows, i.e. realised plus marked profit.
    pub fn net(&self) -> Decimal {
        self.flows.iter().map(|cf| cf.amount).sum()
    }

    /// Sum of the negative flows (a non-positive number).
    pub fn total_acquisitions(&self) -> Decimal {
        self.flows
            .iter()
            .map(|cf| cf.amount)
            .filter(|a| a.is_negative())
            .sum()
    }

    /// Solve for the annualised rate.
    ///
    /// # Errors
    /// `InsufficientCashFlows` without at least one buy and one sell, else
    /// whatever the solver reports.
    pub fn xirr(&self) -> Result<Rate, XirrError> {
        if !self.has_buy || !self.has_sell {
            return Err(XirrError::InsufficientCashFlows);
        }
        xirr::solve(&self.flows)
    }
}

/// Build the cash-flow series for a set of trades.
///
/// Buys become `-(quantity * price)`, sells `+(quantity * price)`. The
/// optional present value is appended last with its literal amount. Entries
/// are ordered by date; ties keep input order and the present value sorts
/// after trades on the same date.
pub fn build_cash_flows(
    trades: &[TradeRecord],
    present_value: Option<PresentValue>,
) -> CashFlowSeries {
    let mut flows: Vec<CashFlow> = Vec::with_capacity(trades.len() + 1);
    let mut has_buy = false;
    let mut has_sell = false;

    for trade in trades {
        match trade.trade_type {
            TradeType::Buy => has_buy = true,
            TradeType::Sell => has_sell = true,
        }
        flows.push(CashFlow::new(trade.trade_date, trade.signed_cash_flow()));
    }

    if let Some(pv) = present_value {
        has_sell |= pv.amount.is_positive();
        flows.push(CashFlow::new(pv.date, pv.amount));
    }

    // Stable: preserves input order within a date.
    flows.sort_by_key(|cf| cf.date);

    CashFlowSeries {
        flows,
        has_buy,
        has_sell,
    }
}
