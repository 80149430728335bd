use crate::analysis::{
    compute_per_symbol_xirr, compute_portfolio_xirr, ReportMode, SymbolSelection,
};
use crate::api::{parse_date_param, AppState};
use crate::domain::{DataQualityWarning, Decimal, Symbol};
use crate::engine::{PresentValue, Rate, XirrError};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioXirrQuery {
    pub present_value: Option<String>,
    pub valuation_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioXirrResponse {
    pub xirr: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present_value: Option<PresentValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolXirrQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolXirrResponse {
    pub symbols: Vec<SymbolReturnDto>,
    pub symbols_with_no_sells: Vec<Symbol>,
    pub symbols_with_no_buys: Vec<Symbol>,
    pub warnings: Vec<DataQualityWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolReturnDto {
    pub symbol: Symbol,
    pub xirr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<XirrError>,
    pub profit: Decimal,
    pub percent_return: Decimal,
}

/// Portfolio XIRR.
///
/// Without `presentValue` the holdings export (if any) stands in for the
/// present value. With it, the explicit marker replaces the holdings export.
pub async fn get_portfolio_xirr(
    Query(params): Query<PortfolioXirrQuery>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioXirrResponse>, AppError> {
    let valuation_date = match params.valuation_date.as_deref() {
        Some(raw) => parse_date_param("valuationDate", raw)?,
        None => state.config.valuation_date,
    };

    let (trades, present_value) = match params.present_value.as_deref() {
        Some(raw) => {
            let amount = Decimal::from_str_canonical(raw)
                .map_err(|_| AppError::BadRequest("presentValue must be a number".into()))?;
            if amount.is_negative() {
                return Err(AppError::BadRequest("presentValue must be >= 0".into()));
            }
            let pv = PresentValue {
                date: valuation_date,
                amount,
            };
            (state.ledger.trades.clone(), Some(pv))
        }
        None => {
            if params.valuation_date.is_some() {
                return Err(AppError::BadRequest(
                    "valuationDate requires presentValue".into(),
                ));
            }
            (state.ledger.with_holdings(), None)
        }
    };

    let xirr = compute_portfolio_xirr(&trades, present_value)
        .map_err(|e| AppError::Unprocessable(e.to_string()))?;
    Ok(Json(PortfolioXirrResponse {
        xirr,
        present_value,
    }))
}

pub async fn get_symbol_xirr(
    Query(params): Query<SymbolXirrQuery>,
    State(state): State<AppState>,
) -> Result<Json<SymbolXirrResponse>, AppError> {
    let selection = match params.symbol.as_deref().map(Symbol::new) {
        Some(symbol) if symbol.is_empty() => {
            return Err(AppError::BadRequest("symbol must not be empty".into()))
        }
        Some(symbol) => SymbolSelection::Only(symbol),
        None => SymbolSelection::All,
    };

    let trades = state.ledger.with_holdings();
    let report = compute_per_symbol_xirr(&trades, ReportMode::Xirr, &selection);
    if let SymbolSelection::Only(symbol) = &selection {
        if report.results.is_empty() {
            return Err(AppError::NotFound(format!("no trades for {}", symbol)));
        }
    }

    let symbols = report
        .results
        .into_iter()
        .map(|(symbol, result)| SymbolReturnDto {
            symbol,
            xirr: result.rate.ok(),
            error: result.rate.err(),
            profit: result.profit,
            percent_return: result.percent_return,
        })
        .collect();

    Ok(Json(SymbolXirrResponse {
        symbols,
        symbols_with_no_sells: report.symbols_with_no_sells,
        symbols_with_no_buys: report.symbols_with_no_buys,
        warnings: report.warnings,
    }))
}
