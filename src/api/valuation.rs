use crate::analysis::{compute_portfolio_xirr, present_value_at};
use crate::api::{parse_date_param, AppState};
use crate::engine::{MarketValue, Rate, XirrError};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResponse {
    #[serde(flatten)]
    pub value: MarketValue,
    pub complete: bool,
    /// Portfolio XIRR marked to `total`.
    pub xirr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xirr_error: Option<XirrError>,
}

/// Market value of the holdings in force on `date` (default: the configured
/// valuation date), and the portfolio XIRR marked to that value.
pub async fn get_valuation(
    Query(params): Query<ValuationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ValuationResponse>, AppError> {
    let date = match params.date.as_deref() {
        Some(raw) => parse_date_param("date", raw)?,
        None => state.config.valuation_date,
    };

    let (present_value, value) =
        present_value_at(&state.replay.store, state.prices.as_ref(), date)?;
    let trades: Vec<_> = state
        .ledger
        .trades
        .iter()
        .filter(|t| t.trade_date <= date)
        .cloned()
        .collect();
    let rate = compute_portfolio_xirr(&trades, Some(present_value));

    Ok(Json(ValuationResponse {
        complete: value.is_complete(),
        value,
        xirr: rate.ok(),
        xirr_error: rate.err(),
    }))
}
