pub mod health;
pub mod snapshots;
pub mod valuation;
pub mod warnings;
pub mod xirr;

use crate::config::Config;
use crate::datasource::{Ledger, PriceTable};
use crate::engine::{reconstruct_snapshots, Replay};
use crate::error::AppError;
use axum::{routing::get, Router};
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// Everything the handlers read. Built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: Arc<Ledger>,
    pub replay: Arc<Replay>,
    pub prices: Arc<PriceTable>,
}

impl AppState {
    /// Replays the executed trades into snapshots.
    pub fn new(config: Config, ledger: Ledger, prices: PriceTable) -> Self {
        let replay = reconstruct_snapshots(&ledger.trades);
        Self {
            config,
            ledger: Arc::new(ledger),
            replay: Arc::new(replay),
            prices: Arc::new(prices),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = TimeoutLayer::new(state.config.request_timeout);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/snapshots", get(snapshots::list_snapshots))
        .route("/v1/snapshots/at", get(snapshots::get_snapshot_at))
        .route("/v1/xirr", get(xirr::get_portfolio_xirr))
        .route("/v1/xirr/symbols", get(xirr::get_symbol_xirr))
        .route("/v1/valuation", get(valuation::get_valuation))
        .route("/v1/warnings", get(warnings::get_warnings))
        .layer(cors)
        .layer(timeout)
        .with_state(state)
}

pub(crate) fn parse_date_param(name: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{} must be YYYY-MM-DD", name)))
}
