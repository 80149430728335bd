use crate::api::{parse_date_param, AppState};
use crate::domain::Decimal;
use crate::engine::Snapshot;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotListResponse {
    pub inception_date: Option<NaiveDate>,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAtQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub requested_date: NaiveDate,
    pub snapshot: SnapshotDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub as_of_date: NaiveDate,
    pub holdings: Vec<HoldingDto>,
    pub cashflow_in: Decimal,
    pub cashflow_out: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDto {
    pub symbol: String,
    pub quantity: Decimal,
}

impl From<&Snapshot> for SnapshotDto {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            as_of_date: snapshot.as_of_date,
            holdings: snapshot
                .holdings
                .values()
                .map(|h| HoldingDto {
                    symbol: h.symbol.as_str().to_string(),
                    quantity: h.quantity,
                })
                .collect(),
            cashflow_in: snapshot.cashflow_in,
            cashflow_out: snapshot.cashflow_out,
        }
    }
}

pub async fn list_snapshots(State(state): State<AppState>) -> Json<SnapshotListResponse> {
    let store = &state.replay.store;
    Json(SnapshotListResponse {
        inception_date: store.inception_date(),
        dates: store.dates().collect(),
    })
}

pub async fn get_snapshot_at(
    Query(params): Query<SnapshotAtQuery>,
    State(state): State<AppState>,
) -> Result<Json<SnapshotResponse>, AppError> {
    let raw = params
        .date
        .ok_or_else(|| AppError::BadRequest("date is required".into()))?;
    let date = parse_date_param("date", &raw)?;

    let snapshot = state.replay.store.closest_preceding_snapshot(date)?;
    Ok(Json(SnapshotResponse {
        requested_date: date,
        snapshot: snapshot.into(),
    }))
}
