use crate::api::AppState;
use crate::domain::{DataQualityWarning, NegativeQuantityWarning};
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningsResponse {
    pub ledger: Vec<DataQualityWarning>,
    pub negative_quantities: Vec<NegativeQuantityWarning>,
}

pub async fn get_warnings(State(state): State<AppState>) -> Json<WarningsResponse> {
    Json(WarningsResponse {
        ledger: state.ledger.warnings.clone(),
        negative_quantities: state.replay.warnings.clone(),
    })
}
