use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kairos_availability::SlotQuery;
use kairos_core::slot::Slot;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SlotsParams {
    date: NaiveDate,
    menu_id: Uuid,
    resource_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct SlotsResponse {
    date: NaiveDate,
    slots: Vec<Slot>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/tenants/{tenant_id}/slots", get(list_slots))
}

async fn list_slots(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(params): Query<SlotsParams>,
) -> Result<Json<SlotsResponse>, AppError> {
    // 1. Reject past dates at the boundary; the calculator itself is date-agnostic
    if params.date < Utc::now().date_naive() {
        return Err(AppError::ValidationError(
            "date must not be in the past".to_string(),
        ));
    }

    // 2. Compute the open slots for the requested day
    let query = SlotQuery {
        tenant_id,
        date: params.date,
        menu_id: params.menu_id,
        resource_id: params.resource_id,
    };
    let slots = state.availability.find_open_slots(&query).await?;

    Ok(Json(SlotsResponse {
        date: params.date,
        slots,
    }))
}
