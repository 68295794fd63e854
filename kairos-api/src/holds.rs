use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kairos_core::hold::HoldRecord;
use kairos_core::CoreError;
use kairos_hold::CreateHold;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateHoldRequest {
    resource_id: Uuid,
    menu_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ExtendHoldRequest {
    minutes: u32,
}

#[derive(Debug, Serialize)]
struct HoldResponse {
    token: String,
    resource_id: Uuid,
    menu_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    expires_at: DateTime<Utc>,
    remaining_seconds: i64,
}

impl HoldResponse {
    fn from_record(record: &HoldRecord) -> Self {
        Self {
            token: record.token.clone(),
            resource_id: record.resource_id,
            menu_id: record.menu_id,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            expires_at: record.expires_at,
            remaining_seconds: record.remaining_seconds(Utc::now()),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tenants/{tenant_id}/holds", post(create_hold))
        .route(
            "/v1/tenants/{tenant_id}/holds/{token}",
            get(get_hold).delete(release_hold),
        )
        .route(
            "/v1/tenants/{tenant_id}/holds/{token}/extend",
            post(extend_hold),
        )
}

async fn create_hold(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<HoldResponse>), AppError> {
    let request = CreateHold {
        tenant_id,
        resource_id: req.resource_id,
        menu_id: req.menu_id,
        date: req.date,
        start_time: req.start_time,
        customer_id: req.customer_id,
    };

    let record = match state.holds.create_hold(&request).await {
        Ok(record) => {
            state.metrics.holds_created.inc();
            record
        }
        Err(CoreError::HoldConflict) => {
            state.metrics.hold_conflicts.inc();
            return Err(CoreError::HoldConflict.into());
        }
        Err(err) => return Err(err.into()),
    };

    Ok((StatusCode::CREATED, Json(HoldResponse::from_record(&record))))
}

async fn get_hold(
    State(state): State<AppState>,
    Path((tenant_id, token)): Path<(Uuid, String)>,
) -> Result<Json<HoldResponse>, AppError> {
    let record = state.holds.inspect(tenant_id, &token).await?;
    Ok(Json(HoldResponse::from_record(&record)))
}

async fn extend_hold(
    State(state): State<AppState>,
    Path((tenant_id, token)): Path<(Uuid, String)>,
    Json(req): Json<ExtendHoldRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    let record = state.holds.extend(tenant_id, &token, req.minutes).await?;
    Ok(Json(HoldResponse::from_record(&record)))
}

async fn release_hold(
    State(state): State<AppState>,
    Path((tenant_id, token)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    state.holds.release(tenant_id, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}
