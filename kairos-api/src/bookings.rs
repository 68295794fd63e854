use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kairos_booking::CommitBooking;
use kairos_core::booking::Booking;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CommitBookingRequest {
    token: String,
    customer_id: Option<Uuid>,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    reference: String,
    resource_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
}

impl BookingResponse {
    fn from_booking(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            reference: booking.reference.clone(),
            resource_id: booking.resource_id,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status.as_str().to_string(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/tenants/{tenant_id}/bookings", post(commit_booking))
}

async fn commit_booking(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<CommitBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let request = CommitBooking {
        tenant_id,
        token: req.token,
        customer_id: req.customer_id,
        notes: req.notes,
    };

    let booking = state.committer.commit(&request).await?;
    state.metrics.bookings_committed.inc();

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_booking(&booking)),
    ))
}
