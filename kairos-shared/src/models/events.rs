use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

/// Emitted after a hold is promoted into a durable booking. Consumed by the
/// notification collaborator; delivery is outside this core.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub tenant_id: Uuid,
    pub resource_id: Uuid,
    pub reference: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub customer_id: Option<Uuid>,
    pub status: String,
    pub occurred_at: i64,
}
