use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use kairos_shared::TimeWindow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hold::HoldRecord;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    /// Only pending and confirmed bookings block a slot; the other
    /// statuses are inert for conflict purposes.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<BookingStatus> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            "NO_SHOW" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }
}

/// A durable reservation of a resource window. Created here by the commit
/// protocol; its later lifecycle (cancellation, completion) belongs to the
/// booking-management collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub resource_id: Uuid,
    pub menu_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub reference: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Explicit factory: every derived field (id, reference, timestamps) is
    /// computed up front and the value returned fully formed. Nothing is
    /// filled in later by the persistence layer.
    pub fn issue(
        hold: &HoldRecord,
        status: BookingStatus,
        customer_id: Option<Uuid>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Booking {
        let id = Uuid::new_v4();
        let reference = format!(
            "KB-{}-{}",
            hold.date.format("%Y%m%d"),
            &id.simple().to_string()[..8]
        );

        Booking {
            id,
            tenant_id: hold.tenant_id,
            resource_id: hold.resource_id,
            menu_id: Some(hold.menu_id),
            customer_id: customer_id.or(hold.customer_id),
            reference,
            date: hold.date,
            start_time: hold.start_time,
            end_time: hold.end_time,
            status,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}
