use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use kairos_shared::TimeWindow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a hold: one lockable slot. Two holds conflict at the store
/// level iff their keys are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub tenant_id: Uuid,
    pub resource_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl std::fmt::Display for SlotKey {
    /// Canonical storage key, e.g.
    /// `hold:5f…:a3…:2026-03-02:0900-1000`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hold:{}:{}:{}:{}-{}",
            self.tenant_id,
            self.resource_id,
            self.date.format("%Y-%m-%d"),
            self.start_time.format("%H%M"),
            self.end_time.format("%H%M"),
        )
    }
}

/// A live exclusive lock on one slot, identified by an opaque token.
/// Destroyed by explicit release, successful commit, or TTL expiry;
/// expiry is always evaluated lazily against the wall clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldRecord {
    pub token: String,
    pub tenant_id: Uuid,
    pub resource_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub menu_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl HoldRecord {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            tenant_id: self.tenant_id,
            resource_id: self.resource_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}
