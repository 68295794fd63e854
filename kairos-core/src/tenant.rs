use serde::{Deserialize, Serialize};

use crate::booking::BookingStatus;

/// Whether a committed booking needs staff approval before it is final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    Automatic,
    Manual,
}

impl ApprovalMode {
    pub fn initial_status(&self) -> BookingStatus {
        match self {
            ApprovalMode::Automatic => BookingStatus::Confirmed,
            ApprovalMode::Manual => BookingStatus::Pending,
        }
    }
}

/// Per-tenant knobs this core consumes read-only. Owned by the tenant
/// configuration collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TenantSettings {
    /// Granularity of the slot grid offered to customers, in minutes.
    pub slot_step_minutes: u32,
    pub approval_mode: ApprovalMode,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            slot_step_minutes: 30,
            approval_mode: ApprovalMode::Automatic,
        }
    }
}
