use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use kairos_shared::TimeWindow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Kinds of bookable units a tenant schedules independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Staff,
    Room,
    Equipment,
    Vehicle,
}

/// Standard hours for one weekday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DayHours {
    Closed,
    Open { open: NaiveTime, close: NaiveTime },
}

/// Dated exception overriding the weekly schedule: a full closure or
/// special hours for that calendar day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DayOverride {
    Closed,
    Hours { open: NaiveTime, close: NaiveTime },
}

/// Weekly working hours, validated once at construction. Indexed Monday
/// first, matching `Weekday::num_days_from_monday`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklySchedule {
    hours: [DayHours; 7],
}

impl WeeklySchedule {
    pub fn new(hours: [DayHours; 7]) -> Result<Self, CoreError> {
        for day in &hours {
            if let DayHours::Open { open, close } = day {
                if open >= close {
                    return Err(CoreError::Validation(format!(
                        "schedule opens at {open} but closes at {close}"
                    )));
                }
            }
        }
        Ok(Self { hours })
    }

    /// Same hours every day of the week.
    pub fn uniform(open: NaiveTime, close: NaiveTime) -> Result<Self, CoreError> {
        Self::new([DayHours::Open { open, close }; 7])
    }

    pub fn closed() -> Self {
        Self {
            hours: [DayHours::Closed; 7],
        }
    }

    pub fn hours_for(&self, weekday: Weekday) -> &DayHours {
        &self.hours[weekday.num_days_from_monday() as usize]
    }
}

/// A bookable unit within a tenant. Owned by the resource-management
/// collaborator; read-only inside the reservation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    pub schedule: WeeklySchedule,
    pub exceptions: BTreeMap<NaiveDate, DayOverride>,
    pub is_active: bool,
}

impl Resource {
    /// Effective open window for a calendar day: dated exception first,
    /// then the weekday's standard hours, otherwise closed.
    pub fn effective_window(&self, date: NaiveDate) -> Option<TimeWindow> {
        if let Some(exception) = self.exceptions.get(&date) {
            return match exception {
                DayOverride::Closed => None,
                DayOverride::Hours { open, close } => TimeWindow::new(*open, *close).ok(),
            };
        }

        match self.schedule.hours_for(date.weekday()) {
            DayHours::Closed => None,
            DayHours::Open { open, close } => TimeWindow::new(*open, *close).ok(),
        }
    }
}
