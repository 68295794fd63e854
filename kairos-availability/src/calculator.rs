use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use kairos_core::repository::{
    BookingRepository, HoldStore, MenuRepository, ResourceRepository, TenantRepository,
};
use kairos_core::resource::Resource;
use kairos_core::slot::Slot;
use kairos_core::{CoreError, CoreResult};
use kairos_shared::{add_minutes, TimeWindow};

/// One availability question: open slots for a menu on a date, over one
/// resource or over every active resource of the tenant.
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub tenant_id: Uuid,
    pub date: NaiveDate,
    pub menu_id: Uuid,
    pub resource_id: Option<Uuid>,
}

/// Candidate windows on the tenant's slot grid: anchored at the opening
/// time, stepping by `step` minutes, keeping only windows lying fully
/// inside one free span. Intervals are half-open, so a window may end
/// exactly where a busy span begins or where the day closes.
pub fn candidate_windows(
    open: &TimeWindow,
    free: &[TimeWindow],
    duration: u32,
    step: u32,
) -> Vec<TimeWindow> {
    if duration == 0 || step == 0 {
        return Vec::new();
    }

    let mut fitting = Vec::new();
    let mut cursor = open.start;
    while cursor < open.end {
        let Some(end) = add_minutes(cursor, duration) else {
            break;
        };
        if end > open.end {
            break;
        }
        let candidate = TimeWindow { start: cursor, end };
        if free.iter().any(|f| f.contains(&candidate)) {
            fitting.push(candidate);
        }
        match add_minutes(cursor, step) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    fitting
}

/// Computes open slots from working hours minus bookings minus live holds.
/// Pure reader: never writes, so its answers are advisory by nature and
/// only the hold store hands out actual claims.
pub struct AvailabilityCalculator {
    resources: Arc<dyn ResourceRepository>,
    menus: Arc<dyn MenuRepository>,
    tenants: Arc<dyn TenantRepository>,
    bookings: Arc<dyn BookingRepository>,
    holds: Arc<dyn HoldStore>,
}

impl AvailabilityCalculator {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        menus: Arc<dyn MenuRepository>,
        tenants: Arc<dyn TenantRepository>,
        bookings: Arc<dyn BookingRepository>,
        holds: Arc<dyn HoldStore>,
    ) -> Self {
        Self {
            resources,
            menus,
            tenants,
            bookings,
            holds,
        }
    }

    /// Open slots for the query, ordered by start time then resource id.
    pub async fn find_open_slots(&self, query: &SlotQuery) -> CoreResult<Vec<Slot>> {
        let menu = self
            .menus
            .get(query.tenant_id, query.menu_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| CoreError::Validation("unknown or inactive menu".to_string()))?;

        let duration = menu.total_minutes();
        if duration == 0 {
            return Err(CoreError::Validation(
                "menu has zero total duration".to_string(),
            ));
        }

        let settings = self.tenants.settings(query.tenant_id).await?;
        let step = settings.slot_step_minutes;
        if step == 0 {
            return Err(CoreError::Validation(
                "tenant slot step must be positive".to_string(),
            ));
        }

        let resources = match query.resource_id {
            Some(resource_id) => {
                let resource = self
                    .resources
                    .get(query.tenant_id, resource_id)
                    .await?
                    .filter(|r| r.is_active)
                    .ok_or_else(|| {
                        CoreError::Validation("unknown or inactive resource".to_string())
                    })?;
                vec![resource]
            }
            None => self.resources.list_active(query.tenant_id).await?,
        };

        let mut slots = Vec::new();
        for resource in &resources {
            slots.extend(
                self.slots_for_resource(query, resource, duration, step)
                    .await?,
            );
        }

        slots.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.resource_id.cmp(&b.resource_id))
        });

        debug!(
            "Availability: {} slots for menu {} on {} across {} resource(s)",
            slots.len(),
            query.menu_id,
            query.date,
            resources.len()
        );
        Ok(slots)
    }

    async fn slots_for_resource(
        &self,
        query: &SlotQuery,
        resource: &Resource,
        duration: u32,
        step: u32,
    ) -> CoreResult<Vec<Slot>> {
        let Some(open) = resource.effective_window(query.date) else {
            return Ok(Vec::new());
        };

        let bookings = self
            .bookings
            .find_occupying(query.tenant_id, resource.id, query.date)
            .await?;
        let holds = self
            .holds
            .list_active(query.tenant_id, resource.id, query.date)
            .await?;

        let now = Utc::now();
        let busy: Vec<TimeWindow> = bookings
            .iter()
            .map(|b| b.window())
            .chain(holds.iter().filter(|h| !h.is_expired(now)).map(|h| h.window()))
            .collect();

        let free = open.subtract_all(&busy);
        let windows = candidate_windows(&open, &free, duration, step);

        Ok(windows
            .into_iter()
            .map(|w| Slot {
                resource_id: resource.id,
                resource_name: resource.name.clone(),
                date: query.date,
                start_time: w.start,
                end_time: w.end,
                duration_minutes: w.duration_minutes(),
            })
            .collect())
    }
}
