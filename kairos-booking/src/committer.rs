use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use kairos_core::booking::Booking;
use kairos_core::repository::{BookingUnitOfWork, HoldStore, TenantRepository};
use kairos_core::{CoreError, CoreResult};
use kairos_shared::models::events::BookingCreatedEvent;

/// Parameters for promoting a hold into a booking. The slot itself comes
/// from the hold; only customer details ride along.
#[derive(Debug, Clone)]
pub struct CommitBooking {
    pub tenant_id: Uuid,
    pub token: String,
    pub customer_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Promotes live holds into durable bookings.
///
/// The hold is released only after a terminal outcome, either a committed
/// booking or a definitive conflict. On a transient store failure the hold
/// stays alive so the same token can retry the commit until its TTL runs
/// out.
pub struct BookingCommitter {
    holds: Arc<dyn HoldStore>,
    tenants: Arc<dyn TenantRepository>,
    bookings: Arc<dyn BookingUnitOfWork>,
    events: broadcast::Sender<BookingCreatedEvent>,
}

impl BookingCommitter {
    pub fn new(
        holds: Arc<dyn HoldStore>,
        tenants: Arc<dyn TenantRepository>,
        bookings: Arc<dyn BookingUnitOfWork>,
        events: broadcast::Sender<BookingCreatedEvent>,
    ) -> Self {
        Self {
            holds,
            tenants,
            bookings,
            events,
        }
    }

    pub async fn commit(&self, request: &CommitBooking) -> CoreResult<Booking> {
        // The hold must still be live and belong to the caller.
        let hold = self
            .holds
            .get_by_token(&request.token)
            .await?
            .ok_or(CoreError::HoldExpired)?;
        if hold.tenant_id != request.tenant_id {
            return Err(CoreError::Unauthorized);
        }

        let now = Utc::now();
        if hold.is_expired(now) {
            return Err(CoreError::HoldExpired);
        }

        let settings = self.tenants.settings(request.tenant_id).await?;
        let status = settings.approval_mode.initial_status();

        // Re-check and insert inside one transaction. The hold kept rivals
        // out up to here, but a hold that expired mid-flight may have let
        // a competing booking through; the transactional re-check is what
        // decides.
        let mut tx = self.bookings.begin().await?;
        let occupying = tx
            .find_occupying(hold.tenant_id, hold.resource_id, hold.date)
            .await?;
        let held = hold.window();
        if occupying.iter().any(|b| b.window().overlaps(&held)) {
            let _ = tx.rollback().await;
            // Definitive rejection: the hold cannot succeed anymore.
            self.release_quietly(&request.token).await;
            return Err(CoreError::HoldConflict);
        }

        let booking = Booking::issue(
            &hold,
            status,
            request.customer_id,
            request.notes.clone(),
            now,
        );
        tx.insert(&booking).await?;
        tx.commit().await?;

        // Success consumes the hold; a later inspect of the token is gone.
        self.release_quietly(&request.token).await;

        let _ = self.events.send(BookingCreatedEvent {
            booking_id: booking.id,
            tenant_id: booking.tenant_id,
            resource_id: booking.resource_id,
            reference: booking.reference.clone(),
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            customer_id: booking.customer_id,
            status: booking.status.as_str().to_string(),
            occurred_at: now.timestamp(),
        });

        info!(
            "Booking committed: {} ({}) as {}",
            booking.reference,
            booking.id,
            booking.status.as_str()
        );
        Ok(booking)
    }

    /// The booking (or the conflict) is already durable at this point; a
    /// failed release only means the hold lingers until its TTL.
    async fn release_quietly(&self, token: &str) {
        if let Err(e) = self.holds.delete_by_token(token).await {
            warn!("Failed to release hold after terminal outcome: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveTime};

    use kairos_core::booking::BookingStatus;
    use kairos_core::menu::Menu;
    use kairos_core::resource::{Resource, ResourceKind, WeeklySchedule};
    use kairos_core::tenant::{ApprovalMode, TenantSettings};
    use kairos_hold::{CreateHold, HoldPolicy, HoldTokenManager};
    use kairos_store::{MemoryBookingStore, MemoryDirectory, MemoryHoldStore};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    struct Fixture {
        committer: BookingCommitter,
        manager: HoldTokenManager,
        holds: Arc<MemoryHoldStore>,
        bookings: MemoryBookingStore,
        directory: MemoryDirectory,
        events: broadcast::Receiver<BookingCreatedEvent>,
        tenant_id: Uuid,
        resource_id: Uuid,
        menu_id: Uuid,
        date: NaiveDate,
    }

    impl Fixture {
        fn hold_request(&self, start: NaiveTime) -> CreateHold {
            CreateHold {
                tenant_id: self.tenant_id,
                resource_id: self.resource_id,
                menu_id: self.menu_id,
                date: self.date,
                start_time: start,
                customer_id: None,
            }
        }

        fn commit_request(&self, token: &str) -> CommitBooking {
            CommitBooking {
                tenant_id: self.tenant_id,
                token: token.to_string(),
                customer_id: Some(Uuid::new_v4()),
                notes: None,
            }
        }
    }

    async fn fixture_with_policy(policy: HoldPolicy) -> Fixture {
        let tenant_id = Uuid::new_v4();
        let resource_id = Uuid::new_v4();
        let menu_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let directory = MemoryDirectory::new();
        directory
            .upsert_resource(Resource {
                id: resource_id,
                tenant_id,
                name: "Chair One".to_string(),
                kind: ResourceKind::Staff,
                schedule: WeeklySchedule::uniform(t(9, 0), t(18, 0)).unwrap(),
                exceptions: BTreeMap::new(),
                is_active: true,
            })
            .await;
        directory
            .upsert_menu(Menu {
                id: menu_id,
                tenant_id,
                name: "Cut & Style".to_string(),
                prep_minutes: 0,
                service_minutes: 60,
                cleanup_minutes: 0,
                is_active: true,
            })
            .await;

        let holds = Arc::new(MemoryHoldStore::new());
        let bookings = MemoryBookingStore::new();
        let (tx, rx) = broadcast::channel(16);

        let manager = HoldTokenManager::new(
            Arc::new(directory.clone()),
            Arc::new(directory.clone()),
            Arc::new(bookings.clone()),
            holds.clone(),
            policy,
        );
        let committer = BookingCommitter::new(
            holds.clone(),
            Arc::new(directory.clone()),
            Arc::new(bookings.clone()),
            tx,
        );

        Fixture {
            committer,
            manager,
            holds,
            bookings,
            directory,
            events: rx,
            tenant_id,
            resource_id,
            menu_id,
            date,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_policy(HoldPolicy::default()).await
    }

    #[tokio::test]
    async fn test_commit_promotes_hold_to_booking() {
        let mut f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        let booking = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.start_time, t(9, 0));
        assert_eq!(booking.end_time, t(10, 0));
        assert!(booking.reference.starts_with("KB-20260302-"));

        // Durable and occupying.
        let rows = f.bookings.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, booking.id);

        // Event went out.
        let event = f.events.recv().await.unwrap();
        assert_eq!(event.booking_id, booking.id);
        assert_eq!(event.reference, booking.reference);
        assert_eq!(event.status, "CONFIRMED");
    }

    #[tokio::test]
    async fn test_commit_consumes_the_hold() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();

        let err = f.manager.inspect(f.tenant_id, &hold.token).await.unwrap_err();
        assert!(matches!(err, CoreError::HoldNotFound));

        // Double-commit of the same token is gone too.
        let err = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap_err();
        assert!(matches!(err, CoreError::HoldExpired));
    }

    #[tokio::test]
    async fn test_manual_approval_tenant_issues_pending_booking() {
        let f = fixture().await;
        f.directory
            .set_tenant_settings(
                f.tenant_id,
                TenantSettings {
                    slot_step_minutes: 30,
                    approval_mode: ApprovalMode::Manual,
                },
            )
            .await;

        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();
        let booking = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_expired_token_cannot_commit() {
        let policy = HoldPolicy {
            ttl: Duration::from_millis(30),
            ..HoldPolicy::default()
        };
        let f = fixture_with_policy(policy).await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let err = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap_err();
        assert!(matches!(err, CoreError::HoldExpired));
        assert!(f.bookings.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_tenant_cannot_commit() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        let mut request = f.commit_request(&hold.token);
        request.tenant_id = Uuid::new_v4();
        let err = f.committer.commit(&request).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized));

        // The hold survives the rejected attempt.
        f.manager.inspect(f.tenant_id, &hold.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_conflicting_booking_rejects_and_releases() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        // A booking for the same window lands behind the hold's back
        // (e.g. created while the hold had briefly expired).
        let now = Utc::now();
        f.bookings
            .seed(Booking {
                id: Uuid::new_v4(),
                tenant_id: f.tenant_id,
                resource_id: f.resource_id,
                menu_id: Some(f.menu_id),
                customer_id: None,
                reference: "KB-20260302-bbbbbbbb".to_string(),
                date: f.date,
                start_time: t(9, 0),
                end_time: t(10, 0),
                status: BookingStatus::Confirmed,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        let err = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap_err();
        assert!(matches!(err, CoreError::HoldConflict));

        // Definitive outcome: the hold is gone.
        assert!(f.holds.get_by_token(&hold.token).await.unwrap().is_none());
        // And nothing extra was inserted.
        assert_eq!(f.bookings.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_store_failure_keeps_the_hold() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        f.bookings.fail_next_commit();
        let err = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));

        // Hold still live: the client can retry with the same token.
        f.manager.inspect(f.tenant_id, &hold.token).await.unwrap();
        assert!(f.bookings.all().await.is_empty());

        // Retry succeeds once the store recovers.
        let booking = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();
        assert_eq!(booking.start_time, t(9, 0));
    }

    #[tokio::test]
    async fn test_begin_failure_keeps_the_hold_too() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        f.bookings.fail_next_begin();
        let err = f.committer.commit(&f.commit_request(&hold.token)).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
        f.manager.inspect(f.tenant_id, &hold.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_adjacent_booking_does_not_block_commit() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        let now = Utc::now();
        f.bookings
            .seed(Booking {
                id: Uuid::new_v4(),
                tenant_id: f.tenant_id,
                resource_id: f.resource_id,
                menu_id: Some(f.menu_id),
                customer_id: None,
                reference: "KB-20260302-cccccccc".to_string(),
                date: f.date,
                start_time: t(10, 0),
                end_time: t(11, 0),
                status: BookingStatus::Confirmed,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        // Back-to-back with the held 09:00-10:00: no overlap, no conflict.
        f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_booking_does_not_block_commit() {
        let f = fixture().await;
        let hold = f.manager.create_hold(&f.hold_request(t(9, 0))).await.unwrap();

        let now = Utc::now();
        f.bookings
            .seed(Booking {
                id: Uuid::new_v4(),
                tenant_id: f.tenant_id,
                resource_id: f.resource_id,
                menu_id: Some(f.menu_id),
                customer_id: None,
                reference: "KB-20260302-dddddddd".to_string(),
                date: f.date,
                start_time: t(9, 0),
                end_time: t(10, 0),
                status: BookingStatus::Cancelled,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        f.committer.commit(&f.commit_request(&hold.token)).await.unwrap();
    }
}
