use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveTime;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use kairos_api::{app, metrics::Metrics, state::AppState};
use kairos_availability::AvailabilityCalculator;
use kairos_booking::BookingCommitter;
use kairos_core::menu::Menu;
use kairos_core::repository::HoldStore;
use kairos_core::resource::{Resource, ResourceKind, WeeklySchedule};
use kairos_core::tenant::{ApprovalMode, TenantSettings};
use kairos_hold::{HoldPolicy, HoldTokenManager};
use kairos_store::{MemoryBookingStore, MemoryDirectory, MemoryHoldStore};

/// Any future open day works; the schedule below opens every weekday.
const DATE: &str = "2099-06-01";

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// In-process application wired onto the memory stores. One salon chair,
/// one 60-minute menu, hours 09:00-12:00 with a 60-minute booking step.
struct TestApp {
    router: Router,
    tenant_id: Uuid,
    resource_id: Uuid,
    menu_id: Uuid,
    bookings: MemoryBookingStore,
}

impl TestApp {
    async fn new() -> Self {
        let tenant_id = Uuid::new_v4();
        let resource_id = Uuid::new_v4();
        let menu_id = Uuid::new_v4();

        let directory = Arc::new(MemoryDirectory::new());
        directory
            .upsert_resource(Resource {
                id: resource_id,
                tenant_id,
                name: "Chair One".to_string(),
                kind: ResourceKind::Staff,
                schedule: WeeklySchedule::uniform(t(9, 0), t(12, 0)).unwrap(),
                exceptions: BTreeMap::new(),
                is_active: true,
            })
            .await;
        directory
            .upsert_menu(Menu {
                id: menu_id,
                tenant_id,
                name: "Consultation".to_string(),
                prep_minutes: 0,
                service_minutes: 60,
                cleanup_minutes: 0,
                is_active: true,
            })
            .await;
        directory
            .set_tenant_settings(
                tenant_id,
                TenantSettings {
                    slot_step_minutes: 60,
                    approval_mode: ApprovalMode::Automatic,
                },
            )
            .await;

        let hold_store: Arc<dyn HoldStore> = Arc::new(MemoryHoldStore::new());
        let bookings = MemoryBookingStore::new();
        let (events_tx, _) = tokio::sync::broadcast::channel(16);

        let availability = Arc::new(AvailabilityCalculator::new(
            directory.clone(),
            directory.clone(),
            directory.clone(),
            Arc::new(bookings.clone()),
            hold_store.clone(),
        ));
        let holds = Arc::new(HoldTokenManager::new(
            directory.clone(),
            directory.clone(),
            Arc::new(bookings.clone()),
            hold_store.clone(),
            HoldPolicy::default(),
        ));
        let committer = Arc::new(BookingCommitter::new(
            hold_store.clone(),
            directory.clone(),
            Arc::new(bookings.clone()),
            events_tx,
        ));

        let state = AppState {
            availability,
            holds,
            committer,
            hold_store,
            metrics: Metrics::new(),
        };

        Self {
            router: app(state),
            tenant_id,
            resource_id,
            menu_id,
            bookings,
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.request_raw(method, path, body).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let body_str = body.map(|b| b.to_string()).unwrap_or_default();
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        (status, bytes.to_vec())
    }

    async fn create_hold(&self, start: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            &format!("/v1/tenants/{}/holds", self.tenant_id),
            Some(json!({
                "resource_id": self.resource_id,
                "menu_id": self.menu_id,
                "date": DATE,
                "start_time": start,
            })),
        )
        .await
    }

    async fn slots(&self) -> (StatusCode, Value) {
        self.request(
            "GET",
            &format!(
                "/v1/tenants/{}/slots?date={}&menu_id={}",
                self.tenant_id, DATE, self.menu_id
            ),
            None,
        )
        .await
    }
}

fn slot_starts(body: &Value) -> Vec<String> {
    body["slots"]
        .as_array()
        .expect("slots array")
        .iter()
        .map(|slot| slot["start_time"].as_str().expect("start_time").to_string())
        .collect()
}

#[tokio::test]
async fn test_slot_grid_for_open_day() {
    let app = TestApp::new().await;

    let (status, body) = app.slots().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], DATE);
    assert_eq!(slot_starts(&body), vec!["09:00:00", "10:00:00", "11:00:00"]);
}

#[tokio::test]
async fn test_hold_lifecycle_over_http() {
    let app = TestApp::new().await;

    // Create
    let (status, created) = app.create_hold("09:00:00").await;
    assert_eq!(status, StatusCode::CREATED);
    let token = created["token"].as_str().expect("token").to_string();
    assert_eq!(token.len(), 48);
    assert_eq!(created["end_time"], "10:00:00");
    let remaining = created["remaining_seconds"].as_i64().unwrap();
    assert!(remaining > 590 && remaining <= 600);

    // Inspect
    let (status, fetched) = app
        .request(
            "GET",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["token"], token.as_str());

    // Extend resets the clock to now + 5 minutes, shrinking the remainder
    let (status, extended) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/holds/{}/extend", app.tenant_id, token),
            Some(json!({ "minutes": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let remaining = extended["remaining_seconds"].as_i64().unwrap();
    assert!(remaining > 290 && remaining <= 300);

    // Release
    let (status, _) = app
        .request(
            "DELETE",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone afterwards
    let (status, body) = app
        .request(
            "GET",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::GONE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_duplicate_hold_conflicts() {
    let app = TestApp::new().await;

    let (status, _) = app.create_hold("09:00:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.create_hold("09:00:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_held_slot_leaves_grid_and_returns_after_release() {
    let app = TestApp::new().await;

    let (_, created) = app.create_hold("09:00:00").await;
    let token = created["token"].as_str().expect("token").to_string();

    let (_, body) = app.slots().await;
    assert_eq!(slot_starts(&body), vec!["10:00:00", "11:00:00"]);

    app.request(
        "DELETE",
        &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
        None,
    )
    .await;

    let (_, body) = app.slots().await;
    assert_eq!(slot_starts(&body), vec!["09:00:00", "10:00:00", "11:00:00"]);
}

#[tokio::test]
async fn test_commit_consumes_hold() {
    let app = TestApp::new().await;

    let (_, created) = app.create_hold("10:00:00").await;
    let token = created["token"].as_str().expect("token").to_string();

    let (status, booking) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/bookings", app.tenant_id),
            Some(json!({ "token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "CONFIRMED");
    assert!(booking["reference"].as_str().unwrap().starts_with("KB-"));

    // The hold is consumed, so inspect reports gone and a re-commit fails
    let (status, _) = app
        .request(
            "GET",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/bookings", app.tenant_id),
            Some(json!({ "token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::GONE);

    // Durable row exists and the slot stays off the grid
    assert_eq!(app.bookings.all().await.len(), 1);
    let (_, body) = app.slots().await;
    assert_eq!(slot_starts(&body), vec!["09:00:00", "11:00:00"]);
}

#[tokio::test]
async fn test_commit_with_unknown_token_is_gone() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/bookings", app.tenant_id),
            Some(json!({ "token": "not-a-real-token" })),
        )
        .await;

    assert_eq!(status, StatusCode::GONE);
    assert!(body["error"].is_string());
    assert!(app.bookings.all().await.is_empty());
}

#[tokio::test]
async fn test_foreign_tenant_cannot_touch_hold() {
    let app = TestApp::new().await;

    let (_, created) = app.create_hold("09:00:00").await;
    let token = created["token"].as_str().expect("token").to_string();
    let other_tenant = Uuid::new_v4();

    let (status, _) = app
        .request(
            "GET",
            &format!("/v1/tenants/{}/holds/{}", other_tenant, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/bookings", other_tenant),
            Some(json!({ "token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The rightful owner still sees the hold
    let (status, _) = app
        .request(
            "GET",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_past_date_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            "GET",
            &format!(
                "/v1/tenants/{}/slots?date=2020-01-01&menu_id={}",
                app.tenant_id, app.menu_id
            ),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_menu_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            "GET",
            &format!(
                "/v1/tenants/{}/slots?date={}&menu_id={}",
                app.tenant_id,
                DATE,
                Uuid::new_v4()
            ),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extend_bounds_rejected() {
    let app = TestApp::new().await;

    let (_, created) = app.create_hold("09:00:00").await;
    let token = created["token"].as_str().expect("token").to_string();

    let (status, _) = app
        .request(
            "POST",
            &format!("/v1/tenants/{}/holds/{}/extend", app.tenant_id, token),
            Some(json!({ "minutes": 0 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/v1/tenants/{}/holds/{}", app.tenant_id, "never-issued"),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    app.create_hold("09:00:00").await;
    app.create_hold("09:00:00").await; // loses, counts as conflict

    let (status, bytes) = app.request_raw("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("kairos_holds_created_total 1"));
    assert!(text.contains("kairos_hold_conflicts_total 1"));
}
