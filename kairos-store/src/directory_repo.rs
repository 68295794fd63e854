use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use kairos_core::menu::Menu;
use kairos_core::repository::{MenuRepository, ResourceRepository, StoreError, TenantRepository};
use kairos_core::resource::{DayOverride, Resource, ResourceKind, WeeklySchedule};
use kairos_core::tenant::{ApprovalMode, TenantSettings};

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn corrupt(e: serde_json::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// Read-side access to the tenant catalog tables. Writes to these tables
/// belong to the management surface, not the reservation core.
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    kind: String,
    weekly_hours: Value,
    exceptions: Value,
    is_active: bool,
}

impl ResourceRow {
    fn into_resource(self) -> Result<Resource, StoreError> {
        let kind: ResourceKind =
            serde_json::from_value(Value::String(self.kind.clone())).map_err(corrupt)?;
        let schedule: WeeklySchedule = serde_json::from_value(self.weekly_hours).map_err(corrupt)?;
        let exceptions: BTreeMap<NaiveDate, DayOverride> =
            serde_json::from_value(self.exceptions).map_err(corrupt)?;

        Ok(Resource {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            kind,
            schedule,
            exceptions,
            is_active: self.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    prep_minutes: i32,
    service_minutes: i32,
    cleanup_minutes: i32,
    is_active: bool,
}

impl MenuRow {
    fn into_menu(self) -> Menu {
        Menu {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            prep_minutes: self.prep_minutes.max(0) as u32,
            service_minutes: self.service_minutes.max(0) as u32,
            cleanup_minutes: self.cleanup_minutes.max(0) as u32,
            is_active: self.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    slot_step_minutes: i32,
    approval_mode: String,
}

#[async_trait]
impl ResourceRepository for PgDirectoryStore {
    async fn get(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
    ) -> Result<Option<Resource>, StoreError> {
        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT id, tenant_id, name, kind, weekly_hours, exceptions, is_active
            FROM resources
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(ResourceRow::into_resource).transpose()
    }

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<Resource>, StoreError> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT id, tenant_id, name, kind, weekly_hours, exceptions, is_active
            FROM resources
            WHERE tenant_id = $1 AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(ResourceRow::into_resource).collect()
    }
}

#[async_trait]
impl MenuRepository for PgDirectoryStore {
    async fn get(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<Option<Menu>, StoreError> {
        let row = sqlx::query_as::<_, MenuRow>(
            r#"
            SELECT id, tenant_id, name, prep_minutes, service_minutes, cleanup_minutes, is_active
            FROM menus
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(menu_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(MenuRow::into_menu))
    }
}

#[async_trait]
impl TenantRepository for PgDirectoryStore {
    /// Tenants without a settings row fall back to the defaults.
    async fn settings(&self, tenant_id: Uuid) -> Result<TenantSettings, StoreError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT slot_step_minutes, approval_mode
            FROM tenant_settings
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => {
                let approval_mode = match row.approval_mode.as_str() {
                    "MANUAL" => ApprovalMode::Manual,
                    _ => ApprovalMode::Automatic,
                };
                Ok(TenantSettings {
                    slot_step_minutes: row.slot_step_minutes.max(0) as u32,
                    approval_mode,
                })
            }
            None => Ok(TenantSettings::default()),
        }
    }
}
