use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use kairos_core::hold::{HoldRecord, SlotKey};
use kairos_core::repository::{HoldStore, StoreError};

const TOKEN_PREFIX: &str = "hold_token:";
const INDEX_PREFIX: &str = "hold_idx:";
const INDEX_CATALOG: &str = "hold_idx_all";

fn index_key(tenant_id: Uuid, resource_id: Uuid, date: NaiveDate) -> String {
    format!("{}{}:{}:{}", INDEX_PREFIX, tenant_id, resource_id, date.format("%Y-%m-%d"))
}

fn store_err(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn decode_err(e: serde_json::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// Hold registry backed by Redis.
///
/// Layout per hold: the record JSON under its slot key, a token -> slot key
/// pointer under `hold_token:`, and membership in a per-resource-day set
/// under `hold_idx:` so availability can enumerate live holds without a
/// scan. Slot key and token key expire together via Redis TTL, and an
/// extend moves the index deadline with them; the index sets are pruned
/// lazily and by the sweeper.
///
/// Expiry returned to callers is always derived from PTTL at read time, so
/// an extend never has to rewrite the payload.
#[derive(Clone)]
pub struct RedisHoldStore {
    client: redis::Client,
}

impl RedisHoldStore {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn fetch_by_slot_key(&self, slot_key: &str) -> Result<Option<HoldRecord>, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let (payload, pttl_ms): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(slot_key)
            .pttl(slot_key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        match payload {
            Some(raw) if pttl_ms > 0 => {
                let mut record: HoldRecord = serde_json::from_str(&raw).map_err(decode_err)?;
                record.expires_at = Utc::now() + chrono::Duration::milliseconds(pttl_ms);
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl HoldStore for RedisHoldStore {
    async fn try_create(&self, record: &HoldRecord, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let slot_key = record.slot_key().to_string();
        let token_key = format!("{}{}", TOKEN_PREFIX, record.token);
        let idx = index_key(record.tenant_id, record.resource_id, record.date);
        let payload = serde_json::to_string(record).map_err(decode_err)?;
        let ttl_ms = ttl.as_millis() as u64;

        // Single script so the existence check, both writes and the index
        // update cannot interleave with a competing creator.
        let script = redis::Script::new(
            r#"
            if redis.call('EXISTS', KEYS[1]) == 1 then
                return 0
            end
            redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
            redis.call('SET', KEYS[2], KEYS[1], 'PX', ARGV[2])
            redis.call('SADD', KEYS[3], KEYS[1])
            if redis.call('PTTL', KEYS[3]) < tonumber(ARGV[2]) then
                redis.call('PEXPIRE', KEYS[3], ARGV[2])
            end
            redis.call('SADD', KEYS[4], KEYS[3])
            return 1
        "#,
        );

        let created: i32 = script
            .key(&slot_key)
            .key(&token_key)
            .key(&idx)
            .key(INDEX_CATALOG)
            .arg(payload)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if created == 1 {
            debug!("Hold created: {}", slot_key);
        }
        Ok(created == 1)
    }

    async fn get(&self, key: &SlotKey) -> Result<Option<HoldRecord>, StoreError> {
        self.fetch_by_slot_key(&key.to_string()).await
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<HoldRecord>, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let token_key = format!("{}{}", TOKEN_PREFIX, token);
        let slot_key: Option<String> = conn.get(&token_key).await.map_err(store_err)?;

        // The pointer and the record are read in two round trips. If the
        // hold was released and the slot re-held in between, the record
        // belongs to another token now and must read as absent.
        match slot_key {
            Some(key) => match self.fetch_by_slot_key(&key).await? {
                Some(record) if record.token == token => Ok(Some(record)),
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    async fn extend(&self, key: &SlotKey, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        // The token pointer and the index membership must outlive the
        // record's new deadline, or a token lookup or availability listing
        // could miss a live hold. The index deadline only ratchets up; the
        // set is shared by every hold on the resource-day.
        let script = redis::Script::new(
            r#"
            local payload = redis.call('GET', KEYS[1])
            if not payload then
                return 0
            end
            local rec = cjson.decode(payload)
            redis.call('PEXPIRE', KEYS[1], ARGV[1])
            redis.call('PEXPIRE', ARGV[2] .. rec['token'], ARGV[1])
            local idx = ARGV[3] .. rec['tenant_id'] .. ':' .. rec['resource_id'] .. ':' .. rec['date']
            redis.call('SADD', idx, KEYS[1])
            if redis.call('PTTL', idx) < tonumber(ARGV[1]) then
                redis.call('PEXPIRE', idx, ARGV[1])
            end
            redis.call('SADD', KEYS[2], idx)
            return 1
        "#,
        );

        let extended: i32 = script
            .key(key.to_string())
            .key(INDEX_CATALOG)
            .arg(ttl.as_millis() as u64)
            .arg(TOKEN_PREFIX)
            .arg(INDEX_PREFIX)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(extended == 1)
    }

    async fn delete(&self, key: &SlotKey) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let idx = index_key(key.tenant_id, key.resource_id, key.date);
        let script = redis::Script::new(
            r#"
            local payload = redis.call('GET', KEYS[1])
            if payload then
                local token = cjson.decode(payload)['token']
                redis.call('DEL', ARGV[1] .. token)
                redis.call('DEL', KEYS[1])
            end
            redis.call('SREM', KEYS[2], KEYS[1])
            return 1
        "#,
        );

        let _: i32 = script
            .key(key.to_string())
            .key(&idx)
            .arg(TOKEN_PREFIX)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let token_key = format!("{}{}", TOKEN_PREFIX, token);
        let script = redis::Script::new(
            r#"
            local slot_key = redis.call('GET', KEYS[1])
            if not slot_key then
                return 0
            end
            local payload = redis.call('GET', slot_key)
            if payload then
                local rec = cjson.decode(payload)
                local idx = ARGV[1] .. rec['tenant_id'] .. ':' .. rec['resource_id'] .. ':' .. rec['date']
                redis.call('SREM', idx, slot_key)
                redis.call('DEL', slot_key)
            end
            redis.call('DEL', KEYS[1])
            return 1
        "#,
        );

        let _: i32 = script
            .key(&token_key)
            .arg(INDEX_PREFIX)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn list_active(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<HoldRecord>, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let idx = index_key(tenant_id, resource_id, date);
        let members: Vec<String> = conn.smembers(&idx).await.map_err(store_err)?;

        let mut live = Vec::new();
        let mut stale = Vec::new();
        for member in members {
            match self.fetch_by_slot_key(&member).await? {
                Some(record) => live.push(record),
                None => stale.push(member),
            }
        }

        // Members whose keys expired stay in the set until someone looks;
        // prune them here rather than waiting for the sweeper.
        if !stale.is_empty() {
            let _: () = conn.srem(&idx, &stale).await.map_err(store_err)?;
        }

        live.sort_by_key(|r| r.start_time);
        Ok(live)
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        // Redis already enforces expiry on the records themselves; the
        // sweep only trims index members pointing at expired keys.
        let indexes: Vec<String> = conn.smembers(INDEX_CATALOG).await.map_err(store_err)?;

        let mut removed = 0usize;
        for idx in indexes {
            let members: Vec<String> = conn.smembers(&idx).await.map_err(store_err)?;
            let mut stale = Vec::new();
            for member in &members {
                let exists: bool = conn.exists(member).await.map_err(store_err)?;
                if !exists {
                    stale.push(member.clone());
                }
            }
            if !stale.is_empty() {
                let _: () = conn.srem(&idx, &stale).await.map_err(store_err)?;
                removed += stale.len();
            }
            let remaining: i64 = conn.scard(&idx).await.map_err(store_err)?;
            if remaining == 0 {
                let _: () = conn.srem(INDEX_CATALOG, &idx).await.map_err(store_err)?;
            }
        }

        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
