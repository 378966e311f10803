//! Expiring key/value storage.
//!
//! Every ephemeral store in the API sits on top of [`ExpiringKv`]. The trait
//! only exposes operations the backend can perform atomically, so callers never
//! need a client-side lock.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::time::Instant;

/// Compare-and-delete in a single server-side step.
const DELETE_IF_EQUALS: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Counter bump that starts the window on the first hit, in one server-side step.
const INCREMENT: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

/// Key/value store whose entries expire on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpiringKv: Send + Sync {
    /// Health check - verify the backend is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Get the live value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` with a TTL, only if no live value exists.
    /// Returns true if the value was stored.
    async fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Delete `key` only if its live value equals `expected`.
    /// Returns true if the entry was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool>;

    /// Increment the counter under `key`, starting its TTL on the first increment.
    /// Returns the new count.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64>;
}

/// Redis implementation of ExpiringKv.
#[derive(Clone)]
pub struct RedisKv {
    client: redis::Client,
    delete_if_equals: redis::Script,
    increment: redis::Script,
}

impl RedisKv {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            delete_if_equals: redis::Script::new(DELETE_IF_EQUALS),
            increment: redis::Script::new(INCREMENT),
        }
    }
}

#[async_trait]
impl ExpiringKv for RedisKv {
    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(result == "PONG")
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET ... NX replies nil when a live value already exists
        let reply: redis::Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        Ok(!matches!(reply, redis::Value::Nil))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let deleted: i64 = self
            .delete_if_equals
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: i64 = self
            .increment
            .key(key)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process implementation of ExpiringKv for local development and tests.
///
/// Expired entries are treated as absent. Every write sweeps them out, so
/// one-off keys such as per-email counters don't accumulate. Time is read from
/// the tokio clock, so paused-time tests can advance past a TTL.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl ExpiringKv for MemoryKv {
    async fn health_check(&self) -> Result<bool> {
        Ok(self.entries.lock().is_ok())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries()?;

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        entries.retain(|_, entry| entry.is_live(now));

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries()?;

        let matches = match entries.get(key) {
            Some(entry) if entry.is_live(now) => entry.value == expected,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        };

        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        entries.retain(|_, entry| entry.is_live(now));

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: "0".to_string(),
                expires_at: now + ttl,
            });

        let count = entry.value.parse::<i64>()? + 1;
        entry.value = count.to_string();
        Ok(count)
    }
}
