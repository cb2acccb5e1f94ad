//! Redis/Valkey-backed revocation store.
//!
//! All calls run under a bounded timeout so a wedged store surfaces as
//! `StoreError::Unavailable` instead of hanging the request. Rotation is a
//! server-side Lua script: GET + compare + DEL + SETEX execute as one unit,
//! which is what closes the concurrent-refresh race (MULTI/EXEC alone would
//! not, since the compare has to happen inside the atomic step).

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::time::Duration;
use tokio::time::timeout;

use super::{blacklist_key, session_key, RevocationStore, StoreError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const ROTATE_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if (not current) or (current ~= ARGV[1]) then
  return 0
end
redis.call('DEL', KEYS[1])
redis.call('SET', KEYS[2], ARGV[2], 'EX', tonumber(ARGV[3]))
return 1
";

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis/Valkey, e.g. `redis://127.0.0.1/` or
    /// `redis://:password@host:6379/0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial connection
    /// cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|err| StoreError::Backend(err.to_string()))?;

        // ConnectionManager reconnects on its own after drops.
        let connection = timeout(DEFAULT_TIMEOUT, client.get_connection_manager())
            .await
            .map_err(|_| StoreError::Unavailable("connect timed out".to_string()))?
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(Self {
            connection,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, redis::RedisError>> + Send,
    {
        match timeout(self.timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.is_timeout() || err.is_connection_refusal() => {
                Err(StoreError::Unavailable(err.to_string()))
            }
            Ok(Err(err)) => Err(StoreError::Backend(err.to_string())),
            Err(_) => Err(StoreError::Unavailable(format!(
                "operation exceeded {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl RevocationStore for RedisStore {
    async fn put_session(
        &self,
        jti: &str,
        token_value: &str,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let key = session_key(jti);
        let ttl = u64::try_from(ttl_seconds).unwrap_or(0);
        self.run(async move { connection.set_ex(key, token_value, ttl).await })
            .await
    }

    async fn get_session(&self, jti: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();
        let key = session_key(jti);
        self.run(async move { connection.get(key).await }).await
    }

    async fn delete_session(&self, jti: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let key = session_key(jti);
        // DEL returns the removed count; deletion is idempotent so it is ignored.
        let _: i64 = self.run(async move { connection.del(key).await }).await?;
        Ok(())
    }

    async fn rotate_session(
        &self,
        old_jti: &str,
        expected: &str,
        new_jti: &str,
        new_value: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let script = Script::new(ROTATE_SCRIPT);
        let old_key = session_key(old_jti);
        let new_key = session_key(new_jti);
        let expected = expected.to_string();
        let new_value = new_value.to_string();

        let swapped: i32 = self
            .run(async move {
                script
                    .key(old_key)
                    .key(new_key)
                    .arg(expected)
                    .arg(new_value)
                    .arg(ttl_seconds)
                    .invoke_async(&mut connection)
                    .await
            })
            .await?;

        Ok(swapped == 1)
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        // A non-positive TTL means the token is already past its expiry and
        // needs no mark; SETEX would reject it anyway.
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut connection = self.connection.clone();
        let key = blacklist_key(jti);
        let ttl = u64::try_from(ttl_seconds).unwrap_or(0);
        self.run(async move { connection.set_ex(key, "1", ttl).await })
            .await
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let key = blacklist_key(jti);
        self.run(async move { connection.exists(key).await }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_script_compares_before_swapping() {
        // The compare must happen inside the script, otherwise two refreshes
        // could both pass the read and double-issue.
        assert!(ROTATE_SCRIPT.contains("cur"));
        assert!(ROTATE_SCRIPT.contains("return 0"));
        let del = ROTATE_SCRIPT.find("DEL").expect("script deletes old key");
        let set = ROTATE_SCRIPT.find("SET").expect("script writes new key");
        assert!(del < set, "old session dies before the new one is written");
    }
}
