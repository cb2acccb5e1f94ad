//! In-process revocation store for tests and single-node development.
//!
//! Not suitable for production: state is lost on restart and invisible to
//! other server processes. Semantics mirror the Redis backend, including
//! TTL expiry and the atomicity of `rotate_session` (a single lock spans
//! the whole compare-delete-insert step).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{RevocationStore, StoreError};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: &str, ttl_seconds: i64) -> Self {
        let ttl = Duration::from_secs(u64::try_from(ttl_seconds).unwrap_or(0));
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, Entry>,
    blacklist: HashMap<String, Entry>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }

    /// Seconds left on a session entry, if present. Test hook; the trait
    /// deliberately has no TTL accessor.
    pub fn session_ttl_seconds(&self, jti: &str) -> Result<Option<i64>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .sessions
            .get(jti)
            .filter(|entry| entry.live())
            .map(|entry| remaining_seconds(entry.expires_at)))
    }

    /// Seconds left on a blacklist entry, if present.
    pub fn blacklist_ttl_seconds(&self, jti: &str) -> Result<Option<i64>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .blacklist
            .get(jti)
            .filter(|entry| entry.live())
            .map(|entry| remaining_seconds(entry.expires_at)))
    }
}

fn remaining_seconds(expires_at: Instant) -> i64 {
    i64::try_from(expires_at.saturating_duration_since(Instant::now()).as_secs())
        .unwrap_or(i64::MAX)
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn put_session(
        &self,
        jti: &str,
        token_value: &str,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .sessions
            .insert(jti.to_string(), Entry::new(token_value, ttl_seconds));
        Ok(())
    }

    async fn get_session(&self, jti: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.lock()?;
        // Lazy expiry: drop dead entries on read, like Redis TTL would.
        if let Some(entry) = inner.sessions.get(jti) {
            if !entry.live() {
                inner.sessions.remove(jti);
                return Ok(None);
            }
        }
        Ok(inner.sessions.get(jti).map(|entry| entry.value.clone()))
    }

    async fn delete_session(&self, jti: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.sessions.remove(jti);
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
        let mut inner = self.lock()?;

        let matches = inner
            .sessions
            .get(old_jti)
            .filter(|entry| entry.live())
            .is_some_and(|entry| entry.value == expected);
        if !matches {
            return Ok(false);
        }

        inner.sessions.remove(old_jti);
        inner
            .sessions
            .insert(new_jti.to_string(), Entry::new(new_value, ttl_seconds));
        Ok(true)
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut inner = self.lock()?;
        inner
            .blacklist
            .insert(jti.to_string(), Entry::new("1", ttl_seconds));
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner.blacklist.get(jti) {
            if entry.live() {
                return Ok(true);
            }
            inner.blacklist.remove(jti);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn session_round_trip() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.put_session("jti-a", "token-a", 60).await?;
        assert_eq!(
            store.get_session("jti-a").await?,
            Some("token-a".to_string())
        );

        store.delete_session("jti-a").await?;
        assert_eq!(store.get_session("jti-a").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn expired_entries_vanish() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.put_session("jti-b", "token-b", 0).await?;
        assert_eq!(store.get_session("jti-b").await?, None);

        store.blacklist("jti-b", 0).await?;
        assert!(!store.is_blacklisted("jti-b").await?);
        Ok(())
    }

    #[tokio::test]
    async fn rotate_requires_exact_value() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.put_session("old", "original", 60).await?;

        // Mismatched value: nothing moves.
        assert!(
            !store
                .rotate_session("old", "stale-copy", "new", "next", 60)
                .await?
        );
        assert_eq!(
            store.get_session("old").await?,
            Some("original".to_string())
        );
        assert_eq!(store.get_session("new").await?, None);

        // Exact value: old dies, new lives, in one step.
        assert!(
            store
                .rotate_session("old", "original", "new", "next", 60)
                .await?
        );
        assert_eq!(store.get_session("old").await?, None);
        assert_eq!(store.get_session("new").await?, Some("next".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn rotate_against_missing_key_fails() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        assert!(
            !store
                .rotate_session("never-existed", "x", "new", "next", 60)
                .await?
        );
        assert_eq!(store.get_session("new").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rotations_have_one_winner() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        store.put_session("old", "original", 60).await?;

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .rotate_session("old", "original", "new-1", "next-1", 60)
                    .await
            })
        };
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .rotate_session("old", "original", "new-2", "next-2", 60)
                    .await
            })
        };

        let (first, second) = tokio::join!(first, second);
        let first = first.expect("task")?;
        let second = second.expect("task")?;

        assert!(first ^ second, "exactly one rotation must win");
        assert_eq!(store.get_session("old").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn blacklist_marks_until_ttl() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        assert!(!store.is_blacklisted("jti-c").await?);
        store.blacklist("jti-c", 60).await?;
        assert!(store.is_blacklisted("jti-c").await?);

        let ttl = store.blacklist_ttl_seconds("jti-c")?.expect("entry");
        assert!((58..=60).contains(&ttl), "ttl {ttl} outside tolerance");
        Ok(())
    }
}
