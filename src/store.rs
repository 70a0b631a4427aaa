use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use crate::types::{SessionId, TokenPair};

/// Error type for store implementations (distributed backends can fail).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Exclusive owner of all token material.
///
/// The store is injected into the [`SessionBroker`](crate::SessionBroker) so
/// a distributed backend (Redis, a database) can replace the in-memory
/// default without touching broker logic. Implementations must provide
/// per-key atomicity: a `put` replacing a session's pair is all-or-nothing as
/// observed by concurrent `get`s. No ordering is required across different
/// sessions.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Overwrite-or-insert the pair for a session. No merge.
    async fn put(&self, session_id: &SessionId, pair: TokenPair) -> Result<(), StoreError>;

    /// Look up the pair for a session.
    ///
    /// `None` covers never-created, removed, and store-TTL-elapsed alike;
    /// callers cannot (and must not) distinguish them.
    async fn get(&self, session_id: &SessionId) -> Result<Option<TokenPair>, StoreError>;

    /// Remove a session. Idempotent — removing an absent key is not an error.
    async fn remove(&self, session_id: &SessionId) -> Result<(), StoreError>;
}

/// Default session lifetime enforced by [`MemoryTokenStore`].
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(8);

struct SessionEntry {
    pair: TokenPair,
    created_at: OffsetDateTime,
}

/// In-memory, process-local token store.
///
/// Backed by a sharded concurrent map, so unrelated sessions never contend on
/// a global lock. Enforces its own session TTL, independent of access-token
/// expiry, checked lazily on `get` — there is no background sweep. A process
/// restart drops every session; that is an accepted property of this store,
/// not a bug.
pub struct MemoryTokenStore {
    entries: DashMap<SessionId, SessionEntry>,
    session_ttl: Duration,
}

impl MemoryTokenStore {
    /// Create a store with the default session TTL (8 hours).
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_ttl(DEFAULT_SESSION_TTL)
    }

    /// Create a store with an explicit session TTL.
    ///
    /// This bounds the session's total lifetime regardless of how often its
    /// tokens are refreshed; keep it in sync with the session cookie Max-Age.
    #[must_use]
    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            session_ttl,
        }
    }

    /// Number of live (possibly TTL-stale) sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, session_id: &SessionId, pair: TokenPair) -> Result<(), StoreError> {
        self.entries.insert(
            session_id.clone(),
            SessionEntry {
                pair,
                created_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<TokenPair>, StoreError> {
        let now = OffsetDateTime::now_utc();
        // Lazy TTL eviction: drop the entry before anyone can read it.
        self.entries
            .remove_if(session_id, |_, entry| now >= entry.created_at + self.session_ttl);
        Ok(self.entries.get(session_id).map(|entry| entry.pair.clone()))
    }

    async fn remove(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.entries.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::TokenResponse;

    fn pair(access: &str) -> TokenPair {
        TokenPair::from_response(TokenResponse {
            access_token: access.into(),
            token_type: "Bearer".into(),
            expires_in: Some(3600),
            refresh_token: Some("RT1".into()),
        })
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = MemoryTokenStore::new();
        let id = SessionId::generate();
        store.put(&id, pair("AT1")).await.unwrap();
        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.access_token, "AT1");
    }

    #[tokio::test]
    async fn put_overwrites_in_place() {
        let store = MemoryTokenStore::new();
        let id = SessionId::generate();
        store.put(&id, pair("AT1")).await.unwrap();
        store.put(&id, pair("AT2")).await.unwrap();
        assert_eq!(store.len(), 1);
        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.access_token, "AT2");
    }

    #[tokio::test]
    async fn get_unknown_session_is_none() {
        let store = MemoryTokenStore::new();
        assert!(store.get(&SessionId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryTokenStore::new();
        let id = SessionId::generate();
        store.put(&id, pair("AT1")).await.unwrap();
        store.remove(&id).await.unwrap();
        store.remove(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_ttl_evicts_lazily() {
        let store = MemoryTokenStore::with_session_ttl(Duration::ZERO);
        let id = SessionId::generate();
        store.put(&id, pair("AT1")).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
