use thiserror::Error;

/// Opaque, session-keyed blob storage.
///
/// Implementations must keep sessions isolated: a blob written under one session id is never visible under another.
#[allow(async_fn_in_trait)]
pub trait SessionStore: Clone {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionStoreError>;

    async fn set(&self, session_id: &str, key: &str, blob: String) -> Result<(), SessionStoreError>;

    async fn clear(&self, session_id: &str, key: &str) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum SessionStoreError {
    #[error("A session id is required")]
    MissingSessionId,
    #[error("The session store is unavailable. {0}")]
    Unavailable(String),
}
