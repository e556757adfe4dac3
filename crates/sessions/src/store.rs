//! The session store contract.
//!
//! Records are create-once: there is no update or delete.  A store must
//! refuse to overwrite an existing key and must tell "no such session"
//! apart from "a record exists but cannot be decoded".

use async_trait::async_trait;

use lp_domain::{SessionId, SessionRecord};

/// Failures surfaced by a [`SessionStore`].
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {0} already exists")]
    AlreadyExists(String),

    #[error("session {session} is corrupt: {reason}")]
    Corrupt { session: String, reason: String },

    #[error("reading session {session}: {source}")]
    Read {
        session: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing session {session}: {reason}")]
    Write { session: String, reason: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed, create-once persistence for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new record under `id`.
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> StoreResult<()>;

    /// Load the record stored under `id`.
    async fn read(&self, id: &SessionId) -> StoreResult<SessionRecord>;

    /// Whether a record exists under `id`.  Never fails; I/O trouble
    /// reads as `false`.
    async fn exists(&self, id: &SessionId) -> bool;

    /// Human-readable location, for startup logs.
    fn describe(&self) -> String;
}

/// Decode stored bytes, mapping any failure to [`StoreError::Corrupt`].
pub(crate) fn decode(id: &SessionId, bytes: &[u8]) -> StoreResult<SessionRecord> {
    SessionRecord::decode(bytes).map_err(|reason| StoreError::Corrupt {
        session: id.short().to_owned(),
        reason,
    })
}

/// Encode a record, mapping serialization failure to [`StoreError::Write`].
pub(crate) fn encode(id: &SessionId, record: &SessionRecord) -> StoreResult<Vec<u8>> {
    record.encode().map_err(|e| StoreError::Write {
        session: id.short().to_owned(),
        reason: e.to_string(),
    })
}
