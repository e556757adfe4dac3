//! Process-local session store.
//!
//! Keeps encoded bytes rather than decoded records so reads go through the
//! same decode path (and corruption detection) as the file store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use lp_domain::{SessionId, SessionRecord};

use crate::store::{decode, encode, SessionStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place raw bytes under `id`, bypassing encoding.  Lets tests plant
    /// records that fail to decode.
    pub fn insert_raw(&self, id: &SessionId, bytes: impl Into<Vec<u8>>) {
        self.records
            .write()
            .insert(id.as_str().to_owned(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> StoreResult<()> {
        let bytes = encode(id, record)?;
        let mut records = self.records.write();
        if records.contains_key(id.as_str()) {
            return Err(StoreError::AlreadyExists(id.short().to_owned()));
        }
        records.insert(id.as_str().to_owned(), bytes);
        Ok(())
    }

    async fn read(&self, id: &SessionId) -> StoreResult<SessionRecord> {
        let bytes = self
            .records
            .read()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.short().to_owned()))?;
        decode(id, &bytes)
    }

    async fn exists(&self, id: &SessionId) -> bool {
        self.records.read().contains_key(id.as_str())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            credential_address: "0xFEED".into(),
            secret: "0xSECRET".into(),
            funding_hint: "https://faucet.example".into(),
            action_result: None,
        }
    }

    #[tokio::test]
    async fn create_read_exists() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        assert!(!store.exists(&id).await);

        store.create(&id, &record()).await.unwrap();
        assert!(store.exists(&id).await);
        assert_eq!(store.read(&id).await.unwrap(), record());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemorySessionStore::new();
        let id = SessionId::from("dup");
        store.create(&id, &record()).await.unwrap();
        assert!(matches!(
            store.create(&id, &record()).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn planted_garbage_reads_as_corrupt() {
        let store = MemorySessionStore::new();
        let id = SessionId::from("bad");
        store.insert_raw(&id, "nope");
        assert!(store.exists(&id).await);
        assert!(matches!(store.read(&id).await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemorySessionStore::new();
        assert!(store.read(&SessionId::from("ghost")).await.unwrap_err().is_not_found());
    }
}
