//! One-JSON-file-per-session store.
//!
//! Layout: `<dir>/<sessionId>.json`, pretty-printed.  New records are
//! written to a hidden temp file and hard-linked into place, which fails
//! instead of overwriting when the name is already taken and never exposes
//! a half-written file under the final name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use lp_domain::{SessionId, SessionRecord};

use crate::store::{decode, encode, SessionStore, StoreError, StoreResult};

const MAX_ID_LEN: usize = 128;

/// File-backed [`SessionStore`].
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> lp_domain::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(path = %dir.display(), "file session store ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `id`, or `None` when the ID is not a safe file name.
    fn record_path(&self, id: &SessionId) -> Option<PathBuf> {
        is_safe_id(id.as_str()).then(|| self.dir.join(format!("{}.json", id.as_str())))
    }
}

/// Session IDs double as file names, so only `[A-Za-z0-9_-]` is allowed.
/// Anything else (dots, slashes, empty) cannot name a stored record.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> StoreResult<()> {
        let write_err = |reason: String| StoreError::Write {
            session: id.short().to_owned(),
            reason,
        };

        let path = self
            .record_path(id)
            .ok_or_else(|| write_err("session id is not a valid file name".into()))?;
        let bytes = encode(id, record)?;

        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", id.as_str(), uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| write_err(e.to_string()))?;

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            tracing::warn!(path = %tmp.display(), error = %e, "failed to remove temp session file");
        }

        match linked {
            Ok(()) => {
                tracing::debug!(session = %id.short(), path = %path.display(), "session written");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(id.short().to_owned()))
            }
            Err(e) => Err(write_err(e.to_string())),
        }
    }

    async fn read(&self, id: &SessionId) -> StoreResult<SessionRecord> {
        let not_found = || StoreError::NotFound(id.short().to_owned());
        let path = self.record_path(id).ok_or_else(not_found)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(source) => {
                return Err(StoreError::Read {
                    session: id.short().to_owned(),
                    source,
                })
            }
        };

        decode(id, &bytes)
    }

    async fn exists(&self, id: &SessionId) -> bool {
        match self.record_path(id) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            None => false,
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}
