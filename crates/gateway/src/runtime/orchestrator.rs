//! Two-phase session workflow: provision, then act.
//!
//! The orchestrator owns no session state.  Records live in the
//! [`SessionStore`]; the only in-process state is the per-session action
//! lock and whatever the injected [`MetricsSink`] keeps.
//!
//! Per-session state is implicit:
//!
//! ```text
//! UNPROVISIONED --create--> PROVISIONED --lock--> ACTION_IN_FLIGHT --ok--> COMPLETED
//!                                ^                      |
//!                                +------ failure -------+
//! ```
//!
//! `ACTION_IN_FLIGHT` is "the session's lock is held".  A failed action
//! leaves the record untouched so the caller can retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use lp_domain::trace::TraceEvent;
use lp_domain::{SessionId, SessionRecord};
use lp_executor::{Executor, ExecutorError, Phase};
use lp_sessions::{SessionStore, StoreError};

use super::metrics::MetricsSink;
use super::session_lock::{SessionLockMap, SessionPermit};

/// Extra time granted over the executor's own timeout before the
/// orchestrator gives up on the call.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Broad fault class of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or malformed request input; the caller can fix it.
    Input,
    NotFound,
    /// The session is already running an action.
    Conflict,
    /// The request body exceeded the accepted size.
    TooLarge,
    /// A stored record could not be read or written.
    Storage,
    /// The provisioning or action step itself failed.
    Executor,
    /// The executor's output did not decode.
    OutputParse,
}

/// Every way a workflow operation can fail.  Codes and messages are part of
/// the wire contract and must keep their meaning.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Session ID is required")]
    MissingSessionId,
    #[error("Session not found")]
    SessionNotFound,
    #[error("An action is already in progress for this session")]
    SessionBusy,
    #[error("Corrupted session file")]
    SessionRead,
    #[error("Failed to persist session")]
    SessionWrite,
    #[error("Failed to generate wallet")]
    ProvisionFailed,
    #[error("Invalid output from wallet script")]
    ProvisionOutput,
    #[error("Deployment failed. Check server logs.")]
    ActionFailed,
    #[error("Invalid output from deploy script")]
    ActionOutput,
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl WorkflowError {
    /// Machine-matchable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSessionId => "MISSING_SESSION_ID",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionBusy => "SESSION_BUSY",
            Self::SessionRead => "SESSION_READ_ERROR",
            Self::SessionWrite => "SESSION_WRITE_ERROR",
            Self::ProvisionFailed => "WALLET_GEN_FAILED",
            Self::ActionFailed => "DEPLOY_FAILED",
            Self::ProvisionOutput | Self::ActionOutput => "PARSE_ERROR",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingSessionId => ErrorClass::Input,
            Self::SessionNotFound => ErrorClass::NotFound,
            Self::SessionBusy => ErrorClass::Conflict,
            Self::SessionRead | Self::SessionWrite => ErrorClass::Storage,
            Self::ProvisionFailed | Self::ActionFailed => ErrorClass::Executor,
            Self::ProvisionOutput | Self::ActionOutput => ErrorClass::OutputParse,
            Self::PayloadTooLarge => ErrorClass::TooLarge,
        }
    }

    fn from_executor(err: &ExecutorError) -> Self {
        match (err, err.phase()) {
            (ExecutorError::Failed { .. }, Phase::Provision) => Self::ProvisionFailed,
            (ExecutorError::Failed { .. }, Phase::Action) => Self::ActionFailed,
            (ExecutorError::OutputParse { .. }, Phase::Provision) => Self::ProvisionOutput,
            (ExecutorError::OutputParse { .. }, Phase::Action) => Self::ActionOutput,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A session as returned by create and lookup.  Includes the secret: it is
/// a development-only credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub credential_address: String,
    pub secret: String,
    pub funding_hint: String,
}

impl SessionView {
    fn new(id: &SessionId, record: SessionRecord) -> Self {
        Self {
            session_id: id.as_str().to_owned(),
            credential_address: record.credential_address,
            secret: record.secret,
            funding_hint: record.funding_hint,
        }
    }
}

/// Result of a successful action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub credential_address: String,
    pub action_address: String,
    pub reference_link: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    executor: Arc<dyn Executor>,
    metrics: Arc<dyn MetricsSink>,
    locks: SessionLockMap,
    executor_timeout: Duration,
}

impl Orchestrator {
    /// `executor_timeout` is the executor's own limit; the orchestrator
    /// adds a short grace period on top before abandoning a call.
    pub fn new(
        store: Arc<dyn SessionStore>,
        executor: Arc<dyn Executor>,
        metrics: Arc<dyn MetricsSink>,
        executor_timeout: Duration,
    ) -> Self {
        Self {
            store,
            executor,
            metrics,
            locks: SessionLockMap::new(),
            executor_timeout: executor_timeout.saturating_add(TIMEOUT_GRACE),
        }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Sessions with an action lock entry (held or not yet pruned).
    pub fn tracked_locks(&self) -> usize {
        self.locks.session_count()
    }

    /// Provision credentials and persist them under a fresh session ID.
    pub async fn create_session(&self) -> Result<SessionView, WorkflowError> {
        tracing::info!("provisioning new session");

        let provisioned = self
            .bounded(Phase::Provision, self.executor.provision())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "provisioning failed");
                WorkflowError::from_executor(&e)
            })?;

        let id = SessionId::generate();
        let record = SessionRecord::from(provisioned);

        self.store.create(&id, &record).await.map_err(|e| {
            tracing::error!(session = %id.short(), error = %e, "session write failed");
            WorkflowError::SessionWrite
        })?;

        self.metrics.session_created();
        TraceEvent::SessionCreated {
            session: id.short().to_owned(),
            credential_address: record.credential_address.clone(),
        }
        .emit();

        Ok(SessionView::new(&id, record))
    }

    /// Look up a session.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionView, WorkflowError> {
        let id = require_id(session_id)?;
        let record = self.load(&id).await?;
        Ok(SessionView::new(&id, record))
    }

    /// Run the action phase for a session.
    ///
    /// Sequential calls each invoke the executor again.  Concurrent calls
    /// for the same session are rejected with [`WorkflowError::SessionBusy`]
    /// while the first is in flight.
    pub async fn perform_action(&self, session_id: &str) -> Result<ActionReceipt, WorkflowError> {
        let id = require_id(session_id)?;

        if !self.store.exists(&id).await {
            tracing::warn!(session = %id.short(), "session not found");
            return Err(WorkflowError::SessionNotFound);
        }

        let permit = self.locks.try_acquire(id.as_str()).map_err(|_| {
            tracing::warn!(session = %id.short(), "action already in flight");
            self.metrics.action_rejected_busy();
            TraceEvent::ActionRejectedBusy {
                session: id.short().to_owned(),
            }
            .emit();
            WorkflowError::SessionBusy
        })?;

        let result = self.run_action(&id, permit).await;
        self.locks.prune_idle();
        result
    }

    /// Holds `_permit` until the executor call has finished or been
    /// dropped, so the lock is never free while the action still runs.
    async fn run_action(
        &self,
        id: &SessionId,
        _permit: SessionPermit,
    ) -> Result<ActionReceipt, WorkflowError> {
        let record = self.load(id).await?;

        TraceEvent::ActionStarted {
            session: id.short().to_owned(),
        }
        .emit();
        let started = Instant::now();

        let outcome = self
            .bounded(Phase::Action, self.executor.act(&record.secret))
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) => {
                self.metrics.action_completed();
                TraceEvent::ActionCompleted {
                    session: id.short().to_owned(),
                    action_address: outcome.action_address.clone(),
                    duration_ms,
                }
                .emit();
                Ok(ActionReceipt {
                    credential_address: record.credential_address,
                    action_address: outcome.action_address,
                    reference_link: outcome.reference_link,
                })
            }
            Err(e) => {
                let err = WorkflowError::from_executor(&e);
                self.metrics.action_failed();
                tracing::error!(session = %id.short(), duration_ms, error = %e, "action failed");
                TraceEvent::ActionFailed {
                    session: id.short().to_owned(),
                    code: err.code().to_owned(),
                    duration_ms,
                }
                .emit();
                Err(err)
            }
        }
    }

    /// Read a record, classifying store failures.
    async fn load(&self, id: &SessionId) -> Result<SessionRecord, WorkflowError> {
        let result = self.store.read(id).await;
        TraceEvent::SessionRead {
            session: id.short().to_owned(),
            found: result.is_ok(),
        }
        .emit();

        result.map_err(|e| match e {
            StoreError::NotFound(_) => WorkflowError::SessionNotFound,
            other => {
                tracing::error!(session = %id.short(), error = %other, "session read failed");
                WorkflowError::SessionRead
            }
        })
    }

    /// Apply the orchestrator-side timeout to an executor call.
    async fn bounded<T>(
        &self,
        phase: Phase,
        call: impl std::future::Future<Output = Result<T, ExecutorError>>,
    ) -> Result<T, ExecutorError> {
        match tokio::time::timeout(self.executor_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::failed(
                phase,
                format!("no result within {}s", self.executor_timeout.as_secs()),
            )),
        }
    }
}

fn require_id(raw: &str) -> Result<SessionId, WorkflowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::MissingSessionId);
    }
    Ok(SessionId::from(trimmed))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lp_domain::{ActionOutcome, Provisioned};
    use lp_sessions::{MemorySessionStore, StoreResult};

    use super::*;
    use crate::runtime::metrics::InMemoryMetrics;

    // ── Fakes ────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeExecutor {
        provision_error: Option<ExecutorError>,
        act_error: Option<ExecutorError>,
        act_delay: Duration,
        provisions: AtomicUsize,
        actions: AtomicUsize,
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn provision(&self) -> Result<Provisioned, ExecutorError> {
            let n = self.provisions.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.provision_error {
                return Err(e.clone());
            }
            Ok(Provisioned {
                credential_address: format!("0xFEED{n}"),
                secret: format!("0xSECRET{n}"),
                funding_hint: "https://faucet.example".into(),
            })
        }

        async fn act(&self, secret: &str) -> Result<ActionOutcome, ExecutorError> {
            self.actions.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.act_delay).await;
            if let Some(e) = &self.act_error {
                return Err(e.clone());
            }
            Ok(ActionOutcome {
                action_address: "0xC0DE".into(),
                reference_link: format!("https://explorer.example/{secret}"),
            })
        }
    }

    /// Memory store that counts every call.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for CountingStore {
        async fn create(&self, id: &SessionId, record: &SessionRecord) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create(id, record).await
        }
        async fn read(&self, id: &SessionId) -> StoreResult<SessionRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.read(id).await
        }
        async fn exists(&self, id: &SessionId) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.exists(id).await
        }
        fn describe(&self) -> String {
            "counting".into()
        }
    }

    struct Harness {
        orch: Arc<Orchestrator>,
        store: Arc<CountingStore>,
        executor: Arc<FakeExecutor>,
        metrics: Arc<InMemoryMetrics>,
    }

    fn harness(executor: FakeExecutor) -> Harness {
        let store = Arc::new(CountingStore::default());
        let executor = Arc::new(executor);
        let metrics = Arc::new(InMemoryMetrics::new());
        let orch = Arc::new(Orchestrator::new(
            store.clone(),
            executor.clone(),
            metrics.clone(),
            Duration::from_secs(5),
        ));
        Harness {
            orch,
            store,
            executor,
            metrics,
        }
    }

    // ── create ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_returns_provisioned_fields_and_persists() {
        let h = harness(FakeExecutor::default());
        let view = h.orch.create_session().await.unwrap();

        assert!(uuid_like(&view.session_id));
        assert_eq!(view.credential_address, "0xFEED0");
        assert_eq!(view.secret, "0xSECRET0");
        assert_eq!(view.funding_hint, "https://faucet.example");
        assert!(h.store.inner.exists(&SessionId::from(view.session_id.as_str())).await);
        assert_eq!(h.metrics.snapshot().sessions_created, 1);
    }

    #[tokio::test]
    async fn session_ids_are_unique_across_many_creations() {
        let h = harness(FakeExecutor::default());
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let view = h.orch.create_session().await.unwrap();
            assert!(seen.insert(view.session_id), "duplicate session id");
        }
        assert_eq!(h.store.inner.len(), 10_000);
    }

    #[tokio::test]
    async fn provision_failure_creates_nothing() {
        let h = harness(FakeExecutor {
            provision_error: Some(ExecutorError::failed(Phase::Provision, "exit 1")),
            ..FakeExecutor::default()
        });
        let err = h.orch.create_session().await.unwrap_err();
        assert_eq!(err, WorkflowError::ProvisionFailed);
        assert_eq!(err.code(), "WALLET_GEN_FAILED");
        assert!(h.store.inner.is_empty());
    }

    #[tokio::test]
    async fn provision_garbage_is_parse_error_and_creates_nothing() {
        let h = harness(FakeExecutor {
            provision_error: Some(ExecutorError::output_parse(Phase::Provision, "not json")),
            ..FakeExecutor::default()
        });
        let err = h.orch.create_session().await.unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
        assert_eq!(err.class(), ErrorClass::OutputParse);
        assert!(h.store.inner.is_empty());
    }

    // ── get ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn get_returns_exactly_what_create_wrote() {
        let h = harness(FakeExecutor::default());
        let created = h.orch.create_session().await.unwrap();
        let fetched = h.orch.get_session(&created.session_id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_classifies_missing_unknown_and_corrupt() {
        let h = harness(FakeExecutor::default());
        assert_eq!(
            h.orch.get_session("  ").await.unwrap_err(),
            WorkflowError::MissingSessionId
        );
        assert_eq!(
            h.orch.get_session("ghost").await.unwrap_err(),
            WorkflowError::SessionNotFound
        );

        h.store.inner.insert_raw(&SessionId::from("broken"), "{oops");
        let err = h.orch.get_session("broken").await.unwrap_err();
        assert_eq!(err.code(), "SESSION_READ_ERROR");
    }

    // ── act ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn missing_id_touches_neither_store_nor_executor() {
        let h = harness(FakeExecutor::default());
        let err = h.orch.perform_action("").await.unwrap_err();
        assert_eq!(err.code(), "MISSING_SESSION_ID");
        assert_eq!(err.class(), ErrorClass::Input);
        assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_id_never_reaches_executor() {
        let h = harness(FakeExecutor::default());
        let err = h.orch.perform_action("ghost").await.unwrap_err();
        assert_eq!(err, WorkflowError::SessionNotFound);
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 0);
        assert_eq!(h.orch.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn successful_action_returns_receipt() {
        let h = harness(FakeExecutor::default());
        let created = h.orch.create_session().await.unwrap();

        let receipt = h.orch.perform_action(&created.session_id).await.unwrap();
        assert_eq!(receipt.credential_address, created.credential_address);
        assert_eq!(receipt.action_address, "0xC0DE");
        assert_eq!(
            receipt.reference_link,
            format!("https://explorer.example/{}", created.secret)
        );
        assert_eq!(h.metrics.snapshot().actions_completed, 1);
        assert_eq!(h.orch.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn sequential_actions_reinvoke_executor() {
        let h = harness(FakeExecutor::default());
        let created = h.orch.create_session().await.unwrap();
        h.orch.perform_action(&created.session_id).await.unwrap();
        h.orch.perform_action(&created.session_id).await.unwrap();
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_action_leaves_session_intact_and_retryable() {
        let h = harness(FakeExecutor {
            act_error: Some(ExecutorError::failed(Phase::Action, "insufficient funds")),
            ..FakeExecutor::default()
        });
        let created = h.orch.create_session().await.unwrap();

        let err = h.orch.perform_action(&created.session_id).await.unwrap_err();
        assert_eq!(err.code(), "DEPLOY_FAILED");
        assert_eq!(err.class(), ErrorClass::Executor);

        assert_eq!(h.orch.get_session(&created.session_id).await.unwrap(), created);
        // Lock was released: a retry reaches the executor again.
        let _ = h.orch.perform_action(&created.session_id).await;
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 2);
        assert_eq!(h.metrics.snapshot().actions_failed, 2);
    }

    #[tokio::test]
    async fn action_garbage_is_parse_error_distinct_from_failure() {
        let h = harness(FakeExecutor {
            act_error: Some(ExecutorError::output_parse(Phase::Action, "garbage")),
            ..FakeExecutor::default()
        });
        let created = h.orch.create_session().await.unwrap();
        let err = h.orch.perform_action(&created.session_id).await.unwrap_err();
        assert_eq!(err, WorkflowError::ActionOutput);
        assert_eq!(err.code(), "PARSE_ERROR");
        assert_ne!(err.code(), WorkflowError::ActionFailed.code());
    }

    #[tokio::test]
    async fn concurrent_actions_on_one_session_invoke_executor_once() {
        let h = harness(FakeExecutor {
            act_delay: Duration::from_millis(200),
            ..FakeExecutor::default()
        });
        let created = h.orch.create_session().await.unwrap();

        let (a, b) = tokio::join!(
            h.orch.perform_action(&created.session_id),
            h.orch.perform_action(&created.session_id),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(WorkflowError::SessionBusy))));
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 1);
        assert_eq!(h.metrics.snapshot().actions_rejected_busy, 1);
    }

    #[tokio::test]
    async fn different_sessions_run_concurrently() {
        let h = harness(FakeExecutor {
            act_delay: Duration::from_millis(100),
            ..FakeExecutor::default()
        });
        let s1 = h.orch.create_session().await.unwrap();
        let s2 = h.orch.create_session().await.unwrap();

        let (a, b) = tokio::join!(
            h.orch.perform_action(&s1.session_id),
            h.orch.perform_action(&s2.session_id),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_executor_is_cut_off_as_failure() {
        let h = harness(FakeExecutor {
            act_delay: Duration::from_secs(3600),
            ..FakeExecutor::default()
        });
        let created = h.orch.create_session().await.unwrap();
        let err = h.orch.perform_action(&created.session_id).await.unwrap_err();
        assert_eq!(err, WorkflowError::ActionFailed);
        assert!(h.orch.get_session(&created.session_id).await.is_ok());
    }

    /// Store whose writes always fail.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemorySessionStore,
    }

    #[async_trait]
    impl SessionStore for ReadOnlyStore {
        async fn create(&self, id: &SessionId, _record: &SessionRecord) -> StoreResult<()> {
            Err(StoreError::Write {
                session: id.short().to_owned(),
                reason: "disk full".into(),
            })
        }
        async fn read(&self, id: &SessionId) -> StoreResult<SessionRecord> {
            self.inner.read(id).await
        }
        async fn exists(&self, id: &SessionId) -> bool {
            self.inner.exists(id).await
        }
        fn describe(&self) -> String {
            "read-only".into()
        }
    }

    #[tokio::test]
    async fn store_write_failure_is_session_write_error() {
        let store = Arc::new(ReadOnlyStore::default());
        let metrics = Arc::new(InMemoryMetrics::new());
        let orch = Orchestrator::new(
            store.clone(),
            Arc::new(FakeExecutor::default()),
            metrics.clone(),
            Duration::from_secs(5),
        );

        let err = orch.create_session().await.unwrap_err();
        assert_eq!(err, WorkflowError::SessionWrite);
        assert_eq!(err.code(), "SESSION_WRITE_ERROR");
        assert_eq!(err.class(), ErrorClass::Storage);
        assert!(store.inner.is_empty());
        assert_eq!(metrics.snapshot().sessions_created, 0);
    }

    #[tokio::test]
    async fn corrupt_record_blocks_action_without_running_executor() {
        let h = harness(FakeExecutor::default());
        h.store.inner.insert_raw(&SessionId::from("broken"), "{oops");

        let err = h.orch.perform_action("broken").await.unwrap_err();
        assert_eq!(err, WorkflowError::SessionRead);
        assert_eq!(err.code(), "SESSION_READ_ERROR");
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 0);
        assert_eq!(h.orch.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn abandoned_action_holds_lock_until_dropped() {
        let h = harness(FakeExecutor {
            act_delay: Duration::from_secs(3600),
            ..FakeExecutor::default()
        });
        let created = h.orch.create_session().await.unwrap();

        let orch = h.orch.clone();
        let id = created.session_id.clone();
        let running = tokio::spawn(async move { orch.perform_action(&id).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            h.orch.perform_action(&created.session_id).await.unwrap_err(),
            WorkflowError::SessionBusy
        );

        // Dropping the caller (client disconnect) frees the session.
        running.abort();
        let _ = running.await;
        assert!(h.orch.locks.try_acquire(&created.session_id).is_ok());
        assert_eq!(h.executor.actions.load(Ordering::SeqCst), 1);
        assert_eq!(h.metrics.snapshot().actions_rejected_busy, 1);
    }

    #[test]
    fn huge_executor_timeout_does_not_overflow() {
        let orch = Orchestrator::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(FakeExecutor::default()),
            Arc::new(InMemoryMetrics::new()),
            Duration::from_secs(u64::MAX),
        );
        assert_eq!(orch.executor_timeout, Duration::MAX);
    }

    fn uuid_like(s: &str) -> bool {
        s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
    }
}
