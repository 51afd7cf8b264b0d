use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use quiz_core::model::{UserId, UserSession};
use quiz_core::time::Clock;
use storage::repository::{SessionRecord, SessionRepository, StorageError};

use crate::error::EngineError;

type Slot = Arc<AsyncMutex<Option<UserSession>>>;

/// Owns per-user sessions: a concurrency-safe registry of session slots plus
/// the durable store behind them.
///
/// Actions for different users run concurrently; actions for the same user
/// are serialized by the slot's async mutex, held for the whole
/// load-mutate-persist critical section. The registry map itself is guarded
/// by a short-lived sync mutex used only for insert-if-absent, and that
/// guard is always released before the slot lock is taken.
pub struct SessionManager {
    repo: Arc<dyn SessionRepository>,
    clock: Clock,
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(repo: Arc<dyn SessionRepository>, clock: Clock) -> Self {
        Self {
            repo,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, user_id: UserId) -> Result<Slot, EngineError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| EngineError::Storage(StorageError::Io(e.to_string())))?;
        Ok(Arc::clone(
            slots
                .entry(user_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(None))),
        ))
    }

    /// Run `f` against the user's session under its exclusive lock.
    ///
    /// The session is loaded (or freshly initialized) on first access, the
    /// mutation runs synchronously in memory, and the session is persisted on
    /// every exit path — including when `f` fails — before the lock is
    /// released. A persistence failure is logged and does not fail the
    /// action: the in-memory state stays authoritative.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error. Load and save failures never surface
    /// here; a corrupt or unreadable record degrades to a fresh session.
    pub async fn with_session<T>(
        &self,
        user_id: UserId,
        display_name: &str,
        f: impl FnOnce(&mut UserSession) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(user_id)?;
        let mut guard = slot.lock().await;

        if guard.is_none() {
            *guard = Some(self.load_or_init(user_id, display_name).await);
        }
        let session =
            guard.get_or_insert_with(|| UserSession::new(user_id, display_name, self.clock.now()));
        session.set_display_name(display_name);

        let result = f(session);

        session.touch(self.clock.now());
        let record = SessionRecord::from_session(session);
        if let Err(e) = self.repo.save(&record).await {
            log::error!("failed to persist session for user {user_id}: {e}");
        }

        result
    }

    async fn load_or_init(&self, user_id: UserId, display_name: &str) -> UserSession {
        match self.repo.load(user_id).await {
            Ok(Some(record)) => match record.into_session() {
                Ok(session) => {
                    log::info!("loaded session for user {user_id}");
                    session
                }
                Err(e) => {
                    log::warn!("session for user {user_id} failed validation, starting fresh: {e}");
                    UserSession::new(user_id, display_name, self.clock.now())
                }
            },
            Ok(None) => {
                log::info!("creating session for user {user_id}");
                UserSession::new(user_id, display_name, self.clock.now())
            }
            Err(e) => {
                log::warn!("failed to load session for user {user_id}, starting fresh: {e}");
                UserSession::new(user_id, display_name, self.clock.now())
            }
        }
    }

    /// Point-in-time snapshot of all readable session records, for
    /// cross-user views. Takes no per-user locks; a concurrent writer may be
    /// captured before or after its update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the store cannot be scanned at all.
    pub async fn snapshot(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.repo.load_all().await
    }
}
