use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::{
    PendingQuestion, QuestionId, QuestionTally, ThemeStats, UserId, UserSession,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a pending question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestionRecord {
    pub question_id: QuestionId,
    pub theme_tag: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl PendingQuestionRecord {
    #[must_use]
    pub fn from_pending(pending: &PendingQuestion) -> Self {
        Self {
            question_id: pending.question_id(),
            theme_tag: pending.theme_tag().to_owned(),
            prompt: pending.prompt().to_owned(),
            options: pending.options().to_vec(),
            correct_option: pending.correct_option(),
        }
    }

    /// Convert the record back into a validated `PendingQuestion`.
    ///
    /// # Errors
    ///
    /// Returns `quiz_core::Error` if the option set or index fail validation.
    pub fn into_pending(self) -> Result<PendingQuestion, quiz_core::Error> {
        Ok(PendingQuestion::new(
            self.question_id,
            self.theme_tag,
            self.prompt,
            self.options,
            self.correct_option,
        )?)
    }
}

/// Persisted shape for one theme's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeStatsRecord {
    pub total: u32,
    pub correct: u32,
    pub per_question: BTreeMap<QuestionId, TallyRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRecord {
    pub total: u32,
    pub correct: u32,
}

impl ThemeStatsRecord {
    #[must_use]
    pub fn from_stats(stats: &ThemeStats) -> Self {
        Self {
            total: stats.total(),
            correct: stats.correct(),
            per_question: stats
                .per_question()
                .map(|(id, tally)| {
                    (
                        id,
                        TallyRecord {
                            total: tally.total(),
                            correct: tally.correct(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Convert the record back into validated `ThemeStats`.
    ///
    /// # Errors
    ///
    /// Returns `quiz_core::Error` if the counters are inconsistent.
    pub fn into_stats(self) -> Result<ThemeStats, quiz_core::Error> {
        let mut per_question = BTreeMap::new();
        for (id, tally) in self.per_question {
            per_question.insert(id, QuestionTally::from_persisted(tally.total, tally.correct)?);
        }
        Ok(ThemeStats::from_persisted(
            self.total,
            self.correct,
            per_question,
        )?)
    }
}

/// Persisted shape for a whole user session: one JSON document per user.
///
/// This mirrors the domain `UserSession` so repositories can
/// serialize/deserialize without leaking storage concerns into the domain
/// layer. A loaded document must round-trip into the identical in-memory
/// structure, including a populated pending question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<PendingQuestionRecord>,
    #[serde(default)]
    pub theme_stats: BTreeMap<String, ThemeStatsRecord>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &UserSession) -> Self {
        Self {
            user_id: session.user_id(),
            display_name: session.display_name().to_owned(),
            last_update: session.last_update(),
            active_theme: session.active_theme().map(str::to_owned),
            pending_question: session.pending_question().map(PendingQuestionRecord::from_pending),
            theme_stats: session
                .stats()
                .map(|(tag, stats)| (tag.to_owned(), ThemeStatsRecord::from_stats(stats)))
                .collect(),
        }
    }

    /// Convert the record back into a domain `UserSession`, re-validating the
    /// parts on the way in.
    ///
    /// # Errors
    ///
    /// Returns `quiz_core::Error` if the pending question or the counters
    /// fail validation.
    pub fn into_session(self) -> Result<UserSession, quiz_core::Error> {
        let pending_question = self
            .pending_question
            .map(PendingQuestionRecord::into_pending)
            .transpose()?;

        let mut theme_stats = BTreeMap::new();
        for (tag, record) in self.theme_stats {
            theme_stats.insert(tag, record.into_stats()?);
        }

        Ok(UserSession::from_persisted(
            self.user_id,
            self.display_name,
            self.last_update,
            self.active_theme,
            pending_question,
            theme_stats,
        ))
    }
}

/// Repository contract for session records.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fetch a user's record, `None` when the user has never been seen.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` for an unreadable record, or other
    /// storage errors.
    async fn load(&self, user_id: UserId) -> Result<Option<SessionRecord>, StorageError>;

    /// Persist or replace a user's record. The write must either fully
    /// succeed or leave the prior record intact.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// Remove a user's record. Removing an absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on I/O failure.
    async fn delete(&self, user_id: UserId) -> Result<(), StorageError>;

    /// Best-effort scan over all readable records, for cross-user views.
    /// Unreadable records are skipped, not surfaced as failures.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the store itself cannot be scanned.
    async fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<Mutex<BTreeMap<UserId, SessionRecord>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn load(&self, user_id: UserId) -> Result<Option<SessionRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(guard.get(&user_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        guard.insert(record.user_id, record.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        guard.remove(&user_id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn build_session(id: u64) -> UserSession {
        let mut session = UserSession::new(UserId::new(id), format!("user-{id}"), fixed_now());
        session.select_theme("cardio");
        session.record_answer("cardio", QuestionId::new(1), true);
        session.record_answer("cardio", QuestionId::new(2), false);
        session.set_pending_question(
            PendingQuestion::new(
                QuestionId::new(3),
                "cardio",
                "What is heard?",
                vec!["Aortic stenosis".into(), "Normal".into()],
                1,
            )
            .unwrap(),
        );
        session
    }

    #[test]
    fn record_round_trips_with_pending_question() {
        let session = build_session(7);
        let record = SessionRecord::from_session(&session);
        let restored = record.into_session().unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn record_rejects_inconsistent_counters() {
        let record = ThemeStatsRecord {
            total: 1,
            correct: 0,
            per_question: BTreeMap::from([(
                QuestionId::new(1),
                TallyRecord {
                    total: 2,
                    correct: 3,
                },
            )]),
        };
        assert!(record.into_stats().is_err());
    }

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemorySessionStore::new();
        let record = SessionRecord::from_session(&build_session(7));

        assert!(store.load(UserId::new(7)).await.unwrap().is_none());
        store.save(&record).await.unwrap();
        assert_eq!(store.load(UserId::new(7)).await.unwrap(), Some(record));

        store.delete(UserId::new(7)).await.unwrap();
        assert!(store.load(UserId::new(7)).await.unwrap().is_none());
        // deleting again is fine
        store.delete(UserId::new(7)).await.unwrap();
    }

    #[tokio::test]
    async fn load_all_returns_every_record() {
        let store = InMemorySessionStore::new();
        for id in [1, 2, 3] {
            store
                .save(&SessionRecord::from_session(&build_session(id)))
                .await
                .unwrap();
        }
        assert_eq!(store.load_all().await.unwrap().len(), 3);
    }
}
