use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{QuestionId, ThemeStats, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a pending question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectOptionOutOfRange { index: usize, len: usize },
}

/// The single in-flight question awaiting an answer.
///
/// Snapshotted into the session record so an in-flight question survives a
/// process restart. `correct_option` is a 0-based index into `options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    question_id: QuestionId,
    theme_tag: String,
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
}

impl PendingQuestion {
    /// Build a validated pending question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TooFewOptions` for fewer than two options and
    /// `SessionError::CorrectOptionOutOfRange` when the index does not point
    /// into `options`.
    pub fn new(
        question_id: QuestionId,
        theme_tag: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, SessionError> {
        if options.len() < 2 {
            return Err(SessionError::TooFewOptions { len: options.len() });
        }
        if correct_option >= options.len() {
            return Err(SessionError::CorrectOptionOutOfRange {
                index: correct_option,
                len: options.len(),
            });
        }
        Ok(Self {
            question_id,
            theme_tag: theme_tag.into(),
            prompt: prompt.into(),
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn theme_tag(&self) -> &str {
        &self.theme_tag
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    /// Option text at `index`, if in range.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_option]
    }
}

/// The per-user persisted aggregate: identity, theme selection, the pending
/// question, and accumulated statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    user_id: UserId,
    display_name: String,
    last_update: DateTime<Utc>,
    active_theme: Option<String>,
    pending_question: Option<PendingQuestion>,
    theme_stats: BTreeMap<String, ThemeStats>,
}

impl UserSession {
    /// Fresh session for a user seen for the first time.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            last_update: now,
            active_theme: None,
            pending_question: None,
            theme_stats: BTreeMap::new(),
        }
    }

    /// Rehydrate a session from persisted storage. The parts have already
    /// been validated on their own constructors.
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        display_name: impl Into<String>,
        last_update: DateTime<Utc>,
        active_theme: Option<String>,
        pending_question: Option<PendingQuestion>,
        theme_stats: BTreeMap<String, ThemeStats>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            last_update,
            active_theme,
            pending_question,
            theme_stats,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Transports may report a changed name at any time; keep the latest.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    #[must_use]
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Stamp the last-activity timestamp; called on every committed action.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_update = now;
    }

    #[must_use]
    pub fn active_theme(&self) -> Option<&str> {
        self.active_theme.as_deref()
    }

    pub fn select_theme(&mut self, tag: impl Into<String>) {
        self.active_theme = Some(tag.into());
    }

    pub fn clear_theme(&mut self) {
        self.active_theme = None;
    }

    #[must_use]
    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        self.pending_question.as_ref()
    }

    /// Replace the in-flight question; at most one exists at a time.
    pub fn set_pending_question(&mut self, pending: PendingQuestion) {
        self.pending_question = Some(pending);
    }

    pub fn clear_pending_question(&mut self) {
        self.pending_question = None;
    }

    /// Count a judged answer against the given theme.
    pub fn record_answer(&mut self, theme_tag: &str, question_id: QuestionId, is_correct: bool) {
        self.theme_stats
            .entry(theme_tag.to_owned())
            .or_default()
            .record(question_id, is_correct);
    }

    #[must_use]
    pub fn theme_stats(&self, theme_tag: &str) -> Option<&ThemeStats> {
        self.theme_stats.get(theme_tag)
    }

    pub fn stats(&self) -> impl Iterator<Item = (&str, &ThemeStats)> {
        self.theme_stats
            .iter()
            .map(|(tag, stats)| (tag.as_str(), stats))
    }

    /// Explicit user-initiated reset: drops the pending question and all
    /// statistics, keeps the theme selection.
    pub fn reset_progress(&mut self) {
        self.pending_question = None;
        self.theme_stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn pending() -> PendingQuestion {
        PendingQuestion::new(
            QuestionId::new(1),
            "cardio",
            "What is heard?",
            vec!["Aortic stenosis".into(), "Normal".into()],
            0,
        )
        .unwrap()
    }

    #[test]
    fn pending_question_rejects_single_option() {
        let err = PendingQuestion::new(
            QuestionId::new(1),
            "cardio",
            "What is heard?",
            vec!["Only".into()],
            0,
        )
        .unwrap_err();
        assert_eq!(err, SessionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn pending_question_rejects_out_of_range_index() {
        let err = PendingQuestion::new(
            QuestionId::new(1),
            "cardio",
            "What is heard?",
            vec!["A".into(), "B".into()],
            2,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::CorrectOptionOutOfRange { .. }));
    }

    #[test]
    fn record_answer_accumulates_per_theme() {
        let mut session = UserSession::new(UserId::new(7), "alice", fixed_now());
        session.select_theme("cardio");
        session.record_answer("cardio", QuestionId::new(1), true);
        session.record_answer("cardio", QuestionId::new(1), false);

        let stats = session.theme_stats("cardio").unwrap();
        assert_eq!((stats.total(), stats.correct()), (2, 1));
        assert!(session.theme_stats("neuro").is_none());
    }

    #[test]
    fn reset_keeps_theme_but_drops_progress() {
        let mut session = UserSession::new(UserId::new(7), "alice", fixed_now());
        session.select_theme("cardio");
        session.set_pending_question(pending());
        session.record_answer("cardio", QuestionId::new(1), true);

        session.reset_progress();

        assert_eq!(session.active_theme(), Some("cardio"));
        assert!(session.pending_question().is_none());
        assert_eq!(session.stats().count(), 0);
    }

    #[test]
    fn new_question_replaces_previous_pending() {
        let mut session = UserSession::new(UserId::new(7), "alice", fixed_now());
        session.set_pending_question(pending());

        let replacement = PendingQuestion::new(
            QuestionId::new(2),
            "cardio",
            "And now?",
            vec!["Mitral regurgitation".into(), "Normal".into()],
            1,
        )
        .unwrap();
        session.set_pending_question(replacement.clone());

        assert_eq!(session.pending_question(), Some(&replacement));
    }
}
