use std::sync::Arc;

use quiz_core::model::{QuestionId, ThemeBank, UserId};

use crate::error::{EngineError, JudgeError};
use crate::judge::AnswerJudge;
use crate::selector::{AdaptiveSelector, DrawnQuestion};
use crate::session_manager::SessionManager;
use crate::stats;
use crate::view::{
    AnswerResultView, LeaderboardView, QuestionView, StatsView, ThemeEntry, ThemeListView,
};

/// Reply to a question request: either a question, or the theme menu when no
/// usable theme is selected. Having no theme is a normal state, not an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionReply {
    Question(QuestionView),
    ChooseTheme(ThemeListView),
}

/// Composition root: owns the theme catalog, the session manager, and the
/// selection/judging components, and exposes the action API consumed by the
/// transport layer.
///
/// Every action runs the full load-mutate-persist cycle under the user's
/// session lock, so a session record exists as soon as a user is seen and
/// survives a process restart.
pub struct QuizEngine {
    bank: Arc<ThemeBank>,
    sessions: SessionManager,
    selector: AdaptiveSelector,
    judge: AnswerJudge,
}

impl QuizEngine {
    #[must_use]
    pub fn new(bank: Arc<ThemeBank>, sessions: SessionManager) -> Self {
        Self {
            bank,
            sessions,
            selector: AdaptiveSelector::new(),
            judge: AnswerJudge,
        }
    }

    /// The theme menu, in catalog order.
    #[must_use]
    pub fn theme_list(&self) -> ThemeListView {
        theme_list(&self.bank)
    }

    /// Greet a (possibly returning) user: drop any in-flight question and the
    /// theme selection, and offer the theme menu. Statistics survive; only an
    /// explicit `reset` clears them.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` on registry faults; never on user input.
    pub async fn start(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<ThemeListView, EngineError> {
        self.sessions
            .with_session(user_id, display_name, |session| {
                session.clear_pending_question();
                session.clear_theme();
                Ok(())
            })
            .await?;
        Ok(self.theme_list())
    }

    /// Activate a theme and immediately draw the first question from it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownTheme` for a tag not in the catalog (the
    /// session is left untouched), or a `SelectionError` when the theme
    /// cannot produce a question.
    pub async fn select_theme(
        &self,
        user_id: UserId,
        display_name: &str,
        tag: &str,
    ) -> Result<QuestionView, EngineError> {
        let bank = Arc::clone(&self.bank);
        let selector = self.selector;
        self.sessions
            .with_session(user_id, display_name, move |session| {
                let Some(theme) = bank.get(tag) else {
                    return Err(EngineError::UnknownTheme {
                        tag: tag.to_owned(),
                    });
                };
                session.select_theme(tag);
                let drawn = selector.draw(&mut rand::rng(), theme, session.theme_stats(tag))?;
                let view = question_view(tag, &drawn);
                session.set_pending_question(drawn.pending);
                Ok(view)
            })
            .await
    }

    /// Draw the next question from the active theme, or re-offer the theme
    /// menu when none is selected (or the selected theme left the catalog).
    ///
    /// # Errors
    ///
    /// Returns a `SelectionError` when the active theme cannot produce a
    /// question.
    pub async fn next_question(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<QuestionReply, EngineError> {
        let bank = Arc::clone(&self.bank);
        let selector = self.selector;
        self.sessions
            .with_session(user_id, display_name, move |session| {
                let Some(tag) = session.active_theme().map(str::to_owned) else {
                    return Ok(QuestionReply::ChooseTheme(theme_list(&bank)));
                };
                let Some(theme) = bank.get(&tag) else {
                    log::warn!("session references unknown theme '{tag}', clearing the selection");
                    session.clear_theme();
                    return Ok(QuestionReply::ChooseTheme(theme_list(&bank)));
                };
                let drawn = selector.draw(&mut rand::rng(), theme, session.theme_stats(&tag))?;
                let view = question_view(&tag, &drawn);
                session.set_pending_question(drawn.pending);
                Ok(QuestionReply::Question(view))
            })
            .await
    }

    /// Whether the user currently has an in-flight question awaiting an
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` on registry faults; never on user input.
    pub async fn has_pending_question(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<bool, EngineError> {
        self.sessions
            .with_session(user_id, display_name, |session| {
                Ok(session.pending_question().is_some())
            })
            .await
    }

    /// Judge a submitted option against the in-flight question, count the
    /// outcome, and clear the pending question — all in one locked
    /// transaction, so a retry after a crash can never double-count.
    ///
    /// # Errors
    ///
    /// Returns `JudgeError::StaleOrMissingAnswer` when there is no matching
    /// pending question; statistics are untouched in that case.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        display_name: &str,
        question_id: QuestionId,
        option_index: usize,
    ) -> Result<AnswerResultView, EngineError> {
        let bank = Arc::clone(&self.bank);
        let judge = self.judge;
        self.sessions
            .with_session(user_id, display_name, move |session| {
                let Some(pending) = session.pending_question().cloned() else {
                    return Err(JudgeError::StaleOrMissingAnswer.into());
                };
                let theme = bank.get(pending.theme_tag());
                let verdict = judge.judge(&pending, theme, question_id, option_index)?;

                session.record_answer(pending.theme_tag(), question_id, verdict.is_correct);
                session.clear_pending_question();

                Ok(verdict.into())
            })
            .await
    }

    /// Personal statistics, with the user's leaderboard place for the active
    /// theme when there is one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` when the cross-user snapshot cannot be
    /// read at all.
    pub async fn stats(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<StatsView, EngineError> {
        let bank = Arc::clone(&self.bank);
        let (themes, active_theme) = self
            .sessions
            .with_session(user_id, display_name, move |session| {
                Ok((
                    stats::build_report(session, &bank),
                    session.active_theme().map(str::to_owned),
                ))
            })
            .await?;

        let position = match active_theme.as_deref() {
            Some(tag) => {
                let records = self.sessions.snapshot().await?;
                let entries = stats::build_leaderboard(&records, Some(tag));
                stats::leaderboard_position(&entries, user_id)
            }
            None => None,
        };

        Ok(StatsView {
            themes,
            active_theme,
            position,
        })
    }

    /// Cross-user ranking for one theme or across all themes.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownTheme` for an unknown scope tag and
    /// `EngineError::Storage` when the snapshot cannot be read.
    pub async fn leaderboard(
        &self,
        user_id: UserId,
        display_name: &str,
        scope: Option<&str>,
    ) -> Result<LeaderboardView, EngineError> {
        let scope_name = match scope {
            Some(tag) => Some(
                self.bank
                    .get(tag)
                    .ok_or_else(|| EngineError::UnknownTheme {
                        tag: tag.to_owned(),
                    })?
                    .display_name()
                    .to_owned(),
            ),
            None => None,
        };

        // Sessions are created lazily on first action; this one counts.
        self.sessions
            .with_session(user_id, display_name, |_| Ok(()))
            .await?;

        let records = self.sessions.snapshot().await?;
        let entries = stats::build_leaderboard(&records, scope);
        let requester_rank = stats::leaderboard_position(&entries, user_id).map(|p| p.rank);

        Ok(LeaderboardView {
            scope_name,
            entries,
            requester_rank,
        })
    }

    /// Explicit user-initiated reset: drops the pending question and all
    /// statistics. The theme selection and the durable record stay.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` on registry faults; never on user input.
    pub async fn reset(&self, user_id: UserId, display_name: &str) -> Result<(), EngineError> {
        self.sessions
            .with_session(user_id, display_name, |session| {
                session.reset_progress();
                Ok(())
            })
            .await
    }
}

fn theme_list(bank: &ThemeBank) -> ThemeListView {
    ThemeListView {
        themes: bank
            .iter()
            .map(|theme| ThemeEntry {
                tag: theme.tag().to_owned(),
                name: theme.display_name().to_owned(),
                question_count: theme.question_count(),
            })
            .collect(),
    }
}

fn question_view(theme_tag: &str, drawn: &DrawnQuestion) -> QuestionView {
    QuestionView {
        question_id: drawn.pending.question_id(),
        theme_tag: theme_tag.to_owned(),
        prompt: drawn.pending.prompt().to_owned(),
        options: drawn.pending.options().to_vec(),
        media_refs: drawn.media_refs.clone(),
    }
}
