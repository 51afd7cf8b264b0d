//! Transport-facing view structs returned by the engine.
//!
//! Views are plain data: the transport decides how to render them. Nothing
//! in here reaches back into the engine.

use quiz_core::model::{QuestionId, UserId};

/// One selectable theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeEntry {
    pub tag: String,
    pub name: String,
    pub question_count: usize,
}

/// The theme menu, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeListView {
    pub themes: Vec<ThemeEntry>,
}

/// A question ready to be asked. `options` are already shuffled;
/// the correct index stays inside the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub theme_tag: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub media_refs: Vec<String>,
}

/// Verdict payload for an answered question.
///
/// `secondary_explanation`/`secondary_media_refs` are populated only for a
/// wrong pick whose text is another question's correct answer in the same
/// theme — "here is what you actually picked".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResultView {
    pub is_correct: bool,
    pub selected_text: String,
    pub correct_text: String,
    pub explanation: Vec<String>,
    pub secondary_explanation: Option<Vec<String>>,
    pub secondary_media_refs: Vec<String>,
}

/// Per-question line of a theme report, labeled by the question's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionScore {
    pub label: String,
    pub total: u32,
    pub correct: u32,
    pub percentage: f64,
}

/// One theme's block of a personal statistics report.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeReport {
    pub tag: String,
    pub name: String,
    pub total: u32,
    pub correct: u32,
    pub percentage: f64,
    pub questions: Vec<QuestionScore>,
}

/// The requesting user's place in a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardPosition {
    /// 1-based rank.
    pub rank: usize,
    pub of: usize,
}

/// Personal statistics across themes with recorded activity.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsView {
    pub themes: Vec<ThemeReport>,
    pub active_theme: Option<String>,
    pub position: Option<LeaderboardPosition>,
}

/// One user's row in the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub correct: u32,
    pub total: u32,
}

impl RankedEntry {
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }
}

/// Cross-user ranking for one theme or for all themes combined.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardView {
    /// Display name of the scoped theme; `None` for the all-themes ranking.
    pub scope_name: Option<String>,
    pub entries: Vec<RankedEntry>,
    /// 1-based rank of the requesting user, if ranked.
    pub requester_rank: Option<usize>,
}

/// Human-readable refusal of a user-triggered action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionView {
    pub reason: String,
}
