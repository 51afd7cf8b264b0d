use quiz_core::model::{PendingQuestion, QuestionId, Theme};

use crate::error::JudgeError;
use crate::view::AnswerResultView;

/// Verdict for a submitted answer, with the explanation payload the
/// transport renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub is_correct: bool,
    pub selected_text: String,
    pub correct_text: String,
    /// Explanation of the judged question.
    pub explanation: Vec<String>,
    /// Explanation of the question whose correct answer the user picked by
    /// mistake, when one exists in the active theme.
    pub secondary_explanation: Option<Vec<String>>,
    pub secondary_media_refs: Vec<String>,
}

impl From<AnswerVerdict> for AnswerResultView {
    fn from(verdict: AnswerVerdict) -> Self {
        Self {
            is_correct: verdict.is_correct,
            selected_text: verdict.selected_text,
            correct_text: verdict.correct_text,
            explanation: verdict.explanation,
            secondary_explanation: verdict.secondary_explanation,
            secondary_media_refs: verdict.secondary_media_refs,
        }
    }
}

/// Validates a submitted option index against the in-flight question.
///
/// Judging has no side effects: the caller records statistics and clears the
/// pending question under the same session lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerJudge;

impl AnswerJudge {
    /// Judge `selected_option` against `pending`.
    ///
    /// `theme` is the active theme, used to fetch explanations; it may be
    /// absent when the catalog changed since the question was drawn, in
    /// which case explanations degrade to empty.
    ///
    /// # Errors
    ///
    /// Returns `JudgeError::StaleOrMissingAnswer` when the submitted
    /// question id does not match the pending question, or when the option
    /// index does not point into its option set.
    pub fn judge(
        &self,
        pending: &PendingQuestion,
        theme: Option<&Theme>,
        question_id: QuestionId,
        selected_option: usize,
    ) -> Result<AnswerVerdict, JudgeError> {
        if pending.question_id() != question_id {
            return Err(JudgeError::StaleOrMissingAnswer);
        }
        let selected_text = pending
            .option(selected_option)
            .ok_or(JudgeError::StaleOrMissingAnswer)?
            .to_owned();

        let is_correct = selected_option == pending.correct_option();
        let correct_text = pending.correct_text().to_owned();

        let explanation = theme
            .and_then(|t| t.question(question_id))
            .map(|q| q.explanation().to_vec())
            .unwrap_or_default();

        // For a wrong pick, look up the question whose correct answer the
        // user chose. Scoped to the active theme only, and never the judged
        // question itself (two questions may share wording).
        let (secondary_explanation, secondary_media_refs) = if is_correct {
            (None, Vec::new())
        } else {
            match theme.and_then(|t| {
                t.questions()
                    .iter()
                    .find(|q| q.id() != question_id && q.correct_answer() == selected_text)
            }) {
                Some(other) => (
                    Some(other.explanation().to_vec()),
                    other.media_refs().to_vec(),
                ),
                None => (None, Vec::new()),
            }
        };

        Ok(AnswerVerdict {
            is_correct,
            selected_text,
            correct_text,
            explanation,
            secondary_explanation,
            secondary_media_refs,
        })
    }
}
