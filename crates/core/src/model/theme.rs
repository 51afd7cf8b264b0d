use thiserror::Error;

use crate::model::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ThemeError {
    #[error("theme tag is empty")]
    EmptyTag,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} has an empty correct answer")]
    EmptyCorrectAnswer { id: QuestionId },

    #[error("duplicate question id {id} in theme '{tag}'")]
    DuplicateQuestionId { tag: String, id: QuestionId },

    #[error("duplicate theme tag '{tag}'")]
    DuplicateTag { tag: String },
}

/// A single quiz question inside a theme.
///
/// `distractor_pool` optionally supplies hand-written wrong answers; when it
/// is empty, distractors are drawn from other questions of the same theme.
/// `media_refs` are opaque file names resolved by the media collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    correct_answer: String,
    distractor_pool: Vec<String>,
    media_refs: Vec<String>,
    explanation: Vec<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::EmptyPrompt` or `ThemeError::EmptyCorrectAnswer`
    /// when the respective field is blank.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        distractor_pool: Vec<String>,
        media_refs: Vec<String>,
        explanation: Vec<String>,
    ) -> Result<Self, ThemeError> {
        let prompt = prompt.into();
        let correct_answer = correct_answer.into();

        if prompt.trim().is_empty() {
            return Err(ThemeError::EmptyPrompt { id });
        }
        if correct_answer.trim().is_empty() {
            return Err(ThemeError::EmptyCorrectAnswer { id });
        }

        Ok(Self {
            id,
            prompt,
            correct_answer,
            distractor_pool,
            media_refs,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn distractor_pool(&self) -> &[String] {
        &self.distractor_pool
    }

    #[must_use]
    pub fn media_refs(&self) -> &[String] {
        &self.media_refs
    }

    #[must_use]
    pub fn explanation(&self) -> &[String] {
        &self.explanation
    }
}

/// A named, immutable collection of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    tag: String,
    display_name: String,
    questions: Vec<Question>,
}

impl Theme {
    /// Build a validated theme.
    ///
    /// Question order is preserved as given.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::EmptyTag` for a blank tag and
    /// `ThemeError::DuplicateQuestionId` when two questions share an id.
    pub fn new(
        tag: impl Into<String>,
        display_name: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, ThemeError> {
        let tag = tag.into();
        let display_name = display_name.into();

        if tag.trim().is_empty() {
            return Err(ThemeError::EmptyTag);
        }

        let mut seen = std::collections::HashSet::new();
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(ThemeError::DuplicateQuestionId {
                    tag,
                    id: question.id(),
                });
            }
        }

        let display_name = if display_name.trim().is_empty() {
            tag.clone()
        } else {
            display_name
        };

        Ok(Self {
            tag,
            display_name,
            questions,
        })
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Immutable catalog of all loaded themes, in load order.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ThemeBank {
    themes: Vec<Theme>,
}

impl ThemeBank {
    /// Build a bank from loaded themes.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::DuplicateTag` when two themes share a tag.
    pub fn new(themes: Vec<Theme>) -> Result<Self, ThemeError> {
        let mut seen = std::collections::HashSet::new();
        for theme in &themes {
            if !seen.insert(theme.tag().to_owned()) {
                return Err(ThemeError::DuplicateTag {
                    tag: theme.tag().to_owned(),
                });
            }
        }
        Ok(Self { themes })
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.tag() == tag)
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}
