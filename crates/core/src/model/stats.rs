use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsError {
    #[error("correct count ({correct}) exceeds total ({total})")]
    CorrectExceedsTotal { total: u32, correct: u32 },

    #[error("per-question totals ({sum}) do not match theme total ({total})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Correct/total counters for a single question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionTally {
    total: u32,
    correct: u32,
}

impl QuestionTally {
    /// Rehydrate a tally from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::CorrectExceedsTotal` if the counts are inconsistent.
    pub fn from_persisted(total: u32, correct: u32) -> Result<Self, StatsError> {
        if correct > total {
            return Err(StatsError::CorrectExceedsTotal { total, correct });
        }
        Ok(Self { total, correct })
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Fraction of answers that were wrong; unseen questions count as
    /// maximally weak (1.0) so they surface early in adaptive selection.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        1.0 - f64::from(self.correct) / f64::from(self.total)
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }

    fn record(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }
}

/// Per-theme counters: a theme-level aggregate plus per-question tallies.
///
/// `record` is the only mutation path besides `reset`, so the aggregate and
/// the per-question sums always agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeStats {
    total: u32,
    correct: u32,
    per_question: BTreeMap<QuestionId, QuestionTally>,
}

impl ThemeStats {
    /// Rehydrate theme stats from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::CorrectExceedsTotal` if counts are inconsistent at
    /// either level, or `StatsError::CountMismatch` if the per-question totals
    /// do not sum to the theme total.
    pub fn from_persisted(
        total: u32,
        correct: u32,
        per_question: BTreeMap<QuestionId, QuestionTally>,
    ) -> Result<Self, StatsError> {
        if correct > total {
            return Err(StatsError::CorrectExceedsTotal { total, correct });
        }
        let sum: u32 = per_question.values().map(QuestionTally::total).sum();
        if sum != total {
            return Err(StatsError::CountMismatch { total, sum });
        }
        Ok(Self {
            total,
            correct,
            per_question,
        })
    }

    /// Count one judged answer at both theme and question granularity.
    pub fn record(&mut self, question_id: QuestionId, is_correct: bool) {
        self.per_question
            .entry(question_id)
            .or_default()
            .record(is_correct);
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    /// Zero the whole structure.
    pub fn reset(&mut self) {
        self.total = 0;
        self.correct = 0;
        self.per_question.clear();
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }

    #[must_use]
    pub fn tally(&self, question_id: QuestionId) -> Option<&QuestionTally> {
        self.per_question.get(&question_id)
    }

    pub fn per_question(&self) -> impl Iterator<Item = (QuestionId, &QuestionTally)> {
        self.per_question.iter().map(|(id, tally)| (*id, tally))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_levels_in_step() {
        let mut stats = ThemeStats::default();
        stats.record(QuestionId::new(1), true);
        stats.record(QuestionId::new(1), false);
        stats.record(QuestionId::new(2), true);

        assert_eq!(stats.total(), 3);
        assert_eq!(stats.correct(), 2);

        let sum: u32 = stats.per_question().map(|(_, t)| t.total()).sum();
        assert_eq!(sum, stats.total());

        let q1 = stats.tally(QuestionId::new(1)).unwrap();
        assert_eq!((q1.total(), q1.correct()), (2, 1));
        assert!(q1.correct() <= q1.total());
    }

    #[test]
    fn error_rate_treats_unseen_as_weakest() {
        assert!((QuestionTally::default().error_rate() - 1.0).abs() < f64::EPSILON);

        let tally = QuestionTally::from_persisted(10, 9).unwrap();
        assert!((tally.error_rate() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut stats = ThemeStats::default();
        stats.record(QuestionId::new(1), true);
        stats.reset();

        assert!(stats.is_empty());
        assert_eq!(stats.per_question().count(), 0);
    }

    #[test]
    fn from_persisted_rejects_mismatched_sums() {
        let mut per_question = BTreeMap::new();
        per_question.insert(QuestionId::new(1), QuestionTally::from_persisted(2, 1).unwrap());

        let err = ThemeStats::from_persisted(3, 1, per_question).unwrap_err();
        assert_eq!(err, StatsError::CountMismatch { total: 3, sum: 2 });
    }

    #[test]
    fn from_persisted_rejects_excess_correct() {
        let err = ThemeStats::from_persisted(1, 2, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, StatsError::CorrectExceedsTotal { .. }));
    }
}
