use std::collections::HashSet;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;

use quiz_core::model::{PendingQuestion, Question, QuestionTally, Theme, ThemeStats};

use crate::error::SelectionError;

/// Number of answer options offered when the theme is large enough.
pub const DEFAULT_OPTION_COUNT: usize = 4;

/// Floor weight: every question keeps a nonzero draw probability.
const BASE_WEIGHT: f64 = 0.2;
/// How strongly the historical error rate tilts the draw.
const ERROR_SPREAD: f64 = 0.8;

/// A freshly drawn question: the pending snapshot to store on the session
/// plus the media the transport should send alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnQuestion {
    pub pending: PendingQuestion,
    pub media_refs: Vec<String>,
}

/// Picks the next question with error-weighted sampling and synthesizes the
/// multiple-choice option set.
///
/// Questions the user gets wrong often are drawn more often; unseen
/// questions count as maximally weak so they surface early. Every question
/// keeps a nonzero probability.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveSelector {
    option_count: usize,
}

impl Default for AdaptiveSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveSelector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            option_count: DEFAULT_OPTION_COUNT,
        }
    }

    /// Override the desired option count; a quiz needs at least two options.
    #[must_use]
    pub fn with_option_count(option_count: usize) -> Self {
        Self {
            option_count: option_count.max(2),
        }
    }

    /// Draw one question from `theme`, weighted by the user's history.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyTheme` for a theme with no questions and
    /// `SelectionError::NotEnoughOptions` when not even two distinct option
    /// texts can be assembled.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        theme: &Theme,
        stats: Option<&ThemeStats>,
    ) -> Result<DrawnQuestion, SelectionError> {
        if theme.is_empty() {
            return Err(SelectionError::EmptyTheme {
                tag: theme.tag().to_owned(),
            });
        }

        let weights: Vec<f64> = theme
            .questions()
            .iter()
            .map(|q| question_weight(stats.and_then(|s| s.tally(q.id()))))
            .collect();
        // Every weight is at least BASE_WEIGHT, so the distribution is valid.
        let distribution = WeightedIndex::new(&weights).expect("weights are positive");
        let question = &theme.questions()[distribution.sample(rng)];

        let mut options = self.distractors(rng, theme, question);
        options.push(question.correct_answer().to_owned());
        options.shuffle(rng);
        let correct_option = options
            .iter()
            .position(|o| o.as_str() == question.correct_answer())
            .expect("correct answer is among the options");

        let pending = PendingQuestion::new(
            question.id(),
            theme.tag(),
            question.prompt(),
            options,
            correct_option,
        )
        .map_err(|_| SelectionError::NotEnoughOptions {
            tag: theme.tag().to_owned(),
        })?;

        Ok(DrawnQuestion {
            pending,
            media_refs: question.media_refs().to_vec(),
        })
    }

    /// Assemble up to `option_count - 1` wrong answers: the question's own
    /// distractor pool first, then other questions' correct answers as a
    /// supplement. Never the question's own answer, never duplicate text;
    /// a short theme yields fewer options rather than failing.
    fn distractors<'a, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        theme: &'a Theme,
        question: &'a Question,
    ) -> Vec<String> {
        let wanted = self.option_count.saturating_sub(1);
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(question.correct_answer());

        let mut pool: Vec<&str> = question
            .distractor_pool()
            .iter()
            .map(String::as_str)
            .filter(|text| seen.insert(*text))
            .collect();
        pool.shuffle(rng);

        let mut picked: Vec<String> = pool
            .into_iter()
            .take(wanted)
            .map(str::to_owned)
            .collect();

        if picked.len() < wanted {
            let mut supplement: Vec<&str> = theme
                .questions()
                .iter()
                .filter(|other| other.id() != question.id())
                .map(Question::correct_answer)
                .filter(|text| seen.insert(*text))
                .collect();
            supplement.shuffle(rng);
            picked.extend(
                supplement
                    .into_iter()
                    .take(wanted - picked.len())
                    .map(str::to_owned),
            );
        }

        picked
    }
}

fn question_weight(tally: Option<&QuestionTally>) -> f64 {
    let error_rate = tally.map_or(1.0, QuestionTally::error_rate);
    BASE_WEIGHT + ERROR_SPREAD * error_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, ThemeStats};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;
    use std::collections::HashMap;

    fn question(id: u32, answer: &str, pool: &[&str]) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Prompt {id}"),
            answer,
            pool.iter().map(|s| (*s).to_owned()).collect(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap()
    }

    fn theme_of(questions: Vec<Question>) -> Theme {
        Theme::new("cardio", "Cardio", questions).unwrap()
    }

    fn stats_for(entries: &[(u32, u32, u32)]) -> ThemeStats {
        // (question id, total, correct)
        let mut per_question = BTreeMap::new();
        let mut total = 0;
        let mut correct = 0;
        for (id, t, c) in entries {
            per_question.insert(
                QuestionId::new(*id),
                QuestionTally::from_persisted(*t, *c).unwrap(),
            );
            total += t;
            correct += c;
        }
        ThemeStats::from_persisted(total, correct, per_question).unwrap()
    }

    #[test]
    fn weight_prefers_weak_and_unseen_questions() {
        let unseen = question_weight(None);
        let weak = question_weight(Some(&QuestionTally::from_persisted(10, 1).unwrap()));
        let strong = question_weight(Some(&QuestionTally::from_persisted(10, 9).unwrap()));

        assert!(unseen > weak);
        assert!(weak > strong);
        // Even a perfect record keeps a nonzero draw probability.
        let perfect = question_weight(Some(&QuestionTally::from_persisted(10, 10).unwrap()));
        assert!(perfect > 0.0);
    }

    #[test]
    fn draw_favors_high_error_rates() {
        let theme = theme_of(vec![
            question(1, "A", &[]),
            question(2, "B", &[]),
            question(3, "C", &[]),
        ]);
        // q1 unseen (error rate 1.0), q2 weak (0.9), q3 strong (0.1)
        let stats = stats_for(&[(2, 10, 1), (3, 10, 9)]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts: HashMap<QuestionId, u32> = HashMap::new();
        for _ in 0..6000 {
            let drawn = selector.draw(&mut rng, &theme, Some(&stats)).unwrap();
            *counts.entry(drawn.pending.question_id()).or_default() += 1;
        }

        let unseen = counts[&QuestionId::new(1)];
        let weak = counts[&QuestionId::new(2)];
        let strong = counts[&QuestionId::new(3)];

        assert!(weak > strong, "weak {weak} should beat strong {strong}");
        assert!(unseen >= weak, "unseen {unseen} should match weak {weak}");
    }

    #[test]
    fn shuffle_does_not_bias_the_correct_position() {
        let theme = theme_of(vec![
            question(1, "A", &[]),
            question(2, "B", &[]),
            question(3, "C", &[]),
            question(4, "D", &[]),
            question(5, "E", &[]),
            question(6, "F", &[]),
        ]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut positions = [0_u32; DEFAULT_OPTION_COUNT];
        let draws = 8000;
        for _ in 0..draws {
            let drawn = selector.draw(&mut rng, &theme, None).unwrap();
            assert_eq!(drawn.pending.options().len(), DEFAULT_OPTION_COUNT);
            positions[drawn.pending.correct_option()] += 1;
        }

        let expected = draws / DEFAULT_OPTION_COUNT as u32;
        for (index, count) in positions.iter().enumerate() {
            let deviation = count.abs_diff(expected);
            assert!(
                deviation < expected * 15 / 100,
                "position {index} drawn {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn pool_distractors_are_used_first() {
        let theme = theme_of(vec![question(1, "A", &["w1", "w2", "w3"])]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(3);
        let drawn = selector.draw(&mut rng, &theme, None).unwrap();

        let mut options = drawn.pending.options().to_vec();
        options.sort();
        assert_eq!(options, vec!["A", "w1", "w2", "w3"]);
        assert_eq!(drawn.pending.correct_text(), "A");
    }

    #[test]
    fn short_pool_is_supplemented_from_other_questions() {
        let theme = theme_of(vec![
            question(1, "A", &["w1"]),
            question(2, "B", &[]),
            question(3, "C", &[]),
        ]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(5);
        // Draw until question 1 comes up.
        let drawn = loop {
            let drawn = selector.draw(&mut rng, &theme, None).unwrap();
            if drawn.pending.question_id() == QuestionId::new(1) {
                break drawn;
            }
        };

        let mut options = drawn.pending.options().to_vec();
        options.sort();
        assert_eq!(options, vec!["A", "B", "C", "w1"]);
    }

    #[test]
    fn small_theme_shrinks_the_option_count() {
        let theme = theme_of(vec![question(1, "A", &[]), question(2, "B", &[])]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(9);
        let drawn = selector.draw(&mut rng, &theme, None).unwrap();
        assert_eq!(drawn.pending.options().len(), 2);
    }

    #[test]
    fn options_never_repeat_shared_answer_text() {
        let theme = theme_of(vec![
            question(1, "Same", &[]),
            question(2, "Same", &[]),
            question(3, "Other", &[]),
            question(4, "Another", &[]),
        ]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..200 {
            let drawn = selector.draw(&mut rng, &theme, None).unwrap();
            let options = drawn.pending.options();
            let unique: HashSet<&str> = options.iter().map(String::as_str).collect();
            assert_eq!(unique.len(), options.len(), "duplicate option text");
        }
    }

    #[test]
    fn lone_question_without_pool_is_rejected() {
        let theme = theme_of(vec![question(1, "A", &[])]);

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(1);
        let err = selector.draw(&mut rng, &theme, None).unwrap_err();
        assert!(matches!(err, SelectionError::NotEnoughOptions { .. }));
    }

    #[test]
    fn empty_theme_is_rejected() {
        let theme = theme_of(Vec::new());

        let selector = AdaptiveSelector::new();
        let mut rng = StdRng::seed_from_u64(1);
        let err = selector.draw(&mut rng, &theme, None).unwrap_err();
        assert_eq!(
            err,
            SelectionError::EmptyTheme {
                tag: "cardio".into()
            }
        );
    }
}
