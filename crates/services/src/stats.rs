//! Statistics views: personal reports and the cross-user leaderboard.
//!
//! The leaderboard works directly on persisted records so a best-effort
//! snapshot never needs the per-user locks.

use std::cmp::Ordering;

use quiz_core::model::{ThemeBank, UserId, UserSession};
use storage::repository::SessionRecord;

use crate::view::{LeaderboardPosition, QuestionScore, RankedEntry, ThemeReport};

/// Per-theme report for one user, themes and questions ranked by percentage
/// descending. Sorting is stable, so ties keep catalog order.
#[must_use]
pub fn build_report(session: &UserSession, bank: &ThemeBank) -> Vec<ThemeReport> {
    let mut reports: Vec<ThemeReport> = Vec::new();
    for theme in bank.iter() {
        let Some(stats) = session.theme_stats(theme.tag()) else {
            continue;
        };
        if stats.is_empty() {
            continue;
        }

        let mut questions: Vec<QuestionScore> = theme
            .questions()
            .iter()
            .filter_map(|question| {
                stats
                    .tally(question.id())
                    .filter(|tally| tally.total() > 0)
                    .map(|tally| QuestionScore {
                        label: question.correct_answer().to_owned(),
                        total: tally.total(),
                        correct: tally.correct(),
                        percentage: tally.percentage(),
                    })
            })
            .collect();
        questions.sort_by(|a, b| compare_percentage(b.percentage, a.percentage));

        reports.push(ThemeReport {
            tag: theme.tag().to_owned(),
            name: theme.display_name().to_owned(),
            total: stats.total(),
            correct: stats.correct(),
            percentage: stats.percentage(),
            questions,
        });
    }
    reports.sort_by(|a, b| compare_percentage(b.percentage, a.percentage));
    reports
}

fn compare_percentage(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Rank users by `(correct desc, total desc)` within one theme or across
/// all themes. Ties are not broken further; the stable sort keeps the
/// record order of the snapshot. Users without activity in scope are
/// omitted.
#[must_use]
pub fn build_leaderboard(records: &[SessionRecord], scope: Option<&str>) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = records
        .iter()
        .filter_map(|record| {
            let (total, correct) = match scope {
                Some(tag) => record
                    .theme_stats
                    .get(tag)
                    .map_or((0, 0), |stats| (stats.total, stats.correct)),
                None => record
                    .theme_stats
                    .values()
                    .fold((0, 0), |(t, c), stats| (t + stats.total, c + stats.correct)),
            };
            (total > 0).then(|| RankedEntry {
                user_id: record.user_id,
                display_name: record.display_name.clone(),
                correct,
                total,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.correct.cmp(&a.correct).then(b.total.cmp(&a.total)));
    entries
}

/// Find a user's place in a ranking by identity, never by display name.
#[must_use]
pub fn leaderboard_position(entries: &[RankedEntry], user_id: UserId) -> Option<LeaderboardPosition> {
    entries
        .iter()
        .position(|entry| entry.user_id == user_id)
        .map(|index| LeaderboardPosition {
            rank: index + 1,
            of: entries.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId, Theme};
    use quiz_core::time::fixed_now;

    fn bank() -> ThemeBank {
        let cardio = Theme::new(
            "cardio",
            "Cardio",
            vec![
                build_question(1, "Aortic stenosis"),
                build_question(2, "Mitral regurgitation"),
                build_question(3, "Normal"),
            ],
        )
        .unwrap();
        let neuro = Theme::new("neuro", "Neuro", vec![build_question(1, "Tremor")]).unwrap();
        ThemeBank::new(vec![cardio, neuro]).unwrap()
    }

    fn build_question(id: u32, answer: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Prompt {id}"),
            answer,
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap()
    }

    fn session_with(user: u64, name: &str, answers: &[(&str, u32, bool)]) -> UserSession {
        let mut session = UserSession::new(UserId::new(user), name, fixed_now());
        for (theme, question, is_correct) in answers {
            session.record_answer(theme, QuestionId::new(*question), *is_correct);
        }
        session
    }

    fn record_of(session: &UserSession) -> SessionRecord {
        SessionRecord::from_session(session)
    }

    #[test]
    fn report_ranks_questions_by_percentage() {
        let session = session_with(
            7,
            "alice",
            &[
                ("cardio", 1, false),
                ("cardio", 1, false),
                ("cardio", 2, true),
                ("cardio", 3, true),
                ("cardio", 3, false),
            ],
        );

        let reports = build_report(&session, &bank());
        assert_eq!(reports.len(), 1);

        let cardio = &reports[0];
        assert_eq!((cardio.total, cardio.correct), (5, 2));
        let labels: Vec<&str> = cardio.questions.iter().map(|q| q.label.as_str()).collect();
        // 100% > 50% > 0%
        assert_eq!(
            labels,
            vec!["Mitral regurgitation", "Normal", "Aortic stenosis"]
        );
    }

    #[test]
    fn report_keeps_catalog_order_on_ties() {
        let session = session_with(7, "alice", &[("cardio", 1, true), ("cardio", 2, true)]);

        let reports = build_report(&session, &bank());
        let labels: Vec<&str> = reports[0]
            .questions
            .iter()
            .map(|q| q.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Aortic stenosis", "Mitral regurgitation"]);
    }

    #[test]
    fn report_skips_untouched_themes() {
        let session = session_with(7, "alice", &[("neuro", 1, true)]);
        let reports = build_report(&session, &bank());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].tag, "neuro");
    }

    #[test]
    fn leaderboard_orders_by_correct_then_total() {
        // alice 8/10 has the better percentage, bob 9/12 the higher count.
        let alice = session_with(
            1,
            "alice",
            &(0..10)
                .map(|i| ("cardio", 1, i < 8))
                .collect::<Vec<_>>(),
        );
        let bob = session_with(
            2,
            "bob",
            &(0..12)
                .map(|i| ("cardio", 1, i < 9))
                .collect::<Vec<_>>(),
        );

        let records = vec![record_of(&alice), record_of(&bob)];
        let entries = build_leaderboard(&records, Some("cardio"));

        assert_eq!(entries[0].display_name, "bob");
        assert_eq!((entries[0].correct, entries[0].total), (9, 12));
        assert_eq!(entries[1].display_name, "alice");
    }

    #[test]
    fn leaderboard_ties_keep_snapshot_order() {
        let first = session_with(1, "first", &[("cardio", 1, true)]);
        let second = session_with(2, "second", &[("cardio", 1, true)]);

        let records = vec![record_of(&first), record_of(&second)];
        let entries = build_leaderboard(&records, None);

        assert_eq!(entries[0].user_id, UserId::new(1));
        assert_eq!(entries[1].user_id, UserId::new(2));
    }

    #[test]
    fn leaderboard_scope_filters_other_themes() {
        let alice = session_with(1, "alice", &[("cardio", 1, true)]);
        let bob = session_with(2, "bob", &[("neuro", 1, true)]);

        let records = vec![record_of(&alice), record_of(&bob)];
        let entries = build_leaderboard(&records, Some("cardio"));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "alice");

        let all = build_leaderboard(&records, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn position_is_found_by_id_even_with_colliding_names() {
        let a = session_with(1, "dr", &[("cardio", 1, true), ("cardio", 1, true)]);
        let b = session_with(2, "dr", &[("cardio", 1, true)]);

        let records = vec![record_of(&a), record_of(&b)];
        let entries = build_leaderboard(&records, None);

        let position = leaderboard_position(&entries, UserId::new(2)).unwrap();
        assert_eq!((position.rank, position.of), (2, 2));
        assert!(leaderboard_position(&entries, UserId::new(3)).is_none());
    }
}
