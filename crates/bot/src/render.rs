//! View-to-Telegram rendering: message texts and inline keyboards.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use quiz_core::model::UserId;
use services::view::{
    AnswerResultView, LeaderboardView, QuestionView, StatsView, ThemeListView,
};

use crate::callback::CallbackAction;

pub const CHOOSE_THEME_TEXT: &str = "Choose a question theme:";
pub const USE_BUTTONS_TEXT: &str = "Use the buttons under the question to answer.";

fn number_emoji(index: usize) -> String {
    const EMOJIS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];
    EMOJIS
        .get(index)
        .map_or_else(|| (index + 1).to_string(), |emoji| (*emoji).to_owned())
}

fn position_emoji(rank: usize) -> &'static str {
    match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "",
    }
}

pub fn theme_keyboard(view: &ThemeListView) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = view
        .themes
        .iter()
        .map(|theme| {
            vec![InlineKeyboardButton::callback(
                theme.name.clone(),
                CallbackAction::SelectTheme(theme.tag.clone()).encode(),
            )]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn question_text(view: &QuestionView) -> String {
    let options = view
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| format!("{} {option}", number_emoji(index)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{options}\n\nPick the right option.", view.prompt)
}

pub fn options_keyboard(view: &QuestionView) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = view
        .options
        .iter()
        .enumerate()
        .map(|(index, _)| {
            InlineKeyboardButton::callback(
                number_emoji(index),
                CallbackAction::Answer {
                    question_id: view.question_id,
                    option_index: index,
                }
                .encode(),
            )
        })
        .collect();
    InlineKeyboardMarkup::new(vec![buttons])
}

pub fn after_answer_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "Next question ➡️",
            CallbackAction::NextQuestion.encode(),
        )],
        vec![
            InlineKeyboardButton::callback("📊 Statistics", CallbackAction::Stats.encode()),
            InlineKeyboardButton::callback("🏆 Leaderboard", CallbackAction::Leaderboard.encode()),
            InlineKeyboardButton::callback("🔄 Change theme", CallbackAction::ChangeTheme.encode()),
        ],
    ])
}

pub fn answer_text(result: &AnswerResultView) -> String {
    let mut text = if result.is_correct {
        format!("✅ Correct, it is \"{}\"!", result.selected_text)
    } else {
        format!(
            "❌ \"{}\" is not right.\nThe correct answer is \"{}\".",
            result.selected_text, result.correct_text
        )
    };
    if !result.explanation.is_empty() {
        text.push_str("\n\n");
        text.push_str(&result.explanation.join("\n"));
    }
    text
}

/// Follow-up text for a wrong pick that is another question's correct
/// answer; `None` when there is nothing extra to tell.
#[must_use]
pub fn secondary_text(result: &AnswerResultView) -> Option<String> {
    let explanation = result.secondary_explanation.as_ref()?;
    Some(format!(
        "About \"{}\", which you picked:\n{}",
        result.selected_text,
        explanation.join("\n")
    ))
}

pub fn stats_text(view: &StatsView) -> String {
    if view.themes.is_empty() {
        return "No statistics yet. Answer a few questions first!".to_owned();
    }

    let mut lines = vec!["📊 Your statistics".to_owned()];
    if let Some(position) = view.position {
        lines.push(format!(
            "🏆 Rank for the current theme: {} of {} {}",
            position.rank,
            position.of,
            position_emoji(position.rank)
        ));
    }
    for theme in &view.themes {
        lines.push(String::new());
        lines.push(format!(
            "{}: {}/{} correct ({:.1}%)",
            theme.name, theme.correct, theme.total, theme.percentage
        ));
        for question in &theme.questions {
            lines.push(format!(
                "  {}/{} ({:.1}%): {}",
                question.correct, question.total, question.percentage, question.label
            ));
        }
    }
    lines.join("\n")
}

pub fn leaderboard_text(view: &LeaderboardView, me: UserId) -> String {
    if view.entries.is_empty() {
        return "No one is on the leaderboard yet.".to_owned();
    }

    let scope = view
        .scope_name
        .as_deref()
        .map_or_else(|| "all themes".to_owned(), str::to_owned);
    let mut lines = vec![format!("🏆 Leaderboard — {scope}")];
    for (index, entry) in view.entries.iter().enumerate() {
        let rank = index + 1;
        let marker = if entry.user_id == me { " 👤" } else { "" };
        let medal = match position_emoji(rank) {
            "" => String::new(),
            emoji => format!("{emoji} "),
        };
        lines.push(format!(
            "{rank}. {medal}{}{marker}: {}/{} ({:.1}%)",
            entry.display_name,
            entry.correct,
            entry.total,
            entry.percentage()
        ));
    }
    lines.join("\n")
}
