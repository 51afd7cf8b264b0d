use std::str::FromStr;

use quiz_core::model::QuestionId;

/// Actions carried in inline-button callback data.
///
/// The wire format is compact `:`-separated text, e.g. `theme:cardio` and
/// `answer:3:1` (question id, then 0-based option index). Telegram limits
/// callback data to 64 bytes, so it stays terse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SelectTheme(String),
    Answer {
        question_id: QuestionId,
        option_index: usize,
    },
    NextQuestion,
    Stats,
    Leaderboard,
    ChangeTheme,
}

impl CallbackAction {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::SelectTheme(tag) => format!("theme:{tag}"),
            CallbackAction::Answer {
                question_id,
                option_index,
            } => format!("answer:{question_id}:{option_index}"),
            CallbackAction::NextQuestion => "next".to_owned(),
            CallbackAction::Stats => "stats".to_owned(),
            CallbackAction::Leaderboard => "leaderboard".to_owned(),
            CallbackAction::ChangeTheme => "change_theme".to_owned(),
        }
    }

    /// Parse callback data; `None` for anything malformed or unknown (e.g.
    /// buttons from an older build of the bot).
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "next" => return Some(CallbackAction::NextQuestion),
            "stats" => return Some(CallbackAction::Stats),
            "leaderboard" => return Some(CallbackAction::Leaderboard),
            "change_theme" => return Some(CallbackAction::ChangeTheme),
            _ => {}
        }

        if let Some(tag) = data.strip_prefix("theme:") {
            if tag.is_empty() {
                return None;
            }
            return Some(CallbackAction::SelectTheme(tag.to_owned()));
        }

        if let Some(rest) = data.strip_prefix("answer:") {
            let (id, index) = rest.split_once(':')?;
            return Some(CallbackAction::Answer {
                question_id: QuestionId::from_str(id).ok()?,
                option_index: index.parse().ok()?,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_action() {
        let actions = [
            CallbackAction::SelectTheme("cardio".into()),
            CallbackAction::Answer {
                question_id: QuestionId::new(7),
                option_index: 2,
            },
            CallbackAction::NextQuestion,
            CallbackAction::Stats,
            CallbackAction::Leaderboard,
            CallbackAction::ChangeTheme,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn rejects_malformed_data() {
        for data in ["", "answer:", "answer:1", "answer:x:0", "answer:1:x", "theme:", "poke"] {
            assert_eq!(CallbackAction::parse(data), None, "{data:?}");
        }
    }
}
