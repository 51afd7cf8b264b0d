#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod judge;
pub mod selector;
pub mod session_manager;
pub mod stats;
pub mod view;

pub use quiz_core::Clock;

pub use engine::{QuestionReply, QuizEngine};
pub use error::{EngineError, JudgeError, SelectionError};
pub use judge::{AnswerJudge, AnswerVerdict};
pub use selector::{AdaptiveSelector, DrawnQuestion};
pub use session_manager::SessionManager;
pub use view::{
    AnswerResultView, LeaderboardPosition, LeaderboardView, QuestionScore, QuestionView,
    RankedEntry, RejectionView, StatsView, ThemeEntry, ThemeListView, ThemeReport,
};
