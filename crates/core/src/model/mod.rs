mod ids;
mod session;
mod stats;
mod theme;

pub use ids::{ParseIdError, QuestionId, UserId};
pub use session::{PendingQuestion, SessionError, UserSession};
pub use stats::{QuestionTally, StatsError, ThemeStats};
pub use theme::{Question, Theme, ThemeBank, ThemeError};
