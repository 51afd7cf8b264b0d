#![forbid(unsafe_code)]

pub mod json;
pub mod repository;
pub mod themes;

pub use json::JsonSessionStore;
pub use repository::{
    InMemorySessionStore, PendingQuestionRecord, SessionRecord, SessionRepository, StorageError,
    ThemeStatsRecord,
};
pub use themes::{ThemeLoadError, load_theme_dir};
