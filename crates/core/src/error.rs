use thiserror::Error;

use crate::model::{SessionError, StatsError, ThemeError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
