use paperbot_core::PaperbotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("Telegram API error {0}: {1}")]
    Api(u16, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] PaperbotError),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
