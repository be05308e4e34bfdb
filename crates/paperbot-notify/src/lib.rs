//! Paperbot Notify: forwards article records to a Telegram chat.

pub mod error;
pub mod telegram;

pub use error::{NotifyError, Result};
pub use telegram::TelegramBot;
