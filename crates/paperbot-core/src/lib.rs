//! Paperbot Core: article records, retry list, configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::{ExitCode, PaperbotError, Result};
pub use models::*;
pub use storage::{RecordStore, RetryList, sanitize_filename};
