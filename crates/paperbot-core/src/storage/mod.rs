pub mod record_file;
pub mod retry_list;

pub use record_file::{RecordStore, sanitize_filename};
pub use retry_list::RetryList;
