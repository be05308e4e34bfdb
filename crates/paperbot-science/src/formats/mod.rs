pub mod apa;

pub use apa::{ApaFields, format_apa};
