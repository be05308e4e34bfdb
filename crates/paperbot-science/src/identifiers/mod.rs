pub mod doi;

pub use doi::{Doi, find_doi};
