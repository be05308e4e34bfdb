pub mod article;
pub mod link;

pub use article::*;
pub use link::*;
