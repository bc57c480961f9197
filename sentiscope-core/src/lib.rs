pub mod config;
pub mod error;
pub mod error_utils;
pub mod filters;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use filters::*;
pub use types::*;
