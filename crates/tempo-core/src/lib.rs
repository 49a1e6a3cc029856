pub mod config;
pub mod error;

pub use config::TempoConfig;
pub use error::{Result, TempoError};
