//! Error types shared across northload crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid value for {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },
}
