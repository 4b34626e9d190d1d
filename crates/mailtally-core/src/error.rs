//! Error types for mailtally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// True for failures raised by the storage layer (connection, pool, SQL).
    ///
    /// Callers use this to tell transient storage trouble apart from bad input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Pool(_) | Error::Encryption(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        let err = Error::Database(rusqlite::Error::InvalidQuery);
        assert!(err.is_storage());

        assert!(!Error::Validation("days".into()).is_storage());
        assert!(!Error::NotFound("account".into()).is_storage());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::Validation("days must be between 1 and 30".into());
        assert_eq!(
            err.to_string(),
            "Validation error: days must be between 1 and 30"
        );
    }
}
