//! Application-level error: a message plus the process exit code.
//!
//! Exit codes:
//! - 2: bad input, configuration or file I/O
//! - 3: invalid tier query (negative or non-numeric quantity)
//! - 4: remote store failure
//! - 5: remote store authorization failure

use crate::io::{ConfigError, SheetError};
use crate::remote::RemoteError;
use crate::tier::TierError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<TierError> for AppError {
    fn from(err: TierError) -> Self {
        let code = match err {
            TierError::InvalidInput(_) => 3,
            _ => 2,
        };
        Self::new(code, err.to_string())
    }
}

impl From<SheetError> for AppError {
    fn from(err: SheetError) -> Self {
        Self::new(2, err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::new(2, err.to_string())
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        let code = match err {
            RemoteError::Auth(_) => 5,
            _ => 4,
        };
        Self::new(code, err.to_string())
    }
}
