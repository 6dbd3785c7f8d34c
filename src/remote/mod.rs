//! Remote file store.
//!
//! The filter workflow only needs two things from a cloud drive: a listing and
//! the bytes of one file. `RemoteStore` is that seam; `DriveClient` is the HTTP
//! implementation, and tests substitute an in-memory store.

pub mod drive;

pub use drive::*;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// No usable token, or the store refused the one we sent.
    #[error("Not authorized: {0}")]
    Auth(String),

    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

pub trait RemoteStore {
    fn list(&self) -> Result<Vec<RemoteFile>, RemoteError>;
    fn download(&self, id: &str) -> Result<Vec<u8>, RemoteError>;
}

/// Error for a failed (non-2xx) response. 401/403 are auth failures.
pub fn status_error(status: u16, body: &str) -> RemoteError {
    match status {
        401 | 403 => RemoteError::Auth(format!("remote store rejected the token (HTTP {status})")),
        _ => RemoteError::Status {
            status,
            body: truncate(body, 200),
        },
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
