//! Drive-v3 style HTTP client.

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::remote::{RemoteError, RemoteFile, RemoteStore, status_error};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
pub const TOKEN_VAR: &str = "AGS_DRIVE_TOKEN";
pub const BASE_URL_VAR: &str = "AGS_DRIVE_BASE_URL";

const PAGE_SIZE: &str = "100";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

pub struct DriveClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DriveClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Token and base URL from the environment (`.env` is honored).
    pub fn from_env() -> Result<Self, RemoteError> {
        dotenvy::dotenv().ok();
        let token = std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RemoteError::Auth(format!("missing {TOKEN_VAR} in environment (.env)")))?;
        let base_url = std::env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, token))
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, RemoteError> {
        let resp = self.client.get(url).bearer_auth(&self.token).query(query).send()?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().unwrap_or_default();
        Err(status_error(status, &body))
    }
}

impl RemoteStore for DriveClient {
    fn list(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        let url = format!("{}/files", self.base_url);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", "trashed = false"),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: FileListResponse = self
                .get(&url, &query)?
                .json()
                .map_err(|e| RemoteError::Decode(e.to_string()))?;
            debug!(count = page.files.len(), "Listed remote page");
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    fn download(&self, id: &str) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/files/{id}", self.base_url);
        let bytes = self.get(&url, &[("alt", "media")])?.bytes()?;
        debug!(id, bytes = bytes.len(), "Downloaded remote file");
        Ok(bytes.to_vec())
    }
}
