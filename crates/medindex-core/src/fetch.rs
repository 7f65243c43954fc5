//! Payload fetcher: downloads a URL to a caller-supplied path.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use thiserror::Error;
use url::Url;

/// Fetch errors. Every variant maps to the `download_failed` category.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieves a URL's binary payload into a destination file.
pub trait FetchPayload {
    fn fetch(&self, url: &Url, dest: &Path) -> Result<(), FetchError>;
}

/// HTTP fetcher with a bounded per-request timeout. No retry built in;
/// retry policy belongs to whatever schedules the pipeline.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl FetchPayload for HttpFetcher {
    /// Downloads into a sibling temp file and renames it over `dest`, so
    /// `dest` is never observable in a half-written state.
    fn fetch(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let payload = self
            .client
            .get(url.clone())
            .send()?
            .error_for_status()?
            .bytes()?;

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&payload)?;
        staged.flush()?;
        staged.persist(dest).map_err(|e| FetchError::Io(e.error))?;
        Ok(())
    }
}
