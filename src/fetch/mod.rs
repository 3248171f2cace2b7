//! Transcript fetch collaborators.
//!
//! The engine only needs "give me captions for this video"; these types hide
//! whether that comes from the HTTP backend, a file, or a fixed list.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{CaptionIndex, CaptionSegment, TranscriptDocument};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Why a transcript could not be produced
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("no valid video URL or identifier was provided")]
    InvalidInput,

    #[error("no transcript found for this video")]
    NotFound,

    #[error("access to the transcript was refused")]
    Forbidden,

    #[error("transcript service failed (status {0})")]
    Server(u16),

    #[error("transcript request rejected (status {0})")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed transcript: {0}")]
    Decode(String),

    #[error("no captions available for this video")]
    Empty,
}

impl FetchError {
    /// Map a non-success HTTP status to the error taxonomy
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            401 | 403 => Self::Forbidden,
            500..=599 => Self::Server(status),
            other => Self::Http(other),
        }
    }
}

pub trait TranscriptFetcher: Send + Sync {
    /// Produce the caption index for a video identifier or URL
    fn fetch(&self, source: &str) -> Result<CaptionIndex, FetchError>;
}

/// Turn a decoded backend document into an index, rejecting empty results
pub fn index_from_document(document: TranscriptDocument) -> Result<CaptionIndex, FetchError> {
    let index =
        CaptionIndex::from_raw(document.captions).map_err(|err| FetchError::Decode(err.to_string()))?;
    if index.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(index)
}

fn require_source(source: &str) -> Result<&str, FetchError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidInput);
    }
    Ok(trimmed)
}

#[derive(Serialize)]
struct TranscriptRequest<'a> {
    url: &'a str,
}

/// Client for the transcript backend's `POST /transcript` endpoint
pub struct HttpTranscriptClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpTranscriptClient {
    pub fn new(backend_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/transcript", backend_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TranscriptFetcher for HttpTranscriptClient {
    fn fetch(&self, source: &str) -> Result<CaptionIndex, FetchError> {
        let source = require_source(source)?;
        info!(endpoint = %self.endpoint, source, "requesting transcript");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TranscriptRequest { url: source })
            .send()
            .map_err(|err| {
                warn!(error = %err, "transcript request failed");
                FetchError::Network(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "transcript backend returned an error");
            return Err(FetchError::from_status(status.as_u16()));
        }

        let document: TranscriptDocument = response
            .json()
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        debug!(records = document.captions.len(), "transcript decoded");
        index_from_document(document)
    }
}

/// Reads a backend-shaped JSON document from disk; the source argument is ignored
pub struct FileTranscriptSource {
    path: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptFetcher for FileTranscriptSource {
    fn fetch(&self, _source: &str) -> Result<CaptionIndex, FetchError> {
        let data = fs::read_to_string(&self.path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound,
            std::io::ErrorKind::PermissionDenied => FetchError::Forbidden,
            _ => FetchError::Network(err.to_string()),
        })?;
        let document: TranscriptDocument =
            serde_json::from_str(&data).map_err(|err| FetchError::Decode(err.to_string()))?;
        index_from_document(document)
    }
}

/// Serves a fixed caption list for any non-empty source
#[derive(Debug, Clone, Default)]
pub struct StaticTranscript {
    segments: Vec<CaptionSegment>,
}

impl StaticTranscript {
    pub fn new(segments: Vec<CaptionSegment>) -> Self {
        Self { segments }
    }
}

impl TranscriptFetcher for StaticTranscript {
    fn fetch(&self, source: &str) -> Result<CaptionIndex, FetchError> {
        require_source(source)?;
        if self.segments.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(CaptionIndex::new(self.segments.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn classifies_http_statuses() {
        assert_eq!(FetchError::from_status(404), FetchError::NotFound);
        assert_eq!(FetchError::from_status(403), FetchError::Forbidden);
        assert_eq!(FetchError::from_status(401), FetchError::Forbidden);
        assert_eq!(FetchError::from_status(502), FetchError::Server(502));
        assert_eq!(FetchError::from_status(429), FetchError::Http(429));
    }

    #[test]
    fn empty_document_is_an_error() {
        let document: TranscriptDocument = serde_json::from_str(r#"{"captions": []}"#).unwrap();
        assert_eq!(index_from_document(document), Err(FetchError::Empty));

        let missing: TranscriptDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(index_from_document(missing), Err(FetchError::Empty));
    }

    #[test]
    fn static_transcript_requires_a_source() {
        let source = StaticTranscript::new(vec![CaptionSegment::new(0.0, 1.0)]);
        assert_eq!(source.fetch("   ").unwrap_err(), FetchError::InvalidInput);
        assert_eq!(source.fetch("abc").unwrap().len(), 1);
    }

    #[test]
    fn file_source_reads_backend_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"captions": [{{"start": 0, "duration": 3, "english": "Hi"}}]}}"#
        )
        .unwrap();
        let index = FileTranscriptSource::new(file.path()).fetch("").unwrap();
        assert_eq!(index.get(0).unwrap().text("english"), Some("Hi"));
    }

    #[test]
    fn file_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTranscriptSource::new(dir.path().join("missing.json"));
        assert_eq!(source.fetch("x").unwrap_err(), FetchError::NotFound);
    }

    #[test]
    fn http_client_normalizes_endpoint() {
        let client = HttpTranscriptClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/transcript");
    }
}
