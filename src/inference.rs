//! Client for the remote emotion inference server.
//!
//! One `POST <server_url>/process_ecg` per file with a JSON body
//! `{"ecgData": ..., "filename": ...}`. The response carries `emotions` and,
//! optionally, `songs`. Older server builds answer with a single `emotion`
//! and `song_link` instead; both shapes are accepted.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::{EcgUploadRequest, InferenceResult};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Transport(String),

    #[error("Request failed with status code {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Anything that can turn one upload into an inference result.
pub trait InferenceClient: Send + Sync {
    fn submit(&self, request: &EcgUploadRequest) -> Result<InferenceResult, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    emotions: Option<Vec<String>>,
    songs: Option<Vec<String>>,
    emotion: Option<String>,
    song_link: Option<String>,
}

impl InferenceResponse {
    fn into_result(self) -> Result<InferenceResult, InferenceError> {
        let emotions = match (self.emotions, self.emotion) {
            (Some(list), _) => list,
            (None, Some(single)) => vec![single],
            (None, None) => {
                return Err(InferenceError::Malformed("missing field `emotions`".to_string()))
            }
        };
        let songs = match (self.songs, self.song_link) {
            (Some(list), _) => list,
            (None, Some(link)) => vec![link],
            (None, None) => Vec::new(),
        };
        Ok(InferenceResult { emotions, songs })
    }
}

/// Parse a response body into an inference result.
pub fn parse_response(body: &str) -> Result<InferenceResult, InferenceError> {
    let response: InferenceResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Malformed(e.to_string()))?;
    response.into_result()
}

pub struct HttpInferenceClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    keep_songs: bool,
}

impl HttpInferenceClient {
    pub fn new(config: &Config) -> Result<Self, InferenceError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            keep_songs: config.enable_media_recommendations,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl InferenceClient for HttpInferenceClient {
    fn submit(&self, request: &EcgUploadRequest) -> Result<InferenceResult, InferenceError> {
        debug!(
            endpoint = %self.endpoint,
            filename = %request.filename,
            bytes = request.ecg_data.len(),
            "uploading ecg data"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        let mut result = parse_response(&body)?;
        if !self.keep_songs {
            result.songs.clear();
        }
        Ok(result)
    }
}
