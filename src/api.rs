//! Client for the quiz generation service
//!
//! `POST /api/generate-quiz` turns a YouTube link into a transcript and a list
//! of questions; `GET /api/transcript/{video_id}` fetches just the transcript.
//! Failures surface as a single message meant for the user. There is no retry:
//! the user resubmits.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_QUESTIONS, MIN_QUESTIONS};
use crate::quiz::{Difficulty, QuizQuestion, StoredQuiz, extract_video_id};

/// Rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Paste a YouTube link first.")]
    MissingUrl,

    #[error("That doesn't look like a valid YouTube URL.")]
    InvalidUrl,

    #[error("Number of questions must be between {min} and {max}.")]
    QuestionCount { min: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    /// Non-success response; the message is shown as-is
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

/// Body of `POST /api/generate-quiz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizRequest {
    pub youtube_url: String,
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

impl QuizRequest {
    pub fn new(youtube_url: &str, num_questions: u32, difficulty: Difficulty) -> Self {
        Self {
            youtube_url: youtube_url.trim().to_string(),
            num_questions,
            difficulty,
        }
    }

    /// Check the request locally; returns the video id
    pub fn validate(&self) -> Result<&str, RequestError> {
        if self.youtube_url.is_empty() {
            return Err(RequestError::MissingUrl);
        }
        let video_id = extract_video_id(&self.youtube_url).ok_or(RequestError::InvalidUrl)?;
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.num_questions) {
            return Err(RequestError::QuestionCount {
                min: MIN_QUESTIONS,
                max: MAX_QUESTIONS,
            });
        }
        Ok(video_id)
    }
}

/// Body of a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizApiResponse {
    pub transcript: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// User-facing message for a failed response.
///
/// Uses the body's `detail` verbatim when it is a non-empty string, renders
/// any other `detail` value as JSON, and falls back to the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|detail| match detail {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

    detail.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()))
    })
}

/// HTTP client for the generation service
#[derive(Debug, Clone)]
pub struct QuizClient {
    base_url: String,
    client: reqwest::Client,
}

impl QuizClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a quiz for a YouTube link
    pub async fn generate_quiz(&self, request: &QuizRequest) -> Result<QuizApiResponse, ApiError> {
        request.validate()?;
        let url = format!("{}/api/generate-quiz", self.base_url);
        log::debug!(
            "Requesting {} {} questions for {}",
            request.num_questions,
            request.difficulty.as_str(),
            request.youtube_url
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::handle_response(response).await
    }

    pub async fn fetch_transcript(&self, video_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/transcript/{}", self.base_url, video_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let body: TranscriptResponse = Self::handle_response(response).await?;
        Ok(body.transcript)
    }

    /// Validate, generate, and build the library record.
    ///
    /// `created_at` (Unix ms) also forms the quiz id.
    pub async fn create_quiz(
        &self,
        youtube_url: &str,
        num_questions: u32,
        difficulty: Difficulty,
        created_at: i64,
    ) -> Result<StoredQuiz, ApiError> {
        let request = QuizRequest::new(youtube_url, num_questions, difficulty);
        let video_id = request.validate()?.to_string();
        let generated = self.generate_quiz(&request).await?;
        log::info!(
            "Generated {} questions for video {}",
            generated.quiz.len(),
            video_id
        );
        Ok(StoredQuiz::from_generated(
            &video_id,
            &request.youtube_url,
            difficulty,
            num_questions,
            created_at,
            generated.transcript,
            generated.quiz,
        ))
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &body);
            log::warn!("Quiz API returned {}: {}", status.as_u16(), message);
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
    }
}
