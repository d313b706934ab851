use serde::{Deserialize, Serialize};

// =============================================================================
// Core Data Models
// =============================================================================

/// 受信した生音声。1リクエストの間オーケストレータが所有し、以後変更されない
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub filename: Option<String>,
}

// =============================================================================
// API Request/Response Models
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoResponse {
    pub id: String,
    pub transcript: String,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LiveSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualMemoRequest {
    pub transcript: String,
    pub title: Option<String>,
    #[serde(rename = "audioUrl")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<String>,
}

// =============================================================================
// Server Statistics
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerStats {
    pub total_requests: u64,
    pub successful_transcriptions: u64,
    pub failed_transcriptions: u64,
    pub total_processing_time_ms: u64,
    pub average_processing_time_ms: f64,
    pub active_requests: usize,
    pub uptime_seconds: u64,
}

impl ServerStats {
    pub fn record_request(&mut self) {
        self.total_requests += 1;
        self.active_requests += 1;
    }

    pub fn record_success(&mut self, processing_time_ms: u64) {
        self.successful_transcriptions += 1;
        self.active_requests = self.active_requests.saturating_sub(1);
        self.total_processing_time_ms += processing_time_ms;

        if self.successful_transcriptions > 0 {
            self.average_processing_time_ms =
                self.total_processing_time_ms as f64 / self.successful_transcriptions as f64;
        }
    }

    pub fn record_failure(&mut self) {
        self.failed_transcriptions += 1;
        self.active_requests = self.active_requests.saturating_sub(1);
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiErrorCode {
    InvalidInput,
    Unauthorized,
    NotFound,
    FileTooLarge,
    UnsupportedFormat,
    TranscodeFailed,
    RecognitionFailed,
    PersistenceFailed,
    InternalError,
}

impl ApiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidInput => "INVALID_INPUT",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ApiErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ApiErrorCode::TranscodeFailed => "TRANSCODE_FAILED",
            ApiErrorCode::RecognitionFailed => "RECOGNITION_FAILED",
            ApiErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}
