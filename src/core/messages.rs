//! TRTC TTS wire message types.
//!
//! Request bodies and response envelopes for the `TextToSpeech` and
//! `TextToSpeechSSE` actions. Field names are PascalCase on the wire.

use serde::{Deserialize, Serialize};

/// Sample rate requested for single-shot synthesis.
pub const SAMPLE_RATE: u32 = 24_000;

// =============================================================================
// Request Types
// =============================================================================

/// Voice block of a synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceParams {
    pub voice_id: String,
    pub speed: f64,
    pub volume: f64,
    pub pitch: i32,
}

/// Output format block. Only sent with single-shot requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AudioFormatParams {
    pub format: String,
    pub sample_rate: u32,
}

/// Body of a `TextToSpeech` / `TextToSpeechSSE` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SynthesisRequest {
    pub sdk_app_id: u64,
    pub text: String,
    pub model: String,
    pub voice: VoiceParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioFormatParams>,
    pub language: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Structured error object embedded in a response or an SSE line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Outer envelope of a single-shot response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Response")]
    pub response: Option<ApiResponse>,
}

/// `Response` object of a single-shot reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// Successful single-shot result, still base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPayload {
    pub audio: String,
    pub request_id: Option<String>,
}

/// JSON object carried on an SSE `data:` line.
///
/// `ChunkId` is accepted but never used for ordering.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SseChunk {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<serde_json::Value>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
}
