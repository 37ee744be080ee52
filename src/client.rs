//! FlowTTS client.
//!
//! [`FlowTTS`] validates caller options, resolves the voice to its model, signs
//! the JSON payload and hands it to the transport. Every validation failure is
//! raised before any network I/O.
//!
//! # Example
//!
//! ```rust,no_run
//! use flow_tts::{FlowTTS, FlowTTSConfig, SynthesizeOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FlowTTS::new(FlowTTSConfig::from_env()?)?;
//!
//! let response = client
//!     .synthesize(SynthesizeOptions::new("你好，世界！").voice("v-female-R2s4N9qJ"))
//!     .await?;
//! std::fs::write("output.wav", &response.audio)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::{TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{self, Voice, VoiceCatalog, VoiceLibrary, VoiceModel};
use crate::config::FlowTTSConfig;
use crate::core::messages::{AudioFormatParams, SAMPLE_RATE, SynthesisRequest, VoiceParams};
use crate::core::signer::{ACTION_TEXT_TO_SPEECH, ACTION_TEXT_TO_SPEECH_SSE, Tc3Signer};
use crate::core::transport::{EventStream, HttpTransport, RequestEnvelope};
use crate::error::{FlowTTSError, FlowTTSResult};
use crate::language::{DEFAULT_LANGUAGE, detect_language};

/// Accepted range for `speed` and `volume`.
pub const RATIO_RANGE: std::ops::RangeInclusive<f64> = 0.5..=2.0;

/// Accepted range for `pitch`, in semitones.
pub const PITCH_RANGE: std::ops::RangeInclusive<i32> = -12..=12;

// =============================================================================
// Options and Responses
// =============================================================================

/// Output container for single-shot synthesis. Streaming always yields PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Pcm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = FlowTTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "pcm" => Ok(Self::Pcm),
            other => Err(FlowTTSError::validation(
                "format",
                format!("Unsupported audio format '{other}': expected wav or pcm"),
            )),
        }
    }
}

/// Synthesis options.
///
/// Omitted voice means the catalog fallback voice; omitted language means
/// detection from the text.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeOptions {
    pub text: String,
    /// Catalog voice id or OpenAI voice name (`alloy`, `nova`, ...)
    pub voice: Option<String>,
    pub language: Option<String>,
    /// Ignored by streaming synthesis
    pub format: AudioFormat,
    pub speed: f64,
    pub volume: f64,
    pub pitch: i32,
}

impl SynthesizeOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            language: None,
            format: AudioFormat::default(),
            speed: 1.0,
            volume: 1.0,
            pitch: 0,
        }
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn pitch(mut self, pitch: i32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Check text and parameter ranges.
    pub fn validate(&self) -> FlowTTSResult<()> {
        if self.text.trim().is_empty() {
            return Err(FlowTTSError::validation("text", "Text cannot be empty"));
        }
        // `contains` is false for NaN
        if !RATIO_RANGE.contains(&self.speed) {
            return Err(FlowTTSError::validation(
                "speed",
                "Speed must be between 0.5 and 2.0",
            ));
        }
        if !RATIO_RANGE.contains(&self.volume) {
            return Err(FlowTTSError::validation(
                "volume",
                "Volume must be between 0.5 and 2.0",
            ));
        }
        if !PITCH_RANGE.contains(&self.pitch) {
            return Err(FlowTTSError::validation(
                "pitch",
                "Pitch must be between -12 and 12 semitones",
            ));
        }
        Ok(())
    }
}

/// Result of a single-shot synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizeResponse {
    pub audio: Bytes,
    pub format: AudioFormat,
    /// Set only when the language was detected from the text
    pub detected_language: Option<String>,
    pub auto_detected: bool,
    pub request_id: Option<String>,
}

struct PreparedRequest {
    request: SynthesisRequest,
    detected_language: Option<String>,
}

// =============================================================================
// FlowTTS
// =============================================================================

/// Text-to-speech client.
///
/// Cheap to share: clones reuse the HTTP connection pool and the voice catalog.
#[derive(Debug, Clone)]
pub struct FlowTTS {
    config: FlowTTSConfig,
    signer: Tc3Signer,
    transport: HttpTransport,
    catalog: Arc<VoiceCatalog>,
}

impl FlowTTS {
    /// Create a client with the builtin voice catalog.
    pub fn new(config: FlowTTSConfig) -> FlowTTSResult<Self> {
        Self::with_catalog(config, Arc::new(VoiceCatalog::builtin()?))
    }

    /// Create a client with an explicit voice catalog.
    pub fn with_catalog(config: FlowTTSConfig, catalog: Arc<VoiceCatalog>) -> FlowTTSResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.endpoint_url()?)?;
        let signer = Tc3Signer::new(config.credentials());

        debug!(
            region = %config.region,
            endpoint = %transport.endpoint(),
            voices = catalog.len(),
            "FlowTTS client created"
        );

        Ok(Self {
            config,
            signer,
            transport,
            catalog,
        })
    }

    pub fn config(&self) -> &FlowTTSConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<VoiceCatalog> {
        &self.catalog
    }

    /// Synthesize `options.text` and return the complete audio.
    pub async fn synthesize(&self, options: SynthesizeOptions) -> FlowTTSResult<SynthesizeResponse> {
        let format = options.format;
        let prepared = self.prepare(&options, Some(format))?;
        let envelope = self.envelope(ACTION_TEXT_TO_SPEECH, &prepared.request)?;

        let payload = self.transport.send(envelope).await?;
        let audio = BASE64
            .decode(payload.audio.as_bytes())
            .map_err(|e| FlowTTSError::decode(format!("Audio is not valid base64: {e}")))?;

        Ok(SynthesizeResponse {
            audio: Bytes::from(audio),
            format,
            auto_detected: prepared.detected_language.is_some(),
            detected_language: prepared.detected_language,
            request_id: payload.request_id,
        })
    }

    /// Synthesize `options.text` as a stream of PCM chunks.
    ///
    /// Options are validated and the payload is encoded immediately. Signing
    /// and the HTTP exchange happen when the stream is first polled, so the
    /// request timestamp is always fresh. `options.format` is ignored.
    pub fn synthesize_stream(&self, options: SynthesizeOptions) -> FlowTTSResult<EventStream> {
        let prepared = self.prepare(&options, None)?;
        let payload = Bytes::from(encode(&prepared.request)?);

        let signer = self.signer.clone();
        let transport = self.transport.clone();
        let region = self.config.region.clone();
        let events = stream::once(async move {
            let signed = signer.sign(ACTION_TEXT_TO_SPEECH_SSE, &region, &payload)?;
            Ok::<_, FlowTTSError>(transport.send_stream(RequestEnvelope::new(
                ACTION_TEXT_TO_SPEECH_SSE,
                signed,
                payload,
            )))
        })
        .try_flatten();

        Ok(Box::pin(events))
    }

    /// OpenAI-style entry point: `client.audio().speech().create(options)`.
    pub fn audio(&self) -> AudioApi<'_> {
        AudioApi { client: self }
    }

    /// Available voices, turbo voices first.
    pub fn voices(&self, include_extended: bool) -> VoiceLibrary {
        self.catalog.voices(include_extended)
    }

    pub fn standard_voices(&self) -> VoiceLibrary {
        self.catalog.standard_voices()
    }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.catalog.voice(id)
    }

    pub fn search_voices(&self, query: &str, include_extended: bool) -> Vec<Voice> {
        self.catalog.search(query, include_extended)
    }

    /// Catalog id and model for a requested voice, after alias resolution.
    pub fn resolve_voice(&self, voice: Option<&str>) -> FlowTTSResult<(String, VoiceModel)> {
        let id = match voice.map(str::trim).filter(|v| !v.is_empty()) {
            Some(requested) => catalog::resolve_alias(requested).unwrap_or(requested),
            None => self.catalog.fallback_voice().id.as_str(),
        };
        let model = self.catalog.model_for_voice(id)?;
        Ok((id.to_string(), model))
    }

    fn prepare(
        &self,
        options: &SynthesizeOptions,
        format: Option<AudioFormat>,
    ) -> FlowTTSResult<PreparedRequest> {
        options.validate()?;
        let (voice_id, model) = self.resolve_voice(options.voice.as_deref())?;

        let (language, detected_language) =
            match options.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
                Some(language) => (language.to_string(), None),
                None => {
                    let detected = detect_language(&options.text, DEFAULT_LANGUAGE);
                    (detected.clone(), Some(detected))
                }
            };

        info!(
            voice = %voice_id,
            model = %model,
            language = %language,
            auto_detected = detected_language.is_some(),
            text_chars = options.text.chars().count(),
            streaming = format.is_none(),
            "Preparing synthesis request"
        );

        Ok(PreparedRequest {
            request: SynthesisRequest {
                sdk_app_id: self.config.sdk_app_id,
                text: options.text.clone(),
                model: model.as_str().to_string(),
                voice: VoiceParams {
                    voice_id,
                    speed: options.speed,
                    volume: options.volume,
                    pitch: options.pitch,
                },
                audio_format: format.map(|format| AudioFormatParams {
                    format: format.as_str().to_string(),
                    sample_rate: SAMPLE_RATE,
                }),
                language,
            },
            detected_language,
        })
    }

    fn envelope(
        &self,
        action: &'static str,
        request: &SynthesisRequest,
    ) -> FlowTTSResult<RequestEnvelope> {
        let payload = encode(request)?;
        let signed = self.signer.sign(action, &self.config.region, &payload)?;
        Ok(RequestEnvelope::new(action, signed, payload))
    }
}

fn encode(request: &SynthesisRequest) -> FlowTTSResult<Vec<u8>> {
    serde_json::to_vec(request).map_err(|e| {
        FlowTTSError::validation("text", format!("Request could not be encoded: {e}"))
    })
}

// =============================================================================
// OpenAI-compatible facade
// =============================================================================

/// `client.audio()`
#[derive(Debug, Clone, Copy)]
pub struct AudioApi<'a> {
    client: &'a FlowTTS,
}

impl<'a> AudioApi<'a> {
    /// `client.audio().speech()`
    pub fn speech(&self) -> SpeechApi<'a> {
        SpeechApi {
            client: self.client,
        }
    }
}

/// `client.audio().speech()`
#[derive(Debug, Clone, Copy)]
pub struct SpeechApi<'a> {
    client: &'a FlowTTS,
}

impl SpeechApi<'_> {
    /// Same as [`FlowTTS::synthesize`].
    pub async fn create(&self, options: SynthesizeOptions) -> FlowTTSResult<SynthesizeResponse> {
        self.client.synthesize(options).await
    }
}
