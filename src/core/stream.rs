//! SSE stream demultiplexer.
//!
//! Turns an arbitrarily fragmented byte stream into typed [`StreamEvent`]s.
//! Bytes are buffered until a `\n` arrives, so a line (or a multi-byte UTF-8
//! character) split across network chunks is reassembled before it is parsed.
//!
//! Each `data: ` line is one JSON object:
//!
//! - `Error` present: protocol error, the stream is abandoned
//! - `Type == "audio"`: base64 audio, yielded with a local sequence number
//! - `Type == "end"`: terminal event carrying the number of audio events seen
//!
//! Lines that fail to parse are dropped with a warning and never end the stream.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::messages::SseChunk;
use crate::error::{FlowTTSError, FlowTTSResult};

const DATA_PREFIX: &[u8] = b"data: ";

// =============================================================================
// Events
// =============================================================================

/// One decoded event from a streaming synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Decoded PCM audio. `sequence` starts at 0 and increases by one per
    /// audio event, independent of any counter the server sends.
    Audio { data: Bytes, sequence: u64 },
    /// Terminal event. `total_chunks` is the number of audio events delivered.
    End {
        total_chunks: u64,
        request_id: Option<String>,
    },
}

impl StreamEvent {
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End { .. })
    }

    /// Audio bytes of an `Audio` event.
    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            Self::Audio { data, .. } => Some(data),
            Self::End { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemuxState {
    Open,
    Finished,
    Errored,
}

// =============================================================================
// Demultiplexer
// =============================================================================

/// Incremental line-buffering parser for one SSE response.
///
/// Not reusable: once an `End` event or a protocol error has been produced,
/// every further call to [`next_event`](Self::next_event) returns `None`.
#[derive(Debug)]
pub struct SseDemuxer {
    buffer: BytesMut,
    // Prefix of `buffer` already known to contain no newline
    scanned: usize,
    emitted: u64,
    state: DemuxState,
}

impl Default for SseDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDemuxer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            emitted: 0,
            state: DemuxState::Open,
        }
    }

    /// Append a network chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.state == DemuxState::Open {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Next event from a complete line, or `None` when more bytes are needed
    /// or the stream has ended.
    pub fn next_event(&mut self) -> Option<FlowTTSResult<StreamEvent>> {
        while self.state == DemuxState::Open {
            let unscanned = &self.buffer[self.scanned..];
            let Some(offset) = unscanned.iter().position(|&b| b == b'\n') else {
                self.scanned = self.buffer.len();
                return None;
            };
            let newline = self.scanned + offset;
            self.scanned = 0;

            let mut line = self.buffer.split_to(newline + 1);
            line.truncate(newline);
            if line.last() == Some(&b'\r') {
                line.truncate(newline - 1);
            }

            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        None
    }

    /// Number of audio events produced so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// True once an `End` event or a protocol error has been produced.
    pub fn is_terminated(&self) -> bool {
        self.state != DemuxState::Open
    }

    /// Close the demuxer at end of body. Returns the number of buffered bytes
    /// that never formed a complete line; they are discarded.
    pub fn finish(&mut self) -> usize {
        let pending = self.buffer.len();
        self.buffer.clear();
        self.scanned = 0;

        if self.state == DemuxState::Open {
            if pending > 0 {
                warn!(
                    pending_bytes = pending,
                    "SSE stream closed with an incomplete line, discarding it"
                );
            }
            warn!(
                audio_chunks = self.emitted,
                "SSE stream closed without an end event"
            );
            self.state = DemuxState::Finished;
        }
        pending
    }

    fn process_line(&mut self, line: &[u8]) -> Option<FlowTTSResult<StreamEvent>> {
        if line.trim_ascii().is_empty() {
            return None;
        }

        // Comments, `event:` and `id:` fields carry nothing we use
        let payload = line.strip_prefix(DATA_PREFIX)?;

        let chunk: SseChunk = match serde_json::from_slice(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(
                    line_bytes = payload.len(),
                    "Skipping malformed SSE data line: {}",
                    json_error_category(&e)
                );
                return None;
            }
        };

        if let Some(error) = chunk.error {
            self.state = DemuxState::Errored;
            self.buffer.clear();
            self.scanned = 0;
            return Some(Err(FlowTTSError::Protocol {
                code: error.code,
                message: error.message,
                request_id: chunk.request_id,
                status: None,
            }));
        }

        match chunk.kind.as_deref() {
            Some("audio") => {
                let audio = chunk.audio.filter(|audio| !audio.is_empty())?;
                match BASE64.decode(audio.as_bytes()) {
                    Ok(data) => {
                        let sequence = self.emitted;
                        self.emitted += 1;
                        Some(Ok(StreamEvent::Audio {
                            data: Bytes::from(data),
                            sequence,
                        }))
                    }
                    Err(e) => {
                        warn!("Skipping SSE audio event with invalid base64: {}", e);
                        None
                    }
                }
            }
            Some("end") => {
                self.state = DemuxState::Finished;
                self.buffer.clear();
                self.scanned = 0;
                debug!(audio_chunks = self.emitted, "SSE stream reached end event");
                Some(Ok(StreamEvent::End {
                    total_chunks: self.emitted,
                    request_id: chunk.request_id,
                }))
            }
            other => {
                debug!("Ignoring SSE event of type {:?}", other);
                None
            }
        }
    }
}

// serde_json's Display can quote input, so only the category is logged.
fn json_error_category(err: &serde_json::Error) -> &'static str {
    match err.classify() {
        serde_json::error::Category::Io => "io error",
        serde_json::error::Category::Syntax => "syntax error",
        serde_json::error::Category::Data => "unexpected shape",
        serde_json::error::Category::Eof => "truncated JSON",
    }
}
