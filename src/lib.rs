pub mod catalog;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod language;

// Re-export commonly used items for convenience
pub use catalog::{Voice, VoiceCatalog, VoiceLibrary, VoiceModel};
pub use client::{AudioFormat, FlowTTS, SynthesizeOptions, SynthesizeResponse};
pub use config::FlowTTSConfig;
pub use core::{EventStream, StreamEvent};
pub use error::{ErrorKind, FlowTTSError, FlowTTSResult, NetworkErrorKind};
pub use language::{contains_cjk, detect_language, detect_languages};
