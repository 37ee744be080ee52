//! Voice catalog.
//!
//! Voices are partitioned by the synthesis model that serves them. The set a
//! voice id belongs to decides the `Model` field of every request, so the two
//! sets must be disjoint.
//!
//! The builtin catalog is embedded at compile time from `data/`:
//!
//! ```text
//! data/voices-flow_01_turbo.json   flow_01_turbo voices (first entry is the fallback)
//! data/voices-flow_01_ex.json      flow_01_ex voices
//! ```
//!
//! The embedded lists are a subset of the voices the service offers (it has
//! several dozen turbo voices), and the display names are descriptive labels
//! rather than official names. Ids missing here are rejected as
//! `UnknownVoice`; load a fuller list with [`VoiceCatalog::from_json`] and pass
//! it to `FlowTTS::with_catalog`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FlowTTSError, FlowTTSResult};

const TURBO_VOICES_JSON: &str = include_str!("data/voices-flow_01_turbo.json");
const EXTENDED_VOICES_JSON: &str = include_str!("data/voices-flow_01_ex.json");

/// OpenAI voice names accepted in place of catalog ids.
pub const OPENAI_VOICE_ALIASES: &[(&str, &str)] = &[
    ("alloy", "v-male-W1tH9jVc"),
    ("echo", "v-male-Bk7vD3xP"),
    ("fable", "v-male-s5NqE0rZ"),
    ("onyx", "v-male-Bk7vD3xP"),
    ("nova", "v-female-R2s4N9qJ"),
    ("shimmer", "v-female-m1KpW7zE"),
];

// =============================================================================
// Types
// =============================================================================

/// Synthesis model serving a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceModel {
    #[serde(rename = "flow_01_turbo")]
    Turbo,
    #[serde(rename = "flow_01_ex")]
    Extended,
}

impl VoiceModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Turbo => "flow_01_turbo",
            Self::Extended => "flow_01_ex",
        }
    }
}

impl fmt::Display for VoiceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Voice listing returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceLibrary {
    pub preset: Vec<Voice>,
}

#[derive(Deserialize)]
struct VoiceFile {
    voices: Vec<Voice>,
}

// =============================================================================
// VoiceCatalog
// =============================================================================

/// Immutable voice catalog with constant-time id lookup.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    turbo: Vec<Voice>,
    extended: Vec<Voice>,
    index: HashMap<String, (VoiceModel, usize)>,
}

impl VoiceCatalog {
    /// Catalog built from the embedded voice data.
    pub fn builtin() -> FlowTTSResult<Self> {
        Self::from_json(TURBO_VOICES_JSON, EXTENDED_VOICES_JSON)
    }

    /// Parse a catalog from two `{"voices": [...]}` documents.
    pub fn from_json(turbo: &str, extended: &str) -> FlowTTSResult<Self> {
        let parse = |json: &str, model: VoiceModel| {
            serde_json::from_str::<VoiceFile>(json)
                .map(|file| file.voices)
                .map_err(|e| {
                    FlowTTSError::InvalidConfiguration(format!("invalid {model} voice data: {e}"))
                })
        };
        Self::new(
            parse(turbo, VoiceModel::Turbo)?,
            parse(extended, VoiceModel::Extended)?,
        )
    }

    /// Build a catalog from explicit voice lists.
    ///
    /// Fails if `turbo` is empty (no fallback voice) or an id appears twice.
    pub fn new(turbo: Vec<Voice>, extended: Vec<Voice>) -> FlowTTSResult<Self> {
        if turbo.is_empty() {
            return Err(FlowTTSError::InvalidConfiguration(
                "voice catalog needs at least one flow_01_turbo voice".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(turbo.len() + extended.len());
        let entries = turbo
            .iter()
            .enumerate()
            .map(|(i, voice)| (voice, VoiceModel::Turbo, i))
            .chain(
                extended
                    .iter()
                    .enumerate()
                    .map(|(i, voice)| (voice, VoiceModel::Extended, i)),
            );
        for (voice, model, position) in entries {
            if index.insert(voice.id.clone(), (model, position)).is_some() {
                return Err(FlowTTSError::InvalidConfiguration(format!(
                    "duplicate voice id in catalog: {}",
                    voice.id
                )));
            }
        }

        debug!(
            turbo = turbo.len(),
            extended = extended.len(),
            "Voice catalog loaded"
        );
        Ok(Self {
            turbo,
            extended,
            index,
        })
    }

    /// All voices, turbo first. Extended voices only when requested.
    pub fn voices(&self, include_extended: bool) -> VoiceLibrary {
        VoiceLibrary {
            preset: self.iter(include_extended).cloned().collect(),
        }
    }

    /// Turbo voices only.
    pub fn standard_voices(&self) -> VoiceLibrary {
        self.voices(false)
    }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.index.get(id).map(|&(model, position)| match model {
            VoiceModel::Turbo => &self.turbo[position],
            VoiceModel::Extended => &self.extended[position],
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Case-insensitive substring match on name, description and language.
    pub fn search(&self, query: &str, include_extended: bool) -> Vec<Voice> {
        let query = query.to_lowercase();
        self.iter(include_extended)
            .filter(|voice| {
                voice.name.to_lowercase().contains(&query)
                    || voice.language.to_lowercase().contains(&query)
                    || voice
                        .description
                        .as_deref()
                        .is_some_and(|description| description.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    /// Voice used when the caller does not name one: the first turbo voice.
    pub fn fallback_voice(&self) -> &Voice {
        // `new` rejects an empty turbo list
        &self.turbo[0]
    }

    /// Model serving `id`. Exact, case-sensitive match.
    pub fn model_for_voice(&self, id: &str) -> FlowTTSResult<VoiceModel> {
        self.index
            .get(id)
            .map(|&(model, _)| model)
            .ok_or_else(|| FlowTTSError::UnknownVoice(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn iter(&self, include_extended: bool) -> impl Iterator<Item = &Voice> {
        let extended: &[Voice] = if include_extended { &self.extended } else { &[] };
        self.turbo.iter().chain(extended)
    }
}

/// Catalog id for an OpenAI voice name, case-insensitive.
pub fn resolve_alias(name: &str) -> Option<&'static str> {
    OPENAI_VOICE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|&(_, id)| id)
}

#[cfg(test)]
mod tests;
