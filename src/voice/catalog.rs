// Voice catalog entries and the agent → voice lookup.

use serde::{Deserialize, Serialize};

/// Voice used when nothing better is known.
pub const DEFAULT_VOICE_ID: &str = "adam";

/// One entry of the backend's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preview_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VoiceCatalog {
    #[serde(default)]
    pub voices: Vec<Voice>,
}

/// Default voice for an arena agent.
pub fn voice_for_agent(agent: &str) -> &'static str {
    match agent.trim().to_lowercase().as_str() {
        "adam" => "adam",
        "beata" | "daria" => "beata",
        "doubt" | "wątpiący" | "watpiacy" => "wapiacy",
        _ => DEFAULT_VOICE_ID,
    }
}

/// `requested` if the catalog offers it, otherwise the default voice.
pub fn resolve_voice<'a>(requested: &'a str, catalog: &[Voice]) -> &'a str {
    if !requested.is_empty() && catalog.iter().any(|v| v.voice_id == requested) {
        requested
    } else {
        DEFAULT_VOICE_ID
    }
}
