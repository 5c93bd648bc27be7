// Emotion tags and the keyword heuristic that picks one for a line of text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    Neutral,
    Doubtful,
    Excited,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Surprised,
        Emotion::Neutral,
        Emotion::Doubtful,
        Emotion::Excited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
            Emotion::Doubtful => "doubtful",
            Emotion::Excited => "excited",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == wanted)
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

// Whole words.
const SURPRISE_WORDS: &[&str] = &["wow", "amazing", "incredible", "niesamowite"];
const ANGER_WORDS: &[&str] = &["angry", "furious", "hate"];
const SAD_WORDS: &[&str] = &["sad", "niestety", "unfortunately", "sorry", "przykro"];
const DOUBT_WORDS: &[&str] = &["może", "maybe", "chyba", "perhaps", "wątpię"];

// Word stems, matched as prefixes.
const ANGER_STEMS: &[&str] = &["wściek", "nienawidz"];
const SAD_STEMS: &[&str] = &["smutn"];
const DOUBT_STEMS: &[&str] = &["hmm"];

// Multi-word phrases.
const SURPRISE_PHRASES: &[&str] = &["o rany"];
const DOUBT_PHRASES: &[&str] = &["nie wiem"];

/// Suggest an emotion tag for `text`. Pure and deterministic.
pub fn suggest_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let padded = format!(" {} ", words.join(" "));

    let has_word = |list: &[&str]| words.iter().any(|w| list.contains(w));
    let has_stem = |list: &[&str]| words.iter().any(|w| list.iter().any(|s| w.starts_with(s)));
    let has_phrase = |list: &[&str]| list.iter().any(|p| padded.contains(&format!(" {p} ")));

    if lower.contains("?!")
        || lower.contains("!?")
        || has_word(SURPRISE_WORDS)
        || has_phrase(SURPRISE_PHRASES)
    {
        return Emotion::Surprised;
    }
    if has_word(ANGER_WORDS) || has_stem(ANGER_STEMS) {
        return Emotion::Angry;
    }
    if has_word(SAD_WORDS) || has_stem(SAD_STEMS) {
        return Emotion::Sad;
    }
    if has_word(DOUBT_WORDS)
        || has_stem(DOUBT_STEMS)
        || has_phrase(DOUBT_PHRASES)
        || lower.contains('?')
    {
        return Emotion::Doubtful;
    }
    match lower.matches('!').count() {
        0 => Emotion::Neutral,
        1 | 2 => Emotion::Happy,
        _ => Emotion::Excited,
    }
}
