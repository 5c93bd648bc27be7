// HTTP client for the relay's text-to-speech routes.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{Voice, VoiceCatalog};
use super::emotion::Emotion;
use super::error::VoiceError;
use super::output::AudioClip;

/// Body of `POST /api/tts/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub speed: f64,
    pub pitch: f64,
    pub emotion: Emotion,
}

impl<'a> SpeechRequest<'a> {
    pub fn new(text: &'a str, voice_id: &'a str, emotion: Emotion) -> Self {
        Self {
            text,
            voice_id,
            speed: 1.0,
            pitch: 1.0,
            emotion,
        }
    }
}

/// Reply of `POST /api/tts/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSpeech {
    pub audio_data: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration_estimate: Option<f64>,
}

fn default_format() -> String {
    "audio/mp3".to_string()
}

impl GeneratedSpeech {
    /// Decode the base64 payload into a playable clip.
    pub fn into_clip(self) -> Result<AudioClip, VoiceError> {
        let bytes = BASE64_STANDARD.decode(self.audio_data.trim())?;
        if bytes.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }
        // Negative, NaN or out-of-range estimates count as no estimate.
        let duration = self
            .duration_estimate
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        Ok(AudioClip {
            bytes,
            format: self.format,
            duration,
            text_len: self.text.as_deref().map_or(0, |t| t.chars().count()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TtsClient {
    http: Client,
    base_url: Url,
}

impl TtsClient {
    pub fn new(base_url: &str) -> Result<Self, VoiceError> {
        let base_url =
            Url::parse(base_url).map_err(|e| VoiceError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(VoiceError::Url(format!("{base_url}: not a base URL")));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, VoiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VoiceError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn voices(&self) -> Result<Vec<Voice>, VoiceError> {
        let url = self.url(&["api", "tts", "voices"])?;
        let response = check(self.http.get(url).send().await?).await?;
        let catalog: VoiceCatalog = response.json().await?;
        Ok(catalog.voices)
    }

    pub async fn generate(&self, request: &SpeechRequest<'_>) -> Result<GeneratedSpeech, VoiceError> {
        let url = self.url(&["api", "tts", "generate"])?;
        let response = check(self.http.post(url).json(request).send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success reply into `VoiceError::Api` carrying the relay's `error` text.
async fn check(response: Response) -> Result<Response, VoiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(VoiceError::Api {
        status: status.as_u16(),
        message,
    })
}
