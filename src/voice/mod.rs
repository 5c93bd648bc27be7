// Voice playback: catalog lookup, speech synthesis through the relay, and a
// single-session audio controller.
//
// At most one clip plays at a time. Starting a new `speak` stops the clip
// that is currently playing before the new one starts.

pub mod catalog;
pub mod client;
pub mod emotion;
pub mod error;
pub mod output;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

pub use catalog::{resolve_voice, voice_for_agent, Voice, DEFAULT_VOICE_ID};
pub use client::{GeneratedSpeech, SpeechRequest, TtsClient};
pub use emotion::{suggest_emotion, Emotion};
pub use error::VoiceError;
pub use output::{
    AudioClip, AudioOutput, CommandOutput, Playback, PlaybackOutcome, PlaybackSignals,
    StopHandle, TimedOutput,
};

struct ActivePlayback {
    id: u64,
    stop: StopHandle,
}

#[derive(Default)]
struct Session {
    loading: usize,
    current: Option<ActivePlayback>,
}

/// Owns the voice catalog cache and the one active playback.
pub struct VoiceController {
    client: TtsClient,
    output: Arc<dyn AudioOutput>,
    voices: OnceCell<Vec<Voice>>,
    session: Mutex<Session>,
    next_id: AtomicU64,
}

impl VoiceController {
    pub fn new(client: TtsClient, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            client,
            output,
            voices: OnceCell::new(),
            session: Mutex::new(Session::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The voice catalog, fetched on first use. Failed fetches are retried on the next call.
    pub async fn voices(&self) -> Result<&[Voice], VoiceError> {
        self.voices
            .get_or_try_init(|| self.client.voices())
            .await
            .map(Vec::as_slice)
    }

    pub fn is_loading(&self) -> bool {
        self.session().loading > 0
    }

    pub fn is_playing(&self) -> bool {
        self.session().current.is_some()
    }

    /// Halt the current clip, if any. Returns whether something was playing.
    pub fn stop(&self) -> bool {
        let active = self.session().current.take();
        match active {
            Some(active) => {
                tracing::debug!(playback = active.id, "stopping playback");
                active.stop.stop();
                true
            }
            None => false,
        }
    }

    /// Synthesize `text` and play it, resolving once playback ends.
    ///
    /// `voice_id` falls back to [`DEFAULT_VOICE_ID`] when absent or unknown to
    /// the catalog; `emotion` defaults to [`suggest_emotion`].
    pub async fn speak(
        &self,
        text: &str,
        voice_id: Option<&str>,
        emotion: Option<Emotion>,
    ) -> Result<PlaybackOutcome, VoiceError> {
        self.stop();

        let clip = {
            let _loading = LoadingGuard::enter(self);
            let requested = voice_id.unwrap_or(DEFAULT_VOICE_ID);
            let voice = match self.voices().await {
                Ok(catalog) => resolve_voice(requested, catalog),
                Err(e) => {
                    tracing::warn!("voice catalog unavailable, using default voice: {e}");
                    DEFAULT_VOICE_ID
                }
            };
            if voice != requested {
                tracing::info!(requested, voice, "voice not in catalog, falling back");
            }
            let emotion = emotion.unwrap_or_else(|| suggest_emotion(text));
            let request = SpeechRequest::new(text, voice, emotion);
            self.client.generate(&request).await?.into_clip()?
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (Playback { stop, done }, signals) = Playback::channel();
        {
            let mut session = self.session();
            // Another speak may have started while this one was loading.
            if let Some(previous) = session.current.replace(ActivePlayback { id, stop }) {
                previous.stop.stop();
            }
        }
        // Started outside the lock; a stop issued in between is seen by the output.
        if let Err(e) = self.output.play(clip, signals) {
            self.release(id);
            return Err(e);
        }
        tracing::debug!(playback = id, "playback started");

        let outcome = done
            .await
            .unwrap_or_else(|_| PlaybackOutcome::Failed("player ended without a result".into()));

        self.release(id);
        tracing::debug!(playback = id, ?outcome, "playback ended");
        Ok(outcome)
    }

    /// Forget playback `id` unless a newer one has replaced it.
    fn release(&self, id: u64) {
        let mut session = self.session();
        if session.current.as_ref().is_some_and(|c| c.id == id) {
            session.current = None;
        }
    }
}

/// Keeps the loading flag raised for as long as it lives.
struct LoadingGuard<'a>(&'a VoiceController);

impl<'a> LoadingGuard<'a> {
    fn enter(controller: &'a VoiceController) -> Self {
        controller.session().loading += 1;
        Self(controller)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.session().loading -= 1;
    }
}
