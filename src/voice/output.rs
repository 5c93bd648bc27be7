// Audio outputs: where a decoded clip actually gets played.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::VoiceError;

/// Playback time assumed per character when the backend gives no estimate.
const MILLIS_PER_CHAR: u64 = 100;

/// A decoded, playable audio payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    /// MIME type reported by the backend, e.g. `audio/mp3`.
    pub format: String,
    pub duration: Option<Duration>,
    /// Character count of the spoken text.
    pub text_len: usize,
}

impl AudioClip {
    pub fn extension(&self) -> &'static str {
        match self.format.as_str() {
            "audio/mp3" | "audio/mpeg" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            _ => "bin",
        }
    }

    pub fn estimated_duration(&self) -> Duration {
        self.duration
            .unwrap_or_else(|| Duration::from_millis(MILLIS_PER_CHAR * self.text_len as u64))
    }
}

/// How a playback ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Stopped,
    Failed(String),
}

/// Stop signal for a running playback. Dropping it also stops playback.
#[derive(Debug)]
pub struct StopHandle(oneshot::Sender<()>);

impl StopHandle {
    pub fn stop(self) {
        let _ = self.0.send(());
    }
}

/// Caller side of a running playback.
#[derive(Debug)]
pub struct Playback {
    pub stop: StopHandle,
    pub done: oneshot::Receiver<PlaybackOutcome>,
}

/// Output side of a running playback, held by the task that plays the clip.
#[derive(Debug)]
pub struct PlaybackSignals {
    pub stop: oneshot::Receiver<()>,
    pub done: oneshot::Sender<PlaybackOutcome>,
}

impl Playback {
    pub fn channel() -> (Playback, PlaybackSignals) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        (
            Playback {
                stop: StopHandle(stop_tx),
                done: done_rx,
            },
            PlaybackSignals {
                stop: stop_rx,
                done: done_tx,
            },
        )
    }
}

/// Something that can play a clip. `play` must return promptly; the clip
/// plays in the background until it ends or `signals.stop` fires, and the
/// outcome is sent on `signals.done`.
pub trait AudioOutput: Send + Sync {
    fn play(&self, clip: AudioClip, signals: PlaybackSignals) -> Result<(), VoiceError>;
}

/// True when the stop signal already fired, or its handle was dropped.
fn stop_requested(stop: &mut oneshot::Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(oneshot::error::TryRecvError::Empty))
}

/// Holds each clip for its estimated duration without producing sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedOutput;

impl AudioOutput for TimedOutput {
    fn play(&self, clip: AudioClip, signals: PlaybackSignals) -> Result<(), VoiceError> {
        let duration = clip.estimated_duration();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = tokio::time::sleep(duration) => PlaybackOutcome::Finished,
                _ = signals.stop => PlaybackOutcome::Stopped,
            };
            let _ = signals.done.send(outcome);
        });
        Ok(())
    }
}

/// Spools each clip to disk and hands it to an external player program.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    program: String,
    args: Vec<String>,
    spool_dir: PathBuf,
}

impl CommandOutput {
    pub fn new(program: impl Into<String>, args: Vec<String>, spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            spool_dir: spool_dir.into(),
        }
    }
}

impl AudioOutput for CommandOutput {
    fn play(&self, clip: AudioClip, mut signals: PlaybackSignals) -> Result<(), VoiceError> {
        if stop_requested(&mut signals.stop) {
            let _ = signals.done.send(PlaybackOutcome::Stopped);
            return Ok(());
        }
        std::fs::create_dir_all(&self.spool_dir)?;
        let path = self
            .spool_dir
            .join(format!("arena-{}.{}", Uuid::new_v4(), clip.extension()));
        std::fs::write(&path, &clip.bytes)?;

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(e.into());
            }
        };
        tracing::debug!(program = %self.program, file = %path.display(), "player started");

        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = signals.stop => None,
            };
            let outcome = match exited {
                Some(Ok(status)) if status.success() => PlaybackOutcome::Finished,
                Some(Ok(status)) => PlaybackOutcome::Failed(format!("player exited with {status}")),
                Some(Err(e)) => PlaybackOutcome::Failed(e.to_string()),
                None => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("failed to kill player: {e}");
                    }
                    PlaybackOutcome::Stopped
                }
            };
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!("could not remove spooled clip {}: {e}", path.display());
            }
            let _ = signals.done.send(outcome);
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(output: &dyn AudioOutput, clip: AudioClip) -> Playback {
        let (playback, signals) = Playback::channel();
        output.play(clip, signals).unwrap();
        playback
    }

    fn clip(duration: Option<Duration>) -> AudioClip {
        AudioClip {
            bytes: vec![1, 2, 3],
            format: "audio/mp3".into(),
            duration,
            text_len: 12,
        }
    }

    #[test]
    fn test_extension() {
        let mut c = clip(None);
        assert_eq!(c.extension(), "mp3");
        c.format = "audio/x-wav".into();
        assert_eq!(c.extension(), "wav");
        c.format = "application/octet-stream".into();
        assert_eq!(c.extension(), "bin");
    }

    #[test]
    fn test_estimated_duration() {
        assert_eq!(clip(None).estimated_duration(), Duration::from_millis(1200));
        assert_eq!(
            clip(Some(Duration::from_millis(50))).estimated_duration(),
            Duration::from_millis(50)
        );
    }

    #[tokio::test]
    async fn test_timed_output_finishes() {
        let playback = start(&TimedOutput, clip(Some(Duration::from_millis(10))));
        assert_eq!(playback.done.await.unwrap(), PlaybackOutcome::Finished);
    }

    #[tokio::test]
    async fn test_timed_output_stops_early() {
        let Playback { stop, done } = start(&TimedOutput, clip(Some(Duration::from_secs(60))));
        stop.stop();
        assert_eq!(done.await.unwrap(), PlaybackOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_dropping_stop_handle_stops() {
        let Playback { stop, done } = start(&TimedOutput, clip(Some(Duration::from_secs(60))));
        drop(stop);
        assert_eq!(done.await.unwrap(), PlaybackOutcome::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_runs_player_and_cleans_up() {
        let spool = tempfile::tempdir().unwrap();
        let output = CommandOutput::new("true", vec![], spool.path());
        let playback = start(&output, clip(None));
        assert_eq!(playback.done.await.unwrap(), PlaybackOutcome::Finished);
        assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_reports_failure() {
        let spool = tempfile::tempdir().unwrap();
        let output = CommandOutput::new("false", vec![], spool.path());
        let playback = start(&output, clip(None));
        assert!(matches!(
            playback.done.await.unwrap(),
            PlaybackOutcome::Failed(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_stop_kills_player() {
        let spool = tempfile::tempdir().unwrap();
        // The spool path lands in $1 and is ignored.
        let output = CommandOutput::new(
            "sh",
            vec!["-c".into(), "sleep 30".into(), "player".into()],
            spool.path(),
        );
        let Playback { stop, done } = start(&output, clip(None));
        stop.stop();
        assert_eq!(done.await.unwrap(), PlaybackOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_command_output_missing_program() {
        let spool = tempfile::tempdir().unwrap();
        let output = CommandOutput::new("definitely-not-a-player-xyz", vec![], spool.path());
        let (_playback, signals) = Playback::channel();
        let result = output.play(clip(None), signals);
        assert!(matches!(result, Err(VoiceError::Io(_))));
        assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_stopped_before_start_spawns_nothing() {
        let spool = tempfile::tempdir().unwrap();
        let output = CommandOutput::new("sh", vec!["-c".into(), "sleep 30".into()], spool.path());
        let (Playback { stop, done }, signals) = Playback::channel();
        stop.stop();
        output.play(clip(None), signals).unwrap();
        assert_eq!(done.await.unwrap(), PlaybackOutcome::Stopped);
        assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
    }
}
