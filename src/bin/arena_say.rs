// Speak a line through the arena relay's TTS routes.
//
//   arena-say [--agent NAME] [--voice ID] [--emotion TAG] [--verbose] TEXT...

use std::process::ExitCode;
use std::sync::Arc;

use arena_relay::config::VoiceConfig;
use arena_relay::logging::init_logging;
use arena_relay::voice::{
    suggest_emotion, voice_for_agent, AudioOutput, CommandOutput, Emotion, PlaybackOutcome,
    TimedOutput, TtsClient, VoiceController,
};

#[derive(Debug, Default, PartialEq)]
struct SayArgs {
    agent: Option<String>,
    voice: Option<String>,
    emotion: Option<Emotion>,
    verbose: bool,
    text: String,
}

impl SayArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = SayArgs::default();
        let mut words = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{flag} needs a value"))
            };
            match arg.as_str() {
                "--agent" => parsed.agent = Some(value("--agent")?),
                "--voice" => parsed.voice = Some(value("--voice")?),
                "--emotion" => parsed.emotion = Some(value("--emotion")?.parse()?),
                "--verbose" | "-v" => parsed.verbose = true,
                _ => words.push(arg.clone()),
            }
        }
        parsed.text = words.join(" ");
        if parsed.text.trim().is_empty() {
            return Err("nothing to say".to_string());
        }
        Ok(parsed)
    }

    fn voice_id(&self) -> &str {
        match (&self.voice, &self.agent) {
            (Some(voice), _) => voice,
            (None, Some(agent)) => voice_for_agent(agent),
            (None, None) => arena_relay::voice::DEFAULT_VOICE_ID,
        }
    }

    fn emotion(&self) -> Emotion {
        self.emotion.unwrap_or_else(|| suggest_emotion(&self.text))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match SayArgs::parse(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("arena-say: {e}");
            eprintln!("usage: arena-say [--agent NAME] [--voice ID] [--emotion TAG] TEXT...");
            return ExitCode::from(2);
        }
    };
    init_logging(args.verbose);

    let config = VoiceConfig::from_env();
    let output: Arc<dyn AudioOutput> = match &config.play_command {
        Some(cmd) => Arc::new(CommandOutput::new(
            cmd.program.clone(),
            cmd.args.clone(),
            config.spool_dir.clone(),
        )),
        None => {
            tracing::warn!("ARENA_PLAY_CMD is not set; clips are timed but not played");
            Arc::new(TimedOutput)
        }
    };
    let client = match TtsClient::new(&config.arena_url) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let controller = Arc::new(VoiceController::new(client, output));

    let on_interrupt = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.stop();
        }
    });

    let emotion = args.emotion();
    tracing::info!(voice = args.voice_id(), %emotion, "speaking");
    match controller
        .speak(&args.text, Some(args.voice_id()), Some(emotion))
        .await
    {
        Ok(PlaybackOutcome::Finished) | Ok(PlaybackOutcome::Stopped) => ExitCode::SUCCESS,
        Ok(PlaybackOutcome::Failed(reason)) => {
            tracing::error!("playback failed: {reason}");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
