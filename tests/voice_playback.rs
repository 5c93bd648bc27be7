use std::sync::Arc;
use std::time::Duration;

use arena_relay::voice::{
    Emotion, PlaybackOutcome, TimedOutput, TtsClient, VoiceController, VoiceError,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use httpmock::prelude::*;
use serde_json::json;

fn speech(text: &str, voice_id: &str, seconds: f64) -> serde_json::Value {
    json!({
        "audio_data": BASE64_STANDARD.encode(b"ID3 not really an mp3"),
        "format": "audio/mp3",
        "voice_id": voice_id,
        "text": text,
        "duration_estimate": seconds
    })
}

async fn mock_catalog(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tts/voices");
            then.status(200).json_body(json!({
                "voices": [
                    { "voice_id": "adam", "name": "Adam", "language": "pl-PL" },
                    { "voice_id": "beata", "name": "Beata", "language": "pl-PL" },
                    { "voice_id": "wapiacy", "name": "Wątpiący", "language": "pl-PL" }
                ]
            }));
        })
        .await
}

fn controller(server: &MockServer) -> Arc<VoiceController> {
    let client = TtsClient::new(&server.base_url()).unwrap();
    Arc::new(VoiceController::new(client, Arc::new(TimedOutput)))
}

async fn wait_until_playing(controller: &VoiceController) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !controller.is_playing() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("playback never started");
}

#[tokio::test]
async fn test_new_speech_stops_the_previous_one() {
    let server = MockServer::start_async().await;
    let catalog = mock_catalog(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tts/generate")
                .body_contains("first line");
            then.status(200).json_body(speech("first line", "adam", 30.0));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tts/generate")
                .body_contains("second line");
            then.status(200).json_body(speech("second line", "beata", 0.05));
        })
        .await;

    let voice = controller(&server);
    let first = tokio::spawn({
        let voice = voice.clone();
        async move { voice.speak("first line", Some("adam"), None).await }
    });
    wait_until_playing(&voice).await;

    let second = voice
        .speak("second line", Some("beata"), Some(Emotion::Happy))
        .await
        .unwrap();

    assert_eq!(first.await.unwrap().unwrap(), PlaybackOutcome::Stopped);
    assert_eq!(second, PlaybackOutcome::Finished);
    assert!(!voice.is_playing());
    assert!(!voice.is_loading());
    assert_eq!(catalog.hits_async().await, 1);
}

#[tokio::test]
async fn test_unknown_voice_falls_back_to_default() {
    let server = MockServer::start_async().await;
    mock_catalog(&server).await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tts/generate")
                .body_contains(r#""voice_id":"adam""#)
                .body_contains(r#""emotion":"doubtful""#);
            then.status(200).json_body(speech("Naprawdę?", "adam", 0.01));
        })
        .await;

    let voice = controller(&server);
    let outcome = voice.speak("Naprawdę?", Some("robot"), None).await.unwrap();

    assert_eq!(outcome, PlaybackOutcome::Finished);
    generate.assert_async().await;
}

#[tokio::test]
async fn test_catalog_failure_still_speaks_with_default_voice() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tts/voices");
            then.status(500).json_body(json!({ "error": "catalog down" }));
        })
        .await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tts/generate")
                .body_contains(r#""voice_id":"adam""#);
            then.status(200).json_body(speech("hej", "adam", 0.01));
        })
        .await;

    let voice = controller(&server);
    assert!(voice.voices().await.is_err());
    let outcome = voice.speak("hej", Some("beata"), None).await.unwrap();

    assert_eq!(outcome, PlaybackOutcome::Finished);
    generate.assert_async().await;
}

#[tokio::test]
async fn test_stop_halts_playback() {
    let server = MockServer::start_async().await;
    mock_catalog(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/tts/generate");
            then.status(200).json_body(speech("long story", "adam", 30.0));
        })
        .await;

    let voice = controller(&server);
    assert!(!voice.stop());

    let playing = tokio::spawn({
        let voice = voice.clone();
        async move { voice.speak("long story", None, None).await }
    });
    wait_until_playing(&voice).await;

    assert!(voice.stop());
    assert_eq!(playing.await.unwrap().unwrap(), PlaybackOutcome::Stopped);
    assert!(!voice.is_playing());
}

#[tokio::test]
async fn test_generation_error_is_reported() {
    let server = MockServer::start_async().await;
    mock_catalog(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/tts/generate");
            then.status(500).json_body(json!({ "error": "Failed to generate speech" }));
        })
        .await;

    let voice = controller(&server);
    let result = voice.speak("hej", None, None).await;

    match result {
        Err(VoiceError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to generate speech");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
    assert!(!voice.is_loading());
    assert!(!voice.is_playing());
}

#[tokio::test]
async fn test_catalog_is_cached() {
    let server = MockServer::start_async().await;
    let catalog = mock_catalog(&server).await;

    let voice = controller(&server);
    let first: Vec<String> = voice
        .voices()
        .await
        .unwrap()
        .iter()
        .map(|v| v.voice_id.clone())
        .collect();
    let second = voice.voices().await.unwrap().len();

    assert_eq!(first, ["adam", "beata", "wapiacy"]);
    assert_eq!(second, 3);
    assert_eq!(catalog.hits_async().await, 1);
}

#[tokio::test]
async fn test_out_of_range_duration_estimate_is_ignored() {
    let server = MockServer::start_async().await;
    mock_catalog(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/tts/generate");
            then.status(200).json_body(json!({
                "audio_data": "eA==",
                "format": "audio/mp3",
                "text": "hej",
                "duration_estimate": 1e30
            }));
        })
        .await;

    let voice = controller(&server);
    let speaking = tokio::spawn({
        let voice = voice.clone();
        async move { voice.speak("hej", None, None).await }
    });

    let outcome = speaking.await.expect("speak task panicked").unwrap();
    assert_eq!(outcome, PlaybackOutcome::Finished);
}
