// Local route table: every arena feature area and the backend call it relays to.

use axum::routing::MethodFilter;
use serde_json::json;

use crate::relay::{ActionRelay, Relay, RelayRoute};
use crate::voice::DEFAULT_VOICE_ID;

/// One local endpoint served by the relay.
#[derive(Debug, Clone)]
pub struct LocalRoute {
    pub path: &'static str,
    pub method: MethodFilter,
    pub relay: Relay,
}

impl LocalRoute {
    fn post(path: &'static str, relay: impl Into<Relay>) -> Self {
        Self {
            path,
            method: MethodFilter::POST,
            relay: relay.into(),
        }
    }

    fn get(path: &'static str, relay: impl Into<Relay>) -> Self {
        Self {
            path,
            method: MethodFilter::GET,
            relay: relay.into(),
        }
    }

    fn delete(path: &'static str, relay: impl Into<Relay>) -> Self {
        Self {
            path,
            method: MethodFilter::DELETE,
            relay: relay.into(),
        }
    }

    /// Names of `{param}` captures in the local path.
    pub fn path_params(&self) -> Vec<&'static str> {
        self.path
            .split('/')
            .filter_map(|s| s.strip_prefix('{')?.strip_suffix('}'))
            .collect()
    }
}

pub fn relay_table() -> Vec<LocalRoute> {
    let mut table = Vec::new();
    table.extend(chat_routes());
    table.extend(history_routes());
    table.extend(gladiator_routes());
    table.extend(karaoke_routes());
    table.extend(tsunami_routes());
    table.extend(ufo_conspiracy_routes());
    table.extend(tts_routes());
    table
}

// ── Chat ──────────────────────────────────────────────────────────────

fn chat_routes() -> Vec<LocalRoute> {
    vec![
        LocalRoute::post(
            "/api/chat",
            RelayRoute::post("/api/chat/normal")
                .named("chat")
                .require(["query"])
                .with_default("agent_type", "normal")
                .forward_fields(["query", "agent_type", "session_id"])
                .on_failure("Failed to get response from agent"),
        ),
        LocalRoute::post(
            "/api/split-dialog",
            RelayRoute::post("/api/chat/split-dialog")
                .named("split_dialog")
                .require(["topic"])
                .with_default("max_turns", 5)
                .forward_fields(["topic", "max_turns"])
                .on_failure("Failed to generate split dialog"),
        ),
        LocalRoute::post(
            "/api/doubt-agent",
            RelayRoute::post("/api/chat/doubt-agent")
                .named("doubt_agent")
                .require(["query"])
                .with_default("doubt_level", 0.5)
                .forward_fields(["query", "doubt_level"])
                .on_failure("Failed to get response from doubting agent"),
        ),
        LocalRoute::get(
            "/api/agents",
            RelayRoute::get("/api/chat/agents")
                .named("agents")
                .on_failure("Failed to fetch agents"),
        ),
        LocalRoute::get(
            "/api/chat/stats",
            RelayRoute::get("/api/chat/stats")
                .named("chat.stats")
                .on_failure("Failed to fetch chat statistics"),
        ),
    ]
}

// ── History ───────────────────────────────────────────────────────────

fn history_routes() -> Vec<LocalRoute> {
    vec![
        LocalRoute::get(
            "/api/history/chat",
            RelayRoute::get("/api/history/chat")
                .named("history.chat")
                .forward_fields(["limit", "offset", "agent_type", "session_id", "date_from", "date_to"])
                .on_failure("Failed to fetch chat history"),
        ),
        LocalRoute::delete(
            "/api/history/chat/{message_id}",
            RelayRoute::delete("/api/history/chat/{message_id}")
                .named("history.delete_message")
                .require(["message_id"])
                .on_failure("Failed to delete message"),
        ),
        LocalRoute::get(
            "/api/history/sessions",
            RelayRoute::get("/api/history/sessions")
                .named("history.sessions")
                .forward_fields(["limit", "offset", "is_active"])
                .on_failure("Failed to fetch dialog sessions"),
        ),
        LocalRoute::get(
            "/api/history/sessions/{session_id}",
            RelayRoute::get("/api/history/sessions/{session_id}")
                .named("history.session")
                .require(["session_id"])
                .on_failure("Failed to fetch session details"),
        ),
        LocalRoute::delete(
            "/api/history/sessions/{session_id}",
            RelayRoute::delete("/api/history/sessions/{session_id}")
                .named("history.delete_session")
                .require(["session_id"])
                .on_failure("Failed to delete session"),
        ),
        LocalRoute::get(
            "/api/history/stats",
            RelayRoute::get("/api/history/stats/overview")
                .named("history.stats")
                .forward_fields(["days"])
                .on_failure("Failed to fetch history statistics"),
        ),
        LocalRoute::post(
            "/api/history/export",
            RelayRoute::post("/api/history/export")
                .named("history.export")
                .with_default("format", "json")
                .forward_fields(["format", "session_id", "agent_type", "date_from", "date_to"])
                .on_failure("Failed to export history"),
        ),
    ]
}

// ── Gladiator ─────────────────────────────────────────────────────────

fn gladiator_routes() -> Vec<LocalRoute> {
    let battle = ActionRelay::new()
        .action(
            "start",
            RelayRoute::post("/api/gladiator/start-battle")
                .named("gladiator.start")
                .require(["topic"])
                .with_default("agent1", "Adam")
                .with_default("agent2", "Beata")
                .with_default("max_rounds", 5)
                .with_default("absurdity_start_level", 0.1)
                .forward_fields([
                    "topic",
                    "agent1",
                    "agent2",
                    "max_rounds",
                    "absurdity_start_level",
                ])
                .on_failure("Failed to start battle"),
        )
        .action(
            "next_round",
            RelayRoute::post("/api/gladiator/next-round")
                .named("gladiator.next_round")
                .require(["battle_id"])
                .forward_fields(["battle_id"])
                .in_query()
                .on_failure("Failed to generate next round"),
        )
        .action(
            "vote",
            RelayRoute::post("/api/gladiator/vote")
                .named("gladiator.vote")
                .require(["battle_id", "round_number", "voted_agent"])
                .with_default("voter_id", "anonymous")
                .forward_fields(["battle_id", "round_number", "voted_agent", "voter_id"])
                .on_failure("Failed to record vote"),
        );

    vec![
        LocalRoute::post("/api/gladiator", battle),
        LocalRoute::get(
            "/api/gladiator/history",
            RelayRoute::get("/api/gladiator/battle-history")
                .named("gladiator.history")
                .with_default("limit", 10)
                .forward_fields(["limit"])
                .on_failure("Failed to fetch battle history"),
        ),
        LocalRoute::get(
            "/api/gladiator/stats",
            RelayRoute::get("/api/gladiator/arena-stats")
                .named("gladiator.stats")
                .on_failure("Failed to fetch arena stats"),
        ),
    ]
}

// ── Karaoke ───────────────────────────────────────────────────────────

fn karaoke_routes() -> Vec<LocalRoute> {
    let night = ActionRelay::new()
        .action(
            "start",
            RelayRoute::post("/api/karaoke/start-night")
                .named("karaoke.start")
                .require(["theme"])
                .with_default("participants", json!(["Adam", "Beata", "Wątpiący"]))
                .with_default("max_songs", 3)
                .forward_fields(["theme", "participants", "max_songs"])
                .on_failure("Failed to start karaoke night"),
        )
        .action(
            "next",
            RelayRoute::post("/api/karaoke/next-performance")
                .named("karaoke.next")
                .require(["night_id"])
                .forward_fields(["night_id"])
                .in_query()
                .on_failure("Failed to generate next performance"),
        )
        .action(
            "vote",
            RelayRoute::post("/api/karaoke/audience-vote")
                .named("karaoke.vote")
                .require(["night_id", "performance_id", "performer", "score"])
                .with_default("voter_id", "anonymous")
                .forward_fields(["night_id", "performance_id", "performer", "score", "voter_id"])
                .on_failure("Failed to record audience vote"),
        );

    vec![
        LocalRoute::post("/api/karaoke", night),
        LocalRoute::get(
            "/api/karaoke/songs",
            RelayRoute::get("/api/karaoke/song-suggestions")
                .named("karaoke.songs")
                .on_failure("Failed to fetch song suggestions"),
        ),
    ]
}

// ── Tsunami ───────────────────────────────────────────────────────────

fn tsunami_routes() -> Vec<LocalRoute> {
    let tsunami = ActionRelay::new()
        .action(
            "start",
            RelayRoute::post("/api/tsunami/start-tsunami")
                .named("tsunami.start")
                .forward_fields(Vec::<String>::new())
                .on_failure("Failed to start tsunami"),
        )
        .action(
            "next_round",
            RelayRoute::post("/api/tsunami/next-round")
                .named("tsunami.next_round")
                .require(["session_id"])
                .forward_fields(["session_id"])
                .in_query()
                .on_failure("Failed to advance tsunami"),
        )
        .action(
            "vote",
            RelayRoute::post("/api/tsunami/vote-best-deception")
                .named("tsunami.vote")
                .require(["session_id", "winner"])
                .forward_fields(["session_id", "winner"])
                .in_query()
                .on_failure("Failed to record vote"),
        );

    vec![
        LocalRoute::post("/api/tsunami", tsunami),
        LocalRoute::get(
            "/api/tsunami/status/{session_id}",
            RelayRoute::get("/api/tsunami/tsunami-status/{session_id}")
                .named("tsunami.status")
                .require(["session_id"])
                .on_failure("Failed to fetch tsunami status"),
        ),
    ]
}

// ── UFO conspiracy ────────────────────────────────────────────────────

fn ufo_conspiracy_routes() -> Vec<LocalRoute> {
    let conspiracy = ActionRelay::new()
        .action(
            "start",
            RelayRoute::post("/api/ufo-conspiracy/start-ufo-conspiracy")
                .named("ufo.start")
                .forward_fields(Vec::<String>::new())
                .on_failure("Failed to start UFO conspiracy"),
        )
        .action(
            "next_round",
            RelayRoute::post("/api/ufo-conspiracy/next-ufo-round")
                .named("ufo.next_round")
                .require(["session_id"])
                .forward_fields(["session_id"])
                .in_query()
                .on_failure("Failed to advance UFO conspiracy"),
        )
        .action(
            "vote",
            RelayRoute::post("/api/ufo-conspiracy/vote-conspiracy-master")
                .named("ufo.vote")
                .require(["session_id", "winner"])
                .forward_fields(["session_id", "winner"])
                .in_query()
                .on_failure("Failed to record vote"),
        );

    vec![
        LocalRoute::post("/api/ufo-conspiracy", conspiracy),
        LocalRoute::get(
            "/api/ufo-conspiracy/status/{session_id}",
            RelayRoute::get("/api/ufo-conspiracy/ufo-conspiracy-status/{session_id}")
                .named("ufo.status")
                .require(["session_id"])
                .on_failure("Failed to fetch UFO conspiracy status"),
        ),
    ]
}

// ── Text-to-speech ────────────────────────────────────────────────────

fn tts_routes() -> Vec<LocalRoute> {
    vec![
        LocalRoute::post(
            "/api/tts/generate",
            RelayRoute::post("/api/tts/generate")
                .named("tts.generate")
                .require(["text"])
                .with_default("voice_id", DEFAULT_VOICE_ID)
                .with_default("speed", 1.0)
                .with_default("pitch", 1.0)
                .with_default("emotion", "neutral")
                .forward_fields(["text", "voice_id", "speed", "pitch", "emotion"])
                .on_failure("Failed to generate speech"),
        ),
        LocalRoute::get(
            "/api/tts/preview/{voice_id}",
            RelayRoute::get("/api/tts/preview/{voice_id}")
                .named("tts.preview")
                .require(["voice_id"])
                .on_failure("Failed to generate preview"),
        ),
        LocalRoute::get(
            "/api/tts/voices",
            RelayRoute::get("/api/tts/voices")
                .named("tts.voices")
                .on_failure("Failed to fetch voices"),
        ),
        LocalRoute::post(
            "/api/tts/emotion-mapping",
            RelayRoute::post("/api/tts/emotion-mapping")
                .named("tts.emotion_mapping")
                .forward_fields(Vec::<String>::new())
                .on_failure("Failed to fetch emotion mapping"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_local_endpoints_are_unique() {
        let table = relay_table();
        let endpoints: HashSet<(&str, String)> = table
            .iter()
            .map(|r| (r.path, format!("{:?}", r.method)))
            .collect();
        assert_eq!(endpoints.len(), table.len());
    }

    #[test]
    fn test_local_method_matches_backend_method() {
        for local in relay_table() {
            for (_, route) in local.relay.routes() {
                let expected = match route.method().as_str() {
                    "GET" => MethodFilter::GET,
                    "DELETE" => MethodFilter::DELETE,
                    _ => MethodFilter::POST,
                };
                assert_eq!(local.method, expected, "{}", local.path);
            }
        }
    }

    #[test]
    fn test_route_names_are_unique() {
        let table = relay_table();
        let names: Vec<&str> = table
            .iter()
            .flat_map(|r| r.relay.routes())
            .map(|(_, route)| route.name())
            .collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_path_params_are_required_and_forwarded() {
        for local in relay_table() {
            for param in local.path_params() {
                for (_, route) in local.relay.routes() {
                    assert!(
                        route.required().iter().any(|k| k == param),
                        "{} must require {param}",
                        local.path
                    );
                    assert!(route.backend_path().contains(&format!("{{{param}}}")));
                }
            }
        }
    }

    #[test]
    fn test_multiplexed_areas() {
        let table = relay_table();
        let actions = |path: &str| -> Vec<String> {
            table
                .iter()
                .find(|r| r.path == path)
                .map(|r| {
                    r.relay
                        .routes()
                        .into_iter()
                        .filter_map(|(a, _)| a.map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };
        assert_eq!(actions("/api/gladiator"), ["start", "next_round", "vote"]);
        assert_eq!(actions("/api/karaoke"), ["start", "next", "vote"]);
        assert_eq!(actions("/api/tsunami"), ["start", "next_round", "vote"]);
        assert_eq!(actions("/api/ufo-conspiracy"), ["start", "next_round", "vote"]);
    }
}
