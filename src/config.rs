// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_ARENA_URL: &str = "http://localhost:3000";

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the arena backend, without a trailing slash.
    pub backend_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Per-request timeout for backend calls. `None` waits indefinitely.
    pub backend_timeout: Option<Duration>,
    /// Directory containing pre-built frontend files to serve.
    /// When set, unmatched paths fall through to static file serving.
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            port: 3000,
            backend_timeout: None,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `BACKEND_URL` - arena backend base URL (default: `http://localhost:8000`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `BACKEND_TIMEOUT_SECS` - optional timeout for backend calls
    /// - `STATIC_DIR` - Path to frontend dist directory for static file serving
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--backend <URL>` - Override the backend URL
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let backend_url = parse_cli_value(&args, "--backend")
            .or_else(|| std::env::var("BACKEND_URL").ok())
            .map(|v| normalize_base_url(&v))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let backend_timeout = std::env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| parse_timeout_secs(&v));

        let static_dir = std::env::var("STATIC_DIR").ok().map(PathBuf::from);

        Config {
            backend_url,
            port,
            backend_timeout,
            static_dir,
        }
    }
}

/// Configuration for the `arena-say` voice client.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Base URL of the relay serving `/api/tts/*`.
    pub arena_url: String,
    /// External player program. Without one, clips are only timed.
    pub play_command: Option<PlayCommand>,
    /// Where clips are written before the player picks them up.
    pub spool_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl VoiceConfig {
    /// Environment variables:
    /// - `ARENA_URL` - relay base URL (default: `http://localhost:3000`)
    /// - `ARENA_PLAY_CMD` / `ARENA_PLAY_ARGS` - player program and its arguments
    /// - `ARENA_SPOOL_DIR` - spool directory (default: system temp dir)
    pub fn from_env() -> Self {
        let arena_url = std::env::var("ARENA_URL")
            .map(|v| normalize_base_url(&v))
            .unwrap_or_else(|_| DEFAULT_ARENA_URL.to_string());
        let play_command = std::env::var("ARENA_PLAY_CMD")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(|program| PlayCommand {
                program: program.trim().to_string(),
                args: std::env::var("ARENA_PLAY_ARGS")
                    .map(|raw| parse_list(&raw))
                    .unwrap_or_default(),
            });
        let spool_dir = std::env::var("ARENA_SPOOL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        VoiceConfig {
            arena_url,
            play_command,
            spool_dir,
        }
    }
}

/// Parse a CLI flag value like `--port 8080`.
pub fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find_map(|pair| {
        if pair[0] == flag {
            Some(pair[1].clone())
        } else {
            None
        }
    })
}

/// Whole seconds, greater than zero.
fn parse_timeout_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
