use std::{env, path::PathBuf, time::Duration};

/// Attempt duration limit applied when `QUIZ_DURATION_SECS` is absent or unusable.
pub const DEFAULT_DURATION_SECS: u64 = 300;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_STATE_PATH: &str = ".quiz-master/state.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// AppConfig
///
/// Holds the client's entire configuration. Immutable once loaded and cloned
/// into `ClientState` so every view sees the same values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the quiz backend (no trailing slash).
    pub api_url: String,
    // Location of the persisted client-state document.
    pub state_path: PathBuf,
    // How long a student has to finish a quiz, anchored to the stored start time.
    pub attempt_duration: Duration,
    // Per-request timeout for backend calls.
    pub http_timeout: Duration,
    // Runtime environment marker. Controls log format and fail-fast rules.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context: local development against a backend on
/// localhost, or a deployed client that must be pointed at a real backend.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test setup.
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            attempt_duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables. Call `dotenv::dotenv()`
    /// first so a local `.env` file is honoured.
    ///
    /// # Panics
    /// Panics in production when `QUIZ_API_URL` is missing. A deployed client
    /// silently talking to localhost is worse than not starting.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_url = match env {
            Env::Production => {
                env::var("QUIZ_API_URL").expect("FATAL: QUIZ_API_URL must be set in production.")
            }
            Env::Local => env::var("QUIZ_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };

        let state_path = env::var("QUIZ_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            state_path,
            attempt_duration: Duration::from_secs(positive_secs(
                "QUIZ_DURATION_SECS",
                DEFAULT_DURATION_SECS,
            )),
            http_timeout: Duration::from_secs(positive_secs(
                "QUIZ_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            env,
        }
    }
}

// Zero and garbage both fall back to the default.
fn positive_secs(var: &str, default: u64) -> u64 {
    match env::var(var).ok().and_then(|raw| raw.trim().parse::<u64>().ok()) {
        Some(secs) if secs > 0 => secs,
        Some(_) | None => {
            if env::var(var).is_ok() {
                tracing::warn!(variable = var, default, "Ignoring unusable value");
            }
            default
        }
    }
}
