use std::sync::Arc;

// --- Module Structure ---

// Core client services and components.
pub mod api;
pub mod attempt;
pub mod authoring;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod session;
pub mod storage;

// Navigation between views (Login, Home, Dashboard, Quiz, AddQuiz).
pub mod routing;

// Line-oriented terminal front end built on the modules above.
pub mod console;

// --- Public Re-exports ---

// Makes core state types easily accessible to the binary entry point (main.rs).
pub use api::{ApiState, HttpQuizApi, MockQuizApi, QuizApi};
pub use clock::{Clock, ClockState, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::ClientError;
pub use storage::{FileStateStore, MemoryStateStore, StateStore, StoreState};

/// ClientState
///
/// The single cloneable container holding every collaborator a view needs:
/// the quiz backend, the persisted client state, the wall clock, and the
/// loaded configuration. Views receive it explicitly instead of reaching for
/// ambient globals.
#[derive(Clone)]
pub struct ClientState {
    /// Quiz backend access (HTTP in production, in-memory in tests).
    pub api: ApiState,
    /// Persisted client state: session identity and attempt start times.
    pub store: StoreState,
    /// Wall clock used to anchor attempt deadlines.
    pub clock: ClockState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl ClientState {
    /// Wires the production collaborators from a loaded configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, ClientError> {
        let api = Arc::new(HttpQuizApi::new(&config.api_url, config.http_timeout)?) as ApiState;
        let store = Arc::new(FileStateStore::open(&config.state_path)?) as StoreState;
        let clock = Arc::new(SystemClock) as ClockState;

        Ok(Self {
            api,
            store,
            clock,
            config,
        })
    }
}
