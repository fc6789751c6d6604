use quiz_master::{
    ClientState,
    config::{AppConfig, Env},
    console::Console,
};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, wires the client state and hands the
/// terminal to the console until the user quits.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and quiet HTTP internals.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quiz_master=debug,reqwest=info".into());

    // 3. Initialize Logging based on Environment.
    // Logs go to stderr so they never interleave with the console on stdout.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    tracing::info!("Client starting in {:?} mode", config.env);
    tracing::info!(api_url = %config.api_url, state = %config.state_path.display(), "Configuration loaded");

    // 4. Unified State Assembly
    let state = match ClientState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "FATAL: Failed to initialise client state");
            std::process::exit(1);
        }
    };

    // 5. Console Loop
    let stdin = BufReader::new(tokio::io::stdin());
    let mut console = Console::new(state, stdin, std::io::stdout());

    if let Err(e) = console.run().await {
        tracing::error!(error = %e, "Console stopped");
        std::process::exit(1);
    }

    tracing::info!("Goodbye");
}
