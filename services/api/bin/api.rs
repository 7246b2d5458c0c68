//! Main Entrypoint for the Intervu API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the database connection pool and running migrations.
//! 3. Initializing shared services (oracles, auth verifier, registry).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use intervu_api::{
    auth::IdentityProviderClient,
    config::{Config, Provider},
    db::Db,
    router::create_router,
    state::AppState,
    ws::registry::SessionRegistry,
};
use intervu_core::oracle::LlmOracle;
use sqlx::PgPool;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let db = Arc::new(Db::new(pool));
    db.run_migrations().await?;
    info!("Database connection established and migrations are up-to-date.");

    // --- 4. Initialize Shared Services ---
    let prompts = load_prompts(&config.prompts_path)?;
    let question_prompt = prompts
        .get("next_question")
        .context("next_question.md not found in prompts directory")?
        .clone();
    let evaluation_prompt = prompts
        .get("evaluate_transcript")
        .context("evaluate_transcript.md not found in prompts directory")?
        .clone();

    let api_key = match &config.provider {
        Provider::OpenAI => config
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY must be set for 'openai' provider")?,
        Provider::Groq => config
            .groq_api_key
            .clone()
            .context("GROQ_API_KEY must be set for 'groq' provider")?,
    };
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.provider.api_base());
    let oracle = Arc::new(LlmOracle::new(
        openai_config,
        config.chat_model.clone(),
        question_prompt,
        evaluation_prompt,
        config.oracle_timeout,
    ));

    let auth = Arc::new(IdentityProviderClient::new(
        config.auth_base_url.clone(),
        config.auth_api_key.clone(),
    ));

    let app_state = Arc::new(AppState {
        db,
        question_oracle: oracle.clone(),
        evaluation_oracle: oracle,
        auth,
        registry: Arc::new(SessionRegistry::new()),
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
