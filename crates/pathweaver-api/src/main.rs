//! Pathweaver API server entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use pathweaver_api::config::AppConfig;
use pathweaver_api::state::AppState;
use pathweaver_api::telemetry;
use pathweaver_core::clock::SystemClock;
use pathweaver_core::id::RandomIdGenerator;
use pathweaver_core::sleeper::TokioSleeper;
use pathweaver_generator::OpenAiStructuredGenerator;
use pathweaver_media::{FsAssetInventory, HttpAssetRenderer};
use pathweaver_story::application::completion_gate::PollingCompletionGate;
use pathweaver_story::application::orchestrator::{StoryOrchestrator, StoryPorts};
use pathweaver_store::pg_story_repository::PgStoryRepository;
use pathweaver_store::schema;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Pathweaver API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    schema::run_migrations(&pool).await?;

    // Wire the engine.
    let story_repository = Arc::new(PgStoryRepository::new(pool));
    let inventory = Arc::new(FsAssetInventory::new(&config.asset_root));
    let completion_gate = PollingCompletionGate::new(
        inventory,
        Arc::new(TokioSleeper),
        config.settings.poll_interval,
        config.settings.max_poll_iterations,
    );
    let ports = StoryPorts {
        generator: Arc::new(OpenAiStructuredGenerator::new(config.generator.clone())),
        repository: story_repository.clone(),
        renderer: Arc::new(HttpAssetRenderer::new(
            &config.image_endpoint,
            &config.audio_endpoint,
        )),
        completion_gate: Arc::new(completion_gate),
        clock: Arc::new(SystemClock),
        ids: Arc::new(Mutex::new(RandomIdGenerator)),
    };
    let orchestrator = Arc::new(StoryOrchestrator::new(ports, config.settings.clone()));
    let app_state = AppState::new(story_repository, orchestrator);

    if config.cors_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing any origin");
    }
    let app = pathweaver_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(pathweaver_api::cors_layer(&config.cors_origins));

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    telemetry::shutdown(tracer_provider);
    Ok(())
}
