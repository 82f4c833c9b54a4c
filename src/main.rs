use std::sync::Arc;

use mongodb::Client;
use subject_registry::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{MongoRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Entry point: configuration, logging, database, indexes, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter. RUST_LOG wins, with a sensible local default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subject_registry=debug,tower_http=info,axum=trace".into());

    // 3. Log format follows the environment: pretty for humans locally, JSON for
    // log aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database client. The client owns the connection pool; it is handed to
    // the repository explicitly rather than living in any global.
    let client = Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("FATAL: Failed to connect to MongoDB. Check MONGO_URI.");
    let db = client.database(&config.db_name);

    let repo = MongoRepository::new(&db);

    // 5. Unique indexes on username and subjectCode. These are the source of
    // truth for uniqueness; creation is idempotent.
    repo.ensure_indexes()
        .await
        .expect("FATAL: Failed to create unique indexes.");

    let repo = Arc::new(repo) as RepositoryState;

    // 6. State assembly and server startup.
    let port = config.port;
    let app_state = AppState { repo, config };
    let app = create_router(app_state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: Failed to bind listener port.");

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!("API documentation available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server terminated unexpectedly.");
}
