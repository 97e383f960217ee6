//! ideaboard HTTP server.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ideaboard_api::{cors_layer, router, ApiConfig, AppState};
use ideaboard_db::{Database, FilesystemObjectStore, PoolConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FORMAT  - "json" or "text" (default: "text")
    // LOG_FILE    - path to log file, enables daily rotation
    // RUST_LOG    - env filter (default: "ideaboard_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ideaboard_api=debug,ideaboard_db=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("ideaboard-api.log");
        let (non_blocking, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(file_dir, file_name));

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ApiConfig::from_env()?;

    let db = Database::connect_with_config(
        &config.database_url,
        PoolConfig::new().max_connections(config.db_max_connections),
    )
    .await?;
    info!(max_connections = config.db_max_connections, "Connected to database");

    if config.run_migrations {
        db.migrate().await?;
        info!("Migrations applied");
    }

    let files = FilesystemObjectStore::new(&config.object_store_path, &config.public_files_url);
    files.validate().await?;
    info!(
        path = %config.object_store_path,
        public_url = %config.public_files_url,
        "Object store ready"
    );

    let state =
        AppState::from_database(db, Arc::new(files)).with_max_upload_bytes(config.max_upload_bytes);
    let app = router(state).layer(cors_layer(&config.cors_allowed_origins));

    let addr = config.bind_addr();
    info!("Starting ideaboard API on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
