pub mod config;
pub mod db;
pub mod import;
pub mod middleware;
pub mod migrate;
pub mod movies;
pub mod recommendations;
pub mod server;
pub mod util;

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use db::MovieRepo;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] db::DbError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("{0}")]
    Migrate(#[from] migrate::MigrateError),
    #[error("Import failed: {0}")]
    Import(#[from] import::ImportError),
    #[error("Server error: {0}")]
    Server(String),
}

/// Installs the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init_logging(debug: bool, json: bool) {
    let default_filter = if debug {
        "moviedex_rs=debug,tower_http=debug"
    } else {
        "moviedex_rs=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn database_path(config: &config::Config) -> Result<String, ServerError> {
    config
        .get_database_path()
        .ok_or_else(|| ServerError::Server("No database path configured".to_string()))
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let config = config::Config::from_file(config_path)?;

    info!("Using config file: {}", config_path);
    if debug_logs {
        info!("Debug logging enabled");
    }

    let db_path = database_path(&config)?;

    info!("Opening database at {}", db_path);
    let db = Arc::new(
        db::SqliteRepository::new(&db_path)
            .await
            .map_err(ServerError::StoreUnavailable)?,
    );

    let count = db.count_movies().await?;
    info!("Found {} movies in the database", count);
    if !db.genre_index_exists().await? {
        info!("No genre token index yet, genre lookups need the migrate-genres job");
    }

    let recommendations = match config.recommendations {
        Some(ref rec) => {
            info!("Proxying recommendations to {}", rec.url);
            let proxy = recommendations::RecommendationProxy::new(rec)
                .map_err(|e| ServerError::Server(format!("Failed to create HTTP client: {}", e)))?;
            Some(Arc::new(proxy))
        }
        None => None,
    };

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let state = server::AppState::new(db, recommendations);
    let app = server::build_router(state);

    match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert_path), Some(key_path)) => {
            info!("Loading TLS certificate from {}", cert_path);
            info!("Loading TLS key from {}", key_path);

            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

            info!("Serving HTTPS on {}", addr);

            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
        _ => {
            info!("Serving HTTP on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

            axum::serve(listener, app)
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
    }

    Ok(())
}

/// One-shot genre tokenization job.
pub async fn migrate_genres(
    config_path: &str,
    batch_size: Option<u32>,
) -> Result<migrate::MigrationReport, ServerError> {
    let config = config::Config::from_file(config_path)?;
    let db_path = database_path(&config)?;
    let batch_size = batch_size.unwrap_or(config.migration.batch_size);

    info!("Migrating genres in {} (batch size {})", db_path, batch_size);
    let report = migrate::run(&db_path, batch_size).await?;
    info!("Modified docs: {}", report.modified_count);

    Ok(report)
}

pub async fn import_file(config_path: &str, file: &str, batch_size: usize) -> Result<u64, ServerError> {
    let config = config::Config::from_file(config_path)?;
    let db_path = database_path(&config)?;

    let db = db::SqliteRepository::new(&db_path)
        .await
        .map_err(ServerError::StoreUnavailable)?;

    let reader = BufReader::new(File::open(file).map_err(import::ImportError::Io)?);
    let result = import::import_jsonl(&db, reader, batch_size).await;
    db.close().await;

    let imported = result?;
    info!("Imported {} movies from {}", imported, file);
    Ok(imported)
}
