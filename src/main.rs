mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod importer;
mod mail;
mod middleware;
mod models;
mod policy;
mod routes;
mod services;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use clap::{Parser, Subcommand};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use importer::EntityKind;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Review catalog: REST API server and data loader
#[derive(Parser, Debug)]
#[command(name = "review_catalog")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Create or update the database schema and exit
    Migrate,

    /// Load one CSV file of the given kind
    Import {
        /// category, genre, user, title, genre_title, review or comment
        kind: String,
        /// Path to the CSV file
        csv: PathBuf,
    },

    /// Load the standard CSV set from a directory in dependency order
    ImportAll {
        /// Directory holding category.csv, genre.csv, users.csv, ...
        dir: PathBuf,
    },
}

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Keep the guard alive for the whole process so file logs get flushed
    let _guard = tracing_config::init_tracing();

    let cli = Cli::parse();
    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = db::schema::run_migrations(&pool).await {
        tracing::error!("Failed to apply the database schema: {:?}", err);
        std::process::exit(1);
    }

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, pool).await,
        Commands::Migrate => {
            tracing::info!("Schema is up to date");
            Ok(())
        }
        Commands::Import { kind, csv } => import(pool, &kind, &csv).await,
        Commands::ImportAll { dir } => import_all(pool, &dir).await,
    };

    if let Err(err) = result {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn serve(config: Config, pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let origin = config.frontend_url.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client: DBClient::new(pool),
    };

    let app = routes::create_router(app_state).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn import(
    pool: PgPool,
    kind: &str,
    csv: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: EntityKind = kind.parse()?;
    let store = DBClient::new(pool);
    let summary = importer::import_file(&store, kind, csv).await?;
    println!(
        "{}: {} rows read, {} inserted, {} skipped",
        summary.kind,
        summary.rows,
        summary.inserted,
        summary.skipped()
    );
    Ok(())
}

async fn import_all(pool: PgPool, dir: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = DBClient::new(pool);
    for summary in importer::import_all(&store, dir).await? {
        println!(
            "{}: {} rows read, {} inserted, {} skipped",
            summary.kind,
            summary.rows,
            summary.inserted,
            summary.skipped()
        );
    }
    Ok(())
}
