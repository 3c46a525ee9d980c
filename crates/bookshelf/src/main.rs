//! Bookshelf - REST API and seed importer for a small book catalog

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use bookshelf_api::{AppState, create_router};
use bookshelf_core::{
    ImportError, ImportJob, ImportReport, ImportStage, SeedSet, SeedSources, check_order,
};
use bookshelf_db::{Backend, Database};
use config::{Config, DatabaseOverrides, LogFormat};

/// Bookshelf - REST API over books, authors and genres
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(flatten)]
    database: DatabaseOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API
    Serve {
        /// Bind address
        #[arg(long, env = "BOOKSHELF_BIND")]
        bind: Option<String>,

        /// Port
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Load the seed collections into the store
    Import {
        /// Directory holding authors.json, genres.json and books.json
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Author collection, overriding the one in the seed directory
        #[arg(long)]
        authors: Option<PathBuf>,

        /// Genre collection, overriding the one in the seed directory
        #[arg(long)]
        genres: Option<PathBuf>,

        /// Book collection, overriding the one in the seed directory
        #[arg(long)]
        books: Option<PathBuf>,

        /// Parse and check the seed collections without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file only fills variables that are not already set
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    config.apply_overrides(&cli.database);

    // Initialize logging
    init_logging(&config.logging.level, config.logging.format);

    info!("Starting Bookshelf v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { bind, port } => serve(config, bind, port).await,
        Command::Import {
            dir,
            authors,
            genres,
            books,
            dry_run,
        } => {
            let mut sources = SeedSources::from_dir(dir.unwrap_or_else(|| config.import.dir.clone()));
            if let Some(authors) = authors {
                sources.authors = authors;
            }
            if let Some(genres) = genres {
                sources.genres = genres;
            }
            if let Some(books) = books {
                sources.books = books;
            }
            import(&config, &sources, dry_run).await
        }
    }
}

/// Open the store, creating the SQLite data directory if needed
async fn connect(config: &Config) -> Result<Database> {
    let options = config.database.connect_options()?;

    if let Backend::Sqlite { path } = &options.backend
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }

    Database::new(&options)
        .await
        .context("Failed to open the database")
}

async fn serve(config: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let db = connect(&config).await?;

    // Create router
    let state = AppState::new(db.clone());
    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = bind.unwrap_or(config.server.bind_address);
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_addr, port))?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn import(config: &Config, sources: &SeedSources, dry_run: bool) -> Result<()> {
    if dry_run {
        let seeds = SeedSet::load(sources).await?;
        check_order(&ImportStage::ORDER)?;
        for dangling in seeds.dangling_references() {
            warn!("{}", dangling);
        }
        println!("Dry run: would import {}", ImportReport::planned(&seeds));
        return Ok(());
    }

    let db = connect(config).await?;
    let result = ImportJob::new(db.clone()).run_from(sources).await;
    db.close().await;

    match result {
        Ok(report) => {
            println!("Imported {}", report);
            Ok(())
        }
        Err(e) => {
            if let ImportError::Insert { completed, .. } = &e {
                error!("Import stopped; already inserted {}", completed);
            }
            Err(e).context("Import failed")
        }
    }
}

/// Initialize logging
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
