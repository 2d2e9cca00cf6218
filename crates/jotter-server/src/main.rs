mod cleanup;
mod config;

use std::path::Path;

use clap::Parser;
use tower_sessions::{Expiry, cookie::Key};
use tracing::{info, warn};

use jotter_db::{Database, SqliteStore};
use jotter_web::{AppStateInner, SessionSettings};

use crate::config::{Cli, Command, ServeArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jotter=debug,jotter_web=debug,jotter_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(&cli.db_path, args).await,
        Command::InitDb { reset } => init_db(&cli.db_path, reset),
    }
}

fn init_db(db_path: &Path, reset: bool) -> anyhow::Result<()> {
    let db = Database::open(db_path)?;
    if reset {
        db.reset()?;
        warn!("Database at {} was reset", db_path.display());
    }
    info!("Database ready at {}", db_path.display());
    Ok(())
}

async fn serve(db_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let addr = args.addr()?;

    let key = match args.session_key()? {
        Some(key) => key,
        None => {
            warn!("JOTTER_SESSION_SECRET is not set; using a random key, sessions end when the server restarts");
            Key::generate()
        }
    };

    // Init database
    let db = Database::open(db_path)?;
    let store = SqliteStore::new(db.clone());

    // Background sweep of expired sessions
    tokio::spawn(cleanup::run_session_cleanup(
        store.clone(),
        args.session_cleanup_secs,
    ));

    let app = jotter_web::app(
        AppStateInner::new(db),
        store,
        SessionSettings {
            key,
            expiry: Expiry::OnInactivity(time::Duration::hours(i64::from(args.session_ttl_hours))),
            secure: args.secure_cookies,
        },
    );

    info!("Jotter listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
