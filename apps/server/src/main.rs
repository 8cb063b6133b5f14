use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use zoro_auth::Authenticator;
use zoro_config::{load as load_config, AppConfig};
use zoro_database::initialize_database;
use zoro_gateway::{build_router, spawn_expiry_sweeper, AppState};
use zoro_runtime::{telemetry, BackendServices};
use zoro_suggestions::{ContextMessage, SuggestionRequest};

const COFFEE_SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(name = "zoro-server")]
#[command(about = "Zoro team chat backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create an administrator, or promote an existing account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print reply suggestions for a message
    Suggest {
        message: String,
        /// Earlier lines of the conversation, oldest first
        #[arg(long)]
        context: Vec<String>,
        /// Ask the AI provider first
        #[arg(long)]
        ai: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Migrate => migrate(config).await,
        Commands::CreateAdmin { email, password } => create_admin(config, &email, &password).await,
        Commands::Suggest {
            message,
            context,
            ai,
        } => suggest(config, message, context, ai).await,
    }
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("starting Zoro backend");

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        &config,
        services.db_pool.clone(),
        services.cipher.clone(),
        services.orchestrator.clone(),
        services.suggestions.clone(),
    );

    let sweeper = spawn_expiry_sweeper(state.clone(), COFFEE_SWEEP_INTERVAL);
    let purger = spawn_session_purger(state.authenticator().clone());
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(zoro_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    sweeper.abort();
    purger.abort();
    info!("backend shut down");
    Ok(())
}

fn spawn_session_purger(authenticator: Authenticator) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match authenticator.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired sessions purged"),
                Err(error) => warn!(%error, "session purge failed"),
            }
        }
    })
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    initialize_database(&config.database)
        .await
        .context("failed to migrate database")?;
    info!(url = %config.database.url, "database is up to date");
    Ok(())
}

async fn create_admin(config: AppConfig, email: &str, password: &str) -> anyhow::Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("failed to open database")?;
    let authenticator = Authenticator::new(pool, config.auth.clone());

    let user = authenticator
        .create_admin(email, password)
        .await
        .context("failed to create admin")?;

    println!("admin ready: {} ({})", user.email, user.public_id);
    Ok(())
}

async fn suggest(
    config: AppConfig,
    message: String,
    context: Vec<String>,
    ai: bool,
) -> anyhow::Result<()> {
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let mut request = SuggestionRequest::new(message);
    request.context = context
        .into_iter()
        .map(|line| ContextMessage::new(None, line))
        .collect();

    let response = if ai {
        services.suggestions.suggest_ai(&request).await
    } else {
        services.suggestions.suggest(&request).await
    }
    .context("suggestion request rejected")?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
