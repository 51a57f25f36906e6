//! Query bridge CLI binary: config loading, tracing init, and the exit
//! codes that live outside the core (design §1, §9.3).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use deadpool_postgres::{ManagerConfig, RecyclingMethod, Runtime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{ConfigLoadError, FileConfig};

#[derive(Parser)]
#[command(name = "qbridge")]
#[command(author, version, about = "Query bridge server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the config file, connect to the database, and serve HTTP.
    Serve {
        /// Path to the TOML config file (design §9.3).
        #[arg(short, long, value_name = "FILE", env = "QBRIDGE_CONFIG")]
        config: PathBuf,
    },
    /// Load and validate the config file without starting the server.
    Check {
        #[arg(short, long, value_name = "FILE", env = "QBRIDGE_CONFIG")]
        config: PathBuf,
    },
}

/// Exit codes for the bundled CLI bootstrap (design §9.3): `0` clean, `1`
/// configuration error, `2` bind/runtime failure.
const EXIT_CLEAN: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_SERVER_ERROR: u8 = 2;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error("config file has no database_url set")]
    MissingDatabaseUrl,

    #[error("failed to build the database connection pool: {0}")]
    Pool(#[from] deadpool_postgres::CreatePoolError),

    #[error(transparent)]
    Server(#[from] qbridge_server::ServerError),
}

impl CliError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Server(_) => EXIT_SERVER_ERROR,
            Self::Config(_) | Self::MissingDatabaseUrl | Self::Pool(_) => EXIT_CONFIG_ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::from(EXIT_CLEAN),
        Err(err) => {
            let code = err.exit_code();
            // anyhow only at this reporting boundary (design §9.2): the
            // terminal wants the message chain, the match above wants the
            // variant.
            eprintln!("Error: {:#}", anyhow::Error::from(err));
            ExitCode::from(code)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "qbridge=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Check { config } => {
            FileConfig::load(&config)?;
            tracing::info!(path = %config.display(), "config file is valid");
            Ok(())
        }
        Commands::Serve { config } => serve(&config).await,
    }
}

async fn serve(path: &Path) -> Result<(), CliError> {
    let file_config = FileConfig::load(path)?;

    if file_config.database_url.is_empty() {
        return Err(CliError::MissingDatabaseUrl);
    }

    let mut pool_config = deadpool_postgres::Config::new();
    pool_config.url = Some(file_config.database_url.clone());
    pool_config.manager = Some(ManagerConfig { recycling_method: RecyclingMethod::Fast });
    pool_config.pool = Some(deadpool_postgres::PoolConfig::new(file_config.pool_max_size));
    let pool = pool_config.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)?;

    let query_timeout = std::time::Duration::from_millis(file_config.query_timeout_ms);
    let executor = Arc::new(qbridge_core::PgExecutor::new(pool, query_timeout));
    let named_config = Arc::new(file_config.named_config());
    let server_config = file_config.server_config();

    let server = qbridge_server::Server::new(server_config, executor, named_config);
    server.serve().await?;
    Ok(())
}
