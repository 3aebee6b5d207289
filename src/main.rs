//! Service pair entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use appstack::api::{create_backend_router, create_frontend_router, BackendState, FrontendState};
use appstack::config::Config;
use appstack::db::{self, DatabaseConfig, SqlServerProbe};
use appstack::metrics;
use appstack::remote::BoundedClient;
use appstack::secrets::{IdentityEndpoint, ManagedIdentityCredential, SecretSource};
use appstack::utils::shutdown_signal;

/// Frontend/backend service pair.
#[derive(Parser, Debug)]
#[command(name = "appstack")]
#[command(about = "Frontend and backend HTTP services with cascading health checks")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the frontend service.
    Frontend {
        /// HTTP listen port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Backend base URL (overrides BACKEND_API_URL).
        #[arg(long)]
        backend_url: Option<String>,
    },

    /// Run the backend service.
    Backend {
        /// HTTP listen port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Resolve the database configuration once and print it.
    ResolveDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (reads .env, so RUST_LOG below sees it)
    let mut config = Config::load()?;

    init_logging(&config, args.verbose);

    match args.command {
        Command::Frontend { port, backend_url } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(url) = backend_url {
                config.backend_api_url = url;
            }
            cmd_frontend(config).await
        }
        Command::Backend { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            cmd_backend(config).await
        }
        Command::CheckConfig => cmd_check_config(config),
        Command::ResolveDb => cmd_resolve_db(config).await,
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("appstack=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    tracing_subscriber::registry()
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(|| fmt::layer()))
        .with(filter)
        .init();
}

fn validated(
    config: Config,
    check: fn(&Config) -> appstack::Result<()>,
) -> anyhow::Result<Config> {
    if let Err(e) = check(&config) {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }
    Ok(config)
}

fn start_metrics(config: &Config) {
    metrics::init_metrics();
    if config.metrics_enabled {
        if let Err(e) = metrics::install_exporter(config.metrics_port) {
            warn!("Failed to start Prometheus exporter: {}", e);
        }
    }
}

async fn serve(router: axum::Router, port: u16, name: &str) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("{} listening on {}", name, addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{} stopped", name);
    Ok(())
}

async fn resolve_database(config: &Config, http: &reqwest::Client) -> DatabaseConfig {
    db::resolve(SecretSource::from_config(config, http)).await
}

/// Run the frontend service.
async fn cmd_frontend(config: Config) -> anyhow::Result<()> {
    let config = validated(config, Config::validate_frontend)?;
    start_metrics(&config);

    let timeout = Duration::from_millis(config.backend_timeout_ms);
    let client = BoundedClient::new(config.backend_base_url(), timeout)?;
    info!(
        backend = %client.base_url(),
        timeout_ms = config.backend_timeout_ms,
        "Backend client configured"
    );

    let router = create_frontend_router(FrontendState::new(client));
    serve(router, config.port, "Frontend").await
}

/// Run the backend service.
async fn cmd_backend(config: Config) -> anyhow::Result<()> {
    let config = validated(config, Config::validate_backend)?;
    start_metrics(&config);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let database = resolve_database(&config, &http).await;

    let credential = Arc::new(ManagedIdentityCredential::from_config(http, &config));
    let probe = SqlServerProbe::new(
        credential,
        Duration::from_millis(config.db_connect_timeout_ms),
    );

    let router = create_backend_router(BackendState::new(database, Arc::new(probe)));
    serve(router, config.port, "Backend").await
}

/// Check configuration validity.
fn cmd_check_config(config: Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("APPSTACK - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  Backend URL: {}", config.backend_base_url());
    println!("  Backend Timeout: {}ms", config.backend_timeout_ms);
    println!(
        "  SQL Connection String: {}",
        if config.connection_string().is_some() { "present" } else { "not set" }
    );
    match config.vault_name() {
        Some(name) if config.vault_name_is_valid() => println!("  Key Vault: {}", name),
        Some(name) => println!(
            "  Key Vault: {} (WARNING: not a valid vault name, lookup will be skipped)",
            name
        ),
        None => println!("  Key Vault: not set"),
    }
    match IdentityEndpoint::from_config(&config) {
        IdentityEndpoint::AppService { url, .. } => {
            println!("  Managed Identity: App Service ({})", url)
        }
        IdentityEndpoint::Imds { .. } => println!("  Managed Identity: instance metadata service"),
    }
    println!(
        "  Metrics: {}",
        if config.metrics_enabled {
            format!("enabled on port {}", config.metrics_port)
        } else {
            "disabled".to_string()
        }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Resolve the database configuration and print the descriptor.
async fn cmd_resolve_db(config: Config) -> anyhow::Result<()> {
    let config = validated(config, Config::validate_backend)?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    match resolve_database(&config, &http).await.descriptor() {
        Some(descriptor) => println!("{}", serde_json::to_string_pretty(descriptor)?),
        None => println!("not configured"),
    }

    Ok(())
}
