//! WolfDrop - Minimal Web File Drop
//!
//! Upload files through a form, list them, download them by name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfdrop::api::HttpServer;
use wolfdrop::config::{LoggingConfig, WolfDropConfig, CONFIG_TEMPLATE};
use wolfdrop::error::{Error, Result};
use wolfdrop::storage::StorageGateway;

/// WolfDrop - Minimal Web File Drop
#[derive(Parser)]
#[command(name = "wolfdrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "WOLFDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the file server
    Start {
        /// Storage directory, overrides storage.root
        #[arg(short, long, env = "WOLFDROP_STORAGE_DIR")]
        storage_dir: Option<PathBuf>,

        /// Address to listen on, overrides api.bind_address
        #[arg(long, env = "WOLFDROP_LISTEN")]
        listen: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfdrop.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show effective configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();

    // Initialize logging
    init_logging(&logging, cli.log_level.as_deref());

    match cli.command {
        Commands::Start { storage_dir, listen } => {
            run_start(loaded, storage_dir, listen).await
        }
        Commands::Init { output } => {
            run_init(output)
        }
        Commands::Validate => {
            run_validate(loaded)
        }
        Commands::Info => {
            run_info(loaded?)
        }
    }
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.format == "compact" {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load the configuration file, or defaults when none was given
fn load_config(path: Option<&Path>) -> Result<WolfDropConfig> {
    match path {
        Some(path) => WolfDropConfig::from_file(path),
        None => Ok(WolfDropConfig::default()),
    }
}

/// Start the file server
async fn run_start(
    loaded: Result<WolfDropConfig>,
    storage_dir: Option<PathBuf>,
    listen: Option<String>,
) -> Result<()> {
    tracing::info!("Starting WolfDrop...");

    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            tracing::error!("Please check that the config file exists and is valid TOML");
            return Err(e);
        }
    };

    if let Some(dir) = storage_dir {
        config.storage.root = dir;
    }
    if let Some(address) = listen {
        config.api.bind_address = address;
    }
    config.validate()?;

    // Storage root must exist before any request is served
    let gateway = match StorageGateway::new(&config.storage) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            tracing::error!(
                "Failed to prepare storage directory {:?}: {}",
                config.storage_root(),
                e
            );
            return Err(e);
        }
    };
    tracing::info!("Storing files in {}", gateway.root().display());

    let server = HttpServer::new(config.api.clone(), gateway);
    if let Err(e) = server.start(shutdown_signal()).await {
        tracing::error!("HTTP server error: {}", e);
        return Err(e);
    }

    tracing::info!("WolfDrop stopped");
    Ok(())
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    if output.exists() {
        return Err(Error::Config(format!(
            "{} already exists, refusing to overwrite",
            output.display()
        )));
    }

    std::fs::write(&output, CONFIG_TEMPLATE)?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit the file to choose the storage directory and listen address.");
    println!("Then start with: wolfdrop --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(loaded: Result<WolfDropConfig>) -> Result<()> {
    match loaded {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Storage Root: {}", config.storage_root().display());
            println!("  Bind Address: {}", config.api.bind_address);
            println!("  Upload Limit: {} MB", config.api.max_upload_mb);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show effective configuration
fn run_info(config: WolfDropConfig) -> Result<()> {
    println!("WolfDrop Configuration");
    println!("======================");
    println!();
    println!("Storage:");
    println!("  Root:           {}", config.storage_root().display());
    println!("  Fsync:          {}", config.storage.fsync);
    println!();
    println!("API:");
    println!("  Bind Address:   {}", config.api.bind_address);
    println!("  CORS:           {}", config.api.cors_enabled);
    println!("  Upload Limit:   {} MB", config.api.max_upload_mb);
    println!();
    println!("Logging:");
    println!("  Level:          {}", config.logging.level);
    println!("  Format:         {}", config.logging.format);
    println!();
    println!("As TOML:");
    println!("{}", config.to_toml()?);

    Ok(())
}
