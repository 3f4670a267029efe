//! FHIR Query Builder CLI application
//!
//! Command-line interface for inspecting FHIR server capabilities and
//! building, previewing, and running search queries.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library (module is public but not re-exported)
use fhir_query_builder::cli::{
    handle_capabilities, handle_init, handle_params, handle_query, handle_servers, Cli, Commands,
};
use fhir_query_builder::config::AppConfig;
use fhir_query_builder::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.is_timeout() {
            eprintln!("The server did not answer in time; raise [client] request_timeout in the config file");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Secrets referenced as env:NAME may live in .env
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // init writes the config file, so it runs on defaults
    let config = match cli.command {
        Commands::Init => AppConfig::default(),
        _ => AppConfig::load(cli.global.config.clone()).await?,
    };
    init_logging(&cli, Some(&config.logging.level));

    info!("FHIR Query Builder v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Servers => handle_servers(&config),
        Commands::Capabilities(args) => {
            info!("Executing capabilities command");
            handle_capabilities(&config, args).await
        }
        Commands::Params(args) => {
            info!("Executing params command");
            handle_params(&config, args).await
        }
        Commands::Query(args) => {
            info!("Executing query command");
            handle_query(&config, args).await
        }
        Commands::Init => handle_init().await,
    }
}

/// Initialize logging from CLI verbosity flags, falling back to the configured level
fn init_logging(cli: &Cli, configured_level: Option<&str>) {
    let level = match configured_level.and_then(|l| l.parse::<tracing::Level>().ok()) {
        Some(level) if !cli.has_verbosity_flag() => level,
        _ => cli.log_level(),
    };

    // RUST_LOG, when set, takes precedence
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fhir_query_builder={}",
            level.to_string().to_lowercase()
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
