//! Makan Server: escrow co-signer for the property marketplace
//!
//! Validates asset-transfer transactions against the configured listings
//! and co-signs conforming ones with the escrow's logic signature.
//!
//! # Usage
//!
//! ```bash
//! makan-server --config /path/to/makan-server.toml
//! makan-server --validate  # Validate config and exit
//! makan-server --address   # Print the escrow address and exit
//! ```

use anyhow::{Context, Result};
use makan_server::{config, service};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI args (minimal, no clap)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/config/makan-server.toml");
    let mut validate_only = false;
    let mut address_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--address" => {
                address_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("makan-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    // Load config
    let mut server_config = config::ServerConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    server_config.apply_env_overrides();

    // Validate
    server_config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &server_config.server.log_level);
    env_logger::init();

    if validate_only {
        println!("✅ Configuration is valid.");
        println!("  Bind:          {}", server_config.server.bind);
        println!("  Algod:         {}", server_config.algod.url);
        println!("  Escrow:        {:?}", server_config.program_source()?);
        println!("  Max fee:       {}", server_config.policy.max_fee);
        println!(
            "  Payment leg:   {}",
            server_config.policy.require_payment_leg
        );
        println!("  Listings:      {}", server_config.listings.len());
        return Ok(());
    }

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    if address_only {
        let authority = rt.block_on(service::load_authority(&server_config))?;
        println!("{}", authority.address());
        return Ok(());
    }

    // Install Ctrl-C handler for graceful shutdown
    let shutdown = rt.block_on(async {
        tokio::select! {
            result = service::run(server_config) => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received shutdown signal. Exiting…");
                Ok(())
            }
        }
    });

    if let Err(e) = shutdown {
        log::error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Makan Server: escrow co-signer for tokenized property sales

USAGE:
    makan-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /config/makan-server.toml)
    --validate            Validate config file and exit
    --address             Load the escrow program, print its address and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    MAKAN_BIND                 Listen address (host:port)
    MAKAN_LOG_LEVEL            Log level (error/warn/info/debug/trace)
    MAKAN_ALLOWED_ORIGIN       CORS allowed origin
    MAKAN_ALGOD_URL            Algod node URL
    MAKAN_ALGOD_TOKEN          Algod API token
    MAKAN_ESCROW_PROGRAM       Compiled escrow program (base64 or raw)
    MAKAN_ESCROW_TEAL          Escrow TEAL source (compiled at startup)
    MAKAN_MAX_FEE              Maximum fee the escrow pays, in microAlgos
    MAKAN_REQUIRE_PAYMENT_LEG  Require the payment leg with each request (true/false)

EXAMPLES:
    # Run the co-signer
    makan-server --config /path/to/config.toml

    # Print the escrow address to fund and opt in
    makan-server --config config.toml --address

    # Validate configuration
    makan-server --config config.toml --validate
"#
    );
}
