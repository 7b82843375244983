//! Startup: load the escrow program, build the validator, serve HTTP.

use crate::api::{run_http_server, AppState};
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use makan_algod::AlgodClient;
use makan_escrow::{EscrowAuthority, Validator};
use std::sync::Arc;

/// Load the escrow authority named by the config.
///
/// Fails if the program is missing, empty, or compiles to an address
/// other than the one the node reports.
pub async fn load_authority(config: &ServerConfig) -> Result<EscrowAuthority> {
    let source = config.program_source()?;
    let algod = AlgodClient::new(&config.algod.url, &config.algod.token);
    EscrowAuthority::load(&source, &algod)
        .await
        .context("Failed to load escrow program")
}

/// Build the validator and its shared request state.
pub fn build_state(config: &ServerConfig, authority: EscrowAuthority) -> Result<Arc<AppState>> {
    let listings = config.listing_book().context("Invalid listings")?;
    let validator = Validator::new(Arc::new(authority), listings, config.limits());
    Ok(Arc::new(AppState {
        validator: Arc::new(validator),
        allowed_origin: config.allowed_origin()?,
    }))
}

/// Run the co-signer. Blocks until the listener fails.
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("Makan co-signer starting…");
    log::info!("  Bind:       {}", config.server.bind);
    log::info!("  Algod:      {}", config.algod.url);
    log::info!("  Max fee:    {} microAlgos", config.policy.max_fee);
    log::info!(
        "  Payment leg: {}",
        if config.policy.require_payment_leg {
            "required"
        } else {
            "optional"
        }
    );

    // The program must be loaded before the listener is bound.
    let authority = load_authority(&config).await?;
    log::info!("  Escrow:     {}", authority.address());

    let state = build_state(&config, authority)?;
    for listing in state.validator.listings().iter() {
        log::info!(
            "  Listing:    asset {} at {} microAlgos x{}{}",
            listing.asset_id,
            listing.price,
            listing.amount,
            if listing.sold { " (sold)" } else { "" }
        );
    }

    run_http_server(config.bind_addr()?, state).await
}
