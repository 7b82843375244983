//! Server configuration, parsed from a TOML file plus environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use makan_core::Address;
use makan_escrow::{Listing, ListingBook, ProgramSource, TransferLimits, DEFAULT_MAX_FEE};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSection,

    /// Algod node used to compile TEAL source
    #[serde(default)]
    pub algod: AlgodSection,

    /// Where the escrow program comes from
    pub escrow: EscrowSection,

    /// Transfer limits beyond the listing rules
    #[serde(default)]
    pub policy: PolicySection,

    /// Assets the escrow may release
    #[serde(default = "default_listings")]
    pub listings: Vec<ListingEntry>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Value of `Access-Control-Allow-Origin` for the storefront
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// Algod node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgodSection {
    #[serde(default = "default_algod_url")]
    pub url: String,

    /// API token; empty for public nodes
    #[serde(default)]
    pub token: String,
}

impl Default for AlgodSection {
    fn default() -> Self {
        Self {
            url: default_algod_url(),
            token: String::new(),
        }
    }
}

/// Escrow program location. Exactly one of `program` and `teal` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscrowSection {
    /// Compiled program (base64 text or raw bytes)
    pub program: Option<PathBuf>,

    /// TEAL source, compiled through the algod node at startup
    pub teal: Option<PathBuf>,
}

/// Transfer limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    /// Highest fee (microAlgos) the escrow will pay per transfer
    #[serde(default = "default_max_fee")]
    pub max_fee: u64,

    /// Refuse asset legs submitted without their payment leg
    #[serde(default)]
    pub require_payment_leg: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            max_fee: default_max_fee(),
            require_payment_leg: false,
        }
    }
}

/// One `[[listings]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingEntry {
    pub asset_id: u64,

    /// Price in microAlgos
    pub price: u64,

    #[serde(default = "default_amount")]
    pub amount: u64,

    /// Payment receiver; the escrow address when unset
    pub payee: Option<String>,

    pub app_id: Option<u64>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub sold: bool,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_bind() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

fn default_algod_url() -> String {
    "https://testnet-api.algonode.cloud".to_string()
}

fn default_max_fee() -> u64 {
    DEFAULT_MAX_FEE
}

fn default_amount() -> u64 {
    1
}

fn default_listings() -> Vec<ListingEntry> {
    vec![ListingEntry {
        asset_id: 755121764,
        price: 450_000,
        amount: 1,
        payee: None,
        app_id: Some(756218220),
        title: String::new(),
        sold: false,
    }]
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `MAKAN_BIND`
    /// - `MAKAN_LOG_LEVEL`
    /// - `MAKAN_ALLOWED_ORIGIN`
    /// - `MAKAN_ALGOD_URL`
    /// - `MAKAN_ALGOD_TOKEN`
    /// - `MAKAN_ESCROW_TEAL` (replaces `escrow.program`)
    /// - `MAKAN_ESCROW_PROGRAM` (replaces `escrow.teal`; wins over `MAKAN_ESCROW_TEAL`)
    /// - `MAKAN_MAX_FEE`
    /// - `MAKAN_REQUIRE_PAYMENT_LEG`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MAKAN_BIND") {
            self.server.bind = v;
        }
        if let Ok(v) = std::env::var("MAKAN_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("MAKAN_ALLOWED_ORIGIN") {
            self.server.allowed_origin = v;
        }
        if let Ok(v) = std::env::var("MAKAN_ALGOD_URL") {
            self.algod.url = v;
        }
        if let Ok(v) = std::env::var("MAKAN_ALGOD_TOKEN") {
            self.algod.token = v;
        }
        if let Ok(v) = std::env::var("MAKAN_ESCROW_TEAL") {
            self.escrow.teal = Some(PathBuf::from(v));
            self.escrow.program = None;
        }
        if let Ok(v) = std::env::var("MAKAN_ESCROW_PROGRAM") {
            self.escrow.program = Some(PathBuf::from(v));
            self.escrow.teal = None;
        }
        if let Ok(v) = std::env::var("MAKAN_MAX_FEE") {
            if let Ok(fee) = v.parse::<u64>() {
                self.policy.max_fee = fee;
            }
        }
        if let Ok(v) = std::env::var("MAKAN_REQUIRE_PAYMENT_LEG") {
            if let Ok(required) = v.parse::<bool>() {
                self.policy.require_payment_leg = required;
            }
        }
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("server.bind is not a socket address: {}", self.server.bind))
    }

    pub fn allowed_origin(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.server.allowed_origin).with_context(|| {
            format!(
                "server.allowed_origin is not a valid header value: {}",
                self.server.allowed_origin
            )
        })
    }

    pub fn program_source(&self) -> Result<ProgramSource> {
        match (&self.escrow.program, &self.escrow.teal) {
            (Some(program), None) => Ok(ProgramSource::Compiled(program.clone())),
            (None, Some(teal)) => Ok(ProgramSource::Teal(teal.clone())),
            (Some(_), Some(_)) => anyhow::bail!("set only one of escrow.program and escrow.teal"),
            (None, None) => anyhow::bail!("one of escrow.program or escrow.teal is required"),
        }
    }

    pub fn limits(&self) -> TransferLimits {
        TransferLimits {
            max_fee: self.policy.max_fee,
            require_payment_leg: self.policy.require_payment_leg,
        }
    }

    /// Build the listing book, resolving payee addresses.
    pub fn listing_book(&self) -> Result<ListingBook> {
        let listings = self
            .listings
            .iter()
            .map(|entry| -> Result<Listing> {
                let payee = entry
                    .payee
                    .as_deref()
                    .map(|text| {
                        text.parse::<Address>().with_context(|| {
                            format!("listing {}: invalid payee address", entry.asset_id)
                        })
                    })
                    .transpose()?;
                Ok(Listing {
                    asset_id: entry.asset_id,
                    price: entry.price,
                    amount: entry.amount,
                    payee,
                    app_id: entry.app_id,
                    title: entry.title.clone(),
                    sold: entry.sold,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ListingBook::new(listings)?)
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        self.allowed_origin()?;

        let source = self.program_source()?;
        if matches!(source, ProgramSource::Teal(_)) {
            anyhow::ensure!(
                !self.algod.url.is_empty(),
                "algod.url is required to compile escrow.teal"
            );
        }

        // The escrow must be able to pay at least the minimum fee
        anyhow::ensure!(
            self.policy.max_fee >= 1000,
            "policy.max_fee must be >= 1000"
        );

        anyhow::ensure!(!self.listings.is_empty(), "at least one listing is required");
        for entry in &self.listings {
            anyhow::ensure!(
                entry.price > 0,
                "listing {}: price must be > 0",
                entry.asset_id
            );
        }
        self.listing_book()?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
