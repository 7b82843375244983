//! Makan Algod
//!
//! Minimal client for an algod node's REST API. The co-signer only needs
//! one call: compiling the escrow's TEAL source into program bytes.

use base64::Engine;
use makan_core::{Address, CompiledProgram, ProgramCompiler};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the node's API token.
pub const API_TOKEN_HEADER: &str = "X-Algo-API-Token";

const COMPILE_PATH: &str = "/v2/teal/compile";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum AlgodError {
    #[error("Request to algod failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Algod returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Invalid algod response: {0}")]
    Decode(String),
}

/// `/v2/teal/compile` response body.
#[derive(Debug, Deserialize)]
struct CompileResponse {
    /// Program address
    hash: String,
    /// Base64 program bytes
    result: String,
}

#[derive(Debug, Clone)]
pub struct AlgodClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl AlgodClient {
    /// Client for the node at `url`. An empty `token` sends no token header.
    pub fn new(url: &str, token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            token: (!token.is_empty()).then(|| token.to_string()),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Compile TEAL source on the node.
    pub async fn compile_teal(&self, teal_source: &str) -> Result<CompiledProgram, AlgodError> {
        let url = format!("{}{}", self.base_url, COMPILE_PATH);
        log::debug!("Compiling {} bytes of TEAL at {}", teal_source.len(), url);

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-binary")
            .body(teal_source.to_string());
        if let Some(token) = &self.token {
            request = request.header(API_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(AlgodError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        parse_compile_response(&body)
    }
}

impl ProgramCompiler for AlgodClient {
    type Error = AlgodError;

    async fn compile(&self, teal_source: &str) -> Result<CompiledProgram, AlgodError> {
        self.compile_teal(teal_source).await
    }
}

fn parse_compile_response(body: &[u8]) -> Result<CompiledProgram, AlgodError> {
    let response: CompileResponse =
        serde_json::from_slice(body).map_err(|e| AlgodError::Decode(e.to_string()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(response.result.trim())
        .map_err(|e| AlgodError::Decode(format!("result is not base64: {}", e)))?;

    let reported_address: Address = response
        .hash
        .parse()
        .map_err(|e| AlgodError::Decode(format!("hash is not an address: {}", e)))?;

    Ok(CompiledProgram {
        bytes,
        reported_address,
    })
}
