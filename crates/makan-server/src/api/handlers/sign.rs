//! `POST /sign-asset`

use super::super::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use log::{info, warn};
use makan_core::UnsignedTransaction;
use makan_escrow::Rejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignAssetRequest {
    /// Base64 canonical encoding of the escrow's asset leg
    pub txn_base64: String,
    /// Base64 payment leg of the same group, when the buyer supplies it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_txn_base64: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAssetResponse {
    /// Base64 logic-signed transaction
    pub signed_txn: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

pub async fn handle_sign_asset(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: SignAssetRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return rejection_response(&Rejection::MalformedInput(format!(
                "invalid request body: {}",
                err
            )))
        }
    };

    let asset_leg = match decode_base64("txnBase64", &request.txn_base64) {
        Ok(bytes) => bytes,
        Err(rejection) => return rejection_response(&rejection),
    };
    let payment_leg = match request.payment_txn_base64.as_deref() {
        Some(text) => match decode_base64("paymentTxnBase64", text) {
            Ok(bytes) => Some(bytes),
            Err(rejection) => return rejection_response(&rejection),
        },
        None => None,
    };

    match state
        .validator
        .authorize_group(&asset_leg, payment_leg.as_deref())
    {
        Ok(signed) => {
            let txn = signed.txn();
            info!(
                "Co-signed txid={} asset={}",
                txn.id(),
                txn.asset_transfer().map(|a| a.asset_id).unwrap_or_default()
            );
            Json(SignAssetResponse {
                signed_txn: base64::engine::general_purpose::STANDARD.encode(signed.to_bytes()),
            })
            .into_response()
        }
        Err(rejection) => {
            // Only the id; transaction contents are never logged.
            let txid = UnsignedTransaction::decode(&asset_leg)
                .map(|txn| txn.id().to_string())
                .unwrap_or_else(|_| "-".to_string());
            warn!("Rejected txid={} kind={}", txid, rejection.kind());
            rejection_response(&rejection)
        }
    }
}

fn decode_base64(field: &str, text: &str) -> Result<Vec<u8>, Rejection> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| Rejection::MalformedInput(format!("{} is not valid base64: {}", field, e)))
}

pub(crate) fn rejection_response(rejection: &Rejection) -> Response {
    let status = if rejection.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = ErrorResponse {
        error: rejection.to_string(),
        kind: rejection.kind().as_str().to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_field_names() {
        let request: SignAssetRequest =
            serde_json::from_str(r#"{"txnBase64":"AA==","paymentTxnBase64":"AQ=="}"#).unwrap();
        assert_eq!(request.txn_base64, "AA==");
        assert_eq!(request.payment_txn_base64.as_deref(), Some("AQ=="));

        let request: SignAssetRequest = serde_json::from_str(r#"{"txnBase64":"AA=="}"#).unwrap();
        assert!(request.payment_txn_base64.is_none());
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let result =
            serde_json::from_str::<SignAssetRequest>(r#"{"txnBase64":"AA==","extra":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejection_status_codes() {
        let response = rejection_response(&Rejection::NotAtomic);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = rejection_response(&Rejection::SigningFailure("x".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_base64_error_is_malformed() {
        let err = decode_base64("txnBase64", "%%%").unwrap_err();
        assert!(err.to_string().contains("txnBase64"));
        assert_eq!(err.kind().as_str(), "MalformedInput");
    }
}
