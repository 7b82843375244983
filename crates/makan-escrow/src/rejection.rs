//! Rejection taxonomy.
//!
//! Each variant names one check. Client kinds are final for a given input;
//! only `SigningFailure` indicates the service itself is broken.

use makan_core::{Address, DecodeError, TxType};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Malformed transaction: {0}")]
    MalformedInput(String),

    #[error("Only asset transfer transactions are allowed, got '{0}'")]
    WrongTransactionKind(TxType),

    #[error("Sender must be the escrow account {expected}, got {actual}")]
    SenderMismatch { expected: Address, actual: Address },

    #[error("No listing for asset {0}")]
    WrongAsset(u64),

    #[error("Listing for asset {0} is already sold")]
    ListingSold(u64),

    #[error("Amount must be exactly {expected}, got {actual}")]
    WrongAmount { expected: u64, actual: u64 },

    #[error("Transaction must be part of an atomic group")]
    NotAtomic,

    #[error("Unsafe transfer: {0}")]
    UnsafeTransfer(String),

    #[error("Payment leg rejected: {0}")]
    PaymentMismatch(String),

    #[error("Signing failed: {0}")]
    SigningFailure(String),
}

/// Stable, payload-free name of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    MalformedInput,
    WrongTransactionKind,
    SenderMismatch,
    WrongAsset,
    ListingSold,
    WrongAmount,
    NotAtomic,
    UnsafeTransfer,
    PaymentMismatch,
    SigningFailure,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::MalformedInput => "MalformedInput",
            RejectionKind::WrongTransactionKind => "WrongTransactionKind",
            RejectionKind::SenderMismatch => "SenderMismatch",
            RejectionKind::WrongAsset => "WrongAsset",
            RejectionKind::ListingSold => "ListingSold",
            RejectionKind::WrongAmount => "WrongAmount",
            RejectionKind::NotAtomic => "NotAtomic",
            RejectionKind::UnsafeTransfer => "UnsafeTransfer",
            RejectionKind::PaymentMismatch => "PaymentMismatch",
            RejectionKind::SigningFailure => "SigningFailure",
        }
    }

    /// `true` when the input is at fault; `false` for internal failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RejectionKind::SigningFailure)
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::MalformedInput(_) => RejectionKind::MalformedInput,
            Rejection::WrongTransactionKind(_) => RejectionKind::WrongTransactionKind,
            Rejection::SenderMismatch { .. } => RejectionKind::SenderMismatch,
            Rejection::WrongAsset(_) => RejectionKind::WrongAsset,
            Rejection::ListingSold(_) => RejectionKind::ListingSold,
            Rejection::WrongAmount { .. } => RejectionKind::WrongAmount,
            Rejection::NotAtomic => RejectionKind::NotAtomic,
            Rejection::UnsafeTransfer(_) => RejectionKind::UnsafeTransfer,
            Rejection::PaymentMismatch(_) => RejectionKind::PaymentMismatch,
            Rejection::SigningFailure(_) => RejectionKind::SigningFailure,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }
}

impl From<DecodeError> for Rejection {
    fn from(err: DecodeError) -> Self {
        Rejection::MalformedInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_signing_failure_is_server_side() {
        let server_side: Vec<Rejection> = [
            Rejection::MalformedInput("x".into()),
            Rejection::WrongTransactionKind(TxType::Payment),
            Rejection::WrongAsset(1),
            Rejection::ListingSold(1),
            Rejection::WrongAmount {
                expected: 1,
                actual: 2,
            },
            Rejection::NotAtomic,
            Rejection::UnsafeTransfer("x".into()),
            Rejection::PaymentMismatch("x".into()),
            Rejection::SigningFailure("x".into()),
        ]
        .into_iter()
        .filter(|r| !r.is_client_error())
        .collect();
        assert_eq!(server_side, vec![Rejection::SigningFailure("x".into())]);
    }

    #[test]
    fn test_decode_error_maps_to_malformed() {
        let rejection: Rejection = DecodeError::NotAMap.into();
        assert_eq!(rejection.kind(), RejectionKind::MalformedInput);
        assert_eq!(rejection.kind().as_str(), "MalformedInput");
    }

    #[test]
    fn test_messages_name_the_violation() {
        let msg = Rejection::WrongAmount {
            expected: 1,
            actual: 2,
        }
        .to_string();
        assert_eq!(msg, "Amount must be exactly 1, got 2");
        assert_eq!(
            Rejection::WrongTransactionKind(TxType::Payment).to_string(),
            "Only asset transfer transactions are allowed, got 'pay'"
        );
    }
}
