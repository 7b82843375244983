//! Escrow transaction validator.
//!
//! `authorize` runs every check below, in order, and signs only if all pass.
//! The first failing check is the one reported.
//!
//! | # | Check                     | Rejection              |
//! |---|---------------------------|------------------------|
//! | 1 | decodes canonically       | `MalformedInput`       |
//! | 2 | kind is asset transfer    | `WrongTransactionKind` |
//! | 3 | sender is the escrow      | `SenderMismatch`       |
//! | 4 | asset has an open listing | `WrongAsset` / `ListingSold` |
//! | 5 | amount equals listing     | `WrongAmount`          |
//! | 6 | bound to an atomic group  | `NotAtomic`            |
//! | 7 | no rekey/close/clawback, fee capped | `UnsafeTransfer` |
//! | 8 | payment leg pays the listing | `PaymentMismatch`   |
//!
//! Check 6 only proves the asset leg is grouped. Without check 8 the ledger's
//! all-or-nothing group execution is what ties it to the buyer's payment;
//! the group's other legs are not inspected.

use crate::authority::EscrowAuthority;
use crate::listing::{Listing, ListingBook};
use crate::rejection::Rejection;
use makan_core::{
    compute_group_id, Address, AssetTransfer, GroupId, SignedTransaction, TxType,
    UnsignedTransaction,
};
use std::sync::Arc;

/// Default fee ceiling in microAlgos (ten times the minimum fee).
pub const DEFAULT_MAX_FEE: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    /// Highest fee the escrow account will pay for one transfer
    pub max_fee: u64,
    /// Refuse asset legs presented without their payment leg
    pub require_payment_leg: bool,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_fee: DEFAULT_MAX_FEE,
            require_payment_leg: false,
        }
    }
}

/// An asset leg that passed every check, not yet signed.
#[derive(Debug, Clone)]
pub struct ApprovedTransfer {
    pub txn: UnsignedTransaction,
    pub listing: Listing,
    pub group: GroupId,
    /// Whether check 8 ran against a supplied payment leg
    pub payment_verified: bool,
}

/// Authorization policy for one escrow program.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Validator {
    authority: Arc<EscrowAuthority>,
    listings: ListingBook,
    limits: TransferLimits,
}

impl Validator {
    pub fn new(
        authority: Arc<EscrowAuthority>,
        listings: ListingBook,
        limits: TransferLimits,
    ) -> Self {
        Self {
            authority,
            listings,
            limits,
        }
    }

    pub fn escrow_address(&self) -> Address {
        self.authority.address()
    }

    pub fn listings(&self) -> &ListingBook {
        &self.listings
    }

    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// Validate an asset leg on its own.
    pub fn check(&self, asset_leg: &[u8]) -> Result<ApprovedTransfer, Rejection> {
        self.check_group(asset_leg, None)
    }

    /// Validate an asset leg, and its payment leg when supplied.
    pub fn check_group(
        &self,
        asset_leg: &[u8],
        payment_leg: Option<&[u8]>,
    ) -> Result<ApprovedTransfer, Rejection> {
        // 1. Decodability
        let txn = UnsignedTransaction::decode(asset_leg)?;

        // 2. Kind restriction
        let axfer = match (txn.kind, txn.asset_transfer()) {
            (TxType::AssetTransfer, Some(axfer)) => axfer.clone(),
            _ => return Err(Rejection::WrongTransactionKind(txn.kind)),
        };

        // 3. Sender binding
        let escrow = self.authority.address();
        if txn.sender != escrow {
            return Err(Rejection::SenderMismatch {
                expected: escrow,
                actual: txn.sender,
            });
        }

        // 4. Asset identity
        let listing = self
            .listings
            .get(axfer.asset_id)
            .ok_or(Rejection::WrongAsset(axfer.asset_id))?;
        if listing.sold {
            return Err(Rejection::ListingSold(axfer.asset_id));
        }

        // 5. Exact quantity
        if axfer.amount != listing.amount {
            return Err(Rejection::WrongAmount {
                expected: listing.amount,
                actual: axfer.amount,
            });
        }

        // 6. Atomicity membership
        let group = txn.group.ok_or(Rejection::NotAtomic)?;

        // 7. Escrow account stays intact
        self.check_authority_preserved(&txn, &axfer)?;

        // 8. Sibling payment
        let payment_verified = match payment_leg {
            Some(bytes) => {
                self.check_payment_leg(&txn, &axfer, group, listing, bytes)?;
                true
            }
            None if self.limits.require_payment_leg => {
                return Err(Rejection::PaymentMismatch(
                    "the payment leg must be supplied with the asset leg".into(),
                ));
            }
            None => false,
        };

        Ok(ApprovedTransfer {
            listing: listing.clone(),
            txn,
            group,
            payment_verified,
        })
    }

    /// Validate and sign an asset leg.
    pub fn authorize(&self, asset_leg: &[u8]) -> Result<SignedTransaction, Rejection> {
        self.authorize_group(asset_leg, None)
    }

    /// Validate and sign an asset leg, checking its payment leg when supplied.
    pub fn authorize_group(
        &self,
        asset_leg: &[u8],
        payment_leg: Option<&[u8]>,
    ) -> Result<SignedTransaction, Rejection> {
        let approved = self.check_group(asset_leg, payment_leg)?;
        log::debug!(
            "Approved transfer of asset {} in group {} (payment verified: {})",
            approved.listing.asset_id,
            approved.group,
            approved.payment_verified
        );
        self.authority.sign(approved.txn)
    }

    fn check_authority_preserved(
        &self,
        txn: &UnsignedTransaction,
        axfer: &AssetTransfer,
    ) -> Result<(), Rejection> {
        if txn.rekey_to.is_some() {
            return Err(Rejection::UnsafeTransfer(
                "rekeying the escrow account is not allowed".into(),
            ));
        }
        if axfer.close_to.is_some() {
            return Err(Rejection::UnsafeTransfer(
                "closing out the escrow's asset holding is not allowed".into(),
            ));
        }
        if axfer.clawback_from.is_some() {
            return Err(Rejection::UnsafeTransfer(
                "clawback transfers are not allowed".into(),
            ));
        }
        if txn.fee > self.limits.max_fee {
            return Err(Rejection::UnsafeTransfer(format!(
                "fee {} exceeds the maximum of {}",
                txn.fee, self.limits.max_fee
            )));
        }
        Ok(())
    }

    fn check_payment_leg(
        &self,
        asset_txn: &UnsignedTransaction,
        axfer: &AssetTransfer,
        group: GroupId,
        listing: &Listing,
        payment_leg: &[u8],
    ) -> Result<(), Rejection> {
        let payment = UnsignedTransaction::decode(payment_leg)
            .map_err(|e| Rejection::PaymentMismatch(format!("payment leg is malformed: {}", e)))?;

        let pay = payment.payment().ok_or_else(|| {
            Rejection::PaymentMismatch(format!(
                "sibling is a '{}' transaction, not a payment",
                payment.kind
            ))
        })?;

        if payment.group != Some(group) {
            return Err(Rejection::PaymentMismatch(
                "payment leg belongs to a different group".into(),
            ));
        }

        // The group must consist of exactly these two legs, in either order.
        let payment_id = payment.id_without_group();
        let asset_id = asset_txn.id_without_group();
        if compute_group_id(&[payment_id, asset_id]) != group
            && compute_group_id(&[asset_id, payment_id]) != group
        {
            return Err(Rejection::PaymentMismatch(
                "group id does not commit to exactly the payment and asset legs".into(),
            ));
        }

        let payee = listing.payee_or(self.authority.address());
        if pay.receiver != payee {
            return Err(Rejection::PaymentMismatch(format!(
                "payment receiver {} is not the listing payee {}",
                pay.receiver, payee
            )));
        }

        if pay.amount != listing.price {
            return Err(Rejection::PaymentMismatch(format!(
                "payment amount {} does not match the listing price {}",
                pay.amount, listing.price
            )));
        }

        if payment.sender != axfer.receiver {
            return Err(Rejection::PaymentMismatch(
                "payment sender must be the asset receiver".into(),
            ));
        }

        if pay.close_to.is_some() || payment.rekey_to.is_some() {
            return Err(Rejection::PaymentMismatch(
                "payment leg must not close or rekey the buyer's account".into(),
            ));
        }

        Ok(())
    }
}
