//! Listings the escrow is allowed to release.

use makan_core::Address;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("Asset {0} is listed more than once")]
    Duplicate(u64),

    #[error("Listing for asset {0} must release at least one unit")]
    ZeroAmount(u64),
}

/// One tokenized property for sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub asset_id: u64,
    /// Price in microAlgos
    pub price: u64,
    /// Units released per sale (1 for a unique collectible)
    pub amount: u64,
    /// Receiver of the buyer's payment; the escrow account when `None`
    pub payee: Option<Address>,
    /// Stateful sale contract backing this listing, if any
    pub app_id: Option<u64>,
    pub title: String,
    /// Closed listings are never released again
    pub sold: bool,
}

impl Listing {
    /// An open single-unit listing.
    pub fn new(asset_id: u64, price: u64) -> Self {
        Self {
            asset_id,
            price,
            amount: 1,
            payee: None,
            app_id: None,
            title: String::new(),
            sold: false,
        }
    }

    /// Who must receive the payment leg.
    pub fn payee_or(&self, escrow: Address) -> Address {
        self.payee.unwrap_or(escrow)
    }
}

/// Listings keyed by asset id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingBook {
    listings: BTreeMap<u64, Listing>,
}

impl ListingBook {
    pub fn new(listings: impl IntoIterator<Item = Listing>) -> Result<Self, ListingError> {
        let mut book = BTreeMap::new();
        for listing in listings {
            if listing.amount == 0 {
                return Err(ListingError::ZeroAmount(listing.asset_id));
            }
            let asset_id = listing.asset_id;
            if book.insert(asset_id, listing).is_some() {
                return Err(ListingError::Duplicate(asset_id));
            }
        }
        Ok(Self { listings: book })
    }

    pub fn get(&self, asset_id: u64) -> Option<&Listing> {
        self.listings.get(&asset_id)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }
}
