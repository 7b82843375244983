//! Makan Escrow
//!
//! Decides whether an untrusted asset-transfer transaction may be co-signed
//! by the escrow's logic signature, and signs it if so.
//!
//! The escrow program itself approves anything, so every guarantee lives
//! here:
//!
//! - [`EscrowAuthority`]: the program bytes and the address derived from
//!   them. Loaded once, shared read-only.
//! - [`ListingBook`]: which assets this escrow may release, in what
//!   quantity and at what price.
//! - [`Validator`]: a strict conjunction of checks over the decoded
//!   transaction. Pure; the only side effect is the final signing step.
//!
//! Every refusal is a [`Rejection`] naming exactly one failed check.

pub mod authority;
pub mod listing;
pub mod rejection;
pub mod validator;

pub use authority::{EscrowAuthority, EscrowProgram, ProgramLoadError, ProgramSource};
pub use listing::{Listing, ListingBook, ListingError};
pub use rejection::{Rejection, RejectionKind};
pub use validator::{ApprovedTransfer, TransferLimits, Validator, DEFAULT_MAX_FEE};
