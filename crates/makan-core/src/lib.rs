//! Makan Core
//!
//! Ledger primitives shared by the escrow co-signer.
//!
//! # Encoding
//!
//! Transactions travel as canonical MessagePack maps. Every identifier the
//! ledger derives from them (addresses, transaction ids, group ids) is a
//! SHA-512/256 digest over a short domain-separation prefix followed by the
//! canonical bytes:
//!
//! - Program address: `"Program" || program`
//! - Transaction id: `"TX" || msgpack(txn)`
//! - Group id: `"TG" || msgpack({"txlist": [id, ...]})`
//!
//! Nothing in this crate performs I/O. The only seam to a ledger node is the
//! [`ProgramCompiler`] trait.

pub mod address;
pub mod builder;
pub mod msgpack;
pub mod program;
pub mod signed;
pub mod transaction;

pub use address::{Address, AddressError, Digest, GroupId, TxId};
pub use builder::{assign_group, TxnBuilder};
pub use program::{CompiledProgram, ProgramCompiler};
pub use signed::SignedTransaction;
pub use transaction::{
    compute_group_id, AssetTransfer, DecodeError, Payment, TxBody, TxType, UnsignedTransaction,
};
