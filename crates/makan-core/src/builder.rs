//! Canonical transaction construction.
//!
//! Used by clients assembling an atomic purchase (payment leg + asset leg),
//! and by tests. Zero values are omitted, as the ledger's canonical encoding
//! requires.

use crate::address::{Address, Digest, GroupId, TxId, TX_PREFIX};
use crate::msgpack::{self, Value};
use crate::transaction::{compute_group_id, TxType};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnBuilder {
    kind: TxType,
    fields: BTreeMap<String, Value>,
}

impl TxnBuilder {
    fn new(kind: TxType, sender: Address) -> Self {
        let mut builder = Self {
            kind,
            fields: BTreeMap::new(),
        };
        builder
            .fields
            .insert("type".into(), Value::Str(kind.as_str().into()));
        builder.set_address("snd", sender);
        builder
    }

    /// `sender` pays `amount` microAlgos to `receiver`.
    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        let mut builder = Self::new(TxType::Payment, sender);
        builder.set_address("rcv", receiver);
        builder.set_uint("amt", amount);
        builder
    }

    /// `sender` transfers `amount` units of `asset_id` to `receiver`.
    pub fn asset_transfer(sender: Address, receiver: Address, asset_id: u64, amount: u64) -> Self {
        let mut builder = Self::new(TxType::AssetTransfer, sender);
        builder.set_address("arcv", receiver);
        builder.set_uint("xaid", asset_id);
        builder.set_uint("aamt", amount);
        builder
    }

    /// NoOp call of application `app_id`.
    pub fn application_call(sender: Address, app_id: u64) -> Self {
        let mut builder = Self::new(TxType::ApplicationCall, sender);
        builder.set_uint("apid", app_id);
        builder
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.set_uint("fee", fee);
        self
    }

    pub fn valid_rounds(mut self, first: u64, last: u64) -> Self {
        self.set_uint("fv", first);
        self.set_uint("lv", last);
        self
    }

    pub fn genesis(mut self, id: &str, hash: [u8; 32]) -> Self {
        if !id.is_empty() {
            self.fields.insert("gen".into(), Value::Str(id.into()));
        }
        self.fields.insert("gh".into(), Value::Bin(hash.to_vec()));
        self
    }

    pub fn note(mut self, note: &[u8]) -> Self {
        if note.is_empty() {
            self.fields.remove("note");
        } else {
            self.fields.insert("note".into(), Value::Bin(note.to_vec()));
        }
        self
    }

    pub fn rekey_to(mut self, to: Address) -> Self {
        self.set_address("rekey", to);
        self
    }

    /// Close-remainder-to: `close` for payments, `aclose` for asset transfers.
    pub fn close_to(mut self, to: Address) -> Self {
        let key = match self.kind {
            TxType::AssetTransfer => "aclose",
            _ => "close",
        };
        self.set_address(key, to);
        self
    }

    /// Clawback source (`asnd`) of an asset transfer.
    pub fn clawback_from(mut self, from: Address) -> Self {
        self.set_address("asnd", from);
        self
    }

    /// Set `grp` verbatim, even when all-zero.
    pub fn group(mut self, group: GroupId) -> Self {
        self.fields
            .insert("grp".into(), Value::Bin(group.as_bytes().to_vec()));
        self
    }

    /// Set an arbitrary field.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Remove a field.
    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    /// Canonical msgpack bytes.
    pub fn build(&self) -> Vec<u8> {
        msgpack::encode(&Value::Map(self.fields.clone()))
    }

    fn id_without_group(&self) -> TxId {
        let mut fields = self.fields.clone();
        fields.remove("grp");
        Digest::hash_with_prefix(TX_PREFIX, &msgpack::encode(&Value::Map(fields)))
    }

    fn set_uint(&mut self, key: &str, n: u64) {
        if n == 0 {
            self.fields.remove(key);
        } else {
            self.fields.insert(key.into(), Value::Uint(n));
        }
    }

    fn set_address(&mut self, key: &str, address: Address) {
        if address.is_zero() {
            self.fields.remove(key);
        } else {
            self.fields
                .insert(key.into(), Value::Bin(address.as_bytes().to_vec()));
        }
    }
}

/// Bind `txns` into one atomic group, in order, and return the group id.
pub fn assign_group(txns: &mut [TxnBuilder]) -> GroupId {
    let ids: Vec<TxId> = txns.iter().map(TxnBuilder::id_without_group).collect();
    let group = compute_group_id(&ids);
    for txn in txns.iter_mut() {
        txn.fields
            .insert("grp".into(), Value::Bin(group.as_bytes().to_vec()));
    }
    group
}
