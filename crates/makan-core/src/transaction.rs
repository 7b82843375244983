//! Unsigned transaction decoding.
//!
//! A transaction arrives as a canonical msgpack map. Decoding keeps the full
//! field map (so signing can reproduce it untouched) and extracts a typed
//! view of the fields the escrow policy reads.

use crate::address::{Address, Digest, GroupId, TxId, GROUP_PREFIX, TX_PREFIX};
use crate::msgpack::{self, MsgpackError, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid msgpack: {0}")]
    Msgpack(#[from] MsgpackError),

    #[error("Transaction must be a msgpack map")]
    NotAMap,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' has the wrong type")]
    WrongType(&'static str),

    #[error("Field '{field}' must be 32 bytes, got {actual}")]
    WrongLength { field: &'static str, actual: usize },

    #[error("Unknown transaction type: {0}")]
    UnknownType(String),

    #[error("Encoding is not canonical")]
    NonCanonical,
}

/// Transaction kinds known to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Payment,
    AssetTransfer,
    AssetConfig,
    AssetFreeze,
    ApplicationCall,
    KeyRegistration,
    StateProof,
    Heartbeat,
}

impl TxType {
    /// Wire tag used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Payment => "pay",
            TxType::AssetTransfer => "axfer",
            TxType::AssetConfig => "acfg",
            TxType::AssetFreeze => "afrz",
            TxType::ApplicationCall => "appl",
            TxType::KeyRegistration => "keyreg",
            TxType::StateProof => "stpf",
            TxType::Heartbeat => "hb",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "pay" => Some(TxType::Payment),
            "axfer" => Some(TxType::AssetTransfer),
            "acfg" => Some(TxType::AssetConfig),
            "afrz" => Some(TxType::AssetFreeze),
            "appl" => Some(TxType::ApplicationCall),
            "keyreg" => Some(TxType::KeyRegistration),
            "stpf" => Some(TxType::StateProof),
            "hb" => Some(TxType::Heartbeat),
            _ => None,
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset transfer body (`axfer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTransfer {
    /// `xaid`
    pub asset_id: u64,
    /// `aamt`
    pub amount: u64,
    /// `arcv`; zero when omitted
    pub receiver: Address,
    /// `aclose`: closes the sender's holding to this account
    pub close_to: Option<Address>,
    /// `asnd`: clawback source
    pub clawback_from: Option<Address>,
}

/// Payment body (`pay`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    /// `amt`, in microAlgos
    pub amount: u64,
    /// `rcv`; zero when omitted
    pub receiver: Address,
    /// `close`: closes the sender's account to this address
    pub close_to: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxBody {
    Payment(Payment),
    AssetTransfer(AssetTransfer),
    /// Kinds whose body the co-signer never inspects.
    Other,
}

/// A decoded, not-yet-signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    raw: Vec<u8>,
    fields: BTreeMap<String, Value>,
    pub kind: TxType,
    pub sender: Address,
    pub fee: u64,
    /// `grp`; `None` when absent, empty or all-zero
    pub group: Option<GroupId>,
    /// `rekey`: hands spending authority of the sender to this account
    pub rekey_to: Option<Address>,
    pub body: TxBody,
}

impl UnsignedTransaction {
    /// Decode canonical msgpack bytes.
    ///
    /// Non-canonical encodings are rejected: ids computed over them would
    /// not match the ids the ledger computes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let fields = match msgpack::decode(bytes)? {
            Value::Map(fields) => fields,
            _ => return Err(DecodeError::NotAMap),
        };
        let txn = Self::from_fields(fields)?;
        if txn.raw != bytes {
            return Err(DecodeError::NonCanonical);
        }
        Ok(txn)
    }

    /// Build the typed view from an already-decoded field map.
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Result<Self, DecodeError> {
        let tag = match fields.get("type") {
            Some(Value::Str(tag)) => tag.as_str(),
            Some(_) => return Err(DecodeError::WrongType("type")),
            None => return Err(DecodeError::MissingField("type")),
        };
        let kind = TxType::parse(tag).ok_or_else(|| DecodeError::UnknownType(tag.to_string()))?;

        let sender = address_field(&fields, "snd")?.ok_or(DecodeError::MissingField("snd"))?;
        let fee = uint_field(&fields, "fee")?;
        let group = group_field(&fields)?;
        let rekey_to = address_field(&fields, "rekey")?;

        let body = match kind {
            TxType::AssetTransfer => TxBody::AssetTransfer(AssetTransfer {
                asset_id: uint_field(&fields, "xaid")?,
                amount: uint_field(&fields, "aamt")?,
                receiver: address_field(&fields, "arcv")?.unwrap_or(Address::ZERO),
                close_to: address_field(&fields, "aclose")?,
                clawback_from: address_field(&fields, "asnd")?,
            }),
            TxType::Payment => TxBody::Payment(Payment {
                amount: uint_field(&fields, "amt")?,
                receiver: address_field(&fields, "rcv")?.unwrap_or(Address::ZERO),
                close_to: address_field(&fields, "close")?,
            }),
            _ => TxBody::Other,
        };

        let raw = msgpack::encode(&Value::Map(fields.clone()));
        Ok(Self {
            raw,
            fields,
            kind,
            sender,
            fee,
            group,
            rekey_to,
            body,
        })
    }

    /// Canonical encoding of this transaction.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Every field, including the ones without a typed accessor.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Transaction id: SHA-512/256("TX" || canonical bytes).
    pub fn id(&self) -> TxId {
        Digest::hash_with_prefix(TX_PREFIX, &self.raw)
    }

    /// Id of this transaction with `grp` cleared.
    ///
    /// Group ids commit to member ids computed before `grp` was assigned.
    pub fn id_without_group(&self) -> TxId {
        let mut fields = self.fields.clone();
        fields.remove("grp");
        Digest::hash_with_prefix(TX_PREFIX, &msgpack::encode(&Value::Map(fields)))
    }

    pub fn asset_transfer(&self) -> Option<&AssetTransfer> {
        match &self.body {
            TxBody::AssetTransfer(axfer) => Some(axfer),
            _ => None,
        }
    }

    pub fn payment(&self) -> Option<&Payment> {
        match &self.body {
            TxBody::Payment(pay) => Some(pay),
            _ => None,
        }
    }
}

/// Group id over the ordered member ids.
pub fn compute_group_id(member_ids: &[TxId]) -> GroupId {
    let txlist = member_ids
        .iter()
        .map(|id| Value::Bin(id.as_bytes().to_vec()))
        .collect();
    let mut map = BTreeMap::new();
    map.insert("txlist".to_string(), Value::Array(txlist));
    Digest::hash_with_prefix(GROUP_PREFIX, &msgpack::encode(&Value::Map(map)))
}

fn uint_field(fields: &BTreeMap<String, Value>, key: &'static str) -> Result<u64, DecodeError> {
    match fields.get(key) {
        None => Ok(0),
        Some(Value::Uint(n)) => Ok(*n),
        Some(_) => Err(DecodeError::WrongType(key)),
    }
}

fn bytes32_field(
    fields: &BTreeMap<String, Value>,
    key: &'static str,
) -> Result<Option<[u8; 32]>, DecodeError> {
    match fields.get(key) {
        None => Ok(None),
        Some(Value::Bin(bytes)) => {
            let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                DecodeError::WrongLength {
                    field: key,
                    actual: bytes.len(),
                }
            })?;
            Ok(Some(arr))
        }
        Some(_) => Err(DecodeError::WrongType(key)),
    }
}

fn address_field(
    fields: &BTreeMap<String, Value>,
    key: &'static str,
) -> Result<Option<Address>, DecodeError> {
    Ok(bytes32_field(fields, key)?.map(Address::new))
}

/// `grp` absent, empty (zero-length bin or empty array) or all-zero means
/// the transaction belongs to no group.
fn group_field(fields: &BTreeMap<String, Value>) -> Result<Option<Digest>, DecodeError> {
    match fields.get("grp") {
        Some(Value::Bin(bytes)) if bytes.is_empty() => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        _ => Ok(bytes32_field(fields, "grp")?
            .map(Digest::new)
            .filter(|g| !g.is_zero())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{assign_group, TxnBuilder};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn test_decode_asset_transfer() {
        let bytes = TxnBuilder::asset_transfer(addr(1), addr(2), 755121764, 1)
            .fee(1000)
            .build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();

        assert_eq!(txn.kind, TxType::AssetTransfer);
        assert_eq!(txn.sender, addr(1));
        assert_eq!(txn.fee, 1000);
        assert_eq!(txn.group, None);
        let axfer = txn.asset_transfer().unwrap();
        assert_eq!(axfer.asset_id, 755121764);
        assert_eq!(axfer.amount, 1);
        assert_eq!(axfer.receiver, addr(2));
        assert_eq!(axfer.close_to, None);
        assert_eq!(txn.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn test_decode_payment() {
        let bytes = TxnBuilder::payment(addr(3), addr(4), 450_000).build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();
        assert_eq!(txn.kind, TxType::Payment);
        let pay = txn.payment().unwrap();
        assert_eq!(pay.amount, 450_000);
        assert_eq!(pay.receiver, addr(4));
        assert!(txn.asset_transfer().is_none());
    }

    #[test]
    fn test_omitted_amount_defaults_to_zero() {
        // Opt-in transfers carry amount 0, which canonical encoding omits.
        let bytes = TxnBuilder::asset_transfer(addr(1), addr(1), 9, 0).build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();
        assert!(!txn.fields().contains_key("aamt"));
        assert_eq!(txn.asset_transfer().unwrap().amount, 0);
    }

    #[test]
    fn test_missing_type_and_sender() {
        let no_type = TxnBuilder::payment(addr(1), addr(2), 5)
            .without("type")
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&no_type),
            Err(DecodeError::MissingField("type"))
        );

        let no_sender = TxnBuilder::payment(addr(1), addr(2), 5)
            .without("snd")
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&no_sender),
            Err(DecodeError::MissingField("snd"))
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let bytes = TxnBuilder::payment(addr(1), addr(2), 5)
            .field("type", Value::Str("bogus".into()))
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&bytes),
            Err(DecodeError::UnknownType("bogus".into()))
        );
    }

    #[test]
    fn test_wrong_field_shapes() {
        let short_sender = TxnBuilder::payment(addr(1), addr(2), 5)
            .field("snd", Value::Bin(vec![1; 31]))
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&short_sender),
            Err(DecodeError::WrongLength {
                field: "snd",
                actual: 31
            })
        );

        let string_amount = TxnBuilder::asset_transfer(addr(1), addr(2), 7, 1)
            .field("aamt", Value::Str("1".into()))
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&string_amount),
            Err(DecodeError::WrongType("aamt"))
        );
    }

    #[test]
    fn test_not_a_map() {
        assert_eq!(
            UnsignedTransaction::decode(&[0x93, 0x01, 0x02, 0x03]),
            Err(DecodeError::NotAMap)
        );
    }

    #[test]
    fn test_non_canonical_rejected() {
        // {"type": "pay", "snd": <32 bytes>} with keys out of order
        let mut bytes = vec![0x82, 0xa4];
        bytes.extend_from_slice(b"type");
        bytes.push(0xa3);
        bytes.extend_from_slice(b"pay");
        bytes.push(0xa3);
        bytes.extend_from_slice(b"snd");
        bytes.extend_from_slice(&[0xc4, 32]);
        bytes.extend_from_slice(&[9u8; 32]);
        assert_eq!(
            UnsignedTransaction::decode(&bytes),
            Err(DecodeError::NonCanonical)
        );
    }

    #[test]
    fn test_zero_group_is_no_group() {
        let bytes = TxnBuilder::asset_transfer(addr(1), addr(2), 7, 1)
            .group(Digest::new([0u8; 32]))
            .build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();
        assert_eq!(txn.group, None);
    }

    #[test]
    fn test_empty_group_is_no_group() {
        for empty in [Value::Bin(vec![]), Value::Array(vec![])] {
            let bytes = TxnBuilder::asset_transfer(addr(1), addr(2), 7, 1)
                .field("grp", empty)
                .build();
            let txn = UnsignedTransaction::decode(&bytes).unwrap();
            assert_eq!(txn.group, None);
        }

        let short = TxnBuilder::asset_transfer(addr(1), addr(2), 7, 1)
            .field("grp", Value::Bin(vec![0x61; 31]))
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&short),
            Err(DecodeError::WrongLength {
                field: "grp",
                actual: 31
            })
        );

        let wrong = TxnBuilder::asset_transfer(addr(1), addr(2), 7, 1)
            .field("grp", Value::Array(vec![Value::Uint(1)]))
            .build();
        assert_eq!(
            UnsignedTransaction::decode(&wrong),
            Err(DecodeError::WrongType("grp"))
        );
    }

    #[test]
    fn test_group_id_commits_to_order() {
        let a = Digest::hash_with_prefix(TX_PREFIX, b"a");
        let b = Digest::hash_with_prefix(TX_PREFIX, b"b");
        assert_ne!(compute_group_id(&[a, b]), compute_group_id(&[b, a]));
        assert_eq!(compute_group_id(&[a, b]), compute_group_id(&[a, b]));
    }

    #[test]
    fn test_assigned_group_matches_member_ids() {
        let mut txns = vec![
            TxnBuilder::payment(addr(5), addr(1), 450_000),
            TxnBuilder::asset_transfer(addr(1), addr(5), 755121764, 1),
        ];
        let group = assign_group(&mut txns);

        let decoded: Vec<UnsignedTransaction> = txns
            .iter()
            .map(|t| UnsignedTransaction::decode(&t.build()).unwrap())
            .collect();
        assert!(decoded.iter().all(|t| t.group == Some(group)));

        let ids: Vec<TxId> = decoded.iter().map(|t| t.id_without_group()).collect();
        assert_eq!(compute_group_id(&ids), group);
        // The id with grp set differs from the one the group commits to.
        assert_ne!(decoded[0].id(), ids[0]);
    }
}
