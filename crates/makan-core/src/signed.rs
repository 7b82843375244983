//! Logic-signature envelope.
//!
//! A transaction authorized by a program is encoded as
//! `{"lsig": {"l": <program>}, "txn": <transaction map>}`. The ledger
//! evaluates the program and, on success, treats the transaction as signed
//! by the program's address.

use crate::msgpack::{self, Value};
use crate::transaction::{DecodeError, UnsignedTransaction};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    txn: UnsignedTransaction,
    program: Vec<u8>,
}

impl SignedTransaction {
    /// Attach `program` as the logic signature of `txn`.
    pub fn with_logic_sig(txn: UnsignedTransaction, program: Vec<u8>) -> Self {
        Self { txn, program }
    }

    pub fn txn(&self) -> &UnsignedTransaction {
        &self.txn
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    /// Canonical signed-transaction bytes, ready for submission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut lsig = BTreeMap::new();
        lsig.insert("l".to_string(), Value::Bin(self.program.clone()));

        let mut envelope = BTreeMap::new();
        envelope.insert("lsig".to_string(), Value::Map(lsig));
        envelope.insert("txn".to_string(), Value::Map(self.txn.fields().clone()));
        msgpack::encode(&Value::Map(envelope))
    }

    /// Parse a logic-signed transaction.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let envelope = match msgpack::decode(bytes)? {
            Value::Map(envelope) => envelope,
            _ => return Err(DecodeError::NotAMap),
        };
        let lsig = match envelope.get("lsig") {
            Some(Value::Map(lsig)) => lsig,
            Some(_) => return Err(DecodeError::WrongType("lsig")),
            None => return Err(DecodeError::MissingField("lsig")),
        };
        let program = match lsig.get("l") {
            Some(Value::Bin(program)) => program.clone(),
            Some(_) => return Err(DecodeError::WrongType("l")),
            None => return Err(DecodeError::MissingField("l")),
        };
        let fields = match envelope.get("txn") {
            Some(Value::Map(fields)) => fields.clone(),
            Some(_) => return Err(DecodeError::WrongType("txn")),
            None => return Err(DecodeError::MissingField("txn")),
        };
        let signed = Self {
            txn: UnsignedTransaction::from_fields(fields)?,
            program,
        };
        if signed.to_bytes() != bytes {
            return Err(DecodeError::NonCanonical);
        }
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::builder::TxnBuilder;

    const PROGRAM: [u8; 3] = [0x08, 0x81, 0x01];

    #[test]
    fn test_envelope_layout() {
        let escrow = Address::for_program(&PROGRAM);
        let bytes = TxnBuilder::asset_transfer(escrow, Address::new([2; 32]), 755121764, 1).build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();
        let signed = SignedTransaction::with_logic_sig(txn, PROGRAM.to_vec());
        let encoded = signed.to_bytes();

        // fixmap(2) "lsig" fixmap(1) "l" bin8(3) program "txn" <txn bytes>
        let mut expected = vec![0x82, 0xa4];
        expected.extend_from_slice(b"lsig");
        expected.extend_from_slice(&[0x81, 0xa1, b'l', 0xc4, 0x03]);
        expected.extend_from_slice(&PROGRAM);
        expected.push(0xa3);
        expected.extend_from_slice(b"txn");
        expected.extend_from_slice(&bytes);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_decode_signed() {
        let escrow = Address::for_program(&PROGRAM);
        let bytes = TxnBuilder::asset_transfer(escrow, Address::new([2; 32]), 42, 1).build();
        let txn = UnsignedTransaction::decode(&bytes).unwrap();
        let encoded = SignedTransaction::with_logic_sig(txn.clone(), PROGRAM.to_vec()).to_bytes();

        let decoded = SignedTransaction::decode(&encoded).unwrap();
        assert_eq!(decoded.txn(), &txn);
        assert_eq!(decoded.program(), &PROGRAM);
        assert_eq!(Address::for_program(decoded.program()), decoded.txn().sender);
    }

    #[test]
    fn test_unsigned_bytes_are_not_a_signed_txn() {
        let bytes = TxnBuilder::payment(Address::new([1; 32]), Address::new([2; 32]), 5).build();
        assert_eq!(
            SignedTransaction::decode(&bytes),
            Err(DecodeError::MissingField("lsig"))
        );
    }
}
