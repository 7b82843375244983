#![no_main]

use libfuzzer_sys::fuzz_target;
use makan_core::{SignedTransaction, UnsignedTransaction};

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic; accepted input must be canonical.
    if let Ok(txn) = UnsignedTransaction::decode(data) {
        assert_eq!(txn.as_bytes(), data);
        let _ = txn.id();
        let _ = txn.id_without_group();
    }

    if let Ok(signed) = SignedTransaction::decode(data) {
        assert_eq!(signed.to_bytes(), data);
    }
});
