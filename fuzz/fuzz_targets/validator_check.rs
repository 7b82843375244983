#![no_main]

use libfuzzer_sys::fuzz_target;
use makan_escrow::{
    EscrowAuthority, EscrowProgram, Listing, ListingBook, TransferLimits, Validator,
};
use std::sync::{Arc, OnceLock};

fn validator() -> &'static Validator {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let program = EscrowProgram::from_bytes(vec![0x08, 0x81, 0x01]).unwrap();
        let listings = ListingBook::new([Listing::new(755121764, 450_000)]).unwrap();
        Validator::new(
            Arc::new(EscrowAuthority::new(program)),
            listings,
            TransferLimits::default(),
        )
    })
}

fuzz_target!(|data: &[u8]| {
    let validator = validator();

    // Anything that is signed must have been sent by the escrow.
    if let Ok(signed) = validator.authorize(data) {
        assert_eq!(signed.txn().sender, validator.escrow_address());
        assert_eq!(signed.txn().as_bytes(), data);
    }

    // Split the input into an asset leg and a payment leg.
    let mid = data.len() / 2;
    let _ = validator.check_group(&data[..mid], Some(&data[mid..]));
});
