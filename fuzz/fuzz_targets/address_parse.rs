#![no_main]

use libfuzzer_sys::fuzz_target;
use makan_core::Address;

fuzz_target!(|data: &[u8]| {
    // Any address that parses must print back to the same text.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(address) = s.parse::<Address>() {
            assert_eq!(address.to_string(), s);
        }
    }
});
