//! Fuzz target: `extract_f64`
//!
//! Arbitrary payload bytes, with and without a JSON field, must never
//! panic and must only ever yield finite numbers.
//!
//! cargo fuzz run fuzz_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use zonetherm::payload::extract_f64;

fuzz_target!(|data: &[u8]| {
    for entry in [None, Some("temperature"), Some("")] {
        if let Ok(v) = extract_f64(data, entry) {
            assert!(v.is_finite(), "non-finite value escaped extraction");
        }
    }
});
