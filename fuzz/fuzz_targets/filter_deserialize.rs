//! Fuzz target for raw filter deserialization.
//!
//! Feeds arbitrary bytes to the JSON filter deserializer; it must return an
//! error instead of panicking on malformed input.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_deserialize
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sieve_query::filter::deserialize_json;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        let _ = deserialize_json(json);
    }
});
