//! Fuzz target: `AdElements` / `well_formed`
//!
//! Walks arbitrary bytes as an advertising payload and asserts that the
//! element iterator never reads past the input and agrees with
//! `well_formed` on where a valid payload ends.
//!
//! cargo fuzz run fuzz_ad_elements

#![no_main]

use libfuzzer_sys::fuzz_target;
use pawr_responder::advertising::{AdElements, well_formed};

fuzz_target!(|data: &[u8]| {
    let mut consumed = 0usize;
    for element in AdElements::new(data) {
        consumed += element.data.len() + 2;
        assert!(consumed <= data.len(), "iterator ran past the payload");
    }

    if well_formed(data) {
        assert_eq!(consumed, data.len());
    }
});
