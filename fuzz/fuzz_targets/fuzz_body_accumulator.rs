//! Fuzz target: `BodyAccumulator`
//!
//! The first two bytes pick the declared Content-Length and the chunk
//! size; the rest is delivered in chunks.  A finished body must be exactly
//! the declared length and a prefix of the input.
//!
//! cargo fuzz run fuzz_body_accumulator

#![no_main]

use hygronode::app::provisioning::{BodyAccumulator, MAX_BODY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let [len_hint, step, rest @ ..] = data else {
        return;
    };
    let declared = (*len_hint as usize * 4).min(MAX_BODY);
    let step = (*step as usize).max(1);

    let Ok(mut acc) = BodyAccumulator::new(Some(declared)) else {
        return;
    };
    for chunk in rest.chunks(step) {
        let take = chunk.len().min(acc.remaining());
        if take == 0 || acc.push(&chunk[..take]).is_err() {
            break;
        }
    }
    if let Ok(body) = acc.finish() {
        assert_eq!(body.len(), declared);
        assert_eq!(body.as_slice(), &rest[..declared]);
    }
});
