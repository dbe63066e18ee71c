#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut inv) = serde_json::from_slice::<fiskal::core::Invoice>(data) else {
        return;
    };
    // Must not panic; validation errors are fine.
    let _ = fiskal::calculate(&mut inv);
    let _ = fiskal::validate(&inv);
});
