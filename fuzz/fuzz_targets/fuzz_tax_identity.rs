#![no_main]

use libfuzzer_sys::fuzz_target;

const COUNTRIES: [&str; 14] = [
    "AU", "BE", "BR", "CL", "CO", "DE", "FI", "IN", "IT", "JP", "PA", "RO", "TR", "US",
];

fuzz_target!(|data: &[u8]| {
    let Some((&pick, rest)) = data.split_first() else {
        return;
    };
    if let Ok(code) = std::str::from_utf8(rest) {
        let country = COUNTRIES[pick as usize % COUNTRIES.len()];
        let mut tid = fiskal::core::TaxIdentity::new(country, code);
        // Must not panic; rejected codes are fine.
        let _ = fiskal::calculate(&mut tid);
        let _ = fiskal::validate(&tid);
    }
});
