//! Tax identity normalization and checksum validation across regimes.
//!
//! Run with: `cargo test --test tax_id_tests`

use fiskal::core::TaxIdentity;
use pretty_assertions::assert_eq;

fn normalized(country: &str, raw: &str) -> TaxIdentity {
    let mut tid = TaxIdentity::new(country, raw);
    fiskal::calculate(&mut tid).unwrap();
    tid
}

#[test]
fn formatted_codes_normalize_and_validate() {
    let cases = [
        ("AU", "51 824 753 556", "51824753556"),
        ("BE", "BE 776.091.951", "0776091951"),
        ("BR", "05.104.582/0001-70", "05104582000170"),
        ("CL", "77.668.208-K", "77668208K"),
        ("CO", "901.458.652-7", "9014586527"),
        ("DE", "DE 111 111 125", "111111125"),
        ("FI", "FI 5077-4741", "50774741"),
        ("IN", "27aapfu0939f1zv", "27AAPFU0939F1ZV"),
        ("IT", "IT 00743110157", "00743110157"),
        ("PA", "8-442-445-90", "8-442-445-90"),
        ("RO", "RO 18 547 290", "18547290"),
        ("TR", "4840847211", "4840847211"),
    ];
    for (country, raw, expected) in cases {
        let tid = normalized(country, raw);
        assert_eq!(tid.code, expected, "{country} {raw}");
        assert!(fiskal::validate(&tid).is_ok(), "{country} {raw}");
    }
}

#[test]
fn checksum_failures_are_reported_on_code() {
    let cases = [
        ("AU", "12345678901", "invalid checksum"),
        ("CO", "9014586528", "checksum mismatch"),
        ("DE", "123456789", "checksum mismatch"),
        ("FI", "33145557", "check character is invalid"),
        ("IT", "00743110158", "invalid check digit"),
        ("PA", "8-442-445-91", "dv checksum failed"),
        ("RO", "18547291", "invalid check digit"),
        ("TR", "1234567891", "invalid check digit"),
    ];
    for (country, code, msg) in cases {
        let tid = TaxIdentity::new(country, code);
        let err = fiskal::validate(&tid).unwrap_err();
        assert_eq!(err.to_string(), format!("code: {msg}."), "{country} {code}");
    }
}

#[test]
fn empty_codes_are_accepted() {
    assert!(fiskal::validate(&TaxIdentity::new("RO", "")).is_ok());
}

#[test]
fn unknown_country_is_rejected() {
    let err = fiskal::validate(&TaxIdentity::new("XX", "123")).unwrap_err();
    assert_eq!(err.to_string(), "country: must be a valid value.");
}

#[test]
fn countries_without_regime_only_get_generic_rules() {
    let tid = normalized("US", "us-12 3456789");
    assert!(fiskal::validate(&tid).is_ok());
}
