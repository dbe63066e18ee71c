//! Belgium (BE): BTW/TVA and the enterprise number (BCE/KBO).

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::TaxIdentity;
use crate::engine::Document;
use crate::tax::identity::check_code;
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_STANDARD, KEY_ZERO, RATE_GENERAL, RATE_INTERMEDIATE,
    RATE_REDUCED, RATE_ZERO, RateDef, RateValueDef, RegimeDef, vat_keys,
};

use super::date;

static ENTERPRISE_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[01]?\d{9}$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "BE".into(),
        currency: Code::from_static("EUR"),
        name: Text::en("Belgium")
            .with("nl", "België")
            .with("fr", "Belgique"),
        time_zone: "Europe/Brussels".into(),
        tax_scheme: Some(CATEGORY_VAT),
        categories: vec![
            CategoryDef::new("VAT", "BTW/TVA", "Belasting over de toegevoegde waarde")
                .keys(vat_keys())
                .rates(vec![
                    RateDef::new(RATE_ZERO, "Zero Rate")
                        .keys(&[KEY_ZERO])
                        .values(vec![RateValueDef::new(date(1996, 1, 1), dec!(0))]),
                    RateDef::new(RATE_GENERAL, "General Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(date(1996, 1, 1), dec!(21))]),
                    RateDef::new(RATE_INTERMEDIATE, "Intermediate Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(date(1996, 1, 1), dec!(12))]),
                    RateDef::new(RATE_REDUCED, "Reduced Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(date(1996, 1, 1), dec!(6))]),
                ])
                .source(
                    "FPS Finance: VAT rates",
                    "https://finance.belgium.be/en/enterprises/vat/vat-obligation/rates-and-calculation",
                ),
        ],
        tax_code_normalizer: Some(normalize_tax_identity),
        validator: Some(validate),
        ..Default::default()
    }
}

/// Default cleanup, then nine digit numbers gain their leading zero.
pub fn normalize_tax_identity(tid: &mut TaxIdentity) {
    crate::tax::identity::normalize_tax_identity(tid);
    if tid.code.as_str().len() == 9 && tid.code.as_str().chars().all(|c| c.is_ascii_digit()) {
        tid.code = Code::from(format!("0{}", tid.code));
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_enterprise_number)
}

/// `97 - (first eight digits mod 97)` must equal the last two digits.
pub fn check_enterprise_number(code: &str) -> Result<(), &'static str> {
    if !ENTERPRISE_NUMBER.is_match(code) {
        return Err("must be in a valid format");
    }
    let padded = format!("{code:0>10}");
    let (body, check) = padded.split_at(8);
    let body: u64 = body.parse().map_err(|_| "must be in a valid format")?;
    let check: u64 = check.parse().map_err(|_| "must be in a valid format")?;
    if 97 - body % 97 != check {
        return Err("invalid checksum");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn enterprise_numbers() {
        for code in ["0776091951", "776091951", "0417497106", "1234567894"] {
            assert_eq!(check_enterprise_number(code), Ok(()), "{code}");
        }
        assert_eq!(check_enterprise_number("0776091952"), Err("invalid checksum"));
        assert_eq!(check_enterprise_number("2776091951"), Err("must be in a valid format"));
        assert_eq!(check_enterprise_number("07760919"), Err("must be in a valid format"));
    }

    #[test]
    fn short_numbers_are_padded() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut tid = TaxIdentity::new("BE", "BE 776.091.951");
        registry.calculate(&mut tid).unwrap();
        assert_eq!(tid.code, "0776091951");
        assert!(registry.validate(&tid).is_ok());
    }
}
