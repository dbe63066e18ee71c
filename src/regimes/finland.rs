//! Finland (FI): ALV and the three tax code formats.
//!
//! - Y-tunnus (business ID): seven digits and a weighted mod 11 check digit.
//! - Henkilötunnus (personal identity code): birth date, individual number
//!   and a mod 31 check character. The century mark is dropped on
//!   normalization.
//! - Veronumero (tax number for foreign workers): twelve digits, no check.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::TaxIdentity;
use crate::engine::Document;
use crate::tax::identity::{check_code, digits, normalize_tax_identity as normalize_default};
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_STANDARD, RATE_GENERAL, RATE_INTERMEDIATE, RATE_REDUCED,
    RateDef, RateValueDef, RegimeDef, vat_keys,
};

use super::date;

const ORG_WEIGHTS: [u32; 7] = [7, 9, 10, 5, 8, 4, 2];
const CHECK_CHARACTERS: &[u8; 31] = b"0123456789ABCDEFHJKLMNPRSTUVWXY";

static FULL_NATIONAL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(\d{6})[+\-ABCDEFXYWVU](.{4})$"));
static NATIONAL: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\d{6})(\d{3})(\d|[A-Z])$"));
static ORGANIZATION: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{8}$"));
static FOREIGN: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{12}$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "FI".into(),
        currency: Code::from_static("EUR"),
        name: Text::en("Finland").with("fi", "Suomi"),
        time_zone: "Europe/Helsinki".into(),
        tax_scheme: Some(CATEGORY_VAT),
        categories: vec![
            CategoryDef::new("VAT", "ALV", "Arvonlisävero")
                .keys(vat_keys())
                .rates(vec![
                    RateDef::new(RATE_GENERAL, "General Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![
                            RateValueDef::new(date(2024, 9, 1), dec!(25.5)),
                            RateValueDef::new(date(2013, 1, 1), dec!(24)),
                        ]),
                    RateDef::new(RATE_INTERMEDIATE, "Intermediate Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![
                            RateValueDef::new(date(2025, 1, 1), dec!(13.5)),
                            RateValueDef::new(date(2013, 1, 1), dec!(14)),
                        ]),
                    RateDef::new(RATE_REDUCED, "Reduced Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(date(2013, 1, 1), dec!(10))]),
                ])
                .source("Vero Skatt: VAT rates", "https://www.vero.fi/en/businesses-and-corporations/taxes-and-charges/vat/rates-of-vat/"),
        ],
        tax_code_normalizer: Some(normalize_tax_identity),
        validator: Some(validate),
        ..Default::default()
    }
}

/// Default cleanup, then the century mark of a personal identity code is
/// removed: `150600A905P` becomes `150600905P`.
pub fn normalize_tax_identity(tid: &mut TaxIdentity) {
    normalize_default(tid);
    let stripped = FULL_NATIONAL
        .captures(tid.code.as_str())
        .map(|c| format!("{}{}", &c[1], &c[2]));
    if let Some(code) = stripped {
        tid.code = Code::from(code);
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_tax_code)
}

pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    if let Some(c) = NATIONAL.captures(code) {
        check_national(&c[1], &c[2], &c[3])
    } else if ORGANIZATION.is_match(code) {
        check_business_id(code)
    } else if FOREIGN.is_match(code) {
        Ok(())
    } else {
        Err("unknown type")
    }
}

fn check_national(birth: &str, individual: &str, check: &str) -> Result<(), &'static str> {
    let day: u32 = birth[0..2].parse().map_err(|_| "invalid date")?;
    let month: u32 = birth[2..4].parse().map_err(|_| "invalid date")?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err("invalid date");
    }
    let num: u64 = format!("{birth}{individual}")
        .parse()
        .map_err(|_| "check character is invalid")?;
    let expected = CHECK_CHARACTERS[(num % 31) as usize];
    if check.as_bytes() != [expected] {
        return Err("check character is invalid");
    }
    Ok(())
}

fn check_business_id(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("check character is invalid")?;
    let sum: u32 = ds[..7].iter().zip(ORG_WEIGHTS).map(|(d, w)| d * w).sum();
    let expected = match 11 - sum % 11 {
        11 => 0,
        10 => return Err("check character is invalid"),
        d => d,
    };
    if expected != ds[7] {
        return Err("check character is invalid");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn personal_identity_codes() {
        for code in ["0312511011", "1111852277", "080462602T"] {
            assert_eq!(check_tax_code(code), Ok(()), "{code}");
        }
        assert_eq!(check_tax_code("0804626022"), Err("check character is invalid"));
        assert_eq!(check_tax_code("0000000000"), Err("invalid date"));
        assert_eq!(check_tax_code("081362602T"), Err("invalid date"));
    }

    #[test]
    fn business_ids() {
        for code in ["50774741", "12345671", "07654322", "00000000", "33145556"] {
            assert_eq!(check_tax_code(code), Ok(()), "{code}");
        }
        assert_eq!(check_tax_code("33145557"), Err("check character is invalid"));
    }

    #[test]
    fn foreign_and_unknown() {
        assert_eq!(check_tax_code("123456789012"), Ok(()));
        assert_eq!(check_tax_code("93471790A"), Err("unknown type"));
        assert_eq!(check_tax_code("0111111C"), Err("unknown type"));
    }

    #[test]
    fn century_mark_is_dropped() {
        let registry = RegistryBuilder::new().regime(new()).build();
        for (input, want) in [
            ("031251-1011", "0312511011"),
            ("150600A905P", "150600905P"),
            ("150600+905P", "150600905P"),
            ("FI0 8 0 4 6 2 - 6 0 2 T", "080462602T"),
        ] {
            let mut tid = TaxIdentity::new("FI", input);
            registry.calculate(&mut tid).unwrap();
            assert_eq!(tid.code, want);
        }
    }
}
