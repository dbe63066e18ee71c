//! Germany (DE): Umsatzsteuer, the USt-IdNr tax identity and the two
//! national identities, Steuernummer and Steuerliche Identifikationsnummer.

use std::collections::HashMap;

use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, Key, Text};
use crate::core::error::FieldErrors;
use crate::core::types::{Identity, TaxIdentity};
use crate::engine::{Document, DocumentMut};
use crate::tax::identity::{check_code, digits};
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_STANDARD, KEY_ZERO, RATE_GENERAL, RATE_REDUCED, RATE_ZERO,
    RateDef, RateValueDef, RegimeDef, vat_keys,
};

use super::date;

/// Steuernummer, issued by the local tax office.
pub const IDENTITY_KEY_TAX_NUMBER: Key = Key::from_static("de-tax-number");
/// Steuerliche Identifikationsnummer, the lifelong personal tax ID.
pub const IDENTITY_KEY_TAX_ID: Key = Key::from_static("de-tax-id");

/// Two digit state prefixes of the 13 digit ELSTER Steuernummer.
const STATE_PREFIXES: [u32; 14] = [10, 11, 21, 22, 23, 24, 26, 27, 28, 30, 31, 32, 40, 41];

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "DE".into(),
        currency: Code::from_static("EUR"),
        name: Text::en("Germany").with("de", "Deutschland"),
        time_zone: "Europe/Berlin".into(),
        tax_scheme: Some(CATEGORY_VAT),
        identities: vec![
            Definition::with_key(
                IDENTITY_KEY_TAX_NUMBER,
                Text::en("Tax Number").with("de", "Steuernummer"),
            ),
            Definition::with_key(
                IDENTITY_KEY_TAX_ID,
                Text::en("Tax ID").with("de", "Steuerliche Identifikationsnummer"),
            ),
        ],
        categories: vec![vat()],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn vat() -> CategoryDef {
    CategoryDef::new("VAT", "MwSt", "Mehrwertsteuer")
        .keys(vat_keys())
        .rates(vec![
            RateDef::new(RATE_ZERO, "Zero Rate")
                .keys(&[KEY_ZERO])
                .values(vec![RateValueDef::new(date(2007, 1, 1), dec!(0))]),
            RateDef::new(RATE_GENERAL, "Standard Rate")
                .desc("Applies to all goods and services without an explicit other rate.")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2021, 1, 1), dec!(19)),
                    RateValueDef::new(date(2020, 7, 1), dec!(16)),
                    RateValueDef::new(date(2007, 1, 1), dec!(19)),
                ]),
            RateDef::new(RATE_REDUCED, "Reduced Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2021, 1, 1), dec!(7)),
                    RateValueDef::new(date(2020, 7, 1), dec!(5)),
                    RateValueDef::new(date(2007, 1, 1), dec!(7)),
                ]),
        ])
        .source(
            "Umsatzsteuergesetz (UStG) § 12",
            "https://www.gesetze-im-internet.de/ustg_1980/__12.html",
        )
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Identity(id) = doc {
        if is_national(id) {
            let code: String = id.code.as_str().chars().filter(char::is_ascii_digit).collect();
            id.code = code.into();
        }
    }
}

fn is_national(id: &Identity) -> bool {
    matches!(&id.key, Some(k) if *k == IDENTITY_KEY_TAX_NUMBER || *k == IDENTITY_KEY_TAX_ID)
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        Document::Identity(id) if is_national(id) => validate_identity(id),
        _ => FieldErrors::new(),
    }
}

fn validate_identity(id: &Identity) -> FieldErrors {
    if id.code.is_empty() {
        return FieldErrors::single("code", "cannot be blank");
    }
    let check = if id.key.as_ref() == Some(&IDENTITY_KEY_TAX_NUMBER) {
        check_tax_number(id.code.as_str())
    } else {
        check_tax_id(id.code.as_str())
    };
    match check {
        Ok(()) => FieldErrors::new(),
        Err(msg) => FieldErrors::single("code", msg),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_vat_number)
}

/// Nine digit USt-IdNr with its ISO 7064 MOD 11,10 check digit.
pub fn check_vat_number(code: &str) -> Result<(), &'static str> {
    let ds = digits(code)
        .filter(|d| d.len() == 9)
        .ok_or("must be in a valid format")?;
    if !mod_11_10_valid(&ds) {
        return Err("checksum mismatch");
    }
    Ok(())
}

/// Steuernummer in the unified 13 digit ELSTER layout or a 10 to 11 digit
/// state layout.
pub fn check_tax_number(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("invalid format: tax number should only contain digits")?;
    if !(10..=13).contains(&ds.len()) {
        return Err("invalid length");
    }
    if ds[0] == 0 {
        return Err("invalid format: first digit cannot be 0");
    }
    if ds.len() == 13 {
        let prefix = ds[0] * 10 + ds[1];
        if !STATE_PREFIXES.contains(&prefix) && !(50..=60).contains(&prefix) {
            return Err("invalid format: unknown state prefix");
        }
    }
    Ok(())
}

/// Eleven digit personal tax ID. Within the first ten digits exactly one
/// digit repeats, two or three times.
pub fn check_tax_id(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("invalid format: tax number should only contain digits")?;
    let ds = match ds.len() {
        10 | 11 => &ds[..],
        12 | 13 => &ds[2..],
        _ => return Err("invalid length"),
    };
    if ds[0] == 0 {
        return Err("invalid format: first digit cannot be 0");
    }
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for d in &ds[..10] {
        *counts.entry(*d).or_default() += 1;
    }
    let repeated = counts.values().filter(|c| (2..=3).contains(*c)).count();
    if counts.values().any(|c| *c > 3) {
        return Err("invalid format: a digit appears more than three times");
    }
    if repeated != 1 {
        return Err("invalid format: digit occurrence rule not satisfied");
    }
    if !mod_11_10_valid(ds) {
        return Err("checksum mismatch");
    }
    Ok(())
}

/// ISO 7064 MOD 11,10 over the full number including its check digit.
fn mod_11_10_valid(ds: &[u32]) -> bool {
    let Some((check, body)) = ds.split_last() else {
        return false;
    };
    let mut product = 10;
    for d in body {
        let sum = match (d + product) % 10 {
            0 => 10,
            s => s,
        };
        product = sum * 2 % 11;
    }
    let expected = match 11 - product {
        10 => 0,
        d => d,
    };
    expected == *check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn vat_numbers() {
        for code in ["136695976", "123456788", "111111125", "811907980"] {
            assert_eq!(check_vat_number(code), Ok(()), "{code}");
        }
        assert_eq!(check_vat_number("123456789"), Err("checksum mismatch"));
        assert_eq!(check_vat_number("12345678"), Err("must be in a valid format"));
    }

    #[test]
    fn tax_numbers() {
        assert_eq!(check_tax_number("2181508150"), Ok(()));
        assert_eq!(check_tax_number("9181081508155"), Err("invalid format: unknown state prefix"));
        assert_eq!(check_tax_number("5133081508159"), Ok(()));
        assert_eq!(check_tax_number("0181508150"), Err("invalid format: first digit cannot be 0"));
        assert_eq!(check_tax_number("123456789"), Err("invalid length"));
    }

    #[test]
    fn tax_ids_follow_the_occurrence_rule() {
        assert_eq!(
            check_tax_id("11111111111"),
            Err("invalid format: a digit appears more than three times")
        );
        assert_eq!(
            check_tax_id("1234567890"),
            Err("invalid format: digit occurrence rule not satisfied")
        );
    }

    #[test]
    fn national_identities_keep_digits_only() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut id = Identity {
            key: Some(IDENTITY_KEY_TAX_NUMBER),
            country: Some("DE".into()),
            code: "21/815/08150".into(),
            ..Default::default()
        };
        registry.calculate(&mut id).unwrap();
        assert_eq!(id.code, "2181508150");
        assert!(registry.validate(&id).is_ok());
    }

    #[test]
    fn covid_rates() {
        let lookup = |d| {
            vat()
                .lookup(Some(&KEY_STANDARD), Some(&RATE_REDUCED), d)
                .unwrap()
                .and_then(|l| l.percent)
        };
        assert_eq!(lookup(date(2020, 6, 30)), Some(dec!(7)));
        assert_eq!(lookup(date(2020, 12, 31)), Some(dec!(5)));
        assert_eq!(lookup(date(2021, 1, 1)), Some(dec!(7)));
    }
}
