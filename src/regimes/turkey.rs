//! Turkey (TR): KDV and the two tax number formats, the 10 digit VKN for
//! legal entities and the 11 digit TCKN for individuals.

use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, Text};
use crate::core::error::FieldErrors;
use crate::core::types::{Identity, TaxIdentity};
use crate::engine::Document;
use crate::tax::identity::{check_code, digits};
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_STANDARD, RATE_GENERAL, RATE_REDUCED, RATE_SUPER_REDUCED,
    RateDef, RateValueDef, RegimeDef, vat_keys,
};

use super::date;

pub const IDENTITY_TYPE_TCKN: Code = Code::from_static("TCKN");

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "TR".into(),
        currency: Code::from_static("TRY"),
        name: Text::en("Turkey").with("tr", "Türkiye"),
        time_zone: "Europe/Istanbul".into(),
        tax_scheme: Some(CATEGORY_VAT),
        identities: vec![
            Definition::with_code(
                IDENTITY_TYPE_TCKN,
                Text::en("Turkish Identity Number").with("tr", "T.C. Kimlik Numarası"),
            )
            .pattern(r"^[1-9]\d{10}$"),
        ],
        categories: vec![kdv()],
        validator: Some(validate),
        ..Default::default()
    }
}

fn kdv() -> CategoryDef {
    CategoryDef::new("VAT", "KDV", "Katma Değer Vergisi")
        .keys(vat_keys())
        .rates(vec![
            RateDef::new(RATE_GENERAL, "Standard Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2023, 7, 10), dec!(20)),
                    RateValueDef::new(date(2001, 5, 15), dec!(18)),
                    RateValueDef::new(date(1999, 11, 28), dec!(17)),
                ]),
            RateDef::new(RATE_REDUCED, "Reduced Rate")
                .desc("Goods and services in List No. II of the KDV Law.")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2023, 7, 10), dec!(10)),
                    RateValueDef::new(date(1999, 11, 28), dec!(8)),
                ]),
            RateDef::new(RATE_SUPER_REDUCED, "Super-Reduced Rate")
                .desc("Goods and services in List No. I of the KDV Law.")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(date(1999, 11, 28), dec!(1))]),
        ])
        .source("Gelir İdaresi Başkanlığı", "https://www.gib.gov.tr/")
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        Document::Identity(id) => validate_identity(id),
        _ => FieldErrors::new(),
    }
}

fn validate_identity(id: &Identity) -> FieldErrors {
    if id.identity_type.as_ref() != Some(&IDENTITY_TYPE_TCKN) || id.code.is_empty() {
        return FieldErrors::new();
    }
    match check_tckn(id.code.as_str()) {
        Ok(()) => FieldErrors::new(),
        Err(msg) => FieldErrors::single("code", msg),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_tax_code)
}

/// VKN for 10 digits, TCKN for 11.
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    match code.len() {
        10 => check_vkn(code),
        11 => check_tckn(code),
        _ => Err("invalid format"),
    }
}

pub fn check_vkn(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).filter(|d| d.len() == 10).ok_or("invalid format")?;
    let mut sum = 0;
    for (i, d) in ds[..9].iter().enumerate() {
        let shift = 9 - i as u32;
        let product = (d + shift) % 10 * 2u32.pow(shift);
        sum += match product % 9 {
            0 if product > 0 => 9,
            r => r,
        };
    }
    if (10 - sum % 10) % 10 != ds[9] {
        return Err("invalid check digit");
    }
    Ok(())
}

pub fn check_tckn(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).filter(|d| d.len() == 11).ok_or("invalid format")?;
    if ds[0] == 0 {
        return Err("invalid format");
    }
    let odd = ds[0] + ds[2] + ds[4] + ds[6] + ds[8];
    let even = ds[1] + ds[3] + ds[5] + ds[7];
    let tenth = (odd * 7 + even * 9) % 10;
    if tenth != ds[9] {
        return Err("invalid check digit");
    }
    if ds[..10].iter().sum::<u32>() % 10 != ds[10] {
        return Err("invalid check digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vkn() {
        assert_eq!(check_tax_code("1234567890"), Ok(()));
        assert_eq!(check_tax_code("4840847211"), Ok(()));
        assert_eq!(check_tax_code("1234567891"), Err("invalid check digit"));
    }

    #[test]
    fn tckn() {
        assert_eq!(check_tax_code("10000000146"), Ok(()));
        assert_eq!(check_tax_code("12345678950"), Ok(()));
        assert_eq!(check_tax_code("10000000147"), Err("invalid check digit"));
        assert_eq!(check_tax_code("01234567890"), Err("invalid format"));
    }

    #[test]
    fn other_lengths() {
        assert_eq!(check_tax_code("123456789"), Err("invalid format"));
        assert_eq!(check_tax_code("12345678A0"), Err("invalid format"));
    }

    #[test]
    fn kdv_rise_in_2023() {
        let found = kdv().lookup(Some(&KEY_STANDARD), None, date(2023, 7, 9)).unwrap();
        assert_eq!(found.and_then(|l| l.percent), Some(dec!(18)));
        let found = kdv().lookup(Some(&KEY_STANDARD), None, date(2023, 7, 10)).unwrap();
        assert_eq!(found.and_then(|l| l.percent), Some(dec!(20)));
    }
}
