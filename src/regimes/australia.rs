//! Australia (AU): GST at 10% and the 11 digit ABN.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::TaxIdentity;
use crate::engine::Document;
use crate::tax::identity::{check_code, digits, weighted_sum};
use crate::tax::{
    CATEGORY_GST, CategoryDef, KEY_EXEMPT, KEY_STANDARD, KEY_ZERO, RATE_EXEMPT, RATE_GENERAL,
    RATE_ZERO, RateDef, RateValueDef, RegimeDef,
};

use super::date;

const ABN_WEIGHTS: [u32; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];

static ABN: LazyLock<Regex> = LazyLock::new(|| compile(r"^[1-9]\d{10}$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "AU".into(),
        currency: Code::from_static("AUD"),
        name: Text::en("Australia"),
        time_zone: "Australia/Sydney".into(),
        tax_scheme: Some(CATEGORY_GST),
        categories: vec![gst()],
        validator: Some(validate),
        ..Default::default()
    }
}

fn gst() -> CategoryDef {
    CategoryDef::new("GST", "GST", "Goods and Services Tax")
        .keys(vec![KEY_STANDARD, KEY_ZERO, KEY_EXEMPT])
        .rates(vec![
            RateDef::new(RATE_GENERAL, "General Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(date(2000, 7, 1), dec!(10))]),
            RateDef::new(RATE_ZERO, "GST-free")
                .desc("Basic food, some education and health services, exports.")
                .keys(&[KEY_ZERO])
                .values(vec![RateValueDef::new(date(2000, 7, 1), dec!(0))]),
            RateDef::new(RATE_EXEMPT, "Input Taxed").keys(&[KEY_EXEMPT]).exempt(),
        ])
        .source(
            "A New Tax System (Goods and Services Tax) Act 1999",
            "https://www.legislation.gov.au/C2004A00446/latest",
        )
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_abn)
}

/// Subtract one from the leading digit, then the weighted sum must be a
/// multiple of 89.
pub fn check_abn(code: &str) -> Result<(), &'static str> {
    if !ABN.is_match(code) {
        return Err("must be in a valid format");
    }
    let mut ds = digits(code).ok_or("must be in a valid format")?;
    ds[0] -= 1;
    if weighted_sum(&ds, &ABN_WEIGHTS) % 89 != 0 {
        return Err("invalid checksum");
    }
    Ok(())
}
