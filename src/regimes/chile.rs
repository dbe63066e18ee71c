//! Chile (CL): IVA at 19% and the RUT with its modulo 11 check digit.
//!
//! Facturas (B2B) need the RUT and address of both parties. Boletas are
//! issued with the `simplified` tag and relax the customer requirements.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::{Invoice, Party, TaxIdentity};
use crate::engine::Document;
use crate::tax::identity::check_code;
use crate::tax::{
    CategoryDef, KEY_STANDARD, RATE_GENERAL, RateDef, RateValueDef, RegimeDef, TAG_SIMPLIFIED,
    vat_keys,
};

use super::{date, require_tax_code};

static RUT: LazyLock<Regex> = LazyLock::new(|| compile(r"^[1-9]\d{5,7}[0-9K]$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "CL".into(),
        currency: Code::from_static("CLP"),
        name: Text::en("Chile"),
        time_zone: "America/Santiago".into(),
        tax_scheme: Some(Code::from_static("VAT")),
        categories: vec![
            CategoryDef::new("VAT", "IVA", "Impuesto al Valor Agregado")
                .keys(vat_keys())
                .rates(vec![
                    RateDef::new(RATE_GENERAL, "General Rate")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(date(2003, 10, 1), dec!(19))]),
                ])
                .source(
                    "Ley 19888 - Law establishing 19% VAT rate",
                    "https://www.bcn.cl/leychile/Navegar?idNorma=213493",
                ),
        ],
        validator: Some(validate),
        ..Default::default()
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    errs.nest("supplier", validate_party(&inv.supplier));
    if !inv.has_tags(&[TAG_SIMPLIFIED]) {
        match &inv.customer {
            Some(customer) => errs.nest("customer", validate_party(customer)),
            None => errs.add("customer", "cannot be blank"),
        }
    }
    errs
}

fn validate_party(party: &Party) -> FieldErrors {
    let mut errs = require_tax_code(party);
    if party.addresses.is_empty() {
        errs.add("addresses", "cannot be blank");
    }
    errs
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_rut)
}

/// Validate a normalized RUT such as `77668208K`.
pub fn check_rut(code: &str) -> Result<(), &'static str> {
    if !RUT.is_match(code) {
        return Err("invalid RUT format");
    }
    let (body, check) = code.split_at(code.len() - 1);
    if rut_check_digit(body) != check.chars().next() {
        return Err("invalid RUT check digit");
    }
    Ok(())
}

/// Modulo 11 with multipliers cycling 2 to 7 from the rightmost digit.
fn rut_check_digit(body: &str) -> Option<char> {
    let mut sum = 0;
    for (i, c) in body.chars().rev().enumerate() {
        sum += c.to_digit(10)? * (2 + (i as u32 % 6));
    }
    match 11 - sum % 11 {
        11 => Some('0'),
        10 => Some('K'),
        d => char::from_digit(d, 10),
    }
}
