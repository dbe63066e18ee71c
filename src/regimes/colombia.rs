//! Colombia (CO): IVA with national and municipal consumption taxes, three
//! retained taxes and the NIT with its prime-weighted check digit.

use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text};
use crate::core::error::FieldErrors;
use crate::core::types::*;
use crate::engine::Document;
use crate::tax::identity::{check_code, digits};
use crate::tax::{
    CategoryDef, CorrectionDefinition, KEY_STANDARD, RATE_GENERAL, RATE_REDUCED, RateDef,
    RateValueDef, RegimeDef, vat_keys,
};

use super::{date, require_tax_code};

pub const TAX_CATEGORY_IC: Code = Code::from_static("IC");
pub const TAX_CATEGORY_ICA: Code = Code::from_static("ICA");
pub const TAX_CATEGORY_INC: Code = Code::from_static("INC");
pub const TAX_CATEGORY_RETE_IVA: Code = Code::from_static("RVAT");
pub const TAX_CATEGORY_RETE_RENTA: Code = Code::from_static("RR");
pub const TAX_CATEGORY_RETE_ICA: Code = Code::from_static("RICA");

/// Applied from the rightmost body digit leftwards.
const NIT_WEIGHTS: [u32; 15] = [3, 7, 13, 17, 19, 23, 29, 37, 41, 43, 47, 53, 59, 67, 71];

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "CO".into(),
        currency: Code::from_static("COP"),
        name: Text::en("Colombia"),
        time_zone: "America/Bogota".into(),
        tax_scheme: Some(Code::from_static("VAT")),
        corrections: vec![
            CorrectionDefinition::new(SCHEMA_INVOICE)
                .types(&[INVOICE_TYPE_CREDIT_NOTE, INVOICE_TYPE_DEBIT_NOTE])
                .reason_required(),
        ],
        categories: categories(),
        validator: Some(validate),
        ..Default::default()
    }
}

fn categories() -> Vec<CategoryDef> {
    vec![
        CategoryDef::new("VAT", "IVA", "Impuesto al Valor Agregado")
            .keys(vat_keys())
            .rates(vec![
                RateDef::new(RATE_GENERAL, "General Rate")
                    .keys(&[KEY_STANDARD])
                    .values(vec![
                        RateValueDef::new(date(2017, 1, 1), dec!(19)),
                        RateValueDef::new(date(2006, 1, 1), dec!(16)),
                    ]),
                RateDef::new(RATE_REDUCED, "Reduced Rate")
                    .keys(&[KEY_STANDARD])
                    .values(vec![RateValueDef::new(date(2006, 1, 1), dec!(5))]),
            ]),
        CategoryDef::new("IC", "IC", "Impuesto al Consumo"),
        CategoryDef::new("ICA", "ICA", "Impuesto de Industria y Comercio"),
        CategoryDef::new("INC", "INC", "Impuesto Nacional al Consumo"),
        CategoryDef::new("RVAT", "ReteIVA", "Retención en la fuente por el IVA").retained(),
        CategoryDef::new("RICA", "ReteICA", "Retención en la fuente por el ICA").retained(),
        CategoryDef::new("RR", "ReteRenta", "Retención en la fuente por el Impuesto de la Renta")
            .retained(),
    ]
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
    if !inv.currency.is_empty() && inv.currency != "COP" {
        errs.add("currency", "must be a valid value");
    }
    if !inv.invoice_type.is_in(&[
        INVOICE_TYPE_STANDARD,
        INVOICE_TYPE_CREDIT_NOTE,
        INVOICE_TYPE_DEBIT_NOTE,
        INVOICE_TYPE_PROFORMA,
    ]) {
        errs.add("type", "must be a valid value");
    }
    errs.nest("supplier", validate_party(&inv.supplier));
    if let Some(customer) = &inv.customer {
        errs.nest("customer", validate_party(customer));
    }
    errs
}

/// Parties need a tax code; Colombian ones also an address.
fn validate_party(party: &Party) -> FieldErrors {
    let mut errs = require_tax_code(party);
    if party.tax_country() == Some("CO") && party.addresses.is_empty() {
        errs.add("addresses", "cannot be blank");
    }
    errs
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_nit)
}

/// NIT of 9 or 10 digits, the last being the check digit.
pub fn check_nit(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("contains invalid characters")?;
    if ds.len() > 10 {
        return Err("too long");
    }
    if ds.len() < 9 {
        return Err("too short");
    }
    let (body, check) = ds.split_at(ds.len() - 1);
    let sum: u32 = body.iter().rev().zip(NIT_WEIGHTS).map(|(d, w)| d * w).sum();
    let rem = sum % 11;
    let expected = if rem >= 2 { 11 - rem } else { rem };
    if expected != check[0] {
        return Err("checksum mismatch");
    }
    Ok(())
}
