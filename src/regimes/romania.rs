//! Romania (RO): VAT with the August 2025 rate change, CUI/CIF and CNP
//! identities, simplified and reverse-charge legal notes.

use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, NOTE_KEY_LEGAL, Note, Text};
use crate::core::error::FieldErrors;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::identity::{check_code, digits, weighted_sum};
use crate::tax::{
    CategoryDef, CorrectionDefinition, KEY_STANDARD, RATE_GENERAL, RATE_REDUCED,
    RATE_SUPER_REDUCED, RateDef, RateValueDef, RegimeDef, Scenario, ScenarioSet,
    TAG_REVERSE_CHARGE, TAG_SIMPLIFIED, vat_keys,
};

use super::date;

pub const IDENTITY_TYPE_CUI: Code = Code::from_static("CUI");
pub const IDENTITY_TYPE_CNP: Code = Code::from_static("CNP");

const CUI_WEIGHTS: [u32; 9] = [7, 5, 3, 2, 1, 7, 5, 3, 2];
const CNP_WEIGHTS: [u32; 12] = [2, 7, 9, 1, 4, 6, 3, 5, 8, 2, 7, 9];

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "RO".into(),
        currency: Code::from_static("RON"),
        name: Text::en("Romania").with("ro", "România"),
        time_zone: "Europe/Bucharest".into(),
        tax_scheme: Some(Code::from_static("VAT")),
        identities: identities(),
        scenarios: vec![scenarios()],
        corrections: vec![CorrectionDefinition::new(SCHEMA_INVOICE).types(&[
            INVOICE_TYPE_CREDIT_NOTE,
            INVOICE_TYPE_DEBIT_NOTE,
            INVOICE_TYPE_CORRECTIVE,
        ])],
        categories: vec![vat()],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn identities() -> Vec<Definition> {
    vec![
        Definition::with_code(
            IDENTITY_TYPE_CUI,
            Text::en("Unique Registration Code").with("ro", "Cod Unic de Înregistrare"),
        ),
        Definition::with_code(
            IDENTITY_TYPE_CNP,
            Text::en("Personal Numeric Code").with("ro", "Cod Numeric Personal"),
        )
        .pattern(r"^\d{13}$"),
    ]
}

fn scenarios() -> ScenarioSet {
    ScenarioSet::new(
        SCHEMA_INVOICE,
        vec![
            Scenario::new("Simplified invoice")
                .tags(&[TAG_SIMPLIFIED])
                .note(
                    Note::new(NOTE_KEY_LEGAL, "Factură simplificată / Simplified invoice.")
                        .with_src(TAG_SIMPLIFIED),
                ),
            Scenario::new("Reverse charge")
                .tags(&[TAG_REVERSE_CHARGE])
                .note(
                    Note::new(NOTE_KEY_LEGAL, "Reverse Charge / Taxare inversă.")
                        .with_src(TAG_REVERSE_CHARGE),
                ),
        ],
    )
}

fn vat() -> CategoryDef {
    CategoryDef::new("VAT", "TVA", "Taxa pe valoarea adăugată")
        .keys(vat_keys())
        .rates(vec![
            RateDef::new(RATE_GENERAL, "Standard rate").keys(&[KEY_STANDARD]).values(vec![
                RateValueDef::new(date(2025, 8, 1), dec!(21)),
                RateValueDef::new(date(2017, 1, 1), dec!(19)),
                RateValueDef::new(date(2016, 1, 1), dec!(20)),
                RateValueDef::new(date(2010, 7, 1), dec!(24)),
            ]),
            RateDef::new(RATE_REDUCED, "Reduced rate").keys(&[KEY_STANDARD]).values(vec![
                RateValueDef::new(date(2025, 8, 1), dec!(11)),
                RateValueDef::new(date(2017, 1, 1), dec!(9)),
            ]),
            // Merged into the reduced rate from August 2025.
            RateDef::new(RATE_SUPER_REDUCED, "Super-reduced rate")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2025, 8, 1), dec!(11)),
                    RateValueDef::new(date(2017, 1, 1), dec!(5)),
                ]),
        ])
        .source(
            "Codul Fiscal, Titlul VII",
            "https://static.anaf.ro/static/10/Anaf/legislatie/Cod_fiscal_norme_2023.htm",
        )
}

fn normalize(doc: DocumentMut<'_>) {
    match doc {
        DocumentMut::Identity(id) if id.identity_type.as_ref() == Some(&IDENTITY_TYPE_CNP) => {
            id.code = id.code.normalize_numerical();
        }
        DocumentMut::Identity(id) if id.identity_type.as_ref() == Some(&IDENTITY_TYPE_CUI) => {
            let code = id.code.normalize_alphanumerical();
            id.code = match code.as_str().strip_prefix("RO") {
                Some(rest) if !rest.is_empty() => Code::from(rest),
                _ => code,
            };
        }
        _ => {}
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        Document::Identity(id) => validate_identity(id),
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if !inv.invoice_type.is_in(&[
        INVOICE_TYPE_STANDARD,
        INVOICE_TYPE_CREDIT_NOTE,
        INVOICE_TYPE_DEBIT_NOTE,
        INVOICE_TYPE_CORRECTIVE,
    ]) {
        errs.add("type", "must be a valid value");
    }
    if inv.is_correction() && inv.preceding.is_empty() {
        errs.add(
            "preceding",
            "preceding invoice reference is mandatory for credit/debit notes (Art. 319 Fiscal Code)",
        );
    }
    if inv.supplier.tax_id.as_ref().is_none_or(|t| t.code.is_empty()) {
        errs.nest("supplier", FieldErrors::single("tax_id", "supplier must have a tax ID"));
    }
    if inv.customer.is_none() && !inv.has_tags(&[TAG_SIMPLIFIED]) {
        errs.add("customer", "customer is required for non-simplified invoices");
    }
    if inv.lines.is_empty() {
        errs.add("lines", "cannot be blank");
    }
    let mut lines = FieldErrors::new();
    for (i, line) in inv.lines.iter().enumerate() {
        let mut e = FieldErrors::new();
        if line.item.is_none() {
            e.add("item", "line item is required");
        }
        if line.quantity.is_zero() {
            e.add("quantity", "line quantity is required");
        }
        lines.nest(i.to_string(), e);
    }
    errs.nest("lines", lines);
    errs
}

fn validate_identity(id: &Identity) -> FieldErrors {
    let check = match id.identity_type.as_ref() {
        Some(t) if *t == IDENTITY_TYPE_CNP => check_cnp,
        Some(t) if *t == IDENTITY_TYPE_CUI => check_cui,
        _ => return FieldErrors::new(),
    };
    match check(id.code.as_str()) {
        Err(msg) if !id.code.is_empty() => FieldErrors::single("code", msg),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_cui)
}

/// CUI/CIF: 2 to 10 digits, the last being a mod 11 check over the body
/// padded left to nine digits.
pub fn check_cui(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("must contain only digits")?;
    if !(2..=10).contains(&ds.len()) {
        return Err("must be between 2 and 10 digits");
    }
    let (body, check) = ds.split_at(ds.len() - 1);
    let mut padded = vec![0; 9 - body.len()];
    padded.extend_from_slice(body);
    let expected = weighted_sum(&padded, &CUI_WEIGHTS) * 10 % 11 % 10;
    if expected != check[0] {
        return Err("invalid check digit");
    }
    Ok(())
}

/// CNP: 13 digits, first digit non-zero, weighted mod 11 check where 10
/// maps to 1.
pub fn check_cnp(code: &str) -> Result<(), &'static str> {
    if code.len() != 13 {
        return Err("CNP must be exactly 13 digits");
    }
    let ds = digits(code).ok_or("CNP must contain only digits")?;
    if ds[0] == 0 {
        return Err("invalid CNP first digit");
    }
    let rem = weighted_sum(&ds[..12], &CNP_WEIGHTS) % 11;
    let expected = if rem == 10 { 1 } else { rem };
    if expected != ds[12] {
        return Err("invalid CNP checksum");
    }
    Ok(())
}
