//! India (IN): the dual GST model with central, state and integrated
//! components, GSTIN tax identities, PAN and HSN item codes.
//!
//! Rates vary widely by product and the split between central and state
//! components depends on the place of supply, so categories carry no rate
//! table and percentages are supplied on each combo.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::cbc::{Code, Definition, NOTE_KEY_LEGAL, Note, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::identity::check_code;
use crate::tax::{
    CATEGORY_GST, CategoryDef, CorrectionDefinition, RegimeDef, Scenario, ScenarioSet,
    TAG_REVERSE_CHARGE,
};

pub const IDENTITY_TYPE_PAN: Code = Code::from_static("PAN");
pub const IDENTITY_TYPE_HSN: Code = Code::from_static("HSN");

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

static GSTIN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$"));
static HSN: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?:\d{4}|\d{6}|\d{8})$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "IN".into(),
        currency: Code::from_static("INR"),
        name: Text::en("India"),
        time_zone: "Asia/Kolkata".into(),
        tax_scheme: Some(CATEGORY_GST),
        identities: vec![
            Definition::with_code(IDENTITY_TYPE_PAN, "Permanent Account Number")
                .pattern(r"^[A-Z]{5}[0-9]{4}[A-Z]$"),
            Definition::with_code(IDENTITY_TYPE_HSN, "Harmonized System of Nomenclature"),
        ],
        scenarios: vec![ScenarioSet::new(
            SCHEMA_INVOICE,
            vec![Scenario::new("Reverse charge").tags(&[TAG_REVERSE_CHARGE]).note(
                Note::new(NOTE_KEY_LEGAL, "Tax payable on reverse charge basis.")
                    .with_src(TAG_REVERSE_CHARGE),
            )],
        )],
        corrections: vec![
            CorrectionDefinition::new(SCHEMA_INVOICE)
                .types(&[INVOICE_TYPE_CREDIT_NOTE, INVOICE_TYPE_DEBIT_NOTE]),
        ],
        categories: vec![
            CategoryDef::new("CGST", "CGST", "Central Goods and Services Tax"),
            CategoryDef::new("SGST", "SGST", "State Goods and Services Tax"),
            CategoryDef::new("UTGST", "UTGST", "Union Territory Goods and Services Tax"),
            CategoryDef::new("IGST", "IGST", "Integrated Goods and Services Tax"),
            CategoryDef::new("CESS", "Cess", "Compensation Cess"),
        ],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Identity(id) = doc {
        if id.identity_type.as_ref() == Some(&IDENTITY_TYPE_PAN) {
            id.code = id.code.normalize_alphanumerical();
        }
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        Document::Identity(id) if id.identity_type.as_ref() == Some(&IDENTITY_TYPE_HSN) => {
            match check_hsn(id.code.as_str()) {
                Err(msg) if !id.code.is_empty() => FieldErrors::single("code", msg),
                _ => FieldErrors::new(),
            }
        }
        Document::Item(item) => validate_item(item),
        _ => FieldErrors::new(),
    }
}

/// Goods and services need their HSN or SAC classification.
fn validate_item(item: &Item) -> FieldErrors {
    let has_hsn = item
        .identities
        .iter()
        .any(|id| id.identity_type.as_ref() == Some(&IDENTITY_TYPE_HSN));
    if has_hsn {
        FieldErrors::new()
    } else {
        FieldErrors::single("identities", "must include an HSN code")
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_gstin)
}

/// 15 character GSTIN: state code, PAN, entity number, `Z` and a base 36
/// check character.
pub fn check_gstin(code: &str) -> Result<(), &'static str> {
    if !GSTIN.is_match(code) {
        return Err("must be in a valid format");
    }
    let bytes = code.as_bytes();
    let mut sum = 0;
    for (i, b) in bytes[..14].iter().enumerate() {
        let value = base36(*b).ok_or("must be in a valid format")?;
        let product = value * if i % 2 == 0 { 1 } else { 2 };
        sum += product / 36 + product % 36;
    }
    let expected = BASE36[((36 - sum % 36) % 36) as usize];
    if expected != bytes[14] {
        return Err("checksum mismatch");
    }
    Ok(())
}

fn base36(b: u8) -> Option<u32> {
    BASE36.iter().position(|c| *c == b).map(|p| p as u32)
}

pub fn check_hsn(code: &str) -> Result<(), &'static str> {
    if HSN.is_match(code) {
        Ok(())
    } else {
        Err("must be a 4, 6, or 8 digit number")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn gstin_checksum() {
        assert_eq!(check_gstin("27AAPFU0939F1ZV"), Ok(()));
        assert_eq!(check_gstin("29AAGCB7383J1Z4"), Ok(()));
        assert_eq!(check_gstin("27AAPFU0939F1Z0"), Err("checksum mismatch"));
        assert_eq!(check_gstin("27AAPFU0939F1AV"), Err("must be in a valid format"));
    }

    #[test]
    fn hsn_lengths() {
        for code in ["1234", "123456", "12345678"] {
            assert_eq!(check_hsn(code), Ok(()));
        }
        for code in ["123", "12345", "1234567", "123456789", "1234A6"] {
            assert_eq!(check_hsn(code), Err("must be a 4, 6, or 8 digit number"), "{code}");
        }
    }

    #[test]
    fn pan_identities() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut id = Identity::typed("PAN", "bajpc 4350m");
        id.country = Some("IN".into());
        registry.calculate(&mut id).unwrap();
        assert_eq!(id.code, "BAJPC4350M");
        assert!(registry.validate(&id).is_ok());

        let mut short = Identity::typed("PAN", "ABC1234F");
        short.country = Some("IN".into());
        let err = registry.validate(&short).unwrap_err().to_string();
        assert_eq!(err, "code: must be in a valid format.");
    }

    #[test]
    fn items_need_hsn() {
        let item = Item {
            name: "Cotton shirts".into(),
            ..Default::default()
        };
        assert!(validate_item(&item).contains("identities"));
        let item = Item {
            identities: vec![Identity::typed("HSN", "6205")],
            ..item
        };
        assert!(validate_item(&item).is_empty());
    }
}
