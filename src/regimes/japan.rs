//! Japan (JP): consumption tax (JCT) and the Qualified Invoice System.
//!
//! Registered issuers are identified by a T-number: the letter `T` and the
//! 13-digit corporate number, whose leading digit is a check digit over the
//! remaining twelve.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, NOTE_KEY_LEGAL, Note, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::identity::check_code;
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_EXEMPT, KEY_STANDARD, KEY_ZERO, RATE_EXEMPT, RATE_GENERAL,
    RATE_REDUCED, RATE_ZERO, RateDef, RateValueDef, RegimeDef, Scenario, ScenarioSet, TAG_EXPORT,
    TAG_SELF_BILLED, TAG_SIMPLIFIED, TagSet, vat_keys,
};

use super::{date, require_tax_code};

pub const IDENTITY_TYPE_CORPORATE_NUMBER: Code = Code::from_static("CN");
pub const IDENTITY_TYPE_QUALIFIED_INVOICE_ISSUER: Code = Code::from_static("QII");
pub const IDENTITY_TYPE_MY_NUMBER: Code = Code::from_static("MN");
pub const IDENTITY_TYPE_RESIDENT_REGISTRATION: Code = Code::from_static("RR");

static T_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^T\d{13}$"));
static CORPORATE_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{13}$"));
static QII_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[Tt]\d{13}$"));
static MY_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{12}$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "JP".into(),
        currency: Code::from_static("JPY"),
        name: Text::en("Japan").with("ja", "日本"),
        time_zone: "Asia/Tokyo".into(),
        tax_scheme: Some(CATEGORY_VAT),
        tags: vec![TagSet::new(
            SCHEMA_INVOICE,
            vec![Definition::with_key(
                TAG_EXPORT,
                Text::en("Export").with("ja", "輸出取引"),
            )],
        )],
        identities: identities(),
        scenarios: vec![scenarios()],
        categories: vec![jct()],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn identities() -> Vec<Definition> {
    vec![
        Definition::with_code(
            IDENTITY_TYPE_CORPORATE_NUMBER,
            Text::en("Corporate Number").with("ja", "法人番号"),
        ),
        Definition::with_code(
            IDENTITY_TYPE_QUALIFIED_INVOICE_ISSUER,
            Text::en("Qualified Invoice Issuer Registration Number")
                .with("ja", "適格請求書発行事業者登録番号"),
        ),
        Definition::with_code(
            IDENTITY_TYPE_MY_NUMBER,
            Text::en("Individual Number (My Number)").with("ja", "個人番号"),
        ),
        Definition::with_code(
            IDENTITY_TYPE_RESIDENT_REGISTRATION,
            Text::en("Resident Registration Code").with("ja", "住民票コード"),
        ),
    ]
}

fn scenarios() -> ScenarioSet {
    ScenarioSet::new(
        SCHEMA_INVOICE,
        vec![
            Scenario::new("Export").tags(&[TAG_EXPORT]).note(
                Note::new(NOTE_KEY_LEGAL, "輸出免税取引 / Export transaction exempt from consumption tax.")
                    .with_src(TAG_EXPORT),
            ),
            Scenario::new("Simplified qualified invoice")
                .tags(&[TAG_SIMPLIFIED])
                .note(
                    Note::new(NOTE_KEY_LEGAL, "適格簡易請求書 / Simplified qualified invoice.")
                        .with_src(TAG_SIMPLIFIED),
                ),
            Scenario::new("Self-billed").tags(&[TAG_SELF_BILLED]).note(
                Note::new(NOTE_KEY_LEGAL, "仕入明細書 / Self-billed invoice issued by the buyer.")
                    .with_src(TAG_SELF_BILLED),
            ),
        ],
    )
}

fn jct() -> CategoryDef {
    CategoryDef::new("VAT", "JCT", "Japanese Consumption Tax")
        .keys(vat_keys())
        .rates(vec![
            RateDef::new(RATE_GENERAL, "Standard Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![
                    RateValueDef::new(date(2019, 10, 1), dec!(10)),
                    RateValueDef::new(date(2014, 4, 1), dec!(8)),
                    RateValueDef::new(date(1997, 4, 1), dec!(5)),
                    RateValueDef::new(date(1989, 4, 1), dec!(3)),
                ]),
            RateDef::new(RATE_REDUCED, "Reduced Rate")
                .desc("Food and beverages excluding alcohol and dining out, and newspapers.")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(date(2019, 10, 1), dec!(8))]),
            RateDef::new(RATE_ZERO, "Zero Rate (Export)")
                .keys(&[KEY_ZERO])
                .values(vec![RateValueDef::new(date(1989, 4, 1), dec!(0))]),
            RateDef::new(RATE_EXEMPT, "Exempt").keys(&[KEY_EXEMPT]).exempt(),
        ])
        .source(
            "National Tax Agency: Consumption Tax",
            "https://www.nta.go.jp/english/taxes/consumption_tax/index.htm",
        )
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Identity(id) = doc {
        let code = id.code.normalize_alphanumerical();
        id.code = match code.as_str().strip_prefix("JP") {
            Some(rest) if !rest.is_empty() => Code::from(rest),
            _ => code,
        };
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
    errs.nest("supplier", validate_supplier(&inv.supplier));
    match &inv.customer {
        Some(customer) if customer.name.trim().is_empty() => {
            errs.nest("customer", FieldErrors::single("name", "cannot be blank"));
        }
        None if !inv.has_tags(&[TAG_SIMPLIFIED]) => errs.add("customer", "cannot be blank"),
        _ => {}
    }
    if inv.has_tags(&[TAG_EXPORT]) && !export_lines_zero_rated(&inv.lines) {
        errs.add("lines", "export invoices must use the zero rate for all VAT lines");
    }
    let mut lines = FieldErrors::new();
    for (i, line) in inv.lines.iter().enumerate() {
        let mut e = FieldErrors::new();
        if line.quantity.is_zero() {
            e.add("quantity", "cannot be blank");
        }
        if line.item.is_none() {
            e.add("item", "cannot be blank");
        }
        lines.nest(i.to_string(), e);
    }
    errs.nest("lines", lines);
    errs
}

fn validate_supplier(party: &Party) -> FieldErrors {
    let mut errs = require_tax_code(party);
    if party.name.trim().is_empty() {
        errs.add("name", "cannot be blank");
    }
    let mut addresses = FieldErrors::new();
    for (i, addr) in party.addresses.iter().enumerate() {
        let street = addr.street.as_deref().is_some_and(|s| !s.trim().is_empty());
        let locality = addr.locality.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !street && !locality {
            let mut e = FieldErrors::new();
            e.add("street", "cannot be blank");
            e.add("locality", "cannot be blank");
            addresses.nest(i.to_string(), e);
        }
    }
    errs.nest("addresses", addresses);
    errs
}

fn export_lines_zero_rated(lines: &[Line]) -> bool {
    lines
        .iter()
        .flat_map(|l| &l.taxes)
        .filter(|c| c.category == CATEGORY_VAT)
        .all(|c| c.key.as_ref() == Some(&KEY_ZERO))
}

fn validate_identity(id: &Identity) -> FieldErrors {
    let check: fn(&str) -> Result<(), &'static str> = match id.identity_type.as_ref() {
        Some(t) if *t == IDENTITY_TYPE_CORPORATE_NUMBER => check_corporate_number,
        Some(t) if *t == IDENTITY_TYPE_QUALIFIED_INVOICE_ISSUER => check_qii_number,
        Some(t) if *t == IDENTITY_TYPE_MY_NUMBER => check_my_number,
        _ => return FieldErrors::new(),
    };
    match check(id.code.as_str()) {
        Err(msg) if !id.code.is_empty() => FieldErrors::single("code", msg),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_t_number)
}

/// Registration number of a qualified invoice issuer, `T` plus 13 digits.
pub fn check_t_number(code: &str) -> Result<(), &'static str> {
    if !T_NUMBER.is_match(code) {
        return Err("must be 'T' followed by 13 digits");
    }
    check_digit_valid(&code[1..])
}

pub fn check_corporate_number(code: &str) -> Result<(), &'static str> {
    if !CORPORATE_NUMBER.is_match(code) {
        return Err("must be exactly 13 digits");
    }
    check_digit_valid(code)
}

fn check_qii_number(code: &str) -> Result<(), &'static str> {
    if !QII_NUMBER.is_match(code) {
        return Err("invalid Qualified Invoice Issuer format, expected T + 13 digits");
    }
    check_digit_valid(&code[1..])
}

fn check_my_number(code: &str) -> Result<(), &'static str> {
    if !MY_NUMBER.is_match(code) {
        return Err("invalid My Number format, expected 12 digits");
    }
    Ok(())
}

/// The first of 13 digits checks the other twelve, weighted 2 and 1
/// alternately from the left, modulo 9.
fn check_digit_valid(number: &str) -> Result<(), &'static str> {
    let ds: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if ds.len() != 13 {
        return Err("invalid check digit");
    }
    let sum: u32 = ds[1..]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 2 } else { *d })
        .sum();
    let expected = match sum % 9 {
        0 => 0,
        r => 9 - r,
    };
    if expected != ds[0] {
        return Err("invalid check digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceBuilder, LineBuilder, PartyBuilder};
    use crate::tax::RegistryBuilder;

    #[test]
    fn t_numbers() {
        assert_eq!(check_t_number("T7000012050002"), Ok(()));
        assert_eq!(check_t_number("T8000012050002"), Err("invalid check digit"));
        assert_eq!(check_t_number("7000012050002"), Err("must be 'T' followed by 13 digits"));
        assert_eq!(check_t_number("T70000120500"), Err("must be 'T' followed by 13 digits"));
    }

    #[test]
    fn corporate_number_shares_check_digit() {
        assert_eq!(check_corporate_number("7000012050002"), Ok(()));
        assert_eq!(check_corporate_number("1000012050002"), Err("invalid check digit"));
        assert_eq!(check_qii_number("t7000012050002"), Ok(()));
        assert_eq!(check_my_number("12345678901"), Err("invalid My Number format, expected 12 digits"));
    }

    #[test]
    fn identity_prefix_is_stripped() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut id = Identity::typed("CN", "JP 7000-0120-50002");
        id.country = Some("JP".into());
        registry.calculate(&mut id).unwrap();
        assert_eq!(id.code, "7000012050002");
        assert!(registry.validate(&id).is_ok());
    }

    fn export_invoice(key: crate::core::cbc::Key) -> Invoice {
        InvoiceBuilder::new(date(2024, 6, 1))
            .tag(TAG_EXPORT)
            .supplier(
                PartyBuilder::new("株式会社サンプル")
                    .tax_id("JP", "T7000012050002")
                    .build(),
            )
            .customer(PartyBuilder::new("Overseas Buyer Inc.").build())
            .line(
                LineBuilder::new("Machine parts", dec!(2), dec!(5000))
                    .tax(Combo::new("VAT").with_key(key))
                    .build(),
            )
            .build()
    }

    #[test]
    fn export_requires_zero_rate() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut inv = export_invoice(KEY_STANDARD);
        registry.calculate(&mut inv).unwrap();
        let err = registry.validate(&inv).unwrap_err().to_string();
        assert!(err.contains("lines: export invoices must use the zero rate for all VAT lines"), "{err}");

        let mut inv = export_invoice(KEY_ZERO);
        registry.calculate(&mut inv).unwrap();
        registry.validate(&inv).unwrap();
        assert_eq!(inv.lines[0].taxes[0].percent, Some(dec!(0)));
    }

    #[test]
    fn reduced_rate_from_2019() {
        let cat = jct();
        let found = cat.lookup(Some(&KEY_STANDARD), Some(&RATE_REDUCED), date(2019, 10, 1));
        assert_eq!(found.unwrap().and_then(|l| l.percent), Some(dec!(8)));
        let found = cat.lookup(Some(&KEY_STANDARD), None, date(2000, 1, 1));
        assert_eq!(found.unwrap().and_then(|l| l.percent), Some(dec!(5)));
    }
}
