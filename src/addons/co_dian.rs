//! Colombia DIAN UBL 2.1 electronic invoicing.
//!
//! Credit and debit notes must reference the corrected invoice with the
//! DIAN correction concept, and Colombian parties carry their municipality
//! and fiscal responsibility codes.

use crate::core::cbc::{Code, Definition, Key, Text};
use crate::core::error::FieldErrors;
use crate::core::extensions::ExtRule;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::{AddonDef, CorrectionDefinition, TAG_SIMPLIFIED};

pub const KEY: Key = Key::from_static("co-dian-v2");

pub const EXT_KEY_MUNICIPALITY: Key = Key::from_static("co-dian-municipality");
pub const EXT_KEY_CREDIT_CODE: Key = Key::from_static("co-dian-credit-code");
pub const EXT_KEY_DEBIT_CODE: Key = Key::from_static("co-dian-debit-code");
pub const EXT_KEY_FISCAL_RESPONSIBILITY: Key = Key::from_static("co-dian-fiscal-responsibility");

/// Tax code DIAN assigns to anonymous final consumers.
pub const TAX_CODE_FINAL_CONSUMER: &str = "222222222222";

const DEFAULT_FISCAL_RESPONSIBILITY: &str = "R-99-PN";

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        name: Text::en("Colombia DIAN UBL 2.X"),
        description: Some(Text::en(
            "Extensions to support the Colombian DIAN (Dirección de Impuestos y Aduanas \
             Nacionales) specifications for electronic invoicing based on UBL 2.1.",
        )),
        extensions: extensions(),
        corrections: vec![
            CorrectionDefinition::new(SCHEMA_INVOICE)
                .types(&[INVOICE_TYPE_CREDIT_NOTE, INVOICE_TYPE_DEBIT_NOTE])
                .reason_required(),
        ],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn extensions() -> Vec<Definition> {
    let code = |c: &'static str, name: &'static str| Definition::with_code(Code::from_static(c), name);
    vec![
        Definition::with_key(EXT_KEY_MUNICIPALITY, "DIAN Municipality Code")
            .desc("Five digit DANE code of the municipality where the party is registered.")
            .pattern(r"^\d{5}$"),
        Definition::with_key(EXT_KEY_CREDIT_CODE, "Credit Code")
            .desc("DIAN correction concept for credit notes.")
            .values(vec![
                code("1", "Partial refund"),
                code("2", "Revoked"),
                code("3", "Discount"),
                code("4", "Adjustment"),
                code("5", "Other"),
            ]),
        Definition::with_key(EXT_KEY_DEBIT_CODE, "Debit Code")
            .desc("DIAN correction concept for debit notes.")
            .values(vec![
                code("1", "Interest"),
                code("2", "Pending charges"),
                code("3", "Change in value"),
                code("4", "Other"),
            ]),
        Definition::with_key(EXT_KEY_FISCAL_RESPONSIBILITY, "Fiscal Responsibility Code")
            .values(vec![
                code("O-13", "Major taxpayer"),
                code("O-15", "Self-withholder"),
                code("O-23", "VAT withholding agent"),
                code("O-47", "Simple tax regime"),
                code(DEFAULT_FISCAL_RESPONSIBILITY, "Not applicable - Others"),
            ]),
    ]
}

fn is_colombian(party: &Party) -> bool {
    party.tax_country() == Some("CO")
}

fn normalize(doc: DocumentMut<'_>) {
    match doc {
        DocumentMut::Invoice(inv) => {
            normalize_party(&mut inv.supplier);
            if let Some(customer) = inv.customer.as_mut() {
                normalize_party(customer);
            }
        }
        DocumentMut::Party(party) => normalize_party(party),
        _ => {}
    }
}

/// The tax identity zone moves into the municipality extension and a
/// missing fiscal responsibility defaults to "not applicable".
fn normalize_party(party: &mut Party) {
    if !is_colombian(party) {
        return;
    }
    if let Some(zone) = party.tax_id.as_mut().and_then(|t| t.zone.take()) {
        if !party.ext.has(&[EXT_KEY_MUNICIPALITY]) {
            party.ext.set(EXT_KEY_MUNICIPALITY, zone);
        }
    }
    if !party.ext.has(&[EXT_KEY_FISCAL_RESPONSIBILITY]) {
        party
            .ext
            .set(EXT_KEY_FISCAL_RESPONSIBILITY, DEFAULT_FISCAL_RESPONSIBILITY);
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if !inv.invoice_type.is_in(&[
        INVOICE_TYPE_STANDARD,
        INVOICE_TYPE_CREDIT_NOTE,
        INVOICE_TYPE_DEBIT_NOTE,
        INVOICE_TYPE_PROFORMA,
    ]) {
        errs.add("type", "must be a valid value");
    }
    errs.nest("supplier", validate_party(&inv.supplier));
    match &inv.customer {
        Some(customer) => {
            let mut c = validate_party(customer);
            if !inv.has_tags(&[TAG_SIMPLIFIED]) && customer.tax_id.is_none() {
                c.add("tax_id", "cannot be blank");
            }
            errs.nest("customer", c);
        }
        None if !inv.has_tags(&[TAG_SIMPLIFIED]) => errs.add("customer", "cannot be blank"),
        None => {}
    }
    let rule = if inv.invoice_type == INVOICE_TYPE_CREDIT_NOTE {
        Some(ExtRule::require(&[EXT_KEY_CREDIT_CODE]))
    } else if inv.invoice_type == INVOICE_TYPE_DEBIT_NOTE {
        Some(ExtRule::require(&[EXT_KEY_DEBIT_CODE]))
    } else {
        None
    };
    if let Some(rule) = rule {
        let mut preceding = FieldErrors::new();
        for (i, p) in inv.preceding.iter().enumerate() {
            let mut e = FieldErrors::new();
            e.nest("ext", rule.check(&p.ext));
            preceding.nest(i.to_string(), e);
        }
        errs.nest("preceding", preceding);
    }
    errs
}

fn validate_party(party: &Party) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if !is_colombian(party) {
        return errs;
    }
    let Some(tid) = &party.tax_id else {
        return errs;
    };
    if tid.code.is_empty() {
        errs.nest("tax_id", FieldErrors::single("code", "cannot be blank"));
    }
    let mut required = vec![EXT_KEY_FISCAL_RESPONSIBILITY];
    if !tid.code.is_empty() && tid.code != TAX_CODE_FINAL_CONSUMER {
        required.insert(0, EXT_KEY_MUNICIPALITY);
    }
    errs.nest("ext", ExtRule::require(&required).check(&party.ext));
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PartyBuilder;

    fn colombian(code: &str) -> Party {
        let mut p = PartyBuilder::new("Cliente S.A.S.").tax_id("CO", code).build();
        p.addresses.push(Address {
            locality: Some("Bogotá".into()),
            ..Default::default()
        });
        p
    }

    #[test]
    fn zone_becomes_municipality() {
        let mut party = colombian("9014586527");
        if let Some(tid) = party.tax_id.as_mut() {
            tid.zone = Some(Code::from("11001"));
        }
        normalize_party(&mut party);
        assert_eq!(party.ext.get(&EXT_KEY_MUNICIPALITY), Some(&Code::from("11001")));
        assert_eq!(
            party.ext.get(&EXT_KEY_FISCAL_RESPONSIBILITY),
            Some(&Code::from(DEFAULT_FISCAL_RESPONSIBILITY))
        );
        assert!(party.tax_id.as_ref().is_some_and(|t| t.zone.is_none()));
        assert!(validate_party(&party).is_empty());
    }

    #[test]
    fn municipality_required_unless_final_consumer() {
        let mut party = colombian("9014586527");
        normalize_party(&mut party);
        assert!(validate_party(&party).contains("ext.co-dian-municipality"));

        let mut consumer = colombian(TAX_CODE_FINAL_CONSUMER);
        normalize_party(&mut consumer);
        assert!(validate_party(&consumer).is_empty());
    }

    #[test]
    fn foreign_parties_are_skipped() {
        let party = PartyBuilder::new("Acme Inc").tax_id("US", "").build();
        assert!(validate_party(&party).is_empty());
    }
}
