//! EN 16931-1:2017, the European semantic model for electronic invoices.
//!
//! Combos are mapped onto UNTDID 5305 tax category codes, invoice types
//! onto UNTDID 1001 document types, and payment means keys onto UNTDID
//! 4461 codes, so that documents convert cleanly into UBL or CII.
//!
//! | Tax key | UNTDID 5305 |
//! |---|---|
//! | standard | S |
//! | zero | Z |
//! | exempt | E |
//! | reverse-charge | AE |
//! | intra-community | K |
//! | export | G |
//! | outside-scope | O |
//!
//! Any category other than VAT and GST is treated as outside the scope.

use crate::core::cbc::{Code, Key, Text};
use crate::core::error::FieldErrors;
use crate::core::extensions::{ExtRule, Extensions};
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::{
    AddonDef, CATEGORY_GST, CATEGORY_VAT, KEY_EXEMPT, KEY_EXPORT, KEY_INTRA_COMMUNITY,
    KEY_OUTSIDE_SCOPE, KEY_REVERSE_CHARGE, KEY_STANDARD, KEY_ZERO, Scenario, ScenarioSet,
    TAG_PARTIAL, TAG_SELF_BILLED,
};

pub const KEY: Key = Key::from_static("eu-en16931-v2017");

pub const EXT_KEY_DOCUMENT_TYPE: Key = Key::from_static("untdid-document-type");
pub const EXT_KEY_TAX_CATEGORY: Key = Key::from_static("untdid-tax-category");
pub const EXT_KEY_PAYMENT_MEANS: Key = Key::from_static("untdid-payment-means");
pub const EXT_KEY_VATEX: Key = Key::from_static("cef-vatex");

pub const TAX_CATEGORY_STANDARD: &str = "S";
pub const TAX_CATEGORY_ZERO: &str = "Z";
pub const TAX_CATEGORY_EXEMPT: &str = "E";
pub const TAX_CATEGORY_REVERSE_CHARGE: &str = "AE";
pub const TAX_CATEGORY_INTRA_COMMUNITY: &str = "K";
pub const TAX_CATEGORY_EXPORT: &str = "G";
pub const TAX_CATEGORY_OUTSIDE_SCOPE: &str = "O";

static VAT_KEY_MAP: [(Key, &str); 7] = [
    (KEY_STANDARD, TAX_CATEGORY_STANDARD),
    (KEY_ZERO, TAX_CATEGORY_ZERO),
    (KEY_EXEMPT, TAX_CATEGORY_EXEMPT),
    (KEY_REVERSE_CHARGE, TAX_CATEGORY_REVERSE_CHARGE),
    (KEY_INTRA_COMMUNITY, TAX_CATEGORY_INTRA_COMMUNITY),
    (KEY_EXPORT, TAX_CATEGORY_EXPORT),
    (KEY_OUTSIDE_SCOPE, TAX_CATEGORY_OUTSIDE_SCOPE),
];

static GST_KEY_MAP: [(Key, &str); 5] = [
    (KEY_STANDARD, TAX_CATEGORY_STANDARD),
    (KEY_ZERO, TAX_CATEGORY_ZERO),
    (KEY_EXEMPT, TAX_CATEGORY_EXEMPT),
    (KEY_EXPORT, TAX_CATEGORY_EXPORT),
    (KEY_OUTSIDE_SCOPE, TAX_CATEGORY_OUTSIDE_SCOPE),
];

static PAYMENT_MEANS_MAP: [(Key, &str); 8] = [
    (Key::from_static("any"), "1"),
    (Key::from_static("cash"), "10"),
    (Key::from_static("cheque"), "20"),
    (Key::from_static("credit-transfer"), "30"),
    (Key::from_static("debit-transfer"), "31"),
    (Key::from_static("card"), "48"),
    (Key::from_static("direct-debit"), "49"),
    (Key::from_static("other"), "ZZZ"),
];

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        name: Text::en("EN 16931-1:2017"),
        description: Some(Text::en(
            "Support for the European Norm (EN) 16931-1:2017 standard for electronic \
             invoicing. Tax keys, document types and payment means are mapped onto UNTDID \
             codes; check the resulting extension codes to be sure the assumptions hold.",
        )),
        scenarios: vec![scenarios()],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn scenarios() -> ScenarioSet {
    ScenarioSet::new(
        SCHEMA_INVOICE,
        vec![
            Scenario::new("Commercial invoice")
                .types(&[INVOICE_TYPE_STANDARD])
                .ext(EXT_KEY_DOCUMENT_TYPE, "380"),
            Scenario::new("Partial invoice")
                .types(&[INVOICE_TYPE_STANDARD])
                .tags(&[TAG_PARTIAL])
                .ext(EXT_KEY_DOCUMENT_TYPE, "326"),
            Scenario::new("Self-billed invoice")
                .types(&[INVOICE_TYPE_STANDARD])
                .tags(&[TAG_SELF_BILLED])
                .ext(EXT_KEY_DOCUMENT_TYPE, "389"),
            Scenario::new("Credit note")
                .types(&[INVOICE_TYPE_CREDIT_NOTE])
                .ext(EXT_KEY_DOCUMENT_TYPE, "381"),
            Scenario::new("Debit note")
                .types(&[INVOICE_TYPE_DEBIT_NOTE])
                .ext(EXT_KEY_DOCUMENT_TYPE, "383"),
            Scenario::new("Corrected invoice")
                .types(&[INVOICE_TYPE_CORRECTIVE])
                .ext(EXT_KEY_DOCUMENT_TYPE, "384"),
        ],
    )
}

fn normalize(doc: DocumentMut<'_>) {
    match doc {
        DocumentMut::Invoice(inv) => {
            inv.tax.get_or_insert_with(InvoiceTax::default);
        }
        DocumentMut::Combo(combo) => normalize_combo(combo),
        DocumentMut::PaymentInstructions(instr) => {
            if let Some((_, code)) = PAYMENT_MEANS_MAP.iter().find(|(k, _)| *k == instr.key) {
                if !instr.ext.has(&[EXT_KEY_PAYMENT_MEANS]) {
                    instr.ext.set(EXT_KEY_PAYMENT_MEANS, *code);
                }
            }
        }
        _ => {}
    }
}

fn key_map(category: &Code) -> Option<&'static [(Key, &'static str)]> {
    if *category == CATEGORY_VAT {
        Some(&VAT_KEY_MAP)
    } else if *category == CATEGORY_GST {
        Some(&GST_KEY_MAP)
    } else {
        None
    }
}

/// A combo without a key takes it from its tax category code, falling back
/// to standard; the tax category code is then derived from the key.
fn normalize_combo(combo: &mut Combo) {
    let Some(map) = key_map(&combo.category) else {
        combo.ext.set(EXT_KEY_TAX_CATEGORY, TAX_CATEGORY_OUTSIDE_SCOPE);
        return;
    };
    if combo.key.is_none() {
        let from_code = combo
            .ext
            .get(&EXT_KEY_TAX_CATEGORY)
            .and_then(|c| map.iter().find(|(_, code)| c == code))
            .map(|(k, _)| k.clone());
        combo.key = Some(from_code.unwrap_or(KEY_STANDARD));
    }
    match combo.key.as_ref().and_then(|k| map.iter().find(|(mk, _)| mk == k)) {
        Some((_, code)) => combo.ext.set(EXT_KEY_TAX_CATEGORY, *code),
        None => {
            combo.ext.delete(&EXT_KEY_TAX_CATEGORY);
        }
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::Combo(combo) => validate_combo(combo),
        Document::PaymentInstructions(instr) => {
            let mut errs = FieldErrors::new();
            errs.nest("ext", ExtRule::require(&[EXT_KEY_PAYMENT_MEANS]).check(&instr.ext));
            errs
        }
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    match &inv.tax {
        None => errs.add("tax", "cannot be blank"),
        Some(tax) => {
            let mut t = FieldErrors::new();
            t.nest("ext", ExtRule::require(&[EXT_KEY_DOCUMENT_TYPE]).check(&tax.ext));
            errs.nest("tax", t);
        }
    }
    if inv.lines.is_empty() {
        errs.add("lines", "cannot be blank");
    }
    errs.nest("supplier", require_address(&inv.supplier));
    if let Some(customer) = &inv.customer {
        errs.nest("customer", require_address(customer));
    }
    let due = inv.totals.as_ref().is_some_and(|t| t.due > rust_decimal::Decimal::ZERO);
    if due && inv.invoice_type == INVOICE_TYPE_STANDARD && inv.payment.is_none() {
        errs.add("payment", "payment details are required when amount is due");
    }
    errs
}

fn require_address(party: &Party) -> FieldErrors {
    if party.addresses.is_empty() {
        FieldErrors::single("addresses", "cannot be blank")
    } else {
        FieldErrors::new()
    }
}

fn validate_combo(combo: &Combo) -> FieldErrors {
    let allowed: Vec<&'static str> = match key_map(&combo.category) {
        Some(map) => map.iter().map(|(_, c)| *c).collect(),
        None => vec![TAX_CATEGORY_OUTSIDE_SCOPE],
    };
    let ext = &combo.ext;
    let mut errs = ExtRule::require(&[EXT_KEY_TAX_CATEGORY]).check(ext);
    errs.merge(ExtRule::has_codes(EXT_KEY_TAX_CATEGORY, &allowed).check(ext));
    if is_exempt(ext) {
        errs.merge(ExtRule::require(&[EXT_KEY_VATEX]).check(ext));
    }
    let mut out = FieldErrors::new();
    out.nest("ext", errs);
    out
}

fn is_exempt(ext: &Extensions) -> bool {
    ext.get(&EXT_KEY_TAX_CATEGORY)
        .is_some_and(|c| *c == TAX_CATEGORY_EXEMPT)
}
