//! German XRechnung 3.x CIUS, layered on EN 16931.

use crate::core::cbc::{Code, Key, Text};
use crate::core::error::FieldErrors;
use crate::core::extensions::ExtRule;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::AddonDef;

use super::eu_en16931::{self, EXT_KEY_DOCUMENT_TYPE, EXT_KEY_PAYMENT_MEANS};

pub const KEY: Key = Key::from_static("de-xrechnung-v3");

pub const PAYMENT_KEY_SEPA_CREDIT_TRANSFER: Key = Key::from_static("sepa-credit-transfer");
pub const PAYMENT_KEY_SEPA_DIRECT_DEBIT: Key = Key::from_static("sepa-direct-debit");

/// UNTDID 1001 document types accepted by XRechnung.
const DOCUMENT_TYPES: [&str; 8] = ["326", "380", "381", "384", "389", "875", "876", "877"];

const PAYMENT_KEYS: [Key; 8] = [
    Key::from_static("cash"),
    Key::from_static("cheque"),
    Key::from_static("credit-transfer"),
    Key::from_static("card"),
    Key::from_static("direct-debit"),
    Key::from_static("other"),
    PAYMENT_KEY_SEPA_CREDIT_TRANSFER,
    PAYMENT_KEY_SEPA_DIRECT_DEBIT,
];

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        requires: vec![eu_en16931::KEY],
        name: Text::en("German XRechnung 3.X"),
        description: Some(Text::en(
            "Extensions to support the German XRechnung standard for electronic invoicing \
             with public administration.",
        )),
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::PaymentInstructions(instr) = doc {
        let code = if instr.key == PAYMENT_KEY_SEPA_CREDIT_TRANSFER {
            "58"
        } else if instr.key == PAYMENT_KEY_SEPA_DIRECT_DEBIT {
            "59"
        } else {
            return;
        };
        if !instr.ext.has(&[EXT_KEY_PAYMENT_MEANS]) {
            instr.ext.set(EXT_KEY_PAYMENT_MEANS, code);
        }
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::PaymentInstructions(instr) => validate_instructions(instr),
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(tax) = &inv.tax {
        let mut t = FieldErrors::new();
        t.nest("ext", ExtRule::has_codes(EXT_KEY_DOCUMENT_TYPE, &DOCUMENT_TYPES).check(&tax.ext));
        errs.nest("tax", t);
    }
    if inv.preceding.is_empty()
        && inv
            .invoice_type
            .is_in(&[INVOICE_TYPE_CORRECTIVE, INVOICE_TYPE_CREDIT_NOTE])
    {
        errs.add("preceding", "cannot be blank");
    }

    // buyer reference
    match inv.ordering.as_ref().map(|o| &o.code) {
        None => errs.add("ordering", "cannot be blank"),
        Some(code) if code.as_ref().is_none_or(Code::is_empty) => {
            errs.nest("ordering", FieldErrors::single("code", "cannot be blank"))
        }
        Some(_) => {}
    }

    errs.nest("supplier", validate_supplier(&inv.supplier));
    match &inv.customer {
        Some(customer) => errs.nest("customer", validate_addresses(customer)),
        None => errs.add("customer", "cannot be blank"),
    }
    match &inv.payment {
        None => errs.add("payment", "cannot be blank"),
        Some(p) if p.instructions.is_none() => {
            errs.nest("payment", FieldErrors::single("instructions", "cannot be blank"))
        }
        Some(_) => {}
    }
    errs
}

fn validate_supplier(party: &Party) -> FieldErrors {
    let mut errs = validate_addresses(party);
    let has_email = party
        .inboxes
        .iter()
        .any(|i| i.email.as_deref().is_some_and(|e| !e.trim().is_empty()));
    if !has_email {
        errs.add("inboxes", "an inbox with an email address is required");
    }
    errs
}

/// The first address needs a locality and a post code.
fn validate_addresses(party: &Party) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let Some(addr) = party.addresses.first() else {
        errs.add("addresses", "cannot be blank");
        return errs;
    };
    let mut a = FieldErrors::new();
    if addr.locality.as_deref().is_none_or(|l| l.trim().is_empty()) {
        a.add("locality", "cannot be blank");
    }
    if addr.code.as_ref().is_none_or(Code::is_empty) {
        a.add("code", "cannot be blank");
    }
    let mut addresses = FieldErrors::new();
    addresses.nest("0", a);
    errs.nest("addresses", addresses);
    errs
}

fn validate_instructions(instr: &PaymentInstructions) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if !instr.key.is_in(&PAYMENT_KEYS) {
        errs.add("key", "invalid payment key");
    }
    if instr.key == PAYMENT_KEY_SEPA_CREDIT_TRANSFER && instr.credit_transfer.is_empty() {
        errs.add("credit_transfer", "cannot be blank");
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceBuilder, PartyBuilder};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn address() -> Address {
        Address {
            street: Some("Dietmar-Hopp-Allee 16".into()),
            locality: Some("Walldorf".into()),
            code: Some(Code::from("69190")),
            country: Some("DE".into()),
            ..Default::default()
        }
    }

    fn invoice() -> Invoice {
        let mut inv = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2024, 2, 13).unwrap())
            .ordering_code("04011000-12345-03")
            .tax_ext(EXT_KEY_DOCUMENT_TYPE, "380")
            .supplier(
                PartyBuilder::new("Provide One GmbH")
                    .tax_id("DE", "111111125")
                    .address(address())
                    .inbox(Inbox {
                        email: Some("billing@example.com".into()),
                        ..Default::default()
                    })
                    .build(),
            )
            .customer(PartyBuilder::new("Sample Consumer").address(address()).build())
            .build();
        inv.payment = Some(PaymentDetails {
            instructions: Some(PaymentInstructions {
                key: Key::from_static("credit-transfer"),
                ..Default::default()
            }),
            ..Default::default()
        });
        inv
    }

    #[test]
    fn complete_invoice_passes() {
        assert!(validate_invoice(&invoice()).is_empty());
    }

    #[test]
    fn buyer_reference_required() {
        let mut inv = invoice();
        inv.ordering = None;
        assert_eq!(validate_invoice(&inv).to_string(), "ordering: cannot be blank.");

        inv.ordering = Some(Ordering { code: None });
        assert_eq!(
            validate_invoice(&inv).to_string(),
            "ordering: (code: cannot be blank.)."
        );
    }

    #[test]
    fn supplier_contact_and_address() {
        let mut inv = invoice();
        inv.supplier.inboxes.clear();
        inv.supplier.addresses[0].code = None;
        let errs = validate_invoice(&inv);
        assert!(errs.contains("supplier.inboxes"));
        assert!(errs.contains("supplier.addresses.0.code"));
    }

    #[test]
    fn credit_notes_need_preceding() {
        let mut inv = invoice();
        inv.invoice_type = INVOICE_TYPE_CREDIT_NOTE;
        if let Some(tax) = inv.tax.as_mut() {
            tax.ext.set(EXT_KEY_DOCUMENT_TYPE, "381");
        }
        assert_eq!(validate_invoice(&inv).to_string(), "preceding: cannot be blank.");
    }

    #[test]
    fn sepa_payment_means() {
        let mut instr = PaymentInstructions {
            key: PAYMENT_KEY_SEPA_CREDIT_TRANSFER,
            ..Default::default()
        };
        normalize(DocumentMut::PaymentInstructions(&mut instr));
        assert_eq!(instr.ext.get(&EXT_KEY_PAYMENT_MEANS), Some(&Code::from("58")));
        assert!(validate_instructions(&instr).contains("credit_transfer"));

        let instr = PaymentInstructions {
            key: Key::from_static("online"),
            ..Default::default()
        };
        assert!(validate_instructions(&instr).contains("key"));
    }
}
