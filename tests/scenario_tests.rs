//! Scenario outcomes and addon layering on complete invoices.
//!
//! Run with: `cargo test --test scenario_tests`

use chrono::NaiveDate;
use fiskal::addons::{br_nfe, de_xrechnung, eu_en16931};
use fiskal::core::*;
use fiskal::tax::{KEY_STANDARD, TAG_PARTIAL, TAG_SIMPLIFIED};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn vat_line(name: &str, qty: rust_decimal::Decimal, price: rust_decimal::Decimal) -> Line {
    LineBuilder::new(name, qty, price)
        .tax(Combo::new("VAT").with_key(KEY_STANDARD))
        .build()
}

fn tax_ext<'a>(inv: &'a Invoice, key: &Key) -> Option<&'a str> {
    inv.tax_ext().and_then(|e| e.get(key)).map(Code::as_str)
}

// --- Brazil NF-e models ---

fn nfe(tags: &[Key]) -> Invoice {
    let mut b = InvoiceBuilder::new(date(2024, 5, 10))
        .addon(br_nfe::KEY)
        .supplier(PartyBuilder::new("Loja LTDA").tax_id("BR", "05104582000170").build());
    for t in tags {
        b = b.tag(t.clone());
    }
    b.line(vat_line("Produto", dec!(1), dec!(50))).build()
}

#[test]
fn nfe_model_follows_tags() {
    let summary = fiskal::engine::scenario_summary(&nfe(&[]));
    assert_eq!(
        summary.ext.get(&br_nfe::EXT_KEY_MODEL).map(Code::as_str),
        Some(br_nfe::MODEL_NFE)
    );

    let summary = fiskal::engine::scenario_summary(&nfe(&[TAG_SIMPLIFIED]));
    assert_eq!(
        summary.ext.get(&br_nfe::EXT_KEY_MODEL).map(Code::as_str),
        Some(br_nfe::MODEL_NFCE)
    );
}

#[test]
fn nfe_model_lands_in_tax_ext() {
    let mut inv = nfe(&[TAG_SIMPLIFIED]);
    fiskal::calculate(&mut inv).unwrap();
    assert_eq!(tax_ext(&inv, &br_nfe::EXT_KEY_MODEL), Some(br_nfe::MODEL_NFCE));
}

// --- EN 16931 document types ---

fn en16931(invoice_type: Key, tags: &[Key]) -> Invoice {
    let mut b = InvoiceBuilder::new(date(2024, 2, 13))
        .addon(eu_en16931::KEY)
        .invoice_type(invoice_type)
        .supplier(PartyBuilder::new("Provide One GmbH").tax_id("DE", "111111125").build());
    for t in tags {
        b = b.tag(t.clone());
    }
    b.line(vat_line("Development services", dec!(20), dec!(90))).build()
}

#[test]
fn en16931_document_types() {
    let cases = [
        (INVOICE_TYPE_STANDARD, vec![], "380"),
        (INVOICE_TYPE_STANDARD, vec![TAG_PARTIAL], "326"),
        (INVOICE_TYPE_CREDIT_NOTE, vec![], "381"),
        (INVOICE_TYPE_CORRECTIVE, vec![], "384"),
    ];
    for (invoice_type, tags, expected) in cases {
        let mut inv = en16931(invoice_type.clone(), &tags);
        fiskal::calculate(&mut inv).unwrap();
        assert_eq!(
            tax_ext(&inv, &eu_en16931::EXT_KEY_DOCUMENT_TYPE),
            Some(expected),
            "{invoice_type} {tags:?}"
        );
    }
}

#[test]
fn en16931_tax_category_from_key() {
    let mut inv = en16931(INVOICE_TYPE_STANDARD, &[]);
    fiskal::calculate(&mut inv).unwrap();
    let combo = &inv.lines[0].taxes[0];
    assert_eq!(
        combo.ext.get(&eu_en16931::EXT_KEY_TAX_CATEGORY).map(Code::as_str),
        Some(eu_en16931::TAX_CATEGORY_STANDARD)
    );
    assert_eq!(combo.percent, Some(dec!(19)));
}

// --- XRechnung on top of EN 16931 ---

fn german_address(street: &str, locality: &str, code: &str) -> Address {
    Address {
        street: Some(street.into()),
        locality: Some(locality.into()),
        code: Some(Code::from(code)),
        country: Some("DE".into()),
        ..Default::default()
    }
}

fn xrechnung() -> Invoice {
    InvoiceBuilder::new(date(2024, 2, 13))
        .addon(de_xrechnung::KEY)
        .code("XR-2024-001")
        .ordering_code("04011000-12345-03")
        .supplier(
            PartyBuilder::new("Provide One GmbH")
                .tax_id("DE", "111111125")
                .address(german_address("Dietmar-Hopp-Allee 16", "Walldorf", "69190"))
                .inbox(Inbox {
                    email: Some("billing@example.com".into()),
                    ..Default::default()
                })
                .build(),
        )
        .customer(
            PartyBuilder::new("Sample Consumer")
                .address(german_address("Werner-Heisenberg-Allee 25", "München", "80939"))
                .build(),
        )
        .line(vat_line("Development services", dec!(20), dec!(90)))
        .payment(PaymentDetails {
            instructions: Some(PaymentInstructions {
                key: Key::from("credit-transfer"),
                credit_transfer: vec![CreditTransfer {
                    iban: Some("DE89370400440532013000".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        })
        .build()
}

#[test]
fn xrechnung_enables_en16931() {
    let mut inv = xrechnung();
    fiskal::calculate(&mut inv).unwrap();
    assert_eq!(tax_ext(&inv, &eu_en16931::EXT_KEY_DOCUMENT_TYPE), Some("380"));

    let instr = inv.payment.as_ref().and_then(|p| p.instructions.as_ref()).unwrap();
    assert_eq!(
        instr.ext.get(&eu_en16931::EXT_KEY_PAYMENT_MEANS).map(Code::as_str),
        Some("30")
    );
    fiskal::validate(&inv).unwrap();

    let totals = inv.totals.as_ref().unwrap();
    assert_eq!(totals.total, dec!(1800.00));
    assert_eq!(totals.tax, dec!(342.00));
    assert_eq!(totals.payable, dec!(2142.00));
}

#[test]
fn xrechnung_reports_missing_buyer_reference() {
    let mut inv = xrechnung();
    inv.ordering = None;
    fiskal::calculate(&mut inv).unwrap();
    let err = fiskal::validate(&inv).unwrap_err().to_string();
    insta::assert_snapshot!(err, @"ordering: cannot be blank.");
}

#[test]
fn xrechnung_sepa_means() {
    let mut inv = xrechnung();
    if let Some(instr) = inv.payment.as_mut().and_then(|p| p.instructions.as_mut()) {
        instr.key = de_xrechnung::PAYMENT_KEY_SEPA_CREDIT_TRANSFER;
    }
    fiskal::calculate(&mut inv).unwrap();
    let instr = inv.payment.as_ref().and_then(|p| p.instructions.as_ref()).unwrap();
    assert_eq!(
        instr.ext.get(&eu_en16931::EXT_KEY_PAYMENT_MEANS).map(Code::as_str),
        Some("58")
    );
    fiskal::validate(&inv).unwrap();
}
