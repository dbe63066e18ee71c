//! Brazil NF-e 4.00: goods invoices (model 55) and consumer invoices
//! (NFC-e, model 65).

use std::sync::LazyLock;

use regex::Regex;

use crate::core::cbc::{Code, Definition, Key, NOTE_KEY_REASON, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::extensions::{ExtRule, Extensions};
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::regimes::require_tax_code;
use crate::tax::{AddonDef, Scenario, ScenarioSet, TAG_SIMPLIFIED};

pub const KEY: Key = Key::from_static("br-nfe-v4");

pub const EXT_KEY_MODEL: Key = Key::from_static("br-nfe-model");
pub const EXT_KEY_PRESENCE: Key = Key::from_static("br-nfe-presence");
pub const EXT_KEY_PAYMENT_MEANS: Key = Key::from_static("br-nfe-payment-means");
pub const EXT_KEY_CFOP: Key = Key::from_static("br-nfe-cfop");
pub const EXT_KEY_FISCAL_INCENTIVE: Key = Key::from_static("br-nfe-fiscal-incentive");
pub const EXT_KEY_REGIME: Key = Key::from_static("br-nfe-regime");
pub const EXT_KEY_SPECIAL_REGIME: Key = Key::from_static("br-nfe-special-regime");

pub const MODEL_NFE: &str = "55";
pub const MODEL_NFCE: &str = "65";

pub const PRESENCE_IN_PERSON: &str = "1";
pub const PRESENCE_DELIVERY: &str = "4";

const PAYMENT_MEANS_OTHER: Key = Key::from_static("other");

static SERIES: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?:0|[1-9][0-9]{0,2})$"));

const MOC_TITLE: &str = "Manual de Orientação do Contribuinte (MOC) 7.0";
const MOC_URL: &str = "https://www.nfe.fazenda.gov.br/portal/exibirArquivo.aspx?conteudo=ndIjl+iEFdE=";

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        name: Text::en("Brazil NF-e 4.00"),
        description: Some(Text::en(
            "Support for the Brazilian NF-e (Nota Fiscal Eletrônica) and NFC-e \
             (Nota Fiscal de Consumidor Eletrônica) goods invoices.",
        )),
        extensions: extensions(),
        scenarios: vec![scenarios()],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn extensions() -> Vec<Definition> {
    let code = |c: &'static str, name: &'static str| Definition::with_code(Code::from_static(c), name);
    vec![
        Definition::with_key(EXT_KEY_MODEL, "Model")
            .values(vec![
                code(MODEL_NFE, "NF-e"),
                code(MODEL_NFCE, "NFC-e"),
            ])
            .source(MOC_TITLE, MOC_URL),
        Definition::with_key(EXT_KEY_PRESENCE, "Buyer Presence")
            .desc("Whether the buyer was present at the time of the sale.")
            .values(vec![
                code("0", "Not applicable"),
                code(PRESENCE_IN_PERSON, "In person"),
                code("2", "Internet"),
                code("3", "Telephone"),
                code(PRESENCE_DELIVERY, "Home delivery"),
                code("5", "In person, outside the establishment"),
                code("9", "Other"),
            ])
            .source(MOC_TITLE, MOC_URL),
        Definition::with_key(EXT_KEY_PAYMENT_MEANS, "Payment Means")
            .values(vec![
                code("01", "Cash"),
                code("02", "Check"),
                code("03", "Credit Card"),
                code("04", "Debit Card"),
                code("05", "Store Credit"),
                code("10", "Food Voucher"),
                code("11", "Meal Voucher"),
                code("12", "Gift Voucher"),
                code("13", "Fuel Voucher"),
                code("15", "Bank Slip"),
                code("16", "Bank Deposit"),
                code("17", "Instant Payment (PIX)"),
                code("18", "Bank Transfer, Digital Wallet"),
                code("19", "Loyalty Program, Cashback, Virtual Credit"),
                code("90", "No Payment"),
                code("99", "Others"),
            ])
            .map_entry("cash", "01")
            .map_entry("card", "03")
            .map_entry(PAYMENT_MEANS_OTHER, "99")
            .source(MOC_TITLE, MOC_URL),
        Definition::with_key(EXT_KEY_CFOP, "CFOP")
            .desc("Código Fiscal de Operações e Prestações: the nature of the operation.")
            .pattern(r"^[1-7]\d{3}$"),
        Definition::with_key(EXT_KEY_FISCAL_INCENTIVE, "Fiscal Incentive")
            .values(vec![code("1", "Has incentive"), code("2", "Does not have incentive")]),
        Definition::with_key(EXT_KEY_REGIME, "Tax Regime")
            .values(vec![
                code("1", "Simples Nacional"),
                code("2", "Simples Nacional, excess of gross revenue"),
                code("3", "Normal regime"),
            ])
            .source(MOC_TITLE, MOC_URL),
        Definition::with_key(EXT_KEY_SPECIAL_REGIME, "Special Tax Regime").values(vec![
            code("1", "Municipal micro-enterprise"),
            code("2", "Estimated"),
            code("3", "Professional Society"),
            code("4", "Cooperative"),
            code("5", "Single micro-entrepreneur (MEI)"),
            code("6", "Micro-enterprise or Small Business (ME EPP)"),
        ]),
    ]
}

fn scenarios() -> ScenarioSet {
    ScenarioSet::new(
        SCHEMA_INVOICE,
        vec![
            Scenario::new("NF-e").ext(EXT_KEY_MODEL, MODEL_NFE),
            Scenario::new("NFC-e")
                .tags(&[TAG_SIMPLIFIED])
                .ext(EXT_KEY_MODEL, MODEL_NFCE),
        ],
    )
}

fn normalize(doc: DocumentMut<'_>) {
    match doc {
        DocumentMut::PaymentInstructions(instr) => {
            normalize_payment_means(Some(&instr.key), &mut instr.ext)
        }
        DocumentMut::PaymentAdvance(adv) => normalize_payment_means(adv.key.as_ref(), &mut adv.ext),
        _ => {}
    }
}

/// Map the payment means key onto the NF-e code. Mapped keys override any
/// existing code, except "other" which only fills a missing one.
fn normalize_payment_means(key: Option<&Key>, ext: &mut Extensions) {
    static DEF: LazyLock<Option<Definition>> = LazyLock::new(|| {
        extensions()
            .into_iter()
            .find(|d| d.key.as_ref() == Some(&EXT_KEY_PAYMENT_MEANS))
    });
    let Some(key) = key else {
        return;
    };
    let Some(code) = DEF.as_ref().and_then(|d| d.map.get(key)) else {
        return;
    };
    if *key == PAYMENT_MEANS_OTHER && ext.has(&[EXT_KEY_PAYMENT_MEANS]) {
        return;
    }
    ext.set(EXT_KEY_PAYMENT_MEANS, code.clone());
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::PaymentInstructions(instr) => require_payment_means(&instr.ext),
        Document::PaymentAdvance(adv) => require_payment_means(&adv.ext),
        _ => FieldErrors::new(),
    }
}

fn require_payment_means(ext: &Extensions) -> FieldErrors {
    let mut errs = FieldErrors::new();
    errs.nest("ext", ExtRule::require(&[EXT_KEY_PAYMENT_MEANS]).check(ext));
    errs
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    match &inv.series {
        Some(s) if !s.is_empty() => {
            if !SERIES.is_match(s.as_str()) {
                errs.add("series", "must be in a valid format");
            }
        }
        _ => errs.add("series", "cannot be blank"),
    }

    let empty = Extensions::new();
    let ext = inv.tax_ext().unwrap_or(&empty);
    let model = ext.get(&EXT_KEY_MODEL).map(Code::as_str);

    errs.nest("supplier", validate_supplier(&inv.supplier));
    match &inv.customer {
        Some(customer) => errs.nest("customer", require_tax_code(customer)),
        None if model == Some(MODEL_NFE) => errs.add("customer", "cannot be blank"),
        None => {}
    }

    let mut tax = FieldErrors::new();
    tax.merge(ExtRule::require(&[EXT_KEY_MODEL, EXT_KEY_PRESENCE]).check(ext));
    match model {
        Some(MODEL_NFE) => tax.merge(ExtRule::exclude_codes(EXT_KEY_PRESENCE, &[PRESENCE_DELIVERY]).check(ext)),
        Some(MODEL_NFCE) => tax.merge(
            ExtRule::has_codes(EXT_KEY_PRESENCE, &[PRESENCE_IN_PERSON, PRESENCE_DELIVERY]).check(ext),
        ),
        _ => {}
    }
    let mut tax_errs = FieldErrors::new();
    tax_errs.nest("ext", tax);
    errs.nest("tax", tax_errs);

    if !inv.notes.iter().any(|n| n.key.as_ref() == Some(&NOTE_KEY_REASON)) {
        errs.add("notes", "missing note with key 'reason'");
    }

    let paid = inv.totals.as_ref().is_some_and(Totals::paid);
    if !paid {
        match &inv.payment {
            None => errs.add("payment", "cannot be blank"),
            Some(p) if p.instructions.is_none() => {
                errs.nest("payment", FieldErrors::single("instructions", "cannot be blank"))
            }
            Some(_) => {}
        }
    }
    errs
}

fn validate_supplier(party: &Party) -> FieldErrors {
    let mut errs = require_tax_code(party);
    if party.name.trim().is_empty() {
        errs.add("name", "cannot be blank");
    }
    if party.addresses.is_empty() {
        errs.add("addresses", "cannot be blank");
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cbc::Note;
    use crate::core::{InvoiceBuilder, PartyBuilder};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn instructions(key: &'static str) -> PaymentInstructions {
        PaymentInstructions {
            key: Key::from_static(key),
            ..Default::default()
        }
    }

    #[test]
    fn payment_means_mapping() {
        let mut instr = instructions("card");
        instr.ext.set(EXT_KEY_PAYMENT_MEANS, "17");
        normalize(DocumentMut::PaymentInstructions(&mut instr));
        assert_eq!(instr.ext.get(&EXT_KEY_PAYMENT_MEANS), Some(&Code::from("03")));

        let mut instr = instructions("other");
        instr.ext.set(EXT_KEY_PAYMENT_MEANS, "17");
        normalize(DocumentMut::PaymentInstructions(&mut instr));
        assert_eq!(instr.ext.get(&EXT_KEY_PAYMENT_MEANS), Some(&Code::from("17")));

        let mut instr = instructions("other");
        normalize(DocumentMut::PaymentInstructions(&mut instr));
        assert_eq!(instr.ext.get(&EXT_KEY_PAYMENT_MEANS), Some(&Code::from("99")));

        let mut instr = instructions("online");
        normalize(DocumentMut::PaymentInstructions(&mut instr));
        assert!(instr.ext.is_empty());

        let mut adv = PaymentAdvance {
            key: Some(Key::from_static("cash")),
            amount: dec!(10),
            ..Default::default()
        };
        normalize(DocumentMut::PaymentAdvance(&mut adv));
        assert_eq!(adv.ext.get(&EXT_KEY_PAYMENT_MEANS), Some(&Code::from("01")));
    }

    #[test]
    fn payment_means_required() {
        let errs = validate(Document::PaymentInstructions(&instructions("online")));
        assert_eq!(errs.to_string(), "ext: (br-nfe-payment-means: required.).");
    }

    fn nfce() -> Invoice {
        let mut inv = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .series("1")
            .tag(TAG_SIMPLIFIED)
            .tax_ext(EXT_KEY_MODEL, MODEL_NFCE)
            .tax_ext(EXT_KEY_PRESENCE, PRESENCE_IN_PERSON)
            .supplier(
                PartyBuilder::new("Loja Ltda")
                    .tax_id("BR", "05104582000170")
                    .address(Address {
                        street: Some("Rua das Flores".into()),
                        ..Default::default()
                    })
                    .build(),
            )
            .note(Note::new(NOTE_KEY_REASON, "Venda"))
            .build();
        inv.payment = Some(PaymentDetails {
            instructions: Some(instructions("cash")),
            ..Default::default()
        });
        inv
    }

    #[test]
    fn consumer_invoice_without_customer() {
        assert!(validate_invoice(&nfce()).is_empty());
    }

    #[test]
    fn model_rules() {
        let mut inv = nfce();
        if let Some(tax) = inv.tax.as_mut() {
            tax.ext.set(EXT_KEY_MODEL, MODEL_NFE);
            tax.ext.set(EXT_KEY_PRESENCE, PRESENCE_DELIVERY);
        }
        let errs = validate_invoice(&inv);
        assert!(errs.contains("customer"));
        assert!(errs.to_string().contains("br-nfe-presence: value '4' not allowed"));

        let mut inv = nfce();
        if let Some(tax) = inv.tax.as_mut() {
            tax.ext.set(EXT_KEY_PRESENCE, "2");
        }
        assert!(validate_invoice(&inv).contains("tax.ext.br-nfe-presence"));
    }

    #[test]
    fn head_requirements() {
        let mut inv = nfce();
        inv.series = Some(Code::from("012"));
        inv.notes.clear();
        inv.payment = None;
        let errs = validate_invoice(&inv);
        assert!(errs.contains("series"));
        assert!(errs.contains("notes"));
        assert!(errs.contains("payment"));
    }
}
