//! Italy AdE ticket (documento commerciale): electronic receipts sent to
//! the Agenzia delle Entrate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, Key, Text};
use crate::core::error::FieldErrors;
use crate::core::extensions::ExtRule;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::tax::{
    AddonDef, CATEGORY_VAT, KEY_EXEMPT, KEY_EXPORT, KEY_INTRA_COMMUNITY, KEY_OUTSIDE_SCOPE,
    KEY_REVERSE_CHARGE, KEY_STANDARD, KEY_ZERO,
};

pub const KEY: Key = Key::from_static("it-ticket-v1");

pub const EXT_KEY_EXEMPT: Key = Key::from_static("it-ticket-exempt");
pub const EXT_KEY_PRODUCT: Key = Key::from_static("it-ticket-product");
pub const EXT_KEY_LOTTERY: Key = Key::from_static("it-ticket-lottery");

/// VAT percentages the receipt format can carry.
const VALID_PERCENTAGES: [Decimal; 16] = [
    dec!(2),
    dec!(4),
    dec!(5),
    dec!(6.4),
    dec!(7),
    dec!(7.3),
    dec!(7.5),
    dec!(7.65),
    dec!(7.95),
    dec!(8.3),
    dec!(8.5),
    dec!(8.8),
    dec!(9.5),
    dec!(10),
    dec!(12.3),
    dec!(22),
];

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        name: Text::en("Italy AdE ticket v1.x").with("it", "Italia AdE documento commerciale v1.x"),
        description: Some(Text::en(
            "Receipts issued to final consumers and reported to the Agenzia delle Entrate.",
        )),
        extensions: extensions(),
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn extensions() -> Vec<Definition> {
    let code = |c: &'static str, en: &'static str, it: &'static str| {
        Definition::with_code(Code::from_static(c), Text::en(en).with("it", it))
    };
    vec![
        Definition::with_key(
            EXT_KEY_EXEMPT,
            Text::en("Exemption Code").with("it", "Natura Esenzione"),
        )
        .values(vec![
            code("N1", "Excluded pursuant to Art. 15, DPR 633/72", "Escluse ex. art. 15 del D.P.R. 633/1972"),
            code("N2", "Not subject", "Non soggette"),
            code("N3", "Not taxable", "Non imponibili"),
            code("N4", "Exempt", "Esenti"),
            code("N5", "Margin regime / VAT not exposed", "Regime del margine/IVA non esposta in fattura"),
            code("N6", "Reverse charge", "Inversione contabile"),
        ]),
        Definition::with_key(
            EXT_KEY_PRODUCT,
            Text::en("AdE CF Product Key").with("it", "Chiave Prodotto AdE CF"),
        )
        .desc("Distinguishes the delivery of goods from the provision of services.")
        .values(vec![
            code("goods", "Delivery of goods", "Consegna di beni"),
            code("services", "Provision of services", "Prestazione di servizi"),
        ]),
        Definition::with_key(
            EXT_KEY_LOTTERY,
            Text::en("AdE Lottery Code").with("it", "Codice Lotteria AdE"),
        )
        .desc("Lottery code the customer provides at the time of purchase.")
        .pattern(r"^[A-Z0-9]{8}$")
        .source(
            "Agenzia delle Entrate",
            "https://www.agenziaentrate.gov.it/portale/documents/20143/4952835/Specifiche+Tecniche+Lotteria+Istantanea_V1.pdf/211eae00-0e0e-66b9-a077-895eb0d9fc51",
        ),
    ]
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Combo(combo) = doc {
        normalize_combo(combo);
    }
}

/// Keep the tax key and the exemption code in step. A foreign VAT combo is
/// always "not subject".
fn normalize_combo(combo: &mut Combo) {
    if combo.category != CATEGORY_VAT {
        return;
    }
    if combo.country.as_deref().is_some_and(|c| !c.is_empty() && c != "IT") {
        combo.ext.set(EXT_KEY_EXEMPT, "N2");
        return;
    }
    if combo.key.is_none() {
        combo.key = Some(key_for_exemption(combo.ext.get(&EXT_KEY_EXEMPT)));
        if combo.key.as_ref() != Some(&KEY_STANDARD) {
            combo.rate = None;
        }
    }
    let Some(key) = combo.key.clone() else {
        return;
    };
    let codes = |cs: &[&'static str]| cs.iter().copied().map(Code::from_static).collect::<Vec<_>>();
    if key == KEY_STANDARD || key == KEY_ZERO {
        combo.ext.delete(&EXT_KEY_EXEMPT);
    } else if key == KEY_OUTSIDE_SCOPE {
        combo.ext.set_one_of(EXT_KEY_EXEMPT, &codes(&["N1", "N2"]));
    } else if key == KEY_EXPORT || key == KEY_INTRA_COMMUNITY {
        combo.ext.set(EXT_KEY_EXEMPT, "N3");
    } else if key == KEY_EXEMPT {
        combo.ext.set_one_of(EXT_KEY_EXEMPT, &codes(&["N4", "N5"]));
    } else if key == KEY_REVERSE_CHARGE {
        combo.ext.set(EXT_KEY_EXEMPT, "N6");
    }
}

fn key_for_exemption(code: Option<&Code>) -> Key {
    match code.map(Code::as_str) {
        Some("N1" | "N2") => KEY_OUTSIDE_SCOPE,
        Some("N3") => KEY_EXPORT,
        Some("N4" | "N5") => KEY_EXEMPT,
        Some("N6") => KEY_REVERSE_CHARGE,
        _ => KEY_STANDARD,
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::Combo(combo) => validate_combo(combo),
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(tax) = &inv.tax {
        if tax.prices_include.as_ref().is_some_and(|c| !c.is_empty() && *c != CATEGORY_VAT) {
            errs.nest("tax", FieldErrors::single("prices_include", "must be a valid value"));
        }
    }
    let mut lines = FieldErrors::new();
    for (i, line) in inv.lines.iter().enumerate() {
        if !line.taxes.iter().any(|c| c.category == CATEGORY_VAT) {
            lines.nest(i.to_string(), FieldErrors::single("taxes", "missing category VAT"));
        }
    }
    errs.nest("lines", lines);
    errs
}

fn validate_combo(combo: &Combo) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if combo.category != CATEGORY_VAT {
        return errs;
    }
    match combo.percent {
        None => errs.nest("ext", ExtRule::require(&[EXT_KEY_EXEMPT]).check(&combo.ext)),
        Some(p) if !VALID_PERCENTAGES.contains(&p) => errs.add("percent", "must be a valid value"),
        Some(_) => {}
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InvoiceBuilder;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn vat() -> Combo {
        Combo::new("VAT")
    }

    #[test]
    fn exemption_code_sets_the_key() {
        for (code, key) in [
            ("N1", KEY_OUTSIDE_SCOPE),
            ("N2", KEY_OUTSIDE_SCOPE),
            ("N3", KEY_EXPORT),
            ("N4", KEY_EXEMPT),
            ("N5", KEY_EXEMPT),
            ("N6", KEY_REVERSE_CHARGE),
        ] {
            let mut combo = vat();
            combo.ext.set(EXT_KEY_EXEMPT, code);
            normalize_combo(&mut combo);
            assert_eq!(combo.key, Some(key), "{code}");
            assert_eq!(combo.ext.get(&EXT_KEY_EXEMPT), Some(&Code::from(code)));
        }
    }

    #[test]
    fn key_sets_the_exemption_code() {
        let mut combo = vat().with_key(KEY_EXEMPT);
        normalize_combo(&mut combo);
        assert_eq!(combo.ext.get(&EXT_KEY_EXEMPT), Some(&Code::from("N4")));

        let mut combo = vat().with_key(KEY_STANDARD);
        combo.ext.set(EXT_KEY_EXEMPT, "N4");
        normalize_combo(&mut combo);
        assert!(combo.ext.is_empty());

        let mut combo = vat();
        normalize_combo(&mut combo);
        assert_eq!(combo.key, Some(KEY_STANDARD));
    }

    #[test]
    fn foreign_vat_is_not_subject() {
        let mut combo = vat().with_key(KEY_STANDARD);
        combo.country = Some("FR".into());
        normalize_combo(&mut combo);
        assert_eq!(combo.key, Some(KEY_STANDARD));
        assert_eq!(combo.ext.get(&EXT_KEY_EXEMPT), Some(&Code::from("N2")));
    }

    #[test]
    fn percentages() {
        assert!(validate_combo(&vat().with_percent(dec!(22.0))).is_empty());
        assert!(validate_combo(&vat().with_percent(dec!(7.65))).is_empty());
        assert_eq!(
            validate_combo(&vat().with_percent(dec!(21))).to_string(),
            "percent: must be a valid value."
        );
        assert_eq!(
            validate_combo(&vat()).to_string(),
            "ext: (it-ticket-exempt: required.)."
        );
    }

    #[test]
    fn lines_need_vat() {
        let inv = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2022, 6, 13).unwrap())
            .line(Line::default())
            .build();
        assert_eq!(
            validate_invoice(&inv).to_string(),
            "lines: (0: (taxes: missing category VAT.).)."
        );
    }
}
