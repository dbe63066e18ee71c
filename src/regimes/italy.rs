//! Italy (IT): IVA, the retained income taxes and social contributions
//! applied to professional services, the Partita IVA and the Codice
//! Fiscale.
//!
//! A tax identity may carry either code: eleven digits are a Partita IVA
//! with a Luhn check digit, sixteen characters are the Codice Fiscale of a
//! natural person.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Definition, Key, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::{Identity, TaxIdentity};
use crate::engine::{Document, DocumentMut};
use crate::tax::identity::{check_code, digits, luhn_valid, normalize_code};
use crate::tax::{
    CATEGORY_VAT, CategoryDef, KEY_EXEMPT, KEY_STANDARD, KEY_ZERO, RATE_EXEMPT, RATE_GENERAL,
    RATE_INTERMEDIATE, RATE_REDUCED, RATE_SUPER_REDUCED, RATE_ZERO, RateDef, RateValueDef,
    RegimeDef, vat_keys,
};

use super::date;

pub const IDENTITY_KEY_FISCAL_CODE: Key = Key::from_static("it-fiscal-code");

pub const TAX_CATEGORY_IRPEF: &str = "IRPEF";
pub const TAX_CATEGORY_IRES: &str = "IRES";
pub const TAX_CATEGORY_INPS: &str = "INPS";
pub const TAX_CATEGORY_ENASARCO: &str = "ENASARCO";
pub const TAX_CATEGORY_ENPAM: &str = "ENPAM";

const ODD_VALUES: &[u8; 26] = b"BAKPLCQDREVOSFTGUHMINJWZYX";

/// Structural check: surname, name, birth year, month letter, day and
/// municipality, with the digit substitutions used to avoid collisions.
static FISCAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^[A-Z]{6}[0-9LMNP-V]{2}[ABCDEHLMPRST][0-9LMNP-V]{2}[A-Z][0-9LMNP-V]{3}[A-Z]$")
});

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "IT".into(),
        currency: Code::from_static("EUR"),
        name: Text::en("Italy").with("it", "Italia"),
        time_zone: "Europe/Rome".into(),
        tax_scheme: Some(CATEGORY_VAT),
        identities: vec![Definition::with_key(
            IDENTITY_KEY_FISCAL_CODE,
            Text::en("Fiscal Code").with("it", "Codice Fiscale"),
        )],
        categories: vec![
            vat(),
            CategoryDef::new(TAX_CATEGORY_IRPEF, "IRPEF", "Personal Income Tax").retained(),
            CategoryDef::new(TAX_CATEGORY_IRES, "IRES", "Corporate Income Tax").retained(),
            CategoryDef::new(
                TAX_CATEGORY_INPS,
                "INPS Contribution",
                "Contribution to the National Social Security Institute",
            )
            .retained(),
            CategoryDef::new(
                TAX_CATEGORY_ENASARCO,
                "ENASARCO Contribution",
                "Contribution to the National Welfare Board for Sales Agents and Representatives",
            )
            .retained(),
            CategoryDef::new(
                TAX_CATEGORY_ENPAM,
                "ENPAM Contribution",
                "Contribution to the National Pension and Welfare Board for Doctors",
            )
            .retained(),
        ],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn vat() -> CategoryDef {
    let since = date(2013, 10, 1);
    CategoryDef::new("VAT", "IVA", "Imposta sul Valore Aggiunto")
        .keys(vat_keys())
        .rates(vec![
            RateDef::new(RATE_ZERO, "Zero Rate")
                .keys(&[KEY_ZERO])
                .values(vec![RateValueDef::new(since, dec!(0))]),
            RateDef::new(RATE_GENERAL, "Ordinary Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(since, dec!(22))]),
            RateDef::new(RATE_INTERMEDIATE, "Intermediate Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(since, dec!(10))]),
            RateDef::new(RATE_REDUCED, "Reduced Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(date(2016, 1, 1), dec!(5))]),
            RateDef::new(RATE_SUPER_REDUCED, "Minimum Rate")
                .keys(&[KEY_STANDARD])
                .values(vec![RateValueDef::new(since, dec!(4))]),
            RateDef::new(RATE_EXEMPT, "Exempt").keys(&[KEY_EXEMPT]).exempt(),
        ])
        .source(
            "Agenzia delle Entrate: IVA",
            "https://www.agenziaentrate.gov.it/portale/imposta-sul-valore-aggiunto-iva",
        )
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Identity(id) = doc {
        if is_fiscal_code(id) {
            id.code = normalize_code(&id.code, "IT");
        }
    }
}

fn is_fiscal_code(id: &Identity) -> bool {
    id.key.as_ref() == Some(&IDENTITY_KEY_FISCAL_CODE)
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        Document::Identity(id) if is_fiscal_code(id) => {
            if id.code.is_empty() {
                return FieldErrors::single("code", "cannot be blank");
            }
            match check_tax_code(id.code.as_str()) {
                Ok(()) => FieldErrors::new(),
                Err(msg) => FieldErrors::single("code", msg),
            }
        }
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_tax_code)
}

/// Partita IVA or Codice Fiscale, told apart by length.
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    if code.len() == 16 {
        check_fiscal_code(code)
    } else {
        check_partita_iva(code)
    }
}

pub fn check_partita_iva(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("contains invalid characters")?;
    if ds.len() != 11 {
        return Err("invalid length");
    }
    if !luhn_valid(&ds) {
        return Err("invalid check digit");
    }
    Ok(())
}

pub fn check_fiscal_code(code: &str) -> Result<(), &'static str> {
    if !FISCAL_CODE.is_match(code) {
        return Err("invalid format");
    }
    let bytes = code.as_bytes();
    let mut sum = 0usize;
    for (i, b) in bytes[..15].iter().enumerate() {
        // digits count as the letter in the same position
        let letter = if b.is_ascii_digit() { b - b'0' + b'A' } else { *b };
        sum += if i % 2 == 1 {
            (letter - b'A') as usize
        } else {
            ODD_VALUES.iter().position(|c| *c == letter).unwrap_or_default()
        };
    }
    if b'A' + (sum % 26) as u8 != bytes[15] {
        return Err("invalid check digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn partita_iva() {
        assert_eq!(check_tax_code("00743110157"), Ok(()));
        assert_eq!(check_tax_code("12345678903"), Ok(()));
        assert_eq!(check_tax_code("00743110158"), Err("invalid check digit"));
        assert_eq!(check_tax_code("0074311015"), Err("invalid length"));
        assert_eq!(check_tax_code("0074311015X"), Err("contains invalid characters"));
    }

    #[test]
    fn codice_fiscale() {
        assert_eq!(check_tax_code("RSSMRA74D22A001Q"), Ok(()));
        assert_eq!(check_tax_code("MRTMTT91D08F205J"), Ok(()));
        assert_eq!(check_tax_code("RSSMRA74D22A001A"), Err("invalid check digit"));
        assert_eq!(check_tax_code("RSSMRA74Z22A001Q"), Err("invalid format"));
    }

    #[test]
    fn tax_identity_normalization() {
        let registry = RegistryBuilder::new().regime(new()).build();
        for (input, want) in [
            ("123-456-789-03", "12345678903"),
            ("IT 12345678903", "12345678903"),
            (" RSS-MRA 74D22 A00 1Q ", "RSSMRA74D22A001Q"),
        ] {
            let mut tid = TaxIdentity::new("IT", input);
            registry.calculate(&mut tid).unwrap();
            assert_eq!(tid.code, want);
            assert!(registry.validate(&tid).is_ok(), "{input}");
        }
    }

    #[test]
    fn fiscal_code_identity() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut id = Identity {
            key: Some(IDENTITY_KEY_FISCAL_CODE),
            country: Some("IT".into()),
            code: "it rssmra74d22a001q".into(),
            ..Default::default()
        };
        registry.calculate(&mut id).unwrap();
        assert_eq!(id.code, "RSSMRA74D22A001Q");
        assert!(registry.validate(&id).is_ok());
    }

    #[test]
    fn rates() {
        let cat = vat();
        let on = date(2024, 1, 1);
        for (rate, pct) in [
            (RATE_GENERAL, dec!(22)),
            (RATE_INTERMEDIATE, dec!(10)),
            (RATE_REDUCED, dec!(5)),
            (RATE_SUPER_REDUCED, dec!(4)),
        ] {
            let found = cat.lookup(Some(&KEY_STANDARD), Some(&rate), on).unwrap();
            assert_eq!(found.and_then(|l| l.percent), Some(pct));
        }
    }
}
