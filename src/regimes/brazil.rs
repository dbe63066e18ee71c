//! Brazil (BR): federal, state and municipal taxes with several retained
//! contributions, CNPJ/CPF tax identities and address checks for CEP and
//! state codes.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::cbc::{Code, Definition, Key, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::{Address, INVOICE_TYPE_CREDIT_NOTE, Party, SCHEMA_INVOICE, TaxIdentity};
use crate::engine::Document;
use crate::tax::identity::{check_code, digits, weighted_sum};
use crate::tax::{CategoryDef, CorrectionDefinition, RegimeDef};

pub const EXT_KEY_MUNICIPALITY: Key = Key::from_static("br-ibge-municipality");

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_WEIGHTS: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

const STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

static POST_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{5}-?\d{3}$"));

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "BR".into(),
        currency: Code::from_static("BRL"),
        name: Text::en("Brazil"),
        time_zone: "America/Sao_Paulo".into(),
        extensions: vec![
            Definition::with_key(EXT_KEY_MUNICIPALITY, "IBGE Municipality Code")
                .pattern(r"^\d{7}$")
                .source(
                    "IBGE Municipality Codes",
                    "https://www.ibge.gov.br/explica/codigos-dos-municipios.php",
                ),
        ],
        corrections: vec![
            CorrectionDefinition::new(SCHEMA_INVOICE).types(&[INVOICE_TYPE_CREDIT_NOTE]),
        ],
        categories: categories(),
        validator: Some(validate),
        ..Default::default()
    }
}

fn categories() -> Vec<CategoryDef> {
    vec![
        CategoryDef::new("ISS", "ISS", "Municipal Service Tax"),
        CategoryDef::new("ICMS", "ICMS", "Value Added Tax on Goods and Services"),
        CategoryDef::new("IPI", "IPI", "Tax on Manufactured Products"),
        CategoryDef::new("PIS", "PIS", "Social Integration Program"),
        CategoryDef::new("PISRet", "PIS (Retained)", "Social Integration Program Retained")
            .retained(),
        CategoryDef::new("COFINS", "COFINS", "Contribution for the Financing of Social Security"),
        CategoryDef::new(
            "COFINSRet",
            "COFINS (Retained)",
            "Contribution for the Financing of Social Security Retained",
        )
        .retained(),
        CategoryDef::new("CSLL", "CSLL", "Social Contribution on Net Profits").retained(),
        CategoryDef::new("INSS", "INSS", "National Social Security Institute").retained(),
        CategoryDef::new("IRRF", "IRRF", "Withholding Income Tax").retained(),
        // Reported during the 2026 transition but not yet collected.
        CategoryDef::new("IBS", "IBS", "Goods and Services Tax").informative(),
        CategoryDef::new("CBS", "CBS", "Federal Goods and Services Contribution").informative(),
    ]
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Party(party) => validate_party(party),
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

/// Brazilian addresses, or those of a Brazilian party without a country,
/// need a valid CEP and state.
fn validate_party(party: &Party) -> FieldErrors {
    let brazilian = party.tax_country() == Some("BR");
    let mut errs = FieldErrors::new();
    for (i, addr) in party.addresses.iter().enumerate() {
        let applies = match addr.country.as_deref() {
            Some(c) => c == "BR",
            None => brazilian,
        };
        if applies {
            errs.nest(i.to_string(), validate_address(addr));
        }
    }
    let mut out = FieldErrors::new();
    out.nest("addresses", errs);
    out
}

fn validate_address(addr: &Address) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(code) = &addr.code {
        if !POST_CODE.is_match(code.as_str()) {
            errs.add("code", "must be in a valid format");
        }
    }
    if let Some(state) = addr.region.as_deref() {
        if !STATES.contains(&state) {
            errs.add("region", "must be a valid value");
        }
    }
    errs
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_tax_code)
}

/// CNPJ (14 digits) or CPF (11 digits), each with two mod 11 check digits.
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    let ds = digits(code).ok_or("must contain only digits")?;
    let weights: &[u32] = match ds.len() {
        14 => &CNPJ_WEIGHTS,
        11 => &CPF_WEIGHTS,
        _ => return Err("must be 11 (CPF) or 14 (CNPJ) digits"),
    };
    let n = ds.len();
    // The first digit uses the weights without their leading entry.
    let first = check_digit(&ds[..n - 2], &weights[1..]);
    let second = check_digit(&ds[..n - 1], weights);
    if first != ds[n - 2] || second != ds[n - 1] {
        return Err("verification digit mismatch");
    }
    Ok(())
}

fn check_digit(body: &[u32], weights: &[u32]) -> u32 {
    let rem = weighted_sum(body, weights) % 11;
    if rem < 2 { 0 } else { 11 - rem }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PartyBuilder;

    #[test]
    fn cnpj() {
        assert_eq!(check_tax_code("05104582000170"), Ok(()));
        assert_eq!(check_tax_code("11222333000181"), Ok(()));
        assert_eq!(check_tax_code("05104582000171"), Err("verification digit mismatch"));
    }

    #[test]
    fn cpf() {
        assert_eq!(check_tax_code("52998224725"), Ok(()));
        assert_eq!(check_tax_code("11144477735"), Ok(()));
        assert_eq!(check_tax_code("52998224726"), Err("verification digit mismatch"));
    }

    #[test]
    fn bad_length() {
        assert_eq!(check_tax_code("1234567"), Err("must be 11 (CPF) or 14 (CNPJ) digits"));
    }

    #[test]
    fn address_checks() {
        let addr = |code: &str, region: &str| Address {
            code: Some(Code::from(code)),
            region: Some(region.to_string()),
            country: Some("BR".into()),
            ..Default::default()
        };
        let ok = PartyBuilder::new("Loja").address(addr("12345-678", "SP")).build();
        assert!(validate_party(&ok).is_empty());

        let bad = PartyBuilder::new("Loja").address(addr("1234-5678", "XX")).build();
        let errs = validate_party(&bad);
        assert!(errs.contains("addresses.0.code"));
        assert!(errs.contains("addresses.0.region"));

        let foreign = PartyBuilder::new("Shop")
            .address(Address {
                code: Some(Code::from("123")),
                region: Some("NY".into()),
                country: Some("US".into()),
                ..Default::default()
            })
            .build();
        assert!(validate_party(&foreign).is_empty());
    }

    #[test]
    fn retained_categories() {
        let def = new();
        for code in ["PISRet", "COFINSRet", "CSLL", "INSS", "IRRF"] {
            assert!(def.category_def(&Code::from(code)).unwrap().retained, "{code}");
        }
        assert!(def.category_def(&Code::from("CBS")).unwrap().informative);
    }
}
