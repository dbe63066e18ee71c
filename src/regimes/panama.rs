//! Panama (PA): ITBMS and the RUC with its two digit DV.
//!
//! The DV is appended to the RUC as the last hyphen-separated segment, as in
//! `8-442-445-90`. Hyphens separate the structural parts of a RUC so they
//! survive normalization.
//!
//! The DV is computed over a numeric rendering of the RUC whose layout
//! depends on the taxpayer type, with two weighted modulo 11 passes.
//! Old legal entity numbers go through a cross-reference table first and
//! skip weight 12.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal_macros::dec;

use crate::core::cbc::{Code, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::types::*;
use crate::engine::Document;
use crate::tax::identity::{check_code, strip_country_prefix};
use crate::tax::{
    CATEGORY_VAT, CategoryDef, CorrectionDefinition, KEY_EXEMPT, KEY_STANDARD, RATE_EXEMPT,
    RATE_GENERAL, RateDef, RateValueDef, RegimeDef, vat_keys,
};

use super::{date, require_tax_code};

/// Placeholder used for anonymous final consumers; carries no DV.
pub const TAX_CODE_FINAL_CONSUMER: &str = "CIP-000-000-0000";

const PERSON_FIXED_SEGMENT: &str = "0000005";
const PROVINCE_NONE: &str = "00";
const TYPE_CEDULA: &str = "00";
const TYPE_FOREIGNER: &str = "50";
const TYPE_NATURALIZED: &str = "40";
const TYPE_PE: &str = "75";
const TYPE_AV: &str = "15";
const TYPE_PI: &str = "79";
const TYPE_NT: &str = "43";

static RUC_FORMATS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^CIP-000-000-0000$",
        r"^E-\d{1,4}-\d{1,6}-\d{2}$",
        r"^N-\d{1,4}-\d{1,6}-\d{2}$",
        r"^PE-\d{1,4}-\d{1,6}-\d{2}$",
        r"^\d{1,2}AV-\d{1,4}-\d{1,6}-\d{2}$",
        r"^\d{1,2}PI-\d{1,4}-\d{1,6}-\d{2}$",
        r"^\d{1,2}NT-\d{1,4}-\d{1,4}-\d{1,6}-\d{2}$",
        r"^\d{1,2}-\d{1,4}-\d{1,6}-\d{2}$",
        r"^\d{3,}-\d{1,4}-\d{1,7}-\d{2}$",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

pub fn new() -> RegimeDef {
    RegimeDef {
        country: "PA".into(),
        currency: Code::from_static("PAB"),
        name: Text::en("Panama").with("es", "Panamá"),
        time_zone: "America/Panama".into(),
        tax_scheme: Some(CATEGORY_VAT),
        corrections: vec![
            CorrectionDefinition::new(SCHEMA_INVOICE)
                .types(&[INVOICE_TYPE_CREDIT_NOTE, INVOICE_TYPE_DEBIT_NOTE]),
        ],
        categories: vec![
            CategoryDef::new(
                "VAT",
                "ITBMS",
                "Impuesto de Transferencia de Bienes Muebles y Servicios",
            )
            .keys(vat_keys())
            .rates(vec![
                RateDef::new(RATE_GENERAL, "General Rate")
                    .keys(&[KEY_STANDARD])
                    .values(vec![
                        RateValueDef::new(date(2010, 7, 1), dec!(7)),
                        RateValueDef::new(date(1977, 1, 1), dec!(5)),
                    ]),
                RateDef::new(RATE_EXEMPT, "Exempt").keys(&[KEY_EXEMPT]).exempt(),
            ])
            .source("DGI - SFEP Portal", "https://dgi.mef.gob.pa/facturaelectronica"),
            CategoryDef::new("ISC", "ISC", "Impuesto Selectivo al Consumo"),
        ],
        tax_code_normalizer: Some(normalize_tax_identity),
        validator: Some(validate),
        ..Default::default()
    }
}

/// Upper-case the RUC and drop everything but letters, digits and hyphens.
pub fn normalize_tax_identity(tid: &mut TaxIdentity) {
    let code: String = tid
        .code
        .as_str()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    tid.code = Code::from(strip_country_prefix(&code, "PA"));
    if tid.zone.as_ref().is_some_and(|z| z.is_empty()) {
        tid.zone = None;
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => {
            let mut errs = FieldErrors::new();
            errs.nest("supplier", require_tax_code(&inv.supplier));
            errs
        }
        Document::TaxIdentity(tid) => validate_tax_identity(tid),
        _ => FieldErrors::new(),
    }
}

pub fn validate_tax_identity(tid: &TaxIdentity) -> FieldErrors {
    check_code(tid, check_ruc)
}

/// RUC with its trailing DV, or the final consumer placeholder.
pub fn check_ruc(code: &str) -> Result<(), &'static str> {
    if !RUC_FORMATS.iter().any(|re| re.is_match(code)) {
        return Err("must be in a valid format");
    }
    if code == TAX_CODE_FINAL_CONSUMER {
        return Ok(());
    }
    let Some((ruc, dv)) = code.rsplit_once('-') else {
        return Ok(());
    };
    match calculate_dv(ruc) {
        Some(expected) if expected == dv => Ok(()),
        _ => Err("dv checksum failed"),
    }
}

/// The two DV digits for a RUC given without its DV.
pub fn calculate_dv(ruc: &str) -> Option<String> {
    let segments: Vec<&str> = ruc.split('-').collect();
    if !(3..=4).contains(&segments.len()) {
        return None;
    }
    if segments.len() == 4 && !segments[0].ends_with("NT") {
        return None;
    }
    let mut numeric = build_numeric(ruc, &segments)?;
    let bytes = numeric.as_bytes();
    let old_format = bytes.len() >= 6 && bytes[3] == b'0' && bytes[4] == b'0' && bytes[5] < b'5';
    if old_format {
        let replacement = cross_reference(&numeric[5..7]).to_string();
        numeric.replace_range(5..7, &replacement);
    }
    let first = dv_digit(old_format, &numeric)?;
    numeric.push(char::from_digit(first, 10)?);
    let second = dv_digit(old_format, &numeric)?;
    Some(format!("{first}{second}"))
}

fn build_numeric(ruc: &str, seg: &[&str]) -> Option<String> {
    let person = |province: &str, kind: &str, book: usize| -> Option<String> {
        Some(person_numeric(province, kind, seg.get(book)?, seg.get(book + 1)?))
    };
    let first = *seg.first()?;
    if ruc.starts_with('E') {
        person(PROVINCE_NONE, TYPE_FOREIGNER, 1)
    } else if let Some(province) = first.strip_suffix("NT") {
        person(province, TYPE_NT, 2)
    } else if let Some(province) = first.strip_suffix("AV") {
        person(province, TYPE_AV, 1)
    } else if let Some(province) = first.strip_suffix("PI") {
        person(province, TYPE_PI, 1)
    } else if first == "PE" {
        person(PROVINCE_NONE, TYPE_PE, 1)
    } else if ruc.starts_with('N') {
        person(PROVINCE_NONE, TYPE_NATURALIZED, 1)
    } else if first.len() <= 2 {
        person(first, TYPE_CEDULA, 1)
    } else {
        Some(format!(
            "{}{}{}",
            pad_left(first, 10),
            pad_left(seg.get(1)?, 4),
            pad_left(seg.get(2)?, 6)
        ))
    }
}

fn person_numeric(province: &str, kind: &str, book: &str, entry: &str) -> String {
    format!(
        "{}{PERSON_FIXED_SEGMENT}{}{kind}{}{}",
        pad_left(book, 4),
        pad_left(province, 2),
        pad_left(book, 3),
        pad_left(entry, 5)
    )
}

fn pad_left(s: &str, width: usize) -> String {
    format!("{s:0>width$}")
}

/// Type code substitution for old legal entity numbers.
fn cross_reference(key: &str) -> &str {
    match key {
        "00" => "00",
        "10" | "19" | "34" | "43" => "01",
        "11" | "20" | "26" | "35" | "44" => "02",
        "12" | "21" | "27" | "36" | "45" => "03",
        "13" | "22" | "28" | "37" | "46" => "04",
        "14" | "29" | "38" | "47" => "05",
        "15" | "30" | "39" | "48" => "06",
        "16" | "23" | "31" | "40" | "49" => "07",
        "17" | "24" | "32" | "41" => "08",
        "18" | "25" | "33" | "42" => "09",
        other => other,
    }
}

/// Weighted modulo 11 from the rightmost digit with weights counting up
/// from 2. Once an old format number reaches weight 12 it stays at 11.
fn dv_digit(old_format: bool, numeric: &str) -> Option<u32> {
    let mut weight = 2;
    let mut sum = 0;
    for c in numeric.chars().rev() {
        if old_format && weight == 12 {
            weight -= 1;
        }
        sum += weight * c.to_digit(10)?;
        weight += 1;
    }
    match sum % 11 {
        r if r > 1 => Some(11 - r),
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::RegistryBuilder;

    #[test]
    fn valid_rucs() {
        for code in [
            "8-442-445-90",
            "1-12-345-72",
            "10-1234-567890-41",
            "E-12-342-35",
            "E-8-1234-62",
            "N-45-832-03",
            "PE-10-442-98",
            "1AV-432-658-15",
            "4PI-234-123-51",
            "2486589-1-816994-62",
            "155596713-2-2015-59",
            "1NT-100-200-3000-30",
            "12NT-1-1-1-96",
            "8-1-10-15",
            "8-1-100-06",
            TAX_CODE_FINAL_CONSUMER,
        ] {
            assert_eq!(check_ruc(code), Ok(()), "{code}");
        }
    }

    #[test]
    fn old_format_legal_entities() {
        for code in [
            "100-2-3-06",
            "10000-1-1-18",
            "11000-3-5-02",
            "12000-2-7-30",
            "30000-5-100-05",
            "1000-2-19-73",
        ] {
            assert_eq!(check_ruc(code), Ok(()), "{code}");
        }
    }

    #[test]
    fn invalid_rucs() {
        assert_eq!(check_ruc("8-442-445-91"), Err("dv checksum failed"));
        assert_eq!(check_ruc("E-12-342-00"), Err("dv checksum failed"));
        assert_eq!(check_ruc("2486589-1-816994-99"), Err("dv checksum failed"));
        assert_eq!(check_ruc("123-442-445-90"), Err("dv checksum failed"));
        for code in ["12345678", "8-442", "8-442-ABC-90", "X-12-342-35"] {
            assert_eq!(check_ruc(code), Err("must be in a valid format"), "{code}");
        }
    }

    #[test]
    fn normalization_keeps_hyphens() {
        let registry = RegistryBuilder::new().regime(new()).build();
        let mut tid = TaxIdentity::new("PA", "pa 8-442-445-90");
        registry.calculate(&mut tid).unwrap();
        assert_eq!(tid.code, "8-442-445-90");
        assert!(registry.validate(&tid).is_ok());
    }
}
