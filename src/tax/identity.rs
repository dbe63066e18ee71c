//! Helpers shared by the regimes' tax identity normalizers and checksum
//! validators.

use crate::core::cbc::Code;
use crate::core::error::FieldErrors;
use crate::core::types::TaxIdentity;

/// Upper-case alphanumerical form of a tax code with the issuing country's
/// prefix removed: `"ro 18.547.290"` in `RO` becomes `"18547290"`.
pub fn normalize_code(code: &Code, country: &str) -> Code {
    let code = code.normalize_alphanumerical();
    let prefix = match country {
        "GR" => "EL",
        c => c,
    };
    Code::from(strip_country_prefix(code.as_str(), prefix))
}

/// Remove every leading repetition of `prefix`, keeping at least one
/// character: `"RORO123"` becomes `"123"`.
pub fn strip_country_prefix<'a>(code: &'a str, prefix: &str) -> &'a str {
    let mut code = code;
    if prefix.is_empty() {
        return code;
    }
    while let Some(rest) = code.strip_prefix(prefix) {
        if rest.is_empty() {
            break;
        }
        code = rest;
    }
    code
}

/// Default normalization applied to every tax identity before any regime
/// specific step.
pub fn normalize_tax_identity(tid: &mut TaxIdentity) {
    tid.country = tid.country.trim().to_uppercase();
    tid.code = normalize_code(&tid.code, &tid.country);
    if tid.zone.as_ref().is_some_and(|z| z.is_empty()) {
        tid.zone = None;
    }
}

/// Decimal digits of `s`, or `None` if anything else is present.
pub fn digits(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

/// Sum of `digits[i] * weights[i]` over the shorter of the two.
pub fn weighted_sum(digits: &[u32], weights: &[u32]) -> u32 {
    digits.iter().zip(weights).map(|(d, w)| d * w).sum()
}

/// Luhn (mod 10) check over a full number including its check digit.
pub fn luhn_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let d = d * 2;
                if d > 9 { d - 9 } else { d }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Run a code check on a tax identity. Empty codes are accepted; regimes
/// that need a code require it on the party.
pub fn check_code(tid: &TaxIdentity, check: fn(&str) -> Result<(), &'static str>) -> FieldErrors {
    if tid.code.is_empty() {
        return FieldErrors::new();
    }
    match check(tid.code.as_str()) {
        Ok(()) => FieldErrors::new(),
        Err(msg) => FieldErrors::single("code", msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_country_prefix() {
        assert_eq!(normalize_code(&Code::from("RO 18.547.290"), "RO"), "18547290");
        assert_eq!(normalize_code(&Code::from("el094259216"), "GR"), "094259216");
        assert_eq!(normalize_code(&Code::from("12.345.678-5"), "CL"), "123456785");
        assert_eq!(normalize_code(&Code::from("RO"), "RO"), "RO");
        assert_eq!(normalize_code(&Code::from("RO RO 18547290"), "RO"), "18547290");
        assert_eq!(normalize_code(&Code::from("RORO"), "RO"), "RO");
    }

    #[test]
    fn repeated_prefix_settles_in_one_pass() {
        let mut tid = TaxIdentity::new("RO", "RO RO 18547290");
        normalize_tax_identity(&mut tid);
        let once = tid.clone();
        normalize_tax_identity(&mut tid);
        assert_eq!(tid, once);
        assert_eq!(tid.code, "18547290");
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut tid = TaxIdentity::new(" br ", "05.104.582/0001-70");
        normalize_tax_identity(&mut tid);
        let once = tid.clone();
        normalize_tax_identity(&mut tid);
        assert_eq!(tid, once);
        assert_eq!(tid.country, "BR");
        assert_eq!(tid.code, "05104582000170");
    }

    #[test]
    fn digit_helpers() {
        assert_eq!(digits("0123"), Some(vec![0, 1, 2, 3]));
        assert_eq!(digits("12a"), None);
        assert_eq!(weighted_sum(&[1, 2, 3], &[3, 2, 1]), 10);
        assert!(luhn_valid(&digits("00743110157").unwrap()));
        assert!(!luhn_valid(&digits("00743110158").unwrap()));
    }

    #[test]
    fn empty_code_passes_check() {
        let tid = TaxIdentity::new("RO", "");
        assert!(check_code(&tid, |_| Err("bad")).is_empty());
        let tid = TaxIdentity::new("RO", "1");
        assert_eq!(check_code(&tid, |_| Err("bad")).to_string(), "code: bad.");
    }
}
