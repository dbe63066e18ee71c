use chrono::NaiveDate;

use crate::core::cbc::{Code, Definition, Key, Text, definition_for_code, definition_for_key};
use crate::core::error::{FieldErrors, RateError};
use crate::core::types::TaxIdentity;
use crate::engine::{Document, DocumentMut};

use super::category::{CategoryDef, RateLookup, category_def_for};
use super::correction::{CorrectionDefinition, correction_for};
use super::scenario::{ScenarioSet, scenario_set_for};
use super::tags::{TagSet, tag_set_for};

/// Validation hook run on every document node.
pub type Validator = fn(Document<'_>) -> FieldErrors;

/// Normalization hook run on every document node.
pub type Normalizer = fn(DocumentMut<'_>);

/// Replacement for the default tax code cleanup.
pub type TaxCodeNormalizer = fn(&mut TaxIdentity);

/// Everything a country's tax regime declares.
#[derive(Debug, Clone, Default)]
pub struct RegimeDef {
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    pub currency: Code,
    pub name: Text,
    pub description: Option<Text>,
    pub time_zone: String,
    /// Category used to identify the regime's main indirect tax.
    pub tax_scheme: Option<Code>,
    pub tags: Vec<TagSet>,
    pub extensions: Vec<Definition>,
    pub identities: Vec<Definition>,
    pub scenarios: Vec<ScenarioSet>,
    pub corrections: Vec<CorrectionDefinition>,
    pub categories: Vec<CategoryDef>,
    /// Legacy extension keys and their replacements.
    pub ext_migrations: Vec<(Key, Key)>,
    /// Used instead of [`normalize_tax_identity`](super::identity::normalize_tax_identity)
    /// when separators in the code carry meaning.
    pub tax_code_normalizer: Option<TaxCodeNormalizer>,
    pub validator: Option<Validator>,
    pub normalizer: Option<Normalizer>,
}

impl RegimeDef {
    pub fn code(&self) -> &str {
        &self.country
    }

    pub fn category_def(&self, code: &Code) -> Option<&CategoryDef> {
        category_def_for(&self.categories, code)
    }

    /// Resolve a combo's percentage on `date`.
    pub fn rate_for(
        &self,
        category: &Code,
        key: Option<&Key>,
        rate: Option<&Key>,
        date: NaiveDate,
    ) -> Result<Option<RateLookup>, RateError> {
        self.category_def(category)
            .ok_or_else(|| RateError::CategoryNotFound(category.clone()))?
            .lookup(key, rate, date)
    }

    pub fn extension_def(&self, key: &Key) -> Option<&Definition> {
        definition_for_key(&self.extensions, key)
    }

    pub fn identity_def(&self, code: &Code) -> Option<&Definition> {
        definition_for_code(&self.identities, code)
    }

    pub fn scenario_set(&self, schema: &str) -> Option<&ScenarioSet> {
        scenario_set_for(&self.scenarios, schema)
    }

    pub fn correction_def(&self, schema: &str) -> Option<&CorrectionDefinition> {
        correction_for(&self.corrections, schema)
    }

    pub fn tag_set(&self, schema: &str) -> Option<&TagSet> {
        tag_set_for(&self.tags, schema)
    }

    /// Panics when builtin data breaks an invariant.
    pub(crate) fn check(&self) {
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            panic!("regime '{}': country must be two upper-case letters", self.country);
        }
        for (i, cat) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|c| c.code == cat.code) {
                panic!("regime {}: duplicate category {}", self.country, cat.code);
            }
            cat.check();
        }
        check_unique_keys(&self.country, &self.extensions);
    }
}

pub(crate) fn check_unique_keys(owner: &str, defs: &[Definition]) {
    for (i, d) in defs.iter().enumerate() {
        if d.key.is_some() && defs[..i].iter().any(|o| o.key == d.key) {
            panic!("{owner}: duplicate extension {:?}", d.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{KEY_STANDARD, RATE_GENERAL, RateDef, RateValueDef};
    use rust_decimal_macros::dec;

    fn regime() -> RegimeDef {
        RegimeDef {
            country: "XX".into(),
            currency: Code::from_static("EUR"),
            categories: vec![
                CategoryDef::new("VAT", "VAT", "Value Added Tax")
                    .keys(vec![KEY_STANDARD])
                    .rates(vec![RateDef::new(RATE_GENERAL, "General")
                        .keys(&[KEY_STANDARD])
                        .values(vec![RateValueDef::new(
                            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                            dec!(20),
                        )])]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn rate_for_unknown_category() {
        let err = regime()
            .rate_for(&Code::from("GST"), None, None, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap_err();
        assert_eq!(err, RateError::CategoryNotFound(Code::from("GST")));
    }

    #[test]
    fn rate_for_known_category() {
        let found = regime()
            .rate_for(
                &Code::from("VAT"),
                Some(&KEY_STANDARD),
                None,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .unwrap();
        assert_eq!(found.and_then(|l| l.percent), Some(dec!(20)));
    }

    #[test]
    #[should_panic(expected = "two upper-case letters")]
    fn check_rejects_bad_country() {
        RegimeDef {
            country: "xx".into(),
            ..Default::default()
        }
        .check();
    }
}
