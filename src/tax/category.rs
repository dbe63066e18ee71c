//! Tax categories, rates and their dated values.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::cbc::{Code, Key, Source, Text};
use crate::core::error::RateError;

/// Percentage applicable from a given date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateValueDef {
    /// First day the value applies; `None` means since forever.
    pub since: Option<NaiveDate>,
    /// Percent units: 21 means 21%.
    pub percent: Decimal,
    pub surcharge: Option<Decimal>,
    /// Marks the end of a rate's validity window.
    pub disabled: bool,
}

impl RateValueDef {
    pub fn new(since: NaiveDate, percent: Decimal) -> Self {
        RateValueDef {
            since: Some(since),
            percent,
            surcharge: None,
            disabled: false,
        }
    }

    /// Value with no start date.
    pub fn always(percent: Decimal) -> Self {
        RateValueDef {
            since: None,
            percent,
            surcharge: None,
            disabled: false,
        }
    }

    /// Entry closing the rate from `since` onwards.
    pub fn disabled_since(since: NaiveDate) -> Self {
        RateValueDef {
            since: Some(since),
            percent: Decimal::ZERO,
            surcharge: None,
            disabled: true,
        }
    }

    pub fn with_surcharge(mut self, surcharge: Decimal) -> Self {
        self.surcharge = Some(surcharge);
        self
    }

    fn applies_on(&self, date: NaiveDate) -> bool {
        self.since.is_none_or(|s| s <= date)
    }
}

/// A named rate level within a category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateDef {
    pub rate: Key,
    /// Combo keys this rate may be used with; empty accepts any.
    pub keys: Vec<Key>,
    pub name: Text,
    pub desc: Option<Text>,
    /// Exempt rates carry no percentage.
    pub exempt: bool,
    /// Newest first.
    pub values: Vec<RateValueDef>,
}

impl RateDef {
    pub fn new(rate: Key, name: impl Into<Text>) -> Self {
        RateDef {
            rate,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn keys(mut self, keys: &[Key]) -> Self {
        self.keys = keys.to_vec();
        self
    }

    pub fn desc(mut self, desc: impl Into<Text>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn exempt(mut self) -> Self {
        self.exempt = true;
        self
    }

    pub fn values(mut self, values: Vec<RateValueDef>) -> Self {
        self.values = values;
        self
    }

    pub fn has_key(&self, key: Option<&Key>) -> bool {
        self.keys.is_empty() || key.is_some_and(|k| k.is_in(&self.keys))
    }

    /// Most recent value whose start date is on or before `date`.
    pub fn value_on(&self, date: NaiveDate) -> Option<&RateValueDef> {
        self.values.iter().find(|v| v.applies_on(date))
    }
}

/// Resolved percentage for a combo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLookup {
    pub rate: Key,
    /// `None` for exempt rates.
    pub percent: Option<Decimal>,
    pub surcharge: Option<Decimal>,
}

/// A tax family such as VAT, GST or ICMS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDef {
    pub code: Code,
    pub name: Text,
    pub title: Text,
    pub desc: Option<Text>,
    /// Withheld by the customer; reported apart from payable tax.
    pub retained: bool,
    /// Reported for information only.
    pub informative: bool,
    /// Combo keys accepted by this category.
    pub keys: Vec<Key>,
    pub rates: Vec<RateDef>,
    pub sources: Vec<Source>,
}

impl CategoryDef {
    pub fn new(code: &'static str, name: &str, title: &str) -> Self {
        CategoryDef {
            code: Code::from_static(code),
            name: Text::en(name),
            title: Text::en(title),
            ..Default::default()
        }
    }

    pub fn retained(mut self) -> Self {
        self.retained = true;
        self
    }

    pub fn informative(mut self) -> Self {
        self.informative = true;
        self
    }

    pub fn keys(mut self, keys: Vec<Key>) -> Self {
        self.keys = keys;
        self
    }

    pub fn rates(mut self, rates: Vec<RateDef>) -> Self {
        self.rates = rates;
        self
    }

    pub fn desc(mut self, desc: impl Into<Text>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn source(mut self, title: &str, url: &str) -> Self {
        self.sources.push(Source {
            title: Text::en(title),
            url: url.to_string(),
        });
        self
    }

    pub fn has_key(&self, key: &Key) -> bool {
        key.is_in(&self.keys)
    }

    /// Rate matching the combo. With an explicit `rate` the level must
    /// match and accept the combo key; without one, the first rate
    /// accepting the key is used.
    pub fn rate_def(&self, key: Option<&Key>, rate: Option<&Key>) -> Option<&RateDef> {
        match rate {
            Some(r) => self
                .rates
                .iter()
                .find(|rd| &rd.rate == r && rd.has_key(key)),
            None => {
                let key = key?;
                self.rates
                    .iter()
                    .find(|rd| !rd.keys.is_empty() && rd.has_key(Some(key)))
            }
        }
    }

    /// Resolve a combo's percentage on `date`.
    ///
    /// `Ok(None)` when the combo names no rate and no rate accepts its
    /// key, so any percentage it carries stands as given.
    pub fn lookup(
        &self,
        key: Option<&Key>,
        rate: Option<&Key>,
        date: NaiveDate,
    ) -> Result<Option<RateLookup>, RateError> {
        let Some(rd) = self.rate_def(key, rate) else {
            return match rate {
                Some(r) => Err(RateError::RateNotFound {
                    category: self.code.clone(),
                    rate: r.clone(),
                }),
                None => Ok(None),
            };
        };
        if rd.exempt {
            return Ok(Some(RateLookup {
                rate: rd.rate.clone(),
                percent: None,
                surcharge: None,
            }));
        }
        match rd.value_on(date) {
            Some(v) if !v.disabled => Ok(Some(RateLookup {
                rate: rd.rate.clone(),
                percent: Some(v.percent),
                surcharge: v.surcharge,
            })),
            _ => Err(RateError::NotValidOnDate {
                category: self.code.clone(),
                rate: rd.rate.clone(),
                date,
            }),
        }
    }

    /// Panics when the builtin definition breaks an invariant: duplicate
    /// rate keys, or values not strictly newest-first.
    pub(crate) fn check(&self) {
        for (i, rd) in self.rates.iter().enumerate() {
            if self.rates[..i]
                .iter()
                .any(|o| o.rate == rd.rate && o.keys == rd.keys)
            {
                panic!("category {}: duplicate rate '{}'", self.code, rd.rate);
            }
            for w in rd.values.windows(2) {
                let ordered = match (w[0].since, w[1].since) {
                    (Some(a), Some(b)) => a > b,
                    (Some(_), None) => true,
                    _ => false,
                };
                if !ordered {
                    panic!(
                        "category {} rate '{}': values must be newest first with unique dates",
                        self.code, rd.rate
                    );
                }
            }
        }
    }
}

/// First category with `code`.
pub fn category_def_for<'a>(list: &'a [CategoryDef], code: &Code) -> Option<&'a CategoryDef> {
    list.iter().find(|c| &c.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{KEY_EXEMPT, KEY_STANDARD, KEY_ZERO, RATE_GENERAL, RATE_REDUCED, RATE_ZERO};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vat() -> CategoryDef {
        CategoryDef::new("VAT", "VAT", "Value Added Tax")
            .keys(vec![KEY_STANDARD, KEY_ZERO, KEY_EXEMPT])
            .rates(vec![
                RateDef::new(RATE_GENERAL, "General")
                    .keys(&[KEY_STANDARD])
                    .values(vec![
                        RateValueDef::new(date(2019, 10, 1), dec!(10)),
                        RateValueDef::new(date(2014, 4, 1), dec!(8)),
                        RateValueDef::new(date(1997, 4, 1), dec!(5)),
                    ]),
                RateDef::new(RATE_REDUCED, "Reduced")
                    .keys(&[KEY_STANDARD])
                    .values(vec![
                        RateValueDef::disabled_since(date(2030, 1, 1)),
                        RateValueDef::new(date(2019, 10, 1), dec!(8)),
                    ]),
                RateDef::new(RATE_ZERO, "Zero")
                    .keys(&[KEY_ZERO])
                    .values(vec![RateValueDef::always(dec!(0))]),
                RateDef::new(Key::from("exempt"), "Exempt")
                    .keys(&[KEY_EXEMPT])
                    .exempt(),
            ])
    }

    #[test]
    fn picks_newest_value_not_after_date() {
        let cat = vat();
        let general = Some(&RATE_GENERAL);
        let std = Some(&KEY_STANDARD);
        let pct = |d| cat.lookup(std, general, d).unwrap().unwrap().percent;
        assert_eq!(pct(date(2024, 1, 1)), Some(dec!(10)));
        assert_eq!(pct(date(2019, 10, 1)), Some(dec!(10)));
        assert_eq!(pct(date(2019, 9, 30)), Some(dec!(8)));
        assert_eq!(pct(date(2000, 1, 1)), Some(dec!(5)));
    }

    #[test]
    fn no_value_before_first_since() {
        let err = vat()
            .lookup(Some(&KEY_STANDARD), Some(&RATE_GENERAL), date(1990, 1, 1))
            .unwrap_err();
        assert!(matches!(err, RateError::NotValidOnDate { .. }));
    }

    #[test]
    fn disabled_value_closes_window() {
        let cat = vat();
        assert!(cat
            .lookup(Some(&KEY_STANDARD), Some(&RATE_REDUCED), date(2029, 12, 31))
            .is_ok());
        assert!(cat
            .lookup(Some(&KEY_STANDARD), Some(&RATE_REDUCED), date(2030, 1, 1))
            .is_err());
    }

    #[test]
    fn key_defaults_to_first_matching_rate() {
        let cat = vat();
        let found = cat.lookup(Some(&KEY_STANDARD), None, date(2024, 1, 1)).unwrap();
        assert_eq!(found.map(|l| l.rate), Some(RATE_GENERAL));
        let zero = cat.lookup(Some(&KEY_ZERO), None, date(2024, 1, 1)).unwrap();
        assert_eq!(zero.and_then(|l| l.percent), Some(dec!(0)));
    }

    #[test]
    fn exempt_has_no_percent() {
        let found = vat().lookup(Some(&KEY_EXEMPT), None, date(2024, 1, 1)).unwrap();
        assert_eq!(found.map(|l| l.percent), Some(None));
    }

    #[test]
    fn rate_must_accept_key() {
        let err = vat()
            .lookup(Some(&KEY_ZERO), Some(&RATE_GENERAL), date(2024, 1, 1))
            .unwrap_err();
        assert_eq!(err.to_string(), "rate 'general' not defined in category 'VAT'");
        assert_eq!(
            vat().lookup(Some(&Key::from("reverse-charge")), None, date(2024, 1, 1)),
            Ok(None)
        );
    }

    #[test]
    fn check_accepts_ordered_values() {
        vat().check();
    }

    #[test]
    #[should_panic(expected = "newest first")]
    fn check_rejects_unordered_values() {
        CategoryDef::new("VAT", "VAT", "VAT")
            .rates(vec![RateDef::new(RATE_GENERAL, "General").values(vec![
                RateValueDef::new(date(2010, 1, 1), dec!(10)),
                RateValueDef::new(date(2020, 1, 1), dec!(12)),
            ])])
            .check();
    }
}
