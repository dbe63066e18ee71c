use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::core::cbc::{Code, Definition, Key};
use crate::core::types::Invoice;
use crate::tax::{
    AddonDef, CategoryDef, CorrectionDefinition, Normalizer, RegimeDef, Registry,
    ScenarioSummary, TagSet, Tags, Validator, default_invoice_tags,
};

/// The regime and addons that apply to one document.
#[derive(Debug, Clone)]
pub(crate) struct Ruleset<'r> {
    pub registry: &'r Registry,
    pub regime: Option<&'r RegimeDef>,
    pub addons: Vec<&'r AddonDef>,
    /// Requested addons that are not registered, with their position.
    pub unknown_addons: Vec<(usize, Key)>,
    /// Date used for rate lookups.
    pub date: Option<NaiveDate>,
}

impl<'r> Ruleset<'r> {
    pub fn for_country(registry: &'r Registry, country: Option<&str>) -> Self {
        let regime = country.and_then(|c| {
            let found = registry.regime(c);
            if found.is_none() {
                debug!(country = c, "no regime registered; applying generic rules only");
            }
            found
        });
        Ruleset {
            registry,
            regime,
            addons: Vec::new(),
            unknown_addons: Vec::new(),
            date: None,
        }
    }

    /// Regime from `$regime` or the supplier's tax country, plus the
    /// requested addons with their requirements expanded ahead of them.
    pub fn for_invoice(registry: &'r Registry, inv: &Invoice) -> Self {
        let country = inv.regime.as_deref().or(inv.supplier.tax_country());
        let mut rs = Self::for_country(registry, country);
        rs.date = Some(inv.issue_date);
        for (i, key) in inv.addons.iter().enumerate() {
            rs.enable(i, key);
        }
        rs
    }

    fn enable(&mut self, pos: usize, key: &Key) {
        if self.addons.iter().any(|a| &a.key == key) {
            return;
        }
        match self.registry.addon(key) {
            Some(addon) => {
                for req in &addon.requires {
                    self.enable(pos, req);
                }
                self.addons.push(addon);
            }
            None => {
                warn!(addon = %key, "addon not registered");
                self.unknown_addons.push((pos, key.clone()));
            }
        }
    }

    /// Same addons under the regime of `country`. Tax identities are
    /// checked by the regime of the country that issued them.
    pub fn with_regime_of(&self, country: &str) -> Self {
        let mut rs = self.clone();
        rs.regime = self.registry.regime(country);
        rs
    }

    pub fn validators(&self) -> impl Iterator<Item = Validator> + '_ {
        self.regime
            .and_then(|r| r.validator)
            .into_iter()
            .chain(self.addons.iter().filter_map(|a| a.validator))
    }

    pub fn normalizers(&self) -> impl Iterator<Item = Normalizer> + '_ {
        self.regime
            .and_then(|r| r.normalizer)
            .into_iter()
            .chain(self.addons.iter().filter_map(|a| a.normalizer))
    }

    pub fn migrations(&self) -> impl Iterator<Item = &'r [(Key, Key)]> + '_ {
        self.regime
            .map(|r| r.ext_migrations.as_slice())
            .into_iter()
            .chain(self.addons.iter().map(|a| a.ext_migrations.as_slice()))
    }

    /// Extension visible to this document: addons, then the regime, then
    /// catalogues.
    pub fn extension_def(&self, key: &Key) -> Option<&'r Definition> {
        self.addons
            .iter()
            .find_map(|a| a.extension_def(key))
            .or_else(|| self.regime.and_then(|r| r.extension_def(key)))
            .or_else(|| self.registry.catalogue_extension(key))
    }

    pub fn identity_def(&self, code: &Code) -> Option<&'r Definition> {
        self.regime
            .and_then(|r| r.identity_def(code))
            .or_else(|| self.addons.iter().find_map(|a| a.identity_def(code)))
    }

    pub fn category_def(&self, code: &Code) -> Option<&'r CategoryDef> {
        self.regime.and_then(|r| r.category_def(code))
    }

    /// Default invoice tags merged with those of the regime and addons.
    pub fn invoice_tags(&self, schema: &str) -> TagSet {
        let mut set = default_invoice_tags();
        if let Some(t) = self.regime.and_then(|r| r.tag_set(schema)) {
            set.merge(t);
        }
        for a in &self.addons {
            if let Some(t) = a.tag_set(schema) {
                set.merge(t);
            }
        }
        set
    }

    /// Correction rules of the regime and addons, merged.
    pub fn correction(&self, schema: &str) -> Option<CorrectionDefinition> {
        self.regime
            .and_then(|r| r.correction_def(schema))
            .into_iter()
            .chain(self.addons.iter().filter_map(|a| a.correction_def(schema)))
            .fold(None, |acc: Option<CorrectionDefinition>, d| {
                Some(acc.map_or_else(|| d.clone(), |a| a.merge(d)))
            })
    }

    /// Scenarios of the regime, then of each addon, folded in order.
    pub fn scenario_summary(
        &self,
        schema: &str,
        doc_type: &Key,
        tags: &Tags,
        ext: Option<&crate::core::extensions::Extensions>,
    ) -> ScenarioSummary {
        let mut summary = ScenarioSummary::default();
        let sets = self
            .regime
            .and_then(|r| r.scenario_set(schema))
            .into_iter()
            .chain(self.addons.iter().filter_map(|a| a.scenario_set(schema)));
        for set in sets {
            summary.merge(set.summary_for(doc_type, tags, ext));
        }
        summary
    }
}
