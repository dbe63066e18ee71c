use crate::core::cbc::{Code, Definition, Key, Text, definition_for_code, definition_for_key};

use super::correction::{CorrectionDefinition, correction_for};
use super::regime::{Normalizer, Validator, check_unique_keys};
use super::scenario::{ScenarioSet, scenario_set_for};
use super::tags::{TagSet, tag_set_for};

/// An opt-in rule pack layered on top of a regime, usually for a
/// specific e-invoicing format.
#[derive(Debug, Clone, Default)]
pub struct AddonDef {
    pub key: Key,
    /// Addons applied before this one whenever it is enabled.
    pub requires: Vec<Key>,
    pub name: Text,
    pub description: Option<Text>,
    pub tags: Vec<TagSet>,
    pub extensions: Vec<Definition>,
    pub identities: Vec<Definition>,
    pub scenarios: Vec<ScenarioSet>,
    pub corrections: Vec<CorrectionDefinition>,
    pub ext_migrations: Vec<(Key, Key)>,
    pub validator: Option<Validator>,
    pub normalizer: Option<Normalizer>,
}

impl AddonDef {
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
        if let Err(e) = self.key.validate() {
            panic!("addon '{}': key {e}", self.key);
        }
        check_unique_keys(self.key.as_str(), &self.extensions);
    }
}
