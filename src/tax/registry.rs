//! Process-wide registry of regimes, addons and catalogues.
//!
//! The builtin registry is assembled once, on first use, from every
//! definition compiled into the crate. Callers that need a different set
//! build their own [`Registry`] with [`RegistryBuilder`] and use the
//! engine methods on it directly.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tracing::debug;

use crate::core::catalogues::Catalogue;
use crate::core::cbc::{Definition, Key};
use crate::core::error::FiscalError;

use super::addon::AddonDef;
use super::regime::RegimeDef;

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| RegistryBuilder::builtin().build());

/// The builtin registry.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Builtin regime for a country code.
pub fn regime_def_for(country: &str) -> Option<&'static RegimeDef> {
    REGISTRY.regime(country)
}

/// Builtin addon by key.
pub fn addon_for_key(key: &Key) -> Option<&'static AddonDef> {
    REGISTRY.addon(key)
}

/// Extension definition from any builtin addon, regime or catalogue.
pub fn extension_for_key(key: &Key) -> Option<&'static Definition> {
    REGISTRY.extension_def(key)
}

/// Immutable lookup tables. Read concurrently without locking.
#[derive(Debug, Default)]
pub struct Registry {
    regimes: BTreeMap<String, RegimeDef>,
    addons: BTreeMap<Key, AddonDef>,
    catalogues: Vec<Catalogue>,
}

impl Registry {
    pub fn regime(&self, country: &str) -> Option<&RegimeDef> {
        self.regimes.get(country)
    }

    pub fn addon(&self, key: &Key) -> Option<&AddonDef> {
        self.addons.get(key)
    }

    pub fn regimes(&self) -> impl Iterator<Item = &RegimeDef> {
        self.regimes.values()
    }

    pub fn addons(&self) -> impl Iterator<Item = &AddonDef> {
        self.addons.values()
    }

    pub fn catalogues(&self) -> &[Catalogue] {
        &self.catalogues
    }

    /// Extension defined by a catalogue.
    pub fn catalogue_extension(&self, key: &Key) -> Option<&Definition> {
        self.catalogues.iter().find_map(|c| c.extension(key))
    }

    /// Extension defined anywhere in the registry: addons first, then
    /// regimes, then catalogues.
    pub fn extension_def(&self, key: &Key) -> Option<&Definition> {
        self.addons
            .values()
            .find_map(|a| a.extension_def(key))
            .or_else(|| self.regimes.values().find_map(|r| r.extension_def(key)))
            .or_else(|| self.catalogue_extension(key))
    }
}

/// Collects definitions into a [`Registry`]. Registering the same regime
/// country or addon key twice panics.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every definition compiled into the crate.
    pub fn builtin() -> Self {
        let mut b = Self::new();
        for name in crate::core::catalogues::packaged_names() {
            let cat = Catalogue::packaged(name)
                .unwrap_or_else(|e| panic!("packaged catalogue {name}: {e}"));
            b = b.catalogue(cat);
        }
        #[cfg(feature = "regimes")]
        for def in crate::regimes::all() {
            b = b.regime(def);
        }
        #[cfg(feature = "addons")]
        for def in crate::addons::all() {
            b = b.addon(def);
        }
        b
    }

    pub fn regime(mut self, def: RegimeDef) -> Self {
        def.check();
        if self.registry.regimes.contains_key(&def.country) {
            panic!("regime {} registered twice", def.country);
        }
        debug!(country = %def.country, "registered regime");
        self.registry.regimes.insert(def.country.clone(), def);
        self
    }

    pub fn addon(mut self, def: AddonDef) -> Self {
        def.check();
        if self.registry.addons.contains_key(&def.key) {
            panic!("addon {} registered twice", def.key);
        }
        debug!(key = %def.key, "registered addon");
        self.registry.addons.insert(def.key.clone(), def);
        self
    }

    pub fn catalogue(mut self, cat: Catalogue) -> Self {
        if self.registry.catalogues.iter().any(|c| c.key == cat.key) {
            panic!("catalogue {} registered twice", cat.key);
        }
        self.registry.catalogues.push(cat);
        self
    }

    /// Register a catalogue from JSON, surfacing parse failures.
    pub fn catalogue_json(self, name: &str, json: &str) -> Result<Self, FiscalError> {
        Ok(self.catalogue(Catalogue::from_json(name, json)?))
    }

    pub fn build(self) -> Registry {
        for addon in self.registry.addons.values() {
            for req in &addon.requires {
                if !self.registry.addons.contains_key(req) {
                    panic!("addon {} requires unregistered addon {req}", addon.key);
                }
            }
        }
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cbc::Code;

    #[test]
    fn empty_builder() {
        let reg = RegistryBuilder::new().build();
        assert!(reg.regime("RO").is_none());
        assert!(reg.extension_def(&Key::from("cef-vatex")).is_none());
    }

    #[test]
    fn custom_regime_and_catalogue() {
        let reg = RegistryBuilder::new()
            .regime(RegimeDef {
                country: "XX".into(),
                currency: Code::from_static("EUR"),
                ..Default::default()
            })
            .catalogue_json(
                "x.json",
                r#"{"key":"x","name":{"en":"X"},"extensions":[{"key":"x-code","name":{"en":"X code"}}]}"#,
            )
            .unwrap()
            .build();
        assert!(reg.regime("XX").is_some());
        assert!(reg.extension_def(&Key::from("x-code")).is_some());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_regime_panics() {
        let def = RegimeDef {
            country: "XX".into(),
            ..Default::default()
        };
        let _ = RegistryBuilder::new().regime(def.clone()).regime(def);
    }

    #[test]
    #[should_panic(expected = "requires unregistered addon")]
    fn missing_requirement_panics() {
        let _ = RegistryBuilder::new()
            .addon(AddonDef {
                key: Key::from("de-test-v1"),
                requires: vec![Key::from("eu-missing-v1")],
                ..Default::default()
            })
            .build();
    }
}
