//! Packaged catalogues: extension definitions shared across regimes and
//! addons, shipped as JSON and parsed when the registry is built.

use serde::{Deserialize, Serialize};

use super::cbc::{Definition, Key, Text, definition_for_key};
use super::error::FiscalError;

/// Packaged catalogue files, by name.
static PACKAGED: &[(&str, &str)] = &[
    ("cef.json", include_str!("../../data/catalogues/cef.json")),
    ("untdid.json", include_str!("../../data/catalogues/untdid.json")),
];

/// A named set of extension definitions not tied to a single regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    pub key: Key,
    pub name: Text,
    #[serde(default)]
    pub extensions: Vec<Definition>,
}

impl Catalogue {
    /// Parse a catalogue from JSON.
    pub fn from_json(name: &str, json: &str) -> Result<Self, FiscalError> {
        serde_json::from_str(json).map_err(|source| FiscalError::Catalogue {
            name: name.to_string(),
            source,
        })
    }

    /// Load one of the catalogues shipped with the crate by file name.
    pub fn packaged(name: &str) -> Result<Self, FiscalError> {
        let (_, json) = PACKAGED
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| FiscalError::UnknownCatalogue(name.to_string()))?;
        Self::from_json(name, json)
    }

    pub fn extension(&self, key: &Key) -> Option<&Definition> {
        definition_for_key(&self.extensions, key)
    }
}

/// Names of every packaged catalogue file.
pub fn packaged_names() -> impl Iterator<Item = &'static str> {
    PACKAGED.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cbc::Code;

    #[test]
    fn loads_every_packaged_catalogue() {
        for name in packaged_names() {
            let cat = Catalogue::packaged(name).unwrap();
            assert!(!cat.extensions.is_empty(), "{name}");
            for def in &cat.extensions {
                assert!(def.key.as_ref().is_some_and(|k| k.validate().is_ok()));
            }
        }
    }

    #[test]
    fn vatex_codes() {
        let cef = Catalogue::packaged("cef.json").unwrap();
        let def = cef.extension(&Key::from("cef-vatex")).unwrap();
        assert!(def.validate_value(&Code::from("VATEX-EU-132")).is_ok());
        assert!(def.validate_value(&Code::from("VATEX-XX")).is_err());
    }

    #[test]
    fn unknown_and_malformed() {
        assert!(matches!(
            Catalogue::packaged("nope.json"),
            Err(FiscalError::UnknownCatalogue(_))
        ));
        let err = Catalogue::from_json("bad.json", "{").unwrap_err();
        assert!(err.to_string().starts_with("catalogue 'bad.json' could not be loaded"));
    }
}
