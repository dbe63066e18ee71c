//! Extension maps: code-valued annotations on documents, parties, combos
//! and references, validated against the definitions declared by the
//! active regime, addons and catalogues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::cbc::{Code, Definition, Key};
use super::error::FieldErrors;

/// Mapping of extension key to code value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<Key, Code>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Key) -> Option<&Code> {
        self.0.get(key)
    }

    /// True when every key is present with a non-empty value.
    pub fn has(&self, keys: &[Key]) -> bool {
        keys.iter()
            .all(|k| self.0.get(k).is_some_and(|v| !v.is_empty()))
    }

    /// True when at least one key is present with a non-empty value.
    pub fn has_any(&self, keys: &[Key]) -> bool {
        keys.iter()
            .any(|k| self.0.get(k).is_some_and(|v| !v.is_empty()))
    }

    /// True when the value at `key` is one of `codes`.
    pub fn has_codes(&self, key: &Key, codes: &[Code]) -> bool {
        self.0.get(key).is_some_and(|v| v.is_in(codes))
    }

    pub fn set(&mut self, key: Key, code: impl Into<Code>) {
        self.0.insert(key, code.into());
    }

    /// Keep the current value if it is one of `codes`, otherwise set the first.
    pub fn set_one_of(&mut self, key: Key, codes: &[Code]) {
        if self.has_codes(&key, codes) {
            return;
        }
        if let Some(first) = codes.first() {
            self.0.insert(key, first.clone());
        }
    }

    pub fn delete(&mut self, key: &Key) -> Option<Code> {
        self.0.remove(key)
    }

    /// Copy entries from `other`, replacing on conflict.
    pub fn merge(&mut self, other: &Extensions) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Drop entries with empty values.
    pub fn normalize(&mut self) {
        self.0.retain(|_, v| !v.is_empty());
    }

    /// Rename legacy keys. An entry already present under the new key is
    /// never overwritten; the legacy entry is dropped either way.
    pub fn migrate(&mut self, renames: &[(Key, Key)]) {
        for (old, new) in renames {
            if let Some(value) = self.0.remove(old) {
                self.0.entry(new.clone()).or_insert(value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Code)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.0.keys()
    }
}

impl<K: Into<Key>, C: Into<Code>> FromIterator<(K, C)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Extensions(iter.into_iter().map(|(k, c)| (k.into(), c.into())).collect())
    }
}

/// Declarative checks on an extension map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtRule {
    /// Each key must be present with a value.
    Require(Vec<Key>),
    /// Either every key is present, or none is.
    RequireAllOrNone(Vec<Key>),
    /// If present, the value at the key must be one of the codes.
    HasCodes(Key, Vec<Code>),
    /// If present, the value at the key must not be one of the codes.
    ExcludeCodes(Key, Vec<Code>),
}

impl ExtRule {
    pub fn require(keys: &[Key]) -> Self {
        ExtRule::Require(keys.to_vec())
    }

    pub fn require_all_or_none(keys: &[Key]) -> Self {
        ExtRule::RequireAllOrNone(keys.to_vec())
    }

    pub fn has_codes(key: Key, codes: &[&'static str]) -> Self {
        ExtRule::HasCodes(key, codes.iter().copied().map(Code::from_static).collect())
    }

    pub fn exclude_codes(key: Key, codes: &[&'static str]) -> Self {
        ExtRule::ExcludeCodes(key, codes.iter().copied().map(Code::from_static).collect())
    }

    /// Errors keyed by extension key; empty when the rule holds.
    pub fn check(&self, ext: &Extensions) -> FieldErrors {
        let mut errs = FieldErrors::new();
        match self {
            ExtRule::Require(keys) => {
                for k in keys {
                    if !ext.has(std::slice::from_ref(k)) {
                        errs.add(k.as_str(), "required");
                    }
                }
            }
            ExtRule::RequireAllOrNone(keys) => {
                if ext.has_any(keys) {
                    for k in keys {
                        if !ext.has(std::slice::from_ref(k)) {
                            errs.add(k.as_str(), "required");
                        }
                    }
                }
            }
            ExtRule::HasCodes(key, codes) => {
                if let Some(v) = ext.get(key) {
                    if !v.is_in(codes) {
                        errs.add(key.as_str(), format!("value '{v}' not allowed"));
                    }
                }
            }
            ExtRule::ExcludeCodes(key, codes) => {
                if let Some(v) = ext.get(key) {
                    if v.is_in(codes) {
                        errs.add(key.as_str(), format!("value '{v}' not allowed"));
                    }
                }
            }
        }
        errs
    }
}

/// Check every entry of `ext` against the definitions visible to the
/// document. Keys without a definition are `undefined`; values must be
/// one of the declared codes or match the declared pattern.
pub fn validate_extensions<'a, F>(ext: &Extensions, lookup: F) -> FieldErrors
where
    F: Fn(&Key) -> Option<&'a Definition>,
{
    check_values(ext, lookup, true)
}

/// Like [`validate_extensions`], but keys without a definition pass.
pub fn validate_known_extensions<'a, F>(ext: &Extensions, lookup: F) -> FieldErrors
where
    F: Fn(&Key) -> Option<&'a Definition>,
{
    check_values(ext, lookup, false)
}

fn check_values<'a, F>(ext: &Extensions, lookup: F, undefined: bool) -> FieldErrors
where
    F: Fn(&Key) -> Option<&'a Definition>,
{
    let mut errs = FieldErrors::new();
    for (key, value) in ext.iter() {
        match lookup(key) {
            None if undefined => errs.add(key.as_str(), "undefined"),
            None => {}
            Some(def) => {
                if value.is_empty() {
                    errs.add(key.as_str(), "cannot be blank");
                } else if let Err(msg) = def.validate_value(value) {
                    errs.add(key.as_str(), msg);
                }
            }
        }
    }
    errs
}
