use serde::{Deserialize, Serialize};

use crate::core::cbc::{Definition, Key, Text};
use crate::core::types::SCHEMA_INVOICE;

use super::{
    TAG_BYPASS, TAG_CUSTOMER_RATES, TAG_PARTIAL, TAG_REVERSE_CHARGE, TAG_SELF_BILLED,
    TAG_SIMPLIFIED,
};

/// Flags set on a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Key>);

impl Tags {
    pub fn new(tags: &[Key]) -> Self {
        let mut t = Tags::default();
        for k in tags {
            t.push(k.clone());
        }
        t
    }

    /// True when every key is present. An empty tag list has no tags.
    pub fn has_tags(&self, keys: &[Key]) -> bool {
        !self.0.is_empty() && keys.iter().all(|k| self.0.contains(k))
    }

    /// Add a tag unless already present.
    pub fn push(&mut self, key: Key) {
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    pub fn remove_tags(&mut self, keys: &[Key]) {
        self.0.retain(|t| !t.is_in(keys));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Key] {
        &self.0
    }
}

/// Tags a regime or addon makes available for one document schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    pub schema: String,
    pub list: Vec<Definition>,
}

impl TagSet {
    pub fn new(schema: &str, list: Vec<Definition>) -> Self {
        TagSet {
            schema: schema.to_string(),
            list,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.list.iter().filter_map(|d| d.key.as_ref())
    }

    pub fn has(&self, key: &Key) -> bool {
        self.keys().any(|k| k == key)
    }

    /// Add definitions from `other` whose keys are not already listed.
    /// Sets for different schemas are left alone.
    pub fn merge(&mut self, other: &TagSet) {
        if self.schema != other.schema {
            return;
        }
        for def in &other.list {
            if let Some(k) = &def.key {
                if !self.has(k) {
                    self.list.push(def.clone());
                }
            }
        }
    }
}

/// First tag set for `schema`.
pub fn tag_set_for<'a>(sets: &'a [TagSet], schema: &str) -> Option<&'a TagSet> {
    sets.iter().find(|s| s.schema == schema)
}

/// Tags every invoice accepts, regardless of regime.
pub fn default_invoice_tags() -> TagSet {
    TagSet::new(
        SCHEMA_INVOICE,
        vec![
            Definition::with_key(TAG_SIMPLIFIED, "Simplified Invoice").desc(Text::en(
                "Used for B2C transactions when the client details are not available.",
            )),
            Definition::with_key(TAG_REVERSE_CHARGE, "Reverse Charge")
                .desc("The customer is responsible for accounting the tax."),
            Definition::with_key(TAG_SELF_BILLED, "Self-billed")
                .desc("Issued by the customer on behalf of the supplier."),
            Definition::with_key(TAG_CUSTOMER_RATES, "Customer rates")
                .desc("Taxes are calculated using the customer's country rates."),
            Definition::with_key(TAG_PARTIAL, "Partial")
                .desc("Covers only part of the goods or services of a larger transaction."),
            Definition::with_key(TAG_BYPASS, "Bypass")
                .desc("Skip formal requirements of the target format."),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TAG_EXPORT;

    #[test]
    fn has_tags_requires_all() {
        let tags = Tags::new(&[TAG_SIMPLIFIED, TAG_EXPORT]);
        assert!(tags.has_tags(&[TAG_SIMPLIFIED]));
        assert!(tags.has_tags(&[TAG_SIMPLIFIED, TAG_EXPORT]));
        assert!(!tags.has_tags(&[TAG_REVERSE_CHARGE]));
        assert!(!Tags::default().has_tags(&[]));
    }

    #[test]
    fn push_and_remove() {
        let mut tags = Tags::new(&[TAG_SIMPLIFIED, TAG_SIMPLIFIED]);
        assert_eq!(tags.as_slice().len(), 1);
        tags.push(TAG_EXPORT);
        tags.remove_tags(&[TAG_SIMPLIFIED]);
        assert_eq!(tags.as_slice(), &[TAG_EXPORT]);
    }

    #[test]
    fn merge_skips_known_keys_and_other_schemas() {
        let mut set = default_invoice_tags();
        let before = set.list.len();
        set.merge(&TagSet::new(
            SCHEMA_INVOICE,
            vec![
                Definition::with_key(TAG_SIMPLIFIED, "Dup"),
                Definition::with_key(TAG_EXPORT, "Export"),
            ],
        ));
        assert_eq!(set.list.len(), before + 1);
        set.merge(&TagSet::new("bill/payment", vec![Definition::with_key("x", "X")]));
        assert_eq!(set.list.len(), before + 1);
        assert!(set.has(&TAG_EXPORT));
    }
}
