//! Scenarios: declarative rules that, for a matching document type, tags
//! and extension value, contribute notes, codes, extensions and required
//! stamps.

use std::collections::BTreeMap;

use crate::core::cbc::{Code, Key, Note, Text};
use crate::core::extensions::Extensions;

use super::Tags;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub name: Text,
    pub desc: Option<Text>,
    /// Document types matched; empty matches any.
    pub types: Vec<Key>,
    /// Tags that must all be present; empty matches any.
    pub tags: Vec<Key>,
    /// Extension that must hold `ext_code` on the document.
    pub ext_key: Option<Key>,
    pub ext_code: Option<Code>,
    pub note: Option<Note>,
    pub codes: BTreeMap<Key, Code>,
    pub ext: Extensions,
    /// Stamps the document must carry once the scenario applies.
    pub stamps: Vec<Key>,
}

impl Scenario {
    pub fn new(name: impl Into<Text>) -> Self {
        Scenario {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn types(mut self, types: &[Key]) -> Self {
        self.types = types.to_vec();
        self
    }

    pub fn tags(mut self, tags: &[Key]) -> Self {
        self.tags = tags.to_vec();
        self
    }

    pub fn when_ext(mut self, key: Key, code: &'static str) -> Self {
        self.ext_key = Some(key);
        self.ext_code = Some(Code::from_static(code));
        self
    }

    pub fn note(mut self, note: Note) -> Self {
        self.note = Some(note);
        self
    }

    pub fn code(mut self, key: Key, code: &'static str) -> Self {
        self.codes.insert(key, Code::from_static(code));
        self
    }

    pub fn ext(mut self, key: Key, code: &'static str) -> Self {
        self.ext.set(key, Code::from_static(code));
        self
    }

    pub fn stamp(mut self, key: Key) -> Self {
        self.stamps.push(key);
        self
    }

    /// True when the document's type, tags and extensions satisfy every
    /// filter the scenario declares.
    pub fn matches(&self, doc_type: &Key, tags: &Tags, ext: Option<&Extensions>) -> bool {
        if !self.types.is_empty() && !doc_type.is_in(&self.types) {
            return false;
        }
        if !self.tags.is_empty() && !tags.has_tags(&self.tags) {
            return false;
        }
        if let Some(key) = &self.ext_key {
            let found = ext.and_then(|e| e.get(key));
            match (&self.ext_code, found) {
                (Some(want), Some(got)) if want == got => {}
                (None, Some(_)) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Scenarios for one document schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioSet {
    pub schema: String,
    pub list: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn new(schema: &str, list: Vec<Scenario>) -> Self {
        ScenarioSet {
            schema: schema.to_string(),
            list,
        }
    }

    /// Fold every matching scenario, in declaration order, into a summary.
    pub fn summary_for(
        &self,
        doc_type: &Key,
        tags: &Tags,
        ext: Option<&Extensions>,
    ) -> ScenarioSummary {
        let mut summary = ScenarioSummary::default();
        for sc in self.list.iter().filter(|s| s.matches(doc_type, tags, ext)) {
            summary.absorb(sc);
        }
        summary
    }
}

/// First set declared for `schema`.
pub fn scenario_set_for<'a>(sets: &'a [ScenarioSet], schema: &str) -> Option<&'a ScenarioSet> {
    sets.iter().find(|s| s.schema == schema)
}

/// Combined outcome of the scenarios that apply to a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioSummary {
    pub notes: Vec<Note>,
    pub codes: BTreeMap<Key, Code>,
    pub ext: Extensions,
    pub stamps: Vec<Key>,
}

impl ScenarioSummary {
    fn absorb(&mut self, sc: &Scenario) {
        if let Some(note) = &sc.note {
            self.push_note(note.clone());
        }
        for (k, v) in &sc.codes {
            self.codes.insert(k.clone(), v.clone());
        }
        self.ext.merge(&sc.ext);
        for s in &sc.stamps {
            if !s.is_in(&self.stamps) {
                self.stamps.push(s.clone());
            }
        }
    }

    /// A later note with the same key, code and source replaces the earlier one.
    fn push_note(&mut self, note: Note) {
        match self.notes.iter_mut().find(|n| n.same_as(&note)) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
    }

    /// Fold a later summary into this one.
    pub fn merge(&mut self, other: ScenarioSummary) {
        for note in other.notes {
            self.push_note(note);
        }
        self.codes.extend(other.codes);
        self.ext.merge(&other.ext);
        for s in other.stamps {
            if !s.is_in(&self.stamps) {
                self.stamps.push(s);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.codes.is_empty() && self.ext.is_empty() && self.stamps.is_empty()
    }

    /// Place the summary's notes on `notes`: a note matching an existing
    /// one by key, code and source replaces it, others are appended.
    pub fn apply_notes(&self, notes: &mut Vec<Note>) {
        for note in &self.notes {
            match notes.iter_mut().find(|n| n.same_as(note)) {
                Some(existing) => *existing = note.clone(),
                None => notes.push(note.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cbc::NOTE_KEY_LEGAL;
    use crate::core::types::{INVOICE_TYPE_CREDIT_NOTE, INVOICE_TYPE_STANDARD, SCHEMA_INVOICE};
    use crate::tax::{TAG_EXPORT, TAG_REVERSE_CHARGE, TAG_SIMPLIFIED};

    fn set() -> ScenarioSet {
        ScenarioSet::new(
            SCHEMA_INVOICE,
            vec![
                Scenario::new("Simplified").tags(&[TAG_SIMPLIFIED]).note(
                    Note::new(NOTE_KEY_LEGAL, "Simplified invoice.").with_src(TAG_SIMPLIFIED),
                ),
                Scenario::new("Reverse charge")
                    .tags(&[TAG_REVERSE_CHARGE])
                    .note(Note::new(NOTE_KEY_LEGAL, "Reverse charge.").with_src(TAG_REVERSE_CHARGE))
                    .ext(Key::from("x-doc"), "RC"),
                Scenario::new("Credit").types(&[INVOICE_TYPE_CREDIT_NOTE]).code(Key::from("x-type"), "381"),
                Scenario::new("Exported credit")
                    .types(&[INVOICE_TYPE_CREDIT_NOTE])
                    .tags(&[TAG_EXPORT])
                    .code(Key::from("x-type"), "396"),
                Scenario::new("Flagged")
                    .when_ext(Key::from("x-flag"), "1")
                    .stamp(Key::from("x-stamp")),
            ],
        )
    }

    #[test]
    fn matching_by_tags_and_type() {
        let s = set();
        let sum = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::new(&[TAG_SIMPLIFIED]), None);
        assert_eq!(sum.notes.len(), 1);
        assert_eq!(sum.notes[0].text, "Simplified invoice.");
        assert!(sum.codes.is_empty());

        let sum = s.summary_for(&INVOICE_TYPE_CREDIT_NOTE, &Tags::new(&[TAG_EXPORT]), None);
        assert_eq!(sum.codes.get(&Key::from("x-type")), Some(&Code::from("396")));
    }

    #[test]
    fn matching_by_extension() {
        let s = set();
        let flagged: Extensions = [("x-flag", "1")].into_iter().collect();
        let other: Extensions = [("x-flag", "2")].into_iter().collect();
        let sum = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::default(), Some(&flagged));
        assert_eq!(sum.stamps, vec![Key::from("x-stamp")]);
        let sum = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::default(), Some(&other));
        assert!(sum.is_empty());
    }

    #[test]
    fn apply_notes_replaces_by_source() {
        let s = set();
        let sum = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::new(&[TAG_SIMPLIFIED]), None);
        let mut notes = vec![
            Note::new(NOTE_KEY_LEGAL, "stale").with_src(TAG_SIMPLIFIED),
            Note::new(NOTE_KEY_LEGAL, "user note"),
        ];
        sum.apply_notes(&mut notes);
        sum.apply_notes(&mut notes);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "Simplified invoice.");
        assert_eq!(notes[1].text, "user note");
    }

    #[test]
    fn merge_is_additive() {
        let s = set();
        let mut a = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::new(&[TAG_SIMPLIFIED]), None);
        let b = s.summary_for(&INVOICE_TYPE_STANDARD, &Tags::new(&[TAG_REVERSE_CHARGE]), None);
        a.merge(b);
        assert_eq!(a.notes.len(), 2);
        assert_eq!(a.ext.get(&Key::from("x-doc")), Some(&Code::from("RC")));
    }
}
