//! Common basic components: keys, codes, localized text, definitions and notes.
//!
//! These are the building blocks every regime, addon and catalogue is
//! declared with.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum length of a [`Key`] or [`Code`].
pub const MAX_LENGTH: usize = 64;

/// Separator used to compose keys, e.g. `"standard+reduced"`.
pub const KEY_SEPARATOR: char = '+';

const CODE_SEPARATORS: &str = r"\.\-:/,_ ";

static KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^[a-z](?:[a-z0-9]|-[a-z0-9])*(?:\+[a-z0-9]+(?:-[a-z0-9]+)*)*$")
});
static CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        "^[{CODE_SEPARATORS}]?[A-Za-z0-9]+([{CODE_SEPARATORS}]?[A-Za-z0-9]+)*$"
    ))
});
static CODE_SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("([{CODE_SEPARATORS}])[^A-Za-z0-9]+")));
static CODE_INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("[^A-Za-z0-9{CODE_SEPARATORS}]+")));

/// Compile a builtin pattern. Builtin patterns are part of the crate's
/// static data, so a malformed one is a programming error.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid builtin pattern {pattern:?}: {e}"))
}

// ── Key ─────────────────────────────────────────────────────────────────────

/// Short lower-kebab identifier used for rates, tags, scenarios and
/// extension names.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Cow<'static, str>);

impl Key {
    pub const fn from_static(s: &'static str) -> Self {
        Key(Cow::Borrowed(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compose with a sub-key: `standard` with `reduced` is `standard+reduced`.
    pub fn with(&self, sub: &Key) -> Key {
        Key(Cow::Owned(format!("{}{KEY_SEPARATOR}{}", self.0, sub.0)))
    }

    /// True if any `+`-separated segment equals `sub`.
    pub fn has(&self, sub: &Key) -> bool {
        self.0.split(KEY_SEPARATOR).any(|s| s == sub.as_str())
    }

    /// True if the first `+`-separated segment equals `prefix`.
    pub fn has_prefix(&self, prefix: &Key) -> bool {
        self.0.split(KEY_SEPARATOR).next() == Some(prefix.as_str())
    }

    /// Drop the last `+` segment: `a+b+c` becomes `a+b`, `a` becomes empty.
    pub fn pop(&self) -> Key {
        match self.0.rfind(KEY_SEPARATOR) {
            Some(idx) => Key(Cow::Owned(self.0[..idx].to_string())),
            None => Key::default(),
        }
    }

    pub fn is_in(&self, set: &[Key]) -> bool {
        set.iter().any(|k| k == self)
    }

    /// Check syntax and length.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("cannot be blank");
        }
        if self.0.len() > MAX_LENGTH {
            return Err("the length must be no more than 64");
        }
        if !KEY_REGEX.is_match(&self.0) {
            return Err("must be in a valid format");
        }
        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(Cow::Owned(s.to_string()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(Cow::Owned(s))
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ── Code ────────────────────────────────────────────────────────────────────

/// Short free-form identifier: extension values, tax identity codes,
/// category codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(Cow<'static, str>);

impl Code {
    pub const fn from_static(s: &'static str) -> Self {
        Code(Cow::Borrowed(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_in(&self, set: &[Code]) -> bool {
        set.iter().any(|c| c == self)
    }

    /// Trim, collapse runs of separators and drop characters that may not
    /// appear in a code.
    pub fn normalize(&self) -> Code {
        let code = CODE_INVALID_CHARS.replace_all(&self.0, "");
        let code = CODE_SEPARATOR_RUN.replace_all(&code, "$1");
        Code::from(code.trim().to_string())
    }

    /// Upper-case and keep only `[A-Z0-9]`.
    pub fn normalize_alphanumerical(&self) -> Code {
        let code: String = self
            .normalize()
            .as_str()
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            .collect();
        Code::from(code)
    }

    /// Keep only ASCII digits.
    pub fn normalize_numerical(&self) -> Code {
        let code: String = self
            .normalize()
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        Code::from(code)
    }

    /// Check syntax and length.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("cannot be blank");
        }
        if self.0.len() > MAX_LENGTH {
            return Err("the length must be no more than 64");
        }
        if !CODE_REGEX.is_match(&self.0) {
            return Err("must be in a valid format");
        }
        Ok(())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Code(Cow::Owned(s.to_string()))
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Code(Cow::Owned(s))
    }
}

impl PartialEq<str> for Code {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Code {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ── Text ────────────────────────────────────────────────────────────────────

/// Localized text keyed by language code (`"en"`, `"es"`, `"ro"`, …).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Text(BTreeMap<String, String>);

impl Text {
    /// Language used when a requested translation is missing.
    pub const DEFAULT_LANG: &'static str = "en";

    pub fn en(s: impl Into<String>) -> Self {
        Text::default().with(Self::DEFAULT_LANG, s)
    }

    pub fn with(mut self, lang: &str, s: impl Into<String>) -> Self {
        self.0.insert(lang.to_string(), s.into());
        self
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// Text in `lang`, falling back to English, then to any translation.
    pub fn in_lang(&self, lang: &str) -> &str {
        self.get(lang)
            .or_else(|| self.get(Self::DEFAULT_LANG))
            .or_else(|| self.0.values().next().map(String::as_str))
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::en(s)
    }
}

/// Reference to the document a definition was taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: Text,
    pub url: String,
}

// ── Pattern ─────────────────────────────────────────────────────────────────

/// A compiled regular expression that serializes as its source string.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Pattern)
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pattern::new(&s).map_err(serde::de::Error::custom)
    }
}

// ── Definition ──────────────────────────────────────────────────────────────

/// Describes an extension, identity type, tag or one of their enumerated
/// values. Exactly one of `key` or `code` identifies it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    pub name: Text,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Text>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Definition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub map: BTreeMap<Key, Code>,
}

impl Definition {
    pub fn with_key(key: impl Into<Key>, name: impl Into<Text>) -> Self {
        Definition {
            key: Some(key.into()),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_code(code: impl Into<Code>, name: impl Into<Text>) -> Self {
        Definition {
            code: Some(code.into()),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn desc(mut self, desc: impl Into<Text>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn values(mut self, values: Vec<Definition>) -> Self {
        self.values = values;
        self
    }

    /// Attach a builtin pattern. Panics if the pattern does not compile.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(Pattern(compile(pattern)));
        self
    }

    pub fn source(mut self, title: &str, url: &str) -> Self {
        self.sources.push(Source {
            title: Text::en(title),
            url: url.to_string(),
        });
        self
    }

    pub fn map_entry(mut self, key: impl Into<Key>, code: impl Into<Code>) -> Self {
        self.map.insert(key.into(), code.into());
        self
    }

    pub fn code_def(&self, code: &Code) -> Option<&Definition> {
        self.values.iter().find(|v| v.code.as_ref() == Some(code))
    }

    pub fn key_def(&self, key: &Key) -> Option<&Definition> {
        self.values.iter().find(|v| v.key.as_ref() == Some(key))
    }

    pub fn has_code(&self, code: &Code) -> bool {
        self.code_def(code).is_some()
    }

    pub fn has_key(&self, key: &Key) -> bool {
        self.key_def(key).is_some()
    }

    /// True when the definition declares a pattern and `value` matches it.
    pub fn matches_pattern(&self, value: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(value))
    }

    /// Check a value against the declared values and pattern. Definitions
    /// with neither accept anything.
    pub fn validate_value(&self, value: &Code) -> Result<(), String> {
        if !self.values.is_empty() {
            if self.has_code(value) || self.has_key(&Key::from(value.as_str())) {
                return Ok(());
            }
            return Err(format!("code '{value}' invalid"));
        }
        if self.pattern.is_some() && !self.matches_pattern(value.as_str()) {
            return Err("does not match pattern".into());
        }
        Ok(())
    }
}

/// Find the definition with `key` in a list.
pub fn definition_for_key<'a>(list: &'a [Definition], key: &Key) -> Option<&'a Definition> {
    list.iter().find(|d| d.key.as_ref() == Some(key))
}

/// Find the definition with `code` in a list.
pub fn definition_for_code<'a>(list: &'a [Definition], code: &Code) -> Option<&'a Definition> {
    list.iter().find(|d| d.code.as_ref() == Some(code))
}

// ── Note ────────────────────────────────────────────────────────────────────

pub const NOTE_KEY_GENERAL: Key = Key::from_static("general");
pub const NOTE_KEY_LEGAL: Key = Key::from_static("legal");
pub const NOTE_KEY_REASON: Key = Key::from_static("reason");
pub const NOTE_KEY_PAYMENT: Key = Key::from_static("payment");
pub const NOTE_KEY_GOODS: Key = Key::from_static("goods");
pub const NOTE_KEY_TAX: Key = Key::from_static("tax");

/// Free text attached to a document. `src` identifies notes injected by
/// scenarios so they can be found again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Key>,
    pub text: String,
}

impl Note {
    pub fn new(key: Key, text: impl Into<String>) -> Self {
        Note {
            key: Some(key),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_src(mut self, src: Key) -> Self {
        self.src = Some(src);
        self
    }

    pub fn with_code(mut self, code: impl Into<Code>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Same key, code and source; the text is ignored.
    pub fn same_as(&self, other: &Note) -> bool {
        self.key == other.key && self.code == other.code && self.src == other.src
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_composition() {
        let k = Key::from("standard").with(&Key::from("reduced"));
        assert_eq!(k, "standard+reduced");
        assert!(k.has(&Key::from("reduced")));
        assert!(!k.has(&Key::from("reduce")));
        assert!(k.has_prefix(&Key::from("standard")));
        assert!(!k.has_prefix(&Key::from("reduced")));
        assert_eq!(k.pop(), "standard");
        assert!(Key::from("a").pop().is_empty());
    }

    #[test]
    fn key_validation() {
        assert!(Key::from("co-dian-credit-code").validate().is_ok());
        assert!(Key::from("eu-en16931-v2017").validate().is_ok());
        assert!(Key::from("standard+reduced").validate().is_ok());
        assert_eq!(Key::from("").validate(), Err("cannot be blank"));
        assert!(Key::from("Standard").validate().is_err());
        assert!(Key::from("double--dash").validate().is_err());
        assert!(Key::from("trailing-").validate().is_err());
        assert!(Key::from(&*"a".repeat(65)).validate().is_err());
    }

    #[test]
    fn code_validation() {
        assert!(Code::from("VATEX-EU-132").validate().is_ok());
        assert!(Code::from("O-13").validate().is_ok());
        assert!(Code::from("12.345.678-5").validate().is_ok());
        assert!(Code::from("A--B").validate().is_err());
        assert!(Code::from("").validate().is_err());
    }

    #[test]
    fn code_normalizers() {
        assert_eq!(Code::from("  AB--12 ").normalize(), "AB-12");
        assert_eq!(Code::from("ab*12").normalize(), "ab12");
        assert_eq!(Code::from("é -X").normalize(), "X");
        assert_eq!(Code::from("X -").normalize(), "X");
        assert_eq!(Code::from("es b-123.45").normalize_alphanumerical(), "ESB12345");
        assert_eq!(Code::from("12.345.678-5").normalize_numerical(), "123456785");
    }

    #[test]
    fn text_fallback() {
        let t = Text::en("Simplified invoice").with("ro", "Factură simplificată");
        assert_eq!(t.in_lang("ro"), "Factură simplificată");
        assert_eq!(t.in_lang("de"), "Simplified invoice");
    }

    #[test]
    fn definition_values_and_pattern() {
        let def = Definition::with_key("co-dian-credit-code", "Credit Code").values(vec![
            Definition::with_code("1", "Partial refund"),
            Definition::with_code("2", "Revoked"),
        ]);
        assert!(def.validate_value(&Code::from("2")).is_ok());
        assert_eq!(
            def.validate_value(&Code::from("9")),
            Err("code '9' invalid".to_string())
        );

        let def = Definition::with_key("co-dian-municipality", "Municipality").pattern(r"^\d{5}$");
        assert!(def.validate_value(&Code::from("11001")).is_ok());
        assert_eq!(
            def.validate_value(&Code::from("110")),
            Err("does not match pattern".to_string())
        );
    }

    #[test]
    fn pattern_serde_roundtrip() {
        let def = Definition::with_key("x-code", "X").pattern(r"^\d{2}$");
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains(r#""pattern":"^\\d{2}$""#));
        let back: Definition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn note_same_as_ignores_text() {
        let a = Note::new(NOTE_KEY_LEGAL, "one").with_src(Key::from("simplified"));
        let b = Note::new(NOTE_KEY_LEGAL, "two").with_src(Key::from("simplified"));
        let c = Note::new(NOTE_KEY_LEGAL, "one").with_src(Key::from("export"));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }
}
