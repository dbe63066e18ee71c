use crate::core::cbc::Key;

/// What a corrective document of a schema must carry: the allowed types,
/// extensions expected on each preceding reference, whether a reason is
/// mandatory, and the stamps the corrected document must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionDefinition {
    pub schema: String,
    pub types: Vec<Key>,
    pub extensions: Vec<Key>,
    pub reason_required: bool,
    pub stamps: Vec<Key>,
    /// Copy tax details from the corrected document.
    pub copy_tax: bool,
}

impl CorrectionDefinition {
    pub fn new(schema: &str) -> Self {
        CorrectionDefinition {
            schema: schema.to_string(),
            ..Default::default()
        }
    }

    pub fn types(mut self, types: &[Key]) -> Self {
        self.types = types.to_vec();
        self
    }

    pub fn extensions(mut self, keys: &[Key]) -> Self {
        self.extensions = keys.to_vec();
        self
    }

    pub fn reason_required(mut self) -> Self {
        self.reason_required = true;
        self
    }

    pub fn stamps(mut self, keys: &[Key]) -> Self {
        self.stamps = keys.to_vec();
        self
    }

    pub fn copy_tax(mut self) -> Self {
        self.copy_tax = true;
        self
    }

    pub fn has_type(&self, key: &Key) -> bool {
        key.is_in(&self.types)
    }

    /// Union of two definitions for the same schema; lists are
    /// deduplicated and flags OR-ed.
    pub fn merge(&self, other: &CorrectionDefinition) -> CorrectionDefinition {
        fn union(a: &[Key], b: &[Key]) -> Vec<Key> {
            let mut out = a.to_vec();
            for k in b {
                if !k.is_in(&out) {
                    out.push(k.clone());
                }
            }
            out
        }
        CorrectionDefinition {
            schema: self.schema.clone(),
            types: union(&self.types, &other.types),
            extensions: union(&self.extensions, &other.extensions),
            reason_required: self.reason_required || other.reason_required,
            stamps: union(&self.stamps, &other.stamps),
            copy_tax: self.copy_tax || other.copy_tax,
        }
    }
}

/// First definition for `schema`.
pub fn correction_for<'a>(
    defs: &'a [CorrectionDefinition],
    schema: &str,
) -> Option<&'a CorrectionDefinition> {
    defs.iter().find(|d| d.schema == schema)
}
