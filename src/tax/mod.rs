//! Tax definitions: categories and rates, tags, scenarios, corrections,
//! regime and addon definitions, and the registry that holds them.

mod addon;
mod category;
mod correction;
pub mod identity;
mod regime;
mod registry;
mod scenario;
mod tags;

pub use addon::AddonDef;
pub use category::{CategoryDef, RateDef, RateLookup, RateValueDef, category_def_for};
pub use correction::{CorrectionDefinition, correction_for};
pub use regime::{Normalizer, RegimeDef, TaxCodeNormalizer, Validator};
pub use registry::{
    Registry, RegistryBuilder, addon_for_key, extension_for_key, regime_def_for, registry,
};
pub use scenario::{Scenario, ScenarioSet, ScenarioSummary, scenario_set_for};
pub use tags::{TagSet, Tags, default_invoice_tags, tag_set_for};

use crate::core::cbc::{Code, Key};

// Categories
pub const CATEGORY_VAT: Code = Code::from_static("VAT");
pub const CATEGORY_GST: Code = Code::from_static("GST");

// Combo keys
pub const KEY_STANDARD: Key = Key::from_static("standard");
pub const KEY_ZERO: Key = Key::from_static("zero");
pub const KEY_EXEMPT: Key = Key::from_static("exempt");
pub const KEY_REVERSE_CHARGE: Key = Key::from_static("reverse-charge");
pub const KEY_EXPORT: Key = Key::from_static("export");
pub const KEY_INTRA_COMMUNITY: Key = Key::from_static("intra-community");
pub const KEY_OUTSIDE_SCOPE: Key = Key::from_static("outside-scope");

// Rate levels
pub const RATE_GENERAL: Key = Key::from_static("general");
pub const RATE_INTERMEDIATE: Key = Key::from_static("intermediate");
pub const RATE_REDUCED: Key = Key::from_static("reduced");
pub const RATE_SUPER_REDUCED: Key = Key::from_static("super-reduced");
pub const RATE_ZERO: Key = Key::from_static("zero");
pub const RATE_EXEMPT: Key = Key::from_static("exempt");

// Invoice tags
pub const TAG_SIMPLIFIED: Key = Key::from_static("simplified");
pub const TAG_REVERSE_CHARGE: Key = Key::from_static("reverse-charge");
pub const TAG_SELF_BILLED: Key = Key::from_static("self-billed");
pub const TAG_CUSTOMER_RATES: Key = Key::from_static("customer-rates");
pub const TAG_PARTIAL: Key = Key::from_static("partial");
pub const TAG_BYPASS: Key = Key::from_static("bypass");
pub const TAG_EXPORT: Key = Key::from_static("export");

/// Keys accepted by VAT-like categories.
pub fn vat_keys() -> Vec<Key> {
    vec![
        KEY_STANDARD,
        KEY_ZERO,
        KEY_EXEMPT,
        KEY_REVERSE_CHARGE,
        KEY_EXPORT,
        KEY_INTRA_COMMUNITY,
        KEY_OUTSIDE_SCOPE,
    ]
}
