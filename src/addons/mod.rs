//! Builtin addons: rule packs for specific e-invoicing formats, enabled per
//! document by key.
//!
//! ```
//! use fiskal::addons;
//!
//! let keys: Vec<_> = addons::all().into_iter().map(|a| a.key.to_string()).collect();
//! assert!(keys.contains(&"de-xrechnung-v3".to_string()));
//! ```

use crate::tax::AddonDef;

pub mod br_nfe;
pub mod br_nfse;
pub mod co_dian;
pub mod de_xrechnung;
pub mod eu_en16931;
pub mod it_ticket;

/// Every builtin addon. Dependencies come before the addons requiring
/// them.
pub fn all() -> Vec<AddonDef> {
    vec![
        br_nfe::new(),
        br_nfse::new(),
        co_dian::new(),
        eu_en16931::new(),
        de_xrechnung::new(),
        it_ticket::new(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_versioned() {
        let defs = all();
        for (i, a) in defs.iter().enumerate() {
            assert!(
                defs[i + 1..].iter().all(|b| b.key != a.key),
                "duplicate {}",
                a.key
            );
            assert!(a.key.as_str().contains("-v"), "{}", a.key);
        }
    }

    #[test]
    fn requirements_are_registered() {
        let defs = all();
        for a in &defs {
            for req in &a.requires {
                assert!(defs.iter().any(|b| b.key == *req), "{} requires {req}", a.key);
            }
        }
    }
}
