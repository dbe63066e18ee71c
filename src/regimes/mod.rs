//! Builtin country tax regimes.
//!
//! Each module exposes `new() -> RegimeDef` along with the tax identity
//! checks it registers, so they can be used on their own:
//!
//! ```
//! use fiskal::regimes::chile;
//!
//! assert!(chile::check_rut("77668208K").is_ok());
//! assert_eq!(chile::check_rut("123456780"), Err("invalid RUT check digit"));
//! ```

use chrono::NaiveDate;

use crate::core::error::FieldErrors;
use crate::core::types::Party;
use crate::tax::RegimeDef;

pub mod australia;
pub mod belgium;
pub mod brazil;
pub mod chile;
pub mod colombia;
pub mod finland;
pub mod germany;
pub mod india;
pub mod italy;
pub mod japan;
pub mod panama;
pub mod romania;
pub mod turkey;

/// Every builtin regime, in country code order.
pub fn all() -> Vec<RegimeDef> {
    vec![
        australia::new(),
        belgium::new(),
        brazil::new(),
        chile::new(),
        colombia::new(),
        finland::new(),
        germany::new(),
        india::new(),
        italy::new(),
        japan::new(),
        panama::new(),
        romania::new(),
        turkey::new(),
    ]
}

/// Calendar date for builtin rate tables. Panics on an impossible date.
pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(y, m, d) {
        Some(date) => date,
        None => panic!("invalid builtin date {y}-{m}-{d}"),
    }
}

/// The party must carry a tax identity with a code.
pub(crate) fn require_tax_code(party: &Party) -> FieldErrors {
    match &party.tax_id {
        None => FieldErrors::single("tax_id", "cannot be blank"),
        Some(tid) if tid.code.is_empty() => {
            let mut errs = FieldErrors::new();
            errs.nest("tax_id", FieldErrors::single("code", "cannot be blank"));
            errs
        }
        Some(_) => FieldErrors::new(),
    }
}
