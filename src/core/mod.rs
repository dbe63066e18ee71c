//! Core document model and shared building blocks.
//!
//! Keys, codes and definitions, extension maps, the error tree, currencies,
//! countries, the invoice model with its builders, and totals.

pub(crate) mod builder;
pub mod catalogues;
pub mod cbc;
pub mod countries;
pub mod currencies;
pub(crate) mod error;
pub mod extensions;
pub mod totals;
pub(crate) mod types;

pub use builder::*;
pub use catalogues::Catalogue;
pub use cbc::{Code, Definition, Key, Note, Text};
pub use countries::is_known_country_code;
pub use currencies::{ExchangeRate, currency_def, is_known_currency_code};
pub use error::*;
pub use extensions::{ExtRule, Extensions};
pub use totals::round_half_up;
pub use types::*;
