//! # fiskal
//!
//! Rule engine for fiscal documents. Country tax regimes and opt-in
//! addons declare categories with dated rates, extension codes, tags,
//! scenarios and correction rules; the engine applies them to invoices
//! and reports every problem as a field-path error tree.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fiskal::core::*;
//! use fiskal::tax::{KEY_STANDARD, TAG_SIMPLIFIED};
//! use rust_decimal_macros::dec;
//!
//! let mut invoice = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())
//!     .code("FS-001")
//!     .tag(TAG_SIMPLIFIED)
//!     .supplier(PartyBuilder::new("Furnizor SRL").tax_id("RO", "18547290").build())
//!     .line(LineBuilder::new("Servicii", dec!(1), dec!(100))
//!         .tax(Combo::new("VAT").with_key(KEY_STANDARD))
//!         .build())
//!     .build();
//!
//! fiskal::calculate(&mut invoice).unwrap();
//! fiskal::validate(&invoice).unwrap();
//!
//! let totals = invoice.totals.unwrap();
//! assert_eq!(totals.tax, dec!(21.00));
//! assert_eq!(invoice.notes[0].text, "Factură simplificată / Simplified invoice.");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` | Document model, definitions, registry and engine |
//! | `regimes` (default) | Builtin country regimes |
//! | `addons` (default) | Builtin addons (DIAN, NF-e, NFS-e, IT ticket, EN 16931, XRechnung) |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod tax;

#[cfg(feature = "core")]
pub mod engine;

#[cfg(feature = "regimes")]
pub mod regimes;

#[cfg(feature = "addons")]
pub mod addons;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;

#[cfg(feature = "core")]
pub use crate::engine::{calculate, validate};
