//! Calculation and validation entry points.
//!
//! [`calculate`] normalizes a document in place, applies the scenarios of
//! its regime and addons, resolves tax percentages for the issue date and
//! recomputes totals. [`validate`] checks a document and returns every
//! failure as one [`FieldErrors`](crate::core::FieldErrors) tree.
//!
//! ```
//! use fiskal::core::TaxIdentity;
//!
//! let tid = TaxIdentity::new("BR", "05104582000170");
//! assert!(fiskal::engine::validate(&tid).is_ok());
//!
//! let tid = TaxIdentity::new("BR", "05104582000171");
//! let err = fiskal::engine::validate(&tid).unwrap_err();
//! assert_eq!(err.to_string(), "code: verification digit mismatch.");
//! ```

mod document;
mod rules;
mod ruleset;
mod walk;

pub use document::{Document, DocumentMut};

use tracing::{debug, info_span, trace};

use crate::core::error::{FieldErrors, FiscalError};
use crate::core::totals::{CategoryRole, calculate_totals};
use crate::core::types::{Combo, Invoice, InvoiceTax, SCHEMA_INVOICE};
use crate::tax::{Registry, ScenarioSummary, registry};

use ruleset::Ruleset;

/// Normalize, apply scenarios and compute totals using the builtin registry.
pub fn calculate<'a>(doc: impl Into<DocumentMut<'a>>) -> Result<(), FiscalError> {
    registry().calculate(doc)
}

/// Validate using the builtin registry.
pub fn validate<'a>(doc: impl Into<Document<'a>>) -> Result<(), FiscalError> {
    registry().validate(doc)
}

/// Scenarios that apply to an invoice, including codes meant for format
/// converters.
pub fn scenario_summary(inv: &Invoice) -> ScenarioSummary {
    registry().scenario_summary(inv)
}

impl Registry {
    pub fn calculate<'a>(&self, doc: impl Into<DocumentMut<'a>>) -> Result<(), FiscalError> {
        match doc.into() {
            DocumentMut::Invoice(inv) => self.calculate_invoice(inv),
            other => {
                let rs = Ruleset::for_country(self, other.as_document().country());
                walk::normalize_node(&rs, other);
                Ok(())
            }
        }
    }

    pub fn validate<'a>(&self, doc: impl Into<Document<'a>>) -> Result<(), FiscalError> {
        let errs = match doc.into() {
            Document::Invoice(inv) => {
                let rs = Ruleset::for_invoice(self, inv);
                let _span = info_span!("validate", regime = rs.regime.map(|r| r.code())).entered();
                walk::validate_invoice(&rs, inv)
            }
            other => walk::validate_node(&Ruleset::for_country(self, other.country()), other),
        };
        if errs.is_empty() {
            return Ok(());
        }
        debug!(errors = errs.flatten().len(), "validation failed");
        Err(FiscalError::Validation(errs))
    }

    pub fn scenario_summary(&self, inv: &Invoice) -> ScenarioSummary {
        Ruleset::for_invoice(self, inv).scenario_summary(
            SCHEMA_INVOICE,
            &inv.invoice_type,
            &inv.tags,
            inv.tax_ext(),
        )
    }

    fn calculate_invoice(&self, inv: &mut Invoice) -> Result<(), FiscalError> {
        let rs = Ruleset::for_invoice(self, inv);
        let _span = info_span!("calculate", regime = rs.regime.map(|r| r.code())).entered();

        walk::normalize_invoice(&rs, inv);
        apply_scenarios(&rs, inv);
        let errs = resolve_rates(&rs, inv);
        calculate_totals(inv, |code| match rs.category_def(code) {
            Some(c) if c.retained => CategoryRole::Retained,
            Some(c) if c.informative => CategoryRole::Informative,
            _ => CategoryRole::Charged,
        })?;
        debug!(lines = inv.lines.len(), "calculated invoice");
        errs.into_result().map_err(FiscalError::from)
    }
}

/// Merge scenario extensions into the tax block and place scenario notes,
/// replacing any note previously injected from the same source.
fn apply_scenarios(rs: &Ruleset<'_>, inv: &mut Invoice) {
    let summary = rs.scenario_summary(SCHEMA_INVOICE, &inv.invoice_type, &inv.tags, inv.tax_ext());
    if !summary.ext.is_empty() {
        inv.tax
            .get_or_insert_with(InvoiceTax::default)
            .ext
            .merge(&summary.ext);
    }
    for note in &summary.notes {
        trace!(src = ?note.src, key = ?note.key, "scenario note");
    }
    summary.apply_notes(&mut inv.notes);
}

/// Fill in percentages from the regime's rate history. Failures are
/// reported at the combo's path.
fn resolve_rates(rs: &Ruleset<'_>, inv: &mut Invoice) -> FieldErrors {
    fn resolve(rs: &Ruleset<'_>, combos: &mut [Combo]) -> FieldErrors {
        let mut errs = FieldErrors::new();
        for (i, combo) in combos.iter_mut().enumerate() {
            if combo.category.is_empty() {
                continue;
            }
            match rules::resolve_combo(rs, combo) {
                Ok(Some(found)) => {
                    combo.percent = found.percent;
                    combo.surcharge = found.surcharge;
                }
                Ok(None) => {}
                Err((field, msg)) => errs.nest(i.to_string(), FieldErrors::single(field, msg)),
            }
        }
        let mut out = FieldErrors::new();
        out.nest("taxes", errs);
        out
    }

    let mut errs = FieldErrors::new();
    let mut lines = FieldErrors::new();
    for (i, line) in inv.lines.iter_mut().enumerate() {
        lines.nest(i.to_string(), resolve(rs, &mut line.taxes));
    }
    errs.nest("lines", lines);
    let mut charges = FieldErrors::new();
    for (i, c) in inv.charges.iter_mut().enumerate() {
        charges.nest(i.to_string(), resolve(rs, &mut c.taxes));
    }
    errs.nest("charges", charges);
    let mut discounts = FieldErrors::new();
    for (i, d) in inv.discounts.iter_mut().enumerate() {
        discounts.nest(i.to_string(), resolve(rs, &mut d.taxes));
    }
    errs.nest("discounts", discounts);
    errs
}
