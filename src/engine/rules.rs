//! Generic rules applied to every document regardless of regime.

use crate::core::cbc::Key;
use crate::core::countries::validate_country;
use crate::core::currencies::{exchange_rate, is_known_currency_code};
use crate::core::error::FieldErrors;
use crate::core::extensions::{Extensions, validate_extensions, validate_known_extensions};
use crate::core::types::*;
use crate::tax::RateLookup;

use super::ruleset::Ruleset;

fn known_invoice_type(key: &Key) -> bool {
    key.is_in(&[
        INVOICE_TYPE_STANDARD,
        INVOICE_TYPE_PROFORMA,
        INVOICE_TYPE_CORRECTIVE,
        INVOICE_TYPE_CREDIT_NOTE,
        INVOICE_TYPE_DEBIT_NOTE,
        INVOICE_TYPE_OTHER,
    ])
}

/// Extension map nested under `ext`. Without a regime, keys nothing
/// defines are left alone.
pub(crate) fn ext(rs: &Ruleset<'_>, ext: &Extensions) -> FieldErrors {
    let lookup = |k: &Key| rs.extension_def(k);
    let checked = match rs.regime {
        Some(_) => validate_extensions(ext, lookup),
        None => validate_known_extensions(ext, lookup),
    };
    let mut errs = FieldErrors::new();
    errs.nest("ext", checked);
    errs
}

pub(crate) fn invoice(rs: &Ruleset<'_>, inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();

    if inv.invoice_type.is_empty() {
        errs.add("type", "cannot be blank");
    } else if !known_invoice_type(&inv.invoice_type) {
        errs.add("type", "must be a valid value");
    }

    if inv.currency.is_empty() {
        errs.add("currency", "cannot be blank");
    } else if !is_known_currency_code(inv.currency.as_str()) {
        errs.add("currency", "must be a valid value");
    }

    let mut rates = FieldErrors::new();
    for (i, rate) in inv.exchange_rates.iter().enumerate() {
        rates.nest(i.to_string(), rate.validate());
    }
    if !rates.is_empty() {
        errs.nest("exchange_rates", rates);
    } else if let Some(regime) = rs.regime.filter(|_| is_known_currency_code(inv.currency.as_str())) {
        if exchange_rate(&inv.exchange_rates, &inv.currency, &regime.currency).is_none() {
            errs.add(
                "exchange_rates",
                format!(
                    "no exchange rate defined for '{}' to '{}'",
                    inv.currency, regime.currency
                ),
            );
        }
    }

    let known = rs.invoice_tags(SCHEMA_INVOICE);
    let mut tags = FieldErrors::new();
    for (i, tag) in inv.tags.iter().enumerate() {
        if !known.has(tag) {
            tags.add(i.to_string(), format!("'{tag}' undefined"));
        }
    }
    errs.nest("tags", tags);

    let mut addons = FieldErrors::new();
    for (i, key) in &rs.unknown_addons {
        addons.add(i.to_string(), format!("'{key}' not registered"));
    }
    errs.nest("addons", addons);

    if let Some(tax) = &inv.tax {
        errs.nest("tax", ext(rs, &tax.ext));
    }

    let summary =
        rs.scenario_summary(SCHEMA_INVOICE, &inv.invoice_type, &inv.tags, inv.tax_ext());
    if let Some(key) = summary
        .stamps
        .iter()
        .find(|k| !inv.stamps.iter().any(|s| &s.prv == *k))
    {
        errs.add("stamps", format!("missing key {key}"));
    }

    if let Some(def) = rs.correction(SCHEMA_INVOICE) {
        if def.has_type(&inv.invoice_type) {
            if inv.preceding.is_empty() {
                errs.add("preceding", "cannot be blank");
            }
            let mut preceding = FieldErrors::new();
            for (i, doc) in inv.preceding.iter().enumerate() {
                let mut e = FieldErrors::new();
                if def.reason_required && doc.reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
                    e.add("reason", "cannot be blank");
                }
                let mut missing = FieldErrors::new();
                for key in &def.extensions {
                    if !doc.ext.has(std::slice::from_ref(key)) {
                        missing.add(key.as_str(), "required");
                    }
                }
                e.nest("ext", missing);
                for key in &def.stamps {
                    if !doc.stamps.iter().any(|s| &s.prv == key) {
                        e.add("stamps", format!("missing key {key}"));
                        break;
                    }
                }
                preceding.nest(i.to_string(), e);
            }
            errs.nest("preceding", preceding);
        }
    }

    errs
}

pub(crate) fn party(rs: &Ruleset<'_>, party: &Party) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if party.name.trim().is_empty() {
        errs.add("name", "cannot be blank");
    }
    errs.merge(ext(rs, &party.ext));
    errs
}

pub(crate) fn tax_identity(tid: &TaxIdentity) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Err(msg) = validate_country(&tid.country) {
        errs.add("country", msg);
    }
    errs
}

pub(crate) fn identity(rs: &Ruleset<'_>, id: &Identity) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if id.code.is_empty() {
        errs.add("code", "cannot be blank");
    } else if let Some(def) = id.identity_type.as_ref().and_then(|t| rs.identity_def(t)) {
        if def.pattern.is_some() && !def.matches_pattern(id.code.as_str()) {
            errs.add("code", "must be in a valid format");
        }
    }
    if let Some(country) = id.country.as_deref() {
        if let Err(msg) = validate_country(country) {
            errs.add("country", msg);
        }
    }
    errs.merge(ext(rs, &id.ext));
    errs
}

pub(crate) fn address(addr: &Address) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(country) = addr.country.as_deref() {
        if let Err(msg) = validate_country(country) {
            errs.add("country", msg);
        }
    }
    errs
}

pub(crate) fn line(line: &Line) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if line.item.is_none() {
        errs.add("item", "cannot be blank");
    }
    errs
}

pub(crate) fn item(rs: &Ruleset<'_>, item: &Item) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if item.name.trim().is_empty() {
        errs.add("name", "cannot be blank");
    }
    errs.merge(ext(rs, &item.ext));
    errs
}

/// Each category may appear once per set of taxes.
pub(crate) fn combo_set(combos: &[Combo]) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, c) in combos.iter().enumerate() {
        if combos[..i].iter().any(|o| o.category == c.category) {
            errs.add(i.to_string(), format!("category {} is duplicated", c.category));
        }
    }
    errs
}

/// Resolve a combo against the regime of its country, if any.
pub(crate) fn resolve_combo(
    rs: &Ruleset<'_>,
    combo: &Combo,
) -> Result<Option<RateLookup>, (&'static str, String)> {
    let regime = match combo.country.as_deref() {
        Some(c) if rs.regime.is_none_or(|r| r.country != c) => rs.registry.regime(c),
        _ => rs.regime,
    };
    let (Some(regime), Some(date)) = (regime, rs.date) else {
        return Ok(None);
    };
    let Some(cat) = regime.category_def(&combo.category) else {
        return Err(("cat", format!("category '{}' not defined", combo.category)));
    };
    if let Some(key) = &combo.key {
        if !cat.keys.is_empty() && !cat.has_key(key) {
            return Err(("key", "must be a valid value".to_string()));
        }
    }
    if combo.rate.is_none() && combo.percent.is_some() {
        return Ok(None);
    }
    cat.lookup(combo.key.as_ref(), combo.rate.as_ref(), date)
        .map_err(|e| ("rate", e.to_string()))
}

pub(crate) fn combo(rs: &Ruleset<'_>, combo: &Combo) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if combo.category.is_empty() {
        errs.add("cat", "cannot be blank");
    } else if let Err((field, msg)) = resolve_combo(rs, combo) {
        errs.add(field, msg);
    }
    if let Some(country) = combo.country.as_deref() {
        if let Err(msg) = validate_country(country) {
            errs.add("country", msg);
        }
    }
    errs.merge(ext(rs, &combo.ext));
    errs
}

pub(crate) fn document_ref(rs: &Ruleset<'_>, doc: &DocumentRef) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if doc.code.is_empty() {
        errs.add("code", "cannot be blank");
    }
    errs.merge(ext(rs, &doc.ext));
    errs
}

pub(crate) fn payment_instructions(rs: &Ruleset<'_>, instr: &PaymentInstructions) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if instr.key.is_empty() {
        errs.add("key", "cannot be blank");
    }
    errs.merge(ext(rs, &instr.ext));
    errs
}

pub(crate) fn payment_advance(rs: &Ruleset<'_>, adv: &PaymentAdvance) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if adv.description.trim().is_empty() {
        errs.add("description", "cannot be blank");
    }
    errs.merge(ext(rs, &adv.ext));
    errs
}
