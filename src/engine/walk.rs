//! Depth-first traversal of a document tree. Every node is visited parent
//! first; generic rules run alongside the regime's hooks and then each
//! addon's, in order.

use crate::core::error::FieldErrors;
use crate::core::extensions::Extensions;
use crate::core::types::*;
use crate::tax::identity::normalize_tax_identity;

use super::document::{Document, DocumentMut};
use super::rules;
use super::ruleset::Ruleset;

// ── Normalization ───────────────────────────────────────────────────────────

fn hooks<T>(rs: &Ruleset<'_>, node: &mut T)
where
    for<'x> &'x mut T: Into<DocumentMut<'x>>,
{
    for normalize in rs.normalizers() {
        normalize((&mut *node).into());
    }
}

fn normalize_ext(rs: &Ruleset<'_>, ext: &mut Extensions) {
    for renames in rs.migrations() {
        ext.migrate(renames);
    }
    ext.normalize();
}

pub(crate) fn normalize_invoice(rs: &Ruleset<'_>, inv: &mut Invoice) {
    if inv.currency.is_empty() {
        if let Some(r) = rs.regime {
            inv.currency = r.currency.clone();
        }
    }
    if let Some(tax) = inv.tax.as_mut() {
        normalize_ext(rs, &mut tax.ext);
    }
    hooks(rs, inv);
    if inv.tax.as_ref().is_some_and(|t| t.ext.is_empty() && t.prices_include.is_none()) {
        inv.tax = None;
    }

    normalize_party(rs, &mut inv.supplier);
    if let Some(customer) = inv.customer.as_mut() {
        normalize_party(rs, customer);
    }
    for doc in &mut inv.preceding {
        normalize_ext(rs, &mut doc.ext);
        hooks(rs, doc);
    }
    for line in &mut inv.lines {
        normalize_line(rs, line);
    }
    for charge in &mut inv.charges {
        normalize_ext(rs, &mut charge.ext);
        hooks(rs, charge);
        normalize_combos(rs, &mut charge.taxes);
    }
    for discount in &mut inv.discounts {
        normalize_ext(rs, &mut discount.ext);
        hooks(rs, discount);
        normalize_combos(rs, &mut discount.taxes);
    }
    if let Some(payment) = inv.payment.as_mut() {
        if let Some(instr) = payment.instructions.as_mut() {
            normalize_ext(rs, &mut instr.ext);
            hooks(rs, instr);
        }
        for adv in &mut payment.advances {
            normalize_ext(rs, &mut adv.ext);
            hooks(rs, adv);
        }
    }
}

pub(crate) fn normalize_party(rs: &Ruleset<'_>, party: &mut Party) {
    party.name = party.name.trim().to_string();
    normalize_ext(rs, &mut party.ext);
    hooks(rs, party);
    normalize_ext(rs, &mut party.ext);
    if let Some(tid) = party.tax_id.as_mut() {
        normalize_tax_id(rs, tid);
    }
    for id in &mut party.identities {
        normalize_identity(rs, id);
    }
    for addr in &mut party.addresses {
        if let Some(c) = addr.country.as_mut() {
            *c = c.trim().to_uppercase();
        }
        hooks(rs, addr);
    }
}

pub(crate) fn normalize_tax_id(rs: &Ruleset<'_>, tid: &mut TaxIdentity) {
    tid.country = tid.country.trim().to_uppercase();
    let local = rs.with_regime_of(&tid.country);
    match local.regime.and_then(|r| r.tax_code_normalizer) {
        Some(normalize) => normalize(tid),
        None => normalize_tax_identity(tid),
    }
    hooks(&local, tid);
}

pub(crate) fn normalize_identity(rs: &Ruleset<'_>, id: &mut Identity) {
    id.code = id.code.normalize();
    if let Some(c) = id.country.as_mut() {
        *c = c.trim().to_uppercase();
    }
    if let Some(t) = id.identity_type.as_mut() {
        *t = t.normalize_alphanumerical();
    }
    normalize_ext(rs, &mut id.ext);
    match id.country.clone() {
        Some(country) => hooks(&rs.with_regime_of(&country), id),
        None => hooks(rs, id),
    }
}

pub(crate) fn normalize_line(rs: &Ruleset<'_>, line: &mut Line) {
    hooks(rs, line);
    if let Some(item) = line.item.as_mut() {
        normalize_item(rs, item);
    }
    normalize_combos(rs, &mut line.taxes);
}

pub(crate) fn normalize_item(rs: &Ruleset<'_>, item: &mut Item) {
    item.name = item.name.trim().to_string();
    normalize_ext(rs, &mut item.ext);
    hooks(rs, item);
    for id in &mut item.identities {
        normalize_identity(rs, id);
    }
}

fn normalize_combos(rs: &Ruleset<'_>, combos: &mut [Combo]) {
    for combo in combos {
        normalize_combo(rs, combo);
    }
}

pub(crate) fn normalize_combo(rs: &Ruleset<'_>, combo: &mut Combo) {
    combo.category = combo.category.normalize_alphanumerical();
    if let Some(c) = combo.country.as_mut() {
        *c = c.trim().to_uppercase();
    }
    normalize_ext(rs, &mut combo.ext);
    hooks(rs, combo);
    if combo.key.is_none() {
        let has_standard = rs
            .category_def(&combo.category)
            .is_some_and(|c| c.has_key(&crate::tax::KEY_STANDARD));
        if has_standard {
            combo.key = Some(crate::tax::KEY_STANDARD);
        }
    }
    combo.ext.normalize();
}

/// Normalize a standalone node.
pub(crate) fn normalize_node(rs: &Ruleset<'_>, doc: DocumentMut<'_>) {
    match doc {
        DocumentMut::Invoice(v) => normalize_invoice(rs, v),
        DocumentMut::Party(v) => normalize_party(rs, v),
        DocumentMut::TaxIdentity(v) => normalize_tax_id(rs, v),
        DocumentMut::Identity(v) => normalize_identity(rs, v),
        DocumentMut::Line(v) => normalize_line(rs, v),
        DocumentMut::Item(v) => normalize_item(rs, v),
        DocumentMut::Combo(v) => normalize_combo(rs, v),
        DocumentMut::Address(v) => hooks(rs, v),
        DocumentMut::Charge(v) => {
            normalize_ext(rs, &mut v.ext);
            hooks(rs, v);
            normalize_combos(rs, &mut v.taxes);
        }
        DocumentMut::Discount(v) => {
            normalize_ext(rs, &mut v.ext);
            hooks(rs, v);
            normalize_combos(rs, &mut v.taxes);
        }
        DocumentMut::DocumentRef(v) => {
            normalize_ext(rs, &mut v.ext);
            hooks(rs, v);
        }
        DocumentMut::PaymentInstructions(v) => {
            normalize_ext(rs, &mut v.ext);
            hooks(rs, v);
        }
        DocumentMut::PaymentAdvance(v) => {
            normalize_ext(rs, &mut v.ext);
            hooks(rs, v);
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

fn checks(rs: &Ruleset<'_>, doc: Document<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for validate in rs.validators() {
        errs.merge(validate(doc));
    }
    errs
}

/// Errors of each element, keyed by index.
fn each<T>(items: &[T], f: impl Fn(&T) -> FieldErrors) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, item) in items.iter().enumerate() {
        errs.nest(i.to_string(), f(item));
    }
    errs
}

pub(crate) fn validate_invoice(rs: &Ruleset<'_>, inv: &Invoice) -> FieldErrors {
    let mut errs = checks(rs, Document::Invoice(inv));
    errs.merge(rules::invoice(rs, inv));
    errs.nest("supplier", validate_party(rs, &inv.supplier));
    if let Some(customer) = &inv.customer {
        errs.nest("customer", validate_party(rs, customer));
    }
    errs.nest("preceding", each(&inv.preceding, |d| validate_doc_ref(rs, d)));
    errs.nest("lines", each(&inv.lines, |l| validate_line(rs, l)));
    errs.nest("charges", each(&inv.charges, |c| validate_charge(rs, c)));
    errs.nest("discounts", each(&inv.discounts, |d| validate_discount(rs, d)));
    if let Some(payment) = &inv.payment {
        let mut p = FieldErrors::new();
        if let Some(instr) = &payment.instructions {
            let mut e = checks(rs, Document::PaymentInstructions(instr));
            e.merge(rules::payment_instructions(rs, instr));
            p.nest("instructions", e);
        }
        p.nest(
            "advances",
            each(&payment.advances, |a| {
                let mut e = checks(rs, Document::PaymentAdvance(a));
                e.merge(rules::payment_advance(rs, a));
                e
            }),
        );
        errs.nest("payment", p);
    }
    errs
}

pub(crate) fn validate_party(rs: &Ruleset<'_>, party: &Party) -> FieldErrors {
    let mut errs = checks(rs, Document::Party(party));
    errs.merge(rules::party(rs, party));
    if let Some(tid) = &party.tax_id {
        errs.nest("tax_id", validate_tax_id(rs, tid));
    }
    errs.nest("identities", each(&party.identities, |i| validate_identity(rs, i)));
    errs.nest(
        "addresses",
        each(&party.addresses, |a| {
            let mut e = checks(rs, Document::Address(a));
            e.merge(rules::address(a));
            e
        }),
    );
    errs
}

pub(crate) fn validate_tax_id(rs: &Ruleset<'_>, tid: &TaxIdentity) -> FieldErrors {
    let local = rs.with_regime_of(&tid.country);
    let mut errs = checks(&local, Document::TaxIdentity(tid));
    errs.merge(rules::tax_identity(tid));
    errs
}

pub(crate) fn validate_identity(rs: &Ruleset<'_>, id: &Identity) -> FieldErrors {
    let local = match id.country.as_deref() {
        Some(country) => rs.with_regime_of(country),
        None => rs.clone(),
    };
    let mut errs = checks(&local, Document::Identity(id));
    errs.merge(rules::identity(&local, id));
    errs
}

pub(crate) fn validate_line(rs: &Ruleset<'_>, line: &Line) -> FieldErrors {
    let mut errs = checks(rs, Document::Line(line));
    errs.merge(rules::line(line));
    if let Some(item) = &line.item {
        errs.nest("item", validate_item(rs, item));
    }
    errs.nest("taxes", validate_combos(rs, &line.taxes));
    errs
}

pub(crate) fn validate_item(rs: &Ruleset<'_>, item: &Item) -> FieldErrors {
    let mut errs = checks(rs, Document::Item(item));
    errs.merge(rules::item(rs, item));
    errs.nest("identities", each(&item.identities, |i| validate_identity(rs, i)));
    errs
}

fn validate_combos(rs: &Ruleset<'_>, combos: &[Combo]) -> FieldErrors {
    let mut errs = each(combos, |c| validate_combo(rs, c));
    errs.merge(rules::combo_set(combos));
    errs
}

pub(crate) fn validate_combo(rs: &Ruleset<'_>, combo: &Combo) -> FieldErrors {
    let mut errs = checks(rs, Document::Combo(combo));
    errs.merge(rules::combo(rs, combo));
    errs
}

pub(crate) fn validate_charge(rs: &Ruleset<'_>, charge: &Charge) -> FieldErrors {
    let mut errs = checks(rs, Document::Charge(charge));
    errs.merge(rules::ext(rs, &charge.ext));
    errs.nest("taxes", validate_combos(rs, &charge.taxes));
    errs
}

pub(crate) fn validate_discount(rs: &Ruleset<'_>, discount: &Discount) -> FieldErrors {
    let mut errs = checks(rs, Document::Discount(discount));
    errs.merge(rules::ext(rs, &discount.ext));
    errs.nest("taxes", validate_combos(rs, &discount.taxes));
    errs
}

pub(crate) fn validate_doc_ref(rs: &Ruleset<'_>, doc: &DocumentRef) -> FieldErrors {
    let mut errs = checks(rs, Document::DocumentRef(doc));
    errs.merge(rules::document_ref(rs, doc));
    errs
}

/// Validate a standalone node.
pub(crate) fn validate_node(rs: &Ruleset<'_>, doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(v) => validate_invoice(rs, v),
        Document::Party(v) => validate_party(rs, v),
        Document::TaxIdentity(v) => validate_tax_id(rs, v),
        Document::Identity(v) => validate_identity(rs, v),
        Document::Line(v) => validate_line(rs, v),
        Document::Item(v) => validate_item(rs, v),
        Document::Combo(v) => validate_combo(rs, v),
        Document::Charge(v) => validate_charge(rs, v),
        Document::Discount(v) => validate_discount(rs, v),
        Document::DocumentRef(v) => validate_doc_ref(rs, v),
        Document::Address(v) => {
            let mut e = checks(rs, doc);
            e.merge(rules::address(v));
            e
        }
        Document::PaymentInstructions(v) => {
            let mut e = checks(rs, doc);
            e.merge(rules::payment_instructions(rs, v));
            e
        }
        Document::PaymentAdvance(v) => {
            let mut e = checks(rs, doc);
            e.merge(rules::payment_advance(rs, v));
            e
        }
    }
}
