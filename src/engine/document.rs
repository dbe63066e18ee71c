use crate::core::types::{
    Address, Charge, Combo, Discount, DocumentRef, Identity, Invoice, Item, Line, Party,
    PaymentAdvance, PaymentInstructions, TaxIdentity,
};

/// A borrowed node of a fiscal document, handed to regime and addon
/// validators. Hooks match on the variants they care about and ignore
/// the rest.
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    Invoice(&'a Invoice),
    Party(&'a Party),
    TaxIdentity(&'a TaxIdentity),
    Identity(&'a Identity),
    Address(&'a Address),
    Line(&'a Line),
    Item(&'a Item),
    Combo(&'a Combo),
    Charge(&'a Charge),
    Discount(&'a Discount),
    DocumentRef(&'a DocumentRef),
    PaymentInstructions(&'a PaymentInstructions),
    PaymentAdvance(&'a PaymentAdvance),
}

/// Mutable counterpart of [`Document`], handed to normalizers.
#[derive(Debug)]
pub enum DocumentMut<'a> {
    Invoice(&'a mut Invoice),
    Party(&'a mut Party),
    TaxIdentity(&'a mut TaxIdentity),
    Identity(&'a mut Identity),
    Address(&'a mut Address),
    Line(&'a mut Line),
    Item(&'a mut Item),
    Combo(&'a mut Combo),
    Charge(&'a mut Charge),
    Discount(&'a mut Discount),
    DocumentRef(&'a mut DocumentRef),
    PaymentInstructions(&'a mut PaymentInstructions),
    PaymentAdvance(&'a mut PaymentAdvance),
}

macro_rules! document_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a $variant> for Document<'a> {
                fn from(v: &'a $variant) -> Self {
                    Document::$variant(v)
                }
            }

            impl<'a> From<&'a mut $variant> for DocumentMut<'a> {
                fn from(v: &'a mut $variant) -> Self {
                    DocumentMut::$variant(v)
                }
            }
        )*
    };
}

document_from!(
    Invoice,
    Party,
    TaxIdentity,
    Identity,
    Address,
    Line,
    Item,
    Combo,
    Charge,
    Discount,
    DocumentRef,
    PaymentInstructions,
    PaymentAdvance,
);

impl DocumentMut<'_> {
    /// Read-only view of the same node.
    pub fn as_document(&self) -> Document<'_> {
        match self {
            DocumentMut::Invoice(v) => Document::Invoice(v),
            DocumentMut::Party(v) => Document::Party(v),
            DocumentMut::TaxIdentity(v) => Document::TaxIdentity(v),
            DocumentMut::Identity(v) => Document::Identity(v),
            DocumentMut::Address(v) => Document::Address(v),
            DocumentMut::Line(v) => Document::Line(v),
            DocumentMut::Item(v) => Document::Item(v),
            DocumentMut::Combo(v) => Document::Combo(v),
            DocumentMut::Charge(v) => Document::Charge(v),
            DocumentMut::Discount(v) => Document::Discount(v),
            DocumentMut::DocumentRef(v) => Document::DocumentRef(v),
            DocumentMut::PaymentInstructions(v) => Document::PaymentInstructions(v),
            DocumentMut::PaymentAdvance(v) => Document::PaymentAdvance(v),
        }
    }
}

impl Document<'_> {
    /// Country whose regime governs this node when it is checked on its
    /// own, outside an invoice.
    pub fn country(&self) -> Option<&str> {
        match self {
            Document::Invoice(inv) => inv.regime.as_deref().or(inv.supplier.tax_country()),
            Document::Party(p) => p.tax_country(),
            Document::TaxIdentity(t) => Some(t.country.as_str()),
            Document::Identity(i) => i.country.as_deref(),
            Document::Address(a) => a.country.as_deref(),
            Document::Combo(c) => c.country.as_deref(),
            _ => None,
        }
    }
}
