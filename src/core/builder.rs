use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::cbc::{Code, Key, Note};
use super::currencies::ExchangeRate;
use super::extensions::Extensions;
use super::types::*;
use crate::tax::Tags;

/// Builder for invoices ready to be calculated and validated.
///
/// ```
/// use fiskal::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())
///     .code("RO-001")
///     .supplier(PartyBuilder::new("Furnizor SRL").tax_id("RO", "18547290").build())
///     .line(LineBuilder::new("Consultanță", dec!(2), dec!(100))
///         .tax(Combo::new("VAT").with_key(fiskal::tax::KEY_STANDARD))
///         .build())
///     .build();
///
/// assert_eq!(invoice.supplier.tax_country(), Some("RO"));
/// assert_eq!(invoice.lines.len(), 1);
/// ```
pub struct InvoiceBuilder {
    regime: Option<String>,
    addons: Vec<Key>,
    tags: Tags,
    invoice_type: Key,
    series: Option<Code>,
    code: Option<Code>,
    issue_date: NaiveDate,
    currency: Code,
    exchange_rates: Vec<ExchangeRate>,
    preceding: Vec<DocumentRef>,
    ordering: Option<Ordering>,
    tax_ext: Extensions,
    supplier: Party,
    customer: Option<Party>,
    lines: Vec<Line>,
    charges: Vec<Charge>,
    discounts: Vec<Discount>,
    payment: Option<PaymentDetails>,
    notes: Vec<Note>,
}

impl InvoiceBuilder {
    pub fn new(issue_date: NaiveDate) -> Self {
        Self {
            regime: None,
            addons: Vec::new(),
            tags: Tags::default(),
            invoice_type: INVOICE_TYPE_STANDARD,
            series: None,
            code: None,
            issue_date,
            currency: Code::default(),
            exchange_rates: Vec::new(),
            preceding: Vec::new(),
            ordering: None,
            tax_ext: Extensions::new(),
            supplier: Party::default(),
            customer: None,
            lines: Vec::new(),
            charges: Vec::new(),
            discounts: Vec::new(),
            payment: None,
            notes: Vec::new(),
        }
    }

    /// Force the regime instead of deriving it from the supplier.
    pub fn regime(mut self, country: impl Into<String>) -> Self {
        self.regime = Some(country.into());
        self
    }

    pub fn addon(mut self, key: impl Into<Key>) -> Self {
        self.addons.push(key.into());
        self
    }

    pub fn tag(mut self, tag: Key) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn invoice_type(mut self, key: Key) -> Self {
        self.invoice_type = key;
        self
    }

    pub fn series(mut self, series: impl Into<Code>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn code(mut self, code: impl Into<Code>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn currency(mut self, code: impl Into<Code>) -> Self {
        self.currency = code.into();
        self
    }

    pub fn exchange_rate(mut self, rate: ExchangeRate) -> Self {
        self.exchange_rates.push(rate);
        self
    }

    pub fn preceding(mut self, doc: DocumentRef) -> Self {
        self.preceding.push(doc);
        self
    }

    /// Buyer reference, stored as the ordering code.
    pub fn ordering_code(mut self, code: impl Into<Code>) -> Self {
        self.ordering = Some(Ordering {
            code: Some(code.into()),
        });
        self
    }

    pub fn tax_ext(mut self, key: impl Into<Key>, code: impl Into<Code>) -> Self {
        self.tax_ext.set(key.into(), code);
        self
    }

    pub fn supplier(mut self, party: Party) -> Self {
        self.supplier = party;
        self
    }

    pub fn customer(mut self, party: Party) -> Self {
        self.customer = Some(party);
        self
    }

    pub fn line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn charge(mut self, charge: Charge) -> Self {
        self.charges.push(charge);
        self
    }

    pub fn discount(mut self, discount: Discount) -> Self {
        self.discounts.push(discount);
        self
    }

    pub fn payment(mut self, payment: PaymentDetails) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    /// Assemble the invoice. Nothing is checked here; run it through
    /// `calculate` and `validate`.
    pub fn build(self) -> Invoice {
        let tax = (!self.tax_ext.is_empty()).then(|| InvoiceTax {
            prices_include: None,
            ext: self.tax_ext,
        });
        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, mut l)| {
                l.index = i + 1;
                l
            })
            .collect();
        Invoice {
            regime: self.regime,
            addons: self.addons,
            tags: self.tags,
            invoice_type: self.invoice_type,
            series: self.series,
            code: self.code,
            issue_date: self.issue_date,
            currency: self.currency,
            exchange_rates: self.exchange_rates,
            preceding: self.preceding,
            ordering: self.ordering,
            tax,
            supplier: self.supplier,
            customer: self.customer,
            lines,
            charges: self.charges,
            discounts: self.discounts,
            payment: self.payment,
            notes: self.notes,
            stamps: Vec::new(),
            totals: None,
        }
    }
}

/// Builder for [`Party`].
pub struct PartyBuilder {
    party: Party,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            party: Party {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn tax_id(mut self, country: &str, code: &str) -> Self {
        self.party.tax_id = Some(TaxIdentity::new(country, code));
        self
    }

    /// Zone of the tax identity. Ignored until a tax ID is set.
    pub fn zone(mut self, zone: impl Into<Code>) -> Self {
        if let Some(tid) = self.party.tax_id.as_mut() {
            tid.zone = Some(zone.into());
        }
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.party.identities.push(identity);
        self
    }

    pub fn address(mut self, address: Address) -> Self {
        self.party.addresses.push(address);
        self
    }

    pub fn inbox(mut self, inbox: Inbox) -> Self {
        self.party.inboxes.push(inbox);
        self
    }

    pub fn ext(mut self, key: impl Into<Key>, code: impl Into<Code>) -> Self {
        self.party.ext.set(key.into(), code);
        self
    }

    pub fn build(self) -> Party {
        self.party
    }
}

/// Builder for [`Line`].
pub struct LineBuilder {
    quantity: Decimal,
    item: Item,
    taxes: Vec<Combo>,
}

impl LineBuilder {
    pub fn new(name: impl Into<String>, quantity: Decimal, price: Decimal) -> Self {
        Self {
            quantity,
            item: Item {
                name: name.into(),
                price,
                ..Default::default()
            },
            taxes: Vec::new(),
        }
    }

    pub fn tax(mut self, combo: Combo) -> Self {
        self.taxes.push(combo);
        self
    }

    pub fn unit(mut self, unit: impl Into<Code>) -> Self {
        self.item.unit = Some(unit.into());
        self
    }

    pub fn item_key(mut self, key: Key) -> Self {
        self.item.key = Some(key);
        self
    }

    pub fn item_identity(mut self, identity: Identity) -> Self {
        self.item.identities.push(identity);
        self
    }

    pub fn item_ext(mut self, key: impl Into<Key>, code: impl Into<Code>) -> Self {
        self.item.ext.set(key.into(), code);
        self
    }

    pub fn build(self) -> Line {
        Line {
            index: 0,
            quantity: self.quantity,
            item: Some(self.item),
            sum: None,
            taxes: self.taxes,
            total: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TAG_SIMPLIFIED;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_invoice_with_tax_ext_and_indexes() {
        let inv = InvoiceBuilder::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .regime("CO")
            .addon("co-dian-v2")
            .tag(TAG_SIMPLIFIED)
            .tax_ext("co-dian-debit-code", "1")
            .supplier(PartyBuilder::new("ACME").tax_id("CO", "412615332").zone("11001").build())
            .line(LineBuilder::new("A", dec!(1), dec!(10)).build())
            .line(LineBuilder::new("B", dec!(2), dec!(5)).unit("h").build())
            .build();

        assert_eq!(inv.regime.as_deref(), Some("CO"));
        assert!(inv.has_tags(&[TAG_SIMPLIFIED]));
        assert_eq!(inv.lines[1].index, 2);
        assert!(inv.tax_ext().is_some_and(|e| !e.is_empty()));
        assert_eq!(
            inv.supplier.tax_id.as_ref().and_then(|t| t.zone.clone()),
            Some(Code::from("11001"))
        );
    }

    #[test]
    fn zone_without_tax_id_is_ignored() {
        let p = PartyBuilder::new("X").zone("11001").build();
        assert!(p.tax_id.is_none());
    }
}
