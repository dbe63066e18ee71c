use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cbc::{Code, Key, Note};
use super::currencies::ExchangeRate;
use super::extensions::Extensions;
use crate::tax::Tags;

/// Invoice type keys.
pub const INVOICE_TYPE_STANDARD: Key = Key::from_static("standard");
pub const INVOICE_TYPE_PROFORMA: Key = Key::from_static("proforma");
pub const INVOICE_TYPE_CORRECTIVE: Key = Key::from_static("corrective");
pub const INVOICE_TYPE_CREDIT_NOTE: Key = Key::from_static("credit-note");
pub const INVOICE_TYPE_DEBIT_NOTE: Key = Key::from_static("debit-note");
pub const INVOICE_TYPE_OTHER: Key = Key::from_static("other");

/// Schema identifier of [`Invoice`], used to select scenario, tag and
/// correction sets.
pub const SCHEMA_INVOICE: &str = "bill/invoice";

/// The top-level billing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Explicit regime country; defaults to the supplier's tax country.
    #[serde(rename = "$regime", default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<String>,
    /// Opted-in addon keys, in application order.
    #[serde(rename = "$addons", default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<Key>,
    /// Document flags such as `simplified` or `export`.
    #[serde(rename = "$tags", default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// Invoice type, one of the `INVOICE_TYPE_*` keys.
    #[serde(rename = "type")]
    pub invoice_type: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    pub issue_date: NaiveDate,
    /// ISO 4217 currency code; filled from the regime when empty.
    #[serde(default, skip_serializing_if = "Code::is_empty")]
    pub currency: Code,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exchange_rates: Vec<ExchangeRate>,
    /// Documents corrected by this one (credit and debit notes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preceding: Vec<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<Ordering>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<InvoiceTax>,
    pub supplier: Party,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Party>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charges: Vec<Charge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discounts: Vec<Discount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    /// Head stamps applied by tax authorities after issuance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Stamp>,
    /// Calculated totals (set by `calculate()`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
}

impl Invoice {
    pub fn has_tags(&self, tags: &[Key]) -> bool {
        self.tags.has_tags(tags)
    }

    /// Document-level tax extensions, if any were set.
    pub fn tax_ext(&self) -> Option<&Extensions> {
        self.tax.as_ref().map(|t| &t.ext)
    }

    pub fn is_correction(&self) -> bool {
        self.invoice_type.is_in(&[
            INVOICE_TYPE_CREDIT_NOTE,
            INVOICE_TYPE_DEBIT_NOTE,
            INVOICE_TYPE_CORRECTIVE,
        ])
    }
}

/// Document-level tax options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTax {
    /// Category code whose tax is included in line prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices_include: Option<Code>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// Buyer-side ordering references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    /// Buyer reference (Leitweg-ID for XRechnung).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
}

/// A provider/value pair applied by an authority, e.g. `dian-cude`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub prv: Key,
    pub val: String,
}

/// Reference to another document, typically a corrected invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Code>,
    pub code: Code,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Stamp>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// Supplier or customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<TaxIdentity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    /// Electronic addresses (email, Peppol ID, …).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inboxes: Vec<Inbox>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Party {
    /// Country of the party's tax identity, if any.
    pub fn tax_country(&self) -> Option<&str> {
        self.tax_id.as_ref().map(|t| t.country.as_str())
    }
}

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Electronic address of a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Tax identifier of a party, qualified by its issuing country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxIdentity {
    /// ISO 3166-1 alpha-2 country that issued the code.
    pub country: String,
    /// Sub-national zone code, used by regimes that encode the tax office.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Code>,
    #[serde(default, skip_serializing_if = "Code::is_empty")]
    pub code: Code,
}

impl TaxIdentity {
    pub fn new(country: &str, code: &str) -> Self {
        TaxIdentity {
            country: country.to_string(),
            zone: None,
            code: Code::from(code),
        }
    }
}

/// Any other identifier: national IDs, registration numbers, product codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Identity type code declared by a regime, e.g. `CN` or `TCKN`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub identity_type: Option<Code>,
    pub code: Code,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Identity {
    pub fn typed(identity_type: &str, code: &str) -> Self {
        Identity {
            identity_type: Some(Code::from(identity_type)),
            code: Code::from(code),
            ..Default::default()
        }
    }
}

/// What is being sold on a line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// An invoice line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// 1-based position, set by `calculate()`.
    #[serde(default)]
    pub index: usize,
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    /// quantity × price, set by `calculate()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<Combo>,
    /// Line net total, set by `calculate()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

/// A tax category and rate applied to a line, charge or discount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combo {
    /// Category code, e.g. `VAT`, `ICMS`.
    #[serde(rename = "cat")]
    pub category: Code,
    /// Country whose rules apply when different from the regime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Tax key: `standard`, `zero`, `exempt`, `reverse-charge`, …
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Rate level: `general`, `reduced`, `super-reduced`, …
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Key>,
    /// Percentage in percent units (21 means 21%).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Combo {
    pub fn new(category: &str) -> Self {
        Combo {
            category: Code::from(category),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_rate(mut self, rate: Key) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_percent(mut self, percent: Decimal) -> Self {
        self.percent = Some(percent);
        self
    }
}

/// Document-level charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<Combo>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// Document-level discount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<Combo>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// Payment terms, instructions and advances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<PaymentTerms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<PaymentInstructions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advances: Vec<PaymentAdvance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// How the customer is expected to pay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstructions {
    /// Means key: `credit-transfer`, `card`, `cash`, `direct-debit`, …
    pub key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credit_transfer: Vec<CreditTransfer>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransfer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An amount already paid against the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAdvance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Means key, as for [`PaymentInstructions::key`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// Calculated totals (set by `calculate()`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line totals.
    pub sum: Decimal,
    pub discount: Decimal,
    pub charge: Decimal,
    /// Net total: sum − discount + charge.
    pub total: Decimal,
    /// Breakdown per tax category.
    pub taxes: Vec<CategoryTotal>,
    /// Sum of non-retained category amounts.
    pub tax: Decimal,
    pub total_with_tax: Decimal,
    /// Sum of retained (withheld) category amounts.
    pub retained_tax: Decimal,
    /// total_with_tax − retained_tax.
    pub payable: Decimal,
    pub advances: Decimal,
    /// payable − advances.
    pub due: Decimal,
}

impl Totals {
    /// Fully settled by advances.
    pub fn paid(&self) -> bool {
        self.advances > Decimal::ZERO && self.due <= Decimal::ZERO
    }
}

/// Tax total for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub code: Code,
    #[serde(default)]
    pub retained: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub informative: bool,
    pub rates: Vec<RateTotal>,
    pub amount: Decimal,
}

/// Taxable base and amount for one (key, percent) group of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTotal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    pub base: Decimal,
    pub amount: Decimal,
}
