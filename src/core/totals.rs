//! Invoice totals: line sums, per-category tax breakdown and amounts due.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::cbc::{Code, Key};
use super::currencies::currency_def;
use super::error::FiscalError;
use super::types::{CategoryTotal, Combo, Invoice, RateTotal, Totals};

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

type RateGroup = (Option<Key>, Option<Decimal>);

/// How a category's amount counts towards the invoice totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryRole {
    /// Added to the total with tax.
    #[default]
    Charged,
    /// Withheld by the customer and subtracted from the payable amount.
    Retained,
    /// Reported in the breakdown only.
    Informative,
}

/// Recompute line sums and the invoice [`Totals`].
///
/// Combo percentages must already be resolved. Amounts are rounded to the
/// invoice currency's subunits (two places when unknown). `role` tells how
/// each category's amount is counted. Fails with
/// [`FiscalError::Arithmetic`] when an amount leaves the `Decimal` range;
/// the invoice totals are left untouched in that case.
pub fn calculate_totals<F>(invoice: &mut Invoice, role: F) -> Result<(), FiscalError>
where
    F: Fn(&Code) -> CategoryRole,
{
    let dp = currency_def(invoice.currency.as_str()).map_or(2, |c| c.subunits);

    let mut line_sums = Vec::with_capacity(invoice.lines.len());
    for (i, line) in invoice.lines.iter().enumerate() {
        let price = line.item.as_ref().map_or(Decimal::ZERO, |item| item.price);
        let sum = line
            .quantity
            .checked_mul(price)
            .ok_or_else(|| overflow(format!("lines.{i}.sum")))?;
        line_sums.push(round_half_up(sum, dp));
    }

    let sum = checked_sum(line_sums.iter().copied(), "sum")?;
    let discount = checked_sum(invoice.discounts.iter().map(|d| d.amount), "discount")?;
    let charge = checked_sum(invoice.charges.iter().map(|c| c.amount), "charge")?;
    let total = sum
        .checked_sub(discount)
        .and_then(|t| t.checked_add(charge))
        .ok_or_else(|| overflow("total"))?;

    // Group taxable bases by category, then by (key, percent)
    let mut groups: BTreeMap<Code, BTreeMap<RateGroup, Decimal>> = BTreeMap::new();
    let bases = invoice
        .lines
        .iter()
        .zip(&line_sums)
        .map(|(l, sum)| (&l.taxes, *sum))
        .chain(invoice.discounts.iter().map(|d| (&d.taxes, -d.amount)))
        .chain(invoice.charges.iter().map(|c| (&c.taxes, c.amount)));
    for (taxes, base) in bases {
        for combo in taxes {
            let entry = groups
                .entry(combo.category.clone())
                .or_default()
                .entry((combo.key.clone(), combo.percent))
                .or_insert(Decimal::ZERO);
            *entry = entry
                .checked_add(base)
                .ok_or_else(|| overflow(format!("taxes.{}", combo.category)))?;
        }
    }

    let mut taxes = Vec::new();
    let mut tax = Decimal::ZERO;
    let mut retained_tax = Decimal::ZERO;
    for (code, rates) in groups {
        let role = role(&code);
        let mut totals = Vec::with_capacity(rates.len());
        for ((key, percent), base) in rates {
            let amount = match percent {
                Some(p) => base
                    .checked_mul(p)
                    .map(|v| round_half_up(v / dec!(100), dp))
                    .ok_or_else(|| overflow(format!("taxes.{code}")))?,
                None => Decimal::ZERO,
            };
            totals.push(RateTotal {
                amount,
                key,
                percent,
                base,
            });
        }
        let amount = checked_sum(totals.iter().map(|r| r.amount), &format!("taxes.{code}"))?;
        let acc = match role {
            CategoryRole::Charged => Some(&mut tax),
            CategoryRole::Retained => Some(&mut retained_tax),
            CategoryRole::Informative => None,
        };
        if let Some(acc) = acc {
            *acc = acc.checked_add(amount).ok_or_else(|| overflow("tax"))?;
        }
        taxes.push(CategoryTotal {
            code,
            retained: role == CategoryRole::Retained,
            informative: role == CategoryRole::Informative,
            rates: totals,
            amount,
        });
    }

    let total_with_tax = total.checked_add(tax).ok_or_else(|| overflow("total_with_tax"))?;
    let payable = total_with_tax
        .checked_sub(retained_tax)
        .ok_or_else(|| overflow("payable"))?;
    let advances = match invoice.payment.as_ref() {
        Some(p) => checked_sum(p.advances.iter().map(|a| a.amount), "advances")?,
        None => Decimal::ZERO,
    };
    let due = payable.checked_sub(advances).ok_or_else(|| overflow("due"))?;

    for (i, (line, sum)) in invoice.lines.iter_mut().zip(line_sums).enumerate() {
        line.index = i + 1;
        line.sum = Some(sum);
        line.total = Some(sum);
    }
    invoice.totals = Some(Totals {
        sum,
        discount,
        charge,
        total,
        taxes,
        tax,
        total_with_tax,
        retained_tax,
        payable,
        advances,
        due,
    });
    Ok(())
}

fn checked_sum(mut values: impl Iterator<Item = Decimal>, field: &str) -> Result<Decimal, FiscalError> {
    values.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).ok_or_else(|| overflow(field)))
}

fn overflow(field: impl Into<String>) -> FiscalError {
    FiscalError::Arithmetic(format!("{} out of range", field.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::{InvoiceBuilder, LineBuilder, PartyBuilder};
    use crate::core::types::{Discount, PaymentAdvance, PaymentDetails};
    use chrono::NaiveDate;

    fn invoice(currency: &str) -> Invoice {
        InvoiceBuilder::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .currency(currency)
            .supplier(PartyBuilder::new("Supplier").build())
            .line(
                LineBuilder::new("Consulting", dec!(10), dec!(150))
                    .tax(Combo::new("VAT").with_percent(dec!(21)))
                    .build(),
            )
            .line(
                LineBuilder::new("Books", dec!(3), dec!(9.99))
                    .tax(Combo::new("VAT").with_percent(dec!(11)))
                    .build(),
            )
            .build()
    }

    #[test]
    fn rounding() {
        assert_eq!(round_half_up(dec!(1.005), 2), dec!(1.01));
        assert_eq!(round_half_up(dec!(-1.005), 2), dec!(-1.01));
        assert_eq!(round_half_up(dec!(100628.5), 0), dec!(100629));
    }

    #[test]
    fn groups_by_percent() {
        let mut inv = invoice("RON");
        calculate_totals(&mut inv, |_| CategoryRole::Charged).unwrap();
        let t = inv.totals.unwrap();
        assert_eq!(t.sum, dec!(1529.97));
        assert_eq!(t.taxes.len(), 1);
        assert_eq!(t.taxes[0].rates.len(), 2);
        // 1500 * 21% + 29.97 * 11%
        assert_eq!(t.tax, dec!(315.00) + dec!(3.30));
        assert_eq!(t.total_with_tax, dec!(1848.27));
        assert_eq!(t.payable, t.due);
        assert_eq!(inv.lines[1].index, 2);
    }

    #[test]
    fn retained_taxes_reduce_payable() {
        let mut inv = invoice("BRL");
        inv.lines[0]
            .taxes
            .push(Combo::new("IRRF").with_percent(dec!(1.5)));
        calculate_totals(&mut inv, |c| match c.as_str() {
            "IRRF" => CategoryRole::Retained,
            _ => CategoryRole::Charged,
        })
        .unwrap();
        let t = inv.totals.unwrap();
        assert_eq!(t.retained_tax, dec!(22.50));
        assert_eq!(t.payable, t.total_with_tax - dec!(22.50));
        assert!(t.taxes.iter().any(|c| c.retained && c.code == "IRRF"));
    }

    #[test]
    fn informative_taxes_are_reported_only() {
        let mut inv = invoice("BRL");
        inv.lines[0].taxes.push(Combo::new("CBS").with_percent(dec!(0.9)));
        calculate_totals(&mut inv, |c| match c.as_str() {
            "CBS" => CategoryRole::Informative,
            _ => CategoryRole::Charged,
        })
        .unwrap();
        let t = inv.totals.unwrap();
        let cbs = t.taxes.iter().find(|c| c.code == "CBS").unwrap();
        assert!(cbs.informative);
        assert_eq!(cbs.amount, dec!(13.50));
        assert_eq!(t.tax, dec!(318.30));
        assert_eq!(t.payable, t.total_with_tax);
    }

    #[test]
    fn discounts_and_advances() {
        let mut inv = invoice("EUR");
        inv.discounts.push(Discount {
            amount: dec!(100),
            taxes: vec![Combo::new("VAT").with_percent(dec!(21))],
            ..Default::default()
        });
        inv.payment = Some(PaymentDetails {
            advances: vec![PaymentAdvance {
                description: "Deposit".into(),
                amount: dec!(200),
                ..Default::default()
            }],
            ..Default::default()
        });
        calculate_totals(&mut inv, |_| CategoryRole::Charged).unwrap();
        let t = inv.totals.unwrap();
        assert_eq!(t.total, dec!(1429.97));
        assert_eq!(t.tax, dec!(294.00) + dec!(3.30));
        assert_eq!(t.advances, dec!(200));
        assert_eq!(t.due, t.payable - dec!(200));
    }

    #[test]
    fn zero_subunit_currency() {
        let mut inv = invoice("JPY");
        calculate_totals(&mut inv, |_| CategoryRole::Charged).unwrap();
        let t = inv.totals.unwrap();
        assert_eq!(t.sum, dec!(1530));
        assert_eq!(t.taxes[0].rates.iter().map(|r| r.amount).sum::<Decimal>(), dec!(318));
    }

    #[test]
    fn overflow_is_an_error() {
        let mut inv = invoice("EUR");
        inv.lines[0].quantity = Decimal::MAX;
        let err = calculate_totals(&mut inv, |_| CategoryRole::Charged).unwrap_err();
        assert_eq!(err.to_string(), "arithmetic error: lines.0.sum out of range");
        assert!(inv.totals.is_none());
        assert_eq!(inv.lines[0].sum, None);
    }
}
