//! ISO 4217 currency definitions and exchange-rate conversion.
//!
//! Each definition carries the number of subunits (decimal places) used
//! to rescale converted amounts to the destination currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cbc::Code;
use super::error::FieldErrors;
use super::totals::round_half_up;

/// Static metadata for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyDef {
    pub code: &'static str,
    pub numeric: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Decimal places of the smallest unit (2 for EUR, 0 for JPY).
    pub subunits: u32,
}

impl CurrencyDef {
    /// Zero amount at this currency's scale.
    pub fn zero(&self) -> Decimal {
        Decimal::new(0, self.subunits)
    }

    /// Round `amount` to this currency's subunits.
    pub fn rescale(&self, amount: Decimal) -> Decimal {
        round_half_up(amount, self.subunits)
    }
}

/// Look up a currency by its ISO alpha code.
pub fn currency_def(code: &str) -> Option<&'static CurrencyDef> {
    CURRENCIES
        .binary_search_by(|d| d.code.cmp(code))
        .ok()
        .map(|i| &CURRENCIES[i])
}

/// Look up a currency by its ISO numeric code.
pub fn currency_def_by_numeric(numeric: &str) -> Option<&'static CurrencyDef> {
    CURRENCIES.iter().find(|d| d.numeric == numeric)
}

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    currency_def(code).is_some()
}

/// A conversion rate: one unit of `from` is worth `amount` of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: Code,
    pub to: Code,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl ExchangeRate {
    pub fn new(from: &str, to: &str, amount: Decimal) -> Self {
        ExchangeRate {
            from: Code::from(from),
            to: Code::from(to),
            amount,
        }
    }

    /// Both currencies must be known ISO codes and the amount positive.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();
        for (field, code) in [("from", &self.from), ("to", &self.to)] {
            if code.is_empty() {
                errs.add(field, "cannot be blank");
            } else if !is_known_currency_code(code.as_str()) {
                errs.add(field, "must be a valid value");
            }
        }
        if self.amount <= Decimal::ZERO {
            errs.add("amount", "must be greater than 0");
        }
        errs
    }
}

/// Rate converting `from` into `into`. Identical currencies convert at 1;
/// `None` when no listed rate matches.
pub fn exchange_rate(rates: &[ExchangeRate], from: &Code, into: &Code) -> Option<Decimal> {
    if from == into {
        return Some(Decimal::ONE);
    }
    rates
        .iter()
        .find(|r| &r.from == from && &r.to == into)
        .map(|r| r.amount)
}

/// Convert `amount` from one currency into another and rescale the result
/// to the destination currency's subunits. `None` when no rate applies or
/// the product overflows.
pub fn exchange(
    rates: &[ExchangeRate],
    from: &Code,
    into: &Code,
    amount: Decimal,
) -> Option<Decimal> {
    if from == into {
        return Some(amount);
    }
    let rate = exchange_rate(rates, from, into)?;
    let def = currency_def(into.as_str())?;
    amount.checked_mul(rate).map(|v| def.rescale(v))
}

macro_rules! cur {
    ($code:literal, $num:literal, $name:literal, $sym:literal, $sub:literal) => {
        CurrencyDef {
            code: $code,
            numeric: $num,
            name: $name,
            symbol: $sym,
            subunits: $sub,
        }
    };
}

/// ISO 4217 currencies, sorted by alpha code for binary search.
static CURRENCIES: &[CurrencyDef] = &[
    cur!("AED", "784", "UAE Dirham", "د.إ", 2),
    cur!("ARS", "032", "Argentine Peso", "$", 2),
    cur!("AUD", "036", "Australian Dollar", "$", 2),
    cur!("BGN", "975", "Bulgarian Lev", "лв.", 2),
    cur!("BOB", "068", "Boliviano", "Bs.", 2),
    cur!("BRL", "986", "Brazilian Real", "R$", 2),
    cur!("CAD", "124", "Canadian Dollar", "$", 2),
    cur!("CHF", "756", "Swiss Franc", "CHF", 2),
    cur!("CLP", "152", "Chilean Peso", "$", 0),
    cur!("CNY", "156", "Chinese Yuan", "¥", 2),
    cur!("COP", "170", "Colombian Peso", "$", 2),
    cur!("CRC", "188", "Costa Rican Colón", "₡", 2),
    cur!("CZK", "203", "Czech Koruna", "Kč", 2),
    cur!("DKK", "208", "Danish Krone", "kr.", 2),
    cur!("DOP", "214", "Dominican Peso", "$", 2),
    cur!("EGP", "818", "Egyptian Pound", "ج.م", 2),
    cur!("EUR", "978", "Euro", "€", 2),
    cur!("GBP", "826", "Pound Sterling", "£", 2),
    cur!("GEL", "981", "Georgian Lari", "ლ", 2),
    cur!("GTQ", "320", "Guatemalan Quetzal", "Q", 2),
    cur!("HKD", "344", "Hong Kong Dollar", "$", 2),
    cur!("HUF", "348", "Hungarian Forint", "Ft", 2),
    cur!("IDR", "360", "Indonesian Rupiah", "Rp", 2),
    cur!("ILS", "376", "Israeli Shekel", "₪", 2),
    cur!("INR", "356", "Indian Rupee", "₹", 2),
    cur!("ISK", "352", "Icelandic Krona", "kr.", 0),
    cur!("JPY", "392", "Japanese Yen", "¥", 0),
    cur!("KES", "404", "Kenyan Shilling", "KSh", 2),
    cur!("KRW", "410", "South Korean Won", "₩", 0),
    cur!("KZT", "398", "Kazakhstani Tenge", "₸", 2),
    cur!("MAD", "504", "Moroccan Dirham", "د.م.", 2),
    cur!("MXN", "484", "Mexican Peso", "$", 2),
    cur!("MYR", "458", "Malaysian Ringgit", "RM", 2),
    cur!("NGN", "566", "Nigerian Naira", "₦", 2),
    cur!("NOK", "578", "Norwegian Krone", "kr", 2),
    cur!("NZD", "554", "New Zealand Dollar", "$", 2),
    cur!("PAB", "590", "Panamanian Balboa", "B/.", 2),
    cur!("PEN", "604", "Peruvian Sol", "S/", 2),
    cur!("PHP", "608", "Philippine Peso", "₱", 2),
    cur!("PLN", "985", "Polish Zloty", "zł", 2),
    cur!("PYG", "600", "Paraguayan Guaraní", "₲", 0),
    cur!("RON", "946", "Romanian Leu", "lei", 2),
    cur!("RSD", "941", "Serbian Dinar", "дин.", 2),
    cur!("SAR", "682", "Saudi Riyal", "ر.س", 2),
    cur!("SEK", "752", "Swedish Krona", "kr", 2),
    cur!("SGD", "702", "Singapore Dollar", "$", 2),
    cur!("THB", "764", "Thai Baht", "฿", 2),
    cur!("TRY", "949", "Turkish Lira", "₺", 2),
    cur!("TWD", "901", "New Taiwan Dollar", "$", 2),
    cur!("UAH", "980", "Ukrainian Hryvnia", "₴", 2),
    cur!("USD", "840", "US Dollar", "$", 2),
    cur!("UYU", "858", "Uruguayan Peso", "$", 2),
    cur!("VND", "704", "Vietnamese Dong", "₫", 0),
    cur!("ZAR", "710", "South African Rand", "R", 2),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_rates() -> Vec<ExchangeRate> {
        vec![
            ExchangeRate::new("USD", "EUR", dec!(0.875967)),
            ExchangeRate::new("EUR", "USD", dec!(1.141860)),
            ExchangeRate::new("EUR", "CLP", dec!(1006.29)),
        ]
    }

    fn code(s: &str) -> Code {
        Code::from(s)
    }

    #[test]
    fn known_currencies() {
        assert!(is_known_currency_code("EUR"));
        assert!(is_known_currency_code("BRL"));
        assert!(is_known_currency_code("PAB"));
        assert_eq!(currency_def("JPY").map(|d| d.subunits), Some(0));
        assert_eq!(currency_def_by_numeric("946").map(|d| d.code), Some("RON"));
    }

    #[test]
    fn unknown_currencies() {
        assert!(!is_known_currency_code("XYZ"));
        assert!(!is_known_currency_code(""));
        assert!(!is_known_currency_code("eur"));
    }

    #[test]
    fn list_is_sorted() {
        for window in CURRENCIES.windows(2) {
            assert!(
                window[0].code < window[1].code,
                "currency codes not sorted: {} >= {}",
                window[0].code,
                window[1].code
            );
        }
    }

    #[test]
    fn matches_exchange_rates() {
        let rates = sample_rates();
        assert_eq!(
            exchange_rate(&rates, &code("USD"), &code("EUR")),
            Some(dec!(0.875967))
        );
        assert_eq!(
            exchange_rate(&rates, &code("EUR"), &code("USD")),
            Some(dec!(1.141860))
        );
        assert_eq!(
            exchange_rate(&rates, &code("USD"), &code("USD")),
            Some(Decimal::ONE)
        );
        assert_eq!(exchange_rate(&rates, &code("USD"), &code("GBP")), None);
    }

    #[test]
    fn exchanges_and_rescales() {
        let rates = sample_rates();
        let a = dec!(100.00);
        let b = exchange(&rates, &code("USD"), &code("EUR"), a).unwrap();
        assert_eq!(b.to_string(), "87.60");
        let c = exchange(&rates, &code("EUR"), &code("USD"), b).unwrap();
        assert_eq!(c.to_string(), "100.03");
        assert_eq!(exchange(&rates, &code("USD"), &code("USD"), c), Some(c));
        assert_eq!(exchange(&rates, &code("USD"), &code("GBP"), c), None);
        let d = exchange(&rates, &code("EUR"), &code("CLP"), a).unwrap();
        assert_eq!(exchange(&rates, &code("EUR"), &code("USD"), Decimal::MAX), None);
        assert_eq!(d.to_string(), "100629");
    }

    #[test]
    fn rescale_and_zero() {
        let eur = currency_def("EUR").unwrap();
        assert_eq!(eur.rescale(dec!(1.005)), dec!(1.01));
        assert_eq!(eur.zero().to_string(), "0.00");
    }

    #[test]
    fn exchange_rate_rules() {
        assert!(ExchangeRate::new("USD", "RON", dec!(4.35)).validate().is_empty());
        assert_eq!(
            ExchangeRate::new("USD", "RON", dec!(0)).validate().to_string(),
            "amount: must be greater than 0."
        );
        assert_eq!(
            ExchangeRate::new("", "XYZ", dec!(-1)).validate().to_string(),
            "amount: must be greater than 0; from: cannot be blank; to: must be a valid value."
        );
    }
}
