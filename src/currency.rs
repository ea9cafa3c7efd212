//! Display formatting of amounts in the supported currencies.
//!
//! Amounts are rounded to whole currency units and rendered with the grouping,
//! digits and symbol placement of the currency's locale. No conversion between
//! currencies is performed.

use crate::error::{EmiError, EmiResult};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BENGALI_DIGITS: [char; 10] = ['০', '১', '২', '৩', '৪', '৫', '৬', '৭', '৮', '৯'];

/// A currency the formatter knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Bangladeshi taka.
    #[default]
    Bdt,
    /// US dollar.
    Usd,
}

/// Numerals used when rendering digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitSystem {
    /// 0123456789.
    Latin,
    /// ০১২৩৪৫৬৭৮৯.
    Bengali,
}

/// Digit grouping of the integer part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Groups of three: 1,234,567.
    Thousands,
    /// Three, then groups of two: 12,34,567.
    Indian,
}

/// Where the currency symbol sits relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPlacement {
    /// Before the number, after any sign: `-$5`.
    Prefix,
    /// After the number: `-৫৳`.
    Suffix,
}

/// Per-currency rendering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyFormat {
    /// BCP 47 locale the rules follow, e.g. `en-US`.
    pub locale: &'static str,
    /// ISO 4217 currency code.
    pub code: &'static str,
    /// Display symbol, e.g. `$`.
    pub symbol: &'static str,
    /// Numerals used for digits.
    pub digits: DigitSystem,
    /// Grouping of the integer part.
    pub grouping: Grouping,
    /// Position of the symbol.
    pub placement: SymbolPlacement,
}

const BDT_FORMAT: CurrencyFormat = CurrencyFormat {
    locale: "bn-BD",
    code: "BDT",
    symbol: "৳",
    digits: DigitSystem::Bengali,
    grouping: Grouping::Indian,
    placement: SymbolPlacement::Suffix,
};

const USD_FORMAT: CurrencyFormat = CurrencyFormat {
    locale: "en-US",
    code: "USD",
    symbol: "$",
    digits: DigitSystem::Latin,
    grouping: Grouping::Thousands,
    placement: SymbolPlacement::Prefix,
};

impl Currency {
    /// Every supported currency.
    pub const ALL: [Currency; 2] = [Currency::Bdt, Currency::Usd];

    /// The rendering rules for this currency.
    pub fn format_rules(self) -> &'static CurrencyFormat {
        match self {
            Currency::Bdt => &BDT_FORMAT,
            Currency::Usd => &USD_FORMAT,
        }
    }

    /// ISO 4217 code, e.g. `BDT`.
    pub fn code(self) -> &'static str {
        self.format_rules().code
    }

    /// Locale the amounts are formatted for.
    pub fn locale(self) -> &'static str {
        self.format_rules().locale
    }

    /// Display symbol: `৳` for BDT, `$` for USD.
    pub fn symbol(self) -> &'static str {
        self.format_rules().symbol
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = EmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EmiError::invalid("currency", format!("unsupported currency '{wanted}'")))
    }
}

/// Formats an amount as a whole-unit currency string, e.g. `$2,028` or `২,০২৮৳`.
///
/// Fractions are rounded half away from zero. Any negative amount keeps its sign,
/// even one that rounds to zero (`-0.4` renders as `-$0`).
///
/// # Errors
///
/// Returns `NumericDegeneracy` if `amount` is not finite or too large for a
/// `Decimal`.
pub fn format_amount(amount: f64, currency: Currency) -> EmiResult<String> {
    let rules = currency.format_rules();
    let value = Decimal::from_f64(amount).ok_or_else(|| {
        EmiError::NumericDegeneracy(format!("cannot format {amount} as {}", rules.code))
    })?;
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = amount.is_sign_negative();

    let grouped = group_digits(&rounded.abs().to_string(), rules.grouping);
    let number = localize_digits(&grouped, rules.digits);
    let sign = if negative { "-" } else { "" };

    Ok(match rules.placement {
        SymbolPlacement::Prefix => format!("{sign}{}{number}", rules.symbol),
        SymbolPlacement::Suffix => format!("{sign}{number}{}", rules.symbol),
    })
}

fn group_digits(digits: &str, grouping: Grouping) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(len - 3);
    let step = match grouping {
        Grouping::Thousands => 3,
        Grouping::Indian => 2,
    };

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}

fn localize_digits(text: &str, digits: DigitSystem) -> String {
    match digits {
        DigitSystem::Latin => text.to_string(),
        DigitSystem::Bengali => text
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => BENGALI_DIGITS[d as usize],
                None => c,
            })
            .collect(),
    }
}
