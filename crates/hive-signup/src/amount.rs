//! Fixed-point amounts used for quoting and matching payments.
//!
//! HIVE is carried as integer milli-HIVE and USD as integer cents. Parsing is
//! integer-only; floats only appear when dividing by the exchange rate.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::constants::{HIVE_DECIMALS, HIVE_SYMBOL};
use crate::error::SignupError;

const USD_DECIMALS: u32 = 2;

/// Parse an unsigned decimal string into an integer scaled by `10^decimals`.
///
/// Rejects signs, exponents, whitespace and more than `decimals` fractional
/// digits instead of silently truncating them.
fn parse_fixed(input: &str, decimals: u32) -> Result<u64, String> {
    if input.is_empty() {
        return Err("empty magnitude".to_string());
    }

    let (integer_part, fractional_part) = match input.split_once('.') {
        Some((i, f)) => (i, f),
        None => (input, ""),
    };

    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(format!("'{input}' has no digits"));
    }
    if !integer_part.chars().all(|c| c.is_ascii_digit())
        || !fractional_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("'{input}' is not a plain decimal number"));
    }
    if fractional_part.len() > decimals as usize {
        return Err(format!(
            "'{input}' has more than {decimals} fractional digits"
        ));
    }

    let integer: u64 = if integer_part.is_empty() {
        0
    } else {
        integer_part
            .parse()
            .map_err(|e| format!("'{input}': integer part: {e}"))?
    };
    let fractional: u64 = if fractional_part.is_empty() {
        0
    } else {
        fractional_part
            .parse()
            .map_err(|e| format!("'{input}': fractional part: {e}"))?
    };

    let scale = 10u64.pow(decimals - fractional_part.len() as u32);
    integer
        .checked_mul(10u64.pow(decimals))
        .and_then(|i| fractional.checked_mul(scale).and_then(|f| i.checked_add(f)))
        .ok_or_else(|| format!("'{input}' overflows"))
}

/// A HIVE amount in milli-HIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HiveAmount(u64);

impl HiveAmount {
    pub const fn from_milli(milli: u64) -> Self {
        Self(milli)
    }

    pub const fn milli(self) -> u64 {
        self.0
    }

    /// Value in whole HIVE. Only for display and JSON output.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Chain asset notation, e.g. `0.750 HIVE`.
    pub fn to_asset_string(self) -> String {
        format!("{self} {HIVE_SYMBOL}")
    }
}

impl fmt::Display for HiveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1_000, self.0 % 1_000)
    }
}

impl FromStr for HiveAmount {
    type Err = SignupError;

    /// Parses a bare magnitude such as `1.000` or `10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s.trim(), HIVE_DECIMALS)
            .map(Self)
            .map_err(SignupError::MalformedAmount)
    }
}

impl Serialize for HiveAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// A USD amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UsdAmount(u64);

impl UsdAmount {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for UsdAmount {
    type Err = SignupError;

    /// Accepts `3`, `3.5`, `3.00` and `$3.00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);
        parse_fixed(digits, USD_DECIMALS)
            .map(Self)
            .map_err(|e| SignupError::MalformedAmount(format!("invalid USD price: {e}")))
    }
}

impl Serialize for UsdAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// A transfer amount as reported by the chain: `<magnitude> <SYMBOL>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAmount {
    pub amount: HiveAmount,
    pub symbol: String,
}

impl AssetAmount {
    pub fn is_hive(&self) -> bool {
        self.symbol == HIVE_SYMBOL
    }
}

impl FromStr for AssetAmount {
    type Err = SignupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(magnitude), Some(symbol), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(SignupError::MalformedAmount(format!(
                "expected '<magnitude> <UNIT>', got '{s}'"
            )));
        };

        if !symbol.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(SignupError::MalformedAmount(format!(
                "invalid unit '{symbol}'"
            )));
        }

        let amount = parse_fixed(magnitude, HIVE_DECIMALS)
            .map(HiveAmount)
            .map_err(SignupError::MalformedAmount)?;

        Ok(Self {
            amount,
            symbol: symbol.to_string(),
        })
    }
}
