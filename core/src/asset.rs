//! Fixed-point asset types
//!
//! Amounts are raw `i64` integers scaled by the symbol precision, so
//! `1.00000000 UDAO` is stored as `100_000_000` with precision 8.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

/// Largest magnitude a valid asset amount may carry (2^62 - 1)
pub const MAX_ASSET_AMOUNT: i64 = (1 << 62) - 1;

/// Largest supported decimal precision
pub const MAX_PRECISION: u8 = 18;

/// Memo size limit for issue, retire and transfer
pub const MAX_MEMO_BYTES: usize = 256;

const MAX_NAME_LEN: usize = 12;
const MAX_SYMBOL_CODE_LEN: usize = 7;

/// Account identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Accepts 1-12 characters of `a-z`, `1-5` and `.`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let well_formed = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '1'..='5' | '.'));

        if !well_formed {
            return Err(LedgerError::InvalidName(name));
        }
        Ok(Name(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Name::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Name::new(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

/// Ticker part of a symbol, e.g. `UDAO`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolCode(String);

impl SymbolCode {
    /// Accepts 1-7 uppercase ASCII letters
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let well_formed = !code.is_empty()
            && code.len() <= MAX_SYMBOL_CODE_LEN
            && code.chars().all(|c| c.is_ascii_uppercase());

        if !well_formed {
            return Err(LedgerError::InvalidSymbol(code));
        }
        Ok(SymbolCode(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SymbolCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        SymbolCode::new(s)
    }
}

impl TryFrom<String> for SymbolCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        SymbolCode::new(value)
    }
}

impl From<SymbolCode> for String {
    fn from(code: SymbolCode) -> Self {
        code.0
    }
}

/// Symbol code plus decimal precision. Textual form is `"8,UDAO"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSymbol")]
pub struct Symbol {
    pub precision: u8,
    pub code: SymbolCode,
}

impl Symbol {
    pub fn new(precision: u8, code: SymbolCode) -> Result<Self> {
        if precision > MAX_PRECISION {
            return Err(LedgerError::InvalidSymbol(format!(
                "precision {} exceeds {}",
                precision, MAX_PRECISION
            )));
        }
        Ok(Symbol { precision, code })
    }

    pub fn code(&self) -> &SymbolCode {
        &self.code
    }

    pub fn is_valid(&self) -> bool {
        self.precision <= MAX_PRECISION && SymbolCode::new(self.code.as_str()).is_ok()
    }

    /// Raw units in one whole token
    pub fn unit(&self) -> i128 {
        10i128.pow(u32::from(self.precision))
    }

    /// Fails with `SymbolMismatch` unless `other` is the same symbol
    pub fn ensure_matches(&self, other: &Symbol) -> Result<()> {
        if self != other {
            return Err(LedgerError::SymbolMismatch {
                expected: self.to_string(),
                got: other.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawSymbol {
    precision: u8,
    code: SymbolCode,
}

impl TryFrom<RawSymbol> for Symbol {
    type Error = LedgerError;

    fn try_from(raw: RawSymbol) -> Result<Self> {
        Symbol::new(raw.precision, raw.code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for Symbol {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| LedgerError::InvalidSymbol(s.to_string()))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|_| LedgerError::InvalidSymbol(s.to_string()))?;
        Symbol::new(precision, code.trim().parse()?)
    }
}

/// Fixed-point quantity of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAsset")]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Asset { amount, symbol }
    }

    pub fn zero(symbol: Symbol) -> Self {
        Asset { amount: 0, symbol }
    }

    pub fn is_amount_within_range(&self) -> bool {
        (-MAX_ASSET_AMOUNT..=MAX_ASSET_AMOUNT).contains(&self.amount)
    }

    pub fn is_valid(&self) -> bool {
        self.is_amount_within_range() && self.symbol.is_valid()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset> {
        self.symbol.ensure_matches(&other.symbol)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(LedgerError::Overflow)?;
        self.with_amount(amount)
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset> {
        self.symbol.ensure_matches(&other.symbol)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(LedgerError::Overflow)?;
        self.with_amount(amount)
    }

    pub fn checked_mul(&self, factor: i64) -> Result<Asset> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or(LedgerError::Overflow)?;
        self.with_amount(amount)
    }

    /// Integer division, truncating toward zero
    pub fn checked_div(&self, divisor: i64) -> Result<Asset> {
        if divisor == 0 {
            return Err(LedgerError::InvalidAmount("divide by zero".to_string()));
        }
        let amount = self
            .amount
            .checked_div(divisor)
            .ok_or(LedgerError::Overflow)?;
        self.with_amount(amount)
    }

    fn with_amount(&self, amount: i64) -> Result<Asset> {
        let result = Asset::new(amount, self.symbol.clone());
        if !result.is_amount_within_range() {
            return Err(LedgerError::Overflow);
        }
        Ok(result)
    }
}

#[derive(Deserialize)]
struct RawAsset {
    amount: i64,
    symbol: Symbol,
}

impl TryFrom<RawAsset> for Asset {
    type Error = LedgerError;

    fn try_from(raw: RawAsset) -> Result<Self> {
        let asset = Asset::new(raw.amount, raw.symbol);
        if !asset.is_amount_within_range() {
            return Err(LedgerError::Overflow);
        }
        Ok(asset)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hand-built symbols can skip `Symbol::new`
        if !self.symbol.is_valid() {
            return write!(f, "{} {}", self.amount, self.symbol);
        }

        let unit = self.symbol.unit();
        let magnitude = i128::from(self.amount).abs();
        let sign = if self.amount < 0 { "-" } else { "" };
        let whole = magnitude / unit;

        if self.symbol.precision == 0 {
            return write!(f, "{}{} {}", sign, whole, self.symbol.code);
        }

        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            whole,
            magnitude % unit,
            self.symbol.code,
            width = usize::from(self.symbol.precision)
        )
    }
}

impl FromStr for Asset {
    type Err = LedgerError;

    /// Parses `"21000000.00000000 UDAO"`; the number of fraction digits
    /// sets the precision.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || LedgerError::InvalidAmount(format!("malformed asset: {}", s));

        let (number, code) = s.trim().split_once(' ').ok_or_else(malformed)?;
        let code: SymbolCode = code.trim().parse()?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }

        let precision = u8::try_from(fraction.len()).map_err(|_| malformed())?;
        let symbol = Symbol::new(precision, code)?;

        let magnitude: i64 = format!("{}{}", whole, fraction)
            .parse()
            .map_err(|_| LedgerError::Overflow)?;
        let asset = Asset::new(if negative { -magnitude } else { magnitude }, symbol);

        if !asset.is_amount_within_range() {
            return Err(LedgerError::Overflow);
        }
        Ok(asset)
    }
}
