//! Currencies and fungible asset values.
//!
//! Amounts are raw integers in the currency's smallest unit; a currency's
//! `decimal_places` fixes how many of those units make one major unit. A
//! ticker has one declared precision in the ledger; values at any other
//! precision, and arithmetic mixing two currencies, fail with
//! [`ActionError::CurrencyMismatch`].

use crate::{
    codec::{read_string, string_encode_size, write_string},
    constants::{MAX_DECIMAL_PLACES, MAX_TICKER_LENGTH},
    ActionError, Precondition,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use std::fmt;

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Currency {
    pub ticker: String,
    pub decimal_places: u8,
}

impl Currency {
    pub fn new(ticker: impl Into<String>, decimal_places: u8) -> Self {
        debug_assert!(decimal_places <= MAX_DECIMAL_PLACES);
        Self {
            ticker: ticker.into(),
            decimal_places,
        }
    }

    pub fn zero(&self) -> FungibleAssetValue {
        FungibleAssetValue::new(self.clone(), 0)
    }

    /// Value of `major` whole units.
    pub fn units(&self, major: u128) -> FungibleAssetValue {
        FungibleAssetValue::new(self.clone(), major.saturating_mul(self.scale()))
    }

    fn scale(&self) -> u128 {
        10u128.pow(self.decimal_places.min(MAX_DECIMAL_PLACES) as u32)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (decimals: {})", self.ticker, self.decimal_places)
    }
}

impl Write for Currency {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.ticker, writer);
        self.decimal_places.write(writer);
    }
}

impl Read for Currency {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let ticker = read_string(reader, MAX_TICKER_LENGTH)?;
        let decimal_places = u8::read(reader)?;
        if decimal_places > MAX_DECIMAL_PLACES {
            return Err(Error::Invalid("Currency", "too many decimal places"));
        }
        Ok(Self {
            ticker,
            decimal_places,
        })
    }
}

impl EncodeSize for Currency {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.ticker) + self.decimal_places.encode_size()
    }
}

/// An amount of a specific currency.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FungibleAssetValue {
    pub currency: Currency,
    pub raw: u128,
}

impl FungibleAssetValue {
    pub fn new(currency: Currency, raw: u128) -> Self {
        Self { currency, raw }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Fails unless this value is denominated in `currency`.
    pub fn ensure_currency(&self, currency: &Currency) -> Result<(), ActionError> {
        if &self.currency != currency {
            return Err(ActionError::CurrencyMismatch {
                expected: currency.clone(),
                got: self.currency.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, ActionError> {
        other.ensure_currency(&self.currency)?;
        let raw = self
            .raw
            .checked_add(other.raw)
            .ok_or(Precondition::AmountOutOfRange)?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, ActionError> {
        other.ensure_currency(&self.currency)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or(Precondition::AmountOutOfRange)?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    pub fn checked_mul(&self, factor: u128) -> Result<Self, ActionError> {
        let raw = self
            .raw
            .checked_mul(factor)
            .ok_or(Precondition::AmountOutOfRange)?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    /// Integer quotient and remainder of the raw amount. `divisor` must be non-zero.
    pub fn div_rem(&self, divisor: u128) -> (Self, Self) {
        (
            Self::new(self.currency.clone(), self.raw / divisor),
            Self::new(self.currency.clone(), self.raw % divisor),
        )
    }
}

impl fmt::Display for FungibleAssetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.decimal_places as usize;
        if places == 0 {
            return write!(f, "{} {}", self.raw, self.currency.ticker);
        }
        let scale = self.currency.scale();
        write!(
            f,
            "{}.{:0places$} {}",
            self.raw / scale,
            self.raw % scale,
            self.currency.ticker,
        )
    }
}

impl Write for FungibleAssetValue {
    fn write(&self, writer: &mut impl BufMut) {
        self.currency.write(writer);
        self.raw.write(writer);
    }
}

impl Read for FungibleAssetValue {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            currency: Currency::read(reader)?,
            raw: u128::read(reader)?,
        })
    }
}

impl EncodeSize for FungibleAssetValue {
    fn encode_size(&self) -> usize {
        self.currency.encode_size() + self.raw.encode_size()
    }
}
