use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minor units in one major unit for the currencies we settle in.
const MINOR_UNIT_SCALE: u32 = 2;

/// A strictly positive charge expressed in minor units (paise, cents).
///
/// Gateways take integer minor units, so the amount is never stored as a
/// fractional value. Use [`Amount::to_major`] when a human-facing rendering is
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(minor_units: i64) -> Result<Self, PaymentError> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(PaymentError::InvalidAmount(minor_units))
        }
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Renders the amount in major units, e.g. `49900` paise as `499.00`.
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }
}

impl TryFrom<i64> for Amount {
    type Error = PaymentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// ISO 4217 alphabetic currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, PaymentError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Invalid currency code: {:?}",
                code
            )))
        }
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
