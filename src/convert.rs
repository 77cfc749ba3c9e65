use crate::currency::{CurrencyCode, CurrencyRegistry};
use crate::error::{ConversionError, Error};
use crate::rates::RateTable;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Results are rounded to cents, halves away from zero.
fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert `amount` of `from` into `to`, through USD since every rate is quoted against it.
pub fn convert(
    from: CurrencyCode,
    to: CurrencyCode,
    amount: Decimal,
    rates: &RateTable,
) -> Result<Decimal, ConversionError> {
    if from == to {
        return Ok(round_cents(amount));
    }

    let missing: Vec<CurrencyCode> = [from, to]
        .into_iter()
        .filter(|&code| code != CurrencyCode::USD && rates.get(code).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(ConversionError::MissingRate(missing));
    }

    let usd_amount = if from == CurrencyCode::USD {
        amount
    } else {
        amount
            .checked_div(usd_rate(rates, from)?)
            .ok_or(ConversionError::Overflow)?
    };
    let converted = if to == CurrencyCode::USD {
        usd_amount
    } else {
        usd_amount
            .checked_mul(usd_rate(rates, to)?)
            .ok_or(ConversionError::Overflow)?
    };
    debug!(%from, %to, %amount, %converted, "converted through USD");
    Ok(round_cents(converted))
}

fn usd_rate(rates: &RateTable, code: CurrencyCode) -> Result<Decimal, ConversionError> {
    match rates.get(code) {
        None => Err(ConversionError::MissingRate(vec![code])),
        Some(rate) if rate <= Decimal::ZERO => Err(ConversionError::InvalidRate { code, rate }),
        Some(rate) => Ok(rate),
    }
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
}

impl ConversionRequest {
    /// Check both codes against `registry` and require a non-negative amount.
    pub fn new(
        registry: &CurrencyRegistry,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<Self, Error> {
        if !(registry.is_valid(from) && registry.is_valid(to)) {
            return Err(Error::Validation("Invalid currency code.".to_string()));
        }
        if amount < Decimal::ZERO {
            return Err(Error::Validation(
                "Invalid amount. Must not be negative.".to_string(),
            ));
        }
        Ok(Self {
            from: from.parse().map_err(Error::Validation)?,
            to: to.parse().map_err(Error::Validation)?,
            amount,
        })
    }

    pub fn convert(&self, rates: &RateTable) -> Result<Decimal, ConversionError> {
        convert(self.from, self.to, self.amount, rates)
    }

    /// The line shown to the user, e.g. `100 EUR = 83.33 GBP`.
    pub fn describe(&self, result: Decimal) -> String {
        format!("{} {} = {result} {}", self.amount, self.from, self.to)
    }
}
