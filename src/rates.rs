use crate::currency::CurrencyCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// USD-based exchange rates: units of each quote currency per 1 USD.
///
/// On the wire (provider response and cache file) this is a JSON object keyed by `"USD<CODE>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct RateTable {
    quotes: BTreeMap<CurrencyCode, Decimal>,
}

impl RateTable {
    /// Rate of USD -> `quote`, if present.
    pub fn get(&self, quote: CurrencyCode) -> Option<Decimal> {
        self.quotes.get(&quote).copied()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl FromIterator<(CurrencyCode, Decimal)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (CurrencyCode, Decimal)>>(iter: I) -> Self {
        Self {
            quotes: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, f64>> for RateTable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, value)| {
                let quote = key
                    .strip_prefix("USD")
                    .ok_or_else(|| format!("quote key '{key}' is not USD-based"))?
                    .parse::<CurrencyCode>()
                    .map_err(|e| format!("quote key '{key}': {e}"))?;
                let rate = Decimal::try_from(value)
                    .map_err(|e| format!("quote {key} = {value}: {e}"))?;
                Ok((quote, rate))
            })
            .collect()
    }
}

impl From<RateTable> for BTreeMap<String, f64> {
    fn from(table: RateTable) -> Self {
        table
            .quotes
            .into_iter()
            .filter_map(|(quote, rate)| Some((format!("USD{quote}"), rate.to_f64()?)))
            .collect()
    }
}
