use crate::currency::CurrencyCode;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure to obtain a rate table from the quote provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout, or an HTTP error status.
    #[error("failure while accessing the quote provider: {0}")]
    Http(#[from] ureq::Error),

    /// The provider answered with `"success": false`.
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    /// The payload did not have the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Failure to read or write the rate cache file. Never shown to the user.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to convert with the rates at hand.
#[derive(Debug, PartialEq, Error)]
pub enum ConversionError {
    /// No USD rate for the listed currencies, in from/to order.
    #[error("no rate for USD -> {}", join_codes(.0))]
    MissingRate(Vec<CurrencyCode>),

    /// A USD rate that is zero or negative.
    #[error("invalid rate {rate} for USD -> {code}")]
    InvalidRate { code: CurrencyCode, rate: Decimal },

    #[error("amount is out of range")]
    Overflow,
}

/// Top level error, mapped to an exit code in `main`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to get exchange rates: {0}")]
    Provider(#[from] ProviderError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

impl Error {
    /// Whether the run should end abnormally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Provider(_))
    }

    /// Process exit status: 1 for fatal errors, 2 when only the conversion was abandoned.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() { 1 } else { 2 }
    }
}

fn join_codes(codes: &[CurrencyCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rate_lists_every_code() {
        let err = ConversionError::MissingRate(vec![
            "EUR".parse().unwrap(),
            "GBP".parse().unwrap(),
        ]);
        assert_eq!(err.to_string(), "no rate for USD -> EUR, GBP");
    }

    #[test]
    fn fatal_kinds() {
        assert!(Error::Config("no key".into()).is_fatal());
        assert!(Error::Provider(ProviderError::Rejected("x".into())).is_fatal());
        assert!(!Error::Validation("bad code".into()).is_fatal());
        assert!(!Error::Conversion(ConversionError::MissingRate(vec![])).is_fatal());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Error::Config("no key".into()).exit_code(), 1);
        assert_eq!(
            Error::Provider(ProviderError::Malformed("x".into())).exit_code(),
            1
        );
        assert_eq!(Error::Validation("bad amount".into()).exit_code(), 2);
        assert_eq!(Error::Conversion(ConversionError::Overflow).exit_code(), 2);
    }
}
