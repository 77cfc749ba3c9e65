use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;

pub mod cache;
pub mod convert;
pub mod currency;
pub mod error;
pub mod provider;
pub mod rates;

pub use cache::{CacheEntry, RateCache};
pub use convert::{ConversionRequest, convert};
pub use currency::{CurrencyCode, CurrencyRegistry};
pub use error::{CacheError, ConversionError, Error, ProviderError};
pub use provider::{CurrencyLayer, RateSource};
pub use rates::RateTable;

pub const LOG_FILE_NAME: &str = "currency_converter.log";

/// Convert an amount between currencies using currencylayer's USD-based rates.
///
/// Rates are fetched at most once per day and kept in a cache file in the data directory. Any
/// of FROM, TO and AMOUNT left out is asked for interactively.
#[derive(Parser)]
pub struct Cli {
    /// Currency to convert from (e.g. EUR)
    #[arg(value_name = "FROM")]
    pub from: Option<String>,
    /// Currency to convert to (e.g. GBP)
    #[arg(value_name = "TO")]
    pub to: Option<String>,
    /// Amount to convert
    #[arg(value_name = "AMOUNT")]
    pub amount: Option<Decimal>,

    /// currencylayer access key
    #[arg(long, env = "CURRENCYLAYER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory holding the rate cache
    #[arg(long, env = "FX_PIVOT_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// List of accepted currency codes (JSON array of {"code": ...}, or an HTML table)
    #[arg(long, env = "FX_PIVOT_CURRENCIES", default_value = "currencies.json")]
    pub currencies: PathBuf,

    /// Root URL of the quote provider
    #[arg(long, env = "CURRENCYLAYER_BASE_URL", default_value = provider::CURRENCYLAYER_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = provider::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Log file, appended to alongside stderr [default: <DATA_DIR>/currency_converter.log]
    #[arg(long, env = "FX_PIVOT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Fetch fresh rates even if today's are cached
    #[clap(short, long)]
    pub refresh: bool,
}

impl Cli {
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_FILE_NAME))
    }

    /// The configured access key; missing or blank is a configuration error.
    pub fn credential(&self) -> Result<&str, Error> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "API key not found. Set CURRENCYLAYER_API_KEY in a .env file or pass --api-key."
                        .to_string(),
                )
            })
    }
}
