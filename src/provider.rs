use crate::error::ProviderError;
use crate::rates::RateTable;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};
use ureq::Agent;

pub const CURRENCYLAYER_BASE_URL: &str = "https://api.currencylayer.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can produce a full USD-based rate table.
pub trait RateSource {
    fn fetch(&self, credential: &str) -> Result<RateTable, ProviderError>;
}

/// The currencylayer "live" endpoint.
///
/// The free tier only quotes against USD and returns every supported currency when none are
/// requested, so one call covers any conversion for the day.
pub struct CurrencyLayer {
    agent: Agent,
    base_url: String,
}

impl CurrencyLayer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl RateSource for CurrencyLayer {
    fn fetch(&self, credential: &str) -> Result<RateTable, ProviderError> {
        info!(base_url = %self.base_url, "requesting live exchange rates");
        let mut resp = self
            .agent
            .get(format!("{}/live", self.base_url))
            .query("access_key", credential)
            .query("format", "1")
            .call()
            .inspect_err(|e| error!(error = %e, "rate request failed"))?;
        let status = resp.status();
        let body = resp
            .body_mut()
            .read_to_string()
            .inspect_err(|e| error!(error = %e, "failed to read rate response"))?;

        // Error replies usually still carry a JSON reason, whatever the status
        let live: LiveResponse = match serde_json::from_str(&body) {
            Ok(live) => live,
            Err(_) if !status.is_success() => {
                error!(%status, "provider returned a non-JSON error");
                return Err(ureq::Error::StatusCode(status.as_u16()).into());
            }
            Err(e) => return Err(ProviderError::Malformed(e.to_string())),
        };
        let table = live.into_rates()?;
        info!(count = table.len(), "exchange rates received");
        Ok(table)
    }
}

#[derive(Deserialize)]
struct LiveResponse {
    #[serde(default)]
    success: bool,
    source: Option<String>,
    quotes: Option<RateTable>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    info: Option<String>,
}

impl LiveResponse {
    fn into_rates(self) -> Result<RateTable, ProviderError> {
        if !self.success {
            let reason = self
                .error
                .and_then(|e| e.info)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(%reason, "provider returned an error");
            return Err(ProviderError::Rejected(reason));
        }
        if let Some(source) = self.source.filter(|source| source != "USD") {
            return Err(ProviderError::Malformed(format!(
                "rates quoted against {source}, expected USD"
            )));
        }
        self.quotes
            .ok_or_else(|| ProviderError::Malformed("missing 'quotes'".to_string()))
    }
}
