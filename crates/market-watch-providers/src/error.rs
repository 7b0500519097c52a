use std::time::Duration;

use market_watch_core::bar::Interval;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No {interval} bars returned for {symbol}")]
    Empty { symbol: String, interval: Interval },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// A symbol could not be quoted this cycle. Recovered by the caller, never fatal.
#[derive(Debug, Error)]
#[error("{symbol} not available: {reason}")]
pub struct NotAvailable {
    pub symbol: String,
    pub reason: ProviderError,
}

impl NotAvailable {
    pub fn new(symbol: &str, reason: ProviderError) -> Self {
        Self {
            symbol: symbol.to_string(),
            reason,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, ProviderError::Timeout(_))
    }
}
