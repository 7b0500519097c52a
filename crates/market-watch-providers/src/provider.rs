use async_trait::async_trait;
use market_watch_core::bar::{Interval, Lookback, PriceBar};
use rust_decimal::Decimal;

use crate::error::ProviderError;

/// Trait for fetching OHLCV bars from an external quote source.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch bars for a symbol covering `lookback` at the given interval.
    /// An empty vec means the provider had nothing for that window.
    async fn fetch_bars(
        &self,
        symbol: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    /// Market capitalization, if the provider publishes one.
    async fn fetch_market_cap(&self, _symbol: &str) -> Result<Option<Decimal>, ProviderError> {
        Ok(None)
    }
}
