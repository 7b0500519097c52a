use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use market_watch_core::bar::{Interval, Lookback, PriceBar};
use market_watch_core::quote::Resolution;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{NotAvailable, ProviderError};
use crate::provider::QuoteProvider;

/// Latest bar for a symbol plus the open of the period it was sampled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestQuote {
    pub symbol: String,
    pub bar: PriceBar,
    pub period_open: Decimal,
    pub resolution: Resolution,
}

impl LatestQuote {
    fn from_series(symbol: &str, bars: &[PriceBar], resolution: Resolution) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;
        Some(Self {
            symbol: symbol.to_string(),
            bar: last.clone(),
            period_open: first.open,
            resolution,
        })
    }
}

/// Sort ascending by timestamp and drop repeated timestamps (first one wins).
pub fn normalize(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}

/// Stateless front for a [`QuoteProvider`]: bounds every call with a timeout,
/// orders the returned bars, and applies the intraday-to-daily fallback.
#[derive(Clone)]
pub struct QuoteSource {
    provider: Arc<dyn QuoteProvider>,
    timeout: Duration,
}

impl QuoteSource {
    pub fn new(provider: Arc<dyn QuoteProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.timeout)))
    }

    async fn bars(
        &self,
        symbol: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let bars = self
            .bounded(self.provider.fetch_bars(symbol, lookback, interval))
            .await?;
        Ok(normalize(bars))
    }

    /// Latest quote for `symbol` from today's 1-minute bars.
    ///
    /// An empty intraday series falls back to today's daily bar. A failed
    /// intraday request does not.
    pub async fn fetch_latest(&self, symbol: &str) -> Result<LatestQuote, NotAvailable> {
        let today = Lookback::days(1);

        let intraday = self
            .bars(symbol, today, Interval::OneMinute)
            .await
            .map_err(|e| NotAvailable::new(symbol, e))?;
        if let Some(quote) = LatestQuote::from_series(symbol, &intraday, Resolution::Intraday) {
            return Ok(quote);
        }

        debug!("{symbol}: intraday series empty, falling back to daily bar");
        let daily = self
            .bars(symbol, today, Interval::OneDay)
            .await
            .map_err(|e| NotAvailable::new(symbol, e))?;

        LatestQuote::from_series(symbol, &daily, Resolution::Daily).ok_or_else(|| {
            NotAvailable::new(
                symbol,
                ProviderError::Empty {
                    symbol: symbol.to_string(),
                    interval: Interval::OneDay,
                },
            )
        })
    }

    /// Intraday-only latest quote, used for benchmark indices.
    pub async fn fetch_intraday(&self, symbol: &str) -> Result<LatestQuote, NotAvailable> {
        let bars = self
            .bars(symbol, Lookback::days(1), Interval::OneMinute)
            .await
            .map_err(|e| NotAvailable::new(symbol, e))?;
        LatestQuote::from_series(symbol, &bars, Resolution::Intraday).ok_or_else(|| {
            NotAvailable::new(
                symbol,
                ProviderError::Empty {
                    symbol: symbol.to_string(),
                    interval: Interval::OneMinute,
                },
            )
        })
    }

    /// Ordered bars over `lookback`. Empty when the provider fails or has nothing.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Vec<PriceBar> {
        match self.bars(symbol, lookback, interval).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!("{symbol}: history fetch ({lookback}, {interval}) failed: {e}");
                Vec::new()
            }
        }
    }

    /// Provider-reported market capitalization, `None` if unknown or failed.
    pub async fn fetch_market_cap(&self, symbol: &str) -> Option<Decimal> {
        match self.bounded(self.provider.fetch_market_cap(symbol)).await {
            Ok(cap) => cap,
            Err(e) => {
                debug!("{symbol}: market cap unavailable: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap() + ChronoDuration::minutes(minute)
    }

    fn bar(minute: i64, open: Decimal, close: Decimal) -> PriceBar {
        PriceBar {
            timestamp: at(minute),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 100,
        }
    }

    fn source(provider: &Arc<InMemoryProvider>) -> QuoteSource {
        QuoteSource::new(provider.clone(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn latest_uses_first_open_and_last_close() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars(
            "AAPL",
            Interval::OneMinute,
            vec![
                bar(2, dec!(96), dec!(100)),
                bar(0, dec!(95), dec!(96)),
                bar(1, dec!(96), dec!(96)),
            ],
        );

        let quote = source(&provider).fetch_latest("AAPL").await.unwrap();
        assert_eq!(quote.period_open, dec!(95));
        assert_eq!(quote.bar.close, dec!(100));
        assert_eq!(quote.resolution, Resolution::Intraday);
        assert_eq!(provider.calls(), vec![("AAPL".to_string(), Interval::OneMinute)]);
    }

    #[tokio::test]
    async fn empty_intraday_falls_back_to_daily() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars("MSFT", Interval::OneDay, vec![bar(0, dec!(400), dec!(404))]);

        let quote = source(&provider).fetch_latest("MSFT").await.unwrap();
        assert_eq!(quote.resolution, Resolution::Daily);
        assert_eq!(quote.period_open, dec!(400));
        assert_eq!(
            provider.calls(),
            vec![
                ("MSFT".to_string(), Interval::OneMinute),
                ("MSFT".to_string(), Interval::OneDay),
            ]
        );
    }

    #[tokio::test]
    async fn both_empty_is_not_available() {
        let provider = Arc::new(InMemoryProvider::new());
        let err = source(&provider).fetch_latest("META").await.unwrap_err();
        assert_eq!(err.symbol, "META");
        assert!(matches!(
            err.reason,
            ProviderError::Empty {
                interval: Interval::OneDay,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn intraday_error_skips_fallback() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail("NFLX", Interval::OneMinute, "boom");
        provider.set_bars("NFLX", Interval::OneDay, vec![bar(0, dec!(1), dec!(2))]);

        let err = source(&provider).fetch_latest("NFLX").await.unwrap_err();
        assert!(matches!(err.reason, ProviderError::Api { status: 503, .. }));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.stall("TSLA", Interval::OneMinute, Duration::from_secs(30));

        let started = std::time::Instant::now();
        let err = source(&provider).fetch_latest("TSLA").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn history_is_sorted_and_deduplicated() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars(
            "GOOGL",
            Interval::FiveMinutes,
            vec![
                bar(10, dec!(3), dec!(3)),
                bar(0, dec!(1), dec!(1)),
                bar(5, dec!(2), dec!(2)),
                bar(5, dec!(9), dec!(9)),
            ],
        );

        let bars = source(&provider)
            .fetch_history("GOOGL", Lookback::days(7), Interval::FiveMinutes)
            .await;
        let closes: Vec<_> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(closes[0], dec!(1));
        assert_eq!(closes[2], dec!(3));
    }

    #[tokio::test]
    async fn failed_history_is_empty() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail("AMZN", Interval::FiveMinutes, "down");
        let bars = source(&provider)
            .fetch_history("AMZN", Lookback::days(7), Interval::FiveMinutes)
            .await;
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn market_cap_passthrough() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_market_cap("AAPL", dec!(3000000000000));
        let source = source(&provider);
        assert_eq!(
            source.fetch_market_cap("AAPL").await,
            Some(dec!(3000000000000))
        );
        assert_eq!(source.fetch_market_cap("MSFT").await, None);
    }
}
