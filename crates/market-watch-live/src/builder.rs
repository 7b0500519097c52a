use std::collections::HashMap;

use chrono::Utc;
use futures::future::join_all;
use market_watch_core::config::Benchmark;
use market_watch_core::profile::CompanyProfile;
use market_watch_core::quote::{self, PriorPrice, QuoteSnapshot};
use market_watch_core::snapshot::{BenchmarkQuote, MarketSnapshot};
use market_watch_providers::error::NotAvailable;
use market_watch_providers::source::QuoteSource;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Last price seen per symbol, used to flag changes between cycles.
#[derive(Debug, Clone, Default)]
pub struct LastPrices {
    seeded: bool,
    prices: HashMap<&'static str, Decimal>,
}

impl LastPrices {
    pub fn prior(&self, symbol: &str) -> PriorPrice {
        if !self.seeded {
            return PriorPrice::FirstCycle;
        }
        match self.prices.get(symbol) {
            Some(price) => PriorPrice::Seen(*price),
            None => PriorPrice::Unseen,
        }
    }

    /// Remember every price in `snapshot`. Symbols absent from it keep their old price.
    pub fn record(&mut self, snapshot: &MarketSnapshot) {
        for q in &snapshot.quotes {
            self.prices.insert(q.symbol(), q.price());
        }
    }

    /// Called once a cycle has run, whatever its outcome.
    pub fn mark_seeded(&mut self) {
        self.seeded = true;
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}

/// Produces one [`MarketSnapshot`] per call from the current provider state.
pub struct SnapshotBuilder {
    source: QuoteSource,
    watchlist: Vec<&'static CompanyProfile>,
    benchmarks: Vec<Benchmark>,
}

impl SnapshotBuilder {
    pub fn new(source: QuoteSource, watchlist: Vec<&'static CompanyProfile>) -> Self {
        Self {
            source,
            watchlist,
            benchmarks: Vec::new(),
        }
    }

    pub fn with_benchmarks(mut self, benchmarks: Vec<Benchmark>) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    async fn fetch_row(
        &self,
        profile: &'static CompanyProfile,
        prior: PriorPrice,
    ) -> Result<QuoteSnapshot, NotAvailable> {
        let (latest, market_cap) = tokio::join!(
            self.source.fetch_latest(profile.symbol),
            self.source.fetch_market_cap(profile.symbol),
        );
        let latest = latest?;
        Ok(QuoteSnapshot::derive(
            profile,
            &latest.bar,
            latest.period_open,
            prior,
            market_cap,
            latest.resolution,
        ))
    }

    async fn fetch_benchmarks(&self) -> Vec<BenchmarkQuote> {
        let fetches = self
            .benchmarks
            .iter()
            .map(|b| self.source.fetch_intraday(&b.symbol));
        let results = join_all(fetches).await;

        self.benchmarks
            .iter()
            .zip(results)
            .filter_map(|(benchmark, result)| match result {
                Ok(latest) => Some(BenchmarkQuote {
                    name: benchmark.name.clone(),
                    symbol: benchmark.symbol.clone(),
                    value: latest.bar.close,
                    variation_pct: quote::variation_pct(latest.period_open, latest.bar.close)
                        .unwrap_or(Decimal::ZERO),
                }),
                Err(e) => {
                    debug!("benchmark {}: {e}", benchmark.name);
                    None
                }
            })
            .collect()
    }

    /// Fetch every watchlist symbol concurrently and merge the results in
    /// watchlist order. Symbols that fail are left out. `None` when none succeed.
    pub async fn build(&self, last: &LastPrices) -> Option<MarketSnapshot> {
        let fetches = self
            .watchlist
            .iter()
            .map(|&profile| self.fetch_row(profile, last.prior(profile.symbol)));
        let results = join_all(fetches).await;

        let mut quotes = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(row) => quotes.push(row),
                Err(e) => warn!("{e}"),
            }
        }

        if quotes.is_empty() {
            return None;
        }

        let benchmarks = self.fetch_benchmarks().await;
        Some(MarketSnapshot {
            taken_at: Utc::now(),
            quotes,
            benchmarks,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone};
    use market_watch_core::bar::{Interval, PriceBar};
    use market_watch_core::profile::lookup;
    use market_watch_core::quote::{MarketCap, Resolution};
    use market_watch_providers::memory::InMemoryProvider;
    use rust_decimal_macros::dec;

    pub(crate) static ALPHA: CompanyProfile = CompanyProfile {
        symbol: "A",
        name: "Alpha Corp.",
        sector: "Technology",
        sub_sector: "Software",
        country: "USA",
        description: "Test company A",
        founded: 2000,
        founders: "Ada",
        color: "#000000",
        weight: 1,
    };

    pub(crate) static BETA: CompanyProfile = CompanyProfile {
        symbol: "B",
        name: "Beta Inc.",
        sector: "Entertainment",
        sub_sector: "Streaming",
        country: "USA",
        description: "Test company B",
        founded: 2001,
        founders: "Bob",
        color: "#FFFFFF",
        weight: 1,
    };

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap() + chrono::Duration::minutes(minute)
    }

    /// Two-bar intraday series opening at `open` and closing at `close`.
    pub(crate) fn session(open: Decimal, close: Decimal) -> Vec<PriceBar> {
        vec![
            PriceBar {
                timestamp: at(0),
                open,
                high: open,
                low: open,
                close: open,
                volume: 500,
            },
            PriceBar {
                timestamp: at(1),
                open,
                high: close.max(open),
                low: close.min(open),
                close,
                volume: 700,
            },
        ]
    }

    pub(crate) fn source(provider: &Arc<InMemoryProvider>) -> QuoteSource {
        QuoteSource::new(provider.clone(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn omits_failed_symbols() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars("A", Interval::OneMinute, session(dec!(95), dec!(100)));
        provider.fail("B", Interval::OneMinute, "unavailable");

        let builder = SnapshotBuilder::new(source(&provider), vec![&ALPHA, &BETA]);
        let snapshot = builder.build(&LastPrices::default()).await.unwrap();

        assert_eq!(snapshot.quotes.len(), 1);
        let a = &snapshot.quotes[0];
        assert_eq!(a.symbol(), "A");
        assert_eq!(a.volume(), 700);
        assert!((a.variation_pct() - dec!(5.2631578947)).abs() < dec!(0.0000001));
        assert!(!a.price_changed());

        let summary = snapshot.summary();
        assert_eq!((summary.advancing, summary.present), (1, 1));
    }

    #[tokio::test]
    async fn all_failed_is_none() {
        let provider = Arc::new(InMemoryProvider::new());
        let builder = SnapshotBuilder::new(source(&provider), vec![&ALPHA, &BETA]);
        assert!(builder.build(&LastPrices::default()).await.is_none());
    }

    #[tokio::test]
    async fn keeps_watchlist_order() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars("A", Interval::OneMinute, session(dec!(1), dec!(2)));
        provider.set_bars("B", Interval::OneDay, session(dec!(3), dec!(4)));

        let builder = SnapshotBuilder::new(source(&provider), vec![&BETA, &ALPHA]);
        let snapshot = builder.build(&LastPrices::default()).await.unwrap();

        let symbols: Vec<_> = snapshot.quotes.iter().map(|q| q.symbol()).collect();
        assert_eq!(symbols, vec!["B", "A"]);
        assert_eq!(snapshot.quotes[0].resolution(), Resolution::Daily);
    }

    #[tokio::test]
    async fn attaches_reported_market_cap() {
        let provider = Arc::new(InMemoryProvider::new());
        let aapl = lookup("AAPL").unwrap();
        provider.set_bars("AAPL", Interval::OneMinute, session(dec!(200), dec!(210)));
        provider.set_market_cap("AAPL", dec!(3100000000000));

        let builder = SnapshotBuilder::new(source(&provider), vec![aapl]);
        let snapshot = builder.build(&LastPrices::default()).await.unwrap();
        assert_eq!(
            snapshot.quotes[0].market_cap(),
            MarketCap::Reported(dec!(3100000000000))
        );
        assert!(!snapshot.summary().market_cap_estimated);
    }

    #[tokio::test]
    async fn benchmarks_skip_unavailable() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_bars("A", Interval::OneMinute, session(dec!(1), dec!(1)));
        provider.set_bars("^IXIC", Interval::OneMinute, session(dec!(15000), dec!(15150)));

        let builder = SnapshotBuilder::new(source(&provider), vec![&ALPHA])
            .with_benchmarks(Benchmark::defaults());
        let snapshot = builder.build(&LastPrices::default()).await.unwrap();

        assert_eq!(snapshot.benchmarks.len(), 1);
        assert_eq!(snapshot.benchmarks[0].name, "NASDAQ");
        assert_eq!(snapshot.benchmarks[0].variation_pct, dec!(1));
    }

    #[test]
    fn last_prices_priors() {
        let mut last = LastPrices::default();
        assert_eq!(last.prior("A"), PriorPrice::FirstCycle);

        last.mark_seeded();
        assert_eq!(last.prior("A"), PriorPrice::Unseen);

        let snapshot = MarketSnapshot {
            taken_at: Utc::now(),
            quotes: vec![QuoteSnapshot::derive(
                &ALPHA,
                &session(dec!(1), dec!(2))[1],
                dec!(1),
                PriorPrice::Unseen,
                None,
                Resolution::Intraday,
            )],
            benchmarks: Vec::new(),
        };
        last.record(&snapshot);
        assert_eq!(last.prior("A"), PriorPrice::Seen(dec!(2)));
        assert_eq!(last.get("B"), None);
    }
}
