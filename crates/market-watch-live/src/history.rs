use futures::future::join_all;
use market_watch_core::config::HistoryConfig;
use market_watch_core::history::{HistoricalSeries, HistoryBook};
use market_watch_core::profile::CompanyProfile;
use market_watch_providers::source::QuoteSource;
use tracing::{info, warn};

/// Fetch the lookback series for every profile concurrently.
/// Symbols whose fetch fails or comes back empty are left out of the book.
pub async fn load_history(
    source: &QuoteSource,
    profiles: &[&'static CompanyProfile],
    config: &HistoryConfig,
) -> HistoryBook {
    let lookback = config.lookback();
    let fetches = profiles
        .iter()
        .map(|p| source.fetch_history(p.symbol, lookback, config.interval));
    let results = join_all(fetches).await;

    let mut book = HistoryBook::default();
    for (profile, bars) in profiles.iter().zip(results) {
        if bars.is_empty() {
            warn!("{}: no history for {lookback} at {}", profile.symbol, config.interval);
            continue;
        }
        info!("{}: loaded {} bar(s) of history", profile.symbol, bars.len());
        book.insert(HistoricalSeries::new(profile.symbol, config.interval, bars));
    }
    book
}
