use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::quote::QuoteSnapshot;

/// Reference index quote shown next to the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkQuote {
    pub name: String,
    pub symbol: String,
    pub value: Decimal,
    pub variation_pct: Decimal,
}

/// Every row that could be fetched during one refresh cycle.
///
/// Replaced wholesale on each cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub taken_at: DateTime<Utc>,
    pub quotes: Vec<QuoteSnapshot>,
    pub benchmarks: Vec<BenchmarkQuote>,
}

/// Aggregate metrics over the rows present in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSummary {
    pub mean_variation_pct: Decimal,
    pub total_volume: i64,
    pub advancing: usize,
    pub declining: usize,
    pub present: usize,
    pub total_market_cap: Decimal,
    /// True when at least one component of `total_market_cap` is a placeholder.
    pub market_cap_estimated: bool,
}

impl MarketSummary {
    /// Advancing rows minus all other rows.
    pub fn breadth_delta(&self) -> i64 {
        self.advancing as i64 - (self.present - self.advancing) as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorSummary {
    pub sector: String,
    pub count: usize,
    pub mean_variation_pct: Decimal,
    pub total_volume: i64,
}

/// Row ordering for display. Every key sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Variation,
    Price,
    Volume,
    MarketCap,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "variation" => Ok(SortKey::Variation),
            "price" => Ok(SortKey::Price),
            "volume" => Ok(SortKey::Volume),
            "market-cap" => Ok(SortKey::MarketCap),
            other => Err(format!(
                "unknown sort key: {other}. Expected: variation, price, volume, market-cap"
            )),
        }
    }
}

fn mean(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}

impl MarketSnapshot {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&QuoteSnapshot> {
        self.quotes
            .iter()
            .find(|q| q.symbol().eq_ignore_ascii_case(symbol))
    }

    pub fn summary(&self) -> MarketSummary {
        let present = self.quotes.len();
        let variation_sum: Decimal = self.quotes.iter().map(|q| q.variation_pct()).sum();

        MarketSummary {
            mean_variation_pct: mean(variation_sum, present),
            total_volume: self.quotes.iter().map(|q| q.volume()).sum(),
            advancing: self
                .quotes
                .iter()
                .filter(|q| q.variation_pct() > Decimal::ZERO)
                .count(),
            declining: self
                .quotes
                .iter()
                .filter(|q| q.variation_pct() < Decimal::ZERO)
                .count(),
            present,
            total_market_cap: self.quotes.iter().map(|q| q.market_cap().value()).sum(),
            market_cap_estimated: self.quotes.iter().any(|q| q.market_cap().is_estimate()),
        }
    }

    /// Per-sector aggregates, ordered by sector name.
    pub fn sectors(&self) -> Vec<SectorSummary> {
        let mut groups: BTreeMap<&str, (usize, Decimal, i64)> = BTreeMap::new();
        for q in &self.quotes {
            let entry = groups.entry(q.sector()).or_default();
            entry.0 += 1;
            entry.1 += q.variation_pct();
            entry.2 += q.volume();
        }

        groups
            .into_iter()
            .map(|(sector, (count, variation_sum, volume))| SectorSummary {
                sector: sector.to_string(),
                count,
                mean_variation_pct: mean(variation_sum, count),
                total_volume: volume,
            })
            .collect()
    }

    /// Rows ordered by `key`, highest first. Ties keep watchlist order.
    pub fn sorted_by(&self, key: SortKey) -> Vec<&QuoteSnapshot> {
        let mut rows: Vec<&QuoteSnapshot> = self.quotes.iter().collect();
        match key {
            SortKey::Variation => rows.sort_by(|a, b| b.variation_pct().cmp(&a.variation_pct())),
            SortKey::Price => rows.sort_by(|a, b| b.price().cmp(&a.price())),
            SortKey::Volume => rows.sort_by(|a, b| b.volume().cmp(&a.volume())),
            SortKey::MarketCap => {
                rows.sort_by(|a, b| b.market_cap().value().cmp(&a.market_cap().value()))
            }
        }
        rows
    }

    /// Rows sorted by `key`, restricted to `sector` when given (case-insensitive).
    pub fn view(&self, key: SortKey, sector: Option<&str>) -> Vec<&QuoteSnapshot> {
        let mut rows = self.sorted_by(key);
        if let Some(sector) = sector {
            rows.retain(|q| q.sector().eq_ignore_ascii_case(sector));
        }
        rows
    }
}
