use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::bar::{Interval, PriceBar};
use crate::config::IndicatorConfig;
use crate::indicators::{self, RsiZone};

/// Time-ordered bars for one symbol over the history lookback window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalSeries {
    pub symbol: String,
    pub interval: Interval,
    pub bars: Vec<PriceBar>,
}

impl HistoricalSeries {
    pub fn new(symbol: impl Into<String>, interval: Interval, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Closing price with moving averages and RSI for every bar.
    pub fn technicals(&self, config: &IndicatorConfig) -> TechnicalSeries {
        let closes = self.closes();
        let ma_short = indicators::moving_average(&closes, config.ma_short);
        let ma_long = indicators::moving_average(&closes, config.ma_long);
        let rsi = indicators::rsi(&closes, config.rsi_window);

        let points = self
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| TechnicalPoint {
                timestamp: bar.timestamp,
                close: bar.close,
                volume: bar.volume,
                ma_short: ma_short[i],
                ma_long: ma_long[i],
                rsi: rsi[i],
            })
            .collect();

        TechnicalSeries {
            symbol: self.symbol.clone(),
            ma_short_window: config.ma_short,
            ma_long_window: config.ma_long,
            rsi_window: config.rsi_window,
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalPoint {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
    pub volume: i64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub rsi: Option<f64>,
}

impl TechnicalPoint {
    pub fn rsi_zone(&self) -> Option<RsiZone> {
        self.rsi.map(RsiZone::classify)
    }
}

/// Indicator values aligned with the bars of a [`HistoricalSeries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSeries {
    pub symbol: String,
    pub ma_short_window: usize,
    pub ma_long_window: usize,
    pub rsi_window: usize,
    pub points: Vec<TechnicalPoint>,
}

impl TechnicalSeries {
    /// The most recent `n` points (for charting).
    pub fn tail(&self, n: usize) -> &[TechnicalPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    pub fn latest(&self) -> Option<&TechnicalPoint> {
        self.points.last()
    }
}

/// Historical series keyed by symbol. Loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct HistoryBook {
    series: HashMap<String, HistoricalSeries>,
}

impl HistoryBook {
    pub fn insert(&mut self, series: HistoricalSeries) {
        self.series.insert(series.symbol.clone(), series);
    }

    pub fn get(&self, symbol: &str) -> Option<&HistoricalSeries> {
        self.series.get(&symbol.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
