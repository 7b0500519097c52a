use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::PriceAlert;
use crate::bar::{Interval, Lookback};
use crate::error::ConfigError;
use crate::profile::{self, CompanyProfile, WATCHLIST};

pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 60;
pub const DEFAULT_REFRESH_SECS: u64 = 10;

/// Reject refresh periods outside 5-60 seconds.
pub fn validate_refresh_secs(secs: u64) -> Result<Duration, ConfigError> {
    if !(MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&secs) {
        return Err(ConfigError::RefreshPeriod {
            secs,
            min: MIN_REFRESH_SECS,
            max: MAX_REFRESH_SECS,
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Top-level configuration, usually read from a TOML file.
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_secs: u64,
    pub fetch_timeout_secs: u64,
    pub watchlist: Vec<String>,
    pub history: HistoryConfig,
    pub indicators: IndicatorConfig,
    pub alerts: Vec<PriceAlert>,
    pub benchmarks: Vec<Benchmark>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_secs: DEFAULT_REFRESH_SECS,
            fetch_timeout_secs: 8,
            watchlist: WATCHLIST.iter().map(|p| p.symbol.to_string()).collect(),
            history: HistoryConfig::default(),
            indicators: IndicatorConfig::default(),
            alerts: Vec::new(),
            benchmarks: Benchmark::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub lookback_days: u32,
    pub interval: Interval,
    /// Number of trailing points shown in charts and tables.
    pub chart_points: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            interval: Interval::FiveMinutes,
            chart_points: 200,
        }
    }
}

impl HistoryConfig {
    pub fn lookback(&self) -> Lookback {
        Lookback::days(self.lookback_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_window: usize,
    pub ma_short: usize,
    pub ma_long: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_window: 14,
            ma_short: 20,
            ma_long: 50,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, window) in [
            ("RSI", self.rsi_window),
            ("short moving average", self.ma_short),
            ("long moving average", self.ma_long),
        ] {
            if window == 0 {
                return Err(ConfigError::Window { name, window });
            }
        }
        if self.ma_short >= self.ma_long {
            return Err(ConfigError::MovingAverageOrder {
                short: self.ma_short,
                long: self.ma_long,
            });
        }
        Ok(())
    }
}

/// Reference index displayed next to the watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub name: String,
    pub symbol: String,
}

impl Benchmark {
    pub fn defaults() -> Vec<Benchmark> {
        [
            ("NASDAQ", "^IXIC"),
            ("S&P 500", "^GSPC"),
            ("DOW JONES", "^DJI"),
            ("RUSSELL 2000", "^RUT"),
        ]
        .into_iter()
        .map(|(name, symbol)| Benchmark {
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
        .collect()
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_refresh_secs(self.refresh_secs)?;
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }
        let watched = self.profiles()?;
        self.indicators.validate()?;
        if self.history.lookback_days == 0 {
            return Err(ConfigError::Window {
                name: "history lookback",
                window: 0,
            });
        }
        for alert in &self.alerts {
            alert.validate()?;
            if !watched.iter().any(|p| p.symbol == alert.symbol) {
                return Err(ConfigError::AlertNotWatched(alert.symbol.clone()));
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Resolve the configured watchlist symbols to their static profiles,
    /// keeping the configured order and dropping repeats.
    pub fn profiles(&self) -> Result<Vec<&'static CompanyProfile>, ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }
        let mut profiles: Vec<&'static CompanyProfile> = Vec::with_capacity(self.watchlist.len());
        for symbol in &self.watchlist {
            let profile = profile::lookup(symbol)
                .ok_or_else(|| ConfigError::UnknownSymbol(symbol.clone()))?;
            if !profiles.iter().any(|p| p.symbol == profile.symbol) {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}
