use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::bar::PriceBar;
use crate::profile::CompanyProfile;

/// Which fetch produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// 1-minute bars for the current day.
    Intraday,
    /// Single daily bar, used when the intraday series was empty.
    Daily,
}

/// Last price seen for a symbol before the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorPrice {
    /// No cycle has run yet; nothing is flagged as changed.
    FirstCycle,
    /// Cycles have run but this symbol never produced a quote.
    Unseen,
    Seen(Decimal),
}

/// Market capitalization attached to a quote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MarketCap {
    /// Figure supplied by the provider.
    Reported(Decimal),
    /// Placeholder of `price × 1e9`. Not a real capitalization.
    Estimated(Decimal),
}

impl MarketCap {
    pub fn resolve(reported: Option<Decimal>, price: Decimal) -> Self {
        match reported {
            Some(value) => MarketCap::Reported(value),
            None => MarketCap::Estimated(price * Decimal::from(1_000_000_000i64)),
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            MarketCap::Reported(v) | MarketCap::Estimated(v) => *v,
        }
    }

    pub fn is_estimate(&self) -> bool {
        matches!(self, MarketCap::Estimated(_))
    }
}

/// Direction label for a percentage variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    StrongRise,
    Rise,
    Stable,
    Fall,
    StrongFall,
}

impl Trend {
    pub fn classify(variation_pct: Decimal) -> Self {
        if variation_pct > Decimal::ONE {
            Trend::StrongRise
        } else if variation_pct > Decimal::ZERO {
            Trend::Rise
        } else if variation_pct < Decimal::NEGATIVE_ONE {
            Trend::StrongFall
        } else if variation_pct < Decimal::ZERO {
            Trend::Fall
        } else {
            Trend::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::StrongRise => "strong rise",
            Trend::Rise => "rise",
            Trend::Stable => "stable",
            Trend::Fall => "fall",
            Trend::StrongFall => "strong fall",
        }
    }
}

/// Percentage change from `open` to `price`. `None` when `open` is zero.
pub fn variation_pct(open: Decimal, price: Decimal) -> Option<Decimal> {
    if open.is_zero() {
        return None;
    }
    ((price - open) * Decimal::ONE_HUNDRED).checked_div(open)
}

/// One watchlist row for a refresh cycle.
///
/// All derived fields are computed by [`QuoteSnapshot::derive`]; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    profile: &'static CompanyProfile,
    price: Decimal,
    period_open: Decimal,
    variation_abs: Decimal,
    variation_pct: Decimal,
    volume: i64,
    timestamp: DateTime<Utc>,
    previous_price: Option<Decimal>,
    price_changed: bool,
    market_cap: MarketCap,
    resolution: Resolution,
}

impl QuoteSnapshot {
    /// Build a row from the latest bar and the open of the period it belongs to.
    /// A zero `period_open` yields a variation of exactly zero.
    pub fn derive(
        profile: &'static CompanyProfile,
        latest: &PriceBar,
        period_open: Decimal,
        prior: PriorPrice,
        reported_market_cap: Option<Decimal>,
        resolution: Resolution,
    ) -> Self {
        let price = latest.close;
        let (previous_price, price_changed) = match prior {
            PriorPrice::FirstCycle => (None, false),
            PriorPrice::Unseen => (None, true),
            PriorPrice::Seen(p) => (Some(p), p != price),
        };

        Self {
            profile,
            price,
            period_open,
            variation_abs: price - period_open,
            variation_pct: variation_pct(period_open, price).unwrap_or(Decimal::ZERO),
            volume: latest.volume,
            timestamp: latest.timestamp,
            previous_price,
            price_changed,
            market_cap: MarketCap::resolve(reported_market_cap, price),
            resolution,
        }
    }

    pub fn profile(&self) -> &'static CompanyProfile {
        self.profile
    }

    pub fn symbol(&self) -> &'static str {
        self.profile.symbol
    }

    pub fn sector(&self) -> &'static str {
        self.profile.sector
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn period_open(&self) -> Decimal {
        self.period_open
    }

    pub fn variation_abs(&self) -> Decimal {
        self.variation_abs
    }

    pub fn variation_pct(&self) -> Decimal {
        self.variation_pct
    }

    pub fn volume(&self) -> i64 {
        self.volume
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn previous_price(&self) -> Option<Decimal> {
        self.previous_price
    }

    pub fn price_changed(&self) -> bool {
        self.price_changed
    }

    pub fn market_cap(&self) -> MarketCap {
        self.market_cap
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn trend(&self) -> Trend {
        Trend::classify(self.variation_pct)
    }
}
