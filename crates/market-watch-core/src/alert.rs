use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::profile;
use crate::snapshot::MarketSnapshot;

/// Side of the target band that was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Breach {
    /// Price at or above 105% of the target.
    Above,
    /// Price at or below 95% of the target.
    Below,
}

/// Compare a price against the ±5% band around `target`.
pub fn check(current: Decimal, target: Decimal) -> Option<Breach> {
    let upper = target * Decimal::new(105, 2);
    let lower = target * Decimal::new(95, 2);
    if current >= upper {
        Some(Breach::Above)
    } else if current <= lower {
        Some(Breach::Below)
    } else {
        None
    }
}

/// A watched symbol and its target price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub symbol: String,
    pub target: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertBreach {
    pub symbol: String,
    pub target: Decimal,
    pub price: Decimal,
    pub breach: Breach,
}

impl PriceAlert {
    pub fn new(symbol: &str, target: Decimal) -> Result<Self, ConfigError> {
        let alert = Self {
            symbol: symbol.to_uppercase(),
            target,
        };
        alert.validate()?;
        Ok(alert)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if profile::lookup(&self.symbol).is_none() {
            return Err(ConfigError::UnknownSymbol(self.symbol.clone()));
        }
        if self.target <= Decimal::ZERO {
            return Err(ConfigError::AlertTarget {
                symbol: self.symbol.clone(),
                target: self.target,
            });
        }
        Ok(())
    }

    /// `None` when the symbol is absent from the snapshot or the price is inside the band.
    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> Option<AlertBreach> {
        let quote = snapshot.get(&self.symbol)?;
        check(quote.price(), self.target).map(|breach| AlertBreach {
            symbol: self.symbol.clone(),
            target: self.target,
            price: quote.price(),
            breach,
        })
    }
}

/// Parses `SYMBOL=PRICE`, as given on the command line.
impl FromStr for PriceAlert {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, price) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::AlertSyntax(s.to_string()))?;
        let target = Decimal::from_str(price.trim())
            .map_err(|_| ConfigError::AlertSyntax(s.to_string()))?;
        PriceAlert::new(symbol.trim(), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::PriceBar;
    use crate::quote::{PriorPrice, QuoteSnapshot, Resolution};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn band_edges() {
        assert_eq!(check(dec!(106), dec!(100)), Some(Breach::Above));
        assert_eq!(check(dec!(105), dec!(100)), Some(Breach::Above));
        assert_eq!(check(dec!(94), dec!(100)), Some(Breach::Below));
        assert_eq!(check(dec!(95), dec!(100)), Some(Breach::Below));
        assert_eq!(check(dec!(100), dec!(100)), None);
        assert_eq!(check(dec!(104.99), dec!(100)), None);
    }

    #[test]
    fn evaluate_against_snapshot() {
        let bar = PriceBar {
            timestamp: Utc::now(),
            open: dec!(100),
            high: dec!(107),
            low: dec!(100),
            close: dec!(106),
            volume: 10,
        };
        let snapshot = MarketSnapshot {
            taken_at: Utc::now(),
            quotes: vec![QuoteSnapshot::derive(
                profile::lookup("AAPL").unwrap(),
                &bar,
                dec!(100),
                PriorPrice::FirstCycle,
                None,
                Resolution::Intraday,
            )],
            benchmarks: Vec::new(),
        };

        let hit = PriceAlert::new("aapl", dec!(100)).unwrap().evaluate(&snapshot);
        assert_eq!(hit.map(|b| b.breach), Some(Breach::Above));

        let absent = PriceAlert::new("MSFT", dec!(100)).unwrap();
        assert!(absent.evaluate(&snapshot).is_none());
    }

    #[test]
    fn parse_from_cli() {
        let alert: PriceAlert = "tsla=250.5".parse().unwrap();
        assert_eq!(alert.symbol, "TSLA");
        assert_eq!(alert.target, dec!(250.5));

        assert!(matches!(
            "TSLA".parse::<PriceAlert>(),
            Err(ConfigError::AlertSyntax(_))
        ));
        assert!(matches!(
            "IBM=10".parse::<PriceAlert>(),
            Err(ConfigError::UnknownSymbol(_))
        ));
        assert!(matches!(
            "AAPL=0".parse::<PriceAlert>(),
            Err(ConfigError::AlertTarget { .. })
        ));
    }
}
