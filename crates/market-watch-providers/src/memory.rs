use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use market_watch_core::bar::{Interval, Lookback, PriceBar};
use rust_decimal::Decimal;

use crate::error::ProviderError;
use crate::provider::QuoteProvider;

#[derive(Debug, Clone)]
enum Script {
    Bars(Vec<PriceBar>),
    Fail(String),
    Stall(Duration),
}

/// Provider that serves preloaded responses per (symbol, interval).
///
/// Unscripted requests return an empty series. Every request is recorded so
/// callers can assert which fetches were made.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    scripts: Mutex<HashMap<(String, Interval), Script>>,
    market_caps: Mutex<HashMap<String, Decimal>>,
    calls: Mutex<Vec<(String, Interval)>>,
}

fn key(symbol: &str, interval: Interval) -> (String, Interval) {
    (symbol.to_uppercase(), interval)
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, symbol: &str, interval: Interval, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key(symbol, interval), script);
    }

    pub fn set_bars(&self, symbol: &str, interval: Interval, bars: Vec<PriceBar>) {
        self.script(symbol, interval, Script::Bars(bars));
    }

    /// Make requests for `symbol` at `interval` fail with an API error.
    pub fn fail(&self, symbol: &str, interval: Interval, message: &str) {
        self.script(symbol, interval, Script::Fail(message.to_string()));
    }

    /// Make requests for `symbol` at `interval` hang for `delay` before answering empty.
    pub fn stall(&self, symbol: &str, interval: Interval, delay: Duration) {
        self.script(symbol, interval, Script::Stall(delay));
    }

    /// Forget every script for `symbol`, so it answers empty again.
    pub fn clear(&self, symbol: &str) {
        let symbol = symbol.to_uppercase();
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(s, _), _| *s != symbol);
    }

    pub fn set_market_cap(&self, symbol: &str, value: Decimal) {
        self.market_caps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_uppercase(), value);
    }

    /// Requests made so far, in order.
    pub fn calls(&self) -> Vec<(String, Interval)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl QuoteProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        _lookback: Lookback,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let key = key(symbol, interval);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.clone());

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();

        match script {
            None => Ok(Vec::new()),
            Some(Script::Bars(bars)) => Ok(bars),
            Some(Script::Fail(message)) => Err(ProviderError::Api {
                status: 503,
                message,
            }),
            Some(Script::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_market_cap(&self, symbol: &str) -> Result<Option<Decimal>, ProviderError> {
        Ok(self
            .market_caps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&symbol.to_uppercase())
            .copied())
    }
}
