use thiserror::Error;

/// Rejected configuration. Raised before any quote is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Refresh period {secs}s out of range ({min}-{max}s)")]
    RefreshPeriod { secs: u64, min: u64, max: u64 },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Watchlist is empty")]
    EmptyWatchlist,

    #[error("Invalid {name} window: {window}")]
    Window { name: &'static str, window: usize },

    #[error("Short moving average ({short}) must be shorter than long ({long})")]
    MovingAverageOrder { short: usize, long: usize },

    #[error("Fetch timeout must be at least 1s")]
    Timeout,

    #[error("Alert target for {symbol} must be positive, got {target}")]
    AlertTarget {
        symbol: String,
        target: rust_decimal::Decimal,
    },

    #[error("Alert on {0}, which is not in the watchlist")]
    AlertNotWatched(String),

    #[error("Invalid alert '{0}', expected SYMBOL=PRICE")]
    AlertSyntax(String),
}
