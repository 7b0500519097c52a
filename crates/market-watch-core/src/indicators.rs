//! Technical indicators over a closing-price series.
//!
//! Every function returns one entry per input sample. Entries where the
//! indicator is not yet defined are `None`, never zero.

/// Simple moving average of the trailing `window` closes.
///
/// Index `i` holds a value once `i >= window - 1`. A zero window, or one longer
/// than the series, yields no values.
pub fn moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || window > closes.len() {
        return vec![None; closes.len()];
    }

    let divisor = window as f64;
    let mut out = vec![None; window - 1];
    out.extend(
        closes
            .windows(window)
            .map(|w| Some(w.iter().sum::<f64>() / divisor)),
    );
    out
}

/// Relative Strength Index with simple (non-smoothed) averages.
///
/// The first close has no prior, so its move counts as zero. Gains and losses
/// are averaged over the trailing `window` moves, and index `i` holds a value
/// once `i >= window - 1`. A window with no losses reads 100.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return out;
    }

    // moves[i] is the change into closes[i]
    let moves: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();
    let divisor = window as f64;

    for (k, w) in moves.windows(window).enumerate() {
        let gain = w.iter().filter(|d| **d > 0.0).sum::<f64>() / divisor;
        let loss = w.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / divisor;

        let value = if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        };
        out[k + window - 1] = Some(value);
    }

    out
}

/// Position of an RSI reading relative to the conventional 30/70 bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub const OVERBOUGHT: f64 = 70.0;
    pub const OVERSOLD: f64 = 30.0;

    pub fn classify(value: f64) -> Self {
        if value >= Self::OVERBOUGHT {
            RsiZone::Overbought
        } else if value <= Self::OVERSOLD {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }
}
