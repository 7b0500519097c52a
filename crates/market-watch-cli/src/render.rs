use std::fmt::Write;

use market_watch_core::alert::{AlertBreach, Breach};
use market_watch_core::history::{TechnicalPoint, TechnicalSeries};
use market_watch_core::indicators::RsiZone;
use market_watch_core::profile::CompanyProfile;
use market_watch_core::quote::{QuoteSnapshot, Resolution};
use market_watch_core::snapshot::{BenchmarkQuote, MarketSnapshot, MarketSummary, SectorSummary};
use market_watch_live::scheduler::{RefreshState, SchedulerStatus};
use rust_decimal::Decimal;

/// `+1.23` / `-1.23`, two decimals.
fn signed(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{rounded:.2}")
    } else {
        format!("+{:.2}", rounded.abs())
    }
}

/// Integer with `,` thousands separators.
fn grouped(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn arrow(variation_pct: Decimal) -> char {
    if variation_pct > Decimal::ZERO {
        '▲'
    } else if variation_pct < Decimal::ZERO {
        '▼'
    } else {
        '●'
    }
}

fn scaled(value: Decimal, unit: i64) -> Decimal {
    value / Decimal::from(unit)
}

pub fn ticker_tape(snapshot: &MarketSnapshot) -> String {
    let items: Vec<String> = snapshot
        .quotes
        .iter()
        .map(|q| {
            format!(
                "{}: ${:.2} {} {}%",
                q.symbol(),
                q.price(),
                arrow(q.variation_pct()),
                signed(q.variation_pct())
            )
        })
        .collect();
    format!("LIVE • {} •", items.join(" • "))
}

pub fn status_line(status: &SchedulerStatus) -> String {
    let state = match status.state {
        RefreshState::Idle => "idle",
        RefreshState::Refreshing => "refreshing",
    };
    let updated = status
        .last_update
        .map(|t| t.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "Last update: {updated} | every {}s | cycle {} | {state}",
        status.period.as_secs(),
        status.cycles
    )
}

pub fn summary_block(summary: &MarketSummary) -> String {
    let estimate = if summary.market_cap_estimated {
        " (est.)"
    } else {
        ""
    };
    let delta = summary.breadth_delta();
    let delta = if delta >= 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "Mean variation:   {}%", signed(summary.mean_variation_pct));
    let _ = writeln!(
        out,
        "Advancing:        {}/{} ({delta})",
        summary.advancing, summary.present
    );
    let _ = writeln!(out, "Total volume:     {}", grouped(summary.total_volume));
    let _ = write!(
        out,
        "Total market cap: {:.2} T${estimate}",
        scaled(summary.total_market_cap, 1_000_000_000_000)
    );
    out
}

pub fn quote_table(rows: &[&QuoteSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<24} {:<14} {:>10} {:>11} {:>9} {:>8} {:>14} {:>11}  {}",
        "SYMBOL", "NAME", "SECTOR", "OPEN", "PRICE", "CHANGE", "CHG %", "VOLUME", "MKT CAP", "TREND"
    );
    for q in rows {
        let marker = if q.price_changed() { "*" } else { " " };
        let daily = if q.resolution() == Resolution::Daily {
            " (daily)"
        } else {
            ""
        };
        let cap = q.market_cap();
        let cap_note = if cap.is_estimate() { "~" } else { "" };
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<14} {:>10.2} {:>10.2}{marker} {:>9} {:>7}% {:>14} {:>9.1}B{cap_note}  {}{daily}",
            q.symbol(),
            q.profile().name,
            q.sector(),
            q.period_open(),
            q.price(),
            signed(q.variation_abs()),
            signed(q.variation_pct()),
            grouped(q.volume()),
            scaled(cap.value(), 1_000_000_000),
            q.trend().label(),
        );
    }
    out
}

pub fn sector_table(sectors: &[SectorSummary]) -> String {
    let mut out = String::new();
    for s in sectors {
        let _ = writeln!(
            out,
            "{:<14} {:>2} row(s)  {:>7}%  volume {}",
            s.sector,
            s.count,
            signed(s.mean_variation_pct),
            grouped(s.total_volume)
        );
    }
    out
}

pub fn benchmark_lines(benchmarks: &[BenchmarkQuote]) -> String {
    let mut out = String::new();
    for b in benchmarks {
        let _ = writeln!(
            out,
            "{:<13} {:>12.0}  {}%",
            b.name,
            b.value,
            signed(b.variation_pct)
        );
    }
    out
}

pub fn alert_lines(breaches: &[AlertBreach]) -> String {
    let mut out = String::new();
    for b in breaches {
        let _ = match b.breach {
            Breach::Above => writeln!(out, "ALERT {} at ${:.2} is above ${}", b.symbol, b.price, b.target),
            Breach::Below => writeln!(out, "ALERT {} at ${:.2} is below ${}", b.symbol, b.price, b.target),
        };
    }
    out
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn technicals_table(series: &TechnicalSeries, points: &[TechnicalPoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<17} {:>10} {:>12} {:>10} {:>10} {:>7}  {}",
        "TIME (UTC)",
        "CLOSE",
        "VOLUME",
        format!("MA{}", series.ma_short_window),
        format!("MA{}", series.ma_long_window),
        format!("RSI{}", series.rsi_window),
        "ZONE"
    );
    for p in points {
        let zone = match p.rsi_zone() {
            Some(RsiZone::Overbought) => "overbought",
            Some(RsiZone::Oversold) => "oversold",
            Some(RsiZone::Neutral) => "",
            None => "",
        };
        let _ = writeln!(
            out,
            "{:<17} {:>10.2} {:>12} {:>10} {:>10} {:>7}  {zone}",
            p.timestamp.format("%Y-%m-%d %H:%M"),
            p.close,
            grouped(p.volume),
            optional(p.ma_short),
            optional(p.ma_long),
            optional(p.rsi),
        );
    }
    out
}

pub fn profiles_table(profiles: &[&CompanyProfile]) -> String {
    let mut out = String::new();
    for p in profiles {
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<14} {:<32} {} ({}) weight {}",
            p.symbol, p.name, p.sector, p.sub_sector, p.founded, p.founders, p.weight
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use market_watch_core::bar::PriceBar;
    use market_watch_core::profile::lookup;
    use market_watch_core::quote::PriorPrice;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn row(symbol: &str, open: Decimal, close: Decimal, prior: PriorPrice) -> QuoteSnapshot {
        let bar = PriceBar {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 0).unwrap(),
            open,
            high: close,
            low: open,
            close,
            volume: 1_234_567,
        };
        QuoteSnapshot::derive(lookup(symbol).unwrap(), &bar, open, prior, None, Resolution::Intraday)
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            taken_at: Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 5).unwrap(),
            quotes: vec![
                row("AAPL", dec!(95), dec!(100), PriorPrice::Seen(dec!(99))),
                row("NFLX", dec!(50), dec!(49), PriorPrice::Seen(dec!(49))),
                row("TSLA", dec!(10), dec!(10), PriorPrice::FirstCycle),
            ],
            benchmarks: Vec::new(),
        }
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(signed(dec!(5.263)), "+5.26");
        assert_eq!(signed(dec!(-1.005)), "-1.00");
        assert_eq!(signed(dec!(-0.001)), "+0.00");
        assert_eq!(signed(Decimal::ZERO), "+0.00");
    }

    #[test]
    fn grouped_thousands() {
        assert_eq!(grouped(0), "0");
        assert_eq!(grouped(999), "999");
        assert_eq!(grouped(1_000), "1,000");
        assert_eq!(grouped(1_234_567), "1,234,567");
        assert_eq!(grouped(-45_000), "-45,000");
    }

    #[test]
    fn ticker_tape_arrows() {
        let tape = ticker_tape(&snapshot());
        assert!(tape.starts_with("LIVE • AAPL: $100.00 ▲ +5.26%"));
        assert!(tape.contains("NFLX: $49.00 ▼ -2.00%"));
        assert!(tape.contains("TSLA: $10.00 ● +0.00%"));
    }

    #[test]
    fn table_marks_changed_prices() {
        let snap = snapshot();
        let rows: Vec<&QuoteSnapshot> = snap.quotes.iter().collect();
        let table = quote_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("95.00"));
        assert!(lines[1].contains("100.00*"));
        assert!(lines[2].contains("49.00 "));
        assert!(lines[1].contains("strong rise"));
        assert!(lines[1].contains("1,234,567"));
    }

    #[test]
    fn summary_mentions_estimate() {
        let block = summary_block(&snapshot().summary());
        assert!(block.contains("Advancing:        1/3 (-1)"));
        assert!(block.contains("(est.)"));
        assert!(block.contains("3,703,701"));
    }

    #[test]
    fn status_before_first_update() {
        let status = SchedulerStatus {
            state: RefreshState::Idle,
            last_update: None,
            period: Duration::from_secs(10),
            cycles: 0,
        };
        assert_eq!(
            status_line(&status),
            "Last update: never | every 10s | cycle 0 | idle"
        );
    }

    #[test]
    fn alerts_render_direction() {
        let lines = alert_lines(&[AlertBreach {
            symbol: "AAPL".into(),
            target: dec!(100),
            price: dec!(94),
            breach: Breach::Below,
        }]);
        assert_eq!(lines, "ALERT AAPL at $94.00 is below $100\n");
    }
}
