mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use market_watch_core::alert::PriceAlert;
use market_watch_core::config::DashboardConfig;
use market_watch_core::profile;
use market_watch_core::snapshot::SortKey;
use market_watch_live::builder::SnapshotBuilder;
use market_watch_live::history::load_history;
use market_watch_live::scheduler::{Board, RefreshScheduler, SchedulerStatus};
use market_watch_providers::provider::QuoteProvider;
use market_watch_providers::source::QuoteSource;
use market_watch_providers::yahoo::YahooProvider;
use tokio::sync::oneshot;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "market-watch",
    about = "Live quote board and technicals for a fixed tech watchlist"
)]
struct Cli {
    /// TOML configuration file (built-in defaults if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Data provider: yahoo
    #[arg(long, default_value = "yahoo")]
    provider: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ViewArgs {
    /// Row order: variation, price, volume, market-cap
    #[arg(long, default_value = "variation")]
    sort: SortKey,

    /// Only show rows from this sector
    #[arg(long)]
    sector: Option<String>,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the board periodically until interrupted
    Watch {
        /// Seconds between refreshes (5-60)
        #[arg(long)]
        refresh_secs: Option<u64>,

        /// Price alert as SYMBOL=PRICE (repeatable)
        #[arg(short, long = "alert")]
        alerts: Vec<PriceAlert>,

        /// Stop after this many published boards
        #[arg(long)]
        cycles: Option<u64>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Run a single refresh and print it
    Snapshot {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Moving averages and RSI over the configured lookback
    Technicals {
        /// Watchlist symbol
        #[arg(short, long)]
        symbol: String,

        /// Number of trailing bars to print (defaults to history.chart_points)
        #[arg(long)]
        points: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the watchlist companies
    Profiles,
}

fn create_provider(name: &str, timeout: Duration) -> Result<Arc<dyn QuoteProvider>> {
    match name {
        "yahoo" => Ok(Arc::new(
            YahooProvider::new(timeout).context("failed to create Yahoo provider")?,
        )),
        other => anyhow::bail!("unknown provider: {other}. Expected: yahoo"),
    }
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(DashboardConfig::default()),
    }
}

/// Command-line values win over the file. Alerts from both are kept.
fn apply_watch_overrides(
    config: &mut DashboardConfig,
    refresh_secs: Option<u64>,
    alerts: &[PriceAlert],
) -> Result<()> {
    if let Some(secs) = refresh_secs {
        config.refresh_secs = secs;
    }
    for alert in alerts {
        if !config.alerts.contains(alert) {
            config.alerts.push(alert.clone());
        }
    }
    config.validate().context("invalid configuration")
}

fn source_for(config: &DashboardConfig, provider_name: &str) -> Result<QuoteSource> {
    let provider = create_provider(provider_name, config.fetch_timeout())?;
    info!("Using provider: {}", provider.name());
    Ok(QuoteSource::new(provider, config.fetch_timeout()))
}

fn scheduler_for(config: &DashboardConfig, source: QuoteSource) -> Result<RefreshScheduler> {
    let builder = SnapshotBuilder::new(source, config.profiles()?)
        .with_benchmarks(config.benchmarks.clone());
    Ok(RefreshScheduler::new(builder, config.refresh_secs)?.with_alerts(config.alerts.clone()))
}

fn print_board(board: &Board, status: &SchedulerStatus, view: &ViewArgs) -> Result<()> {
    let rows = board.snapshot.view(view.sort, view.sector.as_deref());

    if view.json {
        let out = serde_json::json!({
            "taken_at": board.snapshot.taken_at,
            "status": status,
            "summary": board.summary(),
            "quotes": rows,
            "sectors": board.snapshot.sectors(),
            "benchmarks": board.snapshot.benchmarks,
            "alerts": board.breaches,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", render::ticker_tape(&board.snapshot));
    println!("{}", render::status_line(status));
    println!();
    println!("{}", render::summary_block(&board.summary()));
    println!();
    print!("{}", render::quote_table(&rows));
    println!();
    print!("{}", render::sector_table(&board.snapshot.sectors()));
    if !board.snapshot.benchmarks.is_empty() {
        println!();
        print!("{}", render::benchmark_lines(&board.snapshot.benchmarks));
    }
    if !board.breaches.is_empty() {
        println!();
        print!("{}", render::alert_lines(&board.breaches));
    }
    Ok(())
}

async fn cmd_watch(
    config: &DashboardConfig,
    provider_name: &str,
    view: &ViewArgs,
    cycles: Option<u64>,
) -> Result<()> {
    let scheduler = scheduler_for(config, source_for(config, provider_name)?)?;
    let mut reader = scheduler.subscribe();

    let (done_tx, done_rx) = oneshot::channel::<()>();
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
            _ = done_rx => {}
        }
    };

    let render_loop = async move {
        let mut done_tx = Some(done_tx);
        let mut shown = 0u64;
        while reader.changed().await {
            let Some(board) = reader.current() else {
                continue;
            };
            print_board(&board, &reader.status(), view)?;
            shown += 1;
            if cycles.is_some_and(|n| shown >= n) {
                if let Some(tx) = done_tx.take() {
                    let _ = tx.send(());
                }
                break;
            }
            println!();
        }
        Ok::<(), anyhow::Error>(())
    };

    let ((), rendered) = tokio::join!(scheduler.run(shutdown), render_loop);
    rendered
}

async fn cmd_snapshot(config: &DashboardConfig, provider_name: &str, view: &ViewArgs) -> Result<()> {
    let mut scheduler = scheduler_for(config, source_for(config, provider_name)?)?;
    let reader = scheduler.subscribe();

    scheduler.tick().await;
    let board = reader
        .current()
        .context("no quotes could be fetched for any watchlist symbol")?;
    print_board(&board, &reader.status(), view)
}

async fn cmd_technicals(
    config: &DashboardConfig,
    provider_name: &str,
    symbol: &str,
    points: Option<usize>,
    json: bool,
) -> Result<()> {
    let profile = profile::lookup(symbol)
        .with_context(|| format!("{symbol} is not in the watchlist"))?;
    let source = source_for(config, provider_name)?;

    let book = load_history(&source, &[profile], &config.history).await;
    let series = book.get(profile.symbol).with_context(|| {
        format!(
            "no {} history for {} over {}",
            config.history.interval,
            profile.symbol,
            config.history.lookback()
        )
    })?;

    let technicals = series.technicals(&config.indicators);
    let tail = technicals.tail(points.unwrap_or(config.history.chart_points));

    if json {
        println!("{}", serde_json::to_string_pretty(tail)?);
    } else {
        println!(
            "{} ({}), {} bar(s) at {}",
            profile.name,
            profile.symbol,
            series.len(),
            series.interval
        );
        print!("{}", render::technicals_table(&technicals, tail));
    }
    Ok(())
}

fn cmd_profiles(config: &DashboardConfig) -> Result<()> {
    print!("{}", render::profiles_table(&config.profiles()?));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Watch {
            refresh_secs,
            alerts,
            cycles,
            view,
        } => {
            apply_watch_overrides(&mut config, *refresh_secs, alerts)?;
            cmd_watch(&config, &cli.provider, view, *cycles).await?;
        }
        Commands::Snapshot { view } => {
            cmd_snapshot(&config, &cli.provider, view).await?;
        }
        Commands::Technicals {
            symbol,
            points,
            json,
        } => {
            cmd_technicals(&config, &cli.provider, symbol, *points, *json).await?;
        }
        Commands::Profiles => {
            cmd_profiles(&config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_watch_args() {
        let cli = Cli::try_parse_from([
            "market-watch",
            "watch",
            "--refresh-secs",
            "15",
            "-a",
            "AAPL=180",
            "--alert",
            "tsla=250.5",
            "--sort",
            "volume",
            "--sector",
            "Technology",
            "--cycles",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch {
                refresh_secs,
                alerts,
                cycles,
                view,
            } => {
                assert_eq!(refresh_secs, Some(15));
                assert_eq!(alerts.len(), 2);
                assert_eq!(alerts[0].target, dec!(180));
                assert_eq!(alerts[1].symbol, "TSLA");
                assert_eq!(cycles, Some(3));
                assert_eq!(view.sort, SortKey::Volume);
                assert_eq!(view.sector.as_deref(), Some("Technology"));
                assert!(!view.json);
            }
            _ => panic!("expected Watch command"),
        }
    }

    #[test]
    fn parse_snapshot_defaults() {
        let cli = Cli::try_parse_from(["market-watch", "snapshot"]).unwrap();
        assert_eq!(cli.provider, "yahoo");
        assert_eq!(cli.log_level, "info");
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Snapshot { view } => {
                assert_eq!(view.sort, SortKey::Variation);
                assert!(view.sector.is_none());
            }
            _ => panic!("expected Snapshot command"),
        }
    }

    #[test]
    fn parse_technicals_args() {
        let cli = Cli::try_parse_from([
            "market-watch",
            "--config",
            "watch.toml",
            "technicals",
            "-s",
            "NFLX",
            "--points",
            "30",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("watch.toml")));
        match cli.command {
            Commands::Technicals {
                symbol,
                points,
                json,
            } => {
                assert_eq!(symbol, "NFLX");
                assert_eq!(points, Some(30));
                assert!(json);
            }
            _ => panic!("expected Technicals command"),
        }
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Cli::try_parse_from(["market-watch", "snapshot", "--sort", "name"]).is_err());
        assert!(Cli::try_parse_from(["market-watch", "watch", "--alert", "AAPL"]).is_err());
        assert!(Cli::try_parse_from(["market-watch", "watch", "--alert", "IBM=10"]).is_err());
        assert!(Cli::try_parse_from(["market-watch", "technicals"]).is_err());
    }

    #[test]
    fn overrides_win_and_are_validated() {
        let mut config = DashboardConfig::default();
        config.alerts.push(PriceAlert::new("AAPL", dec!(180)).unwrap());

        let extra = vec![
            PriceAlert::new("AAPL", dec!(180)).unwrap(),
            PriceAlert::new("MSFT", dec!(400)).unwrap(),
        ];
        apply_watch_overrides(&mut config, Some(30), &extra).unwrap();
        assert_eq!(config.refresh_secs, 30);
        assert_eq!(config.alerts.len(), 2);

        assert!(apply_watch_overrides(&mut config, Some(2), &[]).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = create_provider("alpaca", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown provider"));
    }
}
