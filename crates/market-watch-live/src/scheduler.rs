use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use market_watch_core::alert::{AlertBreach, Breach, PriceAlert};
use market_watch_core::config::validate_refresh_secs;
use market_watch_core::error::ConfigError;
use market_watch_core::snapshot::{MarketSnapshot, MarketSummary};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::builder::{LastPrices, SnapshotBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub state: RefreshState,
    /// Time of the last published board. Not advanced by empty cycles.
    pub last_update: Option<DateTime<Utc>>,
    pub period: Duration,
    /// Completed cycles, published or skipped.
    pub cycles: u64,
}

/// What readers see: one snapshot and everything derived from it at publish time.
///
/// `last_update` here is authoritative for this board. [`SchedulerStatus::last_update`]
/// is advanced just before the board is swapped in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub snapshot: MarketSnapshot,
    pub last_update: DateTime<Utc>,
    pub breaches: Vec<AlertBreach>,
}

impl Board {
    pub fn summary(&self) -> MarketSummary {
        self.snapshot.summary()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published { rows: usize, changed: usize },
    /// No symbol could be fetched; the previous board stays current.
    Skipped,
}

/// Read-only view of the scheduler's output. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BoardReader {
    board: watch::Receiver<Option<Arc<Board>>>,
    status: watch::Receiver<SchedulerStatus>,
}

impl BoardReader {
    /// The most recently published board, if any cycle has succeeded yet.
    pub fn current(&self) -> Option<Arc<Board>> {
        self.board.borrow().clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    /// Wait for the next published board. Returns `false` once the scheduler is gone.
    pub async fn changed(&mut self) -> bool {
        self.board.changed().await.is_ok()
    }
}

/// Runs the snapshot builder on a fixed period and publishes each result.
pub struct RefreshScheduler {
    builder: SnapshotBuilder,
    alerts: Vec<PriceAlert>,
    last_prices: LastPrices,
    board: watch::Sender<Option<Arc<Board>>>,
    status: watch::Sender<SchedulerStatus>,
}

impl RefreshScheduler {
    pub fn new(builder: SnapshotBuilder, refresh_secs: u64) -> Result<Self, ConfigError> {
        let period = validate_refresh_secs(refresh_secs)?;
        let (board, _) = watch::channel(None);
        let (status, _) = watch::channel(SchedulerStatus {
            state: RefreshState::Idle,
            last_update: None,
            period,
            cycles: 0,
        });

        Ok(Self {
            builder,
            alerts: Vec::new(),
            last_prices: LastPrices::default(),
            board,
            status,
        })
    }

    pub fn with_alerts(mut self, alerts: Vec<PriceAlert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn subscribe(&self) -> BoardReader {
        BoardReader {
            board: self.board.subscribe(),
            status: self.status.subscribe(),
        }
    }

    pub fn period(&self) -> Duration {
        self.status.borrow().period
    }

    /// Change the refresh period. Takes effect the next time [`run`](Self::run) starts.
    pub fn set_period(&mut self, refresh_secs: u64) -> Result<(), ConfigError> {
        let period = validate_refresh_secs(refresh_secs)?;
        self.status.send_modify(|s| s.period = period);
        Ok(())
    }

    fn set_state(&self, state: RefreshState) {
        self.status.send_modify(|s| s.state = state);
    }

    /// Run one refresh cycle.
    pub async fn tick(&mut self) -> CycleOutcome {
        self.set_state(RefreshState::Refreshing);

        let built = self.builder.build(&self.last_prices).await;
        let outcome = match built {
            Some(snapshot) => self.publish(snapshot),
            None => {
                warn!("refresh produced no quotes, keeping previous board");
                CycleOutcome::Skipped
            }
        };

        self.status.send_modify(|s| {
            s.state = RefreshState::Idle;
            s.cycles += 1;
        });
        outcome
    }

    fn publish(&mut self, snapshot: MarketSnapshot) -> CycleOutcome {
        let now = Utc::now();
        let breaches: Vec<AlertBreach> = self
            .alerts
            .iter()
            .filter_map(|alert| alert.evaluate(&snapshot))
            .collect();
        for b in &breaches {
            match b.breach {
                Breach::Above => warn!("alert: {} at {} crossed above {}", b.symbol, b.price, b.target),
                Breach::Below => warn!("alert: {} at {} fell below {}", b.symbol, b.price, b.target),
            }
        }

        self.last_prices.record(&snapshot);
        self.last_prices.mark_seeded();
        let rows = snapshot.quotes.len();
        let changed = snapshot.quotes.iter().filter(|q| q.price_changed()).count();

        // status first, so a reader woken by the new board never sees a stale last_update
        self.status.send_modify(|s| s.last_update = Some(now));
        self.board.send_replace(Some(Arc::new(Board {
            snapshot,
            last_update: now,
            breaches,
        })));

        info!("board refreshed: {rows} row(s), {changed} price change(s)");
        CycleOutcome::Published { rows, changed }
    }

    /// Tick every period until `shutdown` resolves. The first cycle starts immediately.
    /// A cycle interrupted by shutdown publishes nothing.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("refresh scheduler started, period {:?}", self.period());
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                outcome = self.tick() => Some(outcome),
            };
            match outcome {
                Some(outcome) => debug!("cycle finished: {outcome:?}"),
                None => {
                    debug!("cycle abandoned on shutdown");
                    self.set_state(RefreshState::Idle);
                    break;
                }
            }
        }
        info!("refresh scheduler stopped");
    }
}
