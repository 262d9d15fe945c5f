use crate::app::MetadataService;
use crate::domain::error::ServiceResult;
use crate::domain::model::{MetadataFilter, MetadataPatch};
use crate::infra::config::TrafficConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shortest tick period the actor accepts.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

pub struct TrafficSimulator {
    metadata: MetadataService,
    config: TrafficConfig,
}

impl TrafficSimulator {
    /// A zero `period` is raised to [`MIN_PERIOD`].
    pub fn new(metadata: MetadataService, mut config: TrafficConfig) -> Self {
        if config.period < MIN_PERIOD {
            tracing::warn!(
                period_ms = config.period.as_millis() as u64,
                "traffic period too short, using the minimum"
            );
            config.period = MIN_PERIOD;
        }
        Self { metadata, config }
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Fetches every metadata row and adds `uniform(0..=cap)` minutes to each.
    ///
    /// Every row is written in its own transaction. A failed row is logged and
    /// counted; only a failed fetch is returned as an error. No lock is held
    /// between the fetch and the writes, so a concurrent request may overwrite
    /// (or be overwritten by) a tick.
    pub async fn tick(&self, rng: &mut StdRng) -> ServiceResult<TickReport> {
        let started = Instant::now();
        let rows = self.metadata.find(MetadataFilter::default()).await?;

        let mut report = TickReport {
            updated: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        };
        for md in rows {
            let delta = i64::from(rng.gen_range(0..=self.config.play_time_cap));
            let patch = MetadataPatch {
                play_time: Some(md.play_time.saturating_add(delta)),
            };
            let id = md.id;
            match self.metadata.update_one(md, patch).await {
                Ok(_) => report.updated += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(metadata_id = id, error = %err, "failed to update play time");
                }
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Starts the actor. The first tick fires one period after spawning.
    pub fn spawn(self) -> TrafficHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        TrafficHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let period = self.config.period;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            period_secs = period.as_secs(),
            play_time_cap = self.config.play_time_cap,
            "traffic simulator started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {}
            }

            match self.tick(&mut rng).await {
                Ok(report) => tracing::info!(
                    updated = report.updated,
                    failed = report.failed,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "traffic tick"
                ),
                Err(err) => {
                    tracing::error!(error = %err, "failed to fetch metadata, traffic simulator stopped");
                    return;
                }
            }
        }

        tracing::info!("traffic simulator stopped");
    }
}

/// Owner's side of a running simulator.
pub struct TrafficHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TrafficHandle {
    /// `true` once the loop has exited, by shutdown or by a failed fetch.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the actor and waits for it to exit. A tick already running is
    /// allowed to finish first. Consuming `self` makes the signal one-shot.
    pub async fn shutdown(self) {
        // The receiver is gone if the loop already stopped on its own.
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "traffic simulator task failed");
        }
    }
}
