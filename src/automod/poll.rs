use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::engine;
use super::executor::{ApplyReport, PunitionExecutor};
use super::moderator::ModeratorRegistry;
use super::warmup::WarmupGuard;
use crate::rcon::CommandChannel;

/// Idle time between two cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing enabled; the engine did not run and the guard was left alone
    NoModerators,
    /// What the server accepted, skipped or refused this cycle
    Applied(ApplyReport),
}

/// Steady-state driver: evaluate the full table, apply, idle, repeat
pub struct PollLoop {
    channel: Arc<dyn CommandChannel>,
    registry: Arc<ModeratorRegistry>,
    executor: Arc<PunitionExecutor>,
    guard: Arc<WarmupGuard>,
    interval: Duration,
}

impl PollLoop {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        registry: Arc<ModeratorRegistry>,
        executor: Arc<PunitionExecutor>,
        guard: Arc<WarmupGuard>,
    ) -> Self {
        Self {
            channel,
            registry,
            executor,
            guard,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One evaluation cycle
    pub async fn punish_squads(&self) -> Result<CycleOutcome> {
        let moderators = self.registry.enabled_moderators().await;
        if moderators.is_empty() {
            debug!("No automod is enabled");
            return Ok(CycleOutcome::NoModerators);
        }

        let punitions = engine::get_punitions_to_apply(self.channel.as_ref(), &moderators)
            .await
            .context("Failed to evaluate match state")?;

        let report = self
            .executor
            .apply(&punitions, &moderators)
            .await
            .context("Failed to apply punitions")?;

        self.guard.mark_ready().await?;

        Ok(CycleOutcome::Applied(report))
    }

    /// Run cycles forever
    ///
    /// The first failed cycle ends the loop with its error; restarting is
    /// left to whoever supervises the task.
    pub async fn run(&self) -> Result<()> {
        info!("Squad automod started, polling every {:?}", self.interval);

        loop {
            match self.punish_squads().await {
                Ok(CycleOutcome::Applied(report)) if report != ApplyReport::default() => {
                    info!(
                        "Automod cycle applied {} warning(s), {} punish(es), {} kick(s); \
                         {} dry run, {} failed",
                        report.warnings,
                        report.punishes,
                        report.kicks,
                        report.dry_run,
                        report.failed
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Squad automod: Something unexpected happened: {:#}", e);
                    return Err(e);
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
