use mirror_core::ErrorExt;
use seen_store::SeenCache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub mod notify;
pub mod pipeline;


pub use notify::{CycleNotifier, DesktopNotifier};
pub use pipeline::{CycleReport, MirrorPipeline, PipelineSettings, PostOutcome};

/// Everything a poll cycle reads or mutates.
pub struct AppState {
    pub pipeline: MirrorPipeline,
    pub cache: SeenCache,
    pub cycles: u64,
}

impl AppState {
    pub fn new(pipeline: MirrorPipeline, cache: SeenCache) -> Self {
        Self {
            pipeline,
            cache,
            cycles: 0,
        }
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        info!("Starting poll cycle {}", self.cycles);
        let now = chrono::Utc::now().timestamp();
        let report = self.pipeline.run_cycle(&mut self.cache, now).await;
        info!("Cycle {} finished: {}", self.cycles, report.summary());
        report
    }
}

pub struct BackgroundService {
    state: AppState,
    polling_interval: Duration,
    run_once: bool,
    notifier: Option<Arc<dyn CycleNotifier>>,
}

impl BackgroundService {
    pub fn new(state: AppState, polling_interval: Duration, run_once: bool) -> Self {
        Self {
            state,
            polling_interval,
            run_once,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CycleNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Polls until Ctrl-C (or after one cycle in run-once mode), then flushes the seen-set.
    pub async fn start(self) -> AppState {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Polls until `shutdown` resolves. The future is polled across cycles,
    /// so a signal that arrives while notifying still stops the loop.
    pub async fn run_until<F: Future>(mut self, shutdown: F) -> AppState {
        info!(
            "Background service started, polling every {:?}{}",
            self.polling_interval,
            if self.run_once { " (single cycle)" } else { "" }
        );

        tokio::pin!(shutdown);

        loop {
            let report = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested during cycle");
                    break;
                }
                report = self.state.run_cycle() => report,
            };

            if let Some(notifier) = &self.notifier {
                notifier.notify(
                    &format!("gfy_mirror cycle {}", self.state.cycles),
                    &report.summary(),
                );
            }

            if self.run_once {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.polling_interval) => {}
            }
        }

        self.stop().await
    }

    async fn stop(mut self) -> AppState {
        if let Err(e) = self.state.cache.flush().await {
            e.log_error();
            error!("Seen-set could not be saved on shutdown");
        }
        info!(
            "Background service stopped after {} cycles",
            self.state.cycles
        );
        self.state
    }
}
