use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::HarvestError;
use crate::fetch::{self, FetchContext};
use crate::scheduler::Scheduler;
use crate::strategy::StrategyKind;
use crate::warc_sink::WarcSink;

/// Constructs the WARC sink, HTTP client, and scheduler, then drives a
/// harvest session across one worker pool. Caller supplies construction
/// arguments directly rather than through an optional-subsystem builder
/// chain (there is no optional subsystem here to defer).
pub struct Harvester {
    scheduler: Arc<Scheduler>,
    ctx: FetchContext,
}

impl Harvester {
    pub fn new(
        output_name: &str,
        worker_count: usize,
        lower_clamp: f64,
        upper_clamp: f64,
    ) -> Result<Self, HarvestError> {
        let sink = WarcSink::open(output_name)
            .map_err(|source| HarvestError::WriteFailed { source })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HarvestError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let scheduler = Arc::new(Scheduler::new(worker_count));
        let ctx = FetchContext {
            client,
            sink: Arc::new(sink),
            lower_clamp,
            upper_clamp,
            start: Instant::now(),
        };

        Ok(Self { scheduler, ctx })
    }

    /// A handle to the shared WARC sink, for callers (tests, monitoring)
    /// that need to observe archival progress without reading the gzip file
    /// on disk, which isn't safely decodable until the encoder is dropped.
    pub fn sink(&self) -> Arc<WarcSink> {
        self.ctx.sink.clone()
    }

    /// Installs one strategy per URL, stages initial visits starting at
    /// `now() + 10s` staggered by `default_delay / len(urls)` seconds,
    /// enqueues each with the configured clamps, and drives the scheduler on
    /// a dedicated task. Returns a `JoinHandle` the caller can await or
    /// abort; it never completes under normal operation.
    pub fn harvest(
        self,
        urls: Vec<String>,
        target: f64,
        default_delay: f64,
        kind: StrategyKind,
    ) -> Result<JoinHandle<()>, HarvestError> {
        if urls.is_empty() {
            return Err(HarvestError::InvalidConfig(
                "URL list must not be empty".to_string(),
            ));
        }
        // Validates (default_delay, target) once up front so construction
        // failures surface before anything is scheduled.
        kind.build(default_delay, target)?;

        let Harvester { scheduler, ctx } = self;
        let diff = default_delay / urls.len() as f64;

        let handle = tokio::spawn(async move {
            let mut start_time = Instant::now() + Duration::from_secs(10);
            for url in urls {
                let strategy = match kind.build(default_delay, target) {
                    Ok(strategy) => strategy,
                    Err(err) => {
                        tracing::error!(url = %url, error = %err, "failed to build strategy; url skipped");
                        continue;
                    }
                };
                start_time += Duration::from_secs_f64(diff);
                scheduler
                    .enter_abs(start_time, 1, url, strategy, None)
                    .await;
            }

            scheduler
                .clone()
                .run(move |task, scheduler| {
                    let ctx = ctx.clone();
                    Box::pin(async move { fetch::run_once(task, scheduler, ctx).await })
                })
                .await;
        });

        Ok(handle)
    }
}
