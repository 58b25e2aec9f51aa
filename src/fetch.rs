use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::antibot::random_user_agent;
use crate::fingerprint::HtmlResult;
use crate::scheduler::{PendingTask, Scheduler};
use crate::warc_sink::WarcSink;

/// Immutable context shared read-only by every fetch task: the HTTP client,
/// the WARC sink, the per-URL clamp bounds, and the monotonic instant the
/// harvest started at (strategies only ever see time *differences*, so any
/// fixed reference point works).
#[derive(Clone)]
pub struct FetchContext {
    pub client: reqwest::Client,
    pub sink: Arc<WarcSink>,
    pub lower_clamp: f64,
    pub upper_clamp: f64,
    pub start: Instant,
}

struct FetchOutcome {
    final_url: String,
    fingerprint: HtmlResult,
    timestamp: f64,
    headers: Vec<(String, String)>,
    body: bytes::Bytes,
}

async fn fetch_and_archive(url: &str, ctx: &FetchContext) -> anyhow::Result<FetchOutcome> {
    let t0 = Instant::now();
    let response = ctx
        .client
        .get(url)
        .header(reqwest::header::USER_AGENT, random_user_agent())
        .send()
        .await?
        .error_for_status()?;

    let final_url = response.url().to_string();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or("").to_string()))
        .collect();
    let body = response.bytes().await?;
    let t1 = Instant::now();

    let timestamp = ((t0.duration_since(ctx.start).as_secs_f64())
        + (t1.duration_since(ctx.start).as_secs_f64()))
        / 2.0;

    ctx.sink.write_response(&final_url, &headers, &body).await?;

    let fingerprint = HtmlResult::from_bytes(&body);

    Ok(FetchOutcome {
        final_url,
        fingerprint,
        timestamp,
        headers,
        body,
    })
}

/// Runs one fetch-task iteration to completion: GET, WARC write, fingerprint,
/// strategy update, clamp, reschedule. Any error in the fetch/write/extract
/// path is logged and the task does not reschedule — the per-URL "safety
/// halt" quarantine this crate's error policy calls for.
pub async fn run_once(task: PendingTask, scheduler: Arc<Scheduler>, ctx: FetchContext) {
    let PendingTask {
        url,
        mut strategy,
        last_observation,
        ..
    } = task;

    match fetch_and_archive(&url, &ctx).await {
        Ok(outcome) => {
            let (delay_since_prior, similarity_since_prior) = match &last_observation {
                Some((last_ts, last_fp)) => (
                    Some(outcome.timestamp - last_ts),
                    Some(last_fp.similarity(&outcome.fingerprint)),
                ),
                None => (None, None),
            };

            strategy.add_case(outcome.timestamp, &outcome.fingerprint);
            let raw_estimate = strategy.get_delay();
            let clamped_delay = raw_estimate.clamp(ctx.lower_clamp, ctx.upper_clamp);

            let new_fire_time = Instant::now() + Duration::from_secs_f64(clamped_delay);
            let new_last_observation = Some((outcome.timestamp, outcome.fingerprint));

            scheduler
                .enter_abs(new_fire_time, 1, url.clone(), strategy, new_last_observation)
                .await;

            tracing::info!(
                url = %url,
                final_url = %outcome.final_url,
                delay_since_prior,
                similarity_since_prior,
                raw_estimate,
                clamped_delay,
                body_bytes = outcome.body.len(),
                header_count = outcome.headers.len(),
                "fetch complete"
            );
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "fetch task failed; url quarantined");
        }
    }
}
