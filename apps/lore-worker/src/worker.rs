use std::{sync::Arc, time::Duration as StdDuration};

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::{sync::Semaphore, task::JoinSet, time as tokio_time};

use lore_pipeline::{ClaimedJob, PipelineService, enrich, queue};

/// Idle ticks between forced dispatches while the pending flag stays down.
/// The flag is advisory; a lost flag must cost bounded latency, not a stall.
const IDLE_FALLBACK_TICKS: u32 = 10;

pub async fn run_worker(service: Arc<PipelineService>) -> Result<()> {
	let poll_interval = StdDuration::from_millis(service.cfg.queue.poll_interval_ms);
	let sweep_interval = Duration::seconds(service.cfg.queue.stale_sweep_interval_secs);
	let batch_size = service.cfg.queue.batch_size as usize;
	let semaphore = Arc::new(Semaphore::new(service.cfg.queue.worker_concurrency as usize));
	let tracker = service.status_tracker();
	let mut join_set = JoinSet::new();
	let mut last_sweep = OffsetDateTime::now_utc();
	let mut idle_ticks = 0_u32;

	tracing::info!(
		batch_size,
		concurrency = service.cfg.queue.worker_concurrency,
		"Worker started."
	);

	loop {
		let now = OffsetDateTime::now_utc();

		if now - last_sweep >= sweep_interval {
			match queue::sweep_stale(&service).await {
				Ok(_) => last_sweep = now,
				Err(err) => tracing::error!(error = %err, "Stale claim sweep failed."),
			}
		}

		while let Some(joined) = join_set.try_join_next() {
			if let Err(err) = joined {
				tracing::error!(error = %err, "Enrichment task aborted.");
			}
		}

		// An unreadable flag counts as raised; the queue table settles it.
		let flagged = match tracker.pending_flag().await {
			Ok(flagged) => flagged,
			Err(err) => {
				tracing::warn!(error = %err, "Failed to read the pending flag.");

				true
			},
		};

		if !should_dispatch(flagged, idle_ticks) {
			idle_ticks += 1;

			tokio_time::sleep(poll_interval).await;

			continue;
		}

		idle_ticks = 0;

		let jobs = match queue::dispatch_once(&service).await {
			Ok(jobs) => jobs,
			Err(err) => {
				tracing::error!(error = %err, "Dispatch failed.");
				tokio_time::sleep(poll_interval).await;

				continue;
			},
		};
		let claimed = jobs.len();

		for job in jobs {
			let permit = semaphore.clone().acquire_owned().await?;
			let service = service.clone();

			join_set.spawn(async move {
				let _permit = permit;

				process_job(&service, job).await;
			});
		}

		// A full batch suggests more rows are waiting; skip the nap and
		// claim again.
		if claimed < batch_size {
			tokio_time::sleep(poll_interval).await;
		}
	}
}

/// Runs one claimed job to completion. Progress markers are advisory; a
/// failed cache write never fails the job.
async fn process_job(service: &PipelineService, job: ClaimedJob) {
	let tracker = service.status_tracker();

	if let Err(err) = tracker.incr_inflight().await {
		tracing::warn!(error = %err, "Failed to bump the inflight counter.");
	}
	if let Err(err) = tracker.mark_processing(job.user_id).await {
		tracing::warn!(error = %err, user_id = %job.user_id, "Failed to mark user processing.");
	}

	match enrich::run_enrichment(service, job.resource_id, job.message.as_deref()).await {
		Ok(outcome) => {
			tracing::info!(
				resource_id = %job.resource_id,
				enrichment_id = %outcome.enrichment_id,
				subresources_created = outcome.subresources_created,
				subresources_failed = outcome.subresources_failed,
				"Enrichment completed."
			);
		},
		Err(err) => {
			tracing::error!(
				error = %err,
				resource_id = %job.resource_id,
				"Enrichment failed. The claim will be requeued by the stale sweep."
			);
		},
	}

	if let Err(err) = tracker.mark_completed(job.user_id).await {
		tracing::warn!(error = %err, user_id = %job.user_id, "Failed to mark user completed.");
	}
	if let Err(err) = tracker.decr_inflight().await {
		tracing::warn!(error = %err, "Failed to drop the inflight counter.");
	}
}

/// A raised flag dispatches immediately; while it stays down the worker naps,
/// claiming anyway every [`IDLE_FALLBACK_TICKS`] ticks.
fn should_dispatch(flagged: bool, idle_ticks: u32) -> bool {
	flagged || idle_ticks >= IDLE_FALLBACK_TICKS
}
