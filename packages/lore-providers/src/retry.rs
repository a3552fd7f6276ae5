use std::time::Duration;

use tracing::warn;

use crate::Result;

/// Exponential backoff schedule shared by every provider call. Each call
/// class picks its own attempt count; the delays come from config.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}
impl RetryPolicy {
	/// Fatal call classes run exactly once.
	pub fn none() -> Self {
		Self { attempts: 1, base_delay_ms: 0, max_delay_ms: 0 }
	}

	pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
		let exp = attempt.max(1).saturating_sub(1).min(6);
		let base = self.base_delay_ms.saturating_mul(1 << exp);
		let capped = base.min(self.max_delay_ms);

		Duration::from_millis(capped)
	}
}

/// Runs `op` up to `policy.attempts` times, sleeping the backoff between
/// attempts. The final error is returned unchanged.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let attempts = policy.attempts.max(1);
	let mut last_err = None;

	for attempt in 1..=attempts {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) => {
				if attempt < attempts {
					let backoff = policy.backoff_for_attempt(attempt);

					warn!(
						%attempt,
						backoff_ms = backoff.as_millis() as u64,
						error = %err,
						"Provider call {label} failed; retrying."
					);
					tokio::time::sleep(backoff).await;
				}

				last_err = Some(err);
			},
		}
	}

	Err(last_err.expect("At least one attempt always runs."))
}
