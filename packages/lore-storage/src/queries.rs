use serde_json::Value;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{ClaimedEntry, Enrichment, ProcessingQueueEntry, Resource, Subresource, User},
};

pub async fn get_or_create_user(db: &Db, telegram_id: i64) -> Result<User> {
	// The no-op DO UPDATE makes RETURNING yield the row on both paths.
	let user = sqlx::query_as::<_, User>(
		"\
INSERT INTO users (telegram_id)
VALUES ($1)
ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
RETURNING user_id, telegram_id, profile, created_at",
	)
	.bind(telegram_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(user)
}

pub async fn set_user_profile(db: &Db, user_id: Uuid, profile: &str) -> Result<()> {
	sqlx::query("UPDATE users SET profile = $1 WHERE user_id = $2")
		.bind(profile)
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn get_user(db: &Db, user_id: Uuid) -> Result<Option<User>> {
	let user = sqlx::query_as::<_, User>(
		"SELECT user_id, telegram_id, profile, created_at FROM users WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(user)
}

pub async fn insert_message(
	db: &Db,
	user_id: Uuid,
	body: &str,
	message_type: &str,
) -> Result<Uuid> {
	let (message_id,): (Uuid,) = sqlx::query_as(
		"INSERT INTO messages (user_id, body, message_type) VALUES ($1, $2, $3) RETURNING message_id",
	)
	.bind(user_id)
	.bind(body)
	.bind(message_type)
	.fetch_one(&db.pool)
	.await?;

	Ok(message_id)
}

pub async fn insert_resource(
	db: &Db,
	user_id: Uuid,
	message_id: Option<Uuid>,
	source_kind: &str,
	source_url: &str,
	raw_caption: Option<&str>,
) -> Result<Uuid> {
	let (resource_id,): (Uuid,) = sqlx::query_as(
		"\
INSERT INTO resources (user_id, message_id, source_kind, source_url, raw_caption)
VALUES ($1, $2, $3, $4, $5)
RETURNING resource_id",
	)
	.bind(user_id)
	.bind(message_id)
	.bind(source_kind)
	.bind(source_url)
	.bind(raw_caption)
	.fetch_one(&db.pool)
	.await?;

	Ok(resource_id)
}

pub async fn get_resource(db: &Db, resource_id: Uuid) -> Result<Option<Resource>> {
	let resource =
		sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE resource_id = $1")
			.bind(resource_id)
			.fetch_optional(&db.pool)
			.await?;

	Ok(resource)
}

/// Attaches a late-arriving caption. Refused once enrichment has committed,
/// since the caption feeds the prompts and a processed resource would silently
/// ignore it.
pub async fn set_caption_if_unprocessed(
	db: &Db,
	resource_id: Uuid,
	caption: &str,
) -> Result<bool> {
	let result = sqlx::query(
		"UPDATE resources SET raw_caption = $1 WHERE resource_id = $2 AND NOT is_processed",
	)
	.bind(caption)
	.bind(resource_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn set_classification(db: &Db, resource_id: Uuid, resource_type: &str) -> Result<()> {
	sqlx::query("UPDATE resources SET resource_type = $1 WHERE resource_id = $2")
		.bind(resource_type)
		.bind(resource_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn set_title_and_summary(
	db: &Db,
	resource_id: Uuid,
	title: Option<&str>,
	summary: &str,
) -> Result<()> {
	sqlx::query("UPDATE resources SET title = COALESCE($1, title), summary = $2 WHERE resource_id = $3")
		.bind(title)
		.bind(summary)
		.bind(resource_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn insert_subresource(
	db: &Db,
	resource_id: Uuid,
	url: &str,
	title: Option<&str>,
	summary: &str,
	resource_type: Option<&str>,
) -> Result<Uuid> {
	let (subresource_id,): (Uuid,) = sqlx::query_as(
		"\
INSERT INTO subresources (resource_id, url, title, summary, resource_type)
VALUES ($1, $2, $3, $4, $5)
RETURNING subresource_id",
	)
	.bind(resource_id)
	.bind(url)
	.bind(title)
	.bind(summary)
	.bind(resource_type)
	.fetch_one(&db.pool)
	.await?;

	Ok(subresource_id)
}

pub async fn subresources_for(db: &Db, resource_id: Uuid) -> Result<Vec<Subresource>> {
	let rows = sqlx::query_as::<_, Subresource>(
		"SELECT * FROM subresources WHERE resource_id = $1 ORDER BY created_at ASC",
	)
	.bind(resource_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Inserts a pending entry, or resets a completed one so a resource can be
/// reprocessed. An entry already pending or processing is left alone.
pub async fn enqueue(db: &Db, resource_id: Uuid, user_id: Uuid, priority: i32) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO processing_queue (resource_id, user_id, priority)
VALUES ($1, $2, $3)
ON CONFLICT (resource_id) DO UPDATE SET
	status = 'pending',
	priority = EXCLUDED.priority,
	enqueued_at = now(),
	started_at = NULL,
	completed_at = NULL
WHERE processing_queue.status = 'completed'",
	)
	.bind(resource_id)
	.bind(user_id)
	.bind(priority)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Atomically claims up to `limit` pending entries, highest priority first.
/// The `FOR UPDATE SKIP LOCKED` subquery plus the outer status guard means two
/// concurrent dispatchers never claim the same entry.
pub async fn claim_pending_batch(db: &Db, limit: i64) -> Result<Vec<ClaimedEntry>> {
	let claimed = sqlx::query_as::<_, ClaimedEntry>(
		"\
UPDATE processing_queue
SET status = 'processing', started_at = now()
WHERE resource_id IN (
	SELECT resource_id
	FROM processing_queue
	WHERE status = 'pending'
	ORDER BY priority DESC, enqueued_at ASC
	LIMIT $1
	FOR UPDATE SKIP LOCKED
)
	AND status = 'pending'
RETURNING resource_id, user_id, priority",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(claimed)
}

/// Requeues entries stuck in `processing` longer than `stale_after_secs`,
/// covering workers that died mid-run. Returns how many were requeued.
pub async fn requeue_stale(db: &Db, stale_after_secs: i64) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE processing_queue
SET status = 'pending', started_at = NULL
WHERE status = 'processing'
	AND started_at < now() - make_interval(secs => $1::double precision)",
	)
	.bind(stale_after_secs)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn count_pending(db: &Db) -> Result<i64> {
	let (count,): (i64,) =
		sqlx::query_as("SELECT count(*) FROM processing_queue WHERE status = 'pending'")
			.fetch_one(&db.pool)
			.await?;

	Ok(count)
}

/// Pending and processing counts for one user, in a single scan.
pub async fn queue_counts_for_user(db: &Db, user_id: Uuid) -> Result<(i64, i64)> {
	let counts: (i64, i64) = sqlx::query_as(
		"\
SELECT
	count(*) FILTER (WHERE status = 'pending'),
	count(*) FILTER (WHERE status = 'processing')
FROM processing_queue
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(counts)
}

pub async fn queue_entry(db: &Db, resource_id: Uuid) -> Result<Option<ProcessingQueueEntry>> {
	let entry = sqlx::query_as::<_, ProcessingQueueEntry>(
		"SELECT * FROM processing_queue WHERE resource_id = $1",
	)
	.bind(resource_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(entry)
}

pub async fn message_body_for_resource(db: &Db, resource_id: Uuid) -> Result<Option<String>> {
	let body: Option<(String,)> = sqlx::query_as(
		"\
SELECT m.body
FROM resources r
JOIN messages m ON m.message_id = r.message_id
WHERE r.resource_id = $1",
	)
	.bind(resource_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(body.map(|(b,)| b))
}

/// The enrichment commit point. One transaction covers the enrichment row,
/// the resource flags, and the queue transition, so `is_processed = true`
/// always implies an enrichment row exists and the entry is `completed`.
pub async fn mark_enriched(
	db: &Db,
	resource_id: Uuid,
	enrichment_data: &Value,
	sources: &Value,
	tldr: &str,
) -> Result<Uuid> {
	let mut tx = db.pool.begin().await?;
	let (enrichment_id,): (Uuid,) = sqlx::query_as(
		"\
INSERT INTO ai_enrichments (resource_id, dynamic_enrichment_data, sources)
VALUES ($1, $2, $3)
RETURNING enrichment_id",
	)
	.bind(resource_id)
	.bind(enrichment_data)
	.bind(sources)
	.fetch_one(&mut *tx)
	.await?;

	sqlx::query("UPDATE resources SET tldr = $1, is_processed = true WHERE resource_id = $2")
		.bind(tldr)
		.bind(resource_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query(
		"\
UPDATE processing_queue
SET status = 'completed', completed_at = now()
WHERE resource_id = $1",
	)
	.bind(resource_id)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(enrichment_id)
}

/// Newest enrichment row for a resource; the append-only log makes the
/// newest row the current one.
pub async fn latest_enrichment(db: &Db, resource_id: Uuid) -> Result<Option<Enrichment>> {
	let enrichment = sqlx::query_as::<_, Enrichment>(
		"\
SELECT *
FROM ai_enrichments
WHERE resource_id = $1
ORDER BY created_at DESC
LIMIT 1",
	)
	.bind(resource_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(enrichment)
}

pub async fn latest_processed(db: &Db, user_id: Uuid, limit: i64) -> Result<Vec<Resource>> {
	let rows = sqlx::query_as::<_, Resource>(
		"\
SELECT *
FROM resources
WHERE user_id = $1 AND is_processed
ORDER BY created_at DESC
LIMIT $2",
	)
	.bind(user_id)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Writes `pdf_url` only when it is still unset. Returns whether this call
/// was the one that wrote it.
pub async fn set_pdf_url_once(db: &Db, resource_id: Uuid, url: &str) -> Result<bool> {
	let result = sqlx::query(
		"UPDATE resources SET pdf_url = $1 WHERE resource_id = $2 AND pdf_url IS NULL",
	)
	.bind(url)
	.bind(resource_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn mark_viewed(db: &Db, resource_id: Uuid) -> Result<()> {
	sqlx::query("UPDATE resources SET is_viewed = true WHERE resource_id = $1")
		.bind(resource_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}
