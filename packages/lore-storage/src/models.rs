use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct User {
	pub user_id: Uuid,
	pub telegram_id: i64,
	pub profile: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Message {
	pub message_id: Uuid,
	pub user_id: Uuid,
	pub body: String,
	pub message_type: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Resource {
	pub resource_id: Uuid,
	pub user_id: Uuid,
	pub message_id: Option<Uuid>,
	pub source_kind: String,
	pub source_url: Option<String>,
	pub raw_caption: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub resource_type: Option<String>,
	pub tags: Value,
	pub metadata: Value,
	pub tldr: Option<String>,
	pub pdf_url: Option<String>,
	pub is_processed: bool,
	pub is_viewed: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Subresource {
	pub subresource_id: Uuid,
	pub resource_id: Uuid,
	pub url: String,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub resource_type: Option<String>,
	pub tags: Value,
	pub metadata: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProcessingQueueEntry {
	pub resource_id: Uuid,
	pub user_id: Uuid,
	pub status: String,
	pub priority: i32,
	pub enqueued_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	pub completed_at: Option<OffsetDateTime>,
}

/// The slice of a queue entry a dispatcher needs to hand a job to a worker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimedEntry {
	pub resource_id: Uuid,
	pub user_id: Uuid,
	pub priority: i32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Enrichment {
	pub enrichment_id: Uuid,
	pub resource_id: Uuid,
	pub dynamic_enrichment_data: Value,
	pub sources: Value,
	pub created_at: OffsetDateTime,
}
