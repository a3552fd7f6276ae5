use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use lore_domain::source_kind::SourceKind;
use lore_pipeline::ServiceError;
use lore_storage::models::{Enrichment, Resource};

use crate::state::AppState;

const MAX_LATEST_LIMIT: i64 = 50;
const DEFAULT_LATEST_LIMIT: i64 = 10;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/messages", post(submit_message))
		.route("/v1/attachments", post(submit_attachment))
		.route("/v1/resources/{resource_id}/enqueue", post(enqueue))
		.route("/v1/resources/{resource_id}/enrichment", get(enrichment))
		.route("/v1/resources/{resource_id}/pdf", post(render_pdf))
		.route("/v1/resources/latest", get(latest))
		.route("/v1/status/{user_id}", get(status))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct SubmitMessageRequest {
	telegram_id: i64,
	text: String,
}

#[derive(Debug, Serialize)]
struct SubmitMessageResponse {
	user_id: Uuid,
	message_id: Uuid,
	resource_id: Option<Uuid>,
	merged: bool,
}

async fn submit_message(
	State(state): State<AppState>,
	Json(payload): Json<SubmitMessageRequest>,
) -> Result<Json<SubmitMessageResponse>, ApiError> {
	let outcome =
		lore_pipeline::intake::submit_message(&state.service, payload.telegram_id, &payload.text)
			.await?;

	Ok(Json(SubmitMessageResponse {
		user_id: outcome.user_id,
		message_id: outcome.message_id,
		resource_id: outcome.resource_id,
		merged: outcome.merged,
	}))
}

#[derive(Debug, Deserialize)]
struct SubmitAttachmentRequest {
	telegram_id: i64,
	/// Where the bot stored the uploaded file.
	file_url: String,
	kind: SourceKind,
	#[serde(default)]
	caption: Option<String>,
}

async fn submit_attachment(
	State(state): State<AppState>,
	Json(payload): Json<SubmitAttachmentRequest>,
) -> Result<Json<SubmitMessageResponse>, ApiError> {
	let outcome = lore_pipeline::intake::submit_attachment(
		&state.service,
		payload.telegram_id,
		&payload.file_url,
		payload.kind,
		payload.caption.as_deref(),
	)
	.await?;

	Ok(Json(SubmitMessageResponse {
		user_id: outcome.user_id,
		message_id: outcome.message_id,
		resource_id: outcome.resource_id,
		merged: outcome.merged,
	}))
}

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
	user_id: Uuid,
	#[serde(default)]
	priority: Option<i32>,
}

async fn enqueue(
	State(state): State<AppState>,
	Path(resource_id): Path<Uuid>,
	Json(payload): Json<EnqueueRequest>,
) -> Result<StatusCode, ApiError> {
	lore_pipeline::queue::enqueue(&state.service, resource_id, payload.user_id, payload.priority)
		.await?;

	Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Serialize)]
struct EnrichmentResponse {
	enrichment_id: Uuid,
	resource_id: Uuid,
	enrichment: Value,
	sources: Value,
	created_at: String,
}

async fn enrichment(
	State(state): State<AppState>,
	Path(resource_id): Path<Uuid>,
) -> Result<Json<EnrichmentResponse>, ApiError> {
	let enrichment = lore_pipeline::reads::get_enrichment(&state.service, resource_id)
		.await?
		.ok_or_else(|| {
			json_error(
				StatusCode::NOT_FOUND,
				"not_found",
				format!("No enrichment for resource {resource_id}."),
			)
		})?;

	Ok(Json(enrichment_response(enrichment)?))
}

#[derive(Debug, Serialize)]
struct RenderPdfResponse {
	pdf_url: String,
}

async fn render_pdf(
	State(state): State<AppState>,
	Path(resource_id): Path<Uuid>,
) -> Result<Json<RenderPdfResponse>, ApiError> {
	let pdf_url = lore_pipeline::render::render_pdf_if_absent(&state.service, resource_id).await?;

	Ok(Json(RenderPdfResponse { pdf_url }))
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
	user_id: Uuid,
	#[serde(default)]
	limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ResourceSummary {
	resource_id: Uuid,
	source_url: Option<String>,
	title: Option<String>,
	summary: Option<String>,
	resource_type: Option<String>,
	tags: Value,
	tldr: Option<String>,
	pdf_url: Option<String>,
	is_viewed: bool,
	created_at: String,
}

#[derive(Debug, Serialize)]
struct LatestResponse {
	resources: Vec<ResourceSummary>,
}

async fn latest(
	State(state): State<AppState>,
	Query(query): Query<LatestQuery>,
) -> Result<Json<LatestResponse>, ApiError> {
	let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT).clamp(1, MAX_LATEST_LIMIT);
	let resources =
		lore_pipeline::reads::get_latest_processed(&state.service, query.user_id, limit).await?;
	let resources =
		resources.into_iter().map(resource_summary).collect::<Result<Vec<_>, ApiError>>()?;

	Ok(Json(LatestResponse { resources }))
}

async fn status(
	State(state): State<AppState>,
	Path(user_id): Path<Uuid>,
) -> Result<Json<lore_cache::status::StatusReport>, ApiError> {
	let report = lore_pipeline::status::get_status(&state.service, user_id).await?;

	Ok(Json(report))
}

fn resource_summary(resource: Resource) -> Result<ResourceSummary, ApiError> {
	Ok(ResourceSummary {
		resource_id: resource.resource_id,
		source_url: resource.source_url,
		title: resource.title,
		summary: resource.summary,
		resource_type: resource.resource_type,
		tags: resource.tags,
		tldr: resource.tldr,
		pdf_url: resource.pdf_url,
		is_viewed: resource.is_viewed,
		created_at: format_timestamp(resource.created_at)?,
	})
}

fn enrichment_response(enrichment: Enrichment) -> Result<EnrichmentResponse, ApiError> {
	Ok(EnrichmentResponse {
		enrichment_id: enrichment.enrichment_id,
		resource_id: enrichment.resource_id,
		enrichment: enrichment.dynamic_enrichment_data,
		sources: enrichment.sources,
		created_at: format_timestamp(enrichment.created_at)?,
	})
}

fn format_timestamp(ts: time::OffsetDateTime) -> Result<String, ApiError> {
	ts.format(&Rfc3339).map_err(|_| {
		json_error(
			StatusCode::INTERNAL_SERVER_ERROR,
			"internal",
			"Failed to format timestamp.",
		)
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::NotFound { .. } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message),
			ServiceError::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::ExtractionFailed { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "extraction_failed", message),
			ServiceError::OracleFailed { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "oracle_failed", message),
			ServiceError::ResearchUnavailable { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "research_unavailable", message),
			ServiceError::Storage { .. } => json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage", message),
			ServiceError::Cache { .. } => json_error(StatusCode::INTERNAL_SERVER_ERROR, "cache", message),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
