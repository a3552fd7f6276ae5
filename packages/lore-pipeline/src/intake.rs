use tracing::warn;
use uuid::Uuid;

use lore_domain::{
	intake::{Buffered, IntakeAction, IntakeEvent, NextBuffer, parse_inbound, step},
	source_kind::SourceKind,
};
use lore_storage::queries;

use crate::{PipelineService, ServiceError, ServiceResult, queue};

/// What one inbound message turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
	pub user_id: Uuid,
	pub message_id: Uuid,
	/// The resource created for a link submission, if any.
	pub resource_id: Option<Uuid>,
	/// Whether this message merged into an earlier one within the window.
	pub merged: bool,
}

/// Intake entry point for the bot boundary. Stores the message, runs the
/// link/comment correlation step, and applies whatever it decided. The merge
/// buffer is best effort: any cache failure degrades to two independent
/// submissions and is only logged.
pub async fn submit_message(
	svc: &PipelineService,
	telegram_id: i64,
	text: &str,
) -> ServiceResult<SubmitOutcome> {
	let user = queries::get_or_create_user(&svc.db, telegram_id).await?;
	let event = parse_inbound(text);
	let message_type = match &event {
		IntakeEvent::Link { .. } => "link",
		IntakeEvent::Comment { .. } => "comment",
	};
	let message_id = queries::insert_message(&svc.db, user.user_id, text, message_type).await?;

	apply(svc, user.user_id, message_id, event, SourceKind::Link).await
}

/// Intake entry point for document and image submissions. The stored file URL
/// goes through the same correlation step as a link, so a buffered comment
/// within the window still merges in as the caption.
pub async fn submit_attachment(
	svc: &PipelineService,
	telegram_id: i64,
	file_url: &str,
	kind: SourceKind,
	caption: Option<&str>,
) -> ServiceResult<SubmitOutcome> {
	if kind == SourceKind::Link {
		return Err(ServiceError::InvalidRequest {
			message: "Links are submitted as messages, not attachments.".to_string(),
		});
	}
	if file_url.trim().is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "Attachment file URL must be non-empty.".to_string(),
		});
	}

	let user = queries::get_or_create_user(&svc.db, telegram_id).await?;
	let body = caption.unwrap_or(file_url);
	let message_id = queries::insert_message(&svc.db, user.user_id, body, kind.as_str()).await?;
	let event = IntakeEvent::Link {
		url: file_url.to_string(),
		inline_caption: caption.map(str::to_string),
	};

	apply(svc, user.user_id, message_id, event, kind).await
}

async fn apply(
	svc: &PipelineService,
	user_id: Uuid,
	message_id: Uuid,
	event: IntakeEvent,
	kind: SourceKind,
) -> ServiceResult<SubmitOutcome> {
	let buffer = svc.merge_buffer();
	let buffered = match buffer.get(user_id).await {
		Ok(Some(payload)) => match serde_json::from_str::<Buffered>(&payload) {
			Ok(buffered) => Some(buffered),
			Err(err) => {
				warn!(user_id = %user_id, error = %err, "Discarding an unreadable intake buffer.");

				None
			},
		},
		Ok(None) => None,
		Err(err) => {
			warn!(user_id = %user_id, error = %err, "Intake buffer read failed; treating the message as standalone.");

			None
		},
	};
	let outcome = step(buffered, event);
	let mut resource_id = None;
	let mut merged = false;

	match outcome.action {
		Some(IntakeAction::SubmitLink { url, caption }) => {
			merged = caption.is_some() && matches!(outcome.next, NextBuffer::Clear);

			let created = queries::insert_resource(
				&svc.db,
				user_id,
				Some(message_id),
				kind.as_str(),
				&url,
				caption.as_deref(),
			)
			.await?;

			queue::enqueue(svc, created, user_id, None).await?;

			resource_id = Some(created);
		},
		Some(IntakeAction::AttachCaption { resource_id: target, caption }) => {
			if queries::set_caption_if_unprocessed(&svc.db, target, &caption).await? {
				merged = true;
				resource_id = Some(target);
			} else {
				warn!(resource_id = %target, "Caption arrived after processing; kept as a standalone message.");
			}
		},
		None => {},
	}

	let buffer_result = match outcome.next {
		NextBuffer::HoldSubmittedLink => match resource_id {
			Some(resource_id) => {
				let payload =
					serde_json::to_string(&Buffered::Link { resource_id }).unwrap_or_default();

				buffer.put(user_id, &payload).await
			},
			None => Ok(()),
		},
		NextBuffer::HoldComment(text) => {
			let payload = serde_json::to_string(&Buffered::Comment { text }).unwrap_or_default();

			buffer.put(user_id, &payload).await
		},
		NextBuffer::Clear => buffer.clear(user_id).await,
	};

	if let Err(err) = buffer_result {
		warn!(user_id = %user_id, error = %err, "Intake buffer write failed; merge window disabled for this message.");
	}

	Ok(SubmitOutcome { user_id, message_id, resource_id, merged })
}
