//! Link/comment correlation for inbound messages.
//!
//! A bare link and a bare comment sent within a short window are merged into
//! one submission. The state machine here is pure; the pipeline layer owns
//! the per-user buffer (a cache key whose TTL is the merge window) and the
//! side effects each action implies. Expiry needs no flush step: every
//! inbound message is stored on receipt and every link is submitted on
//! receipt, so a lapsed window simply leaves two independent submissions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::urls;

/// What a single inbound message turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
	Link { url: String, inline_caption: Option<String> },
	Comment { text: String },
}

/// Per-user buffer contents, serialized into the cache between messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Buffered {
	/// A link already submitted; a follow-up comment may still attach to it.
	Link { resource_id: Uuid },
	/// A comment already stored; a follow-up link may claim it as caption.
	Comment { text: String },
}

/// Side effect the pipeline must perform for this message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeAction {
	/// Create a resource for `url` and enqueue it.
	SubmitLink { url: String, caption: Option<String> },
	/// Merge a late-arriving comment into the just-submitted resource.
	AttachCaption { resource_id: Uuid, caption: String },
}

/// Buffer state to persist after handling the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextBuffer {
	/// Caller buffers `Buffered::Link` with the resource id it just created.
	HoldSubmittedLink,
	HoldComment(String),
	Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
	pub action: Option<IntakeAction>,
	pub next: NextBuffer,
}

/// Splits an inbound message into link + inline caption, or a bare comment.
pub fn parse_inbound(text: &str) -> IntakeEvent {
	let Some(url) = urls::extract_url(text) else {
		return IntakeEvent::Comment { text: text.trim().to_string() };
	};
	let remainder = text.replacen(&url, "", 1);
	let caption = remainder.trim();
	let inline_caption = (!caption.is_empty()).then(|| caption.to_string());

	IntakeEvent::Link { url, inline_caption }
}

pub fn step(buffered: Option<Buffered>, event: IntakeEvent) -> IntakeOutcome {
	match (buffered, event) {
		// A fresh link; hold it open for a trailing comment.
		(None, IntakeEvent::Link { url, inline_caption }) => IntakeOutcome {
			action: Some(IntakeAction::SubmitLink { url, caption: inline_caption }),
			next: NextBuffer::HoldSubmittedLink,
		},
		// A fresh comment; hold it for a trailing link.
		(None, IntakeEvent::Comment { text }) =>
			IntakeOutcome { action: None, next: NextBuffer::HoldComment(text) },
		// Comment-then-link within the window: merged submission. An inline
		// caption on the link wins over the buffered comment.
		(Some(Buffered::Comment { text }), IntakeEvent::Link { url, inline_caption }) =>
			IntakeOutcome {
				action: Some(IntakeAction::SubmitLink {
					url,
					caption: inline_caption.or(Some(text)),
				}),
				next: NextBuffer::Clear,
			},
		// Link-then-comment within the window: attach retroactively.
		(Some(Buffered::Link { resource_id }), IntakeEvent::Comment { text }) => IntakeOutcome {
			action: Some(IntakeAction::AttachCaption { resource_id, caption: text }),
			next: NextBuffer::Clear,
		},
		// Same-kind collision: the earlier item was already handled on
		// receipt, so only the newcomer matters.
		(Some(Buffered::Link { .. }), IntakeEvent::Link { url, inline_caption }) =>
			IntakeOutcome {
				action: Some(IntakeAction::SubmitLink { url, caption: inline_caption }),
				next: NextBuffer::HoldSubmittedLink,
			},
		(Some(Buffered::Comment { .. }), IntakeEvent::Comment { text }) =>
			IntakeOutcome { action: None, next: NextBuffer::HoldComment(text) },
	}
}
