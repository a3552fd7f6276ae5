use serde_json::json;

use lore_domain::source_kind::SourceKind;
use lore_pipeline::intake;
use lore_storage::queries;

use super::*;

fn plain_providers() -> lore_pipeline::Providers {
	stub_providers(
		StubExtractor::default(),
		StubOracle::article(json!({})),
		StubResearch { findings: None },
	)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn link_then_comment_merges_into_one_submission() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping link_then_comment_merges_into_one_submission; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let link = intake::submit_message(&svc, 300, "https://example.com/a")
		.await
		.expect("Failed to submit the link.");
	let resource_id = link.resource_id.expect("Expected a resource for the link.");

	assert!(!link.merged);

	let comment = intake::submit_message(&svc, 300, "focus on the pricing angle")
		.await
		.expect("Failed to submit the comment.");

	assert!(comment.merged);
	assert_eq!(comment.resource_id, Some(resource_id));

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.raw_caption.as_deref(), Some("focus on the pricing angle"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn comment_then_link_becomes_the_caption() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping comment_then_link_becomes_the_caption; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let comment = intake::submit_message(&svc, 301, "why does this keep coming up")
		.await
		.expect("Failed to submit the comment.");

	assert_eq!(comment.resource_id, None);

	let link = intake::submit_message(&svc, 301, "https://example.com/a")
		.await
		.expect("Failed to submit the link.");
	let resource_id = link.resource_id.expect("Expected a resource for the link.");

	assert!(link.merged);

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.raw_caption.as_deref(), Some("why does this keep coming up"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn inline_caption_wins_over_a_buffered_comment() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping inline_caption_wins_over_a_buffered_comment; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;

	intake::submit_message(&svc, 302, "older framing").await.expect("Failed to submit.");

	let link = intake::submit_message(&svc, 302, "fresh framing https://example.com/a")
		.await
		.expect("Failed to submit the link.");
	let resource = queries::get_resource(&svc.db, link.resource_id.expect("Expected a resource."))
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.raw_caption.as_deref(), Some("fresh framing"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn late_captions_never_touch_processed_resources() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping late_captions_never_touch_processed_resources; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let link = intake::submit_message(&svc, 303, "https://example.com/a")
		.await
		.expect("Failed to submit the link.");
	let resource_id = link.resource_id.expect("Expected a resource.");

	queries::mark_enriched(&svc.db, resource_id, &json!({}), &json!([]), "tldr")
		.await
		.expect("Failed to mark enriched.");

	let comment = intake::submit_message(&svc, 303, "too late to matter")
		.await
		.expect("Failed to submit the comment.");

	assert!(!comment.merged);

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.raw_caption, None);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn screenshot_attachment_creates_a_pending_resource() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping screenshot_attachment_creates_a_pending_resource; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let outcome = intake::submit_attachment(
		&svc,
		305,
		"https://files.test/shot.png",
		SourceKind::Image,
		Some("what tool is this"),
	)
	.await
	.expect("Failed to submit the attachment.");
	let resource_id = outcome.resource_id.expect("Expected a resource.");
	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.source_kind, "image");
	assert_eq!(resource.source_url.as_deref(), Some("https://files.test/shot.png"));
	assert_eq!(resource.raw_caption.as_deref(), Some("what tool is this"));

	let entry = queries::queue_entry(&svc.db, resource_id)
		.await
		.expect("Failed to read queue entry.")
		.expect("Expected a queue entry.");

	assert_eq!(entry.status, "pending");
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn buffered_comment_captions_a_following_attachment() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping buffered_comment_captions_a_following_attachment; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;

	intake::submit_message(&svc, 306, "notes from the workshop").await.expect("Failed to submit.");

	let outcome = intake::submit_attachment(
		&svc,
		306,
		"https://files.test/notes.pdf",
		SourceKind::Document,
		None,
	)
	.await
	.expect("Failed to submit the attachment.");

	assert!(outcome.merged);

	let resource = queries::get_resource(&svc.db, outcome.resource_id.expect("Expected a resource."))
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert_eq!(resource.source_kind, "document");
	assert_eq!(resource.raw_caption.as_deref(), Some("notes from the workshop"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn links_are_rejected_as_attachments() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping links_are_rejected_as_attachments; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let err =
		intake::submit_attachment(&svc, 307, "https://example.com/a", SourceKind::Link, None)
			.await
			.expect_err("Expected the submission to fail.");

	assert!(matches!(err, lore_pipeline::ServiceError::InvalidRequest { .. }));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn bare_comments_are_stored_without_a_resource() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping bare_comments_are_stored_without_a_resource; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(test_config(test_db.dsn().to_string()), plain_providers()).await;
	let outcome = intake::submit_message(&svc, 304, "just a passing thought")
		.await
		.expect("Failed to submit the comment.");

	assert_eq!(outcome.resource_id, None);

	let (count,): (i64,) =
		sqlx::query_as("SELECT count(*) FROM messages WHERE message_id = $1")
			.bind(outcome.message_id)
			.fetch_one(&svc.db.pool)
			.await
			.expect("Failed to count messages.");

	assert_eq!(count, 1);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
