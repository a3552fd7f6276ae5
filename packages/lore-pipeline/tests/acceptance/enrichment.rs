use std::sync::Arc;

use serde_json::json;

use lore_domain::source_kind::SourceKind;
use lore_pipeline::{Providers, ServiceError, enrich, intake, queue};
use lore_providers::research::Findings;
use lore_storage::queries;

use super::*;

const MAIN_URL: &str = "https://example.com/main";
const SUB_ONE: &str = "https://example.com/sub-one";
const SUB_TWO: &str = "https://example.com/sub-two";

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn full_run_commits_everything_in_one_step() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping full_run_commits_everything_in_one_step; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(
		MAIN_URL,
		&format!("Main body linking {SUB_ONE} and {SUB_TWO} for depth."),
	)
	.with(SUB_ONE, "First linked body.")
	.with(SUB_TWO, "Second linked body.");
	let oracle = StubOracle::article(json!({ "concept": "flow", "sources": ["https://src"] }));
	let research = StubResearch { findings: None };
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, research),
	)
	.await;
	let (user_id, resource_id) = seed_link(&svc, 100, MAIN_URL, Some("worth a read")).await;

	queue::enqueue(&svc, resource_id, user_id, None).await.expect("Failed to enqueue.");

	let jobs = queue::dispatch_once(&svc).await.expect("Failed to dispatch.");

	assert_eq!(jobs.len(), 1);

	let outcome = enrich::run_enrichment(&svc, resource_id, jobs[0].message.as_deref())
		.await
		.expect("Enrichment run failed.");

	assert_eq!(outcome.subresources_created, 2);
	assert_eq!(outcome.subresources_failed, 0);

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(resource.is_processed);
	assert_eq!(resource.resource_type.as_deref(), Some("article"));
	assert_eq!(resource.summary.as_deref(), Some("Main summary."));
	assert!(!resource.tldr.unwrap_or_default().is_empty());

	let enrichment = queries::latest_enrichment(&svc.db, resource_id)
		.await
		.expect("Failed to read enrichment.")
		.expect("Expected an enrichment row.");
	let bag = enrichment.dynamic_enrichment_data.as_object().expect("Expected an object.");

	assert_eq!(bag.get("concept"), Some(&json!("flow")));
	// Degraded research cites nothing.
	assert_eq!(enrichment.sources, json!([]));

	let entry = queries::queue_entry(&svc.db, resource_id)
		.await
		.expect("Failed to read queue entry.")
		.expect("Expected a queue entry.");

	assert_eq!(entry.status, "completed");
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn one_dead_link_never_aborts_siblings() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping one_dead_link_never_aborts_siblings; set LORE_PG_DSN to run.");

		return;
	};
	// SUB_TWO has no body, so its expansion fails.
	let extractor =
		StubExtractor::single(MAIN_URL, &format!("Links {SUB_ONE} and {SUB_TWO} inline."))
			.with(SUB_ONE, "First linked body.");
	let oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 101, MAIN_URL, None).await;
	let outcome = enrich::run_enrichment(&svc, resource_id, None)
		.await
		.expect("Enrichment run failed.");

	assert_eq!(outcome.subresources_created, 1);
	assert_eq!(outcome.subresources_failed, 1);

	let subresources = queries::subresources_for(&svc.db, resource_id)
		.await
		.expect("Failed to read subresources.");

	assert_eq!(subresources.len(), 1);
	assert_eq!(subresources[0].url, SUB_ONE);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn primary_failure_leaves_pre_run_state() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping primary_failure_leaves_pre_run_state; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, "Plain body with no links.");
	let mut oracle = StubOracle::article(json!({}));

	oracle.fail_primary = true;

	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (user_id, resource_id) = seed_link(&svc, 102, MAIN_URL, None).await;

	queue::enqueue(&svc, resource_id, user_id, None).await.expect("Failed to enqueue.");
	queue::dispatch_once(&svc).await.expect("Failed to dispatch.");

	let err = enrich::run_enrichment(&svc, resource_id, None)
		.await
		.expect_err("Expected the run to fail.");

	assert!(matches!(err, ServiceError::OracleFailed { .. }));

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(!resource.is_processed);
	assert!(
		queries::latest_enrichment(&svc.db, resource_id)
			.await
			.expect("Failed to read enrichment.")
			.is_none()
	);

	// The claim stands; only the stale sweep may requeue it.
	let entry = queries::queue_entry(&svc.db, resource_id)
		.await
		.expect("Failed to read queue entry.")
		.expect("Expected a queue entry.");

	assert_eq!(entry.status, "processing");
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn tldr_failure_aborts_the_commit() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping tldr_failure_aborts_the_commit; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, "Plain body with no links.");
	let mut oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));

	oracle.fail_tldr = true;

	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 110, MAIN_URL, None).await;
	let err = enrich::run_enrichment(&svc, resource_id, None)
		.await
		.expect_err("Expected the run to fail.");

	assert!(matches!(err, ServiceError::OracleFailed { .. }));

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(!resource.is_processed);
	assert!(resource.tldr.is_none());
	assert!(
		queries::latest_enrichment(&svc.db, resource_id)
			.await
			.expect("Failed to read enrichment.")
			.is_none()
	);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn empty_extraction_is_fatal() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping empty_extraction_is_fatal; set LORE_PG_DSN to run.");

		return;
	};
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(
			StubExtractor::default(),
			StubOracle::article(json!({})),
			StubResearch { findings: None },
		),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 103, MAIN_URL, None).await;
	let err = enrich::run_enrichment(&svc, resource_id, None)
		.await
		.expect_err("Expected the run to fail.");

	assert!(matches!(err, ServiceError::ExtractionFailed { .. }));

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(!resource.is_processed);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn refinement_must_keep_every_primary_field() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping refinement_must_keep_every_primary_field; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, &format!("Linking {SUB_ONE} only."))
		.with(SUB_ONE, "Linked body.");
	let mut oracle =
		StubOracle::article(json!({ "concept": "flow", "keywords": ["k"], "sources": [] }));

	// The refinement drops `keywords`, so the primary bag must win.
	oracle.secondary = Some(json!({ "concept": "flow-refined", "sources": [] }));

	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 104, MAIN_URL, None).await;

	enrich::run_enrichment(&svc, resource_id, None).await.expect("Enrichment run failed.");

	let enrichment = queries::latest_enrichment(&svc.db, resource_id)
		.await
		.expect("Failed to read enrichment.")
		.expect("Expected an enrichment row.");
	let bag = enrichment.dynamic_enrichment_data.as_object().expect("Expected an object.");

	assert_eq!(bag.get("concept"), Some(&json!("flow")));
	assert!(bag.contains_key("keywords"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn superset_refinement_is_adopted() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping superset_refinement_is_adopted; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, &format!("Linking {SUB_ONE} only."))
		.with(SUB_ONE, "Linked body.");
	let mut oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));

	oracle.secondary =
		Some(json!({ "concept": "flow-refined", "depth": "added", "sources": [] }));

	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 105, MAIN_URL, None).await;

	enrich::run_enrichment(&svc, resource_id, None).await.expect("Enrichment run failed.");

	let enrichment = queries::latest_enrichment(&svc.db, resource_id)
		.await
		.expect("Failed to read enrichment.")
		.expect("Expected an enrichment row.");
	let bag = enrichment.dynamic_enrichment_data.as_object().expect("Expected an object.");

	assert_eq!(bag.get("concept"), Some(&json!("flow-refined")));
	assert_eq!(bag.get("depth"), Some(&json!("added")));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn content_without_links_skips_expansion_cleanly() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping content_without_links_skips_expansion_cleanly; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, "A body with no embedded links at all.");
	let oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 106, MAIN_URL, None).await;
	let outcome = enrich::run_enrichment(&svc, resource_id, None)
		.await
		.expect("Enrichment run failed.");

	assert_eq!(outcome.subresources_created, 0);
	assert_eq!(outcome.subresources_failed, 0);

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(resource.is_processed);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn research_findings_land_in_the_bag_and_citations() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping research_findings_land_in_the_bag_and_citations; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, "Plain body.");
	let oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));
	let research = StubResearch {
		findings: Some(Findings {
			text: "Wider context on the topic.".to_string(),
			citations: vec!["https://cite.test/a".to_string()],
		}),
	};
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, research),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 107, MAIN_URL, Some("dig into the topic")).await;

	enrich::run_enrichment(&svc, resource_id, Some("dig into the topic"))
		.await
		.expect("Enrichment run failed.");

	let enrichment = queries::latest_enrichment(&svc.db, resource_id)
		.await
		.expect("Failed to read enrichment.")
		.expect("Expected an enrichment row.");
	let bag = enrichment.dynamic_enrichment_data.as_object().expect("Expected an object.");

	assert_eq!(bag.get("research_findings"), Some(&json!("Wider context on the topic.")));
	// The mandatory trailing field stays last even after research lands.
	assert_eq!(bag.keys().last().map(String::as_str), Some("sources"));
	assert_eq!(enrichment.sources, json!(["https://cite.test/a"]));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn document_submissions_are_read_through_ocr() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping document_submissions_are_read_through_ocr; set LORE_PG_DSN to run.");

		return;
	};
	// The extractor has no bodies, so only the OCR route can succeed.
	let providers = Providers::new(
		Arc::new(StubExtractor::default()),
		Arc::new(StubOcr::single("https://files.test/deck.pdf", "Slide text about flow states.")),
		Arc::new(StubOracle::article(json!({ "concept": "flow", "sources": [] }))),
		Arc::new(StubResearch { findings: None }),
		Arc::new(StubRenderer::default()),
	);
	let svc = build_service(test_config(test_db.dsn().to_string()), providers).await;
	let outcome = intake::submit_attachment(
		&svc,
		111,
		"https://files.test/deck.pdf",
		SourceKind::Document,
		Some("skim the takeaways"),
	)
	.await
	.expect("Failed to submit the attachment.");
	let resource_id = outcome.resource_id.expect("Expected a resource.");

	enrich::run_enrichment(&svc, resource_id, None).await.expect("Enrichment run failed.");

	let resource = queries::get_resource(&svc.db, resource_id)
		.await
		.expect("Failed to read resource.")
		.expect("Expected a resource.");

	assert!(resource.is_processed);
	assert_eq!(resource.resource_type.as_deref(), Some("article"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn expanding_twice_creates_two_independent_sets() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping expanding_twice_creates_two_independent_sets; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::default().with(SUB_ONE, "Linked body.");
	let oracle = StubOracle::article(json!({}));
	let svc = build_service(
		test_config(test_db.dsn().to_string()),
		stub_providers(extractor, oracle, StubResearch { findings: None }),
	)
	.await;
	let (_, resource_id) = seed_link(&svc, 109, MAIN_URL, None).await;
	let content = format!("Links {SUB_ONE} inline.");

	for _ in 0..2 {
		let report = lore_pipeline::subresources::expand(&svc, resource_id, &content)
			.await
			.expect("Expansion failed.");

		assert_eq!(report.created.len(), 1);
	}

	let subresources = queries::subresources_for(&svc.db, resource_id)
		.await
		.expect("Failed to read subresources.");

	assert_eq!(subresources.len(), 2);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LORE_PG_DSN to run."]
async fn default_profile_feeds_the_tldr_prompt() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping default_profile_feeds_the_tldr_prompt; set LORE_PG_DSN to run.");

		return;
	};
	let extractor = StubExtractor::single(MAIN_URL, "Plain body.");
	let oracle = StubOracle::article(json!({ "concept": "flow", "sources": [] }));
	let seen_systems = oracle.seen_systems.clone();
	let mut cfg = test_config(test_db.dsn().to_string());

	cfg.pipeline.default_profile = Some("a distracted product manager".to_string());

	let svc =
		build_service(cfg, stub_providers(extractor, oracle, StubResearch { findings: None }))
			.await;
	let (_, resource_id) = seed_link(&svc, 108, MAIN_URL, None).await;

	enrich::run_enrichment(&svc, resource_id, None).await.expect("Enrichment run failed.");

	let systems = seen_systems.lock().unwrap();

	assert!(
		systems
			.iter()
			.any(|system| system.contains("TL;DR")
				&& system.contains("a distracted product manager")),
		"No TL;DR prompt carried the default profile."
	);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
