// Copyright (c) 2025 - Cowboy AI, Inc.
//! Redelivery, tombstone and pagination guarantees
//!
//! Delivery is at least once, so every test here replays or reorders events
//! and checks that the stored state does not move.

mod fixtures;

use authz_state_projector::keys;
use authz_state_projector::{AggregateKind, EventEnvelope, Outcome, Projector, TokenQuery};
use fixtures::*;

/// Serialized platform rows for every fixture entity plus all client and
/// purpose fan-out rows
async fn table_bytes(projector: &Projector) -> Vec<u8> {
    let pks = [
        keys::platform_purpose_pk(purpose_id()),
        keys::platform_agreement_pk(parse_uuid(AGREEMENT_A)),
        keys::platform_descriptor_pk(eservice_id(), descriptor_id()),
        keys::platform_client_pk(client_id()),
    ];

    let mut bytes = Vec::new();
    for pk in &pks {
        let row = projector.platform().get(pk).await.unwrap();
        bytes.extend(serde_json::to_vec(&row).unwrap());
    }
    let mut rows = projector
        .tokens()
        .query_all(&TokenQuery::Client(client_id()))
        .await
        .unwrap();
    rows.extend(rows_for_purpose(projector).await);
    rows.sort_by(|a, b| a.pk.cmp(&b.pk));
    bytes.extend(serde_json::to_vec(&rows).unwrap());
    bytes
}

fn history() -> Vec<(AggregateKind, EventEnvelope)> {
    vec![
        (AggregateKind::Authorization, client_event("ClientKeyAdded", 1, &[PURPOSE_ID], &["kid-1", "kid-2"])),
        (AggregateKind::Catalog, descriptor_event("EServiceDescriptorPublished", 1, "published")),
        (
            AggregateKind::Purpose,
            purpose_event("PurposeActivated", 1, vec![purpose_version(PURPOSE_VERSION_1, "active", 0)]),
        ),
        (AggregateKind::Agreement, agreement_event("AgreementActivated", 1, AGREEMENT_A, "active", 0)),
        (AggregateKind::Catalog, descriptor_event("EServiceDescriptorSuspended", 2, "suspended")),
        (
            AggregateKind::Purpose,
            purpose_event(
                "PurposeVersionSuspendedByProducer",
                2,
                vec![purpose_version(PURPOSE_VERSION_1, "suspended", 0)],
            ),
        ),
    ]
}

#[tokio::test]
async fn test_replaying_history_is_byte_identical() {
    let projector = projector(3);
    for (kind, envelope) in history() {
        projector.dispatch(kind, &envelope).await.unwrap();
    }
    let once = table_bytes(&projector).await;

    for (kind, envelope) in history() {
        assert_eq!(
            projector.dispatch(kind, &envelope).await.unwrap(),
            Outcome::Skipped,
            "replay of {} should be skipped",
            envelope.event_type
        );
    }

    assert_eq!(table_bytes(&projector).await, once);
}

#[tokio::test]
async fn test_stale_event_after_newer_leaves_state_unchanged() {
    let projector = projector(10);
    let newer = descriptor_event("EServiceDescriptorSuspended", 5, "suspended");
    let older = descriptor_event("EServiceDescriptorActivated", 4, "published");

    projector.dispatch(AggregateKind::Catalog, &newer).await.unwrap();
    let before = table_bytes(&projector).await;

    assert_eq!(
        projector.dispatch(AggregateKind::Catalog, &older).await.unwrap(),
        Outcome::Skipped
    );
    assert_eq!(table_bytes(&projector).await, before);

    let row = projector
        .platform()
        .read_catalog(eservice_id(), descriptor_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.version, 5);
}

#[tokio::test]
async fn test_tombstone_is_idempotent() {
    let projector = projector(10);
    let published = agreement_event("AgreementActivated", 1, AGREEMENT_A, "active", 0);
    let archived = agreement_event("AgreementArchivedByConsumer", 2, AGREEMENT_A, "archived", 0);

    projector.dispatch(AggregateKind::Agreement, &published).await.unwrap();
    assert_eq!(
        projector.dispatch(AggregateKind::Agreement, &archived).await.unwrap(),
        Outcome::Applied
    );
    assert_eq!(
        projector.dispatch(AggregateKind::Agreement, &archived).await.unwrap(),
        Outcome::Skipped
    );

    // archiving an agreement never seen before
    let unseen = agreement_event("AgreementArchivedByConsumer", 7, AGREEMENT_B, "archived", 0);
    assert_eq!(
        projector.dispatch(AggregateKind::Agreement, &unseen).await.unwrap(),
        Outcome::Skipped
    );
}

#[tokio::test]
async fn test_fanout_updates_every_page() {
    const ROWS: usize = 23;

    let projector = projector(5);
    projector
        .tokens()
        .put_rows(purpose_rows(ROWS, PURPOSE_VERSION_1, true))
        .await
        .unwrap();

    let first_page = projector
        .tokens()
        .first_page(&TokenQuery::Purpose(purpose_id()))
        .await
        .unwrap();
    assert_eq!(first_page.len(), 5);

    let activated = purpose_event(
        "PurposeVersionActivated",
        1,
        vec![purpose_version(PURPOSE_VERSION_2, "active", 0)],
    );
    projector.dispatch(AggregateKind::Purpose, &activated).await.unwrap();

    let rows = rows_for_purpose(&projector).await;
    assert_eq!(rows.len(), ROWS);
    let updated = rows
        .iter()
        .filter(|r| r.purpose_version_id == Some(parse_uuid(PURPOSE_VERSION_2)))
        .count();
    assert_eq!(updated, ROWS);
}

#[tokio::test]
async fn test_malformed_payload_is_fatal() {
    let projector = projector(10);
    let mut envelope = purpose_event("PurposeActivated", 1, vec![]);
    envelope.payload = serde_json::json!({"purpose": {"id": 42}});

    let err = projector
        .dispatch(AggregateKind::Purpose, &envelope)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_retryable());
}

// ============================================================================
// Redelivery after a failed fan-out
// ============================================================================

/// First delivery fails on the store and must be retryable, the redelivery
/// finishes the fan-out
async fn deliver_twice(
    flaky: &FlakyProjector,
    kind: AggregateKind,
    envelope: &EventEnvelope,
) {
    let err = flaky.projector.dispatch(kind, envelope).await.unwrap_err();
    assert!(err.is_retryable(), "{err} should be retryable");
    assert_eq!(
        flaky.projector.dispatch(kind, envelope).await.unwrap(),
        Outcome::Applied,
        "redelivery of {} should finish the fan-out",
        envelope.event_type
    );
}

#[tokio::test]
async fn test_purpose_activation_converges_after_failed_fanout() {
    use authz_state_projector::ItemState;

    let flaky = flaky_projector(2);
    flaky
        .projector
        .tokens()
        .put_rows(purpose_rows(3, PURPOSE_VERSION_1, true))
        .await
        .unwrap();
    flaky.tokens.fail_next_queries(1);

    let activated = purpose_event("PurposeActivated", 1, vec![purpose_version(PURPOSE_VERSION_1, "active", 0)]);
    deliver_twice(&flaky, AggregateKind::Purpose, &activated).await;

    let rows = rows_for_purpose(&flaky.projector).await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.purpose_state == Some(ItemState::Active)));

    let converged = serde_json::to_vec(&rows).unwrap();
    assert_eq!(
        flaky.projector.dispatch(AggregateKind::Purpose, &activated).await.unwrap(),
        Outcome::Skipped
    );
    assert_eq!(
        serde_json::to_vec(&rows_for_purpose(&flaky.projector).await).unwrap(),
        converged
    );
}

#[tokio::test]
async fn test_agreement_activation_converges_after_failed_group_read() {
    let flaky = flaky_projector(10);
    flaky
        .projector
        .tokens()
        .put_rows(purpose_rows(2, PURPOSE_VERSION_1, false))
        .await
        .unwrap();
    flaky.platform.fail_next_queries(1);

    let activated = agreement_event("AgreementActivated", 1, AGREEMENT_A, "active", 0);
    deliver_twice(&flaky, AggregateKind::Agreement, &activated).await;

    let rows = rows_for_purpose(&flaky.projector).await;
    assert!(rows
        .iter()
        .all(|row| row.agreement_id == Some(parse_uuid(AGREEMENT_A))));
}

#[tokio::test]
async fn test_agreement_archive_converges_after_failed_fanout() {
    use authz_state_projector::ItemState;

    let flaky = flaky_projector(10);
    flaky
        .projector
        .tokens()
        .put_rows(purpose_rows(2, PURPOSE_VERSION_1, false))
        .await
        .unwrap();
    let activated = agreement_event("AgreementActivated", 1, AGREEMENT_A, "active", 0);
    flaky.projector.dispatch(AggregateKind::Agreement, &activated).await.unwrap();
    assert!(rows_for_purpose(&flaky.projector)
        .await
        .iter()
        .all(|row| row.agreement_state == Some(ItemState::Active)));

    flaky.tokens.fail_next_queries(1);
    let archived = agreement_event("AgreementArchivedByConsumer", 2, AGREEMENT_A, "archived", 0);
    deliver_twice(&flaky, AggregateKind::Agreement, &archived).await;

    let pk = keys::platform_agreement_pk(parse_uuid(AGREEMENT_A));
    assert!(flaky.projector.platform().get(&pk).await.unwrap().is_none());
    assert!(rows_for_purpose(&flaky.projector)
        .await
        .iter()
        .all(|row| row.agreement_state == Some(ItemState::Inactive)));
}

#[tokio::test]
async fn test_descriptor_publish_converges_after_failed_batch() {
    use authz_state_projector::ItemState;

    let flaky = flaky_projector(10);
    flaky
        .projector
        .tokens()
        .put_rows(purpose_rows(3, PURPOSE_VERSION_1, false))
        .await
        .unwrap();
    flaky.tokens.fail_next_batches(1);

    let published = descriptor_event("EServiceDescriptorPublished", 1, "published");
    deliver_twice(&flaky, AggregateKind::Catalog, &published).await;

    let rows = rows_for_purpose(&flaky.projector).await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.descriptor_state == Some(ItemState::Active)));
    assert!(rows.iter().all(|row| row.descriptor_voucher_lifespan == Some(600)));
}

#[tokio::test]
async fn test_client_rows_converge_after_failed_fanout() {
    let flaky = flaky_projector(10);
    flaky.tokens.fail_next_batches(1);

    let added = client_event("ClientKeyAdded", 1, &[PURPOSE_ID], &["kid-1", "kid-2"]);
    deliver_twice(&flaky, AggregateKind::Authorization, &added).await;

    let rows = flaky
        .projector
        .tokens()
        .query_all(&TokenQuery::Client(client_id()))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}
