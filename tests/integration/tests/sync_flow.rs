//! Integration test: full synchronization from ledger and content store into
//! the credential index.

use std::collections::BTreeSet;

use legitcred_core::{Principal, SyncStatus, TokenId};
use legitcred_integration_tests::{holder, World};

fn ids(records: &[legitcred_core::CredentialRecord]) -> Vec<u64> {
    records.iter().map(|r| r.token_id.value()).collect()
}

// =========================================================================
// Fan-out coverage
// =========================================================================

#[tokio::test]
async fn test_every_token_is_attempted_once() {
    let world = World::with_concurrency(3);
    for i in 0..7u8 {
        world.issue(holder(i + 1), "Acme");
    }

    let report = world.synchronizer.sync_into(&world.index).await.unwrap();

    let mut attempted = world.ledger.attempted_tokens();
    attempted.sort_unstable();
    assert_eq!(attempted, (1..=7).collect::<Vec<_>>());
    assert_eq!(report.total_supply, 7);
    assert!(report.is_complete());
    assert!(world.ledger.peak_concurrency() <= 3);
}

#[tokio::test]
async fn test_records_are_ordered_by_token_id() {
    let world = World::with_concurrency(8);
    for i in 0..12u8 {
        world.issue(holder(i + 1), "Acme");
    }

    world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(ids(&world.index.list_all()), (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_empty_ledger_publishes_empty_index() {
    let world = World::new();
    let report = world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(report.total_supply, 0);
    assert!(world.index.is_empty());
    assert_eq!(world.index.session().status, SyncStatus::Succeeded);
}

// =========================================================================
// Partial failure
// =========================================================================

#[tokio::test]
async fn test_one_bad_token_is_skipped_and_pass_succeeds() {
    let world = World::new();
    for i in 0..5u8 {
        world.issue(holder(i + 1), "Acme");
    }
    world.ledger.fail_metadata(TokenId::new(3).unwrap());

    let report = world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(report.records.len(), 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].token_id.value(), 3);
    assert_eq!(ids(&world.index.list_all()), vec![1, 2, 4, 5]);

    let session = world.index.session();
    assert_eq!(session.status, SyncStatus::Succeeded);
    assert_eq!(session.record_count, 4);
    assert_eq!(session.skipped, 1);
}

#[tokio::test]
async fn test_missing_document_is_skipped() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.ledger.seed(holder(2), "nowhere,art");

    let report = world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(ids(&report.records), vec![1]);
    assert_eq!(report.skipped[0].token_id.value(), 2);
}

#[tokio::test]
async fn test_unreachable_ledger_fails_pass_and_keeps_old_records() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.synchronizer.sync_into(&world.index).await.unwrap();

    world.ledger.set_unreachable(true);
    assert!(world.synchronizer.sync_into(&world.index).await.is_err());

    let session = world.index.session();
    assert_eq!(session.status, SyncStatus::Failed);
    assert!(session.error.is_some());
    assert_eq!(world.index.len(), 1);

    world.ledger.set_unreachable(false);
    world.synchronizer.sync_into(&world.index).await.unwrap();
    assert_eq!(world.index.session().status, SyncStatus::Succeeded);
    assert!(world.index.session().error.is_none());
}

// =========================================================================
// Idempotence and refresh
// =========================================================================

#[tokio::test]
async fn test_repeated_sync_yields_same_set() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.issue(holder(2), "Globex");

    let first = world.synchronizer.sync_into(&world.index).await.unwrap();
    let after_first = world.index.list_all();
    let second = world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(after_first, world.index.list_all());
}

#[tokio::test]
async fn test_transfer_is_reflected_after_resync() {
    let world = World::new();
    let token = world.issue(holder(1), "Acme");
    world.synchronizer.sync_into(&world.index).await.unwrap();

    world.ledger.transfer(token, holder(9)).unwrap();
    world.synchronizer.sync_into(&world.index).await.unwrap();

    let record = world.index.get(token).unwrap();
    assert_eq!(record.owner, holder(9).to_lowercase_hex());
    assert!(world.index.list_by_owner(Some(&holder(1).to_checksum())).is_empty());
}

// =========================================================================
// Queries
// =========================================================================

#[tokio::test]
async fn test_owner_filter_ignores_case() {
    let world = World::new();
    let owner = holder(0xab);
    world.issue(owner, "Acme");
    world.issue(owner, "Globex");
    world.issue(holder(1), "Acme");
    world.synchronizer.sync_into(&world.index).await.unwrap();

    let upper = owner.to_lowercase_hex().to_uppercase().replacen("0X", "0x", 1);
    assert_eq!(ids(&world.index.list_by_owner(Some(&upper))), vec![1, 2]);
    assert_eq!(ids(&world.index.list_by_owner(Some(&owner.to_checksum()))), vec![1, 2]);
    assert!(world.index.list_by_owner(None).is_empty());
    assert!(world.index.list_by_owner(Some("")).is_empty());
}

#[tokio::test]
async fn test_visibility_by_role() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.issue(holder(2), "Acme");
    world.synchronizer.sync_into(&world.index).await.unwrap();

    assert_eq!(world.index.list_visible(&Principal::admin()).len(), 2);
    let own = holder(2).to_checksum();
    assert_eq!(ids(&world.index.list_visible(&Principal::holder(Some(&own)))), vec![2]);
    assert!(world.index.list_visible(&Principal::holder(None)).is_empty());
}

#[tokio::test]
async fn test_organizations_are_unique() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.issue(holder(2), "Globex");
    world.issue(holder(3), "Acme");
    world.ledger.seed(holder(4), "bare,art");
    world.resolver.insert("bare", serde_json::json!({ "title": "no issuer" }));
    world.synchronizer.sync_into(&world.index).await.unwrap();

    let expected: BTreeSet<String> = ["Acme", "Globex"].iter().map(|s| s.to_string()).collect();
    assert_eq!(world.index.list_organizations(), expected);
    assert_eq!(ids(&world.index.list_by_organization("Acme")), vec![1, 3]);
    assert_eq!(world.index.len(), 4);
}

// =========================================================================
// Overlapping passes
// =========================================================================

#[tokio::test]
async fn test_superseded_pass_is_discarded() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    let stale_report = world.synchronizer.run_full_sync().await.unwrap();

    world.issue(holder(2), "Globex");
    let stale = world.index.begin_pass();
    let fresh = world.index.begin_pass();
    let fresh_report = world.synchronizer.run_full_sync().await.unwrap();

    assert!(world.index.publish(&fresh, &fresh_report));
    assert!(!world.index.publish(&stale, &stale_report));
    assert!(!world.index.fail_pass(&stale, "late failure"));

    assert_eq!(ids(&world.index.list_all()), vec![1, 2]);
    let session = world.index.session();
    assert_eq!(session.status, SyncStatus::Succeeded);
    assert_eq!(session.pass, fresh.pass());
}
