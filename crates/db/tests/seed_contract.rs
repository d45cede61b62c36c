//! Contract checks for the demo seeds: every seeded row must decode through
//! the repository layer and respect the lifecycle invariants the aggregate
//! enforces for organically created requests.

use greenlight_core::domain::request::{LifecycleOperation, RequestId, RequestStatus};
use greenlight_db::repositories::{RequestRepository, SqlRequestRepository};
use greenlight_db::{connect_with_settings, fixtures, migrations};

const SEED_IDS: &[&str] = &[
    "req-draft-001",
    "req-submitted-001",
    "req-inreview-001",
    "req-approved-001",
    "req-rejected-001",
];

async fn seeded_pool() -> sqlx::SqlitePool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    fixtures::seed_demo_data(&pool).await.expect("seed");
    pool
}

#[tokio::test]
async fn every_seed_decodes_through_the_repository() {
    let pool = seeded_pool().await;
    let repo = SqlRequestRepository::new(pool);

    for id in SEED_IDS {
        let request = repo
            .find_by_id(&RequestId(id.to_string()))
            .await
            .expect("query")
            .unwrap_or_else(|| panic!("seed {id} missing"));
        assert!(!request.title.is_empty());
        assert!(request.version >= 1);
    }
}

#[tokio::test]
async fn seeds_respect_review_field_invariants() {
    let pool = seeded_pool().await;
    let repo = SqlRequestRepository::new(pool);

    for id in SEED_IDS {
        let request = repo
            .find_by_id(&RequestId(id.to_string()))
            .await
            .expect("query")
            .expect("seeded");

        let decided =
            matches!(request.status, RequestStatus::Approved | RequestStatus::Rejected);
        assert_eq!(
            request.reviewer_id.is_some(),
            decided,
            "{id}: reviewer_id set iff decided"
        );
        assert_eq!(
            request.reviewed_at.is_some(),
            decided,
            "{id}: reviewed_at set iff decided"
        );

        if request.status != RequestStatus::Draft {
            assert!(request.submitted_at.is_some(), "{id}: non-draft seeds were submitted");
        }
    }
}

#[tokio::test]
async fn seeds_sit_on_reachable_lifecycle_states() {
    let pool = seeded_pool().await;
    let repo = SqlRequestRepository::new(pool);

    // Draft accepts submission, in-review accepts a decision, terminal seeds
    // only accept what the precondition table allows.
    let draft = repo
        .find_by_id(&RequestId("req-draft-001".to_string()))
        .await
        .expect("query")
        .expect("seeded");
    assert!(LifecycleOperation::Submit.accepts(draft.status));

    let in_review = repo
        .find_by_id(&RequestId("req-inreview-001".to_string()))
        .await
        .expect("query")
        .expect("seeded");
    assert!(LifecycleOperation::Approve.accepts(in_review.status));
    assert!(LifecycleOperation::Reject.accepts(in_review.status));

    let approved = repo
        .find_by_id(&RequestId("req-approved-001".to_string()))
        .await
        .expect("query")
        .expect("seeded");
    for operation in [
        LifecycleOperation::Submit,
        LifecycleOperation::BeginReview,
        LifecycleOperation::Approve,
        LifecycleOperation::Reject,
        LifecycleOperation::Cancel,
        LifecycleOperation::Reopen,
    ] {
        assert!(!operation.accepts(approved.status), "approved is terminal");
    }

    let rejected = repo
        .find_by_id(&RequestId("req-rejected-001".to_string()))
        .await
        .expect("query")
        .expect("seeded");
    assert!(LifecycleOperation::Reopen.accepts(rejected.status));
}
