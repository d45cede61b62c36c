use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo seeds covering every lifecycle state the CLI can land in.
/// Ids are deterministic so smoke flows can reference them directly.
const SEED_REQUESTS: &[SeedRequest] = &[
    SeedRequest {
        id: "req-draft-001",
        title: "Standing desk",
        description: "Ergonomic assessment recommended a sit/stand desk",
        request_type: "equipment",
        priority: "low",
        status: "draft",
        requester_id: "u-alice",
        assignee_id: None,
        reviewer_id: None,
        version: 1,
        submitted: false,
        reviewed: false,
    },
    SeedRequest {
        id: "req-submitted-001",
        title: "Conference travel",
        description: "Two nights plus flights for the annual systems conference",
        request_type: "expense",
        priority: "medium",
        status: "submitted",
        requester_id: "u-alice",
        assignee_id: None,
        reviewer_id: None,
        version: 2,
        submitted: true,
        reviewed: false,
    },
    SeedRequest {
        id: "req-inreview-001",
        title: "Production database access",
        description: "Read-only access for incident triage rotation",
        request_type: "access",
        priority: "urgent",
        status: "in_review",
        requester_id: "u-carol",
        assignee_id: Some("u-bob"),
        reviewer_id: None,
        version: 3,
        submitted: true,
        reviewed: false,
    },
    SeedRequest {
        id: "req-approved-001",
        title: "Parental leave",
        description: "Six weeks starting in October",
        request_type: "leave",
        priority: "high",
        status: "approved",
        requester_id: "u-carol",
        assignee_id: Some("u-bob"),
        reviewer_id: Some("u-bob"),
        version: 4,
        submitted: true,
        reviewed: true,
    },
    SeedRequest {
        id: "req-rejected-001",
        title: "Team offsite budget",
        description: "Three-day offsite for the platform team",
        request_type: "expense",
        priority: "medium",
        status: "rejected",
        requester_id: "u-alice",
        assignee_id: Some("u-bob"),
        reviewer_id: Some("u-bob"),
        version: 4,
        submitted: true,
        reviewed: true,
    },
];

struct SeedRequest {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    request_type: &'static str,
    priority: &'static str,
    status: &'static str,
    requester_id: &'static str,
    assignee_id: Option<&'static str>,
    reviewer_id: Option<&'static str>,
    version: u32,
    submitted: bool,
    reviewed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub requests: usize,
}

/// Idempotent: reseeding replaces the demo rows instead of duplicating them.
pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let now = chrono::Utc::now().to_rfc3339();

    for seed in SEED_REQUESTS {
        sqlx::query(
            "INSERT INTO request (id, title, description, request_type, priority, status,
                                  requester_id, assignee_id, reviewer_id, attachment_ids,
                                  version, submitted_at, reviewed_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 request_type = excluded.request_type,
                 priority = excluded.priority,
                 status = excluded.status,
                 requester_id = excluded.requester_id,
                 assignee_id = excluded.assignee_id,
                 reviewer_id = excluded.reviewer_id,
                 version = excluded.version,
                 submitted_at = excluded.submitted_at,
                 reviewed_at = excluded.reviewed_at,
                 updated_at = excluded.updated_at",
        )
        .bind(seed.id)
        .bind(seed.title)
        .bind(seed.description)
        .bind(seed.request_type)
        .bind(seed.priority)
        .bind(seed.status)
        .bind(seed.requester_id)
        .bind(seed.assignee_id)
        .bind(seed.reviewer_id)
        .bind(i64::from(seed.version))
        .bind(seed.submitted.then(|| now.clone()))
        .bind(seed.reviewed.then(|| now.clone()))
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(SeedSummary { requests: SEED_REQUESTS.len() })
}
