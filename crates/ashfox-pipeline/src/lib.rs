//! Ashfox Pipeline — the native pipeline store (project graph state and job queue).
//!
//! This crate implements the durable side of a workspace's modeling pipeline:
//! project snapshots, an append-only per-project event journal, and a job
//! queue with lease-based claiming, retry with backoff, and dead-lettering.
//! All mutations go through a distributed, CAS-guarded lock (see [`lock`]) so
//! multiple gateway processes can share one [`ashfox_storage::ProjectRepository`]
//! safely.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod lock;
pub mod store;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use store::{NativePipelineStore, SeedProject, SubmitJobInput, STATE_SCOPE_PROJECT_ID};
pub use types::{
    ActiveJobRef, AnimationSummary, HierarchyNode, Job, JobStatus, PipelineState, ProjectEvent,
    ProjectSnapshot, ProjectStats,
};

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_core::ids::{ProjectId, WorkspaceId};
    use ashfox_core::JobKind;
    use ashfox_test::{InMemoryProjectRepository, ManualClock};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    fn clock() -> Arc<ManualClock> {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Arc::new(ManualClock::new(start))
    }

    fn store(clock: Arc<ManualClock>) -> NativePipelineStore {
        NativePipelineStore::new(Arc::new(InMemoryProjectRepository::new())).with_clock(clock)
    }

    #[tokio::test]
    async fn first_access_seeds_the_configured_sample_projects() {
        let store = NativePipelineStore::new(Arc::new(InMemoryProjectRepository::new()))
            .with_clock(clock())
            .with_seed_projects(vec![SeedProject {
                project_id: ProjectId::from("sample-rig"),
                name: "Sample Rig".to_string(),
            }]);
        let workspace_id = WorkspaceId::from("ws-1");

        let projects = store.list_projects(&workspace_id, None).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Sample Rig");
    }

    #[tokio::test]
    async fn submit_then_claim_then_complete_round_trips() {
        let store = store(clock());
        let workspace_id = WorkspaceId::from("ws-1");
        let project_id = ProjectId::from("proj-1");

        let job = store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: project_id.clone(),
                    kind: JobKind::GltfConvert,
                    payload: None,
                    max_attempts: None,
                    lease_ms: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        let claimed = store
            .claim_next_job(&workspace_id, "worker-1")
            .await
            .unwrap()
            .expect("job should be claimable");
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempt_count, 1);

        let completed = store
            .complete_job(&workspace_id, &claimed.id, Some(serde_json::json!({"ok": true})))
            .await
            .unwrap();
        assert_eq!(completed.status, JobStatus::Completed);

        let project = store.get_project(&workspace_id, &project_id).await.unwrap().unwrap();
        assert!(project.active_job.is_none());
    }

    #[tokio::test]
    async fn fail_job_requeues_with_backoff_until_attempts_exhausted() {
        let store = NativePipelineStore::new(Arc::new(InMemoryProjectRepository::new()))
            .with_clock(clock());
        let workspace_id = WorkspaceId::from("ws-1");
        let project_id = ProjectId::from("proj-1");

        let job = store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: project_id.clone(),
                    kind: JobKind::GltfConvert,
                    payload: None,
                    max_attempts: Some(2),
                    lease_ms: None,
                },
            )
            .await
            .unwrap();

        let claimed = store
            .claim_next_job(&workspace_id, "worker-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, job.id);

        let failed_once = store
            .fail_job(&workspace_id, &claimed.id, "transient error")
            .await
            .unwrap();
        assert_eq!(failed_once.status, JobStatus::Queued);
        assert!(failed_once.next_retry_at.is_some());

        // next_retry_at is in the future relative to the manual clock, so the
        // job is not yet claimable.
        let not_yet = store.claim_next_job(&workspace_id, "worker-1").await.unwrap();
        assert!(not_yet.is_none());
    }

    #[tokio::test]
    async fn events_since_returns_only_newer_entries() {
        let store = store(clock());
        let workspace_id = WorkspaceId::from("ws-1");
        let project_id = ProjectId::from("proj-1");

        store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: project_id.clone(),
                    kind: JobKind::GltfConvert,
                    payload: None,
                    max_attempts: None,
                    lease_ms: None,
                },
            )
            .await
            .unwrap();

        let all_events = store
            .get_project_events_since(&workspace_id, &project_id, 0)
            .await
            .unwrap();
        assert!(all_events.len() >= 2);

        let last_seq = all_events.last().unwrap().seq;
        let newer = store
            .get_project_events_since(&workspace_id, &project_id, last_seq)
            .await
            .unwrap();
        assert!(newer.is_empty());
    }

    #[tokio::test]
    async fn gltf_convert_rejects_unsupported_payload_fields() {
        let store = store(clock());
        let workspace_id = WorkspaceId::from("ws-1");

        let err = store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: ProjectId::from("proj-1"),
                    kind: JobKind::GltfConvert,
                    payload: Some(serde_json::json!({"codecId": "draco", "bogus": true})),
                    max_attempts: None,
                    lease_ms: None,
                },
            )
            .await
            .unwrap_err();

        match err {
            PipelineError::InvalidPayload(message) => {
                assert_eq!(
                    message,
                    "payload has unsupported field(s) for gltf.convert: bogus"
                );
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn texture_preflight_rejects_empty_string_texture_ids() {
        let store = store(clock());
        let workspace_id = WorkspaceId::from("ws-1");

        let err = store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: ProjectId::from("proj-1"),
                    kind: JobKind::TexturePreflight,
                    payload: Some(serde_json::json!({"textureIds": ["tex-1", ""]})),
                    max_attempts: None,
                    lease_ms: None,
                },
            )
            .await
            .unwrap_err();

        match err {
            PipelineError::InvalidPayload(message) => {
                assert_eq!(
                    message,
                    "payload.textureIds must be an array of non-empty strings"
                );
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }
}
