//! The native pipeline store: project graph state plus the job queue.

use ashfox_core::clock::{Clock, SystemClock};
use ashfox_core::ids::{JobId, ProjectId, ProjectScope, WorkspaceId};
use ashfox_core::{JobKind, RetryConfig};
use ashfox_storage::project::{PersistedProjectRecord, ProjectRepository};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{PipelineError, PipelineResult};
use crate::lock;
use crate::types::{ActiveJobRef, Job, JobStatus, PipelineState, ProjectEvent, ProjectSnapshot};

/// The well-known scope suffix the pipeline state record lives under.
pub const STATE_SCOPE_PROJECT_ID: &str = "__pipeline_state__";

fn state_scope(workspace_id: &WorkspaceId) -> ProjectScope {
    ProjectScope::new(workspace_id.as_str(), STATE_SCOPE_PROJECT_ID)
}

/// The input accepted by [`NativePipelineStore::submit_job`].
#[derive(Debug, Clone)]
pub struct SubmitJobInput {
    /// The project the job targets.
    pub project_id: ProjectId,
    /// The kind of work requested.
    pub kind: JobKind,
    /// Kind-specific payload.
    pub payload: Option<serde_json::Value>,
    /// Overrides the default max-attempts, if set.
    pub max_attempts: Option<u32>,
    /// Overrides the default lease duration (ms), if set.
    pub lease_ms: Option<u64>,
}

/// A seed project materialized on first access to an empty workspace.
#[derive(Debug, Clone)]
pub struct SeedProject {
    /// The new project's id.
    pub project_id: ProjectId,
    /// The new project's display name.
    pub name: String,
}

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_LEASE_MS: u64 = 30_000;

const GLTF_CONVERT_FIELDS: [&str; 2] = ["codecId", "optimize"];

/// Reject payload shapes `submit_job` must never persist, per job kind.
fn validate_payload(kind: JobKind, payload: &Option<Value>) -> PipelineResult<()> {
    match kind {
        JobKind::GltfConvert => {
            let Some(Value::Object(fields)) = payload else {
                return Ok(());
            };
            let unsupported: Vec<&str> = fields
                .keys()
                .map(String::as_str)
                .filter(|field| !GLTF_CONVERT_FIELDS.contains(field))
                .collect();
            if unsupported.is_empty() {
                Ok(())
            } else {
                Err(PipelineError::InvalidPayload(format!(
                    "payload has unsupported field(s) for gltf.convert: {}",
                    unsupported.join(", ")
                )))
            }
        }
        JobKind::TexturePreflight => {
            let has_empty_id = payload
                .as_ref()
                .and_then(|payload| payload.get("textureIds"))
                .and_then(Value::as_array)
                .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some("")));
            if has_empty_id {
                Err(PipelineError::InvalidPayload(
                    "payload.textureIds must be an array of non-empty strings".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Durable storage of the pipeline graph and queue, single-writer per
/// workspace via the distributed lock in [`crate::lock`].
///
/// The per-process in-memory mutex serializes concurrent calls from this
/// process; the distributed lock additionally serializes calls from other
/// processes sharing the same repository.
pub struct NativePipelineStore {
    repository: Arc<dyn ProjectRepository>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
    seed_projects: Vec<SeedProject>,
    process_mutex: Mutex<()>,
}

impl NativePipelineStore {
    /// Build a store over `repository`, using the real wall clock.
    #[must_use]
    pub fn new(repository: Arc<dyn ProjectRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            retry: RetryConfig::default(),
            seed_projects: Vec::new(),
            process_mutex: Mutex::new(()),
        }
    }

    /// Override the clock (for deterministic tests) and/or the retry config.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the retry backoff config.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Seed these projects into any workspace accessed for the first time.
    #[must_use]
    pub fn with_seed_projects(mut self, seeds: Vec<SeedProject>) -> Self {
        self.seed_projects = seeds;
        self
    }

    /// Run `mutate` against the hydrated state for `workspace_id` under the
    /// full concurrency contract: distributed lock, read, mutate, CAS save,
    /// release.
    async fn mutate<T>(
        &self,
        workspace_id: &WorkspaceId,
        mutate: impl FnOnce(&mut PipelineState) -> PipelineResult<T>,
    ) -> PipelineResult<T> {
        let _process_guard = self.process_mutex.lock().await;
        let guard = lock::acquire(self.repository.as_ref(), &self.clock, workspace_id.as_str()).await?;

        let result = async {
            let scope = state_scope(workspace_id);
            let existing = self.repository.find(&scope).await?;
            let (mut state, previous_revision) = match existing {
                Some(record) => {
                    let state: PipelineState = serde_json::from_value(record.state)?;
                    (state, Some(record.revision))
                }
                None => (self.seed(workspace_id), None),
            };

            let output = mutate(&mut state)?;

            let now = self.clock.now();
            let serialized = serde_json::to_value(&state)?;
            let revision = ashfox_storage::content_hash(&serde_json::to_vec(&serialized)?);
            let record = PersistedProjectRecord {
                scope: scope.clone(),
                revision,
                state: serialized,
                created_at: now,
                updated_at: now,
            };
            let applied = self
                .repository
                .save_if_revision(record, previous_revision.as_deref())
                .await?;
            if !applied {
                return Err(PipelineError::StateConflict {
                    workspace_id: workspace_id.as_str().to_string(),
                });
            }
            Ok(output)
        }
        .await;

        guard.release(self.repository.as_ref()).await;
        result
    }

    async fn read<T>(
        &self,
        workspace_id: &WorkspaceId,
        read: impl FnOnce(&PipelineState) -> T,
    ) -> PipelineResult<T> {
        let scope = state_scope(workspace_id);
        let existing = self.repository.find(&scope).await?;
        let state = match existing {
            Some(record) => serde_json::from_value(record.state)?,
            None => self.seed(workspace_id),
        };
        Ok(read(&state))
    }

    fn seed(&self, _workspace_id: &WorkspaceId) -> PipelineState {
        let mut state = PipelineState::default();
        for seed in &self.seed_projects {
            let snapshot = ProjectSnapshot::empty(seed.project_id.clone(), seed.name.clone());
            state.push_snapshot_event(snapshot);
        }
        state
    }

    /// List all projects in the workspace, optionally filtered by a
    /// case-insensitive substring match on `name`.
    pub async fn list_projects(
        &self,
        workspace_id: &WorkspaceId,
        query: Option<&str>,
    ) -> PipelineResult<Vec<ProjectSnapshot>> {
        self.read(workspace_id, |state| {
            let query = query.map(str::to_lowercase);
            state
                .projects
                .values()
                .filter(|p| {
                    query
                        .as_ref()
                        .is_none_or(|q| p.name.to_lowercase().contains(q.as_str()))
                })
                .cloned()
                .collect()
        })
        .await
    }

    /// Fetch one project's snapshot.
    pub async fn get_project(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> PipelineResult<Option<ProjectSnapshot>> {
        self.read(workspace_id, |state| {
            state.projects.get(project_id.as_str()).cloned()
        })
        .await
    }

    /// List all jobs (queued and historical) targeting `project_id`, ordered
    /// by `created_at` then `id`.
    pub async fn list_project_jobs(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> PipelineResult<Vec<Job>> {
        self.read(workspace_id, |state| {
            let mut jobs: Vec<_> = state
                .jobs
                .values()
                .filter(|j| &j.project_id == project_id)
                .cloned()
                .collect();
            jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.as_str().cmp(b.id.as_str())));
            jobs
        })
        .await
    }

    /// Fetch one job by id.
    pub async fn get_job(&self, workspace_id: &WorkspaceId, job_id: &JobId) -> PipelineResult<Option<Job>> {
        self.read(workspace_id, |state| state.jobs.get(job_id.as_str()).cloned())
            .await
    }

    /// Submit a new job, implicitly creating the project first if its kind
    /// allows it and the project does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidPayload`] if `input.payload` fails
    /// kind-specific validation (an unsupported field for `gltf.convert`, or
    /// an empty-string `textureIds` member for `texture.preflight`).
    pub async fn submit_job(
        &self,
        workspace_id: &WorkspaceId,
        input: SubmitJobInput,
    ) -> PipelineResult<Job> {
        validate_payload(input.kind, &input.payload)?;

        let now_for_id = self.clock.clone();
        self.mutate(workspace_id, move |state| {
            let now = now_for_id.now();
            if !state.projects.contains_key(input.project_id.as_str())
                && input.kind.allows_implicit_project_creation()
            {
                let snapshot = ProjectSnapshot::empty(input.project_id.clone(), input.project_id.as_str());
                state.push_snapshot_event(snapshot);
            }

            let job_id = state.next_job_id();
            let job = Job {
                id: job_id.clone(),
                project_id: input.project_id.clone(),
                kind: input.kind,
                status: JobStatus::Queued,
                attempt_count: 0,
                max_attempts: input.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                lease_ms: input.lease_ms.unwrap_or(DEFAULT_LEASE_MS),
                created_at: now,
                started_at: None,
                lease_expires_at: None,
                next_retry_at: None,
                completed_at: None,
                worker_id: None,
                error: None,
                dead_letter: None,
                payload: input.payload,
                result: None,
            };
            state.jobs.insert(job_id.as_str().to_string(), job.clone());
            state.queued_job_ids.push_back(job_id.as_str().to_string());

            if let Some(mut snapshot) = state.projects.get(input.project_id.as_str()).cloned() {
                snapshot.active_job = Some(ActiveJobRef {
                    id: job_id,
                    status: JobStatus::Queued,
                });
                state.push_snapshot_event(snapshot);
            }

            Ok(job)
        })
        .await
    }

    /// Claim the head of the queue whose `next_retry_at` has elapsed, if any.
    pub async fn claim_next_job(
        &self,
        workspace_id: &WorkspaceId,
        worker_id: &str,
    ) -> PipelineResult<Option<Job>> {
        let clock = self.clock.clone();
        let worker_id = worker_id.to_string();
        self.mutate(workspace_id, move |state| {
            let now = clock.now();
            let ready_index = state.queued_job_ids.iter().position(|id| {
                state
                    .jobs
                    .get(id)
                    .is_some_and(|j| j.next_retry_at.is_none_or(|retry_at| retry_at <= now))
            });
            let Some(index) = ready_index else {
                return Ok(None);
            };
            let job_id = state.queued_job_ids.remove(index).expect("index came from this deque");
            let job = state.jobs.get_mut(&job_id).expect("queued job id always has a record");

            job.worker_id = Some(worker_id.clone());
            job.status = JobStatus::Running;
            if job.started_at.is_none() {
                job.started_at = Some(now);
            }
            job.lease_expires_at = Some(now + chrono::Duration::milliseconds(job.lease_ms as i64));
            job.attempt_count += 1;
            job.next_retry_at = None;

            let claimed = job.clone();
            if let Some(mut snapshot) = state.projects.get(claimed.project_id.as_str()).cloned() {
                snapshot.active_job = Some(ActiveJobRef {
                    id: claimed.id.clone(),
                    status: JobStatus::Running,
                });
                state.push_snapshot_event(snapshot);
            }
            Ok(Some(claimed))
        })
        .await
    }

    /// Mark a running job completed, storing its result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::JobNotFound`] if the job does not exist, or
    /// [`PipelineError::InvalidTransition`] if it is not `running`.
    pub async fn complete_job(
        &self,
        workspace_id: &WorkspaceId,
        job_id: &JobId,
        result: Option<serde_json::Value>,
    ) -> PipelineResult<Job> {
        let clock = self.clock.clone();
        let job_id_owned = job_id.clone();
        self.mutate(workspace_id, move |state| {
            let now = clock.now();
            let job = state
                .jobs
                .get_mut(job_id_owned.as_str())
                .ok_or_else(|| PipelineError::JobNotFound(job_id_owned.as_str().to_string()))?;
            if job.status != JobStatus::Running {
                return Err(PipelineError::InvalidTransition(format!(
                    "job {} is not running (status={:?})",
                    job_id_owned, job.status
                )));
            }
            job.status = JobStatus::Completed;
            job.completed_at = Some(now);
            job.result = result;
            job.lease_expires_at = None;
            let completed = job.clone();

            if let Some(mut snapshot) = state.projects.get(completed.project_id.as_str()).cloned() {
                snapshot.active_job = None;
                state.push_snapshot_event(snapshot);
            }
            Ok(completed)
        })
        .await
    }

    /// Mark a running job failed: re-queue with backoff if attempts remain,
    /// otherwise dead-letter it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::JobNotFound`] if the job does not exist.
    pub async fn fail_job(
        &self,
        workspace_id: &WorkspaceId,
        job_id: &JobId,
        error_message: &str,
    ) -> PipelineResult<Job> {
        let clock = self.clock.clone();
        let job_id_owned = job_id.clone();
        let error_message = error_message.to_string();
        let retry = self.retry;
        self.mutate(workspace_id, move |state| {
            let now = clock.now();
            let job = state
                .jobs
                .get_mut(job_id_owned.as_str())
                .ok_or_else(|| PipelineError::JobNotFound(job_id_owned.as_str().to_string()))?;

            job.error = Some(error_message.clone());
            job.lease_expires_at = None;

            if job.attempt_count < job.max_attempts {
                job.status = JobStatus::Queued;
                job.next_retry_at = Some(now + retry.backoff(job.attempt_count));
                if !state.queued_job_ids.iter().any(|id| id == job_id_owned.as_str()) {
                    state.queued_job_ids.push_back(job_id_owned.as_str().to_string());
                }
            } else {
                job.status = JobStatus::Failed;
                job.dead_letter = Some(true);
                job.completed_at = Some(now);
            }
            let failed = job.clone();

            if let Some(mut snapshot) = state.projects.get(failed.project_id.as_str()).cloned() {
                snapshot.active_job = if matches!(failed.status, JobStatus::Queued) {
                    Some(ActiveJobRef {
                        id: failed.id.clone(),
                        status: JobStatus::Queued,
                    })
                } else {
                    None
                };
                state.push_snapshot_event(snapshot);
            }
            Ok(failed)
        })
        .await
    }

    /// Fetch project events with `seq > last_seq`, in order.
    pub async fn get_project_events_since(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
        last_seq: u64,
    ) -> PipelineResult<Vec<ProjectEvent>> {
        self.read(workspace_id, |state| {
            state
                .project_events
                .get(project_id.as_str())
                .map(|events| events.iter().filter(|e| e.seq > last_seq).cloned().collect())
                .unwrap_or_default()
        })
        .await
    }

    /// Test-only: wipe a workspace's pipeline state entirely.
    pub async fn reset(&self, workspace_id: &WorkspaceId) -> PipelineResult<()> {
        self.repository.remove(&state_scope(workspace_id)).await?;
        Ok(())
    }
}
