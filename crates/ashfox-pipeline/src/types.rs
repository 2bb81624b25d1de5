//! Project graph state, job records, and the event journal.

use ashfox_core::ids::{JobId, ProjectId};
use ashfox_core::JobKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One node of a project's bone/cube hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyNode {
    /// An animatable bone, possibly parenting other bones and cubes.
    Bone {
        /// Stable identifier.
        id: String,
        /// Display name.
        name: String,
        /// Child nodes.
        #[serde(default)]
        children: Vec<HierarchyNode>,
    },
    /// A leaf cuboid mesh element.
    Cube {
        /// Stable identifier.
        id: String,
        /// Display name.
        name: String,
    },
}

impl HierarchyNode {
    fn count_into(&self, bones: &mut u32, cubes: &mut u32) {
        match self {
            Self::Bone { children, .. } => {
                *bones += 1;
                for child in children {
                    child.count_into(bones, cubes);
                }
            }
            Self::Cube { .. } => *cubes += 1,
        }
    }
}

/// Aggregate bone/cube counts, kept consistent with `hierarchy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    /// Total bone count across the hierarchy.
    pub bones: u32,
    /// Total cube count across the hierarchy.
    pub cubes: u32,
}

impl ProjectStats {
    /// Recompute stats from a hierarchy forest.
    #[must_use]
    pub fn from_hierarchy(hierarchy: &[HierarchyNode]) -> Self {
        let mut stats = Self::default();
        for node in hierarchy {
            node.count_into(&mut stats.bones, &mut stats.cubes);
        }
        stats
    }
}

/// A named animation clip summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSummary {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Clip length, in seconds.
    pub length: f64,
    /// Whether the clip loops.
    #[serde(rename = "loop")]
    pub looping: bool,
}

/// A reference to the job currently active against a project, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJobRef {
    /// The active job's id.
    pub id: JobId,
    /// The active job's status (`queued` or `running`).
    pub status: JobStatus,
}

/// A point-in-time summary of one project's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Stable identifier.
    pub project_id: ProjectId,
    /// Display name.
    pub name: String,
    /// Monotonically increasing per-project revision counter.
    pub revision: u64,
    /// Whether the project has any committed geometry.
    pub has_geometry: bool,
    /// The camera/editor focus anchor, if set.
    pub focus_anchor: Option<[f64; 3]>,
    /// The bone/cube hierarchy forest.
    pub hierarchy: Vec<HierarchyNode>,
    /// Animation clip summaries.
    pub animations: Vec<AnimationSummary>,
    /// Aggregate counts, kept consistent with `hierarchy`.
    pub stats: ProjectStats,
    /// The job currently queued or running against this project, if any.
    pub active_job: Option<ActiveJobRef>,
}

impl ProjectSnapshot {
    /// Build an empty project snapshot with consistent zeroed stats.
    #[must_use]
    pub fn empty(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            revision: 0,
            has_geometry: false,
            focus_anchor: None,
            hierarchy: Vec::new(),
            animations: Vec::new(),
            stats: ProjectStats::default(),
            active_job: None,
        }
    }
}

/// The lifecycle state of a native pipeline job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Queued,
    /// Claimed by a worker and leased.
    Running,
    /// Finished successfully.
    Completed,
    /// Exhausted retries or was marked terminally failed.
    Failed,
}

/// A durable unit of asynchronous work against one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier, formatted `job-<n>`.
    pub id: JobId,
    /// The project this job targets.
    pub project_id: ProjectId,
    /// The kind of work requested.
    pub kind: JobKind,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of claim attempts so far. Never exceeds `max_attempts`.
    pub attempt_count: u32,
    /// Maximum claim attempts before dead-lettering.
    pub max_attempts: u32,
    /// Lease duration granted on each claim, in milliseconds.
    pub lease_ms: u64,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the job was first claimed.
    pub started_at: Option<DateTime<Utc>>,
    /// When the current lease expires, while running.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// When the job becomes eligible for a retry claim, while re-queued.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// The worker currently (or most recently) holding the lease.
    pub worker_id: Option<String>,
    /// The most recent failure message, if any.
    pub error: Option<String>,
    /// Set once retries are exhausted.
    pub dead_letter: Option<bool>,
    /// The kind-specific submission payload.
    pub payload: Option<serde_json::Value>,
    /// The kind-specific result, once completed.
    pub result: Option<serde_json::Value>,
}

impl Job {
    /// Whether this job's lease, if any, has expired as of `now`.
    #[must_use]
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.lease_expires_at.is_some_and(|expires| expires <= now)
    }
}

/// One entry of a project's append-only event journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEvent {
    /// Strictly increasing per-workspace sequence number.
    pub seq: u64,
    /// Event discriminator; always `"project_snapshot"` for now.
    pub event: String,
    /// The project snapshot this event carries.
    pub data: ProjectSnapshot,
}

/// The single durable record addressed by a workspace's pipeline state scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Monotonic counter used to mint new job ids.
    pub next_job_id: u64,
    /// Monotonic counter used to mint new event sequence numbers.
    pub next_seq: u64,
    /// All known projects, by id.
    pub projects: BTreeMap<String, ProjectSnapshot>,
    /// All known jobs, by id.
    pub jobs: BTreeMap<String, Job>,
    /// FIFO of job ids awaiting a claim.
    pub queued_job_ids: VecDeque<String>,
    /// Per-project append-only event journals.
    pub project_events: BTreeMap<String, Vec<ProjectEvent>>,
}

impl PipelineState {
    pub(crate) fn next_job_id(&mut self) -> JobId {
        self.next_job_id += 1;
        JobId::from_counter(self.next_job_id)
    }

    pub(crate) fn push_snapshot_event(&mut self, snapshot: ProjectSnapshot) {
        self.next_seq += 1;
        let event = ProjectEvent {
            seq: self.next_seq,
            event: "project_snapshot".to_string(),
            data: snapshot.clone(),
        };
        self.project_events
            .entry(snapshot.project_id.as_str().to_string())
            .or_default()
            .push(event);
        self.projects
            .insert(snapshot.project_id.as_str().to_string(), snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_nested_hierarchy() {
        let hierarchy = vec![HierarchyNode::Bone {
            id: "root".to_string(),
            name: "Root".to_string(),
            children: vec![
                HierarchyNode::Cube {
                    id: "c1".to_string(),
                    name: "Cube1".to_string(),
                },
                HierarchyNode::Bone {
                    id: "arm".to_string(),
                    name: "Arm".to_string(),
                    children: vec![HierarchyNode::Cube {
                        id: "c2".to_string(),
                        name: "Cube2".to_string(),
                    }],
                },
            ],
        }];
        let stats = ProjectStats::from_hierarchy(&hierarchy);
        assert_eq!(stats, ProjectStats { bones: 2, cubes: 2 });
    }
}
