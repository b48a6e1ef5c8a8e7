//! Jobs and their live state
//!
//! A [`Job`] is what a caller hands to a device: a path model plus options.
//! Its [`JobInfo`] is shared with the caller so progress can be watched and
//! the job paused, resumed or cancelled while it streams.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inkcut_camtools::OrderKind;
use inkcut_core::{JobStatus, PathModel};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Asks the user (or some policy) whether a job may start.
///
/// Implementations approve by calling [`JobInfo::approve`]. Any other
/// status left behind cancels the run.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn request_approval(&self, info: &JobInfo);
}

/// Plain predicates approve when they return true
#[async_trait]
impl<F> ApprovalHandler for F
where
    F: Fn(&JobInfo) -> bool + Send + Sync,
{
    async fn request_approval(&self, info: &JobInfo) {
        if self(info) {
            info.approve();
        }
    }
}

/// Snapshot of a job's run state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    pub done: bool,
    pub cancelled: bool,
    pub paused: bool,
    /// Percent complete, 0 to 100
    pub progress: u8,
    /// Path length in px, travel included
    pub length: f64,
    /// Output speed in px/s
    pub speed: f64,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    /// Number of completed runs
    pub count: u32,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            status: JobStatus::Staged,
            done: false,
            cancelled: false,
            paused: false,
            progress: 0,
            length: 0.0,
            speed: 0.0,
            created: Utc::now(),
            started: None,
            ended: None,
            count: 0,
        }
    }
}

#[derive(Default)]
pub struct JobInfo {
    state: RwLock<JobState>,
    auto_approve: bool,
    approval: Option<Arc<dyn ApprovalHandler>>,
}

impl JobInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start without asking for approval
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn with_approval(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approval = Some(handler);
        self
    }

    pub fn auto_approve(&self) -> bool {
        self.auto_approve
    }

    /// Ask the approval handler. Without one the job stays unapproved.
    pub async fn request_approval(&self) {
        match &self.approval {
            Some(handler) => handler.request_approval(self).await,
            None => tracing::warn!("job | no approval handler, job will not start"),
        }
    }

    pub fn snapshot(&self) -> JobState {
        self.state.read().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    pub fn set_status(&self, status: JobStatus) {
        self.state.write().status = status;
    }

    pub fn approve(&self) {
        self.set_status(JobStatus::Approved);
    }

    pub fn pause(&self) {
        self.state.write().paused = true;
    }

    pub fn resume(&self) {
        self.state.write().paused = false;
    }

    pub fn cancel(&self) {
        self.state.write().cancelled = true;
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.read().cancelled
    }

    pub fn is_done(&self) -> bool {
        self.state.read().done
    }

    pub fn progress(&self) -> u8 {
        self.state.read().progress
    }

    /// Store progress, clamped to 100. Returns true when the value changed.
    pub fn set_progress(&self, progress: u8) -> bool {
        let progress = progress.min(100);
        let mut state = self.state.write();
        let changed = state.progress != progress;
        state.progress = progress;
        changed
    }

    pub fn length(&self) -> f64 {
        self.state.read().length
    }

    pub fn set_length(&self, length: f64) {
        self.state.write().length = length;
    }

    pub fn speed(&self) -> f64 {
        self.state.read().speed
    }

    pub fn set_speed(&self, speed: f64) {
        self.state.write().speed = speed;
    }

    pub fn count(&self) -> u32 {
        self.state.read().count
    }

    pub fn mark_started(&self) {
        self.state.write().started = Some(Utc::now());
    }

    pub fn mark_ended(&self) {
        self.state.write().ended = Some(Utc::now());
    }

    /// Finish a successful run
    pub fn mark_complete(&self) {
        let mut state = self.state.write();
        state.done = true;
        state.status = JobStatus::Complete;
        state.count += 1;
    }

    /// Back to the initial state so the job can run again
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.progress = 0;
        state.paused = false;
        state.cancelled = false;
        state.done = false;
        state.status = JobStatus::Staged;
    }

    /// Estimated run time from length and speed
    pub fn duration(&self) -> Duration {
        let state = self.state.read();
        if state.length <= 0.0 || state.speed <= 0.0 {
            return Duration::zero();
        }
        Duration::milliseconds((1000.0 * state.length / state.speed).round() as i64)
    }
}

impl fmt::Debug for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobInfo")
            .field("state", &*self.state.read())
            .field("auto_approve", &self.auto_approve)
            .field("approval", &self.approval.is_some())
            .finish()
    }
}

/// A path model queued for a device
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub model: PathModel,
    pub info: Arc<JobInfo>,
    /// Move past the job when done and start the next one there
    pub feed_to_end: bool,
    /// Extra feed in px beyond the job's far edge
    pub feed_after: f64,
    pub order: OrderKind,
}

impl Job {
    pub fn new(model: PathModel) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            info: Arc::new(JobInfo::new()),
            feed_to_end: false,
            feed_after: 0.0,
            order: OrderKind::Normal,
        }
    }

    pub fn with_info(mut self, info: JobInfo) -> Self {
        self.info = Arc::new(info);
        self
    }

    pub fn with_feed(mut self, feed_to_end: bool, feed_after: f64) -> Self {
        self.feed_to_end = feed_to_end;
        self.feed_after = feed_after;
        self
    }

    pub fn with_order(mut self, order: OrderKind) -> Self {
        self.order = order;
        self
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({}, {} paths)", self.id, self.model.len())
    }
}

/// On-disk job description used by the headless runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFile {
    pub model: PathModel,
    pub feed_to_end: bool,
    pub feed_after: f64,
    pub order: OrderKind,
    pub auto_approve: bool,
}

impl From<JobFile> for Job {
    fn from(file: JobFile) -> Self {
        Job::new(file.model)
            .with_info(JobInfo::new().with_auto_approve(file.auto_approve))
            .with_feed(file.feed_to_end, file.feed_after)
            .with_order(file.order)
    }
}
