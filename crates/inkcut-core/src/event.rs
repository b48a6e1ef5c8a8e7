//! Device events
//!
//! Provides:
//! - Event types for job lifecycle and tool position changes
//! - Event dispatcher for publishing events to subscribers
//!
//! Publishing with no subscribers is not an error; the event is dropped.

use crate::status::JobStatus;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Device event types
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Transport connected
    Connected(String),
    /// Transport disconnected
    Disconnected,
    /// A job changed status
    StatusChanged {
        /// The job id.
        job_id: Uuid,
        /// The new status.
        status: JobStatus,
    },
    /// Tool position changed, `[x, y, z]` in device coordinates
    PositionChanged([f64; 3]),
    /// A job was queued behind the running one
    JobQueued {
        /// The job id.
        job_id: Uuid,
        /// Queue length after insertion.
        queued: usize,
    },
    /// A job started streaming
    JobStarted(Uuid),
    /// Progress of the running job
    JobProgress {
        /// The job id.
        job_id: Uuid,
        /// Percent complete, 0 to 100.
        progress: u8,
    },
    /// A job run ended
    JobFinished {
        /// The job id.
        job_id: Uuid,
        /// Final status of the run.
        status: JobStatus,
    },
}

impl std::fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Connected(name) => write!(f, "Connected to {}", name),
            DeviceEvent::Disconnected => write!(f, "Disconnected"),
            DeviceEvent::StatusChanged { job_id, status } => {
                write!(f, "Job {} status: {}", job_id, status)
            }
            DeviceEvent::PositionChanged([x, y, z]) => {
                write!(f, "Position: ({:.2}, {:.2}, {})", x, y, z)
            }
            DeviceEvent::JobQueued { job_id, queued } => {
                write!(f, "Job {} queued ({} waiting)", job_id, queued)
            }
            DeviceEvent::JobStarted(job_id) => write!(f, "Job {} started", job_id),
            DeviceEvent::JobProgress { job_id, progress } => {
                write!(f, "Job {} progress: {}%", job_id, progress)
            }
            DeviceEvent::JobFinished { job_id, status } => {
                write!(f, "Job {} finished: {}", job_id, status)
            }
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for device events.
    tx: broadcast::Sender<DeviceEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers the event reached.
    pub fn publish(&self, event: DeviceEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!("No subscribers for event: {}", event);
                0
            }
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}
