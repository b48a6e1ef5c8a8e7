//! Job submission pipeline
//!
//! A [`Device`] runs one job at a time. Jobs submitted while it is busy are
//! queued and started one after another, each after a settle delay so the
//! operator can load material.
//!
//! A run goes through these stages:
//! 1. Init: order the paths, apply the output transform, shift to the
//!    current origin, run the filters and append the feed move.
//! 2. Approval, unless the job is auto approved.
//! 3. Connect and send the connect and before command blocks.
//! 4. Stream the motion plan, rate limited unless the output spools.
//! 5. Finish, send the after block and disconnect.
//!
//! Configuration problems and failed connects are returned to the caller.
//! Failures while streaming end the job with [`JobStatus::Error`] instead.

use crate::config::DeviceConfig;
use crate::job::{Job, JobInfo};
use crate::process::MotionPlan;
use inkcut_camtools::{apply_all, to_polylines, tolerance_for, PathFilter};
use inkcut_communication::{Link, Protocol, TestTransport, Transport};
use inkcut_core::{DeviceEvent, EventDispatcher, JobStatus, PathModel, Point, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Wait before starting the next queued job
pub const QUEUE_SETTLE_DELAY: Duration = Duration::from_secs(60);

/// How often a paused job checks whether it may continue
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(300);

const EVENT_BUFFER: usize = 256;

type Filters = Arc<Vec<Box<dyn PathFilter>>>;

#[derive(Default)]
struct SchedulerState {
    busy: bool,
    queue: VecDeque<Job>,
    job: Option<Job>,
}

struct DeviceInner {
    config: RwLock<DeviceConfig>,
    filters: RwLock<Filters>,
    link: tokio::sync::Mutex<Link>,
    scheduler: Mutex<SchedulerState>,
    position: RwLock<[f64; 3]>,
    origin: RwLock<[f64; 3]>,
    events: EventDispatcher,
}

/// Clears the busy flag when a run ends, however it ends
struct BusyGuard<'a> {
    inner: &'a DeviceInner,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut scheduler = self.inner.scheduler.lock();
        scheduler.busy = false;
        scheduler.job = None;
    }
}

/// Handle to a cutter. Clones share the same device.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

fn build_filters(config: &DeviceConfig) -> Filters {
    Arc::new(config.filters.iter().map(|f| f.build()).collect())
}

impl Device {
    pub fn new(
        config: DeviceConfig,
        transport: Box<dyn Transport>,
        protocol: Box<dyn Protocol>,
    ) -> Self {
        let filters = build_filters(&config);
        Self {
            inner: Arc::new(DeviceInner {
                config: RwLock::new(config),
                filters: RwLock::new(filters),
                link: tokio::sync::Mutex::new(Link::new(transport, protocol)),
                scheduler: Mutex::new(SchedulerState::default()),
                position: RwLock::new([0.0; 3]),
                origin: RwLock::new([0.0; 3]),
                events: EventDispatcher::new(EVENT_BUFFER),
            }),
        }
    }

    /// Replace the filters built from the configuration
    pub fn with_filters(self, filters: Vec<Box<dyn PathFilter>>) -> Self {
        *self.inner.filters.write() = Arc::new(filters);
        self
    }

    pub fn config(&self) -> DeviceConfig {
        self.inner.config.read().clone()
    }

    /// Validate and apply a new configuration. Filters are rebuilt from it.
    pub fn set_config(&self, config: DeviceConfig) -> Result<()> {
        config.validate()?;
        *self.inner.filters.write() = build_filters(&config);
        *self.inner.config.write() = config;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.events.subscribe()
    }

    pub fn position(&self) -> [f64; 3] {
        *self.inner.position.read()
    }

    /// Where the next job starts when jobs are fed to the end
    pub fn origin(&self) -> [f64; 3] {
        *self.inner.origin.read()
    }

    pub fn reset_origin(&self) {
        *self.inner.origin.write() = [0.0; 3];
    }

    pub fn is_busy(&self) -> bool {
        self.inner.scheduler.lock().busy
    }

    pub fn queue_len(&self) -> usize {
        self.inner.scheduler.lock().queue.len()
    }

    /// Ids of the jobs waiting behind the current one
    pub fn queued_jobs(&self) -> Vec<Uuid> {
        self.inner.scheduler.lock().queue.iter().map(|j| j.id).collect()
    }

    pub fn current_job(&self) -> Option<Job> {
        self.inner.scheduler.lock().job.clone()
    }

    /// Connect and send the connect commands. Does nothing when connected.
    pub async fn connect(&self) -> Result<()> {
        let config = self.config();
        let mut link = self.inner.link.lock().await;
        self.connect_link(&mut link, &config).await
    }

    /// Send the disconnect commands and close the transport
    pub async fn disconnect(&self) -> Result<()> {
        let config = self.config();
        let mut link = self.inner.link.lock().await;
        self.disconnect_link(&mut link, &config).await
    }

    /// Move the tool. Absolute positions are clipped to be non-negative.
    pub async fn move_to(&self, position: [f64; 3], absolute: bool) -> Result<()> {
        let mut link = self.inner.link.lock().await;
        self.move_link(&mut link, position, absolute).await
    }

    /// Run `job`, or queue it when another job is running.
    ///
    /// `test` streams to an in-memory transport instead of the device.
    pub async fn submit(&self, job: Job, test: bool) -> Result<()> {
        {
            let mut scheduler = self.inner.scheduler.lock();
            if scheduler.busy {
                let job_id = job.id;
                tracing::info!("device | {} put in device queue", job);
                scheduler.queue.push_back(job);
                let queued = scheduler.queue.len();
                drop(scheduler);
                self.inner
                    .events
                    .publish(DeviceEvent::JobQueued { job_id, queued });
                return Ok(());
            }
            scheduler.busy = true;
            scheduler.job = Some(job.clone());
        }
        let _busy = BusyGuard { inner: &self.inner };

        self.run(&job, test).await?;

        let cancelled = job.info.is_cancelled();
        if job.feed_to_end && !cancelled {
            *self.inner.origin.write() = self.position();
        }
        let next = if cancelled {
            None
        } else {
            self.inner.scheduler.lock().queue.pop_front()
        };
        if let Some(next) = next {
            tracing::info!("device | Rescheduling {} from queue", next);
            self.schedule(next);
        }
        Ok(())
    }

    /// Submit `job` after the settle delay
    fn schedule(&self, job: Job) {
        let device = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(QUEUE_SETTLE_DELAY).await;
            let id = job.id;
            if let Err(e) = device.submit(job, false).await {
                tracing::error!("device | queued job {} failed: {}", id, e);
            }
        });
    }

    fn set_status(&self, job: &Job, status: JobStatus) {
        job.info.set_status(status);
        tracing::debug!("device | job {} {}", job.id, status);
        self.inner.events.publish(DeviceEvent::StatusChanged {
            job_id: job.id,
            status,
        });
    }

    /// Path model as this device will cut it
    fn init(&self, job: &Job, config: &DeviceConfig) -> PathModel {
        tracing::debug!("device | init {}", job);
        let mut model = job.order.order(&job.model);

        let transform = config.output_transform();
        if !transform.is_identity() {
            if let Some(before) = model.bounding_rect() {
                model = model.transformed(&transform);
                // Keep the job where it was so mirrored output is not clipped
                if let Some(after) = model.bounding_rect() {
                    model = model.translated(before.min_x - after.min_x, before.min_y - after.min_y);
                }
            }
        }

        if job.feed_to_end {
            let [x, y, _] = self.origin();
            model = model.translated(x, y);
        }

        let filters = Arc::clone(&*self.inner.filters.read());
        model = apply_all(&filters, &model);

        if job.feed_to_end {
            if let Some(bounds) = model.bounding_rect() {
                model.move_to(Point::new(bounds.min_x, bounds.max_y + job.feed_after));
            }
        }
        model
    }

    async fn run(&self, job: &Job, test: bool) -> Result<()> {
        let config = self.config();
        config.validate()?;
        let info = &job.info;

        let mut link = self.inner.link.lock().await;
        let always_spools = link.always_spools();
        let rate = config.rate(always_spools);
        let step = config.interpolation_step(always_spools);

        let model = self.init(job, &config);
        let polylines = to_polylines(&model, tolerance_for(config.quality_factor));
        let [x, y, _] = self.origin();
        let start = Point::new(x, y);
        let total_length = MotionPlan::total_length(&polylines, start);
        tracing::debug!("device | Path length: {:.2}", total_length);
        info.set_length(total_length);
        info.set_speed(rate * 1000.0);

        self.set_status(job, JobStatus::Waiting);
        if info.auto_approve() {
            self.set_status(job, JobStatus::Approved);
        } else {
            info.request_approval().await;
            let status = info.status();
            if status != JobStatus::Approved {
                tracing::info!("device | {} not approved ({}), cancelled", job, status);
                self.set_status(job, JobStatus::Cancelled);
                return Ok(());
            }
            self.set_status(job, JobStatus::Approved);
        }

        self.set_status(job, JobStatus::Running);
        info.mark_started();

        let saved = if test || config.test_mode {
            tracing::info!("device | {} running against the test transport", job);
            Some(link.replace_transport(Box::new(TestTransport::new().spooling(true))))
        } else {
            None
        };

        let plan = MotionPlan::new(polylines, start, step);
        let result = self.stream(&mut link, job, &config, plan, rate).await;

        if link.is_connected() {
            match unless_cancelled(info, self.disconnect_link(&mut link, &config)).await {
                Ok(Some(())) => {}
                Ok(None) => {
                    tracing::debug!("device | {} cancelled, closing without commands", job);
                    if let Err(e) = link.close().await {
                        tracing::warn!("device | disconnect failed: {}", e);
                    }
                    self.inner.events.publish(DeviceEvent::Disconnected);
                }
                Err(e) => tracing::warn!("device | disconnect failed: {}", e),
            }
        }
        if let Some(transport) = saved {
            link.replace_transport(transport);
        }
        result
    }

    async fn stream(
        &self,
        link: &mut Link,
        job: &Job,
        config: &DeviceConfig,
        plan: MotionPlan,
        rate: f64,
    ) -> Result<()> {
        let info = &job.info;
        match unless_cancelled(info, self.connect_link(link, config)).await {
            Ok(Some(())) => {
                self.inner.events.publish(DeviceEvent::JobStarted(job.id));
                if let Err(e) = self.stream_motions(link, job, config, plan, rate).await {
                    tracing::error!("device | {} failed: {}", job, e);
                    self.set_status(job, JobStatus::Error);
                }
            }
            Ok(None) => {
                tracing::info!("device | {} cancelled while connecting", job);
                self.set_status(job, JobStatus::Cancelled);
            }
            Err(e) => {
                tracing::error!("device | connect failed: {}", e);
                self.set_status(job, JobStatus::Error);
                return Err(e);
            }
        }

        info.mark_ended();
        if info.status() == JobStatus::Running {
            info.mark_complete();
            self.inner.events.publish(DeviceEvent::StatusChanged {
                job_id: job.id,
                status: JobStatus::Complete,
            });
        }
        let status = info.status();
        tracing::info!("device | {} finished: {}", job, status);
        self.inner.events.publish(DeviceEvent::JobFinished {
            job_id: job.id,
            status,
        });
        Ok(())
    }

    async fn stream_motions(
        &self,
        link: &mut Link,
        job: &Job,
        config: &DeviceConfig,
        plan: MotionPlan,
        rate: f64,
    ) -> Result<()> {
        let info = &job.info;
        let total_length = info.length();

        let setup = async {
            if !config.commands_before.is_empty() {
                link.write(config.commands_before.as_bytes()).await?;
            }
            if config.force_enabled {
                if let Err(e) = link.set_force(config.force).await {
                    skip_unsupported(e)?;
                }
            }
            if config.speed_enabled {
                if let Err(e) = link.set_velocity(config.speed).await {
                    skip_unsupported(e)?;
                }
            }
            Ok::<(), inkcut_core::Error>(())
        };
        if unless_cancelled(info, setup).await?.is_none() {
            tracing::info!("device | {} cancelled before motion", job);
            self.set_status(job, JobStatus::Cancelled);
            return Ok(());
        }

        let mut moved = 0.0;
        for motion in plan {
            if info.is_paused() {
                tracing::info!("device | {} paused", job);
                while info.is_paused() && !info.is_cancelled() && link.is_connected() {
                    tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
                }
            }
            if info.is_cancelled() {
                tracing::info!("device | {} cancelled", job);
                self.set_status(job, JobStatus::Cancelled);
                break;
            } else if !link.is_connected() {
                tracing::error!("device | connection lost during {}", job);
                self.set_status(job, JobStatus::Error);
                break;
            }

            let position = [motion.point.x, motion.point.y, f64::from(motion.z)];
            let step = async {
                self.move_link(link, position, true).await?;
                link.poll().await
            };
            if unless_cancelled(info, step).await?.is_none() {
                tracing::info!("device | {} cancelled", job);
                self.set_status(job, JobStatus::Cancelled);
                break;
            }
            moved += motion.distance;

            if rate > 0.0 && motion.distance > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(motion.distance / rate / 1000.0)).await;
            }

            if total_length > 0.0 {
                let progress = (100.0 * moved / total_length).clamp(0.0, 100.0) as u8;
                if info.set_progress(progress) {
                    self.inner.events.publish(DeviceEvent::JobProgress {
                        job_id: job.id,
                        progress,
                    });
                }
            }
        }

        if info.status() != JobStatus::Error {
            unless_cancelled(info, link.finish()).await?;
        }
        if !config.commands_after.is_empty() && link.is_connected() {
            unless_cancelled(info, link.write(config.commands_after.as_bytes())).await?;
        }
        Ok(())
    }

    async fn connect_link(&self, link: &mut Link, config: &DeviceConfig) -> Result<()> {
        if link.is_connected() {
            tracing::debug!("device | already connected");
            return Ok(());
        }
        link.open().await?;
        self.inner
            .events
            .publish(DeviceEvent::Connected(link.transport().name().to_string()));
        if !config.commands_connect.is_empty() {
            link.write(config.commands_connect.as_bytes()).await?;
        }
        Ok(())
    }

    async fn disconnect_link(&self, link: &mut Link, config: &DeviceConfig) -> Result<()> {
        if !config.commands_disconnect.is_empty() && link.is_connected() {
            link.write(config.commands_disconnect.as_bytes()).await?;
        }
        link.close().await?;
        self.inner.events.publish(DeviceEvent::Disconnected);
        Ok(())
    }

    async fn move_link(&self, link: &mut Link, position: [f64; 3], absolute: bool) -> Result<()> {
        let position = if absolute {
            let clipped = position.map(|p| p.max(0.0));
            *self.inner.position.write() = clipped;
            clipped
        } else {
            let mut current = self.inner.position.write();
            current[0] += position[0];
            current[1] += position[1];
            position
        };
        self.inner
            .events
            .publish(DeviceEvent::PositionChanged(self.position()));
        let z = if position[2] > 0.0 { 1 } else { 0 };
        link.move_to(position[0], position[1], z, absolute).await
    }
}

/// Run a link operation unless the job is cancelled first.
///
/// Protocols that wait for acknowledgements may block indefinitely on a
/// silent device. Returns `None` when the job was cancelled while waiting.
async fn unless_cancelled<T>(
    info: &JobInfo,
    operation: impl Future<Output = Result<T>>,
) -> Result<Option<T>> {
    tokio::select! {
        biased;
        result = operation => result.map(Some),
        _ = cancelled(info) => Ok(None),
    }
}

async fn cancelled(info: &JobInfo) {
    while !info.is_cancelled() {
        tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
    }
}

/// Languages without force or speed commands still cut
fn skip_unsupported(error: inkcut_core::Error) -> Result<()> {
    if error.is_unsupported() {
        tracing::warn!("device | {}", error);
        Ok(())
    } else {
        Err(error)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheduler = self.inner.scheduler.lock();
        f.debug_struct("Device")
            .field("busy", &scheduler.busy)
            .field("queued", &scheduler.queue.len())
            .field("position", &self.position())
            .field("origin", &self.origin())
            .finish()
    }
}
