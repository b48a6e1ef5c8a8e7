use async_trait::async_trait;
use inkcut_camtools::{FilterConfig, MinLineConfig};
use inkcut_communication::{
    GCodeConfig, GCodeProtocol, HpglProtocol, StreamMode, TestTransport, TestTransportHandle,
};
use inkcut_core::{DeviceEvent, JobStatus, PathModel, Point};
use inkcut_device::{ApprovalHandler, Device, DeviceConfig, Job, JobInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

fn hpgl_device(config: DeviceConfig) -> (Device, TestTransportHandle) {
    let transport = TestTransport::new();
    let handle = transport.handle();
    let device = Device::new(config, Box::new(transport), Box::new(HpglProtocol::default()));
    (device, handle)
}

/// G-code device that holds every line until the firmware answers `ok`
fn acked_gcode_device() -> (Device, TestTransportHandle) {
    let transport = TestTransport::new();
    let handle = transport.handle();
    let protocol = GCodeProtocol::new(GCodeConfig {
        stream_mode: StreamMode::Ok,
        ..Default::default()
    });
    let device = Device::new(DeviceConfig::default(), Box::new(transport), Box::new(protocol));
    (device, handle)
}

fn stroke(points: &[(f64, f64)]) -> Vec<Point> {
    points.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn auto_job(polylines: &[Vec<Point>]) -> Job {
    Job::new(PathModel::from_polylines(polylines))
        .with_info(JobInfo::new().with_auto_approve(true))
}

/// A long cut, interpolated in 1mm steps so it can be paused mid line
fn long_job() -> (Job, DeviceConfig) {
    let config = DeviceConfig {
        interpolate: true,
        ..Default::default()
    };
    (auto_job(&[stroke(&[(0.0, 0.0), (900.0, 0.0)])]), config)
}

async fn wait_for_writes(handle: &TestTransportHandle, count: usize) {
    while handle.write_count() < count {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Approves once the test opens the gate
struct Gate(Arc<Notify>);

#[async_trait]
impl ApprovalHandler for Gate {
    async fn request_approval(&self, info: &JobInfo) {
        self.0.notified().await;
        info.approve();
    }
}

#[tokio::test(start_paused = true)]
async fn test_job_streams_hpgl() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]);
    let info = job.info.clone();

    device.submit(job, false).await.unwrap();

    assert_eq!(handle.written_string(), "IN;PU0,0;PD510,102;PU510,102;IN;");
    assert_eq!(info.status(), JobStatus::Complete);
    assert_eq!(info.progress(), 100);
    assert_eq!(info.count(), 1);
    assert!(info.is_done());
    assert!((info.speed() - 360.0).abs() < 1e-9);
    assert!(info.snapshot().ended.is_some());
    assert_eq!(device.position(), [45.0, 9.0, 0.0]);
    assert!(!handle.is_connected());
    assert!(!device.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_command_blocks_wrap_the_job() {
    let (device, handle) = hpgl_device(DeviceConfig {
        commands_connect: "C;".to_string(),
        commands_before: "B;".to_string(),
        commands_after: "A;".to_string(),
        commands_disconnect: "D;".to_string(),
        force_enabled: true,
        force: 80.0,
        ..Default::default()
    });
    device
        .submit(auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]), false)
        .await
        .unwrap();
    assert_eq!(
        handle.written_string(),
        "IN;C;B;FS80; PU0,0;PD510,102;PU510,102;IN;A;D;"
    );
}

#[tokio::test(start_paused = true)]
async fn test_busy_device_queues_fifo() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let mut events = device.subscribe();

    let gate = Arc::new(Notify::new());
    let first = Job::new(PathModel::from_polylines(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]))
        .with_info(JobInfo::new().with_approval(Arc::new(Gate(gate.clone()))));
    let second = auto_job(&[stroke(&[(0.0, 0.0), (20.0, 0.0)])]);
    let third = auto_job(&[stroke(&[(0.0, 0.0), (30.0, 0.0)])]);
    let ids = [first.id, second.id, third.id];
    let third_info = third.info.clone();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(first, false).await })
    };
    while !device.is_busy() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    device.submit(second, false).await.unwrap();
    device.submit(third, false).await.unwrap();
    assert_eq!(device.queue_len(), 2);
    assert_eq!(device.queued_jobs(), vec![ids[1], ids[2]]);
    assert_eq!(third_info.status(), JobStatus::Staged);
    assert_eq!(handle.write_count(), 0);

    gate.notify_one();
    running.await.unwrap().unwrap();

    let mut started = Vec::new();
    let mut queued = Vec::new();
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            match events.recv().await.unwrap() {
                DeviceEvent::JobQueued { job_id, queued: n } => queued.push((job_id, n)),
                DeviceEvent::JobStarted(id) => started.push(id),
                DeviceEvent::JobFinished { job_id, status } if job_id == ids[2] => {
                    assert_eq!(status, JobStatus::Complete);
                    break;
                }
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(started, ids.to_vec());
    assert_eq!(queued, vec![(ids[1], 1), (ids[2], 2)]);
    assert_eq!(device.queue_len(), 0);
    assert_eq!(handle.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_queued_job_waits_for_settle_delay() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let gate = Arc::new(Notify::new());
    let first = Job::new(PathModel::from_polylines(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]))
        .with_info(JobInfo::new().with_approval(Arc::new(Gate(gate.clone()))));
    let second = auto_job(&[stroke(&[(0.0, 0.0), (20.0, 0.0)])]);
    let second_info = second.info.clone();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(first, false).await })
    };
    while !device.is_busy() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    device.submit(second, false).await.unwrap();
    gate.notify_one();
    running.await.unwrap().unwrap();
    assert_eq!(handle.connect_count(), 1);

    tokio::time::sleep(inkcut_device::QUEUE_SETTLE_DELAY / 2).await;
    assert_eq!(second_info.status(), JobStatus::Staged);
    assert_eq!(handle.connect_count(), 1);

    tokio::time::sleep(inkcut_device::QUEUE_SETTLE_DELAY).await;
    assert_eq!(second_info.status(), JobStatus::Complete);
    assert_eq!(handle.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_approval_cancels_without_motion() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let job = Job::new(PathModel::from_polylines(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]))
        .with_info(JobInfo::new().with_approval(Arc::new(|_: &JobInfo| false)));
    let info = job.info.clone();

    device.submit(job, false).await.unwrap();
    assert_eq!(info.status(), JobStatus::Cancelled);
    assert_eq!(handle.connect_count(), 0);
    assert_eq!(handle.write_count(), 0);
    assert!(!device.is_busy());

    let job = Job::new(PathModel::from_polylines(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]))
        .with_info(JobInfo::new().with_approval(Arc::new(|_: &JobInfo| true)));
    let info = job.info.clone();
    device.submit(job, false).await.unwrap();
    assert_eq!(info.status(), JobStatus::Complete);
    assert_eq!(handle.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_stream() {
    let (job, config) = long_job();
    let (device, handle) = hpgl_device(config);
    let job = job.with_feed(true, 10.0);
    let info = job.info.clone();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(job, false).await })
    };
    wait_for_writes(&handle, 10).await;
    info.cancel();
    running.await.unwrap().unwrap();

    assert_eq!(info.status(), JobStatus::Cancelled);
    assert!(!info.is_done());
    assert!(info.progress() < 100);
    // Finish still runs and the transport is closed
    assert!(handle.written_string().ends_with("IN;"));
    assert!(!handle.is_connected());
    assert_eq!(device.origin(), [0.0, 0.0, 0.0]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_holds_output_until_resumed() {
    let (job, config) = long_job();
    let (device, handle) = hpgl_device(config);
    let info = job.info.clone();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(job, false).await })
    };
    wait_for_writes(&handle, 10).await;
    info.pause();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let paused_at = handle.write_count();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.write_count(), paused_at);
    assert_eq!(info.status(), JobStatus::Running);

    info.resume();
    running.await.unwrap().unwrap();
    assert_eq!(info.status(), JobStatus::Complete);
    assert!(handle.write_count() > paused_at);
}

#[tokio::test(start_paused = true)]
async fn test_connection_loss_ends_in_error() {
    let (job, config) = long_job();
    let (device, handle) = hpgl_device(config);
    let info = job.info.clone();
    let mut events = device.subscribe();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(job, false).await })
    };
    wait_for_writes(&handle, 10).await;
    handle.drop_connection();

    // Runtime failures are reported through the job, not the caller
    running.await.unwrap().unwrap();
    assert_eq!(info.status(), JobStatus::Error);
    assert!(!info.is_done());
    assert!(!handle.written_string().ends_with("IN;"));

    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        if let DeviceEvent::JobFinished { status, .. } = event {
            finished = Some(status);
        }
    }
    assert_eq!(finished, Some(JobStatus::Error));
}

#[tokio::test(start_paused = true)]
async fn test_min_jump_filter_in_pipeline() {
    let model = [
        stroke(&[(0.0, 0.0), (10.0, 0.0)]),
        stroke(&[(13.0, 0.0), (23.0, 0.0)]),
    ];
    for (min_jump, tool_ups) in [(5.0, 2), (1.0, 3)] {
        let (device, handle) = hpgl_device(DeviceConfig {
            filters: vec![FilterConfig::MinLine(MinLineConfig {
                min_jump,
                ..Default::default()
            })],
            ..Default::default()
        });
        device.submit(auto_job(&model), false).await.unwrap();
        let output = handle.written_string();
        assert_eq!(output.matches("PU").count(), tool_ups, "{}", output);
    }
}

#[tokio::test(start_paused = true)]
async fn test_feed_to_end_moves_origin() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]).with_feed(true, 10.0);

    device.submit(job, false).await.unwrap();
    assert!(handle.written_string().ends_with("PU0,215;PU0,215;IN;"));
    assert_eq!(device.origin(), [0.0, 19.0, 0.0]);

    // The next job starts below the first one
    handle.clear();
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 0.0)])]).with_feed(true, 0.0);
    device.submit(job, false).await.unwrap();
    assert!(handle.written_string().starts_with("IN;PU0,215;PD510,215;"));
    assert_eq!(device.origin(), [0.0, 19.0, 0.0]);
}

#[tokio::test(start_paused = true)]
async fn test_mirrored_output_stays_in_place() {
    let (device, handle) = hpgl_device(DeviceConfig {
        mirror_x: true,
        ..Default::default()
    });
    device
        .submit(auto_job(&[stroke(&[(10.0, 0.0), (45.0, 9.0)])]), false)
        .await
        .unwrap();
    assert_eq!(handle.written_string(), "IN;PU510,0;PD113,102;PU113,102;IN;");
}

#[tokio::test(start_paused = true)]
async fn test_test_mode_keeps_device_untouched() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]);
    let info = job.info.clone();

    device.submit(job, true).await.unwrap();
    assert_eq!(info.status(), JobStatus::Complete);
    assert_eq!(handle.connect_count(), 0);
    assert_eq!(handle.write_count(), 0);

    // The real transport is back in place
    device
        .submit(auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]), false)
        .await
        .unwrap();
    assert_eq!(handle.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_spooling_transport_skips_rate_limit() {
    let transport = TestTransport::new().spooling(true);
    let handle = transport.handle();
    let device = Device::new(
        DeviceConfig {
            interpolate: true,
            ..Default::default()
        },
        Box::new(transport),
        Box::new(HpglProtocol::default()),
    );
    let job = auto_job(&[stroke(&[(0.0, 0.0), (900.0, 0.0)])]);
    let info = job.info.clone();

    let started = tokio::time::Instant::now();
    device.submit(job, false).await.unwrap();
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(info.speed(), 0.0);
    // Not interpolated either: connect, two moves, final move, finish
    assert_eq!(handle.write_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_is_returned() {
    let (device, handle) = hpgl_device(DeviceConfig {
        interpolate: true,
        step_size: 0.0,
        ..Default::default()
    });
    let job = auto_job(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]);
    let info = job.info.clone();

    let err = device.submit(job, false).await.unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(info.status(), JobStatus::Staged);
    assert_eq!(handle.connect_count(), 0);
    assert!(!device.is_busy());

    assert!(device
        .set_config(DeviceConfig {
            rotation: 45,
            ..Default::default()
        })
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_failed_connect_is_returned() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    handle.refuse_connect(true);
    let job = auto_job(&[stroke(&[(0.0, 0.0), (10.0, 0.0)])]);
    let info = job.info.clone();

    let err = device.submit(job, false).await.unwrap_err();
    assert!(err.is_connection_error());
    assert_eq!(info.status(), JobStatus::Error);
    assert!(!device.is_busy());
}

#[tokio::test]
async fn test_jog_clips_absolute_moves() {
    let (device, handle) = hpgl_device(DeviceConfig::default());
    let mut events = device.subscribe();
    device.connect().await.unwrap();

    device.move_to([-5.0, 10.0, 0.0], true).await.unwrap();
    assert_eq!(device.position(), [0.0, 10.0, 0.0]);
    device.move_to([5.0, 5.0, 0.0], false).await.unwrap();
    assert_eq!(device.position(), [5.0, 15.0, 0.0]);
    device.disconnect().await.unwrap();

    assert_eq!(handle.written_string(), "IN;PU0,113;PU56,56;");
    assert!(!handle.is_connected());

    let mut positions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DeviceEvent::PositionChanged(p) = event {
            positions.push(p);
        }
    }
    assert_eq!(positions, vec![[0.0, 10.0, 0.0], [5.0, 15.0, 0.0]]);
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_job_lifecycle() {
    let (device, _handle) = hpgl_device(DeviceConfig::default());
    let mut events = device.subscribe();
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]);
    let id = job.id;
    device.submit(job, false).await.unwrap();

    let mut statuses = Vec::new();
    loop {
        match events.try_recv() {
            Ok(DeviceEvent::StatusChanged { job_id, status }) => {
                assert_eq!(job_id, id);
                statuses.push(status);
            }
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Empty) => break,
            Err(e) => panic!("{}", e),
        }
    }
    assert_eq!(
        statuses,
        vec![
            JobStatus::Waiting,
            JobStatus::Approved,
            JobStatus::Running,
            JobStatus::Complete
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_relative_config_tracks_real_position() {
    let (device, handle) = hpgl_device(DeviceConfig {
        absolute: false,
        ..Default::default()
    });
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0), (90.0, 9.0)])]).with_feed(true, 0.0);

    device.submit(job, false).await.unwrap();
    let output = handle.written_string();
    assert!(output.starts_with("IN;PU0,0;PD510,102;PD1021,102;"));
    assert!(output.ends_with("PU0,102;PU0,102;IN;"));
    assert_eq!(device.position(), [0.0, 9.0, 0.0]);
    assert_eq!(device.origin(), [0.0, 9.0, 0.0]);
}

#[tokio::test(start_paused = true)]
async fn test_test_mode_does_not_wait_for_acks() {
    let (device, handle) = acked_gcode_device();
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]);
    let info = job.info.clone();

    tokio::time::timeout(Duration::from_secs(60), device.submit(job, true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.status(), JobStatus::Complete);
    assert_eq!(handle.connect_count(), 0);
    assert_eq!(handle.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_ack() {
    let (device, handle) = acked_gcode_device();
    let job = auto_job(&[stroke(&[(0.0, 0.0), (45.0, 9.0)])]);
    let info = job.info.clone();

    let running = {
        let device = device.clone();
        tokio::spawn(async move { device.submit(job, false).await })
    };
    wait_for_writes(&handle, 1).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    // The firmware never answers the first line
    assert_eq!(handle.written_string(), "G28; Return to home\n");
    assert_eq!(info.status(), JobStatus::Running);

    info.cancel();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(info.status(), JobStatus::Cancelled);
    assert_eq!(handle.write_count(), 1);
    assert!(!handle.is_connected());
    assert!(!device.is_busy());
    assert_eq!(device.origin(), [0.0, 0.0, 0.0]);
}
