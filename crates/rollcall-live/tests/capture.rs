//! Integration tests for the scan capture loop and the attendance marker.
//!
//! The loop is driven with scripted decoders and a blank camera, so each
//! test controls exactly which frame (if any) yields a payload. Time is
//! tokio's paused clock; sampling runs every 900 ms.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{BlankCamera, ScriptedApi, ScriptedCodec};
use rollcall_live::{
    AttendanceMarker, CameraError, CaptureError, CaptureLoop, CaptureState, LiveConfig, MarkError,
    Severity, SharedCamera,
};
use rollcall_protocol::{Credential, ErrorKind, SessionId};

const SID: &str = "9f86d081884c7d659a2feaa0c55ad015";

fn marker(api: &Arc<ScriptedApi>) -> AttendanceMarker<ScriptedApi> {
    AttendanceMarker::new(Arc::clone(api), Credential::new("student"))
}

fn spawn(
    camera: &SharedCamera,
    codec: ScriptedCodec,
    api: &Arc<ScriptedApi>,
) -> (rollcall_live::CaptureHandle, Arc<ScriptedCodec>) {
    let codec = Arc::new(codec);
    let handle = CaptureLoop::new(camera.clone(), codec.clone(), marker(api)).spawn();
    (handle, codec)
}

// =========================================================================
// Sampling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_fifth_frame_decodes_exactly_one_mark() {
    let (camera, counters) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().watch_camera(camera.clone()));
    let (handle, codec) = spawn(&camera, ScriptedCodec::decodes_on(5, SID), &api);
    let mut rx = handle.subscribe();

    handle.start().await.expect("camera is free");
    rx.wait_for(|s| s.state == CaptureState::Matched)
        .await
        .unwrap();

    assert_eq!(api.mark_calls(), 1);
    assert!(
        !api.camera_busy_at_mark(),
        "camera must be released before the mark is sent"
    );
    assert_eq!(codec.frames_seen(), 5);

    // Sampling has stopped: more time passes, nothing else happens.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.frames_sampled, 5);
    assert_eq!(status.marks_submitted, 1);
    assert_eq!(api.mark_calls(), 1);
    assert_eq!(status.notice.unwrap().severity, Severity::Success);
    assert_eq!(status.last_record.unwrap().session_id, SessionId::new(SID));
    assert!(!camera.is_busy());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_never_found_keeps_sampling_without_marks() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, codec) = spawn(&camera, ScriptedCodec::never(), &api);

    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(9_050)).await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, CaptureState::Scanning);
    // First frame at start, then one every 900 ms.
    assert_eq!(status.frames_sampled, 11);
    assert_eq!(codec.frames_seen(), 11);
    assert_eq!(api.mark_calls(), 0);
    assert!(camera.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_garbage_payload_refused_locally() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, _codec) = spawn(&camera, ScriptedCodec::decodes_on(1, "not a session id"), &api);
    let mut rx = handle.subscribe();

    handle.start().await.unwrap();
    let status = rx
        .wait_for(|s| s.notice.is_some())
        .await
        .unwrap()
        .clone();

    assert_eq!(status.state, CaptureState::Idle);
    assert_eq!(status.notice.unwrap().message, "Invalid QR code, try again.");
    assert_eq!(api.mark_calls(), 0);
    assert!(!camera.is_busy());
}

// =========================================================================
// start / stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_idempotent() {
    let (camera, counters) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    handle.start().await.unwrap();
    handle.start().await.unwrap();

    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_releases_camera_and_is_idempotent() {
    let (camera, counters) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, codec) = spawn(&camera, ScriptedCodec::never(), &api);

    handle.start().await.unwrap();
    handle.stop().await.unwrap();
    handle.stop().await.unwrap();

    assert!(!camera.is_busy());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(handle.status().await.unwrap().state, CaptureState::Idle);

    let frames = codec.frames_seen();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(codec.frames_seen(), frames, "no sampling after stop");
}

#[tokio::test(start_paused = true)]
async fn test_two_loops_never_share_the_camera() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (first, _) = spawn(&camera, ScriptedCodec::never(), &api);
    let (second, _) = spawn(&camera, ScriptedCodec::never(), &api);

    first.start().await.unwrap();
    assert_eq!(
        second.start().await,
        Err(CaptureError::Camera(CameraError::Busy))
    );
    assert_eq!(second.status().await.unwrap().state, CaptureState::Idle);

    first.stop().await.unwrap();
    second.start().await.expect("camera freed by first loop");
    assert_eq!(second.status().await.unwrap().state, CaptureState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_releases_camera() {
    let (camera, counters) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    handle.start().await.unwrap();
    assert!(camera.is_busy());

    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!camera.is_busy());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_after_match_scans_again() {
    let (camera, counters) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, _codec) = spawn(&camera, ScriptedCodec::decodes_on(1, SID), &api);
    let mut rx = handle.subscribe();

    handle.start().await.unwrap();
    rx.wait_for(|s| s.state == CaptureState::Matched).await.unwrap();

    handle.start().await.unwrap();
    assert_eq!(handle.status().await.unwrap().state, CaptureState::Scanning);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
}

// =========================================================================
// simulate / in-flight gate
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_simulate_marks_through_same_path() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    let receipt = handle.simulate(SID).await.expect("mark accepted");

    assert_eq!(receipt.record.session_id, SessionId::new(SID));
    assert_eq!(api.mark_calls(), 1);
    assert_eq!(handle.status().await.unwrap().state, CaptureState::Matched);
}

#[tokio::test(start_paused = true)]
async fn test_simulate_while_scanning_releases_camera() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().watch_camera(camera.clone()));
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    handle.start().await.unwrap();
    handle.simulate(SID).await.unwrap();

    assert!(!api.camera_busy_at_mark());
    assert!(!camera.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_simulate_during_submit_is_in_flight() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().mark_delay(Duration::from_secs(2)));
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.simulate(SID).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handle.simulate(SID).await, Err(CaptureError::InFlight));
    assert_eq!(handle.start().await, Err(CaptureError::InFlight));

    first.await.unwrap().expect("first mark completes");
    assert_eq!(api.mark_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_mark_times_out_and_loop_recovers() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().mark_delay(Duration::from_secs(86_400)));
    let (handle, _codec) = spawn(&camera, ScriptedCodec::decodes_on(1, SID), &api);
    let mut rx = handle.subscribe();

    handle.start().await.unwrap();
    let started = tokio::time::Instant::now();
    let status = rx
        .wait_for(|s| s.state == CaptureState::Idle && s.notice.is_some())
        .await
        .unwrap()
        .clone();

    assert!(started.elapsed() <= Duration::from_secs(11));
    assert_eq!(status.notice.unwrap().severity, Severity::Error);
    assert_eq!(api.mark_calls(), 1);

    // The user can try again.
    handle.start().await.expect("loop is usable after the timeout");
    assert_eq!(handle.status().await.unwrap().state, CaptureState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_simulate_unanswered_mark_is_transport_error() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().mark_delay(Duration::from_secs(86_400)));
    let handle = CaptureLoop::new(
        camera.clone(),
        Arc::new(ScriptedCodec::never()),
        marker(&api),
    )
    .config(LiveConfig {
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .spawn();

    let started = tokio::time::Instant::now();
    let err = handle.simulate(SID).await.unwrap_err();

    assert!(matches!(err, CaptureError::Mark(MarkError::Transport(_))));
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(handle.simulate(SID).await.unwrap_err(), err, "second try is sent, not InFlight");
    assert_eq!(api.mark_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_simulate_rejection_surfaces_as_notice() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new().reject_marks(ErrorKind::AlreadyMarked));
    let (handle, _codec) = spawn(&camera, ScriptedCodec::never(), &api);

    let err = handle.simulate(SID).await.unwrap_err();
    assert_eq!(err, CaptureError::Mark(MarkError::AlreadyMarked));

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, CaptureState::Idle);
    assert_eq!(status.notice.unwrap().severity, Severity::Info);
}

#[tokio::test(start_paused = true)]
async fn test_marker_second_concurrent_mark_is_in_flight() {
    let api = Arc::new(ScriptedApi::new().mark_delay(Duration::from_secs(1)));
    let marker = marker(&api);
    let sid = SessionId::new(SID);

    let pending = {
        let marker = marker.clone();
        let sid = sid.clone();
        tokio::spawn(async move { marker.mark(&sid).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(marker.is_in_flight());

    assert_eq!(marker.mark(&sid).await.unwrap_err(), MarkError::InFlight);
    pending.await.unwrap().unwrap();

    assert!(!marker.is_in_flight());
    assert_eq!(api.mark_calls(), 1);
    // The gate reopens once the first call is done.
    marker.mark(&sid).await.unwrap();
    assert_eq!(api.mark_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_marker_expired_session_no_retry() {
    let api = Arc::new(ScriptedApi::new().reject_marks(ErrorKind::SessionExpired));
    let err = marker(&api)
        .mark(&SessionId::new(SID))
        .await
        .unwrap_err();
    assert_eq!(err, MarkError::SessionExpired);
    assert_eq!(api.mark_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_marker_mark_payload_rejects_non_ids() {
    let api = Arc::new(ScriptedApi::new());
    let err = marker(&api).mark_payload("   ").await.unwrap_err();
    assert_eq!(err, MarkError::SessionNotFound);
    assert_eq!(api.mark_calls(), 0);
}

// =========================================================================
// Runtime
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scans_and_marks_on_multi_thread_runtime() {
    let (camera, _) = BlankCamera::shared();
    let api = Arc::new(ScriptedApi::new());
    let handle = CaptureLoop::new(
        camera.clone(),
        Arc::new(ScriptedCodec::decodes_on(2, SID)),
        marker(&api),
    )
    .config(LiveConfig {
        sample_period: Duration::from_millis(100),
        ..Default::default()
    })
    .spawn();
    let mut rx = handle.subscribe();

    handle.start().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.state == CaptureState::Matched),
    )
    .await
    .expect("matched well within five seconds")
    .unwrap();
    assert_eq!(api.mark_calls(), 1);
}
