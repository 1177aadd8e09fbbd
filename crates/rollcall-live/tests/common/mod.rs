//! Test doubles shared by the live-screen integration tests.
//!
//! - [`ScriptedApi`]: an issuer whose poll answers and mark outcome are
//!   scripted up front, and which counts every call.
//! - [`ScriptedCodec`]: a decoder that finds a payload on the Nth frame.
//! - [`BlankCamera`]: a device that always shows a blank wall and counts
//!   start/stop calls.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use rollcall_client::{AttendanceApi, ClientError};
use rollcall_live::{Camera, CameraError, SharedCamera};
use rollcall_protocol::{
    ApiError, AttendanceRecord, AttendanceStatus, ClassId, Credential, ErrorKind,
    GenerateSession, MarkReceipt, MarkStatus, Session, SessionId, UserId,
};
use rollcall_qr::{Decoded, Frame, QrError, Symbol, SymbolCodec};

pub const T0: u64 = 1_700_000_000_000;
pub const CLASS: ClassId = ClassId(7);

pub fn session(id: &str, issued_at_ms: u64, expires_at_ms: u64) -> Session {
    Session {
        session_id: SessionId::new(id),
        class_id: CLASS,
        payload: id.to_owned(),
        issued_at_ms,
        expires_at_ms,
        lecture_timing: None,
    }
}

// =========================================================================
// ScriptedApi
// =========================================================================

/// One scripted answer to `active_session`.
pub enum PollStep {
    Respond(Option<Session>),
    /// Answer after a delay, to force out-of-order completion.
    RespondAfter(Duration, Option<Session>),
    Fail,
}

#[derive(Default)]
pub struct ScriptedApi {
    polls: Mutex<VecDeque<PollStep>>,
    /// Answer used once the script runs out.
    fallback: Mutex<Option<Session>>,
    poll_calls: AtomicUsize,
    mark_calls: AtomicUsize,
    mark_delay: Duration,
    mark_rejection: Option<ErrorKind>,
    watched_camera: Option<SharedCamera>,
    camera_busy_at_mark: AtomicBool,
    last_mark_at_ms: AtomicU64,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polls(self, steps: impl IntoIterator<Item = PollStep>) -> Self {
        self.polls.lock().unwrap().extend(steps);
        self
    }

    pub fn fallback(self, session: Option<Session>) -> Self {
        *self.fallback.lock().unwrap() = session;
        self
    }

    pub fn mark_delay(mut self, delay: Duration) -> Self {
        self.mark_delay = delay;
        self
    }

    pub fn reject_marks(mut self, kind: ErrorKind) -> Self {
        self.mark_rejection = Some(kind);
        self
    }

    /// Record whether this camera is held at the moment a mark arrives.
    pub fn watch_camera(mut self, camera: SharedCamera) -> Self {
        self.watched_camera = Some(camera);
        self
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }

    pub fn camera_busy_at_mark(&self) -> bool {
        self.camera_busy_at_mark.load(Ordering::SeqCst)
    }
}

impl AttendanceApi for ScriptedApi {
    async fn generate_session(
        &self,
        _credential: &Credential,
        _request: &GenerateSession,
    ) -> Result<Session, ClientError> {
        Err(ClientError::Rejected(ApiError::new(
            ErrorKind::InvalidRequest,
            "not scripted",
        )))
    }

    async fn active_session(
        &self,
        _credential: &Credential,
        _class_id: ClassId,
    ) -> Result<Option<Session>, ClientError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.polls.lock().unwrap().pop_front();
        match step {
            Some(PollStep::Respond(s)) => Ok(s),
            Some(PollStep::RespondAfter(delay, s)) => {
                tokio::time::sleep(delay).await;
                Ok(s)
            }
            Some(PollStep::Fail) => Err(ClientError::Transport("connection reset".into())),
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn mark_attendance(
        &self,
        _credential: &Credential,
        session_id: &SessionId,
    ) -> Result<MarkReceipt, ClientError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(camera) = &self.watched_camera {
            self.camera_busy_at_mark
                .store(camera.is_busy(), Ordering::SeqCst);
        }
        if !self.mark_delay.is_zero() {
            tokio::time::sleep(self.mark_delay).await;
        }
        if let Some(kind) = self.mark_rejection {
            return Err(ClientError::Rejected(ApiError::new(kind, "scripted")));
        }
        Ok(MarkReceipt {
            status: MarkStatus::Ok,
            message: "Attendance marked".into(),
            record: AttendanceRecord {
                student: UserId(42),
                session_id: session_id.clone(),
                class_id: CLASS,
                status: AttendanceStatus::Present,
                marked_at_ms: self.last_mark_at_ms.load(Ordering::SeqCst),
            },
        })
    }

    async fn attendance_history(
        &self,
        _credential: &Credential,
        _class_id: ClassId,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        Ok(Vec::new())
    }
}

// =========================================================================
// ScriptedCodec
// =========================================================================

/// Decodes `payload` on frame number `on_frame` (1-based), nothing before
/// or after. `on_frame == 0` never decodes.
pub struct ScriptedCodec {
    payload: String,
    on_frame: usize,
    frames_seen: AtomicUsize,
}

impl ScriptedCodec {
    pub fn decodes_on(on_frame: usize, payload: &str) -> Self {
        Self {
            payload: payload.to_owned(),
            on_frame,
            frames_seen: AtomicUsize::new(0),
        }
    }

    pub fn never() -> Self {
        Self::decodes_on(0, "")
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen.load(Ordering::SeqCst)
    }
}

impl SymbolCodec for ScriptedCodec {
    fn encode(&self, _payload: &str) -> Result<Symbol, QrError> {
        Err(QrError::EmptyPayload)
    }

    fn decode_frame(&self, _frame: &Frame) -> Decoded {
        let n = self.frames_seen.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.on_frame {
            Decoded::Payload(self.payload.clone())
        } else {
            Decoded::NotFound
        }
    }
}

// =========================================================================
// BlankCamera
// =========================================================================

#[derive(Default)]
pub struct CameraCounters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

pub struct BlankCamera {
    counters: Arc<CameraCounters>,
}

impl BlankCamera {
    pub fn shared() -> (SharedCamera, Arc<CameraCounters>) {
        let counters = Arc::new(CameraCounters::default());
        let camera = SharedCamera::new(BlankCamera {
            counters: Arc::clone(&counters),
        });
        (camera, counters)
    }
}

impl Camera for BlankCamera {
    fn start(&mut self) -> Result<(), CameraError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        Ok(Frame::blank(64, 48, 200))
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }
}
