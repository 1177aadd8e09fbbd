//! Scan capture loop: camera frames in, one attendance mark out.
//!
//! ```text
//!         start()                 decoded              mark ok
//! Idle ───────────→ Scanning ───────────→ Submitting ─────────→ Matched
//!  ▲                   │                      │
//!  └──── stop() ───────┘                      └── mark failed ──→ Idle
//! ```
//!
//! On a decode the loop stops sampling and drops the camera lease *before*
//! the mark is sent, in the same step. A second decode can therefore never
//! race the first, and the camera is free while the network is busy.
//!
//! A mark that gets no answer within `request_timeout` fails with
//! [`MarkError::Transport`] and the loop returns to `Idle`.
//!
//! # Runtime
//!
//! Frames are decoded on the actor's own task, synchronously. Run the loop
//! on a multi-threaded runtime when frames come from a real camera: on a
//! `current_thread` runtime every decode holds up the other actors' timers
//! for its whole duration. [`CaptureLoop::spawn`] logs a warning when it
//! finds itself on one.

use std::sync::Arc;
use std::time::Duration;

use rollcall_client::AttendanceApi;
use rollcall_protocol::{AttendanceRecord, MarkReceipt, SessionId};
use rollcall_qr::{Decoded, SymbolCodec};
use rollcall_tick::{TickConfig, TickScheduler};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};

use crate::{
    AttendanceMarker, CameraLease, CaptureError, LiveConfig, MarkError, Notice, SharedCamera,
};

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Scanning,
    /// A mark is in flight.
    Submitting,
    /// The last mark succeeded. `start()` scans again.
    Matched,
}

/// Render model for the scanner screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureStatus {
    pub state: CaptureState,
    /// Frames grabbed since the loop was spawned.
    pub frames_sampled: u64,
    /// Marks handed to the marker since the loop was spawned.
    pub marks_submitted: u64,
    /// Result of the last mark, ready to show.
    pub notice: Option<Notice>,
    pub last_record: Option<AttendanceRecord>,
}

impl CaptureStatus {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            frames_sampled: 0,
            marks_submitted: 0,
            notice: None,
            last_record: None,
        }
    }
}

type MarkReply = oneshot::Sender<Result<MarkReceipt, CaptureError>>;

/// Commands sent to a capture actor.
enum CaptureCommand {
    Start {
        reply: oneshot::Sender<Result<(), CaptureError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    /// Submit a payload as if it had been decoded (dev path, no camera).
    Simulate { payload: String, reply: MarkReply },
    GetStatus {
        reply: oneshot::Sender<CaptureStatus>,
    },
    Shutdown,
}

/// Handle to a running capture loop. Cheap to clone.
///
/// Dropping the last handle stops the loop and releases the camera.
#[derive(Clone)]
pub struct CaptureHandle {
    sender: mpsc::Sender<CaptureCommand>,
    status: watch::Receiver<CaptureStatus>,
}

impl CaptureHandle {
    /// Acquires the camera and starts sampling. No-op while scanning.
    ///
    /// # Errors
    /// - [`CaptureError::Camera`] if the camera is busy or refuses to start
    /// - [`CaptureError::InFlight`] while a mark is being submitted
    pub async fn start(&self) -> Result<(), CaptureError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(CaptureCommand::Start { reply: reply_tx })
            .await
            .map_err(|_| CaptureError::Unavailable)?;
        reply_rx.await.map_err(|_| CaptureError::Unavailable)?
    }

    /// Stops sampling and releases the camera. Idempotent.
    pub async fn stop(&self) -> Result<(), CaptureError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(CaptureCommand::Stop { reply: reply_tx })
            .await
            .map_err(|_| CaptureError::Unavailable)?;
        reply_rx.await.map_err(|_| CaptureError::Unavailable)
    }

    /// Submits `payload` through the same gate and marker a decoded frame
    /// would use, and waits for the result.
    pub async fn simulate(&self, payload: impl Into<String>) -> Result<MarkReceipt, CaptureError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(CaptureCommand::Simulate {
                payload: payload.into(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| CaptureError::Unavailable)?;
        reply_rx.await.map_err(|_| CaptureError::Unavailable)?
    }

    pub async fn status(&self) -> Result<CaptureStatus, CaptureError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(CaptureCommand::GetStatus { reply: reply_tx })
            .await
            .map_err(|_| CaptureError::Unavailable)?;
        reply_rx.await.map_err(|_| CaptureError::Unavailable)
    }

    /// A receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<CaptureStatus> {
        self.status.clone()
    }

    pub async fn shutdown(&self) -> Result<(), CaptureError> {
        self.sender
            .send(CaptureCommand::Shutdown)
            .await
            .map_err(|_| CaptureError::Unavailable)
    }
}

/// Builder for a capture loop actor.
pub struct CaptureLoop<A: AttendanceApi> {
    camera: SharedCamera,
    codec: Arc<dyn SymbolCodec>,
    marker: AttendanceMarker<A>,
    config: LiveConfig,
}

impl<A: AttendanceApi> CaptureLoop<A> {
    pub fn new(camera: SharedCamera, codec: Arc<dyn SymbolCodec>, marker: AttendanceMarker<A>) -> Self {
        Self {
            camera,
            codec,
            marker,
            config: LiveConfig::default(),
        }
    }

    pub fn config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawns the actor task in `Idle` and returns its handle.
    pub fn spawn(self) -> CaptureHandle {
        if Handle::current().runtime_flavor() == RuntimeFlavor::CurrentThread {
            tracing::warn!("capture loop on a current-thread runtime, frame decoding will stall other tasks");
        }
        let config = self.config.validated();
        let (tx, rx) = mpsc::channel(config.channel_size);
        let (status_tx, status_rx) = watch::channel(CaptureStatus::new());

        // Decoding a frame should take well under the sampling period; the
        // scheduler warns when it does not.
        let mut sampler = TickScheduler::new(TickConfig::every("sampling", config.sample_period));
        sampler.pause();

        let actor = CaptureActor {
            camera: self.camera,
            codec: self.codec,
            marker: self.marker,
            request_timeout: config.request_timeout,
            sampler,
            lease: None,
            status: CaptureStatus::new(),
            marks: JoinSet::new(),
            pending_reply: None,
            receiver: rx,
            status_tx,
        };
        tokio::spawn(actor.run());

        CaptureHandle {
            sender: tx,
            status: status_rx,
        }
    }
}

/// The internal capture state. Runs inside a Tokio task.
struct CaptureActor<A: AttendanceApi> {
    camera: SharedCamera,
    codec: Arc<dyn SymbolCodec>,
    marker: AttendanceMarker<A>,
    request_timeout: Duration,
    sampler: TickScheduler,
    /// `Some` exactly while scanning.
    lease: Option<CameraLease>,
    status: CaptureStatus,
    /// Holds at most one mark (the state gate guarantees it).
    marks: JoinSet<Result<MarkReceipt, MarkError>>,
    /// Who to answer when the in-flight mark came from `simulate()`.
    pending_reply: Option<MarkReply>,
    receiver: mpsc::Receiver<CaptureCommand>,
    status_tx: watch::Sender<CaptureStatus>,
}

impl<A: AttendanceApi> CaptureActor<A> {
    async fn run(mut self) {
        tracing::debug!("capture loop spawned");

        loop {
            tokio::select! {
                biased;

                Some(joined) = self.marks.join_next(), if !self.marks.is_empty() => {
                    self.finish_mark(joined);
                }
                _ = self.sampler.wait_for_tick() => {
                    self.sample();
                    self.sampler.record_tick_end();
                }
                cmd = self.receiver.recv() => match cmd {
                    Some(CaptureCommand::Start { reply }) => {
                        let _ = reply.send(self.start());
                    }
                    Some(CaptureCommand::Stop { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                    }
                    Some(CaptureCommand::Simulate { payload, reply }) => {
                        self.simulate(payload, reply);
                    }
                    Some(CaptureCommand::GetStatus { reply }) => {
                        let _ = reply.send(self.status.clone());
                    }
                    Some(CaptureCommand::Shutdown) | None => break,
                },
            }
        }

        self.release_camera();
        tracing::debug!("capture loop stopped");
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        match self.status.state {
            CaptureState::Scanning => return Ok(()),
            CaptureState::Submitting => return Err(CaptureError::InFlight),
            CaptureState::Idle | CaptureState::Matched => {}
        }

        let lease = self.camera.acquire().map_err(|e| {
            tracing::warn!(error = %e, "camera unavailable, offer manual entry");
            e
        })?;
        self.lease = Some(lease);
        self.sampler.resume();
        self.sampler.fire_now();

        self.status.state = CaptureState::Scanning;
        self.status.notice = None;
        self.publish();
        tracing::info!("scanning started");
        Ok(())
    }

    fn stop(&mut self) {
        let was_scanning = self.lease.is_some();
        self.release_camera();
        if self.status.state == CaptureState::Scanning {
            self.status.state = CaptureState::Idle;
            self.publish();
        }
        if was_scanning {
            tracing::info!("scanning stopped");
        }
    }

    fn simulate(&mut self, payload: String, reply: MarkReply) {
        if self.status.state == CaptureState::Submitting {
            let _ = reply.send(Err(CaptureError::InFlight));
            return;
        }
        self.pending_reply = Some(reply);
        self.submit(payload);
    }

    /// One sampling tick: grab a frame and try to decode it.
    fn sample(&mut self) {
        let Some(lease) = self.lease.as_mut() else {
            return;
        };
        self.status.frames_sampled += 1;

        let decoded = match lease.capture() {
            Ok(frame) => self.codec.decode_frame(&frame),
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed, skipping");
                Decoded::NotFound
            }
        };

        match decoded {
            Decoded::NotFound => {
                tracing::trace!(frame = self.status.frames_sampled, "no symbol in frame");
                self.publish();
            }
            Decoded::Payload(payload) => {
                tracing::debug!(frame = self.status.frames_sampled, "symbol decoded");
                self.submit(payload);
            }
        }
    }

    /// Stops sampling, frees the camera, then sends exactly one mark.
    fn submit(&mut self, payload: String) {
        self.release_camera();
        self.status.state = CaptureState::Submitting;
        self.status.marks_submitted += 1;

        let Some(session_id) = SessionId::from_payload(&payload) else {
            tracing::debug!(len = payload.len(), "decoded text is not a session id");
            self.complete(Err(MarkError::SessionNotFound));
            return;
        };

        self.publish();
        let marker = self.marker.clone();
        let limit = self.request_timeout;
        self.marks.spawn(async move {
            // Dropping the mark future on timeout also releases the
            // marker's in-flight flag.
            tokio::time::timeout(limit, marker.mark(&session_id))
                .await
                .unwrap_or_else(|_| {
                    tracing::warn!(%session_id, "mark got no answer in time");
                    Err(MarkError::Transport(
                        "The server did not answer. Try again.".into(),
                    ))
                })
        });
    }

    fn finish_mark(&mut self, joined: Result<Result<MarkReceipt, MarkError>, JoinError>) {
        let result = joined.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "mark task failed");
            Err(MarkError::Transport("mark was interrupted".into()))
        });
        self.complete(result);
    }

    fn complete(&mut self, result: Result<MarkReceipt, MarkError>) {
        self.status.notice = Some(Notice::from_result(&result));
        match &result {
            Ok(receipt) => {
                self.status.state = CaptureState::Matched;
                self.status.last_record = Some(receipt.record.clone());
            }
            Err(_) => self.status.state = CaptureState::Idle,
        }
        self.publish();

        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(result.map_err(CaptureError::from));
        }
    }

    fn release_camera(&mut self) {
        self.sampler.pause();
        self.lease = None;
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status.clone());
    }
}
