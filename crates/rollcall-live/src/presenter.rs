//! Live session presenter: an actor that keeps one class's session view
//! fresh.
//!
//! The actor owns two timer domains and a set of in-flight polls:
//!
//! - **poll** (`poll_interval`, default 5 s): starts a request for the
//!   class's active session. Each request runs as its own task in a
//!   `JoinSet`, so a slow response never blocks the loop. A request that
//!   outlives `request_timeout` counts as a failed poll, and a scheduled
//!   poll is skipped while another one is still out.
//! - **countdown** (1 s): re-derives `seconds_left` and performs the local
//!   `Active → Expired` transition. Paused unless a session is active.
//!
//! Every change is published on a `watch` channel. The teacher's screen
//! renders the QR symbol from it; the student's screen uses the same view
//! to answer "is there a live lecture?".

use std::sync::Arc;
use std::time::Duration;

use rollcall_client::{AttendanceApi, ClientError};
use rollcall_protocol::{ClassId, Credential, Session, SessionId};
use rollcall_qr::{Symbol, SymbolCodec};
use rollcall_tick::{SharedClock, SystemClock, TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};

use crate::{LiveConfig, Phase, PresenterError, SessionMachine, SessionView, Snapshot};

/// What subscribers see.
#[derive(Debug, Clone)]
pub struct PresenterView {
    pub class_id: ClassId,
    pub snapshot: Snapshot,
    /// The rendered symbol while a session is active, if the presenter was
    /// given a codec.
    pub symbol: Option<Arc<Symbol>>,
}

/// Commands sent to a presenter actor.
enum PresenterCommand {
    /// Poll now instead of waiting for the next tick.
    Refresh,
    /// Request the current view.
    GetView { reply: oneshot::Sender<PresenterView> },
    Shutdown,
}

/// Handle to a running presenter. Cheap to clone.
///
/// The actor stops when the last handle is dropped.
#[derive(Clone)]
pub struct PresenterHandle {
    class_id: ClassId,
    sender: mpsc::Sender<PresenterCommand>,
    view: watch::Receiver<PresenterView>,
}

impl PresenterHandle {
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Forces an immediate poll, e.g. right after the teacher regenerated.
    pub async fn refresh(&self) -> Result<(), PresenterError> {
        self.sender
            .send(PresenterCommand::Refresh)
            .await
            .map_err(|_| PresenterError::Unavailable(self.class_id))
    }

    /// The current view, as computed by the actor right now.
    pub async fn view(&self) -> Result<PresenterView, PresenterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(PresenterCommand::GetView { reply: reply_tx })
            .await
            .map_err(|_| PresenterError::Unavailable(self.class_id))?;
        reply_rx
            .await
            .map_err(|_| PresenterError::Unavailable(self.class_id))
    }

    /// Shorthand for `view().await?.snapshot`.
    pub async fn snapshot(&self) -> Result<Snapshot, PresenterError> {
        Ok(self.view().await?.snapshot)
    }

    /// A receiver that sees every published view.
    pub fn subscribe(&self) -> watch::Receiver<PresenterView> {
        self.view.clone()
    }

    pub async fn shutdown(&self) -> Result<(), PresenterError> {
        self.sender
            .send(PresenterCommand::Shutdown)
            .await
            .map_err(|_| PresenterError::Unavailable(self.class_id))
    }
}

/// Builder for a presenter actor.
///
/// ```rust,ignore
/// let handle = Presenter::new(api, credential, ClassId(7))
///     .config(LiveConfig::default())
///     .render_with(Arc::new(QrCodec::new()))
///     .spawn();
/// ```
pub struct Presenter<A: AttendanceApi> {
    api: Arc<A>,
    credential: Credential,
    class_id: ClassId,
    config: LiveConfig,
    clock: SharedClock,
    codec: Option<Arc<dyn SymbolCodec>>,
}

impl<A: AttendanceApi> Presenter<A> {
    pub fn new(api: Arc<A>, credential: Credential, class_id: ClassId) -> Self {
        Self {
            api,
            credential,
            class_id,
            config: LiveConfig::default(),
            clock: Arc::new(SystemClock),
            codec: None,
        }
    }

    pub fn config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// The clock used for countdowns and local expiry.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Render the active session's payload as a symbol (teacher screen).
    pub fn render_with(mut self, codec: Arc<dyn SymbolCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Spawns the actor task and returns its handle.
    pub fn spawn(self) -> PresenterHandle {
        let config = self.config.validated();
        let (tx, rx) = mpsc::channel(config.channel_size);

        let machine = SessionMachine::new(config.clear_after_failures);
        let initial = PresenterView {
            class_id: self.class_id,
            snapshot: machine.snapshot(self.clock.now_ms()),
            symbol: None,
        };
        let (view_tx, view_rx) = watch::channel(initial);

        let poll = TickScheduler::new(TickConfig {
            initial_jitter: config.poll_jitter,
            ..TickConfig::every("poll", config.poll_interval)
        });
        let mut countdown = TickScheduler::every("countdown", config.countdown_interval);
        countdown.pause();

        let actor = PresenterActor {
            class_id: self.class_id,
            api: self.api,
            credential: self.credential,
            clock: self.clock,
            codec: self.codec,
            request_timeout: config.request_timeout,
            machine,
            poll,
            countdown,
            polls: JoinSet::new(),
            rendered: None,
            receiver: rx,
            view_tx,
        };
        tokio::spawn(actor.run());

        PresenterHandle {
            class_id: self.class_id,
            sender: tx,
            view: view_rx,
        }
    }
}

type PollResult = (u64, Result<Option<Session>, ClientError>);

/// The internal presenter state. Runs inside a Tokio task.
struct PresenterActor<A: AttendanceApi> {
    class_id: ClassId,
    api: Arc<A>,
    credential: Credential,
    clock: SharedClock,
    codec: Option<Arc<dyn SymbolCodec>>,
    request_timeout: Duration,
    machine: SessionMachine,
    poll: TickScheduler,
    countdown: TickScheduler,
    polls: JoinSet<PollResult>,
    /// Symbol for the session currently shown, keyed by its id so it is
    /// rendered once per session rather than once per tick.
    rendered: Option<(SessionId, Arc<Symbol>)>,
    receiver: mpsc::Receiver<PresenterCommand>,
    view_tx: watch::Sender<PresenterView>,
}

impl<A: AttendanceApi> PresenterActor<A> {
    async fn run(mut self) {
        tracing::info!(class_id = %self.class_id, "presenter started");

        // Fetch on mount; scheduled polls follow one period later.
        self.start_poll();

        loop {
            // Biased: finished polls and timers are handled before commands,
            // so a `view()` request always sees work that was already due.
            tokio::select! {
                biased;

                Some(joined) = self.polls.join_next(), if !self.polls.is_empty() => {
                    self.finish_poll(joined);
                }
                _ = self.countdown.wait_for_tick() => {
                    self.machine.tick(self.clock.now_ms());
                    self.sync_countdown();
                    self.publish();
                    self.countdown.record_tick_end();
                }
                _ = self.poll.wait_for_tick() => {
                    if self.polls.is_empty() {
                        self.start_poll();
                    } else {
                        tracing::debug!(class_id = %self.class_id, "previous poll still out, skipping");
                    }
                    self.poll.record_tick_end();
                }
                cmd = self.receiver.recv() => match cmd {
                    Some(PresenterCommand::Refresh) => {
                        tracing::debug!(class_id = %self.class_id, "refresh requested");
                        // Whatever is still out is older than what we are about to ask.
                        self.polls.abort_all();
                        self.start_poll();
                    }
                    Some(PresenterCommand::GetView { reply }) => {
                        let _ = reply.send(self.view());
                    }
                    Some(PresenterCommand::Shutdown) | None => break,
                },
            }
        }

        tracing::info!(class_id = %self.class_id, "presenter stopped");
    }

    fn start_poll(&mut self) {
        let seq = self.machine.begin_poll();
        let api = Arc::clone(&self.api);
        let credential = self.credential.clone();
        let class_id = self.class_id;
        let limit = self.request_timeout;
        tracing::debug!(%class_id, seq, "polling active session");
        self.polls.spawn(async move {
            let result = tokio::time::timeout(limit, api.active_session(&credential, class_id))
                .await
                .unwrap_or_else(|_| {
                    Err(ClientError::Transport(format!(
                        "no answer within {} ms",
                        limit.as_millis()
                    )))
                });
            (seq, result)
        });
    }

    fn finish_poll(&mut self, joined: Result<PollResult, JoinError>) {
        let (seq, result) = match joined {
            Ok(done) => done,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                tracing::warn!(class_id = %self.class_id, error = %e, "poll task failed");
                return;
            }
        };

        let now = self.clock.now_ms();
        match result.map(|session| session.map(|s| s.validate().map(|()| s)).transpose()) {
            Ok(Ok(session)) => {
                self.machine.apply_response(seq, session, now);
            }
            Ok(Err(e)) => {
                tracing::warn!(class_id = %self.class_id, seq, error = %e, "issuer sent a malformed session");
                self.machine.apply_failure(seq, "The server sent an unusable session. Retrying.");
            }
            Err(e) => {
                tracing::warn!(class_id = %self.class_id, seq, error = %e, "poll failed");
                self.machine.apply_failure(seq, "Couldn't refresh the session. Retrying.");
            }
        }
        self.sync_countdown();
        self.publish();
    }

    /// Runs the countdown only while there is something to count down.
    fn sync_countdown(&mut self) {
        let active = matches!(
            self.machine.phase(),
            Phase::Ready(SessionView::Active { .. })
        );
        if active {
            self.countdown.resume();
        } else {
            self.countdown.pause();
        }
    }

    fn symbol(&mut self) -> Option<Arc<Symbol>> {
        let codec = self.codec.as_ref()?;
        let Phase::Ready(SessionView::Active {
            session_id,
            payload,
            ..
        }) = self.machine.phase()
        else {
            self.rendered = None;
            return None;
        };

        if let Some((id, symbol)) = &self.rendered {
            if id == session_id {
                return Some(Arc::clone(symbol));
            }
        }

        match codec.encode(payload) {
            Ok(symbol) => {
                let symbol = Arc::new(symbol);
                self.rendered = Some((session_id.clone(), Arc::clone(&symbol)));
                Some(symbol)
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "could not render session symbol");
                None
            }
        }
    }

    fn view(&mut self) -> PresenterView {
        PresenterView {
            class_id: self.class_id,
            snapshot: self.machine.snapshot(self.clock.now_ms()),
            symbol: self.symbol(),
        }
    }

    fn publish(&mut self) {
        let view = self.view();
        self.view_tx.send_replace(view);
    }
}
