//! Score controller
//!
//! A cloneable handle in front of a single owner task. The owner task holds
//! the detected-number store, the running total and the history log, and
//! applies commands strictly one at a time. Pass drivers post their
//! results to the same queue, tagged with the session they belong to;
//! results for a session that is no longer current are dropped.

use crate::pass::{run_pass, PassContext, PassEvent};
use crate::snapshot::{PassReport, SessionSnapshot};
use core_pipeline::capture::decode_capture;
use core_pipeline::{
    CaptureSource, DetectedNumberStore, HistoryEntry, HistoryLog, NumberId, PipelineConfig,
    PipelineError, RegionDetector, SessionId, SessionPhase, TextRecognizer, ToggleOutcome,
};
use image::DynamicImage;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Errors returned by controller commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// A newer capture or a reset replaced this pass before it finished
    #[error("Capture was superseded before it completed")]
    Superseded,

    /// The owner task is gone
    #[error("Score controller has shut down")]
    Closed,

    /// Toggle targeted a number that is not in the current session
    #[error("No detected number with id {0}")]
    UnknownNumber(NumberId),
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Detection and recognition capabilities used by every pass
#[derive(Clone)]
pub struct Backends {
    pub detector: Arc<dyn RegionDetector>,
    pub recognizer: Arc<dyn TextRecognizer>,
}

impl Backends {
    pub fn new(detector: Arc<dyn RegionDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            detector,
            recognizer,
        }
    }

    /// One backend serving both capabilities
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: RegionDetector + TextRecognizer + 'static,
    {
        Self {
            detector: backend.clone(),
            recognizer: backend,
        }
    }
}

pub(crate) enum Command {
    Capture {
        source: CaptureSource,
        image: Option<DynamicImage>,
        events: mpsc::UnboundedSender<Command>,
        reply: oneshot::Sender<Result<PassReport>>,
    },
    Toggle {
        id: NumberId,
        reply: oneshot::Sender<Result<ToggleOutcome>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Pass {
        session: SessionId,
        event: PassEvent,
    },
}

/// A capture that has been queued but not yet completed
pub struct PendingPass {
    reply: oneshot::Receiver<Result<PassReport>>,
}

impl PendingPass {
    /// Wait for the pass to finish
    pub async fn wait(self) -> Result<PassReport> {
        self.reply.await.unwrap_or(Err(ControllerError::Closed))
    }
}

/// Handle to the session owner task
#[derive(Clone)]
pub struct ScoreController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl ScoreController {
    /// Start the owner task on the current tokio runtime
    pub fn spawn(config: PipelineConfig, backends: Backends) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let owner = SessionOwner {
            history: HistoryLog::with_capacity(config.history_capacity),
            config: Arc::new(config),
            backends,
            session: None,
            source: CaptureSource::default(),
            phase: SessionPhase::Idle,
            store: DetectedNumberStore::new(),
            regions: 0,
            pending_reply: None,
            snapshots: snapshot_tx,
        };
        tokio::spawn(owner.run(command_rx));

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    /// Queue a capture without waiting for it
    ///
    /// `None` stands for a capture that produced no image data.
    pub fn begin_capture(
        &self,
        source: CaptureSource,
        image: Option<DynamicImage>,
    ) -> Result<PendingPass> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Capture {
                source,
                image,
                events: self.commands.clone(),
                reply,
            })
            .map_err(|_| ControllerError::Closed)?;
        Ok(PendingPass { reply: rx })
    }

    /// Run a full pass over a decoded image
    pub async fn capture(&self, source: CaptureSource, image: DynamicImage) -> Result<PassReport> {
        self.begin_capture(source, Some(image))?.wait().await
    }

    /// Run a full pass over encoded image bytes
    ///
    /// Undecodable data aborts the pass; the report comes back `Aborted`.
    pub async fn capture_bytes(&self, source: CaptureSource, bytes: &[u8]) -> Result<PassReport> {
        let image = match decode_capture(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!("Capture has no usable image: {}", e);
                None
            }
        };
        self.begin_capture(source, image)?.wait().await
    }

    /// Flip the selection of a detected number
    pub async fn toggle(&self, id: NumberId) -> Result<ToggleOutcome> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Toggle { id, reply })
            .map_err(|_| ControllerError::Closed)?;
        rx.await.unwrap_or(Err(ControllerError::Closed))
    }

    /// Clear detected numbers and the total; history is kept
    pub async fn reset(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Reset { reply })
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

struct SessionOwner {
    config: Arc<PipelineConfig>,
    backends: Backends,
    session: Option<SessionId>,
    source: CaptureSource,
    phase: SessionPhase,
    store: DetectedNumberStore,
    history: HistoryLog,
    /// Regions dispatched in the current pass
    regions: usize,
    pending_reply: Option<oneshot::Sender<Result<PassReport>>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionOwner {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Capture {
                    source,
                    image,
                    events,
                    reply,
                } => self.start_capture(source, image, events, reply),
                Command::Toggle { id, reply } => {
                    let _ = reply.send(self.toggle(id));
                }
                Command::Reset { reply } => {
                    self.reset();
                    let _ = reply.send(());
                }
                Command::Pass { session, event } => self.apply_pass_event(session, event),
            }
        }
        debug!("Score controller shutting down");
    }

    /// Start a new session, discarding the previous one's numbers
    fn start_capture(
        &mut self,
        source: CaptureSource,
        image: Option<DynamicImage>,
        events: mpsc::UnboundedSender<Command>,
        reply: oneshot::Sender<Result<PassReport>>,
    ) {
        self.supersede_pending();

        let session = SessionId::new();
        self.session = Some(session);
        self.source = source;
        self.store.reset();
        self.regions = 0;
        self.phase = SessionPhase::Capturing;
        info!("Capture {} from {:?}", session, source);

        let Some(image) = image else {
            warn!("Capture {} aborted: no image data", session);
            self.phase = SessionPhase::Aborted;
            self.publish();
            let _ = reply.send(Ok(self.report(session)));
            return;
        };

        self.pending_reply = Some(reply);
        self.publish();

        tokio::spawn(run_pass(PassContext {
            session,
            image: Arc::new(image),
            config: self.config.clone(),
            backends: self.backends.clone(),
            events,
        }));
    }

    fn toggle(&mut self, id: NumberId) -> Result<ToggleOutcome> {
        let outcome = self.store.toggle_selection(id).map_err(|e| match e {
            PipelineError::UnknownNumber(id) => ControllerError::UnknownNumber(id),
            other => {
                warn!("Unexpected toggle failure: {}", other);
                ControllerError::UnknownNumber(id)
            }
        })?;
        debug!(
            "Toggled {} -> selected={} total={}",
            id, outcome.is_selected, outcome.total
        );
        self.publish();
        Ok(outcome)
    }

    fn reset(&mut self) {
        self.supersede_pending();
        // In-flight results for the old session are now stale
        self.session = None;
        self.store.reset();
        self.regions = 0;
        self.phase = SessionPhase::Idle;
        self.publish();
    }

    fn apply_pass_event(&mut self, session: SessionId, event: PassEvent) {
        if self.session != Some(session) {
            debug!("Discarding stale result from session {}", session);
            return;
        }

        match event {
            PassEvent::Phase(phase) => {
                if let SessionPhase::ExtractingRegions { total, .. } = phase {
                    self.regions = total;
                }
                self.phase = phase;
            }
            PassEvent::RegionCompleted { index, number } => {
                if let Some(number) = number {
                    debug!("Detected {} ({}) in region {}", number.value, number.text, index);
                    self.store.insert_ranked(index, number);
                }
                if let SessionPhase::ExtractingRegions { total, pending } = self.phase {
                    self.phase = SessionPhase::ExtractingRegions {
                        total,
                        pending: pending.saturating_sub(1),
                    };
                }
            }
            PassEvent::Completed { image, regions } => {
                self.regions = regions;
                self.history.record(HistoryEntry::new(
                    image,
                    self.store.total(),
                    session,
                    self.source,
                    self.store.len(),
                ));
                self.phase = SessionPhase::Aggregated;
                info!(
                    "Session {} aggregated: {} numbers from {} regions, total {}",
                    session,
                    self.store.len(),
                    regions,
                    self.store.total()
                );
                // Observers must see the commit before the caller wakes up
                self.publish();
                if let Some(reply) = self.pending_reply.take() {
                    let _ = reply.send(Ok(self.report(session)));
                }
                return;
            }
        }

        self.publish();
    }

    fn supersede_pending(&mut self) {
        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(Err(ControllerError::Superseded));
        }
    }

    fn report(&self, session: SessionId) -> PassReport {
        PassReport {
            session,
            phase: self.phase,
            regions: self.regions,
            numbers: self.store.numbers().to_vec(),
            total: self.store.total(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot {
            session: self.session,
            source: self.source,
            phase: self.phase,
            numbers: self.store.numbers().to_vec(),
            total: self.store.total(),
            history: self.history.entries().cloned().collect(),
        });
    }
}
