//! **Session**: Run the controller against live collaborators on one task.
//!
//! ASR events, engine callbacks, microphone chunks and completion results are
//! multiplexed with `select!`; each is applied to the controller in arrival
//! order and a fresh snapshot is published afterwards. Completion requests run
//! on spawned tasks bounded by the configured timeout and report back through
//! a channel, so the controller itself is never shared.

use crate::asr::{AsrEvent, AsrSource};
use crate::completion::CompletionModel;
use crate::controller::{ControllerSnapshot, PendingCompletion, TurnController};
use crate::error::{CrosstalkError, CrosstalkResult};
use crate::synthesis::SinkEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Event sources consumed by [`Session::run`].
pub struct SessionInputs {
    /// Ends the session when every sender is dropped.
    pub asr_events: mpsc::Receiver<AsrEvent>,
    pub sink_events: mpsc::UnboundedReceiver<SinkEvent>,
    /// Encoded microphone chunks, forwarded to the ASR source while it is open.
    pub audio: mpsc::Receiver<Vec<u8>>,
}

/// Owns the controller for the lifetime of one conversation.
pub struct Session {
    controller: TurnController,
    asr: Box<dyn AsrSource>,
    model: Arc<dyn CompletionModel>,
    completion_timeout: Duration,
    snapshots: watch::Sender<ControllerSnapshot>,
}

impl Session {
    /// Returns the session and a receiver of controller snapshots for the presentation layer.
    pub fn new(
        controller: TurnController,
        asr: Box<dyn AsrSource>,
        model: Arc<dyn CompletionModel>,
    ) -> (Self, watch::Receiver<ControllerSnapshot>) {
        let completion_timeout = controller.config().completion.timeout();
        let (snapshots, rx) = watch::channel(controller.snapshot());
        (
            Self {
                controller,
                asr,
                model,
                completion_timeout,
                snapshots,
            },
            rx,
        )
    }

    /// Drive the conversation until the ASR event channel closes.
    /// Returns the controller so callers can read the final transcript.
    pub async fn run(mut self, inputs: SessionInputs) -> CrosstalkResult<TurnController> {
        let SessionInputs {
            mut asr_events,
            mut sink_events,
            mut audio,
        } = inputs;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, CrosstalkResult<String>)>();
        let mut sink_open = true;
        let mut audio_open = true;

        info!("Session: running");
        loop {
            enum Event {
                Asr(AsrEvent),
                AsrEnded,
                Sink(SinkEvent),
                Audio(Vec<u8>),
                Completion(u64, CrosstalkResult<String>),
            }

            let event = tokio::select! {
                event = asr_events.recv() => match event {
                    Some(e) => Event::Asr(e),
                    None => Event::AsrEnded,
                },
                event = sink_events.recv(), if sink_open => match event {
                    Some(e) => Event::Sink(e),
                    None => {
                        sink_open = false;
                        continue;
                    }
                },
                chunk = audio.recv(), if audio_open => match chunk {
                    Some(c) => Event::Audio(c),
                    None => {
                        audio_open = false;
                        continue;
                    }
                },
                Some((id, result)) = done_rx.recv() => Event::Completion(id, result),
            };

            match event {
                Event::Asr(AsrEvent::Close) => {
                    self.controller.on_asr_close();
                    self.asr.finish();
                }
                Event::Asr(e) => {
                    if let Some(pending) = self.controller.handle_asr_event(e) {
                        self.request_completion(pending, done_tx.clone());
                    }
                }
                Event::AsrEnded => break,
                Event::Sink(e) => self.controller.on_synthesis_event(e),
                Event::Audio(chunk) => {
                    self.forward_audio(&chunk);
                    continue;
                }
                Event::Completion(id, result) => self.controller.on_completion(id, result),
            }

            self.snapshots.send_replace(self.controller.snapshot());
        }

        info!("Session: ASR channel ended, stopping");
        Ok(self.controller)
    }

    fn forward_audio(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        if !self.controller.is_asr_open() {
            debug!("Session: dropping {} audio bytes, ASR not open", chunk.len());
            return;
        }
        if let Err(e) = self.asr.send_audio_chunk(chunk) {
            warn!("Session: audio send failed: {}", e);
        }
    }

    fn request_completion(
        &self,
        pending: PendingCompletion,
        done_tx: mpsc::UnboundedSender<(u64, CrosstalkResult<String>)>,
    ) {
        let model = Arc::clone(&self.model);
        let timeout = self.completion_timeout;
        debug!("Session: requesting completion {}", pending.id);
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, model.complete(&pending.request)).await {
                Ok(result) => result,
                Err(_) => Err(CrosstalkError::CompletionTimeout(timeout.as_millis() as u64)),
            };
            if done_tx.send((pending.id, result)).is_err() {
                debug!("Session: completion {} finished after shutdown", pending.id);
            }
        });
    }
}
