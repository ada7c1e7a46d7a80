//! Turn-taking controller: the single owner of conversation state.
//!
//! ```text
//! Idle ─open─► Listening ─final─► AwaitingCompletion ─agent reply─► Speaking
//!                 ▲  ▲                    │                           │
//!                 │  └──── failure / ─────┘                           │
//!                 │       human reply                                 │
//!                 └──────────── natural end / barge-in ───────────────┘
//! ```
//!
//! Every mutation of the canonical transcript, the interim fragment and the
//! continuation goes through `&mut self` here. Readers get owned copies.

use crate::asr::{AsrEvent, TranscriptEvent};
use crate::codec::{self, DialogTurn, SpeakingHint};
use crate::completion::CompletionRequest;
use crate::config::CrosstalkConfig;
use crate::error::{CrosstalkError, CrosstalkResult};
use crate::estimator;
use crate::remap::{self, RawWord};
use crate::synthesis::{SinkEvent, SynthesisDriver, SynthesisEvent, SynthesisSink};
use crate::word::{SpeakerId, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Where the conversation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// ASR stream not yet open.
    Idle,
    Listening,
    /// A human turn was finalized; waiting on the completion model.
    AwaitingCompletion,
    /// An agent utterance is playing.
    Speaking,
}

/// How the presentation layer should label the continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationStatus {
    /// Being spoken now.
    Speaking,
    /// Predicted, not spoken (the model expects the human to keep talking).
    Predicting,
}

/// A capability the host lacks. Reported, never silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Degradation {
    /// No speech synthesis: agent turns are recorded as text only.
    SynthesisUnavailable,
    /// No microphone or capture device.
    CaptureUnavailable { reason: String },
}

/// A completion the session must request on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCompletion {
    /// Hand back to [`TurnController::on_completion`]; responses for older ids are dropped.
    pub id: u64,
    pub request: CompletionRequest,
}

/// Owned copy of everything a presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub state: TurnState,
    pub canonical: Transcript,
    pub interim: Option<Transcript>,
    pub continuation: Option<Transcript>,
    pub continuation_status: Option<ContinuationStatus>,
    pub degradations: Vec<Degradation>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl ControllerSnapshot {
    /// Canonical transcript grouped into display turns.
    pub fn dialog(&self) -> Vec<DialogTurn> {
        codec::dialog_turns(&self.canonical)
    }
}

/// The turn-taking state machine.
pub struct TurnController {
    config: CrosstalkConfig,
    state: TurnState,
    canonical: Transcript,
    interim: Option<Transcript>,
    continuation: Option<Transcript>,
    driver: SynthesisDriver,
    next_request: u64,
    awaited_request: Option<u64>,
    asr_open: bool,
    version: u64,
    updated_at: DateTime<Utc>,
    degradations: Vec<Degradation>,
}

impl TurnController {
    pub fn new(config: CrosstalkConfig, sink: Box<dyn SynthesisSink>) -> Self {
        Self {
            config,
            state: TurnState::Idle,
            canonical: Transcript::new(),
            interim: None,
            continuation: None,
            driver: SynthesisDriver::new(sink),
            next_request: 1,
            awaited_request: None,
            asr_open: false,
            version: 0,
            updated_at: Utc::now(),
            degradations: Vec::new(),
        }
    }

    // ── ASR ──────────────────────────────────────────────────────────────────

    /// Dispatch one ASR event. Returns a completion to request, if any.
    pub fn handle_asr_event(&mut self, event: AsrEvent) -> Option<PendingCompletion> {
        match event {
            AsrEvent::Open => {
                self.on_open();
                None
            }
            AsrEvent::Transcript(TranscriptEvent { is_final, words }) => {
                if is_final {
                    self.on_final_result(&words)
                } else {
                    self.on_interim_result(&words);
                    None
                }
            }
            AsrEvent::Error(message) => {
                self.on_asr_error(&message);
                None
            }
            AsrEvent::Close => {
                self.on_asr_close();
                None
            }
        }
    }

    /// ASR stream is ready: greet without a completion round trip.
    pub fn on_open(&mut self) {
        info!("Controller: ASR stream open");
        self.asr_open = true;
        if self.state == TurnState::Idle {
            self.state = TurnState::Listening;
        }
        let greeting = self.config.greeting.clone();
        self.continuation = Some(Transcript::from_text(&greeting, SpeakerId::Agent));
        self.speak(&greeting);
        self.touch();
    }

    /// Replace the interim fragment. Barges in on the agent per the configured policy.
    pub fn on_interim_result(&mut self, words: &[RawWord]) {
        if words.is_empty() {
            return;
        }
        self.barge_in(words);
        let remapped = remap::remap(words, self.config.flip_speakers);
        self.interim = Some(Transcript::from_words(remapped));
        self.touch();
    }

    /// Merge a final result into the canonical transcript and ask for a continuation.
    pub fn on_final_result(&mut self, words: &[RawWord]) -> Option<PendingCompletion> {
        if words.is_empty() {
            return None;
        }
        self.barge_in(words);

        let remapped = remap::remap(words, self.config.flip_speakers);
        debug!("Controller: final result, {} words", remapped.len());
        self.interim = None;
        self.canonical.extend(Transcript::from_words(remapped));

        let id = self.next_request;
        self.next_request += 1;
        self.awaited_request = Some(id);
        if self.state != TurnState::Speaking {
            self.state = TurnState::AwaitingCompletion;
        }
        self.touch();

        Some(PendingCompletion {
            id,
            request: CompletionRequest::for_transcript(
                &self.canonical,
                self.config.completion.max_tokens,
            ),
        })
    }

    pub fn on_asr_error(&mut self, message: &str) {
        warn!("Controller: ASR transport error: {}", message);
    }

    /// The provider closed the stream. Audio forwarding stops; the controller keeps running.
    pub fn on_asr_close(&mut self) {
        info!("Controller: ASR stream closed");
        self.asr_open = false;
        self.touch();
    }

    /// The host has no capture device.
    pub fn on_capture_unavailable(&mut self, reason: impl Into<String>) {
        let degradation = Degradation::CaptureUnavailable {
            reason: reason.into(),
        };
        warn!("Controller: {:?}", degradation);
        self.record_degradation(degradation);
    }

    // ── Completion ───────────────────────────────────────────────────────────

    /// Result of the completion requested as `id`.
    ///
    /// Responses superseded by a newer final result are dropped. A failure
    /// leaves the canonical transcript as it was and returns to listening.
    pub fn on_completion(&mut self, id: u64, result: CrosstalkResult<String>) {
        if self.awaited_request != Some(id) {
            debug!("Controller: dropping stale completion {}", id);
            return;
        }
        self.awaited_request = None;

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                if e.is_transport() {
                    warn!("Controller: completion {} transport failure: {}", id, e);
                } else {
                    error!("Controller: completion {} failed: {}", id, e);
                }
                self.continuation = None;
                self.settle();
                self.touch();
                return;
            }
        };

        let default_speaker = self.canonical.last_speaker().unwrap_or(SpeakerId::Agent);
        let decoded = codec::decode(&text, SpeakingHint::Speak, default_speaker);
        if decoded.transcript.is_empty() {
            debug!("Controller: completion {} was empty", id);
            self.continuation = None;
            self.settle();
            self.touch();
            return;
        }

        self.continuation = Some(decoded.transcript);
        if decoded.should_speak && !decoded.speak_text.is_empty() {
            self.speak(&decoded.speak_text);
        } else {
            debug!("Controller: completion {} predicts the human, not speaking", id);
            self.settle();
        }
        self.touch();
    }

    // ── Synthesis ────────────────────────────────────────────────────────────

    /// Feed a callback from the speech engine.
    pub fn on_synthesis_event(&mut self, event: SinkEvent) {
        self.driver.handle_sink_event(event);
        self.process_synthesis_events();
    }

    /// Cancel the active utterance, if any, and record what was heard.
    pub fn interrupt(&mut self) {
        if let Some(elapsed) = self.driver.cancel_active() {
            info!("Controller: barge-in after {:.2}", elapsed);
        }
        self.process_synthesis_events();
    }

    fn barge_in(&mut self, words: &[RawWord]) {
        if self.is_agent_speaking() && self.config.barge_in.should_interrupt(words) {
            self.interrupt();
        }
    }

    /// Start `text`, replacing anything still playing. The continuation already
    /// set for `text` survives the replaced utterance's cleanup.
    fn speak(&mut self, text: &str) {
        if self.driver.is_speaking() {
            let continuation = self.continuation.take();
            self.interrupt();
            self.continuation = continuation;
        }
        match self.driver.start(text) {
            Ok(handle) => {
                debug!("Controller: speaking [{}]", handle.id());
                self.state = TurnState::Speaking;
            }
            Err(e) => {
                warn!("Controller: synthesis unavailable, recording text only: {}", e);
                if matches!(e, CrosstalkError::UnsupportedEnvironment(_)) {
                    self.record_degradation(Degradation::SynthesisUnavailable);
                }
                self.append_agent(text);
                self.continuation = None;
                self.settle();
            }
        }
        self.process_synthesis_events();
    }

    fn process_synthesis_events(&mut self) {
        for event in self.driver.drain_events() {
            match event {
                SynthesisEvent::Started { handle } => {
                    debug!("Controller: utterance [{}] playing", handle.id());
                }
                SynthesisEvent::Ended { text, .. } => {
                    self.append_agent(&text);
                    self.finish_utterance();
                }
                SynthesisEvent::Interrupted { text, elapsed, .. } => {
                    self.record_truncated(&text, elapsed);
                    self.finish_utterance();
                }
                SynthesisEvent::Error {
                    text,
                    elapsed,
                    message,
                    ..
                } => {
                    warn!("Controller: synthesis error: {}", message);
                    self.record_truncated(&text, elapsed);
                    self.finish_utterance();
                }
            }
        }
    }

    fn record_truncated(&mut self, text: &str, elapsed: f64) {
        let spoken = estimator::estimate_spoken_word_count(text, elapsed);
        debug!(
            "Controller: {} of {} words heard",
            spoken,
            text.split_whitespace().count()
        );
        self.append_agent(&codec::truncate(text, spoken));
    }

    fn append_agent(&mut self, text: &str) {
        let decoded = codec::decode(text, SpeakingHint::Silent, SpeakerId::Agent);
        self.canonical.extend(decoded.transcript);
        self.touch();
    }

    fn finish_utterance(&mut self) {
        if !self.driver.is_speaking() {
            self.continuation = None;
            self.settle();
        }
    }

    /// Pick the resting state once nothing is playing.
    fn settle(&mut self) {
        if self.driver.is_speaking() {
            self.state = TurnState::Speaking;
        } else if self.awaited_request.is_some() {
            self.state = TurnState::AwaitingCompletion;
        } else if self.state != TurnState::Idle {
            self.state = TurnState::Listening;
        }
    }

    fn record_degradation(&mut self, degradation: Degradation) {
        if !self.degradations.contains(&degradation) {
            self.degradations.push(degradation);
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    // ── Read accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_agent_speaking(&self) -> bool {
        self.state == TurnState::Speaking
    }

    pub fn is_asr_open(&self) -> bool {
        self.asr_open
    }

    pub fn canonical_transcript(&self) -> Transcript {
        self.canonical.clone()
    }

    pub fn interim_transcript(&self) -> Option<Transcript> {
        self.interim.clone()
    }

    pub fn continuation(&self) -> Option<Transcript> {
        self.continuation.clone()
    }

    pub fn continuation_status(&self) -> Option<ContinuationStatus> {
        self.continuation.as_ref().map(|_| {
            if self.is_agent_speaking() {
                ContinuationStatus::Speaking
            } else {
                ContinuationStatus::Predicting
            }
        })
    }

    pub fn degradations(&self) -> Vec<Degradation> {
        self.degradations.clone()
    }

    /// Bumped on every observable change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &CrosstalkConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state,
            canonical: self.canonical.clone(),
            interim: self.interim.clone(),
            continuation: self.continuation.clone(),
            continuation_status: self.continuation_status(),
            degradations: self.degradations.clone(),
            version: self.version,
            updated_at: self.updated_at,
        }
    }
}
