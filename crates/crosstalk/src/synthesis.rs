//! **Synthesis driver**: One utterance at a time over an external speech engine.
//!
//! The engine implements [`SynthesisSink`] and reports progress as
//! [`SinkEvent`]s. The driver turns those into a closed set of
//! [`SynthesisEvent`]s, queued until the controller drains them. Starting a new
//! utterance cancels the active one first, so two utterances never overlap.

use crate::error::{CrosstalkError, CrosstalkResult};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Identifies one utterance handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceHandle(u64);

impl UtteranceHandle {
    /// Rebuild a handle from an id an engine stored.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Callbacks from the speech engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Audio for the utterance began playing.
    Started(UtteranceHandle),
    /// Played to the end.
    Finished(UtteranceHandle),
    /// Engine gave up partway.
    Failed {
        handle: UtteranceHandle,
        message: String,
    },
}

/// Lifecycle events consumed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    Started {
        handle: UtteranceHandle,
    },
    /// Spoken in full.
    Ended {
        handle: UtteranceHandle,
        text: String,
    },
    /// Cancelled. `text` is the full utterance; `elapsed` is engine-reported
    /// (seconds or milliseconds) or measured by the driver in seconds.
    Interrupted {
        handle: UtteranceHandle,
        text: String,
        elapsed: f64,
    },
    /// Engine failure mid-utterance; `elapsed` as for `Interrupted`.
    Error {
        handle: UtteranceHandle,
        text: String,
        elapsed: f64,
        message: String,
    },
}

/// External speech engine. Implement for a platform TTS or a remote voice API.
pub trait SynthesisSink: Send {
    /// False when the host has no synthesis capability.
    fn is_available(&self) -> bool {
        true
    }

    /// Begin speaking `text`. Progress arrives later as [`SinkEvent`]s.
    fn speak(&mut self, handle: UtteranceHandle, text: &str) -> CrosstalkResult<()>;

    /// Stop speaking immediately. Return the engine's elapsed time if it reports one.
    fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64>;
}

/// Placeholder sink: logs utterances and never finishes them on its own.
#[derive(Debug)]
pub struct PlaceholderSink {
    available: bool,
}

impl Default for PlaceholderSink {
    fn default() -> Self {
        Self { available: true }
    }
}

impl PlaceholderSink {
    /// A sink on a host without synthesis.
    pub fn unavailable() -> Self {
        Self { available: false }
    }
}

impl SynthesisSink for PlaceholderSink {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, handle: UtteranceHandle, text: &str) -> CrosstalkResult<()> {
        info!("PlaceholderSink: [{}] {}", handle.id(), text);
        Ok(())
    }

    fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64> {
        info!("PlaceholderSink: cancel [{}]", handle.id());
        None
    }
}

struct ActiveUtterance {
    handle: UtteranceHandle,
    text: String,
    clock: Instant,
    started: bool,
}

/// Wraps a [`SynthesisSink`], guaranteeing at most one active utterance.
pub struct SynthesisDriver {
    sink: Box<dyn SynthesisSink>,
    active: Option<ActiveUtterance>,
    next_id: u64,
    events: VecDeque<SynthesisEvent>,
}

impl SynthesisDriver {
    pub fn new(sink: Box<dyn SynthesisSink>) -> Self {
        Self {
            sink,
            active: None,
            next_id: 1,
            events: VecDeque::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_available()
    }

    /// Speak `text`, cancelling any active utterance first.
    pub fn start(&mut self, text: &str) -> CrosstalkResult<UtteranceHandle> {
        if !self.sink.is_available() {
            return Err(CrosstalkError::UnsupportedEnvironment(
                "speech synthesis is not available".to_string(),
            ));
        }
        if let Some(previous) = self.active.as_ref().map(|a| a.handle) {
            warn!("Synthesis: start while [{}] active, cancelling it", previous.id());
            self.cancel(previous);
        }

        let handle = UtteranceHandle(self.next_id);
        self.next_id += 1;
        self.sink.speak(handle, text)?;
        debug!("Synthesis: started [{}]", handle.id());
        self.active = Some(ActiveUtterance {
            handle,
            text: text.to_string(),
            clock: Instant::now(),
            started: false,
        });
        Ok(handle)
    }

    /// Cancel `handle` if it is the active utterance and return its elapsed time.
    ///
    /// Cancelling anything else, including an already cancelled utterance, is
    /// a no-op returning `None`.
    pub fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64> {
        let active = match self.active.take() {
            Some(a) if a.handle == handle => a,
            other => {
                self.active = other;
                debug!("Synthesis: cancel of inactive [{}] ignored", handle.id());
                return None;
            }
        };
        let elapsed = self
            .sink
            .cancel(handle)
            .unwrap_or_else(|| active.clock.elapsed().as_secs_f64());
        info!("Synthesis: interrupted [{}] after {:.2}", handle.id(), elapsed);
        self.events.push_back(SynthesisEvent::Interrupted {
            handle,
            text: active.text,
            elapsed,
        });
        Some(elapsed)
    }

    /// Cancel whatever is playing.
    pub fn cancel_active(&mut self) -> Option<f64> {
        let handle = self.active.as_ref()?.handle;
        self.cancel(handle)
    }

    /// Feed an engine callback. Callbacks for utterances no longer active are dropped.
    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        let handle = match &event {
            SinkEvent::Started(h) | SinkEvent::Finished(h) => *h,
            SinkEvent::Failed { handle, .. } => *handle,
        };
        if self.active_handle() != Some(handle) {
            debug!("Synthesis: stale engine event for [{}]: {:?}", handle.id(), event);
            return;
        }

        match event {
            SinkEvent::Started(_) => {
                if let Some(active) = self.active.as_mut() {
                    if !active.started {
                        active.started = true;
                        active.clock = Instant::now();
                        self.events.push_back(SynthesisEvent::Started { handle });
                    }
                }
            }
            SinkEvent::Finished(_) => {
                if let Some(active) = self.active.take() {
                    debug!("Synthesis: finished [{}]", handle.id());
                    self.events.push_back(SynthesisEvent::Ended {
                        handle,
                        text: active.text,
                    });
                }
            }
            SinkEvent::Failed { message, .. } => {
                if let Some(active) = self.active.take() {
                    warn!("Synthesis: [{}] failed: {}", handle.id(), message);
                    self.events.push_back(SynthesisEvent::Error {
                        handle,
                        text: active.text,
                        elapsed: active.clock.elapsed().as_secs_f64(),
                        message,
                    });
                }
            }
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_handle(&self) -> Option<UtteranceHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    /// Take all queued lifecycle events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SynthesisEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        spoken: Vec<String>,
        cancelled: Vec<UtteranceHandle>,
    }

    struct RecordingSink {
        calls: Arc<Mutex<Calls>>,
        elapsed: Option<f64>,
    }

    impl SynthesisSink for RecordingSink {
        fn speak(&mut self, _handle: UtteranceHandle, text: &str) -> CrosstalkResult<()> {
            self.calls.lock().unwrap().spoken.push(text.to_string());
            Ok(())
        }

        fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64> {
            self.calls.lock().unwrap().cancelled.push(handle);
            self.elapsed
        }
    }

    fn driver(elapsed: Option<f64>) -> (SynthesisDriver, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let sink = RecordingSink {
            calls: Arc::clone(&calls),
            elapsed,
        };
        (SynthesisDriver::new(Box::new(sink)), calls)
    }

    #[test]
    fn natural_end_reports_full_text() {
        let (mut d, _) = driver(None);
        let h = d.start("hello there").unwrap();
        d.handle_sink_event(SinkEvent::Started(h));
        d.handle_sink_event(SinkEvent::Finished(h));
        assert!(!d.is_speaking());
        assert_eq!(
            d.drain_events(),
            vec![
                SynthesisEvent::Started { handle: h },
                SynthesisEvent::Ended {
                    handle: h,
                    text: "hello there".to_string()
                },
            ]
        );
    }

    #[test]
    fn cancel_reports_engine_elapsed_once() {
        let (mut d, calls) = driver(Some(1.25));
        let h = d.start("one two three").unwrap();
        assert_eq!(d.cancel(h), Some(1.25));
        assert_eq!(d.cancel(h), None);
        assert_eq!(calls.lock().unwrap().cancelled.len(), 1);
        assert_eq!(
            d.drain_events(),
            vec![SynthesisEvent::Interrupted {
                handle: h,
                text: "one two three".to_string(),
                elapsed: 1.25
            }]
        );
    }

    #[test]
    fn start_cancels_previous_utterance() {
        let (mut d, calls) = driver(Some(0.5));
        let first = d.start("first").unwrap();
        let second = d.start("second").unwrap();
        assert_ne!(first, second);
        assert_eq!(d.active_handle(), Some(second));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.cancelled, vec![first]);
        assert_eq!(calls.spoken, vec!["first", "second"]);
        drop(calls);
        assert!(matches!(
            d.drain_events().as_slice(),
            [SynthesisEvent::Interrupted { handle, .. }] if *handle == first
        ));
    }

    #[test]
    fn stale_engine_events_are_ignored() {
        let (mut d, _) = driver(None);
        let h = d.start("words").unwrap();
        d.cancel(h);
        d.drain_events();
        d.handle_sink_event(SinkEvent::Finished(h));
        assert!(d.drain_events().is_empty());
    }

    #[test]
    fn failure_reports_measured_elapsed() {
        let (mut d, _) = driver(None);
        let h = d.start("a b c").unwrap();
        d.handle_sink_event(SinkEvent::Failed {
            handle: h,
            message: "device lost".to_string(),
        });
        match d.drain_events().as_slice() {
            [SynthesisEvent::Error { text, elapsed, .. }] => {
                assert_eq!(text, "a b c");
                assert!(*elapsed >= 0.0);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn unavailable_sink_is_reported() {
        let mut d = SynthesisDriver::new(Box::new(PlaceholderSink::unavailable()));
        assert!(!d.is_available());
        assert!(matches!(
            d.start("hi"),
            Err(CrosstalkError::UnsupportedEnvironment(_))
        ));
        assert!(!d.is_speaking());
    }
}
