//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use crosstalk::{
    AsrSource, CompletionModel, CompletionRequest, CrosstalkConfig, CrosstalkResult, RawWord,
    SynthesisSink, TurnController, UtteranceHandle,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct SinkLog {
    pub spoken: Vec<(UtteranceHandle, String)>,
    pub cancelled: Vec<UtteranceHandle>,
}

/// Engine that records calls and reports a fixed elapsed time on cancel.
pub struct RecordingSink {
    pub log: Arc<Mutex<SinkLog>>,
    pub elapsed: Option<f64>,
    pub available: bool,
}

impl RecordingSink {
    pub fn new(elapsed: Option<f64>) -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                elapsed,
                available: true,
            },
            log,
        )
    }
}

impl SynthesisSink for RecordingSink {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, handle: UtteranceHandle, text: &str) -> CrosstalkResult<()> {
        self.log.lock().unwrap().spoken.push((handle, text.to_string()));
        Ok(())
    }

    fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64> {
        self.log.lock().unwrap().cancelled.push(handle);
        self.elapsed
    }
}

/// ASR outbound side that records forwarded audio.
#[derive(Default)]
pub struct RecordingAsr {
    pub chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    pub finished: Arc<Mutex<bool>>,
}

impl AsrSource for RecordingAsr {
    fn send_audio_chunk(&self, chunk: &[u8]) -> CrosstalkResult<()> {
        self.chunks.lock().unwrap().push(chunk.to_vec());
        Ok(())
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() = true;
    }
}

/// Completion model answering from a fixed script, optionally after a delay.
pub struct ScriptedCompletion {
    pub replies: Mutex<Vec<CrosstalkResult<String>>>,
    pub delay: Duration,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<CrosstalkResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            delay: Duration::ZERO,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl CompletionModel for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> CrosstalkResult<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Config with the natural label polarity so tests read 1 as the human.
pub fn unflipped() -> CrosstalkConfig {
    CrosstalkConfig {
        flip_speakers: false,
        ..Default::default()
    }
}

pub fn controller_with(elapsed: Option<f64>) -> (TurnController, Arc<Mutex<SinkLog>>) {
    let (sink, log) = RecordingSink::new(elapsed);
    (TurnController::new(unflipped(), Box::new(sink)), log)
}

pub fn human(text: &str) -> Vec<RawWord> {
    text.split_whitespace().map(|w| RawWord::new(w, 1)).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
