//! Scripted dialog: drives a session with canned ASR events.
//!
//! The completion model is the OpenAI-compatible backend when
//! `OPENAI_API_KEY` (or `CROSSTALK__COMPLETION__API_KEY`) is set, else a
//! placeholder that always answers the same line. Speech is simulated: each
//! utterance "plays" for its estimated duration.
//!
//! ```text
//! RUST_LOG=crosstalk=debug cargo run -p crosstalk --example scripted_dialog
//! ```

use crosstalk::{
    estimate_duration, AsrEvent, CompletionModel, CrosstalkConfig, CrosstalkResult,
    OpenAiCompletion, PlaceholderAsr, PlaceholderCompletion, RawWord, Session, SessionInputs,
    SinkEvent, SynthesisSink, TranscriptEvent, TurnController, UtteranceHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pretends to speak by reporting `Finished` after the estimated duration.
struct SimulatedVoice {
    events: mpsc::UnboundedSender<SinkEvent>,
}

impl SynthesisSink for SimulatedVoice {
    fn speak(&mut self, handle: UtteranceHandle, text: &str) -> CrosstalkResult<()> {
        let events = self.events.clone();
        let duration = Duration::from_secs_f64(estimate_duration(text));
        info!("Agent says: {}", text);
        tokio::spawn(async move {
            let _ = events.send(SinkEvent::Started(handle));
            tokio::time::sleep(duration).await;
            let _ = events.send(SinkEvent::Finished(handle));
        });
        Ok(())
    }

    fn cancel(&mut self, handle: UtteranceHandle) -> Option<f64> {
        info!("Agent cut off [{}]", handle.id());
        None
    }
}

fn words(label: i64, text: &str) -> Vec<RawWord> {
    text.split_whitespace().map(|w| RawWord::new(w, label)).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CrosstalkConfig::load()?;
    let model: Arc<dyn CompletionModel> = match OpenAiCompletion::from_config(&config.completion) {
        Ok(m) => {
            info!("Using completion model {}", config.completion.model);
            Arc::new(m)
        }
        Err(e) => {
            info!("Using placeholder completion: {}", e);
            Arc::new(PlaceholderCompletion::with_response(
                "\nSpeaker0: Sure, what time works for you?",
            ))
        }
    };

    // The provider labels the caller 0; with flipping on that becomes the human.
    let human_label = if config.flip_speakers { 0 } else { 1 };

    let (sink_tx, sink_events) = mpsc::unbounded_channel();
    let (asr_tx, asr_events) = mpsc::channel(32);
    let (_audio_tx, audio) = mpsc::channel(32);

    let controller = TurnController::new(config, Box::new(SimulatedVoice { events: sink_tx }));
    let (session, mut snapshots) = Session::new(controller, Box::new(PlaceholderAsr), model);
    let running = tokio::spawn(session.run(SessionInputs {
        asr_events,
        sink_events,
        audio,
    }));

    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            info!(state = ?snapshot.state, version = snapshot.version, "snapshot");
        }
    });

    let script = vec![
        (0, AsrEvent::Open),
        (
            700,
            AsrEvent::Transcript(TranscriptEvent::interim(words(human_label, "I'd like"))),
        ),
        (
            300,
            AsrEvent::Transcript(TranscriptEvent::final_result(words(
                human_label,
                "I'd like to book a table",
            ))),
        ),
        (
            4000,
            AsrEvent::Transcript(TranscriptEvent::final_result(words(
                human_label,
                "seven thirty please",
            ))),
        ),
        (4000, AsrEvent::Close),
    ];
    for (delay_ms, event) in script {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        asr_tx.send(event).await?;
    }
    drop(asr_tx);

    let controller = running.await??;
    printer.abort();

    for turn in controller.snapshot().dialog() {
        println!("{:?}: {}", turn.speaker, turn.text);
    }
    Ok(())
}
