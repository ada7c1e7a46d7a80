//! **Streaming ASR**: Events from the speech-to-text provider and the audio path back to it.
//!
//! The network transport lives outside this crate. A transport implements
//! [`AsrSource`] for the outbound audio and feeds [`AsrEvent`]s into the session;
//! [`TranscriptEvent::from_provider_json`] turns a provider `Results` payload into
//! the event model.

use crate::error::{CrosstalkError, CrosstalkResult};
use crate::remap::RawWord;
use serde::{Deserialize, Serialize};

/// Lifecycle and recognition events from the ASR stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AsrEvent {
    /// Stream is ready; audio may be sent.
    Open,
    Transcript(TranscriptEvent),
    /// Transport failure. Logged, session continues.
    Error(String),
    /// Provider closed the stream.
    Close,
}

/// One recognition result: interim (replaceable) or final.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub is_final: bool,
    pub words: Vec<RawWord>,
}

impl TranscriptEvent {
    pub fn interim(words: Vec<RawWord>) -> Self {
        Self {
            is_final: false,
            words,
        }
    }

    pub fn final_result(words: Vec<RawWord>) -> Self {
        Self {
            is_final: true,
            words,
        }
    }

    /// Parse a live-transcription message.
    ///
    /// Returns `Ok(None)` for message types that carry no words (metadata,
    /// utterance-end, speech-started). Results missing `is_final`, `channel` or
    /// an alternative are [`CrosstalkError::MalformedEvent`].
    pub fn from_provider_json(payload: &str) -> CrosstalkResult<Option<Self>> {
        let message: ProviderMessage = serde_json::from_str(payload)
            .map_err(|e| CrosstalkError::MalformedEvent(e.to_string()))?;

        if let Some(kind) = message.kind.as_deref() {
            if kind != "Results" {
                return Ok(None);
            }
        }

        let is_final = message
            .is_final
            .ok_or_else(|| CrosstalkError::MalformedEvent("missing is_final".to_string()))?;
        let channel = message
            .channel
            .ok_or_else(|| CrosstalkError::MalformedEvent("missing channel".to_string()))?;
        let alternative = channel
            .alternatives
            .into_iter()
            .next()
            .ok_or_else(|| CrosstalkError::MalformedEvent("no alternatives".to_string()))?;

        let words = alternative
            .words
            .into_iter()
            .map(|w| RawWord {
                text: w.punctuated_word.unwrap_or(w.word),
                speaker: w.speaker,
                confidence: w.confidence,
            })
            .collect();

        Ok(Some(Self { is_final, words }))
    }
}

#[derive(Deserialize)]
struct ProviderMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    is_final: Option<bool>,
    channel: Option<ProviderChannel>,
}

#[derive(Deserialize)]
struct ProviderChannel {
    alternatives: Vec<ProviderAlternative>,
}

#[derive(Deserialize)]
struct ProviderAlternative {
    #[serde(default)]
    words: Vec<ProviderWord>,
}

#[derive(Deserialize)]
struct ProviderWord {
    word: String,
    punctuated_word: Option<String>,
    speaker: Option<i64>,
    confidence: Option<f32>,
}

/// Live-transcription request options.
///
/// Diarization is less reliable with interim results enabled; interim results
/// make barge-in responsive. Both default on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveOptions {
    pub model: String,
    pub diarize: bool,
    pub punctuate: bool,
    pub smart_format: bool,
    pub filler_words: bool,
    pub endpointing: bool,
    pub multichannel: bool,
    pub alternatives: u32,
    pub interim_results: bool,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            model: "nova-2-general".to_string(),
            diarize: true,
            punctuate: true,
            smart_format: true,
            filler_words: true,
            endpointing: true,
            multichannel: false,
            alternatives: 1,
            interim_results: true,
        }
    }
}

impl LiveOptions {
    /// Query parameters for the provider's websocket URL.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model", self.model.clone()),
            ("diarize", self.diarize.to_string()),
            ("punctuate", self.punctuate.to_string()),
            ("smart_format", self.smart_format.to_string()),
            ("filler_words", self.filler_words.to_string()),
            ("endpointing", self.endpointing.to_string()),
            ("multichannel", self.multichannel.to_string()),
            ("alternatives", self.alternatives.to_string()),
            ("interim_results", self.interim_results.to_string()),
        ]
    }
}

/// Outbound side of the ASR transport.
pub trait AsrSource: Send + Sync {
    /// Send one encoded audio chunk. Only called after [`AsrEvent::Open`].
    fn send_audio_chunk(&self, chunk: &[u8]) -> CrosstalkResult<()>;

    /// Ask the provider to flush and close the stream.
    fn finish(&self);
}

/// Placeholder ASR sink: discards audio. Use when events are scripted.
#[derive(Debug, Default)]
pub struct PlaceholderAsr;

impl AsrSource for PlaceholderAsr {
    fn send_audio_chunk(&self, _chunk: &[u8]) -> CrosstalkResult<()> {
        Ok(())
    }

    fn finish(&self) {}
}
