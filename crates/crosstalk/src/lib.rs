//! # crosstalk - spoken dialog turn-taking
//!
//! Fuses a streaming speech-to-text source, a text-completion model and a
//! speech-synthesis engine into one append-only transcript shared by a human
//! and an agent, with barge-in when the human talks over the agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Session                              │
//! │  ┌───────────┐   ┌──────────┐   ┌────────────────────────────┐   │
//! │  │ ASR events│ → │ Remapper │ → │      TurnController        │   │
//! │  └───────────┘   └──────────┘   │ canonical / interim / cont │   │
//! │                                 └────────────────────────────┘   │
//! │        encode ↓    ↑ decode           ↓ start        ↑ end/cut   │
//! │  ┌─────────────────────────┐   ┌──────────────────────────────┐  │
//! │  │    Completion model     │   │ SynthesisDriver → Estimator  │  │
//! │  └─────────────────────────┘   └──────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod asr;
pub mod codec;
pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod estimator;
pub mod remap;
pub mod session;
pub mod synthesis;
pub mod word;

pub use asr::{AsrEvent, AsrSource, LiveOptions, PlaceholderAsr, TranscriptEvent};
pub use codec::{decode, encode, truncate, Decoded, DialogTurn, SpeakingHint, INTERRUPTION_MARKER};
pub use completion::{
    CompletionModel, CompletionRequest, OpenAiCompletion, PlaceholderCompletion,
};
pub use config::{BargeInPolicy, CompletionConfig, CrosstalkConfig};
pub use controller::{
    ContinuationStatus, ControllerSnapshot, Degradation, PendingCompletion, TurnController,
    TurnState,
};
pub use error::{CrosstalkError, CrosstalkResult};
pub use estimator::{estimate_duration, estimate_spoken_word_count};
pub use remap::{remap, RawWord};
pub use session::{Session, SessionInputs};
pub use synthesis::{
    PlaceholderSink, SinkEvent, SynthesisDriver, SynthesisEvent, SynthesisSink, UtteranceHandle,
};
pub use word::{SpeakerId, Transcript, WordToken};
