//! Conversion between the word-level [`Transcript`] and flat dialog text.
//!
//! Dialog text is what the completion model reads and writes:
//!
//! ```text
//!
//! Speaker0: Hello, how can I help you?
//! Speaker1: I need a table for two
//! ```

use crate::word::{SpeakerId, Transcript, WordToken};
use serde::{Deserialize, Serialize};

/// Prefix of every speaker tag token.
pub const TAG_PREFIX: &str = "Speaker";

/// Appended to an utterance that was cut off by barge-in.
pub const INTERRUPTION_MARKER: &str = "—";

/// Whether a decoded agent turn may be handed to synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingHint {
    Speak,
    Silent,
}

/// Result of [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub transcript: Transcript,
    /// Text opened with the agent tag and the hint allowed speaking.
    pub should_speak: bool,
    /// Agent words following the leading tag, up to the next tag.
    pub speak_text: String,
}

/// A run of consecutive words from one speaker, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub speaker: SpeakerId,
    pub text: String,
}

/// `SpeakerN:` for the given role.
pub fn speaker_tag(speaker: SpeakerId) -> String {
    format!("{}{}:", TAG_PREFIX, speaker.label())
}

/// Stop sequences that halt the model before it writes the human's next turn.
pub fn stop_sequences() -> Vec<String> {
    let human = SpeakerId::Human.label();
    vec![
        format!("\n{}{}:", TAG_PREFIX, human),
        format!("\n{}{}:", TAG_PREFIX, human + 1),
    ]
}

/// Render a transcript as dialog text.
///
/// A `\nSpeakerN: ` line starts only when the speaker changes; words within a
/// run are joined by single spaces. An empty transcript renders as `""`.
pub fn encode(transcript: &Transcript) -> String {
    let mut out = String::new();
    let mut previous: Option<SpeakerId> = None;
    for word in transcript.words() {
        if previous != Some(word.speaker) {
            out.push('\n');
            out.push_str(&speaker_tag(word.speaker));
            out.push(' ');
            previous = Some(word.speaker);
        } else {
            out.push(' ');
        }
        out.push_str(&word.text);
    }
    out
}

/// Parse a `SpeakerN` tag token. Anything else is a word.
fn parse_tag(token: &str) -> Option<SpeakerId> {
    let rest = token.strip_prefix(TAG_PREFIX)?;
    let digit = rest.chars().next()?.to_digit(10)?;
    Some(SpeakerId::from_label(i64::from(digit)))
}

/// Parse dialog text back into a transcript.
///
/// Words before the first tag belong to `default_speaker`; callers pass the
/// speaker of the last canonical word, or [`SpeakerId::Agent`] when there is
/// none. Repeated whitespace is tolerated.
pub fn decode(text: &str, hint: SpeakingHint, default_speaker: SpeakerId) -> Decoded {
    let text = text.trim();
    let agent_tag = speaker_tag(SpeakerId::Agent);
    let should_speak = hint != SpeakingHint::Silent && text.starts_with(&agent_tag);

    let mut current = default_speaker;
    let mut words = Vec::new();
    for token in text.split_whitespace() {
        match parse_tag(token) {
            Some(speaker) => current = speaker,
            None => words.push(WordToken::new(token, current)),
        }
    }

    let speak_text = if should_speak {
        text.split_whitespace()
            .skip(1)
            .take_while(|token| parse_tag(token).is_none())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        String::new()
    };

    Decoded {
        transcript: Transcript::from_words(words),
        should_speak,
        speak_text,
    }
}

/// First `word_count` words of `text` followed by [`INTERRUPTION_MARKER`].
pub fn truncate(text: &str, word_count: usize) -> String {
    let mut out = text
        .split_whitespace()
        .take(word_count)
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(INTERRUPTION_MARKER);
    out
}

/// Group consecutive same-speaker words into display turns.
pub fn dialog_turns(transcript: &Transcript) -> Vec<DialogTurn> {
    let mut turns: Vec<DialogTurn> = Vec::new();
    for word in transcript.words() {
        match turns.last_mut() {
            Some(turn) if turn.speaker == word.speaker => {
                turn.text.push(' ');
                turn.text.push_str(&word.text);
            }
            _ => turns.push(DialogTurn {
                speaker: word.speaker,
                text: word.text.clone(),
            }),
        }
    }
    turns
}
