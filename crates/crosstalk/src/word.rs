//! Word-level transcript model shared by every other module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two logical roles in a conversation.
///
/// The integer encoding matches the `SpeakerN` tag used in dialog text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerId {
    Agent = 0,
    Human = 1,
}

impl SpeakerId {
    /// Integer used in the `SpeakerN:` tag.
    pub fn label(self) -> u8 {
        self as u8
    }

    /// Map a tag digit back to a role. Digits other than 0 and 1 are humans.
    pub fn from_label(label: i64) -> Self {
        if label == 0 {
            SpeakerId::Agent
        } else {
            SpeakerId::Human
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SpeakerId::Agent => SpeakerId::Human,
            SpeakerId::Human => SpeakerId::Agent,
        }
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakerId::Agent => write!(f, "agent"),
            SpeakerId::Human => write!(f, "human"),
        }
    }
}

/// The atomic unit of a transcript: one punctuated word and who said it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    pub speaker: SpeakerId,
}

impl WordToken {
    pub fn new(text: impl Into<String>, speaker: SpeakerId) -> Self {
        Self {
            text: text.into(),
            speaker,
        }
    }
}

/// Ordered words, oldest first.
///
/// The controller only ever extends its canonical transcript; callers receive
/// clones and cannot reach the controller's storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    words: Vec<WordToken>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(words: Vec<WordToken>) -> Self {
        Self { words }
    }

    /// Build a transcript where every whitespace-separated word belongs to `speaker`.
    pub fn from_text(text: &str, speaker: SpeakerId) -> Self {
        Self {
            words: text
                .split_whitespace()
                .map(|w| WordToken::new(w, speaker))
                .collect(),
        }
    }

    pub fn push(&mut self, word: WordToken) {
        self.words.push(word);
    }

    pub fn extend(&mut self, other: Transcript) {
        self.words.extend(other.words);
    }

    pub fn words(&self) -> &[WordToken] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Speaker of the most recent word, if any.
    pub fn last_speaker(&self) -> Option<SpeakerId> {
        self.words.last().map(|w| w.speaker)
    }

    /// Plain text of the words, space separated, without speaker tags.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn into_words(self) -> Vec<WordToken> {
        self.words
    }
}

impl From<Vec<WordToken>> for Transcript {
    fn from(words: Vec<WordToken>) -> Self {
        Self::from_words(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_labels_match_tags() {
        assert_eq!(SpeakerId::Agent.label(), 0);
        assert_eq!(SpeakerId::Human.label(), 1);
        assert_eq!(SpeakerId::from_label(0), SpeakerId::Agent);
        assert_eq!(SpeakerId::from_label(1), SpeakerId::Human);
        assert_eq!(SpeakerId::from_label(7), SpeakerId::Human);
    }

    #[test]
    fn flip_is_involution() {
        for s in [SpeakerId::Agent, SpeakerId::Human] {
            assert_eq!(s.flipped().flipped(), s);
            assert_ne!(s.flipped(), s);
        }
    }

    #[test]
    fn transcript_from_text_and_extend() {
        let mut t = Transcript::from_text("Hello, how are  you?", SpeakerId::Agent);
        assert_eq!(t.len(), 4);
        t.extend(Transcript::from_text("fine", SpeakerId::Human));
        assert_eq!(t.last_speaker(), Some(SpeakerId::Human));
        assert_eq!(t.text(), "Hello, how are you? fine");
        assert_eq!(t.words()[0], WordToken::new("Hello,", SpeakerId::Agent));
    }

    #[test]
    fn empty_transcript_has_no_speaker() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert_eq!(t.last_speaker(), None);
        assert_eq!(t.text(), "");
    }
}
