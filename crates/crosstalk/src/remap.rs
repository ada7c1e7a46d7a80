//! Speaker remapping from provider diarization labels to {Agent, Human}.
//!
//! Label 0 is the agent and label 1 the human. The `flip` flag swaps the two
//! roles; set it according to whether the host cancels the synthesized voice
//! echoing back into the microphone.
//!
//! Labels outside {0, 1}, and words with no label at all, are always assigned
//! to [`SpeakerId::Human`], flipped or not.

use crate::word::{SpeakerId, WordToken};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A recognized word as delivered by the ASR provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    pub text: String,
    /// Diarization index, absent when diarization is off.
    pub speaker: Option<i64>,
    pub confidence: Option<f32>,
}

impl RawWord {
    pub fn new(text: impl Into<String>, speaker: i64) -> Self {
        Self {
            text: text.into(),
            speaker: Some(speaker),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl From<&WordToken> for RawWord {
    fn from(word: &WordToken) -> Self {
        RawWord::new(word.text.clone(), i64::from(word.speaker.label()))
    }
}

/// Map one raw label into the two-role space.
pub fn remap_label(label: Option<i64>, flip: bool) -> SpeakerId {
    let speaker = match label {
        Some(0) => SpeakerId::Agent,
        Some(1) => SpeakerId::Human,
        other => {
            debug!("Remap: label {:?} outside {{0, 1}}, assigning human", other);
            return SpeakerId::Human;
        }
    };
    if flip {
        speaker.flipped()
    } else {
        speaker
    }
}

/// Remap every word. Total: no word is dropped.
pub fn remap(words: &[RawWord], flip: bool) -> Vec<WordToken> {
    words
        .iter()
        .map(|w| WordToken::new(w.text.clone(), remap_label(w.speaker, flip)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, i64)]) -> Vec<RawWord> {
        pairs.iter().map(|(t, s)| RawWord::new(*t, *s)).collect()
    }

    #[test]
    fn default_polarity() {
        let out = remap(&raw(&[("hi", 0), ("there", 1)]), false);
        assert_eq!(out[0].speaker, SpeakerId::Agent);
        assert_eq!(out[1].speaker, SpeakerId::Human);
        assert_eq!(out[1].text, "there");
    }

    #[test]
    fn flip_swaps_roles() {
        let out = remap(&raw(&[("hi", 0), ("there", 1)]), true);
        assert_eq!(out[0].speaker, SpeakerId::Human);
        assert_eq!(out[1].speaker, SpeakerId::Agent);
    }

    #[test]
    fn flip_twice_is_identity() {
        let words = raw(&[("a", 0), ("b", 1), ("c", 1), ("d", 0)]);
        let once: Vec<RawWord> = remap(&words, true).iter().map(RawWord::from).collect();
        let twice = remap(&once, true);
        assert_eq!(twice, remap(&words, false));
    }

    #[test]
    fn out_of_range_labels_are_human() {
        let mut words = raw(&[("x", 2), ("y", -1)]);
        words.push(RawWord {
            text: "z".to_string(),
            speaker: None,
            confidence: Some(0.4),
        });
        for flip in [false, true] {
            let out = remap(&words, flip);
            assert_eq!(out.len(), 3);
            assert!(out.iter().all(|w| w.speaker == SpeakerId::Human));
        }
    }
}
