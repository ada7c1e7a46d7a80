//! Speech-time estimation.
//!
//! Synthesis engines rarely report how far into an utterance they were when
//! cancelled, only how long they ran. These functions turn elapsed time into an
//! estimated count of words the listener actually heard.

use crate::error::{CrosstalkError, CrosstalkResult};

/// Average speaking rate: 150 words per minute.
const WORDS_PER_SECOND: f64 = 2.5;

/// Seconds per weighted character.
const CHARS_PER_SECOND: f64 = 15.0;

/// Elapsed values above this are milliseconds, not seconds.
pub const MILLISECOND_THRESHOLD: f64 = 1000.0;

/// Estimated seconds needed to speak `text`.
///
/// `words / 2.5 + chars * weight / 15`, where `weight = 1 / (1 + words / 10)`
/// damps the character term so long text converges on the word rate.
/// Empty or whitespace-only text takes no time.
pub fn estimate_duration(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0.0;
    }
    let words = words as f64;
    let characters = text.chars().count() as f64;
    let character_weight = 1.0 / (1.0 + words / 10.0);
    words / WORDS_PER_SECOND + characters * character_weight / CHARS_PER_SECOND
}

/// Like [`estimate_duration`] but rejects text with nothing to speak.
pub fn try_estimate_duration(text: &str) -> CrosstalkResult<f64> {
    let duration = estimate_duration(text);
    if duration <= 0.0 {
        return Err(CrosstalkError::EstimationDegenerate(format!(
            "no speakable words in {:?}",
            text
        )));
    }
    Ok(duration)
}

/// Normalize an engine-reported elapsed time to seconds.
///
/// Some engines report milliseconds where others report seconds. Any value
/// above [`MILLISECOND_THRESHOLD`] is treated as milliseconds. Negative and NaN
/// values become zero.
pub fn normalize_elapsed(elapsed: f64) -> f64 {
    if elapsed.is_nan() || elapsed <= 0.0 {
        return 0.0;
    }
    if elapsed > MILLISECOND_THRESHOLD {
        elapsed / 1000.0
    } else {
        elapsed
    }
}

/// Estimated number of words of `text` spoken after `elapsed` (seconds, or
/// milliseconds per [`normalize_elapsed`]).
///
/// Always within `0..=word_count`. Text with zero estimated duration yields 0.
pub fn estimate_spoken_word_count(text: &str, elapsed: f64) -> usize {
    let word_count = text.split_whitespace().count();
    let duration = estimate_duration(text);
    if word_count == 0 || duration <= 0.0 {
        return 0;
    }
    let fraction = (normalize_elapsed(elapsed) / duration).clamp(0.0, 1.0);
    (fraction * word_count as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTTERANCE: &str = "I can help you today";

    #[test]
    fn duration_follows_rate_model() {
        // 5 words, 20 chars: 5/2.5 + 20 * (1/1.5) / 15
        let expected = 2.0 + 20.0 / 1.5 / 15.0;
        assert!((estimate_duration(UTTERANCE) - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_text_is_not_degenerate_nan() {
        assert_eq!(estimate_duration(""), 0.0);
        assert_eq!(estimate_duration("   \n\t"), 0.0);
        assert_eq!(estimate_spoken_word_count("", 3.0), 0);
        assert_eq!(estimate_spoken_word_count("  ", 0.0), 0);
        assert!(matches!(
            try_estimate_duration(" "),
            Err(CrosstalkError::EstimationDegenerate(_))
        ));
        assert!(try_estimate_duration(UTTERANCE).is_ok());
    }

    #[test]
    fn zero_elapsed_means_nothing_heard() {
        assert_eq!(estimate_spoken_word_count(UTTERANCE, 0.0), 0);
    }

    #[test]
    fn full_duration_means_everything_heard() {
        let d = estimate_duration(UTTERANCE);
        assert_eq!(estimate_spoken_word_count(UTTERANCE, d), 5);
        assert_eq!(estimate_spoken_word_count(UTTERANCE, d * 4.0), 5);
    }

    #[test]
    fn partial_elapsed_rounds() {
        // 1.0 / 2.889 * 5 = 1.73
        assert_eq!(estimate_spoken_word_count(UTTERANCE, 1.0), 2);
    }

    #[test]
    fn milliseconds_are_normalized() {
        assert_eq!(normalize_elapsed(1500.0), 1.5);
        assert_eq!(normalize_elapsed(1000.0), 1000.0);
        assert_eq!(normalize_elapsed(-2.0), 0.0);
        assert_eq!(normalize_elapsed(f64::NAN), 0.0);
        assert_eq!(
            estimate_spoken_word_count(UTTERANCE, 1001.0),
            estimate_spoken_word_count(UTTERANCE, 1.001)
        );
    }

    #[test]
    fn count_is_monotonic_in_elapsed() {
        let text = "well that is a really interesting question, let me think about it for a moment";
        let mut previous = 0;
        for step in 0..200 {
            let elapsed = step as f64 * 0.05;
            let count = estimate_spoken_word_count(text, elapsed);
            assert!(count >= previous, "count dropped at {elapsed}s");
            previous = count;
        }
        assert_eq!(previous, text.split_whitespace().count());
    }
}
