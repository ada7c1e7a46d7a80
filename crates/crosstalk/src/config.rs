//! Session configuration.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | greeting | CROSSTALK__GREETING | "Hello, how can I help you?" |
//! | flip_speakers | CROSSTALK__FLIP_SPEAKERS | true |
//! | barge_in.min_words | CROSSTALK__BARGE_IN__MIN_WORDS | 1 |
//! | barge_in.min_confidence | CROSSTALK__BARGE_IN__MIN_CONFIDENCE | unset |
//! | completion.api_url | CROSSTALK__COMPLETION__API_URL | https://api.openai.com/v1 |
//! | completion.api_key | CROSSTALK__COMPLETION__API_KEY or OPENAI_API_KEY | unset |
//! | completion.model | CROSSTALK__COMPLETION__MODEL | gpt-3.5-turbo-instruct |
//! | completion.max_tokens | CROSSTALK__COMPLETION__MAX_TOKENS | 100 |
//! | completion.timeout_ms | CROSSTALK__COMPLETION__TIMEOUT_MS | 10000 |
//! | asr.api_key | CROSSTALK__ASR__API_KEY or DEEPGRAM_API_KEY | unset |

use crate::asr::LiveOptions;
use crate::error::CrosstalkResult;
use crate::remap::RawWord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GREETING: &str = "Hello, how can I help you?";

fn default_true() -> bool {
    true
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

/// Everything the controller and session need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstalkConfig {
    /// Spoken by the agent as soon as the ASR stream opens.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Swap diarization roles; see [`crate::remap`].
    #[serde(default = "default_true")]
    pub flip_speakers: bool,
    #[serde(default)]
    pub barge_in: BargeInPolicy,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub asr: AsrConfig,
}

impl Default for CrosstalkConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            flip_speakers: true,
            barge_in: BargeInPolicy::default(),
            completion: CompletionConfig::default(),
            asr: AsrConfig::default(),
        }
    }
}

impl CrosstalkConfig {
    /// Load from file and environment. Precedence: `CROSSTALK__*` env > file at
    /// `CROSSTALK_CONFIG` (or `config/crosstalk.toml` when present) > defaults.
    pub fn load() -> CrosstalkResult<Self> {
        let config_path =
            std::env::var("CROSSTALK_CONFIG").unwrap_or_else(|_| "config/crosstalk.toml".to_string());
        let builder = config::Config::builder()
            .set_default("greeting", DEFAULT_GREETING)?
            .set_default("flip_speakers", true)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("CROSSTALK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut loaded: Self = built.try_deserialize()?;
        if loaded.completion.api_key.is_none() {
            loaded.completion.api_key = env_opt_string("OPENAI_API_KEY");
        }
        if loaded.asr.api_key.is_none() {
            loaded.asr.api_key = env_opt_string("DEEPGRAM_API_KEY");
        }
        Ok(loaded)
    }
}

/// When a recognition fragment counts as the human barging in.
///
/// The default interrupts on any non-empty fragment, however unsure the
/// recognizer is. Raise `min_words` or set `min_confidence` to ignore coughs
/// and low-confidence echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BargeInPolicy {
    pub min_words: usize,
    /// Minimum mean word confidence; words without a confidence count as 1.0.
    pub min_confidence: Option<f32>,
}

impl Default for BargeInPolicy {
    fn default() -> Self {
        Self {
            min_words: 1,
            min_confidence: None,
        }
    }
}

impl BargeInPolicy {
    pub fn should_interrupt(&self, words: &[RawWord]) -> bool {
        if words.is_empty() || words.len() < self.min_words {
            return false;
        }
        match self.min_confidence {
            None => true,
            Some(min) => {
                let total: f32 = words.iter().map(|w| w.confidence.unwrap_or(1.0)).sum();
                total / words.len() as f32 >= min
            }
        }
    }
}

/// Completion model endpoint and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on one completion round trip.
    pub timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 100,
            timeout_ms: 10_000,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// ASR provider credentials and live options. Opaque to the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    pub api_key: Option<String>,
    pub live: LiveOptions,
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CrosstalkConfig::default();
        assert_eq!(c.greeting, "Hello, how can I help you?");
        assert!(c.flip_speakers);
        assert_eq!(c.barge_in.min_words, 1);
        assert_eq!(c.completion.max_tokens, 100);
        assert_eq!(c.completion.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: CrosstalkConfig = toml_like("greeting = \"Hi!\"\n[barge_in]\nmin_words = 2\n");
        assert_eq!(c.greeting, "Hi!");
        assert!(c.flip_speakers);
        assert_eq!(c.barge_in.min_words, 2);
        assert_eq!(c.barge_in.min_confidence, None);
        assert_eq!(c.completion.model, "gpt-3.5-turbo-instruct");
    }

    fn toml_like(source: &str) -> CrosstalkConfig {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn default_policy_interrupts_on_any_word() {
        let policy = BargeInPolicy::default();
        assert!(!policy.should_interrupt(&[]));
        assert!(policy.should_interrupt(&[RawWord::new("uh", 1).with_confidence(0.05)]));
    }

    #[test]
    fn tuned_policy_filters_fragments() {
        let policy = BargeInPolicy {
            min_words: 2,
            min_confidence: Some(0.6),
        };
        assert!(!policy.should_interrupt(&[RawWord::new("wait", 1)]));
        assert!(!policy.should_interrupt(&[
            RawWord::new("wait", 1).with_confidence(0.3),
            RawWord::new("no", 1).with_confidence(0.4),
        ]));
        assert!(policy.should_interrupt(&[
            RawWord::new("wait", 1).with_confidence(0.9),
            RawWord::new("no", 1),
        ]));
    }
}
