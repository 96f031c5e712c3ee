//! Resolver and pipeline configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Intent resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Candidates scoring below this are discarded.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Share of the keyword scorer's confidence that comes from lexical
    /// overlap; the rest comes from parameter evidence.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            lexical_weight: default_lexical_weight(),
        }
    }
}

/// How sub-results are merged into one response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Text sections, each headed by its qualified action name.
    #[default]
    Concatenate,
    /// One JSON object with a tagged entry per step.
    #[serde(alias = "structured-merge", alias = "structured_merge")]
    Structured,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Concatenate => f.write_str("concatenate"),
            MergeStrategy::Structured => f.write_str("structured-merge"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concatenate" | "concat" => Ok(MergeStrategy::Concatenate),
            "structured" | "structured-merge" | "structured_merge" => Ok(MergeStrategy::Structured),
            other => Err(format!("unknown merge strategy '{}'", other)),
        }
    }
}

/// Pipeline retry, deadline and merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attempts per step for retryable failures (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound on a single retry delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-call deadline. Exceeding it counts as the agent being unreachable.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Default merge strategy.
    #[serde(default)]
    pub merge: MergeStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            merge: MergeStrategy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_backoff_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.base_backoff_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

fn default_min_confidence() -> f32 {
    0.30
}

fn default_lexical_weight() -> f32 {
    0.7
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2000
}

fn default_call_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = PipelineConfig {
            base_backoff_ms: 100,
            max_backoff_ms: 350,
            ..PipelineConfig::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(350));
        assert_eq!(config.backoff_delay(40), Duration::from_millis(350));
    }

    #[test]
    fn merge_strategy_parses_both_spellings() {
        assert_eq!("structured-merge".parse::<MergeStrategy>().unwrap(), MergeStrategy::Structured);
        assert_eq!("concatenate".parse::<MergeStrategy>().unwrap(), MergeStrategy::Concatenate);
        assert!("zip".parse::<MergeStrategy>().is_err());
    }
}
