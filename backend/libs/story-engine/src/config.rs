/// Configuration for the story engine
///
/// Loaded from environment variables with defaults matching the playback
/// contract (10 second items, 100 progress steps).
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of discrete progress steps per item. Fixed by the timer contract.
pub const PROGRESS_STEPS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Duration of text/image items and the fallback for media whose
    /// duration has not been reported yet
    #[serde(with = "duration_secs")]
    pub default_item_duration: Duration,
    /// Steps per item; progress advances one percent per step
    pub progress_steps: u32,
    /// Maximum stories requested from the record store per refresh
    pub feed_limit: i64,
    /// Buffered notices per subscriber before old ones are dropped
    pub notice_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_item_duration: Duration::from_secs(10),
            progress_steps: PROGRESS_STEPS,
            feed_limit: 100,
            notice_capacity: 32,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let duration_secs = parse_env_or_default(
            "STORY_DEFAULT_DURATION_SECS",
            defaults.default_item_duration.as_secs_f64(),
        )?;
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(format!(
                "STORY_DEFAULT_DURATION_SECS must be positive, got {}",
                duration_secs
            ));
        }

        Ok(Self {
            default_item_duration: Duration::from_secs_f64(duration_secs),
            progress_steps: PROGRESS_STEPS,
            feed_limit: parse_env_or_default("STORY_FEED_LIMIT", defaults.feed_limit)?
                .clamp(1, 500),
            notice_capacity: parse_env_or_default(
                "STORY_NOTICE_CAPACITY",
                defaults.notice_capacity,
            )?
            .max(1),
        })
    }

    /// Wall-clock interval between two progress steps for an item of `duration`
    pub fn step_interval(&self, duration: Duration) -> Duration {
        duration / self.progress_steps.max(1)
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if secs.is_finite() && secs > 0.0 {
            Ok(Duration::from_secs_f64(secs))
        } else {
            Err(serde::de::Error::custom("duration must be positive"))
        }
    }
}
