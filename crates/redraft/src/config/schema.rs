use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process-wide defaults and thresholds. Per-run overrides live on the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    /// Segments whose counted length is below this bypass the generative
    /// service and are treated as titles.
    #[serde(default = "default_skip_threshold")]
    pub segment_skip_threshold: usize,
    /// Weighted history size above which the rolling context is compressed.
    #[serde(default = "default_compression_threshold")]
    pub history_compression_threshold: usize,
    /// Upper bound between admission checks while a run is queued.
    #[serde(default = "default_poll_interval_ms")]
    pub queue_poll_interval_ms: u64,
    /// Fraction of a segment added to progress during the enhance stage.
    #[serde(default = "default_enhance_offset")]
    pub enhance_progress_offset: f64,
    /// Capacity of the in-process admission gate.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    #[serde(default)]
    pub polish: ServiceSettings,
    #[serde(default)]
    pub enhance: ServiceSettings,
    /// Emotion-polish service; falls back to `polish` when absent.
    #[serde(default)]
    pub emotion: Option<ServiceSettings>,
    #[serde(default)]
    pub compression: ServiceSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_skip_threshold() -> usize {
    15
}

fn default_compression_threshold() -> usize {
    5000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_enhance_offset() -> f64 {
    0.5
}

fn default_max_concurrent_runs() -> usize {
    5
}

impl Settings {
    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms)
    }

    /// Global defaults for the emotion-polish stage.
    pub fn emotion_service(&self) -> &ServiceSettings {
        self.emotion.as_ref().unwrap_or(&self.polish)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            segment_skip_threshold: default_skip_threshold(),
            history_compression_threshold: default_compression_threshold(),
            queue_poll_interval_ms: default_poll_interval_ms(),
            enhance_progress_offset: default_enhance_offset(),
            max_concurrent_runs: default_max_concurrent_runs(),
            polish: ServiceSettings::default(),
            enhance: ServiceSettings::default(),
            emotion: None,
            compression: ServiceSettings::default(),
        }
    }
}

/// Connection defaults for one OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Literal key. Prefer `api_key_env` outside local testing.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Name of an environment variable holding the key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}
