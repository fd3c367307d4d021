use serde::Deserialize;

/// Default minimum milliseconds between two batch deliveries.
pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 150;

/// Trace severity level as encoded by the single-letter tag in the raw line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TraceLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    /// Logcat's "wtf" severity, written as `A` or `F`.
    Assert,
    #[default]
    Unknown,
}

impl TraceLevel {
    /// Map a severity letter to a level. Unrecognized letters are accepted
    /// as `Unknown`; rejecting a line is the parser's job, not ours.
    pub fn from_letter(letter: char) -> Self {
        match letter.to_ascii_uppercase() {
            'V' => Self::Verbose,
            'D' => Self::Debug,
            'I' => Self::Info,
            'W' => Self::Warn,
            'E' => Self::Error,
            'A' | 'F' => Self::Assert,
            _ => Self::Unknown,
        }
    }

    /// Single-letter display form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "V",
            Self::Debug => "D",
            Self::Info => "I",
            Self::Warn => "W",
            Self::Error => "E",
            Self::Assert => "A",
            Self::Unknown => "?",
        }
    }
}

/// A single parsed log record. Immutable once built; the parser either
/// produces a fully populated trace or none at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    /// Originating timestamp exactly as written in the raw line.
    /// Display-only; batching timing uses the engine's own clock.
    pub timestamp: String,

    /// Detected severity level
    pub level: TraceLevel,

    /// Short source identifier, empty when the line carries none
    pub tag: String,

    /// Free-text body
    pub message: String,
}

impl Trace {
    pub fn new(timestamp: String, level: TraceLevel, tag: String, message: String) -> Self {
        Self {
            timestamp,
            level,
            tag,
            message,
        }
    }
}

/// Engine configuration. Applied with [`set_config`] and picked up by lines
/// processed from then on; a restart also resets batching state so a new
/// interval or filter starts from a clean slate.
///
/// [`set_config`]: crate::TraceEngine::set_config
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum milliseconds that must elapse since the last flush before a
    /// new flush may occur
    pub sampling_interval_ms: u64,

    /// Optional case-insensitive pattern; absent admits every trace
    pub filter: Option<String>,
}

impl EngineConfig {
    pub fn with_sampling_interval(mut self, millis: u64) -> Self {
        self.sampling_interval_ms = millis;
        self
    }

    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_letter() {
        assert_eq!(TraceLevel::from_letter('D'), TraceLevel::Debug);
        assert_eq!(TraceLevel::from_letter('e'), TraceLevel::Error);
        assert_eq!(TraceLevel::from_letter('A'), TraceLevel::Assert);
        assert_eq!(TraceLevel::from_letter('F'), TraceLevel::Assert);
        assert_eq!(TraceLevel::from_letter('Q'), TraceLevel::Unknown);
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sampling_interval_ms, DEFAULT_SAMPLING_INTERVAL_MS);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_config_from_toml() {
        let config: EngineConfig =
            toml::from_str("sampling_interval_ms = 25\nfilter = \"wifi\"").unwrap();
        assert_eq!(config.sampling_interval_ms, 25);
        assert_eq!(config.filter.as_deref(), Some("wifi"));

        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.sampling_interval_ms, DEFAULT_SAMPLING_INTERVAL_MS);
    }
}
