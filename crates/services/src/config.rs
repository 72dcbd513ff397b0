use std::env;
use std::time::Duration;

use logisim_core::EXAM_DURATION_SECS;

/// Timing knobs for exam sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExamConfig {
    pub duration_secs: u32,
    pub tick_interval: Duration,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            duration_secs: EXAM_DURATION_SECS,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl ExamConfig {
    /// Reads `LOGISIM_EXAM_DURATION_SECS` and `LOGISIM_TICK_MILLIS`.
    ///
    /// Missing, unparsable or zero values keep the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            env::var("LOGISIM_EXAM_DURATION_SECS").ok().as_deref(),
            env::var("LOGISIM_TICK_MILLIS").ok().as_deref(),
        )
    }

    fn from_values(duration: Option<&str>, tick_millis: Option<&str>) -> Self {
        let defaults = Self::default();
        let duration_secs = duration
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.duration_secs);
        let tick_interval = tick_millis
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(defaults.tick_interval, Duration::from_millis);
        Self {
            duration_secs,
            tick_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_five_minutes_and_one_second_ticks() {
        let config = ExamConfig::default();
        assert_eq!(config.duration_secs, 300);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn parses_overrides() {
        let config = ExamConfig::from_values(Some(" 600 "), Some("250"));
        assert_eq!(config.duration_secs, 600);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ExamConfig::from_values(Some("soon"), Some("0"));
        assert_eq!(config, ExamConfig::default());
    }
}
