use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_delay_ms() -> u64 {
    1000
}

fn default_min_delay_ms() -> u64 {
    100
}

fn default_show_processing() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pause between the end of one attempt and the start of the next
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Publish a placeholder while a recognition call is in flight
    #[serde(default = "default_show_processing")]
    pub show_processing: bool,
    pub start_active: bool,
    /// Give up on engine initialization after this long; unbounded if unset
    pub init_timeout_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            show_processing: default_show_processing(),
            start_active: false,
            init_timeout_ms: None,
        }
    }
}

impl SchedulerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(self.min_delay_ms))
    }

    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(default_delay_ms().max(self.min_delay_ms))
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }

    /// Interpret raw delay input.
    ///
    /// Only the leading integer counts, so `"250.5"` and `"250ms"` mean 250.
    /// Non-numeric and non-positive input resolves to the default delay,
    /// positive values under the floor are raised to `min_delay_ms`.
    pub fn parse_delay(&self, input: &str) -> Duration {
        match leading_integer(input) {
            Some(ms) if ms > 0 => Duration::from_millis((ms as u64).max(self.min_delay_ms)),
            _ => self.default_delay(),
        }
    }
}

/// Signed integer at the start of `input`, ignoring leading whitespace and
/// anything after the digits. Saturates on overflow.
pub fn leading_integer(input: &str) -> Option<i64> {
    let input = input.trim_start();
    let (negative, rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_garbage_use_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.parse_delay("-5"), Duration::from_millis(1000));
        assert_eq!(config.parse_delay("abc"), Duration::from_millis(1000));
        assert_eq!(config.parse_delay(""), Duration::from_millis(1000));
        assert_eq!(config.parse_delay("0"), Duration::from_millis(1000));
    }

    #[test]
    fn small_values_hit_the_floor() {
        let config = SchedulerConfig::default();
        assert_eq!(config.parse_delay("50"), Duration::from_millis(100));
        assert_eq!(config.parse_delay(" 250 "), Duration::from_millis(250));
    }

    #[test]
    fn fractional_and_suffixed_input_truncates() {
        let config = SchedulerConfig::default();
        assert_eq!(config.parse_delay("250.5"), Duration::from_millis(250));
        assert_eq!(config.parse_delay("12.7"), Duration::from_millis(100));
        assert_eq!(config.parse_delay("300ms"), Duration::from_millis(300));
        assert_eq!(config.parse_delay("-5.5"), Duration::from_millis(1000));
        assert_eq!(config.parse_delay(".5"), Duration::from_millis(1000));
        assert_eq!(config.parse_delay("- 5"), Duration::from_millis(1000));
    }

    #[test]
    fn leading_integer_saturates() {
        assert_eq!(leading_integer("99999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_integer("+42x"), Some(42));
        assert_eq!(leading_integer("abc"), None);
    }

    #[test]
    fn configured_delay_respects_floor() {
        let config = SchedulerConfig {
            delay_ms: 10,
            ..Default::default()
        };
        assert_eq!(config.delay(), Duration::from_millis(100));
    }
}
