//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full endpoint URL, e.g. `http://127.0.0.1:8080/mcp`
    pub endpoint: String,

    pub timeouts: TimeoutConfig,

    /// Reconnection policy for the SSE stream
    pub retry: RetryConfig,

    /// Sent as the top-level `apiKey` member of every request
    pub api_key: Option<String>,

    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/mcp".to_string(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            api_key: None,
            user_agent: format!("kestrel-mcp-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "duration_serde")]
    pub connect: Duration,

    /// Upper bound on one request/response exchange
    #[serde(with = "duration_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

/// Backoff policy between SSE reconnection attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// `None` retries forever
    pub max_attempts: Option<u32>,

    #[serde(with = "duration_serde")]
    pub initial_delay: Duration,

    #[serde(with = "duration_serde")]
    pub max_delay: Duration,

    pub backoff_multiplier: f64,

    /// Randomize each delay within the upper half of its window
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before reconnection attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            capped_ms * (0.5 + rand::random::<f64>() * 0.5)
        } else {
            capped_ms
        };
        Duration::from_millis(delay_ms as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

// Durations travel as milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_doubles_to_cap() {
        let retry = RetryConfig {
            jitter: false,
            ..Default::default()
        };
        let delays: Vec<u64> = (0..6)
            .map(|attempt| retry.delay_for_attempt(attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10000, 10000]);
        assert_eq!(retry.delay_for_attempt(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_window() {
        let retry = RetryConfig::default();
        for attempt in 0..8 {
            let ceiling = RetryConfig {
                jitter: false,
                ..Default::default()
            }
            .delay_for_attempt(attempt);
            let delay = retry.delay_for_attempt(attempt);
            assert!(delay <= ceiling);
            assert!(delay >= ceiling / 2);
        }
    }

    #[test]
    fn test_should_retry() {
        assert!(RetryConfig::default().should_retry(1_000_000));
        let limited = RetryConfig {
            max_attempts: Some(2),
            ..Default::default()
        };
        assert!(limited.should_retry(1));
        assert!(!limited.should_retry(2));
    }

    #[test]
    fn test_config_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"endpoint":"http://localhost:9000/mcp","retry":{"initial_delay":250,"jitter":false}}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/mcp");
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(10));
        assert!(!config.retry.jitter);
        assert_eq!(config.timeouts.connect, Duration::from_secs(10));
    }
}
