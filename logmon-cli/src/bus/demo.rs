use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{Interval, MissedTickBehavior};

use logmon_core::bus::{Bus, BusError, BusStream};

const LEVELS: [&str; 8] = [
    "INFO", "INFO", "DEBUG", "INFO", "WARNING", "INFO", "ERROR", "CRITICAL",
];

const MESSAGES: [&str; 6] = [
    "request handled in 12ms",
    "cache miss for key user:42",
    "retrying upstream call",
    "job finished",
    "connection pool exhausted",
    "Traceback (most recent call last):\n  File \"worker.py\", line 7\nValueError: bad input",
];

/// Synthetic traffic for trying the viewer without a Redis server.
///
/// Emits a record every `tick_interval`, round-robin over the subscribed
/// channels, with an occasional record from an unconfigured component and
/// an occasional undecodable payload. Every `drop_every` payloads the
/// connection "drops" so the reconnect path is visible too.
pub struct DemoBus {
    prefix: String,
    tick_interval: Duration,
    drop_every: u64,
}

impl DemoBus {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tick_interval: Duration::from_millis(300),
            drop_every: 200,
        }
    }

    #[cfg(test)]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    #[cfg(test)]
    pub fn with_drop_every(mut self, payloads: u64) -> Self {
        self.drop_every = payloads.max(1);
        self
    }
}

#[async_trait]
impl Bus for DemoBus {
    async fn subscribe(&mut self, channels: &[String]) -> Result<Box<dyn BusStream>, BusError> {
        let components = channels
            .iter()
            .map(|ch| ch.strip_prefix(&self.prefix).unwrap_or(ch).to_string())
            .collect();

        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Box::new(DemoStream {
            components,
            tick,
            counter: 0,
            drop_every: self.drop_every,
        }))
    }

    fn name(&self) -> &'static str {
        "demo"
    }
}

struct DemoStream {
    components: Vec<String>,
    tick: Interval,
    counter: u64,
    drop_every: u64,
}

impl DemoStream {
    fn payload(&self) -> String {
        let n = self.counter;
        if n % 97 == 0 {
            return "{\"level\": \"INFO\"".to_string();
        }

        let component = if n % 41 == 0 || self.components.is_empty() {
            "scheduler"
        } else {
            self.components[n as usize % self.components.len()].as_str()
        };
        let level = LEVELS[n as usize % LEVELS.len()];
        let message = MESSAGES[(n as usize / 3) % MESSAGES.len()];
        let secs = n % 60;

        json!({
            "timestamp": format!("2024-01-01 12:{:02}:{:02},{:03}", (n / 60) % 60, secs, n % 1000),
            "level": level,
            "component": component,
            "logger": format!("{}.service.worker", component),
            "message": format!("{} (#{})", message, n),
        })
        .to_string()
    }
}

#[async_trait]
impl BusStream for DemoStream {
    async fn next_payload(&mut self) -> Result<Option<String>, BusError> {
        self.tick.tick().await;
        self.counter += 1;
        if self.counter % self.drop_every == 0 {
            return Ok(None);
        }
        Ok(Some(self.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmon_core::decode::decode_record;

    #[tokio::test(start_paused = true)]
    async fn test_payloads_decode_with_configured_components() {
        let mut bus = DemoBus::new("logs:").with_tick_interval(Duration::from_millis(10));
        let channels = vec!["logs:backend".to_string(), "logs:batch".to_string()];
        let mut stream = bus.subscribe(&channels).await.unwrap();

        let mut decoded = 0;
        for _ in 0..30 {
            let payload = stream.next_payload().await.unwrap().unwrap();
            if let Ok(record) = decode_record(&payload) {
                assert!(["backend", "batch", "scheduler"].contains(&record.component.as_str()));
                decoded += 1;
            }
        }
        assert_eq!(decoded, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_drops_periodically() {
        let mut bus = DemoBus::new("logs:")
            .with_tick_interval(Duration::from_millis(10))
            .with_drop_every(3);
        let mut stream = bus.subscribe(&["logs:backend".to_string()]).await.unwrap();

        assert!(stream.next_payload().await.unwrap().is_some());
        assert!(stream.next_payload().await.unwrap().is_some());
        assert!(stream.next_payload().await.unwrap().is_none());
    }
}
