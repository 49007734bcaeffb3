use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use redis::{ConnectionAddr, Msg};
use tracing::debug;

use logmon_core::bus::{Bus, BusError, BusStream};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis pub/sub transport
pub struct RedisBus {
    client: redis::Client,
}

impl RedisBus {
    /// Parse the URL. Does not connect.
    pub fn open(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(normalize_url(url).as_str()).map_err(|e| {
            BusError::Connect {
                reason: format!("invalid Redis URL '{}': {}", url, e),
            }
        })?;
        Ok(Self { client })
    }

    /// Resolve the endpoint host, returning a printable address
    pub async fn resolve_endpoint(&self) -> Result<String, BusError> {
        let (host, port) = match &self.client.get_connection_info().addr {
            ConnectionAddr::Tcp(host, port) => (host.clone(), *port),
            ConnectionAddr::TcpTls { host, port, .. } => (host.clone(), *port),
            ConnectionAddr::Unix(path) => return Ok(path.display().to_string()),
        };

        let mut addrs = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| BusError::Connect {
                reason: format!("cannot resolve {}: {}", host, e),
            })?;
        match addrs.next() {
            Some(addr) => Ok(addr.to_string()),
            None => Err(BusError::Connect {
                reason: format!("{} resolved to no addresses", host),
            }),
        }
    }
}

/// `localhost` may resolve to `::1` first while Redis listens on IPv4 only
pub fn normalize_url(url: &str) -> String {
    url.replacen("://localhost", "://127.0.0.1", 1)
        .replacen("@localhost", "@127.0.0.1", 1)
}

#[async_trait]
impl Bus for RedisBus {
    async fn subscribe(&mut self, channels: &[String]) -> Result<Box<dyn BusStream>, BusError> {
        let mut pubsub = tokio::time::timeout(CONNECT_TIMEOUT, self.client.get_async_pubsub())
            .await
            .map_err(|_| BusError::Connect {
                reason: format!("no answer within {}s", CONNECT_TIMEOUT.as_secs()),
            })?
            .map_err(|e| BusError::Connect {
                reason: e.to_string(),
            })?;

        for channel in channels {
            pubsub
                .subscribe(channel.as_str())
                .await
                .map_err(|e| BusError::Subscribe {
                    channel: channel.clone(),
                    reason: e.to_string(),
                })?;
            debug!(channel = %channel, "subscribed");
        }

        Ok(Box::new(RedisStream {
            messages: Box::pin(pubsub.into_on_message()),
        }))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

struct RedisStream {
    messages: Pin<Box<dyn Stream<Item = Msg> + Send>>,
}

#[async_trait]
impl BusStream for RedisStream {
    async fn next_payload(&mut self) -> Result<Option<String>, BusError> {
        Ok(self
            .messages
            .next()
            .await
            .map(|msg| String::from_utf8_lossy(msg.get_payload_bytes()).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_is_rewritten() {
        assert_eq!(
            normalize_url("redis://localhost:6379/0"),
            "redis://127.0.0.1:6379/0"
        );
        assert_eq!(
            normalize_url("redis://:secret@localhost:6379"),
            "redis://:secret@127.0.0.1:6379"
        );
        assert_eq!(
            normalize_url("redis://cache.internal:6379"),
            "redis://cache.internal:6379"
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            RedisBus::open("http://not-redis"),
            Err(BusError::Connect { .. })
        ));
        assert!(RedisBus::open("redis://127.0.0.1:6379/0").is_ok());
    }

    #[tokio::test]
    async fn test_resolve_ip_endpoint() {
        let bus = RedisBus::open("redis://127.0.0.1:6390/0").unwrap();
        assert_eq!(bus.resolve_endpoint().await.unwrap(), "127.0.0.1:6390");
    }
}
