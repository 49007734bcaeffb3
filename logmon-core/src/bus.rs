use async_trait::async_trait;

/// Failure talking to the bus. Always transient from the subscriber's point
/// of view: it leads to a reconnect, never to a crash.
#[derive(Clone, Debug)]
pub enum BusError {
    Connect { reason: String },
    Subscribe { channel: String, reason: String },
    Receive { reason: String },
    Timeout,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { reason } => write!(f, "connect failed: {}", reason),
            Self::Subscribe { channel, reason } => {
                write!(f, "subscribe to {} failed: {}", channel, reason)
            }
            Self::Receive { reason } => write!(f, "receive failed: {}", reason),
            Self::Timeout => write!(f, "no message within receive timeout"),
        }
    }
}

impl std::error::Error for BusError {}

/// An established subscription delivering raw payloads
#[async_trait]
pub trait BusStream: Send {
    /// Next payload; `Ok(None)` when the connection was closed
    async fn next_payload(&mut self) -> Result<Option<String>, BusError>;
}

/// A pluggable publish/subscribe transport.
///
/// - `RedisBus`: real Redis pub/sub
/// - `DemoBus`: synthetic traffic for trying the viewer without a server
#[async_trait]
pub trait Bus: Send + Sync {
    /// Open a connection and subscribe to every channel. Succeeds only when
    /// the handshake for all channels completed.
    async fn subscribe(&mut self, channels: &[String]) -> Result<Box<dyn BusStream>, BusError>;

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
