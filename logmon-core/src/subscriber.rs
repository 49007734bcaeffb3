//! Background bus subscriber.
//!
//! Lifecycle: `Connecting -> Connected -> Disconnected -> Connecting -> ...`
//! with `Stopped` entered only on shutdown. Any bus error, a closed stream or
//! an expired receive timeout drops the connection; the next attempt follows
//! after a fixed interval, forever. Records published while disconnected are
//! lost.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::buffer::BoundedBuffer;
use crate::bus::{Bus, BusError, BusStream};
use crate::decode::decode_record;
use crate::model::{ConnectionState, ConnectionStatus, LogSource};

pub const DEFAULT_CHANNEL_PREFIX: &str = "logs:";
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberSettings {
    pub channel_prefix: String,
    pub reconnect_interval: Duration,
    /// Treat a silent connection as lost after this long
    pub receive_timeout: Option<Duration>,
}

impl Default for SubscriberSettings {
    fn default() -> Self {
        Self {
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            receive_timeout: None,
        }
    }
}

/// Commands accepted by a running subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberCommand {
    /// Drop the current connection (or skip the retry wait) and resubscribe
    Reconnect,
    Shutdown,
}

enum PumpExit {
    Lost(Option<BusError>),
    Reconnect,
    Shutdown,
}

pub struct Subscriber<B: Bus> {
    bus: B,
    channels: Vec<String>,
    buffer: Arc<BoundedBuffer>,
    status: Arc<ConnectionStatus>,
    settings: SubscriberSettings,
}

impl<B: Bus + 'static> Subscriber<B> {
    pub fn new(
        bus: B,
        sources: &[LogSource],
        buffer: Arc<BoundedBuffer>,
        settings: SubscriberSettings,
    ) -> Self {
        let channels = sources
            .iter()
            .map(|s| s.channel(&settings.channel_prefix))
            .collect();
        Self {
            bus,
            channels,
            buffer,
            status: Arc::new(ConnectionStatus::new()),
            settings,
        }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn status(&self) -> Arc<ConnectionStatus> {
        self.status.clone()
    }

    /// Run on its own task and return a handle to control it
    pub fn spawn(self) -> SubscriberHandle {
        let (command_tx, command_rx) = mpsc::channel(8);
        let status = self.status.clone();
        let task = tokio::spawn(async move {
            self.run(command_rx).await;
        });
        SubscriberHandle {
            command_tx,
            status,
            task,
        }
    }

    /// Main loop. Returns on `Shutdown` or when the command channel closes.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SubscriberCommand>) {
        loop {
            self.status.set(ConnectionState::Connecting);
            let attempt = self.status.record_attempt();
            debug!(attempt, bus = self.bus.name(), channels = ?self.channels, "subscribing");

            let subscribed = tokio::select! {
                res = self.bus.subscribe(&self.channels) => res,
                cmd = command_rx.recv() => match cmd {
                    Some(SubscriberCommand::Reconnect) => continue,
                    _ => break,
                },
            };

            match subscribed {
                Ok(stream) => {
                    self.status.set(ConnectionState::Connected);
                    info!(attempt, channels = self.channels.len(), "subscribed");

                    match self.pump(stream, &mut command_rx).await {
                        PumpExit::Shutdown => break,
                        PumpExit::Reconnect => {
                            self.status.set(ConnectionState::Disconnected);
                            info!("reconnect requested");
                            continue;
                        }
                        PumpExit::Lost(Some(e)) => warn!(error = %e, "connection lost"),
                        PumpExit::Lost(None) => warn!("connection closed by server"),
                    }
                }
                Err(e) => warn!(attempt, error = %e, "subscribe failed"),
            }

            self.status.set(ConnectionState::Disconnected);
            debug!(
                retry_in_ms = self.settings.reconnect_interval.as_millis() as u64,
                "waiting before reconnect"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.settings.reconnect_interval) => {}
                cmd = command_rx.recv() => match cmd {
                    Some(SubscriberCommand::Reconnect) => {}
                    _ => break,
                },
            }
        }

        self.status.set(ConnectionState::Stopped);
        info!("subscriber stopped");
    }

    async fn pump(
        &self,
        mut stream: Box<dyn BusStream>,
        command_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> PumpExit {
        loop {
            let next = tokio::select! {
                res = receive(stream.as_mut(), self.settings.receive_timeout) => res,
                cmd = command_rx.recv() => {
                    return match cmd {
                        Some(SubscriberCommand::Reconnect) => PumpExit::Reconnect,
                        _ => PumpExit::Shutdown,
                    };
                }
            };

            match next {
                Ok(Some(payload)) => self.ingest(&payload),
                Ok(None) => return PumpExit::Lost(None),
                Err(e) => return PumpExit::Lost(Some(e)),
            }
        }
    }

    fn ingest(&self, payload: &str) {
        match decode_record(payload) {
            Ok(record) => self.buffer.append(record),
            Err(e) => trace!(error = %e, "dropping undecodable payload"),
        }
    }
}

async fn receive(
    stream: &mut dyn BusStream,
    timeout: Option<Duration>,
) -> Result<Option<String>, BusError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.next_payload())
            .await
            .unwrap_or(Err(BusError::Timeout)),
        None => stream.next_payload().await,
    }
}

/// Control handle for a spawned subscriber
pub struct SubscriberHandle {
    command_tx: mpsc::Sender<SubscriberCommand>,
    status: Arc<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    pub fn status(&self) -> &Arc<ConnectionStatus> {
        &self.status
    }

    pub fn reconnect(&self) {
        if let Err(e) = self.command_tx.try_send(SubscriberCommand::Reconnect) {
            debug!(error = %e, "reconnect request not delivered");
        }
    }

    /// Stop the subscriber, interrupting any receive or retry wait
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SubscriberCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "subscriber task ended abnormally");
        }
    }
}
