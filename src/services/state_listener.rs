use crate::config::Config;
use crate::messages::{ServerState, StateMessage};
use crate::status::StatusLine;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

/// Text frames from one connection; the stream ends when the server closes
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Opens connections to the state-push endpoint
#[async_trait]
pub trait Connector: Send {
    async fn connect(&mut self) -> Result<FrameStream>;

    /// Endpoint name used in log lines
    fn endpoint(&self) -> &str;
}

pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&mut self) -> Result<FrameStream> {
        let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;

        let frames = ws
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(_) => None, // binary/ping/pong
                    Err(e) => Some(Err(anyhow::Error::new(e))),
                })
            })
            .boxed();

        Ok(frames)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Connected,
    Backoff,
}

#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: config.reconnect_delay,
            max_attempts: config.max_connect_attempts,
        }
    }
}

/// Mirrors server-pushed state into the shared watch channel
///
/// This service:
/// - Holds the only sender for `ServerState`
/// - Re-renders the status line only when the state actually changes
/// - Reconnects after a fixed delay whenever the connection drops or errors
pub struct StateListener<C> {
    connector: C,
    state_tx: watch::Sender<ServerState>,
    status: StatusLine,
    policy: ReconnectPolicy,
    phase: Phase,
    attempts: u32,
}

impl<C: Connector> StateListener<C> {
    pub fn new(
        connector: C,
        state_tx: watch::Sender<ServerState>,
        status: StatusLine,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            connector,
            state_tx,
            status,
            policy,
            phase: Phase::Connecting,
            attempts: 0,
        }
    }

    /// Runs until the attempt bound is hit, which never happens without one.
    /// Returns the number of connection attempts made.
    pub async fn run(mut self) -> u32 {
        loop {
            if let Some(max) = self.policy.max_attempts {
                if self.attempts >= max {
                    tracing::debug!("Giving up after {} connection attempts", self.attempts);
                    return self.attempts;
                }
            }

            self.set_phase(Phase::Connecting);
            self.attempts += 1;

            match self.connector.connect().await {
                Ok(frames) => {
                    self.set_phase(Phase::Connected);
                    self.status
                        .log(&format!("[WS] Connected to {}", self.connector.endpoint()));

                    match self.receive(frames).await {
                        Ok(()) => self.status.log("[WS] Connection closed, reconnecting..."),
                        Err(e) => self
                            .status
                            .log(&format!("[WS] Error: {:#}, reconnecting...", e)),
                    }
                }
                Err(e) => self
                    .status
                    .log(&format!("[WS] Error: {:#}, reconnecting...", e)),
            }

            self.set_phase(Phase::Backoff);
            tokio::time::sleep(self.policy.delay).await;
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!("State listener: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    async fn receive(&self, mut frames: FrameStream) -> Result<()> {
        while let Some(frame) = frames.next().await {
            self.apply(&frame?)?;
        }
        Ok(())
    }

    /// Decode one frame and publish it if it differs from the cached state.
    /// Returns whether anything changed.
    pub fn apply(&self, text: &str) -> Result<bool> {
        let msg: StateMessage =
            serde_json::from_str(text).with_context(|| format!("Malformed state frame {:?}", text))?;
        let next = ServerState::from(msg);

        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });

        if changed {
            tracing::debug!("Server state: {:?}", next);
            self.status.render(&next);
        }
        Ok(changed)
    }
}
