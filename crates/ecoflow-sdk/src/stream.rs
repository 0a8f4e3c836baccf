//! Reconnecting event-stream observer.
//!
//! Drives the connection state machine
//! `connecting -> open -> (closed|error) -> reconnecting -> connecting`
//! against the server's `/v1/ws` endpoint. Every received change event (and
//! every successful connect) triggers a full snapshot re-pull; the observer
//! never tries to patch state incrementally, so missed or duplicated events
//! while reconnecting are harmless.

use std::time::Duration;

use anyhow::Result;
use ecoflow_core::models::ChangeEvent;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::client::{EcoflowClient, StateSnapshot};

/// Observer connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    /// Terminal only if the observer task is dropped; retries never exhaust.
    Disconnected,
}

/// Bounded exponential reconnect schedule.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based): base doubling,
    /// capped. Retry count itself is unbounded.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(1u32 << exponent).min(self.cap)
    }
}

/// Interval between liveness pings while the socket is open.
const PING_INTERVAL: Duration = Duration::from_secs(15);

/// A reconnecting observer of the server's change stream.
pub struct EventObserver {
    client: EcoflowClient,
    ws_url: Url,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
}

impl EventObserver {
    pub fn new(client: EcoflowClient) -> Result<Self> {
        Self::with_policy(client, ReconnectPolicy::default())
    }

    pub fn with_policy(client: EcoflowClient, policy: ReconnectPolicy) -> Result<Self> {
        let ws_url = build_ws_url(client.base_url(), "/v1/ws")?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            client,
            ws_url,
            policy,
            state_tx,
        })
    }

    /// Watch the connection state (e.g. to surface a "disconnected" badge).
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }

    /// Run the observer until the future is dropped. `on_snapshot` is called
    /// with fresh full state after every (re)connect and for every received
    /// event.
    pub async fn run<F>(&self, mut on_snapshot: F)
    where
        F: FnMut(StateSnapshot),
    {
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);

            let socket = match connect_async(self.ws_url.as_str()).await {
                Ok((socket, _)) => socket,
                Err(err) => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "Stream connect failed (attempt {}): {}; retrying in {:?}",
                        attempt,
                        err,
                        delay
                    );
                    self.set_state(ConnectionState::Reconnecting);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            attempt = 0;
            self.set_state(ConnectionState::Open);
            tracing::info!("Event stream connected to {}", self.ws_url);

            // A reconnecting observer cannot assume nothing changed while it
            // was away: always start from a fresh snapshot.
            self.refresh(&mut on_snapshot).await;

            self.read_until_closed(socket, &mut on_snapshot).await;

            attempt += 1;
            let delay = self.policy.delay_for(attempt);
            tracing::info!("Event stream closed; reconnecting in {:?}", delay);
            self.set_state(ConnectionState::Reconnecting);
            tokio::time::sleep(delay).await;
        }
    }

    /// Consume the open socket until it closes or errors.
    async fn read_until_closed<F>(
        &self,
        mut socket: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        on_snapshot: &mut F,
    ) where
        F: FnMut(StateSnapshot),
    {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    if socket.send(Message::Ping(Vec::new())).await.is_err() {
                        return;
                    }
                }
                incoming = socket.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ChangeEvent>(&text) {
                                Ok(event) => {
                                    tracing::debug!("Change event: {:?}", event);
                                    self.refresh(on_snapshot).await;
                                }
                                Err(err) => {
                                    tracing::warn!("Ignoring unparseable event {:?}: {}", text, err);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!("Event stream error: {}", err);
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn refresh<F>(&self, on_snapshot: &mut F)
    where
        F: FnMut(StateSnapshot),
    {
        match self.client.fetch_snapshot().await {
            Ok(snapshot) => on_snapshot(snapshot),
            // Stay connected; the next event retries the pull.
            Err(err) => tracing::warn!("Snapshot refresh failed: {}", err),
        }
    }
}

fn build_ws_url(base: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => other,
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| anyhow::anyhow!("Invalid base URL scheme"))?;
    url.set_path(path);
    Ok(url)
}
