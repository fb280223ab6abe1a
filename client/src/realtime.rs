//! Bridge between the pub/sub push provider and the conversation store.
//!
//! Push is an optimization, not a correctness requirement: every failure
//! here degrades to polling, because the periodic history fetch remains
//! the authoritative resync path.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use devlink_common::conversation::channel_name;
use devlink_common::identity::UserId;
use devlink_common::message::Message;

use crate::error::{ClientError, Result};

/// Frames the client sends to the push provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

/// Frames the push provider sends back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Subscribed { channel: String },
    NewMessage { channel: String, message: Message },
    Error { message: String },
}

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A push event surfaced to the owning client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    NewMessage(Message),
    Disconnected,
}

/// A live subscription to one conversation channel.
///
/// Dropping it aborts the reader task, so the channel resource is released
/// on every exit path, error paths included.
pub struct ChannelSubscription {
    channel: String,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    reader: JoinHandle<()>,
}

impl ChannelSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Connects to the push provider and owns the single active channel:
/// acquired on conversation selection, always released before acquiring
/// the next one — never held for two conversations simultaneously.
pub struct RealtimeClient {
    ws_url: String,
    active: Option<ChannelSubscription>,
}

impl RealtimeClient {
    pub fn new(ws_url: String) -> RealtimeClient {
        RealtimeClient { ws_url, active: None }
    }

    pub fn active_channel(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.channel.as_str())
    }

    /// Subscribe to the channel for this participant pair. Both ends derive
    /// the same channel name independently, so no negotiation happens here.
    pub async fn subscribe_pair(&mut self, a: &UserId, b: &UserId) -> Result<()> {
        self.unsubscribe();
        let channel = channel_name(a, b);

        let (ws, _) = connect_async(&self.ws_url)
            .await
            .map_err(|e| ClientError::Realtime(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let subscribe = serde_json::to_string(&ClientFrame::Subscribe {
            channel: channel.clone(),
        })?;
        sink.send(WsMessage::Text(subscribe.into()))
            .await
            .map_err(|e| ClientError::Realtime(e.to_string()))?;

        // Wait for the provider ack before handing the channel out, so an
        // event published right after subscription cannot be missed.
        tokio::time::timeout(SUBSCRIBE_TIMEOUT, async {
            loop {
                match stream.next().await {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ServerFrame>(&text) {
                            Ok(ServerFrame::Subscribed { .. }) => return Ok(()),
                            Ok(ServerFrame::Error { message }) => {
                                return Err(ClientError::Realtime(message))
                            }
                            _ => continue,
                        }
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(ClientError::Realtime(e.to_string())),
                    None => {
                        return Err(ClientError::Realtime(
                            "connection closed during subscribe".to_string(),
                        ))
                    }
                }
            }
        })
        .await
        .map_err(|_| ClientError::Realtime("subscribe ack timed out".to_string()))??;

        let (tx, rx) = mpsc::unbounded_channel();
        let bound_channel = channel.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("push channel read failed: {e}");
                        break;
                    }
                };
                match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(ServerFrame::NewMessage { channel, message }) if channel == bound_channel => {
                        if tx.send(ChannelEvent::NewMessage(message)).is_err() {
                            break;
                        }
                    }
                    Ok(ServerFrame::NewMessage { channel, .. }) => {
                        tracing::debug!(%channel, "ignoring event for unbound channel");
                    }
                    Ok(ServerFrame::Subscribed { channel }) => {
                        tracing::debug!(%channel, "push channel live");
                    }
                    Ok(ServerFrame::Error { message }) => {
                        tracing::warn!("push provider error: {message}");
                    }
                    Err(e) => {
                        tracing::warn!("unparseable push frame: {e}");
                    }
                }
            }
            let _ = tx.send(ChannelEvent::Disconnected);
        });

        tracing::debug!(%channel, "push channel acquired");
        self.active = Some(ChannelSubscription {
            channel,
            events: rx,
            reader,
        });
        Ok(())
    }

    /// Release the active channel, if any.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.active.take() {
            tracing::debug!(channel = %subscription.channel, "push channel released");
        }
    }

    /// Pending push event, if one has arrived.
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.active.as_mut()?.try_recv()
    }

    /// Wait for the next push event; None when no channel is held or the
    /// reader has gone away.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.active.as_mut()?.recv().await
    }
}
