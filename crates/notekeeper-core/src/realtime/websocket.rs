//! WebSocket implementation of the realtime channel

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, warn};

use super::frame::{decode_frame, encode_message_frame, ChannelEvent};
use super::{InboundHandler, RealtimeChannel};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

type HandlerSlot = Arc<Mutex<Option<Arc<dyn InboundHandler>>>>;
type KeySlot = Arc<Mutex<Option<String>>>;

/// Realtime channel over a reconnecting WebSocket.
///
/// The connection is opened lazily on the first `send` or `on_receive`, so
/// constructing a channel is cheap. Both must be called from within a tokio
/// runtime. Frames queued while disconnected, including one whose write
/// failed, are sent after reconnecting. `close` makes one more attempt to
/// flush them and gives up if the server cannot be reached.
pub struct WebSocketChannel {
    url: String,
    reconnect_delay: Duration,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pending_outbound: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    handler: HandlerSlot,
    vapid_key: KeySlot,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketChannel {
    pub fn new(config: &ClientConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            url: config.socket_url.clone(),
            reconnect_delay: config.reconnect_delay(),
            outbound: Mutex::new(Some(sender)),
            pending_outbound: Mutex::new(Some(receiver)),
            handler: Arc::new(Mutex::new(None)),
            vapid_key: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Public key the server announced on the current connection, if any.
    pub fn vapid_key(&self) -> Option<String> {
        lock(&self.vapid_key).clone()
    }

    /// Stop accepting sends, flush queued frames and close the connection.
    pub async fn close(&self) {
        lock(&self.outbound).take();
        lock(&self.pending_outbound).take();
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!(%error, "Realtime channel task ended abnormally");
            }
        }
    }

    fn ensure_started(&self) {
        let Some(outbound) = lock(&self.pending_outbound).take() else {
            return;
        };
        let task = tokio::spawn(run_connection_loop(
            self.url.clone(),
            self.reconnect_delay,
            outbound,
            Arc::clone(&self.handler),
            Arc::clone(&self.vapid_key),
        ));
        *lock(&self.task) = Some(task);
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

#[async_trait]
impl RealtimeChannel for WebSocketChannel {
    async fn send(&self, content: &str) -> Result<()> {
        let frame = encode_message_frame(content)?;
        self.ensure_started();
        let sender = lock(&self.outbound)
            .clone()
            .ok_or_else(|| Error::Channel("channel is closed".to_string()))?;
        sender
            .send(frame)
            .map_err(|_| Error::Channel("connection task has stopped".to_string()))
    }

    fn on_receive(&self, handler: Arc<dyn InboundHandler>) {
        *lock(&self.handler) = Some(handler);
        self.ensure_started();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a connected session ended.
enum SessionEnd {
    /// The channel was closed and every queued frame was written.
    Closed,
    Disconnected,
}

async fn run_connection_loop(
    url: String,
    reconnect_delay: Duration,
    mut outbound: mpsc::UnboundedReceiver<String>,
    handler: HandlerSlot,
    vapid_key: KeySlot,
) {
    // Frame whose write failed; it goes out first on the next connection
    let mut unsent: Option<String> = None;

    loop {
        info!(url = %url, "Connecting to realtime channel");

        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                info!("Connected to realtime channel");
                let (write, read) = stream.split();
                let end = run_session(
                    write,
                    read,
                    &mut outbound,
                    &mut unsent,
                    &handler,
                    &vapid_key,
                )
                .await;
                if matches!(end, SessionEnd::Closed) {
                    info!("Realtime channel closed");
                    return;
                }
                info!("Disconnected from realtime channel");
            }
            Err(error) => {
                warn!(%error, "Failed to connect to realtime channel");
                if outbound.is_closed() {
                    let mut dropped = usize::from(unsent.is_some());
                    while outbound.try_recv().is_ok() {
                        dropped += 1;
                    }
                    if dropped > 0 {
                        warn!(dropped, "Channel closed while unreachable; dropping frames");
                    }
                    return;
                }
            }
        }

        if outbound.is_closed() && outbound.is_empty() && unsent.is_none() {
            return;
        }

        tokio::time::sleep(reconnect_delay).await;
        info!(delay = ?reconnect_delay, "Trying to reconnect");
    }
}

async fn run_session<W, R>(
    mut write: W,
    mut read: R,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    unsent: &mut Option<String>,
    handler: &HandlerSlot,
    vapid_key: &KeySlot,
) -> SessionEnd
where
    W: Sink<WsMessage, Error = WsError> + Unpin,
    R: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    if let Some(frame) = unsent.take() {
        if let Err(error) = write.send(WsMessage::text(frame.clone())).await {
            warn!(%error, "Failed to resend realtime frame");
            *unsent = Some(frame);
            return SessionEnd::Disconnected;
        }
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = write.close().await;
                    return SessionEnd::Closed;
                };
                if let Err(error) = write.send(WsMessage::text(frame.clone())).await {
                    warn!(%error, "Failed to send realtime frame");
                    *unsent = Some(frame);
                    return SessionEnd::Disconnected;
                }
            }
            inbound = read.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    dispatch(text.as_str(), handler, vapid_key).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(%error, "Realtime channel read failed");
                    return SessionEnd::Disconnected;
                }
            }
        }
    }
}

async fn dispatch(text: &str, handler: &HandlerSlot, vapid_key: &KeySlot) {
    match decode_frame(text) {
        Ok(ChannelEvent::Message(message)) => {
            let current = lock(handler).clone();
            if let Some(current) = current {
                current.handle(message).await;
            } else {
                debug!("No inbound handler registered; dropping message");
            }
        }
        Ok(ChannelEvent::VapidKey(key)) => {
            *lock(vapid_key) = Some(key);
            debug!("Stored server VAPID key");
        }
        Ok(ChannelEvent::Other(event)) => {
            debug!(event, "Ignoring realtime event");
        }
        Err(error) => {
            warn!(%error, "Ignoring malformed realtime frame");
        }
    }
}
