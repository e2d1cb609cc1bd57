//! Realtime channel.
//!
//! A persistent duplex connection carrying inbound message pushes and
//! outbound sends. The connection lifecycle (connect, reconnect with a fixed
//! delay) belongs to the channel and is invisible to its users.

mod frame;
mod websocket;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::IncomingMessage;

pub use frame::{decode_frame, encode_message_frame, ChannelEvent};
pub use websocket::WebSocketChannel;

/// Receiver of inbound message pushes.
///
/// The channel awaits each call before delivering the next message, so
/// handlers observe messages in arrival order.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: IncomingMessage);
}

/// Duplex message transport
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Queue `content` for transmission; does not wait for delivery
    async fn send(&self, content: &str) -> Result<()>;

    /// Install the inbound handler, replacing any previous one
    fn on_receive(&self, handler: Arc<dyn InboundHandler>);
}
