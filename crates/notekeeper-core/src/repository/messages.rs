//! Message repository implementation

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::Result;
use crate::models::{IncomingMessage, Message};
use crate::realtime::{InboundHandler, RealtimeChannel};
use crate::storage::{get_json, set_json, KeyValueStore, MESSAGES_KEY};

/// Append-only local log of sent and received chat messages.
pub struct MessageRepository {
    store: Arc<dyn KeyValueStore>,
    channel: Arc<dyn RealtimeChannel>,
    messages: Mutex<Vec<Message>>,
}

enum Received {
    Stored(Message),
    Duplicate(Message),
}

impl MessageRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, channel: Arc<dyn RealtimeChannel>) -> Self {
        Self {
            store,
            channel,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Read the persisted log into memory.
    pub async fn load(&self) -> Result<()> {
        let stored: Option<Vec<Message>> = get_json(self.store.as_ref(), MESSAGES_KEY).await?;
        *self.messages.lock().await = stored.unwrap_or_default();
        Ok(())
    }

    /// All messages in insertion order.
    pub async fn list(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Store a message composed locally, then hand it to the channel.
    ///
    /// The message is persisted even if forwarding fails; the forwarding
    /// error is still returned.
    pub async fn send_local(&self, content: &str) -> Result<Message> {
        let message = Message::outgoing(content);
        self.append(message.clone()).await?;
        self.channel.send(content).await?;
        tracing::debug!(id = %message.id, "Sent message");
        Ok(message)
    }

    /// Store an inbound message unless it duplicates one already stored.
    ///
    /// Returns the stored message, or the existing one when deduplicated.
    pub async fn receive(&self, incoming: IncomingMessage) -> Result<Message> {
        match self.store_incoming(incoming, false).await? {
            Received::Stored(message) | Received::Duplicate(message) => Ok(message),
        }
    }

    /// Feed server-side history through `receive`, oldest first.
    ///
    /// Messages sent by `own_identifier` are stored as sent by this client.
    /// Returns how many messages were new.
    pub async fn import_history(
        &self,
        history: Vec<IncomingMessage>,
        own_identifier: Option<&str>,
    ) -> Result<usize> {
        let mut stored = 0;
        for incoming in history {
            let from_me = own_identifier.is_some_and(|own| incoming.is_from(own));
            if matches!(
                self.store_incoming(incoming, from_me).await?,
                Received::Stored(_)
            ) {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Remove every message.
    pub async fn clear(&self) -> Result<()> {
        let mut messages = self.messages.lock().await;
        set_json(self.store.as_ref(), MESSAGES_KEY, &Vec::<Message>::new()).await?;
        messages.clear();
        Ok(())
    }

    /// Register this repository as the channel's inbound handler.
    ///
    /// Each newly stored message is also forwarded to the returned receiver;
    /// deduplicated echoes are not.
    pub fn attach(self: &Arc<Self>) -> mpsc::UnboundedReceiver<Message> {
        let (stored, receiver) = mpsc::unbounded_channel();
        self.channel.on_receive(Arc::new(StoreInbound {
            messages: Arc::downgrade(self),
            stored,
        }));
        receiver
    }

    async fn store_incoming(&self, incoming: IncomingMessage, from_me: bool) -> Result<Received> {
        let mut messages = self.messages.lock().await;

        if let Some(timestamp) = incoming.timestamp {
            if let Some(existing) = messages
                .iter()
                .find(|message| message.is_duplicate_of(&incoming.content, timestamp))
            {
                tracing::debug!(id = %existing.id, "Dropping duplicate message");
                return Ok(Received::Duplicate(existing.clone()));
            }
        }

        let mut message = Message::received(incoming);
        message.is_from_me = from_me;
        let mut next = messages.clone();
        next.push(message.clone());
        set_json(self.store.as_ref(), MESSAGES_KEY, &next).await?;
        *messages = next;
        Ok(Received::Stored(message))
    }

    async fn append(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let mut next = messages.clone();
        next.push(message);
        set_json(self.store.as_ref(), MESSAGES_KEY, &next).await?;
        *messages = next;
        Ok(())
    }
}

struct StoreInbound {
    messages: Weak<MessageRepository>,
    stored: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl InboundHandler for StoreInbound {
    async fn handle(&self, incoming: IncomingMessage) {
        let Some(messages) = self.messages.upgrade() else {
            return;
        };
        match messages.store_incoming(incoming, false).await {
            Ok(Received::Stored(message)) => {
                let _ = self.stored.send(message);
            }
            Ok(Received::Duplicate(_)) => {}
            Err(error) => tracing::error!(%error, "Failed to store inbound message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_support::{FailingStore, RecordingChannel};
    use chrono::{TimeDelta, Utc};
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<MemoryStore>, Arc<RecordingChannel>, MessageRepository) {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let repo = MessageRepository::new(store.clone(), channel.clone());
        (store, channel, repo)
    }

    #[tokio::test]
    async fn send_local_appends_persists_and_forwards() {
        let (store, channel, repo) = setup();

        let message = repo.send_local("hello").await.unwrap();
        assert!(message.is_from_me);
        assert_eq!(channel.sent(), vec!["hello".to_string()]);

        let reloaded = MessageRepository::new(store.clone(), channel.clone());
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.list().await, vec![message]);
    }

    #[tokio::test]
    async fn send_local_keeps_message_when_forwarding_fails() {
        let (_, channel, repo) = setup();
        channel.fail_sends(true);

        assert!(repo.send_local("offline").await.is_err());
        assert_eq!(repo.list().await.len(), 1);
    }

    #[tokio::test]
    async fn receive_deduplicates_within_five_seconds() {
        let (_, _, repo) = setup();
        let at = Utc::now();

        let first = repo
            .receive(IncomingMessage::new("hi").with_timestamp(at))
            .await
            .unwrap();
        let echo = repo
            .receive(IncomingMessage::new("hi").with_timestamp(at + TimeDelta::seconds(3)))
            .await
            .unwrap();
        assert_eq!(echo, first);
        assert_eq!(repo.list().await.len(), 1);

        repo.receive(IncomingMessage::new("hi").with_timestamp(at + TimeDelta::seconds(10)))
            .await
            .unwrap();
        assert_eq!(repo.list().await.len(), 2);
    }

    #[tokio::test]
    async fn echo_of_own_message_is_not_stored_twice() {
        let (_, _, repo) = setup();
        let sent = repo.send_local("ping").await.unwrap();

        let echoed = repo
            .receive(IncomingMessage::new("ping").with_timestamp(sent.timestamp))
            .await
            .unwrap();
        assert_eq!(echoed, sent);
        assert!(echoed.is_from_me);
        assert_eq!(repo.list().await.len(), 1);
    }

    #[tokio::test]
    async fn receive_fills_missing_fields_and_keeps_given_ones() {
        let (_, _, repo) = setup();
        let at = Utc::now() - TimeDelta::hours(1);

        let given = repo
            .receive(IncomingMessage::new("a").with_id("srv-1").with_timestamp(at))
            .await
            .unwrap();
        assert_eq!(given.id, "srv-1");
        assert_eq!(given.timestamp, at);
        assert!(!given.is_from_me);

        let filled = repo.receive(IncomingMessage::new("b")).await.unwrap();
        assert!(!filled.id.is_empty());
        assert!(!filled.is_from_me);
    }

    #[tokio::test]
    async fn messages_without_timestamp_are_never_deduplicated() {
        let (_, _, repo) = setup();
        repo.receive(IncomingMessage::new("same")).await.unwrap();
        repo.receive(IncomingMessage::new("same")).await.unwrap();
        assert_eq!(repo.list().await.len(), 2);
    }

    #[tokio::test]
    async fn import_history_counts_new_messages() {
        let (_, _, repo) = setup();
        let at = Utc::now();
        repo.receive(IncomingMessage::new("old").with_timestamp(at))
            .await
            .unwrap();

        let imported = repo
            .import_history(
                vec![
                    IncomingMessage::new("old").with_timestamp(at),
                    IncomingMessage::new("new").with_timestamp(at),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(imported, 1);

        let contents: Vec<_> = repo.list().await.into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn import_history_marks_messages_sent_by_this_client() {
        let (_, _, repo) = setup();
        let at = Utc::now();

        repo.import_history(
            vec![
                IncomingMessage::new("mine")
                    .with_timestamp(at)
                    .with_identifier("client-1"),
                IncomingMessage::new("theirs")
                    .with_timestamp(at)
                    .with_identifier("client-2"),
                IncomingMessage::new("anonymous").with_timestamp(at),
            ],
            Some("client-1"),
        )
        .await
        .unwrap();

        let flags: Vec<_> = repo
            .list()
            .await
            .into_iter()
            .map(|m| (m.content, m.is_from_me))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("mine".to_string(), true),
                ("theirs".to_string(), false),
                ("anonymous".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn attached_handler_stores_in_arrival_order() {
        let (_, channel, repo) = setup();
        let repo = Arc::new(repo);
        let mut stored = repo.attach();
        let at = Utc::now();

        channel
            .deliver(IncomingMessage::new("one").with_timestamp(at))
            .await;
        channel
            .deliver(IncomingMessage::new("two").with_timestamp(at))
            .await;
        channel
            .deliver(IncomingMessage::new("one").with_timestamp(at))
            .await;

        assert_eq!(stored.recv().await.unwrap().content, "one");
        assert_eq!(stored.recv().await.unwrap().content, "two");
        assert!(stored.try_recv().is_err());

        let contents: Vec<_> = repo.list().await.into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn persistence_failure_propagates() {
        let store = Arc::new(FailingStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let repo = MessageRepository::new(store.clone(), channel.clone());
        store.fail_writes(true);

        assert!(repo.receive(IncomingMessage::new("x")).await.is_err());
        assert!(repo.send_local("y").await.is_err());
        assert!(repo.list().await.is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_log() {
        let (store, channel, repo) = setup();
        repo.send_local("x").await.unwrap();
        repo.clear().await.unwrap();
        assert!(repo.list().await.is_empty());

        let reloaded = MessageRepository::new(store.clone(), channel.clone());
        reloaded.load().await.unwrap();
        assert!(reloaded.list().await.is_empty());
    }
}
