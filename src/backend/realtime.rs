use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::post::PostRow;

/// Row-level change kinds a subscription can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
}

impl ChangeKind {
    fn matches(&self, event: &str) -> bool {
        match self {
            ChangeKind::Created => event.eq_ignore_ascii_case("insert"),
        }
    }
}

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A live stream of newly created rows.
///
/// Dropping the subscription (or calling `unsubscribe`) releases it upstream;
/// rows still queued at that point are discarded with the receiver.
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<PostRow>,
    release: Option<ReleaseHook>,
}

impl Subscription {
    pub fn new(
        topic: impl Into<String>,
        rx: mpsc::UnboundedReceiver<PostRow>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next row, or `None` once the upstream side has closed.
    pub async fn recv(&mut self) -> Option<PostRow> {
        self.rx.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(topic = %self.topic, "realtime subscription released");
        }
    }
}

/// Realtime collaborator.
#[async_trait]
pub trait RealtimeSource: Send + Sync {
    async fn subscribe(&self, table: &str, kind: ChangeKind) -> Result<Subscription>;
}

/// Change envelope published by the backend's row trigger.
#[derive(Debug, Deserialize)]
struct ChangeEnvelope {
    table: String,
    #[serde(rename = "type")]
    event: String,
    record: PostRow,
}

/// `RealtimeSource` over Postgres `LISTEN/NOTIFY`.
///
/// Expects JSON payloads of the form `{"table": .., "type": "INSERT", "record": {..}}`.
pub struct PgRealtime {
    pool: PgPool,
    channel: String,
}

impl PgRealtime {
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl RealtimeSource for PgRealtime {
    async fn subscribe(&self, table: &str, kind: ChangeKind) -> Result<Subscription> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let table_name = table.to_string();
        let channel = self.channel.clone();

        let task = tokio::spawn(async move {
            loop {
                let notification = match listener.recv().await {
                    Ok(notification) => notification,
                    Err(e) => {
                        // PgListener reconnects on the next recv
                        tracing::warn!(channel = %channel, "realtime listener error: {:?}", e);
                        tokio::time::sleep(RECONNECT_BACKOFF).await;
                        continue;
                    }
                };

                let envelope: ChangeEnvelope = match serde_json::from_str(notification.payload()) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(channel = %channel, "malformed change payload: {}", e);
                        continue;
                    }
                };

                if envelope.table != table_name || !kind.matches(&envelope.event) {
                    continue;
                }

                if tx.send(envelope.record).is_err() {
                    break;
                }
            }
        });

        tracing::info!(channel = %self.channel, table, "realtime subscription opened");
        Ok(Subscription::new(format!("{}:{}", self.channel, table), rx, move || task.abort()))
    }
}
