use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use tempo_core::config::{FeedConfig, FEED_RETRY_SECS};

use crate::error::{Result, StoreError};

/// Mutation kind carried by a change-feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FeedMethod {
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "DELETE")]
    Delete,
}

/// One object mutation delivered by the change feed.
///
/// `current` is the object after a POST, `previous` the object before a
/// DELETE. Consumers decide relevance from the snapshots' `object_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEvent {
    pub method: FeedMethod,
    #[serde(default)]
    pub current: Option<Value>,
    #[serde(default)]
    pub previous: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FeedPage {
    cursor: String,
    #[serde(default)]
    events: Vec<FeedEvent>,
}

/// Long-polling change-feed subscription.
///
/// [`FeedConsumer::connect`] establishes the subscription and must
/// succeed before the service starts — a dead feed at boot is fatal.
/// [`FeedConsumer::run`] then polls forever, forwarding events into an
/// mpsc channel and backing off on transient errors.
pub struct FeedConsumer {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
    cursor: Option<String>,
}

impl FeedConsumer {
    pub fn new(base_url: &str, config: &FeedConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            cursor: None,
        }
    }

    /// Establish the subscription and record the initial cursor.
    ///
    /// Uses a zero-timeout poll so it returns immediately; events that
    /// existed before this call are not replayed.
    pub async fn connect(&mut self) -> Result<()> {
        let page = self.poll(0).await?;
        info!(cursor = %page.cursor, "change feed subscribed");
        self.cursor = Some(page.cursor);
        Ok(())
    }

    /// Poll the feed until the receiving side goes away.
    ///
    /// Transient poll failures are logged and retried after a fixed
    /// delay; they never abort the loop.
    pub async fn run(mut self, tx: mpsc::Sender<FeedEvent>) {
        loop {
            match self.poll(self.poll_timeout_secs).await {
                Ok(page) => {
                    if !page.events.is_empty() {
                        debug!(count = page.events.len(), "change feed events received");
                    }
                    for event in page.events {
                        if tx.send(event).await.is_err() {
                            info!("change feed receiver dropped — consumer stopped");
                            return;
                        }
                    }
                    self.cursor = Some(page.cursor);
                }
                Err(e) => {
                    error!(error = %e, "change feed poll failed — retrying");
                    tokio::time::sleep(Duration::from_secs(FEED_RETRY_SECS)).await;
                }
            }
        }
    }

    async fn poll(&self, timeout_secs: u64) -> Result<FeedPage> {
        let url = format!("{}/feed", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("timeout", timeout_secs.to_string())];
        if let Some(ref cursor) = self.cursor {
            query.push(("after", cursor.clone()));
        }
        let resp = self
            .client
            .get(&url)
            .query(&query)
            // The request must outlive the server-side hold time.
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await?;
        let resp = crate::client::check_status(resp, None).await?;
        resp.json::<FeedPage>()
            .await
            .map_err(|e| StoreError::Feed(e.to_string()))
    }
}
