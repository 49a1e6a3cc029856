use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use tempo_core::config::StoreConfig;

use crate::error::{Result, StoreError};

/// Create/get/delete access to the durable object store.
///
/// Objects are loose JSON documents carrying at least `id` and
/// `object_type`; the scheduler validates shape itself, so the boundary
/// stays untyped.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a new object. The store assigns the id and returns the
    /// created document.
    async fn create_object(&self, object: Value) -> Result<Value>;

    /// Fetch one object by id.
    async fn get_object(&self, id: &str) -> Result<Value>;

    /// Delete one object by id.
    async fn delete_object(&self, id: &str) -> Result<()>;
}

/// reqwest-backed [`ObjectStore`] against the store's HTTP API.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn create_object(&self, object: Value) -> Result<Value> {
        let url = format!("{}/objects", self.base_url);
        let resp = self.client.post(&url).json(&object).send().await?;
        let resp = check_status(resp, None).await?;
        let created: Value = resp.json().await?;
        debug!(url = %url, "object created");
        Ok(created)
    }

    async fn get_object(&self, id: &str) -> Result<Value> {
        let url = format!("{}/objects/{}", self.base_url, id);
        let resp = self.client.get(&url).send().await?;
        let resp = check_status(resp, Some(id)).await?;
        Ok(resp.json().await?)
    }

    async fn delete_object(&self, id: &str) -> Result<()> {
        let url = format!("{}/objects/{}", self.base_url, id);
        let resp = self.client.delete(&url).send().await?;
        check_status(resp, Some(id)).await?;
        debug!(object_id = %id, "object deleted");
        Ok(())
    }
}

/// Map non-2xx responses to [`StoreError`], keeping the body for context.
pub(crate) async fn check_status(
    resp: reqwest::Response,
    id: Option<&str>,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 404 {
        if let Some(id) = id {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}
