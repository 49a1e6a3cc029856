use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Paginated id lookup over the search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Return up to `count` ids of objects of type `object`, starting
    /// after the cursor `after` (the last id of the previous page).
    async fn search(&self, object: &str, count: usize, after: Option<&str>) -> Result<Vec<String>>;
}

/// One page of search results as returned by the index.
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<String>,
}

/// reqwest-backed [`SearchIndex`].
pub struct HttpSearch {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearch {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchIndex for HttpSearch {
    async fn search(&self, object: &str, count: usize, after: Option<&str>) -> Result<Vec<String>> {
        let url = format!("{}/search", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("object", object.to_string()),
            ("count", count.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        let resp = self.client.get(&url).query(&query).send().await?;
        let resp = crate::client::check_status(resp, None).await?;
        let page: SearchPage = resp.json().await?;
        Ok(page.results)
    }
}
