//! newsapi.org `/v2/everything` article search

use super::NewsSource;
use crate::error::ChatError;
use crate::models::NewsItem;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub struct NewsApiSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiSource {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsApiSource {
    async fn latest(&self, query: &str, page_size: u32) -> Result<Vec<NewsItem>> {
        let url = format!("{}/v2/everything", self.base_url);
        debug!(query = %query, page_size, "newsapi.org everything");
        let page_size = page_size.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ChatError::UpstreamStatus {
                service: "newsapi.org",
                status: status.as_u16(),
            });
        }

        let body: EverythingResponse = response.json().await?;
        Ok(body.into_items())
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl EverythingResponse {
    fn into_items(self) -> Vec<NewsItem> {
        self.articles
            .into_iter()
            .map(|a| NewsItem {
                published_at: a.published_at.unwrap_or_default(),
                source: a.source.and_then(|s| s.name).unwrap_or_default(),
                title: a.title,
                url: a.url.unwrap_or_default(),
            })
            .collect()
    }
}
