//! Resource lookup backed by the YouTube Data API search endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use learnpath_core::error::ProviderError;
use learnpath_core::model::{LearningResource, ResourceType};
use learnpath_core::traits::ResourceLookup;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Finds a video (or course-style video) for a topic.
pub struct YouTubeLookup {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl YouTubeLookup {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl ResourceLookup for YouTubeLookup {
    fn name(&self) -> &str {
        "youtube"
    }

    #[instrument(skip(self))]
    async fn find(
        &self,
        topic: &str,
        resource_type: ResourceType,
    ) -> anyhow::Result<Option<LearningResource>> {
        let query = match resource_type {
            ResourceType::Video => format!("{topic} tutorial"),
            ResourceType::Course => format!("{topic} free course"),
            ResourceType::Article => return Ok(None),
        };

        let mut url = reqwest::Url::parse(&format!("{}/youtube/v3/search", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("maxResults", "1")
            .append_pair("q", &query)
            .append_pair("key", &self.api_key);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: 60_000,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let search: SearchResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status: 0,
            message: format!("failed to parse search response: {e}"),
        })?;

        let found = search.items.into_iter().find_map(|item| {
            let video_id = item.id.video_id?;
            Some(LearningResource {
                resource_type,
                title: item.snippet.title,
                url: format!("{WATCH_URL}{video_id}"),
                duration: None,
                difficulty: None,
                category: Some(topic.to_string()),
                description: Some(item.snippet.description).filter(|d| !d.is_empty()),
            })
        });
        if found.is_none() {
            debug!("no search results for '{query}'");
        }
        Ok(found)
    }
}
