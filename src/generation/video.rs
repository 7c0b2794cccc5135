use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::GenerationConfig,
    generation::{GenerationError, GenerationResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
}

/// Keyword search over an external video index.
///
/// Implementations never fail: an unreachable or unconfigured index yields no
/// candidates.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Vec<VideoCandidate>;
}

/// YouTube Data API v3 `search.list` client.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    description: String,
    channel_title: String,
}

impl From<SearchResponse> for Vec<VideoCandidate> {
    fn from(response: SearchResponse) -> Self {
        response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id.filter(|id| !id.is_empty())?;
                let snippet = item.snippet.unwrap_or_default();
                Some(VideoCandidate {
                    id,
                    title: snippet.title,
                    description: snippet.description,
                    channel: snippet.channel_title,
                })
            })
            .collect()
    }
}

impl YouTubeClient {
    pub fn new(config: &GenerationConfig) -> GenerationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.youtube_base_url().to_string(),
            api_key: config.youtube_api_key().map(str::to_string),
        })
    }

    async fn try_search(&self, query: &str, max_results: u32) -> GenerationResult<Vec<VideoCandidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::VideoUnavailable(String::from("no api key")))?;

        let max_results = max_results.to_string();
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| GenerationError::VideoUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::VideoUnavailable(format!(
                "search responded with {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::VideoUnavailable(e.to_string()))?;

        Ok(parsed.into())
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str, max_results: u32) -> Vec<VideoCandidate> {
        if max_results == 0 {
            return Vec::new();
        }

        match self.try_search(query, max_results).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("video search skipped: {e}");
                Vec::new()
            }
        }
    }
}
