// src/search/youtube.rs

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{MediaSearch, SearchError};
use crate::{state::MediaItem, utils::duration::parse_iso8601_secs};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub struct YouTubeSearch {
    client:   Client,
    base_url: String,
    api_key:  String,
    limit:    u32,
}

/* ---------- search.list ---------- */
#[derive(Deserialize)]
struct SearchResp {
    #[serde(default)]
    items: Vec<SearchItem>,
}
#[derive(Deserialize)]
struct SearchItem {
    id:      SearchId,
    snippet: Snippet,
}
#[derive(Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}
#[derive(Deserialize)]
struct Snippet {
    title: String,
}

/* ---------- videos.list ---------- */
#[derive(Deserialize)]
struct VideosResp {
    #[serde(default)]
    items: Vec<VideoItem>,
}
#[derive(Deserialize)]
struct VideoItem {
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}
#[derive(Deserialize)]
struct ContentDetails {
    duration: String,
}

impl YouTubeSearch {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            limit,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SearchError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        // 非 2xx 就把狀態與 body 帶回去
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SearchError::LookupFailed(format!("{path}: {status}: {text}")));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl MediaSearch for YouTubeSearch {
    async fn search(&self, query: &str) -> Result<Vec<MediaItem>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::LookupFailed("search is not configured".into()));
        }

        // 1) 搜尋影片 id 與標題
        let limit = self.limit.to_string();
        let found: SearchResp = self
            .get_json(
                "search",
                &[("part", "id,snippet"), ("type", "video"), ("q", query), ("maxResults", limit.as_str())],
            )
            .await?;

        let hits: Vec<(String, String)> = found
            .items
            .into_iter()
            .filter_map(|i| i.id.video_id.map(|id| (id, i.snippet.title)))
            .collect();
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        // 2) 一次查全部的長度
        let ids = hits.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>().join(",");
        let details: VideosResp = self
            .get_json("videos", &[("part", "contentDetails"), ("id", ids.as_str())])
            .await?;

        let mut durations = HashMap::with_capacity(details.items.len());
        for v in details.items {
            let secs = parse_iso8601_secs(&v.content_details.duration).ok_or_else(|| {
                SearchError::LookupFailed(format!("bad duration `{}` for {}", v.content_details.duration, v.id))
            })?;
            durations.insert(v.id, secs);
        }

        Ok(hits
            .into_iter()
            .map(|(id, title)| {
                let secs = durations.get(&id).copied().unwrap_or(0);
                MediaItem::new(format!("https://www.youtube.com/watch?v={id}"), title, secs)
            })
            .collect())
    }
}
