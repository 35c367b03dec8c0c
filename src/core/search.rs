//! Multi-source search
//!
//! Every requested source is searched concurrently. Adapters fail soft, so
//! a slow or broken provider only empties its own entry.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Source, Track};
use crate::sources::SourceRegistry;

const MAX_QUERY_LEN: usize = 200;

/// A validated search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub sources: Vec<Source>,
    pub limit: usize,
}

impl SearchRequest {
    /// Validate raw query parameters against the configured defaults
    pub fn parse(
        query: Option<&str>,
        sources: Option<&str>,
        limit: Option<usize>,
        config: &AppConfig,
    ) -> ApiResult<Self> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(ApiError::field("q", "Search query is required"));
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(ApiError::field(
                "q",
                format!("Search query must be at most {} characters", MAX_QUERY_LEN),
            ));
        }

        let sources = Source::parse_list(sources.unwrap_or(&config.default_sources));
        if sources.is_empty() {
            return Err(ApiError::field("sources", "No known sources requested"));
        }

        Ok(Self {
            query: query.to_string(),
            sources,
            limit: config.search_limit(limit),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: BTreeMap<Source, Vec<Track>>,
    pub total_results: usize,
}

impl SearchResponse {
    /// Every track across all sources
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.results.values().flatten()
    }
}

#[derive(Clone)]
pub struct SearchService {
    registry: SourceRegistry,
}

impl SearchService {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let searches = request.sources.iter().map(|&source| {
            let adapter = self.registry.get(source);
            async move {
                let tracks = match adapter {
                    Some(adapter) => adapter.search(&request.query, request.limit).await,
                    None => {
                        debug!("No adapter for {}, skipping", source);
                        Vec::new()
                    }
                };
                (source, tracks)
            }
        });

        let results: BTreeMap<Source, Vec<Track>> = join_all(searches).await.into_iter().collect();
        let total_results = results.values().map(Vec::len).sum();

        info!(
            "Search '{}' across {} sources: {} results",
            request.query,
            results.len(),
            total_results
        );

        SearchResponse {
            query: request.query.clone(),
            results,
            total_results,
        }
    }
}
