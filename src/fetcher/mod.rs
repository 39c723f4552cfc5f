use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{self, PageBatch};

type PageRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub const DEFAULT_API_URL: &str = "https://api.artic.edu/api/v1/artworks";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure fetching page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },

    #[error("server answered HTTP {status} for page {page}")]
    HttpStatus { page: u32, status: u16 },

    #[error("malformed response for page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },
}

impl FetchError {
    /// Network and HTTP level failures, as opposed to bodies that could not be
    /// normalized.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::HttpStatus { .. })
    }

    pub fn page(&self) -> u32 {
        match self {
            Self::Transport { page, .. }
            | Self::HttpStatus { page, .. }
            | Self::MalformedResponse { page, .. } => *page,
        }
    }
}

/// Loads one page of the catalog.
///
/// `page` is 1-based and both arguments are at least 1. The returned batch keeps
/// the server order and never holds more than `page_size` records; fewer
/// records than `page_size` means there is no page after this one.
/// Implementations do not retry and do not cache.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError> {
        (**self).fetch(page, page_size).await
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError> {
        (**self).fetch(page, page_size).await
    }
}

/// [`PageFetcher`] backed by the catalog's HTTP listing endpoint
/// (`GET {api_url}?page=N&limit=M`).
pub struct HttpPageFetcher {
    client: reqwest::Client,
    api_url: Url,
    limiter: PageRateLimiter,
}

impl std::fmt::Debug for HttpPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client, api_url: Url, rate: NonZeroU32) -> Self {
        Self {
            client,
            api_url,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError> {
        self.limiter.until_ready().await;
        debug!(page, page_size, url = %self.api_url, "fetching page");

        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[("page", page), ("limit", page_size)])
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                page,
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                page,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            page,
            source: Box::new(e),
        })?;
        let batch = catalog::normalize_page(&body, page_size)
            .map_err(|reason| FetchError::MalformedResponse { page, reason })?;

        debug!(
            page,
            records = batch.len(),
            total = batch.total,
            "fetched page"
        );
        Ok(batch)
    }
}
