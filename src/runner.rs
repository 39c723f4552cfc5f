use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::catalog::PageBatch;
use crate::fetcher::{FetchError, HttpPageFetcher, PageFetcher, DEFAULT_API_URL};
use crate::selection::{SelectionAccumulator, SelectionRequest, SelectionResult, ValidationError};

pub const DEFAULT_USER_AGENT: &str = concat!("artselect/", env!("CARGO_PKG_VERSION"));

/// The catalog endpoint refuses larger `limit` values.
pub const MAX_ROWS: u32 = 100;

#[derive(Clone, Debug)]
pub struct Options {
    pub api_url: String,
    /// 1-based page to display.
    pub page: u32,
    /// Records per page.
    pub rows: u32,
    /// Select this many records starting with the first row of `page`.
    pub select: Option<usize>,
    pub rate: u32,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page: 1,
            rows: 5,
            select: None,
            rate: 5,
            timeout_seconds: 10,
            proxy: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("invalid {name}: {message}")]
    InvalidOption {
        name: &'static str,
        message: String,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Clone, Debug)]
pub struct RunResult {
    pub started_at: Instant,
    pub elapsed: Duration,
    pub page: PageBatch,
    pub selection: Option<SelectionResult>,
}

#[derive(Debug)]
pub struct Runner {
    options: Options,
    fetcher: Arc<HttpPageFetcher>,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        let api_url =
            reqwest::Url::parse(&options.api_url).map_err(|_| RunnerError::InvalidUrl {
                url: options.api_url.clone(),
            })?;
        if options.page == 0 {
            return Err(RunnerError::InvalidOption {
                name: "page",
                message: "expected a positive page number".to_string(),
            });
        }
        if options.rows == 0 || options.rows > MAX_ROWS {
            return Err(RunnerError::InvalidOption {
                name: "rows",
                message: format!("expected 1 to {MAX_ROWS}, got {}", options.rows),
            });
        }
        if options.select == Some(0) {
            return Err(ValidationError::ZeroRequestedCount.into());
        }
        if options.timeout_seconds == 0 {
            return Err(RunnerError::InvalidOption {
                name: "timeout",
                message: "expected a positive number of seconds".to_string(),
            });
        }
        let rate = NonZeroU32::new(options.rate).ok_or_else(|| RunnerError::InvalidOption {
            name: "rate",
            message: "expected a positive number of requests per second".to_string(),
        })?;

        let client = build_client(
            options.proxy.as_deref(),
            options.user_agent.as_deref(),
            options.timeout_seconds,
        )?;
        let fetcher = Arc::new(HttpPageFetcher::new(client, api_url, rate));
        Ok(Self { options, fetcher })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn fetcher(&self) -> Arc<HttpPageFetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn accumulator(&self) -> SelectionAccumulator<Arc<HttpPageFetcher>> {
        SelectionAccumulator::new(self.fetcher())
    }

    /// Loads the configured page and, when a count is set, collects the
    /// selection starting at that page.
    pub async fn run(&self) -> Result<RunResult, RunnerError> {
        let started_at = Instant::now();

        let page = self
            .fetcher
            .fetch(self.options.page, self.options.rows)
            .await?;
        info!(
            page = self.options.page,
            rows = page.len(),
            total = page.total,
            "page loaded"
        );

        let selection = match self.options.select {
            Some(count) => {
                let request = SelectionRequest::new(count, self.options.page, self.options.rows)?;
                Some(self.accumulator().accumulate(&request).await?)
            }
            None => None,
        };

        Ok(RunResult {
            started_at,
            elapsed: started_at.elapsed(),
            page,
            selection,
        })
    }
}

fn build_client(
    proxy: Option<&str>,
    user_agent: Option<&str>,
    timeout_seconds: usize,
) -> Result<reqwest::Client, RunnerError> {
    let user_agent = user_agent
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or(DEFAULT_USER_AGENT);

    let timeout = Duration::from_secs(timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(timeout);

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| RunnerError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| RunnerError::HttpClientBuild { source: e })
}
