use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Record;
use crate::fetcher::{FetchError, PageFetcher};

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("requested selection count must be positive")]
    ZeroRequestedCount,

    #[error("start page must be positive (pages are 1-based)")]
    ZeroStartPage,

    #[error("page size must be positive")]
    ZeroPageSize,
}

/// "Select the first `requested_count` records, beginning with the first record
/// of `start_page`, reading `page_size` records per request."
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRequest {
    requested_count: usize,
    start_page: u32,
    page_size: u32,
}

impl SelectionRequest {
    pub fn new(
        requested_count: usize,
        start_page: u32,
        page_size: u32,
    ) -> Result<Self, ValidationError> {
        if requested_count == 0 {
            return Err(ValidationError::ZeroRequestedCount);
        }
        if start_page == 0 {
            return Err(ValidationError::ZeroStartPage);
        }
        if page_size == 0 {
            return Err(ValidationError::ZeroPageSize);
        }
        Ok(Self {
            requested_count,
            start_page,
            page_size,
        })
    }

    pub fn requested_count(&self) -> usize {
        self.requested_count
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Records picked by one accumulation run, in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionResult {
    records: Vec<Record>,
}

impl SelectionResult {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Collects the leading records of the catalog across as many pages as a
/// request needs.
///
/// Pages are fetched one after the other, starting at the request's start page,
/// until either enough records were gathered or a page comes back shorter than
/// the page size. Any fetch failure aborts the run; no partial result is ever
/// returned. Nothing is kept between runs, so calling
/// [`accumulate`](Self::accumulate) twice against an unchanged catalog yields
/// the same records.
#[derive(Debug)]
pub struct SelectionAccumulator<F> {
    fetcher: F,
}

impl<F: PageFetcher> SelectionAccumulator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub async fn accumulate(
        &self,
        request: &SelectionRequest,
    ) -> Result<SelectionResult, FetchError> {
        let mut working: Vec<Record> = Vec::new();
        let mut page = request.start_page;
        let mut total: Option<u64> = None;
        let mut fetched_pages = 0u32;

        while working.len() < request.requested_count {
            let batch = self.fetcher.fetch(page, request.page_size).await?;
            fetched_pages += 1;
            match total {
                Some(t) if t != batch.total => {
                    debug!(page, before = t, after = batch.total, "catalog total changed mid-run");
                }
                _ => total = Some(batch.total),
            }

            let exhausted = batch.is_exhausted(request.page_size);
            working.extend(batch.records);
            if exhausted {
                debug!(page, collected = working.len(), "catalog exhausted");
                break;
            }
            // no page after u32::MAX can be addressed
            page = match page.checked_add(1) {
                Some(next) => next,
                None => {
                    debug!(page, collected = working.len(), "last addressable page reached");
                    break;
                }
            };
        }

        working.truncate(request.requested_count);
        info!(
            requested = request.requested_count,
            selected = working.len(),
            start_page = request.start_page,
            fetched_pages,
            "selection accumulated"
        );
        Ok(SelectionResult { records: working })
    }
}
