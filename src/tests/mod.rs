use std::io;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::{PageBatch, Record};
use crate::fetcher::{FetchError, PageFetcher};
use crate::selection::{SelectionAccumulator, SelectionRequest};
use crate::view::{SelectionOutcome, TableState};

#[derive(Clone, Copy)]
enum Failure {
    Transport,
    Malformed,
}

// serves pages out of an in-memory catalog with ids 1..=len
struct CatalogFetcher {
    dataset: Vec<Record>,
    calls: Mutex<Vec<u32>>,
    fail_on: Option<(u32, Failure)>,
}

impl CatalogFetcher {
    fn new(len: u64) -> Self {
        Self {
            dataset: (1..=len).map(record).collect(),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    fn failing(len: u64, page: u32, failure: Failure) -> Self {
        Self {
            fail_on: Some((page, failure)),
            ..Self::new(len)
        }
    }

    fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for CatalogFetcher {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError> {
        self.calls.lock().unwrap().push(page);
        match self.fail_on {
            Some((p, Failure::Transport)) if p == page => {
                return Err(FetchError::Transport {
                    page,
                    source: Box::new(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                })
            }
            Some((p, Failure::Malformed)) if p == page => {
                return Err(FetchError::MalformedResponse {
                    page,
                    reason: "missing field `data`".to_string(),
                })
            }
            _ => {}
        }
        let start = (page as usize - 1) * page_size as usize;
        let records = self
            .dataset
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(PageBatch {
            records,
            total: self.dataset.len() as u64,
        })
    }
}

// every page is full, however far the caller pages
struct EndlessFetcher {
    calls: Mutex<Vec<u32>>,
}

#[async_trait]
impl PageFetcher for EndlessFetcher {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<PageBatch, FetchError> {
        self.calls.lock().unwrap().push(page);
        Ok(PageBatch {
            records: (0..u64::from(page_size)).map(record).collect(),
            total: u64::MAX,
        })
    }
}

fn record(id: u64) -> Record {
    Record {
        id,
        title: format!("work {id}"),
        place_of_origin: "Chicago".to_string(),
        artist_display: format!("artist {id}"),
        inscriptions: String::new(),
        date_start: Some(1900 + id as i64),
        date_end: Some(1901 + id as i64),
    }
}

fn request(count: usize, start: u32, size: u32) -> SelectionRequest {
    SelectionRequest::new(count, start, size).unwrap()
}

#[tokio::test]
async fn twelve_of_twenty_fetches_three_pages() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(12, 1, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![1, 2, 3]);
    assert_eq!(result.ids(), (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn short_page_ends_the_run() {
    let fetcher = CatalogFetcher::new(8);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(12, 1, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![1, 2]);
    assert_eq!(result.len(), 8);
    assert_eq!(result.ids(), (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn catalog_ending_on_a_page_boundary_costs_an_empty_fetch() {
    let fetcher = CatalogFetcher::new(10);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(12, 1, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![1, 2, 3]);
    assert_eq!(result.len(), 10);
}

#[tokio::test]
async fn count_within_first_page_fetches_once() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(3, 1, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![1]);
    assert_eq!(result.ids(), vec![1, 2, 3]);
}

#[tokio::test]
async fn selection_starts_at_the_first_row_of_start_page() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(7, 3, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![3, 4]);
    assert_eq!(result.ids(), (11..=17).collect::<Vec<_>>());
}

#[tokio::test]
async fn start_page_past_the_end_selects_nothing() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator.accumulate(&request(4, 9, 5)).await.unwrap();

    assert_eq!(fetcher.calls(), vec![9]);
    assert!(result.is_empty());
}

#[tokio::test]
async fn result_length_is_min_of_request_and_remaining() {
    for page_size in 1..=7u32 {
        for count in 1..=25usize {
            let fetcher = CatalogFetcher::new(20);
            let accumulator = SelectionAccumulator::new(&fetcher);

            let result = accumulator
                .accumulate(&request(count, 1, page_size))
                .await
                .unwrap();

            let expected: Vec<u64> = (1..=count.min(20) as u64).collect();
            assert_eq!(result.ids(), expected, "count {count}, page size {page_size}");
            let pages = fetcher.calls();
            assert_eq!(pages, (1..=pages.len() as u32).collect::<Vec<_>>());
        }
    }
}

#[tokio::test]
async fn last_addressable_page_ends_the_run() {
    let fetcher = EndlessFetcher {
        calls: Mutex::new(Vec::new()),
    };
    let accumulator = SelectionAccumulator::new(&fetcher);

    let result = accumulator
        .accumulate(&request(2, u32::MAX, 1))
        .await
        .unwrap();

    assert_eq!(*fetcher.calls.lock().unwrap(), vec![u32::MAX]);
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn transport_failure_mid_run_returns_no_records() {
    let fetcher = CatalogFetcher::failing(20, 2, Failure::Transport);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let err = accumulator.accumulate(&request(12, 1, 5)).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.page(), 2);
    assert_eq!(fetcher.calls(), vec![1, 2]);
}

#[tokio::test]
async fn malformed_page_is_passed_through() {
    let fetcher = CatalogFetcher::failing(20, 3, Failure::Malformed);
    let accumulator = SelectionAccumulator::new(&fetcher);

    let err = accumulator.accumulate(&request(15, 1, 5)).await.unwrap_err();

    match err {
        FetchError::MalformedResponse { page, reason } => {
            assert_eq!(page, 3);
            assert_eq!(reason, "missing field `data`");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn repeated_runs_return_the_same_selection() {
    let fetcher = CatalogFetcher::new(23);
    let accumulator = SelectionAccumulator::new(&fetcher);
    let req = request(17, 2, 4);

    let first = accumulator.accumulate(&req).await.unwrap();
    let second = accumulator.accumulate(&req).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.ids(), (5..=21).collect::<Vec<_>>());
}

#[tokio::test]
async fn page_turn_discards_the_running_selection() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);
    let mut table = TableState::new(1, 5);

    table.set_select_count(12);
    let (stale_ticket, stale_request) = table.begin_selection().unwrap();
    table.go_to(2, 5);
    let stale = accumulator.accumulate(&stale_request).await;

    assert!(matches!(
        table.finish_selection(stale_ticket, stale),
        SelectionOutcome::Discarded
    ));
    assert!(table.selection().is_empty());
    assert!(!table.selection_in_flight());
}

#[tokio::test]
async fn last_submission_wins() {
    let fetcher = CatalogFetcher::new(20);
    let accumulator = SelectionAccumulator::new(&fetcher);
    let mut table = TableState::new(1, 5);

    table.set_select_count(3);
    let (first_ticket, first_request) = table.begin_selection().unwrap();
    table.go_to(3, 5);
    table.set_select_count(2);
    let (second_ticket, second_request) = table.begin_selection().unwrap();

    let second = accumulator.accumulate(&second_request).await;
    assert!(matches!(
        table.finish_selection(second_ticket, second),
        SelectionOutcome::Applied { selected: 2 }
    ));

    let first = accumulator.accumulate(&first_request).await;
    assert!(matches!(
        table.finish_selection(first_ticket, first),
        SelectionOutcome::Discarded
    ));

    let ids: Vec<u64> = table.selection().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![11, 12]);
}

#[tokio::test]
async fn editing_the_selection_supersedes_a_running_one() {
    let fetcher = CatalogFetcher::new(20);
    let mut table = TableState::new(1, 5);
    let page = table.current_page();
    let batch = fetcher.fetch(page.page, page.rows).await.unwrap();
    table.apply_page(page, batch);

    table.set_select_count(8);
    let (ticket, req) = table.begin_selection().unwrap();
    table.toggle(4);
    let result = SelectionAccumulator::new(&fetcher).accumulate(&req).await;

    assert!(matches!(
        table.finish_selection(ticket, result),
        SelectionOutcome::Discarded
    ));
    let ids: Vec<u64> = table.selection().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![4]);
}
