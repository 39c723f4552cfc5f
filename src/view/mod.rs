pub mod popover;

use thiserror::Error;
use tracing::warn;

use crate::catalog::{PageBatch, Record};
use crate::fetcher::FetchError;
use crate::selection::{SelectionRequest, SelectionResult, ValidationError};

use self::popover::{PointerEvents, Popover};

/// Things on screen a pointer can land on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    TitleHeader,
    CountInput,
    SubmitButton,
    Row(u64),
    Paginator,
    Elsewhere,
}

impl Target {
    fn inside_count_popover(&self) -> bool {
        matches!(self, Target::CountInput | Target::SubmitButton)
    }
}

/// A page the table wants loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub rows: u32,
}

/// Handed out when a selection run starts; the result is only applied while
/// the ticket is still current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("a selection is already being collected")]
    InFlight,
}

#[derive(Debug)]
pub enum SelectionOutcome {
    Applied { selected: usize },
    Discarded,
    Failed(FetchError),
}

/// State of the paginated catalog table.
///
/// Pagination (page, rows per page, displayed records) and the selection are
/// tracked independently. Page turns and selection edits supersede any
/// selection run still in flight; its result is discarded when it arrives.
pub struct TableState {
    page: u32,
    rows: u32,
    records: Vec<Record>,
    total_records: u64,
    loading: bool,
    selection: Vec<Record>,
    select_count: usize,
    generation: u64,
    in_flight: Option<u64>,
    events: PointerEvents<Target>,
    count_popover: Popover<Target>,
}

impl TableState {
    pub fn new(page: u32, rows: u32) -> Self {
        Self {
            page: page.max(1),
            rows: rows.max(1),
            records: Vec::new(),
            total_records: 0,
            loading: false,
            selection: Vec::new(),
            select_count: 0,
            generation: 0,
            in_flight: None,
            events: PointerEvents::default(),
            count_popover: Popover::default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page_count(&self) -> u64 {
        self.total_records.div_ceil(u64::from(self.rows))
    }

    pub fn first_row_index(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.rows)
    }

    // -- pagination

    /// Moves to `page` with `rows` per page and returns the page to load.
    pub fn go_to(&mut self, page: u32, rows: u32) -> PageRequest {
        self.page = page.max(1);
        self.rows = rows.max(1);
        self.loading = true;
        self.supersede();
        PageRequest {
            page: self.page,
            rows: self.rows,
        }
    }

    pub fn current_page(&mut self) -> PageRequest {
        self.go_to(self.page, self.rows)
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        if u64::from(self.page) >= self.page_count() {
            return None;
        }
        Some(self.go_to(self.page + 1, self.rows))
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        if self.page <= 1 {
            return None;
        }
        Some(self.go_to(self.page - 1, self.rows))
    }

    /// Changes rows per page, keeping the first visible row on screen.
    pub fn set_rows(&mut self, rows: u32) -> PageRequest {
        let rows = rows.max(1);
        let page = self.first_row_index() / u64::from(rows) + 1;
        self.go_to(u32::try_from(page).unwrap_or(u32::MAX), rows)
    }

    /// Stores a loaded page. Pages that no longer match the table's position
    /// are ignored; returns whether the batch was shown.
    pub fn apply_page(&mut self, request: PageRequest, batch: PageBatch) -> bool {
        if request.page != self.page || request.rows != self.rows {
            return false;
        }
        self.records = batch.records;
        self.total_records = batch.total;
        self.loading = false;
        true
    }

    /// The displayed rows stay as they were.
    pub fn page_failed(&mut self) {
        self.loading = false;
    }

    // -- selection

    pub fn selection(&self) -> &[Record] {
        &self.selection
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selection.iter().any(|r| r.id == id)
    }

    /// Flips the checkbox of a displayed row. Returns the new state, or `None`
    /// when the row is neither displayed nor selected.
    pub fn toggle(&mut self, id: u64) -> Option<bool> {
        if let Some(pos) = self.selection.iter().position(|r| r.id == id) {
            self.selection.remove(pos);
            self.supersede();
            return Some(false);
        }
        let record = self.records.iter().find(|r| r.id == id)?.clone();
        self.selection.push(record);
        self.supersede();
        Some(true)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.supersede();
    }

    pub fn select_count(&self) -> usize {
        self.select_count
    }

    pub fn set_select_count(&mut self, count: usize) {
        self.select_count = count;
    }

    pub fn selection_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a selection of `select_count` records from the first row of the
    /// current page. Refused while another run is in flight.
    pub fn begin_selection(&mut self) -> Result<(SelectionTicket, SelectionRequest), SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::InFlight);
        }
        let request = SelectionRequest::new(self.select_count, self.page, self.rows)?;
        self.generation += 1;
        self.in_flight = Some(self.generation);
        Ok((
            SelectionTicket {
                generation: self.generation,
            },
            request,
        ))
    }

    /// Applies the outcome of a run, unless something superseded it meanwhile.
    pub fn finish_selection(
        &mut self,
        ticket: SelectionTicket,
        result: Result<SelectionResult, FetchError>,
    ) -> SelectionOutcome {
        if self.in_flight != Some(ticket.generation) {
            warn!(
                generation = ticket.generation,
                current = self.generation,
                "discarding superseded selection"
            );
            return SelectionOutcome::Discarded;
        }
        self.in_flight = None;
        self.count_popover.close();
        match result {
            Ok(result) => {
                self.selection = result.into_records();
                SelectionOutcome::Applied {
                    selected: self.selection.len(),
                }
            }
            Err(e) => SelectionOutcome::Failed(e),
        }
    }

    fn supersede(&mut self) {
        if self.in_flight.take().is_some() {
            self.generation += 1;
        }
    }

    // -- select-count popover

    pub fn toggle_count_popover(&mut self) {
        if self.count_popover.sync() {
            self.count_popover.close();
        } else {
            self.count_popover
                .open(&self.events, Target::inside_count_popover);
        }
    }

    pub fn count_popover_open(&mut self) -> bool {
        self.count_popover.sync()
    }

    pub fn pointer_down(&mut self, target: Target) {
        self.events.pointer_down(&target);
        self.count_popover.sync();
    }
}
