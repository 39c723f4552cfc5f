use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetcher::{FetchError, PageFetcher};
use crate::output;
use crate::runner::MAX_ROWS;
use crate::selection::{SelectionAccumulator, SelectionResult};
use crate::view::{PageRequest, SelectionOutcome, SelectionTicket, SubmitError, TableState, Target};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Goto(u32),
    Rows(u32),
    OpenSelect,
    Count(usize),
    Select(usize),
    Toggle(u64),
    Clear,
    Show,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next()?;
        let arg = parts.next();
        let unknown = || Command::Unknown(line.trim().to_string());
        let cmd = match (head.to_lowercase().as_str(), arg) {
            ("n" | "next", None) => Command::Next,
            ("p" | "prev", None) => Command::Previous,
            ("g" | "goto", Some(a)) => a.parse().map(Command::Goto).unwrap_or_else(|_| unknown()),
            ("rows", Some(a)) => a.parse().map(Command::Rows).unwrap_or_else(|_| unknown()),
            ("select", None) => Command::OpenSelect,
            ("select", Some(a)) => a.parse().map(Command::Select).unwrap_or_else(|_| unknown()),
            ("t" | "toggle", Some(a)) => a.parse().map(Command::Toggle).unwrap_or_else(|_| unknown()),
            ("clear", None) => Command::Clear,
            ("show", None) => Command::Show,
            ("h" | "help" | "?", None) => Command::Help,
            ("q" | "quit" | "exit", None) => Command::Quit,
            (n, None) => n.parse().map(Command::Count).unwrap_or_else(|_| unknown()),
            _ => unknown(),
        };
        Some(cmd)
    }

    /// Where this command "clicks" in the table.
    pub fn target(&self) -> Target {
        match self {
            Command::Next | Command::Previous | Command::Goto(_) | Command::Rows(_) => {
                Target::Paginator
            }
            Command::OpenSelect | Command::Select(_) => Target::TitleHeader,
            Command::Count(_) => Target::CountInput,
            Command::Toggle(id) => Target::Row(*id),
            Command::Clear | Command::Show | Command::Help | Command::Quit | Command::Unknown(_) => {
                Target::Elsewhere
            }
        }
    }
}

const HELP: &str = "\
  n | p          next / previous page
  g <page>       go to page
  rows <n>       records per page
  select         open the select-rows popover, then type a number
  select <n>     select the first n records from this page on
  t <id>         toggle a row
  clear          clear the selection
  show           redraw the table
  q              quit";

type Finished = (SelectionTicket, Result<SelectionResult, FetchError>);

fn info_line(msg: &str) {
    println!("{}{}{} {}", "[".bold().white(), "INF".bold().blue(), "]".bold().white(), msg);
}

fn warn_line(msg: &str) {
    println!("{}{}{} {}", "[".bold().white(), "WRN".bold().yellow(), "]".bold().white(), msg);
}

fn error_line(msg: &str) {
    println!("{}{}{} {}", "[".bold().white(), "ERR".bold().red(), "]".bold().white(), msg);
}

fn draw(table: &mut TableState) {
    println!();
    print!(
        "{}",
        output::render_table(table.records(), |id| table.is_selected(id))
    );
    println!(
        ":: page {}/{} :: {} rows per page :: {} records :: {} selected{}",
        table.page(),
        table.page_count().max(1),
        table.rows(),
        table.total_records(),
        table.selection().len(),
        if table.selection_in_flight() {
            " :: collecting…"
        } else {
            ""
        }
    );
    if table.count_popover_open() {
        println!("{}", "rows to select (number, then enter):".bold().white());
    }
}

async fn load_page<F: PageFetcher>(fetcher: &F, table: &mut TableState, request: PageRequest) {
    match fetcher.fetch(request.page, request.rows).await {
        Ok(batch) => {
            let empty = batch.is_empty();
            if table.apply_page(request, batch) && empty {
                warn_line(&format!("no records on page {}", request.page));
            }
        }
        Err(e) => {
            table.page_failed();
            error_line(&format!("failed to fetch data: {e}"));
        }
    }
}

fn submit<F: PageFetcher + 'static>(
    fetcher: &Arc<F>,
    table: &mut TableState,
    done: &mpsc::Sender<Finished>,
) -> Option<JoinHandle<()>> {
    match table.begin_selection() {
        Ok((ticket, request)) => {
            info_line(&format!(
                "collecting {} records from page {}",
                request.requested_count(),
                request.start_page()
            ));
            let accumulator = SelectionAccumulator::new(Arc::clone(fetcher));
            let done = done.clone();
            Some(tokio::spawn(async move {
                let result = accumulator.accumulate(&request).await;
                let _ = done.send((ticket, result)).await;
            }))
        }
        Err(SubmitError::InFlight) => {
            warn_line("a selection is still being collected, wait for it to finish");
            None
        }
        Err(e) => {
            error_line(&e.to_string());
            None
        }
    }
}

/// Stops the spawned run once the table no longer waits for it; page turns
/// and selection edits supersede a run. Returns the aborted handle.
fn abort_superseded(
    table: &TableState,
    running: &mut Option<JoinHandle<()>>,
) -> Option<JoinHandle<()>> {
    if table.selection_in_flight() {
        return None;
    }
    let handle = running.take()?;
    debug!("aborting superseded selection");
    handle.abort();
    Some(handle)
}

/// Interactive table session on stdin/stdout. Returns when the user quits or
/// stdin closes.
pub async fn run<F: PageFetcher + 'static>(
    fetcher: Arc<F>,
    page: u32,
    rows: u32,
) -> Result<(), String> {
    let mut table = TableState::new(page, rows);
    let request = table.current_page();
    load_page(&*fetcher, &mut table, request).await;
    draw(&mut table);
    println!("type 'help' for commands");

    let (done_tx, mut done_rx) = mpsc::channel::<Finished>(1);
    let mut running: Option<JoinHandle<()>> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| format!("failed to read input: {e}"))?;
                let Some(line) = line else { break };
                let Some(command) = Command::parse(&line) else { continue };
                if command == Command::Quit {
                    break;
                }
                handle(command, &fetcher, &mut table, &done_tx, &mut running).await;
                abort_superseded(&table, &mut running);
            }
            Some((ticket, result)) = done_rx.recv() => {
                match table.finish_selection(ticket, result) {
                    SelectionOutcome::Applied { selected } => {
                        running = None;
                        info_line(&format!("selected {selected} records"));
                        draw(&mut table);
                    }
                    SelectionOutcome::Discarded => {}
                    SelectionOutcome::Failed(e) => {
                        running = None;
                        error_line(&format!("selection failed: {e}"));
                    }
                }
            }
        }
    }

    if let Some(handle) = running.take() {
        handle.abort();
    }
    Ok(())
}

async fn handle<F: PageFetcher + 'static>(
    command: Command,
    fetcher: &Arc<F>,
    table: &mut TableState,
    done: &mpsc::Sender<Finished>,
    running: &mut Option<JoinHandle<()>>,
) {
    table.pointer_down(command.target());

    let page_request = match command {
        Command::Next => table.next_page(),
        Command::Previous => table.previous_page(),
        Command::Goto(page) => {
            let last = table.page_count();
            if page == 0 || (last > 0 && u64::from(page) > last) {
                warn_line(&format!("no such page {page}"));
                None
            } else {
                Some(table.go_to(page, table.rows()))
            }
        }
        Command::Rows(rows) => {
            if rows == 0 || rows > MAX_ROWS {
                warn_line(&format!("rows must be between 1 and {MAX_ROWS}"));
                None
            } else {
                Some(table.set_rows(rows))
            }
        }
        Command::OpenSelect => {
            if !table.count_popover_open() {
                table.toggle_count_popover();
            }
            draw(table);
            None
        }
        Command::Count(count) => {
            if table.count_popover_open() {
                table.set_select_count(count);
                table.pointer_down(Target::SubmitButton);
                if let Some(handle) = submit(fetcher, table, done) {
                    *running = Some(handle);
                }
            } else {
                warn_line("open the popover with 'select' first, or use 'select <n>'");
            }
            None
        }
        Command::Select(count) => {
            if !table.count_popover_open() {
                table.toggle_count_popover();
            }
            table.set_select_count(count);
            table.pointer_down(Target::SubmitButton);
            if let Some(handle) = submit(fetcher, table, done) {
                *running = Some(handle);
            }
            None
        }
        Command::Toggle(id) => {
            match table.toggle(id) {
                Some(_) => draw(table),
                None => warn_line(&format!("record {id} is not on this page")),
            }
            None
        }
        Command::Clear => {
            table.clear_selection();
            draw(table);
            None
        }
        Command::Show => {
            draw(table);
            None
        }
        Command::Help => {
            println!("{HELP}");
            None
        }
        Command::Quit => None,
        Command::Unknown(raw) => {
            warn_line(&format!("unknown command '{raw}', type 'help'"));
            None
        }
    };

    if let Some(request) = page_request {
        load_page(&**fetcher, table, request).await;
        draw(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("n"), Some(Command::Next));
        assert_eq!(Command::parse("  g 12 "), Some(Command::Goto(12)));
        assert_eq!(Command::parse("rows 10"), Some(Command::Rows(10)));
        assert_eq!(Command::parse("select"), Some(Command::OpenSelect));
        assert_eq!(Command::parse("select 40"), Some(Command::Select(40)));
        assert_eq!(Command::parse("12"), Some(Command::Count(12)));
        assert_eq!(Command::parse("t 27992"), Some(Command::Toggle(27992)));
        assert_eq!(Command::parse("Q"), Some(Command::Quit));
        assert_eq!(Command::parse(""), None);
        assert_eq!(
            Command::parse("g x"),
            Some(Command::Unknown("g x".to_string()))
        );
    }

    #[test]
    fn only_count_entry_lands_inside_the_popover() {
        assert_eq!(Command::Count(3).target(), Target::CountInput);
        assert_eq!(Command::Next.target(), Target::Paginator);
        assert_eq!(Command::Toggle(9).target(), Target::Row(9));
        assert_eq!(Command::Show.target(), Target::Elsewhere);
    }

    #[tokio::test]
    async fn page_turn_aborts_the_running_selection() {
        let mut table = TableState::new(1, 5);
        let mut running = Some(tokio::spawn(std::future::pending::<()>()));

        table.set_select_count(12);
        table.begin_selection().unwrap();
        assert!(abort_superseded(&table, &mut running).is_none());
        assert!(running.is_some());

        table.go_to(2, 5);
        let aborted = abort_superseded(&table, &mut running).unwrap();

        assert!(running.is_none());
        assert!(aborted.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn finished_selection_leaves_nothing_to_abort() {
        let table = TableState::new(1, 5);
        let mut running = None;

        assert!(abort_superseded(&table, &mut running).is_none());
    }
}
