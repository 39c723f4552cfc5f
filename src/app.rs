use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::browse;
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::fetcher::DEFAULT_API_URL;
use crate::output::{self, OutputFormat};
use crate::runner::{Options, RunResult, Runner};

fn print_banner() {
    const BANNER: &str = r#"
               __            __          __
  ____ ______/ /_________  / /__  _____/ /_
 / __ `/ ___/ __/ ___/ _ \/ / _ \/ ___/ __/
/ /_/ / /  / /_(__  )  __/ /  __/ /__/ /_
\__,_/_/   \__/____/\___/_/\___/\___/\__/
"#;
    print!("{}", BANNER);
    println!("       v{} - catalog page selector", env!("CARGO_PKG_VERSION"));
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn status_line(tag: colored::ColoredString, msg: &str) {
    println!("{}{}{} {}", "[".bold().white(), tag, "]".bold().white(), msg);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("artselect={level}"))),
        )
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    interactive: bool,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let api_url = args
        .api_url
        .or(cfg.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let page = args.page.or(cfg.page).unwrap_or(1);
    let rows = args.rows.or(cfg.rows).unwrap_or(5);
    let select = if args.interactive {
        None
    } else {
        args.select.or(cfg.select)
    };
    let rate = args.rate.or(cfg.rate).unwrap_or(5);
    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(10);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());
    let user_agent = args.user_agent.or(cfg.user_agent);

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text, json or xml"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        options: Options {
            api_url,
            page,
            rows,
            select,
            rate,
            timeout_seconds,
            proxy,
            user_agent,
        },
        interactive: args.interactive,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn spinner(message: String) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} :: [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(message);
    Ok(pb)
}

fn print_result(run: &RunConfig, result: &RunResult) {
    let selected_ids = result
        .selection
        .as_ref()
        .map(|s| s.ids())
        .unwrap_or_default();
    print!(
        "{}",
        output::render_table(&result.page.records, |id| selected_ids.contains(&id))
    );

    let page_count = result.page.total.div_ceil(u64::from(run.options.rows));
    println!();
    status_line(
        "INF".bold().blue(),
        &format!(
            "page {} of {} ({} records)",
            run.options.page, page_count, result.page.total
        ),
    );

    if let (Some(requested), Some(selection)) = (run.options.select, result.selection.as_ref()) {
        status_line(
            "INF".bold().blue(),
            &format!("selected {} records", selection.len()),
        );
        if selection.len() < requested {
            status_line(
                "WRN".bold().yellow(),
                &format!(
                    "catalog ended after {} of {} requested records",
                    selection.len(),
                    requested
                ),
            );
        }
        println!(":: ids: {}", selection.ids().iter().join(","));
    }
}

async fn write_output(run: &RunConfig, result: &RunResult) -> Result<(), String> {
    let Some(path) = run.output.as_deref() else {
        return Ok(());
    };
    let records = match result.selection.as_ref() {
        Some(selection) => output::build_records(selection.records(), |_| true),
        None => output::build_records(&result.page.records, |_| false),
    };
    let contents = output::render(run.output_format, &records);
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| format!("failed to write output '{path}': {e}"))?;
    status_line(
        "INF".bold().blue(),
        &format!("wrote {} records to {path}", records.len()),
    );
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    format_kv_line("API", &run.options.api_url);
    format_kv_line("Page", &run.options.page.to_string());
    format_kv_line("Rows", &run.options.rows.to_string());
    if let Some(select) = run.options.select {
        format_kv_line("Select", &select.to_string());
    }
    format_kv_line("Rate", &format!("{}/s", run.options.rate));
    if let Some(output) = run.output.as_deref() {
        format_kv_line("Output", output);
    }
    println!();

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;

    if run.interactive {
        let options = runner.options();
        return browse::run(runner.fetcher(), options.page, options.rows).await;
    }

    let message = match run.options.select {
        Some(n) => format!("loading page {} and collecting {n} records", run.options.page),
        None => format!("loading page {}", run.options.page),
    };
    let pb = spinner(message)?;
    let result = runner.run().await;
    pb.finish_and_clear();
    let result = result.map_err(|e| e.to_string())?;

    print_result(&run, &result);
    write_output(&run, &result).await?;

    println!();
    println!(
        ":: Completed :: took {}ms ::",
        result.elapsed.as_millis()
    );
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", CliArgs::command().render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine a config path, use --config".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!("wrote default config to {}", path.display());
        } else {
            println!("config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    tracing::debug!(verbose = run.verbose, interactive = run.interactive, "starting");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_without_config() {
        let args = CliArgs::parse_from(["artselect"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(run.options.api_url, DEFAULT_API_URL);
        assert_eq!(run.options.page, 1);
        assert_eq!(run.options.rows, 5);
        assert_eq!(run.options.select, None);
        assert_eq!(run.output_format, OutputFormat::Text);
        assert!(!run.no_color);
    }

    #[test]
    fn cli_overrides_config() {
        let args = CliArgs::parse_from(["artselect", "--page", "3", "-s", "12"]);
        let cfg = ConfigFile {
            page: Some(7),
            rows: Some(20),
            select: Some(2),
            no_color: Some(true),
            ..ConfigFile::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.options.page, 3);
        assert_eq!(run.options.rows, 20);
        assert_eq!(run.options.select, Some(12));
        assert!(run.no_color);
    }

    #[test]
    fn output_format_is_inferred_from_extension() {
        let args = CliArgs::parse_from(["artselect", "-o", "picked.json"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(run.output_format, OutputFormat::Json);

        let args = CliArgs::parse_from(["artselect", "-o", "picked.json", "--format", "xml"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert_eq!(run.output_format, OutputFormat::Xml);
    }

    #[test]
    fn invalid_config_format_is_reported() {
        let args = CliArgs::parse_from(["artselect"]);
        let cfg = ConfigFile {
            output_format: Some("html".to_string()),
            ..ConfigFile::default()
        };
        assert!(build_run_config(args, cfg).is_err());
    }

    #[test]
    fn interactive_ignores_configured_select() {
        let args = CliArgs::parse_from(["artselect", "-I"]);
        let cfg = ConfigFile {
            select: Some(9),
            ..ConfigFile::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert!(run.interactive);
        assert_eq!(run.options.select, None);
    }
}
