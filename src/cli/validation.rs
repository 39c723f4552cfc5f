use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::runner::MAX_ROWS;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if args.page == Some(0) {
        return Err("invalid page, expected positive integer".to_string());
    }
    if let Some(rows) = args.rows {
        if rows == 0 || rows > MAX_ROWS {
            return Err(format!("invalid rows {rows}, expected 1 to {MAX_ROWS}"));
        }
    }
    if args.select == Some(0) {
        return Err("invalid select, expected positive integer".to_string());
    }
    if args.rate == Some(0) {
        return Err("invalid rate, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --format '{raw}', expected text, json or xml"
            ));
        }
    }
    if args.interactive && args.select.is_some() {
        return Err("--select cannot be combined with --interactive".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        let mut full = vec!["artselect"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate(&parse(&[])).is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        assert!(validate(&parse(&["--page", "0"])).is_err());
        assert!(validate(&parse(&["--select", "0"])).is_err());
        assert!(validate(&parse(&["--rows", "0"])).is_err());
        assert!(validate(&parse(&["--rate", "0"])).is_err());
    }

    #[test]
    fn rejects_oversized_pages() {
        assert!(validate(&parse(&["-n", "101"])).is_err());
        assert!(validate(&parse(&["-n", "100"])).is_ok());
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(validate(&parse(&["--format", "yaml"])).is_err());
        assert!(validate(&parse(&["--format", "JSON"])).is_ok());
    }

    #[test]
    fn interactive_excludes_select() {
        assert!(validate(&parse(&["-I", "-s", "3"])).is_err());
    }
}
