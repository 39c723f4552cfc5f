use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "artselect",
    version,
    about = "browse a paginated art-work catalog and select records across pages",
    long_about = "Artselect shows one page of an art-work catalog as a table and selects the first N records starting at that page, fetching as many further pages as needed.\n\nExamples:\n  artselect -p 3 -n 10\n  artselect -p 1 -n 5 -s 12\n  artselect -s 40 -o selection.json\n  artselect -I\n\nTip: Use --config to persist settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the selection (or the page, when nothing is selected) to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text, json, xml (inferred from --output extension when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.artselect/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a default config file to --config (or the default location) and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'a',
        long = "api",
        visible_alias = "api-url",
        value_name = "URL",
        help_heading = "Input",
        help = "Catalog listing endpoint."
    )]
    pub api_url: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Table",
        help = "Page to display (1-based)."
    )]
    pub page: Option<u32>,

    #[arg(
        short = 'n',
        long = "rows",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Table",
        help = "Records per page (1-100)."
    )]
    pub rows: Option<u32>,

    #[arg(
        short = 's',
        long = "sel",
        visible_alias = "select",
        value_name = "N",
        help_heading = "Table",
        help = "Select the first N records starting with the first row of the displayed page."
    )]
    pub select: Option<usize>,

    #[arg(
        short = 'I',
        long = "it",
        visible_alias = "interactive",
        help_heading = "Table",
        help = "Browse the catalog interactively."
    )]
    pub interactive: bool,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "HTTP",
        help = "Request rate limit (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Send requests through a proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "ua",
        visible_alias = "user-agent",
        value_name = "UA",
        help_heading = "HTTP",
        help = "User-Agent header sent with every request."
    )]
    pub user_agent: Option<String>,
}
