use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oaiharvest", version)]
#[command(about = "Harvest records from an OAI-PMH provider", long_about = None)]
pub struct Cli {
    /// OAI-PMH provider(s) from which to harvest: a base URL, a record dump,
    /// or the name of a configured provider
    #[arg(required = true, num_args = 1..)]
    pub provider: Vec<String>,

    /// Metadata format to harvest (default: the provider's, then "oai_dc")
    #[arg(short = 'p', long = "metadataPrefix", value_name = "METADATAPREFIX")]
    pub metadata_prefix: Option<String>,

    /// Harvest only records added/modified on or after this date
    #[arg(short = 'f', long = "from", value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Harvest only records added/modified up to this date
    #[arg(short = 'u', long = "until", value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub until: Option<NaiveDate>,

    /// Harvest only records in this set
    #[arg(short = 's', long = "set", value_name = "SETSPEC")]
    pub set: Option<String>,

    /// Where to output files for harvested records
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Store records in sub-directories; with a MARKER, that character in
    /// identifiers starts a new directory level (`--subdirs=:`)
    #[arg(long, value_name = "MARKER", num_args = 0..=1, require_equals = true)]
    pub subdirs: Option<Option<String>>,

    /// Store metadata as received, without resolving character references
    #[arg(long)]
    pub no_resolve_entities: bool,

    /// Keep harvesting when a record fails, and report failures at the end
    #[arg(long)]
    pub keep_going: bool,

    /// Number of records to write concurrently
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Directory holding config.json (default: the platform config directory)
    #[arg(long, value_name = "DIR", env = "OAIHARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("expected a date as YYYY-MM-DD, got {:?}", value))
}
