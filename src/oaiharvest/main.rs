use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use oaiharvest::config::{HarvestConfig, ResolvedProvider, StoreConfig, SubdirMode};
use oaiharvest::error::{HarvestError, Result};
use oaiharvest::harvest::{DirectoryHarvester, FailurePolicy, HarvestReport, Harvester};
use oaiharvest::source::{self, ListRecordsRequest, RecordSource};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod args;
use args::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// One provider, fully resolved before anything is harvested.
struct Job {
    source: Box<dyn RecordSource>,
    request: ListRecordsRequest,
    store: StoreConfig,
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let root = absolute(&cli.dir)?;
    let subdirs = cli
        .subdirs
        .as_ref()
        .map(|marker| SubdirMode::from_marker(marker.as_deref()))
        .transpose()?;

    let jobs = cli
        .provider
        .iter()
        .map(|reference| plan(&cli, &config, &root, subdirs, reference))
        .collect::<Result<Vec<_>>>()?;

    let policy = if cli.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::FailFast
    };

    let mut failed = 0;
    for job in jobs {
        let harvester = DirectoryHarvester::in_directory(job.store)
            .with_policy(policy)
            .with_jobs(cli.jobs);
        let report = harvester.harvest(job.source.as_ref(), &job.request)?;
        print_report(&job.request, &report);
        failed += report.failures.len();
    }

    if failed > 0 {
        return Err(HarvestError::Source(format!(
            "{} record(s) could not be harvested",
            failed
        )));
    }
    Ok(())
}

fn plan(
    cli: &Cli,
    config: &HarvestConfig,
    root: &Path,
    subdirs: Option<SubdirMode>,
    reference: &str,
) -> Result<Job> {
    let provider = config.resolve(reference)?;
    let metadata_prefix = config.metadata_prefix_for(cli.metadata_prefix.as_deref(), &provider);
    let request = ListRecordsRequest::new(provider.base_url.clone(), metadata_prefix)
        .with_from(cli.from)
        .with_until(cli.until)
        .with_set(cli.set.clone());
    request.validate()?;

    let source = source::source_for(&provider.base_url)?;
    let store = store_config(cli, root, subdirs, &provider);
    Ok(Job {
        source,
        request,
        store,
    })
}

/// Command-line flags win over provider settings, which win over defaults.
fn store_config(
    cli: &Cli,
    root: &Path,
    subdirs: Option<SubdirMode>,
    provider: &ResolvedProvider,
) -> StoreConfig {
    let settings = provider.settings.as_ref();
    let subdirs = subdirs
        .or_else(|| settings.and_then(|p| p.subdirs))
        .unwrap_or_default();
    let resolve_entities = !cli.no_resolve_entities
        && settings.and_then(|p| p.resolve_entities).unwrap_or(true);

    StoreConfig::new(root)
        .with_subdirs(subdirs)
        .with_resolve_entities(resolve_entities)
}

fn load_config(dir: Option<&Path>) -> Result<HarvestConfig> {
    if let Some(dir) = dir {
        return HarvestConfig::load(dir);
    }
    match ProjectDirs::from("org", "oaiharvest", "oaiharvest") {
        Some(dirs) => HarvestConfig::load(dirs.config_dir()),
        None => Ok(HarvestConfig::default()),
    }
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| HarvestError::io(dir, e))?;
    Ok(cwd.join(dir))
}

fn print_report(request: &ListRecordsRequest, report: &HarvestReport) {
    let mark = if report.is_clean() {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "{} {} ({}): {} written, {} without metadata, {} deleted",
        mark,
        request.base_url.bold(),
        request.metadata_prefix,
        report.written,
        report.skipped,
        report.deleted
    );
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.identifier.as_deref().unwrap_or("<unreadable record>"),
            failure.message.dimmed()
        );
    }
}
