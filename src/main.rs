use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};

use scmlens::analyzers::{ages, co_changes, hot_spots, mass_changes};
use scmlens::config::{load_config, LensConfig};
use scmlens::pbar::DateProgress;
use scmlens::reporters::{json, terminal};
use scmlens::scm::git::GitLogCollector;
use scmlens::scm::svn::SvnLogCollector;
use scmlens::scm::{get_log, LogCollector, ProgressSink};
use scmlens::types::{LocRow, LogEntry};
use scmlens::SystemRunner;

#[derive(Parser, Debug)]
#[command(
    name = "scmlens",
    about = "🔎 Mine git/svn history for hot spots, coupling, and mass changes",
    version,
    long_about = "Turns your version-control log into change-frequency reports:\n\
                  hot spots (change count crossed with file size), co-change\n\
                  coupling, file ages, and mass-change revisions.\n\n\
                  Run it from inside a checkout, or point --path at one."
)]
struct Args {
    #[command(subcommand)]
    report: ReportKind,

    /// Path to the checkout to analyze.
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    /// Version control system: git, svn
    #[arg(long, global = true, default_value = "git")]
    vcs: String,

    /// Start of the date range, YYYY-MM-DD. Defaults to one year ago.
    #[arg(long, global = true)]
    after: Option<String>,

    /// End of the date range, YYYY-MM-DD. Defaults to the latest revision.
    #[arg(long, global = true)]
    before: Option<String>,

    /// Output format: terminal, json
    #[arg(long, global = true, default_value = "terminal")]
    format: String,

    /// Output file for --format json. Defaults to stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = 20)]
    top: usize,

    /// Optional .scmlens.yml config file. CLI flags win over its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the progress bar even on a TTY.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum ReportKind {
    /// Change counts crossed with lines of code per file.
    HotSpots {
        /// cloc-compatible line counter to run.
        #[arg(long, default_value = "cloc")]
        cloc_program: String,
    },
    /// Pairs of files that tend to change in the same revision.
    Coupling,
    /// Days since each file last changed.
    Ages,
    /// Revisions touching more than a threshold of files.
    MassChanges {
        #[arg(long, default_value_t = 50)]
        min_changes: usize,
    },
}

fn main() {
    env_logger::init();
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let explicit = ExplicitFlags::from_matches(&matches);
    if let Err(e) = run(args, &explicit) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(mut args: Args, explicit: &ExplicitFlags) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => LensConfig::default(),
    };
    apply_config(&mut args, &config, explicit);

    let after = args.after.as_deref().map(parse_date).transpose()?;
    let before = args.before.as_deref().map(parse_date).transpose()?;
    let now = Utc::now();

    let runner = SystemRunner::new(&args.path);
    let collector = build_collector(&args, &config, &runner)?;

    let mut progress = if !args.no_progress && std::io::stderr().is_terminal() {
        let (resolved_after, _) = scmlens::scm::handle_default_dates(after, before, now);
        Some(DateProgress::new(resolved_after, now))
    } else {
        None
    };
    let entries = get_log(
        collector.as_ref(),
        &runner,
        after,
        before,
        now,
        progress.as_mut().map(|p| p as &mut dyn ProgressSink),
    )?;
    if let Some(p) = &progress {
        p.finish();
    }
    if entries.is_empty() {
        return Err("No log entries in the requested range. Try --after".to_string());
    }

    match &args.report {
        ReportKind::HotSpots { cloc_program } => {
            let loc = count_lines(&runner, cloc_program, &args);
            let spots = hot_spots::hot_spots(&entries, &loc);
            match args.format.as_str() {
                "json" => json::write_json(&spots, args.output.as_deref())?,
                _ => terminal::report_hot_spots(&spots, args.top),
            }
        }
        ReportKind::Coupling => {
            let pairs = co_changes::co_changes(&entries);
            match args.format.as_str() {
                "json" => json::write_json(&pairs, args.output.as_deref())?,
                _ => terminal::report_co_changes(&pairs, args.top),
            }
        }
        ReportKind::Ages => {
            let rows = ages::get_ages(&entries, now);
            match args.format.as_str() {
                "json" => json::write_json(&rows, args.output.as_deref())?,
                _ => terminal::report_ages(&rows, args.top),
            }
        }
        ReportKind::MassChanges { min_changes } => {
            let sets = mass_changes::mass_change_sets(&entries, *min_changes);
            match args.format.as_str() {
                "json" => json::write_json(&sets, args.output.as_deref())?,
                _ => terminal::report_mass_changes(&sets, args.top),
            }
        }
    }
    log_summary(&entries);
    Ok(())
}

/// Which defaulted flags the user actually typed. clap fills defaults
/// for absent flags, so [`ValueSource`] is the only way to tell an
/// explicit `--vcs git` apart from the fallback.
#[derive(Debug, Default)]
struct ExplicitFlags {
    path: bool,
    vcs: bool,
    format: bool,
    top: bool,
    min_changes: bool,
    cloc_program: bool,
}

fn from_command_line(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

impl ExplicitFlags {
    fn from_matches(matches: &ArgMatches) -> Self {
        // subcommand-scoped flags only exist on their own matches
        let (min_changes, cloc_program) = match matches.subcommand() {
            Some(("mass-changes", sub)) => (from_command_line(sub, "min_changes"), false),
            Some(("hot-spots", sub)) => (false, from_command_line(sub, "cloc_program")),
            _ => (false, false),
        };
        ExplicitFlags {
            path: from_command_line(matches, "path"),
            vcs: from_command_line(matches, "vcs"),
            format: from_command_line(matches, "format"),
            top: from_command_line(matches, "top"),
            min_changes,
            cloc_program,
        }
    }
}

/// Config values fill in only where the CLI kept its defaults unset.
fn apply_config(args: &mut Args, config: &LensConfig, explicit: &ExplicitFlags) {
    if args.after.is_none() {
        args.after = config.after.clone();
    }
    if args.before.is_none() {
        args.before = config.before.clone();
    }
    if let Some(path) = &config.path {
        if !explicit.path {
            args.path = PathBuf::from(path);
        }
    }
    if let Some(vcs) = &config.vcs {
        if !explicit.vcs {
            args.vcs = vcs.clone();
        }
    }
    if let Some(format) = &config.format {
        if !explicit.format {
            args.format = format.clone();
        }
    }
    if let Some(top) = config.top {
        if !explicit.top {
            args.top = top;
        }
    }
    if args.output.is_none() {
        args.output = config.output.clone().map(PathBuf::from);
    }
    if let Some(configured) = config.min_changes {
        if let ReportKind::MassChanges { min_changes } = &mut args.report {
            if !explicit.min_changes {
                *min_changes = configured;
            }
        }
    }
    if let Some(configured) = &config.cloc_program {
        if let ReportKind::HotSpots { cloc_program } = &mut args.report {
            if !explicit.cloc_program {
                *cloc_program = configured.clone();
            }
        }
    }
}

fn build_collector(
    args: &Args,
    config: &LensConfig,
    runner: &SystemRunner,
) -> Result<Box<dyn LogCollector>, String> {
    match args.vcs.as_str() {
        "git" => {
            let client = config.git_client.as_deref().unwrap_or("git");
            Ok(Box::new(GitLogCollector::new(client)))
        }
        "svn" => {
            let client = config.svn_client.as_deref().unwrap_or("svn");
            let mut collector = SvnLogCollector::new(client);
            collector.update_urls(runner)?;
            Ok(Box::new(collector))
        }
        other => Err(format!("Unknown --vcs value: \"{other}\". Expected \"git\" or \"svn\"")),
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{value}' (expected YYYY-MM-DD): {e}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid date '{value}'"))
}

/// Line counts for the hot-spots report. A missing cloc binary degrades
/// the report to zero-line rows instead of aborting it.
fn count_lines(runner: &SystemRunner, cloc_program: &str, args: &Args) -> Vec<LocRow> {
    match scmlens::loc::get_cloc(runner, cloc_program, ".") {
        Ok(loc) => loc,
        Err(e) => {
            log::warn!("line counting failed, sizes default to 0: {e}");
            eprintln!("⚠ {cloc_program} failed in {}; LINES will read 0", args.path.display());
            Vec::new()
        }
    }
}

fn log_summary(entries: &[LogEntry]) {
    let revisions: std::collections::HashSet<&str> =
        entries.iter().map(|e| e.revision.as_str()).collect();
    log::info!(
        "processed {} log entries across {} revisions",
        entries.len(),
        revisions.len()
    );
}

// ─── Tests ────────────────────────────────────────────────────────────────────
