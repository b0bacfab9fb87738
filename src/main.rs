//! eventlog CLI - emit events and run the multi-process stress scenario

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use eventlog::stress::{self, StressPlan, WorkerPlan};
use eventlog::{
    EventId, Eventlog, EventlogConfig, EventlogError, Fields, FixSuggestion, RotationPolicy,
    SchemaFile,
};

#[derive(Parser)]
#[command(name = "eventlog")]
#[command(about = "Schema-ordered event logging with a self-describing layout file")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the events of a schema file and log one event
    Emit {
        /// YAML schema: NAME: { id: 0x..., fields: [...] }
        #[arg(short, long)]
        schema: PathBuf,

        /// Event id (decimal or 0x-prefixed hex)
        #[arg(short, long)]
        id: String,

        /// Event values as a JSON object
        #[arg(long)]
        json: Option<String>,

        /// Event values as key=value pairs (applied after --json)
        values: Vec<String>,

        #[command(flatten)]
        sink: SinkArgs,
    },

    /// Spawn worker processes that log into the same files, then verify them.
    /// Existing event and layout files in the log directory are removed first.
    Stress {
        #[arg(long, default_value_t = 8, value_parser = process_count())]
        processes: u64,

        /// First integer tested (inclusive)
        #[arg(long, default_value_t = 2)]
        start: u64,

        /// Last integer tested (exclusive)
        #[arg(long, default_value_t = 2_000)]
        end: u64,

        /// Upper bound of the random delay before each event
        #[arg(long, default_value_t = 0)]
        max_delay_ms: u64,

        #[command(flatten)]
        sink: SinkArgs,
    },

    /// One stress worker (spawned by `stress`)
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        index: u64,

        #[arg(long, value_parser = process_count())]
        processes: u64,

        #[arg(long)]
        start: u64,

        #[arg(long)]
        end: u64,

        #[arg(long, default_value_t = 0)]
        max_delay_ms: u64,

        #[command(flatten)]
        sink: SinkArgs,
    },
}

fn process_count() -> clap::builder::RangedU64ValueParser<u64> {
    clap::value_parser!(u64).range(1..=stress::MAX_PROCESSES)
}

/// Where the files live and how they rotate (overrides env/config file)
#[derive(Args, Clone, Default)]
struct SinkArgs {
    /// YAML config file (default: environment only)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// second, minute, hour, midnight or size
    #[arg(long)]
    rotation: Option<String>,

    /// Size limit for size rotation
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Rotated files to keep
    #[arg(long)]
    backup_count: Option<usize>,
}

impl SinkArgs {
    fn resolve(&self) -> anyhow::Result<EventlogConfig> {
        let mut config = match &self.config {
            Some(path) => EventlogConfig::from_yaml_file(path)
                .and_then(|config| config.with_env(|key| std::env::var(key).ok()))
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => EventlogConfig::from_env()?,
        };

        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(rotation) = &self.rotation {
            config.rotation = match rotation.as_str() {
                "size" => RotationPolicy::Size {
                    max_bytes: eventlog::config::DEFAULT_MAX_BYTES,
                },
                when => RotationPolicy::Time { when: when.parse()? },
            };
        }
        if let Some(max) = self.max_bytes {
            match &mut config.rotation {
                RotationPolicy::Size { max_bytes } => *max_bytes = max,
                RotationPolicy::Time { .. } => {
                    tracing::warn!("--max-bytes ignored: rotation is time based");
                }
            }
        }
        if let Some(count) = self.backup_count {
            config.backup_count = count;
        }
        Ok(config)
    }
}

/// Resolved config as explicit worker flags, so every worker agrees
fn worker_sink_args(config: &EventlogConfig) -> Vec<String> {
    let mut args = vec![
        "--log-dir".to_string(),
        config.log_dir.display().to_string(),
        "--backup-count".to_string(),
        config.backup_count.to_string(),
    ];
    match config.rotation {
        RotationPolicy::Time { when } => {
            args.extend(["--rotation".to_string(), when.to_string()]);
        }
        RotationPolicy::Size { max_bytes } => {
            args.extend([
                "--rotation".to_string(),
                "size".to_string(),
                "--max-bytes".to_string(),
                max_bytes.to_string(),
            ]);
        }
    }
    args
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr; the event files only ever hold events
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Emit {
            schema,
            id,
            json,
            values,
            sink,
        } => emit(&schema, &id, json.as_deref(), &values, &sink),
        Commands::Stress {
            processes,
            start,
            end,
            max_delay_ms,
            sink,
        } => {
            let plan = StressPlan {
                processes,
                start,
                end,
                max_delay: Duration::from_millis(max_delay_ms),
            };
            run_stress(plan, &sink).await
        }
        Commands::Worker {
            index,
            processes,
            start,
            end,
            max_delay_ms,
            sink,
        } => {
            let plan = WorkerPlan {
                index,
                processes,
                start,
                end,
            };
            run_worker(plan, Duration::from_millis(max_delay_ms), sink).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<EventlogError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn emit(
    schema_path: &Path,
    id: &str,
    json: Option<&str>,
    values: &[String],
    sink: &SinkArgs,
) -> anyhow::Result<()> {
    // Parse everything before touching the files
    let id: EventId = id.parse()?;
    let schema = SchemaFile::from_yaml_file(schema_path)?;

    let mut fields = match json {
        Some(raw) => Fields::from_json(serde_json::from_str(raw).map_err(EventlogError::from)?)?,
        None => Fields::new(),
    };
    for pair in values {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            EventlogError::Config(format!("expected key=value, got '{pair}'"))
        })?;
        fields.insert(key, value);
    }

    let config = sink.resolve()?;
    let log = Eventlog::open(&config)?;
    log.register_schema(&schema)?;
    log.log(id, &fields)?;

    println!(
        "{} logged event {} ({} value(s)) to {}",
        "✓".green(),
        id.to_string().cyan().bold(),
        fields.len(),
        config.event_path().display()
    );
    Ok(())
}

async fn run_stress(plan: StressPlan, sink: &SinkArgs) -> anyhow::Result<()> {
    let config = sink.resolve()?;
    std::fs::create_dir_all(&config.log_dir)?;
    remove_previous_logs(&config)?;

    println!(
        "{} {} worker(s), integers {}..{} -> {}",
        "→".cyan(),
        plan.processes,
        plan.start,
        plan.end,
        config.event_path().display()
    );

    let exe = std::env::current_exe().context("cannot locate eventlog binary")?;
    stress::spawn_workers(&exe, &plan, &worker_sink_args(&config)).await?;

    let report =
        stress::verify_event_files(&config.log_dir, &config.event_file, plan.expected_lines())?;

    println!("  Files: {}", report.files.len());
    println!("  Lines: {} (expected {})", report.lines, report.expected);

    if report.is_ok() {
        println!("{} Number of log entries is correct", "✓".green());
        return Ok(());
    }

    for line in report.malformed.iter().take(5) {
        eprintln!("  {} {:?}", "malformed:".yellow(), line);
    }
    if !report.duplicates.is_empty() {
        eprintln!(
            "  {} {} duplicated integer(s)",
            "duplicates:".yellow(),
            report.duplicates.len()
        );
    }
    anyhow::bail!(
        "number of log entries is wrong: {} lines, {} expected, {} malformed",
        report.lines,
        report.expected,
        report.malformed.len()
    )
}

fn remove_previous_logs(config: &EventlogConfig) -> anyhow::Result<()> {
    for base in [config.event_path(), config.layout_path()] {
        let pattern = format!("{}*", glob::Pattern::escape(&base.to_string_lossy()));
        for path in glob::glob(&pattern)?.filter_map(|entry| entry.ok()) {
            std::fs::remove_file(&path)
                .with_context(|| format!("cannot remove {}", path.display()))?;
        }
    }
    Ok(())
}

async fn run_worker(
    plan: WorkerPlan,
    max_delay: Duration,
    sink: SinkArgs,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let config = sink.resolve()?;
        let log = Eventlog::open(&config)?;
        stress::run_worker(&log, plan, max_delay)?;
        Ok(())
    })
    .await?
}
