//! Multi-process stress scenario
//!
//! N worker processes each register the same event type in their own registry
//! and log one line per integer they test for primality, all into the same
//! event file. Afterwards every line is checked: total count equals the number
//! of `log` calls and each line parses on its own.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::{bail, Context};
use rand::Rng;
use tokio::process::Command;

use crate::emitter::Eventlog;
use crate::error::Result;
use crate::fields::Fields;
use crate::registry::EventId;
use crate::sink::strip_timestamp;

pub const STRESS_EVENT_ID: u64 = 0x34888;
pub const STRESS_EVENT_NAME: &str = "EVENTO_INUTIL";
pub const STRESS_FIELDS: [&str; 3] = ["workerPid", "integer", "isPrime"];

/// Upper bound on spawned worker processes
pub const MAX_PROCESSES: u64 = 256;

/// Integers handled by one worker: `start + index`, stepping by `processes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPlan {
    pub index: u64,
    pub processes: u64,
    pub start: u64,
    pub end: u64,
}

impl WorkerPlan {
    pub fn numbers(&self) -> impl Iterator<Item = u64> {
        let step = self.processes.max(1) as usize;
        (self.start.saturating_add(self.index)..self.end).step_by(step)
    }
}

pub fn is_prime(n: u64) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    // 6k +/- 1 trial division; `i <= n / i` stays in range near u64::MAX
    let mut i = 5;
    while i <= n / i {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Worker body: register in this process, then one event per integer.
///
/// Returns the number of events logged.
pub fn run_worker(log: &Eventlog, plan: WorkerPlan, max_delay: Duration) -> Result<u64> {
    // Registration is per process: must happen here, after the fork/spawn
    log.register(STRESS_EVENT_ID, STRESS_EVENT_NAME, &STRESS_FIELDS)?;

    let pid = std::process::id();
    let mut rng = rand::rng();
    let mut logged = 0;

    for n in plan.numbers() {
        if !max_delay.is_zero() {
            let jitter = rng.random_range(0..=max_delay.as_micros() as u64);
            std::thread::sleep(Duration::from_micros(jitter));
        }

        let fields = Fields::new()
            .with("workerPid", pid)
            .with("integer", n)
            .with("isPrime", is_prime(n));
        log.log(STRESS_EVENT_ID, &fields)?;
        logged += 1;
    }

    tracing::debug!(index = plan.index, pid, logged, "worker done");
    Ok(logged)
}

/// Outcome of checking the shared event files after a stress run
#[derive(Debug, Default)]
pub struct StressReport {
    pub files: Vec<PathBuf>,
    pub lines: u64,
    pub expected: u64,
    /// Lines that do not parse as a stress event
    pub malformed: Vec<String>,
    /// Integers logged more than once
    pub duplicates: Vec<u64>,
}

impl StressReport {
    pub fn is_ok(&self) -> bool {
        self.lines == self.expected && self.malformed.is_empty() && self.duplicates.is_empty()
    }
}

/// Parse one stress event line back into `(id, pid, integer, is_prime)`
pub fn parse_stress_line(line: &str) -> Option<(EventId, u32, u64, bool)> {
    let body = strip_timestamp(line);
    let rest = body.strip_prefix("  ")?;

    let mut cols = rest.split('\t');
    let id = u64::from_str_radix(cols.next()?, 16).ok()?;
    let pid = cols.next()?.parse().ok()?;
    let n = cols.next()?.parse().ok()?;
    let prime = cols.next()?.parse().ok()?;
    if cols.next().is_some() {
        return None;
    }
    Some((EventId::new(id), pid, n, prime))
}

/// Count and check every line across `<event_file>*` in `log_dir`
pub fn verify_event_files(
    log_dir: &Path,
    event_file: &str,
    expected: u64,
) -> io::Result<StressReport> {
    let pattern = format!(
        "{}*",
        glob::Pattern::escape(&log_dir.join(event_file).to_string_lossy())
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.extension().map_or(true, |ext| ext != "lock"))
        .collect();
    files.sort();

    let mut report = StressReport {
        expected,
        ..StressReport::default()
    };
    let mut seen = HashSet::new();

    for file in &files {
        let content = std::fs::read_to_string(file)?;
        for line in content.lines() {
            report.lines += 1;
            match parse_stress_line(line) {
                Some((id, _, n, prime)) if id.get() == STRESS_EVENT_ID && prime == is_prime(n) => {
                    if !seen.insert(n) {
                        report.duplicates.push(n);
                    }
                }
                _ => report.malformed.push(line.to_string()),
            }
        }
    }

    report.files = files;
    Ok(report)
}

/// Arguments forwarded to every spawned worker
#[derive(Debug, Clone)]
pub struct StressPlan {
    pub processes: u64,
    pub start: u64,
    pub end: u64,
    pub max_delay: Duration,
}

impl StressPlan {
    pub fn expected_lines(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Spawn `plan.processes` copies of `exe worker ...` and wait for all of them.
///
/// `extra_args` go after the worker arguments (log dir, rotation flags).
pub async fn spawn_workers(
    exe: &Path,
    plan: &StressPlan,
    extra_args: &[String],
) -> anyhow::Result<()> {
    if !(1..=MAX_PROCESSES).contains(&plan.processes) {
        bail!(
            "processes must be between 1 and {MAX_PROCESSES}, got {}",
            plan.processes
        );
    }

    let mut children = Vec::with_capacity(plan.processes as usize);

    for index in 0..plan.processes {
        let child = Command::new(exe)
            .arg("worker")
            .args(["--index", &index.to_string()])
            .args(["--processes", &plan.processes.to_string()])
            .args(["--start", &plan.start.to_string()])
            .args(["--end", &plan.end.to_string()])
            .args(["--max-delay-ms", &plan.max_delay.as_millis().to_string()])
            .args(extra_args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn worker {index}"))?;
        children.push((index, child));
    }

    let mut failed = Vec::new();
    for (index, mut child) in children {
        let status: ExitStatus = child
            .wait()
            .await
            .with_context(|| format!("failed to wait for worker {index}"))?;
        if !status.success() {
            failed.push(index);
        }
    }

    if !failed.is_empty() {
        bail!("{} worker(s) failed: {:?}", failed.len(), failed);
    }
    Ok(())
}
