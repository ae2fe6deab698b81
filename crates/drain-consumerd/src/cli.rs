use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use drain_model::{AdmissionPolicy, RunConfig};
use drain_observe::{ColorMode, LoggerConfig, LoggerFormat};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
const DEFAULT_QUEUE_KEY: &str = "async_tasks";

#[derive(Parser, Debug)]
#[command(name = "drain-consumerd")]
#[command(version)]
#[command(about = "Drains a Redis job list with bounded concurrency")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL, global = true)]
    pub redis_url: String,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Consume jobs until interrupted or the job ceiling is reached
    Run(RunArgs),

    /// Push demonstration jobs onto the queue
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log output: text, json or journald
    #[arg(long, env = "DRAIN_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LoggerFormat,

    /// Filter directive, e.g. "info" or "info,drain_core=debug"
    #[arg(long, env = "DRAIN_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Colour text logs: auto, always or never
    #[arg(long, env = "DRAIN_LOG_COLOR", default_value = "auto", global = true)]
    pub log_color: ColorMode,

    /// Omit module targets from log lines
    #[arg(long, global = true)]
    pub no_log_targets: bool,
}

impl LogArgs {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level.clone())
            .with_color(self.log_color)
            .with_targets(!self.no_log_targets)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Redis list to drain
    #[arg(long, env = "DRAIN_QUEUE_KEY", default_value = DEFAULT_QUEUE_KEY)]
    pub queue_key: String,

    /// Seconds to sleep after an empty poll
    #[arg(long, env = "DRAIN_POLL_INTERVAL", default_value = "1", value_parser = parse_secs)]
    pub interval: Duration,

    /// Stop after admitting this many jobs
    #[arg(long, env = "DRAIN_MAX_JOBS")]
    pub max_jobs: Option<u64>,

    /// Jobs allowed to execute at the same time
    #[arg(long, visible_alias = "max-workers", env = "DRAIN_MAX_CONCURRENCY", default_value_t = 5)]
    pub max_concurrency: usize,

    /// Admission policy: eager (semaphore) or pool (fixed workers)
    #[arg(long, env = "DRAIN_POLICY", default_value = "eager")]
    pub policy: AdmissionPolicy,

    /// Worker-pool buffer size [default: max concurrency]
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Seconds a single job may run before it is abandoned
    #[arg(long, value_parser = parse_secs)]
    pub job_timeout: Option<Duration>,

    /// Seconds to wait after a backend failure [default: 5 x interval]
    #[arg(long, value_parser = parse_secs)]
    pub error_backoff: Option<Duration>,

    /// Give up after this many consecutive backend failures
    #[arg(long)]
    pub max_backend_errors: Option<u32>,

    /// Run a program for a kind: KIND=PROGRAM [ARGS...] (repeatable)
    #[arg(long = "exec", value_name = "KIND=PROGRAM", value_parser = parse_exec)]
    pub exec: Vec<ExecMapping>,

    /// Print Prometheus metrics to stdout after the drain
    #[arg(long)]
    pub print_metrics: bool,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        let mut cfg = RunConfig::default()
            .with_queue_key(self.queue_key.clone())
            .with_poll_interval(self.interval)
            .with_max_concurrency(self.max_concurrency)
            .with_policy(self.policy);
        cfg.max_jobs = self.max_jobs;
        cfg.buffer_capacity = self.buffer;
        cfg.job_timeout = self.job_timeout;
        cfg.error_backoff = self.error_backoff;
        cfg.max_backend_errors = self.max_backend_errors;
        cfg
    }
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Redis list to push onto
    #[arg(long, env = "DRAIN_QUEUE_KEY", default_value = DEFAULT_QUEUE_KEY)]
    pub queue_key: String,

    /// Push this many email jobs instead of the mixed-duration set
    #[arg(long)]
    pub email: Option<usize>,

    /// Delete the list before pushing
    #[arg(long)]
    pub clear: bool,
}

/// `--exec` value: a kind and the command line that handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecMapping {
    pub kind: String,
    pub program: String,
    pub args: Vec<String>,
}

fn parse_exec(s: &str) -> Result<ExecMapping, String> {
    let (kind, command) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=PROGRAM, got {s:?}"))?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err("kind must not be empty".to_string());
    }
    let mut words = command.split_whitespace().map(str::to_string);
    let program = words
        .next()
        .ok_or_else(|| format!("missing program for kind {kind:?}"))?;
    Ok(ExecMapping {
        kind: kind.to_string(),
        program,
        args: words.collect(),
    })
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds {s:?}: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {s:?}: {e}"))
}
