use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use drain_core::{Action, HandlerError, encode};
use drain_model::Job;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{ChildStdout, Command},
};
use tracing::{debug, trace, warn};

use crate::{
    error::ExecError,
    utils::limits::{RlimitConfig, attach_rlimits},
};

/// Environment variable carrying the job kind.
pub const ENV_JOB_KIND: &str = "DRAIN_JOB_KIND";
/// Environment variable carrying the run sequence number.
pub const ENV_JOB_SEQUENCE: &str = "DRAIN_JOB_SEQUENCE";

/// Program an action launches for every job it handles.
#[derive(Clone, Debug)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Treat a non-zero exit code as a failed job.
    pub fail_on_non_zero: bool,
    pub limits: RlimitConfig,
}

impl ProcConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            fail_on_non_zero: true,
            limits: RlimitConfig::default(),
        }
    }
}

/// Runs one child process per job.
///
/// The job is written to the child's stdin in the queue wire format
/// (`{"type": ..., "data": ...}`); stdout lines are logged at debug level and
/// stderr is inherited. The child is killed if the job future is dropped, which
/// is what happens on a job timeout.
#[derive(Debug)]
pub struct ProcAction {
    name: String,
    cfg: ProcConfig,
}

impl ProcAction {
    pub fn new(cfg: ProcConfig) -> Result<Self, ExecError> {
        if cfg.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        Ok(Self {
            name: "proc".to_string(),
            cfg,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &ProcConfig {
        &self.cfg
    }

    fn command(&self, job: &Job) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        cmd.args(self.cfg.args.iter().map(String::as_str));
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        cmd.env(ENV_JOB_KIND, job.kind().as_str())
            .env(ENV_JOB_SEQUENCE, job.sequence_id().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        attach_rlimits(&mut cmd, &self.cfg.limits);
        cmd
    }
}

#[async_trait]
impl Action for ProcAction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        let seq = job.sequence_id();
        trace!(target: "drain.exec.proc", seq, program = %self.cfg.program, args = ?self.cfg.args, "spawn");

        let mut child = self
            .command(job)
            .spawn()
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        // Drain stdout before feeding stdin so a chatty child cannot block on a full pipe.
        let reader = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(forward_stdout(stdout, seq)));

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading its input closes the pipe early.
            if let Err(e) = stdin.write_all(&encode(job)).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(ExecError::from(e).into());
            }
        }

        let status = child.wait().await.map_err(ExecError::from)?;
        if let Some(reader) = reader
            && let Err(e) = reader.await
        {
            warn!(target: "drain.exec.proc", seq, error = %e, "stdout reader task failed");
        }

        if !status.success() && self.cfg.fail_on_non_zero {
            let err = match status.code() {
                Some(code) => ExecError::NonZeroExit { code },
                None => ExecError::KilledBySignal,
            };
            return Err(err.into());
        }

        debug!(target: "drain.exec.proc", seq, "exit success");
        Ok(())
    }
}

/// Logs the child's stdout line by line until EOF.
///
/// The pipe stays open until EOF even when the output is not UTF-8 or a read
/// fails; closing it early would kill the child with `SIGPIPE`.
async fn forward_stdout(stdout: ChildStdout, seq: u64) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                debug!(target: "drain.exec.proc.out", seq, %line);
            }
            Err(e) => {
                warn!(target: "drain.exec.proc", seq, error = %e, "stdout unreadable; discarding the rest");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(target: "drain.exec.proc", seq, error = %e, "stdout discard stopped");
                }
                return;
            }
        }
    }
}
