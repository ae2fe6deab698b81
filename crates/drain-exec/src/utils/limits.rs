//! POSIX rlimits for job subprocesses.
//!
//! On Unix the limits are applied in a `pre_exec` hook, i.e. in the forked child
//! right before `execve`, so the job program never runs unrestricted. Other
//! platforms log a warning and run the program without limits.
use tokio::process::Command;
#[cfg(not(unix))]
use tracing::warn;

/// Per-process resource limits. `None` leaves the inherited limit unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,
    /// `RLIMIT_FSIZE`; exceeding it delivers `SIGXFSZ`.
    pub max_file_size_bytes: Option<u64>,
    /// `RLIMIT_CPU`; exceeding it delivers `SIGXCPU`.
    pub max_cpu_seconds: Option<u64>,
    /// Sets `RLIMIT_CORE` to zero.
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_open_files.is_none()
            && self.max_file_size_bytes.is_none()
            && self.max_cpu_seconds.is_none()
            && !self.disable_core_dumps
    }
}

/// Installs `config` on `cmd`. A no-op for an empty config.
pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    unix_impl::attach_rlimits(cmd, config);

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "drain_exec::limits",
            ?config,
            "rlimits are not supported on this platform; running without them"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub(super) fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
        let limits: Vec<(libc::c_int, u64)> = [
            (libc::RLIMIT_NOFILE as libc::c_int, config.max_open_files),
            (libc::RLIMIT_FSIZE as libc::c_int, config.max_file_size_bytes),
            (libc::RLIMIT_CPU as libc::c_int, config.max_cpu_seconds),
            (
                libc::RLIMIT_CORE as libc::c_int,
                config.disable_core_dumps.then_some(0),
            ),
        ]
        .into_iter()
        .filter_map(|(resource, value)| value.map(|v| (resource, v)))
        .collect();

        // SAFETY: the hook only calls `setrlimit`, which is async-signal-safe,
        // and touches no memory shared with the parent besides the moved vector.
        unsafe {
            cmd.pre_exec(move || {
                for &(resource, value) in &limits {
                    apply_rlimit(resource, value)?;
                }
                Ok(())
            });
        }
    }

    fn apply_rlimit(resource: libc::c_int, value: u64) -> io::Result<()> {
        let rlim = libc::rlimit {
            rlim_cur: value as libc::rlim_t,
            rlim_max: value as libc::rlim_t,
        };

        // The resource parameter type differs between libc targets.
        let rc = unsafe { libc::setrlimit(resource as _, &rlim) };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
