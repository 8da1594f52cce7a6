use rustix::io::Errno;
use rustix::process::{kill_process, Pid, Signal};
use std::path::PathBuf;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::error::{ProcessError, WallsError};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub executable: PathBuf,
}

impl ProcessEntry {
    pub fn executable_name(&self) -> Option<&str> {
        self.executable.file_name().and_then(|name| name.to_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Signalled,
    /// The process exited between listing and signalling
    AlreadyExited,
}

/// Access to the host process table.
pub trait ProcessMatcher {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>>;
    /// Sends SIGTERM to `pid`.
    fn terminate(&self, pid: u32) -> Result<Termination>;
}

impl<T: ProcessMatcher + ?Sized> ProcessMatcher for &T {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>> {
        (**self).list_processes()
    }

    fn terminate(&self, pid: u32) -> Result<Termination> {
        (**self).terminate(pid)
    }
}

/// Pids whose executable base name equals `name`, excluding `keep`.
pub fn matching_pids(entries: &[ProcessEntry], name: &str, keep: u32) -> Vec<u32> {
    entries
        .iter()
        .filter(|entry| entry.pid != keep && entry.executable_name() == Some(name))
        .map(|entry| entry.pid)
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl ProcessMatcher for SystemProcesses {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(WallsError::Process(ProcessError::Unsupported));
        }

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .without_tasks()
                .with_exe(UpdateKind::OnlyIfNotSet),
        );

        // threads share their process's exe and would be signalled as the whole group;
        // processes we may not inspect have no exe. Both are skipped
        let entries: Vec<ProcessEntry> = system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(pid, process)| {
                process.exe().map(|exe| ProcessEntry {
                    pid: pid.as_u32(),
                    executable: exe.to_path_buf(),
                })
            })
            .collect();

        log::debug!("examining {} processes", entries.len());
        Ok(entries)
    }

    fn terminate(&self, pid: u32) -> Result<Termination> {
        let raw = i32::try_from(pid).map_err(|_| WallsError::Process(ProcessError::InvalidPid { pid }))?;
        let target = Pid::from_raw(raw).ok_or(WallsError::Process(ProcessError::InvalidPid { pid }))?;

        match kill_process(target, Signal::Term) {
            Ok(()) => Ok(Termination::Signalled),
            Err(errno) if errno == Errno::SRCH => {
                log::debug!("process {} already exited", pid);
                Ok(Termination::AlreadyExited)
            }
            Err(errno) => Err(WallsError::Process(ProcessError::Signal {
                pid,
                source: errno.into(),
            })),
        }
    }
}
