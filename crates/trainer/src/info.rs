//! Summary of a process, shown when no addresses are given.

use crate::{error::Error, ProcessMemory};
use chrono::{DateTime, Local};
use std::{fmt, io, path::PathBuf, time::Duration};

/// The scheduling priority class of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityClass {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    RealTime,
    Other(u32),
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(fmt, "Idle"),
            Self::BelowNormal => write!(fmt, "BelowNormal"),
            Self::Normal => write!(fmt, "Normal"),
            Self::AboveNormal => write!(fmt, "AboveNormal"),
            Self::High => write!(fmt, "High"),
            Self::RealTime => write!(fmt, "RealTime"),
            Self::Other(n) => write!(fmt, "0x{:X}", n),
        }
    }
}

/// The main window of a process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub handle: usize,
    pub title: String,
}

/// Memory used by a process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub private: u64,
    pub paged: u64,
}

/// Descriptive properties of a process.
///
/// Every property can fail on its own, typically since we lack the access
/// rights to query it.
pub trait ProcessDetails: ProcessMemory {
    /// The name of the process.
    fn name(&self) -> Result<String, Error>;

    /// The path to the executable of the process.
    fn file_name(&self) -> Result<PathBuf, Error>;

    /// The raw value of the handle we hold to the process.
    fn raw_handle(&self) -> usize;

    /// The priority class of the process.
    fn priority_class(&self) -> Result<PriorityClass, Error>;

    /// The main window of the process, if it has one.
    fn main_window(&self) -> Result<Option<Window>, Error>;

    /// Memory used by the process.
    fn memory_usage(&self) -> Result<MemoryUsage, Error>;

    /// The time at which the process was started.
    fn start_time(&self) -> Result<DateTime<Local>, Error>;

    /// Total time spent by the process on the processor.
    fn processor_time(&self) -> Result<Duration, Error>;
}

/// Write a summary of the given process.
///
/// Properties which can't be accessed are left out, and a warning is logged
/// for each of them. Returns `true` if every property could be accessed.
pub fn summary<W, P>(out: &mut W, process: &P, now: DateTime<Local>) -> Result<bool, Error>
where
    W: io::Write,
    P: ?Sized + ProcessDetails,
{
    let mut summary = Summary { out, ok: true };

    writeln!(summary.out, "Process information:")?;
    summary.property("Name", process.name())?;
    summary.property("FileName", process.file_name().map(|p| p.display().to_string()))?;
    summary.property("BaseAddress", process.main_module_base())?;
    summary.property("Handle", Ok::<_, Error>(process.raw_handle()))?;
    summary.property("Priority", process.priority_class())?;

    let window = process.main_window().map(Option::unwrap_or_default);

    match window {
        Ok(window) => {
            summary.property("Window Handle", Ok::<_, Error>(window.handle))?;
            summary.property("Window Title", Ok::<_, Error>(window.title))?;
        }
        Err(e) => {
            summary.failed("Window Handle", &e);
            summary.failed("Window Title", &e);
        }
    }

    match process.memory_usage() {
        Ok(usage) => {
            summary.property("Private Memory", Ok::<_, Error>(usage.private))?;
            summary.property("Paged Memory", Ok::<_, Error>(usage.paged))?;
        }
        Err(e) => {
            summary.failed("Private Memory", &e);
            summary.failed("Paged Memory", &e);
        }
    }

    let start_time = process.start_time().map(|start| {
        let runtime = now.signed_duration_since(start).to_std().unwrap_or_default();
        format!("{} (Runtime: {})", start.format("%Y-%m-%d %H:%M:%S"), Elapsed(runtime))
    });

    summary.property("StartTime", start_time)?;
    summary.property("Processor Time", process.processor_time().map(Elapsed))?;
    Ok(summary.ok)
}

struct Summary<'a, W> {
    out: &'a mut W,
    ok: bool,
}

impl<W> Summary<'_, W>
where
    W: io::Write,
{
    fn property<T>(&mut self, label: &str, value: Result<T, Error>) -> Result<(), Error>
    where
        T: fmt::Display,
    {
        match value {
            Ok(value) => {
                writeln!(self.out, "{:<16}{}", format!("{}:", label), value)?;
            }
            Err(e) => self.failed(label, &e),
        }

        Ok(())
    }

    fn failed(&mut self, label: &str, e: &Error) {
        log::warn!("can't access property `{}`: {}", label, e);
        self.ok = false;
    }
}

/// Formats a duration like `1:02:03.004`.
struct Elapsed(Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();

        write!(
            fmt,
            "{}:{:02}:{:02}.{:03}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60,
            self.0.subsec_millis()
        )
    }
}
