use anyhow::{anyhow, Context as _};
use chrono::Local;
use crossterm::tty::IsTty as _;
use std::{env, io, process};
use trainer::{
    info,
    opts::{self, Parsed},
    Entries, Error, Monitor, ProcessMemory as _, Token,
};

/// Set when the user interrupts the program with CTRL+C.
static INTERRUPTED: Token = Token::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    NoArguments = 1,
    InvalidArguments = 2,
    NoProcess = 3,
    Help = 4,
    AccessError = 5,
}

impl ExitCode {
    /// Classify a failure into the exit code it should be reported with.
    fn from_error(e: &anyhow::Error) -> Self {
        match e.downcast_ref::<Error>() {
            Some(Error::InvalidArguments(..))
            | Some(Error::InvalidProcessId(..))
            | Some(Error::LaunchProcessId)
            | Some(Error::Parse(..))
            | Some(Error::ReferenceOutOfRange(..))
            | Some(Error::ReferenceCycle(..)) => Self::InvalidArguments,
            Some(Error::ProcessNotFound(..))
            | Some(Error::OpenProcess(..))
            | Some(Error::Launch(..))
            | Some(Error::ProcessExited)
            | Some(Error::Unsupported) => Self::NoProcess,
            _ => Self::AccessError,
        }
    }
}

fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::{filter::LevelFilter, fmt::time::ChronoLocal};

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("failed to set up logging")?;

    Ok(())
}

fn try_main() -> anyhow::Result<ExitCode> {
    let args = env::args_os().map(|a| a.to_string_lossy().into_owned());

    let opts = match opts::opts(args)? {
        Parsed::NoArguments => {
            eprintln!("{}", opts::USAGE);
            return Ok(ExitCode::NoArguments);
        }
        Parsed::Help => {
            eprintln!("{}", opts::USAGE);
            return Ok(ExitCode::Help);
        }
        Parsed::Run(opts) => opts,
    };

    setup_logging(opts.verbose)?;
    log::debug!("options: {:?}", opts);

    let entries = Entries::parse(&opts.addresses)?;

    ctrlc::set_handler(|| INTERRUPTED.set())
        .context("failed to install interrupt handler")?;

    let process = opts
        .process
        .open()
        .with_context(|| format!("can't attach to process `{}`", opts.process))?;

    if !process.is_alive() {
        return Err(Error::ProcessExited.into());
    }

    let stdout = io::stdout();

    if entries.is_empty() {
        if !info::summary(&mut stdout.lock(), &process, Local::now())? {
            eprintln!(
                "There were problems accessing some properties. \
                 This process might not be usable for memory accesses."
            );

            return Ok(ExitCode::AccessError);
        }

        return Ok(ExitCode::Success);
    }

    let name = match process.module_base_name() {
        Ok(name) => name,
        Err(e) => {
            log::warn!("can't get the name of the process: {}", e);
            opts.process.to_string()
        }
    };

    let mut monitor = Monitor::new(&entries, &process)
        .header(format!("{}({})", name, process.process_id()))
        .once(opts.once)
        .redraw(!opts.once && stdout.is_tty())
        .cancel(&INTERRUPTED);

    monitor.run(&mut stdout.lock())?;
    log::debug!("stopped after {} cycles", monitor.cycles());
    Ok(ExitCode::Success)
}

fn main() {
    let code = match try_main() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);

            for c in e.chain().skip(1) {
                eprintln!("Caused by: {}", c);
            }

            ExitCode::from_error(&e)
        }
    };

    process::exit(code as i32);
}
