//! Command line options.

use crate::{error::Error, Process, ProcessId};
use std::{fmt, str};

/// Usage text, shown for `/?` or when no arguments are given.
pub const USAGE: &str = r#"
trainer <[/L:]ProcessName|ProcessId> [/V] [/O]
        [[+][#][Type:]Region[=Value]] ...

ProcessName   - Name of the process. Must end in '.exe'.
ProcessId     - ID of the process.
/L            - Launch the process specified. If it is not found in PATH,
                specify the full or relative path to it. If the path
                contains spaces, quote the whole argument including '/L:'.
/O            - Run only once and exit. Default is to loop until the target
                process exits or CTRL+C is hit.
/V            - Verbose diagnostics on stderr.
+             - The region is an offset from the base address of the main
                module.
#             - The region is a pointer to the location that should be read
                or written instead. Repeat for stacked pointers.
Type          - Value type. L=Int64, I=Int32, S=Int16, B=Int8. Defaults to I.
Region        - Memory address to read or write, in hexadecimal.
Value         - The value to write. Prefix with '0x' for hexadecimal, and
                with '-' for negative numbers. A region reference like 'R1'
                writes the current value of that region.

Notes:
- If only the process is given, some information about it is shown and the
  program exits immediately.
- A region without a value is only shown.
- If multiple processes have the given name, the one with the highest
  process ID is used.
- Regions are numbered from 1 in the order they are given. Values written
  through a reference are truncated to the target type, without rounding.

Example:

trainer /L:test.exe +##I:402F #B:85B3E=0x10 +S:10=R1

- Launches 'test.exe'.
- R1 shows the integer at the address pointed to by the pointer at the
  base address + 0x402F.
- R2 writes the byte 16 to the address that 85B3E points to.
- R3 writes the value of R1 as a short to the base address + 0x10.
"#;

/// How to get hold of the process to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessSpec {
    /// Attach to the process with the given id.
    Id(ProcessId),
    /// Attach to the newest running process with the given executable name.
    Name(String),
    /// Launch a new process from the given executable.
    Launch(String),
}

impl ProcessSpec {
    /// Open or launch the process.
    pub fn open(&self) -> Result<Process, Error> {
        match self {
            Self::Id(pid) => Process::open(*pid),
            Self::Name(name) => Process::find_by_name(name),
            Self::Launch(path) => Process::launch(path),
        }
    }
}

impl str::FromStr for ProcessSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (launch, rest) = match s.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("/L:") => (true, &s[3..]),
            _ => (false, s),
        };

        if rest.to_lowercase().ends_with(".exe") {
            return Ok(if launch {
                Self::Launch(rest.to_string())
            } else {
                Self::Name(rest.to_string())
            });
        }

        let pid = match rest.parse::<ProcessId>() {
            Ok(0) | Err(..) => return Err(Error::InvalidProcessId(rest.to_string())),
            Ok(pid) => pid,
        };

        if launch {
            return Err(Error::LaunchProcessId);
        }

        Ok(Self::Id(pid))
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(pid) => write!(fmt, "{}", pid),
            Self::Name(name) => write!(fmt, "{}", name),
            Self::Launch(path) => write!(fmt, "/L:{}", path),
        }
    }
}

/// Parsed command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub process: ProcessSpec,
    pub verbose: bool,
    pub once: bool,
    /// Address expressions, in the order they were given.
    pub addresses: Vec<String>,
}

/// The outcome of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// No arguments were given.
    NoArguments,
    /// Help was requested.
    Help,
    /// Run with the given options.
    Run(Opts),
}

/// Parse commandline options, including the program name.
pub fn opts<I>(args: I) -> Result<Parsed, Error>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let args = args.into_iter().map(Into::into).collect::<Vec<String>>();

    if args.len() <= 1 {
        return Ok(Parsed::NoArguments);
    }

    let args = args.into_iter().map(normalize);

    let m = app()
        .get_matches_from_safe(args)
        .map_err(|e| Error::InvalidArguments(e.message))?;

    if m.is_present("help") {
        return Ok(Parsed::Help);
    }

    let process = m
        .value_of("process")
        .ok_or_else(|| Error::InvalidArguments(String::from("no process specified")))?
        .parse::<ProcessSpec>()?;

    Ok(Parsed::Run(Opts {
        process,
        verbose: m.is_present("verbose"),
        once: m.is_present("once"),
        addresses: m
            .values_of("addresses")
            .map(|values| values.map(String::from).collect())
            .unwrap_or_default(),
    }))
}

/// Translate Windows-style and upper-case switches into the long options
/// understood by clap.
fn normalize(arg: String) -> String {
    let long = match arg.to_uppercase().as_str() {
        "/V" | "-V" | "--VERBOSE" => "--verbose",
        "/O" | "-O" | "--ONCE" => "--once",
        "/?" | "-?" | "-H" | "--HELP" => "--help",
        _ => return arg,
    };

    long.to_string()
}

fn app() -> clap::App<'static, 'static> {
    use clap::{App, AppSettings, Arg};

    App::new("trainer")
        .about("Watch and patch values in the memory of a running process")
        .setting(AppSettings::DisableVersion)
        .setting(AppSettings::DisableHelpFlags)
        .arg(
            Arg::with_name("help")
                .help("Show usage and exit.")
                .long("help"),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Log diagnostics to stderr.")
                .long("verbose"),
        )
        .arg(
            Arg::with_name("once")
                .help("Run a single cycle and exit.")
                .long("once"),
        )
        .arg(
            Arg::with_name("process")
                .help("Executable name ending in .exe, process id, or /L:<path> to launch.")
                .index(1),
        )
        .arg(
            Arg::with_name("addresses")
                .help("Address expressions to watch and write.")
                .multiple(true)
                .index(2),
        )
}

#[cfg(test)]
mod tests {
    use super::{opts, Opts, Parsed, ProcessSpec};
    use crate::error::Error;

    fn run(args: &[&str]) -> Result<Opts, Error> {
        let args = std::iter::once("trainer").chain(args.iter().copied());

        match opts(args)? {
            Parsed::Run(opts) => Ok(opts),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn process_specs() -> Result<(), Error> {
        assert_eq!(ProcessSpec::Id(1234), "1234".parse::<ProcessSpec>()?);
        assert_eq!(ProcessSpec::Name("Game.EXE".into()), "Game.EXE".parse::<ProcessSpec>()?);
        assert_eq!(
            ProcessSpec::Launch(r"C:\Games\test.exe".into()),
            r"/l:C:\Games\test.exe".parse::<ProcessSpec>()?
        );

        assert!(matches!(
            "0".parse::<ProcessSpec>(),
            Err(Error::InvalidProcessId(..))
        ));
        assert!(matches!(
            "game".parse::<ProcessSpec>(),
            Err(Error::InvalidProcessId(..))
        ));
        assert!(matches!(
            "-5".parse::<ProcessSpec>(),
            Err(Error::InvalidProcessId(..))
        ));
        assert!(matches!(
            "/L:1234".parse::<ProcessSpec>(),
            Err(Error::LaunchProcessId)
        ));
        Ok(())
    }

    #[test]
    fn no_arguments() -> Result<(), Error> {
        assert_eq!(Parsed::NoArguments, opts(vec!["trainer"])?);
        Ok(())
    }

    #[test]
    fn help_wins() -> Result<(), Error> {
        for help in &["/?", "-?", "-h", "--help", "--HELP"] {
            assert_eq!(Parsed::Help, opts(vec!["trainer", "game.exe", *help])?);
        }

        // help is honored even without a process.
        assert_eq!(Parsed::Help, opts(vec!["trainer", "/?"])?);
        Ok(())
    }

    #[test]
    fn switches_anywhere() -> Result<(), Error> {
        let o = run(&["/v", "game.exe", "+173830=1000", "/O", "+173886=R1"])?;
        assert_eq!(ProcessSpec::Name("game.exe".into()), o.process);
        assert!(o.verbose);
        assert!(o.once);
        assert_eq!(vec!["+173830=1000", "+173886=R1"], o.addresses);

        let o = run(&["42", "-V", "#B:85B3E=0x10"])?;
        assert_eq!(ProcessSpec::Id(42), o.process);
        assert!(o.verbose);
        assert!(!o.once);
        assert_eq!(vec!["#B:85B3E=0x10"], o.addresses);
        Ok(())
    }

    #[test]
    fn process_only() -> Result<(), Error> {
        let o = run(&["/L:test.exe"])?;
        assert_eq!(ProcessSpec::Launch("test.exe".into()), o.process);
        assert!(o.addresses.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_arguments() {
        assert!(opts(vec!["trainer", "/V"]).is_err());
        assert!(opts(vec!["trainer", "--bogus", "game.exe"]).is_err());
        assert!(opts(vec!["trainer", "/L:42", "10"]).is_err());
    }
}
