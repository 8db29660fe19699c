use std::{ffi::OsString, path::PathBuf};

use clap::{builder::NonEmptyStringValueParser, ArgGroup, Parser};
use tracing::level_filters::LevelFilter;

/// Inspect or edit the start function of a WebAssembly module.
///
/// Without `-o` the current start function index is reported.  With `-o` a copy of the input is
/// written, with the start section replaced (`-s`), removed (`-u`), and/or the export section
/// removed (`-x`).
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(
    ArgGroup::new("edit")
        .args(["set", "unset", "unexport"])
        .multiple(true)
        .requires("output")
))]
pub struct Args {
    #[arg(value_name = "FILENAME")]
    /// Input WebAssembly module.
    pub input: PathBuf,

    #[arg(short = 'o', value_name = "OUTPUT", requires = "edit")]
    /// Output filename.
    pub output: Option<PathBuf>,

    #[arg(
        short = 's',
        value_name = "NAME",
        value_parser = NonEmptyStringValueParser::new(),
        conflicts_with = "unset"
    )]
    /// Set start function to exported function name.
    pub set: Option<String>,

    #[arg(short = 'u')]
    /// Unset start function.
    pub unset: bool,

    #[arg(short = 'x')]
    /// Unexport all export functions.
    pub unexport: bool,

    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    /// Diagnostics level: off, error, warn, info, debug or trace.
    pub log_level: LevelFilter,
}

/// Fully validated invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub input: PathBuf,
    pub mode: Mode,
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Print the start function index, write nothing.
    Report,

    /// Write an edited copy of the input.
    Edit(EditOptions),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditOptions {
    pub output: PathBuf,

    /// Export name of the new start function.  `None` leaves the module without a start
    /// section.
    pub set_start: Option<String>,

    /// Drop the export section.
    pub unexport: bool,
}

impl From<Args> for Options {
    fn from(
        Args {
            input,
            output,
            set,
            unset: _,
            unexport,
            log_level,
        }: Args,
    ) -> Self {
        // `clap` already enforced that `output` is present exactly when an edit flag is.
        let mode = match output {
            Some(output) => Mode::Edit(EditOptions {
                output,
                set_start: set,
                unexport,
            }),
            None => Mode::Report,
        };

        Self {
            input,
            mode,
            log_level,
        }
    }
}

/// Parses a full command line, including the program name in the first position.
///
/// Does not print or exit: usage problems come back as a `clap::Error`, which the caller can
/// render (`Error::print`) and turn into an exit code (`Error::exit_code`).
pub fn parse_from<I, T>(args: I) -> Result<Options, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map(Options::from)
}
