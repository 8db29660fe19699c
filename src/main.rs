use std::{fs, io, process::ExitCode};

use anyhow::{Context as _, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use args::{Mode, Options};

mod args;
mod modify;
mod module;
mod show;
mod splice;
mod start_section;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_module;

fn main() -> ExitCode {
    let options = match args::parse_from(std::env::args_os()) {
        Ok(options) => options,
        // Prints usage and exits with 2, or with 0 for `--help` and `--version`.
        Err(err) => err.exit(),
    };

    init_logging(options.log_level);

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::default().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(Options { input, mode, .. }: Options) -> Result<()> {
    let input_bytes =
        fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;

    let (module, sections) =
        module::load_sections(&input_bytes).with_context(|| format!("{}", input.display()))?;

    match mode {
        Mode::Report => show::run(&input, &module, &mut io::stdout().lock())
            .context("Failed to write the report")?,
        Mode::Edit(options) => modify::run(&input, &input_bytes, &module, &sections, &options)?,
    }

    Ok(())
}
