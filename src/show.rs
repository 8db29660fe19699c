//! Report mode: prints the start function of the input.

use std::{io, path::Path};

use crate::module::ModuleView;

pub fn run<Output>(input_path: &Path, module: &dyn ModuleView, output: &mut Output) -> io::Result<()>
where
    Output: io::Write,
{
    match module.start_func() {
        Some(index) => writeln!(
            output,
            "{}: start function index: {}",
            input_path.display(),
            index,
        ),
        None => writeln!(output, "{}: start function not defined", input_path.display()),
    }
}
