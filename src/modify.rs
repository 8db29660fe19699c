//! Edit mode: writes a copy of the input with the start section replaced or removed, and the
//! export section optionally removed.

use std::{
    error::Error,
    fmt,
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use tracing::info;

use crate::{
    args::EditOptions,
    module::{ModuleView, SectionMap, Signature},
    splice::SplicePlan,
    start_section::encode_start_section,
};

/// Why an export can not become the start function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    ExportNotFound {
        input: PathBuf,
        name: String,
    },
    UnsuitableType {
        input: PathBuf,
        name: String,
        signature: Signature,
    },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::ExportNotFound { input, name } => write!(
                f,
                "{}: export function not found: {:?}",
                input.display(),
                name,
            ),
            EditError::UnsuitableType {
                input,
                name,
                signature,
            } => write!(
                f,
                "{}: function has unsuitable type: {}{}",
                input.display(),
                name,
                signature,
            ),
        }
    }
}

impl Error for EditError {}

/// Bytes of the new start section: empty when no start function is requested.
pub fn start_section_for(
    input_path: &Path,
    module: &dyn ModuleView,
    set_start: Option<&str>,
) -> Result<Vec<u8>, EditError> {
    let Some(name) = set_start else {
        return Ok(vec![]);
    };

    let Some(func) = module.export_func(name) else {
        return Err(EditError::ExportNotFound {
            input: input_path.to_owned(),
            name: name.to_owned(),
        });
    };

    if !func.signature.is_niladic() {
        return Err(EditError::UnsuitableType {
            input: input_path.to_owned(),
            name: name.to_owned(),
            signature: func.signature,
        });
    }

    info!("New start function: \"{name}\", index {}", func.index);
    Ok(encode_start_section(func.index))
}

/// Resolves the requested edit into a splice of the input.  Touches no files.
pub fn plan(
    input_path: &Path,
    input_len: usize,
    module: &dyn ModuleView,
    sections: &SectionMap,
    options: &EditOptions,
) -> Result<SplicePlan> {
    let replacement = start_section_for(input_path, module, options.set_start.as_deref())?;

    SplicePlan::new(
        input_len,
        sections.start,
        replacement,
        options.unexport.then_some(sections.export),
    )
    .with_context(|| format!("{}: unexpected section layout", input_path.display()))
}

pub fn run(
    input_path: &Path,
    input_bytes: &[u8],
    module: &dyn ModuleView,
    sections: &SectionMap,
    options: &EditOptions,
) -> Result<()> {
    let plan = plan(input_path, input_bytes.len(), module, sections, options)?;

    // Only created once the edit is known to be valid.  A write failure below leaves a partial
    // file behind.
    let output_path = &options.output;
    let output = File::create(output_path).with_context(|| {
        format!("Failed to create the output file: {}", output_path.display())
    })?;
    let mut output = BufWriter::new(output);

    plan.write_to(input_bytes, &mut output)
        .and_then(|()| output.flush())
        .with_context(|| format!("Failed to write the output file: {}", output_path.display()))?;

    info!(
        "Wrote {}: 0x{:x} bytes",
        output_path.display(),
        plan.output_len(),
    );
    Ok(())
}
