//! The module is edited by producing a new copy of the input where some sections are dropped and
//! a new start section is inserted in place of the old one.
//!
//! All the offsets are computed upfront into a `SplicePlan`: an ordered list of input ranges to
//! copy and byte strings to insert.  Writing the output is then a single pass over the plan.

use std::{io, ops::Range};

use anyhow::{bail, Result};
use tracing::debug;

use crate::module::SectionRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Copy this input range verbatim.
    Copy(Range<usize>),
    /// Write these bytes.
    Insert(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplicePlan {
    pieces: Vec<Piece>,
}

impl SplicePlan {
    /// Plans an output that drops the `start` section (which may be empty), writes `replacement`
    /// at its offset, and additionally drops `also_drop` if given.
    ///
    /// Fails if a range does not fit into `input_len` bytes, or if the two ranges overlap.
    pub fn new(
        input_len: usize,
        start: SectionRange,
        replacement: Vec<u8>,
        also_drop: Option<SectionRange>,
    ) -> Result<Self> {
        let mut dropped = vec![(start, true)];
        dropped.extend(also_drop.map(|range| (range, false)));
        // On a shared offset, the start section goes last so the replacement follows any other
        // empty range.
        dropped.sort_by_key(|(range, is_start)| (range.offset, *is_start, range.length));

        let mut replacement = Some(replacement);
        let mut pieces = vec![];
        let mut copied_up_to = 0;

        for (range, is_start) in dropped {
            if range.end() > input_len {
                bail!(
                    "Section 0x{:x} - 0x{:x} extends past the end of the input.\n\
                     Input size: 0x{input_len:x}",
                    range.offset,
                    range.end(),
                );
            }
            if range.offset < copied_up_to {
                bail!(
                    "Sections to remove overlap.\n\
                     Section 0x{:x} - 0x{:x} starts before the previous one ends at 0x{:x}",
                    range.offset,
                    range.end(),
                    copied_up_to,
                );
            }

            if copied_up_to < range.offset {
                pieces.push(Piece::Copy(copied_up_to..range.offset));
            }
            if is_start {
                match replacement.take() {
                    Some(bytes) if !bytes.is_empty() => pieces.push(Piece::Insert(bytes)),
                    _ => {}
                }
            }

            copied_up_to = range.end();
        }

        if copied_up_to < input_len {
            pieces.push(Piece::Copy(copied_up_to..input_len));
        }

        let plan = Self { pieces };
        debug!(
            "Splice plan: {} pieces, 0x{input_len:x} bytes in, 0x{:x} bytes out",
            plan.pieces.len(),
            plan.output_len(),
        );
        Ok(plan)
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn output_len(&self) -> usize {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Copy(range) => range.len(),
                Piece::Insert(bytes) => bytes.len(),
            })
            .sum()
    }

    /// Streams the planned output.  `input` must be the bytes the plan was computed for.
    pub fn write_to<Output>(&self, input: &[u8], output: &mut Output) -> io::Result<()>
    where
        Output: io::Write,
    {
        for piece in &self.pieces {
            match piece {
                Piece::Copy(range) => {
                    let bytes = input.get(range.clone()).ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!(
                                "Input is 0x{:x} bytes, but the plan copies up to 0x{:x}",
                                input.len(),
                                range.end,
                            ),
                        )
                    })?;
                    output.write_all(bytes)?;
                }
                Piece::Insert(bytes) => output.write_all(bytes)?,
            }
        }

        Ok(())
    }
}
