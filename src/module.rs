//! The few facts about the input module that the editor needs.
//!
//! Decoding is done by `wasmparser`.  This module only remembers where the start and export
//! sections live in the file, what the start function is, and what each function export
//! resolves to.

use std::{fmt, ops::Range};

use anyhow::{bail, Context as _, Result};
use tracing::{debug, trace};
use wasmparser::{
    Chunk, Encoding, ExternalKind, FuncType, Parser, Payload, RefType, TypeRef, ValType,
};

use crate::start_section::START_SECTION_ID;

pub const CUSTOM_SECTION_ID: u8 = 0;
pub const EXPORT_SECTION_ID: u8 = 7;

/// What the editor asks of a parsed module.
pub trait ModuleView {
    /// Index of the start function, if the module has a start section.
    fn start_func(&self) -> Option<u32>;

    /// Function exported under `name`.  Exports of tables, memories and globals are ignored.
    fn export_func(&self, name: &str) -> Option<ExportedFunc>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFunc {
    pub index: u32,
    pub signature: Signature,
}

/// Parameter and result types of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

impl Signature {
    /// `() -> ()`, the only type a start function may have.
    pub fn niladic() -> Self {
        Self::default()
    }

    pub fn is_niladic(&self) -> bool {
        *self == Self::niladic()
    }
}

impl From<&FuncType> for Signature {
    fn from(ty: &FuncType) -> Self {
        Self {
            params: ty.params().to_vec(),
            results: ty.results().to_vec(),
        }
    }
}

fn val_type_name(ty: &ValType) -> String {
    match ty {
        ValType::I32 => "i32".to_owned(),
        ValType::I64 => "i64".to_owned(),
        ValType::F32 => "f32".to_owned(),
        ValType::F64 => "f64".to_owned(),
        ValType::V128 => "v128".to_owned(),
        ValType::Ref(ty) if *ty == RefType::FUNCREF => "funcref".to_owned(),
        ValType::Ref(ty) if *ty == RefType::EXTERNREF => "externref".to_owned(),
        ValType::Ref(ty) => format!("{ty:?}"),
    }
}

/// Formats as `(i32, i64) -> f32`.  No results are shown as nothing, multiple results are
/// parenthesised.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |types: &[ValType]| {
            types
                .iter()
                .map(val_type_name)
                .collect::<Vec<_>>()
                .join(", ")
        };

        write!(f, "({})", names(&self.params))?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " -> {}", val_type_name(single)),
            results => write!(f, " -> ({})", names(results)),
        }
    }
}

/// Byte range of a whole section, including the id and the size prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRange {
    pub offset: usize,
    pub length: usize,
}

impl SectionRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn as_range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    pub id: u8,
    pub range: SectionRange,
}

/// Locations of the sections the editor rewrites.
///
/// A missing section has a zero length, positioned where it would be inserted according to the
/// canonical section order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    pub start: SectionRange,
    pub export: SectionRange,
    /// Every section in file order, custom sections included.
    pub sections: Vec<SectionInfo>,
}

/// Position of a non-custom section id in the order the binary format requires.
fn canonical_rank(id: u8) -> Option<u8> {
    // The tag (13) and data count (12) sections were added later and do not follow the numeric
    // order of their ids.
    const ORDER: [u8; 13] = [1, 2, 3, 4, 5, 13, 6, 7, 8, 9, 12, 10, 11];

    ORDER
        .iter()
        .position(|&candidate| candidate == id)
        .map(|rank| rank as u8)
}

impl SectionMap {
    fn new(preamble_end: usize, sections: Vec<SectionInfo>) -> Self {
        let start = Self::locate(preamble_end, &sections, START_SECTION_ID);
        let export = Self::locate(preamble_end, &sections, EXPORT_SECTION_ID);

        Self {
            start,
            export,
            sections,
        }
    }

    fn locate(preamble_end: usize, sections: &[SectionInfo], id: u8) -> SectionRange {
        if let Some(section) = sections.iter().find(|section| section.id == id) {
            return section.range;
        }

        let rank = canonical_rank(id);
        let insert_at = sections
            .iter()
            .filter(|section| {
                section.id != CUSTOM_SECTION_ID
                    && canonical_rank(section.id).is_some_and(|other| Some(other) < rank)
            })
            .map(|section| section.range.end())
            .max()
            .unwrap_or(preamble_end);

        SectionRange::new(insert_at, 0)
    }
}

/// Module view backed by a `wasmparser` pass over the whole binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasmModule {
    start: Option<u32>,
    exports: Vec<(String, ExportedFunc)>,
}

impl ModuleView for WasmModule {
    fn start_func(&self) -> Option<u32> {
        self.start
    }

    fn export_func(&self, name: &str) -> Option<ExportedFunc> {
        self.exports
            .iter()
            .find(|(export_name, _)| export_name == name)
            .map(|(_, func)| func.clone())
    }
}

/// Parses a complete module, collecting the start function, the function exports with their
/// signatures and the section layout.
///
/// Code section bodies are skipped without being decoded.
pub fn load_sections(bytes: &[u8]) -> Result<(WasmModule, SectionMap)> {
    let mut parser = Parser::new(0);
    let mut offset = 0;
    let mut preamble_end = 0;
    let mut sections = vec![];

    let mut types: Vec<Signature> = vec![];
    // Type index for every function, imported ones first.
    let mut function_types: Vec<u32> = vec![];
    let mut func_exports: Vec<(String, u32)> = vec![];
    let mut start = None;
    // Rank of the last non-custom section, sections must follow in strictly increasing rank.
    let mut last_rank = None;

    loop {
        let remaining = bytes
            .get(offset..)
            .with_context(|| format!("Section ends past the end of the module: 0x{offset:x}"))?;
        let (consumed, payload) = match parser
            .parse(remaining, true)
            .with_context(|| format!("Failed to parse the module at offset 0x{offset:x}"))?
        {
            Chunk::Parsed { consumed, payload } => (consumed, payload),
            Chunk::NeedMoreData(hint) => bail!(
                "Module is truncated: at least {hint} more bytes expected at offset 0x{offset:x}"
            ),
        };

        let section_offset = offset;
        offset += consumed;

        if let Some((id, range)) = payload.as_section() {
            let section = SectionInfo {
                id,
                range: SectionRange::new(section_offset, range.end - section_offset),
            };
            trace!(
                "Section {}: 0x{:0>8x} - 0x{:0>8x}",
                section.id,
                section.range.offset,
                section.range.end(),
            );

            if let Some(rank) = canonical_rank(id) {
                if last_rank.is_some_and(|last| rank <= last) {
                    bail!(
                        "Section {id} at offset 0x{section_offset:x} is duplicated or out of \
                         order"
                    );
                }
                last_rank = Some(rank);
            }

            sections.push(section);
        }

        match payload {
            Payload::Version {
                encoding: Encoding::Module,
                range,
                ..
            } => preamble_end = range.end,
            Payload::Version { encoding, .. } => {
                bail!("Expected a core WebAssembly module, got a {encoding:?} binary")
            }
            Payload::TypeSection(reader) => {
                for ty in reader.into_iter_err_on_gc_types() {
                    types.push(Signature::from(&ty.context("Unsupported type definition")?));
                }
            }
            Payload::ImportSection(reader) => {
                for import in reader {
                    if let TypeRef::Func(type_index) = import?.ty {
                        function_types.push(type_index);
                    }
                }
            }
            Payload::FunctionSection(reader) => {
                for type_index in reader {
                    function_types.push(type_index?);
                }
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export?;
                    if export.kind == ExternalKind::Func {
                        func_exports.push((export.name.to_owned(), export.index));
                    }
                }
            }
            Payload::StartSection { func, .. } => start = Some(func),
            Payload::CodeSectionStart { range, .. } => {
                parser.skip_section();
                offset = range.end;
            }
            Payload::End(_) => break,
            _ => {}
        }
    }

    let exports = func_exports
        .into_iter()
        .map(|(name, index)| {
            let type_index = *function_types.get(index as usize).with_context(|| {
                format!(
                    "Export \"{name}\" refers to function {index}, but the module only has {} \
                     functions",
                    function_types.len(),
                )
            })?;
            let signature = types.get(type_index as usize).cloned().with_context(|| {
                format!(
                    "Function {index} has type {type_index}, but the module only has {} types",
                    types.len(),
                )
            })?;

            Ok((name, ExportedFunc { index, signature }))
        })
        .collect::<Result<Vec<_>>>()?;

    let sections = SectionMap::new(preamble_end, sections);
    debug!(
        "Start section: 0x{:x} + {}, export section: 0x{:x} + {}, {} sections total",
        sections.start.offset,
        sections.start.length,
        sections.export.offset,
        sections.export.length,
        sections.sections.len(),
    );

    Ok((WasmModule { start, exports }, sections))
}
