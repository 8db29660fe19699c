//! WebAssembly modules for tests, assembled with `wasm_encoder`.
//!
//! Sections are appended in call order, so callers are responsible for the section order.

use std::{borrow::Cow, ops::Range};

use wasm_encoder::{
    CodeSection, CustomSection, EntityType, ExportKind, ExportSection, Function, FunctionSection,
    ImportSection, Instruction, MemorySection, MemoryType, Module, Section, StartSection,
    TypeSection, ValType,
};

pub const I32: ValType = ValType::I32;
#[allow(dead_code)]
pub const I64: ValType = ValType::I64;
#[allow(dead_code)]
pub const F32: ValType = ValType::F32;

pub const KIND_FUNC: ExportKind = ExportKind::Func;
#[allow(dead_code)]
pub const KIND_MEMORY: ExportKind = ExportKind::Memory;

pub struct ModuleBuilder {
    module: Module,
    last: Range<usize>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            last: 0..0,
        }
    }

    /// Appends any section, remembering where it landed.
    pub fn section(mut self, section: &impl Section) -> Self {
        let offset = self.module.as_slice().len();
        self.module.section(section);
        self.last = offset..self.module.as_slice().len();
        self
    }

    /// Function types, as `(params, results)`.
    pub fn types(self, types: &[(&[ValType], &[ValType])]) -> Self {
        let mut section = TypeSection::new();
        for (params, results) in types {
            section
                .ty()
                .function(params.iter().copied(), results.iter().copied());
        }
        self.section(&section)
    }

    /// Function imports, as `(module, name, type index)`.
    #[allow(dead_code)]
    pub fn import_funcs(self, imports: &[(&str, &str, u32)]) -> Self {
        let mut section = ImportSection::new();
        for (module, field, type_index) in imports {
            section.import(module, field, EntityType::Function(*type_index));
        }
        self.section(&section)
    }

    pub fn functions(self, type_indices: &[u32]) -> Self {
        let mut section = FunctionSection::new();
        for type_index in type_indices {
            section.function(*type_index);
        }
        self.section(&section)
    }

    #[allow(dead_code)]
    pub fn memory(self, min_pages: u64) -> Self {
        let mut section = MemorySection::new();
        section.memory(MemoryType {
            minimum: min_pages,
            maximum: None,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        self.section(&section)
    }

    /// Exports, as `(name, kind, index)`.
    pub fn exports(self, exports: &[(&str, ExportKind, u32)]) -> Self {
        let mut section = ExportSection::new();
        for (name, kind, index) in exports {
            section.export(name, *kind, *index);
        }
        self.section(&section)
    }

    pub fn start(self, function_index: u32) -> Self {
        self.section(&StartSection { function_index })
    }

    /// `count` function bodies that do nothing.
    pub fn code(self, count: u32) -> Self {
        let mut section = CodeSection::new();
        for _ in 0..count {
            let mut body = Function::new(vec![]);
            body.instruction(&Instruction::End);
            section.function(&body);
        }
        self.section(&section)
    }

    #[allow(dead_code)]
    pub fn custom(self, name: &str, data: &[u8]) -> Self {
        self.section(&CustomSection {
            name: Cow::Borrowed(name),
            data: Cow::Borrowed(data),
        })
    }

    /// Byte range of the most recently added section.
    pub fn last_section(&self) -> Range<usize> {
        self.last.clone()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.module.as_slice().len()
    }

    pub fn build(self) -> Vec<u8> {
        self.module.finish()
    }
}
