use crate::encode::write_sized;
use crate::sections::encode_bodies;
use crate::{
    BinaryReader, CustomSection, DataSegment, ElementEntry, Encode, Error, ErrorKind,
    ExportEntry, FunctionBody, GlobalEntry, ImportEntry, ResizableLimits, Result, TableType,
    TypeEntry, WASM_MAGIC_NUMBER, WASM_VERSION,
};
use std::fmt;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// The first 8 bytes of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Preamble {
    /// The magic number, `\0asm`.
    pub magic: [u8; 4],
    /// The format version, `1`.
    pub version: u32,
}

impl Default for Preamble {
    fn default() -> Preamble {
        Preamble {
            magic: *WASM_MAGIC_NUMBER,
            version: WASM_VERSION,
        }
    }
}

impl Encode for Preamble {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        sink.extend_from_slice(&self.magic);
        sink.extend_from_slice(&self.version.to_le_bytes());
        Ok(())
    }
}

/// The id of a section, the byte in front of its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SectionId {
    /// Named, uninterpreted bytes.
    Custom = 0,
    /// Function signatures.
    Type = 1,
    /// Imported functions, tables, memories and globals.
    Import = 2,
    /// The type index of each defined function.
    Function = 3,
    /// Defined tables.
    Table = 4,
    /// Defined memories.
    Memory = 5,
    /// Defined globals.
    Global = 6,
    /// Exported items.
    Export = 7,
    /// The start function.
    Start = 8,
    /// Table initializers.
    Element = 9,
    /// Function bodies.
    Code = 10,
    /// Memory initializers.
    Data = 11,
}

impl SectionId {
    /// The name of this kind of section.
    pub fn name(self) -> &'static str {
        match self {
            SectionId::Custom => "custom",
            SectionId::Type => "type",
            SectionId::Import => "import",
            SectionId::Function => "function",
            SectionId::Table => "table",
            SectionId::Memory => "memory",
            SectionId::Global => "global",
            SectionId::Export => "export",
            SectionId::Start => "start",
            SectionId::Element => "element",
            SectionId::Code => "code",
            SectionId::Data => "data",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for SectionId {
    type Error = Error;

    fn try_from(id: u8) -> Result<SectionId> {
        Ok(match id {
            0 => SectionId::Custom,
            1 => SectionId::Type,
            2 => SectionId::Import,
            3 => SectionId::Function,
            4 => SectionId::Table,
            5 => SectionId::Memory,
            6 => SectionId::Global,
            7 => SectionId::Export,
            8 => SectionId::Start,
            9 => SectionId::Element,
            10 => SectionId::Code,
            11 => SectionId::Data,
            _ => return Err(ErrorKind::UnknownSectionId(id).into()),
        })
    }
}

impl From<SectionId> for u8 {
    fn from(id: SectionId) -> u8 {
        id as u8
    }
}

/// A section of a module.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "name", rename_all = "snake_case"))]
pub enum Section {
    /// A named, opaque section.
    Custom(CustomSection),
    /// Function signatures.
    Type { entries: Vec<TypeEntry> },
    /// Imported definitions.
    Import { entries: Vec<ImportEntry> },
    /// The type index of every function defined in the module.
    Function { entries: Vec<u32> },
    /// Table definitions.
    Table { entries: Vec<TableType> },
    /// Linear memory definitions.
    Memory { entries: Vec<ResizableLimits> },
    /// Global definitions.
    Global { entries: Vec<GlobalEntry> },
    /// Exported definitions.
    Export { entries: Vec<ExportEntry> },
    /// The index of the start function.
    Start { index: u32 },
    /// Table initializers.
    Element { entries: Vec<ElementEntry> },
    /// Function bodies, one per entry of the function section.
    Code { entries: Vec<FunctionBody> },
    /// Memory initializers.
    Data { entries: Vec<DataSegment> },
}

impl Section {
    /// The id this section is encoded with.
    pub fn id(&self) -> SectionId {
        match self {
            Section::Custom(_) => SectionId::Custom,
            Section::Type { .. } => SectionId::Type,
            Section::Import { .. } => SectionId::Import,
            Section::Function { .. } => SectionId::Function,
            Section::Table { .. } => SectionId::Table,
            Section::Memory { .. } => SectionId::Memory,
            Section::Global { .. } => SectionId::Global,
            Section::Export { .. } => SectionId::Export,
            Section::Start { .. } => SectionId::Start,
            Section::Element { .. } => SectionId::Element,
            Section::Code { .. } => SectionId::Code,
            Section::Data { .. } => SectionId::Data,
        }
    }

    /// The number of entries in this section.
    ///
    /// A start section always has one entry and a custom section none.
    pub fn len(&self) -> usize {
        match self {
            Section::Custom(_) => 0,
            Section::Type { entries } => entries.len(),
            Section::Import { entries } => entries.len(),
            Section::Function { entries } => entries.len(),
            Section::Table { entries } => entries.len(),
            Section::Memory { entries } => entries.len(),
            Section::Global { entries } => entries.len(),
            Section::Export { entries } => entries.len(),
            Section::Start { .. } => 1,
            Section::Element { entries } => entries.len(),
            Section::Code { entries } => entries.len(),
            Section::Data { entries } => entries.len(),
        }
    }

    /// Whether [`Section::len`] is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the payload of a section with the given id. `reader` must
    /// span exactly the payload.
    pub fn read(id: SectionId, reader: &mut BinaryReader<'_>) -> Result<Section> {
        let declared = reader.bytes_remaining();
        let section = match id {
            SectionId::Custom => Section::Custom(CustomSection::read(reader)?),
            SectionId::Type => Section::Type {
                entries: reader.read_vec()?,
            },
            SectionId::Import => Section::Import {
                entries: reader.read_vec()?,
            },
            SectionId::Function => Section::Function {
                entries: reader.read_vec()?,
            },
            SectionId::Table => Section::Table {
                entries: reader.read_vec()?,
            },
            SectionId::Memory => Section::Memory {
                entries: reader.read_vec()?,
            },
            SectionId::Global => Section::Global {
                entries: reader.read_vec()?,
            },
            SectionId::Export => Section::Export {
                entries: reader.read_vec()?,
            },
            SectionId::Start => Section::Start {
                index: reader.read_var_u32()?,
            },
            SectionId::Element => Section::Element {
                entries: reader.read_vec()?,
            },
            SectionId::Code => Section::Code {
                entries: reader.read_vec()?,
            },
            SectionId::Data => Section::Data {
                entries: reader.read_vec()?,
            },
        };
        if !reader.eof() {
            return Err(Error::at(
                ErrorKind::SizeMismatch {
                    declared,
                    consumed: reader.current_position(),
                },
                reader.original_position(),
            ));
        }
        Ok(section)
    }
}

impl Encode for Section {
    /// Encodes the section's payload, without the id and size in front.
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        match self {
            Section::Custom(custom) => custom.encode(sink),
            Section::Type { entries } => entries.encode(sink),
            Section::Import { entries } => entries.encode(sink),
            Section::Function { entries } => entries.encode(sink),
            Section::Table { entries } => entries.encode(sink),
            Section::Memory { entries } => entries.encode(sink),
            Section::Global { entries } => entries.encode(sink),
            Section::Export { entries } => entries.encode(sink),
            Section::Start { index } => index.encode(sink),
            Section::Element { entries } => entries.encode(sink),
            Section::Code { entries } => encode_bodies(entries, sink),
            Section::Data { entries } => entries.encode(sink),
        }
    }
}

/// A WebAssembly module: the preamble followed by sections in the order
/// they appear in the binary.
///
/// Section order is neither checked nor changed, and indices between
/// sections are never resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    /// The module's preamble.
    pub preamble: Preamble,
    /// The module's sections.
    pub sections: Vec<Section>,
}

enum ParseState<'a> {
    Preamble,
    SectionHeader,
    SectionPayload {
        id: SectionId,
        payload: BinaryReader<'a>,
    },
    Done,
}

impl Module {
    /// Creates an empty module with the standard preamble.
    pub fn new() -> Module {
        Module::default()
    }

    /// Decodes a module from its binary encoding.
    ///
    /// All of `data` must be consumed; nothing of the module is returned if
    /// any part of it fails to decode.
    pub fn parse(data: &[u8]) -> Result<Module> {
        let mut reader = BinaryReader::new(data, 0);
        let mut module = Module::new();
        let mut state = ParseState::Preamble;
        loop {
            state = match state {
                ParseState::Preamble => {
                    module.preamble.version = reader.read_header_version()?;
                    ParseState::SectionHeader
                }
                ParseState::SectionHeader if reader.eof() => ParseState::Done,
                ParseState::SectionHeader => {
                    let pos = reader.original_position();
                    let id = reader.read_u8()?;
                    let id = SectionId::try_from(id).map_err(|e| Error::at(e.kind().clone(), pos))?;
                    let size = reader.read_var_u32().map_err(|e| e.in_section(id))?;
                    let payload = reader
                        .read_reader(size as usize)
                        .map_err(|e| e.in_section(id))?;
                    ParseState::SectionPayload { id, payload }
                }
                ParseState::SectionPayload { id, mut payload } => {
                    let start = payload.original_position();
                    let section = Section::read(id, &mut payload).map_err(|e| e.in_section(id))?;
                    log::debug!(
                        "decoded {id} section at offset {start:#x}: {} byte(s), {} entries",
                        payload.current_position(),
                        section.len()
                    );
                    module.sections.push(section);
                    ParseState::SectionHeader
                }
                ParseState::Done => return Ok(module),
            };
        }
    }

    /// Encodes this module into its binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut sink = Vec::new();
        self.encode(&mut sink)?;
        Ok(sink)
    }

    /// Every section with the given id, in order.
    pub fn sections_of(&self, id: SectionId) -> impl Iterator<Item = &Section> + '_ {
        self.sections.iter().filter(move |s| s.id() == id)
    }

    /// The first section with the given id.
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections_of(id).next()
    }

    /// The first section with the given id, mutably.
    pub fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id() == id)
    }
}

impl Encode for Module {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.preamble.encode(sink)?;
        let mut scratch = Vec::new();
        for section in &self.sections {
            let id = section.id();
            sink.push(id.into());
            write_sized(sink, &mut scratch, section).map_err(|e| e.in_section(id))?;
            log::debug!("encoded {id} section: {} byte(s)", scratch.len());
        }
        Ok(())
    }
}
