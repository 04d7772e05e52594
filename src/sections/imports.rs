use crate::{
    BinaryReader, Encode, ExternalKind, FromReader, GlobalType, ResizableLimits, Result,
    TableType,
};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// The type of an imported definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "type", rename_all = "snake_case")
)]
pub enum ImportType {
    /// A function, given by its type index.
    Function(u32),
    /// A table.
    Table(TableType),
    /// A linear memory.
    Memory(ResizableLimits),
    /// A global.
    Global(GlobalType),
}

impl ImportType {
    /// The kind of definition being imported.
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportType::Function(_) => ExternalKind::Function,
            ImportType::Table(_) => ExternalKind::Table,
            ImportType::Memory(_) => ExternalKind::Memory,
            ImportType::Global(_) => ExternalKind::Global,
        }
    }
}

/// An entry of the import section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImportEntry {
    /// The module being imported from.
    pub module: String,
    /// The name of the imported item within that module.
    pub field: String,
    /// What is being imported.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub ty: ImportType,
}

impl Encode for ImportEntry {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.module.encode(sink)?;
        self.field.encode(sink)?;
        self.ty.kind().encode(sink)?;
        match &self.ty {
            ImportType::Function(index) => index.encode(sink),
            ImportType::Table(ty) => ty.encode(sink),
            ImportType::Memory(limits) => limits.encode(sink),
            ImportType::Global(ty) => ty.encode(sink),
        }
    }
}

impl<'a> FromReader<'a> for ImportEntry {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let module = reader.read()?;
        let field = reader.read()?;
        let ty = match reader.read()? {
            ExternalKind::Function => ImportType::Function(reader.read_var_u32()?),
            ExternalKind::Table => ImportType::Table(reader.read()?),
            ExternalKind::Memory => ImportType::Memory(reader.read()?),
            ExternalKind::Global => ImportType::Global(reader.read()?),
        };
        Ok(ImportEntry { module, field, ty })
    }
}
