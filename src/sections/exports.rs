use crate::{BinaryReader, Encode, ExternalKind, FromReader, Result};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// An entry of the export section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportEntry {
    /// The name the definition is exported under.
    pub field: String,
    /// The kind of the exported definition.
    pub kind: ExternalKind,
    /// The index of the definition in the index space of its kind.
    pub index: u32,
}

impl Encode for ExportEntry {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.field.encode(sink)?;
        self.kind.encode(sink)?;
        self.index.encode(sink)
    }
}

impl<'a> FromReader<'a> for ExportEntry {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(ExportEntry {
            field: reader.read()?,
            kind: reader.read()?,
            index: reader.read_var_u32()?,
        })
    }
}
