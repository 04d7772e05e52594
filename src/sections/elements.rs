use crate::{BinaryReader, Encode, FromReader, InitExpr, Result};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// An entry of the element section: function indices copied into a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementEntry {
    /// The table index.
    pub index: u32,
    /// Where in the table the elements go.
    pub offset: InitExpr,
    /// The function indices.
    pub elements: Vec<u32>,
}

impl Encode for ElementEntry {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.index.encode(sink)?;
        self.offset.encode(sink)?;
        self.elements.encode(sink)
    }
}

impl<'a> FromReader<'a> for ElementEntry {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(ElementEntry {
            index: reader.read_var_u32()?,
            offset: reader.read()?,
            elements: reader.read_vec()?,
        })
    }
}
