use crate::encode::write_bytes;
use crate::{BinaryReader, Encode, FromReader, InitExpr, Result};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// An entry of the data section: bytes copied into a linear memory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataSegment {
    /// The memory index.
    pub index: u32,
    /// Where in the memory the data goes.
    pub offset: InitExpr,
    /// The bytes to copy.
    pub data: Vec<u8>,
}

impl Encode for DataSegment {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.index.encode(sink)?;
        self.offset.encode(sink)?;
        write_bytes(sink, &self.data);
        Ok(())
    }
}

impl<'a> FromReader<'a> for DataSegment {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let index = reader.read_var_u32()?;
        let offset = reader.read()?;
        let len = reader.read_var_u32()? as usize;
        let data = reader.read_bytes(len)?.to_vec();
        Ok(DataSegment {
            index,
            offset,
            data,
        })
    }
}
