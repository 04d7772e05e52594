use crate::{BinaryReader, Encode, FromReader, GlobalType, InitExpr, Result};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// An entry of the global section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalEntry {
    /// The global's type.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: GlobalType,
    /// The global's initial value.
    pub init: InitExpr,
}

impl Encode for GlobalEntry {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.ty.encode(sink)?;
        self.init.encode(sink)
    }
}

impl<'a> FromReader<'a> for GlobalEntry {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(GlobalEntry {
            ty: reader.read()?,
            init: reader.read()?,
        })
    }
}
