use crate::encode::write_bytes;
use crate::{BinaryReader, Encode, Result};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// A custom section: a name and an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CustomSection {
    /// The name of the custom section.
    #[cfg_attr(feature = "serde", serde(rename = "section_name"))]
    pub name: String,
    /// Everything in the section after the name, kept verbatim.
    pub payload: Vec<u8>,
}

impl CustomSection {
    /// Reads a custom section from a reader spanning exactly its payload.
    ///
    /// The payload is whatever follows the name, so this consumes the whole
    /// reader.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<CustomSection> {
        let name = reader.read_string()?.to_string();
        let payload = reader.read_bytes(reader.bytes_remaining())?.to_vec();
        Ok(CustomSection { name, payload })
    }
}

impl Encode for CustomSection {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        write_bytes(sink, self.name.as_bytes());
        sink.extend_from_slice(&self.payload);
        Ok(())
    }
}
