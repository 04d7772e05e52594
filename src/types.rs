use crate::{BinaryReader, Encode, FromReader, Result};
use std::fmt;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// A language type: the single-byte type constructors of the binary format.
///
/// Besides the four number types this covers the `anyfunc` table element
/// type, the `func` form of a type entry and the marker for a block without
/// a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValType {
    /// The `i32` type.
    #[cfg_attr(feature = "serde", serde(rename = "i32"))]
    I32,
    /// The `i64` type.
    #[cfg_attr(feature = "serde", serde(rename = "i64"))]
    I64,
    /// The `f32` type.
    #[cfg_attr(feature = "serde", serde(rename = "f32"))]
    F32,
    /// The `f64` type.
    #[cfg_attr(feature = "serde", serde(rename = "f64"))]
    F64,
    /// The element type of tables.
    #[cfg_attr(feature = "serde", serde(rename = "anyFunc"))]
    AnyFunc,
    /// The form of a function type entry.
    #[cfg_attr(feature = "serde", serde(rename = "func"))]
    Func,
    /// The block type of a block, loop or if without a result.
    #[cfg_attr(feature = "serde", serde(rename = "block_type"))]
    Empty,
}

impl ValType {
    /// Maps a type constructor byte to its type.
    pub fn from_byte(byte: u8) -> Option<ValType> {
        Some(match byte {
            0x7f => ValType::I32,
            0x7e => ValType::I64,
            0x7d => ValType::F32,
            0x7c => ValType::F64,
            0x70 => ValType::AnyFunc,
            0x60 => ValType::Func,
            0x40 => ValType::Empty,
            _ => return None,
        })
    }

    /// The type constructor byte of this type.
    pub fn as_byte(self) -> u8 {
        match self {
            ValType::I32 => 0x7f,
            ValType::I64 => 0x7e,
            ValType::F32 => 0x7d,
            ValType::F64 => 0x7c,
            ValType::AnyFunc => 0x70,
            ValType::Func => 0x60,
            ValType::Empty => 0x40,
        }
    }

    /// The name of this type, as used in instruction mnemonics.
    pub fn name(self) -> &'static str {
        match self {
            ValType::I32 => "i32",
            ValType::I64 => "i64",
            ValType::F32 => "f32",
            ValType::F64 => "f64",
            ValType::AnyFunc => "anyFunc",
            ValType::Func => "func",
            ValType::Empty => "block_type",
        }
    }

    /// The inverse of [`ValType::name`].
    pub fn from_name(name: &str) -> Option<ValType> {
        Some(match name {
            "i32" => ValType::I32,
            "i64" => ValType::I64,
            "f32" => ValType::F32,
            "f64" => ValType::F64,
            "anyFunc" => ValType::AnyFunc,
            "func" => ValType::Func,
            "block_type" => ValType::Empty,
            _ => return None,
        })
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Encode for ValType {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        sink.push(self.as_byte());
        Ok(())
    }
}

impl<'a> FromReader<'a> for ValType {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let byte = reader.read_u8()?;
        match ValType::from_byte(byte) {
            Some(ty) => Ok(ty),
            None => reader.invalid_leading_byte(byte, "value type"),
        }
    }
}

/// The kind of definition being imported or exported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExternalKind {
    /// A function.
    Function,
    /// A table.
    Table,
    /// A linear memory.
    Memory,
    /// A global.
    Global,
}

impl ExternalKind {
    /// The name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ExternalKind::Function => "function",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
        }
    }
}

impl Encode for ExternalKind {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        sink.push(match self {
            ExternalKind::Function => 0x00,
            ExternalKind::Table => 0x01,
            ExternalKind::Memory => 0x02,
            ExternalKind::Global => 0x03,
        });
        Ok(())
    }
}

impl<'a> FromReader<'a> for ExternalKind {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        match reader.read_u8()? {
            0x00 => Ok(ExternalKind::Function),
            0x01 => Ok(ExternalKind::Table),
            0x02 => Ok(ExternalKind::Memory),
            0x03 => Ok(ExternalKind::Global),
            byte => reader.invalid_leading_byte(byte, "external kind"),
        }
    }
}

/// The size limits of a table or a linear memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResizableLimits {
    /// The initial size.
    pub initial: u32,
    /// The maximum size, if any.
    ///
    /// Whether a maximum is present is encoded in a flag byte in front of the
    /// sizes.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub maximum: Option<u32>,
}

impl Encode for ResizableLimits {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        match self.maximum {
            Some(maximum) => {
                sink.push(0x01);
                self.initial.encode(sink)?;
                maximum.encode(sink)
            }
            None => {
                sink.push(0x00);
                self.initial.encode(sink)
            }
        }
    }
}

impl<'a> FromReader<'a> for ResizableLimits {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let has_maximum = match reader.read_u8()? {
            0x00 => false,
            0x01 => true,
            byte => return reader.invalid_leading_byte(byte, "limits flags"),
        };
        let initial = reader.read_var_u32()?;
        let maximum = if has_maximum {
            Some(reader.read_var_u32()?)
        } else {
            None
        };
        Ok(ResizableLimits { initial, maximum })
    }
}

/// The type of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableType {
    /// The type of the table's elements, `anyfunc` in practice.
    pub element_type: ValType,
    /// The table's size limits.
    pub limits: ResizableLimits,
}

impl Encode for TableType {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.element_type.encode(sink)?;
        self.limits.encode(sink)
    }
}

impl<'a> FromReader<'a> for TableType {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(TableType {
            element_type: reader.read()?,
            limits: reader.read()?,
        })
    }
}

/// The type of a global.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalType {
    /// The type of the value the global holds.
    pub content_type: ValType,
    /// Whether the global can be assigned to.
    pub mutable: bool,
}

impl Encode for GlobalType {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.content_type.encode(sink)?;
        sink.push(self.mutable as u8);
        Ok(())
    }
}

impl<'a> FromReader<'a> for GlobalType {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let content_type = reader.read()?;
        let mutable = match reader.read_u8()? {
            0x00 => false,
            0x01 => true,
            byte => return reader.invalid_leading_byte(byte, "global mutability"),
        };
        Ok(GlobalType {
            content_type,
            mutable,
        })
    }
}

/// An entry of the type section: the signature of a function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeEntry {
    /// The type constructor, always `func` in practice.
    pub form: ValType,
    /// The parameter types.
    pub params: Vec<ValType>,
    /// The result type. There is at most one.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub return_type: Option<ValType>,
}

impl TypeEntry {
    /// Creates a `func` type entry.
    pub fn func(params: impl Into<Vec<ValType>>, return_type: Option<ValType>) -> TypeEntry {
        TypeEntry {
            form: ValType::Func,
            params: params.into(),
            return_type,
        }
    }
}

impl Encode for TypeEntry {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.form.encode(sink)?;
        self.params.encode(sink)?;
        match self.return_type {
            Some(ty) => {
                sink.push(0x01);
                ty.encode(sink)
            }
            None => {
                sink.push(0x00);
                Ok(())
            }
        }
    }
}

impl<'a> FromReader<'a> for TypeEntry {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let form = reader.read()?;
        let params = reader.read_vec()?;
        let pos = reader.original_position();
        let return_type = match reader.read_var_u32()? {
            0 => None,
            1 => Some(reader.read()?),
            n => {
                return Err(crate::Error::malformed(
                    format!("function types have at most one result, found {n}"),
                    pos,
                ))
            }
        };
        Ok(TypeEntry {
            form,
            params,
            return_type,
        })
    }
}
