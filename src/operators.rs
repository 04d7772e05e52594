//! The instruction table and the immediate operand codecs.
//!
//! Every supported instruction is listed exactly once, in
//! `for_each_opcode!`; the [`Opcode`] enum and both directions of the
//! mnemonic/byte mapping are generated from that list.

use crate::{BinaryReader, Encode, Error, ErrorKind, FromReader, Result, ValType};
use std::fmt;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// Invokes `$mac` with the full instruction table: one
/// `Variant = byte => "mnemonic"` line per instruction.
macro_rules! for_each_opcode {
    ($mac:ident) => {
        $mac! {
            Unreachable = 0x00 => "unreachable",
            Nop = 0x01 => "nop",
            Block = 0x02 => "block",
            Loop = 0x03 => "loop",
            If = 0x04 => "if",
            Else = 0x05 => "else",
            End = 0x0b => "end",
            Br = 0x0c => "br",
            BrIf = 0x0d => "br_if",
            BrTable = 0x0e => "br_table",
            Return = 0x0f => "return",
            Call = 0x10 => "call",
            CallIndirect = 0x11 => "call_indirect",
            Drop = 0x1a => "drop",
            Select = 0x1b => "select",
            LocalGet = 0x20 => "get_local",
            LocalSet = 0x21 => "set_local",
            LocalTee = 0x22 => "tee_local",
            GlobalGet = 0x23 => "get_global",
            GlobalSet = 0x24 => "set_global",
            I32Load = 0x28 => "i32.load",
            I64Load = 0x29 => "i64.load",
            F32Load = 0x2a => "f32.load",
            F64Load = 0x2b => "f64.load",
            I32Load8S = 0x2c => "i32.load8_s",
            I32Load8U = 0x2d => "i32.load8_u",
            I32Load16S = 0x2e => "i32.load16_s",
            I32Load16U = 0x2f => "i32.load16_u",
            I64Load8S = 0x30 => "i64.load8_s",
            I64Load8U = 0x31 => "i64.load8_u",
            I64Load16S = 0x32 => "i64.load16_s",
            I64Load16U = 0x33 => "i64.load16_u",
            I64Load32S = 0x34 => "i64.load32_s",
            I64Load32U = 0x35 => "i64.load32_u",
            I32Store = 0x36 => "i32.store",
            I64Store = 0x37 => "i64.store",
            F32Store = 0x38 => "f32.store",
            F64Store = 0x39 => "f64.store",
            I32Store8 = 0x3a => "i32.store8",
            I32Store16 = 0x3b => "i32.store16",
            I64Store8 = 0x3c => "i64.store8",
            I64Store16 = 0x3d => "i64.store16",
            I64Store32 = 0x3e => "i64.store32",
            MemorySize = 0x3f => "current_memory",
            MemoryGrow = 0x40 => "grow_memory",
            I32Const = 0x41 => "i32.const",
            I64Const = 0x42 => "i64.const",
            F32Const = 0x43 => "f32.const",
            F64Const = 0x44 => "f64.const",
            I32Eqz = 0x45 => "i32.eqz",
            I32Eq = 0x46 => "i32.eq",
            I32Ne = 0x47 => "i32.ne",
            I32LtS = 0x48 => "i32.lt_s",
            I32LtU = 0x49 => "i32.lt_u",
            I32GtS = 0x4a => "i32.gt_s",
            I32GtU = 0x4b => "i32.gt_u",
            I32LeS = 0x4c => "i32.le_s",
            I32LeU = 0x4d => "i32.le_u",
            I32GeS = 0x4e => "i32.ge_s",
            I32GeU = 0x4f => "i32.ge_u",
            I64Eqz = 0x50 => "i64.eqz",
            I64Eq = 0x51 => "i64.eq",
            I64Ne = 0x52 => "i64.ne",
            I64LtS = 0x53 => "i64.lt_s",
            I64LtU = 0x54 => "i64.lt_u",
            I64GtS = 0x55 => "i64.gt_s",
            I64GtU = 0x56 => "i64.gt_u",
            I64LeS = 0x57 => "i64.le_s",
            I64LeU = 0x58 => "i64.le_u",
            I64GeS = 0x59 => "i64.ge_s",
            I64GeU = 0x5a => "i64.ge_u",
            F32Eq = 0x5b => "f32.eq",
            F32Ne = 0x5c => "f32.ne",
            F32Lt = 0x5d => "f32.lt",
            F32Gt = 0x5e => "f32.gt",
            F32Le = 0x5f => "f32.le",
            F32Ge = 0x60 => "f32.ge",
            F64Eq = 0x61 => "f64.eq",
            F64Ne = 0x62 => "f64.ne",
            F64Lt = 0x63 => "f64.lt",
            F64Gt = 0x64 => "f64.gt",
            F64Le = 0x65 => "f64.le",
            F64Ge = 0x66 => "f64.ge",
            I32Clz = 0x67 => "i32.clz",
            I32Ctz = 0x68 => "i32.ctz",
            I32Popcnt = 0x69 => "i32.popcnt",
            I32Add = 0x6a => "i32.add",
            I32Sub = 0x6b => "i32.sub",
            I32Mul = 0x6c => "i32.mul",
            I32DivS = 0x6d => "i32.div_s",
            I32DivU = 0x6e => "i32.div_u",
            I32RemS = 0x6f => "i32.rem_s",
            I32RemU = 0x70 => "i32.rem_u",
            I32And = 0x71 => "i32.and",
            I32Or = 0x72 => "i32.or",
            I32Xor = 0x73 => "i32.xor",
            I32Shl = 0x74 => "i32.shl",
            I32ShrS = 0x75 => "i32.shr_s",
            I32ShrU = 0x76 => "i32.shr_u",
            I32Rotl = 0x77 => "i32.rotl",
            I32Rotr = 0x78 => "i32.rotr",
            I64Clz = 0x79 => "i64.clz",
            I64Ctz = 0x7a => "i64.ctz",
            I64Popcnt = 0x7b => "i64.popcnt",
            I64Add = 0x7c => "i64.add",
            I64Sub = 0x7d => "i64.sub",
            I64Mul = 0x7e => "i64.mul",
            I64DivS = 0x7f => "i64.div_s",
            I64DivU = 0x80 => "i64.div_u",
            I64RemS = 0x81 => "i64.rem_s",
            I64RemU = 0x82 => "i64.rem_u",
            I64And = 0x83 => "i64.and",
            I64Or = 0x84 => "i64.or",
            I64Xor = 0x85 => "i64.xor",
            I64Shl = 0x86 => "i64.shl",
            I64ShrS = 0x87 => "i64.shr_s",
            I64ShrU = 0x88 => "i64.shr_u",
            I64Rotl = 0x89 => "i64.rotl",
            I64Rotr = 0x8a => "i64.rotr",
            F32Abs = 0x8b => "f32.abs",
            F32Neg = 0x8c => "f32.neg",
            F32Ceil = 0x8d => "f32.ceil",
            F32Floor = 0x8e => "f32.floor",
            F32Trunc = 0x8f => "f32.trunc",
            F32Nearest = 0x90 => "f32.nearest",
            F32Sqrt = 0x91 => "f32.sqrt",
            F32Add = 0x92 => "f32.add",
            F32Sub = 0x93 => "f32.sub",
            F32Mul = 0x94 => "f32.mul",
            F32Div = 0x95 => "f32.div",
            F32Min = 0x96 => "f32.min",
            F32Max = 0x97 => "f32.max",
            F32Copysign = 0x98 => "f32.copysign",
            F64Abs = 0x99 => "f64.abs",
            F64Neg = 0x9a => "f64.neg",
            F64Ceil = 0x9b => "f64.ceil",
            F64Floor = 0x9c => "f64.floor",
            F64Trunc = 0x9d => "f64.trunc",
            F64Nearest = 0x9e => "f64.nearest",
            F64Sqrt = 0x9f => "f64.sqrt",
            F64Add = 0xa0 => "f64.add",
            F64Sub = 0xa1 => "f64.sub",
            F64Mul = 0xa2 => "f64.mul",
            F64Div = 0xa3 => "f64.div",
            F64Min = 0xa4 => "f64.min",
            F64Max = 0xa5 => "f64.max",
            F64Copysign = 0xa6 => "f64.copysign",
            I32WrapI64 = 0xa7 => "i32.wrap/i64",
            I32TruncF32S = 0xa8 => "i32.trunc_s/f32",
            I32TruncF32U = 0xa9 => "i32.trunc_u/f32",
            I32TruncF64S = 0xaa => "i32.trunc_s/f64",
            I32TruncF64U = 0xab => "i32.trunc_u/f64",
            I64ExtendI32S = 0xac => "i64.extend_s/i32",
            I64ExtendI32U = 0xad => "i64.extend_u/i32",
            I64TruncF32S = 0xae => "i64.trunc_s/f32",
            I64TruncF32U = 0xaf => "i64.trunc_u/f32",
            I64TruncF64S = 0xb0 => "i64.trunc_s/f64",
            I64TruncF64U = 0xb1 => "i64.trunc_u/f64",
            F32ConvertI32S = 0xb2 => "f32.convert_s/i32",
            F32ConvertI32U = 0xb3 => "f32.convert_u/i32",
            F32ConvertI64S = 0xb4 => "f32.convert_s/i64",
            F32ConvertI64U = 0xb5 => "f32.convert_u/i64",
            F32DemoteF64 = 0xb6 => "f32.demote/f64",
            F64ConvertI32S = 0xb7 => "f64.convert_s/i32",
            F64ConvertI32U = 0xb8 => "f64.convert_u/i32",
            F64ConvertI64S = 0xb9 => "f64.convert_s/i64",
            F64ConvertI64U = 0xba => "f64.convert_u/i64",
            F64PromoteF32 = 0xbb => "f64.promote/f32",
            I32ReinterpretF32 = 0xbc => "i32.reinterpret/f32",
            I64ReinterpretF64 = 0xbd => "i64.reinterpret/f64",
            F32ReinterpretI32 = 0xbe => "f32.reinterpret/i32",
            F64ReinterpretI64 = 0xbf => "f64.reinterpret/i64",
        }
    };
}

macro_rules! define_opcodes {
    ($($variant:ident = $byte:literal => $mnemonic:literal,)*) => {
        /// A one-byte instruction opcode.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $byte,)*
        }

        impl Opcode {
            /// Every opcode, in ascending byte order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Looks up the opcode encoded as `byte`.
            pub fn from_byte(byte: u8) -> Option<Opcode> {
                match byte {
                    $($byte => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            /// Looks up an opcode by its full mnemonic, such as `"i32.add"`.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
                match mnemonic {
                    $($mnemonic => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            /// The full mnemonic of this opcode, such as `"i32.add"`.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// The byte this opcode is encoded as.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The mnemonic without its type prefix: `"add"` for `i32.add`, `"nop"`
    /// for `nop`.
    pub fn name(self) -> &'static str {
        match self.mnemonic().split_once('.') {
            Some((_, name)) => name,
            None => self.mnemonic(),
        }
    }

    /// The type prefix of a type-overloaded mnemonic: `"i32"` for `i32.add`,
    /// `None` for `nop`.
    pub fn type_prefix(self) -> Option<&'static str> {
        self.mnemonic().split_once('.').map(|(prefix, _)| prefix)
    }

    /// The shape of the immediate operand following this opcode.
    ///
    /// Instructions are looked up by [`Opcode::name`], except for `const`
    /// instructions: all of them are named `const`, so their immediate is
    /// looked up by the type prefix instead (`i32.const` carries a signed
    /// 32-bit varint, `f64.const` a fixed 64-bit integer, and so on).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnsupportedImmediateShape`] for a `const`
    /// instruction whose type prefix has no codec.
    pub fn immediate_kind(self) -> Result<ImmediateKind> {
        match (self.name(), self.type_prefix()) {
            ("const", Some(prefix)) => immediate_by_key(prefix)
                .ok_or_else(|| ErrorKind::UnsupportedImmediateShape(self.mnemonic()).into()),
            (name, _) => Ok(immediate_by_key(name).unwrap_or(ImmediateKind::None)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The immediate table, keyed by instruction name or, for `const`
/// instructions, by type prefix. Names missing here take no immediate.
fn immediate_by_key(key: &str) -> Option<ImmediateKind> {
    Some(match key {
        "block" | "loop" | "if" => ImmediateKind::BlockType,
        "br" | "br_if" | "call" | "get_local" | "set_local" | "tee_local" | "get_global"
        | "set_global" => ImmediateKind::VarUint32,
        "br_table" => ImmediateKind::BrTable,
        "call_indirect" => ImmediateKind::CallIndirect,
        "load" | "load8_s" | "load8_u" | "load16_s" | "load16_u" | "load32_s" | "load32_u"
        | "store" | "store8" | "store16" | "store32" => ImmediateKind::Memory,
        "current_memory" | "grow_memory" => ImmediateKind::Flag,
        "i32" => ImmediateKind::VarInt32,
        "i64" => ImmediateKind::VarInt64,
        "f32" => ImmediateKind::Uint32,
        "f64" => ImmediateKind::Uint64,
        _ => return None,
    })
}

/// The shape of an instruction's immediate operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImmediateKind {
    /// No immediate.
    None,
    /// A single raw byte.
    Flag,
    /// An unsigned 32-bit varint.
    VarUint32,
    /// A signed 32-bit varint.
    VarInt32,
    /// A signed 64-bit varint.
    VarInt64,
    /// A fixed-width little-endian 32-bit integer.
    Uint32,
    /// A fixed-width little-endian 64-bit integer.
    Uint64,
    /// A block type byte.
    BlockType,
    /// A branch table.
    BrTable,
    /// A type index and a reserved byte.
    CallIndirect,
    /// Alignment flags and an offset.
    Memory,
}

impl fmt::Display for ImmediateKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ImmediateKind::None => "empty",
            ImmediateKind::Flag => "flag",
            ImmediateKind::VarUint32 => "varuint32",
            ImmediateKind::VarInt32 => "varint32",
            ImmediateKind::VarInt64 => "varint64",
            ImmediateKind::Uint32 => "uint32",
            ImmediateKind::Uint64 => "uint64",
            ImmediateKind::BlockType => "block type",
            ImmediateKind::BrTable => "branch table",
            ImmediateKind::CallIndirect => "call_indirect",
            ImmediateKind::Memory => "memory access",
        })
    }
}

/// The immediate of `br_table`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrTable {
    /// The branch targets, selected by index.
    pub targets: Vec<u32>,
    /// The target taken when the index is out of range.
    pub default_target: u32,
}

/// The immediate of `call_indirect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CallIndirect {
    /// The index of the expected function type.
    pub index: u32,
    /// The reserved byte, zero in practice but kept verbatim.
    pub reserved: u8,
}

/// The immediate of loads and stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemArg {
    /// The alignment flags, the base-2 logarithm of the alignment.
    pub flags: u32,
    /// The constant offset added to the address operand.
    pub offset: u32,
}

/// The immediate operand of an instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Immediate {
    /// No immediate.
    #[default]
    None,
    /// A single raw byte.
    Flag(u8),
    /// An unsigned 32-bit varint: an index or a branch depth.
    VarUint32(u32),
    /// A signed 32-bit varint: the value of `i32.const`.
    VarInt32(i32),
    /// A signed 64-bit varint: the value of `i64.const`.
    VarInt64(i64),
    /// The raw bits of an `f32.const`.
    Uint32(u32),
    /// The raw bits of an `f64.const`.
    Uint64(u64),
    /// The result type of a block, loop or if.
    BlockType(ValType),
    /// A branch table.
    BrTable(BrTable),
    /// The operands of `call_indirect`.
    CallIndirect(CallIndirect),
    /// The operands of a load or store.
    Memory(MemArg),
}

impl Immediate {
    /// The shape of this immediate.
    pub fn kind(&self) -> ImmediateKind {
        match self {
            Immediate::None => ImmediateKind::None,
            Immediate::Flag(_) => ImmediateKind::Flag,
            Immediate::VarUint32(_) => ImmediateKind::VarUint32,
            Immediate::VarInt32(_) => ImmediateKind::VarInt32,
            Immediate::VarInt64(_) => ImmediateKind::VarInt64,
            Immediate::Uint32(_) => ImmediateKind::Uint32,
            Immediate::Uint64(_) => ImmediateKind::Uint64,
            Immediate::BlockType(_) => ImmediateKind::BlockType,
            Immediate::BrTable(_) => ImmediateKind::BrTable,
            Immediate::CallIndirect(_) => ImmediateKind::CallIndirect,
            Immediate::Memory(_) => ImmediateKind::Memory,
        }
    }

    /// Reads an immediate of the given shape.
    pub fn read(reader: &mut BinaryReader<'_>, kind: ImmediateKind) -> Result<Immediate> {
        Ok(match kind {
            ImmediateKind::None => Immediate::None,
            ImmediateKind::Flag => Immediate::Flag(reader.read_u8()?),
            ImmediateKind::VarUint32 => Immediate::VarUint32(reader.read_var_u32()?),
            ImmediateKind::VarInt32 => Immediate::VarInt32(reader.read_var_i32()?),
            ImmediateKind::VarInt64 => Immediate::VarInt64(reader.read_var_i64()?),
            ImmediateKind::Uint32 => Immediate::Uint32(reader.read_u32()?),
            ImmediateKind::Uint64 => Immediate::Uint64(reader.read_u64()?),
            ImmediateKind::BlockType => Immediate::BlockType(reader.read()?),
            ImmediateKind::BrTable => Immediate::BrTable(BrTable {
                targets: reader.read_vec()?,
                default_target: reader.read_var_u32()?,
            }),
            ImmediateKind::CallIndirect => Immediate::CallIndirect(CallIndirect {
                index: reader.read_var_u32()?,
                reserved: reader.read_u8()?,
            }),
            ImmediateKind::Memory => Immediate::Memory(MemArg {
                flags: reader.read_var_u32()?,
                offset: reader.read_var_u32()?,
            }),
        })
    }
}

impl Encode for Immediate {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        match self {
            Immediate::None => {}
            Immediate::Flag(byte) => sink.push(*byte),
            Immediate::VarUint32(value) => value.encode(sink)?,
            Immediate::VarInt32(value) => {
                crate::varint::write_signed(sink, i64::from(*value));
            }
            Immediate::VarInt64(value) => {
                crate::varint::write_signed(sink, *value);
            }
            Immediate::Uint32(bits) => sink.extend_from_slice(&bits.to_le_bytes()),
            Immediate::Uint64(bits) => sink.extend_from_slice(&bits.to_le_bytes()),
            Immediate::BlockType(ty) => ty.encode(sink)?,
            Immediate::BrTable(table) => {
                table.targets.encode(sink)?;
                table.default_target.encode(sink)?;
            }
            Immediate::CallIndirect(call) => {
                call.index.encode(sink)?;
                sink.push(call.reserved);
            }
            Immediate::Memory(memarg) => {
                memarg.flags.encode(sink)?;
                memarg.offset.encode(sink)?;
            }
        }
        Ok(())
    }
}

/// A single instruction: an opcode and its immediate operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "json::InstructionRepr", try_from = "json::InstructionRepr")
)]
pub struct Instruction {
    /// The instruction's opcode.
    pub opcode: Opcode,
    /// The instruction's immediate, whose shape must match
    /// [`Opcode::immediate_kind`].
    pub immediate: Immediate,
}

impl Instruction {
    /// Creates an instruction without an immediate.
    pub fn new(opcode: Opcode) -> Instruction {
        Instruction {
            opcode,
            immediate: Immediate::None,
        }
    }

    /// Creates an instruction with the given immediate.
    ///
    /// The immediate's shape is only checked when the instruction is encoded.
    pub fn with_immediate(opcode: Opcode, immediate: Immediate) -> Instruction {
        Instruction { opcode, immediate }
    }

    /// Creates an instruction from its full mnemonic, checking the shape of
    /// the immediate.
    pub fn from_mnemonic(mnemonic: &str, immediate: Immediate) -> Result<Instruction> {
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| ErrorKind::Malformed(format!("unknown instruction `{mnemonic}`")))?;
        let instruction = Instruction::with_immediate(opcode, immediate);
        instruction.check_immediate()?;
        Ok(instruction)
    }

    /// Same as [`Opcode::name`].
    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    /// Same as [`Opcode::type_prefix`].
    pub fn return_type(&self) -> Option<&'static str> {
        self.opcode.type_prefix()
    }

    fn check_immediate(&self) -> Result<()> {
        let expected = self.opcode.immediate_kind()?;
        if self.immediate.kind() == expected {
            Ok(())
        } else {
            Err(ErrorKind::ImmediateMismatch {
                mnemonic: self.opcode.mnemonic(),
                expected,
            }
            .into())
        }
    }
}

impl From<Opcode> for Instruction {
    fn from(opcode: Opcode) -> Instruction {
        Instruction::new(opcode)
    }
}

impl Encode for Instruction {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.check_immediate()?;
        sink.push(self.opcode.as_byte());
        self.immediate.encode(sink)
    }
}

impl<'a> FromReader<'a> for Instruction {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let pos = reader.original_position();
        let byte = reader.read_u8()?;
        let opcode =
            Opcode::from_byte(byte).ok_or_else(|| Error::at(ErrorKind::UnknownOpcode(byte), pos))?;
        let kind = opcode.immediate_kind()?;
        let immediate = Immediate::read(reader, kind)?;
        Ok(Instruction { opcode, immediate })
    }
}

/// An initializer expression: a single instruction computing a constant.
///
/// The terminating `end` is implicit. It is appended when encoding and
/// required, then dropped, when decoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct InitExpr(pub Instruction);

impl InitExpr {
    /// An `i32.const` initializer.
    pub fn i32_const(value: i32) -> InitExpr {
        InitExpr(Instruction::with_immediate(
            Opcode::I32Const,
            Immediate::VarInt32(value),
        ))
    }

    /// A `get_global` initializer.
    pub fn global_get(index: u32) -> InitExpr {
        InitExpr(Instruction::with_immediate(
            Opcode::GlobalGet,
            Immediate::VarUint32(index),
        ))
    }
}

impl Encode for InitExpr {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.0.encode(sink)?;
        sink.push(Opcode::End.as_byte());
        Ok(())
    }
}

impl<'a> FromReader<'a> for InitExpr {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let instruction = reader.read()?;
        let pos = reader.original_position();
        if reader.read_u8()? != Opcode::End.as_byte() {
            return Err(Error::malformed(
                "initializer expression must be a single instruction followed by `end`",
                pos,
            ));
        }
        Ok(InitExpr(instruction))
    }
}

#[cfg(feature = "serde")]
mod json {
    //! The JSON shape of instructions: the mnemonic split into `name` and
    //! `return_type`, and an `immediates` value whose shape is only known
    //! once the opcode is.

    use super::*;
    use serde_derive::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    pub struct InstructionRepr {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        return_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        immediates: Option<ImmediateRepr>,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum ImmediateRepr {
        Unsigned(u64),
        Signed(i64),
        Type(String),
        BrTable(BrTable),
        CallIndirect(CallIndirect),
        Memory(MemArg),
    }

    impl From<Instruction> for InstructionRepr {
        fn from(instruction: Instruction) -> InstructionRepr {
            let name = instruction.name().to_string();
            let return_type = instruction.return_type().map(str::to_string);
            let immediates = match instruction.immediate {
                Immediate::None => None,
                Immediate::Flag(byte) => Some(ImmediateRepr::Unsigned(byte.into())),
                Immediate::VarUint32(value) => Some(ImmediateRepr::Unsigned(value.into())),
                Immediate::VarInt32(value) => Some(ImmediateRepr::Signed(value.into())),
                Immediate::VarInt64(value) => Some(ImmediateRepr::Signed(value)),
                Immediate::Uint32(bits) => Some(ImmediateRepr::Unsigned(bits.into())),
                Immediate::Uint64(bits) => Some(ImmediateRepr::Unsigned(bits)),
                Immediate::BlockType(ty) => Some(ImmediateRepr::Type(ty.name().to_string())),
                Immediate::BrTable(table) => Some(ImmediateRepr::BrTable(table)),
                Immediate::CallIndirect(call) => Some(ImmediateRepr::CallIndirect(call)),
                Immediate::Memory(memarg) => Some(ImmediateRepr::Memory(memarg)),
            };
            InstructionRepr {
                name,
                return_type,
                immediates,
            }
        }
    }

    impl TryFrom<InstructionRepr> for Instruction {
        type Error = Error;

        fn try_from(repr: InstructionRepr) -> Result<Instruction> {
            let mnemonic = match &repr.return_type {
                Some(prefix) => format!("{prefix}.{}", repr.name),
                None => repr.name,
            };
            let opcode = Opcode::from_mnemonic(&mnemonic)
                .ok_or_else(|| ErrorKind::Malformed(format!("unknown instruction `{mnemonic}`")))?;
            let expected = opcode.immediate_kind()?;
            let mismatch = || -> Error {
                ErrorKind::ImmediateMismatch {
                    mnemonic: opcode.mnemonic(),
                    expected,
                }
                .into()
            };
            let immediate = match (expected, repr.immediates) {
                (ImmediateKind::None, None) => Immediate::None,
                (ImmediateKind::Flag, Some(ImmediateRepr::Unsigned(v))) => {
                    Immediate::Flag(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::VarUint32, Some(ImmediateRepr::Unsigned(v))) => {
                    Immediate::VarUint32(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::VarInt32, Some(ImmediateRepr::Unsigned(v))) => {
                    Immediate::VarInt32(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::VarInt32, Some(ImmediateRepr::Signed(v))) => {
                    Immediate::VarInt32(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::VarInt64, Some(ImmediateRepr::Unsigned(v))) => {
                    Immediate::VarInt64(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::VarInt64, Some(ImmediateRepr::Signed(v))) => {
                    Immediate::VarInt64(v)
                }
                (ImmediateKind::Uint32, Some(ImmediateRepr::Unsigned(v))) => {
                    Immediate::Uint32(v.try_into().map_err(|_| mismatch())?)
                }
                (ImmediateKind::Uint64, Some(ImmediateRepr::Unsigned(v))) => Immediate::Uint64(v),
                (ImmediateKind::BlockType, Some(ImmediateRepr::Type(name))) => {
                    Immediate::BlockType(ValType::from_name(&name).ok_or_else(mismatch)?)
                }
                (ImmediateKind::BrTable, Some(ImmediateRepr::BrTable(table))) => {
                    Immediate::BrTable(table)
                }
                (ImmediateKind::CallIndirect, Some(ImmediateRepr::CallIndirect(call))) => {
                    Immediate::CallIndirect(call)
                }
                (ImmediateKind::Memory, Some(ImmediateRepr::Memory(memarg))) => {
                    Immediate::Memory(memarg)
                }
                _ => return Err(mismatch()),
            };
            Ok(Instruction { opcode, immediate })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(instruction: &Instruction) -> Vec<u8> {
        let mut sink = Vec::new();
        instruction.encode(&mut sink).unwrap();
        sink
    }

    fn decode(bytes: &[u8]) -> Instruction {
        let mut reader = BinaryReader::new(bytes, 0);
        let instruction = reader.read().unwrap();
        assert!(reader.eof());
        instruction
    }

    #[test]
    fn table_is_bijective() {
        assert_eq!(Opcode::ALL.len(), 172);
        for &opcode in Opcode::ALL {
            assert_eq!(Opcode::from_byte(opcode.as_byte()), Some(opcode));
            assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
            assert!(opcode.immediate_kind().is_ok(), "{opcode}");
        }
        for byte in [0x06, 0x0a, 0x12, 0x1c, 0x25, 0xc0, 0xff] {
            assert_eq!(Opcode::from_byte(byte), None);
        }
    }

    #[test]
    fn names_and_prefixes() {
        assert_eq!(Opcode::F64Add.name(), "add");
        assert_eq!(Opcode::F64Add.type_prefix(), Some("f64"));
        assert_eq!(Opcode::LocalGet.name(), "get_local");
        assert_eq!(Opcode::LocalGet.type_prefix(), None);
        assert_eq!(Opcode::I32WrapI64.name(), "wrap/i64");
    }

    #[test]
    fn const_immediates_follow_the_type_prefix() {
        let kinds: Vec<_> = [
            Opcode::I32Const,
            Opcode::I64Const,
            Opcode::F32Const,
            Opcode::F64Const,
        ]
        .iter()
        .map(|op| op.immediate_kind().unwrap())
        .collect();
        assert_eq!(
            kinds,
            [
                ImmediateKind::VarInt32,
                ImmediateKind::VarInt64,
                ImmediateKind::Uint32,
                ImmediateKind::Uint64,
            ]
        );
        assert_eq!(Opcode::I32Add.immediate_kind().unwrap(), ImmediateKind::None);
        assert_eq!(Opcode::I64Load32U.immediate_kind().unwrap(), ImmediateKind::Memory);
        assert_eq!(Opcode::MemoryGrow.immediate_kind().unwrap(), ImmediateKind::Flag);
    }

    #[test]
    fn immediates() {
        let i = Instruction::with_immediate(Opcode::I32Const, Immediate::VarInt32(42));
        assert_eq!(encode(&i), [0x41, 0x2a]);
        assert_eq!(decode(&[0x41, 0x2a]), i);

        let i = Instruction::with_immediate(Opcode::I64Const, Immediate::VarInt64(-65));
        assert_eq!(encode(&i), [0x42, 0xbf, 0x7f]);

        let i = Instruction::with_immediate(Opcode::F32Const, Immediate::Uint32(0x7fc0_0001));
        assert_eq!(encode(&i), [0x43, 0x01, 0x00, 0xc0, 0x7f]);

        let i = Instruction::with_immediate(
            Opcode::BrTable,
            Immediate::BrTable(BrTable {
                targets: vec![0, 1],
                default_target: 2,
            }),
        );
        assert_eq!(encode(&i), [0x0e, 0x02, 0x00, 0x01, 0x02]);
        assert_eq!(decode(&[0x0e, 0x02, 0x00, 0x01, 0x02]), i);

        let i = Instruction::with_immediate(
            Opcode::CallIndirect,
            Immediate::CallIndirect(CallIndirect {
                index: 1,
                reserved: 0,
            }),
        );
        assert_eq!(encode(&i), [0x11, 0x01, 0x00]);

        let i = Instruction::with_immediate(
            Opcode::I32Store,
            Immediate::Memory(MemArg {
                flags: 2,
                offset: 128,
            }),
        );
        assert_eq!(encode(&i), [0x36, 0x02, 0x80, 0x01]);

        let i = Instruction::with_immediate(Opcode::Block, Immediate::BlockType(ValType::Empty));
        assert_eq!(decode(&[0x02, 0x40]), i);
    }

    #[test]
    fn mismatched_immediate() {
        let i = Instruction::with_immediate(Opcode::I32Const, Immediate::VarInt64(1));
        let mut sink = Vec::new();
        let err = i.encode(&mut sink).unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::ImmediateMismatch {
                mnemonic: "i32.const",
                expected: ImmediateKind::VarInt32,
            }
        );
        assert!(sink.is_empty());

        assert!(Instruction::from_mnemonic("get_local", Immediate::None).is_err());
        assert!(Instruction::from_mnemonic("local.get", Immediate::VarUint32(0)).is_err());
        assert!(Instruction::from_mnemonic("get_local", Immediate::VarUint32(0)).is_ok());
    }

    #[test]
    fn unknown_opcode() {
        let mut reader = BinaryReader::new(&[0x01, 0x06], 100);
        reader.read::<Instruction>().unwrap();
        let err = reader.read::<Instruction>().unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::UnknownOpcode(0x06));
        assert_eq!(err.offset(), Some(101));
    }

    #[test]
    fn init_expr_requires_end() {
        let mut sink = Vec::new();
        InitExpr::i32_const(-1).encode(&mut sink).unwrap();
        assert_eq!(sink, [0x41, 0x7f, 0x0b]);

        let mut reader = BinaryReader::new(&sink, 0);
        assert_eq!(reader.read::<InitExpr>().unwrap(), InitExpr::i32_const(-1));

        let mut reader = BinaryReader::new(&[0x41, 0x7f, 0x01], 0);
        let err = reader.read::<InitExpr>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Malformed(_)));
        assert_eq!(err.offset(), Some(2));
    }
}
