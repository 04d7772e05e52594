//! A format-preserving codec between the WebAssembly binary format and a
//! structured module tree.
//!
//! [`parse`] turns the bytes of a module into a [`Module`]: the preamble and
//! the sections in the order they appear, each section holding typed entries
//! down to individual [`Instruction`]s. [`generate`] turns a [`Module`] back
//! into bytes. Decoding canonically encoded bytes and encoding the result
//! reproduces the input exactly, so a tool can decode a module, edit the tree
//! (for example to insert instructions), and encode it again without
//! disturbing anything it didn't touch.
//!
//! The codec covers the MVP binary format. It does not validate modules
//! beyond what is needed to find the end of every field.
//!
//! With the default `serde` feature every part of the tree implements
//! `Serialize` and `Deserialize`, which gives modules a JSON form.
//!
//! # Examples
//!
//! ```
//! use wasm_json::{Immediate, Instruction, Opcode, Section};
//!
//! # fn main() -> wasm_json::Result<()> {
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // preamble
//!     0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7f, // type section
//!     0x03, 0x02, 0x01, 0x00, // function section
//!     0x0a, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2a, 0x0b, // code section
//! ];
//! let mut module = wasm_json::parse(&bytes)?;
//!
//! // Return 43 instead.
//! if let Some(Section::Code { entries }) = module.sections.last_mut() {
//!     entries[0].code[0] =
//!         Instruction::with_immediate(Opcode::I32Const, Immediate::VarInt32(43));
//! }
//! let bytes = wasm_json::generate(&module)?;
//! assert_eq!(bytes[bytes.len() - 2], 43);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod binary_reader;
mod encode;
mod error;
mod module;
mod operators;
mod sections;
mod types;
pub mod varint;

pub use crate::binary_reader::*;
pub use crate::encode::Encode;
pub use crate::error::*;
pub use crate::module::*;
pub use crate::operators::*;
pub use crate::sections::*;
pub use crate::types::*;

/// Decodes a module from its binary encoding.
///
/// This is the same as [`Module::parse`].
pub fn parse(bytes: &[u8]) -> Result<Module> {
    Module::parse(bytes)
}

/// Encodes a module into its binary form.
///
/// This is the same as [`Module::to_bytes`].
pub fn generate(module: &Module) -> Result<Vec<u8>> {
    module.to_bytes()
}
