//! Entry types of the individual sections.
//!
//! The function, table, memory and start sections hold plain indices,
//! [`TableType`](crate::TableType)s and
//! [`ResizableLimits`](crate::ResizableLimits), so they have no module here.

mod code;
mod custom;
mod data;
mod elements;
mod exports;
mod globals;
mod imports;

pub use self::code::*;
pub(crate) use self::code::encode_bodies;
pub use self::custom::*;
pub use self::data::*;
pub use self::elements::*;
pub use self::exports::*;
pub use self::globals::*;
pub use self::imports::*;
