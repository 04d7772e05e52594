use crate::operators::ImmediateKind;
use crate::SectionId;
use std::fmt;

/// An error encountered while decoding or encoding a WebAssembly module.
///
/// Besides its [`ErrorKind`] an error remembers where it happened: the byte
/// offset in the input (for decode errors), the kind of section being
/// processed and the index of the entry within that section, whenever those
/// are known.
#[derive(Debug)]
pub struct Error {
    // Boxed so that `Result<T, Error>` stays a single word plus tag.
    inner: Box<ErrorInner>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    offset: Option<usize>,
    section: Option<SectionId>,
    entry: Option<usize>,
}

/// The kind of an [`Error`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input ended before a required field was fully read.
    #[error("unexpected end-of-file ({needed} more byte(s) needed)")]
    UnexpectedEof {
        /// How many more bytes the failed read needed.
        needed: usize,
    },

    /// A LEB128 integer overflows its target width or never terminates.
    #[error("malformed varint: {0}")]
    MalformedVarint(&'static str),

    /// A byte that does not match any entry of the instruction table.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A section id outside of the `0..=11` range.
    #[error("unknown section id {0}")]
    UnknownSectionId(u8),

    /// A declared payload or code body length disagrees with the number of
    /// bytes actually consumed while decoding it.
    #[error("size mismatch: {declared} byte(s) declared but {consumed} consumed")]
    SizeMismatch {
        /// The length written in front of the region.
        declared: usize,
        /// The number of bytes decoding the region consumed.
        consumed: usize,
    },

    /// The instruction table maps an instruction to an immediate shape that
    /// has no codec. This is a defect in the table, not in the input.
    #[error("no immediate codec for `{0}`")]
    UnsupportedImmediateShape(&'static str),

    /// An instruction handed to the encoder carries an immediate of the
    /// wrong shape for its opcode.
    #[error("`{mnemonic}` expects a {expected} immediate")]
    ImmediateMismatch {
        /// The instruction's mnemonic.
        mnemonic: &'static str,
        /// The immediate shape the instruction table declares.
        expected: ImmediateKind,
    },

    /// A byte that has to map through a fixed table (value types, external
    /// kinds, flags) does not.
    #[error("invalid leading byte (0x{byte:x}) for {desc}")]
    InvalidLeadingByte {
        /// The offending byte.
        byte: u8,
        /// What was being decoded.
        desc: &'static str,
    },

    /// Any other structural problem with the input.
    #[error("{0}")]
    Malformed(String),
}

/// A `Result` type that is either `Ok(T)` or `Err(wasm_json::Error)`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    #[cold]
    pub(crate) fn new(kind: ErrorKind, offset: Option<usize>) -> Self {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                offset,
                section: None,
                entry: None,
            }),
        }
    }

    #[cold]
    pub(crate) fn at(kind: ErrorKind, offset: usize) -> Self {
        Error::new(kind, Some(offset))
    }

    #[cold]
    pub(crate) fn eof(offset: usize, needed: usize) -> Self {
        Error::at(ErrorKind::UnexpectedEof { needed }, offset)
    }

    #[cold]
    pub(crate) fn malformed(message: impl Into<String>, offset: usize) -> Self {
        Error::at(ErrorKind::Malformed(message.into()), offset)
    }

    /// Records the section this error happened in, unless a section is
    /// already known.
    pub(crate) fn in_section(mut self, section: SectionId) -> Self {
        self.inner.section.get_or_insert(section);
        self
    }

    /// Records the entry index this error happened in.
    ///
    /// Lists nest (a type entry holds a list of parameters), so this is
    /// called once per enclosing list while the error unwinds and the
    /// outermost list, the section's own entry list, has the last word.
    pub(crate) fn in_entry(mut self, entry: usize) -> Self {
        self.inner.entry = Some(entry);
        self
    }

    /// Get the kind of error that this is.
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }

    /// Get the offset within the Wasm binary where the error occurred.
    ///
    /// Encoding errors have no offset.
    pub fn offset(&self) -> Option<usize> {
        self.inner.offset
    }

    /// The kind of section that was being processed, if any.
    pub fn section(&self) -> Option<SectionId> {
        self.inner.section
    }

    /// The index of the section entry that was being processed, if any.
    pub fn entry(&self) -> Option<usize> {
        self.inner.entry
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind, None)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner.kind)?;
        if let Some(offset) = self.inner.offset {
            write!(f, " (at offset 0x{offset:x})")?;
        }
        if let Some(section) = self.inner.section {
            write!(f, " in {} section", section.name())?;
        }
        if let Some(entry) = self.inner.entry {
            write!(f, " entry {entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner.kind)
    }
}
