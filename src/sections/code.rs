use crate::encode::{write_len, write_sized};
use crate::{BinaryReader, Encode, Error, ErrorKind, FromReader, Instruction, Result, ValType};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// A run of `count` local variables of the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Local {
    /// How many locals this declaration introduces.
    pub count: u32,
    /// Their type.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: ValType,
}

impl Encode for Local {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.count.encode(sink)?;
        self.ty.encode(sink)
    }
}

impl<'a> FromReader<'a> for Local {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(Local {
            count: reader.read_var_u32()?,
            ty: reader.read()?,
        })
    }
}

/// An entry of the code section: the body of a function.
///
/// `code` holds every instruction of the body including the final `end`;
/// nothing is added or dropped on the way through the codec.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionBody {
    /// The local variable declarations.
    pub locals: Vec<Local>,
    /// The instructions.
    pub code: Vec<Instruction>,
}

impl Encode for FunctionBody {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        write_sized(sink, &mut Vec::new(), &BodyContents(self))
    }
}

/// Encodes the entries of a code section, reusing one scratch buffer for
/// every body.
pub(crate) fn encode_bodies(bodies: &[FunctionBody], sink: &mut Vec<u8>) -> Result<()> {
    write_len(sink, bodies.len());
    let mut scratch = Vec::new();
    for (index, body) in bodies.iter().enumerate() {
        write_sized(sink, &mut scratch, &BodyContents(body)).map_err(|e| e.in_entry(index))?;
    }
    Ok(())
}

/// The bytes of a body after its size prefix.
struct BodyContents<'a>(&'a FunctionBody);

impl Encode for BodyContents<'_> {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.0.locals.encode(sink)?;
        for instruction in &self.0.code {
            instruction.encode(sink)?;
        }
        Ok(())
    }
}

impl<'a> FromReader<'a> for FunctionBody {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        let declared = reader.read_var_u32()? as usize;
        if declared > reader.bytes_remaining() {
            return Err(Error::at(
                ErrorKind::SizeMismatch {
                    declared,
                    consumed: reader.bytes_remaining(),
                },
                reader.original_position(),
            ));
        }

        let mut body = reader.read_reader(declared)?;
        let (locals, code) =
            read_contents(&mut body).map_err(|e| overrun(e, &body, declared))?;
        log::trace!(
            "decoded function body: {} local declaration(s), {} instruction(s)",
            locals.len(),
            code.len()
        );
        Ok(FunctionBody { locals, code })
    }
}

fn read_contents(body: &mut BinaryReader<'_>) -> Result<(Vec<Local>, Vec<Instruction>)> {
    let locals = body.read_vec()?;
    let mut code = Vec::new();
    while !body.eof() {
        code.push(body.read()?);
    }
    Ok((locals, code))
}

/// Running out of bytes inside a body means its contents need more than
/// the declared size.
fn overrun(err: Error, body: &BinaryReader<'_>, declared: usize) -> Error {
    let needed = match err.kind() {
        ErrorKind::UnexpectedEof { needed } => Some(*needed),
        ErrorKind::MalformedVarint("unterminated integer") => Some(1),
        _ => None,
    };
    let Some(needed) = needed.filter(|_| body.eof()) else {
        return err;
    };
    Error::at(
        ErrorKind::SizeMismatch {
            declared,
            consumed: declared + needed,
        },
        body.original_position(),
    )
}
