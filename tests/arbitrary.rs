//! Randomized structural modules survive `generate` followed by `parse`.
//!
//! The modules are structurally well-formed but not valid WebAssembly: any
//! opcode may appear anywhere, and indices point nowhere in particular.

use arbitrary::{Result, Unstructured};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use wasm_json::*;

const VAL_TYPES: &[ValType] = &[
    ValType::I32,
    ValType::I64,
    ValType::F32,
    ValType::F64,
    ValType::AnyFunc,
    ValType::Func,
    ValType::Empty,
];

fn val_type(u: &mut Unstructured<'_>) -> Result<ValType> {
    u.choose(VAL_TYPES).copied()
}

fn limits(u: &mut Unstructured<'_>) -> Result<ResizableLimits> {
    Ok(ResizableLimits {
        initial: u.arbitrary()?,
        maximum: u.arbitrary()?,
    })
}

fn table_type(u: &mut Unstructured<'_>) -> Result<TableType> {
    Ok(TableType {
        element_type: val_type(u)?,
        limits: limits(u)?,
    })
}

fn global_type(u: &mut Unstructured<'_>) -> Result<GlobalType> {
    Ok(GlobalType {
        content_type: val_type(u)?,
        mutable: u.arbitrary()?,
    })
}

fn list<T>(
    u: &mut Unstructured<'_>,
    max: usize,
    mut f: impl FnMut(&mut Unstructured<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let len = u.int_in_range(0..=max)?;
    (0..len).map(|_| f(u)).collect()
}

fn instruction(u: &mut Unstructured<'_>) -> Result<Instruction> {
    let opcode = *u.choose(Opcode::ALL)?;
    let immediate = match opcode.immediate_kind().unwrap() {
        ImmediateKind::None => Immediate::None,
        ImmediateKind::Flag => Immediate::Flag(u.arbitrary()?),
        ImmediateKind::VarUint32 => Immediate::VarUint32(u.arbitrary()?),
        ImmediateKind::VarInt32 => Immediate::VarInt32(u.arbitrary()?),
        ImmediateKind::VarInt64 => Immediate::VarInt64(u.arbitrary()?),
        ImmediateKind::Uint32 => Immediate::Uint32(u.arbitrary()?),
        ImmediateKind::Uint64 => Immediate::Uint64(u.arbitrary()?),
        ImmediateKind::BlockType => Immediate::BlockType(val_type(u)?),
        ImmediateKind::BrTable => Immediate::BrTable(BrTable {
            targets: list(u, 8, |u| u.arbitrary())?,
            default_target: u.arbitrary()?,
        }),
        ImmediateKind::CallIndirect => Immediate::CallIndirect(CallIndirect {
            index: u.arbitrary()?,
            reserved: u.arbitrary()?,
        }),
        ImmediateKind::Memory => Immediate::Memory(MemArg {
            flags: u.arbitrary()?,
            offset: u.arbitrary()?,
        }),
    };
    Ok(Instruction::with_immediate(opcode, immediate))
}

fn init_expr(u: &mut Unstructured<'_>) -> Result<InitExpr> {
    Ok(InitExpr(instruction(u)?))
}

fn section(u: &mut Unstructured<'_>) -> Result<Section> {
    let id = SectionId::try_from(u.int_in_range(0..=11u8)?).unwrap();
    Ok(match id {
        SectionId::Custom => Section::Custom(CustomSection {
            name: u.arbitrary()?,
            payload: list(u, 16, |u| u.arbitrary())?,
        }),
        SectionId::Type => Section::Type {
            entries: list(u, 4, |u| {
                Ok(TypeEntry {
                    form: val_type(u)?,
                    params: list(u, 4, val_type)?,
                    return_type: if u.arbitrary()? {
                        Some(val_type(u)?)
                    } else {
                        None
                    },
                })
            })?,
        },
        SectionId::Import => Section::Import {
            entries: list(u, 4, |u| {
                let ty = match u.int_in_range(0..=3)? {
                    0 => ImportType::Function(u.arbitrary()?),
                    1 => ImportType::Table(table_type(u)?),
                    2 => ImportType::Memory(limits(u)?),
                    _ => ImportType::Global(global_type(u)?),
                };
                Ok(ImportEntry {
                    module: u.arbitrary()?,
                    field: u.arbitrary()?,
                    ty,
                })
            })?,
        },
        SectionId::Function => Section::Function {
            entries: list(u, 8, |u| u.arbitrary())?,
        },
        SectionId::Table => Section::Table {
            entries: list(u, 2, table_type)?,
        },
        SectionId::Memory => Section::Memory {
            entries: list(u, 2, limits)?,
        },
        SectionId::Global => Section::Global {
            entries: list(u, 4, |u| {
                Ok(GlobalEntry {
                    ty: global_type(u)?,
                    init: init_expr(u)?,
                })
            })?,
        },
        SectionId::Export => Section::Export {
            entries: list(u, 4, |u| {
                Ok(ExportEntry {
                    field: u.arbitrary()?,
                    kind: *u.choose(&[
                        ExternalKind::Function,
                        ExternalKind::Table,
                        ExternalKind::Memory,
                        ExternalKind::Global,
                    ])?,
                    index: u.arbitrary()?,
                })
            })?,
        },
        SectionId::Start => Section::Start {
            index: u.arbitrary()?,
        },
        SectionId::Element => Section::Element {
            entries: list(u, 4, |u| {
                Ok(ElementEntry {
                    index: u.arbitrary()?,
                    offset: init_expr(u)?,
                    elements: list(u, 8, |u| u.arbitrary())?,
                })
            })?,
        },
        SectionId::Code => Section::Code {
            entries: list(u, 4, |u| {
                Ok(FunctionBody {
                    locals: list(u, 4, |u| {
                        Ok(Local {
                            count: u.arbitrary()?,
                            ty: val_type(u)?,
                        })
                    })?,
                    code: list(u, 32, instruction)?,
                })
            })?,
        },
        SectionId::Data => Section::Data {
            entries: list(u, 4, |u| {
                Ok(DataSegment {
                    index: u.arbitrary()?,
                    offset: init_expr(u)?,
                    data: list(u, 16, |u| u.arbitrary())?,
                })
            })?,
        },
    })
}

fn module(u: &mut Unstructured<'_>) -> Result<Module> {
    Ok(Module {
        preamble: Preamble::default(),
        sections: list(u, 12, section)?,
    })
}

#[test]
fn structural_roundtrip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut buf = vec![0; 4096];
    for seed in 0..256 {
        let mut rng = SmallRng::seed_from_u64(seed);
        rng.fill_bytes(&mut buf);
        let mut u = Unstructured::new(&buf);
        let module = module(&mut u).unwrap();

        let bytes = wasm_json::generate(&module).unwrap();
        let decoded = wasm_json::parse(&bytes)
            .unwrap_or_else(|e| panic!("seed {seed}: failed to decode: {e}"));
        assert_eq!(decoded, module, "seed {seed}");
        assert_eq!(wasm_json::generate(&decoded).unwrap(), bytes, "seed {seed}");
    }
}

#[cfg(feature = "serde")]
#[test]
fn json_roundtrip() {
    let mut buf = vec![0; 2048];
    for seed in 0..64 {
        let mut rng = SmallRng::seed_from_u64(seed);
        rng.fill_bytes(&mut buf);
        let module = module(&mut Unstructured::new(&buf)).unwrap();

        let text = serde_json::to_string(&module).unwrap();
        let back: Module = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("seed {seed}: failed to read back {text}: {e}"));
        assert_eq!(back, module, "seed {seed}");
    }
}
