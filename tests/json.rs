#![cfg(feature = "serde")]

use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use wasm_json::{Immediate, InitExpr, Instruction, Module, Opcode, ValType};

const ANSWER: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // preamble
    0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7f, // type section
    0x03, 0x02, 0x01, 0x00, // function section
    0x0a, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2a, 0x0b, // code section
];

#[test]
fn module_shape() -> Result<()> {
    let module = wasm_json::parse(ANSWER)?;
    let value = serde_json::to_value(&module)?;
    assert_eq!(
        value,
        json!({
            "preamble": { "magic": [0, 97, 115, 109], "version": 1 },
            "sections": [
                {
                    "name": "type",
                    "entries": [{ "form": "func", "params": [], "return_type": "i32" }]
                },
                { "name": "function", "entries": [0] },
                {
                    "name": "code",
                    "entries": [{
                        "locals": [],
                        "code": [
                            { "name": "const", "return_type": "i32", "immediates": 42 },
                            { "name": "end" }
                        ]
                    }]
                }
            ]
        })
    );
    let back: Module = serde_json::from_value(value)?;
    assert_eq!(back, module);
    assert_eq!(wasm_json::generate(&back)?, ANSWER);
    Ok(())
}

#[test]
fn instruction_shapes() -> Result<()> {
    let cases = [
        (
            Instruction::with_immediate(Opcode::Block, Immediate::BlockType(ValType::Empty)),
            json!({ "name": "block", "immediates": "block_type" }),
        ),
        (
            Instruction::with_immediate(Opcode::LocalGet, Immediate::VarUint32(3)),
            json!({ "name": "get_local", "immediates": 3 }),
        ),
        (
            Instruction::with_immediate(Opcode::I64Const, Immediate::VarInt64(-65)),
            json!({ "name": "const", "return_type": "i64", "immediates": -65 }),
        ),
        (
            Instruction::with_immediate(Opcode::F64Const, Immediate::Uint64(u64::MAX)),
            json!({ "name": "const", "return_type": "f64", "immediates": u64::MAX }),
        ),
        (
            Instruction::with_immediate(Opcode::MemoryGrow, Immediate::Flag(0)),
            json!({ "name": "grow_memory", "immediates": 0 }),
        ),
        (
            Instruction::from_mnemonic(
                "br_table",
                Immediate::BrTable(wasm_json::BrTable {
                    targets: vec![1, 0],
                    default_target: 2,
                }),
            )?,
            json!({ "name": "br_table", "immediates": { "targets": [1, 0], "default_target": 2 } }),
        ),
        (
            Instruction::from_mnemonic(
                "call_indirect",
                Immediate::CallIndirect(wasm_json::CallIndirect {
                    index: 4,
                    reserved: 0,
                }),
            )?,
            json!({ "name": "call_indirect", "immediates": { "index": 4, "reserved": 0 } }),
        ),
        (
            Instruction::from_mnemonic(
                "i64.load32_s",
                Immediate::Memory(wasm_json::MemArg {
                    flags: 2,
                    offset: 16,
                }),
            )?,
            json!({
                "name": "load32_s",
                "return_type": "i64",
                "immediates": { "flags": 2, "offset": 16 }
            }),
        ),
        (
            Instruction::new(Opcode::I32WrapI64),
            json!({ "name": "wrap/i64", "return_type": "i32" }),
        ),
    ];
    for (instruction, expected) in cases {
        assert_eq!(serde_json::to_value(&instruction)?, expected);
        let back: Instruction = serde_json::from_value(expected)?;
        assert_eq!(back, instruction);
    }
    Ok(())
}

#[test]
fn rejected_instructions() {
    let cases = [
        // An immediate on an instruction that takes none.
        json!({ "name": "add", "return_type": "i32", "immediates": 1 }),
        // A missing immediate.
        json!({ "name": "get_local" }),
        // Out of range for `i32.const`.
        json!({ "name": "const", "return_type": "i32", "immediates": 2147483648u64 }),
        // A branch table where a memory access is expected.
        json!({
            "name": "load",
            "return_type": "f32",
            "immediates": { "targets": [], "default_target": 0 }
        }),
        // Not a value type.
        json!({ "name": "loop", "immediates": "v128" }),
        // Not an instruction of the table.
        json!({ "name": "get", "return_type": "local" }),
        json!({ "name": "const", "return_type": "v128", "immediates": 0 }),
    ];
    for case in cases {
        let result = serde_json::from_value::<Instruction>(case.clone());
        assert!(result.is_err(), "accepted {case}");
    }
}

#[test]
fn entries() -> Result<()> {
    let bytes = wat::parse_str(
        r#"
        (module
          (import "env" "f" (func))
          (import "env" "mem" (memory 1 2))
          (global (mut i32) (i32.const -1))
          (export "f" (func 0))
          (data (i32.const 8) "\01\02"))
        "#,
    )?;
    let module = wasm_json::parse(&bytes)?;
    let value = serde_json::to_value(&module)?;
    let sections = value["sections"].as_array().unwrap();

    assert_eq!(
        sections[1],
        json!({
            "name": "import",
            "entries": [
                { "module": "env", "field": "f", "kind": "function", "type": 0 },
                {
                    "module": "env",
                    "field": "mem",
                    "kind": "memory",
                    "type": { "initial": 1, "maximum": 2 }
                }
            ]
        })
    );
    assert_eq!(
        sections[2],
        json!({
            "name": "global",
            "entries": [{
                "type": { "content_type": "i32", "mutable": true },
                "init": { "name": "const", "return_type": "i32", "immediates": -1 }
            }]
        })
    );
    assert_eq!(
        sections[3],
        json!({
            "name": "export",
            "entries": [{ "field": "f", "kind": "function", "index": 0 }]
        })
    );
    assert_eq!(
        sections[4],
        json!({
            "name": "data",
            "entries": [{
                "index": 0,
                "offset": { "name": "const", "return_type": "i32", "immediates": 8 },
                "data": [1, 2]
            }]
        })
    );

    let text = serde_json::to_string(&module)?;
    let back: Module = serde_json::from_str(&text)?;
    assert_eq!(back, module);
    assert_eq!(wasm_json::generate(&back)?, bytes);
    Ok(())
}

#[test]
fn custom_section() -> Result<()> {
    let json = json!({
        "preamble": { "magic": [0, 97, 115, 109], "version": 1 },
        "sections": [
            { "name": "custom", "section_name": "hi", "payload": [7] },
            { "name": "start", "index": 0 }
        ]
    });
    let module: Module = serde_json::from_value(json.clone())?;
    assert_eq!(
        wasm_json::generate(&module)?,
        b"\0asm\x01\0\0\0\x00\x04\x02hi\x07\x08\x01\x00"
    );
    assert_eq!(serde_json::to_value(&module)?, json);
    Ok(())
}

#[test]
fn init_expr_is_a_bare_instruction() -> Result<()> {
    let init = InitExpr::global_get(2);
    assert_eq!(
        serde_json::to_value(&init)?,
        json!({ "name": "get_global", "immediates": 2 })
    );
    Ok(())
}
