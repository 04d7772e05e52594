#![no_main]

use libfuzzer_sys::*;

// Any input that decodes must encode to something that decodes to the same
// module. The encoding itself can differ from the input since non-minimal
// LEB128 integers are accepted but never produced.
fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();
    let module = match wasm_json::parse(data) {
        Ok(module) => module,
        Err(e) => {
            log::debug!("not a module: {e}");
            return;
        }
    };
    let bytes = wasm_json::generate(&module).unwrap();
    let reparsed = wasm_json::parse(&bytes).unwrap();
    assert_eq!(module, reparsed);
    assert_eq!(bytes, wasm_json::generate(&reparsed).unwrap());
});
