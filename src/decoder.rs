use super::record::OpcodeRecord;
use super::*;
use std::fmt::Write;

/// One opcode-to-handler binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub key: u16,
    pub handler: String,
}
impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "decoder.insert(0x{:04X}_u16, {});", self.key, self.handler)
    }
}

/// Prints the decoder artifact: a function that registers one handler per opcode
/// in (mnemonic, encoding) order. Handlers are named `instr_<MNEMONIC>_<ENCODING>`
/// and qualified with `handler_path` (e.g. `Cpu::instr_LD_0x3E`).
pub struct DecoderEmitter {
    handler_path: String,
}
impl DecoderEmitter {
    pub fn new(handler_path: &str) -> Self {
        DecoderEmitter {
            handler_path: handler_path.trim_end_matches("::").to_string(),
        }
    }
    fn handler(&self, record: &OpcodeRecord) -> String {
        if self.handler_path.is_empty() {
            record.handler_name()
        } else {
            format!("{}::{}", self.handler_path, record.handler_name())
        }
    }
    pub fn bindings(&self, table: &OpcodeTable) -> Vec<Binding> {
        table
            .by_mnemonic()
            .into_iter()
            .map(|r| Binding {
                key: r.encoding.key(),
                handler: self.handler(r),
            })
            .collect()
    }
    pub fn emit(&self, table: &OpcodeTable) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "// @generated by gbop from {} opcodes. Do not edit.", table.len());
        s.push_str("//\n// Prefixed opcodes are keyed as 0xCBNN. `Handler` must be in scope where this is included.\n");
        s.push_str("pub fn populate_decoder(decoder: &mut ::std::collections::HashMap<u16, Handler>) {\n");
        for binding in self.bindings(table) {
            let _ = writeln!(s, "    {}", binding);
        }
        s.push_str("}\n");
        s
    }
}
