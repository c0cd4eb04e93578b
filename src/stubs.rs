//! Emits a documented, unimplemented handler for every opcode so an emulator
//! author can start from a complete skeleton. The handler names match the ones
//! the decoder binds to.
use super::record::{OpcodeRecord, FLAG_NAMES};
use super::*;
use std::fmt::Write;

const WRAP_WIDTH: usize = 66;

// greedy word wrap; words longer than the width get a line of their own
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

pub struct StubEmitter {
    handler_path: String,
}
impl StubEmitter {
    pub fn new(handler_path: &str) -> Self {
        StubEmitter {
            handler_path: handler_path.trim_end_matches("::").to_string(),
        }
    }
    fn doc_block(s: &mut String, indent: &str, record: &OpcodeRecord) {
        let size = match record.size {
            1 => "1 byte".to_string(),
            n => format!("{} bytes", n),
        };
        let _ = writeln!(s, "{}/// Prototype: {}", indent, record.prototype());
        let _ = writeln!(s, "{}/// Mnemonic:  {}", indent, record.mnemonic);
        let _ = writeln!(s, "{}/// Size:      {}", indent, size);
        let _ = writeln!(s, "{}/// Binary:    {}", indent, record.encoding);
        let _ = writeln!(s, "{}/// Cycles:    {}", indent, record.cycles);
        let _ = writeln!(s, "{}/// Flags:", indent);
        for (name, effect) in FLAG_NAMES.iter().zip(record.flags.iter()) {
            let _ = writeln!(s, "{}///   - {}: {}", indent, name, effect.describe());
        }
        if let Some(doc) = record.doc.as_ref() {
            let _ = writeln!(s, "{}/// Description:", indent);
            for line in wrap(doc, WRAP_WIDTH) {
                let _ = writeln!(s, "{}///   {}", indent, line);
            }
        }
    }
    /// Handlers are methods of `handler_path` when one is given, free functions otherwise.
    pub fn emit(&self, table: &OpcodeTable) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "// @generated by gbop from {} opcodes.", table.len());
        let (indent, receiver) = if self.handler_path.is_empty() {
            ("", "")
        } else {
            let _ = writeln!(s, "\n#[allow(non_snake_case)]\nimpl {} {{", self.handler_path);
            ("    ", "&mut self")
        };
        for record in table.iter() {
            s.push('\n');
            StubEmitter::doc_block(&mut s, indent, record);
            if receiver.is_empty() {
                let _ = writeln!(s, "{}#[allow(non_snake_case)]", indent);
            }
            let _ = writeln!(s, "{}pub fn {}({}) {{", indent, record.handler_name(), receiver);
            let _ = writeln!(s, "{}    unimplemented!();", indent);
            let _ = writeln!(s, "{}}}", indent);
        }
        if !self.handler_path.is_empty() {
            s.push_str("}\n");
        }
        s
    }
}
