//! # A Game Boy (LR35902) opcode table compiler written in Rust.
//!
//! Reads the raw opcode table (mnemonic, operands, flag effects, cycles and opcode
//! size per binary encoding) and generates, from that single source:
//! - a decoder: one opcode-to-handler binding per instruction
//! - a disassembler: one rendering routine per instruction returning its text and length
//! - documented handler stubs
//!
//! ## Getting Started
//! To check the bundled tables and print the generated code:
//! ```text
//! cargo run -- data/opcodes.json --cb-table data/opcodes_cb.json -p
//! ```
//! To write the generated files and list a ROM with the same table:
//! ```text
//! gbop data/opcodes.json --cb-table data/opcodes_cb.json -w --disassemble rom.bin --org 0x100
//! ```
//! ## Options
//! Help for command line options is available using -h or --help.
#[macro_use]
mod macros;
mod config;
mod decoder;
mod disasm;
mod docs;
mod error;
mod image;
mod operand;
mod record;
mod size;
mod stubs;
mod table;
use decoder::DecoderEmitter;
use disasm::{Disassembler, DisassemblerEmitter};
use docs::DocSet;
use image::MemoryImage;
use record::RawTable;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use stubs::StubEmitter;
pub(crate) use {
    crate::error::*,
    record::{Encoding, InstructionSpace},
    table::OpcodeTable,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    // run does all the work
    if let Err(e) = run() {
        println!("{}", e);
        return Err(Box::new(e));
    }
    Ok(())
}

/// The generated source files of one run.
pub struct Artifacts {
    pub decoder: String,
    pub disassembler: String,
    pub handlers: String,
}
impl Artifacts {
    pub const FILE_NAMES: [&'static str; 3] = ["decoder.rs", "disassembler.rs", "handlers.rs"];
    fn contents(&self) -> [&str; 3] { [&self.decoder, &self.disassembler, &self.handlers] }
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), Error> {
        fs::create_dir_all(dir)?;
        for (name, text) in Artifacts::FILE_NAMES.iter().zip(self.contents()) {
            let path = dir.join(name);
            fs::write(&path, text)?;
            println!("wrote {}", path.display());
        }
        Ok(())
    }
}

/// Build the opcode table from the raw tables and annotate it from whatever
/// documentation is available. Structural errors abort; documentation never does.
fn build_table(table: &str, cb_table: Option<&str>, docs: &DocSet) -> Result<OpcodeTable, Error> {
    info!("Loading opcode table {}", table);
    let merged = RawTable::read_from_file(Path::new(table))?;
    let prefixed = match cb_table {
        Some(path) => {
            info!("Loading prefixed opcode table {}", path);
            Some(RawTable::read_from_file(Path::new(path))?)
        }
        None => None,
    };
    let table = OpcodeTable::from_raw(&merged, prefixed.as_ref())?;
    verbose_println!(
        "{} opcodes ({} unprefixed, {} prefixed)",
        table.len(),
        table.space(InstructionSpace::Unprefixed).count(),
        table.space(InstructionSpace::Prefixed).count()
    );
    let (table, documented) = table.annotate(docs);
    if !docs.is_empty() {
        info!("Documented {} of {} opcodes", documented, table.len());
    }
    Ok(table)
}

/// Run every emitter over the finished table.
pub fn generate(table: &OpcodeTable, handler_path: &str) -> Artifacts {
    Artifacts {
        decoder: DecoderEmitter::new(handler_path).emit(table),
        disassembler: DisassemblerEmitter::emit(table),
        handlers: StubEmitter::new(handler_path).emit(table),
    }
}

/// run drives the top level functionality (build, generate, disassemble) of the app
fn run() -> Result<(), Error> {
    let args = &*config::ARGS;
    let docs = DocSet::load(args.doc.as_deref(), args.doc_cb.as_deref());
    let table = build_table(&args.table, args.cb_table.as_deref(), &docs)?;
    info!("Opcode table is consistent ({} opcodes)", table.len());
    if config::generate() {
        let artifacts = generate(&table, &args.handler_path);
        if args.print {
            println!("{}", artifacts.decoder);
            println!("{}", artifacts.disassembler);
        }
        if args.write_files {
            artifacts.write_to_dir(Path::new(&args.out_dir))?;
        }
    }
    if let Some(path) = args.disassemble.as_ref() {
        let image = MemoryImage::read_from_file(Path::new(path), args.org)?;
        info!("Disassembling {} ({} bytes at {:04X})", path, image.bytes.len(), image.base);
        let dasm = Disassembler::new(&table);
        for line in dasm.listing(&image, image.base, image.end(), args.count) {
            println!("{}", line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bundled() -> Result<OpcodeTable, Error> {
        build_table("data/opcodes.json", Some("data/opcodes_cb.json"), &DocSet::default())
    }
    #[test]
    fn generation_is_reproducible() -> Result<(), Error> {
        let first = generate(&bundled()?, "Cpu");
        let second = generate(&bundled()?, "Cpu");
        assert_eq!(first.decoder, second.decoder);
        assert_eq!(first.disassembler, second.disassembler);
        assert_eq!(first.handlers, second.handlers);
        assert_eq!(first.decoder.matches("decoder.insert(").count(), 501);
        assert_eq!(first.disassembler.matches("pub fn disp_").count(), 501);
        assert_eq!(first.handlers.matches("unimplemented!();").count(), 501);
        Ok(())
    }
    #[test]
    fn bundled_disassembly() -> Result<(), Error> {
        let dasm = Disassembler::new(&bundled()?);
        let rom: &[u8] = &[
            0x00, 0xc3, 0x50, 0x01, 0x31, 0xfe, 0xff, 0xaf, 0x21, 0xff, 0x9f, 0x32, 0xcb, 0x7c, 0x20, 0xfb, 0xe0,
            0x44, 0xf8, 0x02, 0x38, 0xfe, 0xd3, 0xff,
        ];
        let text: Vec<String> = dasm
            .listing(rom, 0, rom.len() as u32, None)
            .into_iter()
            .map(|d| d.text)
            .collect();
        assert_eq!(
            text,
            [
                "NOP",
                "JP 0x0150",
                "LD SP, 0xFFFE",
                "XOR A",
                "LD HL, 0x9FFF",
                "LD (HL-), A",
                "BIT 7, H",
                "JR NZ, 0xFB",
                "LDH (0x44), A",
                "LD HL, SP+0x02",
                "JR C, 0xFE",
                "DB 0xD3",
                "RST 38H",
            ]
        );
        Ok(())
    }
    #[test]
    fn bad_table_produces_no_output() -> Result<(), Error> {
        let dir = std::env::temp_dir().join(format!("gbop-bad-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("bad.json");
        fs::write(
            &path,
            r#"{"0x00":{"command":"NOP","args":[],"flags":["-","-","-","-"],"cycles":[4],"size":1},
                "0x01":{"command":"LD","args":["BC","e16"],"flags":["-","-","-","-"],"cycles":[12],"size":1}}"#,
        )?;
        let e = build_table(path.to_str().unwrap(), None, &DocSet::default())
            .err()
            .unwrap();
        assert_eq!(e.kind, ErrorKind::Classification);
        assert_eq!(e.ctx, Some(Encoding::unprefixed(0x01)));
        assert!(e.to_string().contains("Opcode: 0x01"));
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
    #[test]
    fn writes_artifacts() -> Result<(), Error> {
        let dir = std::env::temp_dir().join(format!("gbop-out-{}", std::process::id()));
        generate(&bundled()?, "Cpu").write_to_dir(&dir)?;
        for name in Artifacts::FILE_NAMES {
            assert!(fs::read_to_string(dir.join(name))?.starts_with("// @generated by gbop"));
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
