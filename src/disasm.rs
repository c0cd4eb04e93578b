//! Every record is compiled into a [RenderPlan]: literal text interleaved with
//! immediate reads at fixed offsets from the start of the instruction. The same
//! plan drives two consumers so they can never disagree:
//!
//! - [Disassembler] executes plans against a [ByteSource] at run time
//! - [DisassemblerEmitter] prints one self-contained rendering routine per plan
//!
//! Rendering rules:
//! - the mnemonic comes first, then a space before the first operand and `", "`
//!   between operands (no trailing space when there are no operands)
//! - immediates are read little-endian and printed as `0x` followed by 2 or 4
//!   upper-case hex digits; signed bytes print their bit pattern
//! - dereferenced immediates are wrapped in parentheses
//! - every other operand prints its token unchanged
use super::record::{OpcodeRecord, PREFIX_BYTE};
use super::*;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Anything instructions can be read from.
pub trait ByteSource {
    fn read8(&self, addr: u16) -> Result<u8, Error>;
    // little endian
    fn read16(&self, addr: u16) -> Result<u16, Error> {
        let lo = self.read8(addr)? as u16;
        let hi = self.read8(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }
}
impl ByteSource for [u8] {
    fn read8(&self, addr: u16) -> Result<u8, Error> {
        self.get(addr as usize)
            .copied()
            .ok_or_else(|| memory_err!("Out of bounds read at {:04X} ({} bytes available)", addr, self.len()))
    }
}
impl ByteSource for Vec<u8> {
    fn read8(&self, addr: u16) -> Result<u8, Error> { self.as_slice().read8(addr) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImmediateKind {
    U8,
    I8,
    U16,
}
impl ImmediateKind {
    pub fn width(&self) -> u16 {
        match self {
            ImmediateKind::U8 | ImmediateKind::I8 => 1,
            ImmediateKind::U16 => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Piece {
    Literal(String),
    Immediate {
        /// bytes from the start of the instruction
        offset: u16,
        kind: ImmediateKind,
        deref: bool,
        /// text printed directly before the value (e.g. "SP+")
        prefix: String,
    },
}

/// How to render one instruction.
#[derive(Clone, Debug)]
pub struct RenderPlan {
    pub encoding: Encoding,
    pub name: String,
    pub pieces: Vec<Piece>,
    pub size: u16,
}
impl RenderPlan {
    pub fn compile(record: &OpcodeRecord) -> RenderPlan {
        let mut pieces = Vec::new();
        let mut text = record.mnemonic.clone();
        let mut offset = record.base_size();
        for (i, op) in record.operands.iter().enumerate() {
            text.push_str(if i == 0 { " " } else { ", " });
            if !op.category.is_immediate() {
                text.push_str(&op.token);
                continue;
            }
            let kind = match (op.width(), op.is_signed()) {
                (1, false) => ImmediateKind::U8,
                (1, true) => ImmediateKind::I8,
                _ => ImmediateKind::U16,
            };
            pieces.push(Piece::Literal(std::mem::take(&mut text)));
            pieces.push(Piece::Immediate {
                offset,
                kind,
                deref: op.category.is_deref(),
                prefix: op.immediate_prefix().to_string(),
            });
            offset += kind.width();
        }
        if !text.is_empty() {
            pieces.push(Piece::Literal(text));
        }
        debug_assert_eq!(offset, record.size);
        RenderPlan {
            encoding: record.encoding,
            name: record.display_name(),
            pieces,
            size: record.size,
        }
    }
    /// Bytes of immediate data the plan reads.
    pub fn reads(&self) -> u16 {
        self.pieces
            .iter()
            .map(|p| match p {
                Piece::Immediate { kind, .. } => kind.width(),
                Piece::Literal(_) => 0,
            })
            .sum()
    }
    /// Render the instruction located at `pc`.
    pub fn render<S: ByteSource + ?Sized>(&self, src: &S, pc: u16) -> Result<(String, u16), Error> {
        let mut out = String::new();
        for piece in self.pieces.iter() {
            match piece {
                Piece::Literal(s) => out.push_str(s),
                Piece::Immediate {
                    offset,
                    kind,
                    deref,
                    prefix,
                } => {
                    let addr = pc.wrapping_add(*offset);
                    let value = match kind {
                        ImmediateKind::U8 => format!("0x{:02X}", src.read8(addr)?),
                        ImmediateKind::I8 => format!("0x{:02X}", src.read8(addr)? as i8),
                        ImmediateKind::U16 => format!("0x{:04X}", src.read16(addr)?),
                    };
                    if *deref {
                        let _ = write!(out, "{}({})", prefix, value);
                    } else {
                        let _ = write!(out, "{}{}", prefix, value);
                    }
                }
            }
        }
        Ok((out, self.size))
    }
}

/// One disassembled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disassembly {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub text: String,
    pub size: u16,
}
impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes: Vec<String> = self.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "{:04X}: {:9}  {}", self.addr, bytes.join(" "), self.text)
    }
}

/// Table-driven disassembler built from an [OpcodeTable].
pub struct Disassembler {
    plans: BTreeMap<Encoding, RenderPlan>,
    has_prefixed: bool,
}
impl Disassembler {
    pub fn new(table: &OpcodeTable) -> Self {
        let plans: BTreeMap<Encoding, RenderPlan> =
            table.iter().map(|r| (r.encoding, RenderPlan::compile(r))).collect();
        let has_prefixed = plans.keys().any(|e| e.space == InstructionSpace::Prefixed);
        Disassembler { plans, has_prefixed }
    }
    pub fn plan(&self, encoding: Encoding) -> Option<&RenderPlan> { self.plans.get(&encoding) }
    /// Find the plan for the instruction at `pc`. None if the opcode is not in the table.
    pub fn decode<S: ByteSource + ?Sized>(&self, src: &S, pc: u16) -> Result<Option<&RenderPlan>, Error> {
        let op = src.read8(pc)?;
        let encoding = if op == PREFIX_BYTE && self.has_prefixed {
            Encoding::prefixed(src.read8(pc.wrapping_add(1))?)
        } else {
            Encoding::unprefixed(op)
        };
        Ok(self.plan(encoding))
    }
    /// Render the instruction at `pc`. Opcodes missing from the table render as a
    /// single data byte.
    pub fn disassemble<S: ByteSource + ?Sized>(&self, src: &S, pc: u16) -> Result<Disassembly, Error> {
        let (text, size) = match self.decode(src, pc)? {
            Some(plan) => plan.render(src, pc)?,
            None => (format!("DB 0x{:02X}", src.read8(pc)?), 1),
        };
        let mut bytes = Vec::with_capacity(size as usize);
        for i in 0..size {
            bytes.push(src.read8(pc.wrapping_add(i))?);
        }
        Ok(Disassembly {
            addr: pc,
            bytes,
            text,
            size,
        })
    }
    /// Disassemble linearly from `start` up to (not including) `end`, stopping
    /// after `max_count` instructions if given. A truncated final instruction
    /// ends the listing.
    pub fn listing<S: ByteSource + ?Sized>(
        &self, src: &S, start: u16, end: u32, max_count: Option<usize>,
    ) -> Vec<Disassembly> {
        let mut out = Vec::new();
        let mut pc = start as u32;
        while pc < end && max_count.map_or(true, |m| out.len() < m) {
            match self.disassemble(src, pc as u16) {
                Ok(d) if pc + d.size as u32 <= end => {
                    pc += d.size as u32;
                    out.push(d);
                }
                Ok(_) | Err(_) => {
                    warn!("instruction at {:04X} is truncated by the end of the image", pc);
                    break;
                }
            }
        }
        out
    }
}

/// Prints the disassembler artifact: a byte-source trait, one rendering routine
/// per record and a dispatcher.
pub struct DisassemblerEmitter;
impl DisassemblerEmitter {
    pub fn emit(table: &OpcodeTable) -> String {
        let dasm = Disassembler::new(table);
        let mut s = String::new();
        let _ = writeln!(s, "// @generated by gbop from {} opcodes. Do not edit.", table.len());
        s.push_str(
            "
/// Memory the rendering routines read immediates from.
pub trait ReadMemory {
    fn read8(&self, addr: u16) -> u8;
    fn read16(&self, addr: u16) -> u16 {
        (self.read8(addr) as u16) | ((self.read8(addr.wrapping_add(1)) as u16) << 8)
    }
}
",
        );
        for plan in dasm.plans.values() {
            s.push('\n');
            DisassemblerEmitter::emit_routine(&mut s, plan);
        }
        DisassemblerEmitter::emit_dispatch(&mut s, &dasm);
        s
    }
    fn emit_routine(s: &mut String, plan: &RenderPlan) {
        let reads = plan.reads() != 0;
        let (mem, pc) = if reads { ("mem", "pc") } else { ("_mem", "_pc") };
        s.push_str("#[allow(non_snake_case)]\n");
        let _ = writeln!(
            s,
            "pub fn {}<M: ReadMemory + ?Sized>({}: &M, {}: u16) -> (String, u16) {{",
            plan.name, mem, pc
        );
        if !reads {
            let text = match plan.pieces.first() {
                Some(Piece::Literal(t)) => t.as_str(),
                _ => "",
            };
            let _ = writeln!(s, "    (String::from({:?}), {})", text, plan.size);
            s.push_str("}\n");
            return;
        }
        s.push_str("    let mut result = String::new();\n");
        for (i, piece) in plan.pieces.iter().enumerate() {
            match piece {
                Piece::Literal(t) => {
                    let _ = writeln!(s, "    result.push_str({:?});", t);
                }
                Piece::Immediate {
                    offset,
                    kind,
                    deref,
                    prefix,
                } => {
                    let (ty, read, digits) = match kind {
                        ImmediateKind::U8 => ("u8", "mem.read8", 2),
                        ImmediateKind::I8 => ("i8", "mem.read8", 2),
                        ImmediateKind::U16 => ("u16", "mem.read16", 4),
                    };
                    let cast = if *kind == ImmediateKind::I8 { " as i8" } else { "" };
                    let _ = writeln!(
                        s,
                        "    let imm{}: {} = {}(pc.wrapping_add({})){};",
                        i, ty, read, offset, cast
                    );
                    let (open, close) = if *deref { ("(", ")") } else { ("", "") };
                    let _ = writeln!(
                        s,
                        "    result.push_str(&format!(\"{}{}0x{{:0{}X}}{}\", imm{}));",
                        prefix, open, digits, close, i
                    );
                }
            }
        }
        let _ = writeln!(s, "    (result, {})", plan.size);
        s.push_str("}\n");
    }
    fn emit_dispatch(s: &mut String, dasm: &Disassembler) {
        s.push_str(
            "
/// Render the instruction at `pc`, returning its text and length in bytes.
pub fn disassemble<M: ReadMemory + ?Sized>(mem: &M, pc: u16) -> (String, u16) {
    match mem.read8(pc) {
",
        );
        if dasm.has_prefixed {
            let _ = writeln!(s, "        0x{:02X} => disassemble_prefixed(mem, pc),", PREFIX_BYTE);
        }
        for plan in dasm.plans.values() {
            if plan.encoding.space == InstructionSpace::Unprefixed && !(dasm.has_prefixed && plan.encoding.op == PREFIX_BYTE)
            {
                let _ = writeln!(s, "        0x{:02X} => {}(mem, pc),", plan.encoding.op, plan.name);
            }
        }
        s.push_str("        op => (format!(\"DB 0x{:02X}\", op), 1),\n    }\n}\n");
        if dasm.has_prefixed {
            s.push_str(
                "
fn disassemble_prefixed<M: ReadMemory + ?Sized>(mem: &M, pc: u16) -> (String, u16) {
    match mem.read8(pc.wrapping_add(1)) {
",
            );
            for plan in dasm.plans.values() {
                if plan.encoding.space == InstructionSpace::Prefixed {
                    let _ = writeln!(s, "        0x{:02X} => {}(mem, pc),", plan.encoding.op, plan.name);
                }
            }
            let _ = writeln!(s, "        _ => (String::from(\"DB 0x{:02X}\"), 1),", PREFIX_BYTE);
            s.push_str("    }\n}\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::small_table;
    use std::cell::Cell;

    /// Counts the bytes read beyond the opcode itself.
    struct Counting<'a> {
        mem: &'a [u8],
        reads: Cell<u16>,
    }
    impl<'a> ByteSource for Counting<'a> {
        fn read8(&self, addr: u16) -> Result<u8, Error> {
            self.reads.set(self.reads.get() + 1);
            self.mem.read8(addr)
        }
    }

    fn dis(bytes: &[u8]) -> Result<(String, u16), Error> {
        let dasm = Disassembler::new(&small_table());
        let d = dasm.disassemble(bytes, 0)?;
        Ok((d.text, d.size))
    }

    #[test]
    fn zero_operands() -> Result<(), Error> {
        assert_eq!(dis(&[0x00])?, ("NOP".to_string(), 1));
        Ok(())
    }
    #[test]
    fn immediates() -> Result<(), Error> {
        assert_eq!(dis(&[0xc3, 0x00, 0x80])?, ("JP 0x8000".to_string(), 3));
        assert_eq!(dis(&[0x3e, 0x7f])?, ("LD A, 0x7F".to_string(), 2));
        assert_eq!(dis(&[0x20, 0xfe])?, ("JR NZ, 0xFE".to_string(), 2));
        assert_eq!(dis(&[0xe0, 0x44])?, ("LDH (0x44), A".to_string(), 2));
        assert_eq!(dis(&[0xea, 0x34, 0x12])?, ("LD (0x1234), A".to_string(), 3));
        assert_eq!(dis(&[0xf8, 0x80])?, ("LD HL, SP+0x80".to_string(), 2));
        Ok(())
    }
    #[test]
    fn prefixed() -> Result<(), Error> {
        assert_eq!(dis(&[0xcb, 0x7f])?, ("BIT 7, A".to_string(), 2));
        assert_eq!(dis(&[0xcb, 0x11])?, ("RL C".to_string(), 2));
        // missing entries render as data
        assert_eq!(dis(&[0xcb, 0x00])?, ("DB 0xCB".to_string(), 1));
        assert_eq!(dis(&[0xd3])?, ("DB 0xD3".to_string(), 1));
        Ok(())
    }
    #[test]
    fn reads_exactly_the_immediate_span() -> Result<(), Error> {
        let table = small_table();
        let mut mem = vec![0u8; 8];
        for record in table.iter() {
            let plan = RenderPlan::compile(record);
            let counting = Counting {
                mem: &mem,
                reads: Cell::new(0),
            };
            let (_, size) = plan.render(&counting, 0)?;
            assert_eq!(size, record.size);
            assert_eq!(counting.reads.get(), record.size - record.base_size(), "{}", record);
            assert_eq!(plan.reads(), record.immediate_bytes());
        }
        // a truncated instruction is an error, not a short read
        mem.truncate(2);
        mem[0] = 0xc3;
        let e = Disassembler::new(&table).disassemble(&mem, 0).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Memory);
        Ok(())
    }
    #[test]
    fn listing() {
        let table = small_table();
        let mem: Vec<u8> = vec![0x00, 0x3e, 0x01, 0xcb, 0x7f, 0xc3, 0x50];
        let lines = Disassembler::new(&table).listing(&mem, 0, mem.len() as u32, None);
        let text: Vec<String> = lines.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            text,
            [
                "0000: 00         NOP",
                "0001: 3E 01      LD A, 0x01",
                "0003: CB 7F      BIT 7, A",
            ]
        );
        let lines = Disassembler::new(&table).listing(&mem, 0, mem.len() as u32, Some(2));
        assert_eq!(lines.len(), 2);
    }
    #[test]
    fn emitted_routines() {
        let out = DisassemblerEmitter::emit(&small_table());
        assert!(out.contains(
            "pub fn disp_NOP_0x00<M: ReadMemory + ?Sized>(_mem: &M, _pc: u16) -> (String, u16) {\n    (String::from(\"NOP\"), 1)\n}\n"
        ));
        assert!(out.contains(
            "pub fn disp_LD_0x3E<M: ReadMemory + ?Sized>(mem: &M, pc: u16) -> (String, u16) {
    let mut result = String::new();
    result.push_str(\"LD A, \");
    let imm1: u8 = mem.read8(pc.wrapping_add(1));
    result.push_str(&format!(\"0x{:02X}\", imm1));
    (result, 2)
}
"
        ));
        assert!(out.contains(
            "pub fn disp_JP_0xC3<M: ReadMemory + ?Sized>(mem: &M, pc: u16) -> (String, u16) {
    let mut result = String::new();
    result.push_str(\"JP \");
    let imm1: u16 = mem.read16(pc.wrapping_add(1));
    result.push_str(&format!(\"0x{:04X}\", imm1));
    (result, 3)
}
"
        ));
        assert!(out.contains("let imm1: u16 = mem.read16(pc.wrapping_add(1));"));
        assert!(out.contains("result.push_str(&format!(\"(0x{:04X})\", imm1));"));
        assert!(out.contains("let imm1: i8 = mem.read8(pc.wrapping_add(1)) as i8;"));
        assert!(out.contains("result.push_str(&format!(\"SP+0x{:02X}\", imm1));"));
        assert!(out.contains("        0xCB => disassemble_prefixed(mem, pc),\n"));
        assert!(!out.contains("        0xCB => disp_PREFIX_0xCB(mem, pc),"));
        assert!(out.contains("        0x7F => disp_BIT_0xCB7F(mem, pc),\n"));
        // one routine per record
        assert_eq!(out.matches("pub fn disp_").count(), 10);
    }
    #[test]
    fn emission_is_reproducible() {
        assert_eq!(DisassemblerEmitter::emit(&small_table()), DisassemblerEmitter::emit(&small_table()));
    }
}
