//! Raw opcode records as supplied by the upstream table, and the canonical
//! [OpcodeRecord] built from them.
//!
//! Raw tables are JSON objects keyed by binary encoding:
//! ```text
//! "0x3E": { "command": "LD", "args": ["A", "d8"], "flags": ["-", "-", "-", "-"], "cycles": [8], "size": 1 }
//! ```
//! Keys are `0xNN` for the unprefixed space and `0xCBNN` for the prefixed space.
//! A separately sourced prefixed table may use plain `0xNN` keys; it is then read
//! with [InstructionSpace::Prefixed] as its space.
use super::operand::{Operand, TokenDomain};
use super::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The escape byte that selects the prefixed instruction space.
pub const PREFIX_BYTE: u8 = 0xcb;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum InstructionSpace {
    Unprefixed,
    Prefixed,
}
impl InstructionSpace {
    /// Opcode bytes an instruction in this space occupies (the prefix byte counts).
    pub fn base_size(&self) -> u16 {
        match self {
            InstructionSpace::Unprefixed => 1,
            InstructionSpace::Prefixed => 2,
        }
    }
}

/// The binary encoding of an instruction. Ordering matches the numeric key, so
/// every unprefixed opcode sorts before every prefixed one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Encoding {
    pub space: InstructionSpace,
    pub op: u8,
}
lazy_static! {
    static ref RE_KEY: Regex = Regex::new(r"(?i)^\s*0x(cb)?([0-9a-f]{2})\s*$").unwrap();
}
impl Encoding {
    pub fn new(space: InstructionSpace, op: u8) -> Self { Encoding { space, op } }
    pub fn unprefixed(op: u8) -> Self { Encoding::new(InstructionSpace::Unprefixed, op) }
    pub fn prefixed(op: u8) -> Self { Encoding::new(InstructionSpace::Prefixed, op) }
    /// The 16-bit key shared by both spaces: 0x00NN or 0xCBNN.
    pub fn key(&self) -> u16 {
        match self.space {
            InstructionSpace::Unprefixed => self.op as u16,
            InstructionSpace::Prefixed => ((PREFIX_BYTE as u16) << 8) | self.op as u16,
        }
    }
    pub fn from_key(key: u16) -> Option<Self> {
        match key >> 8 {
            0 => Some(Encoding::unprefixed(key as u8)),
            hi if hi == PREFIX_BYTE as u16 => Some(Encoding::prefixed(key as u8)),
            _ => None,
        }
    }
    /// Parse a table key. `space` is the space of the table the key came from; an
    /// explicit 0xCB prefix always selects the prefixed space.
    pub fn parse(key: &str, space: InstructionSpace) -> Result<Self, Error> {
        let c = RE_KEY
            .captures(key)
            .ok_or_else(|| malformed_err!(None, "bad opcode key \"{}\"", key))?;
        let op = u8::from_str_radix(&c[2], 16).map_err(|_| malformed_err!(None, "bad opcode key \"{}\"", key))?;
        if c.get(1).is_some() {
            Ok(Encoding::prefixed(op))
        } else {
            Ok(Encoding::new(space, op))
        }
    }
    pub fn high_nibble(&self) -> usize { (self.op >> 4) as usize }
    pub fn low_nibble(&self) -> usize { (self.op & 0x0f) as usize }
    /// The opcode bytes as they appear in memory.
    pub fn bytes(&self) -> Vec<u8> {
        match self.space {
            InstructionSpace::Unprefixed => vec![self.op],
            InstructionSpace::Prefixed => vec![PREFIX_BYTE, self.op],
        }
    }
}
impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.space {
            InstructionSpace::Unprefixed => format!("0x{:02X}", self.op),
            InstructionSpace::Prefixed => format!("0x{:02X}{:02X}", PREFIX_BYTE, self.op),
        };
        write!(f, "{:width$}", s, width = f.width().unwrap_or(0))
    }
}

/// Effect of an instruction on a single flag bit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FlagEffect {
    Preserved,
    ForceSet,
    ForceUnset,
    ConditionalSet,
}
impl FlagEffect {
    pub fn from_symbol(sym: &str) -> FlagEffect {
        match sym {
            "-" => FlagEffect::Preserved,
            "0" => FlagEffect::ForceUnset,
            "1" => FlagEffect::ForceSet,
            _ => FlagEffect::ConditionalSet,
        }
    }
    pub fn describe(&self) -> &'static str {
        match self {
            FlagEffect::Preserved => "Preserved",
            FlagEffect::ForceUnset => "Force unset (0)",
            FlagEffect::ForceSet => "Force set (1)",
            FlagEffect::ConditionalSet => "Set if appropriate",
        }
    }
}
/// Flag bits in the order the raw tables list them.
pub const FLAG_NAMES: [&str; 4] = ["Z", "N", "H", "C"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cycles {
    Fixed(u8),
    Branch { not_taken: u8, taken: u8 },
}
impl Cycles {
    /// Build from the raw not-taken-first list. Returns the cycles and true if the
    /// pair had to be swapped because it was listed taken-first.
    pub fn from_list(list: &[u8]) -> Option<(Cycles, bool)> {
        match *list {
            [n] => Some((Cycles::Fixed(n), false)),
            [a, b] if a > b => Some((Cycles::Branch { not_taken: b, taken: a }, true)),
            [a, b] => Some((Cycles::Branch { not_taken: a, taken: b }, false)),
            _ => None,
        }
    }
    pub fn is_conditional(&self) -> bool { matches!(self, Cycles::Branch { .. }) }
}
impl fmt::Display for Cycles {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cycles::Fixed(n) => write!(f, "{} cycles", n),
            Cycles::Branch { not_taken, taken } => {
                write!(f, "{} cycles (not taken) or {} cycles (taken)", not_taken, taken)
            }
        }
    }
}

/// A record exactly as the upstream collaborator supplies it.
#[derive(Clone, Debug, Deserialize)]
pub struct RawRecord {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub flags: Vec<String>,
    pub cycles: Vec<u8>,
    /// opcode bytes (1, or 2 for prefixed opcodes)
    pub size: u16,
    /// optional total length in bytes, checked against the resolved size
    #[serde(default)]
    pub length: Option<u16>,
}

/// A raw table in source order. Duplicate keys are kept so that collisions can be
/// reported rather than silently overwritten.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub entries: Vec<(String, RawRecord)>,
}
impl<'de> Deserialize<'de> for RawTable {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntryVisitor;
        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = RawTable;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of opcode keys to opcode records")
            }
            fn visit_map<A>(self, mut map: A) -> Result<RawTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, RawRecord>()? {
                    entries.push(entry);
                }
                Ok(RawTable { entries })
            }
        }
        de.deserialize_map(EntryVisitor)
    }
}
impl RawTable {
    pub fn from_json(json: &str) -> Result<Self, Error> { Ok(serde_json::from_str(json)?) }
    pub fn read_from_file(path: &Path) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        RawTable::from_json(&json).map_err(|e| Error::new(e.kind, e.ctx, &format!("{}: {}", path.display(), e.msg)))
    }
    pub fn len(&self) -> usize { self.entries.len() }
}

/// Canonical per-instruction record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpcodeRecord {
    pub encoding: Encoding,
    pub mnemonic: String,
    /// 0, 1 or 2 operands in source order
    pub operands: Vec<Operand>,
    /// effects on Z, N, H and C
    pub flags: [FlagEffect; 4],
    pub cycles: Cycles,
    /// total size in bytes (opcode bytes plus immediates)
    pub size: u16,
    /// free-text description from the reference document, if one was found
    pub doc: Option<String>,
}
impl OpcodeRecord {
    /// Normalize a raw record. Errors carry the record's encoding.
    pub fn from_raw(encoding: Encoding, raw: &RawRecord) -> Result<OpcodeRecord, Error> {
        let ctx = Some(encoding);
        let mnemonic = raw.command.trim();
        if mnemonic.is_empty() || !mnemonic.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(malformed_err!(ctx, "bad mnemonic \"{}\"", raw.command));
        }
        if raw.args.len() > 2 {
            return Err(malformed_err!(ctx, "{} operands (at most 2 allowed)", raw.args.len()));
        }
        let domain = TokenDomain::for_mnemonic(mnemonic);
        let operands = raw
            .args
            .iter()
            .map(|a| Operand::new(a, domain))
            .collect::<Result<Vec<_>, Error>>()
            .map_err(|mut e| {
                e.ctx = ctx;
                e
            })?;
        let flags: [FlagEffect; 4] = match raw.flags.as_slice() {
            [z, n, h, c] => [z, n, h, c].map(|s| FlagEffect::from_symbol(s)),
            other => return Err(malformed_err!(ctx, "{} flag effects (expected 4)", other.len())),
        };
        let (cycles, swapped) = Cycles::from_list(&raw.cycles)
            .ok_or_else(|| malformed_err!(ctx, "{} cycle counts (expected 1 or 2)", raw.cycles.len()))?;
        if swapped {
            verbose_warn!("{}: cycle counts listed taken-first; swapped to {}", encoding, cycles);
        }
        let base = encoding.space.base_size();
        if raw.size != base {
            return Err(size_err!(
                ctx,
                "declared {} opcode byte(s) but {:?} opcodes take {}",
                raw.size,
                encoding.space,
                base
            ));
        }
        let size = size::resolve(base, &operands);
        if let Some(length) = raw.length {
            size::check_declared(encoding, length, size)?;
        }
        Ok(OpcodeRecord {
            encoding,
            mnemonic: mnemonic.to_string(),
            operands,
            flags,
            cycles,
            size,
            doc: None,
        })
    }
    pub fn base_size(&self) -> u16 { self.encoding.space.base_size() }
    /// Bytes of immediate data following the opcode bytes.
    pub fn immediate_bytes(&self) -> u16 { self.size - self.base_size() }
    /// e.g. "LD A, d8"
    pub fn prototype(&self) -> String {
        let args: Vec<&str> = self.operands.iter().map(|o| o.token.as_str()).collect();
        if args.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, args.join(", "))
        }
    }
    /// Stable identifier for the record's handler, e.g. instr_LD_0x3E or instr_RLC_0xCB00.
    pub fn handler_name(&self) -> String { format!("instr_{}_{}", self.mnemonic, self.encoding) }
    /// Stable identifier for the record's rendering routine.
    pub fn display_name(&self) -> String { format!("disp_{}_{}", self.mnemonic, self.encoding) }
}
impl fmt::Display for OpcodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:width$}",
            format!("{} {}, {}, ({})", self.encoding, self.prototype(), self.cycles, self.size),
            width = f.width().unwrap_or(0)
        )
    }
}
