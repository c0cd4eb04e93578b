//! The opcode table is built once per run from one or more raw tables:
//!
//!  1. every key is parsed into an [Encoding], tagged with the instruction space of
//!     the table it came from (0xCBNN keys are always prefixed)
//!  2. every record is normalized (operands classified, size resolved and checked)
//!  3. keys are checked for collisions across all the raw tables
//!  4. the reference documents, if any, annotate each record
//!
//! The first structural error aborts the build. Once built the table is only read.
use super::docs::DocSet;
use super::record::{OpcodeRecord, RawTable};
use super::*;
use std::collections::BTreeMap;

/// Collects raw tables and turns them into an [OpcodeTable].
#[derive(Default)]
pub struct TableBuilder {
    records: BTreeMap<Encoding, OpcodeRecord>,
}
impl TableBuilder {
    pub fn new() -> Self { TableBuilder::default() }
    /// Normalize and add every entry of a raw table. `space` is the space of keys
    /// written without the 0xCB prefix.
    pub fn add_raw(&mut self, space: InstructionSpace, raw: &RawTable) -> Result<&mut Self, Error> {
        for (key, raw_record) in raw.entries.iter() {
            let encoding = Encoding::parse(key, space)?;
            let record = OpcodeRecord::from_raw(encoding, raw_record)?;
            if let Some(existing) = self.records.get(&encoding) {
                return Err(collision_err!(
                    Some(encoding),
                    "\"{}\" ({}) collides with {}",
                    key,
                    record.prototype(),
                    existing.prototype()
                ));
            }
            self.records.insert(encoding, record);
        }
        Ok(self)
    }
    pub fn build(self) -> OpcodeTable { OpcodeTable { records: self.records } }
}

pub struct OpcodeTable {
    records: BTreeMap<Encoding, OpcodeRecord>,
}
impl OpcodeTable {
    /// Build from a merged table and an optional separately sourced prefixed table.
    pub fn from_raw(merged: &RawTable, prefixed: Option<&RawTable>) -> Result<OpcodeTable, Error> {
        let mut builder = TableBuilder::new();
        builder.add_raw(InstructionSpace::Unprefixed, merged)?;
        if let Some(cb) = prefixed {
            builder.add_raw(InstructionSpace::Prefixed, cb)?;
        }
        Ok(builder.build())
    }
    /// Attach descriptions from the reference documents. Lookup failures never
    /// fail the run; they leave the affected record undocumented.
    pub fn annotate(mut self, docs: &DocSet) -> (OpcodeTable, usize) {
        if docs.is_empty() {
            return (self, 0);
        }
        let mut documented = 0;
        for (encoding, record) in self.records.iter_mut() {
            match docs.lookup(*encoding) {
                Ok(text) => {
                    record.doc = Some(text);
                    documented += 1;
                }
                Err(e) => {
                    record.doc = None;
                    verbose_warn!("{}", e);
                }
            }
        }
        (self, documented)
    }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn get(&self, encoding: Encoding) -> Option<&OpcodeRecord> { self.records.get(&encoding) }
    pub fn get_key(&self, key: u16) -> Option<&OpcodeRecord> { self.get(Encoding::from_key(key)?) }
    /// Records in binary encoding order.
    pub fn iter(&self) -> impl Iterator<Item = &OpcodeRecord> { self.records.values() }
    pub fn space(&self, space: InstructionSpace) -> impl Iterator<Item = &OpcodeRecord> {
        self.iter().filter(move |r| r.encoding.space == space)
    }
    /// Records sorted by (mnemonic, encoding).
    pub fn by_mnemonic(&self) -> Vec<&OpcodeRecord> {
        let mut v: Vec<&OpcodeRecord> = self.iter().collect();
        v.sort_by(|a, b| (&a.mnemonic, a.encoding).cmp(&(&b.mnemonic, b.encoding)));
        v
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::docs::DocReference;
    use std::fmt::Write;

    pub(crate) fn entry(key: &str, command: &str, args: &[&str], size: u16) -> String {
        let args: Vec<String> = args.iter().map(|a| format!("\"{}\"", a)).collect();
        format!(
            "\"{}\":{{\"command\":\"{}\",\"args\":[{}],\"flags\":[\"-\",\"-\",\"-\",\"-\"],\"cycles\":[4],\"size\":{}}}",
            key,
            command,
            args.join(","),
            size
        )
    }
    pub(crate) fn table_json(entries: &[String]) -> String { format!("{{{}}}", entries.join(",")) }
    /// A small mixed table covering both instruction spaces.
    pub(crate) fn small_table() -> OpcodeTable {
        let json = table_json(&[
            entry("0x00", "NOP", &[], 1),
            entry("0x3E", "LD", &["A", "d8"], 1),
            entry("0xC3", "JP", &["a16"], 1),
            entry("0x20", "JR", &["NZ", "r8"], 1),
            entry("0xE0", "LDH", &["(a8)", "A"], 1),
            entry("0xEA", "LD", &["(a16)", "A"], 1),
            entry("0xF8", "LD", &["HL", "SP+r8"], 1),
            entry("0xCB", "PREFIX", &["CB"], 1),
            entry("0xCB7F", "BIT", &["7", "A"], 2),
            entry("0xCB11", "RL", &["C"], 2),
        ]);
        OpcodeTable::from_raw(&RawTable::from_json(&json).unwrap(), None).unwrap()
    }
    fn full_synthetic(cb_keys_merged: bool) -> Result<OpcodeTable, Error> {
        let plain: Vec<String> = (0..=255u8)
            .map(|op| entry(&format!("0x{:02X}", op), "NOP", &[], 1))
            .collect();
        let cb: Vec<String> = (0..=255u8)
            .map(|op| {
                let key = if cb_keys_merged {
                    format!("0xCB{:02X}", op)
                } else {
                    format!("0x{:02X}", op)
                };
                entry(&key, "SWAP", &["A"], 2)
            })
            .collect();
        if cb_keys_merged {
            let all: Vec<String> = plain.into_iter().chain(cb).collect();
            OpcodeTable::from_raw(&RawTable::from_json(&table_json(&all))?, None)
        } else {
            OpcodeTable::from_raw(
                &RawTable::from_json(&table_json(&plain))?,
                Some(&RawTable::from_json(&table_json(&cb))?),
            )
        }
    }

    #[test]
    fn full_opcode_space() -> Result<(), Error> {
        for merged in [true, false] {
            let table = full_synthetic(merged)?;
            assert_eq!(table.len(), 512);
            assert_eq!(table.space(InstructionSpace::Unprefixed).count(), 256);
            assert_eq!(table.space(InstructionSpace::Prefixed).count(), 256);
            let mut keys: Vec<u16> = table.iter().map(|r| r.encoding.key()).collect();
            keys.dedup();
            assert_eq!(keys.len(), 512);
            assert!(table.get_key(0xcbff).is_some());
        }
        Ok(())
    }
    #[test]
    fn collisions() -> Result<(), Error> {
        // same key twice in one object
        let json = table_json(&[entry("0x00", "NOP", &[], 1), entry("0x00", "HALT", &[], 1)]);
        let e = OpcodeTable::from_raw(&RawTable::from_json(&json)?, None).err().unwrap();
        assert_eq!(e.kind, ErrorKind::EncodingCollision);
        assert_eq!(e.ctx, Some(Encoding::unprefixed(0)));
        // same key spelled differently
        let json = table_json(&[entry("0x3e", "NOP", &[], 1), entry("0x3E", "NOP", &[], 1)]);
        let e = OpcodeTable::from_raw(&RawTable::from_json(&json)?, None).err().unwrap();
        assert_eq!(e.kind, ErrorKind::EncodingCollision);
        // merged table and separate prefixed table both define 0xCB11
        let merged = table_json(&[entry("0xCB11", "RL", &["C"], 2)]);
        let cb = table_json(&[entry("0x11", "RL", &["C"], 2)]);
        let e = OpcodeTable::from_raw(&RawTable::from_json(&merged)?, Some(&RawTable::from_json(&cb)?))
            .err()
            .unwrap();
        assert_eq!(e.kind, ErrorKind::EncodingCollision);
        assert_eq!(e.ctx, Some(Encoding::prefixed(0x11)));
        Ok(())
    }
    #[test]
    fn unknown_token_aborts_build() -> Result<(), Error> {
        let json = table_json(&[entry("0x00", "NOP", &[], 1), entry("0x01", "LD", &["BC", "x16"], 1)]);
        let e = OpcodeTable::from_raw(&RawTable::from_json(&json)?, None).err().unwrap();
        assert_eq!(e.kind, ErrorKind::Classification);
        assert_eq!(e.ctx, Some(Encoding::unprefixed(1)));
        Ok(())
    }
    #[test]
    fn mnemonic_order() {
        let table = small_table();
        let names: Vec<String> = table.by_mnemonic().iter().map(|r| r.handler_name()).collect();
        assert_eq!(
            names,
            [
                "instr_BIT_0xCB7F",
                "instr_JP_0xC3",
                "instr_JR_0x20",
                "instr_LD_0x3E",
                "instr_LD_0xEA",
                "instr_LD_0xF8",
                "instr_LDH_0xE0",
                "instr_NOP_0x00",
                "instr_PREFIX_0xCB",
                "instr_RL_0xCB11",
            ]
        );
        let keys: Vec<u16> = table.iter().map(|r| r.encoding.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
    #[test]
    fn annotation_is_per_record() {
        let mut doc = String::from("header\n");
        for hi in 0..16 {
            for lo in 0..16 {
                let _ = writeln!(doc, "desc {:X}{:X}", hi, lo);
            }
            doc.push('\n');
        }
        // only the unprefixed document is available
        let docs = DocSet::new(Some(DocReference::from_text("plain", &doc)), None);
        let (table, documented) = small_table().annotate(&docs);
        assert_eq!(documented, 8);
        assert_eq!(table.get_key(0x3e).unwrap().doc.as_deref(), Some("desc 3E"));
        assert_eq!(table.get_key(0xcb7f).unwrap().doc, None);
    }
    #[test]
    fn bundled_tables() -> Result<(), Error> {
        let plain = RawTable::read_from_file(std::path::Path::new("data/opcodes.json"))?;
        let cb = RawTable::read_from_file(std::path::Path::new("data/opcodes_cb.json"))?;
        let table = OpcodeTable::from_raw(&plain, Some(&cb))?;
        assert_eq!(table.space(InstructionSpace::Unprefixed).count(), 245);
        assert_eq!(table.space(InstructionSpace::Prefixed).count(), 256);
        for r in table.iter() {
            assert_eq!(r.size, size::resolve(r.base_size(), &r.operands), "{}", r);
            assert!(r.size <= 3, "{}", r);
        }
        assert_eq!(table.get_key(0xc3).unwrap().size, 3);
        assert_eq!(table.get_key(0xcb46).unwrap().prototype(), "BIT 0, (HL)");
        assert_eq!(
            table.get_key(0xd8).unwrap().operands[0].category,
            operand::OperandCategory::ConditionFlag
        );
        assert_eq!(
            table.get_key(0x0e).unwrap().operands[0].category,
            operand::OperandCategory::Register8
        );
        Ok(())
    }
}
