//! Memory images to disassemble. Raw binaries are loaded at a caller-chosen
//! origin; Intel HEX files carry their own addresses.
//!
//! The hex reader follows I8HEX as described in
//! [this wikipedia article](https://en.wikipedia.org/wiki/Intel_HEX): only Data
//! and End Of File records are accepted and every checksum is verified.
use super::disasm::ByteSource;
use super::*;
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

const DATA_RECORD: u8 = 0;
const EOF_RECORD: u8 = 1;

struct HexRecord {
    address: u16,
    record_type: u8,
    data: Vec<u8>,
}
impl HexRecord {
    fn from_captures(c: &regex::Captures) -> Option<Self> {
        let data_size = u8::from_str_radix(c.get(1)?.as_str(), 16).ok()?;
        let address = u16::from_str_radix(c.get(2)?.as_str(), 16).ok()?;
        let record_type = u8::from_str_radix(c.get(3)?.as_str(), 16).ok()?;
        let data = HexRecord::data_from_str(c.get(4)?.as_str())?;
        let checksum = u8::from_str_radix(c.get(5)?.as_str(), 16).ok()?;
        if data.len() != data_size as usize {
            return None;
        }
        let h = HexRecord {
            address,
            record_type,
            data,
        };
        Some(h).filter(|h| h.calc_checksum() == checksum)
    }
    fn data_from_str(s: &str) -> Option<Vec<u8>> {
        (0..s.len() / 2)
            .map(|i| u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok())
            .collect()
    }
    fn calc_checksum(&self) -> u8 {
        let mut sum = self.data.len() as u16;
        sum += self.address >> 8;
        sum += self.address & 0xff;
        sum += self.record_type as u16;
        self.data.iter().for_each(|&b| sum += b as u16);
        (sum as u8).wrapping_neg()
    }
}

/// A contiguous span of memory starting at `base`. Gaps between hex records are zero filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    pub base: u16,
    pub bytes: Vec<u8>,
}
impl MemoryImage {
    pub fn from_binary(bytes: &[u8], org: u16) -> Result<Self, Error> {
        if org as usize + bytes.len() > 0x10000 {
            return Err(general_err!(format!(
                "{} bytes loaded at {:04X} run past the end of the address space",
                bytes.len(),
                org
            )));
        }
        Ok(MemoryImage {
            base: org,
            bytes: bytes.to_vec(),
        })
    }
    pub fn from_hex_lines<I, T>(iter: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let re = Regex::new(r"(?i)^\s*:([0-9a-f]{2})([0-9a-f]{4})([0-9a-f]{2})((?:[0-9a-f]{2})*)([0-9a-f]{2})\s*$")
            .map_err(|e| general_err!(e))?;
        let mut chunks: Vec<(u16, Vec<u8>)> = Vec::new();
        let mut eof = false;
        for (n, line) in iter.into_iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            if eof {
                return Err(general_err!("records after EOF in hex file"));
            }
            let record = re
                .captures(line)
                .and_then(|c| HexRecord::from_captures(&c))
                .ok_or_else(|| general_err!(format!("bad hex record on line {}", n + 1)))?;
            match record.record_type {
                DATA_RECORD => chunks.push((record.address, record.data)),
                EOF_RECORD => eof = true,
                t => return Err(general_err!(format!("unsupported hex record type {:02X}", t))),
            }
        }
        if !eof {
            return Err(general_err!("EOF record not found in hex file"));
        }
        let start = chunks.iter().map(|(a, _)| *a as usize).min().unwrap_or(0);
        let end = chunks.iter().map(|(a, d)| *a as usize + d.len()).max().unwrap_or(0);
        if end > 0x10000 {
            return Err(general_err!("hex data runs past the end of the address space"));
        }
        let mut bytes = vec![0u8; end - start];
        for (addr, data) in chunks {
            let at = addr as usize - start;
            bytes[at..at + data.len()].copy_from_slice(&data);
        }
        Ok(MemoryImage {
            base: start as u16,
            bytes,
        })
    }
    /// Load by extension: `.hex` is Intel HEX, anything else is raw binary at `org`.
    pub fn read_from_file(path: &Path, org: u16) -> Result<Self, Error> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext.eq_ignore_ascii_case("hex") {
            let lines = BufReader::new(File::open(path)?)
                .lines()
                .collect::<Result<Vec<String>, std::io::Error>>()?;
            MemoryImage::from_hex_lines(lines)
        } else {
            MemoryImage::from_binary(&fs::read(path)?, org)
        }
    }
    /// One past the last address in the image.
    pub fn end(&self) -> u32 { self.base as u32 + self.bytes.len() as u32 }
}
impl ByteSource for MemoryImage {
    fn read8(&self, addr: u16) -> Result<u8, Error> {
        addr.checked_sub(self.base)
            .and_then(|offset| self.bytes.get(offset as usize))
            .copied()
            .ok_or_else(|| {
                memory_err!(
                    "Out of bounds read. Address={:04X}, image={:04X}..{:04X}",
                    addr,
                    self.base,
                    self.end()
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_image() -> Result<(), Error> {
        let image = MemoryImage::from_hex_lines([":0301000000C350E9", ":00000001FF"])?;
        assert_eq!(image.base, 0x100);
        assert_eq!(image.bytes, vec![0x00, 0xc3, 0x50]);
        assert_eq!(image.read8(0x101)?, 0xc3);
        assert_eq!(image.read16(0x101)?, 0x50c3);
        assert_eq!(image.read8(0xff).unwrap_err().kind, ErrorKind::Memory);
        assert_eq!(image.read8(0x103).unwrap_err().kind, ErrorKind::Memory);
        Ok(())
    }
    #[test]
    fn hex_gaps_are_zero_filled() -> Result<(), Error> {
        let image = MemoryImage::from_hex_lines([":010000007689", ":010004003EBD", ":00000001FF"])?;
        assert_eq!(image.base, 0);
        assert_eq!(image.bytes, vec![0x76, 0, 0, 0, 0x3e]);
        Ok(())
    }
    #[test]
    fn bad_hex() {
        // bad checksum
        assert!(MemoryImage::from_hex_lines([":0100000076FF", ":00000001FF"]).is_err());
        // missing EOF
        assert!(MemoryImage::from_hex_lines([":010000007689"]).is_err());
        // data after EOF
        assert!(MemoryImage::from_hex_lines([":00000001FF", ":010000007689"]).is_err());
    }
    #[test]
    fn binary_image() -> Result<(), Error> {
        let image = MemoryImage::from_binary(&[0x3e, 0x7f], 0x8000)?;
        assert_eq!(image.end(), 0x8002);
        assert_eq!(image.read8(0x8001)?, 0x7f);
        assert!(MemoryImage::from_binary(&[0; 4], 0xfffe).is_err());
        Ok(())
    }
}
