//! Free-text instruction descriptions live in two flat reference documents, one
//! per instruction space. Each document is laid out as one header line followed by
//! sixteen blocks of seventeen lines (one line per low nibble plus a separator), so
//! the description of opcode `0xHL` lives on line `H * 17 + L + 1` (0-based).
//!
//! Documentation is advisory: a failed lookup only leaves the record undocumented.
use super::*;
use std::fs;
use std::path::Path;

const LINES_PER_ROW: usize = 17;

/// A reference document parsed once into an indexed sequence of lines.
pub struct DocReference {
    name: String,
    lines: Vec<String>,
}
impl DocReference {
    pub fn from_text(name: &str, text: &str) -> Self {
        DocReference {
            name: name.to_string(),
            lines: text.lines().map(|l| l.trim_end().to_string()).collect(),
        }
    }
    pub fn read_from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Ok(DocReference::from_text(&path.display().to_string(), &text))
    }
    pub fn line(&self, index: usize) -> Option<&str> { self.lines.get(index).map(|s| s.as_str()) }
    pub fn len(&self) -> usize { self.lines.len() }
}

pub fn line_index(encoding: Encoding) -> usize { encoding.high_nibble() * LINES_PER_ROW + encoding.low_nibble() + 1 }

/// The pair of reference documents consulted during a generation run.
#[derive(Default)]
pub struct DocSet {
    unprefixed: Option<DocReference>,
    prefixed: Option<DocReference>,
}
impl DocSet {
    pub fn new(unprefixed: Option<DocReference>, prefixed: Option<DocReference>) -> Self {
        DocSet { unprefixed, prefixed }
    }
    /// Load whichever documents were given on the command line. An unreadable
    /// document is reported and treated as absent.
    pub fn load(unprefixed: Option<&str>, prefixed: Option<&str>) -> Self {
        let read = |path: Option<&str>| {
            path.and_then(|p| match DocReference::read_from_file(Path::new(p)) {
                Ok(doc) => {
                    verbose_println!("Loaded {} documentation lines from {}", doc.len(), p);
                    Some(doc)
                }
                Err(e) => {
                    warn!("documentation unavailable ({}): {}", p, e);
                    None
                }
            })
        };
        DocSet::new(read(unprefixed), read(prefixed))
    }
    pub fn is_empty(&self) -> bool { self.unprefixed.is_none() && self.prefixed.is_none() }
    fn document(&self, space: InstructionSpace) -> Option<&DocReference> {
        match space {
            InstructionSpace::Unprefixed => self.unprefixed.as_ref(),
            InstructionSpace::Prefixed => self.prefixed.as_ref(),
        }
    }
    pub fn lookup(&self, encoding: Encoding) -> Result<String, Error> {
        let ctx = Some(encoding);
        let doc = self
            .document(encoding.space)
            .ok_or_else(|| doc_err!(ctx, "no reference document for {:?} opcodes", encoding.space))?;
        let index = line_index(encoding);
        let text = doc.line(index).ok_or_else(|| {
            doc_err!(
                ctx,
                "line {} is beyond the end of {} ({} lines)",
                index,
                doc.name,
                doc.len()
            )
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(doc_err!(ctx, "line {} of {} is blank", index, doc.name));
        }
        Ok(text.to_string())
    }
}
