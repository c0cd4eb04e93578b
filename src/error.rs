use crate::record::Encoding;
use std::{convert::From, fmt};

/// Simple custom Error for the opcode table compiler
pub struct Error {
    pub kind: ErrorKind,
    /// the binary encoding of the record that caused the error (if any)
    pub ctx: Option<Encoding>,
    pub msg: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// operand token that matches none of the operand categories
    Classification,
    /// declared size disagrees with the size resolved from the operands
    SizeMismatch,
    /// two records claim the same binary encoding
    EncodingCollision,
    /// documentation line could not be found (never fatal)
    DocLookup,
    /// record or key has the wrong shape
    Malformed,
    /// read outside of a memory image while disassembling
    Memory,
    /// underlying io error
    IO,
    /// catch-all for other errors
    General,
}

impl Error {
    pub fn new(kind: ErrorKind, ctx: Option<Encoding>, message: &str) -> Error {
        Error {
            kind,
            ctx,
            msg: String::from(message),
        }
    }
    /// Structural errors abort the whole generation run; advisory ones only affect a single record.
    pub fn is_fatal(&self) -> bool { self.kind != ErrorKind::DocLookup }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, None, e.to_string().as_str()) }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self { Error::new(ErrorKind::Malformed, None, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {:?}: {}", red!("gbop::Error"), self.kind, self.msg)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut res = write!(f, "{}", self.msg);
        if res.is_ok() {
            if let Some(ctx) = self.ctx {
                res = write!(f, "\nOpcode: {}", ctx);
            }
        }
        res
    }
}
impl std::error::Error for Error {}
