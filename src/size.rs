use super::operand::Operand;
use super::*;

/// Total encoded length: opcode bytes plus the immediate width of every operand.
/// Any number of immediates is summed even though real instructions carry at most one.
pub fn resolve(base: u16, operands: &[Operand]) -> u16 { operands.iter().fold(base, |size, op| size + op.width()) }

/// Offset of each immediate operand from the start of the instruction, in operand order.
/// The last offset plus its width always equals [resolve].
pub fn immediate_offsets(base: u16, operands: &[Operand]) -> Vec<(usize, u16)> {
    let mut offset = base;
    let mut out = Vec::new();
    for (i, op) in operands.iter().enumerate() {
        if op.category.is_immediate() {
            out.push((i, offset));
            offset += op.width();
        }
    }
    out
}

pub fn check_declared(encoding: Encoding, declared: u16, resolved: u16) -> Result<(), Error> {
    if declared == resolved {
        Ok(())
    } else {
        Err(size_err!(
            Some(encoding),
            "declared length {} but operands resolve to {} byte(s)",
            declared,
            resolved
        ))
    }
}
