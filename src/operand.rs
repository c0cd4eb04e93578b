//! Operand tokens are classified by membership in fixed token sets rather than by
//! parsing their syntax. Every token belongs to exactly one [OperandCategory] and
//! each category carries the number of immediate bytes it adds to an instruction.
//!
//! The raw tables use `C` both for the register and for the carry condition, so
//! tokens are looked up in a [TokenDomain] picked from the instruction mnemonic:
//!
//!| Domain | Mnemonics | `C` means | `Z`, `NZ`, `NC` |
//!| --- | --- | --- | --- |
//!| General | everything else | register C | rejected |
//!| Condition | JP, JR, CALL, RET | carry condition | condition flags |
use super::*;
use lazy_static::lazy_static;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperandCategory {
    /// A, B, C, D, E, H, L
    Register8,
    /// BC, DE, HL, SP, AF
    Register16,
    /// (C)
    DerefRegister8,
    /// (BC), (DE), (HL), (HL+), (HL-)
    DerefRegister16,
    /// d8, r8, SP+r8
    Immediate8,
    /// a16, d16
    Immediate16,
    /// (a8)
    DerefImmediate8,
    /// (a16)
    DerefImmediate16,
    /// bit number used by BIT, RES and SET
    BitIndex,
    /// restart vector used by RST
    PredefinedVectorOffset,
    /// Z, NZ, C, NC
    ConditionFlag,
    /// the CB escape byte
    PrefixMarker,
}
type C = OperandCategory;

impl OperandCategory {
    /// Number of bytes following the opcode that this operand consumes.
    pub fn width(&self) -> u16 {
        match self {
            C::Immediate8 | C::DerefImmediate8 => 1,
            C::Immediate16 | C::DerefImmediate16 => 2,
            _ => 0,
        }
    }
    pub fn is_immediate(&self) -> bool { self.width() != 0 }
    pub fn is_deref(&self) -> bool {
        matches!(
            self,
            C::DerefRegister8 | C::DerefRegister16 | C::DerefImmediate8 | C::DerefImmediate16
        )
    }
}

/// Selects which reading of an ambiguous token applies.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenDomain {
    General,
    Condition,
}
impl TokenDomain {
    pub fn for_mnemonic(mnemonic: &str) -> TokenDomain {
        match mnemonic {
            "JP" | "JR" | "CALL" | "RET" => TokenDomain::Condition,
            _ => TokenDomain::General,
        }
    }
}

#[rustfmt::skip]
const COMMON_TOKENS: &[(&str, OperandCategory)] = &[
    ("A", C::Register8), ("B", C::Register8), ("D", C::Register8), ("E", C::Register8),
    ("H", C::Register8), ("L", C::Register8),
    ("BC", C::Register16), ("DE", C::Register16), ("HL", C::Register16), ("SP", C::Register16),
    ("AF", C::Register16),
    ("(C)", C::DerefRegister8),
    ("(BC)", C::DerefRegister16), ("(DE)", C::DerefRegister16), ("(HL)", C::DerefRegister16),
    ("(HL+)", C::DerefRegister16), ("(HL-)", C::DerefRegister16),
    ("d8", C::Immediate8), ("r8", C::Immediate8), ("SP+r8", C::Immediate8),
    ("a16", C::Immediate16), ("d16", C::Immediate16),
    ("(a8)", C::DerefImmediate8),
    ("(a16)", C::DerefImmediate16),
    ("0", C::BitIndex), ("1", C::BitIndex), ("2", C::BitIndex), ("3", C::BitIndex),
    ("4", C::BitIndex), ("5", C::BitIndex), ("6", C::BitIndex), ("7", C::BitIndex),
    ("00H", C::PredefinedVectorOffset), ("08H", C::PredefinedVectorOffset),
    ("10H", C::PredefinedVectorOffset), ("18H", C::PredefinedVectorOffset),
    ("20H", C::PredefinedVectorOffset), ("28H", C::PredefinedVectorOffset),
    ("30H", C::PredefinedVectorOffset), ("38H", C::PredefinedVectorOffset),
    ("CB", C::PrefixMarker),
];
// value placeholders inside immediate tokens; anything before one is printed literally
const IMMEDIATE_PLACEHOLDERS: [&str; 4] = ["a16", "d16", "d8", "r8"];
const GENERAL_TOKENS: &[(&str, OperandCategory)] = &[("C", C::Register8)];
#[rustfmt::skip]
const CONDITION_TOKENS: &[(&str, OperandCategory)] = &[
    ("Z", C::ConditionFlag), ("NZ", C::ConditionFlag), ("C", C::ConditionFlag), ("NC", C::ConditionFlag),
];

lazy_static! {
    static ref GENERAL: HashMap<&'static str, OperandCategory> =
        COMMON_TOKENS.iter().chain(GENERAL_TOKENS).copied().collect();
    static ref CONDITION: HashMap<&'static str, OperandCategory> =
        COMMON_TOKENS.iter().chain(CONDITION_TOKENS).copied().collect();
}

/// Classify a single operand token. Unknown tokens are a hard failure; the caller
/// attaches the offending opcode to the error.
pub fn classify(token: &str, domain: TokenDomain) -> Result<OperandCategory, Error> {
    let set = match domain {
        TokenDomain::General => &*GENERAL,
        TokenDomain::Condition => &*CONDITION,
    };
    match set.get(token) {
        Some(&category) => Ok(category),
        None => Err(classification_err!(
            None,
            "unrecognized operand token \"{}\" ({:?} domain)",
            token,
            domain
        )),
    }
}

/// An operand token tagged with its category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operand {
    pub token: String,
    pub category: OperandCategory,
}
impl Operand {
    pub fn new(token: &str, domain: TokenDomain) -> Result<Operand, Error> {
        Ok(Operand {
            token: token.to_string(),
            category: classify(token, domain)?,
        })
    }
    pub fn width(&self) -> u16 { self.category.width() }
    /// For immediate operands: true if the byte is a signed offset (r8, SP+r8).
    pub fn is_signed(&self) -> bool { self.category == C::Immediate8 && self.token.ends_with("r8") }
    /// Literal text that precedes the immediate value when rendered (e.g. "SP+" for SP+r8).
    pub fn immediate_prefix(&self) -> &str {
        match self.category {
            C::Immediate8 | C::Immediate16 => IMMEDIATE_PLACEHOLDERS
                .iter()
                .find_map(|p| self.token.strip_suffix(p))
                .unwrap_or(""),
            _ => "",
        }
    }
}
impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.token) }
}
