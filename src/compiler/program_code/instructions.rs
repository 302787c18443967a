use num_derive::FromPrimitive;
use num_derive::ToPrimitive;
use num_traits::ToPrimitive;
use strum_macros::Display;
use strum_macros::EnumString;
use enum_assoc::Assoc;
use std::fmt;

/// TM register file. The discriminant is the operand encoding used in the
/// emitted listing. GP addresses global memory, FP the current frame, RET
/// carries function results and PC is the program counter.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum Register {
    GP  = 0,
    FP  = 1,
    RET = 2,
    AC  = 3,
    AC1 = 4,
    AC2 = 5,
    AC3 = 6,
    PC  = 7,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Safe to unwrap as every variant carries a u8 discriminant
        write!(f, "{}", self.to_u8().unwrap())
    }
}

/// Register-only TM operations of the form `OP r,s,t`.
#[allow(dead_code)]
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display, EnumString)]
pub enum RoOp {
    HALT,
    IN,
    INB,
    INC,
    OUT,
    OUTB,
    OUTC,
    OUTNL,
    ADD,
    SUB,
    MUL,
    DIV,
    MOD,
    AND,
    OR,
    XOR,
    NEG,
    SWP,
    MOV,
    CO,
    RND,
    TEQ,
    TNE,
    TLT,
    TLE,
    TGT,
    TGE,
    SLT,
}

/// Register-memory TM operations of the form `OP r,d(s)` where the effective
/// address is d + R[s]. The jump forms transfer control when s is the PC.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display, EnumString,
         Assoc)]
#[func(pub const fn is_jump(&self) -> bool)]
pub enum RmOp {
    #[assoc(is_jump = false)]
    LD,
    #[assoc(is_jump = false)]
    LDA,
    #[assoc(is_jump = false)]
    LDC,
    #[assoc(is_jump = false)]
    ST,
    #[assoc(is_jump = true)]
    JMP,
    #[assoc(is_jump = true)]
    JNZ,
    #[assoc(is_jump = true)]
    JZR,
}

/// A single TM instruction with its listing comment. Instructions render
/// without their address; ProgramCode prefixes the address when formatting
/// the full listing.
#[derive(Debug, Clone, PartialEq)]
pub enum TmInstruction {
    Ro {
        op: RoOp,
        r: Register,
        s: Register,
        t: Register,
        comment: String,
    },
    Rm {
        op: RmOp,
        r: Register,
        d: i32,
        s: Register,
        comment: String,
    },
}

impl TmInstruction {
    /// Relative branch displacement if this instruction is a PC-relative jump.
    pub fn jump_displacement(&self) -> Option<i32> {
        match self {
            TmInstruction::Rm { op, d, s, .. } if op.is_jump() && *s == Register::PC => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for TmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TmInstruction::Ro { op, r, s, t, comment } => {
                write!(f, "{:>5}  {},{},{}\t{}", op.to_string(), r, s, t, comment)
            }
            TmInstruction::Rm { op, r, d, s, comment } => {
                write!(f, "{:>5}  {},{}({})\t{}", op.to_string(), r, d, s, comment)
            }
        }
    }
}
