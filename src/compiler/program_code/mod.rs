pub mod instructions;

use std::collections::HashMap;
use std::fmt;

pub use self::instructions::{
    Register,
    RoOp,
    RmOp,
    TmInstruction,
};

/// Non-instruction lines interleaved into a listing. Comments are purely
/// decorative; string data lines carry the characters of a string constant
/// placed in global memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    Comment(String),
    StrLit {
        location: i32,
        text: String,
    },
}

impl fmt::Display for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoration::Comment(text) => write!(f, "* {}", text),
            Decoration::StrLit { location, text } => {
                write!(f, "{:>3}:  .SDATA  \"", location)?;
                for c in text.chars() {
                    match c {
                        '\n' => write!(f, "\\n")?,
                        '\0' => write!(f, "\\0")?,
                        '\\' => write!(f, "\\\\")?,
                        '"' => write!(f, "\\\"")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

/// ProgramCode is the finished TM program: an address-indexed instruction
/// vector plus the decorations attached before each address. Its Display
/// implementation is the `.tm` wire format consumed by the TM interpreter.
#[derive(Debug, PartialEq)]
pub struct ProgramCode {
    instructions: Vec<TmInstruction>,

    /// Decoration lines printed before the instruction at each address.
    /// An entry at `instructions.len()` trails the whole listing.
    decorations: HashMap<usize, Vec<Decoration>>,
}

impl ProgramCode {
    pub fn new(instructions: Vec<TmInstruction>, decorations: HashMap<usize, Vec<Decoration>>) -> Self {
        ProgramCode {
            instructions,
            decorations,
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn instructions(&self) -> &[TmInstruction] {
        &self.instructions
    }

    /// Resolved absolute targets of every PC-relative jump as
    /// (source address, target address) pairs. The target of a jump at
    /// address A with displacement d is A + 1 + d because the PC has
    /// already advanced when the displacement is applied.
    pub fn jump_targets(&self) -> Vec<(usize, i64)> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(addr, instr)| {
                instr.jump_displacement()
                    .map(|d| (addr, addr as i64 + 1 + d as i64))
            })
            .collect()
    }
}

impl fmt::Display for ProgramCode {
    /// Renders the listing: each instruction as `<addr>:  <OP>  <operands>`
    /// preceded by its `*` comment lines and string data directives.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for addr in 0..=self.instructions.len() {
            if let Some(decorations) = self.decorations.get(&addr) {
                for decoration in decorations {
                    writeln!(f, "{}", decoration)?;
                }
            }
            if let Some(instr) = self.instructions.get(addr) {
                writeln!(f, "{:>3}:  {}", addr, instr)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halt() -> TmInstruction {
        TmInstruction::Ro {
            op: RoOp::HALT,
            r: Register::GP,
            s: Register::GP,
            t: Register::GP,
            comment: String::from("DONE!"),
        }
    }

    #[test]
    fn test_listing_format() {
        let mut decorations = HashMap::new();
        decorations.insert(0, vec![Decoration::Comment(String::from("INIT"))]);

        let code = ProgramCode::new(
            vec![
                TmInstruction::Rm {
                    op: RmOp::LDA,
                    r: Register::FP,
                    d: -3,
                    s: Register::GP,
                    comment: String::from("set first frame at end of globals"),
                },
                halt(),
            ],
            decorations,
        );

        let listing = code.to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "* INIT");
        assert_eq!(lines[1], "  0:    LDA  1,-3(0)\tset first frame at end of globals");
        assert_eq!(lines[2], "  1:   HALT  0,0,0\tDONE!");
    }

    #[test]
    fn test_string_data_line() {
        let decoration = Decoration::StrLit {
            location: -4,
            text: String::from("hi\n"),
        };
        assert_eq!(decoration.to_string(), " -4:  .SDATA  \"hi\\n\"");
    }

    #[test]
    fn test_jump_targets_resolve_in_range() {
        let code = ProgramCode::new(
            vec![
                TmInstruction::Rm {
                    op: RmOp::JMP,
                    r: Register::PC,
                    d: 1,
                    s: Register::PC,
                    comment: String::new(),
                },
                halt(),
                TmInstruction::Rm {
                    op: RmOp::JMP,
                    r: Register::PC,
                    d: -2,
                    s: Register::PC,
                    comment: String::new(),
                },
            ],
            HashMap::new(),
        );

        let targets = code.jump_targets();
        assert_eq!(targets, vec![(0, 2), (2, 1)]);
        for (_, target) in targets {
            assert!(target >= 0 && (target as usize) < code.len());
        }
    }
}
