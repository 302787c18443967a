use std::collections::HashMap;

use super::super::program_code::{
    Decoration,
    ProgramCode,
    Register,
    RmOp,
    RoOp,
    TmInstruction,
};

/// TmCodeBuilder is a builder utility that lays down TM instructions
/// linearly while allowing instruction slots to be reserved and patched
/// once a forward target is known. This keeps the jump address discipline
/// of the generator in one place: reserve with `emit_skip`, remember the
/// address, patch it with `patch_rm` after emitting the jumped-over code.
pub struct TmCodeBuilder {
    instructions: Vec<Option<TmInstruction>>,
    decorations: HashMap<usize, Vec<Decoration>>,
}

impl TmCodeBuilder {
    pub fn new() -> Self {
        Self {
            instructions: vec![],
            decorations: HashMap::new(),
        }
    }

    /// The address the next emitted instruction will occupy.
    pub fn loc(&self) -> usize {
        self.instructions.len()
    }

    pub fn emit_ro(&mut self, op: RoOp, r: Register, s: Register, t: Register, comment: String) {
        self.instructions.push(Some(TmInstruction::Ro { op, r, s, t, comment }));
    }

    pub fn emit_rm(&mut self, op: RmOp, r: Register, d: i32, s: Register, comment: String) {
        self.instructions.push(Some(TmInstruction::Rm { op, r, d, s, comment }));
    }

    /// Reserves `n` instruction slots and returns the address of the first.
    /// Every reserved slot must be patched before finalize.
    pub fn emit_skip(&mut self, n: usize) -> usize {
        let start = self.instructions.len();
        for _ in 0..n {
            self.instructions.push(None);
        }
        start
    }

    /// Writes a register-memory instruction into a previously reserved or
    /// emitted slot.
    pub fn patch_rm(&mut self, address: usize, op: RmOp, r: Register, d: i32, s: Register, comment: String) {
        self.instructions[address] = Some(TmInstruction::Rm { op, r, d, s, comment });
    }

    /// Decorates the next instruction with a comment line. Multiple
    /// comments stack in emission order.
    pub fn comment(&mut self, text: String) {
        self.decorations
            .entry(self.loc())
            .or_insert_with(Vec::new)
            .push(Decoration::Comment(text));
    }

    /// Emits a string literal into global data memory at the given offset.
    pub fn emit_str_lit(&mut self, location: i32, text: &str) {
        self.decorations
            .entry(self.loc())
            .or_insert_with(Vec::new)
            .push(Decoration::StrLit {
                location,
                text: String::from(text),
            });
    }

    /// Resolves the builder into ProgramCode. An unpatched slot means a
    /// reserved jump was never written back; that is a generator bug, not
    /// an input error.
    pub fn finalize(self) -> ProgramCode {
        let instructions = self.instructions
            .into_iter()
            .enumerate()
            .map(|(address, slot)| match slot {
                Some(instruction) => instruction,
                None => panic!("Unpatched instruction slot at address {}", address),
            })
            .collect();
        ProgramCode::new(instructions, self.decorations)
    }
}
