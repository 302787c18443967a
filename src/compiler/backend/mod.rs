mod tm_code_builder;
mod tm_code_generator;

use super::ast::{Ast, NodeId};
use super::program_code::ProgramCode;

// Abstract Definitions

/// BackEndGenerator takes an analysed and laid-out AST and generates
/// ProgramCode. The routine library head is passed separately because its
/// bodies are emitted before any user function; the final global offset
/// anchors the init section's first frame.
pub trait BackEndGenerator {
    /// Generate default generator configuration
    fn default() -> Self;

    /// Generate program code from the annotated syntax tree
    fn generate(self, ast: &mut Ast, routines: NodeId, goffset: i32) -> ProgramCode;
}

// Concrete Definition Export
pub use self::tm_code_generator::TmCodeGenerator;
pub(self) use self::tm_code_builder::TmCodeBuilder;
