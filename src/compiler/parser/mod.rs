use std::error::Error;

use super::ast::Ast;
use super::reporter::Reporter;

pub mod pest_cminus_parser;

/// Parser handles interpretation of source text into the intermediate
/// representation. Put another way the parser turns a source string into an
/// abstract syntax tree rooted at the head of the top-level declaration
/// chain.
///
/// Lexical warnings (oversize char constants and the like) are streamed
/// through the reporter; a syntax error is returned as Err and aborts the
/// compilation before semantic analysis.
pub trait AstParser {
    /// Creates a default configuration of an AstParser
    fn default() -> Self;

    /// Parse a source string into the given arena, setting its root.
    fn parse(&self, source: &str, ast: &mut Ast, reporter: &mut Reporter) -> Result<(), Box<dyn Error>>;
}

// Concrete Definition Export
pub use self::pest_cminus_parser::PestCMinusParser;
