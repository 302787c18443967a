mod ast;
pub mod backend;
pub mod layout;
pub mod parser;
pub mod program_code;
pub mod reporter;
pub mod semantic_analyser;

use std::error::Error;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use self::ast::{Ast, NodeId};

// Interface Definitions Re-Export
pub use self::backend::BackEndGenerator;
pub use self::parser::AstParser;

// Concrete Definitions Re-Export
pub use self::backend::TmCodeGenerator;
pub use self::parser::PestCMinusParser;
pub use self::ast::printer::PrintMode;
pub use self::program_code::ProgramCode;
pub use self::reporter::Reporter;

#[cfg(test)]
mod test;

/// Compiler holds the configuration of a compilation. It takes two typed
/// parameters defining the AstParser and the BackEndGenerator being used.
///
/// # Compilation Diagram
/// cminus_code -> AstParser -> AST -> SemanticAnalyser -> MemoryLayout
///             -> BackEndGenerator -> ProgramCode (.tm listing)
///
/// Diagnostics stream to stdout as they are found; any error suppresses
/// code generation but the remaining passes still ran, so tree dumps and
/// the diagnostic summary stay available.
pub struct Compiler<P: AstParser, G: BackEndGenerator> {
    parser: P,
    generator: G,
}

/// Everything a compilation produced: the program code when generation ran,
/// the diagnostic stream, the end of global space, and the annotated tree
/// for the dump flags.
pub struct CompileResult {
    pub code: Option<ProgramCode>,
    pub reporter: Reporter,
    pub goffset: i32,
    ast: Ast,
    print_head: Option<NodeId>,
}

impl CompileResult {
    /// Renders the routine library and user tree the way the dump flags
    /// show them.
    pub fn render_tree(&self, mode: PrintMode) -> String {
        ast::printer::render(&self.ast, self.print_head, mode)
    }
}

#[allow(dead_code)] // Part of the compiler surface is only used as a library interface
impl<P: AstParser, G: BackEndGenerator> Compiler<P, G> {
    /// Default generates a default compiler configuration, determined by
    /// the default methods of the parser and generator.
    pub fn default() -> Self {
        Compiler {
            parser: P::default(),
            generator: G::default(),
        }
    }

    /// Create new compiler using a preconfigured parser and generator.
    pub fn new(parser: P, generator: G) -> Self {
        Compiler {
            parser,
            generator,
        }
    }

    /// Compiles a source string. The phases run in a fixed order: parse,
    /// routine library synthesis, semantic analysis, memory layout and loop
    /// marking, code generation. Generation is skipped when analysis
    /// reported any error.
    pub fn compile_str(self, source: &str) -> CompileResult {
        let mut reporter = Reporter::new();
        let mut ast = Ast::new();

        if let Err(why) = self.parser.parse(source, &mut ast, &mut reporter) {
            reporter.error_tagged("SYNTAX", why.to_string());
            return CompileResult {
                code: None,
                reporter,
                goffset: 0,
                ast,
                print_head: None,
            };
        }

        let routines = semantic_analyser::synthesize_routines(&mut ast);
        semantic_analyser::analyse(&mut ast, routines, &mut reporter);

        // Chain the user tree behind the library so dumps show both
        if let Some(user_root) = ast.root() {
            ast.append_sibling(routines, user_root);
        }

        let mut goffset = 0;
        let code = if reporter.errors() == 0 {
            goffset = layout::lay_out(&mut ast);
            layout::mark_embedded_loops(&mut ast);
            Some(self.generator.generate(&mut ast, routines, goffset))
        } else {
            None
        };

        CompileResult {
            code,
            reporter,
            goffset,
            ast,
            print_head: Some(routines),
        }
    }

    /// Compiles a program file.
    /// @return: CompileResult if Ok. Otherwise IO Error from a failed read.
    pub fn compile(self, source_filename: &Path) -> Result<CompileResult, Box<dyn Error>> {
        let source_str = fs::read_to_string(source_filename)?;

        Ok(self.compile_str(source_str.as_str()))
    }

    /// Compiles a program file and writes the listing into the destination
    /// path when generation ran.
    pub fn compile_and_save(self, source_filename: &Path, dest_filename: &Path) -> Result<CompileResult, Box<dyn Error>> {
        let result = self.compile(source_filename)?;

        if let Some(ref code) = result.code {
            let mut file = File::create(dest_filename)?;
            file.write_all(format!("{}", code).as_bytes())?;
        }
        Ok(result)
    }
}
