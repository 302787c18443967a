// External Modules
extern crate exitcode;

// Internal Modules
use cminus_compiler::compiler::{
    BackEndGenerator,
    Compiler,
    PestCMinusParser,
    PrintMode,
    Reporter,
    TmCodeGenerator,
};

// Standard Imports
use clap::Parser;

// Basic Compiler Configuration
type GENERATOR = TmCodeGenerator;

/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
struct CompilerCliOptions {
    /// Path of file to compile. C- source files end in .c-
    #[clap(parse(from_os_str))]
    path: std::path::PathBuf,

    /// Path to output file, default is <path_filename>.tm
    #[clap(short, long, parse(from_os_str))]
    output: Option<std::path::PathBuf>,

    // Flags

    /// Print the abstract syntax tree
    #[clap(short = 'p', action)]
    print_tree: bool,

    /// Print the abstract syntax tree with types
    #[clap(short = 'P', action)]
    print_typed_tree: bool,

    /// Print the augmented abstract syntax tree with memory annotations
    #[clap(short = 'M', action)]
    print_memory_tree: bool,

    /// Enable parser debug tracing
    #[clap(short = 'd', action)]
    parser_debug: bool,

    /// Write the listing to stdout instead of the output file
    #[clap(long, action)]
    stdout: bool,
}

impl CompilerCliOptions {
    /// Derives default values for empty arguments that cannot be set to
    /// constants. The output path is derived from the input file path.
    /// @return: Returns CompilerCliOptions with modified empty arguments
    fn derive_defaults(mut self) -> Self {
        if self.output.is_none() {
            self.output = Some(self.path.with_extension("tm"))
        }

        return self;
    }
}

/// The source argument must name a readable .c- file; anything else is a
/// command line error, reported with the same closing summary a
/// compilation prints.
fn reject_arglist(path: &std::path::Path) -> ! {
    let mut reporter = Reporter::new();
    reporter.error_tagged("ARGLIST", format!("source file \"{}\" could not be opened.", path.display()));
    reporter.print_summary();
    std::process::exit(1);
}

fn main() {
    // Parse Command line arguments
    let cli_args = CompilerCliOptions::parse().derive_defaults();
    let source_path = cli_args.path.as_path();

    let has_source_extension = source_path.extension().map(|ext| ext == "c-").unwrap_or(false);
    if !has_source_extension || !source_path.is_file() {
        reject_arglist(source_path);
    }

    let parser = PestCMinusParser::with_debug(cli_args.parser_debug);
    let compiler: Compiler<PestCMinusParser, GENERATOR> = Compiler::new(parser, GENERATOR::default());

    let result = match compiler.compile(source_path) {
        Ok(result) => result,
        Err(_) => reject_arglist(source_path),
    };

    // Tree dumps only make sense for a program that analysed cleanly
    if result.reporter.errors() == 0 {
        if cli_args.print_tree {
            print!("{}", result.render_tree(PrintMode::Plain));
        }
        if cli_args.print_typed_tree {
            print!("{}", result.render_tree(PrintMode::Typed));
        }
        if cli_args.print_memory_tree {
            print!("{}", result.render_tree(PrintMode::Augmented));
            println!("Offset for end of global space: {}", result.goffset);
        }
    }

    if let Some(ref code) = result.code {
        if cli_args.stdout {
            print!("{}", code);
        } else {
            let dest_path = cli_args.output.unwrap(); // Can unwrap as output will always be derived
            if let Err(why) = std::fs::write(&dest_path, format!("{}", code)) {
                println!("Compile Error: {:?}", why);
                std::process::exit(exitcode::SOFTWARE);
            }
        }
    }

    result.reporter.print_summary();
    std::process::exit(exitcode::OK);
}
