use crate::compiler::{
    CompileResult,
    Compiler,
    PestCMinusParser,
    PrintMode,
    TmCodeGenerator,
};

fn compile(source: &str) -> CompileResult {
    let compiler: Compiler<PestCMinusParser, TmCodeGenerator> = Compiler::default();
    compiler.compile_str(source)
}

fn assert_jumps_resolve(result: &CompileResult) {
    let code = result.code.as_ref().expect("program should have generated code");
    for (from, target) in code.jump_targets() {
        assert!(
            target >= 0 && (target as usize) < code.len(),
            "jump at {} resolves to {} outside [0, {})", from, target, code.len()
        );
    }
}

#[test]
fn test_minimal_main() {
    let result = compile("int main() { return 0; }");
    assert_eq!(result.reporter.warnings(), 0);
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("FUNCTION main"));
    assert!(listing.contains("LDC  2,0(6)\tSet return value to 0"));
    assert!(listing.contains("Jump to main"));
    assert!(listing.contains("HALT  0,0,0\tDONE!"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_address_zero_jumps_to_init() {
    let result = compile("int main() { return 0; }");
    let code = result.code.as_ref().unwrap();
    let displacement = code.instructions()[0].jump_displacement()
        .expect("address 0 must hold the backpatched jump to init");
    // The init section sits after the library and user functions
    let target = 1 + displacement as i64;
    assert!(target > 1);
    assert!((target as usize) < code.len());
}

#[test]
fn test_io_library_comes_first() {
    let result = compile("main() { }");
    assert_eq!(result.reporter.warnings(), 0);
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    for routine in ["input", "output", "inputb", "outputb", "inputc", "outputc", "outnl"] {
        assert!(listing.contains(&format!("* FUNCTION {}", routine)));
    }
    let input_at = listing.find("* FUNCTION input").unwrap();
    let main_at = listing.find("* FUNCTION main").unwrap();
    assert!(input_at < main_at);
}

#[test]
fn test_uninitialized_variable_warning() {
    let result = compile("main() { int x; output(x); }");
    assert_eq!(result.reporter.errors(), 0);
    assert_eq!(result.reporter.warnings(), 1);
    assert_eq!(result.reporter.messages()[0],
               "WARNING(1): Variable 'x' may be uninitialized when used here.");
    assert!(result.code.is_some());
}

#[test]
fn test_missing_main_linker_error() {
    let result = compile("int x;\nint f() { return x; }");
    let linker_errors: Vec<&String> = result.reporter.messages().iter()
        .filter(|m| m.contains("ERROR(LINKER)"))
        .collect();
    assert_eq!(linker_errors.len(), 1);
    assert!(result.code.is_none());
}

#[test]
fn test_errors_suppress_code_generation() {
    let result = compile("int a[3]; int b; int main() { a <= b; }");
    assert!(result.reporter.messages().iter().any(|m|
        m == "ERROR(1): '<=' requires both operands be arrays or not but lhs is an array and rhs is not an array."));
    assert!(result.code.is_none());
}

#[test]
fn test_for_loop_emission() {
    let result = compile("int main() { for i = 1 to 10 do output(i); }");
    assert_eq!(result.reporter.warnings(), 0);
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("save starting value in index variable"));
    assert!(listing.contains("SLT  3,4,5\tOp <"));
    assert!(listing.contains("Jump past loop [backpatch]"));
    assert!(listing.contains("go to beginning of loop"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_while_break_emission() {
    let result = compile("int main() { while true do { break; } }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("* BREAK"));
    assert!(listing.contains("\tbreak"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_call_builds_ghost_frame() {
    let result = compile("int sq(int n) { return n * n; }\nint main() { output(sq(7)); }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("Store fp in ghost frame for sq"));
    assert!(listing.contains("Ghost frame becomes new active frame"));
    assert!(listing.contains("Return address in ac"));
    assert!(listing.contains("CALL sq"));
    assert!(listing.contains("Save the result in ac"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_global_initialization_in_declaration_order() {
    let result = compile("int b : 2;\nint a : 1;\nint main() { output(a + b); }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    let init_at = listing.find("* INIT GLOBALS AND STATICS").unwrap();
    let b_store = listing[init_at..].find("Store variable b").unwrap();
    let a_store = listing[init_at..].find("Store variable a").unwrap();
    assert!(b_store < a_store);
}

#[test]
fn test_global_array_size_stored_by_init() {
    let result = compile("int a[3];\nint main() { a[0] <= 1; }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("LDC  3,3(6)\tload size of array a"));
    assert!(listing.contains("save size of array a"));
}

#[test]
fn test_string_literal_data_line() {
    let result = compile("char msg[8] : \"hi\";\nint main() { outputc(msg[0]); }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains(".SDATA  \"hi\""));
    assert!(listing.contains("array op ="));
}

#[test]
fn test_recursive_program_jumps_resolve() {
    let source = "int fib(int n) {\n\
                  \tif n < 2 then return n;\n\
                  \treturn fib(n - 1) + fib(n - 2);\n\
                  }\n\
                  main() {\n\
                  \tfor i = 0 to 10 do output(fib(i));\n\
                  }";
    let result = compile(source);
    assert_eq!(result.reporter.warnings(), 0);
    assert_eq!(result.reporter.errors(), 0);
    assert_jumps_resolve(&result);
}

#[test]
fn test_if_else_backpatching() {
    let source = "int main() { int x; x <= input(); if x > 0 then output(1); else output(2); }";
    let result = compile(source);
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    assert!(listing.contains("Jump around the THEN if false [backpatch]"));
    assert!(listing.contains("Jump around the ELSE [backpatch]"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_tree_dump_modes() {
    let result = compile("int g;\nint main() { g <= 3; }");
    assert_eq!(result.reporter.errors(), 0);

    let plain = result.render_tree(PrintMode::Plain);
    assert!(plain.contains("Func: input returns type int"));
    assert!(plain.contains("Func: main returns type int"));
    assert!(plain.contains("Var: g of type int"));

    let augmented = result.render_tree(PrintMode::Augmented);
    assert!(augmented.contains("[mem: Global loc: 0 size: 1]"));
    assert_eq!(result.goffset, -1);
}

#[test]
fn test_syntax_error_aborts_compilation() {
    let result = compile("int main( { return 0; }");
    assert!(result.reporter.errors() > 0);
    assert!(result.reporter.messages()[0].starts_with("ERROR(SYNTAX): Syntax Error:"));
    assert!(result.code.is_none());
}

#[test]
fn test_static_local_survives_in_global_space() {
    let result = compile("int bump() { static int count : 0; count++; return count; }\nint main() { output(bump()); output(bump()); }");
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    // The static's slot is addressed off the globals, not the frame
    assert!(listing.contains("load lhs variable count"));
    assert!(listing.contains("(0)\tStore variable count"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_static_local_shadowing_a_global() {
    let source = "int x : 10;\nint f() { static int x : 1; x++; return x; }\nmain() { output(f()); output(x); }";
    let result = compile(source);
    assert_eq!(result.reporter.errors(), 0);

    let listing = result.code.as_ref().unwrap().to_string();
    // The global keeps slot 0; the shadowing static gets its own slot
    assert!(listing.contains(",0(0)\tStore variable x"));
    assert!(listing.contains(",-1(0)\tStore variable x"));
    assert!(listing.contains(",-1(0)\tload lhs variable x"));
    assert_jumps_resolve(&result);
}

#[test]
fn test_summary_counts_match_reporter() {
    let result = compile("main() { int x; int y; output(x); }");
    // x warns uninitialized, y warns unused
    assert_eq!(result.reporter.warnings(), 2);
    assert_eq!(result.reporter.errors(), 0);
}
