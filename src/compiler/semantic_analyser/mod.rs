pub mod routine_library;
pub mod cminus_semantic_analyser;

pub use self::cminus_semantic_analyser::analyse;
pub use self::routine_library::synthesize_routines;
