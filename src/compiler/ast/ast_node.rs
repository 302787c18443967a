use strum_macros::Display;

use super::datatype::{DataType, RefType};
use super::literals::Literal;
use super::operators::TokenClass;

pub const MAX_CHILDREN: usize = 3;

/// Handle into the AST arena. Handles are the only reference the symbol
/// table and the passes hold; the arena remains the single owner of every
/// node.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub struct NodeId(pub(crate) usize);

/// Discriminator tag of an AST node.
///
/// Declarations: Var, VarArr, Func, Parm, ParmArr, Static.
/// Control:      Compound, If, While, For, Range, Return, Break.
/// Expressions:  Assign, Or, And, Not, BinOp, ChSign, SizeOf, Ques, Id,
///               ArrIndex, Call.
/// Constants:    NumConst, CharConst, StringConst, BoolConst.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display)]
pub enum NodeKind {
    Var,
    VarArr,
    Func,
    Parm,
    ParmArr,
    Static,
    Compound,
    If,
    While,
    For,
    Range,
    Return,
    Break,
    Assign,
    Or,
    And,
    Not,
    BinOp,
    ChSign,
    SizeOf,
    Ques,
    Id,
    ArrIndex,
    Call,
    NumConst,
    CharConst,
    StringConst,
    BoolConst,
}

impl NodeKind {
    /// Declaration kinds carry a name into a scope.
    pub fn is_declaration(&self) -> bool {
        matches!(self,
            NodeKind::Var | NodeKind::VarArr
            | NodeKind::Func
            | NodeKind::Parm | NodeKind::ParmArr
            | NodeKind::Static)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self,
            NodeKind::NumConst | NodeKind::CharConst
            | NodeKind::StringConst | NodeKind::BoolConst)
    }
}

/// One syntactic construct. Every field the passes communicate through lives
/// here: the parser fills the syntax fields, the semantic analyser the type
/// and usage flags, the layout pass the reference class and offsets, and the
/// code generator reads all of them and fills the code addresses.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub token: TokenClass,
    /// 1-based source line; synthesized library nodes carry -1.
    pub line: i32,
    pub literal: String,
    pub payload: Option<Literal>,

    pub children: [Option<NodeId>; MAX_CHILDREN],
    pub sibling: Option<NodeId>,

    pub data_type: DataType,
    pub ref_type: RefType,

    pub is_array: bool,
    pub is_indexed: bool,
    pub is_init: bool,
    pub is_const: bool,
    pub is_used: bool,
    pub is_static: bool,
    pub is_visited: bool,
    pub has_return: bool,
    pub is_main: bool,
    pub is_embedded: bool,
    pub is_function_compound: bool,
    pub is_lib: bool,

    /// Size in words. Scalars are 1; arrays are length + 1 for the size
    /// slot; function sizes are negative frame sizes.
    pub size: i32,
    /// Frame- or global-relative offset assigned by the layout pass.
    pub location: i32,
    /// Code address of a function body.
    pub address: usize,
    /// Reserved slot that the enclosing loop's exit jump is patched into.
    pub break_address: Option<usize>,

    /// Parameter nodes of a Func in declaration order, duplicating the
    /// child chain for positional access during call checking.
    pub parameters: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind, line: i32, literal: &str) -> Self {
        Node {
            kind,
            token: TokenClass::None,
            line,
            literal: String::from(literal),
            payload: None,
            children: [None; MAX_CHILDREN],
            sibling: None,
            data_type: DataType::Undefined,
            ref_type: RefType::None,
            is_array: false,
            is_indexed: false,
            is_init: false,
            is_const: false,
            is_used: false,
            is_static: false,
            is_visited: false,
            has_return: false,
            is_main: false,
            is_embedded: false,
            is_function_compound: false,
            is_lib: false,
            size: 0,
            location: 0,
            address: 0,
            break_address: None,
            parameters: vec![],
        }
    }

    /// Builds a constant node; the payload variant decides the data type.
    pub fn constant(kind: NodeKind, line: i32, literal: &str, payload: Literal) -> Self {
        let mut node = Node::new(kind, line, literal);
        node.data_type = match payload {
            Literal::Int(_) => DataType::Int,
            Literal::Char(_) => DataType::Char,
            Literal::Bool(_) => DataType::Bool,
            Literal::Str(_) => DataType::Char,
        };
        if let Literal::Str(ref text) = payload {
            node.is_array = true;
            node.size = text.chars().count() as i32 + 1;
        } else {
            node.size = 1;
        }
        node.is_const = true;
        node.payload = Some(payload);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_payload_matches_type() {
        let num = Node::constant(NodeKind::NumConst, 1, "42", Literal::Int(42));
        assert_eq!(num.data_type, DataType::Int);
        assert!(num.is_const);
        assert_eq!(num.size, 1);

        let string = Node::constant(NodeKind::StringConst, 1, "\"abc\"", Literal::Str(String::from("abc")));
        assert_eq!(string.data_type, DataType::Char);
        assert!(string.is_array);
        // Length plus the size slot
        assert_eq!(string.size, 4);
    }

    #[test]
    fn test_declaration_kinds() {
        assert!(NodeKind::Static.is_declaration());
        assert!(NodeKind::ParmArr.is_declaration());
        assert!(!NodeKind::Assign.is_declaration());
        assert!(NodeKind::BoolConst.is_constant());
    }
}
