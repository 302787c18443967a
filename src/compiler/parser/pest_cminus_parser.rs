use std::error::Error;

use crate::pest::Parser;
use pest::iterators::Pair;
use simple_error::SimpleError;

use super::AstParser;
use super::super::ast::{
    Ast,
    DataType,
    Literal,
    Node,
    NodeId,
    NodeKind,
    TokenClass,
};
use super::super::reporter::Reporter;

/// CMinusGrammar parses a string into a series of tokens.
/// These tokens are defined as a Context-Free-Grammar in the src/cminus.pest
/// file. The tokens generated from this parser are then formalised into the
/// arena abstract syntax tree implementation.
#[derive(Parser)]
#[grammar = "cminus.pest"]
struct CMinusGrammar;

/// PestCMinusParser is a concrete AstParser.
/// It uses the pest library to generate a token sequence from a source
/// string that is then converted into arena nodes. Declaration and statement
/// sequences become sibling chains; every node records the source line of
/// its first token.
pub struct PestCMinusParser {
    debug: bool,
}

impl PestCMinusParser {
    pub fn with_debug(debug: bool) -> Self {
        Self { debug }
    }

    /// Parses the source string into the arena and sets the arena root to
    /// the head of the top-level declaration chain.
    fn parse_into_tree(&self, source: &str, ast: &mut Ast, reporter: &mut Reporter) -> Result<(), Box<dyn Error>> {
        let pairs = CMinusGrammar::parse(Rule::program, source)
            .map_err(|why| SimpleError::new(format!("Syntax Error:\n{}", why)))?;

        let mut root: Option<NodeId> = None;
        for pair in pairs {
            if pair.as_rule() != Rule::program {
                continue;
            }
            if self.debug {
                eprintln!("{:#?}", pair);
            }
            for declaration in pair.into_inner() {
                let head = match declaration.as_rule() {
                    Rule::var_declaration => self.parse_pair_var_declaration(declaration, ast, reporter),
                    Rule::fun_declaration => self.parse_pair_fun_declaration(declaration, ast, reporter),
                    Rule::EOI => continue,
                    _ => panic!("Whoops! Unprocessed pest rule: {:?}", declaration.as_rule()),
                };
                root = Some(match root {
                    Some(existing) => ast.append_sibling(existing, head),
                    None => head,
                });
            }
        }

        ast.set_root(root);
        Ok(())
    }

    /// Parses a pest token pair into a chain of variable declaration nodes.
    /// One source declaration can declare several names; each becomes its
    /// own node and the chain head is returned.
    fn parse_pair_var_declaration(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let mut inner = pair.into_inner().peekable();

        let is_static = inner.peek().map(|p| p.as_rule()) == Some(Rule::static_specifier);
        if is_static {
            inner.next();
        }
        let specifier = inner.next().unwrap();
        let data_type = DataType::from_specifier(specifier.as_str()).unwrap();

        let mut head: Option<NodeId> = None;
        for init in inner {
            let line = line_of(&init);
            let mut parts = init.into_inner();
            let decl_id = parts.next().unwrap();

            let mut id_parts = decl_id.into_inner();
            let name = id_parts.next().unwrap().as_str();
            let array_size: Option<i32> = id_parts.next().map(|n| n.as_str().parse().unwrap_or(i32::MAX));

            let kind = if is_static {
                NodeKind::Static
            } else if array_size.is_some() {
                NodeKind::VarArr
            } else {
                NodeKind::Var
            };
            let mut node = Node::new(kind, line, name);
            node.data_type = data_type;
            node.is_static = is_static;
            match array_size {
                // One extra word holds the array size
                Some(n) => {
                    node.is_array = true;
                    node.size = n + 1;
                }
                None => {
                    node.size = 1;
                }
            }
            let id = ast.add(node);

            if let Some(initializer) = parts.next() {
                let value = self.parse_pair_node(initializer, ast, reporter);
                ast.set_child(id, 0, value);
            }

            head = Some(match head {
                Some(existing) => ast.append_sibling(existing, id),
                None => id,
            });
        }
        head.unwrap()
    }

    /// Parses a pest token pair into a function declaration node. A missing
    /// type specifier makes the function Void.
    fn parse_pair_fun_declaration(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner().peekable();

        let data_type = if inner.peek().map(|p| p.as_rule()) == Some(Rule::type_specifier) {
            DataType::from_specifier(inner.next().unwrap().as_str()).unwrap()
        } else {
            DataType::Void
        };

        let name = inner.next().unwrap().as_str();
        let mut node = Node::new(NodeKind::Func, line, name);
        node.data_type = data_type;
        let func = ast.add(node);

        let mut parm_head: Option<NodeId> = None;
        let mut parameters = vec![];
        while inner.peek().map(|p| p.as_rule()) == Some(Rule::parm_type_list) {
            let chain = self.parse_pair_parm_type_list(inner.next().unwrap(), ast, &mut parameters);
            parm_head = Some(match parm_head {
                Some(existing) => ast.append_sibling(existing, chain),
                None => chain,
            });
        }
        if let Some(parms) = parm_head {
            ast.set_child(func, 0, parms);
        }
        ast.node_mut(func).parameters = parameters;

        let body = self.parse_pair_statement(inner.next().unwrap(), ast, reporter);
        if let Some(body) = body {
            if ast.node(body).kind == NodeKind::Compound {
                ast.node_mut(body).is_function_compound = true;
            }
            ast.set_child(func, 1, body);
        }
        func
    }

    /// Parses one typed parameter group into a chain of Parm/ParmArr nodes.
    fn parse_pair_parm_type_list(&self, pair: Pair<Rule>, ast: &mut Ast, parameters: &mut Vec<NodeId>) -> NodeId {
        let mut inner = pair.into_inner();
        let data_type = DataType::from_specifier(inner.next().unwrap().as_str()).unwrap();

        let mut head: Option<NodeId> = None;
        for parm_id in inner {
            let line = line_of(&parm_id);
            let mut parts = parm_id.into_inner();
            let name = parts.next().unwrap().as_str();
            let is_array = parts.next().is_some();

            let mut node = Node::new(
                if is_array { NodeKind::ParmArr } else { NodeKind::Parm },
                line,
                name,
            );
            node.data_type = data_type;
            node.is_array = is_array;
            // Parameter arrays are passed as a base address, one word
            node.size = 1;
            let id = ast.add(node);
            parameters.push(id);

            head = Some(match head {
                Some(existing) => ast.append_sibling(existing, id),
                None => id,
            });
        }
        head.unwrap()
    }

    /// Parses a statement pair. Empty expression statements produce no node.
    fn parse_pair_statement(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> Option<NodeId> {
        match pair.as_rule() {
            Rule::compound_stmt => Some(self.parse_pair_compound(pair, ast, reporter)),
            Rule::selection_stmt => Some(self.parse_pair_selection(pair, ast, reporter)),
            Rule::iteration_stmt => Some(self.parse_pair_iteration(pair, ast, reporter)),
            Rule::for_stmt => Some(self.parse_pair_for(pair, ast, reporter)),
            Rule::return_stmt => Some(self.parse_pair_return(pair, ast, reporter)),
            Rule::break_stmt => {
                let line = line_of(&pair);
                Some(ast.add(Node::new(NodeKind::Break, line, "break")))
            }
            Rule::expression_stmt => {
                pair.into_inner()
                    .next()
                    .map(|expr| self.parse_pair_node(expr, ast, reporter))
            }
            _ => panic!("Whoops! Unprocessed statement rule: {:?}", pair.as_rule()),
        }
    }

    /// Parses a compound statement: child 0 is the local declaration chain,
    /// child 1 the statement chain.
    fn parse_pair_compound(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let compound = ast.add(Node::new(NodeKind::Compound, line, ""));

        let mut decl_head: Option<NodeId> = None;
        let mut stmt_head: Option<NodeId> = None;
        for item in pair.into_inner() {
            if item.as_rule() == Rule::var_declaration {
                let chain = self.parse_pair_var_declaration(item, ast, reporter);
                decl_head = Some(match decl_head {
                    Some(existing) => ast.append_sibling(existing, chain),
                    None => chain,
                });
            } else if let Some(stmt) = self.parse_pair_statement(item, ast, reporter) {
                stmt_head = Some(match stmt_head {
                    Some(existing) => ast.append_sibling(existing, stmt),
                    None => stmt,
                });
            }
        }

        if let Some(decls) = decl_head {
            ast.set_child(compound, 0, decls);
        }
        if let Some(stmts) = stmt_head {
            ast.set_child(compound, 1, stmts);
        }
        compound
    }

    fn parse_pair_selection(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let branch = ast.add(Node::new(NodeKind::If, line, "if"));

        let mut inner = pair.into_inner();
        let condition = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        ast.set_child(branch, 0, condition);
        if let Some(then_branch) = self.parse_pair_statement(inner.next().unwrap(), ast, reporter) {
            ast.set_child(branch, 1, then_branch);
        }
        if let Some(else_pair) = inner.next() {
            if let Some(else_branch) = self.parse_pair_statement(else_pair, ast, reporter) {
                ast.set_child(branch, 2, else_branch);
            }
        }
        branch
    }

    fn parse_pair_iteration(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let node = ast.add(Node::new(NodeKind::While, line, "while"));

        let mut inner = pair.into_inner();
        let condition = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        ast.set_child(node, 0, condition);
        if let Some(body) = self.parse_pair_statement(inner.next().unwrap(), ast, reporter) {
            ast.set_child(node, 1, body);
        }
        node
    }

    /// Parses a for statement: child 0 is the control variable declaration,
    /// child 1 the range (start, stop, optional step) and child 2 the body.
    fn parse_pair_for(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let node = ast.add(Node::new(NodeKind::For, line, "for"));

        let mut inner = pair.into_inner();
        let name = inner.next().unwrap().as_str();
        let mut control = Node::new(NodeKind::Var, line, name);
        control.data_type = DataType::Int;
        control.size = 1;
        // The loop writes the index every iteration
        control.is_init = true;
        let control = ast.add(control);
        ast.set_child(node, 0, control);

        let range = ast.add(Node::new(NodeKind::Range, line, "to"));
        let start = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        let stop = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        ast.set_child(range, 0, start);
        ast.set_child(range, 1, stop);

        let mut remaining = inner.next().unwrap();
        if remaining.as_rule() == Rule::simple_expression {
            let step = self.parse_pair_node(remaining, ast, reporter);
            ast.set_child(range, 2, step);
            remaining = inner.next().unwrap();
        }
        ast.set_child(node, 1, range);

        if let Some(body) = self.parse_pair_statement(remaining, ast, reporter) {
            ast.set_child(node, 2, body);
        }
        node
    }

    fn parse_pair_return(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let node = ast.add(Node::new(NodeKind::Return, line, "return"));
        if let Some(value) = pair.into_inner().next() {
            let value = self.parse_pair_node(value, ast, reporter);
            ast.set_child(node, 0, value);
        }
        node
    }

    /// Parses all pest expression pairs into a valid arena node.
    fn parse_pair_node(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        match pair.as_rule() {
            Rule::assign_expression => self.parse_pair_assignment(pair, ast, reporter),
            Rule::inc_expression => self.parse_pair_inc(pair, ast, reporter),
            Rule::simple_expression => self.parse_pair_chain(pair, ast, reporter, NodeKind::Or, "or"),
            Rule::and_expression => self.parse_pair_chain(pair, ast, reporter, NodeKind::And, "and"),
            Rule::not_expression => self.parse_pair_not(pair, ast, reporter),
            Rule::rel_expression => self.parse_pair_relation(pair, ast, reporter),
            Rule::sum_expression | Rule::mul_expression => self.parse_pair_binary(pair, ast, reporter),
            Rule::unary_expression => self.parse_pair_unary(pair, ast, reporter),
            Rule::call => self.parse_pair_call(pair, ast, reporter),
            Rule::mutable => self.parse_pair_mutable(pair, ast, reporter),
            Rule::numconst
            | Rule::charconst
            | Rule::stringconst
            | Rule::boolconst => self.parse_pair_constant(pair, ast, reporter),
            _ => panic!("Whoops! Unprocessed expression rule: {:?}", pair.as_rule()),
        }
    }

    fn parse_pair_assignment(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let lhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        let op = inner.next().unwrap();
        let token = match op.as_str() {
            "<=" => TokenClass::Asgn,
            "+=" => TokenClass::AddAsgn,
            "-=" => TokenClass::SubAsgn,
            "*=" => TokenClass::MulAsgn,
            _ => TokenClass::DivAsgn,
        };
        let rhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);

        let mut node = Node::new(NodeKind::Assign, line, op.as_str());
        node.token = token;
        let id = ast.add(node);
        ast.set_child(id, 0, lhs);
        ast.set_child(id, 1, rhs);
        id
    }

    fn parse_pair_inc(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let lhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        let op = inner.next().unwrap();

        let mut node = Node::new(NodeKind::Assign, line, op.as_str());
        node.token = if op.as_str() == "++" { TokenClass::Inc } else { TokenClass::Dec };
        let id = ast.add(node);
        ast.set_child(id, 0, lhs);
        id
    }

    /// Folds a linear list of equal precedence operands into a left
    /// associative tree of `kind` nodes.
    fn parse_pair_chain(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter, kind: NodeKind, literal: &str) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let mut lhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        for operand in inner {
            let rhs = self.parse_pair_node(operand, ast, reporter);
            let node = ast.add(Node::new(kind, line, literal));
            ast.set_child(node, 0, lhs);
            ast.set_child(node, 1, rhs);
            lhs = node;
        }
        lhs
    }

    fn parse_pair_not(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let operand = self.parse_pair_node(pair.into_inner().next().unwrap(), ast, reporter);
        let node = ast.add(Node::new(NodeKind::Not, line, "not"));
        ast.set_child(node, 0, operand);
        node
    }

    fn parse_pair_relation(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let lhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);

        let op = match inner.next() {
            Some(op) => op,
            None => return lhs,
        };
        let token = match op.as_str() {
            "=" => TokenClass::Eq,
            "!=" => TokenClass::Neq,
            "!<" => TokenClass::Geq,
            "!>" => TokenClass::Leq,
            "<" => TokenClass::Lt,
            _ => TokenClass::Gt,
        };
        let rhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);

        let mut node = Node::new(NodeKind::BinOp, line, op.as_str());
        node.token = token;
        let id = ast.add(node);
        ast.set_child(id, 0, lhs);
        ast.set_child(id, 1, rhs);
        id
    }

    /// Parses a pest token pair into a left associative tree of arithmetic
    /// binary operations.
    fn parse_pair_binary(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let mut lhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        while let Some(op) = inner.next() {
            let token = match op.as_str() {
                "+" => TokenClass::Add,
                "-" => TokenClass::Sub,
                "*" => TokenClass::Mul,
                "/" => TokenClass::Div,
                _ => TokenClass::Mod,
            };
            let rhs = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
            let mut node = Node::new(NodeKind::BinOp, line, op.as_str());
            node.token = token;
            let id = ast.add(node);
            ast.set_child(id, 0, lhs);
            ast.set_child(id, 1, rhs);
            lhs = id;
        }
        lhs
    }

    fn parse_pair_unary(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let first = inner.next().unwrap();
        if first.as_rule() != Rule::unaryop {
            return self.parse_pair_node(first, ast, reporter);
        }

        let kind = match first.as_str() {
            "-" => NodeKind::ChSign,
            "*" => NodeKind::SizeOf,
            _ => NodeKind::Ques,
        };
        let operand = self.parse_pair_node(inner.next().unwrap(), ast, reporter);
        let node = ast.add(Node::new(kind, line, first.as_str()));
        ast.set_child(node, 0, operand);
        node
    }

    fn parse_pair_call(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().unwrap().as_str();
        let call = ast.add(Node::new(NodeKind::Call, line, name));

        let mut arg_head: Option<NodeId> = None;
        for arg in inner {
            let parsed = self.parse_pair_node(arg, ast, reporter);
            arg_head = Some(match arg_head {
                Some(existing) => ast.append_sibling(existing, parsed),
                None => parsed,
            });
        }
        if let Some(args) = arg_head {
            ast.set_child(call, 0, args);
        }
        call
    }

    fn parse_pair_mutable(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().unwrap().as_str();
        let id = ast.add(Node::new(NodeKind::Id, line, name));

        match inner.next() {
            Some(index) => {
                let index = self.parse_pair_node(index, ast, reporter);
                let mut node = Node::new(NodeKind::ArrIndex, line, "[");
                node.is_indexed = true;
                let access = ast.add(node);
                ast.set_child(access, 0, id);
                ast.set_child(access, 1, index);
                access
            }
            None => id,
        }
    }

    fn parse_pair_constant(&self, pair: Pair<Rule>, ast: &mut Ast, reporter: &mut Reporter) -> NodeId {
        let line = line_of(&pair);
        let lexeme = pair.as_str();
        let node = match pair.as_rule() {
            Rule::numconst => {
                let value = lexeme.parse().unwrap_or(i32::MAX);
                Node::constant(NodeKind::NumConst, line, lexeme, Literal::Int(value))
            }
            Rule::charconst => {
                let value = process_char_const(lexeme, line, reporter);
                Node::constant(NodeKind::CharConst, line, lexeme, Literal::Char(value))
            }
            Rule::stringconst => {
                let value = process_string_const(lexeme);
                Node::constant(NodeKind::StringConst, line, lexeme, Literal::Str(value))
            }
            Rule::boolconst => {
                let value = lexeme == "true" || lexeme == "True";
                Node::constant(NodeKind::BoolConst, line, lexeme, Literal::Bool(value))
            }
            _ => panic!("Whoops! Unprocessed constant rule: {:?}", pair.as_rule()),
        };
        ast.add(node)
    }
}

fn line_of(pair: &Pair<Rule>) -> i32 {
    pair.as_span().start_pos().line_col().0 as i32
}

/// Resolves a char constant lexeme, quotes included, to its character.
/// Escapes take the escaped character; anything longer than one character
/// warns and takes the first.
fn process_char_const(lexeme: &str, line: i32, reporter: &mut Reporter) -> char {
    let inner: Vec<char> = lexeme.chars().skip(1).take(lexeme.chars().count() - 2).collect();

    if inner.first() == Some(&'\\') {
        return match inner.get(1) {
            Some('n') => '\n',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some(other) => *other,
            None => '\\',
        };
    }
    match inner.len() {
        0 => {
            reporter.warning(line, format!("character is empty: '{}'.  The first char will be used.", lexeme));
            '\0'
        }
        1 => inner[0],
        n => {
            reporter.warning(line, format!(
                "character is {} characters long and not a single character: '{}'.  The first char will be used.",
                n, lexeme
            ));
            inner[0]
        }
    }
}

/// Resolves a string constant lexeme, quotes included, applying the escape
/// set \n \0 \\ \' \".
fn process_string_const(lexeme: &str) -> String {
    let inner: Vec<char> = lexeme.chars().skip(1).take(lexeme.chars().count() - 2).collect();
    let mut result = String::with_capacity(inner.len());

    let mut chars = inner.into_iter();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}

/// AstParser Trait Concrete Implementation
impl AstParser for PestCMinusParser {
    /// PestCMinusParser parses without debug tracing by default
    fn default() -> Self {
        Self { debug: false }
    }

    fn parse(&self, source: &str, ast: &mut Ast, reporter: &mut Reporter) -> Result<(), Box<dyn Error>> {
        self.parse_into_tree(source, ast, reporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::printer::{render, PrintMode};

    fn parse(source: &str) -> (Ast, Reporter) {
        let mut ast = Ast::new();
        let mut reporter = Reporter::new();
        let parser = PestCMinusParser::default();
        parser.parse(source, &mut ast, &mut reporter).unwrap();
        (ast, reporter)
    }

    #[test]
    fn test_parse_minimal_main() {
        let (ast, reporter) = parse("int main() { return 0; }");
        let root = ast.root().unwrap();
        let main = ast.node(root);
        assert_eq!(main.kind, NodeKind::Func);
        assert_eq!(main.literal, "main");
        assert_eq!(main.data_type, DataType::Int);
        assert!(main.parameters.is_empty());

        let body = ast.child(root, 1).unwrap();
        assert_eq!(ast.node(body).kind, NodeKind::Compound);
        assert!(ast.node(body).is_function_compound);
        assert_eq!(reporter.errors(), 0);
    }

    #[test]
    fn test_parse_declaration_chain() {
        let (ast, _) = parse("int a, b[3]; bool c;");
        let names: Vec<(NodeKind, String, i32)> = ast.siblings(ast.root())
            .map(|id| {
                let node = ast.node(id);
                (node.kind, node.literal.clone(), node.size)
            })
            .collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], (NodeKind::Var, String::from("a"), 1));
        assert_eq!(names[1], (NodeKind::VarArr, String::from("b"), 4));
        assert_eq!(names[2], (NodeKind::Var, String::from("c"), 1));
    }

    #[test]
    fn test_parse_static_with_initializer() {
        let (ast, _) = parse("int main() { static int x : 5; }");
        let body = ast.child(ast.root().unwrap(), 1).unwrap();
        let decl = ast.child(body, 0).unwrap();
        let node = ast.node(decl);
        assert_eq!(node.kind, NodeKind::Static);
        assert!(node.is_static);
        let init = ast.child(decl, 0).unwrap();
        assert_eq!(ast.node(init).kind, NodeKind::NumConst);
    }

    #[test]
    fn test_assignment_versus_compare() {
        // <= assigns, = compares
        let (ast, _) = parse("int x; int main() { x <= 1; x = 1; }");
        let main = ast.node(ast.root().unwrap()).sibling.unwrap();
        let body = ast.child(main, 1).unwrap();
        let assign = ast.child(body, 1).unwrap();
        assert_eq!(ast.node(assign).kind, NodeKind::Assign);
        assert_eq!(ast.node(assign).token, TokenClass::Asgn);

        let compare = ast.node(assign).sibling.unwrap();
        assert_eq!(ast.node(compare).kind, NodeKind::BinOp);
        assert_eq!(ast.node(compare).token, TokenClass::Eq);
    }

    #[test]
    fn test_not_less_spelling_means_greater_equal() {
        let (ast, _) = parse("int main() { if 1 !< 2 then ; }");
        let body = ast.child(ast.root().unwrap(), 1).unwrap();
        let branch = ast.child(body, 1).unwrap();
        let condition = ast.child(branch, 0).unwrap();
        assert_eq!(ast.node(condition).token, TokenClass::Geq);
    }

    #[test]
    fn test_parse_for_shape() {
        let (ast, _) = parse("int main() { for i = 1 to 10 by 2 do i; }");
        let body = ast.child(ast.root().unwrap(), 1).unwrap();
        let for_stmt = ast.child(body, 1).unwrap();
        assert_eq!(ast.node(for_stmt).kind, NodeKind::For);

        let control = ast.child(for_stmt, 0).unwrap();
        assert_eq!(ast.node(control).kind, NodeKind::Var);
        assert_eq!(ast.node(control).literal, "i");
        assert!(ast.node(control).is_init);

        let range = ast.child(for_stmt, 1).unwrap();
        assert_eq!(ast.node(range).kind, NodeKind::Range);
        assert!(ast.child(range, 2).is_some());
        assert!(ast.child(for_stmt, 2).is_some());
    }

    #[test]
    fn test_for_accepts_walrus_binder() {
        let (ast, _) = parse("int main() { for i := 1 to 3 do i; }");
        let body = ast.child(ast.root().unwrap(), 1).unwrap();
        assert_eq!(ast.node(ast.child(body, 1).unwrap()).kind, NodeKind::For);
    }

    #[test]
    fn test_unary_operators() {
        let (ast, _) = parse("int a[5]; int main() { a[0] <= -1 + *a + ?2; }");
        let dump = render(&ast, ast.root(), PrintMode::Plain);
        assert!(dump.contains("Op: chsign"));
        assert!(dump.contains("Op: sizeof"));
        assert!(dump.contains("Op: ?"));
    }

    #[test]
    fn test_multichar_constant_warns_and_truncates() {
        let (ast, reporter) = parse("char c : 'abc';");
        assert_eq!(reporter.warnings(), 1);
        assert!(reporter.messages()[0].contains("3 characters long and not a single character"));

        let init = ast.child(ast.root().unwrap(), 0).unwrap();
        assert_eq!(ast.node(init).payload, Some(Literal::Char('a')));
    }

    #[test]
    fn test_escaped_char_constants() {
        let (ast, reporter) = parse("char a : '\\n', b : '\\0', c : '\\k';");
        assert_eq!(reporter.warnings(), 0);
        let a = ast.child(ast.root().unwrap(), 0).unwrap();
        assert_eq!(ast.node(a).payload, Some(Literal::Char('\n')));
        let b_decl = ast.node(ast.root().unwrap()).sibling.unwrap();
        let b = ast.child(b_decl, 0).unwrap();
        assert_eq!(ast.node(b).payload, Some(Literal::Char('\0')));
        let c_decl = ast.node(b_decl).sibling.unwrap();
        let c = ast.child(c_decl, 0).unwrap();
        assert_eq!(ast.node(c).payload, Some(Literal::Char('k')));
    }

    #[test]
    fn test_string_constant_size_counts_terminator_slot() {
        let (ast, _) = parse("char s[10] : \"hi\\n\";");
        let init = ast.child(ast.root().unwrap(), 0).unwrap();
        let node = ast.node(init);
        assert_eq!(node.kind, NodeKind::StringConst);
        assert_eq!(node.payload, Some(Literal::Str(String::from("hi\n"))));
        assert_eq!(node.size, 4);
    }

    #[test]
    fn test_empty_string_has_length_zero() {
        let (ast, _) = parse("char s[4] : \"\";");
        let init = ast.child(ast.root().unwrap(), 0).unwrap();
        assert_eq!(ast.node(init).payload, Some(Literal::Str(String::new())));
        assert_eq!(ast.node(init).size, 1);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "int fib(int n) { if n < 2 then return n; return fib(n - 1) + fib(n - 2); }\nint main() { output(fib(10)); }";
        let (first, _) = parse(source);
        let (second, _) = parse(source);
        assert_eq!(
            render(&first, first.root(), PrintMode::Plain),
            render(&second, second.root(), PrintMode::Plain)
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut ast = Ast::new();
        let mut reporter = Reporter::new();
        let parser = PestCMinusParser::default();
        assert!(parser.parse("int main( {", &mut ast, &mut reporter).is_err());
    }
}
