use std::collections::HashMap;

use super::{Ast, NodeId, NodeKind};
use crate::compiler::reporter::Reporter;

/// One named scope: a mapping from identifier to the declaring node's id.
/// Insertion order is kept so unused-variable reports and global
/// initialization code follow declaration order.
struct Scope {
    name: String,
    symbols: HashMap<String, NodeId>,
    order: Vec<String>,
}

impl Scope {
    fn new(name: &str) -> Self {
        Scope {
            name: String::from(name),
            symbols: HashMap::new(),
            order: vec![],
        }
    }

    /// Adds a symbol to the scope.
    /// @return true if added, false if the name already exists here.
    fn insert(&mut self, symbol: &str, node: NodeId) -> bool {
        if self.symbols.contains_key(symbol) {
            return false;
        }
        self.symbols.insert(String::from(symbol), node);
        self.order.push(String::from(symbol));
        true
    }

    fn lookup(&self, symbol: &str) -> Option<NodeId> {
        self.symbols.get(symbol).copied()
    }

    /// Warns once per declaration in this scope that was never used,
    /// worded by declaration kind.
    fn check_unused(&self, ast: &Ast, reporter: &mut Reporter) {
        for name in &self.order {
            let id = self.symbols[name];
            let node = ast.node(id);
            if node.is_used {
                continue;
            }
            match node.kind {
                NodeKind::Parm | NodeKind::ParmArr => {
                    reporter.warning(node.line, format!("The parameter '{}' seems not to be used.", node.literal));
                }
                NodeKind::Func => {
                    reporter.warning(node.line, format!("The function '{}' seems not to be used.", node.literal));
                }
                _ => {
                    reporter.warning(node.line, format!("The variable '{}' seems not to be used.", node.literal));
                }
            }
        }
    }
}

/// Stack of scopes. The bottom scope is always "Global" and is never popped;
/// every other scope is pushed on entry to a function, compound or for
/// statement and popped on exit.
pub struct SymbolTable {
    stack: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            stack: vec![Scope::new("Global")],
        }
    }

    pub fn enter(&mut self, name: &str) {
        self.stack.push(Scope::new(name));
    }

    /// Pops the innermost scope. The global scope stays put no matter how
    /// unbalanced the caller got.
    pub fn leave(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[allow(dead_code)]
    pub fn current_scope_name(&self) -> &str {
        // The stack is never empty
        &self.stack.last().unwrap().name
    }

    /// Inserts into the innermost scope.
    /// @return false if the name is already declared there.
    pub fn insert(&mut self, symbol: &str, node: NodeId) -> bool {
        self.stack.last_mut().unwrap().insert(symbol, node)
    }

    /// Inserts into the global scope regardless of the current depth.
    pub fn insert_global(&mut self, symbol: &str, node: NodeId) -> bool {
        self.stack[0].insert(symbol, node)
    }

    /// Scans scopes innermost to outermost and returns the first hit.
    pub fn lookup(&self, symbol: &str) -> Option<NodeId> {
        self.stack.iter().rev().find_map(|scope| scope.lookup(symbol))
    }

    /// Consults only the global scope.
    pub fn lookup_global(&self, symbol: &str) -> Option<NodeId> {
        self.stack[0].lookup(symbol)
    }

    /// Consults only the innermost scope.
    pub fn lookup_scope(&self, symbol: &str) -> Option<NodeId> {
        self.stack.last().unwrap().lookup(symbol)
    }

    /// Global Var, VarArr and Static declarations in insertion order; the
    /// init section initializes them in exactly this order.
    pub fn global_declarations(&self, ast: &Ast) -> Vec<NodeId> {
        self.stack[0]
            .order
            .iter()
            .map(|name| self.stack[0].symbols[name])
            .filter(|id| matches!(ast.node(*id).kind, NodeKind::Var | NodeKind::VarArr | NodeKind::Static))
            .collect()
    }

    /// Reports unused declarations in the innermost scope. Not applied to
    /// the global scope; check_unused_global covers that at end of analysis.
    pub fn check_unused(&self, ast: &Ast, reporter: &mut Reporter) {
        let scope = self.stack.last().unwrap();
        if scope.name != "Global" {
            scope.check_unused(ast, reporter);
        }
    }

    pub fn check_unused_global(&self, ast: &Ast, reporter: &mut Reporter) {
        self.stack[0].check_unused(ast, reporter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Node;

    fn var(ast: &mut Ast, name: &str, line: i32) -> NodeId {
        ast.add(Node::new(NodeKind::Var, line, name))
    }

    #[test]
    fn test_innermost_lookup_shadows_outer() {
        let mut ast = Ast::new();
        let outer = var(&mut ast, "x", 1);
        let inner = var(&mut ast, "x", 5);

        let mut table = SymbolTable::new();
        assert!(table.insert("x", outer));
        table.enter("Compound");
        assert!(table.insert("x", inner));

        assert_eq!(table.lookup("x"), Some(inner));
        assert_eq!(table.lookup_global("x"), Some(outer));
        table.leave();
        assert_eq!(table.lookup("x"), Some(outer));
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut ast = Ast::new();
        let first = var(&mut ast, "x", 1);
        let second = var(&mut ast, "x", 2);

        let mut table = SymbolTable::new();
        assert!(table.insert("x", first));
        assert!(!table.insert("x", second));
        assert_eq!(table.lookup("x"), Some(first));
    }

    #[test]
    fn test_global_scope_is_never_popped() {
        let mut table = SymbolTable::new();
        table.enter("main");
        table.leave();
        table.leave();
        table.leave();
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn test_scope_local_lookup() {
        let mut ast = Ast::new();
        let outer = var(&mut ast, "x", 1);

        let mut table = SymbolTable::new();
        table.insert("x", outer);
        table.enter("Compound");
        assert_eq!(table.lookup_scope("x"), None);
        assert_eq!(table.lookup("x"), Some(outer));
    }

    #[test]
    fn test_global_declarations_in_insertion_order() {
        let mut ast = Ast::new();
        let b = var(&mut ast, "b", 1);
        let a = var(&mut ast, "a", 2);
        let f = ast.add(Node::new(NodeKind::Func, 3, "f"));

        let mut table = SymbolTable::new();
        table.insert_global("b", b);
        table.insert_global("a", a);
        table.insert_global("f", f);

        // Functions are not initialized; declaration order is preserved
        assert_eq!(table.global_declarations(&ast), vec![b, a]);
    }

    #[test]
    fn test_unused_warnings_by_kind() {
        let mut ast = Ast::new();
        let parm = ast.add(Node::new(NodeKind::Parm, 2, "p"));
        let local = var(&mut ast, "x", 3);

        let mut table = SymbolTable::new();
        table.enter("f");
        table.insert("p", parm);
        table.insert("x", local);

        let mut reporter = Reporter::new();
        table.check_unused(&ast, &mut reporter);
        assert_eq!(reporter.warnings(), 2);
        assert_eq!(reporter.messages()[0], "WARNING(2): The parameter 'p' seems not to be used.");
        assert_eq!(reporter.messages()[1], "WARNING(3): The variable 'x' seems not to be used.");
    }
}
