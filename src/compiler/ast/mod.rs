pub(super) mod ast_node;
pub(super) mod datatype;
pub(super) mod literals;
pub(super) mod operators;
pub(super) mod printer;
pub(super) mod symbol_table;

pub(super) use self::{
    ast_node::{Node, NodeId, NodeKind, MAX_CHILDREN},
    datatype::{DataType, RefType},
    literals::Literal,
    operators::TokenClass,
    symbol_table::SymbolTable,
};

/// Arena holding every node of a compilation. Nodes are addressed by NodeId;
/// parents reference children and sibling tails by id, and the symbol table
/// borrows ids rather than nodes, so the arena stays the single owner.
pub struct Ast {
    nodes: Vec<Node>,

    /// Head of the top-level declaration chain.
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            nodes: vec![],
            root: None,
        }
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub fn child(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        self.node(id).children[slot]
    }

    pub fn set_child(&mut self, parent: NodeId, slot: usize, child: NodeId) {
        self.node_mut(parent).children[slot] = Some(child);
    }

    /// Links `tail` at the end of the sibling chain starting at `head` and
    /// returns the head, so chains build up left to right.
    pub fn append_sibling(&mut self, head: NodeId, tail: NodeId) -> NodeId {
        let mut cursor = head;
        while let Some(next) = self.node(cursor).sibling {
            cursor = next;
        }
        self.node_mut(cursor).sibling = Some(tail);
        head
    }

    /// Iterates a sibling chain from its head.
    pub fn siblings(&self, head: Option<NodeId>) -> SiblingIter {
        SiblingIter {
            ast: self,
            cursor: head,
        }
    }
}

pub struct SiblingIter<'a> {
    ast: &'a Ast,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for SiblingIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.cursor?;
        self.cursor = self.ast.node(current).sibling;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_chain_building() {
        let mut ast = Ast::new();
        let a = ast.add(Node::new(NodeKind::Var, 1, "a"));
        let b = ast.add(Node::new(NodeKind::Var, 1, "b"));
        let c = ast.add(Node::new(NodeKind::Var, 2, "c"));

        let head = ast.append_sibling(a, b);
        ast.append_sibling(head, c);

        let names: Vec<String> = ast.siblings(Some(head))
            .map(|id| ast.node(id).literal.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_children_slots() {
        let mut ast = Ast::new();
        let cond = ast.add(Node::new(NodeKind::Id, 3, "p"));
        let then = ast.add(Node::new(NodeKind::Break, 3, "break"));
        let branch = ast.add(Node::new(NodeKind::If, 3, "if"));

        ast.set_child(branch, 0, cond);
        ast.set_child(branch, 1, then);

        assert_eq!(ast.child(branch, 0), Some(cond));
        assert_eq!(ast.child(branch, 1), Some(then));
        assert_eq!(ast.child(branch, 2), None);
    }
}
