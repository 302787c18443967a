use super::ast::{
    Ast,
    NodeId,
    NodeKind,
    RefType,
};

/// Assigns every declaration its reference class and a word offset inside
/// global memory or the enclosing frame, and computes per-block frame
/// sizes.
///
/// Offsets count downward: globals from 0 below the GP, frame slots from -2
/// below the FP (slot 0 holds the caller's frame pointer and slot -1 the
/// return address). A compound's size records the frame offset past its own
/// locals, which is where the code generator starts its temporaries. A for
/// statement additionally reserves three slots for index, stop and step.
///
/// @return the final global offset, the end of global space.
pub fn lay_out(ast: &mut Ast) -> i32 {
    let mut layout = MemoryLayout {
        ast,
        goffset: 0,
        foffset: 0,
        current_function: None,
    };
    layout.run();
    layout.goffset
}

struct MemoryLayout<'a> {
    ast: &'a mut Ast,
    goffset: i32,
    foffset: i32,
    current_function: Option<NodeId>,
}

impl<'a> MemoryLayout<'a> {
    fn run(&mut self) {
        let top_level: Vec<NodeId> = self.ast.siblings(self.ast.root()).collect();
        for declaration in top_level {
            match self.ast.node(declaration).kind {
                NodeKind::Func => self.place_function(declaration),
                NodeKind::Var | NodeKind::VarArr | NodeKind::Static => {
                    self.place_global(declaration)
                }
                _ => {}
            }
        }
    }

    fn place_function(&mut self, id: NodeId) {
        self.current_function = Some(id);
        let saved = self.foffset;

        // Return address and saved frame pointer
        self.foffset = -2;
        {
            let node = self.ast.node_mut(id);
            node.ref_type = RefType::Global;
            node.size = -2;
        }

        let parms: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 0)).collect();
        for parm in parms {
            let foffset = self.foffset;
            let node = self.ast.node_mut(parm);
            node.ref_type = RefType::Parameter;
            node.location = foffset;
            self.foffset -= node.size;
            self.ast.node_mut(id).size -= 1;
        }

        if let Some(body) = self.ast.child(id, 1) {
            self.place_statement(body);
        }

        self.foffset = saved;
        self.current_function = None;
    }

    fn place_statement(&mut self, id: NodeId) {
        match self.ast.node(id).kind {
            NodeKind::Compound => self.place_compound(id),
            NodeKind::For => self.place_for(id),
            NodeKind::If | NodeKind::While | NodeKind::Return => {
                for slot in 0..self.ast.node(id).children.len() {
                    if let Some(child) = self.ast.child(id, slot) {
                        self.place_statement(child);
                    }
                }
            }
            NodeKind::Break => {}
            _ => self.place_expression(id),
        }
    }

    /// The compound's size captures the frame offset after its own locals;
    /// the frame offset is restored on exit so sibling blocks reuse the
    /// space.
    fn place_compound(&mut self, id: NodeId) {
        let entry = self.foffset;

        let declarations: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 0)).collect();
        for declaration in declarations {
            self.place_local(declaration);
        }
        self.ast.node_mut(id).size = self.foffset;

        let statements: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 1)).collect();
        for statement in statements {
            self.place_statement(statement);
        }

        self.foffset = entry;
    }

    fn place_for(&mut self, id: NodeId) {
        let entry = self.foffset;

        if let Some(control) = self.ast.child(id, 0) {
            let node = self.ast.node_mut(control);
            node.ref_type = RefType::Local;
            node.location = entry;
        }
        // Index, stop and step slots
        self.foffset = entry - 3;
        self.ast.node_mut(id).size = self.foffset;

        if let Some(range) = self.ast.child(id, 1) {
            for slot in 0..3 {
                if let Some(child) = self.ast.child(range, slot) {
                    self.place_expression(child);
                }
            }
        }
        if let Some(body) = self.ast.child(id, 2) {
            self.place_statement(body);
        }

        self.foffset = entry;
    }

    fn place_local(&mut self, id: NodeId) {
        match self.ast.node(id).kind {
            NodeKind::Var | NodeKind::VarArr => {
                let is_array = self.ast.node(id).is_array;
                let foffset = self.foffset;
                let node = self.ast.node_mut(id);
                node.ref_type = RefType::Local;
                // The array base sits past the size slot
                node.location = if is_array { foffset - 1 } else { foffset };
                self.foffset -= node.size;

                if let Some(initializer) = self.ast.child(id, 0) {
                    if self.ast.node(initializer).kind == NodeKind::StringConst {
                        self.place_string(initializer);
                    }
                }
            }
            NodeKind::Static => self.place_static(id),
            _ => {}
        }
    }

    fn place_static(&mut self, id: NodeId) {
        if let Some(initializer) = self.ast.child(id, 0) {
            if self.ast.node(initializer).kind == NodeKind::StringConst {
                self.place_string(initializer);
            }
        }
        let is_array = self.ast.node(id).is_array;
        let goffset = self.goffset;
        let node = self.ast.node_mut(id);
        node.ref_type = RefType::Static;
        node.location = if is_array { goffset - 1 } else { goffset };
        self.goffset -= node.size;
    }

    fn place_global(&mut self, id: NodeId) {
        if self.ast.node(id).kind == NodeKind::Static {
            self.place_static(id);
            return;
        }
        if let Some(initializer) = self.ast.child(id, 0) {
            if self.ast.node(initializer).kind == NodeKind::StringConst {
                self.place_string(initializer);
            }
        }
        let is_array = self.ast.node(id).is_array;
        let goffset = self.goffset;
        let node = self.ast.node_mut(id);
        node.ref_type = RefType::Global;
        node.location = if is_array { goffset - 1 } else { goffset };
        self.goffset -= node.size;
    }

    /// Bare string constants live in global memory like unnamed char
    /// arrays.
    fn place_string(&mut self, id: NodeId) {
        let goffset = self.goffset;
        let node = self.ast.node_mut(id);
        node.ref_type = RefType::Global;
        node.location = goffset - 1;
        self.goffset -= node.size;
    }

    fn place_expression(&mut self, id: NodeId) {
        if self.ast.node(id).kind == NodeKind::StringConst {
            self.place_string(id);
            return;
        }
        for slot in 0..self.ast.node(id).children.len() {
            if let Some(child) = self.ast.child(id, slot) {
                self.place_expression(child);
            }
        }
        // Argument chains hang off the first child as siblings
        if let Some(head) = self.ast.child(id, 0) {
            let rest: Vec<NodeId> = self.ast.siblings(self.ast.node(head).sibling).collect();
            for sibling in rest {
                self.place_expression(sibling);
            }
        }
    }
}

/// Marks every loop that sits inside another loop's body. Embedded loops
/// break to their own exit rather than the outer one, and the generator
/// keys a few offset decisions off the flag.
pub fn mark_embedded_loops(ast: &mut Ast) {
    let top_level: Vec<NodeId> = ast.siblings(ast.root()).collect();
    for declaration in top_level {
        if ast.node(declaration).kind == NodeKind::Func {
            if let Some(body) = ast.child(declaration, 1) {
                mark_node(ast, body, false);
            }
        }
    }
}

fn mark_node(ast: &mut Ast, id: NodeId, in_loop: bool) {
    let kind = ast.node(id).kind;
    let entering_loop = matches!(kind, NodeKind::For | NodeKind::While);
    if entering_loop && in_loop {
        ast.node_mut(id).is_embedded = true;
    }

    let children: Vec<NodeId> = (0..ast.node(id).children.len())
        .filter_map(|slot| ast.child(id, slot))
        .collect();
    for child in children {
        let chain: Vec<NodeId> = ast.siblings(Some(child)).collect();
        for node in chain {
            mark_node(ast, node, in_loop || entering_loop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{AstParser, PestCMinusParser};
    use crate::compiler::reporter::Reporter;
    use crate::compiler::semantic_analyser::{analyse, synthesize_routines};

    fn lay_out_source(source: &str) -> (Ast, i32) {
        let mut ast = Ast::new();
        let mut reporter = Reporter::new();
        PestCMinusParser::default().parse(source, &mut ast, &mut reporter).unwrap();
        let routines = synthesize_routines(&mut ast);
        analyse(&mut ast, routines, &mut reporter);
        assert_eq!(reporter.errors(), 0, "layout tests expect clean programs");
        let goffset = lay_out(&mut ast);
        mark_embedded_loops(&mut ast);
        (ast, goffset)
    }

    fn find(ast: &Ast, name: &str) -> NodeId {
        (0..ast.len())
            .map(NodeId)
            .find(|id| ast.node(*id).literal == name && ast.node(*id).kind.is_declaration())
            .unwrap()
    }

    #[test]
    fn test_locals_descend_from_frame_slot_two() {
        let (ast, goffset) = lay_out_source("int main() { int x; int y; x <= 1; y <= x; }");
        let x = find(&ast, "x");
        let y = find(&ast, "y");
        assert_eq!(ast.node(x).ref_type, RefType::Local);
        assert_eq!(ast.node(x).location, -2);
        assert_eq!(ast.node(y).location, -3);
        assert_eq!(goffset, 0);

        let main = find(&ast, "main");
        assert_eq!(ast.node(main).size, -2);
        let body = ast.child(main, 1).unwrap();
        assert_eq!(ast.node(body).size, -4);
    }

    #[test]
    fn test_parameters_then_locals() {
        let (ast, _) = lay_out_source("int f(int a, int b) { int c; c <= a + b; return c; }\nint main() { return f(1, 2); }");
        let a = find(&ast, "a");
        let b = find(&ast, "b");
        let c = find(&ast, "c");
        assert_eq!(ast.node(a).ref_type, RefType::Parameter);
        assert_eq!(ast.node(a).location, -2);
        assert_eq!(ast.node(b).location, -3);
        assert_eq!(ast.node(c).ref_type, RefType::Local);
        assert_eq!(ast.node(c).location, -4);

        let f = find(&ast, "f");
        assert_eq!(ast.node(f).size, -4);
    }

    #[test]
    fn test_global_and_array_offsets() {
        let (ast, goffset) = lay_out_source("int g;\nint a[3];\nint main() { g <= a[0]; }");
        let g = find(&ast, "g");
        let a = find(&ast, "a");
        assert_eq!(ast.node(g).ref_type, RefType::Global);
        assert_eq!(ast.node(g).location, 0);
        // Base one past the size slot
        assert_eq!(ast.node(a).location, -2);
        assert_eq!(ast.node(a).size, 4);
        assert_eq!(goffset, -5);
    }

    #[test]
    fn test_local_array_base() {
        let (ast, _) = lay_out_source("int main() { int a[3]; a[0] <= 1; }");
        let a = find(&ast, "a");
        assert_eq!(ast.node(a).ref_type, RefType::Local);
        assert_eq!(ast.node(a).location, -3);
    }

    #[test]
    fn test_static_local_lives_in_global_space() {
        let (ast, goffset) = lay_out_source("int main() { static int s; output(s); }");
        let s = find(&ast, "s");
        assert_eq!(ast.node(s).ref_type, RefType::Static);
        assert_eq!(ast.node(s).location, 0);
        assert_eq!(goffset, -1);
    }

    #[test]
    fn test_for_reserves_loop_slots() {
        let (ast, _) = lay_out_source("int main() { for i = 1 to 3 do output(i); }");
        let i = find(&ast, "i");
        assert_eq!(ast.node(i).ref_type, RefType::Local);
        assert_eq!(ast.node(i).location, -2);

        let main = find(&ast, "main");
        let body = ast.child(main, 1).unwrap();
        let for_stmt = ast.child(body, 1).unwrap();
        assert_eq!(ast.node(for_stmt).size, -5);
    }

    #[test]
    fn test_nested_for_slots_do_not_overlap() {
        let source = "int main() { for i = 1 to 3 do for j = 1 to 3 do output(i + j); }";
        let (ast, _) = lay_out_source(source);
        let i = find(&ast, "i");
        let j = find(&ast, "j");
        assert_eq!(ast.node(i).location, -2);
        assert_eq!(ast.node(j).location, -5);

        let main = find(&ast, "main");
        let body = ast.child(main, 1).unwrap();
        let outer = ast.child(body, 1).unwrap();
        let inner = ast.child(outer, 2).unwrap();
        assert!(!ast.node(outer).is_embedded);
        assert!(ast.node(inner).is_embedded);
        assert_eq!(ast.node(inner).size, -8);
    }

    #[test]
    fn test_global_string_initializer_placement() {
        let (ast, goffset) = lay_out_source("char msg[6] : \"hello\";\nint main() { outputc(msg[0]); }");
        let msg = find(&ast, "msg");
        let init = ast.child(msg, 0).unwrap();
        // The string data is placed first, then the array itself
        assert_eq!(ast.node(init).location, -1);
        assert_eq!(ast.node(init).size, 6);
        assert_eq!(ast.node(msg).location, -7);
        assert_eq!(goffset, -13);
    }

    #[test]
    fn test_while_body_locals() {
        let source = "int main() { bool p; p <= true; while p do { int t; t <= 1; p <= t = 2; } }";
        let (ast, _) = lay_out_source(source);
        let t = find(&ast, "t");
        assert_eq!(ast.node(t).ref_type, RefType::Local);
        assert_eq!(ast.node(t).location, -3);
    }
}
