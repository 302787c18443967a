use super::super::ast::{
    Ast,
    DataType,
    Node,
    NodeId,
    NodeKind,
    RefType,
    SymbolTable,
};

/// Builds the I/O routine library: seven synthetic function declarations
/// chained as siblings. Input routines return their value type; output
/// routines are Void and take one `*dummy*` parameter already placed at the
/// first parameter slot of the frame. The code generator emits their bodies
/// before any user function.
pub fn synthesize_routines(ast: &mut Ast) -> NodeId {
    let input = routine(ast, "input", DataType::Int, None);
    let output = routine(ast, "output", DataType::Void, Some(DataType::Int));
    let inputb = routine(ast, "inputb", DataType::Bool, None);
    let outputb = routine(ast, "outputb", DataType::Void, Some(DataType::Bool));
    let inputc = routine(ast, "inputc", DataType::Char, None);
    let outputc = routine(ast, "outputc", DataType::Void, Some(DataType::Char));
    let outnl = routine(ast, "outnl", DataType::Void, None);

    let head = input;
    for tail in [output, inputb, outputb, inputc, outputc, outnl] {
        ast.append_sibling(head, tail);
    }
    head
}

/// Marks the routines used and inserts them into the global scope so user
/// code can call them without any declaration in the source.
pub fn register_routines(ast: &Ast, head: NodeId, table: &mut SymbolTable) {
    for id in ast.siblings(Some(head)) {
        let node = ast.node(id);
        if node.kind == NodeKind::Func && node.is_lib {
            table.insert_global(&node.literal, id);
        }
    }
}

fn routine(ast: &mut Ast, name: &str, return_type: DataType, parameter: Option<DataType>) -> NodeId {
    let mut node = Node::new(NodeKind::Func, -1, name);
    node.data_type = return_type;
    node.is_lib = true;
    node.is_used = true;
    // Return slot and saved frame pointer, minus one more per parameter
    node.size = if parameter.is_some() { -3 } else { -2 };
    let func = ast.add(node);

    if let Some(parm_type) = parameter {
        let mut parm = Node::new(NodeKind::Parm, -1, "*dummy*");
        parm.data_type = parm_type;
        parm.ref_type = RefType::Parameter;
        parm.location = -2;
        parm.size = 1;
        parm.is_init = true;
        parm.is_used = true;
        let parm = ast.add(parm);
        ast.set_child(func, 0, parm);
        ast.node_mut(func).parameters = vec![parm];
    }
    func
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::reporter::Reporter;

    #[test]
    fn test_seven_routines_in_order() {
        let mut ast = Ast::new();
        let head = synthesize_routines(&mut ast);
        let names: Vec<String> = ast.siblings(Some(head))
            .map(|id| ast.node(id).literal.clone())
            .collect();
        assert_eq!(names, vec!["input", "output", "inputb", "outputb", "inputc", "outputc", "outnl"]);
    }

    #[test]
    fn test_routine_signatures() {
        let mut ast = Ast::new();
        let head = synthesize_routines(&mut ast);
        for id in ast.siblings(Some(head)) {
            let node = ast.node(id);
            assert!(node.is_lib);
            assert!(node.is_used);
            match node.literal.as_str() {
                "input" => {
                    assert_eq!(node.data_type, DataType::Int);
                    assert_eq!(node.size, -2);
                    assert!(node.parameters.is_empty());
                }
                "outputb" => {
                    assert_eq!(node.data_type, DataType::Void);
                    assert_eq!(node.size, -3);
                    let parm = ast.node(node.parameters[0]);
                    assert_eq!(parm.literal, "*dummy*");
                    assert_eq!(parm.data_type, DataType::Bool);
                    assert_eq!(parm.location, -2);
                    assert_eq!(parm.ref_type, RefType::Parameter);
                }
                "outnl" => {
                    assert_eq!(node.data_type, DataType::Void);
                    assert_eq!(node.size, -2);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_registration_makes_routines_callable() {
        let mut ast = Ast::new();
        let head = synthesize_routines(&mut ast);
        let mut table = SymbolTable::new();
        register_routines(&ast, head, &mut table);

        assert!(table.lookup_global("output").is_some());
        assert!(table.lookup_global("outnl").is_some());

        // Library routines never show up as unused
        let mut reporter = Reporter::new();
        table.check_unused_global(&ast, &mut reporter);
        assert_eq!(reporter.warnings(), 0);
    }
}
