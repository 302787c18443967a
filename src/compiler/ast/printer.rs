use super::{Ast, DataType, NodeId, NodeKind};

/// What detail a tree dump carries: the plain shape, the shape with data
/// types, or the shape with memory annotations from the layout pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PrintMode {
    Plain,
    Typed,
    Augmented,
}

/// Renders a declaration chain as an indented tree, one node per line.
/// Children are labeled with their slot and siblings with their position in
/// the chain, so the dump mirrors the exact shape the passes traverse.
pub fn render(ast: &Ast, head: Option<NodeId>, mode: PrintMode) -> String {
    let mut out = String::new();
    render_chain(ast, head, mode, 0, &mut out);
    out
}

fn render_chain(ast: &Ast, head: Option<NodeId>, mode: PrintMode, depth: usize, out: &mut String) {
    for (index, id) in ast.siblings(head).enumerate() {
        if index > 0 {
            out.push_str(&".   ".repeat(depth));
            out.push_str(&format!("Sibling: {}  ", index));
        }
        render_node(ast, id, mode, depth, index > 0, out);
    }
}

fn render_node(ast: &Ast, id: NodeId, mode: PrintMode, depth: usize, labeled: bool, out: &mut String) {
    if !labeled {
        out.push_str(&".   ".repeat(depth));
    }
    out.push_str(&describe(ast, id, mode));
    out.push('\n');

    for slot in 0..ast.node(id).children.len() {
        if let Some(child) = ast.child(id, slot) {
            out.push_str(&".   ".repeat(depth + 1));
            out.push_str(&format!("Child: {}  ", slot));
            render_node(ast, child, mode, depth + 1, true, out);
            // The child heads its own sibling chain
            let mut index = 1;
            let mut cursor = ast.node(child).sibling;
            while let Some(next) = cursor {
                out.push_str(&".   ".repeat(depth + 1));
                out.push_str(&format!("Sibling: {}  ", index));
                render_node(ast, next, mode, depth + 1, true, out);
                cursor = ast.node(next).sibling;
                index += 1;
            }
        }
    }
}

fn describe(ast: &Ast, id: NodeId, mode: PrintMode) -> String {
    let node = ast.node(id);
    let mut text = match node.kind {
        NodeKind::Func => format!("Func: {} returns type {}", node.literal, node.data_type),
        NodeKind::Var => format!("Var: {} of type {}", node.literal, node.data_type),
        NodeKind::VarArr => format!("Var: {} of array of type {}", node.literal, node.data_type),
        NodeKind::Static if node.is_array => {
            format!("Var: {} of static array of type {}", node.literal, node.data_type)
        }
        NodeKind::Static => format!("Var: {} of static type {}", node.literal, node.data_type),
        NodeKind::Parm => format!("Parm: {} of type {}", node.literal, node.data_type),
        NodeKind::ParmArr => format!("Parm: {} of array of type {}", node.literal, node.data_type),
        NodeKind::Compound => String::from("Compound"),
        NodeKind::If => String::from("If"),
        NodeKind::While => String::from("While"),
        NodeKind::For => String::from("For"),
        NodeKind::Range => String::from("Range"),
        NodeKind::Return => String::from("Return"),
        NodeKind::Break => String::from("Break"),
        NodeKind::Assign => format!("Assign: {}", node.literal),
        NodeKind::Or => String::from("Op: or"),
        NodeKind::And => String::from("Op: and"),
        NodeKind::Not => String::from("Op: not"),
        NodeKind::BinOp => format!("Op: {}", node.literal),
        NodeKind::ChSign => String::from("Op: chsign"),
        NodeKind::SizeOf => String::from("Op: sizeof"),
        NodeKind::Ques => String::from("Op: ?"),
        NodeKind::Id => format!("Id: {}", node.literal),
        NodeKind::ArrIndex => String::from("Op: ["),
        NodeKind::Call => format!("Call: {}", node.literal),
        NodeKind::NumConst
        | NodeKind::CharConst
        | NodeKind::StringConst
        | NodeKind::BoolConst => format!("Const {}", node.literal),
    };

    if mode != PrintMode::Plain && !node.kind.is_declaration() && node.data_type != DataType::Undefined {
        text.push_str(&format!(" [type {}]", node.data_type));
    }
    if mode == PrintMode::Augmented
        && (node.kind.is_declaration() || node.kind == NodeKind::Id || node.kind == NodeKind::StringConst)
    {
        text.push_str(&format!(" [mem: {} loc: {} size: {}]", node.ref_type, node.location, node.size));
    }
    text.push_str(&format!(" [line: {}]", node.line));
    text
}
