use super::routine_library;
use super::super::ast::{
    Ast,
    DataType,
    NodeId,
    NodeKind,
    SymbolTable,
    TokenClass,
};
use super::super::reporter::Reporter;

/// Summary of an analysed expression: what type it carries, whether it is an
/// unindexed array value, and the declaration it resolved to if any. An
/// unresolved side comes back Undefined so checks against it are suppressed
/// and one missing declaration does not cascade into noise.
#[derive(Debug, Clone, Copy)]
struct ExprInfo {
    data_type: DataType,
    is_array: bool,
    decl: Option<NodeId>,
}

impl ExprInfo {
    fn unknown() -> Self {
        ExprInfo {
            data_type: DataType::Undefined,
            is_array: false,
            decl: None,
        }
    }

    fn of(data_type: DataType) -> Self {
        ExprInfo {
            data_type,
            is_array: false,
            decl: None,
        }
    }

    fn known(&self) -> bool {
        self.data_type != DataType::Undefined
    }
}

/// Runs semantic analysis over the whole program: declaration processing,
/// identifier resolution, type checking, initialization and use tracking,
/// and the end-of-analysis unused and main checks. Diagnostics stream
/// through the reporter; the AST comes out annotated with types and flags.
pub fn analyse(ast: &mut Ast, routines: NodeId, reporter: &mut Reporter) {
    let mut analyser = CMinusSemanticAnalyser {
        ast,
        reporter,
        table: SymbolTable::new(),
        current_function: None,
        loop_depth: 0,
        has_main: false,
    };
    analyser.run(routines);
}

struct CMinusSemanticAnalyser<'a> {
    ast: &'a mut Ast,
    reporter: &'a mut Reporter,
    table: SymbolTable,
    current_function: Option<NodeId>,
    loop_depth: usize,
    has_main: bool,
}

impl<'a> CMinusSemanticAnalyser<'a> {
    fn run(&mut self, routines: NodeId) {
        routine_library::register_routines(self.ast, routines, &mut self.table);

        let top_level: Vec<NodeId> = self.ast.siblings(self.ast.root()).collect();
        for declaration in top_level {
            match self.ast.node(declaration).kind {
                NodeKind::Func => self.declare_function(declaration),
                NodeKind::Var | NodeKind::VarArr | NodeKind::Static => {
                    self.declare_global(declaration)
                }
                _ => {}
            }
        }

        self.table.check_unused_global(self.ast, self.reporter);
        if !self.has_main {
            self.reporter.error_tagged(
                "LINKER",
                String::from("A function named 'main' with no parameters must be defined."),
            );
        }
    }

    // ==========================================================
    // Declarations
    // ==========================================================

    fn declare_global(&mut self, id: NodeId) {
        let node = self.ast.node_mut(id);
        node.is_init = true;
        let name = node.literal.clone();
        let line = node.line;

        if let Some(previous) = self.table.lookup_global(&name) {
            let declared = self.ast.node(previous).line;
            self.reporter.error(line, format!("Symbol '{}' is already declared at line {}.", name, declared));
        } else {
            self.table.insert_global(&name, id);
        }
        self.check_initializer(id);
    }

    fn declare_local(&mut self, id: NodeId) {
        let node = self.ast.node_mut(id);
        if node.kind == NodeKind::Static || node.children[0].is_some() {
            node.is_init = true;
        }
        let name = node.literal.clone();
        let line = node.line;

        if let Some(previous) = self.table.lookup_scope(&name) {
            let declared = self.ast.node(previous).line;
            self.reporter.error(line, format!("Symbol '{}' is already declared at line {}.", name, declared));
        } else {
            self.table.insert(&name, id);
        }
        self.check_initializer(id);
    }

    /// Initializers must be constant expressions matching the declared type
    /// and array-ness.
    fn check_initializer(&mut self, id: NodeId) {
        let initializer = match self.ast.child(id, 0) {
            Some(initializer) => initializer,
            None => return,
        };
        let decl = self.ast.node(id);
        let name = decl.literal.clone();
        let line = decl.line;
        let decl_type = decl.data_type;
        let decl_is_array = decl.is_array;
        let init = self.ast.node(initializer);

        if init.kind == NodeKind::Id {
            self.reporter.error(line, format!("Initializer for variable '{}' is not a constant expression.", name));
            return;
        }
        if decl_is_array && !init.is_array {
            self.reporter.error(line, format!(
                "Initializer for variable '{}' requires both operands be arrays or not but variable is an array and rhs is not an array.",
                name
            ));
        }
        if init.is_const && init.data_type != decl_type {
            let init_type = init.data_type;
            self.reporter.error(line, format!(
                "Initializer for variable '{}' of type {} is of type {}.",
                name, decl_type, init_type
            ));
        }
    }

    fn declare_function(&mut self, id: NodeId) {
        let name = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        if let Some(previous) = self.table.lookup_global(&name) {
            let declared = self.ast.node(previous).line;
            self.reporter.error(line, format!("Symbol '{}' is already declared at line {}.", name, declared));
        } else {
            self.table.insert_global(&name, id);
        }

        if name == "main" && self.ast.node(id).parameters.is_empty() {
            let node = self.ast.node_mut(id);
            node.is_main = true;
            node.is_used = true;
            self.has_main = true;
        }

        self.table.enter(&name);
        self.current_function = Some(id);

        let parms: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 0)).collect();
        for parm in parms {
            let node = self.ast.node_mut(parm);
            node.is_init = true;
            let parm_name = node.literal.clone();
            let parm_line = node.line;
            if let Some(previous) = self.table.lookup_scope(&parm_name) {
                let declared = self.ast.node(previous).line;
                self.reporter.error(parm_line, format!("Symbol '{}' is already declared at line {}.", parm_name, declared));
            } else {
                self.table.insert(&parm_name, parm);
            }
        }

        if let Some(body) = self.ast.child(id, 1) {
            if self.ast.node(body).kind == NodeKind::Compound {
                self.analyse_block(body, false);
            } else {
                self.analyse_statement(body);
            }
        }

        let node = self.ast.node(id);
        if !node.has_return && node.data_type != DataType::Void {
            let data_type = node.data_type;
            self.reporter.warning(line, format!(
                "Expecting to return type {} but function '{}' has no return statement.",
                data_type, name
            ));
        }

        self.table.check_unused(self.ast, self.reporter);
        self.table.leave();
        self.current_function = None;
    }

    // ==========================================================
    // Statements
    // ==========================================================

    /// Analyses a compound: declarations first, then the statement chain.
    /// A function body shares the function's scope; every other compound
    /// pushes its own.
    fn analyse_block(&mut self, id: NodeId, new_scope: bool) {
        if new_scope {
            self.table.enter("Compound");
        }

        let declarations: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 0)).collect();
        for declaration in declarations {
            self.declare_local(declaration);
        }
        let statements: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 1)).collect();
        for statement in statements {
            self.analyse_statement(statement);
        }

        if new_scope {
            self.table.check_unused(self.ast, self.reporter);
            self.table.leave();
        }
    }

    fn analyse_statement(&mut self, id: NodeId) {
        match self.ast.node(id).kind {
            NodeKind::Compound => self.analyse_block(id, true),
            NodeKind::If => {
                let line = self.ast.node(id).line;
                if let Some(condition) = self.ast.child(id, 0) {
                    let info = self.analyse_expr(condition, true);
                    self.check_condition(info, line, "if");
                }
                if let Some(then_branch) = self.ast.child(id, 1) {
                    self.analyse_statement(then_branch);
                }
                if let Some(else_branch) = self.ast.child(id, 2) {
                    self.analyse_statement(else_branch);
                }
            }
            NodeKind::While => {
                let line = self.ast.node(id).line;
                if let Some(condition) = self.ast.child(id, 0) {
                    let info = self.analyse_expr(condition, true);
                    self.check_condition(info, line, "while");
                }
                if let Some(body) = self.ast.child(id, 1) {
                    self.loop_depth += 1;
                    self.analyse_statement(body);
                    self.loop_depth -= 1;
                }
            }
            NodeKind::For => self.analyse_for(id),
            NodeKind::Return => self.analyse_return(id),
            NodeKind::Break => {
                if self.loop_depth == 0 {
                    let line = self.ast.node(id).line;
                    self.reporter.error(line, String::from("Cannot have a break statement outside of loop."));
                }
            }
            _ => {
                // Expression statement; each is analysed exactly once
                if !self.ast.node(id).is_visited {
                    self.ast.node_mut(id).is_visited = true;
                    self.analyse_expr(id, true);
                }
            }
        }
    }

    fn check_condition(&mut self, info: ExprInfo, line: i32, statement: &str) {
        if !info.known() {
            return;
        }
        if info.data_type != DataType::Bool {
            self.reporter.error(line, format!(
                "Expecting Boolean test condition in {} statement but got type {}.",
                statement, info.data_type
            ));
        }
        if info.is_array {
            self.reporter.error(line, format!("Cannot use array as test condition in {} statement.", statement));
        }
    }

    fn analyse_for(&mut self, id: NodeId) {
        self.table.enter("For");

        if let Some(control) = self.ast.child(id, 0) {
            let name = self.ast.node(control).literal.clone();
            self.table.insert(&name, control);
        }

        if let Some(range) = self.ast.child(id, 1) {
            let line = self.ast.node(range).line;
            for position in 0..3 {
                let child = match self.ast.child(range, position) {
                    Some(child) => child,
                    None => continue,
                };
                let info = self.analyse_expr(child, true);
                if !info.known() {
                    continue;
                }
                if info.is_array {
                    self.reporter.error(line, format!(
                        "Cannot use array in position {} in range of for statement.",
                        position + 1
                    ));
                }
                if info.data_type != DataType::Int {
                    self.reporter.error(line, format!(
                        "Expecting type int in position {} in range of for statement but got type {}.",
                        position + 1, info.data_type
                    ));
                }
                if position <= 1 {
                    if let Some(decl) = info.decl {
                        if self.ast.node(decl).kind == NodeKind::Func {
                            let name = self.ast.node(decl).literal.clone();
                            self.reporter.error(line, format!("Cannot use function '{}' as a variable.", name));
                        }
                    }
                }
            }
        }

        if let Some(body) = self.ast.child(id, 2) {
            self.loop_depth += 1;
            self.analyse_statement(body);
            self.loop_depth -= 1;
        }

        self.table.check_unused(self.ast, self.reporter);
        self.table.leave();
    }

    fn analyse_return(&mut self, id: NodeId) {
        let function = match self.current_function {
            Some(function) => function,
            None => return,
        };
        self.ast.node_mut(function).has_return = true;

        let line = self.ast.node(id).line;
        let func = self.ast.node(function);
        let func_name = func.literal.clone();
        let func_line = func.line;
        let func_type = func.data_type;

        match self.ast.child(id, 0) {
            None => {
                if func_type != DataType::Void {
                    self.reporter.error(line, format!(
                        "Function '{}' at line {} is expecting to return type {} but return has no value.",
                        func_name, func_line, func_type
                    ));
                }
            }
            Some(value) => {
                if func_type == DataType::Void {
                    self.reporter.error(line, format!(
                        "Function '{}' at line {} is expecting no return value, but return has a value.",
                        func_name, func_line
                    ));
                }
                let info = self.analyse_expr(value, true);
                if !info.known() {
                    return;
                }
                if info.is_array {
                    self.reporter.error(line, String::from("Cannot return an array."));
                }
                if func_type != DataType::Void && info.data_type != func_type {
                    self.reporter.error(line, format!(
                        "Function '{}' at line {} is expecting to return type {} but returns type {}.",
                        func_name, func_line, func_type, info.data_type
                    ));
                }
            }
        }
    }

    // ==========================================================
    // Expressions
    // ==========================================================

    /// Analyses an expression and annotates its node. `check_init` gates the
    /// uninitialized-use warning so assignment targets do not warn on their
    /// own store.
    fn analyse_expr(&mut self, id: NodeId, check_init: bool) -> ExprInfo {
        match self.ast.node(id).kind {
            kind if kind.is_constant() => {
                let node = self.ast.node(id);
                ExprInfo {
                    data_type: node.data_type,
                    is_array: node.is_array,
                    decl: None,
                }
            }
            NodeKind::Id => self.resolve_identifier(id, check_init),
            NodeKind::ArrIndex => self.analyse_array_index(id, check_init),
            NodeKind::Call => self.analyse_call(id),
            NodeKind::Assign => self.analyse_assign(id),
            NodeKind::BinOp => self.analyse_binop(id),
            NodeKind::And | NodeKind::Or => self.analyse_bool_binop(id),
            NodeKind::Not => self.analyse_unary(id, DataType::Bool),
            NodeKind::ChSign | NodeKind::Ques => self.analyse_unary(id, DataType::Int),
            NodeKind::SizeOf => self.analyse_sizeof(id),
            _ => ExprInfo::unknown(),
        }
    }

    /// Looks up an identifier innermost-out, copies the declaration's type
    /// facts onto the use site and tracks use and initialization. Warns once
    /// per declaration about reads before any write.
    fn resolve_identifier(&mut self, id: NodeId, check_init: bool) -> ExprInfo {
        let name = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let decl = match self.table.lookup(&name) {
            Some(decl) => decl,
            None => {
                self.reporter.error(line, format!("Symbol '{}' is not declared.", name));
                return ExprInfo::unknown();
            }
        };

        let (data_type, is_array, is_static) = {
            let node = self.ast.node(decl);
            (node.data_type, node.is_array, node.is_static)
        };
        {
            let node = self.ast.node_mut(id);
            node.data_type = data_type;
            node.is_array = is_array;
            node.is_static = is_static;
        }

        self.ast.node_mut(decl).is_used = true;
        if check_init {
            if !self.ast.node(decl).is_init {
                self.reporter.warning(line, format!("Variable '{}' may be uninitialized when used here.", name));
            }
            // Warn-once policy: any read settles the flag
            self.ast.node_mut(decl).is_init = true;
        }

        ExprInfo {
            data_type,
            is_array,
            decl: Some(decl),
        }
    }

    fn analyse_array_index(&mut self, id: NodeId, check_init: bool) -> ExprInfo {
        let line = self.ast.node(id).line;
        let base = match self.ast.child(id, 0) {
            Some(base) => base,
            None => return ExprInfo::unknown(),
        };
        let base_name = self.ast.node(base).literal.clone();
        let base_info = self.resolve_identifier(base, check_init);

        match base_info.decl {
            None => {
                self.reporter.error(line, format!("Cannot index nonarray '{}'.", base_name));
            }
            Some(decl) => {
                if self.ast.node(decl).kind == NodeKind::Func {
                    self.reporter.error(line, format!("Cannot use function '{}' as a variable.", base_name));
                } else if !self.ast.node(decl).is_array {
                    self.reporter.error(line, format!("Cannot index nonarray '{}'.", base_name));
                }
            }
        }

        if let Some(index) = self.ast.child(id, 1) {
            let index_name = self.ast.node(index).literal.clone();
            let index_info = self.analyse_expr(index, true);
            if index_info.known() {
                if index_info.data_type != DataType::Int {
                    self.reporter.error(line, format!(
                        "Array '{}' should be indexed by type int but got type {}.",
                        base_name, index_info.data_type
                    ));
                }
                if index_info.is_array {
                    self.reporter.error(line, format!("Array index is the unindexed array '{}'.", index_name));
                }
            }
        }

        self.ast.node_mut(id).data_type = base_info.data_type;
        ExprInfo {
            data_type: base_info.data_type,
            // An indexed array reads as a scalar element
            is_array: false,
            decl: base_info.decl,
        }
    }

    fn analyse_call(&mut self, id: NodeId) -> ExprInfo {
        let name = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let function = match self.table.lookup_global(&name) {
            Some(function) => function,
            None => {
                if self.table.lookup(&name).is_some() {
                    self.reporter.error(line, format!("'{}' is a simple variable and cannot be called.", name));
                } else {
                    self.reporter.error(line, format!("Symbol '{}' is not declared.", name));
                }
                return ExprInfo::unknown();
            }
        };
        if self.ast.node(function).kind != NodeKind::Func {
            self.reporter.error(line, format!("'{}' is a simple variable and cannot be called.", name));
            return ExprInfo::unknown();
        }

        self.ast.node_mut(function).is_used = true;
        let return_type = self.ast.node(function).data_type;
        self.ast.node_mut(id).data_type = return_type;

        let arguments: Vec<NodeId> = self.ast.siblings(self.ast.child(id, 0)).collect();
        let mut argument_info = vec![];
        for argument in &arguments {
            let info = self.analyse_expr(*argument, true);
            if let Some(decl) = info.decl {
                if self.ast.node(decl).kind == NodeKind::Func {
                    let decl_name = self.ast.node(decl).literal.clone();
                    self.reporter.error(line, format!("Cannot use function '{}' as a variable.", decl_name));
                }
            }
            argument_info.push(info);
        }

        let parameters = self.ast.node(function).parameters.clone();
        let declared = self.ast.node(function).line;
        if argument_info.len() > parameters.len() {
            self.reporter.error(line, format!(
                "Too many parameters passed for function '{}' declared on line {}.",
                name, declared
            ));
        } else if argument_info.len() < parameters.len() {
            self.reporter.error(line, format!(
                "Too few parameters passed for function '{}' declared on line {}.",
                name, declared
            ));
        }

        for (position, (parameter, info)) in parameters.iter().zip(argument_info.iter()).enumerate() {
            if !info.known() {
                continue;
            }
            let parm = self.ast.node(*parameter);
            if parm.data_type != info.data_type {
                self.reporter.error(line, format!(
                    "Expecting type {} in parameter {} of call to '{}' declared on line {} but got type {}.",
                    parm.data_type, position + 1, name, declared, info.data_type
                ));
            }
            if info.is_array && !parm.is_array {
                self.reporter.error(line, format!(
                    "Not expecting array in parameter {} of call to '{}' declared on line {}.",
                    position + 1, name, declared
                ));
            }
            if !info.is_array && parm.is_array {
                self.reporter.error(line, format!(
                    "Expecting array in parameter {} of call to '{}' declared on line {}.",
                    position + 1, name, declared
                ));
            }
        }

        ExprInfo {
            data_type: return_type,
            is_array: false,
            decl: Some(function),
        }
    }

    fn analyse_assign(&mut self, id: NodeId) -> ExprInfo {
        let token = self.ast.node(id).token;
        let literal = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let lhs = match self.ast.child(id, 0) {
            Some(lhs) => lhs,
            None => return ExprInfo::unknown(),
        };

        if matches!(token, TokenClass::Inc | TokenClass::Dec) {
            let info = self.analyse_expr(lhs, true);
            if info.known() {
                if info.is_array {
                    self.reporter.error(line, format!("The operation '{}' does not work with arrays.", literal));
                }
                if info.data_type != DataType::Int {
                    self.reporter.error(line, format!(
                        "Unary '{}' requires an operand of type int but was given type {}.",
                        literal, info.data_type
                    ));
                }
            }
            if let Some(decl) = info.decl {
                self.ast.node_mut(decl).is_init = true;
            }
            self.ast.node_mut(id).data_type = DataType::Int;
            return ExprInfo::of(DataType::Int);
        }

        // The target resolves without the uninitialized check; this store is
        // what initializes it. Compound assignments read the target too but
        // follow the original in not warning for it.
        let lhs_info = self.analyse_expr(lhs, false);
        if let Some(decl) = lhs_info.decl {
            if self.ast.node(decl).kind == NodeKind::Func {
                let decl_name = self.ast.node(decl).literal.clone();
                self.reporter.error(line, format!("Cannot use function '{}' as a variable.", decl_name));
            }
        }

        let rhs_info = match self.ast.child(id, 1) {
            Some(rhs) => self.analyse_expr(rhs, true),
            None => ExprInfo::unknown(),
        };

        if token == TokenClass::Asgn {
            if lhs_info.known() && rhs_info.known() {
                if lhs_info.is_array && !rhs_info.is_array {
                    self.reporter.error(line, format!(
                        "'{}' requires both operands be arrays or not but lhs is an array and rhs is not an array.",
                        literal
                    ));
                }
                if !lhs_info.is_array && rhs_info.is_array {
                    self.reporter.error(line, format!(
                        "'{}' requires both operands be arrays or not but lhs is not an array and rhs is an array.",
                        literal
                    ));
                }
                if lhs_info.data_type != rhs_info.data_type {
                    self.reporter.error(line, format!(
                        "'{}' requires operands of the same type but lhs is type {} and rhs is type {}.",
                        literal, lhs_info.data_type, rhs_info.data_type
                    ));
                }
            }
        } else {
            // +=, -=, *=, /= work on ints only
            if lhs_info.known() && lhs_info.data_type != DataType::Int {
                self.reporter.error(line, format!(
                    "'{}' requires operands of type int but lhs is of type {}.",
                    literal, lhs_info.data_type
                ));
            }
            if rhs_info.known() && rhs_info.data_type != DataType::Int {
                self.reporter.error(line, format!(
                    "'{}' requires operands of type int but rhs is of type {}.",
                    literal, rhs_info.data_type
                ));
            }
        }

        if let Some(decl) = lhs_info.decl {
            self.ast.node_mut(decl).is_init = true;
        }
        self.ast.node_mut(id).data_type = lhs_info.data_type;
        lhs_info
    }

    fn analyse_binop(&mut self, id: NodeId) -> ExprInfo {
        let token = self.ast.node(id).token;
        let literal = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let lhs_info = match self.ast.child(id, 0) {
            Some(lhs) => self.analyse_expr(lhs, true),
            None => ExprInfo::unknown(),
        };
        let rhs_info = match self.ast.child(id, 1) {
            Some(rhs) => self.analyse_expr(rhs, true),
            None => ExprInfo::unknown(),
        };

        if token.is_relational() {
            if lhs_info.known() && rhs_info.known() {
                if lhs_info.data_type != rhs_info.data_type {
                    self.reporter.error(line, format!(
                        "'{}' requires operands of the same type but lhs is type {} and rhs is type {}.",
                        literal, lhs_info.data_type, rhs_info.data_type
                    ));
                }
                if lhs_info.is_array && !rhs_info.is_array {
                    self.reporter.error(line, format!(
                        "'{}' requires both operands be arrays or not but lhs is an array and rhs is not an array.",
                        literal
                    ));
                }
                if !lhs_info.is_array && rhs_info.is_array {
                    self.reporter.error(line, format!(
                        "'{}' requires both operands be arrays or not but lhs is not an array and rhs is an array.",
                        literal
                    ));
                }
            }
            self.ast.node_mut(id).data_type = DataType::Bool;
            return ExprInfo::of(DataType::Bool);
        }

        if token.is_arithmetic() {
            if lhs_info.known() && lhs_info.data_type != DataType::Int {
                self.reporter.error(line, format!(
                    "'{}' requires operands of type int but lhs is of type {}.",
                    literal, lhs_info.data_type
                ));
            }
            if rhs_info.known() && rhs_info.data_type != DataType::Int {
                self.reporter.error(line, format!(
                    "'{}' requires operands of type int but rhs is of type {}.",
                    literal, rhs_info.data_type
                ));
            }
            if lhs_info.is_array || rhs_info.is_array {
                self.reporter.error(line, format!("The operation '{}' does not work with arrays.", literal));
            }
        }

        self.ast.node_mut(id).data_type = DataType::Int;
        ExprInfo::of(DataType::Int)
    }

    fn analyse_bool_binop(&mut self, id: NodeId) -> ExprInfo {
        let literal = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let lhs_info = match self.ast.child(id, 0) {
            Some(lhs) => self.analyse_expr(lhs, true),
            None => ExprInfo::unknown(),
        };
        let rhs_info = match self.ast.child(id, 1) {
            Some(rhs) => self.analyse_expr(rhs, true),
            None => ExprInfo::unknown(),
        };

        if lhs_info.known() && lhs_info.data_type != DataType::Bool {
            self.reporter.error(line, format!(
                "'{}' requires operands of type bool but lhs is of type {}.",
                literal, lhs_info.data_type
            ));
        }
        if rhs_info.known() && rhs_info.data_type != DataType::Bool {
            self.reporter.error(line, format!(
                "'{}' requires operands of type bool but rhs is of type {}.",
                literal, rhs_info.data_type
            ));
        }
        if lhs_info.is_array || rhs_info.is_array {
            self.reporter.error(line, format!("The operation '{}' does not work with arrays.", literal));
        }

        self.ast.node_mut(id).data_type = DataType::Bool;
        ExprInfo::of(DataType::Bool)
    }

    fn analyse_unary(&mut self, id: NodeId, required: DataType) -> ExprInfo {
        let literal = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let info = match self.ast.child(id, 0) {
            Some(operand) => self.analyse_expr(operand, true),
            None => ExprInfo::unknown(),
        };
        if info.known() {
            if info.is_array {
                self.reporter.error(line, format!("The operation '{}' does not work with arrays.", literal));
            }
            if info.data_type != required {
                self.reporter.error(line, format!(
                    "Unary '{}' requires an operand of type {} but was given type {}.",
                    literal, required, info.data_type
                ));
            }
        }

        self.ast.node_mut(id).data_type = required;
        ExprInfo::of(required)
    }

    fn analyse_sizeof(&mut self, id: NodeId) -> ExprInfo {
        let literal = self.ast.node(id).literal.clone();
        let line = self.ast.node(id).line;

        let info = match self.ast.child(id, 0) {
            Some(operand) => self.analyse_expr(operand, true),
            None => ExprInfo::unknown(),
        };
        if info.known() && !info.is_array {
            self.reporter.error(line, format!("The operation '{}' only works with arrays.", literal));
        }

        self.ast.node_mut(id).data_type = DataType::Int;
        ExprInfo::of(DataType::Int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{AstParser, PestCMinusParser};
    use crate::compiler::semantic_analyser::routine_library::synthesize_routines;

    fn analyse_source(source: &str) -> Reporter {
        let mut ast = Ast::new();
        let mut reporter = Reporter::new();
        PestCMinusParser::default().parse(source, &mut ast, &mut reporter).unwrap();
        let routines = synthesize_routines(&mut ast);
        analyse(&mut ast, routines, &mut reporter);
        reporter
    }

    #[test]
    fn test_clean_program_has_no_diagnostics() {
        let reporter = analyse_source("int main() { return 0; }");
        assert_eq!(reporter.warnings(), 0);
        assert_eq!(reporter.errors(), 0);
    }

    #[test]
    fn test_missing_main_is_a_linker_error() {
        let reporter = analyse_source("int f() { return 0; }");
        assert_eq!(reporter.errors(), 1);
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(LINKER): A function named 'main' with no parameters must be defined."));
    }

    #[test]
    fn test_main_with_parameters_does_not_count() {
        let reporter = analyse_source("int main(int x) { return x; }");
        assert!(reporter.messages().iter().any(|m| m.contains("ERROR(LINKER)")));
    }

    #[test]
    fn test_uninitialized_use_warns_once() {
        let reporter = analyse_source("int main() { int x; output(x); output(x); }");
        assert_eq!(reporter.errors(), 0);
        let warned: Vec<&String> = reporter.messages().iter()
            .filter(|m| m.contains("may be uninitialized"))
            .collect();
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0], "WARNING(1): Variable 'x' may be uninitialized when used here.");
    }

    #[test]
    fn test_initializer_suppresses_uninitialized_warning() {
        let reporter = analyse_source("int main() { int x : 3; output(x); }");
        assert_eq!(reporter.warnings(), 0);
        assert_eq!(reporter.errors(), 0);
    }

    #[test]
    fn test_duplicate_declaration() {
        let reporter = analyse_source("int x;\nbool x;\nint main() { x <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Symbol 'x' is already declared at line 1."));
    }

    #[test]
    fn test_undeclared_symbol() {
        let reporter = analyse_source("int main() { y <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Symbol 'y' is not declared."));
    }

    #[test]
    fn test_array_assignment_mismatch_message() {
        let reporter = analyse_source("int a[3]; int b; int main() { a <= b; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): '<=' requires both operands be arrays or not but lhs is an array and rhs is not an array."));
    }

    #[test]
    fn test_operator_type_mismatch() {
        let reporter = analyse_source("int main() { bool p; p <= true; if p + 1 = 2 then ; }");
        assert!(reporter.messages().iter().any(|m|
            m.contains("'+' requires operands of type int but lhs is of type bool.")));
    }

    #[test]
    fn test_condition_must_be_bool() {
        let reporter = analyse_source("int main() { int x; x <= 1; while x do x--; }");
        assert!(reporter.messages().iter().any(|m|
            m.contains("Expecting Boolean test condition in while statement but got type int.")));
    }

    #[test]
    fn test_call_arity_and_types() {
        let source = "int f(int a; bool b) { return a; }\nint main() { f(1); f(1, 2); f(1, true, 3); }";
        let reporter = analyse_source(source);
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Too few parameters passed for function 'f' declared on line 1."));
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Expecting type bool in parameter 2 of call to 'f' declared on line 1 but got type int."));
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Too many parameters passed for function 'f' declared on line 1."));
    }

    #[test]
    fn test_calling_a_simple_variable() {
        let reporter = analyse_source("int x;\nint main() { x(); }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): 'x' is a simple variable and cannot be called."));
    }

    #[test]
    fn test_io_routines_are_predeclared() {
        let source = "int main() { output(input()); outputb(inputb()); outputc(inputc()); outnl(); }";
        let reporter = analyse_source(source);
        assert_eq!(reporter.errors(), 0);
    }

    #[test]
    fn test_output_argument_type_checked_against_dummy() {
        let reporter = analyse_source("int main() { output(true); }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Expecting type int in parameter 1 of call to 'output' declared on line -1 but got type bool."));
    }

    #[test]
    fn test_break_outside_loop_is_an_error() {
        let reporter = analyse_source("bool p;\nint main() { p <= true; if p then break; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Cannot have a break statement outside of loop."));
    }

    #[test]
    fn test_break_inside_loop_is_fine() {
        let reporter = analyse_source("int main() { while true do break; }");
        assert_eq!(reporter.errors(), 0);
    }

    #[test]
    fn test_return_conformance() {
        let source = "int f() { return true; }\nvoidish() { return; }\nint main() { f(); }";
        let reporter = analyse_source(source);
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Function 'f' at line 1 is expecting to return type int but returns type bool."));
    }

    #[test]
    fn test_return_value_from_void_function() {
        let reporter = analyse_source("g() { return 1; }\nint main() { g(); }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Function 'g' at line 1 is expecting no return value, but return has a value."));
    }

    #[test]
    fn test_missing_return_warns() {
        let reporter = analyse_source("int f() { }\nint main() { f(); return 0; }");
        assert!(reporter.messages().iter().any(|m|
            m == "WARNING(1): Expecting to return type int but function 'f' has no return statement."));
    }

    #[test]
    fn test_unused_reporting() {
        let reporter = analyse_source("int g;\nint f(int p) { return 1; }\nint main() { return f(2); }");
        assert!(reporter.messages().iter().any(|m|
            m == "WARNING(2): The parameter 'p' seems not to be used."));
        assert!(reporter.messages().iter().any(|m|
            m == "WARNING(1): The variable 'g' seems not to be used."));
    }

    #[test]
    fn test_sizeof_requires_array() {
        let reporter = analyse_source("int main() { int x; x <= 1; x <= *x; }");
        assert!(reporter.messages().iter().any(|m|
            m.contains("The operation '*' only works with arrays.")));
    }

    #[test]
    fn test_indexing_nonarray() {
        let reporter = analyse_source("int main() { int x; x[0] <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Cannot index nonarray 'x'."));
    }

    #[test]
    fn test_index_type_checked() {
        let reporter = analyse_source("int a[4];\nint main() { a[true] <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Array 'a' should be indexed by type int but got type bool."));
    }

    #[test]
    fn test_initializer_must_be_constant() {
        let reporter = analyse_source("int y;\nint x : y;\nint main() { x <= 1; y <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Initializer for variable 'x' is not a constant expression."));
    }

    #[test]
    fn test_initializer_type_mismatch() {
        let reporter = analyse_source("int x : true;\nint main() { x <= 1; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(1): Initializer for variable 'x' of type int is of type bool."));
    }

    #[test]
    fn test_for_range_checks() {
        let reporter = analyse_source("int a[3];\nint main() { for i = a to 10 do i; }");
        assert!(reporter.messages().iter().any(|m|
            m == "ERROR(2): Cannot use array in position 1 in range of for statement."));
    }

    #[test]
    fn test_static_local_counts_as_initialized() {
        let reporter = analyse_source("int main() { static int x; output(x); }");
        assert!(!reporter.messages().iter().any(|m| m.contains("may be uninitialized")));
    }
}
