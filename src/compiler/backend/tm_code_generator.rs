use super::BackEndGenerator;
use super::TmCodeBuilder;

use super::super::ast::{
    Ast,
    DataType,
    Literal,
    NodeId,
    NodeKind,
    SymbolTable,
    TokenClass,
};
use super::super::program_code::{
    ProgramCode,
    Register,
    Register::{AC, AC1, AC2, AC3, FP, GP, PC, RET},
    RmOp::{JMP, JNZ, JZR, LD, LDA, LDC, ST},
    RoOp,
};

const DIVIDER: &str = "** ** ** ** ** ** ** ** ** ** ** **";

/// TmCodeGenerator is the backend for the TM target.
/// It walks the analysed, laid-out AST and emits TM instructions.
///
/// # Implementation Details
///   + Frames grow downward from FP. Slot 0 holds the caller's frame
///     pointer, slot -1 the return address, parameters follow, then the
///     block locals, then anonymous temporaries tracked by `toffset`.
///   + A call builds a ghost frame at the current `toffset`: the caller
///     stores its FP there, pushes the arguments below it, then activates
///     the ghost frame with a single LDA into FP.
///   + Forward jumps reserve a slot with the builder and are patched once
///     the landing address is known.
pub struct TmCodeGenerator {
    builder: TmCodeBuilder,
    table: SymbolTable,

    toffset: i32,
    goffset: i32,
    address_of_main: usize,
    loops: Vec<NodeId>,
}

impl BackEndGenerator for TmCodeGenerator {
    /// Creates a default configuration of TmCodeGenerator
    fn default() -> Self {
        Self {
            builder: TmCodeBuilder::new(),
            table: SymbolTable::new(),
            toffset: 0,
            goffset: 0,
            address_of_main: 0,
            loops: vec![],
        }
    }

    /// Generates ProgramCode for the program: the I/O routine bodies first,
    /// then every user function in source order, then the init section that
    /// address 0 is patched to jump to.
    fn generate(mut self, ast: &mut Ast, routines: NodeId, goffset: i32) -> ProgramCode {
        self.goffset = goffset;

        // Address 0 becomes the jump into the init section
        self.builder.emit_skip(1);
        self.generate_io_routines(ast, routines);

        let top_level: Vec<NodeId> = ast.siblings(ast.root()).collect();
        for declaration in &top_level {
            let node = ast.node(*declaration);
            if matches!(node.kind, NodeKind::Var | NodeKind::VarArr | NodeKind::Static) {
                let name = node.literal.clone();
                self.table.insert_global(&name, *declaration);
            }
        }
        for declaration in &top_level {
            if ast.node(*declaration).kind == NodeKind::Func {
                self.generate_function(ast, *declaration);
            }
        }

        self.generate_init_section(ast);
        self.builder.finalize()
    }
}

/// Routine library and function scaffolding.
impl TmCodeGenerator {
    fn generate_io_routines(&mut self, ast: &mut Ast, routines: NodeId) {
        let library: Vec<NodeId> = ast.siblings(Some(routines))
            .filter(|id| ast.node(*id).is_lib && ast.node(*id).kind == NodeKind::Func)
            .collect();

        for id in library {
            let name = ast.node(id).literal.clone();
            self.table.insert_global(&name, id);
            ast.node_mut(id).address = self.builder.loc();

            self.builder.comment(String::from(DIVIDER));
            self.builder.comment(format!("FUNCTION {}", name));
            self.builder.emit_rm(ST, AC, -1, FP, String::from("Store return address"));
            match name.as_str() {
                "input" => self.builder.emit_ro(RoOp::IN, RET, RET, RET, String::from("Grab int input")),
                "inputb" => self.builder.emit_ro(RoOp::INB, RET, RET, RET, String::from("Grab bool input")),
                "inputc" => self.builder.emit_ro(RoOp::INC, RET, RET, RET, String::from("Grab char input")),
                "output" => {
                    self.builder.emit_rm(LD, AC, -2, FP, String::from("Load parameter"));
                    self.builder.emit_ro(RoOp::OUT, AC, AC, AC, String::from("Output integer"));
                }
                "outputb" => {
                    self.builder.emit_rm(LD, AC, -2, FP, String::from("Load parameter"));
                    self.builder.emit_ro(RoOp::OUTB, AC, AC, AC, String::from("Output bool"));
                }
                "outputc" => {
                    self.builder.emit_rm(LD, AC, -2, FP, String::from("Load parameter"));
                    self.builder.emit_ro(RoOp::OUTC, AC, AC, AC, String::from("Output char"));
                }
                _ => self.builder.emit_ro(RoOp::OUTNL, AC, AC, AC, String::from("Output a newline")),
            }
            self.builder.emit_rm(LD, AC, -1, FP, String::from("Load return address"));
            self.builder.emit_rm(LD, FP, 0, FP, String::from("Adjust fp"));
            self.builder.emit_rm(JMP, PC, 0, AC, String::from("Return"));
            self.builder.comment(format!("END FUNCTION {}", name));
        }
    }

    fn generate_function(&mut self, ast: &mut Ast, id: NodeId) {
        let name = ast.node(id).literal.clone();
        self.table.insert_global(&name, id);
        self.table.enter(&name);

        let toffset_saved = self.toffset;
        self.toffset = ast.node(id).size;
        ast.node_mut(id).address = self.builder.loc();
        if ast.node(id).is_main {
            self.address_of_main = ast.node(id).address;
        }

        self.builder.comment(String::from(DIVIDER));
        self.builder.comment(format!("FUNCTION {}", name));
        self.builder.comment(format!("TOFF set: {}", self.toffset));
        self.builder.emit_rm(ST, AC, -1, FP, String::from("Store return address"));

        let parms: Vec<NodeId> = ast.siblings(ast.child(id, 0)).collect();
        for parm in parms {
            let parm_name = ast.node(parm).literal.clone();
            self.table.insert(&parm_name, parm);
        }

        if let Some(body) = ast.child(id, 1) {
            if ast.node(body).kind == NodeKind::Compound {
                self.generate_compound(ast, body, false);
            } else {
                self.generate_statement(ast, body);
            }
        }

        self.builder.comment(String::from("Add standard closing in case there is no return statement"));
        self.builder.emit_rm(LDC, RET, 0, AC3, String::from("Set return value to 0"));
        self.builder.emit_rm(LD, AC, -1, FP, String::from("Load return address"));
        self.builder.emit_rm(LD, FP, 0, FP, String::from("Adjust fp"));
        self.builder.emit_rm(JMP, PC, 0, AC, String::from("Return"));

        self.toffset = toffset_saved;
        self.builder.comment(format!("END FUNCTION {}", name));
        self.table.leave();
    }

    fn generate_compound(&mut self, ast: &mut Ast, id: NodeId, new_scope: bool) {
        if new_scope {
            self.table.enter("Compound");
        }
        let toffset_saved = self.toffset;
        self.toffset = ast.node(id).size;
        self.builder.comment(String::from("COMPOUND"));
        self.builder.comment(format!("TOFF set: {}", self.toffset));

        let declarations: Vec<NodeId> = ast.siblings(ast.child(id, 0)).collect();
        for declaration in declarations {
            self.generate_local_declaration(ast, declaration);
        }
        self.builder.comment(String::from("Compound Body"));
        let statements: Vec<NodeId> = ast.siblings(ast.child(id, 1)).collect();
        for statement in statements {
            self.generate_statement(ast, statement);
        }

        self.toffset = toffset_saved;
        self.builder.comment(format!("TOFF set: {}", self.toffset));
        self.builder.comment(String::from("END COMPOUND"));
        if new_scope {
            self.table.leave();
        }
    }

    /// Local declarations allocate no code for the slot itself but store
    /// array sizes and run initializers. Statics are registered into the
    /// global scope (suffixed when the plain name is taken) and handled by
    /// the init section instead.
    fn generate_local_declaration(&mut self, ast: &mut Ast, id: NodeId) {
        let node = ast.node(id);
        let name = node.literal.clone();
        match node.kind {
            NodeKind::Var | NodeKind::VarArr => {
                let is_array = node.is_array;
                let size = node.size;
                let location = node.location;
                self.table.insert(&name, id);

                if is_array {
                    self.builder.emit_rm(LDC, AC, size - 1, AC3, format!("load size of array {}", name));
                    self.builder.emit_rm(ST, AC, location + 1, FP, format!("save size of array {}", name));
                }
                if let Some(initializer) = ast.child(id, 0) {
                    if ast.node(initializer).kind == NodeKind::StringConst {
                        self.generate_string_into(ast, id, initializer);
                    } else {
                        self.generate_expression(ast, initializer);
                        self.store_variable(ast, id);
                    }
                }
            }
            NodeKind::Static => {
                if !self.table.insert_global(&name, id) {
                    let suffixed = format!("{}-ST", name);
                    self.table.insert_global(&suffixed, id);
                }
            }
            _ => {}
        }
    }
}

/// Statement generation.
impl TmCodeGenerator {
    fn generate_statement(&mut self, ast: &mut Ast, id: NodeId) {
        match ast.node(id).kind {
            NodeKind::Compound => self.generate_compound(ast, id, true),
            NodeKind::If => self.generate_if(ast, id),
            NodeKind::While => self.generate_while(ast, id),
            NodeKind::For => self.generate_for(ast, id),
            NodeKind::Return => self.generate_return(ast, id),
            NodeKind::Break => self.generate_break(ast, id),
            NodeKind::Assign => {
                self.builder.comment(String::from("EXPRESSION"));
                self.generate_assignment(ast, id);
            }
            NodeKind::Call => {
                self.builder.comment(String::from("EXPRESSION"));
                self.generate_call(ast, id);
            }
            NodeKind::ArrIndex | NodeKind::SizeOf => {
                self.builder.comment(String::from("EXPRESSION"));
                self.generate_expression(ast, id);
            }
            _ => self.generate_expression(ast, id),
        }
    }

    fn generate_if(&mut self, ast: &mut Ast, id: NodeId) {
        let condition = ast.child(id, 0);
        let then_branch = ast.child(id, 1);
        let else_branch = ast.child(id, 2);

        self.builder.comment(String::from("IF"));
        if let Some(condition) = condition {
            self.generate_expression(ast, condition);
        }
        let around_then = self.builder.emit_skip(1);
        self.builder.comment(String::from("THEN"));
        if let Some(then_branch) = then_branch {
            self.generate_statement(ast, then_branch);
        }

        match else_branch {
            None => {
                let after = self.builder.loc() as i32;
                self.builder.patch_rm(around_then, JZR, AC, after - around_then as i32 - 1, PC,
                                      String::from("Jump around the THEN if false [backpatch]"));
            }
            Some(else_branch) => {
                // The true path lands one past the else-skipping jump
                let after_then = self.builder.loc() as i32;
                self.builder.patch_rm(around_then, JZR, AC, after_then - around_then as i32, PC,
                                      String::from("Jump around the THEN if false [backpatch]"));
                let around_else = self.builder.emit_skip(1);
                self.builder.comment(String::from("ELSE"));
                self.generate_statement(ast, else_branch);
                let after = self.builder.loc() as i32;
                self.builder.patch_rm(around_else, JMP, PC, after - around_else as i32 - 1, PC,
                                      String::from("Jump around the ELSE [backpatch]"));
            }
        }
        self.builder.comment(String::from("END IF"));
    }

    fn generate_while(&mut self, ast: &mut Ast, id: NodeId) {
        self.loops.push(id);
        let loop_top = self.builder.loc() as i32;

        self.builder.comment(String::from("WHILE"));
        if let Some(condition) = ast.child(id, 0) {
            self.generate_expression(ast, condition);
        }
        self.builder.emit_rm(JNZ, AC, 1, PC, String::from("Jump to while part"));
        let exit_slot = self.builder.emit_skip(1);
        ast.node_mut(id).break_address = Some(exit_slot);

        self.builder.comment(String::from("DO"));
        if let Some(body) = ast.child(id, 1) {
            self.generate_statement(ast, body);
        }
        let here = self.builder.loc() as i32;
        self.builder.emit_rm(JMP, PC, loop_top - here - 1, PC, String::from("go to beginning of loop"));

        let after = self.builder.loc() as i32;
        self.builder.patch_rm(exit_slot, JMP, PC, after - exit_slot as i32 - 1, PC,
                              String::from("Jump past loop [backpatch]"));
        self.builder.comment(String::from("END WHILE"));
        self.loops.pop();
    }

    /// A for loop keeps its index, stop and step in the three frame slots
    /// reserved by the layout pass. The step is stored at the loop top and
    /// the back jump re-enters one instruction past that store.
    fn generate_for(&mut self, ast: &mut Ast, id: NodeId) {
        self.loops.push(id);
        self.table.enter("For");

        let slots = ast.child(id, 0).map(|control| {
            let name = ast.node(control).literal.clone();
            self.table.insert(&name, control);
            ast.node(control).location
        }).unwrap_or(self.toffset);

        let toffset_saved = self.toffset;
        self.toffset = ast.node(id).size;
        self.builder.comment(format!("TOFF set: {}", self.toffset));
        self.builder.comment(String::from("FOR"));

        let range = ast.child(id, 1);
        let start = range.and_then(|r| ast.child(r, 0));
        let stop = range.and_then(|r| ast.child(r, 1));
        let step = range.and_then(|r| ast.child(r, 2));

        if let Some(start) = start {
            self.generate_expression(ast, start);
        }
        self.builder.emit_rm(ST, AC, slots, FP, String::from("save starting value in index variable"));
        if let Some(stop) = stop {
            self.generate_expression(ast, stop);
        }
        self.builder.emit_rm(ST, AC, slots - 1, FP, String::from("save stop value"));
        match step {
            Some(step) => self.generate_expression(ast, step),
            None => self.builder.emit_rm(LDC, AC, 1, AC3, String::from("default increment by 1")),
        }

        let loop_top = self.builder.loc() as i32;
        self.builder.emit_rm(ST, AC, slots - 2, FP, String::from("save step value"));
        self.builder.emit_rm(LD, AC1, slots, FP, String::from("loop index"));
        self.builder.emit_rm(LD, AC2, slots - 1, FP, String::from("stop value"));
        self.builder.emit_rm(LD, AC, slots - 2, FP, String::from("step value"));
        self.builder.emit_ro(RoOp::SLT, AC, AC1, AC2, String::from("Op <"));
        self.builder.emit_rm(JNZ, AC, 1, PC, String::from("Jump to loop body"));
        let exit_slot = self.builder.emit_skip(1);
        ast.node_mut(id).break_address = Some(exit_slot);

        if let Some(body) = ast.child(id, 2) {
            self.generate_statement(ast, body);
        }

        self.builder.comment(String::from("Bottom of loop increment and jump"));
        self.builder.emit_rm(LD, AC, slots, FP, String::from("Load index"));
        self.builder.emit_rm(LD, AC2, slots - 2, FP, String::from("Load step"));
        self.builder.emit_ro(RoOp::ADD, AC, AC, AC2, String::from("increment"));
        self.builder.emit_rm(ST, AC, slots, FP, String::from("store back to index"));
        let here = self.builder.loc() as i32;
        // Re-enter one past the step store at the loop top
        self.builder.emit_rm(JMP, PC, loop_top - here, PC, String::from("go to beginning of loop"));

        let after = self.builder.loc() as i32;
        self.builder.patch_rm(exit_slot, JMP, PC, after - exit_slot as i32 - 1, PC,
                              String::from("Jump past loop [backpatch]"));
        self.builder.comment(String::from("END LOOP"));

        self.toffset = toffset_saved;
        self.table.leave();
        self.loops.pop();
    }

    fn generate_break(&mut self, ast: &Ast, _id: NodeId) {
        self.builder.comment(String::from("BREAK"));
        let enclosing = *self.loops.last()
            .unwrap_or_else(|| panic!("Malformed AST! Break statement survived analysis outside a loop."));
        let exit_slot = ast.node(enclosing).break_address
            .unwrap_or_else(|| panic!("Malformed AST! Enclosing loop has no exit slot."));
        let here = self.builder.loc() as i32;
        self.builder.emit_rm(JMP, PC, exit_slot as i32 - here - 1, PC, String::from("break"));
    }

    fn generate_return(&mut self, ast: &mut Ast, id: NodeId) {
        self.builder.comment(String::from("RETURN"));
        if let Some(value) = ast.child(id, 0) {
            self.generate_expression(ast, value);
            self.builder.emit_rm(LDA, RET, 0, AC, String::from("Copy result to return register"));
        }
        self.builder.emit_rm(LD, AC, -1, FP, String::from("Load return address"));
        self.builder.emit_rm(LD, FP, 0, FP, String::from("Adjust fp"));
        self.builder.emit_rm(JMP, PC, 0, AC, String::from("Return"));
    }
}

/// Expression generation. Every expression leaves its value in AC;
/// binary operators park the left side at `toffset` while the right side
/// evaluates.
impl TmCodeGenerator {
    fn generate_expression(&mut self, ast: &mut Ast, id: NodeId) {
        match ast.node(id).kind {
            NodeKind::NumConst | NodeKind::CharConst | NodeKind::BoolConst => {
                let node = ast.node(id);
                let value = node.payload.as_ref().and_then(Literal::scalar_value).unwrap_or(0);
                let comment = match node.kind {
                    NodeKind::NumConst => "Load integer constant",
                    NodeKind::CharConst => "Load char constant",
                    _ => "Load Boolean constant",
                };
                self.builder.emit_rm(LDC, AC, value, AC3, String::from(comment));
            }
            NodeKind::StringConst => {
                let location = ast.node(id).location;
                let text = match ast.node(id).payload {
                    Some(Literal::Str(ref text)) => text.clone(),
                    _ => String::new(),
                };
                self.builder.emit_str_lit(location, &text);
                self.builder.emit_rm(LDA, AC, location, GP, String::from("Load address of char array"));
            }
            NodeKind::Id => self.load_identifier(ast, id),
            NodeKind::ArrIndex => self.load_array_element(ast, id),
            NodeKind::Call => self.generate_call(ast, id),
            NodeKind::Assign => self.generate_assignment(ast, id),
            NodeKind::BinOp => self.generate_op(ast, id),
            NodeKind::And | NodeKind::Or => self.generate_and_or(ast, id),
            NodeKind::Not => self.generate_not(ast, id),
            NodeKind::ChSign => self.generate_chsign(ast, id),
            NodeKind::Ques => self.generate_ques(ast, id),
            NodeKind::SizeOf => self.generate_sizeof(ast, id),
            kind => panic!("Malformed AST! Node {:?} should not be directly generated.", kind),
        }
    }

    /// Resolves an identifier use to its declaration in the generation
    /// scope stack. A use that resolved to a static declaration during
    /// analysis tries the suffixed global slot first, so a static local
    /// never collides with a plain global of the same name.
    fn fetch_symbol(&self, ast: &Ast, id: NodeId) -> NodeId {
        let node = ast.node(id);
        let name = &node.literal;
        let resolved = if node.is_static {
            let suffixed = format!("{}-ST", name);
            self.table.lookup(&suffixed).or_else(|| self.table.lookup(name))
        } else {
            self.table.lookup(name)
        };
        resolved.unwrap_or_else(|| panic!("Malformed AST! Identifier '{}' has no declaration.", name))
    }

    fn load_identifier(&mut self, ast: &mut Ast, id: NodeId) {
        let decl = self.fetch_symbol(ast, id);
        let node = ast.node(decl);
        let name = node.literal.clone();
        let location = node.location;
        let base = node.ref_type.base_register();

        if node.is_array {
            if node.kind == NodeKind::ParmArr {
                self.builder.emit_rm(LD, AC, location, base, format!("Load address of base of array {}", name));
            } else {
                self.builder.emit_rm(LDA, AC, location, base, format!("Load address of base of array {}", name));
            }
        } else {
            self.builder.emit_rm(LD, AC, location, base, format!("Load variable {}", name));
        }
    }

    /// Loads the base address of an array declaration; parameter arrays
    /// already hold a base address and load with LD instead of LDA.
    fn load_array_base(&mut self, ast: &Ast, decl: NodeId, target: Register) {
        let node = ast.node(decl);
        let name = node.literal.clone();
        let location = node.location;
        let base = node.ref_type.base_register();
        if node.kind == NodeKind::ParmArr {
            self.builder.emit_rm(LD, target, location, base, format!("Load address of base of array {}", name));
        } else {
            self.builder.emit_rm(LDA, target, location, base, format!("Load address of base of array {}", name));
        }
    }

    fn load_array_element(&mut self, ast: &mut Ast, id: NodeId) {
        let base = ast.child(id, 0).unwrap_or_else(|| panic!("Malformed AST! Array access without a base."));
        let index = ast.child(id, 1);
        let decl = self.fetch_symbol(ast, base);

        self.load_array_base(ast, decl, AC);
        self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push left side"));
        self.toffset -= 1;
        self.builder.comment(format!("TOFF dec: {}", self.toffset));
        if let Some(index) = index {
            self.generate_expression(ast, index);
        }
        self.toffset += 1;
        self.builder.comment(format!("TOFF inc: {}", self.toffset));
        self.builder.emit_rm(LD, AC1, self.toffset, FP, String::from("Pop left into ac1"));
        // Arrays grow downward from their base
        self.builder.emit_ro(RoOp::SUB, AC, AC1, AC, String::from("compute location from index"));
        self.builder.emit_rm(LD, AC, 0, AC, String::from("Load array element"));
    }

    fn generate_op(&mut self, ast: &mut Ast, id: NodeId) {
        let lhs = ast.child(id, 0);
        let rhs = ast.child(id, 1);

        if let Some(lhs) = lhs {
            self.generate_expression(ast, lhs);
        }
        self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push left side"));
        self.toffset -= 1;
        self.builder.comment(format!("TOFF dec: {}", self.toffset));
        if let Some(rhs) = rhs {
            self.generate_expression(ast, rhs);
        }
        self.toffset += 1;
        self.builder.comment(format!("TOFF inc: {}", self.toffset));
        self.builder.emit_rm(LD, AC1, self.toffset, FP, String::from("Pop left into ac1"));

        // Char arrays compare element-wise over the smaller length
        let char_array_compare = rhs
            .map(|rhs| ast.node(rhs).is_array && ast.node(rhs).data_type == DataType::Char)
            .unwrap_or(false);
        if char_array_compare {
            self.builder.emit_rm(LD, AC2, 1, AC, String::from("AC2 <- |RHS|"));
            self.builder.emit_rm(LD, AC3, 1, AC1, String::from("AC3 <- |LHS|"));
            self.builder.emit_rm(LDA, RET, 0, AC2, String::from("R2 <- |RHS|"));
            self.builder.emit_ro(RoOp::SWP, AC2, AC3, AC3, String::from("pick smallest size"));
            self.builder.emit_rm(LD, AC3, 1, AC1, String::from("AC3 <- |LHS|"));
            self.builder.emit_ro(RoOp::CO, AC1, AC, AC2, String::from("setup array compare  LHS vs RHS"));
            self.builder.emit_ro(RoOp::TNE, AC2, AC1, AC, String::from("if not equal then test (AC1, AC)"));
            self.builder.emit_rm(JNZ, AC2, 2, PC, String::from("jump not equal"));
            self.builder.emit_rm(LDA, AC, 0, RET, String::from("AC1 <- |RHS|"));
            self.builder.emit_rm(LDA, AC1, 0, AC3, String::from("AC <- |LHS|"));
        }

        let literal = ast.node(id).literal.clone();
        let op = match ast.node(id).token {
            TokenClass::Mul => RoOp::MUL,
            TokenClass::Add => RoOp::ADD,
            TokenClass::Sub => RoOp::SUB,
            TokenClass::Div => RoOp::DIV,
            TokenClass::Mod => RoOp::MOD,
            TokenClass::Eq => RoOp::TEQ,
            TokenClass::Neq => RoOp::TNE,
            TokenClass::Lt => RoOp::TLT,
            TokenClass::Leq => RoOp::TLE,
            TokenClass::Gt => RoOp::TGT,
            TokenClass::Geq => RoOp::TGE,
            token => panic!("Malformed AST! Token {:?} is not a binary operator.", token),
        };
        self.builder.emit_ro(op, AC, AC1, AC, format!("Op {}", literal));
    }

    fn generate_and_or(&mut self, ast: &mut Ast, id: NodeId) {
        let lhs = ast.child(id, 0);
        let rhs = ast.child(id, 1);

        if let Some(lhs) = lhs {
            self.generate_expression(ast, lhs);
        }
        self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push left side"));
        self.toffset -= 1;
        self.builder.comment(format!("TOFF dec: {}", self.toffset));
        if let Some(rhs) = rhs {
            self.generate_expression(ast, rhs);
        }
        self.toffset += 1;
        self.builder.comment(format!("TOFF inc: {}", self.toffset));
        self.builder.emit_rm(LD, AC1, self.toffset, FP, String::from("Pop left into ac1"));

        if ast.node(id).kind == NodeKind::Or {
            self.builder.emit_ro(RoOp::OR, AC, AC1, AC, String::from("Op OR"));
        } else {
            self.builder.emit_ro(RoOp::AND, AC, AC1, AC, String::from("Op AND"));
        }
    }

    fn generate_not(&mut self, ast: &mut Ast, id: NodeId) {
        if let Some(operand) = ast.child(id, 0) {
            self.generate_expression(ast, operand);
        }
        self.builder.emit_rm(LDC, AC1, 1, AC3, String::from("Load 1"));
        self.builder.emit_ro(RoOp::XOR, AC, AC, AC1, String::from("Op XOR to get logical not"));
    }

    fn generate_chsign(&mut self, ast: &mut Ast, id: NodeId) {
        if let Some(operand) = ast.child(id, 0) {
            self.generate_expression(ast, operand);
        }
        self.builder.emit_ro(RoOp::NEG, AC, AC, AC, String::from("Op unary -"));
    }

    fn generate_ques(&mut self, ast: &mut Ast, id: NodeId) {
        if let Some(operand) = ast.child(id, 0) {
            self.generate_expression(ast, operand);
        }
        self.builder.emit_ro(RoOp::RND, AC, AC, AC3, String::from("Op ?"));
    }

    fn generate_sizeof(&mut self, ast: &mut Ast, id: NodeId) {
        if let Some(operand) = ast.child(id, 0) {
            if ast.node(operand).kind == NodeKind::Id {
                let decl = self.fetch_symbol(ast, operand);
                self.load_array_base(ast, decl, AC);
            } else {
                self.generate_expression(ast, operand);
            }
        }
        self.builder.emit_rm(LD, AC, 1, AC, String::from("Load array size"));
    }

    fn generate_assignment(&mut self, ast: &mut Ast, id: NodeId) {
        let token = ast.node(id).token;
        let lhs = ast.child(id, 0).unwrap_or_else(|| panic!("Malformed AST! Assignment without a target."));
        let rhs = ast.child(id, 1);

        match token {
            TokenClass::Asgn => self.generate_plain_assignment(ast, id, lhs, rhs),
            TokenClass::Inc | TokenClass::Dec => self.generate_step_assignment(ast, id, lhs),
            _ => self.generate_compound_assignment(ast, id, lhs, rhs),
        }
    }

    fn generate_plain_assignment(&mut self, ast: &mut Ast, _id: NodeId, lhs: NodeId, rhs: Option<NodeId>) {
        if ast.node(lhs).kind == NodeKind::ArrIndex {
            let index = ast.child(lhs, 1);
            if let Some(index) = index {
                self.generate_expression(ast, index);
            }
            self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push index"));
            self.toffset -= 1;
            self.builder.comment(format!("TOFF dec: {}", self.toffset));
            if let Some(rhs) = rhs {
                self.generate_expression(ast, rhs);
            }
            self.toffset += 1;
            self.builder.comment(format!("TOFF inc: {}", self.toffset));
            self.builder.emit_rm(LD, AC1, self.toffset, FP, String::from("Pop index"));

            let base = ast.child(lhs, 0).unwrap_or_else(|| panic!("Malformed AST! Array access without a base."));
            let decl = self.fetch_symbol(ast, base);
            let name = ast.node(decl).literal.clone();
            self.load_array_base(ast, decl, AC2);
            self.builder.emit_ro(RoOp::SUB, AC2, AC2, AC1, String::from("Compute offset of value"));
            self.builder.emit_rm(ST, AC, 0, AC2, format!("Store variable {}", name));
            return;
        }

        // Whole-variable target
        if let Some(rhs) = rhs {
            if ast.node(rhs).kind == NodeKind::StringConst {
                let decl = self.fetch_symbol(ast, lhs);
                self.generate_string_into(ast, decl, rhs);
                return;
            }
            self.generate_expression(ast, rhs);
            if ast.node(rhs).kind == NodeKind::Id && ast.node(rhs).is_array {
                self.generate_array_copy(ast, lhs);
                return;
            }
        }
        self.store_variable(ast, lhs);
    }

    /// Array-to-array assignment copies the smaller of the two lengths.
    fn generate_array_copy(&mut self, ast: &mut Ast, lhs: NodeId) {
        let decl = self.fetch_symbol(ast, lhs);
        let location = ast.node(decl).location;
        let base = ast.node(decl).ref_type.base_register();
        self.builder.emit_rm(LDA, AC1, location, base, String::from("address of lhs"));
        self.builder.emit_rm(LD, AC2, 1, AC, String::from("size of rhs"));
        self.builder.emit_rm(LD, AC3, 1, AC1, String::from("size of lhs"));
        self.builder.emit_ro(RoOp::SWP, AC2, AC3, AC3, String::from("pick smallest size"));
        self.builder.emit_ro(RoOp::MOV, AC1, AC, AC2, String::from("array op ="));
    }

    fn generate_compound_assignment(&mut self, ast: &mut Ast, id: NodeId, lhs: NodeId, rhs: Option<NodeId>) {
        let (op, message) = match ast.node(id).token {
            TokenClass::AddAsgn => (RoOp::ADD, "op +="),
            TokenClass::SubAsgn => (RoOp::SUB, "op -="),
            TokenClass::MulAsgn => (RoOp::MUL, "op *="),
            _ => (RoOp::DIV, "op /="),
        };

        if ast.node(lhs).kind == NodeKind::ArrIndex {
            let index = ast.child(lhs, 1);
            if let Some(index) = index {
                self.generate_expression(ast, index);
            }
            self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push index"));
            self.toffset -= 1;
            self.builder.comment(format!("TOFF dec: {}", self.toffset));
            if let Some(rhs) = rhs {
                self.generate_expression(ast, rhs);
            }
            self.toffset += 1;
            self.builder.comment(format!("TOFF inc: {}", self.toffset));
            self.builder.emit_rm(LD, AC1, self.toffset, FP, String::from("Pop index"));

            let array_base = ast.child(lhs, 0).unwrap_or_else(|| panic!("Malformed AST! Array access without a base."));
            let decl = self.fetch_symbol(ast, array_base);
            let name = ast.node(decl).literal.clone();
            self.load_array_base(ast, decl, AC2);
            self.builder.emit_ro(RoOp::SUB, AC2, AC2, AC1, String::from("Compute offset of value"));
            self.builder.emit_rm(LD, AC1, 0, AC2, format!("load lhs variable {}", name));
            self.builder.emit_ro(op, AC, AC1, AC, String::from(message));
            self.builder.emit_rm(ST, AC, 0, AC2, format!("Store variable {}", name));
            return;
        }

        if let Some(rhs) = rhs {
            self.generate_expression(ast, rhs);
        }
        let decl = self.fetch_symbol(ast, lhs);
        let name = ast.node(decl).literal.clone();
        let location = ast.node(decl).location;
        let base = ast.node(decl).ref_type.base_register();
        self.builder.emit_rm(LD, AC1, location, base, format!("load lhs variable {}", name));
        self.builder.emit_ro(op, AC, AC1, AC, String::from(message));
        self.store_variable(ast, lhs);
    }

    fn generate_step_assignment(&mut self, ast: &mut Ast, id: NodeId, lhs: NodeId) {
        let increment = ast.node(id).token == TokenClass::Inc;
        let delta = if increment { 1 } else { -1 };
        let verb = if increment { "increment" } else { "decrement" };

        if ast.node(lhs).kind == NodeKind::Id {
            let decl = self.fetch_symbol(ast, lhs);
            let name = ast.node(decl).literal.clone();
            let location = ast.node(decl).location;
            let base = ast.node(decl).ref_type.base_register();
            self.builder.emit_rm(LD, AC, location, base, format!("load lhs variable {}", name));
            self.builder.emit_rm(LDA, AC, delta, AC, format!("{} value of {}", verb, name));
            self.builder.emit_rm(ST, AC, location, base, format!("Store variable {}", name));
            return;
        }

        // Indexed target
        let array_base = ast.child(lhs, 0).unwrap_or_else(|| panic!("Malformed AST! Array access without a base."));
        let index = ast.child(lhs, 1);
        let decl = self.fetch_symbol(ast, array_base);
        let name = ast.node(decl).literal.clone();
        if let Some(index) = index {
            self.generate_expression(ast, index);
        }
        self.load_array_base(ast, decl, AC2);
        self.builder.emit_ro(RoOp::SUB, AC2, AC2, AC, String::from("Compute offset of value"));
        self.builder.emit_rm(LD, AC, 0, AC2, format!("load lhs variable {}", name));
        self.builder.emit_rm(LDA, AC, delta, AC, format!("{} value of {}", verb, name));
        self.builder.emit_rm(ST, AC, 0, AC2, format!("Store variable {}", name));
    }

    /// Stores AC into the declaration behind a target node, which is either
    /// an identifier use or the declaration itself (initializers).
    fn store_variable(&mut self, ast: &Ast, target: NodeId) {
        let decl = if ast.node(target).kind == NodeKind::Id {
            self.fetch_symbol(ast, target)
        } else {
            target
        };
        let node = ast.node(decl);
        let name = node.literal.clone();
        self.builder.emit_rm(ST, AC, node.location, node.ref_type.base_register(),
                             format!("Store variable {}", name));
    }

    /// Copies string data placed in global memory into a char array
    /// target, clamped to the smaller of the two sizes.
    fn generate_string_into(&mut self, ast: &mut Ast, decl: NodeId, string: NodeId) {
        let string_location = ast.node(string).location;
        let text = match ast.node(string).payload {
            Some(Literal::Str(ref text)) => text.clone(),
            _ => String::new(),
        };
        let target_location = ast.node(decl).location;
        let target_base = ast.node(decl).ref_type.base_register();

        self.builder.emit_str_lit(string_location, &text);
        self.builder.emit_rm(LDA, AC, string_location, GP, String::from("Load address of char array"));
        self.builder.emit_rm(LDA, AC1, target_location, target_base, String::from("address of lhs"));
        self.builder.emit_rm(LD, AC2, 1, AC, String::from("size of rhs"));
        self.builder.emit_rm(LD, AC3, 1, AC1, String::from("size of lhs"));
        self.builder.emit_ro(RoOp::SWP, AC2, AC3, AC3, String::from("pick smallest size"));
        self.builder.emit_ro(RoOp::MOV, AC1, AC, AC2, String::from("array op ="));
    }

    fn generate_call(&mut self, ast: &mut Ast, id: NodeId) {
        let name = ast.node(id).literal.clone();
        let toffset_saved = self.toffset;

        self.builder.comment(format!("CALL {}", name));
        self.builder.emit_rm(ST, FP, self.toffset, FP, format!("Store fp in ghost frame for {}", name));
        self.toffset -= 1;
        self.builder.comment(format!("TOFF dec: {}", self.toffset));
        self.toffset -= 1;
        self.builder.comment(format!("TOFF dec: {}", self.toffset));

        let arguments: Vec<NodeId> = ast.siblings(ast.child(id, 0)).collect();
        for (position, argument) in arguments.iter().enumerate() {
            self.builder.comment(format!("Param {}", position + 1));
            self.generate_expression(ast, *argument);
            self.builder.emit_rm(ST, AC, self.toffset, FP, String::from("Push parameter"));
            self.toffset -= 1;
            self.builder.comment(format!("TOFF dec: {}", self.toffset));
        }
        self.builder.comment(format!("Param end {}", name));

        self.toffset = toffset_saved;
        self.builder.emit_rm(LDA, FP, self.toffset, FP, String::from("Ghost frame becomes new active frame"));
        self.builder.emit_rm(LDA, AC, 1, PC, String::from("Return address in ac"));

        let callee = self.table.lookup_global(&name)
            .unwrap_or_else(|| panic!("Malformed AST! Call to unknown function '{}'.", name));
        let address = ast.node(callee).address as i32;
        let here = self.builder.loc() as i32;
        self.builder.emit_rm(JMP, PC, address - here - 1, PC, format!("CALL {}", name));
        self.builder.emit_rm(LDA, AC, 0, RET, String::from("Save the result in ac"));
        self.builder.comment(format!("Call end {}", name));
        self.builder.comment(format!("TOFF set: {}", self.toffset));
    }
}

/// Init section: patched into address 0, sets up the first frame at the end
/// of global space, initializes globals and statics in declaration order,
/// then jumps to main and halts on return.
impl TmCodeGenerator {
    fn generate_init_section(&mut self, ast: &mut Ast) {
        let init_location = self.builder.loc() as i32;
        self.builder.patch_rm(0, JMP, PC, init_location - 1, PC, String::from("Jump to init [backpatch]"));

        self.builder.comment(String::from("INIT"));
        self.builder.emit_rm(LDA, FP, self.goffset, GP, String::from("set first frame at end of globals"));
        self.builder.emit_rm(ST, FP, 0, FP, String::from("store old fp (point to self)"));
        self.builder.comment(String::from("INIT GLOBALS AND STATICS"));

        let globals = self.table.global_declarations(ast);
        for declaration in globals {
            let node = ast.node(declaration);
            let name = node.literal.clone();
            let is_array = node.is_array;
            let size = node.size;
            let location = node.location;

            if is_array {
                self.builder.emit_rm(LDC, AC, size - 1, AC3, format!("load size of array {}", name));
                self.builder.emit_rm(ST, AC, location + 1, GP, format!("save size of array {}", name));
                if let Some(initializer) = ast.child(declaration, 0) {
                    if ast.node(initializer).kind == NodeKind::StringConst {
                        self.generate_string_into(ast, declaration, initializer);
                    }
                }
            } else if let Some(initializer) = ast.child(declaration, 0) {
                // Temporaries for a computed initializer go below the slot
                self.toffset = location - 2;
                self.generate_expression(ast, initializer);
                self.store_variable(ast, declaration);
            }
        }

        self.builder.comment(String::from("END INIT GLOBALS AND STATICS"));
        self.builder.emit_rm(LDA, AC, 1, PC, String::from("Return address in ac"));
        let here = self.builder.loc() as i32;
        self.builder.emit_rm(JMP, PC, self.address_of_main as i32 - here - 1, PC, String::from("Jump to main"));
        self.builder.emit_ro(RoOp::HALT, GP, GP, GP, String::from("DONE!"));
        self.builder.comment(String::from("END INIT"));
    }
}
