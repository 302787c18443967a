/// Token classes discriminate the operator sub-variants within an Assign or
/// BinOp node. Diagnostics print the source lexeme, which the node carries
/// in its literal.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone)]
pub enum TokenClass {
    // Assignment family
    Asgn,       // <lhs> <= <rhs>
    AddAsgn,    // <lhs> += <rhs>
    SubAsgn,    // <lhs> -= <rhs>
    MulAsgn,    // <lhs> *= <rhs>
    DivAsgn,    // <lhs> /= <rhs>
    Inc,        // <lhs> ++
    Dec,        // <lhs> --

    // Relational operators
    Eq,         // <lhs> =  <rhs>
    Neq,        // <lhs> != <rhs>
    Lt,         // <lhs> <  <rhs>
    Leq,        // <lhs> !> <rhs>
    Gt,         // <lhs> >  <rhs>
    Geq,        // <lhs> !< <rhs>

    // Arithmetic operators
    Add,        // <lhs> + <rhs>
    Sub,        // <lhs> - <rhs>
    Mul,        // <lhs> * <rhs>
    Div,        // <lhs> / <rhs>
    Mod,        // <lhs> % <rhs>

    None,
}

impl TokenClass {
    pub fn is_relational(&self) -> bool {
        matches!(self,
            TokenClass::Eq | TokenClass::Neq
            | TokenClass::Lt | TokenClass::Leq
            | TokenClass::Gt | TokenClass::Geq)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self,
            TokenClass::Add | TokenClass::Sub
            | TokenClass::Mul | TokenClass::Div | TokenClass::Mod)
    }

}
