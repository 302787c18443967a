use enum_assoc::Assoc;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::compiler::program_code::Register;

/// Value types of the C- language. `Undefined` marks nodes whose type could
/// not be resolved; type checks involving an undefined side are suppressed so
/// one missing declaration does not cascade.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display, EnumString)]
pub enum DataType {
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "char")]
    Char,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "void")]
    Void,
    #[strum(serialize = "undefined")]
    Undefined,
}

impl DataType {
    /// Parses a type specifier keyword. Functions declared without a
    /// specifier are Void, which has no keyword of its own.
    pub fn from_specifier(keyword: &str) -> Option<DataType> {
        Some(match keyword {
            "int" => DataType::Int,
            "char" => DataType::Char,
            "bool" => DataType::Bool,
            _ => return None,
        })
    }
}

/// Reference class of a declaration, assigned once by the memory layout
/// pass. The associated base register is the register the code generator
/// offsets from when loading or storing the declaration.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display,
         Assoc)]
#[func(pub const fn base_register(&self) -> Register)]
pub enum RefType {
    #[assoc(base_register = Register::GP)]
    Global,
    #[assoc(base_register = Register::FP)]
    Local,
    #[assoc(base_register = Register::GP)]
    Static,
    #[assoc(base_register = Register::FP)]
    Parameter,
    #[assoc(base_register = Register::GP)]
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names_match_diagnostics() {
        assert_eq!(DataType::Int.to_string(), "int");
        assert_eq!(DataType::Bool.to_string(), "bool");
        assert_eq!(DataType::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_specifier_parsing() {
        assert_eq!(DataType::from_specifier("char"), Some(DataType::Char));
        assert_eq!(DataType::from_specifier("void"), None);
    }

    #[test]
    fn test_reference_class_base_registers() {
        assert_eq!(RefType::Global.base_register(), Register::GP);
        assert_eq!(RefType::Static.base_register(), Register::GP);
        assert_eq!(RefType::Local.base_register(), Register::FP);
        assert_eq!(RefType::Parameter.base_register(), Register::FP);
    }
}
