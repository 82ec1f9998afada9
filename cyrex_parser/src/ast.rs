//! Abstract syntax tree definitions for the Cyrex language

use serde::{Deserialize, Serialize};
use std::fmt;

/// A source-level type: a name plus an ordered list of qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    pub qualifiers: Vec<TypeQualifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeQualifier {
    pub is_const: bool,
    pub kind: QualifierKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualifierKind {
    Pointer,
    Array(u32),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), qualifiers: Vec::new() }
    }

    pub fn pointer_to(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifiers: vec![TypeQualifier { is_const: false, kind: QualifierKind::Pointer }],
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.qualifiers
            .iter()
            .any(|q| q.kind == QualifierKind::Pointer)
    }
}

impl fmt::Display for Type {
    /// Renders the type-string grammar used by the IR dump: the name,
    /// then `*` per pointer and `[N x …]` wrapping the accumulated
    /// string per array.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = self.name.clone();
        for qual in &self.qualifiers {
            if qual.is_const {
                s.push_str(" const");
            }
            match qual.kind {
                QualifierKind::Pointer => s.push('*'),
                QualifierKind::Array(len) => s = format!("[{} x {}]", len, s),
            }
        }
        f.write_str(&s)
    }
}

/// A complete Cyrex source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Param>,
    pub body: Stmt,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub is_const: bool,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Variable(VariableStmt),
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableStmt {
    pub is_const: bool,
    pub name: String,
    pub ty: Type,
    pub initializer: Option<Expr>,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Literal(LiteralExpr),
    Identifier(String),
    Binary {
        kind: BinaryKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    While {
        condition: Box<Expr>,
        body: Box<Stmt>,
        result: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub ty: Type,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryKind {
    Lesser,
    LesserOrEqual,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Xor,
    Add,
    Sub,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_strings_follow_the_dump_grammar() {
        assert_eq!(Type::named("int").to_string(), "int");
        assert_eq!(Type::pointer_to("char").to_string(), "char*");

        let arr = Type {
            name: "int".into(),
            qualifiers: vec![TypeQualifier { is_const: false, kind: QualifierKind::Array(3) }],
        };
        assert_eq!(arr.to_string(), "[3 x int]");

        let arr_of_ptr = Type {
            name: "short".into(),
            qualifiers: vec![
                TypeQualifier { is_const: false, kind: QualifierKind::Pointer },
                TypeQualifier { is_const: false, kind: QualifierKind::Array(8) },
            ],
        };
        assert_eq!(arr_of_ptr.to_string(), "[8 x short*]");
    }
}
