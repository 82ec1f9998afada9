//! Parser integration tests over real token streams

use cyrex_lexer::tokenize;
use cyrex_parser::ast::*;
use cyrex_parser::parse;
use pretty_assertions::assert_eq;

fn parse_source(source: &str) -> Program {
    parse(tokenize(source).expect("tokenize")).expect("parse")
}

fn parse_errors(source: &str) -> Vec<String> {
    parse(tokenize(source).expect("tokenize"))
        .expect_err("expected parse errors")
        .into_iter()
        .map(|e| e.to_string())
        .collect()
}

#[test]
fn parses_a_minimal_function() {
    let program = parse_source("function main() : int { return 0 }");
    assert_eq!(program.functions.len(), 1);

    let main = &program.functions[0];
    assert_eq!(main.name, "main");
    assert_eq!(main.return_type, Type::named("int"));
    assert!(main.params.is_empty());

    let Stmt::Block(statements) = &main.body else { panic!("body is a block") };
    assert_eq!(statements.len(), 1);
    assert!(matches!(
        &statements[0],
        Stmt::Return(Some(Expr::Literal(lit))) if lit.value == "0"
    ));
}

#[test]
fn parses_parameters_declared_like_variables() {
    let program = parse_source("function f(var x : int, var y : long) : int { return 0 }");
    let f = &program.functions[0];
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0].name, "x");
    assert_eq!(f.params[0].ty, Type::named("int"));
    assert_eq!(f.params[1].name, "y");
    assert!(!f.params[0].is_const);
}

#[test]
fn parses_variable_with_initializer() {
    let program = parse_source("function main() : int { var x : int = 1 + 2 return x }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };

    let Stmt::Variable(variable) = &statements[0] else { panic!("expected var statement") };
    assert_eq!(variable.name, "x");
    assert!(!variable.is_const);
    assert!(matches!(
        variable.initializer,
        Some(Expr::Binary { kind: BinaryKind::Add, .. })
    ));
}

#[test]
fn const_variables_require_an_initializer() {
    let errors = parse_errors("function main() : int { const x : int return 0 }");
    assert!(errors.iter().any(|e| e.contains("must be initialized")));
}

#[test]
fn binary_expressions_lean_right() {
    let program = parse_source("function main() : int { return 1 + 2 + 3 }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    let Stmt::Return(Some(Expr::Binary { kind, left, right })) = &statements[0] else {
        panic!("expected return of a binary expression")
    };

    assert_eq!(*kind, BinaryKind::Add);
    assert!(matches!(**left, Expr::Literal(_)));
    assert!(matches!(
        **right,
        Expr::Binary { kind: BinaryKind::Add, .. }
    ));
}

#[test]
fn parses_every_binary_operator() {
    let cases = [
        ("<", BinaryKind::Lesser),
        ("<=", BinaryKind::LesserOrEqual),
        (">", BinaryKind::Greater),
        (">=", BinaryKind::GreaterOrEqual),
        ("==", BinaryKind::Equal),
        ("!=", BinaryKind::NotEqual),
        ("&", BinaryKind::And),
        ("|", BinaryKind::Or),
        ("^", BinaryKind::Xor),
        ("+", BinaryKind::Add),
        ("-", BinaryKind::Sub),
    ];

    for (op, expected) in cases {
        let source = format!("function main() : int {{ return 1 {} 2 }}", op);
        let program = parse_source(&source);
        let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
        let Stmt::Return(Some(Expr::Binary { kind, .. })) = &statements[0] else {
            panic!("expected binary return for operator {}", op)
        };
        assert_eq!(*kind, expected, "operator {}", op);
    }
}

#[test]
fn parses_block_if_with_else() {
    let program =
        parse_source("function main() : int { if 1 { return 1 } else { return 0 } }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    let Stmt::If { else_branch, .. } = &statements[0] else { panic!("expected if") };
    assert!(else_branch.is_some());
}

#[test]
fn parses_do_form_if() {
    let program = parse_source("function main() : int { if 1 do return 1 else return 0 }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    assert!(matches!(&statements[0], Stmt::If { else_branch: Some(_), .. }));
}

#[test]
fn parses_if_expression() {
    let program = parse_source("function main() : int { return if 1 then 10 else 20 }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    assert!(matches!(
        &statements[0],
        Stmt::Return(Some(Expr::If { .. }))
    ));
}

#[test]
fn parses_while_statement_and_assignment() {
    let program =
        parse_source("function main() : int { var i : int = 0 while i < 10 do i = i + 1 return i }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    assert_eq!(statements.len(), 3);

    let Stmt::While { condition, body } = &statements[1] else { panic!("expected while") };
    assert!(matches!(
        condition,
        Expr::Binary { kind: BinaryKind::Lesser, .. }
    ));
    assert!(matches!(**body, Stmt::Expr(Expr::Assign { .. })));
}

#[test]
fn parses_while_expression_with_then_result() {
    let program = parse_source(
        "function main() : int { var i : int = 0 return while i < 3 do i = i + 1 then i }",
    );
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    assert!(matches!(
        &statements[1],
        Stmt::Return(Some(Expr::While { .. }))
    ));
}

#[test]
fn parses_pointer_and_array_qualifiers() {
    let program = parse_source("function main() : int { var p : long*[4] = 0 return 0 }");
    let Stmt::Block(statements) = &program.functions[0].body else { panic!() };
    let Stmt::Variable(variable) = &statements[0] else { panic!() };

    assert_eq!(variable.ty.name, "long");
    assert_eq!(variable.ty.qualifiers.len(), 2);
    assert_eq!(variable.ty.qualifiers[0].kind, QualifierKind::Pointer);
    assert_eq!(variable.ty.qualifiers[1].kind, QualifierKind::Array(4));
}

#[test]
fn reports_missing_function_keyword() {
    let errors = parse_errors("main() : int { return 0 }");
    assert!(errors.iter().any(|e| e.contains("expected 'function'")));
}

#[test]
fn reports_unexpected_statement_token() {
    let errors = parse_errors("function main() : int { , }");
    assert!(errors.iter().any(|e| e.contains("unexpected , in statement")));
}
