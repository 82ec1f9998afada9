//! Recursive descent parser for the Cyrex language

use crate::ast::*;
use cyrex_common::CyrexError;
use cyrex_lexer::{Token, TokenKind};

/// Where a sub-parse is taking place; a few rules differ per context
/// (const initializers, statement-ifs versus if-expressions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Statement,
    Expression,
    ParameterList,
}

/// An `if` or `while` parses to a statement or an expression depending on
/// the tokens that follow its condition.
enum Parsed {
    Stmt(Stmt),
    Expr(Expr),
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    errors: Vec<CyrexError>,
}

/// Parse a token stream into a [`Program`], accumulating errors.
pub fn parse(tokens: Vec<Token>) -> Result<Program, Vec<CyrexError>> {
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0, errors: Vec::new() }
    }

    pub fn parse(mut self) -> Result<Program, Vec<CyrexError>> {
        let mut functions = Vec::new();

        while !self.is_at_end() {
            match self.parse_top() {
                Some(function) => functions.push(function),
                None => break,
            }
        }

        if self.errors.is_empty() {
            Ok(Program { functions })
        } else {
            Err(self.errors)
        }
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current().kind == kind
    }

    fn check_binary(&self) -> bool {
        !self.is_at_end() && self.current().kind.is_binary_operator()
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        self.index += 1;
        token
    }

    fn expect(&mut self, kind: TokenKind, message: impl Into<String>) -> bool {
        let same = self.check(kind);
        if !same {
            self.push_error(message);
        }
        same
    }

    fn expect_type_name(&mut self, message: impl Into<String>) -> bool {
        if !self.is_at_end() && self.current().kind.starts_type() {
            return true;
        }
        self.push_error(message);
        false
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(CyrexError::parse(message));
    }

    fn parse_top(&mut self) -> Option<Function> {
        if self.check(TokenKind::Function) {
            self.advance();
            return self.parse_function();
        }
        self.push_error("expected 'function'");
        None
    }

    fn parse_function(&mut self) -> Option<Function> {
        if !self.expect(TokenKind::Identifier, "expected name of function") {
            return None;
        }
        let name = self.advance().text;

        if !self.expect(
            TokenKind::LeftParen,
            format!("expected ( after function {}'s name", name),
        ) {
            return None;
        }
        self.advance();
        let params = self.parse_parameters()?;

        if !self.expect(
            TokenKind::Colon,
            format!("expected : after function {}'s parameters", name),
        ) {
            return None;
        }
        self.advance();
        if !self.expect_type_name(format!("expected return type for function {}", name)) {
            return None;
        }
        let return_type = self.parse_type();

        if !self.expect(
            TokenKind::LeftBrace,
            format!("expected {{ to begin function {}'s block", name),
        ) {
            return None;
        }
        self.advance();
        let body = self.parse_block()?;

        Some(Function { name, return_type, params, body })
    }

    fn parse_parameters(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();

        while !self.is_at_end() {
            if self.check(TokenKind::RightParen) {
                self.advance();
                break;
            }
            let variable = self.parse_variable(Context::ParameterList)?;
            params.push(Param {
                name: variable.name,
                ty: variable.ty,
                is_const: variable.is_const,
            });

            if self.check(TokenKind::Comma) {
                self.advance();
                continue;
            }
            if self.check(TokenKind::RightParen) {
                self.advance();
                break;
            }
        }

        Some(params)
    }

    fn parse_block(&mut self) -> Option<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(TokenKind::RightBrace) {
                self.advance();
                break;
            }
            match self.parse_stmt() {
                Some(statement) => statements.push(statement),
                None => {
                    self.push_error("expected statement in function body");
                    return None;
                }
            }
        }

        Some(Stmt::Block(statements))
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        if self.check(TokenKind::If) {
            self.advance();
            return match self.parse_if(Context::Statement)? {
                Parsed::Stmt(stmt) => Some(stmt),
                Parsed::Expr(expr) => Some(Stmt::Expr(expr)),
            };
        }
        if self.check(TokenKind::While) {
            self.advance();
            return match self.parse_while(Context::Statement)? {
                Parsed::Stmt(stmt) => Some(stmt),
                Parsed::Expr(expr) => Some(Stmt::Expr(expr)),
            };
        }
        if self.check(TokenKind::Return) {
            self.advance();
            return Some(Stmt::Return(self.parse_expr()));
        }
        if self.check(TokenKind::Var) || self.check(TokenKind::Const) {
            return self.parse_variable(Context::Statement).map(Stmt::Variable);
        }
        if self.check(TokenKind::Identifier) {
            return self.parse_identifier().map(Stmt::Expr);
        }

        let unexpected = self.current().text.clone();
        self.push_error(format!("unexpected {} in statement", unexpected));
        None
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        if self.check(TokenKind::Number) {
            return self.parse_number();
        }
        if self.check(TokenKind::Str) {
            // Strings carry a byte-pointer type; the IR generator decides
            // whether the literal kind is supported.
            let value = self.advance().text;
            return Some(Expr::Literal(LiteralExpr { ty: Type::pointer_to("byte"), value }));
        }
        if self.check(TokenKind::Identifier) {
            return self.parse_identifier();
        }
        if self.check(TokenKind::While) {
            self.advance();
            return match self.parse_while(Context::Expression)? {
                Parsed::Expr(expr) => Some(expr),
                Parsed::Stmt(_) => {
                    self.push_error("expected 'then' to complete while-expression");
                    None
                }
            };
        }
        if self.check(TokenKind::If) {
            self.advance();
            return match self.parse_if(Context::Expression)? {
                Parsed::Expr(expr) => Some(expr),
                Parsed::Stmt(_) => {
                    self.push_error("expected 'then' for if-expression");
                    None
                }
            };
        }

        None
    }

    fn parse_if(&mut self, _context: Context) -> Option<Parsed> {
        let condition = self.parse_expr()?;

        // Block if: `if cond { … } [else …]`
        if self.check(TokenKind::LeftBrace) {
            self.advance();
            let then_branch = self.parse_block()?;
            let mut else_branch = None;
            if self.check(TokenKind::Else) {
                self.advance();
                let stmt = if self.check(TokenKind::LeftBrace) {
                    self.advance();
                    self.parse_block()?
                } else {
                    self.parse_stmt()?
                };
                else_branch = Some(Box::new(stmt));
            }
            return Some(Parsed::Stmt(Stmt::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch,
            }));
        }

        // Statement if: `if cond do stmt [else stmt]`
        if self.check(TokenKind::Do) {
            self.advance();
            let then_branch = self.parse_stmt()?;
            let mut else_branch = None;
            if self.check(TokenKind::Else) {
                self.advance();
                else_branch = Some(Box::new(self.parse_stmt()?));
            }
            return Some(Parsed::Stmt(Stmt::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch,
            }));
        }

        // If-expression: `if cond then expr else expr`
        if !self.expect(TokenKind::Then, "expected 'then' for if-expression") {
            return None;
        }
        self.advance();
        let then_expr = self.parse_expr()?;

        if !self.expect(TokenKind::Else, "expected else after if-expression") {
            return None;
        }
        self.advance();
        let else_expr = self.parse_expr()?;

        Some(Parsed::Expr(Expr::If {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }))
    }

    fn parse_while(&mut self, _context: Context) -> Option<Parsed> {
        let condition = self.parse_expr()?;

        if self.check(TokenKind::LeftBrace) {
            self.advance();
            let body = self.parse_block()?;

            // `while cond { … } then expr` yields the expression.
            if self.check(TokenKind::Then) {
                self.advance();
                let result = self.parse_expr()?;
                return Some(Parsed::Expr(Expr::While {
                    condition: Box::new(condition),
                    body: Box::new(body),
                    result: Box::new(result),
                }));
            }

            return Some(Parsed::Stmt(Stmt::While { condition, body: Box::new(body) }));
        }

        if self.check(TokenKind::Do) {
            self.advance();
            if self.check(TokenKind::LeftBrace) {
                self.push_error("unexpected { after while statement");
                return None;
            }
            let body = self.parse_stmt()?;

            if self.check(TokenKind::Then) {
                self.advance();
                let result = self.parse_expr()?;
                return Some(Parsed::Expr(Expr::While {
                    condition: Box::new(condition),
                    body: Box::new(body),
                    result: Box::new(result),
                }));
            }

            return Some(Parsed::Stmt(Stmt::While { condition, body: Box::new(body) }));
        }

        let unexpected = if self.is_at_end() {
            "end of input".to_string()
        } else {
            self.current().text.clone()
        };
        self.push_error(format!("unexpected {} after while condition", unexpected));
        None
    }

    fn parse_variable(&mut self, context: Context) -> Option<VariableStmt> {
        let is_const = match self.advance().kind {
            TokenKind::Var => false,
            TokenKind::Const => true,
            _ => {
                self.push_error("expected either const or var");
                return None;
            }
        };

        if !self.expect(TokenKind::Identifier, "expected variable name") {
            return None;
        }
        let name = self.advance().text;

        if !self.expect(TokenKind::Colon, "expected : after variable name") {
            return None;
        }
        self.advance();
        if !self.expect_type_name("expected variable type after :") {
            return None;
        }
        let ty = self.parse_type();

        if context != Context::ParameterList && is_const && !self.check(TokenKind::Assign) {
            self.push_error(format!("{} is const so it must be initialized", name));
            return None;
        }

        let mut initializer = None;
        if self.check(TokenKind::Assign) {
            self.advance();
            match self.parse_expr() {
                Some(expr) => initializer = Some(expr),
                None => {
                    self.push_error("expected expression for variable initializer");
                    return None;
                }
            }
        }

        Some(VariableStmt { is_const, name, ty, initializer })
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        let name = self.advance().text;
        let ident = Expr::Identifier(name);

        if self.check_binary() {
            return self.parse_binary(ident);
        }

        if self.check(TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr()?;
            return Some(Expr::Assign { target: Box::new(ident), value: Box::new(value) });
        }

        Some(ident)
    }

    fn parse_number(&mut self) -> Option<Expr> {
        let value = self.advance().text;
        let number = Expr::Literal(LiteralExpr { ty: Type::named("int"), value });

        if self.check_binary() {
            return self.parse_binary(number);
        }

        Some(number)
    }

    fn parse_binary(&mut self, left: Expr) -> Option<Expr> {
        let kind = match self.advance().kind {
            TokenKind::Lesser => BinaryKind::Lesser,
            TokenKind::LesserOrEqual => BinaryKind::LesserOrEqual,
            TokenKind::Greater => BinaryKind::Greater,
            TokenKind::GreaterOrEqual => BinaryKind::GreaterOrEqual,
            TokenKind::Equal => BinaryKind::Equal,
            TokenKind::NotEqual => BinaryKind::NotEqual,
            TokenKind::And => BinaryKind::And,
            TokenKind::Or => BinaryKind::Or,
            TokenKind::Xor => BinaryKind::Xor,
            TokenKind::Plus => BinaryKind::Add,
            TokenKind::Minus => BinaryKind::Sub,
            _ => unreachable!("checked by check_binary"),
        };

        match self.parse_expr() {
            Some(right) => Some(Expr::Binary {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            }),
            None => {
                self.push_error("expected expression in right hand side of binary expression");
                None
            }
        }
    }

    fn parse_type(&mut self) -> Type {
        let mut ty = Type::named(self.advance().text);

        while !self.is_at_end() {
            if self.check(TokenKind::Star) {
                self.advance();
                ty.qualifiers.push(TypeQualifier {
                    is_const: false,
                    kind: QualifierKind::Pointer,
                });
            } else if self.check(TokenKind::LeftBracket) {
                self.advance();
                if !self.expect(TokenKind::Number, "expected array size") {
                    return ty;
                }
                let len = self.advance().text.parse::<u32>().unwrap_or_else(|_| {
                    self.push_error("array size out of range");
                    0
                });
                if !self.expect(TokenKind::RightBracket, "expected ]") {
                    return ty;
                }
                self.advance();
                ty.qualifiers.push(TypeQualifier {
                    is_const: false,
                    kind: QualifierKind::Array(len),
                });
            } else {
                break;
            }
        }

        ty
    }
}
