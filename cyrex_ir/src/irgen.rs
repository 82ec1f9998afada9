//! AST to linear-IR lowering

use crate::bb;
use crate::ir::*;
use cyrex_parser::ast::{
    BinaryKind, Expr, Function, LiteralExpr, Program, Stmt, Type, VariableStmt,
};
use hashbrown::HashMap;
use thiserror::Error;

/// Source-level errors surfaced by IR generation. They are accumulated and
/// reported in bulk; generation keeps going to find as many as possible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("function {name} is already defined")]
    Duplicate { name: String },

    #[error("variable {name} already defined in scope")]
    Redeclaration { name: String },

    #[error("symbol {name} is undefined")]
    Undefined { name: String },

    #[error("unsupported literal type {ty}")]
    Unsupported { ty: String },
}

#[derive(Default)]
struct Scope {
    symbols: HashMap<String, ValueId>,
}

/// Walks the AST once per function and emits a linear instruction stream,
/// then partitions every stream into basic blocks to form the [`Module`].
#[derive(Default)]
pub struct IrGen {
    values: Vec<Value>,
    literals: HashMap<ValueId, Literal>,
    scopes: Vec<Scope>,
    errors: Vec<IrError>,
    next_label: LabelId,
    functions: Vec<(String, LinearFunction)>,
    current: Option<LinearFunction>,
    module: Module,
}

impl IrGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate IR for a whole program and build the CFG module.
    pub fn generate(&mut self, program: &Program) {
        for function in &program.functions {
            self.function(function);
        }

        for (name, linear) in &self.functions {
            let blocks = bb::build_function(linear);
            log::debug!(
                "function {}: {} instructions, {} blocks",
                name,
                linear.insts.len(),
                blocks.len()
            );
            self.module.insert(
                name.clone(),
                CfgFunction { values: linear.values.clone(), blocks },
            );
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[IrError] {
        &self.errors
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn function_by_name(&self, name: &str) -> Option<&CfgFunction> {
        self.module.get(name)
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id as usize]
    }

    pub fn linear_functions(&self) -> impl Iterator<Item = (&str, &LinearFunction)> {
        self.functions.iter().map(|(n, f)| (n.as_str(), f))
    }

    fn function(&mut self, function: &Function) {
        if self.functions.iter().any(|(name, _)| *name == function.name) {
            self.errors.push(IrError::Duplicate { name: function.name.clone() });
            return;
        }

        let prologue = self.new_label();
        self.current = Some(LinearFunction {
            prologue_label: prologue,
            ..LinearFunction::default()
        });
        self.push_label(prologue);

        let epilogue = self.new_label();
        self.cur().epilogue_label = epilogue;

        self.gen_stmt(&function.body);
        self.push_label(epilogue);

        let mut finished = self.current.take().unwrap_or_default();
        finished.values = self.values.clone();
        self.functions.push((function.name.clone(), finished));
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> ValueId {
        match stmt {
            Stmt::Block(statements) => {
                self.enter_scope();
                for statement in statements {
                    self.gen_stmt(statement);
                }
                self.exit_scope();
                NO_VALUE
            }
            Stmt::Return(expr) => {
                let result = match expr {
                    Some(expr) => self.gen_expr(expr),
                    None => NO_VALUE,
                };
                self.push_inst(Opcode::Return, NO_VALUE, &[result]);
                result
            }
            Stmt::Variable(variable) => self.var_stmt(variable),
            Stmt::While { condition, body } => {
                let l_cond = self.new_label();
                let l_body = self.new_label();
                let l_exit = self.new_label();

                self.push_label(l_cond);
                let cond = self.gen_expr(condition);
                self.push_inst(Opcode::Branch, NO_VALUE, &[cond, l_body, l_exit]);
                self.push_label(l_body);
                self.gen_stmt(body);
                self.push_jump(l_cond);
                self.push_label(l_exit);
                NO_VALUE
            }
            Stmt::If { condition, then_branch, else_branch } => {
                let l_true = self.new_label();
                let l_false = self.new_label();
                let l_done = self.new_label();

                let cond = self.gen_expr(condition);
                self.push_inst(Opcode::Branch, NO_VALUE, &[cond, l_true, l_false]);

                self.push_label(l_true);
                self.gen_stmt(then_branch);

                match else_branch {
                    Some(else_branch) => {
                        self.push_jump(l_done);
                        self.push_label(l_false);
                        self.gen_stmt(else_branch);
                    }
                    None => self.push_label(l_false),
                }

                self.push_jump(l_done);
                self.push_label(l_done);
                NO_VALUE
            }
            Stmt::Expr(expr) => self.gen_expr(expr),
        }
    }

    fn var_stmt(&mut self, variable: &VariableStmt) -> ValueId {
        let already_bound = self
            .scopes
            .last()
            .expect("internal error: no open scope")
            .symbols
            .contains_key(&variable.name);
        if already_bound {
            self.errors.push(IrError::Redeclaration { name: variable.name.clone() });
            return NO_VALUE;
        }

        let vid = self.new_value(variable.ty.clone());
        self.push_inst(Opcode::Alloc, vid, &[]);

        if let Some(initializer) = &variable.initializer {
            let init = self.gen_expr(initializer);
            if init != NO_VALUE {
                self.push_inst(Opcode::Store, NO_VALUE, &[vid, init]);
            }
        }

        self.scopes
            .last_mut()
            .expect("internal error: no open scope")
            .symbols
            .insert(variable.name.clone(), vid);
        NO_VALUE
    }

    fn gen_expr(&mut self, expr: &Expr) -> ValueId {
        match expr {
            Expr::Literal(literal) => self.literal_expr(literal),
            Expr::Identifier(name) => match self.find_symbol(name) {
                Some(vid) => vid,
                None => {
                    self.errors.push(IrError::Undefined { name: name.clone() });
                    NO_VALUE
                }
            },
            Expr::Binary { kind, left, right } => {
                let lhs = self.gen_expr(left);
                if lhs == NO_VALUE {
                    // Still walk the right side to surface its errors.
                    self.gen_expr(right);
                    return NO_VALUE;
                }

                let ty = self.values[lhs as usize].ty.clone();
                let result = self.new_value(ty);
                let rhs = self.gen_expr(right);
                if rhs == NO_VALUE {
                    return NO_VALUE;
                }

                let opcode = match kind {
                    BinaryKind::Add => Opcode::Add,
                    BinaryKind::Sub => Opcode::Sub,
                    BinaryKind::And => Opcode::And,
                    BinaryKind::Or => Opcode::Or,
                    BinaryKind::Xor => Opcode::Xor,
                    BinaryKind::Lesser => Opcode::Lesser,
                    BinaryKind::LesserOrEqual => Opcode::LesserOrEqual,
                    BinaryKind::Equal => Opcode::Equal,
                    BinaryKind::NotEqual => Opcode::NotEqual,
                    BinaryKind::Greater => Opcode::Greater,
                    BinaryKind::GreaterOrEqual => Opcode::GreaterOrEqual,
                };
                self.push_inst(opcode, result, &[lhs, rhs]);
                result
            }
            Expr::Assign { target, value } => {
                let lhs = self.gen_expr(target);
                let rhs = self.gen_expr(value);
                if lhs != NO_VALUE && rhs != NO_VALUE {
                    self.push_inst(Opcode::Store, NO_VALUE, &[lhs, rhs]);
                }
                lhs
            }
            Expr::If { condition, then_expr, else_expr } => {
                let l_done = self.new_label();
                let l_true = self.new_label();
                let l_false = self.new_label();

                let cond = self.gen_expr(condition);
                self.push_inst(Opcode::Branch, NO_VALUE, &[cond, l_true, l_false]);

                self.push_label(l_true);
                let if_true = self.gen_expr(then_expr);
                if if_true == NO_VALUE {
                    self.gen_expr(else_expr);
                    return NO_VALUE;
                }
                // One result value; both arms load into it.
                let ty = self.values[if_true as usize].ty.clone();
                let result = self.new_value(ty);
                self.push_inst(Opcode::Load, result, &[if_true]);
                self.push_inst(Opcode::Jump, NO_VALUE, &[l_done]);

                self.push_label(l_false);
                let if_false = self.gen_expr(else_expr);
                if if_false == NO_VALUE {
                    return NO_VALUE;
                }
                self.push_inst(Opcode::Load, result, &[if_false]);

                self.push_inst(Opcode::Jump, NO_VALUE, &[l_done]);
                self.push_label(l_done);
                result
            }
            Expr::While { condition, body, result } => {
                let l_cond = self.new_label();
                let l_body = self.new_label();
                let l_exit = self.new_label();

                self.push_inst(Opcode::Jump, NO_VALUE, &[l_cond]);

                self.push_label(l_cond);
                let cond = self.gen_expr(condition);
                self.push_inst(Opcode::Branch, NO_VALUE, &[cond, l_body, l_exit]);

                self.push_label(l_body);
                self.gen_stmt(body);
                self.push_jump(l_cond);

                self.push_label(l_exit);
                self.gen_expr(result)
            }
        }
    }

    fn literal_expr(&mut self, literal: &LiteralExpr) -> ValueId {
        let value = self.new_value(literal.ty.clone());
        self.push_inst(Opcode::Const, value, &[]);
        if let Some(parsed) = self.parse_literal(literal) {
            self.literals.insert(value, parsed);
        }
        value
    }

    fn parse_literal(&mut self, literal: &LiteralExpr) -> Option<Literal> {
        match literal.ty.name.as_str() {
            "int" | "long" => match literal.value.parse::<i64>() {
                Ok(v) => Some(Literal::Int(v)),
                Err(_) => {
                    self.errors.push(IrError::Unsupported { ty: literal.ty.name.clone() });
                    None
                }
            },
            other => {
                self.errors.push(IrError::Unsupported { ty: other.to_string() });
                None
            }
        }
    }

    fn cur(&mut self) -> &mut LinearFunction {
        self.current.as_mut().expect("internal error: no active function")
    }

    fn push_inst(&mut self, opcode: Opcode, result: ValueId, operands: &[i32]) {
        self.cur().insts.push(Inst::new(opcode, result, operands));
    }

    fn push_label(&mut self, label: LabelId) {
        self.push_inst(Opcode::Label, NO_VALUE, &[label]);
    }

    /// A control-skeleton jump. Skipped when the stream already ends in a
    /// terminator (a branch body that returned): the block splitter
    /// requires every block to start at a label, so an unreachable jump
    /// after a terminator must not be emitted.
    fn push_jump(&mut self, target: LabelId) {
        if self
            .cur()
            .insts
            .last()
            .is_some_and(|inst| inst.is_block_terminator())
        {
            return;
        }
        self.push_inst(Opcode::Jump, NO_VALUE, &[target]);
    }

    fn new_value(&mut self, ty: Type) -> ValueId {
        let id = self.values.len() as ValueId;
        self.values.push(Value { ty });
        id
    }

    fn new_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn find_symbol(&self, name: &str) -> Option<ValueId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(name).copied())
    }
}

impl LiteralLookup for IrGen {
    fn literal(&self, value: ValueId) -> Option<Literal> {
        self.literals.get(&value).copied()
    }
}
