//! Two-pass type checker.
//!
//! A single `TypeChecker` struct holding a `SymTable<DataType>` and an
//! `ErrorContext`, with checking overloaded over expressions and statements.
//! Two passes over the top level let mutually recursive functions call each
//! other regardless of textual order: pass one hoists every top-level
//! `function`/`extern function` signature into scope before pass two walks
//! any bodies.
//!
//! This checker does *not* verify that every path through a non-`Void`
//! function reaches a `return` — a function that falls off the end of its
//! body without returning on every path is accepted. See DESIGN.md.

use crate::ast::{BinaryOp, Expression, FuncDef, Param, Program, Statement, UnaryOp};
use crate::error::ErrorContext;
use crate::intern::{Interner, Symbol};
use crate::scope::SymTable;
use crate::types::DataType;

pub struct TypeChecker<'a> {
    sym: SymTable<DataType<'a>>,
    errors: ErrorContext,
    return_symbol: Symbol,
}

impl<'a> TypeChecker<'a> {
    pub fn new(interner: &mut Interner, max_errors: usize) -> Self {
        TypeChecker {
            sym: SymTable::new(),
            errors: ErrorContext::new(max_errors),
            return_symbol: interner.intern("@return"),
        }
    }

    pub fn check(mut self, program: &Program<'a>) -> ErrorContext {
        self.hoist_top_level(program.top_level);
        self.sym.put(self.return_symbol, DataType::Void);
        for stmt in program.top_level {
            self.check_stmt(stmt);
        }
        self.errors
    }

    /// Pass one: registers every top-level function's signature so calls can
    /// resolve regardless of declaration order (mutual recursion).
    fn hoist_top_level(&mut self, stmts: &'a [&'a Statement<'a>]) {
        for stmt in stmts {
            if let Statement::FuncDef(func) = stmt {
                if self.sym.in_current_scope(func.name) {
                    self.errors
                        .push(func.line, func.column, "function redeclared");
                    continue;
                }
                self.sym.put(func.name, DataType::Func(func));
            }
        }
    }

    fn check_stmt(&mut self, stmt: &'a Statement<'a>) {
        match stmt {
            Statement::Empty => {}
            Statement::Exp(e) => {
                self.check_expr(e);
            }
            Statement::Assign {
                var_name,
                value,
                line,
                column,
            } => {
                let value_ty = self.check_expr(value);
                match self.sym.get(*var_name).copied() {
                    Some(var_ty) => {
                        if !value_ty.can_cast_to(&var_ty) {
                            self.errors.push(
                                *line,
                                *column,
                                "assigned value's type does not match variable's type",
                            );
                        }
                    }
                    None => {
                        self.errors.push(*line, *column, "assignment to undeclared variable");
                    }
                }
            }
            Statement::Decl {
                var_name,
                type_kw,
                init,
                line,
                column,
            } => {
                if self.sym.in_current_scope(*var_name) {
                    self.errors.push(*line, *column, "variable redeclared in this scope");
                }
                let declared = type_kw.to_data_type();
                if let Some(init) = init {
                    let init_ty = self.check_expr(init);
                    if !init_ty.can_cast_to(&declared) {
                        self.errors.push(
                            *line,
                            *column,
                            "initializer's type does not match declared type",
                        );
                    }
                }
                self.sym.put(*var_name, declared);
            }
            Statement::Return { value, line, column } => {
                let expected = self.sym.get(self.return_symbol).copied().unwrap_or(DataType::Void);
                match (expected.is_void(), value) {
                    (true, Some(_)) => {
                        self.errors.push(*line, *column, "void function cannot return a value");
                    }
                    (false, None) => {
                        self.errors.push(*line, *column, "function must return a value");
                    }
                    (false, Some(exp)) => {
                        let actual = self.check_expr(exp);
                        if !actual.can_cast_to(&expected) {
                            self.errors.push(*line, *column, "return value's type does not match declared return type");
                        }
                    }
                    (true, None) => {}
                }
            }
            Statement::If {
                condition,
                true_stmt,
                else_stmt,
            } => {
                self.expect_bool(condition);
                self.check_stmt(true_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.check_stmt(else_stmt);
                }
            }
            Statement::While { condition, stmt } => {
                self.expect_bool(condition);
                self.check_stmt(stmt);
            }
            Statement::Block(stmts) => {
                self.sym.enter_scope();
                for s in *stmts {
                    self.check_stmt(s);
                }
                self.sym.exit_scope();
            }
            Statement::FuncDef(func) => self.check_func_def(func),
        }
    }

    fn check_func_def(&mut self, func: &'a FuncDef<'a>) {
        self.sym.enter_scope();
        self.sym.put(self.return_symbol, func.return_type.to_data_type());
        for Param { name, type_kw } in func.params {
            self.sym.put(*name, type_kw.to_data_type());
        }
        if let Some(body) = func.body {
            self.check_stmt(body);
        }
        self.sym.exit_scope();
    }

    fn expect_bool(&mut self, exp: &'a Expression<'a>) {
        let ty = self.check_expr(exp);
        if !ty.is_bool() {
            let (line, column) = exp.line_column();
            self.errors.push(line, column, "condition must be a bool");
        }
    }

    fn check_expr(&mut self, exp: &'a Expression<'a>) -> DataType<'a> {
        match exp {
            Expression::Bool(_) => DataType::Bool,
            Expression::Const { is_uint, .. } => {
                if *is_uint {
                    DataType::Uint
                } else {
                    DataType::Int
                }
            }
            Expression::Var { name, line, column } => match self.sym.get(*name).copied() {
                Some(ty) => ty,
                None => {
                    self.errors.push(*line, *column, "undefined variable");
                    DataType::Void
                }
            },
            Expression::Call {
                func_name,
                args,
                line,
                column,
            } => self.check_call(*func_name, args, *line, *column),
            Expression::Unary {
                op,
                operand,
                line,
                column,
            } => {
                let ty = self.check_expr(operand);
                match op {
                    UnaryOp::Not => {
                        if !ty.is_bool() {
                            self.errors.push(*line, *column, "'!' requires a bool operand");
                        }
                        DataType::Bool
                    }
                    UnaryOp::Neg => {
                        if !ty.is_signed() {
                            self.errors.push(*line, *column, "unary '-' requires a signed int operand");
                        }
                        DataType::Int
                    }
                }
            }
            Expression::Binary {
                op,
                left,
                right,
                line,
                column,
            } => self.check_binary(*op, left, right, *line, *column),
        }
    }

    fn check_call(
        &mut self,
        func_name: Symbol,
        args: &'a [&'a Expression<'a>],
        line: u32,
        column: u32,
    ) -> DataType<'a> {
        let arg_types: Vec<DataType<'a>> = args.iter().map(|a| self.check_expr(a)).collect();
        match self.sym.get(func_name).copied() {
            Some(DataType::Func(func)) => {
                if func.params.len() != args.len() {
                    self.errors.push(
                        line,
                        column,
                        format!(
                            "expected {} argument(s), found {}",
                            func.params.len(),
                            args.len()
                        ),
                    );
                }
                for (param, arg_ty) in func.params.iter().zip(arg_types.iter()) {
                    let param_ty = param.type_kw.to_data_type();
                    if !arg_ty.can_cast_to(&param_ty) {
                        self.errors.push(line, column, "argument type does not match parameter type");
                    }
                }
                func.return_type.to_data_type()
            }
            Some(_) => {
                self.errors.push(line, column, "called name is not a function");
                DataType::Void
            }
            None => {
                self.errors.push(line, column, "call to undefined function");
                DataType::Void
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
        line: u32,
        column: u32,
    ) -> DataType<'a> {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.expect_bool(left);
                self.expect_bool(right);
                DataType::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let lt = self.check_expr(left);
                let rt = self.check_expr(right);
                if lt.is_bool() && rt.is_bool() {
                    // both bool: always comparable
                } else if lt.is_numeric() && rt.is_numeric() {
                    if lt != rt {
                        self.errors.push(line, column, "comparison operands must have matching signedness");
                    }
                } else {
                    self.errors.push(line, column, "cannot compare values of different types");
                }
                DataType::Bool
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let lt = self.numeric(left, line, column);
                let rt = self.numeric(right, line, column);
                if lt != rt {
                    self.errors.push(line, column, "comparison operands must have matching signedness");
                }
                DataType::Bool
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let lt = self.numeric(left, line, column);
                let rt = self.numeric(right, line, column);
                if lt != rt {
                    self.errors.push(line, column, "arithmetic operands must have matching signedness");
                }
                lt
            }
        }
    }

    fn numeric(&mut self, exp: &'a Expression<'a>, line: u32, column: u32) -> DataType<'a> {
        let ty = self.check_expr(exp);
        if !ty.is_numeric() {
            self.errors.push(line, column, "expected a numeric operand");
        }
        ty
    }
}
