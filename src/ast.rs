//! Abstract syntax tree.
//!
//! One factory method per parser production, each allocating its node out
//! of an arena. Every node and expression is arena-allocated (`&'a ...`
//! references into a [`crate::arena::Arena`]); the tree is never freed
//! piecewise, only dropped all at once with the arena.

use crate::intern::Symbol;
use crate::types::TypeKeyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug)]
pub enum Expression<'a> {
    Bool(bool),
    /// An integer literal; `is_uint` records whether it carried the `u`
    /// suffix, matching `const_exp(value, Type::Enum type)` in the original
    /// — the literal's own type is fixed at parse time, not inferred later.
    Const { value: u64, is_uint: bool },
    Var { name: Symbol, line: u32, column: u32 },
    Call {
        func_name: Symbol,
        args: &'a [&'a Expression<'a>],
        line: u32,
        column: u32,
    },
    Unary {
        op: UnaryOp,
        operand: &'a Expression<'a>,
        line: u32,
        column: u32,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
        line: u32,
        column: u32,
    },
}

impl<'a> Expression<'a> {
    pub fn line_column(&self) -> (u32, u32) {
        match self {
            Expression::Bool(_) | Expression::Const { .. } => (0, 0),
            Expression::Var { line, column, .. }
            | Expression::Call { line, column, .. }
            | Expression::Unary { line, column, .. }
            | Expression::Binary { line, column, .. } => (*line, *column),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: Symbol,
    pub type_kw: TypeKeyword,
}

#[derive(Debug)]
pub struct FuncDef<'a> {
    pub name: Symbol,
    pub params: &'a [Param],
    pub return_type: TypeKeyword,
    /// `None` for `extern function ...;` declarations.
    pub body: Option<&'a Statement<'a>>,
    pub is_extern: bool,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
pub enum Statement<'a> {
    Empty,
    Exp(&'a Expression<'a>),
    Assign {
        var_name: Symbol,
        value: &'a Expression<'a>,
        line: u32,
        column: u32,
    },
    Decl {
        var_name: Symbol,
        type_kw: TypeKeyword,
        init: Option<&'a Expression<'a>>,
        line: u32,
        column: u32,
    },
    Return {
        value: Option<&'a Expression<'a>>,
        line: u32,
        column: u32,
    },
    If {
        condition: &'a Expression<'a>,
        true_stmt: &'a Statement<'a>,
        else_stmt: Option<&'a Statement<'a>>,
    },
    While {
        condition: &'a Expression<'a>,
        stmt: &'a Statement<'a>,
    },
    Block(&'a [&'a Statement<'a>]),
    FuncDef(&'a FuncDef<'a>),
}

/// The whole program: a flat list of top-level statements (declarations,
/// function definitions, or bare expression statements — the language has no
/// separate "top-level item" grammar, everything that can appear in a block
/// can also appear at the top level, which is why `ir.cpp` lowers the
/// program root as an ordinary `@top_level` routine body).
#[derive(Debug)]
pub struct Program<'a> {
    pub top_level: &'a [&'a Statement<'a>],
    /// Mirrors `Ast::valid` in the original: true iff the grammar of §4.4
    /// accepted the whole input with no diagnostics left unconsumed.
    pub valid: bool,
}

/// Allocates AST nodes from an [`crate::arena::Arena`]. Mirrors
/// `ast_alloc.h`'s `AstAlloc`: one factory method per node/expression shape,
/// so the parser never calls `Arena::alloc` directly.
pub struct AstBuilder<'a> {
    arena: &'a crate::arena::Arena,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a crate::arena::Arena) -> Self {
        AstBuilder { arena }
    }

    pub fn bool_exp(&self, value: bool) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Bool(value))
    }

    pub fn const_exp(&self, value: u64, is_uint: bool) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Const { value, is_uint })
    }

    pub fn var_exp(&self, name: Symbol, line: u32, column: u32) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Var { name, line, column })
    }

    pub fn call_exp(
        &self,
        func_name: Symbol,
        args: &[&'a Expression<'a>],
        line: u32,
        column: u32,
    ) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Call {
            func_name,
            args: self.arena.alloc_slice(args),
            line,
            column,
        })
    }

    pub fn unary_exp(
        &self,
        op: UnaryOp,
        operand: &'a Expression<'a>,
        line: u32,
        column: u32,
    ) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Unary {
            op,
            operand,
            line,
            column,
        })
    }

    pub fn binary_exp(
        &self,
        op: BinaryOp,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
        line: u32,
        column: u32,
    ) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Binary {
            op,
            left,
            right,
            line,
            column,
        })
    }

    pub fn empty_stmt(&self) -> &'a Statement<'a> {
        self.arena.alloc(Statement::Empty)
    }

    pub fn exp_stmt(&self, exp: &'a Expression<'a>) -> &'a Statement<'a> {
        self.arena.alloc(Statement::Exp(exp))
    }

    pub fn assign_stmt(
        &self,
        var_name: Symbol,
        value: &'a Expression<'a>,
        line: u32,
        column: u32,
    ) -> &'a Statement<'a> {
        self.arena.alloc(Statement::Assign {
            var_name,
            value,
            line,
            column,
        })
    }

    pub fn decl_stmt(
        &self,
        var_name: Symbol,
        type_kw: TypeKeyword,
        init: Option<&'a Expression<'a>>,
        line: u32,
        column: u32,
    ) -> &'a Statement<'a> {
        self.arena.alloc(Statement::Decl {
            var_name,
            type_kw,
            init,
            line,
            column,
        })
    }

    pub fn return_stmt(
        &self,
        value: Option<&'a Expression<'a>>,
        line: u32,
        column: u32,
    ) -> &'a Statement<'a> {
        self.arena.alloc(Statement::Return {
            value,
            line,
            column,
        })
    }

    pub fn if_stmt(
        &self,
        condition: &'a Expression<'a>,
        true_stmt: &'a Statement<'a>,
        else_stmt: Option<&'a Statement<'a>>,
    ) -> &'a Statement<'a> {
        self.arena.alloc(Statement::If {
            condition,
            true_stmt,
            else_stmt,
        })
    }

    pub fn while_stmt(
        &self,
        condition: &'a Expression<'a>,
        stmt: &'a Statement<'a>,
    ) -> &'a Statement<'a> {
        self.arena.alloc(Statement::While { condition, stmt })
    }

    pub fn block_stmt(&self, stmts: &[&'a Statement<'a>]) -> &'a Statement<'a> {
        self.arena
            .alloc(Statement::Block(self.arena.alloc_slice(stmts)))
    }

    pub fn func_def(
        &self,
        name: Symbol,
        params: &[Param],
        return_type: TypeKeyword,
        body: Option<&'a Statement<'a>>,
        is_extern: bool,
        line: u32,
        column: u32,
    ) -> &'a FuncDef<'a> {
        self.arena.alloc(FuncDef {
            name,
            params: self.arena.alloc_slice(params),
            return_type,
            body,
            is_extern,
            line,
            column,
        })
    }

    pub fn func_def_stmt(&self, func: &'a FuncDef<'a>) -> &'a Statement<'a> {
        self.arena.alloc(Statement::FuncDef(func))
    }

    pub fn program(&self, top_level: &[&'a Statement<'a>], valid: bool) -> Program<'a> {
        Program {
            top_level: self.arena.alloc_slice(top_level),
            valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn builder_allocates_const_and_binary_expressions() {
        let arena = Arena::new();
        let b = AstBuilder::new(&arena);
        let one = b.const_exp(1, false);
        let two = b.const_exp(2, false);
        let sum = b.binary_exp(BinaryOp::Add, one, two, 1, 1);
        match sum {
            Expression::Binary { op, .. } => assert_eq!(*op, BinaryOp::Add),
            _ => panic!("expected Binary"),
        }
    }

    #[test]
    fn builder_builds_a_block_of_statements() {
        let arena = Arena::new();
        let b = AstBuilder::new(&arena);
        let e = b.bool_exp(true);
        let s1 = b.exp_stmt(e);
        let s2 = b.empty_stmt();
        let block = b.block_stmt(&[s1, s2]);
        match block {
            Statement::Block(stmts) => assert_eq!(stmts.len(), 2),
            _ => panic!("expected Block"),
        }
    }
}
