//! Recursive-descent parser: token stream → AST.
//!
//! A precedence ladder (`or` → `and` → `comparison` → `sum` → `term` →
//! `prefixed_factor` → `factor`), each level a `while`-loop consuming its
//! operators left-to-right — except `comparison`, which is deliberately
//! non-associative: it accepts at most one operator, so `a < b < c` is a
//! syntax error rather than silently parsing as `(a < b) < c`. See
//! DESIGN.md.

use crate::arena::Arena;
use crate::ast::{AstBuilder, BinaryOp, Expression, Param, Program, Statement, UnaryOp};
use crate::error::ErrorContext;
use crate::intern::Symbol;
use crate::token::{Token, TokenKind};
use crate::types::TypeKeyword;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    builder: AstBuilder<'a>,
    errors: ErrorContext,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, arena: &'a Arena, max_errors: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            builder: AstBuilder::new(arena),
            errors: ErrorContext::new(max_errors),
        }
    }

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::End)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let tok = self.peek();
        self.errors.push(tok.line, tok.column, message);
    }

    /// Consumes a token of `kind`, or records a diagnostic and advances
    /// anyway so the parser keeps making progress (simple panic-less
    /// recovery: one bad token costs one diagnostic, not an infinite loop).
    fn expect(&mut self, kind: TokenKind, what: &str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            self.error(format!("expected {what}"));
            self.advance()
        }
    }

    fn type_keyword(&mut self) -> TypeKeyword {
        let kind = self.peek_kind();
        let kw = match kind {
            TokenKind::Int
            | TokenKind::Int8
            | TokenKind::Int16
            | TokenKind::Int32
            | TokenKind::Int64 => TypeKeyword::Int,
            TokenKind::UInt
            | TokenKind::UInt8
            | TokenKind::UInt16
            | TokenKind::UInt32
            | TokenKind::UInt64 => TypeKeyword::Uint,
            TokenKind::Bool => TypeKeyword::Bool,
            _ => {
                self.error("expected a type");
                return TypeKeyword::Void;
            }
        };
        self.advance();
        kw
    }

    /// Parses the whole program: a sequence of top-level statements up to
    /// `End`. Mirrors the original `Parser::parse`'s top-level loop: after a
    /// statement production leaves a diagnostic behind, parsing stops rather
    /// than continuing to scavenge more of the token stream. Returns the
    /// collected diagnostics; the caller checks `errors.has_errors()` (or
    /// `program.valid`) before trusting the tree.
    pub fn parse(mut self) -> (Program<'a>, ErrorContext) {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::End) {
            stmts.push(self.top_level_item());
            if self.errors.has_errors() {
                break;
            }
        }
        let valid = !self.errors.has_errors() && self.check(TokenKind::End);
        (self.builder.program(&stmts, valid), self.errors)
    }

    /// `top_level := (statement | function_def | extern_fn)*`. Function and
    /// extern definitions are only reachable here — `statement()` has no
    /// such alternative, matching `parser.cpp`'s `parse_statement()`, which
    /// has no FUNCTION/EXTERN case.
    fn top_level_item(&mut self) -> &'a Statement<'a> {
        match self.peek_kind() {
            TokenKind::Function | TokenKind::Extern => self.function_def(),
            _ => self.statement(),
        }
    }

    fn statement(&mut self) -> &'a Statement<'a> {
        match self.peek_kind() {
            TokenKind::LBrace => self.block(),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Int
            | TokenKind::Int8
            | TokenKind::Int16
            | TokenKind::Int32
            | TokenKind::Int64
            | TokenKind::UInt
            | TokenKind::UInt8
            | TokenKind::UInt16
            | TokenKind::UInt32
            | TokenKind::UInt64
            | TokenKind::Bool => self.decl_stmt(),
            TokenKind::Semicolon => {
                self.advance();
                self.builder.empty_stmt()
            }
            _ => self.assign_or_exp_stmt(),
        }
    }

    fn function_def(&mut self) -> &'a Statement<'a> {
        let is_extern = self.matches(TokenKind::Extern);
        let start = self.expect(TokenKind::Function, "'function'");
        let name = self.ident_symbol();
        self.expect(TokenKind::LParen, "'('");
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let type_kw = self.type_keyword();
                let pname = self.ident_symbol();
                params.push(Param {
                    name: pname,
                    type_kw,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'");
        let return_type = if self.matches(TokenKind::Arrow) {
            self.type_keyword()
        } else {
            TypeKeyword::Void
        };

        let body = if is_extern {
            self.expect(TokenKind::Semicolon, "';'");
            None
        } else {
            Some(self.block())
        };

        let func = self.builder.func_def(
            name,
            &params,
            return_type,
            body,
            is_extern,
            start.line,
            start.column,
        );
        self.builder.func_def_stmt(func)
    }

    fn block(&mut self) -> &'a Statement<'a> {
        self.expect(TokenKind::LBrace, "'{'");
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::End) {
            stmts.push(self.statement());
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.builder.block_stmt(&stmts)
    }

    fn if_stmt(&mut self) -> &'a Statement<'a> {
        self.advance();
        self.expect(TokenKind::LParen, "'('");
        let condition = self.expression();
        self.expect(TokenKind::RParen, "')'");
        let true_stmt = self.statement();
        let else_stmt = if self.matches(TokenKind::Else) {
            Some(self.statement())
        } else {
            None
        };
        self.builder.if_stmt(condition, true_stmt, else_stmt)
    }

    fn while_stmt(&mut self) -> &'a Statement<'a> {
        self.advance();
        self.expect(TokenKind::LParen, "'('");
        let condition = self.expression();
        self.expect(TokenKind::RParen, "')'");
        let stmt = self.statement();
        self.builder.while_stmt(condition, stmt)
    }

    fn return_stmt(&mut self) -> &'a Statement<'a> {
        let tok = self.advance();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression())
        };
        self.expect(TokenKind::Semicolon, "';'");
        self.builder.return_stmt(value, tok.line, tok.column)
    }

    fn decl_stmt(&mut self) -> &'a Statement<'a> {
        let tok = self.peek();
        let type_kw = self.type_keyword();
        let name = self.ident_symbol();
        let init = if self.matches(TokenKind::Assign) {
            Some(self.expression())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'");
        self.builder
            .decl_stmt(name, type_kw, init, tok.line, tok.column)
    }

    fn assign_or_exp_stmt(&mut self) -> &'a Statement<'a> {
        let tok = self.peek();
        if self.check(TokenKind::Ident) && self.peek_next_kind() == TokenKind::Assign {
            let name = self.ident_symbol();
            self.advance(); // '='
            let value = self.expression();
            self.expect(TokenKind::Semicolon, "';'");
            return self.builder.assign_stmt(name, value, tok.line, tok.column);
        }
        let exp = self.expression();
        self.expect(TokenKind::Semicolon, "';'");
        self.builder.exp_stmt(exp)
    }

    fn ident_symbol(&mut self) -> Symbol {
        if self.check(TokenKind::Ident) {
            let tok = self.advance();
            tok.text.expect("Ident token always carries text")
        } else {
            self.error("expected an identifier");
            self.advance();
            // A symbol-table lookup against this sentinel will simply fail
            // to resolve, which surfaces as its own diagnostic downstream.
            Symbol::sentinel()
        }
    }

    // ----- expression precedence ladder -----

    fn expression(&mut self) -> &'a Expression<'a> {
        self.or_exp()
    }

    fn or_exp(&mut self) -> &'a Expression<'a> {
        let mut left = self.and_exp();
        while self.check(TokenKind::Or) {
            let tok = self.advance();
            let right = self.and_exp();
            left = self
                .builder
                .binary_exp(BinaryOp::Or, left, right, tok.line, tok.column);
        }
        left
    }

    fn and_exp(&mut self) -> &'a Expression<'a> {
        let mut left = self.comparison();
        while self.check(TokenKind::And) {
            let tok = self.advance();
            let right = self.comparison();
            left = self
                .builder
                .binary_exp(BinaryOp::And, left, right, tok.line, tok.column);
        }
        left
    }

    /// Non-associative: parses one `sum`, then optionally exactly one
    /// comparison operator and one more `sum`. Deliberately not a loop —
    /// see the module doc comment.
    fn comparison(&mut self) -> &'a Expression<'a> {
        let left = self.sum();
        let op = match self.peek_kind() {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                let tok = self.advance();
                let right = self.sum();
                if matches!(
                    self.peek_kind(),
                    TokenKind::Eq
                        | TokenKind::Ne
                        | TokenKind::Lt
                        | TokenKind::Gt
                        | TokenKind::Le
                        | TokenKind::Ge
                ) {
                    self.error("comparison operators do not associate; parenthesize");
                }
                self.builder.binary_exp(op, left, right, tok.line, tok.column)
            }
            None => left,
        }
    }

    fn sum(&mut self) -> &'a Expression<'a> {
        let mut left = self.term();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let tok = self.advance();
            let right = self.term();
            left = self.builder.binary_exp(op, left, right, tok.line, tok.column);
        }
        left
    }

    fn term(&mut self) -> &'a Expression<'a> {
        let mut left = self.prefixed_factor();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let tok = self.advance();
            let right = self.prefixed_factor();
            left = self.builder.binary_exp(op, left, right, tok.line, tok.column);
        }
        left
    }

    fn prefixed_factor(&mut self) -> &'a Expression<'a> {
        match self.peek_kind() {
            TokenKind::Not => {
                let tok = self.advance();
                let operand = self.prefixed_factor();
                self.builder
                    .unary_exp(UnaryOp::Not, operand, tok.line, tok.column)
            }
            TokenKind::Minus => {
                let tok = self.advance();
                let operand = self.prefixed_factor();
                self.builder
                    .unary_exp(UnaryOp::Neg, operand, tok.line, tok.column)
            }
            _ => self.factor(),
        }
    }

    fn factor(&mut self) -> &'a Expression<'a> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::True => {
                self.advance();
                self.builder.bool_exp(true)
            }
            TokenKind::False => {
                self.advance();
                self.builder.bool_exp(false)
            }
            TokenKind::IntLit => {
                self.advance();
                self.builder.const_exp(tok.value, false)
            }
            TokenKind::UIntLit => {
                self.advance();
                self.builder.const_exp(tok.value, true)
            }
            TokenKind::LParen => {
                self.advance();
                let exp = self.expression();
                self.expect(TokenKind::RParen, "')'");
                exp
            }
            TokenKind::Ident => {
                if self.peek_next_kind() == TokenKind::LParen {
                    self.call_exp()
                } else {
                    let name = self.ident_symbol();
                    self.builder.var_exp(name, tok.line, tok.column)
                }
            }
            _ => {
                self.error("expected an expression");
                self.advance();
                self.builder.const_exp(0, false)
            }
        }
    }

    fn call_exp(&mut self) -> &'a Expression<'a> {
        let tok = self.peek();
        let name = self.ident_symbol();
        self.expect(TokenKind::LParen, "'('");
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.expression());
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'");
        self.builder.call_exp(name, &args, tok.line, tok.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::token::tokenize;

    fn parse_ok<'a>(arena: &'a Arena, src: &str) -> Program<'a> {
        let mut interner = Interner::new();
        let tokens = tokenize(src, &mut interner);
        let parser = Parser::new(tokens, arena, 10);
        let (program, errors) = parser.parse();
        assert!(!errors.has_errors(), "unexpected errors: {:?}", errors.errors());
        assert!(program.valid);
        program
    }

    #[test]
    fn parses_empty_function() {
        let arena = Arena::new();
        let program = parse_ok(&arena, "function main() { }");
        assert_eq!(program.top_level.len(), 1);
        match program.top_level[0] {
            Statement::FuncDef(f) => {
                assert!(!f.is_extern);
                assert_eq!(f.params.len(), 0);
            }
            _ => panic!("expected FuncDef"),
        }
    }

    #[test]
    fn parses_extern_function_with_no_body() {
        let arena = Arena::new();
        let program = parse_ok(&arena, "extern function putc(int c) -> int;");
        match program.top_level[0] {
            Statement::FuncDef(f) => {
                assert!(f.is_extern);
                assert!(f.body.is_none());
                assert_eq!(f.params.len(), 1);
            }
            _ => panic!("expected FuncDef"),
        }
    }

    #[test]
    fn comparison_does_not_chain() {
        let arena = Arena::new();
        let mut interner = Interner::new();
        let tokens = tokenize("function f() { int x = 1 < 2 < 3; }", &mut interner);
        let parser = Parser::new(tokens, &arena, 10);
        let (program, errors) = parser.parse();
        assert!(errors.has_errors());
        assert!(!program.valid);
    }

    /// Mirrors the original `Parser::parse`'s top-level loop: once one
    /// top-level production leaves a diagnostic, the parser stops rather
    /// than scavenging the rest of the token stream for more.
    #[test]
    fn parser_aborts_after_the_first_top_level_error() {
        let arena = Arena::new();
        let mut interner = Interner::new();
        let tokens = tokenize("int 1 = 2; int y = 3;", &mut interner);
        let parser = Parser::new(tokens, &arena, 10);
        let (program, errors) = parser.parse();
        assert!(!program.valid);
        // Only the first, malformed declaration was attempted; the second
        // well-formed one was never reached.
        assert_eq!(program.top_level.len(), 1);
        assert_eq!(errors.count(), 1, "{:?}", errors.errors());
    }

    /// Function definitions are only a `top_level` alternative, never a
    /// `statement` one, so the grammar rejects one nested inside a block.
    #[test]
    fn function_def_does_not_nest_inside_a_block() {
        let arena = Arena::new();
        let mut interner = Interner::new();
        let tokens = tokenize("function outer() { function inner() { } }", &mut interner);
        let parser = Parser::new(tokens, &arena, 10);
        let (program, errors) = parser.parse();
        assert!(!program.valid);
        assert!(errors.has_errors());
    }

    #[test]
    fn parses_if_else_and_while() {
        let arena = Arena::new();
        let program = parse_ok(
            &arena,
            "function f() { if (true) { } else { } while (false) { } }",
        );
        assert_eq!(program.top_level.len(), 1);
    }

    #[test]
    fn parses_call_with_arguments() {
        let arena = Arena::new();
        let program = parse_ok(&arena, "function f() { g(1, 2, x); }");
        match program.top_level[0] {
            Statement::FuncDef(f) => match f.body.unwrap() {
                Statement::Block(stmts) => match stmts[0] {
                    Statement::Exp(Expression::Call { args, .. }) => {
                        assert_eq!(args.len(), 3);
                    }
                    _ => panic!("expected call expression statement"),
                },
                _ => panic!("expected block"),
            },
            _ => panic!("expected FuncDef"),
        }
    }

    #[test]
    fn operator_precedence_binds_mul_tighter_than_add() {
        let arena = Arena::new();
        let program = parse_ok(&arena, "function f() { int x = 1 + 2 * 3; }");
        match program.top_level[0] {
            Statement::FuncDef(f) => match f.body.unwrap() {
                Statement::Block(stmts) => match stmts[0] {
                    Statement::Decl {
                        init: Some(Expression::Binary { op, right, .. }),
                        ..
                    } => {
                        assert_eq!(*op, BinaryOp::Add);
                        assert!(matches!(right, Expression::Binary { op: BinaryOp::Mul, .. }));
                    }
                    _ => panic!("expected decl with binary init"),
                },
                _ => panic!("expected block"),
            },
            _ => panic!("expected FuncDef"),
        }
    }
}
