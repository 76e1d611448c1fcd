//! IR generation.
//!
//! A single `IrGen` struct walks the AST with a `SymTable<Operand>`,
//! lowering expressions to a flat sequence of three-address `Quad`s and
//! statements to control flow over them.
//!
//! `Operand` is a tagged Rust enum rather than a C-style union — the
//! union's "only the field matching the opcode is meaningful" discipline is
//! exactly what an enum already enforces at compile time. `Routine::quads`
//! is a growable `Vec<Quad>` rather than a linked list of fixed-size quad
//! blocks; backpatching (short-circuit `&&`/`||`, `if`, `while`) works off
//! the `Vec` index returned by [`Routine::push`] instead of a retained
//! pointer.
//!
//! Every top-level function's routine id is hoisted into scope in a first
//! pass (the same two-pass shape `typechecker.rs` uses) before any function
//! body is walked, so a forward call to a function declared later in the
//! source resolves correctly — mutual and forward recursion work regardless
//! of declaration order.

use crate::ast::{BinaryOp, Expression, FuncDef, Param, Program, Statement, UnaryOp};
use crate::intern::{Interner, Symbol};
use crate::scope::SymTable;
use crate::types::DataType;

/// The full set of three-address IR opcodes this compiler lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    MovIm,
    Mov,
    Not,
    Neg,
    Mul,
    Imul,
    Div,
    Idiv,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Below,
    Gt,
    Above,
    Le,
    Be,
    Ge,
    Ae,
    Jmp,
    Jz,
    Jnz,
    Label,
    Call,
    Ret,
    Arg,
}

/// A quad operand: a temp id, a function id, an argument index, a label, an
/// immediate value, or a call's return-value marker. Each `Op` only ever
/// reads the variant it expects, enforced by the tag instead of by
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Temp(u32),
    Func(u32),
    Arg(u32),
    Label(u32),
    IntValue(u64),
    ReturnsSomething(bool),
    /// Unused operand slot (e.g. `Jmp`'s `left`/`right`, `Label`'s operands).
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct Quad {
    pub op: Op,
    pub target: Operand,
    pub left: Operand,
    pub right: Operand,
}

/// One function's (or `@top_level`'s) lowered body.
#[derive(Debug)]
pub struct Routine {
    pub name: Symbol,
    pub id: u32,
    pub param_count: u32,
    pub is_extern: bool,
    pub quads: Vec<Quad>,
    next_temp: u32,
    next_label: u32,
}

impl Routine {
    fn new(name: Symbol, id: u32) -> Self {
        Routine {
            name,
            id,
            param_count: 0,
            is_extern: false,
            quads: Vec::new(),
            next_temp: 0,
            next_label: 0,
        }
    }

    fn new_extern(name: Symbol, id: u32, param_count: u32) -> Self {
        Routine {
            name,
            id,
            param_count,
            is_extern: true,
            quads: Vec::new(),
            next_temp: 0,
            next_label: 0,
        }
    }

    pub fn temp_count(&self) -> u32 {
        self.next_temp
    }

    fn make_temp(&mut self) -> Operand {
        let id = self.next_temp;
        self.next_temp += 1;
        Operand::Temp(id)
    }

    fn make_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    /// Appends a quad, returning its index so callers can backpatch a
    /// placeholder `target` once the jump's destination is known.
    fn push(&mut self, op: Op, target: Operand, left: Operand, right: Operand) -> usize {
        self.quads.push(Quad { op, target, left, right });
        self.quads.len() - 1
    }

    fn place_label(&mut self, label_id: u32) {
        self.push(Op::Label, Operand::Label(label_id), Operand::None, Operand::None);
    }
}

/// A whole compiled program: every routine, indexed by id. `@top_level`
/// (the lowering of the program's top-level statements) is always id 0.
#[derive(Debug)]
pub struct Ir {
    pub routines: Vec<Routine>,
}

/// What a name resolves to while lowering: either a variable's current
/// operand (always a `Temp`) paired with its declared type, or a function's
/// routine id paired with its declaration (for arity/return-type lookups at
/// call sites, same shape as `DataType::Func` in the type checker).
#[derive(Clone, Copy)]
enum Binding<'a> {
    Var(Operand, DataType<'a>),
    Func(u32, &'a FuncDef<'a>),
}

struct IrGen<'a> {
    sym: SymTable<Binding<'a>>,
    next_routine_id: u32,
    routines: Vec<Routine>,
}

impl<'a> IrGen<'a> {
    fn new() -> Self {
        IrGen {
            sym: SymTable::new(),
            next_routine_id: 1, // 0 is reserved for @top_level
            routines: Vec::new(),
        }
    }

    /// Pass one: assigns every top-level function a routine id up front so
    /// a call can resolve it regardless of whether the callee's `FuncDef`
    /// has been visited yet.
    fn hoist_top_level(&mut self, stmts: &'a [&'a Statement<'a>]) {
        for stmt in stmts {
            if let Statement::FuncDef(func) = stmt {
                let id = self.next_routine_id;
                self.next_routine_id += 1;
                self.sym.put(func.name, Binding::Func(id, func));
            }
        }
    }

    fn gen_stmt(&mut self, routine: &mut Routine, stmt: &'a Statement<'a>) {
        match stmt {
            Statement::Empty => {}
            Statement::Exp(e) => {
                self.gen_expr(routine, e);
            }
            Statement::Assign { var_name, value, .. } => {
                let target = match self.sym.get(*var_name) {
                    Some(Binding::Var(op, _)) => *op,
                    _ => unreachable!("checker guarantees assignment targets are declared variables"),
                };
                let value = self.gen_expr(routine, value);
                routine.push(Op::Mov, target, value, Operand::None);
            }
            Statement::Decl {
                var_name, type_kw, init, ..
            } => {
                let ty = type_kw.to_data_type();
                let operand = match init {
                    Some(init) => self.gen_expr(routine, init),
                    None => routine.make_temp(),
                };
                self.sym.put(*var_name, Binding::Var(operand, ty));
            }
            Statement::Return { value, .. } => match value {
                None => {
                    routine.push(Op::Ret, Operand::ReturnsSomething(false), Operand::None, Operand::None);
                }
                Some(exp) => {
                    let value = self.gen_expr(routine, exp);
                    routine.push(Op::Ret, Operand::ReturnsSomething(true), value, Operand::None);
                }
            },
            Statement::If {
                condition,
                true_stmt,
                else_stmt,
            } => self.gen_if(routine, condition, true_stmt, *else_stmt),
            Statement::While { condition, stmt } => self.gen_while(routine, condition, stmt),
            Statement::Block(stmts) => {
                self.sym.enter_scope();
                for s in *stmts {
                    self.gen_stmt(routine, s);
                }
                self.sym.exit_scope();
            }
            Statement::FuncDef(func) => self.gen_func_def(func),
        }
    }

    fn gen_if(
        &mut self,
        routine: &mut Routine,
        condition: &'a Expression<'a>,
        true_stmt: &'a Statement<'a>,
        else_stmt: Option<&'a Statement<'a>>,
    ) {
        let cond = self.gen_expr(routine, condition);
        let jz_idx = routine.push(Op::Jz, Operand::None, cond, Operand::None);
        self.gen_stmt(routine, true_stmt);
        match else_stmt {
            None => {
                let after = routine.make_label_id();
                routine.quads[jz_idx].target = Operand::Label(after);
                routine.place_label(after);
            }
            Some(else_stmt) => {
                let jmp_idx = routine.push(Op::Jmp, Operand::None, Operand::None, Operand::None);
                let else_label = routine.make_label_id();
                routine.quads[jz_idx].target = Operand::Label(else_label);
                routine.place_label(else_label);
                self.gen_stmt(routine, else_stmt);
                let after = routine.make_label_id();
                routine.quads[jmp_idx].target = Operand::Label(after);
                routine.place_label(after);
            }
        }
    }

    fn gen_while(&mut self, routine: &mut Routine, condition: &'a Expression<'a>, body: &'a Statement<'a>) {
        let start = routine.make_label_id();
        routine.place_label(start);
        let cond = self.gen_expr(routine, condition);
        let jz_idx = routine.push(Op::Jz, Operand::None, cond, Operand::None);
        self.gen_stmt(routine, body);
        routine.push(Op::Jmp, Operand::Label(start), Operand::None, Operand::None);
        let after = routine.make_label_id();
        routine.quads[jz_idx].target = Operand::Label(after);
        routine.place_label(after);
    }

    fn gen_func_def(&mut self, func: &'a FuncDef<'a>) {
        // `hoist_top_level` only scans `program.top_level`, so a `FuncDef`
        // reached any other way (the grammar forbids it, but this doesn't
        // rely on that) wouldn't have a routine id yet. Assign one lazily
        // rather than assume hoisting already covered it.
        let id = match self.sym.get(func.name) {
            Some(Binding::Func(id, _)) => *id,
            _ => {
                let id = self.next_routine_id;
                self.next_routine_id += 1;
                self.sym.put(func.name, Binding::Func(id, func));
                id
            }
        };
        if func.is_extern || func.body.is_none() {
            self.routines.push(Routine::new_extern(func.name, id, func.params.len() as u32));
            return;
        }
        let mut r = Routine::new(func.name, id);
        r.param_count = func.params.len() as u32;
        self.sym.enter_scope();
        for Param { name, type_kw } in func.params {
            let temp = r.make_temp();
            self.sym.put(*name, Binding::Var(temp, type_kw.to_data_type()));
        }
        if let Some(body) = func.body {
            self.gen_stmt(&mut r, body);
        }
        self.sym.exit_scope();
        self.routines.push(r);
    }

    fn gen_expr(&mut self, routine: &mut Routine, exp: &'a Expression<'a>) -> Operand {
        match exp {
            Expression::Bool(value) => {
                let result = routine.make_temp();
                routine.push(Op::MovIm, result, Operand::IntValue(*value as u64), Operand::None);
                result
            }
            Expression::Const { value, .. } => {
                let result = routine.make_temp();
                routine.push(Op::MovIm, result, Operand::IntValue(*value), Operand::None);
                result
            }
            Expression::Var { name, .. } => match self.sym.get(*name) {
                Some(Binding::Var(op, _)) => *op,
                _ => unreachable!("checker guarantees variable references are declared"),
            },
            Expression::Call { func_name, args, .. } => self.gen_call(routine, *func_name, args),
            Expression::Unary { op, operand, .. } => self.gen_unary(routine, *op, operand),
            Expression::Binary { op, left, right, .. } => self.gen_binary(routine, *op, left, right),
        }
    }

    fn gen_call(&mut self, routine: &mut Routine, func_name: Symbol, args: &'a [&'a Expression<'a>]) -> Operand {
        for (i, arg) in args.iter().enumerate() {
            let value = self.gen_expr(routine, arg);
            routine.push(Op::Arg, Operand::Arg(i as u32), value, Operand::None);
        }
        let func_id = match self.sym.get(func_name) {
            Some(Binding::Func(id, _)) => *id,
            _ => unreachable!("checker guarantees calls target declared functions"),
        };
        let result = routine.make_temp();
        routine.push(Op::Call, result, Operand::Func(func_id), Operand::None);
        result
    }

    fn gen_unary(&mut self, routine: &mut Routine, op: UnaryOp, operand: &'a Expression<'a>) -> Operand {
        let value = self.gen_expr(routine, operand);
        let result = routine.make_temp();
        let ir_op = match op {
            UnaryOp::Not => Op::Not,
            UnaryOp::Neg => Op::Neg,
        };
        routine.push(ir_op, result, value, Operand::None);
        result
    }

    fn gen_binary(
        &mut self,
        routine: &mut Routine,
        op: BinaryOp,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
    ) -> Operand {
        let result = routine.make_temp();
        let left_val = self.gen_expr(routine, left);
        match op {
            BinaryOp::And => {
                routine.push(Op::Mov, result, left_val, Operand::None);
                let jz_idx = routine.push(Op::Jz, Operand::None, result, Operand::None);
                let right_val = self.gen_expr(routine, right);
                routine.push(Op::Mov, result, right_val, Operand::None);
                let after = routine.make_label_id();
                routine.quads[jz_idx].target = Operand::Label(after);
                routine.place_label(after);
            }
            BinaryOp::Or => {
                routine.push(Op::Mov, result, left_val, Operand::None);
                let jnz_idx = routine.push(Op::Jnz, Operand::None, result, Operand::None);
                let right_val = self.gen_expr(routine, right);
                routine.push(Op::Mov, result, right_val, Operand::None);
                let after = routine.make_label_id();
                routine.quads[jnz_idx].target = Operand::Label(after);
                routine.place_label(after);
            }
            _ => {
                let right_val = self.gen_expr(routine, right);
                let is_uint = matches!(self.expr_type(left), DataType::Uint);
                let ir_op = match op {
                    BinaryOp::Mul => if is_uint { Op::Mul } else { Op::Imul },
                    BinaryOp::Div => if is_uint { Op::Div } else { Op::Idiv },
                    BinaryOp::Add => Op::Add,
                    BinaryOp::Sub => Op::Sub,
                    BinaryOp::Eq => Op::Eq,
                    BinaryOp::Ne => Op::Ne,
                    BinaryOp::Lt => if is_uint { Op::Below } else { Op::Lt },
                    BinaryOp::Gt => if is_uint { Op::Above } else { Op::Gt },
                    BinaryOp::Le => if is_uint { Op::Be } else { Op::Le },
                    BinaryOp::Ge => if is_uint { Op::Ae } else { Op::Ge },
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                };
                routine.push(ir_op, result, left_val, right_val);
            }
        }
        result
    }

    /// Re-derives an expression's static type during lowering. The checker
    /// already rejected any program for which this could disagree with it;
    /// this walk only needs to pick the signed/unsigned opcode variant, not
    /// to diagnose anything, so it never pushes errors.
    fn expr_type(&self, exp: &'a Expression<'a>) -> DataType<'a> {
        match exp {
            Expression::Bool(_) => DataType::Bool,
            Expression::Const { is_uint, .. } => {
                if *is_uint {
                    DataType::Uint
                } else {
                    DataType::Int
                }
            }
            Expression::Var { name, .. } => match self.sym.get(*name) {
                Some(Binding::Var(_, ty)) => *ty,
                _ => DataType::Void,
            },
            Expression::Call { func_name, .. } => match self.sym.get(*func_name) {
                Some(Binding::Func(_, func)) => func.return_type.to_data_type(),
                _ => DataType::Void,
            },
            Expression::Unary { op, .. } => match op {
                UnaryOp::Not => DataType::Bool,
                UnaryOp::Neg => DataType::Int,
            },
            Expression::Binary { op, left, .. } => match op {
                BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge => DataType::Bool,
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Add | BinaryOp::Sub => self.expr_type(left),
            },
        }
    }
}

/// Lowers a checked program to IR. Assumes `program` already passed
/// [`crate::typechecker::TypeChecker::check`] without errors; behaviour on
/// an ill-typed program is unspecified (the unary `unreachable!`s above may
/// fire).
pub fn gen_ir<'a>(program: &Program<'a>, interner: &mut Interner) -> Ir {
    let mut gen = IrGen::new();
    gen.hoist_top_level(program.top_level);

    let top_level_name = interner.intern("@top_level");
    let mut top_level = Routine::new(top_level_name, 0);
    for stmt in program.top_level {
        gen.gen_stmt(&mut top_level, stmt);
    }

    let mut routines = Vec::with_capacity(gen.routines.len() + 1);
    routines.push(top_level);
    routines.append(&mut gen.routines);
    Ir { routines }
}

/// A tree-walking evaluator over lowered IR, used only by tests as an oracle
/// for whether a lowering is semantically sound. Never built into the
/// public API — test-only.
#[cfg(test)]
mod eval {
    use super::*;

    const VOID_VALUE: u64 = 0xdead_f00d_baad_f00d;

    struct Frame {
        temps: Vec<u64>,
    }

    impl Frame {
        fn new() -> Self {
            Frame { temps: vec![0; 256] }
        }

        fn get(&self, temp: u32) -> u64 {
            self.temps[temp as usize]
        }

        fn set(&mut self, temp: u32, value: u64) {
            self.temps[temp as usize] = value;
        }
    }

    struct Evaluator<'r> {
        routines: &'r [Routine],
        /// Last value written by any `set`, across every nested call — what
        /// the original's `Evaluator::lastval` tracks, independent of
        /// whatever `eval_routine` itself returns. Tests read this rather
        /// than a routine's own return value, matching `ir_eval.cpp`'s
        /// top-level `eval(IR&)`.
        last_value: u64,
        last_is_void: bool,
        pending_args: Vec<u64>,
    }

    impl<'r> Evaluator<'r> {
        fn new(routines: &'r [Routine]) -> Self {
            Evaluator {
                routines,
                last_value: 0,
                last_is_void: true,
                pending_args: Vec::new(),
            }
        }

        fn set(&mut self, frame: &mut Frame, temp: u32, value: u64) {
            frame.set(temp, value);
            self.last_value = value;
            self.last_is_void = false;
        }

        /// Returns `(value, is_void)`, mirroring the original's `Voidable`.
        fn eval_routine(&mut self, routine: &Routine, args: &[u64]) -> (u64, bool) {
            if routine.is_extern {
                return (0, true);
            }
            let mut frame = Frame::new();
            for (i, arg) in args.iter().enumerate() {
                frame.set(i as u32, *arg);
            }

            let mut rv = (0u64, true);
            let mut i = 0usize;
            while i < routine.quads.len() {
                let quad = routine.quads[i];
                match quad.op {
                    Op::MovIm => {
                        let v = int_value(quad.left);
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Mov => {
                        let v = frame.get(temp_id(quad.left));
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Not => {
                        let v = (frame.get(temp_id(quad.left)) == 0) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Neg => {
                        let v = (-(frame.get(temp_id(quad.left)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Mul => {
                        let v = frame.get(temp_id(quad.left)).wrapping_mul(frame.get(temp_id(quad.right)));
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Imul => {
                        let v = (frame.get(temp_id(quad.left)) as i64)
                            .wrapping_mul(frame.get(temp_id(quad.right)) as i64) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Div => {
                        let v = frame.get(temp_id(quad.left)) / frame.get(temp_id(quad.right));
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Idiv => {
                        let v = ((frame.get(temp_id(quad.left)) as i64) / (frame.get(temp_id(quad.right)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Add => {
                        let v = frame.get(temp_id(quad.left)).wrapping_add(frame.get(temp_id(quad.right)));
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Sub => {
                        let v = frame.get(temp_id(quad.left)).wrapping_sub(frame.get(temp_id(quad.right)));
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Eq => {
                        let v = (frame.get(temp_id(quad.left)) == frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Ne => {
                        let v = (frame.get(temp_id(quad.left)) != frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Lt => {
                        let v = ((frame.get(temp_id(quad.left)) as i64) < (frame.get(temp_id(quad.right)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Below => {
                        let v = (frame.get(temp_id(quad.left)) < frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Gt => {
                        let v = ((frame.get(temp_id(quad.left)) as i64) > (frame.get(temp_id(quad.right)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Above => {
                        let v = (frame.get(temp_id(quad.left)) > frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Le => {
                        let v = ((frame.get(temp_id(quad.left)) as i64) <= (frame.get(temp_id(quad.right)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Be => {
                        let v = (frame.get(temp_id(quad.left)) <= frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Ge => {
                        let v = ((frame.get(temp_id(quad.left)) as i64) >= (frame.get(temp_id(quad.right)) as i64)) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Ae => {
                        let v = (frame.get(temp_id(quad.left)) >= frame.get(temp_id(quad.right))) as u64;
                        self.set(&mut frame, temp_id(quad.target), v);
                    }
                    Op::Jmp => {
                        i = label_id(quad.target) as usize;
                        continue;
                    }
                    Op::Jz => {
                        if frame.get(temp_id(quad.left)) == 0 {
                            i = label_id(quad.target) as usize;
                            continue;
                        }
                    }
                    Op::Jnz => {
                        if frame.get(temp_id(quad.left)) != 0 {
                            i = label_id(quad.target) as usize;
                            continue;
                        }
                    }
                    Op::Label => {}
                    Op::Call => {
                        let callee = &self.routines[func_id(quad.left) as usize];
                        let callee_args = std::mem::take(&mut self.pending_args);
                        let (value, is_void) = self.eval_routine(callee, &callee_args);
                        self.set(&mut frame, temp_id(quad.target), value);
                        self.last_is_void = is_void;
                    }
                    Op::Ret => {
                        if returns_something(quad.target) {
                            rv = (frame.get(temp_id(quad.left)), false);
                        } else {
                            rv = (0, true);
                        }
                        break;
                    }
                    Op::Arg => {
                        let index = arg_index(quad.target) as usize;
                        let value = frame.get(temp_id(quad.left));
                        if self.pending_args.len() <= index {
                            self.pending_args.resize(index + 1, 0);
                        }
                        self.pending_args[index] = value;
                        self.last_value = value;
                        self.last_is_void = false;
                    }
                }
                i += 1;
            }
            rv
        }
    }

    fn temp_id(op: Operand) -> u32 {
        match op {
            Operand::Temp(id) => id,
            _ => panic!("expected a Temp operand, found {op:?}"),
        }
    }

    fn label_id(op: Operand) -> u32 {
        match op {
            Operand::Label(id) => id,
            _ => panic!("expected a Label operand, found {op:?}"),
        }
    }

    fn func_id(op: Operand) -> u32 {
        match op {
            Operand::Func(id) => id,
            _ => panic!("expected a Func operand, found {op:?}"),
        }
    }

    fn arg_index(op: Operand) -> u32 {
        match op {
            Operand::Arg(id) => id,
            _ => panic!("expected an Arg operand, found {op:?}"),
        }
    }

    fn int_value(op: Operand) -> u64 {
        match op {
            Operand::IntValue(v) => v,
            _ => panic!("expected an IntValue operand, found {op:?}"),
        }
    }

    fn returns_something(op: Operand) -> bool {
        match op {
            Operand::ReturnsSomething(b) => b,
            _ => panic!("expected a ReturnsSomething operand, found {op:?}"),
        }
    }

    /// Evaluates `@top_level` and returns its last meaningful value, or
    /// `VOID_VALUE` if the program never produced one — mirrors the
    /// original's `eval(IR&)` entry point, including its void sentinel.
    pub fn eval(ir: &Ir) -> u64 {
        if ir.routines.is_empty() {
            return 0;
        }
        let mut evaluator = Evaluator::new(&ir.routines);
        evaluator.eval_routine(&ir.routines[0], &[]);
        if evaluator.last_is_void {
            VOID_VALUE
        } else {
            evaluator.last_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::parser::Parser;
    use crate::token::tokenize;
    use crate::typechecker::TypeChecker;

    fn lower(src: &str) -> Ir {
        let arena = Arena::new();
        let mut interner = Interner::new();
        let tokens = tokenize(src, &mut interner);
        let parser = Parser::new(tokens, &arena, 10);
        let (program, parse_errors) = parser.parse();
        assert!(!parse_errors.has_errors(), "{:?}", parse_errors.errors());
        let checker = TypeChecker::new(&mut interner, 10);
        let check_errors = checker.check(&program);
        assert!(!check_errors.has_errors(), "{:?}", check_errors.errors());
        gen_ir(&program, &mut interner)
    }

    #[test]
    fn top_level_is_always_routine_zero() {
        let ir = lower("int x = 1;");
        assert_eq!(ir.routines[0].id, 0);
    }

    #[test]
    fn while_loop_emits_exactly_one_label_jz_and_jmp() {
        let ir = lower("int i = 0; while (i < 3) { i = i + 1; }");
        let top = &ir.routines[0];
        let labels = top.quads.iter().filter(|q| q.op == Op::Label).count();
        let jzs = top.quads.iter().filter(|q| q.op == Op::Jz).count();
        let jmps = top.quads.iter().filter(|q| q.op == Op::Jmp).count();
        assert_eq!(labels, 2, "loop start and loop end labels");
        assert_eq!(jzs, 1);
        assert_eq!(jmps, 1);
    }

    #[test]
    fn forward_call_to_later_function_resolves() {
        let ir = lower(
            "function f() -> int { return g(); }\n\
             function g() -> int { return 1; }",
        );
        // f is declared first but calls g, declared after it; both must have
        // been assigned routine ids during hoisting.
        assert_eq!(ir.routines.len(), 3); // @top_level, f, g
        let f = ir.routines.iter().find(|r| r.id == 1).unwrap();
        assert!(f.quads.iter().any(|q| q.op == Op::Call));
    }

    #[test]
    fn extern_function_produces_a_bodyless_routine() {
        let ir = lower("extern function abs(int n) -> int; int x = abs(1);");
        let abs_routine = ir.routines.iter().find(|r| r.param_count == 1).unwrap();
        assert!(abs_routine.is_extern);
        assert!(abs_routine.quads.is_empty());
    }

    #[test]
    fn unsigned_comparison_picks_below_not_lt() {
        let ir = lower("uint a = 1u; uint b = 2u; bool r = a < b;");
        let top = &ir.routines[0];
        assert!(top.quads.iter().any(|q| q.op == Op::Below));
        assert!(!top.quads.iter().any(|q| q.op == Op::Lt));
    }

    #[test]
    fn literal_expression_evaluates_to_itself() {
        let ir = lower("42;");
        assert_eq!(eval::eval(&ir), 42);
    }

    #[test]
    fn arithmetic_evaluates_correctly() {
        let ir = lower("(2 + 3) * 4;");
        assert_eq!(eval::eval(&ir), 20);
    }

    #[test]
    fn while_loop_counts_up_to_three() {
        let ir = lower("int i = 0; while (i < 3) { i = i + 1; } i;");
        assert_eq!(eval::eval(&ir), 3);
    }

    #[test]
    fn if_else_picks_the_right_branch() {
        let ir = lower("int x; if (1 < 2) { x = 10; } else { x = 20; } x;");
        assert_eq!(eval::eval(&ir), 10);
    }

    #[test]
    fn short_circuit_or_skips_right_side_when_left_is_true() {
        let ir = lower("bool b = true || false; b;");
        assert_eq!(eval::eval(&ir), 1);
    }

    #[test]
    fn unary_negation_evaluates() {
        let ir = lower("int x = -5; x;");
        assert_eq!(eval::eval(&ir), (-5i64) as u64);
    }
}
