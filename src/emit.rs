//! NASM assembly emission.
//!
//! Per-routine temp bookkeeping of `{reg_id, base_offset, spilled}`, plus
//! `spill`/`get_register_for`/`get_any_register_for` to decide when a temp
//! needs a physical register and when it needs to move to the stack. NASM
//! text forms: `mov`, `cmp`/`cmovCC`, `push rbp` / `mov rbp, rsp` /
//! `sub rsp, N` prologue, `.epi:` epilogue, `.l<u32>` local labels. This
//! module is [`crate::regalloc`]'s only caller — `RegisterPool` tracks
//! *which* register holds *which* temp, `Emitter` decides *when* to spill
//! and writes the instructions for it.
//!
//! Call sequencing — buffer arguments, flush live registers, place each
//! argument in its parameter register or stack slot in order, then `call` —
//! follows the Windows x64 ABI's volatile-register set: every register in
//! the 7-register pool is caller-saved, so anything live across a call must
//! be spilled first.
//!
//! The basic-block flush discipline (spill every live register before a
//! `JMP`/`JZ`/`JNZ` and before/after every `LABEL`) is this module's
//! correctness contract: a register cannot be assumed live across a
//! control-flow edge its owning block didn't take. See DESIGN.md.

use std::fmt::Write as _;

use crate::intern::Interner;
use crate::ir::{Ir, Op, Operand, Quad, Routine};
use crate::regalloc::{Reg, RegisterPool, ALL_REGS, PARAM_REGS};

/// Per-temp bookkeeping, mirroring `code_gen.cpp`'s `Temp`.
#[derive(Clone, Copy)]
struct TempSlot {
    reg: Option<Reg>,
    /// Offset from `rbp`. Positive for incoming stack parameters
    /// (`16 + 8*index`), negative for spill slots. `0` means "not yet
    /// assigned a stack slot".
    base_offset: i32,
    spilled: bool,
}

impl TempSlot {
    fn fresh() -> Self {
        TempSlot {
            reg: None,
            base_offset: 0,
            spilled: false,
        }
    }
}

/// Lowers every non-`extern` [`Routine`] in an [`Ir`] to NASM text.
pub struct Emitter<'i> {
    interner: &'i Interner,
}

impl<'i> Emitter<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        Emitter { interner }
    }

    /// Emits the whole program: one `extern`/`global` line per routine, then
    /// `section .text`, then each non-`extern` routine's body.
    pub fn emit_program(&self, ir: &Ir) -> String {
        let mut out = String::new();
        for routine in &ir.routines {
            let name = self.interner.resolve(routine.name);
            if routine.is_extern {
                let _ = writeln!(out, "\textern {name}");
            } else {
                let _ = writeln!(out, "\tglobal {name}");
            }
        }
        let _ = writeln!(out, "\tsection .text");
        for routine in &ir.routines {
            if routine.is_extern {
                continue;
            }
            let mut r = RoutineEmitter::new(self.interner, ir, routine);
            r.emit();
            out.push_str(&r.body);
        }
        out
    }
}

/// State for lowering a single routine. A fresh one per routine, since temp
/// ids and register/stack assignments never cross routine boundaries.
struct RoutineEmitter<'i, 'r> {
    interner: &'i Interner,
    ir: &'r Ir,
    routine: &'r Routine,
    pool: RegisterPool,
    temps: Vec<TempSlot>,
    spill_count: i32,
    max_outgoing_args: u32,
    /// Set while materialising a run of `ARG` quads for one `CALL`, so the
    /// flush that must precede it only happens once, on the first `ARG`.
    in_call_setup: bool,
    /// Parameter registers already loaded for the call currently being set
    /// up, so the pre-`call` flush spares them while still clearing every
    /// other register — `call` clobbers all 7 pool registers, not just the
    /// ones the callee receives arguments in.
    call_param_regs: Vec<Reg>,
    body: String,
}

impl<'i, 'r> RoutineEmitter<'i, 'r> {
    fn new(interner: &'i Interner, ir: &'r Ir, routine: &'r Routine) -> Self {
        let temp_count = routine.temp_count() as usize;
        RoutineEmitter {
            interner,
            ir,
            routine,
            pool: RegisterPool::new(),
            temps: vec![TempSlot::fresh(); temp_count],
            spill_count: 0,
            max_outgoing_args: scan_max_outgoing_args(routine),
            in_call_setup: false,
            call_param_regs: Vec::new(),
            body: String::new(),
        }
    }

    fn emit(&mut self) {
        for i in 0..self.routine.param_count {
            self.alloc_param(i);
        }

        for quad in self.routine.quads.clone() {
            self.emit_quad(&quad);
        }
        // Spilling during quad emission only ever grows `spill_count`, so
        // the final count is the routine's true spill-slot requirement;
        // take the body written so far and wrap it in prologue/epilogue.
        let quads_text = std::mem::take(&mut self.body);

        let name = self.interner.resolve(self.routine.name);
        let frame_bytes = frame_size(self.spill_count as u32, self.max_outgoing_args);
        let _ = writeln!(self.body, "{name}:");
        let _ = writeln!(self.body, "\tpush rbp");
        let _ = writeln!(self.body, "\tmov rbp, rsp");
        let _ = writeln!(self.body, "\tsub rsp, {frame_bytes}");
        self.body.push_str(&quads_text);
        let _ = writeln!(self.body, ".epi:");
        let _ = writeln!(self.body, "\tmov rsp, rbp");
        let _ = writeln!(self.body, "\tpop rbp");
        let _ = writeln!(self.body, "\tret");
    }

    fn alloc_param(&mut self, index: u32) {
        let offset = 16 + 8 * index as i32;
        if (index as usize) < PARAM_REGS.len() {
            let reg = PARAM_REGS[index as usize];
            self.pool.alloc_register(reg, Some(index));
            self.temps[index as usize] = TempSlot {
                reg: Some(reg),
                base_offset: offset,
                spilled: false,
            };
        } else {
            self.temps[index as usize] = TempSlot {
                reg: None,
                base_offset: offset,
                spilled: true,
            };
        }
    }

    // -- register allocation, mirroring code_gen.cpp -----------------------

    fn spill(&mut self, reg: Reg) {
        if let Some(temp) = self.pool.owner_of(reg) {
            self.spill_value(reg, temp);
        }
    }

    fn spill_value(&mut self, reg: Reg, temp: u32) {
        let slot = &mut self.temps[temp as usize];
        if !slot.spilled {
            self.spill_count += 1;
            slot.base_offset = -8 * self.spill_count;
            slot.spilled = true;
        }
        let offset = self.temps[temp as usize].base_offset;
        let _ = writeln!(self.body, "\tmov [rbp{offset:+}], {reg}");
        self.temps[temp as usize].reg = None;
        self.pool.dealloc_register(reg);
    }

    fn load(&mut self, reg: Reg, offset: i32) {
        let _ = writeln!(self.body, "\tmov {reg}, [rbp{offset:+}]");
    }

    /// Forces a register with no temp association (for scratch use in
    /// `MUL`/`DIV`/comparison lowering), spilling whoever held it.
    fn get_register(&mut self, reg: Reg) -> Reg {
        if let Some(victim) = self.pool.alloc_register(reg, None) {
            self.spill_value(reg, victim);
        }
        reg
    }

    fn get_register_for(&mut self, reg: Reg, temp: u32, load_spilled: bool) -> Reg {
        let victim = self.pool.alloc_register(reg, Some(temp));
        if let Some(other) = victim {
            if other != temp {
                self.spill_value(reg, other);
            }
        }
        if load_spilled {
            let slot = self.temps[temp as usize];
            if let Some(old) = slot.reg {
                if old != reg {
                    let _ = writeln!(self.body, "\tmov {reg}, {old}");
                    self.pool.dealloc_register(old);
                }
            } else if slot.spilled {
                self.load(reg, slot.base_offset);
            }
        }
        self.temps[temp as usize].reg = Some(reg);
        reg
    }

    fn get_any_register_for(&mut self, temp: u32, load_spilled: bool) -> Reg {
        if let Some(reg) = self.temps[temp as usize].reg {
            self.pool.alloc_register(reg, Some(temp));
            return reg;
        }
        let (reg, victim) = self.pool.alloc_any_register(Some(temp));
        if let Some(other) = victim {
            self.spill_value(reg, other);
        }
        if load_spilled && self.temps[temp as usize].spilled {
            let offset = self.temps[temp as usize].base_offset;
            self.load(reg, offset);
        }
        self.temps[temp as usize].reg = Some(reg);
        reg
    }

    /// Spills every live register. Called at every basic-block boundary
    /// (before `JMP`/`JZ`/`JNZ`, before and after every `LABEL`) and before
    /// materialising a `CALL`'s arguments, since every register in the pool
    /// is caller-saved.
    fn flush(&mut self) {
        for reg in ALL_REGS {
            if let Some(temp) = self.pool.owner_of(reg) {
                self.spill_value(reg, temp);
            }
        }
    }

    // -- per-quad lowering, mirroring code_gen.cpp's switch ----------------

    fn emit_quad(&mut self, quad: &Quad) {
        match quad.op {
            Op::MovIm => {
                let target = temp_id(quad.target);
                let value = int_value(quad.left);
                let reg = self.get_any_register_for(target, false);
                let _ = writeln!(self.body, "\tmov {reg}, {value}");
            }
            Op::Mov => {
                let target = temp_id(quad.target);
                let left = temp_id(quad.left);
                let left_reg = self.get_any_register_for(left, true);
                let target_reg = self.get_any_register_for(target, false);
                if target_reg != left_reg {
                    let _ = writeln!(self.body, "\tmov {target_reg}, {left_reg}");
                }
            }
            Op::Not => self.emit_unary(quad, "xor", 1),
            Op::Neg => self.emit_neg(quad),
            Op::Mul | Op::Imul | Op::Div | Op::Idiv => self.emit_muldiv(quad),
            Op::Add => self.emit_binop(quad, "add"),
            Op::Sub => self.emit_binop(quad, "sub"),
            Op::Eq => self.emit_cmp(quad, "cmove"),
            Op::Ne => self.emit_cmp(quad, "cmovne"),
            Op::Lt => self.emit_cmp(quad, "cmovl"),
            Op::Below => self.emit_cmp(quad, "cmovb"),
            Op::Gt => self.emit_cmp(quad, "cmovg"),
            Op::Above => self.emit_cmp(quad, "cmova"),
            Op::Le => self.emit_cmp(quad, "cmovle"),
            Op::Be => self.emit_cmp(quad, "cmovbe"),
            Op::Ge => self.emit_cmp(quad, "cmovge"),
            Op::Ae => self.emit_cmp(quad, "cmovae"),
            Op::Jmp => {
                let label = label_id(quad.target);
                self.flush();
                let _ = writeln!(self.body, "\tjmp .l{label}");
            }
            Op::Jz => self.emit_branch(quad, "je"),
            Op::Jnz => self.emit_branch(quad, "jne"),
            Op::Label => {
                let label = label_id(quad.target);
                self.flush();
                let _ = writeln!(self.body, ".l{label}:");
                self.flush();
            }
            Op::Call => self.emit_call(quad),
            Op::Ret => self.emit_ret(quad),
            Op::Arg => self.emit_arg(quad),
        }
    }

    fn emit_unary(&mut self, quad: &Quad, op: &str, imm: u64) {
        let target = temp_id(quad.target);
        let left = temp_id(quad.left);
        let left_reg = self.get_any_register_for(left, true);
        let target_reg = self.get_any_register_for(target, false);
        if target_reg != left_reg {
            let _ = writeln!(self.body, "\tmov {target_reg}, {left_reg}");
        }
        let _ = writeln!(self.body, "\t{op} {target_reg}, {imm}");
    }

    fn emit_neg(&mut self, quad: &Quad) {
        let target = temp_id(quad.target);
        let left = temp_id(quad.left);
        let left_reg = self.get_any_register_for(left, true);
        let target_reg = self.get_any_register_for(target, false);
        if target_reg != left_reg {
            let _ = writeln!(self.body, "\tmov {target_reg}, {left_reg}");
        }
        let _ = writeln!(self.body, "\tneg {target_reg}");
    }

    fn emit_binop(&mut self, quad: &Quad, op: &str) {
        let target = temp_id(quad.target);
        let left = temp_id(quad.left);
        let right = temp_id(quad.right);
        let left_reg = self.get_any_register_for(left, true);
        let right_reg = self.get_any_register_for(right, true);
        let target_reg = self.get_any_register_for(target, false);
        if target_reg != left_reg {
            let _ = writeln!(self.body, "\tmov {target_reg}, {left_reg}");
        }
        let _ = writeln!(self.body, "\t{op} {target_reg}, {right_reg}");
    }

    fn emit_muldiv(&mut self, quad: &Quad) {
        let target = temp_id(quad.target);
        let left = temp_id(quad.left);
        let right = temp_id(quad.right);

        let rax = self.get_register_for(Reg::Rax, target, false);
        let rdx = self.get_register(Reg::Rdx);
        let left_reg = self.get_any_register_for(left, true);
        let right_reg = self.get_any_register_for(right, true);
        if rax != left_reg {
            let _ = writeln!(self.body, "\tmov {rax}, {left_reg}");
        }
        match quad.op {
            Op::Mul => {
                let _ = writeln!(self.body, "\txor {rdx}, {rdx}");
                let _ = writeln!(self.body, "\tmul {right_reg}");
            }
            Op::Imul => {
                let _ = writeln!(self.body, "\tcqo");
                let _ = writeln!(self.body, "\timul {right_reg}");
            }
            Op::Div => {
                let _ = writeln!(self.body, "\txor {rdx}, {rdx}");
                let _ = writeln!(self.body, "\tdiv {right_reg}");
            }
            Op::Idiv => {
                let _ = writeln!(self.body, "\tcqo");
                let _ = writeln!(self.body, "\tidiv {right_reg}");
            }
            _ => unreachable!("emit_muldiv only called for MUL/IMUL/DIV/IDIV"),
        }
    }

    fn emit_cmp(&mut self, quad: &Quad, cmov: &str) {
        let target = temp_id(quad.target);
        let left = temp_id(quad.left);
        let right = temp_id(quad.right);
        let left_reg = self.get_any_register_for(left, true);
        let right_reg = self.get_any_register_for(right, true);
        let one = self.get_any_register_for_scratch();
        let target_reg = self.get_any_register_for(target, false);
        let _ = writeln!(self.body, "\txor {target_reg}, {target_reg}");
        let _ = writeln!(self.body, "\tmov {one}, 1");
        let _ = writeln!(self.body, "\tcmp {left_reg}, {right_reg}");
        let _ = writeln!(self.body, "\t{cmov} {target_reg}, {one}");
    }

    /// Allocates a register holding no temp (a throwaway `1` for `cmovCC`'s
    /// source operand, which NASM's `cmov` requires to be a register, not an
    /// immediate).
    fn get_any_register_for_scratch(&mut self) -> Reg {
        let (reg, victim) = self.pool.alloc_any_register(None);
        if let Some(other) = victim {
            self.spill_value(reg, other);
        }
        reg
    }

    fn emit_branch(&mut self, quad: &Quad, jcc: &str) {
        let label = label_id(quad.target);
        let cond = temp_id(quad.left);
        let cond_reg = self.get_any_register_for(cond, true);
        let _ = writeln!(self.body, "\tcmp {cond_reg}, 0");
        self.flush();
        let _ = writeln!(self.body, "\t{jcc} .l{label}");
    }

    fn emit_ret(&mut self, quad: &Quad) {
        if returns_something(quad.target) {
            let value = temp_id(quad.left);
            let reg = self.get_any_register_for(value, true);
            if reg != Reg::Rax {
                self.get_register(Reg::Rax);
                let _ = writeln!(self.body, "\tmov rax, {reg}");
            }
        }
        let _ = writeln!(self.body, "\tjmp .epi");
    }

    fn emit_arg(&mut self, quad: &Quad) {
        let index = arg_index(quad.target);
        if index == 0 && !self.in_call_setup {
            self.flush();
            self.in_call_setup = true;
        }
        let value = temp_id(quad.left);
        if (index as usize) < PARAM_REGS.len() {
            let reg = PARAM_REGS[index as usize];
            self.get_register_for(reg, value, true);
            self.call_param_regs.push(reg);
        } else {
            let reg = self.get_any_register_for(value, true);
            let _ = writeln!(self.body, "\tmov [rsp+{}], {reg}", 8 * index);
        }
    }

    fn emit_call(&mut self, quad: &Quad) {
        if !self.in_call_setup {
            self.flush();
        }
        self.in_call_setup = false;
        // `call` clobbers every register in the pool, not just the ones
        // carrying arguments — flush everything else first so a live temp
        // that happened to still be resident elsewhere isn't silently lost.
        for reg in ALL_REGS {
            if !self.call_param_regs.contains(&reg) {
                self.spill(reg);
            }
        }
        self.call_param_regs.clear();

        let func_id = func_id(quad.left);
        let callee = &self.ir.routines[func_id as usize];
        let name = self.interner.resolve(callee.name);
        let _ = writeln!(self.body, "\tcall {name}");

        // The flush above already emptied every non-argument register,
        // including rax, so this allocation never has a victim to spill.
        let target = temp_id(quad.target);
        self.pool.alloc_register(Reg::Rax, Some(target));
        self.temps[target as usize].reg = Some(Reg::Rax);
    }
}

fn temp_id(op: Operand) -> u32 {
    match op {
        Operand::Temp(id) => id,
        other => panic!("expected a Temp operand, found {other:?}"),
    }
}

fn int_value(op: Operand) -> u64 {
    match op {
        Operand::IntValue(v) => v,
        other => panic!("expected an IntValue operand, found {other:?}"),
    }
}

fn label_id(op: Operand) -> u32 {
    match op {
        Operand::Label(id) => id,
        other => panic!("expected a Label operand, found {other:?}"),
    }
}

fn arg_index(op: Operand) -> u32 {
    match op {
        Operand::Arg(i) => i,
        other => panic!("expected an Arg operand, found {other:?}"),
    }
}

fn func_id(op: Operand) -> u32 {
    match op {
        Operand::Func(id) => id,
        other => panic!("expected a Func operand, found {other:?}"),
    }
}

fn returns_something(op: Operand) -> bool {
    match op {
        Operand::ReturnsSomething(b) => b,
        other => panic!("expected a ReturnsSomething operand, found {other:?}"),
    }
}

/// The widest argument list of any `CALL` this routine makes, floored at 4
/// (the Windows x64 ABI always reserves a 4-register shadow space for the
/// callee, whether or not it uses all 4).
fn scan_max_outgoing_args(routine: &Routine) -> u32 {
    let mut max = 4u32;
    for quad in &routine.quads {
        if quad.op == Op::Arg {
            max = max.max(arg_index(quad.target) + 1);
        }
    }
    max
}

/// `rbp`-relative frame size for `sub rsp, N`: enough room for every spill
/// slot plus the stack space this routine reserves for its own outgoing
/// calls, rounded so that `(N + 8) % 16 == 0` — the `push rbp` that precedes
/// `sub rsp, N` accounts for the other 8 bytes of 16-byte alignment at every
/// `call` site.
fn frame_size(spill_slots: u32, max_outgoing_args: u32) -> u32 {
    let mut bytes = (spill_slots + max_outgoing_args) * 8;
    while bytes % 16 != 8 {
        bytes += 8;
    }
    bytes
}
