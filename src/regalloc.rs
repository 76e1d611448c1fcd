//! Low-level register pool.
//!
//! A fixed pool of caller-saved registers, an LRU queue used to pick a
//! victim when every register is in use, and an `alloc_register`/
//! `alloc_any_register`/`dealloc_register` trio. Each register slot is
//! tagged with the temp id it currently holds (`Option<u32>`) so a caller
//! can spill whichever temp it is about to evict.
//!
//! This module only tracks *which* register holds *which* temp — it knows
//! nothing about stack slots or NASM text. [`crate::emit`] is the layer that
//! decides when to spill and emits the instructions to do so.

/// One of the 7 general-purpose registers available to generated code, in
/// the original's `PASTE_REGS` order (also the initial LRU queue order:
/// `rax` is evicted first, `r11` last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    R8,
    R9,
    R10,
    R11,
}

pub const REG_COUNT: usize = 7;

pub const ALL_REGS: [Reg; REG_COUNT] = [
    Reg::Rax,
    Reg::Rcx,
    Reg::Rdx,
    Reg::R8,
    Reg::R9,
    Reg::R10,
    Reg::R11,
];

/// Windows x64 integer parameter registers, in argument order.
pub const PARAM_REGS: [Reg; 4] = [Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9];

impl Reg {
    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
        }
    }

    fn slot(self) -> usize {
        ALL_REGS.iter().position(|&r| r == self).expect("exhaustive")
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The LRU pool of the 7 registers, tagged with whichever temp (if any)
/// currently owns each one.
pub struct RegisterPool {
    owner: [Option<u32>; REG_COUNT],
    /// Front (index 0) is least recently used, i.e. the next victim.
    queue: Vec<Reg>,
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPool {
    pub fn new() -> Self {
        RegisterPool {
            owner: [None; REG_COUNT],
            queue: ALL_REGS.to_vec(),
        }
    }

    fn touch(&mut self, reg: Reg) {
        let idx = self.queue.iter().position(|&r| r == reg).expect("registered");
        let reg = self.queue.remove(idx);
        self.queue.push(reg);
    }

    /// Allocates a specific register for `owner`, returning whoever
    /// previously held it (if anyone) so the caller can spill them.
    pub fn alloc_register(&mut self, reg: Reg, owner: Option<u32>) -> Option<u32> {
        self.touch(reg);
        let victim = self.owner[reg.slot()];
        self.owner[reg.slot()] = owner;
        victim
    }

    /// Allocates the least-recently-used register for `owner`, returning
    /// both the register chosen and whoever previously held it.
    pub fn alloc_any_register(&mut self, owner: Option<u32>) -> (Reg, Option<u32>) {
        let reg = self.queue[0];
        let victim = self.alloc_register(reg, owner);
        (reg, victim)
    }

    pub fn dealloc_register(&mut self, reg: Reg) {
        self.owner[reg.slot()] = None;
    }

    pub fn owner_of(&self, reg: Reg) -> Option<u32> {
        self.owner[reg.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocating_all_seven_then_an_eighth_evicts_the_oldest() {
        let mut pool = RegisterPool::new();
        for temp in 0..7u32 {
            let (_, victim) = pool.alloc_any_register(Some(temp));
            assert_eq!(victim, None);
        }
        let (reg, victim) = pool.alloc_any_register(Some(7));
        assert_eq!(reg, Reg::Rax);
        assert_eq!(victim, Some(0));
    }

    #[test]
    fn touching_a_register_moves_it_to_the_back_of_the_queue() {
        let mut pool = RegisterPool::new();
        for temp in 0..7u32 {
            pool.alloc_any_register(Some(temp));
        }
        // rax (temp 0) is about to be evicted next; re-touch it by
        // re-allocating it for its own owner.
        pool.alloc_register(Reg::Rax, Some(0));
        let (reg, _) = pool.alloc_any_register(Some(7));
        assert_eq!(reg, Reg::Rcx);
    }

    #[test]
    fn alloc_register_for_a_specific_slot_reports_its_previous_owner() {
        let mut pool = RegisterPool::new();
        pool.alloc_register(Reg::Rcx, Some(1));
        let victim = pool.alloc_register(Reg::Rcx, Some(2));
        assert_eq!(victim, Some(1));
        assert_eq!(pool.owner_of(Reg::Rcx), Some(2));
    }

    #[test]
    fn dealloc_clears_ownership() {
        let mut pool = RegisterPool::new();
        pool.alloc_register(Reg::Rdx, Some(1));
        pool.dealloc_register(Reg::Rdx);
        assert_eq!(pool.owner_of(Reg::Rdx), None);
    }
}
