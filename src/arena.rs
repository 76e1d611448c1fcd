//! Arena allocation for AST nodes and IR quad blocks.
//!
//! `Arena` is a thin wrapper over `bumpalo::Bump`: one arena per compilation,
//! everything it allocates lives and dies with it, freed all at once when it
//! drops.

use bumpalo::Bump;

/// Backing store for one compilation's AST and IR allocations.
///
/// Default block size of 64KiB — `bumpalo` grows blocks geometrically
/// regardless, so this just sets a sensible starting capacity.
pub struct Arena {
    bump: Bump,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            bump: Bump::with_capacity(64 * 1024),
        }
    }

    /// Allocates `value` in the arena and returns a reference with the
    /// arena's lifetime.
    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a slice by copying from `values`.
    pub fn alloc_slice<T: Copy>(&self, values: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(values)
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_usable_reference() {
        let arena = Arena::new();
        let n: &i64 = arena.alloc(42);
        assert_eq!(*n, 42);
    }

    #[test]
    fn alloc_slice_copies_values() {
        let arena = Arena::new();
        let s = arena.alloc_slice(&[1u32, 2, 3]);
        assert_eq!(s, &[1, 2, 3]);
    }
}
