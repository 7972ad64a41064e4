//! Bounded allocation of single-letter node identifiers.

use crate::error::{DiagramError, DiagramResult};

/// The alphabet has 26 letters; no diagram may use more.
pub const HARD_CAPACITY: usize = 26;

/// Identifiers `A` through `O`.
pub const DEFAULT_CAPACITY: usize = 15;

/// Hands out `A`, `B`, `C`... up to a fixed capacity, never wrapping or
/// reusing a letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    capacity: usize,
    next: usize,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl IdAllocator {
    /// Capacity is clamped to `1..=26`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, HARD_CAPACITY),
            next: 0,
        }
    }

    /// Continue after the highest identifier a diagram already uses.
    pub fn seeded(capacity: usize, used: impl IntoIterator<Item = char>) -> Self {
        let mut allocator = Self::new(capacity);
        allocator.next = used
            .into_iter()
            .filter_map(letter_index)
            .map(|index| index + 1)
            .max()
            .unwrap_or(0);
        allocator
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identifiers still available.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.next)
    }

    pub fn allocate(&mut self) -> DiagramResult<char> {
        if self.remaining() == 0 {
            return Err(DiagramError::IdentifierSpaceExhausted {
                capacity: self.capacity,
                requested: 1,
            });
        }
        let id = letter(self.next);
        self.next += 1;
        Ok(id)
    }

    /// Up to `max` upcoming identifiers without consuming them; fails when
    /// fewer than `min` remain.
    pub fn peek(&self, min: usize, max: usize) -> DiagramResult<Vec<char>> {
        if self.remaining() < min {
            return Err(DiagramError::IdentifierSpaceExhausted {
                capacity: self.capacity,
                requested: min,
            });
        }
        let count = self.remaining().min(max);
        Ok((self.next..self.next + count).map(letter).collect())
    }
}

fn letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn letter_index(id: char) -> Option<usize> {
    id.is_ascii_uppercase().then(|| (id as u8 - b'A') as usize)
}
