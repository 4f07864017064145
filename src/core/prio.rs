//! Priority bitmap for O(1) highest-ready lookup
//!
//! One 32-bit word covers every priority level. Bit 31 is priority 0 (the
//! highest), so `leading_zeros` yields the highest set priority directly.
//! The executor keeps one set for ready tasks and each peripheral lock keeps
//! one for the tasks pending on it.

use crate::config::CFG_PRIO_MAX;
use crate::types::Prio;

const _: () = assert!(CFG_PRIO_MAX <= 32, "priority set is a single word");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrioSet(u32);

impl PrioSet {
    pub const EMPTY: PrioSet = PrioSet(0);

    pub const fn new() -> Self {
        PrioSet(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        PrioSet(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    const fn mask(prio: Prio) -> u32 {
        1 << (31 - prio as u32)
    }

    #[inline]
    pub fn insert(&mut self, prio: Prio) {
        debug_assert!((prio as usize) < CFG_PRIO_MAX);
        self.0 |= Self::mask(prio);
    }

    #[inline]
    pub fn remove(&mut self, prio: Prio) {
        debug_assert!((prio as usize) < CFG_PRIO_MAX);
        self.0 &= !Self::mask(prio);
    }

    #[inline]
    pub fn contains(self, prio: Prio) -> bool {
        self.0 & Self::mask(prio) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Highest (numerically lowest) priority in the set
    #[inline]
    pub fn highest(self) -> Option<Prio> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.leading_zeros() as Prio)
        }
    }

    /// Remove and return the highest priority
    pub fn pop_highest(&mut self) -> Option<Prio> {
        let prio = self.highest()?;
        self.remove(prio);
        Some(prio)
    }

    pub fn union(self, other: PrioSet) -> PrioSet {
        PrioSet(self.0 | other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl Iterator for PrioSet {
    type Item = Prio;

    /// Yields priorities highest first
    fn next(&mut self) -> Option<Prio> {
        self.pop_highest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_highest() {
        let set = PrioSet::new();
        assert!(set.is_empty());
        assert_eq!(set.highest(), None);
    }

    #[test]
    fn highest_tracks_inserts_and_removes() {
        let mut set = PrioSet::new();
        set.insert(5);
        assert!(set.contains(5));
        assert!(!set.contains(4));
        assert_eq!(set.highest(), Some(5));

        set.insert(3);
        assert_eq!(set.highest(), Some(3));

        set.remove(3);
        assert_eq!(set.highest(), Some(5));

        set.remove(5);
        assert!(set.is_empty());
    }

    #[test]
    fn word_boundaries() {
        let mut set = PrioSet::new();
        set.insert(31);
        assert_eq!(set.highest(), Some(31));
        set.insert(0);
        assert_eq!(set.highest(), Some(0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn iterates_highest_first() {
        let mut set = PrioSet::new();
        for p in [20, 4, 11, 1] {
            set.insert(p);
        }
        let mut out = [0u8; 4];
        for (slot, prio) in out.iter_mut().zip(set) {
            *slot = prio;
        }
        assert_eq!(out, [1, 4, 11, 20]);
    }
}
