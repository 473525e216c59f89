//! Bitsets and counters carried by method facts.

use std::fmt;

use smallvec::SmallVec;

/// One bit per logical parameter; bit 0 is the receiver of an instance
/// method.
///
/// Parameters with index 63 and above share bit 63, so a mask never claims
/// less than the truth for them.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterMask(u64);

impl ParameterMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    fn bit(index: usize) -> u64 {
        1u64 << index.min(63)
    }

    /// The mask with only `index` set.
    pub fn single(index: usize) -> Self {
        Self(Self::bit(index))
    }

    #[inline]
    pub fn contains(self, index: usize) -> bool {
        self.0 & Self::bit(index) != 0
    }

    /// Set `index`; return whether it was newly set.
    pub fn insert(&mut self, index: usize) -> bool {
        let before = self.0;
        self.0 |= Self::bit(index);
        self.0 != before
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every bit of `other` is set in `self`.
    #[inline]
    pub fn covers(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Drop the receiver bit.
    #[must_use]
    pub fn without_receiver(self) -> Self {
        Self(self.0 & !1)
    }
}

impl fmt::Debug for ParameterMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            f.write_str("ParameterMask(ALL)")
        } else {
            write!(f, "ParameterMask({:#b})", self.0)
        }
    }
}

/// A growable set of local variable slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableSet {
    words: SmallVec<[u64; 1]>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `slot`; return whether it was new.
    pub fn insert(&mut self, slot: u16) -> bool {
        let (word, bit) = (usize::from(slot) / 64, usize::from(slot) % 64);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let before = self.words[word];
        self.words[word] |= 1 << bit;
        self.words[word] != before
    }

    pub fn contains(&self, slot: u16) -> bool {
        let (word, bit) = (usize::from(slot) / 64, usize::from(slot) % 64);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    /// Add every slot of `other`; return whether anything was new.
    pub fn union_with(&mut self, other: &VariableSet) -> bool {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let before = *mine;
            *mine |= theirs;
            changed |= *mine != before;
        }
        changed
    }

    /// Whether every slot of `other` is in `self`.
    pub fn covers(&self, other: &VariableSet) -> bool {
        other.words.iter().enumerate().all(|(i, theirs)| {
            let mine = self.words.get(i).copied().unwrap_or(0);
            mine & theirs == *theirs
        })
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64u16).filter_map(move |bit| {
                let slot = u16::try_from(i * 64).ok()?.checked_add(bit)?;
                (word & (1 << bit) != 0).then_some(slot)
            })
        })
    }
}

/// How many call sites invoke a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum InvocationCount {
    Counted(u32),
    /// Too many call sites to count, or callers outside the program.
    Unbounded,
}

impl Default for InvocationCount {
    fn default() -> Self {
        InvocationCount::Counted(0)
    }
}

impl InvocationCount {
    /// A tally of call sites, saturating to [`Unbounded`](Self::Unbounded)
    /// above `limit`.
    pub fn from_tally(tally: usize, limit: u32) -> Self {
        match u32::try_from(tally) {
            Ok(n) if n <= limit => InvocationCount::Counted(n),
            _ => InvocationCount::Unbounded,
        }
    }

    /// The count, if bounded.
    pub fn get(self) -> Option<u32> {
        match self {
            InvocationCount::Counted(n) => Some(n),
            InvocationCount::Unbounded => None,
        }
    }
}
