//! Search branches and the frontier that holds them
//!
//! Each branch is one path through the trie of possible ids. The frontier is
//! append-only: forks add branches at the end, nothing is ever removed, and
//! completed branches stay put for the final report. Branches are addressed by
//! [`BranchHandle`], an index into the frontier, so the engine can hold on to
//! "the current branch" while also pushing new ones.

use rom_protocol::{Digit, RomId};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Position of a branch in the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchHandle(pub usize);

impl BranchHandle {
    /// Get the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of the enumeration trie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBranch {
    /// Resolved bits, in receipt order (LSB first)
    bits: Vec<bool>,
    /// Digit observed when each bit was resolved
    digits: Vec<Digit>,
    complete: bool,
}

impl SearchBranch {
    /// Create an empty, incomplete branch
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved bits, LSB first
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Digits recorded alongside each resolved bit
    pub fn digits(&self) -> &[Digit] {
        &self.digits
    }

    /// Number of resolved bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether no bit has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Whether the bus reported this branch exhausted
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Append a resolved bit and the digit it was resolved from
    pub fn push_bit(&mut self, bit: bool, digit: Digit, max_bits: u8) -> Result<(), SearchError> {
        if self.bits.len() >= max_bits as usize {
            return Err(SearchError::CapacityExceeded { max_bits });
        }
        self.bits.push(bit);
        self.digits.push(digit);
        Ok(())
    }

    /// Mark the branch finished
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// The id this branch spells out, if it has any bits
    pub fn rom_id(&self) -> Option<RomId> {
        RomId::from_bits(&self.bits).ok()
    }
}

/// A completed identifier, ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredId {
    /// Bits in receipt order (LSB first)
    pub bits: Vec<bool>,
    /// Unsigned value, `Σ bits[j] · 2^j`
    pub value: u64,
    /// Width in bits
    pub width: u8,
}

impl DiscoveredId {
    /// The identifier as a [`RomId`]
    pub fn rom_id(&self) -> Option<RomId> {
        RomId::new(self.value, self.width).ok()
    }
}

impl From<RomId> for DiscoveredId {
    fn from(id: RomId) -> Self {
        Self {
            bits: id.bits(),
            value: id.value(),
            width: id.width(),
        }
    }
}

/// Ordered, append-only collection of every branch discovered so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    branches: Vec<SearchBranch>,
}

impl Frontier {
    /// Create a frontier holding the single empty root branch
    pub fn new() -> Self {
        Self {
            branches: vec![SearchBranch::new()],
        }
    }

    /// Append a branch, returning its handle
    pub fn push(&mut self, branch: SearchBranch) -> BranchHandle {
        self.branches.push(branch);
        BranchHandle(self.branches.len() - 1)
    }

    /// The earliest branch not yet complete
    pub fn first_incomplete(&self) -> Option<BranchHandle> {
        self.branches
            .iter()
            .position(|b| !b.is_complete())
            .map(BranchHandle)
    }

    /// Look up a branch
    pub fn get(&self, handle: BranchHandle) -> Option<&SearchBranch> {
        self.branches.get(handle.0)
    }

    /// Look up a branch for mutation
    pub fn get_mut(&mut self, handle: BranchHandle) -> Option<&mut SearchBranch> {
        self.branches.get_mut(handle.0)
    }

    /// Number of branches, complete or not
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Always false: the root branch is never removed
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Every branch in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &SearchBranch> {
        self.branches.iter()
    }

    /// Completed branches in discovery order
    pub fn completed(&self) -> impl Iterator<Item = &SearchBranch> {
        self.branches.iter().filter(|b| b.is_complete())
    }

    /// Identifiers of the completed branches, in discovery order
    ///
    /// A branch that completed without resolving any bit (nothing answered on
    /// the line) has no identifier and is skipped.
    pub fn discovered(&self) -> impl Iterator<Item = DiscoveredId> + '_ {
        self.completed()
            .filter_map(SearchBranch::rom_id)
            .map(DiscoveredId::from)
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}
