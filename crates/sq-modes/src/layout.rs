//! Block index-range arithmetic for one species segment of the state vector.

use serde::{Deserialize, Serialize};
use sq_core::{CoreError, CoreResult};
use std::ops::Range;

/// Contiguous layout of one species' modes, block after block, starting at
/// `base` in the global state vector.
///
/// `offsets` has `block_count + 1` entries; block `b` occupies
/// `base + offsets[b] .. base + offsets[b + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    base: usize,
    offsets: Vec<usize>,
}

impl BlockLayout {
    /// Every block holds `block_len` modes: block `b` (0-based) covers
    /// `base + b*block_len .. base + (b+1)*block_len`.
    pub fn uniform(base: usize, block_count: usize, block_len: usize) -> Self {
        let offsets = (0..=block_count).map(|b| b * block_len).collect();
        Self { base, offsets }
    }

    pub fn from_lengths(base: usize, lengths: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut acc = 0;
        offsets.push(acc);
        for &len in lengths {
            acc += len;
            offsets.push(acc);
        }
        Self { base, offsets }
    }

    pub fn block_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of modes in this segment.
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global range covered by the whole segment.
    pub fn span(&self) -> Range<usize> {
        self.base..self.base + self.len()
    }

    /// Global range of one block's modes.
    pub fn range(&self, block: usize) -> CoreResult<Range<usize>> {
        if block >= self.block_count() {
            return Err(CoreError::IndexOob {
                what: "block",
                index: block,
                len: self.block_count(),
            });
        }
        Ok(self.base + self.offsets[block]..self.base + self.offsets[block + 1])
    }

    /// All block ranges in block order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| self.base + w[0]..self.base + w[1])
    }

    /// Map a global index back to `(block, local index)`.
    pub fn locate(&self, global: usize) -> Option<(usize, usize)> {
        if !self.span().contains(&global) {
            return None;
        }
        let rel = global - self.base;
        // offsets is sorted; the last offset <= rel that starts a non-empty block wins
        let block = self.offsets.partition_point(|&o| o <= rel) - 1;
        Some((block, rel - self.offsets[block]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_ranges_follow_block_length() {
        let layout = BlockLayout::uniform(0, 4, 3);
        assert_eq!(layout.len(), 12);
        for b in 0..4 {
            assert_eq!(layout.range(b).unwrap(), b * 3..(b + 1) * 3);
        }
        assert!(layout.range(4).is_err());
    }

    #[test]
    fn based_segment_offsets_ranges() {
        let layout = BlockLayout::uniform(10, 2, 5);
        assert_eq!(layout.span(), 10..20);
        assert_eq!(layout.range(1).unwrap(), 15..20);
        assert_eq!(layout.locate(14), Some((0, 4)));
        assert_eq!(layout.locate(15), Some((1, 0)));
        assert_eq!(layout.locate(9), None);
        assert_eq!(layout.locate(20), None);
    }

    #[test]
    fn ragged_lengths_locate_correctly() {
        let layout = BlockLayout::from_lengths(2, &[2, 0, 3]);
        let ranges: Vec<_> = layout.ranges().collect();
        assert_eq!(ranges, vec![2..4, 4..4, 4..7]);
        assert_eq!(layout.locate(4), Some((2, 0)));
        assert_eq!(layout.locate(6), Some((2, 2)));
    }

    #[test]
    fn empty_layout() {
        let layout = BlockLayout::uniform(7, 3, 0);
        assert!(layout.is_empty());
        assert_eq!(layout.block_count(), 3);
        assert_eq!(layout.locate(7), None);
    }
}
