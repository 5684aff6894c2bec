// SPDX-License-Identifier: LGPL-3.0-only
//! Deferred reuse of detached export items.
//!
//! When a container drops children, their export items stay attached to the
//! exported parent for a little while. They form one contiguous run that
//! logically sits at `marker` in the container's child list. An insertion at
//! the marker can re-skin the first item of the run instead of creating a new
//! one; everything else has to account for the run still being physically
//! present.

use std::collections::VecDeque;

use crate::export::ItemId;

/// How a removal at a given index relates to the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The run is empty, start a new one here.
    Start,
    /// The removed child directly follows the run.
    Append,
    /// The removed child directly precedes the run.
    Prepend,
    /// Not adjacent: the run has to be flushed first.
    Flush,
}

/// A contiguous run of detached export items.
#[derive(Debug)]
pub struct RecycleList {
    marker: usize,
    items: VecDeque<ItemId>,
}

impl RecycleList {
    /// An empty run at `marker`.
    pub fn new(marker: usize) -> Self {
        Self {
            marker,
            items: VecDeque::new(),
        }
    }

    /// Logical child index the run sits in front of.
    pub fn marker(&self) -> usize {
        self.marker
    }

    /// Number of items in the run.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the run is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items of the run, first to last.
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }

    /// Classify a removal of the child at logical `index`.
    pub fn classify_removal(&self, index: usize) -> Removal {
        if self.items.is_empty() {
            Removal::Start
        } else if index == self.marker {
            Removal::Append
        } else if index + 1 == self.marker {
            Removal::Prepend
        } else {
            Removal::Flush
        }
    }

    /// Record the removal of the child at `index` whose item is `item`.
    ///
    /// Callers must have flushed the run if [RecycleList::classify_removal]
    /// returned [Removal::Flush].
    pub fn record_removal(&mut self, index: usize, item: ItemId) {
        match self.classify_removal(index) {
            Removal::Start | Removal::Flush => {
                debug_assert!(self.items.is_empty(), "recycle run not flushed");
                self.marker = index;
                self.items.push_back(item);
            },
            Removal::Append => self.items.push_back(item),
            Removal::Prepend => {
                self.marker -= 1;
                self.items.push_front(item);
            },
        }
    }

    /// First item of the run, if an insertion at `index` could reuse it.
    pub fn candidate(&self, index: usize) -> Option<ItemId> {
        if index == self.marker {
            self.items.front().copied()
        } else {
            None
        }
    }

    /// Take the first item for reuse by an insertion at the marker.
    pub fn reclaim(&mut self) -> Option<ItemId> {
        let item = self.items.pop_front()?;
        self.marker += 1;
        Some(item)
    }

    /// Physical position in the exported parent for a fresh insertion at
    /// logical `index`, updating the marker for insertions before the run.
    pub fn insertion_position(&mut self, index: usize) -> usize {
        if self.items.is_empty() {
            return index;
        }
        if index <= self.marker {
            self.marker += 1;
            index
        } else {
            index + self.items.len()
        }
    }

    /// Physical position of the still-attached child at logical `index`.
    pub fn physical_position(&self, index: usize) -> usize {
        if index < self.marker {
            index
        } else {
            index + self.items.len()
        }
    }

    /// Empty the run, returning the items to destroy.
    pub fn drain(&mut self) -> Vec<ItemId> {
        self.items.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_removals_form_one_run() {
        // children a b c d e; remove c, then d (now at 2), then b (at 1)
        let mut list = RecycleList::new(2);
        list.record_removal(2, ItemId(3));
        assert_eq!(list.classify_removal(2), Removal::Append);
        list.record_removal(2, ItemId(4));
        assert_eq!(list.classify_removal(1), Removal::Prepend);
        list.record_removal(1, ItemId(2));

        assert_eq!(list.marker(), 1);
        assert_eq!(list.items().collect::<Vec<_>>(), vec![ItemId(2), ItemId(3), ItemId(4)]);
        assert_eq!(list.classify_removal(0), Removal::Prepend);
        assert_eq!(list.classify_removal(2), Removal::Flush);
    }

    #[test]
    fn test_reclaim_advances_marker() {
        let mut list = RecycleList::new(0);
        list.record_removal(0, ItemId(1));
        list.record_removal(0, ItemId(2));
        assert_eq!(list.candidate(1), None);
        assert_eq!(list.candidate(0), Some(ItemId(1)));
        assert_eq!(list.reclaim(), Some(ItemId(1)));
        assert_eq!(list.marker(), 1);
        assert_eq!(list.candidate(1), Some(ItemId(2)));
    }

    #[test]
    fn test_positions_skip_the_run() {
        // logical [a, b, x, y] with a run of two sitting at 2
        let mut list = RecycleList::new(2);
        list.record_removal(2, ItemId(10));
        list.record_removal(2, ItemId(11));
        assert_eq!(list.physical_position(1), 1);
        assert_eq!(list.physical_position(2), 4);
        assert_eq!(list.insertion_position(3), 5);
        assert_eq!(list.marker(), 2);
        assert_eq!(list.insertion_position(0), 0);
        assert_eq!(list.marker(), 3);
    }
}
