//
// alldiff-cp is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License  v3
// as published by the Free Software Foundation.
//
// mini-cp is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY.
// See the GNU Lesser General Public License  for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with mini-cp. If not, see http://www.gnu.org/licenses/lgpl-3.0.en.html
//
// Copyright (c)  2022 by X. Gillard
//

//! A state manager that records the previous value of an integer on a trail
//! the first time it changes after a checkpoint. Sets are sparse sets: their
//! elements are kept in a dense array whose first `len` slots hold the
//! members. Only `len` and the bounds are trailed; the permutation itself
//! never needs to be undone.

use super::{SaveAndRestore, StateManager, TrailedInt, TrailedSet};

/// What a checkpoint must remember to undo everything that follows it
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    trail: usize,
    ints: usize,
    sets: usize,
    slots: usize,
}

/// The previous state of an integer, as recorded on the trail
#[derive(Debug, Clone, Copy)]
struct Undo {
    id: usize,
    value: isize,
    stamp: usize,
}

/// Layout of one sparse set within the shared `slots`/`positions` arrays.
/// The set ranges over `base..base + capacity`; elements are stored as
/// offsets from `base`, and `lo`/`hi` hold the offsets of the bounds.
#[derive(Debug, Clone, Copy)]
struct SetLayout {
    base: isize,
    start: usize,
    capacity: usize,
    len: TrailedInt,
    lo: TrailedInt,
    hi: TrailedInt,
}

/// The default state manager
#[derive(Debug, Clone, Default)]
pub struct TrailedStateManager {
    /// Current value of every integer
    ints: Vec<isize>,
    /// Stamp of the checkpoint under which each integer was last trailed
    stamps: Vec<usize>,
    /// Strictly increases with every checkpoint ever taken
    stamp: usize,
    trail: Vec<Undo>,
    checkpoints: Vec<Checkpoint>,

    sets: Vec<SetLayout>,
    /// For each set, a permutation of `0..capacity`. Members come first.
    slots: Vec<usize>,
    /// `positions[start + o]` is the index of offset `o` in the set's slots
    positions: Vec<usize>,
}

impl TrailedStateManager {
    /// Creates an empty manager
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of checkpoints that have been taken and not restored yet
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
    fn layout(&self, id: TrailedSet) -> SetLayout {
        self.sets[id.0]
    }
    /// Offset of `value` in the set, None when it falls outside its range
    fn offset(&self, set: &SetLayout, value: isize) -> Option<usize> {
        let offset = value.checked_sub(set.base)?;
        usize::try_from(offset).ok().filter(|o| *o < set.capacity)
    }
    fn holds(&self, set: &SetLayout, offset: usize) -> bool {
        (self.positions[set.start + offset] as isize) < self.int(set.len)
    }
    /// Moves `offset` to index `at` of the slots of the set
    fn place(&mut self, set: &SetLayout, offset: usize, at: usize) {
        let from = self.positions[set.start + offset];
        let other = self.slots[set.start + at];
        self.slots.swap(set.start + from, set.start + at);
        self.positions[set.start + offset] = at;
        self.positions[set.start + other] = from;
    }
}

impl SaveAndRestore for TrailedStateManager {
    fn save_state(&mut self) {
        self.stamp += 1;
        self.checkpoints.push(Checkpoint {
            trail: self.trail.len(),
            ints: self.ints.len(),
            sets: self.sets.len(),
            slots: self.slots.len(),
        });
    }

    fn restore_state(&mut self) {
        let checkpoint = match self.checkpoints.pop() {
            Some(checkpoint) => checkpoint,
            None => panic!("restore_state called without a matching save_state"),
        };
        while self.trail.len() > checkpoint.trail {
            if let Some(undo) = self.trail.pop() {
                self.ints[undo.id] = undo.value;
                self.stamps[undo.id] = undo.stamp;
            }
        }
        self.ints.truncate(checkpoint.ints);
        self.stamps.truncate(checkpoint.ints);
        self.sets.truncate(checkpoint.sets);
        self.slots.truncate(checkpoint.slots);
        self.positions.truncate(checkpoint.slots);
    }
}

impl StateManager for TrailedStateManager {
    fn new_int(&mut self, value: isize) -> TrailedInt {
        self.ints.push(value);
        self.stamps.push(self.stamp);
        TrailedInt(self.ints.len() - 1)
    }

    fn int(&self, id: TrailedInt) -> isize {
        self.ints[id.0]
    }

    fn set_int(&mut self, id: TrailedInt, value: isize) {
        let old = self.ints[id.0];
        if old == value {
            return;
        }
        if self.stamps[id.0] != self.stamp {
            self.trail.push(Undo {
                id: id.0,
                value: old,
                stamp: self.stamps[id.0],
            });
            self.stamps[id.0] = self.stamp;
        }
        self.ints[id.0] = value;
    }

    fn new_set(&mut self, min: isize, max: isize) -> TrailedSet {
        debug_assert!(min <= max);
        let capacity = (max - min + 1) as usize;
        let start = self.slots.len();
        self.slots.extend(0..capacity);
        self.positions.extend(0..capacity);

        let len = self.new_int(capacity as isize);
        let lo = self.new_int(0);
        let hi = self.new_int(capacity as isize - 1);
        self.sets.push(SetLayout {
            base: min,
            start,
            capacity,
            len,
            lo,
            hi,
        });
        TrailedSet(self.sets.len() - 1)
    }

    fn set_len(&self, id: TrailedSet) -> usize {
        self.int(self.layout(id).len) as usize
    }

    fn set_min(&self, id: TrailedSet) -> Option<isize> {
        let set = self.layout(id);
        (self.set_len(id) > 0).then(|| set.base + self.int(set.lo))
    }

    fn set_max(&self, id: TrailedSet) -> Option<isize> {
        let set = self.layout(id);
        (self.set_len(id) > 0).then(|| set.base + self.int(set.hi))
    }

    fn set_contains(&self, id: TrailedSet, value: isize) -> bool {
        let set = self.layout(id);
        self.offset(&set, value)
            .map_or(false, |offset| self.holds(&set, offset))
    }

    fn set_remove(&mut self, id: TrailedSet, value: isize) -> bool {
        let set = self.layout(id);
        let offset = match self.offset(&set, value) {
            Some(offset) if self.holds(&set, offset) => offset,
            _ => return false,
        };
        let len = self.int(set.len) as usize - 1;
        self.place(&set, offset, len);
        self.set_int(set.len, len as isize);
        if len == 0 {
            return true;
        }

        let (lo, hi) = (self.int(set.lo) as usize, self.int(set.hi) as usize);
        if offset == lo {
            if let Some(next) = (lo + 1..=hi).find(|o| self.holds(&set, *o)) {
                self.set_int(set.lo, next as isize);
            }
        }
        if offset == hi {
            if let Some(prev) = (lo..hi).rev().find(|o| self.holds(&set, *o)) {
                self.set_int(set.hi, prev as isize);
            }
        }
        true
    }

    fn set_keep_only(&mut self, id: TrailedSet, value: isize) {
        let set = self.layout(id);
        match self.offset(&set, value) {
            Some(offset) if self.holds(&set, offset) => {
                self.place(&set, offset, 0);
                self.set_int(set.len, 1);
                self.set_int(set.lo, offset as isize);
                self.set_int(set.hi, offset as isize);
            }
            _ => self.set_clear(id),
        }
    }

    fn set_clear(&mut self, id: TrailedSet) {
        let len = self.layout(id).len;
        self.set_int(len, 0);
    }
}

#[cfg(test)]
mod test_trailed_ints {
    use crate::{SaveAndRestore, StateManager, TrailedStateManager};

    #[test]
    fn values_come_back_checkpoint_after_checkpoint() {
        let mut sm = TrailedStateManager::new();
        let a = sm.new_int(1);

        sm.save_state();
        sm.set_int(a, 2);
        sm.set_int(a, 3);
        sm.save_state();
        sm.set_int(a, 4);
        assert_eq!(2, sm.depth());

        sm.restore_state();
        assert_eq!(3, sm.int(a));
        sm.restore_state();
        assert_eq!(1, sm.int(a));
        assert_eq!(0, sm.depth());
    }

    #[test]
    fn a_change_made_after_a_restore_is_trailed_again() {
        let mut sm = TrailedStateManager::new();
        let a = sm.new_int(0);

        sm.save_state();
        sm.set_int(a, 1);
        sm.save_state();
        sm.restore_state();
        sm.set_int(a, 2);
        sm.restore_state();

        assert_eq!(0, sm.int(a));
    }

    #[test]
    fn ints_created_after_a_checkpoint_are_dropped() {
        let mut sm = TrailedStateManager::new();
        let a = sm.new_int(7);
        sm.save_state();
        sm.new_int(8);
        sm.restore_state();

        let b = sm.new_int(9);
        assert_eq!(7, sm.int(a));
        assert_eq!(9, sm.int(b));
    }

    #[test]
    #[should_panic]
    fn restoring_the_root_state_panics() {
        let mut sm = TrailedStateManager::new();
        sm.save_state();
        sm.restore_state();
        sm.restore_state();
    }
}
