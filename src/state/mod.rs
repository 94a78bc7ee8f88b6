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

//! Reversible state. The domains of the variables (and the bookkeeping of
//! the constraint store) live in a state manager: saving a state takes a
//! checkpoint, restoring it undoes every change made since that checkpoint.
//! This is what lets a search driver backtrack without the propagators
//! having to undo anything themselves.

mod trailed;
pub use trailed::*;

/// Handle to an integer whose value is restored upon backtrack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrailedInt(usize);

/// Handle to a reversible set of integers drawn from a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrailedSet(usize);

/// Anything whose state can be checkpointed and brought back later on
pub trait SaveAndRestore {
    /// Takes a checkpoint of the current state
    fn save_state(&mut self);
    /// Goes back to the most recent checkpoint (and discards it)
    fn restore_state(&mut self);
}

/// The reversible resources required to implement a domain store: plain
/// integers and sets of integers. Resources created after a checkpoint are
/// discarded when that checkpoint is restored.
pub trait StateManager: SaveAndRestore {
    /// Creates an integer with the given initial value
    fn new_int(&mut self, value: isize) -> TrailedInt;
    /// Current value of the integer
    fn int(&self, id: TrailedInt) -> isize;
    /// Assigns a new value to the integer
    fn set_int(&mut self, id: TrailedInt, value: isize);

    /// Creates a set holding all the values of `min..=max`
    fn new_set(&mut self, min: isize, max: isize) -> TrailedSet;
    /// Number of values in the set
    fn set_len(&self, id: TrailedSet) -> usize;
    /// Smallest value of the set, None when it is empty
    fn set_min(&self, id: TrailedSet) -> Option<isize>;
    /// Largest value of the set, None when it is empty
    fn set_max(&self, id: TrailedSet) -> Option<isize>;
    /// True iff the set holds `value`
    fn set_contains(&self, id: TrailedSet, value: isize) -> bool;
    /// Smallest value of the set strictly greater than `value`
    fn set_next(&self, id: TrailedSet, value: isize) -> Option<isize> {
        let (min, max) = (self.set_min(id)?, self.set_max(id)?);
        if value < min {
            Some(min)
        } else {
            (value + 1..=max).find(|v| self.set_contains(id, *v))
        }
    }
    /// Removes `value`, returns false when it was not there
    fn set_remove(&mut self, id: TrailedSet, value: isize) -> bool;
    /// Keeps `value` only. The set is emptied when it does not hold `value`.
    fn set_keep_only(&mut self, id: TrailedSet, value: isize);
    /// Removes every value
    fn set_clear(&mut self, id: TrailedSet);
    /// Removes the values strictly smaller than `value`
    fn set_remove_below(&mut self, id: TrailedSet, value: isize) {
        if let (Some(min), Some(max)) = (self.set_min(id), self.set_max(id)) {
            if value > max {
                self.set_clear(id);
            } else {
                for v in min..value {
                    self.set_remove(id, v);
                }
            }
        }
    }
    /// Removes the values strictly greater than `value`
    fn set_remove_above(&mut self, id: TrailedSet, value: isize) {
        if let (Some(min), Some(max)) = (self.set_min(id), self.set_max(id)) {
            if value < min {
                self.set_clear(id);
            } else {
                for v in value + 1..=max {
                    self.set_remove(id, v);
                }
            }
        }
    }
}
