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

//! This module provides the implementation of an incremental maximum matching
//! algorithm which is useful when implementing the domain consistent propagator
//! for the all different constraint.
//!
//! The matching is repaired rather than recomputed: whenever some variable
//! loses its matched value, a breadth first search looks for an augmenting
//! path that starts at this free variable and ends at a free value. When one
//! is found, the path is flipped and the matching grows by one. When there is
//! none, no matching can cover all variables and the constraint is violated.

use std::collections::VecDeque;

use crate::{CPResult, Inconsistency};

use super::graph::{SupportGraph, ValueOffset, VariableId};

/// This "timestamp" implements a sort of 'monotonic clock' (a counter that
/// can only ever be incremented). It tells which value nodes have already
/// been reached during the current search.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Timestamp(usize);

impl Timestamp {
    /// Increments the value of the current timestamp
    fn inc(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A matching between the variables and the values of a support graph
#[derive(Debug, Clone)]
pub struct Matching {
    /// The value matched with each variable
    var_to_val: Vec<Option<ValueOffset>>,
    /// The variable matched with each value
    val_to_var: Vec<Option<VariableId>>,
    /// The number of matched pairs
    size: usize,
    // --- BFS RELATED STUFFS -------------------------------------------------
    /// The current 'time'
    timestamp: Timestamp,
    /// When was each value reached for the last time ?
    seen: Vec<Timestamp>,
    /// The variable from which each value was reached
    parent: Vec<Option<VariableId>>,
    /// The bfs queue (kept around to avoid repeated allocations)
    queue: VecDeque<VariableId>,
}

impl Matching {
    /// Creates an empty matching for `n_vars` variables and `n_vals` values
    pub fn new(n_vars: usize, n_vals: usize) -> Self {
        Self {
            var_to_val: vec![None; n_vars],
            val_to_var: vec![None; n_vals],
            size: 0,
            timestamp: Timestamp::default(),
            seen: vec![Timestamp::default(); n_vals],
            parent: vec![None; n_vals],
            queue: VecDeque::with_capacity(n_vars),
        }
    }
    /// The number of matched pairs
    pub fn len(&self) -> usize {
        self.size
    }
    /// The value matched with `var` (if any)
    pub fn value_of(&self, var: VariableId) -> Option<ValueOffset> {
        self.var_to_val[var.0]
    }
    /// The variable matched with `off` (if any)
    pub fn variable_of(&self, off: ValueOffset) -> Option<VariableId> {
        self.val_to_var[off.0]
    }
    /// Makes `var` free again
    pub fn unmatch(&mut self, var: VariableId) {
        if let Some(off) = self.var_to_val[var.0].take() {
            self.val_to_var[off.0] = None;
            self.size -= 1;
        }
    }
    /// Frees all the variables whose matched edge has disappeared from the
    /// graph
    pub fn retain_edges(&mut self, graph: &SupportGraph) {
        for i in 0..self.var_to_val.len() {
            let var = VariableId(i);
            if let Some(off) = self.var_to_val[i] {
                if !graph.has_edge(var, off) {
                    self.unmatch(var);
                }
            }
        }
    }
    /// Extends the matching greedily: every free variable is matched with
    /// the first free value it is connected to
    pub fn greedy(&mut self, graph: &SupportGraph) {
        for i in 0..self.var_to_val.len() {
            if self.var_to_val[i].is_some() {
                continue;
            }
            let var = VariableId(i);
            let free = graph
                .neighbours(var)
                .iter()
                .copied()
                .find(|off| self.val_to_var[off.0].is_none());
            if let Some(off) = free {
                self.pair(var, off);
            }
        }
    }
    /// Completes the matching so that it covers all variables. This fails
    /// with a `NoPerfectMatching` inconsistency naming the first variable
    /// that could not be matched.
    pub fn repair(&mut self, graph: &SupportGraph) -> CPResult<()> {
        for i in 0..self.var_to_val.len() {
            let var = VariableId(i);
            if self.var_to_val[i].is_none() && !self.augment_from(graph, var) {
                return Err(Inconsistency::NoPerfectMatching {
                    variable: graph.variable(var),
                });
            }
        }
        debug_assert_eq!(self.len(), self.var_to_val.len());
        Ok(())
    }
    /// Looks for an augmenting path from the free variable `root` and flips
    /// it when one exists. Returns true iff the matching grew.
    fn augment_from(&mut self, graph: &SupportGraph, root: VariableId) -> bool {
        self.timestamp = self.timestamp.inc();
        self.queue.clear();
        self.queue.push_back(root);

        while let Some(var) = self.queue.pop_front() {
            for off in graph.neighbours(var).iter().copied() {
                if self.seen[off.0] == self.timestamp {
                    continue;
                }
                self.seen[off.0] = self.timestamp;
                self.parent[off.0] = Some(var);

                match self.val_to_var[off.0] {
                    None => {
                        self.flip(off);
                        return true;
                    }
                    Some(mate) => self.queue.push_back(mate),
                }
            }
        }
        false
    }
    /// Walks the augmenting path ending at the free value `end` back to its
    /// origin and swaps the matched and unmatched edges along the way
    fn flip(&mut self, end: ValueOffset) {
        let mut off = end;
        while let Some(var) = self.parent[off.0] {
            let previous = self.var_to_val[var.0];
            self.var_to_val[var.0] = Some(off);
            self.val_to_var[off.0] = Some(var);
            match previous {
                None => break,
                Some(prev) => off = prev,
            }
        }
        self.size += 1;
    }
    /// Matches `var` with `off` (both must be free)
    fn pair(&mut self, var: VariableId, off: ValueOffset) {
        debug_assert!(self.var_to_val[var.0].is_none());
        debug_assert!(self.val_to_var[off.0].is_none());
        self.var_to_val[var.0] = Some(off);
        self.val_to_var[off.0] = Some(var);
        self.size += 1;
    }
}
