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

//! The bipartite variable-value graph on which the arc consistent filtering
//! of the all different constraint operates. There is one node per variable
//! of the constraint and one node per value of the *universe* (that is the
//! range spanning from the least to the greatest value in the domain of any
//! of the variables at the time the graph was created). An edge connects a
//! variable and a value iff that value belongs to the domain of the variable.
//!
//! Once it is built, the graph only ever loses edges. It must be rebuilt
//! from scratch whenever the generation of the domain store changes (this
//! happens when a previous state is restored, and the domains might have
//! grown back).

use log::trace;

use crate::{domain_values, DomainStore, Variable};

/// The position of a variable in the scope of the constraint
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VariableId(pub usize);

/// The position of a value in the universe of the graph: the value `v` sits
/// at offset `v - min_value`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValueOffset(pub usize);

/// Marks the absence of an edge in the position table
const ABSENT: usize = usize::MAX;

/// The support graph of an all different constraint
#[derive(Debug, Clone)]
pub struct SupportGraph {
    /// The variables of the constraint (the variable nodes)
    variables: Vec<Variable>,
    /// The least value of the universe
    min_value: isize,
    /// The number of values in the universe
    n_values: usize,
    /// For each variable, the offsets of the values it is connected to
    edges: Vec<Vec<ValueOffset>>,
    /// Where does each (variable, value) edge sit in `edges` ? This is a flat
    /// `n_variables x n_values` table holding ABSENT for missing edges.
    position: Vec<usize>,
    /// The generation of the domain store when the graph was last built
    generation: Option<usize>,
}

impl SupportGraph {
    /// Creates an (empty) support graph for the given variables. The value
    /// universe is fixed once and for all from the current domains. The edges
    /// only get created upon the first call to `rebuild()`.
    pub fn new(variables: &[Variable], ds: &dyn DomainStore) -> Self {
        let min_value = variables
            .iter()
            .filter_map(|x| ds.min(*x))
            .min()
            .unwrap_or(0);
        let max_value = variables
            .iter()
            .filter_map(|x| ds.max(*x))
            .max()
            .unwrap_or(min_value - 1);
        let n_values = (max_value - min_value + 1) as usize;

        Self {
            variables: variables.to_vec(),
            min_value,
            n_values,
            edges: vec![vec![]; variables.len()],
            position: vec![ABSENT; variables.len() * n_values],
            generation: None,
        }
    }
    /// Returns true iff the edges of this graph do not reflect the domains
    /// of the given store anymore (a state has been restored since the graph
    /// was built, or it has never been built at all)
    pub fn is_stale(&self, ds: &dyn DomainStore) -> bool {
        self.generation != Some(ds.generation())
    }
    /// Recreates all the edges from the current domains.
    pub fn rebuild(&mut self, ds: &dyn DomainStore) {
        for (i, edges) in self.edges.iter_mut().enumerate() {
            for off in edges.drain(..) {
                self.position[i * self.n_values + off.0] = ABSENT;
            }
        }
        for i in 0..self.variables.len() {
            let var = self.variables[i];
            for value in domain_values(ds, var) {
                debug_assert!(self.offset(value).is_some(), "{value} outside of the universe");
                if let Some(off) = self.offset(value) {
                    self.position[i * self.n_values + off.0] = self.edges[i].len();
                    self.edges[i].push(off);
                }
            }
        }
        self.generation = Some(ds.generation());
        trace!(
            "support graph rebuilt: {} variables, {} values, {} edges",
            self.variables.len(),
            self.n_values,
            self.n_edges()
        );
    }
    /// Removes the edges whose value has left the domain of the variable.
    /// Returns true iff some edge was removed.
    pub fn sync(&mut self, var: VariableId, ds: &dyn DomainStore) -> bool {
        let x = self.variables[var.0];
        let before = self.edges[var.0].len();
        let mut k = 0;
        while k < self.edges[var.0].len() {
            let off = self.edges[var.0][k];
            if ds.contains(x, self.value(off)) {
                k += 1;
            } else {
                self.remove_edge(var, off);
            }
        }
        before != self.edges[var.0].len()
    }
    /// Removes the edge between `var` and the value at offset `off`. Returns
    /// false when there was no such edge.
    pub fn remove_edge(&mut self, var: VariableId, off: ValueOffset) -> bool {
        let slot = var.0 * self.n_values + off.0;
        let pos = self.position[slot];
        if pos == ABSENT {
            return false;
        }
        let edges = &mut self.edges[var.0];
        edges.swap_remove(pos);
        if let Some(moved) = edges.get(pos).copied() {
            self.position[var.0 * self.n_values + moved.0] = pos;
        }
        self.position[slot] = ABSENT;
        true
    }
    /// Returns true iff there is an edge between `var` and `off`
    pub fn has_edge(&self, var: VariableId, off: ValueOffset) -> bool {
        self.position[var.0 * self.n_values + off.0] != ABSENT
    }
    /// The values `var` is connected to (in no particular order)
    pub fn neighbours(&self, var: VariableId) -> &[ValueOffset] {
        &self.edges[var.0]
    }
    /// The number of variable nodes
    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }
    /// The number of value nodes
    pub fn n_values(&self) -> usize {
        self.n_values
    }
    /// The total number of edges
    pub fn n_edges(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }
    /// The cp variable sitting behind the given variable node
    pub fn variable(&self, var: VariableId) -> Variable {
        self.variables[var.0]
    }
    /// The actual value sitting behind the given value node
    pub fn value(&self, off: ValueOffset) -> isize {
        debug_assert!(off.0 < self.n_values);
        self.min_value + off.0 as isize
    }
    /// The value node of the given value (if it belongs to the universe)
    pub fn offset(&self, value: isize) -> Option<ValueOffset> {
        if value < self.min_value {
            return None;
        }
        let off = (value - self.min_value) as usize;
        (off < self.n_values).then_some(ValueOffset(off))
    }
}
