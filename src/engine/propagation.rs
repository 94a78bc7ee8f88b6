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

//! This module defines the contract which is shared by all the propagators
//! that can be posted in a model: they are advised of the domain events,
//! they propagate and they can be asked whether they are entailed.

use std::collections::BTreeSet;

use crate::{CPResult, DomainEvent, DomainStore, Variable};

/// The propagator is the portion of the code where the magic actually happens.
/// A propagator is called by the solver during the fixpoint computation. It
/// enforces a certain level of consistency on the domain of the variables it
/// works on.
pub trait Propagator {
    /// This method is called for every event occurring on a variable the
    /// propagator listens to. It must be cheap: the propagator is expected to
    /// buffer whatever it needs and to return true iff it wants to be
    /// scheduled for propagation.
    fn advise(&mut self, _event: DomainEvent) -> bool {
        true
    }
    /// Actually runs the custom propagation algorithm. Upon success, the
    /// variables whose domain has been narrowed are returned.
    fn propagate(&mut self, domain_store: &mut dyn DomainStore) -> CPResult<Narrowing>;
    /// Tells whether the constraint enforced by this propagator is violated,
    /// satisfied or undetermined given the current domains. This never
    /// mutates anything.
    fn is_entailed(&self, _domain_store: &dyn DomainStore) -> Entailment {
        Entailment::Undetermined
    }
}

/// Any closure/function that accepts a mutable ref to the domain store can be
/// a propagator. (This is mere convenience, not required to get something
/// useable). Such a propagator never reports the variables it narrowed.
impl<F: FnMut(&mut dyn DomainStore) -> CPResult<()>> Propagator for F {
    fn propagate(&mut self, domain_store: &mut dyn DomainStore) -> CPResult<Narrowing> {
        self(domain_store)?;
        Ok(Narrowing::default())
    }
}

/// The status of a constraint with respect to the current domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entailment {
    /// No assignment of the variables can satisfy the constraint
    Violated,
    /// All assignments of the variables satisfy the constraint
    Satisfied,
    /// It is too early to tell
    Undetermined,
}

/// The set of variables whose domain was effectively narrowed by one call
/// to `propagate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narrowing {
    narrowed: BTreeSet<Variable>,
}
impl Narrowing {
    /// Records the outcome of a narrowing operation on `var` and forwards
    /// the `changed` flag.
    ///
    /// ```ignore
    /// narrowing.track(x, ds.remove(x, 4)?);
    /// ```
    pub fn track(&mut self, var: Variable, changed: bool) -> bool {
        if changed {
            self.narrowed.insert(var);
        }
        changed
    }
    /// Returns true iff no domain was narrowed
    pub fn is_empty(&self) -> bool {
        self.narrowed.is_empty()
    }
    /// Returns true iff the domain of var was narrowed
    pub fn contains(&self, var: Variable) -> bool {
        self.narrowed.contains(&var)
    }
    /// Iterates over the narrowed variables (in increasing id order)
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.narrowed.iter().copied()
    }
    /// The number of narrowed variables
    pub fn len(&self) -> usize {
        self.narrowed.len()
    }
}
