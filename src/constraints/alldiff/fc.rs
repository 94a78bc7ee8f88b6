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

//! The weakest (and cheapest) filtering of the all different constraint:
//! whenever a variable gets fixed, its value is removed from the domain of
//! all the other variables.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{CPResult, DomainEvent, DomainStore, Entailment, Narrowing, Propagator, Variable};

use super::{entailment, write_scope};

/// Removes the value of every variable listed in `pending` from the domain
/// of all other variables. The variables which become fixed along the way
/// are processed as well. Stale entries (pointing to variables which are not
/// fixed anymore) are simply skipped.
pub(super) fn forward_check(
    variables: &[Variable],
    pending: &mut Vec<usize>,
    ds: &mut dyn DomainStore,
    narrowing: &mut Narrowing,
) -> CPResult<()> {
    while let Some(i) = pending.pop() {
        let x = variables[i];
        let value = match ds.min(x) {
            Some(value) if ds.is_fixed(x) => value,
            _ => continue,
        };
        for (j, y) in variables.iter().copied().enumerate() {
            if j != i && narrowing.track(y, ds.remove(y, value)?) && ds.is_fixed(y) {
                pending.push(j);
            }
        }
    }
    Ok(())
}

/// Forward checking propagator
#[derive(Debug, Clone)]
pub struct FcPropagator {
    /// The variables that must all be different
    variables: Vec<Variable>,
    /// The position of each variable in the scope
    position: FxHashMap<Variable, usize>,
    /// The variables which have been fixed since the last propagation
    pending: Vec<usize>,
    /// The generation of the domain store as of the last propagation
    generation: Option<usize>,
}

impl FcPropagator {
    /// Creates a new forward checking propagator
    pub fn new(variables: &[Variable]) -> Self {
        Self {
            variables: variables.to_vec(),
            position: variables
                .iter()
                .copied()
                .enumerate()
                .map(|(i, x)| (x, i))
                .collect(),
            pending: vec![],
            generation: None,
        }
    }
}

impl Propagator for FcPropagator {
    fn advise(&mut self, event: DomainEvent) -> bool {
        match self.position.get(&event.variable) {
            Some(&i) if event.is_fixed => {
                self.pending.push(i);
                true
            }
            _ => false,
        }
    }

    fn propagate(&mut self, ds: &mut dyn DomainStore) -> CPResult<Narrowing> {
        if self.generation != Some(ds.generation()) {
            self.generation = Some(ds.generation());
            self.pending.clear();
            self.pending
                .extend((0..self.variables.len()).filter(|i| ds.is_fixed(self.variables[*i])));
        }
        let mut narrowing = Narrowing::default();
        forward_check(&self.variables, &mut self.pending, ds, &mut narrowing)?;
        Ok(narrowing)
    }

    fn is_entailed(&self, ds: &dyn DomainStore) -> Entailment {
        entailment(&self.variables, ds)
    }
}

impl fmt::Display for FcPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scope(f, "AllDiffFC", &self.variables)
    }
}

#[cfg(test)]
mod test_fc {
    use test_log::test;

    use crate::testing::ivar;
    use crate::{DefaultDomainStore, DomainStore, Entailment, Inconsistency, Propagator};

    use super::FcPropagator;

    #[test]
    fn fixed_values_are_removed_from_the_others() {
        let mut ds = DefaultDomainStore::default();
        let x = ivar(&mut ds, &[2]);
        let y = ivar(&mut ds, &[1, 2, 3]);
        let z = ivar(&mut ds, &[1, 2, 3]);
        let mut fc = FcPropagator::new(&[x, y, z]);

        let narrowing = fc.propagate(&mut ds).unwrap();
        assert_eq!(2, narrowing.len());
        assert_eq!(2, ds.size(y));
        assert_eq!(2, ds.size(z));
        assert!(!ds.contains(y, 2));
    }

    #[test]
    fn removals_cascade_through_the_fixed_variables() {
        let mut ds = DefaultDomainStore::default();
        let x = ivar(&mut ds, &[1]);
        let y = ivar(&mut ds, &[1, 2]);
        let z = ivar(&mut ds, &[1, 2, 3]);
        let mut fc = FcPropagator::new(&[x, y, z]);

        fc.propagate(&mut ds).unwrap();
        assert_eq!(Some(2), ds.min(y));
        assert!(ds.is_fixed(z));
        assert_eq!(Some(3), ds.min(z));
        assert_eq!(Entailment::Satisfied, fc.is_entailed(&ds));
    }

    #[test]
    fn two_variables_fixed_to_the_same_value_fail() {
        let mut ds = DefaultDomainStore::default();
        let x = ivar(&mut ds, &[4]);
        let y = ivar(&mut ds, &[4]);
        let mut fc = FcPropagator::new(&[x, y]);

        assert_eq!(Entailment::Violated, fc.is_entailed(&ds));
        assert!(matches!(
            fc.propagate(&mut ds),
            Err(Inconsistency::EmptyDomain { value: 4, .. })
        ));
    }

    #[test]
    fn display_lists_the_scope() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(0, 1);
        let y = ds.new_int_var(0, 1);
        assert_eq!("AllDiffFC(x0, x1)", FcPropagator::new(&[x, y]).to_string());
    }
}
