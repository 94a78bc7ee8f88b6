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

//! Helpers shared by the unit tests of this crate.

use std::collections::BTreeSet;

use crate::{
    domain_values, ConstraintStore, DefaultCpModel, DomainCondition, DomainStore,
    SaveAndRestore, Variable,
};

/// Creates a variable whose domain is exactly the given (non empty) set of
/// values.
pub fn ivar(ds: &mut dyn DomainStore, values: &[isize]) -> Variable {
    let min = values.iter().copied().min().unwrap_or_default();
    let max = values.iter().copied().max().unwrap_or_default();
    let var = ds.new_int_var(min, max);
    for v in min..=max {
        if !values.contains(&v) {
            ds.remove(var, v).expect("cannot empty the domain");
        }
    }
    var
}

/// Posts a propagator maintaining `y == x + offset` on both domains.
pub fn post_offset(cp: &mut DefaultCpModel, x: Variable, y: Variable, offset: isize) {
    let constraint = cp.post(Box::new(move |ds: &mut dyn DomainStore| {
        for v in domain_values(&*ds, x).collect::<Vec<_>>() {
            if !ds.contains(y, v + offset) {
                ds.remove(x, v)?;
            }
        }
        for v in domain_values(&*ds, y).collect::<Vec<_>>() {
            if !ds.contains(x, v - offset) {
                ds.remove(y, v)?;
            }
        }
        Ok(())
    }));
    cp.propagate_on(constraint, DomainCondition::DomainChanged(x));
    cp.propagate_on(constraint, DomainCondition::DomainChanged(y));
    cp.schedule(constraint);
}

/// Counts the solutions of the model by exhaustive search over the domains
/// of the given variables. The model is left in the state it was found.
pub fn count_solutions(cp: &mut DefaultCpModel, vars: &[Variable]) -> usize {
    if cp.fixpoint().is_err() {
        return 0;
    }
    let Some(branch) = vars.iter().copied().find(|x| !cp.is_fixed(*x)) else {
        return 1;
    };
    let values = domain_values(&*cp, branch).collect::<Vec<_>>();
    let mut total = 0;
    for v in values {
        cp.save_state();
        if cp.fix(branch, v).is_ok() {
            total += count_solutions(cp, vars);
        }
        cp.restore_state();
    }
    total
}

/// Enumerates all the assignments of pairwise distinct values and returns,
/// for each variable, the set of values it takes in at least one of them.
/// None is returned when there is no such assignment at all.
pub fn brute_force_supports(domains: &[Vec<isize>]) -> Option<Vec<BTreeSet<isize>>> {
    fn enumerate(
        domains: &[Vec<isize>],
        assignment: &mut Vec<isize>,
        supports: &mut Vec<BTreeSet<isize>>,
    ) -> bool {
        let depth = assignment.len();
        if depth == domains.len() {
            for (support, v) in supports.iter_mut().zip(assignment.iter()) {
                support.insert(*v);
            }
            return true;
        }
        let mut found = false;
        for v in domains[depth].iter().copied() {
            if !assignment.contains(&v) {
                assignment.push(v);
                found |= enumerate(domains, assignment, supports);
                assignment.pop();
            }
        }
        found
    }

    let mut supports = vec![BTreeSet::new(); domains.len()];
    let mut assignment = vec![];
    if enumerate(domains, &mut assignment, &mut supports) {
        Some(supports)
    } else {
        None
    }
}
