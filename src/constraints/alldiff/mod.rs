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

//! This module provides the all different constraint: all the variables in
//! its scope must be assigned pairwise distinct values. Several filtering
//! algorithms are available; the `AllDiffConsistency` tells which one(s)
//! get posted.

mod ac;
mod bc;
mod consistency;
mod fc;
mod graph;
mod matching;
mod scc;

use std::fmt;

use rustc_hash::FxHashSet;

pub use ac::AcPropagator;
pub use bc::BcPropagator;
pub use consistency::*;
pub use fc::FcPropagator;

use crate::{
    CPResult, ConstraintStore, DomainCondition, DomainEvent, DomainStore, Entailment,
    ModelingConstruct, Narrowing, Propagator, Variable,
};

/// This constraint enforces that the the value affected to each variable be
/// different from the one affected to all other variables.
#[derive(Debug, Clone)]
pub struct AllDiff {
    /// All these variables must take different values in the solution
    variables: Vec<Variable>,
    /// How hard should the propagators work ?
    consistency: AllDiffConsistency,
}
impl AllDiff {
    /// creates a new contraint with the default consistency
    pub fn new(variables: &[Variable]) -> Self {
        Self::with_consistency(variables, AllDiffConsistency::Default)
    }
    /// creates a new contraint enforcing the given consistency
    pub fn with_consistency(variables: &[Variable], consistency: AllDiffConsistency) -> Self {
        Self {
            variables: variables.to_vec(),
            consistency,
        }
    }
    /// The consistency enforced by this constraint
    pub fn consistency(&self) -> AllDiffConsistency {
        self.consistency
    }
}

impl ModelingConstruct for AllDiff {
    fn install(&self, cs: &mut dyn ConstraintStore) {
        let ds = cs.domain_store();
        let vars = &self.variables;
        let propagators = match self.consistency {
            AllDiffConsistency::Ac => vec![AllDiffPropagator::Ac(AcPropagator::new(vars, &*ds))],
            AllDiffConsistency::Bc => vec![AllDiffPropagator::Bc(BcPropagator::new(vars))],
            AllDiffConsistency::Fc => vec![AllDiffPropagator::Fc(FcPropagator::new(vars))],
            AllDiffConsistency::Default => vec![
                AllDiffPropagator::Fc(FcPropagator::new(vars)),
                AllDiffPropagator::Bc(BcPropagator::new(vars)),
            ],
        };

        for propagator in propagators {
            let conditions = vars
                .iter()
                .flat_map(|x| propagator.wake_up(*x))
                .collect::<Vec<_>>();
            let constraint = cs.post(Box::new(propagator));
            for cond in conditions {
                cs.propagate_on(constraint, cond);
            }
            cs.schedule(constraint);
        }
    }
}

/// One of the propagators of the all different constraint
#[derive(Debug, Clone)]
pub enum AllDiffPropagator {
    /// Arc consistency
    Ac(AcPropagator),
    /// Bounds consistency
    Bc(BcPropagator),
    /// Forward checking
    Fc(FcPropagator),
}

impl AllDiffPropagator {
    /// The conditions on `var` upon which this propagator must be advised
    fn wake_up(&self, var: Variable) -> Vec<DomainCondition> {
        match self {
            Self::Ac(_) => vec![DomainCondition::DomainChanged(var)],
            Self::Bc(_) => vec![
                DomainCondition::IsFixed(var),
                DomainCondition::MinimumChanged(var),
                DomainCondition::MaximumChanged(var),
            ],
            Self::Fc(_) => vec![DomainCondition::IsFixed(var)],
        }
    }
}

impl Propagator for AllDiffPropagator {
    fn advise(&mut self, event: DomainEvent) -> bool {
        match self {
            Self::Ac(p) => p.advise(event),
            Self::Bc(p) => p.advise(event),
            Self::Fc(p) => p.advise(event),
        }
    }

    fn propagate(&mut self, ds: &mut dyn DomainStore) -> CPResult<Narrowing> {
        match self {
            Self::Ac(p) => p.propagate(ds),
            Self::Bc(p) => p.propagate(ds),
            Self::Fc(p) => p.propagate(ds),
        }
    }

    fn is_entailed(&self, ds: &dyn DomainStore) -> Entailment {
        match self {
            Self::Ac(p) => p.is_entailed(ds),
            Self::Bc(p) => p.is_entailed(ds),
            Self::Fc(p) => p.is_entailed(ds),
        }
    }
}

impl fmt::Display for AllDiffPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ac(p) => fmt::Display::fmt(p, f),
            Self::Bc(p) => fmt::Display::fmt(p, f),
            Self::Fc(p) => fmt::Display::fmt(p, f),
        }
    }
}

/// Violated as soon as two fixed variables share a value, satisfied when
/// all variables are fixed (to distinct values).
fn entailment(variables: &[Variable], ds: &dyn DomainStore) -> Entailment {
    let mut values = FxHashSet::default();
    let mut all_fixed = true;
    for x in variables.iter().copied() {
        match ds.min(x) {
            Some(value) if ds.is_fixed(x) => {
                if !values.insert(value) {
                    return Entailment::Violated;
                }
            }
            _ => all_fixed = false,
        }
    }
    if all_fixed {
        Entailment::Satisfied
    } else {
        Entailment::Undetermined
    }
}

/// Writes `name(x0, x1, ...)`
fn write_scope(f: &mut fmt::Formatter<'_>, name: &str, variables: &[Variable]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, x) in variables.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{x}")?;
    }
    f.write_str(")")
}
