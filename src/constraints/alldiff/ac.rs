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

//! This module provides the implementation of the domain consistent alldiff
//! propagator. The algorithm used to implement that constraint is described
//! in "A filtering algorithm for constraints of difference in CSPs" J-C. Régin,
//! AAAI-94.
//!
//! Essentially, the algorithm operates in two phases:
//!
//! 1. A quick feasibility check is performed. That one states that for a
//!    solution to exist for all different, one must be able to find a maximum
//!    matching between variables and their domain values in the var value
//!    bi-partite graph. In the event where no maximum matching exists that
//!    covers all variables, the all different constraint simply cant be satisfied.
//!
//! 2. When it is known that the constraint is satisfiable, the strongly
//!    connected components of the oriented graph tell which values have no
//!    support. These are pruned from the variable domains.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{
    CPResult, DomainEvent, DomainStore, Entailment, Inconsistency, Narrowing, Propagator,
    Variable,
};

use super::fc::forward_check;
use super::graph::{SupportGraph, ValueOffset, VariableId};
use super::matching::Matching;
use super::scc::Components;
use super::{entailment, write_scope};

/// The arc consistent propagator
#[derive(Debug, Clone)]
pub struct AcPropagator {
    /// The variables that must all be different
    variables: Vec<Variable>,
    /// The position of each variable in the scope
    position: FxHashMap<Variable, usize>,
    /// The bipartite variable-value graph
    graph: SupportGraph,
    /// The current maximum matching
    matching: Matching,
    /// The strongly connected components of the oriented graph
    components: Components,
    /// The variables whose domain changed since the last propagation
    touched: Vec<usize>,
    /// The variables which got fixed since the last propagation
    fixed: Vec<usize>,
    /// The values to prune for the variable being processed
    doomed: Vec<ValueOffset>,
}

impl AcPropagator {
    /// Creates a new propagator. The value universe is derived from the
    /// current domains of the variables.
    pub fn new(variables: &[Variable], ds: &dyn DomainStore) -> Self {
        let graph = SupportGraph::new(variables, ds);
        let matching = Matching::new(graph.n_variables(), graph.n_values());
        let components = Components::new(graph.n_variables(), graph.n_values());
        Self {
            variables: variables.to_vec(),
            position: variables
                .iter()
                .copied()
                .enumerate()
                .map(|(i, x)| (x, i))
                .collect(),
            graph,
            matching,
            components,
            touched: vec![],
            fixed: vec![],
            doomed: vec![],
        }
    }

    /// Brings the graph and the matching up to date with the domains
    fn refresh(&mut self, ds: &dyn DomainStore) {
        if self.graph.is_stale(ds) {
            self.graph.rebuild(ds);
            // the pairs which are still valid make for a warm start
            self.matching.retain_edges(&self.graph);
            self.matching.greedy(&self.graph);
            self.touched.clear();
            self.fixed.clear();
            self.fixed
                .extend((0..self.variables.len()).filter(|i| ds.is_fixed(self.variables[*i])));
        } else {
            for i in self.touched.drain(..) {
                self.graph.sync(VariableId(i), ds);
            }
        }
    }

    /// Removes every edge whose endpoints lie in different components, unless
    /// it is a matched edge
    fn prune(&mut self, ds: &mut dyn DomainStore, narrowing: &mut Narrowing) -> CPResult<()> {
        let Self {
            variables,
            graph,
            matching,
            components,
            doomed,
            ..
        } = self;

        for (i, x) in variables.iter().copied().enumerate() {
            let var = VariableId(i);
            let mate = match matching.value_of(var) {
                Some(mate) => mate,
                None => continue,
            };
            doomed.clear();
            doomed.extend(
                graph
                    .neighbours(var)
                    .iter()
                    .copied()
                    .filter(|off| *off != mate && components.separates(var, *off)),
            );
            if doomed.is_empty() {
                continue;
            }

            if doomed.len() + 1 == graph.neighbours(var).len() {
                // only the matched edge survives
                narrowing.track(x, ds.fix(x, graph.value(mate))?);
            } else {
                for off in doomed.iter().copied() {
                    narrowing.track(x, ds.remove(x, graph.value(off))?);
                }
            }
            for off in doomed.iter().copied() {
                graph.remove_edge(var, off);
            }
        }
        Ok(())
    }
}

impl Propagator for AcPropagator {
    fn advise(&mut self, event: DomainEvent) -> bool {
        match self.position.get(&event.variable) {
            Some(&i) => {
                if event.domain_changed {
                    self.touched.push(i);
                }
                if event.is_fixed {
                    self.fixed.push(i);
                }
                true
            }
            None => false,
        }
    }

    fn propagate(&mut self, ds: &mut dyn DomainStore) -> CPResult<Narrowing> {
        let mut narrowing = Narrowing::default();
        if self.variables.is_empty() {
            return Ok(narrowing);
        }
        if self.graph.n_values() < self.variables.len() {
            debug!(
                "{}: {} values for {} variables",
                self,
                self.graph.n_values(),
                self.variables.len()
            );
            return Err(Inconsistency::NoPerfectMatching {
                variable: self.variables[0],
            });
        }

        self.refresh(&*ds);

        forward_check(&self.variables, &mut self.fixed, ds, &mut narrowing)?;
        for x in narrowing.variables() {
            self.graph.sync(VariableId(self.position[&x]), &*ds);
        }

        self.matching.retain_edges(&self.graph);
        if let Err(inconsistency) = self.matching.repair(&self.graph) {
            debug!("{}: {}", self, inconsistency);
            return Err(inconsistency);
        }

        self.components.compute(&self.graph, &self.matching);
        self.prune(ds, &mut narrowing)?;

        trace!(
            "{}: {} edges left, {} pairs matched, {} variable(s) narrowed",
            self,
            self.graph.n_edges(),
            self.matching.len(),
            narrowing.len()
        );
        Ok(narrowing)
    }

    fn is_entailed(&self, ds: &dyn DomainStore) -> Entailment {
        entailment(&self.variables, ds)
    }
}

impl fmt::Display for AcPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scope(f, "AllDiffAC", &self.variables)
    }
}

#[cfg(test)]
mod test_ac {
    use test_log::test;

    use crate::testing::ivar;
    use crate::{
        domain_values, DefaultDomainStore, DomainBroker, DomainStore, Entailment, Inconsistency,
        Propagator, SaveAndRestore,
    };

    use super::AcPropagator;

    /// Delivers the pending events of the store to the propagator
    fn deliver(ds: &mut DefaultDomainStore, ac: &mut AcPropagator) {
        let mut events = vec![];
        ds.for_each_event(|e| events.push(e));
        ds.clear_events();
        for e in events {
            assert!(ac.advise(e));
        }
    }

    #[test]
    fn a_hall_set_forces_the_remaining_variable() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 2]),
            ivar(&mut ds, &[1, 2]),
            ivar(&mut ds, &[1, 2, 3]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);

        let narrowing = ac.propagate(&mut ds).unwrap();
        assert_eq!(vec![vars[2]], narrowing.variables().collect::<Vec<_>>());
        assert!(ds.is_fixed(vars[2]));
        assert_eq!(Some(3), ds.min(vars[2]));
        assert_eq!(2, ds.size(vars[0]));
        assert_eq!(2, ds.size(vars[1]));
    }

    #[test]
    fn pigeonhole_fails_without_a_perfect_matching() {
        let mut ds = DefaultDomainStore::default();
        let vars = (0..4).map(|_| ds.new_int_var(1, 3)).collect::<Vec<_>>();
        let mut ac = AcPropagator::new(&vars, &ds);

        assert!(matches!(
            ac.propagate(&mut ds),
            Err(Inconsistency::NoPerfectMatching { .. })
        ));
    }

    #[test]
    fn competing_for_a_single_value_fails() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 5]),
            ivar(&mut ds, &[1, 5]),
            ivar(&mut ds, &[1, 5]),
            ivar(&mut ds, &[2, 3, 4]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);

        assert!(matches!(
            ac.propagate(&mut ds),
            Err(Inconsistency::NoPerfectMatching { .. })
        ));
    }

    #[test]
    fn holes_are_exploited() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 3]),
            ivar(&mut ds, &[1, 3]),
            ivar(&mut ds, &[1, 2, 3]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);

        ac.propagate(&mut ds).unwrap();
        assert_eq!(Some(2), ds.min(vars[2]));
        assert!(ds.is_fixed(vars[2]));
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 4, 5]),
            ivar(&mut ds, &[9, 10]),
            ivar(&mut ds, &[1, 4, 5, 8, 9]),
            ivar(&mut ds, &[1, 4, 5]),
            ivar(&mut ds, &[1, 4, 5, 8, 9]),
            ivar(&mut ds, &[1, 4, 5]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);

        let first = ac.propagate(&mut ds).unwrap();
        assert!(!first.is_empty());
        assert_eq!(Some(10), ds.min(vars[1]));
        assert_eq!(vec![8, 9], domain_values(&ds, vars[2]).collect::<Vec<_>>());

        let second = ac.propagate(&mut ds).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn advised_removals_are_taken_into_account() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 2, 3]),
            ivar(&mut ds, &[1, 2, 3]),
            ivar(&mut ds, &[1, 2, 3]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);
        assert!(ac.propagate(&mut ds).unwrap().is_empty());

        // something outside of the propagator fixes x0 to 1
        ds.fix(vars[0], 1).unwrap();
        deliver(&mut ds, &mut ac);

        ac.propagate(&mut ds).unwrap();
        assert_eq!(vec![2, 3], domain_values(&ds, vars[1]).collect::<Vec<_>>());
        assert_eq!(vec![2, 3], domain_values(&ds, vars[2]).collect::<Vec<_>>());
    }

    #[test]
    fn graph_is_rebuilt_after_a_restoration() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ivar(&mut ds, &[1, 2, 3]),
            ivar(&mut ds, &[1, 2, 3]),
            ivar(&mut ds, &[1, 2, 3]),
        ];
        let mut ac = AcPropagator::new(&vars, &ds);
        ac.propagate(&mut ds).unwrap();

        ds.save_state();
        ds.remove(vars[0], 1).unwrap();
        ds.remove(vars[1], 1).unwrap();
        deliver(&mut ds, &mut ac);
        ac.propagate(&mut ds).unwrap();
        assert!(ds.is_fixed(vars[2]));
        assert_eq!(Some(1), ds.min(vars[2]));
        ds.restore_state();

        // these removals are never delivered: the new generation alone
        // triggers the rebuild of the graph
        ds.remove(vars[2], 3).unwrap();
        ds.remove(vars[1], 3).unwrap();
        ac.propagate(&mut ds).unwrap();
        assert_eq!(Some(3), ds.min(vars[0]));
        assert!(ds.is_fixed(vars[0]));
    }

    #[test]
    fn entailment_follows_the_fixed_values() {
        let mut ds = DefaultDomainStore::default();
        let x = ivar(&mut ds, &[1, 2]);
        let y = ivar(&mut ds, &[1, 2]);
        let ac = AcPropagator::new(&[x, y], &ds);

        assert_eq!(Entailment::Undetermined, ac.is_entailed(&ds));
        ds.save_state();
        ds.fix(x, 1).unwrap();
        ds.fix(y, 2).unwrap();
        assert_eq!(Entailment::Satisfied, ac.is_entailed(&ds));
        ds.restore_state();
        ds.fix(x, 2).unwrap();
        ds.fix(y, 2).unwrap();
        assert_eq!(Entailment::Violated, ac.is_entailed(&ds));
    }

    #[test]
    fn display_lists_the_scope() {
        let mut ds = DefaultDomainStore::default();
        let vars = (0..3).map(|_| ds.new_int_var(0, 4)).collect::<Vec<_>>();
        let ac = AcPropagator::new(&vars, &ds);
        assert_eq!("AllDiffAC(x0, x1, x2)", ac.to_string());
    }
}
