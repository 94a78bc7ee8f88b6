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

//! The constraint store. It owns the propagators, hands the domain events
//! over to the propagators that subscribed to them and runs the scheduled
//! propagators until none of them is left (the fixpoint).

use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    CPResult, DomainBroker, DomainEvent, DomainStore, DomainStoreImpl, Entailment, Propagator,
    SaveAndRestore, StateManager, TrailedInt, TrailedStateManager, Variable,
};

/// A high level construct of a model (e.g. an all different constraint).
/// Installing it posts the propagators enforcing it.
pub trait ModelingConstruct {
    /// Posts the propagators of this construct on the constraint store and
    /// subscribes them to the conditions they need to hear about
    fn install(&self, constraint_store: &mut dyn ConstraintStore);
}

/// Handle to a propagator posted on a constraint store
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint(usize);

impl From<usize> for Constraint {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Something that may happen to the domain of a variable, and which a
/// propagator can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainCondition {
    /// The domain is reduced to one value
    IsFixed(Variable),
    /// The lower bound moved
    MinimumChanged(Variable),
    /// The upper bound moved
    MaximumChanged(Variable),
    /// Any value was removed
    DomainChanged(Variable),
}

impl DomainCondition {
    /// All the conditions met by the given event
    fn met_by(event: &DomainEvent) -> impl Iterator<Item = DomainCondition> {
        let x = event.variable;
        [
            (event.is_fixed, Self::IsFixed(x)),
            (event.min_changed, Self::MinimumChanged(x)),
            (event.max_changed, Self::MaximumChanged(x)),
            (event.domain_changed, Self::DomainChanged(x)),
        ]
        .into_iter()
        .filter_map(|(met, condition)| met.then_some(condition))
    }
}

/// Where propagators are posted and run
pub trait ConstraintStore {
    /// The domains the propagators work on
    fn domain_store(&mut self) -> &mut dyn DomainStore;
    /// Installs a modeling construct
    fn install(&mut self, modeling_construct: &dyn ModelingConstruct);
    /// Posts a propagator. It is neither scheduled nor subscribed to
    /// anything yet.
    fn post(&mut self, propagator: Box<dyn Propagator>) -> Constraint;
    /// Puts the propagator on the agenda of the next fixpoint
    fn schedule(&mut self, constraint: Constraint);
    /// Subscribes the propagator to the events meeting `cond`
    fn propagate_on(&mut self, constraint: Constraint, cond: DomainCondition);
    /// Runs the scheduled propagators until none is left, or until one of
    /// them fails
    fn fixpoint(&mut self) -> CPResult<()>;
    /// Asks the propagator whether its constraint holds on the current
    /// domains
    fn is_entailed(&self, constraint: Constraint) -> Entailment;
}

/// A model offers variables, constraints and backtracking all at once
pub trait CpModel: DomainStore + ConstraintStore + SaveAndRestore {}

/// The model used by default
pub type DefaultCpModel = CpModelImpl<TrailedStateManager>;

/// A constraint store wrapping a domain store. Propagators and
/// subscriptions are reversible: those made after a checkpoint are dropped
/// when that checkpoint is restored.
pub struct CpModelImpl<T: StateManager> {
    domains: DomainStoreImpl<T>,
    propagators: Vec<Box<dyn Propagator>>,
    /// Number of live propagators
    n_propagators: TrailedInt,
    /// The propagators subscribed to each condition
    subscribers: FxHashMap<DomainCondition, Vec<Constraint>>,
    /// Every subscription, oldest first
    subscriptions: Vec<(DomainCondition, Constraint)>,
    /// Number of live subscriptions
    n_subscriptions: TrailedInt,
    /// Scheduled propagators, in the order they will run
    agenda: VecDeque<Constraint>,
    /// The propagators sitting on the agenda
    queued: FxHashSet<Constraint>,
}

impl<T: StateManager> CpModelImpl<T> {
    /// Creates an empty model on top of the given state manager
    pub fn new(mut state: T) -> Self {
        let n_propagators = state.new_int(0);
        let n_subscriptions = state.new_int(0);
        Self {
            domains: DomainStoreImpl::new(state),
            propagators: vec![],
            n_propagators,
            subscribers: FxHashMap::default(),
            subscriptions: vec![],
            n_subscriptions,
            agenda: VecDeque::new(),
            queued: FxHashSet::default(),
        }
    }

    fn count(&self, counter: TrailedInt) -> usize {
        self.domains.state_manager().int(counter) as usize
    }

    /// Increments the counter and returns its new value
    fn bump(&mut self, counter: TrailedInt) -> usize {
        let state = self.domains.state_manager_mut();
        let n = state.int(counter) + 1;
        state.set_int(counter, n);
        n as usize
    }

    /// Advises the subscribers of every pending event and schedules those
    /// asking for it. A propagator is never advised of its own changes.
    fn dispatch_events(&mut self) {
        let Self {
            domains,
            propagators,
            subscribers,
            agenda,
            queued,
            ..
        } = self;

        let mut audience = vec![];
        domains.for_each_event(|event| {
            audience.clear();
            for condition in DomainCondition::met_by(&event) {
                if let Some(subscribed) = subscribers.get(&condition) {
                    audience.extend_from_slice(subscribed);
                }
            }
            audience.sort_unstable();
            audience.dedup();

            for constraint in audience.iter().copied() {
                if event.cause != Some(constraint)
                    && propagators[constraint.0].advise(event)
                    && queued.insert(constraint)
                {
                    agenda.push_back(constraint);
                }
            }
        });
        domains.clear_events();
    }
}

impl<T: StateManager + Default> Default for CpModelImpl<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: StateManager> CpModel for CpModelImpl<T> {}

impl<T: StateManager> DomainStore for CpModelImpl<T> {
    fn new_int_var(&mut self, min: isize, max: isize) -> Variable {
        self.domains.new_int_var(min, max)
    }
    fn min(&self, var: Variable) -> Option<isize> {
        self.domains.min(var)
    }
    fn max(&self, var: Variable) -> Option<isize> {
        self.domains.max(var)
    }
    fn size(&self, var: Variable) -> usize {
        self.domains.size(var)
    }
    fn contains(&self, var: Variable, value: isize) -> bool {
        self.domains.contains(var, value)
    }
    fn next_value(&self, var: Variable, value: isize) -> Option<isize> {
        self.domains.next_value(var, value)
    }
    fn fix(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        self.domains.fix(var, value)
    }
    fn remove(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        self.domains.remove(var, value)
    }
    fn remove_below(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        self.domains.remove_below(var, value)
    }
    fn remove_above(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        self.domains.remove_above(var, value)
    }
    fn generation(&self) -> usize {
        self.domains.generation()
    }
}

impl<T: StateManager> SaveAndRestore for CpModelImpl<T> {
    fn save_state(&mut self) {
        self.domains.save_state()
    }

    fn restore_state(&mut self) {
        self.domains.restore_state();

        let live = self.count(self.n_subscriptions);
        for (condition, constraint) in self.subscriptions.drain(live..) {
            if let Some(subscribed) = self.subscribers.get_mut(&condition) {
                subscribed.retain(|c| *c != constraint);
                if subscribed.is_empty() {
                    self.subscribers.remove(&condition);
                }
            }
        }
        let live = self.count(self.n_propagators);
        self.propagators.truncate(live);

        self.agenda.clear();
        self.queued.clear();
    }
}

impl<T: StateManager> ConstraintStore for CpModelImpl<T> {
    fn domain_store(&mut self) -> &mut dyn DomainStore {
        &mut self.domains
    }

    fn install(&mut self, modeling_construct: &dyn ModelingConstruct) {
        modeling_construct.install(self)
    }

    fn post(&mut self, propagator: Box<dyn Propagator>) -> Constraint {
        self.propagators.push(propagator);
        let n = self.bump(self.n_propagators);
        Constraint(n - 1)
    }

    fn schedule(&mut self, constraint: Constraint) {
        if self.queued.insert(constraint) {
            self.agenda.push_back(constraint);
        }
    }

    fn propagate_on(&mut self, constraint: Constraint, cond: DomainCondition) {
        let subscribed = self.subscribers.entry(cond).or_default();
        if !subscribed.contains(&constraint) {
            subscribed.push(constraint);
            self.subscriptions.push((cond, constraint));
            self.bump(self.n_subscriptions);
        }
    }

    fn fixpoint(&mut self) -> CPResult<()> {
        loop {
            self.dispatch_events();
            let Some(constraint) = self.agenda.pop_front() else {
                return Ok(());
            };
            self.queued.remove(&constraint);

            self.domains.set_cause(Some(constraint));
            let outcome = self.propagators[constraint.0].propagate(&mut self.domains);
            self.domains.set_cause(None);

            match outcome {
                Ok(narrowing) => {
                    trace!("{constraint:?} narrowed {} variable(s)", narrowing.len());
                }
                Err(inconsistency) => {
                    debug!(
                        "{constraint:?} failed on {}: {inconsistency}",
                        inconsistency.variable()
                    );
                    self.agenda.clear();
                    self.queued.clear();
                    return Err(inconsistency);
                }
            }
        }
    }

    fn is_entailed(&self, constraint: Constraint) -> Entailment {
        self.propagators[constraint.0].is_entailed(&self.domains)
    }
}
