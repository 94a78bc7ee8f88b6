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

//! Variables and their domains. The domain store is the only place where a
//! domain changes: propagators narrow domains through the operations of the
//! `DomainStore` trait, and every change they make is recorded as an event
//! which the constraint store later dispatches.

use std::fmt;

use crate::{
    CPResult, Constraint, Inconsistency, SaveAndRestore, StateManager, TrailedInt,
    TrailedSet, TrailedStateManager,
};

/// Handle to an integer variable of a domain store
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(usize);

impl Variable {
    /// Index of the variable in its domain store
    pub fn id(self) -> usize {
        self.0
    }
}
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Read and narrow access to the domains of the variables. This is all a
/// propagator ever sees of the model.
///
/// Narrowing operations answer `Ok(true)` when the domain lost at least one
/// value, `Ok(false)` when it was left untouched and
/// `Err(Inconsistency::EmptyDomain { .. })` when it lost its last value.
pub trait DomainStore {
    /// Creates a variable whose domain is `min..=max`
    fn new_int_var(&mut self, min: isize, max: isize) -> Variable;
    /// Smallest value of the domain (None when empty)
    fn min(&self, var: Variable) -> Option<isize>;
    /// Largest value of the domain (None when empty)
    fn max(&self, var: Variable) -> Option<isize>;
    /// Number of values in the domain
    fn size(&self, var: Variable) -> usize;
    /// True iff `value` belongs to the domain of `var`
    fn contains(&self, var: Variable, value: isize) -> bool;
    /// Smallest value of the domain strictly greater than `value`
    fn next_value(&self, var: Variable, value: isize) -> Option<isize> {
        let (min, max) = (self.min(var)?, self.max(var)?);
        if value < min {
            Some(min)
        } else {
            (value + 1..=max).find(|v| self.contains(var, *v))
        }
    }
    /// True iff a single value is left
    fn is_fixed(&self, var: Variable) -> bool {
        self.size(var) == 1
    }
    /// Reduces the domain to `value`
    fn fix(&mut self, var: Variable, value: isize) -> CPResult<bool>;
    /// Removes `value` from the domain
    fn remove(&mut self, var: Variable, value: isize) -> CPResult<bool>;
    /// Removes every value `< value` from the domain
    fn remove_below(&mut self, var: Variable, value: isize) -> CPResult<bool>;
    /// Removes every value `> value` from the domain
    fn remove_above(&mut self, var: Variable, value: isize) -> CPResult<bool>;
    /// Number of restorations undergone by the store. A structure that is
    /// derived from the domains and updated incrementally is only valid for
    /// the generation it was built in: domains may grow back upon restore.
    fn generation(&self) -> usize;
}

/// Iterates over the values of the domain of `var` in increasing order.
pub fn domain_values(ds: &dyn DomainStore, var: Variable) -> impl Iterator<Item = isize> + '_ {
    let mut current = ds.min(var);
    std::iter::from_fn(move || {
        let value = current?;
        current = ds.next_value(var, value);
        Some(value)
    })
}

/// Summary of what happened to the domain of one variable since the events
/// were last collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainEvent {
    /// The variable whose domain changed
    pub variable: Variable,
    /// One value is left
    pub is_fixed: bool,
    /// No value is left (an inconsistency was reported along with it)
    pub is_empty: bool,
    /// The lower bound moved
    pub min_changed: bool,
    /// The upper bound moved
    pub max_changed: bool,
    /// At least one value was removed
    pub domain_changed: bool,
    /// The constraint whose propagator made the latest change, None when
    /// the change was made from outside of the fixpoint (e.g. by a search
    /// decision)
    pub cause: Option<Constraint>,
}
impl DomainEvent {
    fn new(variable: Variable) -> Self {
        Self {
            variable,
            is_fixed: false,
            is_empty: false,
            min_changed: false,
            max_changed: false,
            domain_changed: false,
            cause: None,
        }
    }
    fn happened(&self) -> bool {
        self.domain_changed || self.is_empty
    }
}

/// The side of the domain store that the constraint store talks to: it
/// hands out the pending events and tells which constraint the forthcoming
/// changes must be attributed to.
pub trait DomainBroker: SaveAndRestore {
    /// Drops all pending events
    fn clear_events(&mut self);
    /// Calls `f` once per variable having a pending event
    fn for_each_event<F: FnMut(DomainEvent)>(&self, f: F);
    /// Sets the cause of the forthcoming changes
    fn set_cause(&mut self, cause: Option<Constraint>);
}

/// The domain store used by default
pub type DefaultDomainStore = DomainStoreImpl<TrailedStateManager>;

/// A domain store keeping each domain as a reversible set of a state
/// manager, along with one pending event per variable.
pub struct DomainStoreImpl<T: StateManager> {
    state: T,
    /// Number of variables. It is reversible so that the variables created
    /// after a checkpoint vanish when that checkpoint is restored.
    n_vars: TrailedInt,
    domains: Vec<TrailedSet>,
    events: Vec<DomainEvent>,
    /// The constraint being propagated, if any
    cause: Option<Constraint>,
    generation: usize,
}

impl<T: StateManager> DomainStoreImpl<T> {
    /// Creates an empty store on top of the given state manager
    pub fn new(mut state: T) -> Self {
        let n_vars = state.new_int(0);
        Self {
            state,
            n_vars,
            domains: vec![],
            events: vec![],
            cause: None,
            generation: 0,
        }
    }
    /// The underlying state manager
    pub fn state_manager(&self) -> &T {
        &self.state
    }
    /// The underlying state manager, mutably
    pub fn state_manager_mut(&mut self) -> &mut T {
        &mut self.state
    }
    /// Folds a change of the domain of `var` into its pending event. The
    /// change is reported as an inconsistency when the domain became empty.
    fn notify(
        &mut self,
        var: Variable,
        value: isize,
        min_changed: bool,
        max_changed: bool,
    ) -> CPResult<bool> {
        let size = self.state.set_len(self.domains[var.0]);
        let event = &mut self.events[var.0];
        event.domain_changed = true;
        event.min_changed |= min_changed;
        event.max_changed |= max_changed;
        event.is_fixed |= size == 1;
        event.is_empty |= size == 0;
        event.cause = self.cause;

        if size == 0 {
            Err(Inconsistency::EmptyDomain {
                variable: var,
                value,
            })
        } else {
            Ok(true)
        }
    }
}

impl<T: StateManager + Default> Default for DomainStoreImpl<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: StateManager> DomainStore for DomainStoreImpl<T> {
    fn new_int_var(&mut self, min: isize, max: isize) -> Variable {
        debug_assert!(min <= max, "cannot create a variable with an empty domain");
        let n = self.state.int(self.n_vars);
        self.state.set_int(self.n_vars, n + 1);

        let variable = Variable(n as usize);
        self.domains.push(self.state.new_set(min, max));
        self.events.push(DomainEvent::new(variable));
        variable
    }

    fn min(&self, var: Variable) -> Option<isize> {
        self.state.set_min(self.domains[var.0])
    }

    fn max(&self, var: Variable) -> Option<isize> {
        self.state.set_max(self.domains[var.0])
    }

    fn size(&self, var: Variable) -> usize {
        self.state.set_len(self.domains[var.0])
    }

    fn contains(&self, var: Variable, value: isize) -> bool {
        self.state.set_contains(self.domains[var.0], value)
    }

    fn next_value(&self, var: Variable, value: isize) -> Option<isize> {
        self.state.set_next(self.domains[var.0], value)
    }

    fn fix(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        let dom = self.domains[var.0];
        if !self.state.set_contains(dom, value) {
            self.state.set_clear(dom);
            return self.notify(var, value, true, true);
        }
        if self.state.set_len(dom) == 1 {
            return Ok(false);
        }
        let min_changed = self.state.set_min(dom) != Some(value);
        let max_changed = self.state.set_max(dom) != Some(value);
        self.state.set_keep_only(dom, value);
        self.notify(var, value, min_changed, max_changed)
    }

    fn remove(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        let dom = self.domains[var.0];
        if !self.state.set_contains(dom, value) {
            return Ok(false);
        }
        let min_changed = self.state.set_min(dom) == Some(value);
        let max_changed = self.state.set_max(dom) == Some(value);
        self.state.set_remove(dom, value);
        self.notify(var, value, min_changed, max_changed)
    }

    fn remove_below(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        let dom = self.domains[var.0];
        match self.state.set_min(dom) {
            Some(min) if min < value => {
                self.state.set_remove_below(dom, value);
                self.notify(var, value, true, false)
            }
            _ => Ok(false),
        }
    }

    fn remove_above(&mut self, var: Variable, value: isize) -> CPResult<bool> {
        let dom = self.domains[var.0];
        match self.state.set_max(dom) {
            Some(max) if max > value => {
                self.state.set_remove_above(dom, value);
                self.notify(var, value, false, true)
            }
            _ => Ok(false),
        }
    }

    fn generation(&self) -> usize {
        self.generation
    }
}

impl<T: StateManager> SaveAndRestore for DomainStoreImpl<T> {
    fn save_state(&mut self) {
        self.state.save_state()
    }

    fn restore_state(&mut self) {
        self.state.restore_state();
        let n = self.state.int(self.n_vars) as usize;
        self.domains.truncate(n);
        self.events.truncate(n);
        self.clear_events();
        self.generation += 1;
    }
}

impl<T: StateManager> DomainBroker for DomainStoreImpl<T> {
    fn clear_events(&mut self) {
        for event in self.events.iter_mut() {
            *event = DomainEvent::new(event.variable);
        }
    }

    fn for_each_event<F: FnMut(DomainEvent)>(&self, f: F) {
        self.events
            .iter()
            .filter(|e| e.happened())
            .copied()
            .for_each(f);
    }

    fn set_cause(&mut self, cause: Option<Constraint>) {
        self.cause = cause;
    }
}

#[cfg(test)]
mod test_domain_store {
    use crate::{
        domain_values, Constraint, DefaultDomainStore, DomainBroker, DomainEvent, DomainStore,
        Inconsistency, SaveAndRestore,
    };

    #[test]
    fn min_and_max_yield_the_bounds_of_domain() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);
        let y = ds.new_int_var(-3, 5);

        assert_eq!(Some(5), ds.min(x));
        assert_eq!(Some(10), ds.max(x));
        assert_eq!(Some(-3), ds.min(y));
        assert_eq!(Some(5), ds.max(y));
    }
    #[test]
    fn bounds_follow_the_updates() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(Ok(true), ds.remove_below(x, 7));
        assert_eq!(Ok(true), ds.remove_above(x, 9));
        assert_eq!(Some(7), ds.min(x));
        assert_eq!(Some(9), ds.max(x));
        assert_eq!(3, ds.size(x));
    }
    #[test]
    fn bounds_are_none_when_domain_is_empty() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(
            Err(Inconsistency::EmptyDomain {
                variable: x,
                value: 20
            }),
            ds.remove_below(x, 20)
        );
        assert_eq!(None, ds.min(x));
        assert_eq!(None, ds.max(x));
    }
    #[test]
    fn remove_above_fails_when_it_makes_domain_empty() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert!(ds.remove_above(x, 4).is_err());
        assert_eq!(0, ds.size(x));
    }
    #[test]
    fn narrowing_is_a_no_op_when_nothing_changes() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(Ok(false), ds.remove(x, -10));
        assert_eq!(Ok(false), ds.remove_below(x, 5));
        assert_eq!(Ok(false), ds.remove_above(x, 10));
        assert_eq!(Ok(true), ds.fix(x, 7));
        assert_eq!(Ok(false), ds.fix(x, 7));
        assert_eq!(1, ds.size(x));
    }
    #[test]
    fn removed_values_are_not_contained() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(Ok(true), ds.remove(x, 7));
        assert!(!ds.contains(x, 7));
        assert!(ds.contains(x, 6));
        assert!(!ds.contains(x, 4));
        assert!(!ds.contains(x, 11));
    }
    #[test]
    fn next_value_and_iteration_skip_the_holes() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(0, 6);

        assert_eq!(Ok(true), ds.remove(x, 1));
        assert_eq!(Ok(true), ds.remove(x, 4));
        assert_eq!(Ok(true), ds.remove(x, 6));

        assert_eq!(Some(2), ds.next_value(x, 0));
        assert_eq!(Some(5), ds.next_value(x, 3));
        assert_eq!(None, ds.next_value(x, 5));
        assert_eq!(vec![0, 2, 3, 5], domain_values(&ds, x).collect::<Vec<_>>());
    }
    #[test]
    fn fixing_to_a_removed_value_fails() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(Ok(true), ds.remove(x, 7));
        assert_eq!(
            Err(Inconsistency::EmptyDomain {
                variable: x,
                value: 7
            }),
            ds.fix(x, 7)
        );
    }
    #[test]
    fn remove_fails_when_it_makes_domain_empty() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 6);

        assert_eq!(Ok(true), ds.remove(x, 5));
        assert!(ds.is_fixed(x));
        assert!(ds.remove(x, 6).is_err());
    }
    #[test]
    fn fix_sets_events() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);
        let y = ds.new_int_var(0, 5);

        ds.set_cause(Some(Constraint::from(3)));
        assert_eq!(Ok(true), ds.fix(x, 7));
        ds.set_cause(None);
        assert_eq!(Ok(true), ds.fix(y, 0));

        let mut events = vec![];
        ds.for_each_event(|e| events.push(e));
        assert_eq!(
            events,
            vec![
                DomainEvent {
                    variable: x,
                    is_fixed: true,
                    is_empty: false,
                    min_changed: true,
                    max_changed: true,
                    domain_changed: true,
                    cause: Some(Constraint::from(3)),
                },
                DomainEvent {
                    variable: y,
                    is_fixed: true,
                    is_empty: false,
                    min_changed: false,
                    max_changed: true,
                    domain_changed: true,
                    cause: None,
                }
            ]
        );

        ds.clear_events();
        let mut count = 0;
        ds.for_each_event(|_| count += 1);
        assert_eq!(0, count);
    }
    #[test]
    fn remove_in_the_middle_only_flags_a_domain_change() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(5, 10);

        assert_eq!(Ok(true), ds.remove(x, 7));
        let mut events = vec![];
        ds.for_each_event(|e| events.push(e));
        assert_eq!(1, events.len());
        assert!(events[0].domain_changed);
        assert!(!events[0].min_changed);
        assert!(!events[0].max_changed);
        assert!(!events[0].is_fixed);
    }
    #[test]
    fn restoration_brings_values_back_and_bumps_the_generation() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(0, 3);
        assert_eq!(0, ds.generation());

        ds.save_state();
        assert_eq!(Ok(true), ds.remove(x, 2));
        assert_eq!(Ok(true), ds.remove_above(x, 0));
        assert_eq!(1, ds.size(x));
        assert_eq!(0, ds.generation());

        ds.restore_state();
        assert_eq!(4, ds.size(x));
        assert!(ds.contains(x, 2));
        assert_eq!(1, ds.generation());
    }
}
