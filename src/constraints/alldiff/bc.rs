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

//! This module provides the bounds consistent filtering of the all different
//! constraint. The algorithm is the one described in "A fast and simple
//! algorithm for bounds consistency of the alldifferent constraint" by
//! A. Lopez-Ortiz, C.-G. Quimper, J. Tromp and P. van Beek (IJCAI-03).
//!
//! Only the bounds of the variables are considered: the holes in the domains
//! are ignored. The variables are sorted by lower and upper bounds, these
//! bounds are merged into a compressed list of critical points, and two
//! symmetric sweeps over these points (using a union-find like structure with
//! path compression) detect the Hall intervals and push the bounds of the
//! variables out of them. Both sweeps are repeated until no bound changes.

use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    CPResult, DomainEvent, DomainStore, Entailment, Inconsistency, Narrowing, Propagator,
    Variable,
};

use super::fc::forward_check;
use super::{entailment, write_scope};

/// The bounds of one variable along with their ranks among the critical
/// points
#[derive(Debug, Clone, Copy)]
struct Interval {
    /// The variable
    var: Variable,
    /// Its lower bound
    lb: isize,
    /// Its upper bound
    ub: isize,
    /// The rank of `lb` in the critical points
    minrank: usize,
    /// The rank of `ub + 1` in the critical points
    maxrank: usize,
}

/// The bounds consistent propagator
#[derive(Debug, Clone)]
pub struct BcPropagator {
    /// The variables that must all be different
    variables: Vec<Variable>,
    /// The position of each variable in the scope
    position: FxHashMap<Variable, usize>,
    /// The variables which have been fixed since the last propagation
    pending: Vec<usize>,
    /// The generation of the domain store as of the last propagation
    generation: Option<usize>,

    /// One interval per variable (same order as `variables`)
    intervals: Vec<Interval>,
    /// Positions in `intervals`, by increasing lower bound
    minsorted: Vec<usize>,
    /// Positions in `intervals`, by increasing upper bound
    maxsorted: Vec<usize>,
    /// The critical points (with a sentinel at both ends)
    bounds: Vec<isize>,
    /// The number of critical points
    nb: usize,
    /// Tree links
    t: Vec<usize>,
    /// Differences between critical capacities
    d: Vec<isize>,
    /// Hall interval links
    h: Vec<usize>,
}

impl BcPropagator {
    /// Creates a new bounds consistent propagator
    pub fn new(variables: &[Variable]) -> Self {
        let n = variables.len();
        let intervals = variables
            .iter()
            .copied()
            .map(|var| Interval {
                var,
                lb: 0,
                ub: 0,
                minrank: 0,
                maxrank: 0,
            })
            .collect();

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
            intervals,
            minsorted: (0..n).collect(),
            maxsorted: (0..n).collect(),
            bounds: vec![0; 2 * n + 2],
            nb: 0,
            t: vec![0; 2 * n + 2],
            d: vec![0; 2 * n + 2],
            h: vec![0; 2 * n + 2],
        }
    }

    /// Runs both sweeps until none of them changes any bound
    fn filter(&mut self, ds: &mut dyn DomainStore, narrowing: &mut Narrowing) -> CPResult<()> {
        loop {
            self.sort_it(ds);
            let lower = self.filter_lower(ds, narrowing)?;
            let upper = self.filter_upper(ds, narrowing)?;
            if !lower && !upper {
                return Ok(());
            }
        }
    }

    /// Refreshes the intervals, sorts them and computes the critical points
    fn sort_it(&mut self, ds: &dyn DomainStore) {
        let Self {
            intervals,
            minsorted,
            maxsorted,
            bounds,
            ..
        } = self;
        let n = intervals.len();

        for iv in intervals.iter_mut() {
            iv.lb = ds.min(iv.var).unwrap_or(iv.lb);
            iv.ub = ds.max(iv.var).unwrap_or(iv.ub);
        }
        // the previous orders are nearly sorted already
        minsorted.sort_by_key(|i| intervals[*i].lb);
        maxsorted.sort_by_key(|i| intervals[*i].ub);

        let mut min = intervals[minsorted[0]].lb;
        let mut max = intervals[maxsorted[0]].ub + 1;
        let mut last = min - 2;
        let mut nb = 0;
        bounds[0] = last;

        let (mut i, mut j) = (0, 0);
        loop {
            if i < n && min <= max {
                if min != last {
                    nb += 1;
                    bounds[nb] = min;
                    last = min;
                }
                intervals[minsorted[i]].minrank = nb;
                i += 1;
                if i < n {
                    min = intervals[minsorted[i]].lb;
                }
            } else {
                if max != last {
                    nb += 1;
                    bounds[nb] = max;
                    last = max;
                }
                intervals[maxsorted[j]].maxrank = nb;
                j += 1;
                if j == n {
                    break;
                }
                max = intervals[maxsorted[j]].ub + 1;
            }
        }

        self.nb = nb;
        self.bounds[nb + 1] = self.bounds[nb] + 2;
    }

    /// Sweeps the variables by increasing upper bound and raises the lower
    /// bounds that fall in a Hall interval. Returns true iff a bound changed.
    fn filter_lower(
        &mut self,
        ds: &mut dyn DomainStore,
        narrowing: &mut Narrowing,
    ) -> CPResult<bool> {
        let Self {
            intervals,
            maxsorted,
            bounds,
            nb,
            t,
            d,
            h,
            pending,
            ..
        } = self;
        let mut filter = false;

        for i in 1..=*nb + 1 {
            t[i] = i - 1;
            h[i] = i - 1;
            d[i] = bounds[i] - bounds[i - 1];
        }

        for k in maxsorted.iter().copied() {
            let x = intervals[k].minrank;
            let y = intervals[k].maxrank;
            let mut z = pathmax(t, x + 1);
            let j = t[z];

            d[z] -= 1;
            if d[z] == 0 {
                t[z] = z + 1;
                z = pathmax(t, t[z]);
                t[z] = j;
            }

            pathset(t, x + 1, z, z);

            if d[z] < bounds[z] - bounds[y] {
                return Err(hall_violation(&intervals[k]));
            }

            if h[x] > x {
                let w = pathmax(h, h[x]);
                let var = intervals[k].var;
                if narrowing.track(var, ds.remove_below(var, bounds[w])?) {
                    filter = true;
                    intervals[k].lb = ds.min(var).unwrap_or(bounds[w]);
                    if ds.is_fixed(var) {
                        pending.push(k);
                    }
                }
                pathset(h, x, w, w);
            }

            if d[z] == bounds[z] - bounds[y] {
                let hy = h[y];
                pathset(h, hy, j - 1, y);
                h[y] = j - 1;
            }
        }
        Ok(filter)
    }

    /// Sweeps the variables by decreasing lower bound and lowers the upper
    /// bounds that fall in a Hall interval. Returns true iff a bound changed.
    fn filter_upper(
        &mut self,
        ds: &mut dyn DomainStore,
        narrowing: &mut Narrowing,
    ) -> CPResult<bool> {
        let Self {
            intervals,
            minsorted,
            bounds,
            nb,
            t,
            d,
            h,
            pending,
            ..
        } = self;
        let mut filter = false;

        for i in 0..=*nb {
            t[i] = i + 1;
            h[i] = i + 1;
            d[i] = bounds[i + 1] - bounds[i];
        }

        for k in minsorted.iter().rev().copied() {
            let x = intervals[k].maxrank;
            let y = intervals[k].minrank;
            let mut z = pathmin(t, x - 1);
            let j = t[z];

            d[z] -= 1;
            if d[z] == 0 {
                t[z] = z - 1;
                z = pathmin(t, t[z]);
                t[z] = j;
            }

            pathset(t, x - 1, z, z);

            if d[z] < bounds[y] - bounds[z] {
                return Err(hall_violation(&intervals[k]));
            }

            if h[x] < x {
                let w = pathmin(h, h[x]);
                let var = intervals[k].var;
                if narrowing.track(var, ds.remove_above(var, bounds[w] - 1)?) {
                    filter = true;
                    intervals[k].ub = ds.max(var).unwrap_or(bounds[w] - 1);
                    if ds.is_fixed(var) {
                        pending.push(k);
                    }
                }
                pathset(h, x, w, w);
            }

            if d[z] == bounds[y] - bounds[z] {
                let hy = h[y];
                pathset(h, hy, j + 1, y);
                h[y] = j + 1;
            }
        }
        Ok(filter)
    }
}

/// Builds the error reported when more variables than values are confined
/// in some interval. The error carries the bounds of the variable which
/// overloaded that interval.
fn hall_violation(iv: &Interval) -> Inconsistency {
    debug!("{} in [{}, {}] overloads a hall interval", iv.var, iv.lb, iv.ub);
    Inconsistency::HallViolation {
        variable: iv.var,
        low: iv.lb,
        high: iv.ub,
    }
}

/// Makes all links on the path from `start` to `end` point to `to`
fn pathset(tab: &mut [usize], start: usize, end: usize, to: usize) {
    let mut prev = start;
    while prev != end {
        let next = tab[prev];
        tab[prev] = to;
        prev = next;
    }
}
/// Follows the decreasing links from `i`
fn pathmin(tab: &[usize], mut i: usize) -> usize {
    while tab[i] < i {
        i = tab[i];
    }
    i
}
/// Follows the increasing links from `i`
fn pathmax(tab: &[usize], mut i: usize) -> usize {
    while tab[i] > i {
        i = tab[i];
    }
    i
}

impl Propagator for BcPropagator {
    fn advise(&mut self, event: DomainEvent) -> bool {
        match self.position.get(&event.variable) {
            Some(&i) => {
                if event.is_fixed {
                    self.pending.push(i);
                }
                event.is_fixed || event.min_changed || event.max_changed
            }
            None => false,
        }
    }

    fn propagate(&mut self, ds: &mut dyn DomainStore) -> CPResult<Narrowing> {
        let mut narrowing = Narrowing::default();
        if self.variables.is_empty() {
            return Ok(narrowing);
        }
        if self.generation != Some(ds.generation()) {
            self.generation = Some(ds.generation());
            self.pending.clear();
            self.pending
                .extend((0..self.variables.len()).filter(|i| ds.is_fixed(self.variables[*i])));
        }

        loop {
            forward_check(&self.variables, &mut self.pending, ds, &mut narrowing)?;
            self.filter(ds, &mut narrowing)?;
            if self.pending.is_empty() {
                return Ok(narrowing);
            }
        }
    }

    fn is_entailed(&self, ds: &dyn DomainStore) -> Entailment {
        entailment(&self.variables, ds)
    }
}

impl fmt::Display for BcPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scope(f, "AllDiffBC", &self.variables)
    }
}

#[cfg(test)]
mod test_bc {
    use test_log::test;

    use crate::testing::ivar;
    use crate::{DefaultDomainStore, DomainStore, Inconsistency, Propagator};

    use super::BcPropagator;

    #[test]
    fn more_variables_than_values_is_a_hall_violation() {
        let mut ds = DefaultDomainStore::default();
        let vars = (0..4).map(|_| ds.new_int_var(0, 2)).collect::<Vec<_>>();
        let mut bc = BcPropagator::new(&vars);

        assert!(matches!(
            bc.propagate(&mut ds),
            Err(Inconsistency::HallViolation { low: 0, high: 2, .. })
        ));
    }

    #[test]
    fn a_hall_violation_reports_the_bounds_of_the_blamed_variable() {
        let mut ds = DefaultDomainStore::default();
        let vars = (0..4).map(|_| ds.new_int_var(0, 2)).collect::<Vec<_>>();
        let mut bc = BcPropagator::new(&vars);

        let message = match bc.propagate(&mut ds) {
            Err(inconsistency) => inconsistency.to_string(),
            Ok(_) => panic!("four variables cannot fit in three values"),
        };
        assert!(message.ends_with("in [0, 2] overloads a hall interval"), "{message}");
    }

    #[test]
    fn bounds_outside_of_hall_intervals_are_left_alone() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(0, 3);
        let y = ds.new_int_var(0, 3);
        let z = ds.new_int_var(2, 3);
        let mut bc = BcPropagator::new(&[x, y, z]);

        let narrowing = bc.propagate(&mut ds).unwrap();
        assert!(narrowing.is_empty());
        assert_eq!((Some(0), Some(3)), (ds.min(x), ds.max(x)));
        assert_eq!((Some(0), Some(3)), (ds.min(y), ds.max(y)));
        assert_eq!((Some(2), Some(3)), (ds.min(z), ds.max(z)));
    }

    #[test]
    fn lower_bounds_are_pushed_above_a_hall_interval() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(1, 2);
        let y = ds.new_int_var(1, 2);
        let z = ds.new_int_var(1, 4);
        let mut bc = BcPropagator::new(&[x, y, z]);

        let narrowing = bc.propagate(&mut ds).unwrap();
        assert!(narrowing.contains(z));
        assert_eq!(Some(3), ds.min(z));
        assert_eq!(Some(4), ds.max(z));
        assert_eq!(2, ds.size(x));
    }

    #[test]
    fn upper_bounds_are_pushed_below_a_hall_interval() {
        let mut ds = DefaultDomainStore::default();
        let x = ds.new_int_var(3, 4);
        let y = ds.new_int_var(3, 4);
        let z = ds.new_int_var(0, 4);
        let mut bc = BcPropagator::new(&[x, y, z]);

        bc.propagate(&mut ds).unwrap();
        assert_eq!(Some(0), ds.min(z));
        assert_eq!(Some(2), ds.max(z));
    }

    #[test]
    fn holes_are_ignored() {
        let mut ds = DefaultDomainStore::default();
        // x and y form the Hall set {1, 3} but bounds consistency does not see it
        let x = ivar(&mut ds, &[1, 3]);
        let y = ivar(&mut ds, &[1, 3]);
        let z = ivar(&mut ds, &[1, 2, 3]);
        let mut bc = BcPropagator::new(&[x, y, z]);

        bc.propagate(&mut ds).unwrap();
        assert_eq!(3, ds.size(z));
    }

    #[test]
    fn fixed_values_are_removed_before_the_sweep() {
        let mut ds = DefaultDomainStore::default();
        let x = ivar(&mut ds, &[2]);
        let y = ivar(&mut ds, &[1, 2, 3]);
        let z = ivar(&mut ds, &[1, 2, 3]);
        let mut bc = BcPropagator::new(&[x, y, z]);

        bc.propagate(&mut ds).unwrap();
        assert_eq!(2, ds.size(y));
        assert_eq!(2, ds.size(z));
    }

    #[test]
    fn bounds_fixing_a_variable_cascade() {
        let mut ds = DefaultDomainStore::default();
        // {x, y} is a Hall interval over [1, 2], which fixes z to 3 and
        // then w (which has a hole at 4) to 5
        let x = ds.new_int_var(1, 2);
        let y = ds.new_int_var(1, 2);
        let z = ds.new_int_var(1, 3);
        let w = ivar(&mut ds, &[3, 5]);
        let mut bc = BcPropagator::new(&[x, y, z, w]);

        bc.propagate(&mut ds).unwrap();
        assert_eq!((Some(3), Some(3)), (ds.min(z), ds.max(z)));
        assert_eq!((Some(5), Some(5)), (ds.min(w), ds.max(w)));
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut ds = DefaultDomainStore::default();
        let vars = vec![
            ds.new_int_var(1, 2),
            ds.new_int_var(1, 3),
            ds.new_int_var(2, 3),
            ds.new_int_var(1, 6),
        ];
        let mut bc = BcPropagator::new(&vars);

        let first = bc.propagate(&mut ds).unwrap();
        assert!(first.contains(vars[3]));
        assert_eq!(Some(4), ds.min(vars[3]));
        let second = bc.propagate(&mut ds).unwrap();
        assert!(second.is_empty());
    }
}
