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

//! This module defines the kind of errors that get raised whenever the
//! propagation hits a dead end. All of them are contradictions: they are
//! fatal to the current search node only, and it is up to the search driver
//! to backtrack when it receives one.

use crate::Variable;

/// This is the kind of error that gets raised whenever a propagator fails.
/// Each variant carries the variable (and value or interval when that makes
/// sense) which is to blame for the failure.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq, Hash)]
pub enum Inconsistency {
    /// A narrowing operation has wiped out the domain of a variable
    #[error("inconsistency: the domain of {variable} became empty (on {value})")]
    EmptyDomain {
        /// The variable whose domain became empty
        variable: Variable,
        /// The value (or bound) whose removal emptied the domain
        value: isize,
    },
    /// No matching of the variables onto distinct values covers all the
    /// variables of an all different constraint
    #[error("inconsistency: no perfect matching, {variable} cannot be matched")]
    NoPerfectMatching {
        /// The free variable for which no augmenting path exists
        variable: Variable,
    },
    /// More variables are confined to an interval than it has values
    #[error("inconsistency: {variable} in [{low}, {high}] overloads a hall interval")]
    HallViolation {
        /// The variable that overloaded the interval
        variable: Variable,
        /// Lower bound of that variable when the overload was detected
        low: isize,
        /// Upper bound of that variable when the overload was detected
        high: isize,
    },
}

impl Inconsistency {
    /// Returns the variable which is to blame for this contradiction
    pub fn variable(&self) -> Variable {
        match *self {
            Inconsistency::EmptyDomain { variable, .. } => variable,
            Inconsistency::NoPerfectMatching { variable } => variable,
            Inconsistency::HallViolation { variable, .. } => variable,
        }
    }
}

/// The result of a propagation operation. (Note: all propagation opertations
/// can fail, in which case they raise an Inconsistency error)
pub type CPResult<T> = Result<T, Inconsistency>;
