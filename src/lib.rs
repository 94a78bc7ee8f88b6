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

//! This crate provides the propagation core of the all different constraint
//! for a small constraint programming engine. Besides the engine itself
//! (trailed state, domain store and constraint store with a fixpoint loop)
//! it offers three filtering algorithms for the constraint:
//!
//! * arc consistency, based on a maximum matching in the variable/value
//!   graph and on its strongly connected components;
//! * bounds consistency, based on the detection of Hall intervals;
//! * forward checking, which merely removes the values of fixed variables.

mod constraints;
mod engine;
mod state;

pub use constraints::*;
pub use engine::*;
pub use state::*;

#[cfg(test)]
mod testing;
