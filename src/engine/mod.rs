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

//! The engine comprises the domain store (variables and their domains), the
//! propagator contract and the constraint store which runs the fixpoint.

mod domain;
mod error;
mod model;
mod propagation;

pub use domain::*;
pub use error::*;
pub use model::*;
pub use propagation::*;
