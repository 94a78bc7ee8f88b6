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

//! The level of consistency enforced by an all different constraint

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Selects the filtering algorithm(s) posted for an all different
/// constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AllDiffConsistency {
    /// Arc consistency (matching + strongly connected components)
    Ac,
    /// Bounds consistency (Hall intervals)
    Bc,
    /// Forward checking: the value of a fixed variable is removed from the
    /// domain of all other variables
    Fc,
    /// Forward checking and bounds consistency together
    #[default]
    Default,
}

/// The error returned when parsing an unknown consistency level
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown alldifferent consistency '{0}' (expected one of AC, BC, FC, NEQS, DEFAULT)")]
pub struct UnknownConsistency(pub String);

impl FromStr for AllDiffConsistency {
    type Err = UnknownConsistency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AC" => Ok(Self::Ac),
            "BC" => Ok(Self::Bc),
            "FC" | "NEQS" => Ok(Self::Fc),
            "DEFAULT" => Ok(Self::Default),
            _ => Err(UnknownConsistency(s.to_string())),
        }
    }
}

impl fmt::Display for AllDiffConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ac => "AC",
            Self::Bc => "BC",
            Self::Fc => "FC",
            Self::Default => "DEFAULT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test_consistency {
    use super::{AllDiffConsistency, UnknownConsistency};

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(Ok(AllDiffConsistency::Ac), "ac".parse());
        assert_eq!(Ok(AllDiffConsistency::Bc), " BC ".parse());
        assert_eq!(Ok(AllDiffConsistency::Fc), "Fc".parse());
        assert_eq!(Ok(AllDiffConsistency::Default), "default".parse());
    }

    #[test]
    fn neqs_is_forward_checking() {
        assert_eq!(Ok(AllDiffConsistency::Fc), "NEQS".parse());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            Err(UnknownConsistency("GAC".to_string())),
            "GAC".parse::<AllDiffConsistency>()
        );
    }
}
