// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solver and assembler tolerances.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_MAX_DEVIATION: f64 = 1e-6;
/// Radians.
pub const DEFAULT_MAX_DEVIATION_ANGLE: f64 = 1e-4;
pub const DEFAULT_POINT_COLLAPSE_LIMIT: f64 = 1e-3;

/// Tolerances shared by the assembler and the relaxation solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration limit for one solver run.
    pub max_steps: usize,
    /// Convergence threshold for the planarity solvers, in model units.
    pub max_deviation: f64,
    /// Convergence threshold for the perpendicularity solver, in radians.
    pub max_deviation_angle: f64,
    /// Input positions closer than this are merged into one vertex.
    pub point_collapse_limit: f64,
    /// Default planarity tolerance for assembler input faces. `None` accepts
    /// any face that has a plane.
    pub planarity_tolerance: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_deviation: DEFAULT_MAX_DEVIATION,
            max_deviation_angle: DEFAULT_MAX_DEVIATION_ANGLE,
            point_collapse_limit: DEFAULT_POINT_COLLAPSE_LIMIT,
            planarity_tolerance: None,
        }
    }
}

impl SolverConfig {
    /// Loads configuration from `FOAM_*` environment variables, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_steps: lookup("FOAM_MAX_STEPS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_steps),
            max_deviation: lookup("FOAM_MAX_DEVIATION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_deviation),
            max_deviation_angle: lookup("FOAM_MAX_DEVIATION_ANGLE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_deviation_angle),
            point_collapse_limit: lookup("FOAM_POINT_COLLAPSE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.point_collapse_limit),
            planarity_tolerance: lookup("FOAM_PLANARITY_TOLERANCE")
                .and_then(|v| v.parse().ok())
                .or(defaults.planarity_tolerance),
        }
    }
}
