// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Iterative vertex-position solvers.
//!
//! Every solver runs the same loop. One iteration computes a displacement for
//! each vertex from all of its active objectives, applies all displacements at
//! once, and refreshes the derived attributes. Before each iteration the
//! residual is measured and the run stops when it is within tolerance, when
//! the step limit is reached, or when cancellation is requested.
//!
//! A step that would raise the residual is retried at half length a few
//! times. When no shorter step helps, a monotone objective stays where it is
//! and the others take the full step.

mod guard;
mod perp;
mod planarize;
mod soft;

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::keys::VertexId;

/// Tries of a step at decreasing length before giving up on shortening it.
const MAX_HALVINGS: u32 = 8;

/// Where a relaxation run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxStatus {
    Running,
    /// Residual within tolerance.
    Converged,
    /// Ran out of iterations. A normal outcome, not an error.
    StepLimitReached,
    Cancelled,
}

impl RelaxStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RelaxStatus::Running)
    }
}

/// Outcome of one solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxReport {
    pub status: RelaxStatus,
    /// Completed iterations.
    pub iterations: usize,
    /// Residual of the returned foam.
    pub max_deviation: f64,
    /// Residual before the first iteration, then after each one.
    pub history: Vec<f64>,
}

/// A cancellation flag polled once per iteration.
pub trait CancelSignal {
    fn cancel_requested(&self) -> bool;
}

impl CancelSignal for AtomicBool {
    fn cancel_requested(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F: Fn() -> bool> CancelSignal for F {
    fn cancel_requested(&self) -> bool {
        self()
    }
}

/// A signal that is never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn cancel_requested(&self) -> bool {
        false
    }
}

/// Per-vertex displacements for one iteration.
pub(crate) type Moves = FxHashMap<VertexId, Vector3<f64>>;

/// The objectives of one solver.
pub(crate) trait Objective {
    fn name(&self) -> &'static str;

    /// Current residual. May refresh derived attributes.
    fn residual(&self, foam: &mut Foam) -> Result<f64>;

    /// Tentative displacements for the next iteration.
    fn moves(&self, foam: &Foam) -> Result<Moves>;

    /// Drops displacements that would break a hard constraint.
    fn guard(&self, _foam: &Foam, _moves: &mut Moves) {}

    /// The residual must never rise from one iteration to the next.
    fn monotone(&self) -> bool {
        false
    }
}

/// Influence-weighted average of displacement terms per vertex.
#[derive(Debug, Default)]
pub(crate) struct Blend {
    terms: FxHashMap<VertexId, (Vector3<f64>, f64)>,
}

impl Blend {
    pub(crate) fn add(&mut self, vertex: VertexId, displacement: Vector3<f64>, weight: f64) {
        if !(weight > 0.0) {
            return;
        }
        let entry = self.terms.entry(vertex).or_insert((Vector3::zeros(), 0.0));
        entry.0 += displacement * weight;
        entry.1 += weight;
    }

    pub(crate) fn finish(self) -> Moves {
        self.terms
            .into_iter()
            .filter(|(_, (_, w))| *w > 0.0)
            .map(|(v, (sum, w))| (v, sum / w))
            .collect()
    }
}

/// Runs `objective` until it converges, runs out of steps or is cancelled.
pub(crate) fn drive<O, C>(
    foam: &mut Foam,
    objective: &O,
    max_steps: usize,
    tolerance: f64,
    cancel: &C,
) -> Result<RelaxReport>
where
    O: Objective,
    C: CancelSignal + ?Sized,
{
    let name = objective.name();
    foam.update_derived();
    let mut deviation = objective.residual(foam)?;
    if !deviation.is_finite() {
        return Err(Error::NonFinite(format!("{name} residual")));
    }
    let mut history = vec![deviation];
    let mut iterations = 0;

    let status = loop {
        foam.max_deviation = deviation;
        if deviation <= tolerance {
            break RelaxStatus::Converged;
        }
        if iterations >= max_steps {
            break RelaxStatus::StepLimitReached;
        }
        if cancel.cancel_requested() {
            break RelaxStatus::Cancelled;
        }

        deviation = iterate(foam, objective, deviation)?;
        iterations += 1;
        history.push(deviation);
        tracing::trace!(
            foam = %foam.id,
            solver = name,
            iteration = iterations,
            deviation,
            "Relaxation step"
        );
    };

    tracing::info!(
        foam = %foam.id,
        solver = name,
        status = ?status,
        iterations,
        deviation,
        "Relaxation finished"
    );

    Ok(RelaxReport {
        status,
        iterations,
        max_deviation: deviation,
        history,
    })
}

/// One iteration with step halving. Returns the new residual.
fn iterate<O: Objective>(foam: &mut Foam, objective: &O, current: f64) -> Result<f64> {
    let moves = objective.moves(foam)?;
    if moves.values().any(|d| d.iter().any(|c| !c.is_finite())) {
        return Err(Error::NonFinite(format!("{} displacement", objective.name())));
    }
    if moves.is_empty() {
        return Ok(current);
    }

    let saved: Vec<(VertexId, Point3<f64>)> = moves
        .keys()
        .filter_map(|&v| foam.position(v).map(|p| (v, p)))
        .collect();

    let mut scale = 1.0;
    for _ in 0..MAX_HALVINGS {
        let mut trial: Moves = moves.iter().map(|(&v, d)| (v, d * scale)).collect();
        objective.guard(foam, &mut trial);
        if trial.is_empty() {
            break;
        }

        apply(foam, &trial);
        let residual = objective.residual(foam)?;
        if residual.is_finite() && residual <= current {
            return Ok(residual);
        }
        restore(foam, &saved);
        scale *= 0.5;
    }

    if objective.monotone() {
        foam.update_derived();
        return Ok(current);
    }

    let mut full = moves;
    objective.guard(foam, &mut full);
    apply(foam, &full);
    let residual = objective.residual(foam)?;
    if !residual.is_finite() {
        return Err(Error::NonFinite(format!("{} residual", objective.name())));
    }
    Ok(residual)
}

fn apply(foam: &mut Foam, moves: &Moves) {
    for (&v, d) in moves {
        if let Some(vertex) = foam.vertex_mut(v) {
            vertex.position += *d;
        }
    }
    foam.update_derived();
}

fn restore(foam: &mut Foam, saved: &[(VertexId, Point3<f64>)]) {
    for &(v, p) in saved {
        if let Some(vertex) = foam.vertex_mut(v) {
            vertex.position = p;
        }
    }
}
