// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain planarization: every face pulls its vertices onto its plane.

use super::{drive, Blend, CancelSignal, Moves, Objective, RelaxReport};
use crate::error::Result;
use crate::foam::Foam;
use crate::geometry::fit_plane;

struct Planarize;

impl Objective for Planarize {
    fn name(&self) -> &'static str {
        "planarize"
    }

    fn residual(&self, foam: &mut Foam) -> Result<f64> {
        Ok(foam.measure_planarity())
    }

    fn monotone(&self) -> bool {
        true
    }

    fn moves(&self, foam: &Foam) -> Result<Moves> {
        let mut blend = Blend::default();
        for face in foam.primary_faces() {
            let Some(points) = foam.face_points(face.id) else {
                continue;
            };
            let Some(plane) = fit_plane(&points) else {
                continue;
            };
            for (&v, p) in face.vertices.iter().zip(&points) {
                blend.add(v, plane.project(p) - p, 1.0);
            }
        }
        Ok(blend.finish())
    }
}

impl Foam {
    /// Largest vertex distance from its face's best-fit plane.
    ///
    /// Refreshes the derived attributes and stores the result in
    /// `max_deviation`.
    pub fn measure_planarity(&mut self) -> f64 {
        self.update_derived();
        let worst = self
            .primary_faces()
            .map(|f| f.deviation)
            .fold(0.0, f64::max);
        self.max_deviation = worst;
        worst
    }

    /// Projects vertices onto their faces' planes until every face is within
    /// `max_deviation` of planar.
    ///
    /// A vertex shared by several faces moves by the plain average of its
    /// projections. Supports, lengths and weights are ignored. The residual
    /// never rises between iterations: a step that cannot be shortened into
    /// an improvement is not taken.
    pub fn planarize<C>(
        &mut self,
        max_steps: usize,
        max_deviation: f64,
        cancel: &C,
    ) -> Result<RelaxReport>
    where
        C: CancelSignal + ?Sized,
    {
        drive(self, &Planarize, max_steps, max_deviation, cancel)
    }
}
