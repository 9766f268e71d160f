// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planarization with supports, edge-length targets and restrictions.

use super::guard::clamp_lengths;
use super::{drive, Blend, CancelSignal, Moves, Objective, RelaxReport};
use crate::error::Result;
use crate::foam::Foam;
use crate::geometry::fit_plane;
use crate::keys::VertexId;

/// Edges shorter than this have no usable direction.
const MIN_DIRECTION_LENGTH: f64 = 1e-12;

struct PlanarizeSoft;

impl Objective for PlanarizeSoft {
    fn name(&self) -> &'static str {
        "planarize_soft"
    }

    fn residual(&self, foam: &mut Foam) -> Result<f64> {
        let planarity = foam.measure_planarity();

        let length = foam
            .primary_edges()
            .filter_map(|e| e.effective_target(e.length).map(|t| (e.length - t).abs()))
            .fold(0.0, f64::max);

        let restriction = foam
            .vertices()
            .filter(|v| v.on_geo && !v.fixed)
            .filter_map(|v| v.restriction.as_ref().map(|r| r.distance(&v.position)))
            .fold(0.0, f64::max);

        let combined = planarity.max(length).max(restriction);
        foam.max_deviation = combined;
        Ok(combined)
    }

    fn moves(&self, foam: &Foam) -> Result<Moves> {
        let mut blend = Blend::default();
        let pinned = |id: VertexId| foam.vertex(id).map_or(true, |v| v.fixed);

        for face in foam.primary_faces() {
            let Some(points) = foam.face_points(face.id) else {
                continue;
            };
            let Some(plane) = fit_plane(&points) else {
                continue;
            };
            for (&v, p) in face.vertices.iter().zip(&points) {
                if !pinned(v) {
                    blend.add(v, plane.project(p) - p, face.influence_coef);
                }
            }
        }

        for edge in foam.primary_edges() {
            let (a, b) = (edge.start(), edge.end());
            let (Some(pa), Some(pb)) = (foam.position(a), foam.position(b)) else {
                continue;
            };
            let d = pb - pa;
            let len = d.norm();
            let Some(target) = edge.effective_target(len) else {
                continue;
            };
            if len < MIN_DIRECTION_LENGTH {
                continue;
            }
            let correction = d / len * (target - len);

            match (pinned(a), pinned(b)) {
                (false, false) => {
                    blend.add(a, -correction * 0.5, edge.influence_coef);
                    blend.add(b, correction * 0.5, edge.influence_coef);
                }
                (true, false) => blend.add(b, correction, edge.influence_coef),
                (false, true) => blend.add(a, -correction, edge.influence_coef),
                (true, true) => {}
            }
        }

        for vertex in foam.vertices() {
            if vertex.fixed || !vertex.on_geo {
                continue;
            }
            if let Some(restriction) = &vertex.restriction {
                let target = restriction.project(&vertex.position);
                blend.add(vertex.id, target - vertex.position, vertex.influence_coef);
            }
        }

        Ok(blend.finish())
    }

    fn guard(&self, foam: &Foam, moves: &mut Moves) {
        clamp_lengths(foam, moves, true);
    }
}

impl Foam {
    /// Planarizes while honouring supports and edge-length constraints.
    ///
    /// Each vertex moves by the influence-weighted average of its active
    /// terms: one planarity term per face it lies on (weighted by the face's
    /// `influence_coef`), one length term per edge with an effective target
    /// (weighted by the edge's), and a restriction term when it is `on_geo`
    /// (weighted by its own). `fixed` vertices never move. `min_length` and
    /// `max_length` are hard clamps. Converges when face deviation, length
    /// error and restriction distance are all within `max_deviation`.
    pub fn planarize_soft<C>(
        &mut self,
        max_steps: usize,
        max_deviation: f64,
        cancel: &C,
    ) -> Result<RelaxReport>
    where
        C: CancelSignal + ?Sized,
    {
        drive(self, &PlanarizeSoft, max_steps, max_deviation, cancel)
    }
}
