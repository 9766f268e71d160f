// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Perpendicularization: each primal edge turns toward its dual face normal.

use nalgebra::Vector3;

use super::guard::clamp_lengths;
use super::{drive, Blend, CancelSignal, Moves, Objective, RelaxReport};
use crate::entities::Edge;
use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::keys::{EdgeId, VertexId};

const MIN_DIRECTION_LENGTH: f64 = 1e-12;

struct PerpSoft<'d> {
    dual: &'d Foam,
}

impl PerpSoft<'_> {
    /// Unit normal of the dual face linked to `edge`.
    fn dual_normal(&self, edge: &Edge) -> Option<Vector3<f64>> {
        let f = edge.dual.linked()?;
        self.dual.face_plane(f).map(|plane| plane.normal)
    }
}

impl Objective for PerpSoft<'_> {
    fn name(&self) -> &'static str {
        "perp_soft"
    }

    fn residual(&self, foam: &mut Foam) -> Result<f64> {
        foam.measure_perpendicularity(self.dual)
    }

    fn moves(&self, foam: &Foam) -> Result<Moves> {
        let mut blend = Blend::default();
        let pinned = |id: VertexId| foam.vertex(id).map_or(true, |v| v.fixed);

        for edge in foam.primary_edges() {
            let Some(n) = self.dual_normal(edge) else {
                continue;
            };
            let (a, b) = (edge.start(), edge.end());
            let (Some(pa), Some(pb)) = (foam.position(a), foam.position(b)) else {
                continue;
            };
            let d = pb - pa;
            let len = d.norm();
            if len < MIN_DIRECTION_LENGTH {
                continue;
            }

            let t = if d.dot(&n) >= 0.0 { n } else { -n };
            let l = len.max(edge.min_length);
            let w = edge.influence_coef;

            match (pinned(a), pinned(b)) {
                (false, false) => {
                    let mid = pa + d * 0.5;
                    blend.add(a, (mid - t * (l * 0.5)) - pa, w);
                    blend.add(b, (mid + t * (l * 0.5)) - pb, w);
                }
                (true, false) => blend.add(b, (pa + t * l) - pb, w),
                (false, true) => blend.add(a, (pb - t * l) - pa, w),
                (true, true) => {}
            }
        }

        Ok(blend.finish())
    }

    fn guard(&self, foam: &Foam, moves: &mut Moves) {
        clamp_lengths(foam, moves, false);
    }
}

/// Angle between an edge direction and the line of a unit normal, in
/// `[0, π/2]`.
fn angle_to_normal(d: &Vector3<f64>, n: &Vector3<f64>) -> Option<f64> {
    let len = d.norm();
    if len < MIN_DIRECTION_LENGTH {
        return None;
    }
    let cos = (d.dot(n).abs() / len).min(1.0);
    Some(cos.acos())
}

impl Foam {
    /// Largest angle between a primal edge and its dual face normal, in
    /// radians.
    ///
    /// Writes each edge's angle to `deviation` (both halves; edges without a
    /// dual face get zero) and the maximum to `max_deviation`.
    pub fn measure_perpendicularity(&mut self, dual: &Foam) -> Result<f64> {
        if !self.is_linked_to(dual) {
            return Err(Error::DualNotLinked(self.id.clone()));
        }
        self.update_derived();

        let objective = PerpSoft { dual };
        let mut angles: Vec<(EdgeId, f64)> = Vec::new();
        for edge in self.primary_edges() {
            let Some(n) = objective.dual_normal(edge) else {
                continue;
            };
            let Some(d) = self.edge_vector(edge.id) else {
                continue;
            };
            if d.iter().any(|c| !c.is_finite()) {
                return Err(Error::NonFinite(format!("edge {}", edge.id)));
            }
            if let Some(angle) = angle_to_normal(&d, &n) {
                if !angle.is_finite() {
                    return Err(Error::NonFinite(format!("angle of edge {}", edge.id)));
                }
                angles.push((edge.id, angle));
            }
        }

        for edge in self.edges_mut() {
            edge.deviation = 0.0;
        }
        let mut worst: f64 = 0.0;
        for (id, angle) in angles {
            for half in [id, id.pair()] {
                if let Some(edge) = self.edge_mut(half) {
                    edge.deviation = angle;
                }
            }
            worst = worst.max(angle);
        }
        self.max_deviation = worst;
        Ok(worst)
    }

    /// Turns every primal edge toward its dual face normal until the largest
    /// angle is within `max_deviation_angle` radians.
    ///
    /// Each edge is rotated about its midpoint, or about its `fixed` end,
    /// keeping its length but never less than `min_length`. A vertex moves by
    /// the average of its edges' corrections weighted by their
    /// `influence_coef`. Moves that would shorten an edge below `min_length`
    /// are dropped.
    pub fn perp_soft<C>(
        &mut self,
        dual: &Foam,
        max_steps: usize,
        max_deviation_angle: f64,
        cancel: &C,
    ) -> Result<RelaxReport>
    where
        C: CancelSignal + ?Sized,
    {
        if !self.is_linked_to(dual) {
            return Err(Error::DualNotLinked(self.id.clone()));
        }
        drive(self, &PerpSoft { dual }, max_steps, max_deviation_angle, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dual::connect_duals;
    use crate::keys::{DualRef, FaceId};
    use crate::relax::{NeverCancel, RelaxStatus};
    use crate::test_support::unit_cube;
    use nalgebra::Point3;

    /// A cube with one corner pulled off, whose three corner edges are
    /// linked to the axis faces of a unit-cube dual.
    fn skewed_corner() -> (Foam, Foam, VertexId) {
        let mut primal = unit_cube();
        let mut dual = unit_cube();
        primal.id = "primal".into();
        dual.id = "dual".into();
        primal.dual = Some("dual".into());
        dual.dual = Some("primal".into());

        let corner = primal
            .vertices()
            .find(|v| v.position == Point3::new(1.0, 1.0, 1.0))
            .map(|v| v.id)
            .unwrap();
        let edges: Vec<EdgeId> = primal
            .vertex(corner)
            .unwrap()
            .edges
            .iter()
            .map(|&e| if e.is_primary() { e } else { e.pair() })
            .collect();

        for e in edges {
            let d = primal.edge_vector(e).unwrap();
            let f = dual
                .primary_faces()
                .find(|f| f.normal.cross(&d).norm() < 1e-9)
                .map(|f| f.id)
                .unwrap();
            link(&mut primal, &mut dual, e, f);
        }

        primal.vertex_mut(corner).unwrap().position = Point3::new(1.1, 1.05, 1.0);
        primal.update_derived();
        connect_duals(&mut primal, &mut dual).unwrap();
        (primal, dual, corner)
    }

    fn link(primal: &mut Foam, dual: &mut Foam, e: EdgeId, f: FaceId) {
        primal.edge_mut(e).unwrap().dual = DualRef::Pending(f);
        primal.edge_mut(e.pair()).unwrap().dual = DualRef::Pending(f.pair());
        dual.face_mut(f).unwrap().dual = DualRef::Pending(e);
        dual.face_mut(f.pair()).unwrap().dual = DualRef::Pending(e.pair());
    }

    #[test]
    fn measure_requires_link() {
        let mut a = unit_cube();
        let b = unit_cube();
        assert!(matches!(
            a.measure_perpendicularity(&b),
            Err(Error::DualNotLinked(_))
        ));
        assert!(matches!(
            a.perp_soft(&b, 10, 1e-3, &NeverCancel),
            Err(Error::DualNotLinked(_))
        ));
    }

    #[test]
    fn measure_writes_edge_deviation() {
        let (mut primal, dual, corner) = skewed_corner();
        let worst = primal.measure_perpendicularity(&dual).unwrap();
        assert!(worst > 0.01);
        for &e in &primal.vertex(corner).unwrap().edges.clone() {
            let edge = primal.edge(e).unwrap();
            assert_eq!(edge.deviation, primal.edge(e.pair()).unwrap().deviation);
        }
        assert_eq!(primal.max_deviation, worst);
    }

    #[test]
    fn corner_edges_straighten() {
        let (mut primal, dual, _) = skewed_corner();
        let start = primal.measure_perpendicularity(&dual).unwrap();

        let report = primal.perp_soft(&dual, 5000, 1e-4, &NeverCancel).unwrap();
        assert_eq!(report.status, RelaxStatus::Converged);
        assert!(report.max_deviation < start);
        assert!(primal.edges().all(|e| e.deviation <= 1e-4));
    }

    #[test]
    fn fixed_corner_is_respected() {
        let (mut primal, dual, corner) = skewed_corner();
        primal.fix_vertex(corner).unwrap();
        primal.perp_soft(&dual, 200, 1e-4, &NeverCancel).unwrap();
        assert_eq!(primal.position(corner).unwrap(), Point3::new(1.1, 1.05, 1.0));
    }

    #[test]
    fn edges_never_fall_below_min_length() {
        let (mut primal, dual, _) = skewed_corner();
        for e in primal.edges_mut() {
            e.min_length = 1.0;
        }
        let initial: Vec<(EdgeId, f64)> = primal.edges().map(|e| (e.id, e.length)).collect();

        primal.perp_soft(&dual, 500, 1e-6, &NeverCancel).unwrap();
        for (id, before) in initial {
            let after = primal.edge_length(id).unwrap();
            assert!(after >= before.min(1.0) - 1e-12, "edge {id}: {after} < {before}");
        }
    }
}
