// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position constraints supplied by the position source.
//!
//! A vertex is either pinned (`Fixed`) or pulled onto a reference shape
//! (`OnGeo`). The shapes are kept analytic so the soft solvers can project onto
//! them without a geometry kernel.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::keys::{EntityRef, VertexId};

/// A reference shape a vertex may be restricted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Point(Point3<f64>),
    Line {
        origin: Point3<f64>,
        direction: Vector3<f64>,
    },
    Plane {
        origin: Point3<f64>,
        normal: Vector3<f64>,
    },
    Sphere {
        center: Point3<f64>,
        radius: f64,
    },
}

impl Restriction {
    /// Closest point of the shape to `p`.
    ///
    /// A line with a zero direction degenerates to its origin, a plane with a
    /// zero normal restricts nothing.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            Restriction::Point(q) => *q,
            Restriction::Line { origin, direction } => {
                let len_sq = direction.norm_squared();
                if len_sq < 1e-24 {
                    return *origin;
                }
                let t = (p - origin).dot(direction) / len_sq;
                origin + direction * t
            }
            Restriction::Plane { origin, normal } => {
                let len_sq = normal.norm_squared();
                if len_sq < 1e-24 {
                    return *p;
                }
                let d = (p - origin).dot(normal) / len_sq;
                p - normal * d
            }
            Restriction::Sphere { center, radius } => {
                let v = p - center;
                let len = v.norm();
                if len < 1e-12 {
                    return center + Vector3::x() * *radius;
                }
                center + v * (*radius / len)
            }
        }
    }

    /// Distance from `p` to the shape.
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        (self.project(p) - p).norm()
    }

    pub fn is_finite(&self) -> bool {
        let finite_point = |q: &Point3<f64>| q.iter().all(|c| c.is_finite());
        let finite_vector = |v: &Vector3<f64>| v.iter().all(|c| c.is_finite());
        match self {
            Restriction::Point(q) => finite_point(q),
            Restriction::Line { origin, direction } => {
                finite_point(origin) && finite_vector(direction)
            }
            Restriction::Plane { origin, normal } => finite_point(origin) && finite_vector(normal),
            Restriction::Sphere { center, radius } => finite_point(center) && radius.is_finite(),
        }
    }
}

/// How a vertex is supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Support {
    /// Pin the vertex where it stands.
    Fixed,
    /// Pull the vertex onto a shape with the given blending weight.
    OnGeo {
        restriction: Restriction,
        influence_coef: f64,
    },
}

impl Foam {
    /// Pins a vertex at its current position.
    pub fn fix_vertex(&mut self, id: VertexId) -> Result<()> {
        let vertex = self
            .vertex_mut(id)
            .ok_or(Error::NotFound(EntityRef::Vertex(id)))?;
        vertex.fixed = true;
        Ok(())
    }

    /// Restricts a vertex to a reference shape.
    pub fn restrict_vertex(
        &mut self,
        id: VertexId,
        restriction: Restriction,
        influence_coef: f64,
    ) -> Result<()> {
        if !restriction.is_finite() || !influence_coef.is_finite() {
            return Err(Error::NonFinite(format!("restriction of vertex {id}")));
        }
        let vertex = self
            .vertex_mut(id)
            .ok_or(Error::NotFound(EntityRef::Vertex(id)))?;
        vertex.on_geo = true;
        vertex.restriction = Some(restriction);
        vertex.influence_coef = influence_coef;
        Ok(())
    }

    /// Applies supports keyed by the vertices' external identifiers.
    ///
    /// Returns the number of vertices that received a support. Keys that match
    /// no vertex are skipped.
    pub fn apply_supports(&mut self, supports: &FxHashMap<String, Support>) -> Result<usize> {
        for (key, support) in supports {
            if let Support::OnGeo {
                restriction,
                influence_coef,
            } = support
            {
                if !restriction.is_finite() || !influence_coef.is_finite() {
                    return Err(Error::NonFinite(format!("support '{key}'")));
                }
            }
        }

        let mut applied = 0;
        for vertex in self.vertices_mut() {
            let Some(support) = vertex
                .external_id
                .as_ref()
                .and_then(|key| supports.get(key))
            else {
                continue;
            };

            match support {
                Support::Fixed => vertex.fixed = true,
                Support::OnGeo {
                    restriction,
                    influence_coef,
                } => {
                    vertex.on_geo = true;
                    vertex.restriction = Some(restriction.clone());
                    vertex.influence_coef = *influence_coef;
                }
            }
            applied += 1;
        }

        tracing::debug!(
            foam = %self.id,
            requested = supports.len(),
            applied,
            "Applied vertex supports"
        );
        Ok(applied)
    }
}
