// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric measures and the derived-attribute updater.
//!
//! Everything here is a pure function of the current vertex positions. After
//! any position change, [`Foam::update_derived`] must run before a solver
//! reads face or cell geometry.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::entities::Vertex;
use crate::foam::Foam;
use crate::keys::*;

/// Below this Newell norm a polygon has no usable plane.
const DEGENERATE_NORM: f64 = 1e-15;

/// An oriented plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    /// Unit normal.
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Signed distance from the plane, positive on the normal side.
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.signed_distance(p)
    }
}

/// Polygon normal using Newell's method, normalized.
///
/// Works for any polygon (convex or concave, planar or not). The direction
/// follows the right-hand rule relative to the loop order.
pub fn newell_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if points.len() < 3 {
        return None;
    }

    let mut normal: Vector3<f64> = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    let len = normal.norm();
    if !(len > DEGENERATE_NORM) {
        return None;
    }
    Some(normal / len)
}

/// Unweighted mean of a set of points.
pub fn mean_point(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Best-fit plane of a vertex loop: Newell normal through the vertex mean.
pub fn fit_plane(points: &[Point3<f64>]) -> Option<Plane> {
    let normal = newell_normal(points)?;
    let origin = mean_point(points)?;
    Some(Plane { origin, normal })
}

/// Largest distance of any point from the plane.
pub fn plane_deviation(plane: &Plane, points: &[Point3<f64>]) -> f64 {
    points
        .iter()
        .map(|p| plane.signed_distance(p).abs())
        .fold(0.0, f64::max)
}

/// Area and area-weighted centroid of a polygon, from a triangle fan.
///
/// Triangle areas are signed along `normal`, so concave loops are handled.
/// Falls back to the vertex mean when the area vanishes.
pub fn fan_area_centroid(points: &[Point3<f64>], normal: &Vector3<f64>) -> (f64, Point3<f64>) {
    let Some(mean) = mean_point(points) else {
        return (0.0, Point3::origin());
    };
    if points.len() < 3 {
        return (0.0, mean);
    }

    let p0 = points[0];
    let mut area = 0.0;
    let mut weighted = Vector3::zeros();
    for i in 1..points.len() - 1 {
        let p1 = points[i];
        let p2 = points[i + 1];
        let a = 0.5 * (p1 - p0).cross(&(p2 - p0)).dot(normal);
        let c = (p0.coords + p1.coords + p2.coords) / 3.0;
        area += a;
        weighted += c * a;
    }

    if area.abs() < 1e-300 {
        return (0.0, mean);
    }
    (area.abs(), Point3::from(weighted / area))
}

/// Angle of a face around an edge axis, in `[0, 2π)`.
///
/// Measured from a reference direction perpendicular to the axis, toward the
/// face centroid, counter-clockwise when looking down the axis.
pub fn face_angle(
    start: &Point3<f64>,
    end: &Point3<f64>,
    face_centroid: &Point3<f64>,
) -> Option<f64> {
    let axis = (end - start).try_normalize(1e-15)?;
    let reference = reference_perpendicular(&axis);

    let w = face_centroid - start;
    let w = w - axis * w.dot(&axis);
    if w.norm() < 1e-15 {
        return None;
    }

    let angle = axis.dot(&reference.cross(&w)).atan2(reference.dot(&w));
    Some(angle.rem_euclid(TAU))
}

/// A unit vector perpendicular to `axis`, chosen deterministically.
fn reference_perpendicular(axis: &Vector3<f64>) -> Vector3<f64> {
    let helper = if axis.x.abs() <= axis.y.abs() && axis.x.abs() <= axis.z.abs() {
        Vector3::x()
    } else if axis.y.abs() <= axis.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    axis.cross(&helper).normalize()
}

/// Looks up vertex positions through the split borrow of a foam's storage.
fn lookup<'a>(
    vertices: &'a SlotMap<VertexKey, Vertex>,
    index: &'a FxHashMap<VertexId, VertexKey>,
) -> impl Fn(VertexId) -> Option<Point3<f64>> + 'a {
    move |id| index.get(&id).and_then(|&k| vertices.get(k)).map(|v| v.position)
}

impl Foam {
    /// Positions of a face's vertex loop, in loop order.
    pub fn face_points(&self, id: FaceId) -> Option<Vec<Point3<f64>>> {
        let face = self.face(id)?;
        face.vertices.iter().map(|&v| self.position(v)).collect()
    }

    /// Best-fit plane of a face at the current positions.
    pub fn face_plane(&self, id: FaceId) -> Option<Plane> {
        fit_plane(&self.face_points(id)?)
    }

    /// Euclidean length of an edge at the current positions.
    pub fn edge_length(&self, id: EdgeId) -> Option<f64> {
        self.edge_vector(id).map(|v| v.norm())
    }

    /// Vector from an edge's start to its end.
    pub fn edge_vector(&self, id: EdgeId) -> Option<Vector3<f64>> {
        let edge = self.edge(id)?;
        Some(self.position(edge.end())? - self.position(edge.start())?)
    }

    /// Volume of a cell by the signed tetrahedron method.
    ///
    /// Positive when the cell's faces are oriented outward.
    pub fn cell_volume(&self, id: CellId) -> Option<f64> {
        let cell = self.cell(id)?;
        let mut volume = 0.0;
        for &f in &cell.faces {
            let points = self.face_points(f)?;
            if points.len() < 3 {
                continue;
            }
            let p0 = points[0];
            for i in 1..points.len() - 1 {
                volume += p0.coords.dot(&points[i].coords.cross(&points[i + 1].coords));
            }
        }
        Some(volume / 6.0)
    }

    /// Triangulates a face for display, via ear clipping in its dominant plane.
    pub fn triangulate_face(&self, id: FaceId) -> Option<Vec<[VertexId; 3]>> {
        let face = self.face(id)?;
        if face.vertices.len() < 3 {
            return None;
        }
        let points = self.face_points(id)?;
        let normal = newell_normal(&points)?;

        let abs_n = normal.abs();
        let (ax_u, ax_v) = if abs_n.z >= abs_n.x && abs_n.z >= abs_n.y {
            (0, 1)
        } else if abs_n.y >= abs_n.x {
            (0, 2)
        } else {
            (1, 2)
        };

        let coords_2d: Vec<f64> = points
            .iter()
            .flat_map(|p| [p[ax_u], p[ax_v]])
            .collect();
        let indices = earcutr::earcut(&coords_2d, &[], 2).ok()?;

        Some(
            indices
                .chunks_exact(3)
                .map(|t| [face.vertices[t[0]], face.vertices[t[1]], face.vertices[t[2]]])
                .collect(),
        )
    }

    /// Recomputes every derived attribute from the current vertex positions.
    ///
    /// Faces get normal, centroid, area and planarity deviation; edges get
    /// length and one angle per incident face; cells get the mean of their
    /// face centroids; the foam gets the mean of all vertex positions.
    pub fn update_derived(&mut self) {
        let Foam {
            vertices,
            vertex_index,
            edges,
            faces,
            cells,
            face_index,
            ..
        } = self;
        let pos = lookup(vertices, vertex_index);

        for face in faces.values_mut() {
            let Some(points) = face
                .vertices
                .iter()
                .map(|&v| pos(v))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            match fit_plane(&points) {
                Some(plane) => {
                    let (area, centroid) = fan_area_centroid(&points, &plane.normal);
                    face.normal = plane.normal;
                    face.area = area;
                    face.centroid = centroid;
                    face.deviation = plane_deviation(&plane, &points);
                }
                None => {
                    face.normal = Vector3::zeros();
                    face.area = 0.0;
                    face.centroid = mean_point(&points).unwrap_or_else(Point3::origin);
                    face.deviation = 0.0;
                }
            }
        }

        for edge in edges.values_mut() {
            let (Some(a), Some(b)) = (pos(edge.start()), pos(edge.end())) else {
                continue;
            };
            edge.length = (b - a).norm();
            edge.face_angles = edge
                .faces
                .iter()
                .map(|f| {
                    face_index
                        .get(f)
                        .and_then(|&k| faces.get(k))
                        .and_then(|face| face_angle(&a, &b, &face.centroid))
                        .unwrap_or(0.0)
                })
                .collect();
        }

        for cell in cells.values_mut() {
            let centroids: Vec<Point3<f64>> = cell
                .faces
                .iter()
                .filter_map(|f| face_index.get(f).and_then(|&k| faces.get(k)))
                .map(|face| face.centroid)
                .collect();
            if let Some(c) = mean_point(&centroids) {
                cell.centroid = c;
            }
        }

        let all: Vec<Point3<f64>> = vertices.values().map(|v| v.position).collect();
        self.centroid = mean_point(&all).unwrap_or_else(Point3::origin);
    }
}
