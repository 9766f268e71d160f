// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Foam entities: vertices, half-edges, half-faces and cells.
//!
//! Entities are plain data. All cross references are Ids resolved through the
//! owning [`Foam`](crate::Foam); derived attributes (normals, centroids,
//! lengths, deviations) are refreshed by
//! [`Foam::update_derived`](crate::Foam::update_derived).

use nalgebra::{Point3, Vector3};

use crate::constraints::Restriction;
use crate::keys::*;

/// Default blending weight for a constraint term.
pub const DEFAULT_INFLUENCE: f64 = 1.0;

/// A point of the complex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Point3<f64>,
    /// On the outer boundary of the complex.
    pub external: bool,
    /// Pinned: soft solvers never move it.
    pub fixed: bool,
    /// Pulled toward `restriction` by the soft solvers.
    pub on_geo: bool,
    pub restriction: Option<Restriction>,
    pub influence_coef: f64,
    /// Stable identifier supplied by the position source.
    pub external_id: Option<String>,
    /// Outgoing half-edges.
    pub edges: Vec<EdgeId>,
    /// Half-faces whose loop passes through this vertex.
    pub faces: Vec<FaceId>,
    pub cells: Vec<CellId>,
    pub dual: DualRef<CellId>,
}

impl Vertex {
    /// Creates a free vertex with no adjacency.
    pub fn new(id: VertexId, position: Point3<f64>) -> Self {
        Self {
            id,
            position,
            external: false,
            fixed: false,
            on_geo: false,
            restriction: None,
            influence_coef: DEFAULT_INFLUENCE,
            external_id: None,
            edges: Vec::new(),
            faces: Vec::new(),
            cells: Vec::new(),
            dual: DualRef::Unset,
        }
    }
}

/// An oriented half-edge from `vertices[0]` to `vertices[1]`.
///
/// Length constraints (`target_length`, `min_length`, `max_length`) and
/// `influence_coef` belong to the geometric edge. The solvers read them from
/// the positive half only; [`Foam::mirror_edge_constraints`] copies them onto
/// the negative half, and loading a record does so automatically.
///
/// [`Foam::mirror_edge_constraints`]: crate::Foam::mirror_edge_constraints
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub vertices: [VertexId; 2],
    pub pair: EdgeId,
    /// Half-faces traversing this half-edge, with one angle per face.
    pub faces: Vec<FaceId>,
    pub face_angles: Vec<f64>,
    pub dual: DualRef<FaceId>,
    pub target_length: Option<f64>,
    pub min_length: f64,
    pub max_length: Option<f64>,
    pub influence_coef: f64,
    /// Angular residual in radians, written by the perpendicularity measure.
    pub deviation: f64,
    pub length: f64,
}

impl Edge {
    /// Creates an unconstrained half-edge between two vertices.
    pub fn new(id: EdgeId, start: VertexId, end: VertexId) -> Self {
        Self {
            id,
            vertices: [start, end],
            pair: id.pair(),
            faces: Vec::new(),
            face_angles: Vec::new(),
            dual: DualRef::Unset,
            target_length: None,
            min_length: 0.0,
            max_length: None,
            influence_coef: DEFAULT_INFLUENCE,
            deviation: 0.0,
            length: 0.0,
        }
    }

    pub fn start(&self) -> VertexId {
        self.vertices[0]
    }

    pub fn end(&self) -> VertexId {
        self.vertices[1]
    }

    /// The length the edge should have, after applying the hard clamps.
    ///
    /// Without a target, an edge only has a goal when its current length is
    /// outside `[min_length, max_length]`.
    pub fn effective_target(&self, current: f64) -> Option<f64> {
        let clamp = |len: f64| {
            let len = len.max(self.min_length);
            match self.max_length {
                Some(max) if max >= self.min_length => len.min(max),
                _ => len,
            }
        };

        match self.target_length {
            Some(target) => Some(clamp(target)),
            None => {
                let clamped = clamp(current);
                (clamped != current).then_some(clamped)
            }
        }
    }
}

/// An oriented half-face bounding `cell`.
///
/// `edges[i]` runs from `vertices[i]` to `vertices[(i + 1) % n]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub id: FaceId,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub pair: FaceId,
    /// Owning cell; the sentinel stands for the implicit exterior cell.
    pub cell: CellId,
    pub normal: Vector3<f64>,
    pub centroid: Point3<f64>,
    pub area: f64,
    /// Largest vertex distance from the best-fit plane.
    pub deviation: f64,
    pub dual: DualRef<EdgeId>,
    pub target_area: Option<f64>,
    pub influence_coef: f64,
}

impl Face {
    pub fn new(id: FaceId, vertices: Vec<VertexId>, edges: Vec<EdgeId>, cell: CellId) -> Self {
        Self {
            id,
            vertices,
            edges,
            pair: id.pair(),
            cell,
            normal: Vector3::zeros(),
            centroid: Point3::origin(),
            area: 0.0,
            deviation: 0.0,
            dual: DualRef::Unset,
            target_area: None,
            influence_coef: DEFAULT_INFLUENCE,
        }
    }
}

/// A polyhedral cell of the complex.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub faces: Vec<FaceId>,
    pub centroid: Point3<f64>,
    /// The unbounded outside cell.
    pub exterior: bool,
    /// Dual vertices, in the order of the cell's faces.
    pub dual: Vec<DualRef<VertexId>>,
}

impl Cell {
    pub fn new(id: CellId) -> Self {
        Self {
            id,
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            centroid: Point3::origin(),
            exterior: false,
            dual: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_edge_pairs_with_negated_id() {
        let e = Edge::new(EdgeId(3), VertexId(1), VertexId(2));
        assert_eq!(e.pair, EdgeId(-3));
        assert_eq!(e.start(), VertexId(1));
        assert_eq!(e.end(), VertexId(2));
    }

    #[test]
    fn effective_target_clamps_to_bounds() {
        let mut e = Edge::new(EdgeId(1), VertexId(1), VertexId(2));
        assert_eq!(e.effective_target(2.0), None);

        e.min_length = 1.0;
        e.max_length = Some(3.0);
        assert_eq!(e.effective_target(2.0), None);
        assert_eq!(e.effective_target(0.5), Some(1.0));
        assert_eq!(e.effective_target(4.0), Some(3.0));

        e.target_length = Some(5.0);
        assert_eq!(e.effective_target(2.0), Some(3.0));
        e.target_length = Some(0.1);
        assert_eq!(e.effective_target(2.0), Some(1.0));
    }

    #[test]
    fn new_face_is_owned_by_cell() {
        let f = Face::new(
            FaceId(-2),
            vec![VertexId(1), VertexId(2), VertexId(3)],
            vec![EdgeId(1), EdgeId(2), EdgeId(3)],
            CellId::NONE,
        );
        assert_eq!(f.pair, FaceId(2));
        assert!(f.cell.is_none());
    }
}
