// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adjacency queries over the half-edge / half-face structure.
//!
//! Downward queries read the membership lists stored on each entity. Upward
//! and sideways queries (cells around a cell, faces around an edge) go through
//! the half-face pairs.

use rustc_hash::FxHashSet;

use crate::foam::Foam;
use crate::keys::*;

impl Foam {
    /// Bounded cells sharing a face with `cell`, in face order.
    ///
    /// The exterior is never reported. Returns an empty list for an unknown
    /// cell.
    pub fn adjacent_cells(&self, cell: CellId) -> Vec<CellId> {
        let Some(c) = self.cell(cell) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        let mut adjacent = Vec::new();
        for &f in &c.faces {
            let Some(other) = self.face(f.pair()) else {
                continue;
            };
            if self.is_exterior_face(other) || other.cell == cell {
                continue;
            }
            if seen.insert(other.cell) {
                adjacent.push(other.cell);
            }
        }
        adjacent
    }

    /// Half-faces of `a` whose pair bounds `b`.
    pub fn shared_faces(&self, a: CellId, b: CellId) -> Vec<FaceId> {
        let Some(c) = self.cell(a) else {
            return Vec::new();
        };
        c.faces
            .iter()
            .copied()
            .filter(|f| self.face(f.pair()).is_some_and(|p| p.cell == b))
            .collect()
    }

    /// Half-faces traversing `edge`, ordered by their angle around it.
    ///
    /// Angles are the `face_angles` written by
    /// [`update_derived`](Foam::update_derived); call it first if positions
    /// have changed.
    pub fn faces_around_edge(&self, edge: EdgeId) -> Vec<FaceId> {
        let Some(e) = self.edge(edge) else {
            return Vec::new();
        };
        let mut around: Vec<(f64, FaceId)> = e
            .faces
            .iter()
            .enumerate()
            .map(|(i, &f)| (e.face_angles.get(i).copied().unwrap_or(0.0), f))
            .collect();
        around.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        around.into_iter().map(|(_, f)| f).collect()
    }

    /// Vertices joined to `vertex` by an edge, in outgoing-edge order.
    pub fn vertex_neighbors(&self, vertex: VertexId) -> Vec<VertexId> {
        let Some(v) = self.vertex(vertex) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        v.edges
            .iter()
            .filter_map(|&e| self.edge(e))
            .map(|e| e.end())
            .filter(|&n| seen.insert(n))
            .collect()
    }

    /// Bounded cells incident to a vertex.
    pub fn vertex_cells(&self, vertex: VertexId) -> Vec<CellId> {
        self.vertex(vertex)
            .map(|v| v.cells.iter().copied().filter(|c| c.is_some()).collect())
            .unwrap_or_default()
    }
}
