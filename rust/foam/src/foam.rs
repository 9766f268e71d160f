// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for a foam.
//!
//! The [`Foam`] owns every vertex, half-edge, half-face and cell of one cell
//! complex. Entities live in slot maps; an Id index maps the integer Ids used
//! for all cross references to arena keys. Entities are created in bulk (by
//! the assembler or by deserialization) and never removed individually, so
//! iteration follows insertion order and is deterministic.
//!
//! ## Halves and pairs
//!
//! A geometric edge is stored as two half-edges `k` and `-k`, a geometric face
//! as two half-faces `k` and `-k`, one per adjoining cell. A boundary face's
//! outer half belongs to the implicit exterior cell, written as the sentinel
//! cell Id.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::entities::{Cell, Edge, Face, Vertex};
use crate::error::{Error, Result};
use crate::keys::*;

/// One cell complex: a polyhedral frame or its reciprocal diagram.
///
/// # Example
///
/// ```
/// use foamframe::Foam;
///
/// let foam = Foam::new("empty");
/// assert!(foam.is_empty());
/// assert_eq!(foam.cell_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Foam {
    pub id: String,

    // Entity storage
    pub(crate) vertices: SlotMap<VertexKey, Vertex>,
    pub(crate) edges: SlotMap<EdgeKey, Edge>,
    pub(crate) faces: SlotMap<FaceKey, Face>,
    pub(crate) cells: SlotMap<CellKey, Cell>,

    // Id → key index
    pub(crate) vertex_index: FxHashMap<VertexId, VertexKey>,
    pub(crate) edge_index: FxHashMap<EdgeId, EdgeKey>,
    pub(crate) face_index: FxHashMap<FaceId, FaceKey>,
    pub(crate) cell_index: FxHashMap<CellId, CellKey>,

    /// Id of the partner foam, absent for a self-only foam.
    pub dual: Option<String>,
    /// Set by the dual resolver once `dual` has been verified.
    pub(crate) dual_linked: bool,

    pub centroid: Point3<f64>,
    pub ext_vertices: Vec<VertexId>,
    pub ext_edges: Vec<EdgeId>,
    pub ext_faces: Vec<FaceId>,
    /// Residual of the last measure or relaxation run.
    pub max_deviation: f64,
}

impl Foam {
    /// Creates a new, empty foam.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            cells: SlotMap::with_key(),
            vertex_index: FxHashMap::default(),
            edge_index: FxHashMap::default(),
            face_index: FxHashMap::default(),
            cell_index: FxHashMap::default(),
            dual: None,
            dual_linked: false,
            centroid: Point3::origin(),
            ext_vertices: Vec::new(),
            ext_edges: Vec::new(),
            ext_faces: Vec::new(),
            max_deviation: 0.0,
        }
    }

    /// Returns `true` when the foam has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // --- Insertion ---

    pub(crate) fn insert_vertex(&mut self, vertex: Vertex) -> Result<VertexKey> {
        if vertex.id.0 <= 0 || self.vertex_index.contains_key(&vertex.id) {
            return Err(Error::Malformed(format!("duplicate or invalid vertex id {}", vertex.id)));
        }
        let id = vertex.id;
        let key = self.vertices.insert(vertex);
        self.vertex_index.insert(id, key);
        Ok(key)
    }

    pub(crate) fn insert_edge(&mut self, edge: Edge) -> Result<EdgeKey> {
        if edge.id.is_none() || self.edge_index.contains_key(&edge.id) {
            return Err(Error::Malformed(format!("duplicate or invalid edge id {}", edge.id)));
        }
        let id = edge.id;
        let key = self.edges.insert(edge);
        self.edge_index.insert(id, key);
        Ok(key)
    }

    pub(crate) fn insert_face(&mut self, face: Face) -> Result<FaceKey> {
        if face.id.is_none() || self.face_index.contains_key(&face.id) {
            return Err(Error::Malformed(format!("duplicate or invalid face id {}", face.id)));
        }
        let id = face.id;
        let key = self.faces.insert(face);
        self.face_index.insert(id, key);
        Ok(key)
    }

    pub(crate) fn insert_cell(&mut self, cell: Cell) -> Result<CellKey> {
        if cell.id.0 <= 0 || self.cell_index.contains_key(&cell.id) {
            return Err(Error::Malformed(format!("duplicate or invalid cell id {}", cell.id)));
        }
        let id = cell.id;
        let key = self.cells.insert(cell);
        self.cell_index.insert(id, key);
        Ok(key)
    }

    // --- Vertex access ---

    /// Returns the vertex with the given Id, or `None` if not found.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_index.get(&id).and_then(|&k| self.vertices.get(k))
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        let key = *self.vertex_index.get(&id)?;
        self.vertices.get_mut(key)
    }

    /// Iterates over vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = &mut Vertex> {
        self.vertices.values_mut()
    }

    /// Returns the position of a vertex.
    pub fn position(&self, id: VertexId) -> Option<Point3<f64>> {
        self.vertex(id).map(|v| v.position)
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // --- Edge access ---

    /// Returns the half-edge with the given Id, or `None` if not found.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).and_then(|&k| self.edges.get(k))
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        let key = *self.edge_index.get(&id)?;
        self.edges.get_mut(key)
    }

    /// Iterates over all half-edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    /// Iterates over one half per geometric edge (the positive one).
    pub fn primary_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| e.id.is_primary())
    }

    /// Copies the length constraints and `influence_coef` of every positive
    /// half-edge onto its negative half.
    pub fn mirror_edge_constraints(&mut self) {
        let primary: Vec<(EdgeId, Option<f64>, f64, Option<f64>, f64)> = self
            .primary_edges()
            .map(|e| (e.id.pair(), e.target_length, e.min_length, e.max_length, e.influence_coef))
            .collect();
        for (negative, target, min, max, influence) in primary {
            if let Some(e) = self.edge_mut(negative) {
                e.target_length = target;
                e.min_length = min;
                e.max_length = max;
                e.influence_coef = influence;
            }
        }
    }

    /// Returns the number of geometric edges.
    pub fn edge_count(&self) -> usize {
        self.primary_edges().count()
    }

    /// Returns the number of half-edges.
    pub fn half_edge_count(&self) -> usize {
        self.edges.len()
    }

    // --- Face access ---

    /// Returns the half-face with the given Id, or `None` if not found.
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.face_index.get(&id).and_then(|&k| self.faces.get(k))
    }

    pub fn face_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        let key = *self.face_index.get(&id)?;
        self.faces.get_mut(key)
    }

    /// Iterates over all half-faces in insertion order.
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    pub fn faces_mut(&mut self) -> impl Iterator<Item = &mut Face> {
        self.faces.values_mut()
    }

    /// Iterates over one half per geometric face (the positive one).
    pub fn primary_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values().filter(|f| f.id.is_primary())
    }

    /// Returns the number of geometric faces.
    pub fn face_count(&self) -> usize {
        self.primary_faces().count()
    }

    /// Returns the number of half-faces.
    pub fn half_face_count(&self) -> usize {
        self.faces.len()
    }

    // --- Cell access ---

    /// Returns the cell with the given Id, or `None` if not found.
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cell_index.get(&id).and_then(|&k| self.cells.get(k))
    }

    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        let key = *self.cell_index.get(&id)?;
        self.cells.get_mut(key)
    }

    /// Iterates over all cells (explicit exterior cells included).
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Returns the number of bounded cells.
    pub fn cell_count(&self) -> usize {
        self.cells.values().filter(|c| !c.exterior).count()
    }

    // --- Dual link ---

    /// Returns `true` if this foam and `other` have been linked to each other
    /// by the dual resolver.
    pub fn is_linked_to(&self, other: &Foam) -> bool {
        self.dual_linked
            && other.dual_linked
            && self.dual.as_deref() == Some(other.id.as_str())
            && other.dual.as_deref() == Some(self.id.as_str())
    }

    // --- Boundary ---

    /// Returns `true` if the half-face lies on the outside of the complex.
    pub fn is_exterior_face(&self, face: &Face) -> bool {
        face.cell.is_none() || self.cell(face.cell).is_some_and(|c| c.exterior)
    }

    /// Recomputes the `external` vertex flags and the `ext_*` sets.
    ///
    /// A boundary face is a half-face of a bounded cell whose pair faces the
    /// exterior. Edges are recorded by their positive half.
    pub fn classify_boundary(&mut self) {
        let mut ext_faces = Vec::new();
        let mut ext_edges = Vec::new();
        let mut ext_vertices = Vec::new();
        let mut seen_edges = FxHashSet::default();
        let mut seen_vertices = FxHashSet::default();

        for face in self.faces.values() {
            if self.is_exterior_face(face) {
                continue;
            }
            let outside = match self.face(face.pair) {
                Some(pair) => self.is_exterior_face(pair),
                None => true,
            };
            if !outside {
                continue;
            }

            ext_faces.push(face.id);
            for &e in &face.edges {
                let primary = if e.is_primary() { e } else { e.pair() };
                if seen_edges.insert(primary) {
                    ext_edges.push(primary);
                }
            }
            for &v in &face.vertices {
                if seen_vertices.insert(v) {
                    ext_vertices.push(v);
                }
            }
        }

        for vertex in self.vertices.values_mut() {
            vertex.external = seen_vertices.contains(&vertex.id);
        }

        self.ext_faces = ext_faces;
        self.ext_edges = ext_edges;
        self.ext_vertices = ext_vertices;
    }

    // --- Validation ---

    /// Checks the structural invariants of the foam.
    ///
    /// Verifies that every cross reference resolves, that edge and face pairs
    /// are mutual, that face loops are aligned with their edge loops, and that
    /// every bounded cell has at least three faces. An empty foam is valid.
    pub fn validate(&self) -> Result<()> {
        let invariant = |msg: String| Err(Error::Invariant(msg));

        for v in self.vertices.values() {
            for &e in &v.edges {
                match self.edge(e) {
                    Some(edge) if edge.start() == v.id => {}
                    Some(_) => {
                        return invariant(format!(
                            "vertex {} lists edge {e} not leaving it",
                            v.id
                        ))
                    }
                    None => return invariant(format!("vertex {} lists missing edge {e}", v.id)),
                }
            }
            for &f in &v.faces {
                if self.face(f).is_none() {
                    return invariant(format!("vertex {} lists missing face {f}", v.id));
                }
            }
            for &c in &v.cells {
                if self.cell(c).is_none() {
                    return invariant(format!("vertex {} lists missing cell {c}", v.id));
                }
            }
        }

        for e in self.edges.values() {
            let Some(pair) = self.edge(e.pair) else {
                return invariant(format!("edge {} has no pair {}", e.id, e.pair));
            };
            if pair.pair != e.id || pair.vertices != [e.end(), e.start()] {
                return invariant(format!("edge {} and {} are not mutual pairs", e.id, e.pair));
            }
            for v in e.vertices {
                if self.vertex(v).is_none() {
                    return invariant(format!("edge {} uses missing vertex {v}", e.id));
                }
            }
            if e.faces.len() != e.face_angles.len() {
                return invariant(format!(
                    "edge {} has {} faces but {} face angles",
                    e.id,
                    e.faces.len(),
                    e.face_angles.len()
                ));
            }
            for &f in &e.faces {
                if self.face(f).is_none() {
                    return invariant(format!("edge {} lists missing face {f}", e.id));
                }
            }
        }

        for f in self.faces.values() {
            let Some(pair) = self.face(f.pair) else {
                return invariant(format!("face {} has no pair {}", f.id, f.pair));
            };
            if pair.pair != f.id {
                return invariant(format!("face {} and {} are not mutual pairs", f.id, f.pair));
            }
            if f.cell.is_some() && self.cell(f.cell).is_none() {
                return invariant(format!("face {} belongs to missing cell {}", f.id, f.cell));
            }
            if f.vertices.len() < 3 || f.vertices.len() != f.edges.len() {
                return invariant(format!("face {} has a malformed loop", f.id));
            }
            let n = f.vertices.len();
            for (i, &e) in f.edges.iter().enumerate() {
                let Some(edge) = self.edge(e) else {
                    return invariant(format!("face {} uses missing edge {e}", f.id));
                };
                if edge.vertices != [f.vertices[i], f.vertices[(i + 1) % n]] {
                    return invariant(format!("face {} edge loop is not aligned at {i}", f.id));
                }
            }
        }

        for c in self.cells.values() {
            for &f in &c.faces {
                match self.face(f) {
                    Some(face) if face.cell == c.id => {}
                    Some(_) => {
                        return invariant(format!(
                            "cell {} lists face {f} owned elsewhere",
                            c.id
                        ))
                    }
                    None => return invariant(format!("cell {} lists missing face {f}", c.id)),
                }
            }
            if !c.exterior && c.faces.len() < 3 {
                return invariant(format!("cell {} has {} faces", c.id, c.faces.len()));
            }
            for &v in &c.vertices {
                if self.vertex(v).is_none() {
                    return invariant(format!("cell {} lists missing vertex {v}", c.id));
                }
            }
            for &e in &c.edges {
                if self.edge(e).is_none() {
                    return invariant(format!("cell {} lists missing edge {e}", c.id));
                }
            }
        }

        if !self.cells.is_empty() && self.cell_count() == 0 {
            return invariant("foam has only exterior cells".to_string());
        }

        Ok(())
    }
}

impl Default for Foam {
    fn default() -> Self {
        Self::new(String::new())
    }
}
