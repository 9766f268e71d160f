// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology assembly from raw face loops.
//!
//! [`FoamBuilder`] turns planar face loops into a fully linked [`Foam`]:
//! near-coincident positions are merged into shared vertices, faces of each
//! cell are oriented outward, shared walls between cells become half-face
//! pairs, and every geometric edge becomes a half-edge pair.
//!
//! # Example
//!
//! ```
//! use foamframe::assembler::{box_faces, CellInput, FoamBuilder};
//!
//! let foam = FoamBuilder::new("rooms")
//!     .build_cells(&[
//!         CellInput::new(box_faces([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
//!         CellInput::new(box_faces([1.0, 0.0, 0.0], [2.0, 1.0, 1.0])),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(foam.cell_count(), 2);
//! assert_eq!(foam.face_count(), 11);
//! ```

use std::collections::VecDeque;

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::config::{SolverConfig, DEFAULT_POINT_COLLAPSE_LIMIT};
use crate::entities::{Cell, Edge, Face, Vertex};
use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::geometry::{fit_plane, plane_deviation};
use crate::keys::*;
use crate::spatial::SpatialIndex;

/// One input face: an ordered loop of positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceInput {
    pub points: Vec<[f64; 3]>,
    /// Stable identifiers of the loop's vertices, parallel to `points`.
    pub external_ids: Option<Vec<String>>,
    /// Overrides the builder's planarity tolerance for this face.
    pub planarity_tolerance: Option<f64>,
}

impl FaceInput {
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self {
            points,
            external_ids: None,
            planarity_tolerance: None,
        }
    }

    pub fn with_external_ids(mut self, ids: Vec<String>) -> Self {
        self.external_ids = Some(ids);
        self
    }

    pub fn with_planarity_tolerance(mut self, tolerance: f64) -> Self {
        self.planarity_tolerance = Some(tolerance);
        self
    }
}

impl From<Vec<[f64; 3]>> for FaceInput {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

/// The faces bounding one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellInput {
    pub faces: Vec<FaceInput>,
}

impl CellInput {
    pub fn new(faces: Vec<FaceInput>) -> Self {
        Self { faces }
    }
}

/// The six outward-wound faces of an axis-aligned box.
pub fn box_faces(min: [f64; 3], max: [f64; 3]) -> Vec<FaceInput> {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    vec![
        // bottom, -Z
        vec![[x0, y0, z0], [x0, y1, z0], [x1, y1, z0], [x1, y0, z0]],
        // top, +Z
        vec![[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]],
        // front, -Y
        vec![[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]],
        // back, +Y
        vec![[x0, y1, z0], [x0, y1, z1], [x1, y1, z1], [x1, y1, z0]],
        // left, -X
        vec![[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]],
        // right, +X
        vec![[x1, y0, z0], [x1, y1, z0], [x1, y1, z1], [x1, y0, z1]],
    ]
    .into_iter()
    .map(FaceInput::new)
    .collect()
}

/// Assembles foams from face loops.
#[derive(Debug, Clone)]
pub struct FoamBuilder {
    id: String,
    point_collapse_limit: f64,
    planarity_tolerance: Option<f64>,
}

/// A face after vertex merging: merged point indices plus its origin.
struct MergedFace {
    cell: usize,
    input: usize,
    loop_: Vec<usize>,
}

/// A geometric face: the positive half's loop and the cells on each side.
struct GeoFace {
    loop_: Vec<usize>,
    positive: usize,
    negative: Option<usize>,
}

impl FoamBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            point_collapse_limit: DEFAULT_POINT_COLLAPSE_LIMIT,
            planarity_tolerance: None,
        }
    }

    /// A builder using the tolerances of `config`.
    pub fn from_config(id: impl Into<String>, config: &SolverConfig) -> Self {
        Self {
            id: id.into(),
            point_collapse_limit: config.point_collapse_limit,
            planarity_tolerance: config.planarity_tolerance,
        }
    }

    pub fn with_point_collapse_limit(mut self, limit: f64) -> Self {
        self.point_collapse_limit = limit;
        self
    }

    pub fn with_planarity_tolerance(mut self, tolerance: f64) -> Self {
        self.planarity_tolerance = Some(tolerance);
        self
    }

    /// The merge distance. Zero merges exact duplicates only.
    fn collapse_limit(&self) -> Result<f64> {
        let limit = self.point_collapse_limit;
        if !limit.is_finite() || limit < 0.0 {
            return Err(Error::Malformed(format!("point collapse limit {limit} is not a distance")));
        }
        Ok(limit)
    }

    /// Builds a foam from a flat face list.
    ///
    /// Faces are grouped into cells by connected components of shared edges,
    /// so each closed shell in the input becomes one cell. Cells that share a
    /// wall must be given through [`build_cells`](Self::build_cells).
    pub fn build_faces(&self, faces: &[FaceInput]) -> Result<Foam> {
        if faces.is_empty() {
            return Err(Error::EmptyFoam);
        }
        check_finite(std::iter::once((0, faces)))?;
        let tolerance = self.collapse_limit()?;

        let mut index = SpatialIndex::new(tolerance);
        let loops: Vec<Vec<usize>> = faces
            .iter()
            .map(|face| {
                let merged: Vec<usize> = face
                    .points
                    .iter()
                    .map(|p| index.find_or_insert(point(p), tolerance).0)
                    .collect();
                dedupe_loop(merged)
            })
            .collect();

        let mut components = UnionFind::new(faces.len());
        let mut edge_owner: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        for (fi, l) in loops.iter().enumerate() {
            if l.len() < 3 {
                continue;
            }
            for (a, b) in loop_edges(l) {
                let key = (a.min(b), a.max(b));
                match edge_owner.get(&key) {
                    Some(&other) => components.union(fi, other),
                    None => {
                        edge_owner.insert(key, fi);
                    }
                }
            }
        }

        let mut groups: Vec<CellInput> = Vec::new();
        let mut group_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        for (fi, face) in faces.iter().enumerate() {
            if loops[fi].len() < 3 {
                tracing::warn!(face = fi, "Dropped face collapsed below 3 vertices");
                continue;
            }
            let root = components.find(fi);
            let g = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(CellInput::default());
                groups.len() - 1
            });
            groups[g].faces.push(face.clone());
        }

        tracing::debug!(
            foam = %self.id,
            faces = faces.len(),
            cells = groups.len(),
            "Grouped flat face list into cells"
        );
        self.build_cells(&groups)
    }

    /// Builds a foam from faces pre-grouped per cell.
    pub fn build_cells(&self, cells: &[CellInput]) -> Result<Foam> {
        if cells.is_empty() {
            return Err(Error::EmptyFoam);
        }
        check_finite(cells.iter().map(|c| c.faces.as_slice()).enumerate())?;

        // Merge positions.
        let tolerance = self.collapse_limit()?;
        let mut index = SpatialIndex::new(tolerance);
        let mut external_ids: Vec<Option<String>> = Vec::new();
        let mut merged: Vec<MergedFace> = Vec::new();

        for (ci, cell) in cells.iter().enumerate() {
            for (fi, face) in cell.faces.iter().enumerate() {
                let mut loop_ = Vec::with_capacity(face.points.len());
                for (k, p) in face.points.iter().enumerate() {
                    let (i, inserted) = index.find_or_insert(point(p), tolerance);
                    if inserted {
                        external_ids.push(None);
                    }
                    let incoming = face.external_ids.as_ref().and_then(|ids| ids.get(k));
                    if let Some(incoming) = incoming {
                        match &external_ids[i] {
                            None => external_ids[i] = Some(incoming.clone()),
                            Some(existing) if existing != incoming => {
                                tracing::warn!(
                                    kept = %existing,
                                    dropped = %incoming,
                                    "Merged vertices carry different external ids"
                                );
                            }
                            Some(_) => {}
                        }
                    }
                    loop_.push(i);
                }

                let loop_ = dedupe_loop(loop_);
                if loop_.len() < 3 {
                    tracing::warn!(cell = ci, face = fi, "Dropped face collapsed below 3 vertices");
                    continue;
                }

                let points: Vec<Point3<f64>> = loop_.iter().map(|&i| index.points()[i]).collect();
                let plane = fit_plane(&points).ok_or(Error::DegenerateFace { cell: ci, face: fi })?;
                if let Some(tol) = face.planarity_tolerance.or(self.planarity_tolerance) {
                    let deviation = plane_deviation(&plane, &points);
                    if deviation > tol {
                        return Err(Error::NotPlanar {
                            cell: ci,
                            face: fi,
                            deviation,
                            tolerance: tol,
                        });
                    }
                }

                merged.push(MergedFace {
                    cell: ci,
                    input: fi,
                    loop_,
                });
            }
        }

        // Per-cell face lists, then outward orientation.
        let mut by_cell: Vec<Vec<usize>> = vec![Vec::new(); cells.len()];
        for (m, face) in merged.iter().enumerate() {
            by_cell[face.cell].push(m);
        }
        for (ci, faces) in by_cell.iter().enumerate() {
            if faces.len() < 3 {
                return Err(Error::InsufficientFaces {
                    cell: ci,
                    faces: faces.len(),
                });
            }
            orient_cell(&mut merged, faces, index.points());
        }

        // Geometric faces: the first claimant owns the positive half.
        let mut geo_faces: Vec<GeoFace> = Vec::new();
        let mut by_vertex_set: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
        let mut half_of: Vec<FaceId> = vec![FaceId::NONE; merged.len()];
        for (m, face) in merged.iter().enumerate() {
            let mut key = face.loop_.clone();
            key.sort_unstable();
            match by_vertex_set.get(&key) {
                None => {
                    geo_faces.push(GeoFace {
                        loop_: face.loop_.clone(),
                        positive: face.cell,
                        negative: None,
                    });
                    by_vertex_set.insert(key, geo_faces.len() - 1);
                    half_of[m] = FaceId(geo_faces.len() as i64);
                }
                Some(&g) => {
                    let geo = &mut geo_faces[g];
                    if geo.negative.is_some() {
                        return Err(Error::OverSharedFace {
                            cell: face.cell,
                            face: face.input,
                        });
                    }
                    if geo.positive == face.cell {
                        return Err(Error::Malformed(format!(
                            "cell {} lists face {} twice",
                            face.cell, face.input
                        )));
                    }
                    geo.negative = Some(face.cell);
                    half_of[m] = FaceId(-(g as i64 + 1));
                }
            }
        }

        // Half-face loops in insertion order: +1, -1, +2, -2, ...
        let mut half_faces: Vec<(FaceId, Vec<usize>, Option<usize>)> =
            Vec::with_capacity(geo_faces.len() * 2);
        for (g, geo) in geo_faces.iter().enumerate() {
            let k = g as i64 + 1;
            half_faces.push((FaceId(k), geo.loop_.clone(), Some(geo.positive)));
            let mut reversed = geo.loop_.clone();
            reversed.reverse();
            half_faces.push((FaceId(-k), reversed, geo.negative));
        }

        // Half-edges: the first traversal seen becomes the positive half.
        let mut directed: FxHashMap<(usize, usize), EdgeId> = FxHashMap::default();
        let mut geo_edges: Vec<(usize, usize)> = Vec::new();
        let mut face_edges: Vec<Vec<EdgeId>> = Vec::with_capacity(half_faces.len());
        for (_, loop_, _) in &half_faces {
            let mut edges = Vec::with_capacity(loop_.len());
            for (a, b) in loop_edges(loop_) {
                let id = match directed.get(&(a, b)) {
                    Some(&id) => id,
                    None => {
                        geo_edges.push((a, b));
                        let id = EdgeId(geo_edges.len() as i64);
                        directed.insert((a, b), id);
                        directed.insert((b, a), id.pair());
                        id
                    }
                };
                edges.push(id);
            }
            face_edges.push(edges);
        }

        // Vertex Ids in order of first use by a surviving face.
        let mut vertex_id: Vec<VertexId> = vec![VertexId::NONE; index.len()];
        let mut used: Vec<usize> = Vec::new();
        for (_, loop_, _) in &half_faces {
            for &i in loop_ {
                if vertex_id[i].is_none() {
                    used.push(i);
                    vertex_id[i] = VertexId(used.len() as i64);
                }
            }
        }
        let cell_id = |ci: usize| CellId(ci as i64 + 1);

        let mut foam = Foam::new(self.id.clone());

        for &i in &used {
            let mut vertex = Vertex::new(vertex_id[i], index.points()[i]);
            vertex.external_id = external_ids[i].clone();
            foam.insert_vertex(vertex)?;
        }

        for (k, &(a, b)) in geo_edges.iter().enumerate() {
            let id = EdgeId(k as i64 + 1);
            foam.insert_edge(Edge::new(id, vertex_id[a], vertex_id[b]))?;
            foam.insert_edge(Edge::new(id.pair(), vertex_id[b], vertex_id[a]))?;
        }

        for ((id, loop_, owner), edges) in half_faces.iter().zip(&face_edges) {
            let vertices: Vec<VertexId> = loop_.iter().map(|&i| vertex_id[i]).collect();
            let owner = owner.map(cell_id).unwrap_or(CellId::NONE);
            foam.insert_face(Face::new(*id, vertices, edges.clone(), owner))?;
        }

        for ci in 0..cells.len() {
            foam.insert_cell(Cell::new(cell_id(ci)))?;
        }

        link_memberships(&mut foam, &by_cell, &half_of);

        foam.update_derived();
        foam.classify_boundary();

        tracing::debug!(
            foam = %foam.id,
            vertices = foam.vertex_count(),
            edges = foam.edge_count(),
            faces = foam.face_count(),
            cells = foam.cell_count(),
            boundary_faces = foam.ext_faces.len(),
            "Assembled foam"
        );
        Ok(foam)
    }
}

fn point(p: &[f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}

fn check_finite<'a>(cells: impl Iterator<Item = (usize, &'a [FaceInput])>) -> Result<()> {
    for (ci, faces) in cells {
        for (fi, face) in faces.iter().enumerate() {
            if face.points.iter().flatten().any(|c| !c.is_finite()) {
                return Err(Error::NonFinite(format!("face {fi} of cell {ci}")));
            }
        }
    }
    Ok(())
}

/// Removes consecutive repeats, including the wrap-around pair.
fn dedupe_loop(mut loop_: Vec<usize>) -> Vec<usize> {
    loop_.dedup();
    while loop_.len() > 1 && loop_.first() == loop_.last() {
        loop_.pop();
    }
    loop_
}

fn loop_edges(loop_: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let n = loop_.len();
    (0..n).map(move |i| (loop_[i], loop_[(i + 1) % n]))
}

/// Makes the windings of one cell's faces agree, then turns them outward.
///
/// Two faces sharing an edge are consistent when they traverse it in
/// opposite directions. Consistency is propagated breadth-first from the
/// first face of each edge-connected component; the signed volume then
/// decides the global sign.
fn orient_cell(merged: &mut [MergedFace], faces: &[usize], points: &[Point3<f64>]) {
    // Undirected edge -> (local face, traversed low-to-high).
    let mut incident: FxHashMap<(usize, usize), Vec<(usize, bool)>> = FxHashMap::default();
    for (local, &m) in faces.iter().enumerate() {
        for (a, b) in loop_edges(&merged[m].loop_) {
            incident
                .entry((a.min(b), a.max(b)))
                .or_default()
                .push((local, a < b));
        }
    }

    let mut flip: Vec<Option<bool>> = vec![None; faces.len()];
    let mut queue = VecDeque::new();
    for seed in 0..faces.len() {
        if flip[seed].is_some() {
            continue;
        }
        flip[seed] = Some(false);
        queue.push_back(seed);

        while let Some(i) = queue.pop_front() {
            let s_i = flip[i].unwrap_or(false);
            for (a, b) in loop_edges(&merged[faces[i]].loop_) {
                let d_i = a < b;
                let Some(neighbours) = incident.get(&(a.min(b), a.max(b))) else {
                    continue;
                };
                for &(j, d_j) in neighbours {
                    if j == i {
                        continue;
                    }
                    let s_j = d_j ^ d_i ^ s_i ^ true;
                    match flip[j] {
                        None => {
                            flip[j] = Some(s_j);
                            queue.push_back(j);
                        }
                        Some(existing) if existing != s_j => {
                            tracing::warn!(
                                cell = merged[faces[j]].cell,
                                face = merged[faces[j]].input,
                                "Cell faces cannot be oriented consistently"
                            );
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    for (local, &m) in faces.iter().enumerate() {
        if flip[local] == Some(true) {
            merged[m].loop_.reverse();
        }
    }

    // Signed volume about the cell's vertex mean.
    let all: Vec<Point3<f64>> = faces
        .iter()
        .flat_map(|&m| merged[m].loop_.iter().map(|&i| points[i]))
        .collect();
    let Some(center) = crate::geometry::mean_point(&all) else {
        return;
    };
    let mut volume = 0.0;
    for &m in faces {
        let l = &merged[m].loop_;
        let p0 = points[l[0]] - center;
        for w in l[1..].windows(2) {
            let p1 = points[w[0]] - center;
            let p2 = points[w[1]] - center;
            volume += p0.dot(&p1.cross(&p2));
        }
    }
    if volume < 0.0 {
        for &m in faces {
            merged[m].loop_.reverse();
        }
    }
}

/// Fills in every adjacency list from the face loops.
fn link_memberships(foam: &mut Foam, by_cell: &[Vec<usize>], half_of: &[FaceId]) {
    let mut vertex_edges: FxHashMap<VertexId, Vec<EdgeId>> = FxHashMap::default();
    for edge in foam.edges() {
        vertex_edges.entry(edge.start()).or_default().push(edge.id);
    }

    let mut vertex_faces: FxHashMap<VertexId, Vec<FaceId>> = FxHashMap::default();
    let mut vertex_cells: FxHashMap<VertexId, Vec<CellId>> = FxHashMap::default();
    let mut edge_faces: FxHashMap<EdgeId, Vec<FaceId>> = FxHashMap::default();
    for face in foam.faces() {
        for &v in &face.vertices {
            vertex_faces.entry(v).or_default().push(face.id);
            if face.cell.is_some() {
                let cells = vertex_cells.entry(v).or_default();
                if !cells.contains(&face.cell) {
                    cells.push(face.cell);
                }
            }
        }
        for &e in &face.edges {
            edge_faces.entry(e).or_default().push(face.id);
        }
    }

    let mut cell_members: Vec<(CellId, Vec<FaceId>, Vec<VertexId>, Vec<EdgeId>)> = Vec::new();
    for (ci, faces) in by_cell.iter().enumerate() {
        let face_ids: Vec<FaceId> = faces.iter().map(|&m| half_of[m]).collect();
        let mut vertices = Vec::new();
        let mut edges = Vec::new();
        for &f in &face_ids {
            if let Some(face) = foam.face(f) {
                for &v in &face.vertices {
                    if !vertices.contains(&v) {
                        vertices.push(v);
                    }
                }
                for &e in &face.edges {
                    if !edges.contains(&e) {
                        edges.push(e);
                    }
                }
            }
        }
        cell_members.push((CellId(ci as i64 + 1), face_ids, vertices, edges));
    }

    for vertex in foam.vertices_mut() {
        vertex.edges = vertex_edges.remove(&vertex.id).unwrap_or_default();
        vertex.faces = vertex_faces.remove(&vertex.id).unwrap_or_default();
        vertex.cells = vertex_cells.remove(&vertex.id).unwrap_or_default();
    }
    for edge in foam.edges_mut() {
        edge.faces = edge_faces.remove(&edge.id).unwrap_or_default();
    }
    for (id, faces, vertices, edges) in cell_members {
        if let Some(cell) = foam.cell_mut(id) {
            cell.faces = faces;
            cell.vertices = vertices;
            cell.edges = edges;
        }
    }
}

/// Disjoint-set forest over face indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller root so groups follow input order.
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{adjacent_boxes, tetrahedron_faces, unit_cube_faces};
    use approx::assert_relative_eq;

    #[test]
    fn unit_cube() {
        let foam = FoamBuilder::new("cube").build_faces(&unit_cube_faces()).unwrap();
        assert_eq!(foam.vertex_count(), 8);
        assert_eq!(foam.edge_count(), 12);
        assert_eq!(foam.face_count(), 6);
        assert_eq!(foam.cell_count(), 1);
        foam.validate().unwrap();

        // Every boundary half-face pairs with an exterior half.
        for face in foam.primary_faces() {
            assert_eq!(face.cell, CellId(1));
            assert!(foam.face(face.pair).unwrap().cell.is_none());
        }
        // Each half-edge of a closed cube is used by exactly one half-face of
        // the cell and one of the exterior.
        for edge in foam.edges() {
            assert_eq!(edge.faces.len(), 2);
        }
        for vertex in foam.vertices() {
            assert_eq!(vertex.edges.len(), 3);
            assert_eq!(vertex.cells, vec![CellId(1)]);
        }
    }

    #[test]
    fn inward_input_is_turned_outward() {
        let faces: Vec<FaceInput> = unit_cube_faces()
            .into_iter()
            .map(|mut f| {
                f.points.reverse();
                f
            })
            .collect();
        let foam = FoamBuilder::new("cube").build_faces(&faces).unwrap();
        assert_relative_eq!(foam.cell_volume(CellId(1)).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mixed_winding_is_made_consistent() {
        let mut faces = unit_cube_faces();
        faces[1].points.reverse();
        faces[4].points.reverse();
        let foam = FoamBuilder::new("cube").build_faces(&faces).unwrap();
        assert_relative_eq!(foam.cell_volume(CellId(1)).unwrap(), 1.0, epsilon = 1e-12);
        for face in foam.faces().filter(|f| f.cell.is_some()) {
            let outward = face.centroid - Point3::new(0.5, 0.5, 0.5);
            assert!(face.normal.dot(&outward) > 0.0, "face {} points inward", face.id);
        }
    }

    #[test]
    fn adjacent_boxes_share_one_face() {
        let foam = FoamBuilder::new("rooms").build_cells(&adjacent_boxes()).unwrap();
        assert_eq!(foam.vertex_count(), 12);
        assert_eq!(foam.edge_count(), 20);
        assert_eq!(foam.face_count(), 11);
        assert_eq!(foam.cell_count(), 2);
        foam.validate().unwrap();

        let shared: Vec<_> = foam
            .primary_faces()
            .filter(|f| foam.face(f.pair).unwrap().cell.is_some())
            .collect();
        assert_eq!(shared.len(), 1);
        let wall = shared[0];
        assert_eq!(wall.cell, CellId(1));
        assert_eq!(foam.face(wall.pair).unwrap().cell, CellId(2));
        assert_eq!(foam.ext_faces.len(), 10);
        assert_eq!(foam.ext_vertices.len(), 12);
        assert_relative_eq!(foam.cell_volume(CellId(2)).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn near_points_collapse() {
        let mut faces = unit_cube_faces();
        faces[1].points[0][0] += 1e-5;
        let foam = FoamBuilder::new("cube")
            .with_point_collapse_limit(1e-3)
            .build_faces(&faces)
            .unwrap();
        assert_eq!(foam.vertex_count(), 8);
    }

    #[test]
    fn zero_collapse_limit_merges_exact_duplicates() {
        let foam = FoamBuilder::new("cube")
            .with_point_collapse_limit(0.0)
            .build_faces(&unit_cube_faces())
            .unwrap();
        assert_eq!(foam.vertex_count(), 8);
        assert_eq!(foam.cell_count(), 1);
    }

    #[test]
    fn invalid_collapse_limit_is_rejected() {
        for limit in [-1e-3, f64::NAN, f64::INFINITY] {
            let result = FoamBuilder::new("cube")
                .with_point_collapse_limit(limit)
                .build_faces(&unit_cube_faces());
            assert!(matches!(result, Err(Error::Malformed(_))), "limit {limit}");
        }
    }

    #[test]
    fn far_from_origin_box_assembles() {
        let foam = FoamBuilder::new("far")
            .build_faces(&box_faces([1e16, 0.0, 0.0], [1e16 + 4.0, 1.0, 1.0]))
            .unwrap();
        assert_eq!(foam.vertex_count(), 8);
        assert_eq!(foam.cell_count(), 1);
    }

    #[test]
    fn collapsed_face_is_dropped() {
        // A sliver triangle whose two corners merge is dropped; the rest of
        // the tetrahedron still forms a cell.
        let mut faces = tetrahedron_faces();
        faces.push(FaceInput::new(vec![
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1e-6],
            [1.0, 0.0, 0.0],
        ]));
        let foam = FoamBuilder::new("tet").build_faces(&faces).unwrap();
        assert_eq!(foam.face_count(), 4);
    }

    #[test]
    fn non_planar_face_is_rejected() {
        let mut faces = unit_cube_faces();
        faces[1].points[0][2] += 0.1;
        let err = FoamBuilder::new("cube")
            .with_planarity_tolerance(1e-3)
            .build_faces(&faces)
            .unwrap_err();
        assert!(matches!(err, Error::NotPlanar { face: 1, .. }));

        // A per-face tolerance overrides the builder's.
        faces[1].planarity_tolerance = Some(0.5);
        assert!(FoamBuilder::new("cube")
            .with_planarity_tolerance(1e-3)
            .build_faces(&faces)
            .is_ok());
    }

    #[test]
    fn too_few_faces() {
        let cube = unit_cube_faces();
        let faces = vec![cube[0].clone(), cube[2].clone()];
        let err = FoamBuilder::new("open").build_faces(&faces).unwrap_err();
        assert!(matches!(err, Error::InsufficientFaces { faces: 2, .. }));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(
            FoamBuilder::new("x").build_cells(&[]),
            Err(Error::EmptyFoam)
        ));
    }

    #[test]
    fn non_finite_input() {
        let mut faces = unit_cube_faces();
        faces[3].points[2][1] = f64::NAN;
        assert!(matches!(
            FoamBuilder::new("x").build_faces(&faces),
            Err(Error::NonFinite(_))
        ));
    }

    #[test]
    fn collinear_face_is_degenerate() {
        let mut faces = tetrahedron_faces();
        faces.push(FaceInput::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]));
        assert!(matches!(
            FoamBuilder::new("x").build_faces(&faces),
            Err(Error::DegenerateFace { .. })
        ));
    }

    #[test]
    fn third_claimant_is_rejected() {
        let mut cells = adjacent_boxes();
        let wall = cells[0].faces[5].clone();
        let mut third = tetrahedron_faces();
        third.push(wall);
        cells.push(CellInput::new(third));
        assert!(matches!(
            FoamBuilder::new("x").build_cells(&cells),
            Err(Error::OverSharedFace { cell: 2, .. })
        ));
    }

    #[test]
    fn flat_list_splits_disjoint_shells() {
        let mut faces = box_faces([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        faces.extend(box_faces([5.0, 0.0, 0.0], [6.0, 1.0, 1.0]));
        let foam = FoamBuilder::new("two").build_faces(&faces).unwrap();
        assert_eq!(foam.cell_count(), 2);
        assert_eq!(foam.vertex_count(), 16);
    }

    #[test]
    fn external_ids_follow_merged_vertices() {
        let faces: Vec<FaceInput> = unit_cube_faces()
            .into_iter()
            .map(|f| {
                let ids = f
                    .points
                    .iter()
                    .map(|p| format!("{}{}{}", p[0], p[1], p[2]))
                    .collect();
                f.with_external_ids(ids)
            })
            .collect();
        let foam = FoamBuilder::new("cube").build_faces(&faces).unwrap();
        for v in foam.vertices() {
            let p = v.position;
            assert_eq!(v.external_id.as_deref(), Some(format!("{}{}{}", p.x, p.y, p.z).as_str()));
        }
    }
}
