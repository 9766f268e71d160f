// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for foams.
//!
//! The record is keyed by entity Id: `Vertices`, `Edges`, `Faces` and `Cells`
//! map decimal-string Ids to entity records whose cross references are plain
//! integers, with `0` as the sentinel. Field names are PascalCase. Dual
//! references come back as pending and must be linked with
//! [`connect_duals`](crate::dual::connect_duals) before use.

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constraints::Restriction;
use crate::entities::{Cell, Edge, Face, Vertex, DEFAULT_INFLUENCE};
use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::keys::*;

/// Serializable representation of a whole foam.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FoamRecord {
    pub id: String,
    pub vertices: BTreeMap<String, VertexRecord>,
    pub edges: BTreeMap<String, EdgeRecord>,
    pub faces: BTreeMap<String, FaceRecord>,
    pub cells: BTreeMap<String, CellRecord>,
    pub ext_vertices: Vec<VertexId>,
    pub ext_edges: Vec<EdgeId>,
    pub ext_faces: Vec<FaceId>,
    pub centroid: XyzRecord,
    /// Partner foam Id, empty when none.
    pub dual: String,
    pub max_deviation: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct XyzRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Point3<f64>> for XyzRecord {
    fn from(p: Point3<f64>) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

impl From<Vector3<f64>> for XyzRecord {
    fn from(v: Vector3<f64>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl XyzRecord {
    fn point(self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    fn vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind", rename_all_fields = "PascalCase")]
pub enum RestrictionRecord {
    Point { point: XyzRecord },
    Line { origin: XyzRecord, direction: XyzRecord },
    Plane { origin: XyzRecord, normal: XyzRecord },
    Sphere { center: XyzRecord, radius: f64 },
}

impl From<&Restriction> for RestrictionRecord {
    fn from(r: &Restriction) -> Self {
        match *r {
            Restriction::Point(p) => Self::Point { point: p.into() },
            Restriction::Line { origin, direction } => Self::Line {
                origin: origin.into(),
                direction: direction.into(),
            },
            Restriction::Plane { origin, normal } => Self::Plane {
                origin: origin.into(),
                normal: normal.into(),
            },
            Restriction::Sphere { center, radius } => Self::Sphere {
                center: center.into(),
                radius,
            },
        }
    }
}

impl From<RestrictionRecord> for Restriction {
    fn from(r: RestrictionRecord) -> Self {
        match r {
            RestrictionRecord::Point { point } => Restriction::Point(point.point()),
            RestrictionRecord::Line { origin, direction } => Restriction::Line {
                origin: origin.point(),
                direction: direction.vector(),
            },
            RestrictionRecord::Plane { origin, normal } => Restriction::Plane {
                origin: origin.point(),
                normal: normal.vector(),
            },
            RestrictionRecord::Sphere { center, radius } => Restriction::Sphere {
                center: center.point(),
                radius,
            },
        }
    }
}

fn default_influence() -> f64 {
    DEFAULT_INFLUENCE
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VertexRecord {
    pub id: VertexId,
    pub position: XyzRecord,
    pub external: bool,
    pub fixed: bool,
    pub on_geo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restriction: Option<RestrictionRecord>,
    #[serde(default = "default_influence")]
    pub influence_coef: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub edges: Vec<EdgeId>,
    pub faces: Vec<FaceId>,
    pub cells: Vec<CellId>,
    pub dual: CellId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub vertices: [VertexId; 2],
    pub pair: EdgeId,
    pub faces: Vec<FaceId>,
    pub face_angles: Vec<f64>,
    pub dual: FaceId,
    pub target_length: Option<f64>,
    pub min_length: f64,
    pub max_length: Option<f64>,
    #[serde(default = "default_influence")]
    pub influence_coef: f64,
    pub deviation: f64,
    pub length: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FaceRecord {
    pub id: FaceId,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub pair: FaceId,
    pub cell: CellId,
    pub normal: XyzRecord,
    pub centroid: XyzRecord,
    pub area: f64,
    pub deviation: f64,
    pub dual: EdgeId,
    pub target_area: Option<f64>,
    #[serde(default = "default_influence")]
    pub influence_coef: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CellRecord {
    pub id: CellId,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub faces: Vec<FaceId>,
    pub centroid: XyzRecord,
    pub exterior: bool,
    pub dual: Vec<VertexId>,
}

/// `0` on the wire, `Unset` in memory.
fn dual_to_wire<T: Copy + Default>(r: &DualRef<T>) -> T {
    r.id().unwrap_or_default()
}

fn dual_from_wire<T: Copy>(id: T, is_none: bool) -> DualRef<T> {
    if is_none {
        DualRef::Unset
    } else {
        DualRef::Pending(id)
    }
}

/// Checks a map key against the record's own Id and returns the Id to use.
///
/// A record without an Id takes the key's.
fn resolve_key(kind: EntityKind, key: &str, record_id: i64) -> Result<i64> {
    let parsed: i64 = key
        .trim()
        .parse()
        .map_err(|_| Error::Malformed(format!("{kind} key '{key}' is not an integer")))?;
    if record_id != 0 && record_id != parsed {
        return Err(Error::Malformed(format!(
            "{kind} record under key '{key}' has Id {record_id}"
        )));
    }
    Ok(parsed)
}

/// Sorts records so `k` comes right before `-k`, matching assembly order.
fn by_half_order<R>(mut records: Vec<(i64, R)>) -> Vec<(i64, R)> {
    records.sort_by_key(|(id, _)| (id.unsigned_abs(), *id < 0));
    records
}

impl Foam {
    /// Serializes the foam to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_record())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Reads a foam from JSON.
    ///
    /// An empty document or `null` yields an empty foam. The result is
    /// validated; dual references are left pending.
    pub fn from_json(json: &str) -> Result<Foam> {
        if json.trim().is_empty() {
            return Ok(Foam::default());
        }
        let record: Option<FoamRecord> =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        match record {
            Some(record) => Foam::from_record(record),
            None => Ok(Foam::default()),
        }
    }

    /// Creates a serializable record of the foam.
    pub fn to_record(&self) -> FoamRecord {
        let vertices = self
            .vertices()
            .map(|v| {
                let record = VertexRecord {
                    id: v.id,
                    position: v.position.into(),
                    external: v.external,
                    fixed: v.fixed,
                    on_geo: v.on_geo,
                    restriction: v.restriction.as_ref().map(RestrictionRecord::from),
                    influence_coef: v.influence_coef,
                    external_id: v.external_id.clone(),
                    edges: v.edges.clone(),
                    faces: v.faces.clone(),
                    cells: v.cells.clone(),
                    dual: dual_to_wire(&v.dual),
                };
                (v.id.to_string(), record)
            })
            .collect();

        let edges = self
            .edges()
            .map(|e| {
                let record = EdgeRecord {
                    id: e.id,
                    vertices: e.vertices,
                    pair: e.pair,
                    faces: e.faces.clone(),
                    face_angles: e.face_angles.clone(),
                    dual: dual_to_wire(&e.dual),
                    target_length: e.target_length,
                    min_length: e.min_length,
                    max_length: e.max_length,
                    influence_coef: e.influence_coef,
                    deviation: e.deviation,
                    length: e.length,
                };
                (e.id.to_string(), record)
            })
            .collect();

        let faces = self
            .faces()
            .map(|f| {
                let record = FaceRecord {
                    id: f.id,
                    vertices: f.vertices.clone(),
                    edges: f.edges.clone(),
                    pair: f.pair,
                    cell: f.cell,
                    normal: f.normal.into(),
                    centroid: f.centroid.into(),
                    area: f.area,
                    deviation: f.deviation,
                    dual: dual_to_wire(&f.dual),
                    target_area: f.target_area,
                    influence_coef: f.influence_coef,
                };
                (f.id.to_string(), record)
            })
            .collect();

        let cells = self
            .cells()
            .map(|c| {
                let record = CellRecord {
                    id: c.id,
                    vertices: c.vertices.clone(),
                    edges: c.edges.clone(),
                    faces: c.faces.clone(),
                    centroid: c.centroid.into(),
                    exterior: c.exterior,
                    dual: c.dual.iter().map(dual_to_wire).collect(),
                };
                (c.id.to_string(), record)
            })
            .collect();

        FoamRecord {
            id: self.id.clone(),
            vertices,
            edges,
            faces,
            cells,
            ext_vertices: self.ext_vertices.clone(),
            ext_edges: self.ext_edges.clone(),
            ext_faces: self.ext_faces.clone(),
            centroid: self.centroid.into(),
            dual: self.dual.clone().unwrap_or_default(),
            max_deviation: self.max_deviation,
        }
    }

    /// Rebuilds a foam from its record.
    pub fn from_record(record: FoamRecord) -> Result<Foam> {
        let mut foam = Foam::new(record.id);
        foam.dual = Some(record.dual).filter(|d| !d.is_empty());
        foam.centroid = record.centroid.point();
        foam.max_deviation = record.max_deviation;

        let mut vertices = Vec::with_capacity(record.vertices.len());
        for (key, v) in record.vertices {
            vertices.push((resolve_key(EntityKind::Vertex, &key, v.id.0)?, v));
        }
        for (id, v) in by_half_order(vertices) {
            let mut vertex = Vertex::new(VertexId(id), v.position.point());
            vertex.external = v.external;
            vertex.fixed = v.fixed;
            vertex.on_geo = v.on_geo;
            vertex.restriction = v.restriction.map(Restriction::from);
            vertex.influence_coef = v.influence_coef;
            vertex.external_id = v.external_id;
            vertex.edges = v.edges;
            vertex.faces = v.faces;
            vertex.cells = v.cells;
            vertex.dual = dual_from_wire(v.dual, v.dual.is_none());
            foam.insert_vertex(vertex)?;
        }

        let mut edges = Vec::with_capacity(record.edges.len());
        for (key, e) in record.edges {
            edges.push((resolve_key(EntityKind::Edge, &key, e.id.0)?, e));
        }
        for (id, e) in by_half_order(edges) {
            let mut edge = Edge::new(EdgeId(id), e.vertices[0], e.vertices[1]);
            if e.pair.is_some() {
                edge.pair = e.pair;
            }
            edge.faces = e.faces;
            edge.face_angles = e.face_angles;
            edge.dual = dual_from_wire(e.dual, e.dual.is_none());
            edge.target_length = e.target_length;
            edge.min_length = e.min_length;
            edge.max_length = e.max_length;
            edge.influence_coef = e.influence_coef;
            edge.deviation = e.deviation;
            edge.length = e.length;
            foam.insert_edge(edge)?;
        }

        let mut faces = Vec::with_capacity(record.faces.len());
        for (key, f) in record.faces {
            faces.push((resolve_key(EntityKind::Face, &key, f.id.0)?, f));
        }
        for (id, f) in by_half_order(faces) {
            let mut face = Face::new(FaceId(id), f.vertices, f.edges, f.cell);
            if f.pair.is_some() {
                face.pair = f.pair;
            }
            face.normal = f.normal.vector();
            face.centroid = f.centroid.point();
            face.area = f.area;
            face.deviation = f.deviation;
            face.dual = dual_from_wire(f.dual, f.dual.is_none());
            face.target_area = f.target_area;
            face.influence_coef = f.influence_coef;
            foam.insert_face(face)?;
        }

        let mut cells = Vec::with_capacity(record.cells.len());
        for (key, c) in record.cells {
            cells.push((resolve_key(EntityKind::Cell, &key, c.id.0)?, c));
        }
        for (id, c) in by_half_order(cells) {
            let mut cell = Cell::new(CellId(id));
            cell.vertices = c.vertices;
            cell.edges = c.edges;
            cell.faces = c.faces;
            cell.centroid = c.centroid.point();
            cell.exterior = c.exterior;
            cell.dual = c
                .dual
                .into_iter()
                .map(|v| dual_from_wire(v, v.is_none()))
                .collect();
            foam.insert_cell(cell)?;
        }

        for &v in &record.ext_vertices {
            foam.vertex(v)
                .ok_or(Error::Malformed(format!("ExtVertices lists missing vertex {v}")))?;
        }
        for &e in &record.ext_edges {
            foam.edge(e).ok_or(Error::Malformed(format!("ExtEdges lists missing edge {e}")))?;
        }
        for &f in &record.ext_faces {
            foam.face(f).ok_or(Error::Malformed(format!("ExtFaces lists missing face {f}")))?;
        }
        foam.ext_vertices = record.ext_vertices;
        foam.ext_edges = record.ext_edges;
        foam.ext_faces = record.ext_faces;

        foam.mirror_edge_constraints();
        foam.validate().map_err(|e| Error::Malformed(e.to_string()))?;

        tracing::debug!(
            foam = %foam.id,
            vertices = foam.vertex_count(),
            edges = foam.edge_count(),
            faces = foam.face_count(),
            cells = foam.cell_count(),
            "Read foam record"
        );
        Ok(foam)
    }
}
