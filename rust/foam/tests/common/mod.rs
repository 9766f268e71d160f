// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use foamframe::{
    box_faces, connect_duals, CellInput, DualRef, EdgeId, FaceId, FaceInput, Foam, FoamBuilder,
    VertexId,
};
use nalgebra::{Point3, Vector3};

pub fn unit_cube(id: &str) -> Foam {
    FoamBuilder::new(id)
        .build_faces(&box_faces([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]))
        .unwrap()
}

pub fn adjacent_boxes() -> Foam {
    FoamBuilder::new("boxes")
        .build_cells(&[
            CellInput::new(box_faces([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
            CellInput::new(box_faces([1.0, 0.0, 0.0], [2.0, 1.0, 1.0])),
        ])
        .unwrap()
}

/// Unit tetrahedron whose apex sits 0.1 above its rest position.
pub fn perturbed_tetrahedron() -> Foam {
    let o = [0.0, 0.0, 0.0];
    let x = [1.0, 0.0, 0.0];
    let y = [0.0, 1.0, 0.0];
    let z = [0.0, 0.0, 1.0 + 0.1];
    FoamBuilder::new("tet")
        .build_faces(&[
            FaceInput::new(vec![o, y, x]),
            FaceInput::new(vec![o, x, z]),
            FaceInput::new(vec![o, z, y]),
            FaceInput::new(vec![x, y, z]),
        ])
        .unwrap()
}

/// A unit cube whose (1, 1, 1) corner is pushed off its three faces.
pub fn warped_cube() -> Foam {
    let mut foam = unit_cube("warped");
    let corner = vertex_at(&foam, Point3::new(1.0, 1.0, 1.0));
    foam.vertex_mut(corner).unwrap().position = Point3::new(1.1, 1.05, 1.15);
    foam.update_derived();
    foam
}

/// A grid of unit boxes with every vertex nudged by up to `amplitude` along
/// each axis. The offsets are a fixed function of position and `seed`.
pub fn jittered_grid(size: [usize; 3], amplitude: f64, seed: f64) -> Foam {
    let mut cells = Vec::new();
    for i in 0..size[0] {
        for j in 0..size[1] {
            for k in 0..size[2] {
                let min = [i as f64, j as f64, k as f64];
                let max = [min[0] + 1.0, min[1] + 1.0, min[2] + 1.0];
                cells.push(CellInput::new(box_faces(min, max)));
            }
        }
    }
    let mut foam = FoamBuilder::new("grid").build_cells(&cells).unwrap();
    for v in foam.vertices_mut() {
        let p = v.position;
        v.position += Vector3::new(
            (p.x * 12.9898 + p.y * 78.233 + seed).sin(),
            (p.y * 39.3468 + p.z * 11.135 + seed).sin(),
            (p.z * 73.156 + p.x * 52.235 + seed).sin(),
        ) * amplitude;
    }
    foam.update_derived();
    foam
}

pub fn vertex_at(foam: &Foam, p: Point3<f64>) -> VertexId {
    foam.vertices().find(|v| v.position == p).map(|v| v.id).unwrap()
}

pub fn positions(foam: &Foam) -> Vec<(VertexId, Point3<f64>)> {
    let mut all: Vec<_> = foam.vertices().map(|v| (v.id, v.position)).collect();
    all.sort_by_key(|(id, _)| *id);
    all
}

/// Marks half-edge `e` (and its pair) as dual to half-face `f` (and its pair).
pub fn link_edge_to_face(primal: &mut Foam, dual: &mut Foam, e: EdgeId, f: FaceId) {
    primal.edge_mut(e).unwrap().dual = DualRef::Pending(f);
    primal.edge_mut(e.pair()).unwrap().dual = DualRef::Pending(f.pair());
    dual.face_mut(f).unwrap().dual = DualRef::Pending(e);
    dual.face_mut(f.pair()).unwrap().dual = DualRef::Pending(e.pair());
}

/// Two unit cubes where the three edges at the primal (1, 1, 1) corner are
/// linked to the dual faces they cross at right angles. Not yet connected.
pub fn corner_pair() -> (Foam, Foam, VertexId) {
    let mut primal = unit_cube("primal");
    let mut dual = unit_cube("dual");
    primal.dual = Some("dual".into());
    dual.dual = Some("primal".into());

    let corner = vertex_at(&primal, Point3::new(1.0, 1.0, 1.0));
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
        link_edge_to_face(&mut primal, &mut dual, e, f);
    }
    (primal, dual, corner)
}

/// [`corner_pair`] with the corner pulled aside, then connected.
pub fn skewed_corner_pair() -> (Foam, Foam, VertexId) {
    let (mut primal, mut dual, corner) = corner_pair();
    primal.vertex_mut(corner).unwrap().position = Point3::new(1.1, 1.05, 1.0);
    primal.update_derived();
    connect_duals(&mut primal, &mut dual).unwrap();
    (primal, dual, corner)
}
