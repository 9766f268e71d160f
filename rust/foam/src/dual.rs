// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linking a foam to its reciprocal diagram.
//!
//! Two foams read independently carry only the partner's Ids in their dual
//! references. [`connect_duals`] checks every such reference against the
//! partner foam and, when the whole correspondence is consistent, marks the
//! references and both foams as linked. [`DualPair`] then walks the
//! correspondence in either direction.

use crate::entities::{Cell, Edge, Face, Vertex};
use crate::error::{Error, Result};
use crate::foam::Foam;
use crate::keys::*;

/// Resolves the dual references of two foams into a bidirectional link.
///
/// The foams must name each other as dual. Every reference must point at an
/// existing entity of the partner, and the correspondence must be its own
/// inverse: an edge `e ↦ f` needs `f ↦ e`, a vertex `v ↦ c` needs `v` in
/// `c`'s dual list, and a cell listing `v` needs `v ↦ c`. Any violation is
/// reported before either foam is touched.
pub fn connect_duals(primal: &mut Foam, dual: &mut Foam) -> Result<()> {
    if primal.dual.as_deref() != Some(dual.id.as_str())
        || dual.dual.as_deref() != Some(primal.id.as_str())
    {
        return Err(Error::NotDual {
            primal: primal.id.clone(),
            dual: dual.id.clone(),
        });
    }

    check_references(primal, dual)?;
    check_references(dual, primal)?;

    let linked = link_references(primal) + link_references(dual);
    primal.dual_linked = true;
    dual.dual_linked = true;

    tracing::debug!(
        primal = %primal.id,
        dual = %dual.id,
        references = linked,
        "Linked dual foams"
    );
    Ok(())
}

/// Checks every dual reference of `from` against `to`.
fn check_references(from: &Foam, to: &Foam) -> Result<()> {
    for v in from.vertices() {
        let Some(c) = v.dual.id() else { continue };
        let cell = to.cell(c).ok_or(Error::UnresolvedDual {
            entity: v.id.into(),
            target: c.into(),
        })?;
        if !cell.dual.iter().any(|d| d.id() == Some(v.id)) {
            return Err(Error::DualMismatch {
                entity: v.id.into(),
                target: c.into(),
            });
        }
    }

    for e in from.edges() {
        let Some(f) = e.dual.id() else { continue };
        let face = to.face(f).ok_or(Error::UnresolvedDual {
            entity: e.id.into(),
            target: f.into(),
        })?;
        if face.dual.id() != Some(e.id) {
            return Err(Error::DualMismatch {
                entity: e.id.into(),
                target: f.into(),
            });
        }
    }

    for f in from.faces() {
        let Some(e) = f.dual.id() else { continue };
        let edge = to.edge(e).ok_or(Error::UnresolvedDual {
            entity: f.id.into(),
            target: e.into(),
        })?;
        if edge.dual.id() != Some(f.id) {
            return Err(Error::DualMismatch {
                entity: f.id.into(),
                target: e.into(),
            });
        }
    }

    for c in from.cells() {
        for v in c.dual.iter().filter_map(DualRef::id) {
            let vertex = to.vertex(v).ok_or(Error::UnresolvedDual {
                entity: c.id.into(),
                target: v.into(),
            })?;
            if vertex.dual.id() != Some(c.id) {
                return Err(Error::DualMismatch {
                    entity: c.id.into(),
                    target: v.into(),
                });
            }
        }
    }

    Ok(())
}

/// Promotes every pending reference of a foam. Returns the number promoted.
fn link_references(foam: &mut Foam) -> usize {
    let mut linked = 0;
    for v in foam.vertices_mut() {
        linked += link_one(&mut v.dual);
    }
    for e in foam.edges_mut() {
        linked += link_one(&mut e.dual);
    }
    for f in foam.faces_mut() {
        linked += link_one(&mut f.dual);
    }
    for c in foam.cells.values_mut() {
        for d in &mut c.dual {
            linked += link_one(d);
        }
    }
    linked
}

fn link_one<T: Copy>(r: &mut DualRef<T>) -> usize {
    let pending = r.is_pending();
    r.link();
    usize::from(pending)
}

/// A read-only view over two linked foams.
///
/// Every lookup follows a verified link, so going there and back again lands
/// on the very entity you started from.
#[derive(Debug, Clone, Copy)]
pub struct DualPair<'a> {
    primal: &'a Foam,
    dual: &'a Foam,
}

impl<'a> DualPair<'a> {
    /// Wraps two foams that [`connect_duals`] has linked to each other.
    pub fn new(primal: &'a Foam, dual: &'a Foam) -> Result<Self> {
        if !primal.is_linked_to(dual) {
            return Err(Error::DualNotLinked(primal.id.clone()));
        }
        Ok(Self { primal, dual })
    }

    pub fn primal(&self) -> &'a Foam {
        self.primal
    }

    pub fn dual(&self) -> &'a Foam {
        self.dual
    }

    /// The same pair seen from the dual side.
    pub fn reversed(&self) -> DualPair<'a> {
        DualPair {
            primal: self.dual,
            dual: self.primal,
        }
    }

    /// The dual cell of a primal vertex.
    pub fn vertex_dual(&self, id: VertexId) -> Option<&'a Cell> {
        let c = self.primal.vertex(id)?.dual.linked()?;
        self.dual.cell(c)
    }

    /// The dual vertices of a primal cell, in the order of its faces.
    pub fn cell_dual(&self, id: CellId) -> Option<Vec<&'a Vertex>> {
        let cell = self.primal.cell(id)?;
        Some(
            cell.dual
                .iter()
                .filter_map(DualRef::linked)
                .filter_map(|v| self.dual.vertex(v))
                .collect(),
        )
    }

    /// The dual face of a primal half-edge.
    pub fn edge_dual(&self, id: EdgeId) -> Option<&'a Face> {
        let f = self.primal.edge(id)?.dual.linked()?;
        self.dual.face(f)
    }

    /// The dual half-edge of a primal half-face.
    pub fn face_dual(&self, id: FaceId) -> Option<&'a Edge> {
        let e = self.primal.face(id)?.dual.linked()?;
        self.dual.edge(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::FoamBuilder;
    use crate::test_support::tetrahedron_faces;

    fn tet(id: &str) -> Foam {
        FoamBuilder::new(id).build_faces(&tetrahedron_faces()).unwrap()
    }

    /// Two tetrahedra with a made-up but self-consistent correspondence.
    fn paired() -> (Foam, Foam) {
        let mut a = tet("a");
        let mut b = tet("b");
        a.dual = Some("b".into());
        b.dual = Some("a".into());

        for k in 1..=4i64 {
            for s in [1, -1] {
                a.edge_mut(EdgeId(s * k)).unwrap().dual = DualRef::Pending(FaceId(s * k));
                b.face_mut(FaceId(s * k)).unwrap().dual = DualRef::Pending(EdgeId(s * k));
                b.edge_mut(EdgeId(s * k)).unwrap().dual = DualRef::Pending(FaceId(s * k));
                a.face_mut(FaceId(s * k)).unwrap().dual = DualRef::Pending(EdgeId(s * k));
            }
        }
        a.vertex_mut(VertexId(1)).unwrap().dual = DualRef::Pending(CellId(1));
        b.cell_mut(CellId(1)).unwrap().dual = vec![DualRef::Pending(VertexId(1))];
        b.vertex_mut(VertexId(2)).unwrap().dual = DualRef::Pending(CellId(1));
        a.cell_mut(CellId(1)).unwrap().dual = vec![DualRef::Unset, DualRef::Pending(VertexId(2))];
        (a, b)
    }

    #[test]
    fn links_consistent_pair() {
        let (mut a, mut b) = paired();
        assert!(!a.is_linked_to(&b));
        connect_duals(&mut a, &mut b).unwrap();
        assert!(a.is_linked_to(&b) && b.is_linked_to(&a));

        assert!(a.edges().all(|e| !e.dual.is_pending()));
        assert!(b.faces().all(|f| !f.dual.is_pending()));
        assert_eq!(a.cell(CellId(1)).unwrap().dual[0], DualRef::Unset);
        assert_eq!(a.cell(CellId(1)).unwrap().dual[1], DualRef::Linked(VertexId(2)));
    }

    #[test]
    fn round_trip_reaches_same_entities() {
        let (mut a, mut b) = paired();
        connect_duals(&mut a, &mut b).unwrap();
        let pair = DualPair::new(&a, &b).unwrap();
        let back = pair.reversed();

        for edge in a.edges() {
            let Some(face) = pair.edge_dual(edge.id) else { continue };
            let again = back.face_dual(face.id).unwrap();
            assert!(std::ptr::eq(again, edge));
        }

        let cell = pair.vertex_dual(VertexId(1)).unwrap();
        let verts = back.cell_dual(cell.id).unwrap();
        assert_eq!(verts.len(), 1);
        assert!(std::ptr::eq(verts[0], a.vertex(VertexId(1)).unwrap()));
    }

    #[test]
    fn rejects_foams_that_do_not_name_each_other() {
        let (mut a, mut b) = paired();
        b.dual = Some("someone-else".into());
        let err = connect_duals(&mut a, &mut b).unwrap_err();
        assert!(matches!(err, Error::NotDual { .. }));
        assert!(err.to_string().contains("not dual of each other"));
        assert!(a.edges().any(|e| e.dual.is_pending()));
    }

    #[test]
    fn rejects_missing_target_without_mutation() {
        let (mut a, mut b) = paired();
        a.edge_mut(EdgeId(5)).unwrap().dual = DualRef::Pending(FaceId(99));
        let before_a = a.clone();

        let err = connect_duals(&mut a, &mut b).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDual { .. }));
        assert!(!a.is_linked_to(&b));
        for (x, y) in a.edges().zip(before_a.edges()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn rejects_one_way_reference() {
        let (mut a, mut b) = paired();
        b.face_mut(FaceId(2)).unwrap().dual = DualRef::Pending(EdgeId(3));
        let err = connect_duals(&mut a, &mut b).unwrap_err();
        assert!(matches!(err, Error::DualMismatch { .. }));
        assert!(b.faces().all(|f| f.dual.linked().is_none()));
    }

    #[test]
    fn rejects_cell_list_without_vertex() {
        let (mut a, mut b) = paired();
        b.cell_mut(CellId(1)).unwrap().dual.clear();
        assert!(matches!(
            connect_duals(&mut a, &mut b),
            Err(Error::DualMismatch { .. })
        ));
    }

    #[test]
    fn view_requires_linked_foams() {
        let (a, b) = paired();
        assert!(matches!(DualPair::new(&a, &b), Err(Error::DualNotLinked(_))));
    }
}
