// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier and key types for foam entities.
//!
//! Every entity carries a stable integer Id that is unique within its foam and
//! is used for all cross references (adjacency, `Pair`, `Dual`). Storage keys
//! are `slotmap` generational keys that never leave the [`Foam`](crate::Foam).
//!
//! The Id `0` is the sentinel for "no entity". Edges and faces are stored as
//! oriented halves: the first half of a geometric edge/face gets a positive Id
//! `k` and its pair gets `-k`.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Arena key for a vertex.
    pub struct VertexKey;

    /// Arena key for a half-edge.
    pub struct EdgeKey;

    /// Arena key for a half-face.
    pub struct FaceKey;

    /// Arena key for a cell.
    pub struct CellKey;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// The sentinel Id: no entity.
            pub const NONE: Self = Self(0);

            /// Returns `true` for the sentinel Id.
            pub fn is_none(self) -> bool {
                self.0 == 0
            }

            /// Returns `true` for any real Id.
            pub fn is_some(self) -> bool {
                self.0 != 0
            }

            /// Converts the sentinel into `None`.
            pub fn get(self) -> Option<Self> {
                if self.is_none() {
                    None
                } else {
                    Some(self)
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Id of a vertex. Always positive for real vertices.
    VertexId
);
entity_id!(
    /// Id of a half-edge. `-id` is its pair.
    EdgeId
);
entity_id!(
    /// Id of a half-face. `-id` is its pair.
    FaceId
);
entity_id!(
    /// Id of a cell. The sentinel doubles as the implicit exterior cell.
    CellId
);

impl EdgeId {
    /// The Id of the opposite half-edge.
    pub fn pair(self) -> Self {
        Self(-self.0)
    }

    /// `true` for the positive half, which represents the geometric edge.
    pub fn is_primary(self) -> bool {
        self.0 > 0
    }
}

impl FaceId {
    /// The Id of the opposite half-face.
    pub fn pair(self) -> Self {
        Self(-self.0)
    }

    /// `true` for the positive half, which represents the geometric face.
    pub fn is_primary(self) -> bool {
        self.0 > 0
    }
}

/// A reference to any foam entity, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
    Cell(CellId),
}

impl EntityRef {
    /// Returns the kind of entity referenced.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Vertex(_) => EntityKind::Vertex,
            EntityRef::Edge(_) => EntityKind::Edge,
            EntityRef::Face(_) => EntityKind::Face,
            EntityRef::Cell(_) => EntityKind::Cell,
        }
    }

    /// Returns the raw integer Id.
    pub fn raw_id(&self) -> i64 {
        match self {
            EntityRef::Vertex(id) => id.0,
            EntityRef::Edge(id) => id.0,
            EntityRef::Face(id) => id.0,
            EntityRef::Cell(id) => id.0,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw_id())
    }
}

/// Discriminant for foam entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Vertex = 0,
    Edge = 1,
    Face = 2,
    Cell = 3,
}

impl EntityKind {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vertex => "Vertex",
            EntityKind::Edge => "Edge",
            EntityKind::Face => "Face",
            EntityKind::Cell => "Cell",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VertexId> for EntityRef {
    fn from(id: VertexId) -> Self {
        EntityRef::Vertex(id)
    }
}

impl From<EdgeId> for EntityRef {
    fn from(id: EdgeId) -> Self {
        EntityRef::Edge(id)
    }
}

impl From<FaceId> for EntityRef {
    fn from(id: FaceId) -> Self {
        EntityRef::Face(id)
    }
}

impl From<CellId> for EntityRef {
    fn from(id: CellId) -> Self {
        EntityRef::Cell(id)
    }
}

/// A cross-foam reference to the dual of an entity.
///
/// Deserialization only knows the Id of the partner entity, so it produces
/// `Pending` references. [`connect_duals`](crate::dual::connect_duals) checks
/// them against the partner foam and turns them into `Linked` references;
/// nothing else creates `Linked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DualRef<T> {
    /// No dual.
    Unset,
    /// Partner Id read from input, not yet checked against the partner foam.
    Pending(T),
    /// Partner Id verified by the dual resolver.
    Linked(T),
}

impl<T> Default for DualRef<T> {
    fn default() -> Self {
        DualRef::Unset
    }
}

impl<T: Copy> DualRef<T> {
    /// The partner Id, whether pending or linked.
    pub fn id(&self) -> Option<T> {
        match *self {
            DualRef::Unset => None,
            DualRef::Pending(id) | DualRef::Linked(id) => Some(id),
        }
    }

    /// The partner Id, only once it has been linked.
    pub fn linked(&self) -> Option<T> {
        match *self {
            DualRef::Linked(id) => Some(id),
            _ => None,
        }
    }

    /// Returns `true` while the reference still awaits resolution.
    pub fn is_pending(&self) -> bool {
        matches!(self, DualRef::Pending(_))
    }

    /// Promotes a pending reference to a linked one.
    pub(crate) fn link(&mut self) {
        if let DualRef::Pending(id) = *self {
            *self = DualRef::Linked(id);
        }
    }
}
