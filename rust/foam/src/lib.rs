// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Foamframe
//!
//! Dual polyhedral cell complexes ("foams") and the relaxation solvers used
//! for 3D graphic statics.
//!
//! A [`Foam`] is a watertight complex of vertices, half-edges, half-faces and
//! cells built by the [`assembler`] from planar face loops. Two foams can be
//! linked as each other's reciprocal diagram with [`connect_duals`]: primal
//! vertices correspond to dual cells and primal edges to dual faces. The
//! [`relax`] solvers then move vertices to make faces planar, hit target edge
//! lengths, and make each primal edge perpendicular to its dual face.
//!
//! Foams travel between processes as JSON records, see [`serialization`].

pub mod assembler;
pub mod config;
pub mod constraints;
pub mod dual;
pub mod entities;
pub mod error;
pub mod foam;
pub mod geometry;
pub mod keys;
pub mod relax;
pub mod serialization;
pub mod spatial;
pub mod transform;
pub mod traversal;

pub use assembler::{box_faces, CellInput, FaceInput, FoamBuilder};
pub use config::SolverConfig;
pub use constraints::{Restriction, Support};
pub use dual::{connect_duals, DualPair};
pub use entities::{Cell, Edge, Face, Vertex};
pub use error::{Error, Result};
pub use foam::Foam;
pub use keys::{CellId, DualRef, EdgeId, EntityKind, EntityRef, FaceId, VertexId};
pub use relax::{CancelSignal, NeverCancel, RelaxReport, RelaxStatus};
