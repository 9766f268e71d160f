// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for foam operations.
//!
//! All failures in the crate share this one error type. Every operation checks
//! its inputs before mutating anything, so a returned error means the foams
//! involved are exactly as they were before the call.

use crate::keys::EntityRef;

/// Result type alias for foam operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, linking, reading or relaxing foams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity was not found in the foam.
    #[error("entity not found: {0}")]
    NotFound(EntityRef),

    /// The assembler input contained no usable cell.
    #[error("foam must have at least one cell")]
    EmptyFoam,

    /// A cell has fewer than three faces left after vertex merging.
    #[error("cell {cell} has {faces} faces after merging, at least 3 are required")]
    InsufficientFaces { cell: usize, faces: usize },

    /// A face has collinear or coincident vertices and no usable plane.
    #[error("face {face} of cell {cell} is degenerate")]
    DegenerateFace { cell: usize, face: usize },

    /// A face deviates from its best-fit plane by more than its tolerance.
    #[error("face {face} of cell {cell} is not planar: deviation {deviation} exceeds {tolerance}")]
    NotPlanar {
        cell: usize,
        face: usize,
        deviation: f64,
        tolerance: f64,
    },

    /// A geometric face is claimed by more than two cells.
    #[error("face {face} of cell {cell} is already shared by two cells")]
    OverSharedFace { cell: usize, face: usize },

    /// The two foams handed to the dual resolver do not name each other.
    #[error("foams '{primal}' and '{dual}' are not dual of each other")]
    NotDual { primal: String, dual: String },

    /// A dual reference names an entity that does not exist in the partner foam.
    #[error("{entity} refers to missing dual {target}")]
    UnresolvedDual { entity: EntityRef, target: EntityRef },

    /// A dual reference is not mirrored by the partner entity.
    #[error("{entity} maps to {target}, which does not map back")]
    DualMismatch { entity: EntityRef, target: EntityRef },

    /// An operation that needs linked duals was given unlinked foams.
    #[error("foam '{0}' is not linked to its dual; run connect_duals first")]
    DualNotLinked(String),

    /// A foam invariant does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A computation produced or received a non-finite value.
    #[error("non-finite value in {0}")]
    NonFinite(String),

    /// Serialized data is structurally invalid.
    #[error("malformed foam data: {0}")]
    Malformed(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
