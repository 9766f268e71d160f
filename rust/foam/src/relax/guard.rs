// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hard edge-length clamps applied to tentative displacements.

use nalgebra::Vector3;

use super::Moves;
use crate::foam::Foam;

/// Drops the displacements of both endpoints of every edge that would end up
/// shorter than its `min_length` (or longer than its `max_length` when
/// `clamp_max` is set) and further from the bound than it started.
///
/// Dropping one edge's moves changes its neighbours' lengths, so the scan
/// repeats until nothing is dropped.
pub(crate) fn clamp_lengths(foam: &Foam, moves: &mut Moves, clamp_max: bool) {
    let zero = Vector3::zeros();
    loop {
        let mut dropped = false;
        for edge in foam.primary_edges() {
            let (a, b) = (edge.start(), edge.end());
            let (Some(pa), Some(pb)) = (foam.position(a), foam.position(b)) else {
                continue;
            };
            let da = moves.get(&a).copied().unwrap_or(zero);
            let db = moves.get(&b).copied().unwrap_or(zero);
            if da == zero && db == zero {
                continue;
            }

            let old_len = (pb - pa).norm();
            let new_len = ((pb + db) - (pa + da)).norm();
            let too_short = new_len < edge.min_length && new_len < old_len;
            let too_long = clamp_max
                && edge
                    .max_length
                    .is_some_and(|max| new_len > max && new_len > old_len);

            if too_short || too_long {
                moves.remove(&a);
                moves.remove(&b);
                dropped = true;
            }
        }
        if !dropped {
            break;
        }
    }
}
