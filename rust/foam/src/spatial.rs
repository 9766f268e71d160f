// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hash for tolerance-based point merging.
//!
//! The assembler uses it to collapse near-coincident input positions into one
//! vertex. Lookups check the 3x3x3 neighbourhood of grid cells around the
//! query point.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

/// A grid-based spatial hash over a growing list of points.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f64,
    points: Vec<Point3<f64>>,
    grid: FxHashMap<(i64, i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// Creates an empty index. `cell_size` should be at least the tolerance
    /// used for queries. A zero, negative or non-finite size falls back to a
    /// unit grid, which still serves exact-match lookups.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            points: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    /// All points inserted so far, by index.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inserts a point and returns its index.
    pub fn insert(&mut self, p: Point3<f64>) -> usize {
        let idx = self.points.len();
        self.points.push(p);
        let cell = self.cell_coords(&p);
        self.grid.entry(cell).or_default().push(idx);
        idx
    }

    /// Finds the closest stored point within `tolerance` of `p`.
    ///
    /// Ties are broken by insertion order, so merging is deterministic.
    pub fn find_near(&self, p: &Point3<f64>, tolerance: f64) -> Option<usize> {
        let (cx, cy, cz) = self.cell_coords(p);
        let tol_sq = tolerance * tolerance;
        let mut best: Option<(usize, f64)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let cell = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    let Some(indices) = self.grid.get(&cell) else {
                        continue;
                    };
                    for &i in indices {
                        let dist_sq = (self.points[i] - p).norm_squared();
                        if dist_sq > tol_sq {
                            continue;
                        }
                        let better = match best {
                            None => true,
                            Some((j, d)) => dist_sq < d || (dist_sq == d && i < j),
                        };
                        if better {
                            best = Some((i, dist_sq));
                        }
                    }
                }
            }
        }

        best.map(|(i, _)| i)
    }

    /// Returns an existing point within `tolerance`, or inserts `p`.
    ///
    /// The flag is `true` when a new point was inserted.
    pub fn find_or_insert(&mut self, p: Point3<f64>, tolerance: f64) -> (usize, bool) {
        match self.find_near(&p, tolerance) {
            Some(i) => (i, false),
            None => (self.insert(p), true),
        }
    }

    /// Grid cell of a point. Coordinates past the `i64` range saturate, so
    /// far-away points share edge cells and are told apart by distance.
    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_within_tolerance() {
        let mut index = SpatialIndex::new(0.01);
        let (a, new_a) = index.find_or_insert(Point3::new(0.0, 0.0, 0.0), 0.01);
        let (b, new_b) = index.find_or_insert(Point3::new(0.005, 0.0, 0.0), 0.01);
        let (c, new_c) = index.find_or_insert(Point3::new(1.0, 0.0, 0.0), 0.01);
        assert!(new_a && !new_b && new_c);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn finds_across_cell_boundaries() {
        let mut index = SpatialIndex::new(1.0);
        index.insert(Point3::new(0.99, 0.99, 0.99));
        assert_eq!(index.find_near(&Point3::new(1.01, 1.01, 1.01), 0.1), Some(0));
        assert_eq!(index.find_near(&Point3::new(-0.5, 0.0, 0.0), 0.1), None);
    }

    #[test]
    fn degenerate_cell_size_matches_exactly() {
        let mut index = SpatialIndex::new(0.0);
        let (a, _) = index.find_or_insert(Point3::new(0.5, 0.5, 0.5), 0.0);
        let (b, new_b) = index.find_or_insert(Point3::new(0.5, 0.5, 0.5), 0.0);
        let (_, new_c) = index.find_or_insert(Point3::new(0.5, 0.5, 0.5 + 1e-12), 0.0);
        assert_eq!(a, b);
        assert!(!new_b && new_c);
    }

    #[test]
    fn huge_coordinates_do_not_overflow() {
        let mut index = SpatialIndex::new(1e-3);
        let far = Point3::new(1e16, -1e300, f64::MAX);
        index.insert(far);
        assert_eq!(index.find_near(&far, 1e-3), Some(0));
        assert_eq!(index.find_near(&Point3::new(1e16 + 4.0, -1e300, f64::MAX), 1e-3), None);
    }

    #[test]
    fn nearest_candidate_wins() {
        let mut index = SpatialIndex::new(1.0);
        index.insert(Point3::new(0.0, 0.0, 0.0));
        index.insert(Point3::new(0.3, 0.0, 0.0));
        assert_eq!(index.find_near(&Point3::new(0.25, 0.0, 0.0), 0.5), Some(1));
    }
}
