// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-foam affine transformations.
//!
//! Transforms move vertex positions in place and refresh the derived
//! attributes. Restrictions are left alone: they describe the position
//! source's geometry, not the foam's.

use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

use crate::error::{Error, Result};
use crate::foam::Foam;

impl Foam {
    /// Translates every vertex by `offset`.
    pub fn translate(&mut self, offset: &Vector3<f64>) -> Result<()> {
        if offset.iter().any(|c| !c.is_finite()) {
            return Err(Error::NonFinite("translation".into()));
        }
        for v in self.vertices_mut() {
            v.position += *offset;
        }
        self.update_derived();
        Ok(())
    }

    /// Scales every vertex uniformly about `origin`.
    ///
    /// Length constraints scale along with the geometry.
    pub fn scale(&mut self, origin: &Point3<f64>, factor: f64) -> Result<()> {
        if !factor.is_finite() || origin.iter().any(|c| !c.is_finite()) {
            return Err(Error::NonFinite("scale".into()));
        }
        for v in self.vertices_mut() {
            v.position = *origin + (v.position - origin) * factor;
        }
        let k = factor.abs();
        for e in self.edges_mut() {
            e.target_length = e.target_length.map(|t| t * k);
            e.min_length *= k;
            e.max_length = e.max_length.map(|m| m * k);
        }
        for f in self.faces_mut() {
            f.target_area = f.target_area.map(|a| a * k * k);
        }
        self.update_derived();
        Ok(())
    }

    /// Rotates every vertex about an axis through `origin`. Angle in radians.
    pub fn rotate(&mut self, origin: &Point3<f64>, axis: &Vector3<f64>, angle: f64) -> Result<()> {
        let Some(unit_axis) = Unit::try_new(*axis, 1e-15) else {
            return Err(Error::NonFinite("rotation axis".into()));
        };
        if !angle.is_finite() {
            return Err(Error::NonFinite("rotation angle".into()));
        }
        let rotation = Rotation3::from_axis_angle(&unit_axis, angle);
        for v in self.vertices_mut() {
            v.position = *origin + rotation * (v.position - origin);
        }
        self.update_derived();
        Ok(())
    }

    /// Applies a 4x4 affine matrix to every vertex.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) -> Result<()> {
        if matrix.iter().any(|c| !c.is_finite()) {
            return Err(Error::NonFinite("transformation matrix".into()));
        }
        for v in self.vertices_mut() {
            v.position = matrix.transform_point(&v.position);
        }
        self.update_derived();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{CellId, EdgeId};
    use crate::test_support::unit_cube;
    use approx::assert_relative_eq;

    #[test]
    fn translate_moves_centroids() {
        let mut foam = unit_cube();
        foam.translate(&Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_relative_eq!(foam.centroid, Point3::new(1.5, 2.5, 3.5), epsilon = 1e-12);
        assert_relative_eq!(
            foam.cell(CellId(1)).unwrap().centroid,
            Point3::new(1.5, 2.5, 3.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn scale_about_origin() {
        let mut foam = unit_cube();
        foam.edge_mut(EdgeId(1)).unwrap().min_length = 0.5;
        foam.scale(&Point3::origin(), 2.0).unwrap();
        assert_relative_eq!(foam.cell_volume(CellId(1)).unwrap(), 8.0, epsilon = 1e-12);
        assert_relative_eq!(foam.edge(EdgeId(1)).unwrap().length, 2.0, epsilon = 1e-12);
        assert_eq!(foam.edge(EdgeId(1)).unwrap().min_length, 1.0);
    }

    #[test]
    fn rotate_keeps_volume() {
        let mut foam = unit_cube();
        foam.rotate(&Point3::origin(), &Vector3::z(), std::f64::consts::FRAC_PI_2)
            .unwrap();
        assert_relative_eq!(foam.cell_volume(CellId(1)).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(foam.centroid, Point3::new(-0.5, 0.5, 0.5), epsilon = 1e-12);
        assert!(foam.rotate(&Point3::origin(), &Vector3::zeros(), 1.0).is_err());
    }

    #[test]
    fn matrix_transform() {
        let mut foam = unit_cube();
        foam.transform(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, -1.0)))
            .unwrap();
        assert_relative_eq!(foam.centroid, Point3::new(0.5, 0.5, -0.5), epsilon = 1e-12);
        assert!(foam.transform(&Matrix4::from_element(f64::NAN)).is_err());
    }

    #[test]
    fn non_finite_offset_is_rejected() {
        let mut foam = unit_cube();
        let err = foam.translate(&Vector3::new(f64::INFINITY, 0.0, 0.0));
        assert!(matches!(err, Err(Error::NonFinite(_))));
        assert_relative_eq!(foam.centroid, Point3::new(0.5, 0.5, 0.5), epsilon = 1e-12);
    }
}
