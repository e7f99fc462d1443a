//! Straight lines in the Roberts optimal representation.
//!
//! A line is encoded by four numbers: the direction angles `(theta, phi)` of
//! its unit vector `b`, and the intersection `(xp, yp)` of the line with the
//! plane through the origin perpendicular to `b`, expressed in the frame
//! obtained by rotating the z axis onto `b`.
//!
//! Theta is restricted to `[0, pi/2]` so that `b` and `-b` do not give two
//! encodings of the same line. The projection is undefined for `bz = -1`;
//! such directions are rejected with [`Error::DegenerateLine`].

use crate::{Error, Result};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// A 3-D line `(theta, phi, xp, yp)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Line {
    theta: f64,
    phi: f64,
    xp: f64,
    yp: f64,
}

/// Rotation coefficients for one direction.
///
/// `x' = b_coef*px - a*py - bx*pz`, `y' = -a*px + c*py - by*pz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Unit direction.
    pub b: Vector3<f64>,
    a: f64,
    b_coef: f64,
    c: f64,
}

impl Projection {
    /// Builds the projection for direction angles `(theta, phi)`.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateLine`] when `1 + bz` vanishes.
    pub fn new(theta: f64, phi: f64) -> Result<Self> {
        let b = unit_direction(theta, phi);
        let denom = 1.0 + b.z;
        if !denom.is_finite() || denom <= DEGENERATE_TOLERANCE {
            return Err(Error::DegenerateLine { theta, phi });
        }
        Ok(Self {
            b,
            a: b.x * b.y / denom,
            b_coef: 1.0 - b.x * b.x / denom,
            c: 1.0 - b.y * b.y / denom,
        })
    }

    /// Transverse coordinates `(xp, yp)` of a point.
    #[inline]
    #[must_use]
    pub fn project(&self, p: &Point3<f64>) -> (f64, f64) {
        let xp = self.b_coef * p.x - self.a * p.y - self.b.x * p.z;
        let yp = -self.a * p.x + self.c * p.y - self.b.y * p.z;
        (xp, yp)
    }

    /// Point in the unprimed frame with transverse coordinates `(xp, yp)`
    /// and zero component along the direction.
    #[inline]
    #[must_use]
    pub fn unproject(&self, xp: f64, yp: f64) -> Point3<f64> {
        Point3::new(
            xp * self.b_coef - yp * self.a,
            -xp * self.a + yp * self.c,
            -xp * self.b.x - yp * self.b.y,
        )
    }
}

/// Unit vector for physics-convention spherical angles.
#[inline]
#[must_use]
pub fn unit_direction(theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vector3::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta)
}

/// Spherical angles `(theta, phi)` of a unit vector.
#[inline]
#[must_use]
pub fn direction_angles(b: &Vector3<f64>) -> (f64, f64) {
    (b.z.clamp(-1.0, 1.0).acos(), b.y.atan2(b.x))
}

/// Computes `(xp, yp)` for the line with direction `(theta, phi)` through `p`.
///
/// # Errors
/// Returns [`Error::DegenerateLine`] for directions with `bz = -1`.
pub fn compute_xp_yp(theta: f64, phi: f64, p: &Point3<f64>) -> Result<(f64, f64)> {
    Ok(Projection::new(theta, phi)?.project(p))
}

impl Line {
    /// Creates a line from its four parameters.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateLine`] if the direction has `bz = -1`.
    pub fn new(theta: f64, phi: f64, xp: f64, yp: f64) -> Result<Self> {
        Projection::new(theta, phi)?;
        Ok(Self { theta, phi, xp, yp })
    }

    /// Creates the line with direction `(theta, phi)` passing through `point`.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateLine`] for directions with `bz = -1`.
    pub fn from_dir_point(theta: f64, phi: f64, point: &Point3<f64>) -> Result<Self> {
        let (xp, yp) = compute_xp_yp(theta, phi, point)?;
        Ok(Self { theta, phi, xp, yp })
    }

    /// Creates the line along `direction` passing through `point`.
    ///
    /// The direction need not be normalised; it is folded into the upper
    /// hemisphere before conversion to angles.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateLine`] if `direction` has zero or non-finite
    /// length.
    pub fn from_vector_point(direction: &Vector3<f64>, point: &Point3<f64>) -> Result<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(Error::DegenerateLine {
                theta: f64::NAN,
                phi: f64::NAN,
            });
        }
        let mut b = direction / norm;
        if b.z < 0.0 {
            b = -b;
        }
        let (theta, phi) = direction_angles(&b);
        Self::from_dir_point(theta, phi, point)
    }

    /// Polar angle to the z axis, in `[0, pi/2]` for folded lines.
    #[inline]
    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Azimuth in the x-y plane.
    #[inline]
    #[must_use]
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Transverse x-prime offset.
    #[inline]
    #[must_use]
    pub fn xp(&self) -> f64 {
        self.xp
    }

    /// Transverse y-prime offset.
    #[inline]
    #[must_use]
    pub fn yp(&self) -> f64 {
        self.yp
    }

    /// Parameters as `[theta, phi, xp, yp]`.
    #[must_use]
    pub fn params(&self) -> [f64; 4] {
        [self.theta, self.phi, self.xp, self.yp]
    }

    /// Unit direction vector.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        unit_direction(self.theta, self.phi)
    }

    fn projection(&self) -> Projection {
        // Non-degeneracy is checked by every constructor.
        let b = self.direction();
        let denom = 1.0 + b.z;
        Projection {
            b,
            a: b.x * b.y / denom,
            b_coef: 1.0 - b.x * b.x / denom,
            c: 1.0 - b.y * b.y / denom,
        }
    }

    /// Point of the line closest to the origin.
    #[must_use]
    pub fn anchor(&self) -> Point3<f64> {
        self.projection().unproject(self.xp, self.yp)
    }

    /// Point at signed distance `s` from the anchor along the direction.
    #[must_use]
    pub fn point_at(&self, s: f64) -> Point3<f64> {
        self.anchor() + self.direction() * s
    }

    /// Orthogonal projection of `point` onto the line.
    #[must_use]
    pub fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let anchor = self.anchor();
        let b = self.direction();
        anchor + b * (point - anchor).dot(&b)
    }

    /// Perpendicular distance from `point` to the line.
    #[must_use]
    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        (point - self.closest_point(point)).norm()
    }

    /// Returns this line displaced by `translation`.
    #[must_use]
    pub fn translated(&self, translation: &Vector3<f64>) -> Self {
        let (xp, yp) = self.projection().project(&(self.anchor() + translation));
        Self {
            theta: self.theta,
            phi: self.phi,
            xp,
            yp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_vertical_line() {
        let line = Line::new(0.0, 0.0, 3.0, -2.0).unwrap();
        let anchor = line.anchor();
        assert_relative_eq!(anchor.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(anchor.y, -2.0, epsilon = 1e-12);
        assert_relative_eq!(anchor.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            line.distance_to(&Point3::new(3.0, 2.0, 100.0)),
            4.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_direction_rejected() {
        assert!(matches!(
            Line::new(PI, 0.0, 0.0, 0.0),
            Err(Error::DegenerateLine { .. })
        ));
        assert!(compute_xp_yp(PI, 1.0, &Point3::origin()).is_err());
        assert!(Line::from_vector_point(&Vector3::zeros(), &Point3::origin()).is_err());
    }

    #[test]
    fn test_horizontal_line_is_valid() {
        let line = Line::from_dir_point(FRAC_PI_2, 0.3, &Point3::new(1.0, 2.0, 3.0)).unwrap();
        assert_relative_eq!(
            line.distance_to(&Point3::new(1.0, 2.0, 3.0)),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_from_vector_folds_hemisphere() {
        let up = Line::from_vector_point(&Vector3::new(0.2, -0.1, 1.0), &Point3::origin()).unwrap();
        let down =
            Line::from_vector_point(&Vector3::new(-0.2, 0.1, -1.0), &Point3::origin()).unwrap();
        assert!(up.theta() <= FRAC_PI_2);
        assert_relative_eq!(up.theta(), down.theta(), epsilon = 1e-12);
        assert_relative_eq!(up.phi(), down.phi(), epsilon = 1e-12);
    }

    #[test]
    fn test_translation_moves_anchor() {
        let line = Line::from_dir_point(0.4, -1.2, &Point3::new(1.0, 1.0, 1.0)).unwrap();
        let shift = Vector3::new(5.0, -3.0, 2.0);
        let moved = line.translated(&shift);
        assert_relative_eq!(
            moved.distance_to(&Point3::new(6.0, -2.0, 3.0)),
            0.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(moved.theta(), line.theta());
    }

    proptest! {
        #[test]
        fn test_dir_point_roundtrip(
            theta in 0.0..1.5707_f64,
            phi in -PI..PI,
            x in -100.0..100.0_f64,
            y in -100.0..100.0_f64,
            z in -100.0..100.0_f64,
        ) {
            let point = Point3::new(x, y, z);
            let line = Line::from_dir_point(theta, phi, &point)?;

            let recovered = line.closest_point(&point);
            prop_assert!((recovered - point).norm() < 1e-8,
                "point {:?} recovered as {:?}", point, recovered);

            let (xp, yp) = compute_xp_yp(theta, phi, &line.anchor())?;
            prop_assert!((xp - line.xp()).abs() < 1e-8);
            prop_assert!((yp - line.yp()).abs() < 1e-8);

            prop_assert!(line.anchor().coords.dot(&line.direction()).abs() < 1e-8);
        }
    }
}
