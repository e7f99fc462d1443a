//! Least-squares line refinement by principal component analysis.

use larreco_core::{Error, Line, LineCovariance, Result};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use std::f64::consts::PI;

/// Indices (from `candidates`) of points strictly closer than `threshold` to
/// `line`.
#[must_use]
pub fn inliers(
    points: &[Point3<f64>],
    candidates: &[usize],
    line: &Line,
    threshold: f64,
) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&i| points.get(i).is_some_and(|p| line.distance_to(p) < threshold))
        .collect()
}

/// Fits a line through the indexed points.
///
/// The line passes through the centroid along the principal axis of the
/// covariance matrix.
///
/// # Errors
/// Returns [`Error::InsufficientPoints`] for fewer than two points or when
/// the points have no spread.
#[allow(clippy::cast_precision_loss)]
pub fn fit_line(points: &[Point3<f64>], indices: &[usize]) -> Result<Line> {
    let selected: Vec<&Point3<f64>> = indices.iter().filter_map(|&i| points.get(i)).collect();
    let insufficient = Error::InsufficientPoints {
        found: selected.len(),
        required: 2,
    };
    if selected.len() < 2 {
        return Err(insufficient);
    }

    let count = selected.len() as f64;
    let mean = selected
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / count;

    let cov = selected.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p.coords - mean;
        acc + d * d.transpose()
    }) / (count - 1.0);

    let eig = SymmetricEigen::new(cov);
    let imax = eig.eigenvalues.imax();
    let lambda_max = eig.eigenvalues[imax];
    if !lambda_max.is_finite() || lambda_max <= 0.0 {
        return Err(insufficient);
    }

    let direction: Vector3<f64> = eig.eigenvectors.column(imax).into_owned();
    Line::from_vector_point(&direction, &Point3::from(mean))
}

/// Refines `guess` against the points within `threshold` of it.
///
/// Only points listed in `candidates` are considered.
///
/// # Errors
/// Returns [`Error::InsufficientPoints`] if fewer than two candidates lie
/// near the guess or they have no spread.
pub fn refine(
    points: &[Point3<f64>],
    candidates: &[usize],
    guess: &Line,
    threshold: f64,
) -> Result<Line> {
    let near = inliers(points, candidates, guess, threshold);
    fit_line(points, &near)
}

/// Jackknife estimate of the covariance of `(theta, phi, xp, yp)`.
///
/// Each inlier is left out in turn and the line refitted. Fits that fail are
/// skipped. Azimuth differences are wrapped into `(-pi, pi]`.
///
/// # Errors
/// Returns [`Error::InsufficientPoints`] if fewer than two leave-one-out
/// fits succeed.
#[allow(clippy::cast_precision_loss)]
pub fn jackknife_covariance(
    points: &[Point3<f64>],
    inliers: &[usize],
    line: &Line,
) -> Result<LineCovariance> {
    let reference = line.params();
    let mut deltas: Vec<[f64; 4]> = Vec::with_capacity(inliers.len());
    let mut subset = Vec::with_capacity(inliers.len().saturating_sub(1));

    for skip in 0..inliers.len() {
        subset.clear();
        subset.extend(
            inliers
                .iter()
                .enumerate()
                .filter_map(|(k, &i)| (k != skip).then_some(i)),
        );
        let Ok(fitted) = fit_line(points, &subset) else {
            continue;
        };
        let params = fitted.params();
        deltas.push([
            params[0] - reference[0],
            wrap_angle(params[1] - reference[1]),
            params[2] - reference[2],
            params[3] - reference[3],
        ]);
    }

    let n = deltas.len();
    if n < 2 {
        return Err(Error::InsufficientPoints {
            found: n,
            required: 2,
        });
    }

    let nf = n as f64;
    let mut mean = [0.0; 4];
    for d in &deltas {
        for (m, v) in mean.iter_mut().zip(d) {
            *m += v / nf;
        }
    }

    let scale = (nf - 1.0) / nf;
    let mut cov = [[0.0; 4]; 4];
    for d in &deltas {
        for a in 0..4 {
            for b in 0..4 {
                cov[a][b] += scale * (d[a] - mean[a]) * (d[b] - mean[b]);
            }
        }
    }
    Ok(cov)
}

/// Wraps an angle difference into `(-pi, pi]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn planted(theta: f64, phi: f64, origin: Point3<f64>, n: i32) -> (Line, Vec<Point3<f64>>) {
        let line = Line::from_dir_point(theta, phi, &origin).unwrap();
        let points = (0..n).map(|s| line.point_at(f64::from(s - n / 2))).collect();
        (line, points)
    }

    #[test]
    fn test_fit_recovers_exact_line() {
        let (line, points) = planted(0.7, -2.1, Point3::new(5.0, 1.0, -3.0), 20);
        let all: Vec<usize> = (0..points.len()).collect();
        let fitted = fit_line(&points, &all).unwrap();

        assert_relative_eq!(fitted.direction().dot(&line.direction()).abs(), 1.0, epsilon = 1e-9);
        for p in &points {
            assert!(fitted.distance_to(p) < 1e-9);
        }
    }

    #[test]
    fn test_refine_ignores_far_points() {
        let (line, mut points) = planted(0.3, 1.0, Point3::origin(), 10);
        points.push(Point3::new(50.0, 50.0, 50.0));
        let all: Vec<usize> = (0..points.len()).collect();

        let guess = line.translated(&Vector3::new(0.2, -0.1, 0.0));
        let fitted = refine(&points, &all, &guess, 1.0).unwrap();
        assert!(fitted.direction().dot(&line.direction()).abs() > 1.0 - 1e-9);
        assert_eq!(inliers(&points, &all, &fitted, 1.0).len(), 10);
    }

    #[test]
    fn test_insufficient_points() {
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 2.0, 3.0)];
        assert!(matches!(
            fit_line(&points, &[0]),
            Err(Error::InsufficientPoints { found: 1, required: 2 })
        ));
        assert!(matches!(
            fit_line(&points, &[0, 1]),
            Err(Error::InsufficientPoints { found: 2, .. })
        ));

        let line = Line::from_dir_point(0.1, 0.1, &Point3::new(100.0, 0.0, 0.0)).unwrap();
        assert!(refine(&points, &[0, 1], &line, 1.0).is_err());
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(2.0 * PI - 0.1), -0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-2.0 * PI + 0.1), 0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_jackknife_covariance_is_symmetric() {
        let (line, mut points) = planted(0.4, 0.5, Point3::new(1.0, 1.0, 1.0), 12);
        for (k, p) in points.iter_mut().enumerate() {
            let jitter = if k % 2 == 0 { 0.05 } else { -0.05 };
            p.x += jitter;
            p.y -= jitter * 0.5;
        }
        let all: Vec<usize> = (0..points.len()).collect();
        let fitted = fit_line(&points, &all).unwrap();
        let cov = jackknife_covariance(&points, &all, &fitted).unwrap();

        for a in 0..4 {
            assert!(cov[a][a] >= 0.0);
            for b in 0..4 {
                assert_relative_eq!(cov[a][b], cov[b][a], epsilon = 1e-15);
            }
        }
        assert!(cov[0][0] > 0.0);
        assert!(fitted.direction().dot(&line.direction()).abs() > 0.99);
    }
}
