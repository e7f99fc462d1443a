//! 3-D Hough accumulator over `(direction, xp, yp)`.
//!
//! Directions are sampled quasi-uniformly on the upper hemisphere. For each
//! direction every point is projected onto the plane perpendicular to it,
//! and the transverse coordinates `(xp, yp)` select one cell of a square
//! position grid shared by both axes.
//!
//! The point cloud is centred on its bounding box before voting; lines read
//! back from the grid are translated back into the original frame.

use larreco_core::{direction_angles, Error, HoughConfig, Line, Projection, Result};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Unit vectors quasi-uniformly spread over the upper hemisphere (`z >= 0`).
///
/// Points are drawn from a Fibonacci spiral on the full sphere with twice
/// the requested count and filtered to the upper half. The filter can keep
/// slightly fewer than `n` points; callers use whatever is returned.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fibonacci_hemisphere(n: usize) -> Vec<Vector3<f64>> {
    let samples = n * 2;
    if samples == 0 {
        return Vec::new();
    }
    let offset = 2.0 / samples as f64;
    let increment = PI * (3.0 - 5.0_f64.sqrt());

    let mut points = Vec::with_capacity(n);
    for i in 0..samples {
        let y = (i as f64 * offset - 1.0) + offset / 2.0;
        let r = (1.0 - y * y).max(0.0).sqrt();
        let phi = ((i + 1) % samples) as f64 * increment;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let z = sin_phi * r;
        if z >= 0.0 {
            points.push(Vector3::new(cos_phi * r, y, z));
        }
        if points.len() == n {
            break;
        }
    }
    points
}

/// `(theta, phi)` of [`fibonacci_hemisphere`] directions.
#[must_use]
pub fn hemisphere_directions(n: usize) -> Vec<(f64, f64)> {
    fibonacci_hemisphere(n).iter().map(direction_angles).collect()
}

/// Centres `points` on their axis-aligned bounding box.
///
/// Returns the centred points and the translation `t` such that
/// `original = centred + t`.
#[must_use]
pub fn center_translate(points: &[Point3<f64>]) -> (Vec<Point3<f64>>, Vector3<f64>) {
    let Some((min, max)) = bounding_box(points) else {
        return (Vec::new(), Vector3::zeros());
    };
    let translation = (min.coords + max.coords) * 0.5;
    let centred = points.iter().map(|p| p - translation).collect();
    (centred, translation)
}

fn bounding_box(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(min, max), p| {
        (min.inf(p), max.sup(p))
    }))
}

/// `num_positions + 1` equally spaced edges over `[-r, r]`, where `r` is the
/// norm of the half-extents of the bounding box.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn position_edges(points: &[Point3<f64>], num_positions: usize) -> Vec<f64> {
    let range = bounding_box(points).map_or(0.0, |(min, max)| ((max - min) * 0.5).norm());
    let step = 2.0 * range / num_positions as f64;
    (0..=num_positions)
        .map(|i| -range + step * i as f64)
        .collect()
}

/// Bin holding `value`: the last edge strictly below it, clamped into the
/// grid.
#[inline]
fn bin_index(edges: &[f64], value: f64) -> usize {
    let last = edges.len().saturating_sub(2);
    edges
        .partition_point(|&edge| edge < value)
        .saturating_sub(1)
        .min(last)
}

/// A cell of the accumulator grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoughCell {
    /// Index into [`HoughAccumulator::directions`].
    pub direction: usize,
    /// Transverse x bin.
    pub xp_bin: usize,
    /// Transverse y bin.
    pub yp_bin: usize,
    /// Votes held by the cell.
    pub votes: i32,
}

/// Voting grid for one point cloud.
///
/// Built once per event; votes are added and removed by point index.
#[derive(Debug, Clone)]
pub struct HoughAccumulator {
    directions: Vec<(f64, f64)>,
    projections: Vec<Projection>,
    edges: Vec<f64>,
    translation: Vector3<f64>,
    points: Vec<Point3<f64>>,
    votes: Vec<i32>,
    num_positions: usize,
    parallel: bool,
}

impl HoughAccumulator {
    /// Builds an empty grid sized for `points`.
    ///
    /// # Errors
    /// Returns [`Error::InsufficientPoints`] for an empty cloud,
    /// [`Error::NonFinitePoint`] if any coordinate is NaN or infinite, or a
    /// configuration error for invalid resolutions.
    pub fn build(points: &[Point3<f64>], config: &HoughConfig) -> Result<Self> {
        config.validate()?;
        if points.is_empty() {
            return Err(Error::InsufficientPoints {
                found: 0,
                required: 1,
            });
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(Error::NonFinitePoint { index });
        }

        let directions = hemisphere_directions(config.num_directions);
        let projections = directions
            .iter()
            .map(|&(theta, phi)| Projection::new(theta, phi))
            .collect::<Result<Vec<_>>>()?;

        let (centred, translation) = center_translate(points);
        let num_positions = config.num_positions;
        let edges = position_edges(&centred, num_positions);
        let votes = vec![0; directions.len() * num_positions * num_positions];

        Ok(Self {
            directions,
            projections,
            edges,
            translation,
            points: centred,
            votes,
            num_positions,
            parallel: config.parallel,
        })
    }

    /// Adds one vote per direction for each indexed point.
    pub fn add_votes(&mut self, indices: &[usize]) {
        self.vote(indices, 1);
    }

    /// Removes the votes previously added for each indexed point.
    pub fn remove_votes(&mut self, indices: &[usize]) {
        self.vote(indices, -1);
    }

    /// Indices past the point count are ignored.
    fn vote(&mut self, indices: &[usize], delta: i32) {
        let plane = self.num_positions * self.num_positions;
        if plane == 0 {
            return;
        }
        let Self {
            projections,
            edges,
            points,
            votes,
            num_positions,
            parallel,
            ..
        } = self;
        let (edges, points, n) = (edges.as_slice(), points.as_slice(), *num_positions);

        let vote_plane = |(cells, projection): (&mut [i32], &Projection)| {
            for point in indices.iter().filter_map(|&i| points.get(i)) {
                let (xp, yp) = projection.project(point);
                cells[bin_index(edges, xp) * n + bin_index(edges, yp)] += delta;
            }
        };

        // Each direction owns its own plane, so planes vote independently.
        if *parallel {
            votes
                .par_chunks_mut(plane)
                .zip(projections.par_iter())
                .for_each(vote_plane);
        } else {
            votes
                .chunks_mut(plane)
                .zip(projections.iter())
                .for_each(vote_plane);
        }
    }

    /// The cell with the most votes; ties go to the first cell in
    /// direction-major, then xp, then yp order.
    #[must_use]
    pub fn best_cell(&self) -> Option<HoughCell> {
        let (flat, &votes) = self
            .votes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &i32)>, (i, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((i, v)),
            })?;
        let n = self.num_positions;
        Some(HoughCell {
            direction: flat / (n * n),
            xp_bin: (flat / n) % n,
            yp_bin: flat % n,
            votes,
        })
    }

    /// The line through the centre of `cell`, in the original frame.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the cell lies outside the grid.
    pub fn line_for(&self, cell: &HoughCell) -> Result<Line> {
        let &(theta, phi) = self.directions.get(cell.direction).ok_or_else(|| {
            Error::ConfigError(format!("direction {} out of range", cell.direction))
        })?;
        let xp = self.bin_center(cell.xp_bin)?;
        let yp = self.bin_center(cell.yp_bin)?;
        Ok(Line::new(theta, phi, xp, yp)?.translated(&self.translation))
    }

    fn bin_center(&self, bin: usize) -> Result<f64> {
        match (self.edges.get(bin), self.edges.get(bin + 1)) {
            (Some(lo), Some(hi)) => Ok(0.5 * (lo + hi)),
            _ => Err(Error::ConfigError(format!("position bin {bin} out of range"))),
        }
    }

    /// Votes held by one cell.
    #[must_use]
    pub fn votes_at(&self, direction: usize, xp_bin: usize, yp_bin: usize) -> Option<i32> {
        let n = self.num_positions;
        if xp_bin >= n || yp_bin >= n {
            return None;
        }
        self.votes
            .get((direction * n + xp_bin) * n + yp_bin)
            .copied()
    }

    /// Sum of all votes in the grid.
    #[must_use]
    pub fn total_votes(&self) -> i64 {
        self.votes.iter().map(|&v| i64::from(v)).sum()
    }

    /// Width of one position bin.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    /// Sampled directions as `(theta, phi)`.
    #[must_use]
    pub fn directions(&self) -> &[(f64, f64)] {
        &self.directions
    }

    /// Position bin edges, shared by both transverse axes.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Translation from the centred frame back to the original one.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Number of points the grid was built for.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}
