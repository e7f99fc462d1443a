#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
use larreco_algorithms::{find_tracks, HoughAccumulator, TrackFinder};
use larreco_core::{HoughConfig, Line, Point3};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// `n` points evenly spaced along `line` for `s` in `[-half_length, half_length]`.
fn planted(line: &Line, n: usize, half_length: f64) -> Vec<Point3<f64>> {
    let step = 2.0 * half_length / (n - 1) as f64;
    (0..n)
        .map(|i| line.point_at(-half_length + step * i as f64))
        .collect()
}

/// Uniform points in `[-extent, extent]^3` at least `clearance` from every
/// line in `avoid`.
fn noise(
    rng: &mut StdRng,
    n: usize,
    extent: f64,
    avoid: &[Line],
    clearance: f64,
) -> Vec<Point3<f64>> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let p = Point3::new(
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
        );
        if avoid.iter().all(|line| line.distance_to(&p) > clearance) {
            out.push(p);
        }
    }
    out
}

fn index_set(indices: &[usize]) -> BTreeSet<usize> {
    indices.iter().copied().collect()
}

#[test]
fn test_single_track_in_noise() {
    let truth = Line::from_dir_point(0.3, 1.0, &Point3::origin()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let mut points = planted(&truth, 50, 40.0);
    points.extend(noise(&mut rng, 500, 50.0, &[truth], 30.0));

    let tracks = find_tracks(&points, &HoughConfig::default()).unwrap();
    assert!(!tracks.is_empty());

    let first = &tracks[0];
    let expected: BTreeSet<usize> = (0..50).collect();
    assert_eq!(index_set(&first.hit_indices), expected);
    let angle = first.line.direction().dot(&truth.direction()).abs().min(1.0).acos();
    assert!(angle < 0.01, "direction off by {angle} rad");

    for later in &tracks[1..] {
        assert!(later.hit_indices.iter().all(|&i| i >= 50));
    }
}

#[test]
fn test_two_disjoint_tracks() {
    let first_line = Line::from_dir_point(0.3, 1.0, &Point3::origin()).unwrap();
    let second_line = Line::from_dir_point(1.2, -2.0, &Point3::new(40.0, -20.0, 0.0)).unwrap();

    let mut points = planted(&first_line, 40, 30.0);
    points.extend(planted(&second_line, 35, 30.0));

    let tracks = find_tracks(&points, &HoughConfig::default()).unwrap();
    assert_eq!(tracks.len(), 2);

    let found: Vec<BTreeSet<usize>> = tracks.iter().map(|t| index_set(&t.hit_indices)).collect();
    let expected_first: BTreeSet<usize> = (0..40).collect();
    let expected_second: BTreeSet<usize> = (40..75).collect();
    assert!(found[0].is_disjoint(&found[1]));
    assert!(found.contains(&expected_first));
    assert!(found.contains(&expected_second));
}

#[test]
fn test_rejection_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(11);
    let points = noise(&mut rng, 30, 50.0, &[], 0.0);
    let finder = TrackFinder::new(HoughConfig::default().with_track_threshold(10)).unwrap();

    let first = finder.find_tracks(&points).unwrap();
    let second = finder.find_tracks(&points).unwrap();
    assert!(first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let truth = Line::from_dir_point(0.9, -0.7, &Point3::new(3.0, 4.0, 5.0)).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let mut points = planted(&truth, 30, 25.0);
    points.extend(noise(&mut rng, 100, 40.0, &[truth], 15.0));

    let parallel = find_tracks(&points, &HoughConfig::default()).unwrap();
    let sequential = find_tracks(&points, &HoughConfig::default().with_parallel(false)).unwrap();
    assert_eq!(parallel, sequential);
}

proptest! {
    #[test]
    fn test_votes_are_conserved(
        coords in prop::collection::vec((-20.0..20.0_f64, -20.0..20.0_f64, -20.0..20.0_f64), 1..40),
        removed in 0usize..40,
    ) {
        let points: Vec<Point3<f64>> = coords.iter().map(|&(x, y, z)| Point3::new(x, y, z)).collect();
        let config = HoughConfig::new().with_num_directions(50).with_num_positions(8);
        let mut acc = HoughAccumulator::build(&points, &config)?;
        let all: Vec<usize> = (0..points.len()).collect();
        let removed = removed.min(points.len());
        let per_point = acc.directions().len() as i64;

        acc.add_votes(&all);
        prop_assert_eq!(acc.total_votes(), per_point * points.len() as i64);

        acc.remove_votes(&all[..removed]);
        prop_assert_eq!(acc.total_votes(), per_point * (points.len() - removed) as i64);

        let best = acc.best_cell().unwrap();
        prop_assert!(best.votes >= 0);
        prop_assert_eq!(
            acc.votes_at(best.direction, best.xp_bin, best.yp_bin),
            Some(best.votes)
        );
    }
}
