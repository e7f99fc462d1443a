//! Point clouds stored as JSON.
//!
//! The file holds a JSON array of rows. Three-column rows are taken as
//! `(x, y, z)` points directly. Rows of nine or more columns are raw hit
//! rows: pixel x, pixel y and timestamp (columns 3, 4 and 8) are scaled
//! with a [`PointScale`], the time axis measured from the first row.

use crate::{Error, Result};
use larreco_core::{Point3, PointScale};
use std::fs;
use std::path::Path;

const RAW_X: usize = 3;
const RAW_Y: usize = 4;
const RAW_TS: usize = 8;

/// Loads a point cloud from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if its rows are
/// ragged or have an unsupported column count.
pub fn load_points_json<P: AsRef<Path>>(path: P, scale: &PointScale) -> Result<Vec<Point3<f64>>> {
    let text = fs::read_to_string(path)?;
    parse_points_json(&text, scale)
}

/// Parses a point cloud from JSON text. See [`load_points_json`].
///
/// # Errors
/// Returns an error for malformed JSON or unsupported row shapes.
pub fn parse_points_json(text: &str, scale: &PointScale) -> Result<Vec<Point3<f64>>> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(text)?;
    let Some(width) = rows.first().map(Vec::len) else {
        return Ok(Vec::new());
    };
    if let Some(bad) = rows.iter().position(|row| row.len() != width) {
        return Err(Error::InvalidFormat(format!(
            "row {bad} has {} columns, expected {width}",
            rows[bad].len()
        )));
    }

    match width {
        3 => Ok(rows
            .iter()
            .map(|row| Point3::new(row[0], row[1], row[2]))
            .collect()),
        w if w > RAW_TS => {
            let t0 = rows[0][RAW_TS];
            Ok(rows
                .iter()
                .map(|row| {
                    Point3::new(
                        row[RAW_X] * scale.xy_scale,
                        row[RAW_Y] * scale.xy_scale,
                        (row[RAW_TS] - t0) * scale.time_scale,
                    )
                })
                .collect())
        }
        w => Err(Error::InvalidFormat(format!(
            "point rows need 3 or at least {} columns, found {w}",
            RAW_TS + 1
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_plain_points() {
        let points = parse_points_json("[[1, 2, 3], [4.5, 5, 6]]", &PointScale::default()).unwrap();
        assert_eq!(points, vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.5, 5.0, 6.0)]);
    }

    #[test]
    fn test_raw_rows_are_scaled() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[0,0,0,100,200,0,0,0,5000,0,0,0], [0,0,0,110,190,0,0,0,7000,0,0,0]]"
        )
        .unwrap();
        file.flush().unwrap();

        let points = load_points_json(file.path(), &PointScale::default()).unwrap();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0], Point3::new(10.0, 20.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(points[1], Point3::new(11.0, 19.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_empty_and_invalid() {
        let scale = PointScale::default();
        assert!(parse_points_json("[]", &scale).unwrap().is_empty());
        assert!(matches!(
            parse_points_json("[[1, 2, 3, 4]]", &scale),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_points_json("[[1, 2, 3], [1, 2]]", &scale),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(parse_points_json("{", &scale), Err(Error::Json(_))));
    }
}
