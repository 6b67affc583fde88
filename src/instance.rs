//! Distance model for TSP instances.
//!
//! Cities are 2D or 3D points. The [`DistanceMatrix`] is built once from the
//! points and is the only place tour lengths are computed, so every strategy
//! compares routes against the same numbers.

use crate::error::{Result, TspError};
use serde::{Deserialize, Serialize};

/// A city location in two or three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate, present only for 3D points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y, z: None }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z: Some(z) }
    }

    /// Number of coordinates (2 or 3)
    pub fn dimension(&self) -> usize {
        if self.z.is_some() { 3 } else { 2 }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }

    /// Euclidean distance to another point of the same dimension
    pub fn euclidean(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<(f64, f64, f64)> for Point {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Point::new_3d(x, y, z)
    }
}

/// How point-to-point distances are derived from coordinates
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Plain Euclidean distance
    #[default]
    Euclidean,
    /// Euclidean distance truncated towards zero, matching integer arc costs
    /// used by reference solvers
    TruncatedEuclidean,
}

/// Symmetric matrix of distances between every pair of cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct DistanceMatrix {
    /// Number of cities
    dimension: usize,
    /// Row-major distances, `rows[i][j]`
    rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Build the Euclidean distance matrix of a point set
    pub fn from_points(points: &[Point]) -> Result<Self> {
        Self::with_metric(points, Metric::Euclidean)
    }

    /// Build the distance matrix of a point set with the given metric
    pub fn with_metric(points: &[Point], metric: Metric) -> Result<Self> {
        let first = points.first().ok_or(TspError::EmptyInput)?;
        let expected = first.dimension();

        for (index, point) in points.iter().enumerate() {
            if point.dimension() != expected {
                return Err(TspError::DimensionMismatch {
                    index,
                    expected,
                    found: point.dimension(),
                });
            }
            if !point.is_finite() {
                return Err(TspError::config(format!("point {} has a non-finite coordinate", index)));
            }
        }

        let n = points.len();
        let mut rows = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let mut d = points[i].euclidean(&points[j]);
                if metric == Metric::TruncatedEuclidean {
                    d = d.trunc();
                }
                if !d.is_finite() {
                    return Err(TspError::config(format!("distance between {} and {} is not finite", i, j)));
                }
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }

        check_tour_bound(&rows)?;
        Ok(DistanceMatrix { dimension: n, rows })
    }

    /// Wrap a caller-supplied distance table.
    ///
    /// The table must be square, finite, non-negative, symmetric and zero on
    /// the diagonal.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(TspError::EmptyInput);
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(TspError::config(format!(
                    "distance row {} has {} entries, expected {}", i, row.len(), n
                )));
            }
            for (j, &d) in row.iter().enumerate() {
                if !d.is_finite() || d < 0.0 {
                    return Err(TspError::config(format!("distance ({}, {}) = {} is not a finite non-negative value", i, j, d)));
                }
                if i == j && d != 0.0 {
                    return Err(TspError::config(format!("diagonal entry ({}, {}) must be zero", i, i)));
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if (rows[i][j] - rows[j][i]).abs() > 1e-9 {
                    return Err(TspError::config(format!("distance matrix is not symmetric at ({}, {})", i, j)));
                }
            }
        }

        check_tour_bound(&rows)?;
        Ok(DistanceMatrix { dimension: n, rows })
    }

    /// Number of cities
    #[inline]
    pub fn len(&self) -> usize {
        self.dimension
    }

    /// Always false for a constructed matrix; kept for API symmetry with `len`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dimension == 0
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    /// Row of distances from one city
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Closed tour length: sums `d(route[i], route[(i + 1) % n])`.
    ///
    /// Routes with fewer than two cities have length zero.
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..tour.len() - 1 {
            length += self.distance(tour[i], tour[i + 1]);
        }

        length += self.distance(tour[tour.len() - 1], tour[0]);

        length
    }

    /// Summary statistics of the off-diagonal distances
    pub fn statistics(&self) -> MatrixStatistics {
        let n = self.dimension;
        let mut total = 0.0;
        let mut max_distance: f64 = 0.0;
        let mut pairs = 0usize;

        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.rows[i][j];
                total += d;
                max_distance = max_distance.max(d);
                pairs += 1;
            }
        }

        MatrixStatistics {
            dimension: n,
            avg_distance: if pairs > 0 { total / pairs as f64 } else { 0.0 },
            max_distance,
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for DistanceMatrix {
    type Error = TspError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        DistanceMatrix::from_rows(rows)
    }
}

impl From<DistanceMatrix> for Vec<Vec<f64>> {
    fn from(matrix: DistanceMatrix) -> Self {
        matrix.rows
    }
}

/// Any closed tour sums `n` entries, so `n * max` must stay finite
fn check_tour_bound(rows: &[Vec<f64>]) -> Result<()> {
    let max = rows
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(0.0_f64, f64::max);
    if !(max * rows.len() as f64).is_finite() {
        return Err(TspError::config(format!(
            "tour lengths overflow: {} cities with distances up to {:e}",
            rows.len(),
            max
        )));
    }
    Ok(())
}

/// Statistics about a distance matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixStatistics {
    pub dimension: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for MatrixStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cities: {}", self.dimension)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

/// Parse points from whitespace-separated columns: a line of x values, a
/// line of y values and an optional line of z values.
pub fn parse_points(text: &str) -> Result<Vec<Point>> {
    let lines: Vec<Vec<f64>> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(number, line)| {
            line.split_whitespace()
                .map(|value| {
                    value.parse::<f64>().map_err(|e| {
                        TspError::config(format!("line {}: cannot parse '{}': {}", number + 1, value, e))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    match lines.as_slice() {
        [] => Err(TspError::EmptyInput),
        [xs, ys] | [xs, ys, _] if xs.len() != ys.len() => Err(TspError::config(format!(
            "{} x values but {} y values",
            xs.len(),
            ys.len()
        ))),
        [xs, ys] => Ok(xs.iter().zip(ys).map(|(&x, &y)| Point::new(x, y)).collect()),
        [xs, ys, zs] => {
            if zs.len() != xs.len() {
                return Err(TspError::config(format!(
                    "{} x values but {} z values",
                    xs.len(),
                    zs.len()
                )));
            }
            Ok(xs
                .iter()
                .zip(ys)
                .zip(zs)
                .map(|((&x, &y), &z)| Point::new_3d(x, y, z))
                .collect())
        }
        other => Err(TspError::config(format!(
            "expected 2 or 3 coordinate lines, found {}",
            other.len()
        ))),
    }
}

/// Load points from a file in the [`parse_points`] format
pub fn load_points<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<Point>> {
    let text = std::fs::read_to_string(path)?;
    parse_points(&text)
}

/// `n` uniform random 2D points in `[0, 1000]^2`
pub fn random_points(n: usize, seed: u64) -> Vec<Point> {
    use rand::{Rng, SeedableRng};

    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| Point::new(rng.gen_range(0.0..=1000.0), rng.gen_range(0.0..=1000.0)))
        .collect()
}
