//! # Geographic Utilities
//!
//! The geometry kernel behind loop detection and zone ownership.
//!
//! Every function here is pure and total: degenerate input (empty tracks,
//! fewer than three vertices) produces a degenerate answer such as `0.0` or
//! `false` instead of an error. NaN coordinates propagate as NaN.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`polyline_length`] | Total length of a path in meters |
//! | [`steps_from_distance`] | Stride-based step estimate for a distance |
//! | [`is_loop_closed`] | Whether a path has returned to its start |
//! | [`compute_center`] | Arithmetic-mean centroid of a set of points |
//! | [`polygon_area`] | Area of a small loop in square meters |
//! | [`point_in_polygon`] | Even-odd containment test |
//! | [`compute_bounds`] | Bounding box of a set of points |
//!
//! ## Example
//!
//! ```rust
//! use territory_core::{GeoPoint, geo_utils};
//!
//! let square = vec![
//!     GeoPoint::new(51.5000, -0.1300),
//!     GeoPoint::new(51.5000, -0.1290),
//!     GeoPoint::new(51.5010, -0.1290),
//!     GeoPoint::new(51.5010, -0.1300),
//! ];
//!
//! let center = geo_utils::compute_center(&square);
//! assert!(geo_utils::point_in_polygon(&center, &square));
//!
//! let area = geo_utils::polygon_area(&square);
//! println!("Loop covers {:.0} m²", area);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius 6,371 km. Area
//! uses an equirectangular projection followed by the shoelace formula, which
//! is only accurate for loops that are small relative to the Earth (a running
//! loop, not a country). Containment runs the ray-casting test directly in
//! (longitude, latitude) space.

use geo::{Area, Coord, LineString, Polygon};
use crate::{Bounds, GeoPoint};

/// Sphere radius used for every distance and area computation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average stride length used to turn distance into steps.
pub const STRIDE_LENGTH_M: f64 = 0.76;

/// Loop-closure distance used by the game: 20 m between first and last fix.
pub const DEFAULT_CLOSURE_THRESHOLD_M: f64 = 20.0;

/// Minimum number of fixes before a path may count as a loop.
pub const DEFAULT_MIN_LOOP_POINTS: usize = 10;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns the distance in meters on a sphere of radius [`EARTH_RADIUS_M`].
///
/// # Example
///
/// ```rust
/// use territory_core::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_500.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let d_phi = (p2.latitude - p1.latitude).to_radians();
    let d_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate the total length of a path in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// paths return 0.0.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Estimate a step count from distance covered, assuming a 0.76 m stride.
///
/// Used as the fallback when the motion sensor under-reports.
#[inline]
pub fn steps_from_distance(meters: f64) -> u32 {
    // `as` saturates, so negative or NaN input yields 0
    (meters / STRIDE_LENGTH_M).round() as u32
}

// =============================================================================
// Loop Detection
// =============================================================================

/// Check whether a path has closed into a loop.
///
/// True iff the path has at least `min_points` points and its last point lies
/// within `threshold_meters` of its first.
///
/// # Example
///
/// ```rust
/// use territory_core::{GeoPoint, geo_utils};
///
/// let start = GeoPoint::new(51.5, -0.13);
/// let mut path: Vec<GeoPoint> = (0..9)
///     .map(|i| GeoPoint::new(51.5 + i as f64 * 0.0002, -0.13))
///     .collect();
/// assert!(!geo_utils::is_loop_closed(&path, 20.0, 10));
///
/// path.push(start);
/// assert!(geo_utils::is_loop_closed(&path, 20.0, 10));
/// ```
pub fn is_loop_closed(points: &[GeoPoint], threshold_meters: f64, min_points: usize) -> bool {
    if points.len() < min_points {
        return false;
    }
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => haversine_distance(first, last) <= threshold_meters,
        _ => false,
    }
}

// =============================================================================
// Polygon Functions
// =============================================================================

/// Compute the centroid of a set of points.
///
/// Returns the arithmetic mean of all latitude and longitude values. This is
/// a vertex average, not an area-weighted centroid, which is close enough for
/// small loops. Returns (0, 0) for empty input.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GeoPoint::new(sum_lat / n, sum_lng / n)
}

/// Approximate area of a closed loop in square meters.
///
/// Each vertex is projected with `x = λ·cos(φ)·R`, `y = φ·R` and the shoelace
/// formula is applied to the resulting ring (closed implicitly from the last
/// vertex back to the first). Returns 0.0 for fewer than 3 points.
pub fn polygon_area(points: &[GeoPoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let ring: Vec<Coord> = points.iter().map(project_equirectangular).collect();
    Polygon::new(LineString::new(ring), vec![]).unsigned_area()
}

fn project_equirectangular(p: &GeoPoint) -> Coord {
    let lat = p.latitude.to_radians();
    let lng = p.longitude.to_radians();
    Coord {
        x: lng * lat.cos() * EARTH_RADIUS_M,
        y: lat * EARTH_RADIUS_M,
    }
}

/// Even-odd ray-casting containment test.
///
/// Works in (longitude, latitude) space and treats `polygon` as a closed ring.
/// Points exactly on an edge may fall either way; self-intersecting rings get
/// whatever the even-odd rule yields.
///
/// # Example
///
/// ```rust
/// use territory_core::{GeoPoint, geo_utils};
///
/// let square = [
///     GeoPoint::new(0.0, 0.0),
///     GeoPoint::new(0.0, 10.0),
///     GeoPoint::new(10.0, 10.0),
///     GeoPoint::new(10.0, 0.0),
/// ];
/// assert!(geo_utils::point_in_polygon(&GeoPoint::new(5.0, 5.0), &square));
/// assert!(!geo_utils::point_in_polygon(&GeoPoint::new(15.0, 15.0), &square));
/// ```
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;

    let mut j = match polygon.len() {
        0 => return false,
        n => n - 1,
    };
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);

        let crosses = (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of points.
///
/// For empty input, returns a bounds with MIN/MAX values that contains nothing.
pub fn compute_bounds(points: &[GeoPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Unit Tests
// =============================================================================
