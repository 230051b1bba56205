//! Ellipsoidal distances for segment lengths.

use geo::{Coord, Distance, Geodesic, Point};

pub const METERS_PER_MILE: f64 = 1609.344;

/// Offset added to both coordinates of a point that repeats its
/// predecessor, roughly 2 cm on the ground.
pub const COORD_OFFSET_DEG: f64 = 0.000_000_1;

/// Geodesic distance in statute miles on the WGS84 ellipsoid (Karney 2013).
///
/// Coordinates are `x = longitude`, `y = latitude` in degrees.
pub fn geodesic_miles(from: Coord<f64>, to: Coord<f64>) -> f64 {
    Geodesic::distance(Point::from(from), Point::from(to)) / METERS_PER_MILE
}

/// `c` shifted by [`COORD_OFFSET_DEG`] on both axes.
pub fn offset(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: c.x + COORD_OFFSET_DEG,
        y: c.y + COORD_OFFSET_DEG,
    }
}
