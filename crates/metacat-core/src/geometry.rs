//! Geometry helpers for spatial predicates.
//!
//! Geometries arrive as WKT, are parsed with the `wkt` crate into `geo`
//! types, and leave again as WKT in the dialect the index accepts.
//! Distances in the index are angular (degrees on a sphere), so every
//! caller-supplied distance goes through [`meters_to_degrees`] first.

use std::f64::consts::PI;

use geo::{BooleanOps, Centroid, Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use wkt::{ToWkt, TryFromWkt};

use crate::error::{Error, Result};

/// WGS84 equatorial radius.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Length of one degree of arc on the equator.
pub const METERS_PER_DEGREE: f64 = 2.0 * PI * EARTH_RADIUS_METERS / 360.0;

/// One international nautical mile.
pub const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Search radius ceiling for nearest-neighbor predicates (1000 NM).
pub const NEAREST_NEIGHBOR_LIMIT_DEGREES: f64 =
    1000.0 * METERS_PER_NAUTICAL_MILE / METERS_PER_DEGREE;

/// Radius used in place of an exact point intersection (1 m).
pub const POINT_INTERSECTS_RADIUS_DEGREES: f64 = 1.0 / METERS_PER_DEGREE;

/// Segments used to approximate a full circle when buffering.
pub const CIRCLE_SEGMENTS: usize = 32;

/// Converts meters to degrees of arc.
#[must_use]
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Converts degrees of arc to meters.
#[must_use]
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}

/// Parses WKT into a geometry.
///
/// # Errors
///
/// Returns `UnsupportedOperation` when the text is not valid WKT.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::unsupported("Empty WKT geometry"));
    }
    Geometry::<f64>::try_from_wkt_str(trimmed)
        .map_err(|e| Error::unsupported(format!("Unparsable WKT geometry '{trimmed}': {e}")))
}

/// Renders a geometry in the WKT dialect accepted by the index.
#[must_use]
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}

/// Parses and re-renders WKT, normalizing case and whitespace.
///
/// # Errors
///
/// Returns `UnsupportedOperation` when the text is not valid WKT.
pub fn normalize_wkt(text: &str) -> Result<String> {
    parse_wkt(text).map(|g| to_wkt(&g))
}

/// Returns the geometry as a single point when it is one: a point, or a
/// multi-point whose members all share one coordinate.
#[must_use]
pub fn single_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::MultiPoint(mp) => {
            let first = mp.0.first()?;
            mp.0.iter().all(|p| p == first).then_some(*first)
        }
        _ => None,
    }
}

/// The point itself for point geometries, otherwise the centroid.
///
/// # Errors
///
/// Returns `UnsupportedOperation` for empty geometries.
pub fn representative_point(geometry: &Geometry<f64>) -> Result<Point<f64>> {
    if let Some(point) = single_point(geometry) {
        return Ok(point);
    }
    geometry
        .centroid()
        .ok_or_else(|| Error::unsupported("Geometry has no centroid (empty geometry)"))
}

/// Buffers a geometry outward by `degrees`.
///
/// The result is the union of the areal parts of the input, a rectangle
/// around every edge and a [`CIRCLE_SEGMENTS`]-gon around every vertex.
///
/// # Errors
///
/// Returns `UnsupportedOperation` for a non-positive distance or an empty
/// geometry.
pub fn buffer(geometry: &Geometry<f64>, degrees: f64) -> Result<Geometry<f64>> {
    if !(degrees.is_finite() && degrees > 0.0) {
        return Err(Error::unsupported(format!(
            "Buffer distance must be positive, got {degrees}"
        )));
    }

    let mut parts = BufferParts::default();
    parts.collect(geometry);

    let mut pieces: Vec<Polygon<f64>> = parts.areas;
    for path in &parts.paths {
        for pair in path.windows(2) {
            if let Some(rect) = edge_rectangle(pair[0], pair[1], degrees) {
                pieces.push(rect);
            }
        }
        for coord in path {
            pieces.push(circle(*coord, degrees));
        }
    }

    let mut pieces = pieces.into_iter();
    let first = pieces
        .next()
        .ok_or_else(|| Error::unsupported("Cannot buffer an empty geometry"))?;
    let merged = pieces.fold(MultiPolygon::new(vec![first]), |acc, piece| {
        acc.union(&MultiPolygon::new(vec![piece]))
    });

    let mut polygons = merged.0;
    Ok(if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    })
}

#[derive(Default)]
struct BufferParts {
    areas: Vec<Polygon<f64>>,
    paths: Vec<Vec<Coord<f64>>>,
}

impl BufferParts {
    fn collect(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => self.paths.push(vec![p.0]),
            Geometry::MultiPoint(mp) => self.paths.extend(mp.0.iter().map(|p| vec![p.0])),
            Geometry::Line(l) => self.paths.push(vec![l.start, l.end]),
            Geometry::LineString(ls) => self.paths.push(ls.0.clone()),
            Geometry::MultiLineString(mls) => {
                self.paths.extend(mls.0.iter().map(|ls| ls.0.clone()));
            }
            Geometry::Polygon(poly) => self.polygon(poly),
            Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| self.polygon(p)),
            Geometry::Rect(r) => self.polygon(&r.to_polygon()),
            Geometry::Triangle(t) => self.polygon(&t.to_polygon()),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.collect(g)),
        }
    }

    fn polygon(&mut self, polygon: &Polygon<f64>) {
        self.areas.push(polygon.clone());
        self.paths.push(polygon.exterior().0.clone());
        self.paths
            .extend(polygon.interiors().iter().map(|ring| ring.0.clone()));
    }
}

fn edge_rectangle(a: Coord<f64>, b: Coord<f64>, r: f64) -> Option<Polygon<f64>> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return None;
    }
    let n = Coord {
        x: -dy / len * r,
        y: dx / len * r,
    };
    Some(Polygon::new(
        LineString::from(vec![a + n, b + n, b - n, a - n, a + n]),
        vec![],
    ))
}

fn circle(center: Coord<f64>, r: f64) -> Polygon<f64> {
    let mut ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / CIRCLE_SEGMENTS as f64;
            Coord {
                x: center.x + r * theta.cos(),
                y: center.y + r * theta.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::from(ring), vec![])
}
