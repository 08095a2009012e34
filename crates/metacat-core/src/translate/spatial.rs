//! Spatial predicates.
//!
//! Geometry literals are parsed and re-rendered before use, so only
//! well-formed WKT ever reaches the query text.

use geo::{Geometry, Point};

use super::{FilterTranslator, Fragment, DistanceOrigin, DISTANCE_SCORE_PREFIX};
use crate::error::{Error, Result};
use crate::geometry::{self, NEAREST_NEIGHBOR_LIMIT_DEGREES, POINT_INTERSECTS_RADIUS_DEGREES};
use crate::metacard::AttributeFormat;

impl FilterTranslator {
    pub(super) fn nearest_neighbor(&self, attribute: &str, wkt: &str) -> Result<Fragment> {
        let kind = "nearest_neighbor";
        let field = self.field(kind, attribute, AttributeFormat::Geometry, true)?;
        let shape = parse(kind, attribute, wkt)?;
        let center = geometry::representative_point(&shape)?;
        Ok(self.circle(&field, attribute, center, NEAREST_NEIGHBOR_LIMIT_DEGREES))
    }

    pub(super) fn intersects(&self, attribute: &str, wkt: &str) -> Result<Fragment> {
        let kind = "intersects";
        let field = self.field(kind, attribute, AttributeFormat::Geometry, true)?;
        let shape = parse(kind, attribute, wkt)?;
        // Exact point intersection misses stored points, search a 1 m circle.
        if let Some(point) = geometry::single_point(&shape) {
            return Ok(self.circle(&field, attribute, point, POINT_INTERSECTS_RADIUS_DEGREES));
        }
        Ok(operator(&field, "Intersects", &shape))
    }

    pub(super) fn spatial_operator(
        &self,
        kind: &str,
        attribute: &str,
        wkt: &str,
        name: &str,
    ) -> Result<Fragment> {
        let field = self.field(kind, attribute, AttributeFormat::Geometry, true)?;
        let shape = parse(kind, attribute, wkt)?;
        Ok(operator(&field, name, &shape))
    }

    pub(super) fn within_distance(
        &self,
        attribute: &str,
        wkt: &str,
        meters: f64,
    ) -> Result<Fragment> {
        let kind = "within_distance";
        if !(meters.is_finite() && meters > 0.0) {
            return Err(Error::unsupported(format!(
                "{kind}: distance for '{attribute}' must be a positive number of meters, got {meters}"
            )));
        }
        let field = self.field(kind, attribute, AttributeFormat::Geometry, true)?;
        let shape = parse(kind, attribute, wkt)?;
        let degrees = geometry::meters_to_degrees(meters);

        if let Some(point) = geometry::single_point(&shape) {
            return Ok(self.circle(&field, attribute, point, degrees));
        }
        let buffered = geometry::buffer(&shape, degrees)?;
        Ok(operator(&field, "Intersects", &buffered))
    }

    fn circle(&self, field: &str, attribute: &str, center: Point<f64>, degrees: f64) -> Fragment {
        let prefix = if self.options.sort_by_distance {
            DISTANCE_SCORE_PREFIX
        } else {
            ""
        };
        Fragment {
            text: format!(
                "{prefix}{field}:\"Intersects(BUFFER(POINT({} {}), {degrees}))\"",
                center.x(),
                center.y()
            ),
            distance_sorted: self.options.sort_by_distance,
            distance_origin: Some(DistanceOrigin {
                attribute: attribute.to_string(),
                lat: center.y(),
                lon: center.x(),
            }),
        }
    }
}

fn parse(kind: &str, attribute: &str, wkt: &str) -> Result<Geometry<f64>> {
    geometry::parse_wkt(wkt).map_err(|e| Error::unsupported(format!("{kind} on '{attribute}': {e}")))
}

fn operator(field: &str, name: &str, shape: &Geometry<f64>) -> Fragment {
    Fragment::plain(format!("{field}:\"{name}({})\"", geometry::to_wkt(shape)))
}
