//! Tests for geometry module

#[cfg(test)]
mod tests {
    use geo::{Area, Contains, Geometry, Point};

    use crate::geometry::*;

    // ========================================================================
    // Unit conversion
    // ========================================================================

    #[test]
    fn test_meters_degrees_conversion() {
        assert!((meters_to_degrees(METERS_PER_DEGREE) - 1.0).abs() < 1e-12);
        assert!((degrees_to_meters(meters_to_degrees(500.0)) - 500.0).abs() < 1e-9);
        // ~111 km per degree on the equator
        assert!((METERS_PER_DEGREE - 111_319.49).abs() < 1.0);
    }

    #[test]
    fn test_nearest_neighbor_limit_is_1000_nautical_miles() {
        let meters = degrees_to_meters(NEAREST_NEIGHBOR_LIMIT_DEGREES);
        assert!((meters - 1_852_000.0).abs() < 1e-6);
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_wkt_point() {
        let geometry = parse_wkt("  POINT(10 20) ").expect("parse");

        assert_eq!(geometry, Geometry::Point(Point::new(10.0, 20.0)));
    }

    #[test]
    fn test_parse_wkt_rejects_garbage() {
        for text in ["", "   ", "POINT(1", "CIRCLE(1 2, 3)"] {
            let err = parse_wkt(text).unwrap_err();
            assert_eq!(err.code(), "CAT-001", "input {text:?}");
        }
    }

    #[test]
    fn test_normalize_wkt_reparses_to_same_geometry() {
        let normalized = normalize_wkt("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").expect("normalize");

        assert!(normalized.starts_with("POLYGON(("));
        assert_eq!(
            parse_wkt(&normalized).expect("reparse"),
            parse_wkt("POLYGON((0 0,1 0,1 1,0 1,0 0))").expect("parse")
        );
    }

    // ========================================================================
    // Points
    // ========================================================================

    #[test]
    fn test_single_point() {
        let point = parse_wkt("POINT(1 2)").unwrap();
        let same = parse_wkt("MULTIPOINT((1 2),(1 2))").unwrap();
        let distinct = parse_wkt("MULTIPOINT((1 2),(3 4))").unwrap();
        let line = parse_wkt("LINESTRING(0 0,1 1)").unwrap();

        assert_eq!(single_point(&point), Some(Point::new(1.0, 2.0)));
        assert_eq!(single_point(&same), Some(Point::new(1.0, 2.0)));
        assert_eq!(single_point(&distinct), None);
        assert_eq!(single_point(&line), None);
    }

    #[test]
    fn test_representative_point_is_centroid() {
        let rect = parse_wkt("POLYGON((0 0,4 0,4 2,0 2,0 0))").unwrap();

        let point = representative_point(&rect).expect("centroid");

        assert!((point.x() - 2.0).abs() < 1e-12);
        assert!((point.y() - 1.0).abs() < 1e-12);
    }

    // ========================================================================
    // Buffer
    // ========================================================================

    #[test]
    fn test_buffer_point_is_circle() {
        // Arrange
        let point = parse_wkt("POINT(5 5)").unwrap();

        // Act
        let buffered = buffer(&point, 1.0).expect("buffer");

        // Assert
        let Geometry::Polygon(polygon) = buffered else {
            panic!("expected polygon, got {buffered:?}");
        };
        assert!(polygon.contains(&Point::new(5.0, 5.0)));
        assert!(polygon.contains(&Point::new(5.9, 5.0)));
        assert!(!polygon.contains(&Point::new(6.1, 5.0)));
        let area = polygon.unsigned_area();
        assert!(area > 3.0 && area < std::f64::consts::PI);
    }

    #[test]
    fn test_buffer_line_covers_its_corridor() {
        let line = parse_wkt("LINESTRING(0 0,10 0)").unwrap();

        let buffered = buffer(&line, 0.5).expect("buffer");

        assert!(buffered.contains(&Point::new(5.0, 0.4)));
        assert!(buffered.contains(&Point::new(-0.4, 0.0)));
        assert!(!buffered.contains(&Point::new(5.0, 0.6)));
    }

    #[test]
    fn test_buffer_polygon_keeps_interior() {
        let square = parse_wkt("POLYGON((0 0,10 0,10 10,0 10,0 0))").unwrap();

        let buffered = buffer(&square, 1.0).expect("buffer");

        assert!(buffered.contains(&Point::new(5.0, 5.0)));
        assert!(buffered.contains(&Point::new(10.5, 5.0)));
        assert!(!buffered.contains(&Point::new(11.5, 5.0)));
    }

    #[test]
    fn test_buffer_rejects_non_positive_distance() {
        let point = parse_wkt("POINT(0 0)").unwrap();

        assert!(buffer(&point, 0.0).is_err());
        assert!(buffer(&point, -1.0).is_err());
        assert!(buffer(&point, f64::INFINITY).is_err());
    }
}
