//! Tests for predicate module

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::metacard::AttributeFormat;
    use crate::predicate::*;

    // ========================================================================
    // Literal tests
    // ========================================================================

    #[test]
    fn test_literal_formats() {
        assert_eq!(Literal::from("x").format(), AttributeFormat::String);
        assert_eq!(Literal::from(3).format(), AttributeFormat::Long);
        assert_eq!(Literal::from(1.5).format(), AttributeFormat::Double);
        assert_eq!(Literal::from(true).format(), AttributeFormat::Boolean);
        assert_eq!(
            Literal::from(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()).format(),
            AttributeFormat::Date
        );
    }

    #[test]
    fn test_literal_number_text() {
        assert_eq!(Literal::Integer(-5).number_text().as_deref(), Some("-5"));
        assert_eq!(Literal::Float(2.5).number_text().as_deref(), Some("2.5"));
        assert_eq!(Literal::Text("5".into()).number_text(), None);
        assert!(Literal::Integer(1).is_numeric());
        assert!(!Literal::Boolean(true).is_numeric());
    }

    // ========================================================================
    // Builder tests
    // ========================================================================

    #[test]
    fn test_builders_set_case_sensitivity() {
        assert!(matches!(
            Predicate::equals("title", "x"),
            Predicate::Equals {
                case_sensitive: true,
                ..
            }
        ));
        assert!(matches!(
            Predicate::like("title", "x*"),
            Predicate::Like {
                case_sensitive: false,
                ..
            }
        ));
        assert!(matches!(
            Predicate::like_case_sensitive("title", "x*"),
            Predicate::Like {
                case_sensitive: true,
                ..
            }
        ));
        assert!(matches!(
            Predicate::xpath_like("/a", "b"),
            Predicate::XPathLike {
                case_sensitive: false,
                ..
            }
        ));
    }

    #[test]
    fn test_kind_names() {
        let now = Utc::now();
        let cases = [
            (Predicate::Include, "include"),
            (Predicate::Exclude, "exclude"),
            (Predicate::gt("n", 1), "greater_than"),
            (Predicate::lte("n", 1), "less_than_or_equal"),
            (Predicate::between("n", 1, 2), "between"),
            (Predicate::during("d", now, now), "during"),
            (Predicate::relative("d", Duration::from_secs(60)), "relative"),
            (Predicate::nearest_neighbor("g", "POINT(0 0)"), "nearest_neighbor"),
            (Predicate::within_distance("g", "POINT(0 0)", 1.0), "within_distance"),
            (Predicate::xpath_exists("/a"), "xpath_exists"),
            (Predicate::or(vec![]), "or"),
            (Predicate::not(Predicate::Include), "not"),
        ];

        for (predicate, kind) in cases {
            assert_eq!(predicate.kind(), kind);
        }
    }

    // ========================================================================
    // Serialization tests
    // ========================================================================

    #[test]
    fn test_predicate_json_shape() {
        // Arrange
        let predicate = Predicate::equals("title", "harbor");

        // Act
        let json = serde_json::to_value(&predicate).expect("serialize");

        // Assert
        assert_eq!(
            json,
            serde_json::json!({
                "type": "equals",
                "attribute": "title",
                "literal": {"type": "text", "value": "harbor"},
                "case_sensitive": true
            })
        );
    }

    #[test]
    fn test_nested_predicate_from_json() {
        // Arrange
        let json = r#"{
            "type": "and",
            "operands": [
                {"type": "fuzzy", "attribute": "title", "phrase": "harbor"},
                {"type": "not", "operand": {"type": "exclude"}}
            ]
        }"#;

        // Act
        let predicate: Predicate = serde_json::from_str(json).expect("deserialize");

        // Assert
        assert_eq!(
            predicate,
            Predicate::and(vec![
                Predicate::fuzzy("title", "harbor"),
                Predicate::not(Predicate::Exclude),
            ])
        );
    }
}
