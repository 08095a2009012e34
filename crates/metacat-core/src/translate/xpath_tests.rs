//! Tests for XPath validation

#[cfg(test)]
mod tests {
    use crate::translate::xpath::{quote_literal, XPath};

    #[test]
    fn test_parse_absolute_path() {
        let path = XPath::parse("/csw:Record/dc:title").unwrap();

        assert!(path.is_absolute());
        assert_eq!(path.steps(), ["csw:Record", "dc:title"]);
    }

    #[test]
    fn test_parse_descendant_with_attribute_predicate() {
        let path = XPath::parse("//gmd:title[@lang='en']/text()").unwrap();

        assert!(path.is_absolute());
        assert_eq!(path.steps().len(), 2);
        assert_eq!(path.steps()[0], "gmd:title[@lang='en']");
    }

    #[test]
    fn test_parse_relative_path_with_function_predicate() {
        let path = XPath::parse("record/keyword[contains(., 'ocean') and position() = 1]").unwrap();

        assert!(!path.is_absolute());
        assert_eq!(path.as_str(), "record/keyword[contains(., 'ocean') and position() = 1]");
    }

    #[test]
    fn test_parse_wildcard_and_index_predicate() {
        assert!(XPath::parse("/*/item[2]/@id").is_ok());
        assert!(XPath::parse("./a/../b").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        for bad in ["", "/a/", "//[x]", "/a[", "a b", "/a[@]", "/a]"] {
            assert!(XPath::parse(bad).is_err(), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = XPath::parse("/a/b[").unwrap_err();

        assert!(err.position >= 4);
        assert!(err.to_string().contains("invalid XPath"));
    }

    #[test]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
