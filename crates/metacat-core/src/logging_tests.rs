//! Tests for logging module

#[cfg(test)]
mod tests {
    use crate::config::LoggingConfig;
    use crate::logging::init;

    #[test]
    fn test_init_twice_is_harmless() {
        // Arrange
        let config = LoggingConfig {
            level: "debug".into(),
            format: "json".into(),
        };

        // Act
        init(&config);
        let second = init(&LoggingConfig::default());

        // Assert - a subscriber is already installed
        assert!(!second);
    }
}
