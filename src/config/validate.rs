//! Configuration validation.

use crate::config::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_storage(config)?;
    validate_policy(config)?;
    validate_clips(config)?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn validate_storage(config: &Config) -> Result<()> {
    let storage = &config.storage;

    if storage.bucket.trim().is_empty() {
        return Err(invalid("storage.bucket must not be empty"));
    }

    for (name, value) in [
        ("connect_timeout_secs", storage.connect_timeout_secs),
        ("listing_timeout_secs", storage.listing_timeout_secs),
        ("download_timeout_secs", storage.download_timeout_secs),
    ] {
        if value == 0 {
            return Err(invalid(format!("storage.{name} must be at least 1")));
        }
    }

    Ok(())
}

fn validate_policy(config: &Config) -> Result<()> {
    let left = config.matching.left_boundary_hours;
    if !left.is_finite() || left < 0.0 {
        return Err(invalid(format!(
            "matching.left_boundary_hours must be non-negative, got {left}"
        )));
    }

    if config.matching.default_span_secs == 0 {
        return Err(invalid("matching.default_span_secs must be at least 1"));
    }

    let fallback = config.windows.event_fallback_secs;
    if !fallback.is_finite() || fallback <= 0.0 {
        return Err(invalid(format!(
            "windows.event_fallback_secs must be positive, got {fallback}"
        )));
    }

    if config.windows.min_run_hours == 0 {
        return Err(invalid("windows.min_run_hours must be at least 1"));
    }

    Ok(())
}

fn validate_clips(config: &Config) -> Result<()> {
    if config.clips.tool_timeout_secs == 0 {
        return Err(invalid("clips.tool_timeout_secs must be at least 1"));
    }
    if config.clips.lock_max_age_hours == 0 {
        return Err(invalid("clips.lock_max_age_hours must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let mut config = Config::default();
        config.storage.bucket = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.storage.listing_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("listing_timeout_secs"));
    }

    #[test]
    fn test_non_positive_fallback_rejected() {
        let mut config = Config::default();
        config.windows.event_fallback_secs = 0.0;
        assert!(validate_config(&config).is_err());
        config.windows.event_fallback_secs = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_negative_left_boundary_rejected() {
        let mut config = Config::default();
        config.matching.left_boundary_hours = -1.0;
        assert!(validate_config(&config).is_err());
        config.matching.left_boundary_hours = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_lock_age_rejected() {
        let mut config = Config::default();
        config.clips.lock_max_age_hours = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("lock_max_age_hours"));
    }
}
