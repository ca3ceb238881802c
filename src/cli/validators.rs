//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::utils::TimeInstant;
use crate::utils::sites::code_for_label;
use crate::utils::timestamp::parse_iso;

/// Accept a site code or friendly label, returning the lower-cased code.
pub fn parse_site(s: &str) -> Result<String, String> {
    let code = code_for_label(s);
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("'{s}' is not a site code or label"));
    }
    Ok(code)
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` listing bound.
pub fn parse_utc_bound(s: &str) -> Result<TimeInstant, String> {
    let trimmed = s.trim();
    if !trimmed.ends_with('Z') {
        return Err(format!("'{s}' must look like 2019-01-01T00:00:00Z"));
    }
    parse_iso(trimmed).ok_or_else(|| format!("'{s}' must look like 2019-01-01T00:00:00Z"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_site_valid() {
        assert_eq!(parse_site("ci01").ok(), Some("ci01".to_string()));
        assert_eq!(parse_site(" HI03 ").ok(), Some("hi03".to_string()));
        assert_eq!(
            parse_site("Florida Keys - FK02").ok(),
            Some("fk02".to_string())
        );
    }

    #[test]
    fn test_parse_site_invalid() {
        assert!(parse_site("").is_err());
        assert!(parse_site("ci 01").is_err());
        assert!(parse_site("../x").is_err());
    }

    #[test]
    fn test_parse_utc_bound() {
        assert_eq!(
            parse_utc_bound("2019-01-01T05:30:00Z").unwrap(),
            Utc.with_ymd_and_hms(2019, 1, 1, 5, 30, 0).unwrap()
        );
        assert!(parse_utc_bound("2019-01-01T05:30:00").is_err());
        assert!(parse_utc_bound("tomorrowZ").is_err());
    }
}
