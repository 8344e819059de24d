//! Argument checks shared by the tool handlers.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 25;

const GEOMETRY_KINDS: [&str; 4] = ["POLYGON", "MULTIPOLYGON", "POINT", "MULTIPOINT"];

/// Rejected tool arguments. Reported to the agent as an `isError` result.
#[derive(Debug, Error, PartialEq)]
#[error("invalid arguments: {0}")]
pub struct ArgError(pub String);

impl ArgError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Implemented by every tool argument struct.
pub trait Validate {
    fn validate(&self) -> Result<(), ArgError>;
}

/// AOI must be a WKT geometry: known kind followed by a balanced
/// parenthesised body.
pub fn wkt(field: &str, value: &str) -> Result<(), ArgError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ArgError::new(format!("{} must be a non-empty WKT string", field)));
    }

    let Some(open) = trimmed.find('(') else {
        return Err(ArgError::new(format!("{} is not WKT: missing coordinates", field)));
    };
    let kind = trimmed[..open].trim().to_ascii_uppercase();
    if !GEOMETRY_KINDS.contains(&kind.as_str()) {
        return Err(ArgError::new(format!(
            "{} must be one of {} (got {:?})",
            field,
            GEOMETRY_KINDS.join(", "),
            kind
        )));
    }

    let mut depth = 0i32;
    for c in trimmed[open..].chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 || !trimmed.ends_with(')') {
        return Err(ArgError::new(format!("{} has unbalanced parentheses", field)));
    }
    Ok(())
}

pub fn timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ArgError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ArgError::new(format!("{} must be an RFC 3339 timestamp: {}", field, e)))
}

/// Both ends parse and `from` is strictly before `to`.
pub fn window(from_field: &str, from: &str, to_field: &str, to: &str) -> Result<(), ArgError> {
    let start = timestamp(from_field, from)?;
    let end = timestamp(to_field, to)?;
    if start >= end {
        return Err(ArgError::new(format!(
            "{} must be before {}",
            from_field, to_field
        )));
    }
    Ok(())
}

pub fn page_size(value: Option<u32>) -> Result<u32, ArgError> {
    let size = value.unwrap_or(DEFAULT_PAGE_SIZE);
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(ArgError::new(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(size)
}

pub fn webhook_url(value: &str) -> Result<(), ArgError> {
    let url = reqwest::Url::parse(value.trim())
        .map_err(|e| ArgError::new(format!("webhook_url is not a URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err(ArgError::new("webhook_url has no host")),
        other => Err(ArgError::new(format!(
            "webhook_url must use http or https, not {}",
            other
        ))),
    }
}

/// Ids are interpolated into paths, so only URL-safe characters pass.
pub fn resource_id(field: &str, value: &str) -> Result<(), ArgError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ArgError::new(format!(
            "{} must be non-empty and contain only letters, digits, '-' or '_'",
            field
        )))
    }
}

pub fn required(field: &str, value: &str) -> Result<(), ArgError> {
    if value.trim().is_empty() {
        return Err(ArgError::new(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub fn percent(field: &str, value: Option<f64>) -> Result<(), ArgError> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(ArgError::new(format!(
            "{} must be between 0 and 100",
            field
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "POLYGON((-97.72 30.28, -97.71 30.28, -97.71 30.27, -97.72 30.27, -97.72 30.28))";

    #[test]
    fn test_wkt_accepts_polygons() {
        assert!(wkt("aoi", SQUARE).is_ok());
        assert!(wkt("aoi", "multipolygon (((0 0, 1 0, 1 1, 0 0)))").is_ok());
    }

    #[test]
    fn test_wkt_rejects_garbage() {
        assert!(wkt("aoi", "").is_err());
        assert!(wkt("aoi", "   ").is_err());
        assert!(wkt("aoi", "Austin, TX").is_err());
        assert!(wkt("aoi", "LINESTRING(0 0, 1 1)").is_err());
        assert!(wkt("aoi", "POLYGON((0 0, 1 0, 1 1, 0 0)").is_err());
        assert!(wkt("aoi", "POLYGON((0 0)))((").is_err());
    }

    #[test]
    fn test_window_order() {
        assert!(window("from", "2026-01-01T00:00:00Z", "to", "2026-01-02T00:00:00Z").is_ok());

        let err = window("from", "2026-01-02T00:00:00Z", "to", "2026-01-01T00:00:00Z").unwrap_err();
        assert_eq!(err.0, "from must be before to");

        assert!(window("from", "2026-01-01T00:00:00Z", "to", "2026-01-01T00:00:00Z").is_err());
        assert!(window("from", "yesterday", "to", "2026-01-01T00:00:00Z").is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(page_size(None), Ok(DEFAULT_PAGE_SIZE));
        assert_eq!(page_size(Some(1)), Ok(1));
        assert_eq!(page_size(Some(100)), Ok(100));
        assert!(page_size(Some(0)).is_err());
        assert!(page_size(Some(101)).is_err());
    }

    #[test]
    fn test_webhook_schemes() {
        assert!(webhook_url("https://hooks.example.com/skyfi").is_ok());
        assert!(webhook_url("http://10.0.0.5:8080/cb").is_ok());
        assert!(webhook_url("ftp://example.com/x").is_err());
        assert!(webhook_url("not a url").is_err());
    }

    #[test]
    fn test_resource_id() {
        assert!(resource_id("order_id", "3f2a-9c_01").is_ok());
        assert!(resource_id("order_id", "").is_err());
        assert!(resource_id("order_id", "../admin").is_err());
    }
}
