//! Error types for location assembly, filtering and serialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the location engine.
pub type RiseResult<T> = Result<T, RiseError>;

/// Errors raised while merging, filtering or serializing location responses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiseError {
    /// The upstream body does not have the expected structure.
    #[error("Malformed upstream response: {0}")]
    MalformedInput(String),

    /// Two data records share the same `id`.
    #[error("Duplicate location '{id}' found in pages '{first_page}' and '{second_page}'")]
    DuplicateRecord {
        id: String,
        first_page: String,
        second_page: String,
    },

    /// A client-supplied filter expression could not be parsed.
    #[error("Invalid value '{value}' for '{param}': expected {expected}")]
    InvalidFilterExpression {
        param: String,
        value: String,
        expected: String,
    },

    /// An operation was called on data that does not satisfy its preconditions.
    #[error("Precondition failed: {0}")]
    MissingPrecondition(String),

    /// A property filter names a property that has no declared type.
    #[error("Property '{property}' is not present in the fields mapping")]
    UnresolvableProperty { property: String },

    /// Property filters were supplied without a fields mapping.
    #[error("Property filters require a fields mapping but none is configured")]
    MissingFieldsMapping,

    /// A single-feature lookup matched nothing.
    #[error("Location not found: {0}")]
    LocationNotFound(String),
}

impl RiseError {
    /// Shorthand for [`RiseError::InvalidFilterExpression`].
    pub fn invalid_filter(
        param: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        RiseError::InvalidFilterExpression {
            param: param.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Shorthand for [`RiseError::MalformedInput`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        RiseError::MalformedInput(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RiseError::MalformedInput(_) => 502,
            RiseError::DuplicateRecord { .. } => 502,
            RiseError::InvalidFilterExpression { .. } => 400,
            RiseError::MissingPrecondition(_) => 500,
            RiseError::UnresolvableProperty { .. } => 400,
            RiseError::MissingFieldsMapping => 400,
            RiseError::LocationNotFound(_) => 404,
        }
    }

    /// Whether the client caused this error (bad filter, unknown property, no match).
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            RiseError::InvalidFilterExpression { .. }
                | RiseError::UnresolvableProperty { .. }
                | RiseError::MissingFieldsMapping
                | RiseError::LocationNotFound(_)
        )
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        let detail = self.to_string();
        match self {
            RiseError::LocationNotFound(_) => ExceptionResponse::not_found(detail),
            RiseError::InvalidFilterExpression { .. }
            | RiseError::UnresolvableProperty { .. }
            | RiseError::MissingFieldsMapping => ExceptionResponse::bad_request(detail),
            RiseError::MalformedInput(_) | RiseError::DuplicateRecord { .. } => {
                ExceptionResponse::bad_gateway(detail)
            }
            RiseError::MissingPrecondition(_) => ExceptionResponse::internal_error(detail),
        }
    }
}

impl From<serde_json::Error> for RiseError {
    fn from(err: serde_json::Error) -> Self {
        RiseError::MalformedInput(err.to_string())
    }
}

/// Exception body handed to the boundary layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Exception type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Detailed error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// URI of the request that caused the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

const EXCEPTION_BASE: &str = "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0";

impl ExceptionResponse {
    /// Create a new exception response.
    pub fn new(type_: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            title: None,
            status: Some(status),
            detail: Some(detail.into()),
            instance: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the instance URI.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(format!("{}/not-found", EXCEPTION_BASE), 404, detail).with_title("Not Found")
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            format!("{}/invalid-parameter-value", EXCEPTION_BASE),
            400,
            detail,
        )
        .with_title("Bad Request")
    }

    /// The upstream RISE API returned something we could not use.
    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(format!("{}/upstream-error", EXCEPTION_BASE), 502, detail)
            .with_title("Bad Gateway")
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(format!("{}/server-error", EXCEPTION_BASE), 500, detail)
            .with_title("Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(RiseError::malformed("x").status_code(), 502);
        assert_eq!(
            RiseError::invalid_filter("bbox", "1,2", "4 or 6 numbers").status_code(),
            400
        );
        assert_eq!(RiseError::MissingPrecondition("x".into()).status_code(), 500);
        assert_eq!(RiseError::MissingFieldsMapping.status_code(), 400);
        assert_eq!(RiseError::LocationNotFound("7".into()).status_code(), 404);
    }

    #[test]
    fn test_query_errors() {
        assert!(RiseError::invalid_filter("z", "abc", "a number").is_query_error());
        assert!(RiseError::UnresolvableProperty {
            property: "foo".into()
        }
        .is_query_error());
        assert!(RiseError::MissingFieldsMapping.is_query_error());
        assert!(RiseError::LocationNotFound("1".into()).is_query_error());

        assert!(!RiseError::malformed("no data").is_query_error());
        assert!(!RiseError::MissingPrecondition("empty".into()).is_query_error());
        assert!(!RiseError::DuplicateRecord {
            id: "a".into(),
            first_page: "p1".into(),
            second_page: "p2".into(),
        }
        .is_query_error());
    }

    #[test]
    fn test_duplicate_display_names_both_pages() {
        let err = RiseError::DuplicateRecord {
            id: "/rise/api/location/1".into(),
            first_page: "page=1".into(),
            second_page: "page=3".into(),
        };
        let display = err.to_string();
        assert!(display.contains("/rise/api/location/1"));
        assert!(display.contains("page=1"));
        assert!(display.contains("page=3"));
    }

    #[test]
    fn test_error_to_exception() {
        let exc = RiseError::LocationNotFound("42".into()).to_exception();
        assert_eq!(exc.status, Some(404));
        assert!(exc.detail.unwrap().contains("42"));

        let exc = RiseError::malformed("data missing").to_exception();
        assert_eq!(exc.status, Some(502));
        assert_eq!(exc.title.as_deref(), Some("Bad Gateway"));

        let exc = RiseError::MissingPrecondition("no locations".into()).to_exception();
        assert_eq!(exc.status, Some(500));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RiseError = parse_err.into();
        assert!(matches!(err, RiseError::MalformedInput(_)));
    }

    #[test]
    fn test_exception_serialization() {
        let exc = ExceptionResponse::bad_request("bad bbox").with_instance("/items?bbox=1");
        let json = serde_json::to_value(&exc).unwrap();

        assert_eq!(json["status"], 400);
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["instance"], "/items?bbox=1");
        assert!(json["type"]
            .as_str()
            .unwrap()
            .ends_with("invalid-parameter-value"));
    }
}
