use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::fmt;

use crate::contract::ContractViolation;

/// Parameters of a single `GET /current` call, minus the access key.
///
/// `language` and `units` are plain strings so that unsupported codes can be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRequest {
    pub query: String,
    pub language: Option<String>,
    pub units: Option<String>,
}

impl WeatherRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), language: None, units: None }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// Error codes reported by the upstream in `error.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    InvalidAccessKey,
    MissingQuery,
    InvalidLanguage,
    InvalidUnit,
    RequestFailed,
    Other(i64),
}

impl ApiErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            101 => ApiErrorCode::InvalidAccessKey,
            601 => ApiErrorCode::MissingQuery,
            605 => ApiErrorCode::InvalidLanguage,
            606 => ApiErrorCode::InvalidUnit,
            615 => ApiErrorCode::RequestFailed,
            other => ApiErrorCode::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ApiErrorCode::InvalidAccessKey => 101,
            ApiErrorCode::MissingQuery => 601,
            ApiErrorCode::InvalidLanguage => 605,
            ApiErrorCode::InvalidUnit => 606,
            ApiErrorCode::RequestFailed => 615,
            ApiErrorCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorCode::InvalidAccessKey => "invalid_access_key",
            ApiErrorCode::MissingQuery => "missing_query",
            ApiErrorCode::InvalidLanguage => "invalid_language",
            ApiErrorCode::InvalidUnit => "invalid_unit",
            ApiErrorCode::RequestFailed => "request_failed",
            ApiErrorCode::Other(_) => "unknown",
        };
        write!(f, "{} ({name})", self.code())
    }
}

/// Status code and decoded JSON body, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Compact JSON rendering of the body, used in failure messages.
    pub fn body_text(&self) -> String {
        self.body.to_string()
    }

    pub fn has_error(&self) -> bool {
        self.body.get("error").is_some()
    }

    pub fn classify(&self) -> Result<WeatherResponse, ContractViolation> {
        WeatherResponse::classify(&self.body)
    }
}

/// A body is either success-shaped or error-shaped, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherResponse {
    Success {
        request: Map<String, Value>,
        location: Map<String, Value>,
        current: Map<String, Value>,
    },
    Error {
        code: ApiErrorCode,
        success: Option<bool>,
        kind: Option<String>,
        info: Option<String>,
    },
}

const SUCCESS_OBJECTS: [&str; 3] = ["request", "location", "current"];

impl WeatherResponse {
    pub fn classify(body: &Value) -> Result<Self, ContractViolation> {
        let malformed = |reason: String| ContractViolation::Malformed {
            reason,
            body: body.to_string(),
        };

        let root = body
            .as_object()
            .ok_or_else(|| malformed("body is not a JSON object".to_string()))?;

        if let Some(error) = root.get("error") {
            if let Some(name) = SUCCESS_OBJECTS.iter().find(|name| root.contains_key(**name)) {
                return Err(malformed(format!("error payload also carries `{name}`")));
            }

            let code = error
                .get("code")
                .and_then(Value::as_i64)
                .ok_or_else(|| malformed("`error.code` is missing or not an integer".to_string()))?;

            return Ok(WeatherResponse::Error {
                code: ApiErrorCode::from_code(code),
                success: root.get("success").and_then(Value::as_bool),
                kind: error.get("type").and_then(Value::as_str).map(str::to_owned),
                info: error.get("info").and_then(Value::as_str).map(str::to_owned),
            });
        }

        let object = |name: &str| {
            root.get(name)
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| malformed(format!("`{name}` object is missing")))
        };

        Ok(WeatherResponse::Success {
            request: object("request")?,
            location: object("location")?,
            current: object("current")?,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WeatherResponse::Success { .. })
    }

    pub fn location_name(&self) -> Option<&str> {
        match self {
            WeatherResponse::Success { location, .. } => {
                location.get("name").and_then(Value::as_str)
            }
            WeatherResponse::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_codes_map_both_ways() {
        for code in [101, 601, 605, 606, 615, 999] {
            assert_eq!(ApiErrorCode::from_code(code).code(), code);
        }
        assert_eq!(ApiErrorCode::from_code(615), ApiErrorCode::RequestFailed);
        assert_eq!(ApiErrorCode::from_code(42), ApiErrorCode::Other(42));
        assert_eq!(ApiErrorCode::InvalidUnit.to_string(), "606 (invalid_unit)");
    }

    #[test]
    fn builder_sets_optional_parameters() {
        let req = WeatherRequest::new("Taipei").with_language("ja").with_units("f");
        assert_eq!(req.query, "Taipei");
        assert_eq!(req.language.as_deref(), Some("ja"));
        assert_eq!(req.units.as_deref(), Some("f"));
    }

    #[test]
    fn classifies_error_payload() {
        let body = json!({
            "success": false,
            "error": { "code": 101, "type": "invalid_access_key", "info": "You have not supplied a valid API Access Key." }
        });

        let parsed = WeatherResponse::classify(&body).unwrap();
        assert_eq!(
            parsed,
            WeatherResponse::Error {
                code: ApiErrorCode::InvalidAccessKey,
                success: Some(false),
                kind: Some("invalid_access_key".into()),
                info: Some("You have not supplied a valid API Access Key.".into()),
            }
        );
        assert!(!parsed.is_success());
    }

    #[test]
    fn classifies_success_payload() {
        let body = json!({
            "request": { "type": "City" },
            "location": { "name": "Taipei" },
            "current": { "temperature": 25 }
        });

        let parsed = WeatherResponse::classify(&body).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.location_name(), Some("Taipei"));
    }

    #[test]
    fn rejects_body_with_both_shapes() {
        let body = json!({
            "error": { "code": 615 },
            "location": { "name": "Taipei" }
        });

        let err = WeatherResponse::classify(&body).unwrap_err();
        assert!(err.to_string().contains("also carries `location`"));
    }

    #[test]
    fn rejects_success_missing_object() {
        let body = json!({ "request": {}, "location": {} });

        let err = WeatherResponse::classify(&body).unwrap_err();
        assert!(err.to_string().contains("`current` object is missing"));
    }

    #[test]
    fn rejects_error_without_code() {
        let body = json!({ "success": false, "error": { "info": "boom" } });
        assert!(WeatherResponse::classify(&body).is_err());
    }
}
