//! Assertions about a single response.

use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{ApiErrorCode, RawResponse, WeatherResponse};

pub const REQUEST_KEYS: &[&str] = &["type", "query", "language", "unit"];

pub const LOCATION_KEYS: &[&str] = &[
    "name",
    "country",
    "region",
    "lat",
    "lon",
    "timezone_id",
    "localtime",
    "localtime_epoch",
    "utc_offset",
];

pub const CURRENT_KEYS: &[&str] = &[
    "observation_time",
    "temperature",
    "weather_code",
    "weather_icons",
    "weather_descriptions",
    "astro",
    "air_quality",
    "wind_speed",
    "wind_degree",
    "wind_dir",
    "pressure",
    "precip",
    "humidity",
    "cloudcover",
    "feelslike",
    "uv_index",
    "visibility",
];

/// Why a response does not honour the contract. Every variant carries the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("expected HTTP status {expected}, got {actual}; response: {body}")]
    UnexpectedStatus { expected: u16, actual: u16, body: String },

    #[error("expected a success response, got error {code}; response: {body}")]
    UnexpectedError { code: ApiErrorCode, body: String },

    #[error("expected error {expected}, but the response carries no error; response: {body}")]
    MissingError { expected: ApiErrorCode, body: String },

    #[error("expected error {expected}, got {actual}; response: {body}")]
    WrongErrorCode { expected: ApiErrorCode, actual: ApiErrorCode, body: String },

    #[error("error response must carry `success: false`; response: {body}")]
    SuccessFlag { body: String },

    #[error("expected location.name {expected:?}, got {actual:?}; response: {body}")]
    LocationMismatch { expected: String, actual: Option<String>, body: String },

    #[error(
        "`{object}` keys differ from the documented set (missing: {missing:?}, unexpected: {unexpected:?}); response: {body}"
    )]
    KeySetMismatch {
        object: &'static str,
        missing: Vec<String>,
        unexpected: Vec<String>,
        body: String,
    },

    #[error("malformed response: {reason}; response: {body}")]
    Malformed { reason: String, body: String },
}

/// The three top-level objects of a success payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseObject {
    Request,
    Location,
    Current,
}

impl ResponseObject {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseObject::Request => "request",
            ResponseObject::Location => "location",
            ResponseObject::Current => "current",
        }
    }

    pub fn expected_keys(&self) -> &'static [&'static str] {
        match self {
            ResponseObject::Request => REQUEST_KEYS,
            ResponseObject::Location => LOCATION_KEYS,
            ResponseObject::Current => CURRENT_KEYS,
        }
    }

    pub const fn all() -> &'static [ResponseObject] {
        &[ResponseObject::Request, ResponseObject::Location, ResponseObject::Current]
    }
}

/// What a case expects back from the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Status 200 and no `error` key.
    Success,
    /// As `Success`, plus `location.name` equals the given city.
    SuccessAt { location: String },
    /// `error.code` equals the given code and `success` is false.
    ApiError(ApiErrorCode),
    /// Success payload whose object has exactly the documented keys.
    ObjectKeys(ResponseObject),
}

impl Expectation {
    pub fn verify(&self, response: &RawResponse) -> Result<(), ContractViolation> {
        match self {
            Expectation::Success => expect_success(response).map(|_| ()),
            Expectation::SuccessAt { location } => {
                let parsed = expect_success(response)?;
                let actual = parsed.location_name();
                if actual != Some(location.as_str()) {
                    return Err(ContractViolation::LocationMismatch {
                        expected: location.clone(),
                        actual: actual.map(str::to_owned),
                        body: response.body_text(),
                    });
                }
                Ok(())
            }
            Expectation::ApiError(code) => expect_error(response, *code),
            Expectation::ObjectKeys(object) => match expect_success(response)? {
                WeatherResponse::Success { request, location, current } => {
                    let map = match object {
                        ResponseObject::Request => request,
                        ResponseObject::Location => location,
                        ResponseObject::Current => current,
                    };
                    check_keys(*object, &map, response)
                }
                WeatherResponse::Error { code, .. } => {
                    Err(ContractViolation::UnexpectedError { code, body: response.body_text() })
                }
            },
        }
    }
}

fn expect_success(response: &RawResponse) -> Result<WeatherResponse, ContractViolation> {
    if response.status != StatusCode::OK {
        return Err(ContractViolation::UnexpectedStatus {
            expected: StatusCode::OK.as_u16(),
            actual: response.status.as_u16(),
            body: response.body_text(),
        });
    }

    match response.classify()? {
        WeatherResponse::Error { code, .. } => {
            Err(ContractViolation::UnexpectedError { code, body: response.body_text() })
        }
        success => Ok(success),
    }
}

fn expect_error(response: &RawResponse, expected: ApiErrorCode) -> Result<(), ContractViolation> {
    if !response.has_error() {
        return Err(ContractViolation::MissingError { expected, body: response.body_text() });
    }

    match response.classify()? {
        WeatherResponse::Error { code, .. } if code != expected => {
            Err(ContractViolation::WrongErrorCode {
                expected,
                actual: code,
                body: response.body_text(),
            })
        }
        WeatherResponse::Error { success: Some(false), .. } => Ok(()),
        WeatherResponse::Error { .. } => {
            Err(ContractViolation::SuccessFlag { body: response.body_text() })
        }
        WeatherResponse::Success { .. } => {
            Err(ContractViolation::MissingError { expected, body: response.body_text() })
        }
    }
}

/// Exact key-set comparison: both missing and unexpected keys are violations.
pub fn check_keys(
    object: ResponseObject,
    map: &Map<String, Value>,
    response: &RawResponse,
) -> Result<(), ContractViolation> {
    let expected: BTreeSet<&str> = object.expected_keys().iter().copied().collect();
    let actual: BTreeSet<&str> = map.keys().map(String::as_str).collect();

    let missing: Vec<String> = expected.difference(&actual).map(|k| k.to_string()).collect();
    let unexpected: Vec<String> = actual.difference(&expected).map(|k| k.to_string()).collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    Err(ContractViolation::KeySetMismatch {
        object: object.as_str(),
        missing,
        unexpected,
        body: response.body_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_with(keys: &[&str]) -> Value {
        Value::Object(keys.iter().map(|k| (k.to_string(), json!(1))).collect())
    }

    fn success_body(city: &str) -> Value {
        let mut location = object_with(LOCATION_KEYS);
        location["name"] = json!(city);
        json!({
            "request": object_with(REQUEST_KEYS),
            "location": location,
            "current": object_with(CURRENT_KEYS),
        })
    }

    fn error_body(code: i64) -> Value {
        json!({ "success": false, "error": { "code": code, "type": "x", "info": "y" } })
    }

    #[test]
    fn success_with_matching_city_passes() {
        let resp = RawResponse::new(StatusCode::OK, success_body("Taipei"));

        Expectation::Success.verify(&resp).unwrap();
        Expectation::SuccessAt { location: "Taipei".into() }.verify(&resp).unwrap();
    }

    #[test]
    fn city_mismatch_is_reported() {
        let resp = RawResponse::new(StatusCode::OK, success_body("Tainan"));

        let err = Expectation::SuccessAt { location: "Taipei".into() }.verify(&resp).unwrap_err();
        assert!(matches!(err, ContractViolation::LocationMismatch { .. }));
        assert!(err.to_string().contains("Tainan"));
    }

    #[test]
    fn success_expected_but_error_returned() {
        let resp = RawResponse::new(StatusCode::OK, error_body(615));

        let err = Expectation::Success.verify(&resp).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::UnexpectedError {
                code: ApiErrorCode::RequestFailed,
                body: resp.body_text(),
            }
        );
    }

    #[test]
    fn non_200_status_fails_success() {
        let resp = RawResponse::new(StatusCode::BAD_GATEWAY, success_body("Taipei"));

        let err = Expectation::Success.verify(&resp).unwrap_err();
        assert!(matches!(err, ContractViolation::UnexpectedStatus { actual: 502, .. }));
    }

    #[test]
    fn matching_error_code_passes() {
        let resp = RawResponse::new(StatusCode::OK, error_body(101));
        Expectation::ApiError(ApiErrorCode::InvalidAccessKey).verify(&resp).unwrap();
    }

    #[test]
    fn wrong_error_code_is_reported_with_body() {
        let resp = RawResponse::new(StatusCode::OK, error_body(615));

        let err = Expectation::ApiError(ApiErrorCode::MissingQuery).verify(&resp).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected error 601"));
        assert!(msg.contains("got 615"));
        assert!(msg.contains("\"code\":615"));
    }

    #[test]
    fn missing_error_is_reported() {
        let resp = RawResponse::new(StatusCode::OK, success_body("Taipei"));

        let err = Expectation::ApiError(ApiErrorCode::InvalidUnit).verify(&resp).unwrap_err();
        assert!(matches!(err, ContractViolation::MissingError { .. }));
    }

    #[test]
    fn error_without_false_success_flag_fails() {
        let body = json!({ "success": true, "error": { "code": 605 } });
        let resp = RawResponse::new(StatusCode::OK, body);

        let err = Expectation::ApiError(ApiErrorCode::InvalidLanguage).verify(&resp).unwrap_err();
        assert!(matches!(err, ContractViolation::SuccessFlag { .. }));
    }

    #[test]
    fn documented_key_sets_pass() {
        let resp = RawResponse::new(StatusCode::OK, success_body("Taipei"));

        for object in ResponseObject::all() {
            Expectation::ObjectKeys(*object).verify(&resp).unwrap();
        }
    }

    #[test]
    fn extra_and_missing_keys_are_both_reported() {
        let mut body = success_body("Taipei");
        let current = body["current"].as_object_mut().unwrap();
        current.remove("uv_index");
        current.insert("is_day".into(), json!("yes"));
        let resp = RawResponse::new(StatusCode::OK, body);

        let err = Expectation::ObjectKeys(ResponseObject::Current).verify(&resp).unwrap_err();
        match err {
            ContractViolation::KeySetMismatch { object, missing, unexpected, .. } => {
                assert_eq!(object, "current");
                assert_eq!(missing, vec!["uv_index".to_string()]);
                assert_eq!(unexpected, vec!["is_day".to_string()]);
            }
            other => panic!("unexpected violation: {other}"),
        }
    }

    #[test]
    fn key_sets_match_documented_sizes() {
        assert_eq!(REQUEST_KEYS.len(), 4);
        assert_eq!(LOCATION_KEYS.len(), 9);
        assert_eq!(CURRENT_KEYS.len(), 17);
    }
}
