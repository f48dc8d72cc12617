//! Core library for the `weatherstack` conformance checker.
//!
//! This crate defines:
//! - Credential & configuration handling
//! - An HTTP client for the current-weather endpoint
//! - Response classification and contract assertions
//! - The ordered conformance suite and its report
//!
//! It is used by `weatherstack-cli` and by the live contract test in `tests/`.

pub mod client;
pub mod config;
pub mod contract;
pub mod model;
pub mod suite;

pub use client::{CurrentWeatherApi, WeatherstackClient};
pub use config::{Config, Credential};
pub use contract::{ContractViolation, Expectation, ResponseObject};
pub use model::{ApiErrorCode, RawResponse, WeatherRequest, WeatherResponse};
pub use suite::{Case, CaseGroup, CaseReport, KeySource, Outcome, Suite, SuiteReport};
