//! The ordered conformance suite.
//!
//! Cases run one at a time in table order. The invalid-key, response-object and
//! query groups only run once the valid-key case has passed; without a credential
//! nothing runs at all.

use chrono::{DateTime, Utc};
use std::{fmt, time::Duration};
use tracing::{info, warn};

use crate::{
    client::CurrentWeatherApi,
    config::{Credential, DEFAULT_PACING_MS},
    contract::{Expectation, ResponseObject},
    model::{ApiErrorCode, WeatherRequest},
};

pub const BASE_CITY: &str = "Taipei";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseGroup {
    ValidAccessKey,
    InvalidAccessKey,
    ResponseObject,
    QueryParameter,
    LanguageParameter,
    UnitParameter,
}

impl CaseGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseGroup::ValidAccessKey => "valid_access_key",
            CaseGroup::InvalidAccessKey => "invalid_access_key",
            CaseGroup::ResponseObject => "response_object",
            CaseGroup::QueryParameter => "query_parameter",
            CaseGroup::LanguageParameter => "language_parameter",
            CaseGroup::UnitParameter => "unit_parameter",
        }
    }

    /// Groups that are skipped unless the valid-key case passed.
    pub fn depends_on_base(&self) -> bool {
        matches!(
            self,
            CaseGroup::InvalidAccessKey | CaseGroup::ResponseObject | CaseGroup::QueryParameter
        )
    }

    /// Groups that wait out the pacing delay before each call.
    pub fn is_paced(&self) -> bool {
        matches!(
            self,
            CaseGroup::QueryParameter | CaseGroup::LanguageParameter | CaseGroup::UnitParameter
        )
    }
}

impl fmt::Display for CaseGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which access key a case sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Credential,
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub group: CaseGroup,
    pub label: Option<String>,
    pub key: KeySource,
    pub request: WeatherRequest,
    pub expectation: Expectation,
}

impl Case {
    fn new(
        group: CaseGroup,
        label: Option<&str>,
        request: WeatherRequest,
        expectation: Expectation,
    ) -> Self {
        Self {
            group,
            label: label.map(str::to_owned),
            key: KeySource::Credential,
            request,
            expectation,
        }
    }

    /// `group` or `group[label]`.
    pub fn id(&self) -> String {
        match &self.label {
            Some(label) => format!("{}[{label}]", self.group),
            None => self.group.to_string(),
        }
    }
}

fn query_label(query: &str) -> &str {
    if query.is_empty() { "empty" } else { query }
}

/// The documented contract of `GET /current`, in execution order.
pub fn default_cases() -> Vec<Case> {
    let mut cases = vec![Case::new(
        CaseGroup::ValidAccessKey,
        None,
        WeatherRequest::new(BASE_CITY),
        Expectation::SuccessAt { location: BASE_CITY.to_string() },
    )];

    for (label, key) in [("empty", ""), ("numeric", "1234567890"), ("symbolic", "!@#$%^&*(")] {
        cases.push(Case {
            key: KeySource::Literal(key.to_string()),
            ..Case::new(
                CaseGroup::InvalidAccessKey,
                Some(label),
                WeatherRequest::new(BASE_CITY),
                Expectation::ApiError(ApiErrorCode::InvalidAccessKey),
            )
        });
    }

    for object in ResponseObject::all() {
        cases.push(Case::new(
            CaseGroup::ResponseObject,
            Some(object.as_str()),
            WeatherRequest::new(BASE_CITY),
            Expectation::ObjectKeys(*object),
        ));
    }

    let queries = [
        ("Taipei", Expectation::Success),
        ("99501", Expectation::Success),
        ("40.7831,-73.9712", Expectation::Success),
        ("153.65.8.20", Expectation::Success),
        ("fetch:ip", Expectation::Success),
        ("iepiat", Expectation::ApiError(ApiErrorCode::RequestFailed)),
        ("91, -180", Expectation::ApiError(ApiErrorCode::RequestFailed)),
        ("255.255.255.255", Expectation::ApiError(ApiErrorCode::RequestFailed)),
        ("00000", Expectation::ApiError(ApiErrorCode::RequestFailed)),
        ("", Expectation::ApiError(ApiErrorCode::MissingQuery)),
    ];
    for (query, expectation) in queries {
        cases.push(Case::new(
            CaseGroup::QueryParameter,
            Some(query_label(query)),
            WeatherRequest::new(query),
            expectation,
        ));
    }

    for (language, valid) in [("ar", true), ("zh", true), ("ja", true), ("xx", false)] {
        let expectation = if valid {
            Expectation::Success
        } else {
            Expectation::ApiError(ApiErrorCode::InvalidLanguage)
        };
        cases.push(Case::new(
            CaseGroup::LanguageParameter,
            Some(language),
            WeatherRequest::new(BASE_CITY).with_language(language),
            expectation,
        ));
    }

    // m = metric, s = scientific, f = fahrenheit
    for (units, valid) in [("m", true), ("s", true), ("f", true), ("k", false)] {
        let expectation = if valid {
            Expectation::Success
        } else {
            Expectation::ApiError(ApiErrorCode::InvalidUnit)
        };
        cases.push(Case::new(
            CaseGroup::UnitParameter,
            Some(units),
            WeatherRequest::new(BASE_CITY).with_units(units),
            expectation,
        ));
    }

    cases
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub id: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn skipped(&self) -> usize {
        self.cases.iter().filter(|c| matches!(c.outcome, Outcome::Skipped(_))).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| matches!(c.outcome, Outcome::Failed(_)))
    }

    /// True when no case failed. Skipped cases do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome_of(&self, id: &str) -> Option<&Outcome> {
        self.cases.iter().find(|c| c.id == id).map(|c| &c.outcome)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug)]
pub struct Suite<A> {
    api: A,
    credential: Option<Credential>,
    pacing: Duration,
    cases: Vec<Case>,
}

impl<A: CurrentWeatherApi> Suite<A> {
    pub fn new(api: A, credential: Option<Credential>) -> Self {
        Self {
            api,
            credential,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            cases: default_cases(),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_cases(mut self, cases: Vec<Case>) -> Self {
        self.cases = cases;
        self
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub async fn run(&self) -> SuiteReport {
        let started_at = Utc::now();
        let mut base_passed = false;
        let mut reports = Vec::with_capacity(self.cases.len());

        for case in &self.cases {
            let id = case.id();
            let outcome = match self.skip_reason(case, base_passed) {
                Some(reason) => {
                    warn!(case = %id, %reason, "skipped");
                    Outcome::Skipped(reason)
                }
                None => self.run_case(case).await,
            };

            match &outcome {
                Outcome::Passed => info!(case = %id, "passed"),
                Outcome::Failed(message) => warn!(case = %id, reason = %message, "failed"),
                Outcome::Skipped(_) => {}
            }

            if case.group == CaseGroup::ValidAccessKey {
                base_passed = outcome.is_passed();
            }

            reports.push(CaseReport { id, outcome });
        }

        SuiteReport { started_at, finished_at: Utc::now(), cases: reports }
    }

    fn skip_reason(&self, case: &Case, base_passed: bool) -> Option<String> {
        if self.credential.is_none() {
            return Some(
                "credential file not found; create it with {\"api_key\": \"your_api_key\"}"
                    .to_string(),
            );
        }
        if case.group.depends_on_base() && !base_passed {
            return Some(format!("depends on {}, which did not pass", CaseGroup::ValidAccessKey));
        }
        None
    }

    async fn run_case(&self, case: &Case) -> Outcome {
        let access_key = match (&case.key, &self.credential) {
            (KeySource::Literal(key), _) => key.as_str(),
            (KeySource::Credential, Some(credential)) => credential.api_key.as_str(),
            (KeySource::Credential, None) => {
                return Outcome::Skipped("credential file not found".to_string());
            }
        };

        if case.group.is_paced() && !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        match self.api.current(access_key, &case.request).await {
            Ok(response) => match case.expectation.verify(&response) {
                Ok(()) => Outcome::Passed,
                Err(violation) => Outcome::Failed(violation.to_string()),
            },
            Err(err) => Outcome::Failed(format!("{err:#}")),
        }
    }
}
