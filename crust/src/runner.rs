use crate::{
    check::{CheckPolicy, CheckResult},
    data::{RequestData, ResponseData},
    error::Error,
    harness_configuration::HarnessConfiguration,
    http_client::HttpClient,
    scenario::{Scenario, Step},
    util,
};
use log::{debug, warn};
use serde::Serialize;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Lifecycle of one scenario execution. Transitions happen only inside the
/// runner; a terminal state is never left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum RunState {
    Pending,
    Running,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub status_code: Option<u16>,
    pub checks: Vec<CheckResult>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub state: RunState,
    pub steps: Vec<StepReport>,
    pub failure: Option<String>,
    pub variables: HashMap<String, String>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }
}

/// Executes a scenario's steps strictly in order against the configured
/// transport.
#[derive(Debug)]
pub struct Runner {
    configuration: HarnessConfiguration,
}

impl Runner {
    pub fn new(configuration: HarnessConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &HarnessConfiguration {
        &self.configuration
    }

    pub async fn run(&self, scenario: &Scenario) -> RunReport {
        let mut variables: HashMap<String, String> = self
            .configuration
            .variables()
            .iter()
            .cloned()
            .collect();

        let mut report = RunReport {
            scenario: scenario.name().into(),
            state: RunState::Pending,
            steps: Vec::new(),
            failure: None,
            variables: HashMap::new(),
        };

        let seeded: Vec<String> = variables.keys().cloned().collect();
        if let Err(e) = scenario.validate(&seeded) {
            report.state = RunState::Failed;
            report.failure = Some(e.to_string());
            return report;
        }

        report.state = RunState::Running;
        let client = self.configuration.http_client();

        for step in scenario.steps() {
            let started = Instant::now();
            debug!("scenario '{}': step '{}'", scenario.name(), step.name());

            let request_data = match self.build_request(scenario, step, &variables) {
                Ok(request_data) => request_data,
                Err(e) => {
                    return Self::fail(report, step, None, Vec::new(), started, e.to_string(), variables);
                }
            };

            if let Some(preflight) = step.preflight_config() {
                let preflight_request =
                    Self::build_preflight(step, &request_data, &preflight.request_headers);
                if let Err(e) = client.send(&preflight_request).await {
                    warn!("step '{}': preflight failed: {}", step.name(), e);
                    if self.configuration.check_policy() == CheckPolicy::FailFast {
                        return Self::fail(
                            report,
                            step,
                            None,
                            Vec::new(),
                            started,
                            e.to_string(),
                            variables,
                        );
                    }
                }
            }

            let response = match client.send(&request_data).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("step '{}' failed: {}", step.name(), e);
                    return Self::fail(report, step, None, Vec::new(), started, e.to_string(), variables);
                }
            };

            if let Err(e) = Self::run_extractions(step, &response, &mut variables) {
                return Self::fail(
                    report,
                    step,
                    Some(response.status_code),
                    Vec::new(),
                    started,
                    e.to_string(),
                    variables,
                );
            }

            let mut checks = Vec::new();
            let mut abort: Option<String> = None;
            for check in step.checks() {
                let result = check.evaluate(&response);
                if !result.passed {
                    let detail = result.detail.clone().unwrap_or_default();
                    warn!("check '{}' failed: {}", result.label, detail);
                    if abort.is_none()
                        && (self.configuration.check_policy() == CheckPolicy::FailFast
                            || check.is_critical())
                    {
                        abort = Some(result.label.clone());
                    }
                }
                checks.push(result);
            }

            if let Some(message) = abort {
                return Self::fail(
                    report,
                    step,
                    Some(response.status_code),
                    checks,
                    started,
                    message,
                    variables,
                );
            }

            report.steps.push(StepReport {
                name: step.name().into(),
                status_code: Some(response.status_code),
                checks,
                duration: started.elapsed(),
            });

            let think_time = self
                .configuration
                .think_time_override()
                .unwrap_or_else(|| step.step_think_time());
            if let Some(pause) = think_time.sample() {
                tokio::time::sleep(pause).await;
            }
        }

        report.state = RunState::Passed;
        report.variables = variables;
        report
    }

    fn fail(
        mut report: RunReport,
        step: &Step,
        status_code: Option<u16>,
        checks: Vec<CheckResult>,
        started: Instant,
        message: String,
        variables: HashMap<String, String>,
    ) -> RunReport {
        report.steps.push(StepReport {
            name: step.name().into(),
            status_code,
            checks,
            duration: started.elapsed(),
        });
        report.state = RunState::Failed;
        report.failure = Some(message);
        // keep whatever earlier steps captured so failures stay diagnosable
        report.variables = variables;
        report
    }

    fn build_request(
        &self,
        scenario: &Scenario,
        step: &Step,
        variables: &HashMap<String, String>,
    ) -> Result<RequestData, Error> {
        let url = util::render_template(step.url_template(), variables)?;
        let body = match step.body_template() {
            Some(template) => util::render_template(template, variables)?,
            None => String::new(),
        };

        let mut headers: Vec<(String, String)> = Vec::new();
        for (name, value) in scenario.default_headers().iter().chain(step.headers()) {
            headers.push((name.clone(), util::render_template(value, variables)?));
        }

        Ok(RequestData {
            method: step.method().to_uppercase(),
            url,
            headers,
            body,
        })
    }

    /// Browsers send the preflight with the navigation headers of the real
    /// call but without content-type or client hints, and with the
    /// access-control-request pair slotted in alphabetical order.
    fn build_preflight(step: &Step, request_data: &RequestData, request_headers: &str) -> RequestData {
        const CARRIED: [&str; 8] = [
            "accept",
            "accept-encoding",
            "accept-language",
            "origin",
            "priority",
            "sec-fetch-dest",
            "sec-fetch-mode",
            "sec-fetch-site",
        ];

        let mut headers: Vec<(String, String)> = request_data
            .headers
            .iter()
            .filter(|(name, _)| CARRIED.contains(&name.to_lowercase().as_str()))
            .cloned()
            .collect();

        let position = headers
            .iter()
            .position(|(name, _)| name.to_lowercase().as_str() > "access-control-request-headers")
            .unwrap_or(headers.len());
        headers.insert(
            position,
            (
                String::from("access-control-request-headers"),
                request_headers.into(),
            ),
        );
        headers.insert(
            position + 1,
            (
                String::from("access-control-request-method"),
                step.method().to_uppercase(),
            ),
        );

        RequestData {
            method: String::from("OPTIONS"),
            url: request_data.url.clone(),
            headers,
            body: String::new(),
        }
    }

    fn run_extractions(
        step: &Step,
        response: &ResponseData,
        variables: &mut HashMap<String, String>,
    ) -> Result<(), Error> {
        if step.extractions().is_empty() {
            return Ok(());
        }

        let body = response.parse_body().map_err(|_| {
            Error::assertion(
                format!("extract from '{}'", step.name()),
                "response body is not valid json",
            )
        })?;

        for extract in step.extractions() {
            let value = body.pointer(&extract.pointer).ok_or_else(|| {
                Error::assertion(
                    format!("extract '{}'", extract.name),
                    format!("no value at '{}'", extract.pointer),
                )
            })?;

            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            variables.insert(extract.name.clone(), rendered);
        }

        Ok(())
    }
}
