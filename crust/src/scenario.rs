use crate::{check::Check, error::Error, util};
use std::{collections::HashSet, time::Duration};

/// Pause applied after a step completes, modelling user think time.
#[derive(Debug, Clone)]
pub enum ThinkTime {
    None,
    Fixed(Duration),
    Uniform { min: Duration, max: Duration },
}

impl ThinkTime {
    pub fn seconds(secs: f64) -> Self {
        ThinkTime::Fixed(Duration::from_secs_f64(secs))
    }

    pub fn sample(&self) -> Option<Duration> {
        match self {
            ThinkTime::None => None,
            ThinkTime::Fixed(duration) => Some(*duration),
            ThinkTime::Uniform { min, max } => {
                let spread = max.saturating_sub(*min);
                Some(*min + spread.mul_f64(fastrand::f64()))
            }
        }
    }
}

/// Captures a value out of a step's JSON response so later steps can refer to
/// it as `${name}`.
#[derive(Debug, Clone)]
pub struct Extract {
    pub name: String,
    pub pointer: String,
}

/// CORS preflight issued before the step's own request, mirroring what a
/// browser sends for a cross-origin call.
#[derive(Debug, Clone)]
pub struct Preflight {
    pub request_headers: String,
}

#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
    think_time: ThinkTime,
    checks: Vec<Check>,
    extractions: Vec<Extract>,
    preflight: Option<Preflight>,
}

impl Step {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        name: S1,
        method: S2,
        url: S3,
    ) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            think_time: ThinkTime::None,
            checks: Vec::new(),
            extractions: Vec::new(),
            preflight: None,
        }
    }

    pub fn header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn think_time(mut self, think_time: ThinkTime) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Captures the value at `pointer` (a JSON pointer) from the response body
    /// under the given variable name.
    pub fn extract<S1: Into<String>, S2: Into<String>>(mut self, name: S1, pointer: S2) -> Self {
        self.extractions.push(Extract {
            name: name.into(),
            pointer: pointer.into(),
        });
        self
    }

    /// Issue an OPTIONS preflight before this step, advertising the given
    /// `access-control-request-headers` value.
    pub fn preflight<S: Into<String>>(mut self, request_headers: S) -> Self {
        self.preflight = Some(Preflight {
            request_headers: request_headers.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url_template(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_template(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn step_think_time(&self) -> &ThinkTime {
        &self.think_time
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn extractions(&self) -> &[Extract] {
        &self.extractions
    }

    pub fn preflight_config(&self) -> Option<&Preflight> {
        self.preflight.as_ref()
    }
}

/// A named, ordered sequence of steps. Built once, never mutated by a run.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    default_headers: Vec<(String, String)>,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            default_headers: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Header applied to every step ahead of the step's own headers.
    pub fn default_header<S1: Into<String>, S2: Into<String>>(
        mut self,
        name: S1,
        value: S2,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Rejects a malformed scenario before any step executes. `seeded` are the
    /// variable names the configuration provides up front.
    pub fn validate(&self, seeded: &[String]) -> Result<(), Error> {
        if self.steps.is_empty() {
            return Err(Error::Configuration(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }

        let mut known: HashSet<String> = seeded.iter().cloned().collect();

        for step in &self.steps {
            if step.method.is_empty() {
                return Err(Error::Configuration(format!(
                    "step '{}' has an empty method",
                    step.name
                )));
            }
            if step.url.is_empty() {
                return Err(Error::Configuration(format!(
                    "step '{}' has an empty url",
                    step.name
                )));
            }

            let mut referenced = util::template_variables(&step.url);
            if let Some(body) = &step.body {
                referenced.extend(util::template_variables(body));
            }
            for (_, value) in self.default_headers.iter().chain(&step.headers) {
                referenced.extend(util::template_variables(value));
            }
            for name in referenced {
                if !known.contains(&name) {
                    return Err(Error::Configuration(format!(
                        "step '{}' references '${{{}}}' before any step captures it",
                        step.name, name
                    )));
                }
            }

            for extract in &step.extractions {
                known.insert(extract.name.clone());
            }
        }

        Ok(())
    }
}
