use crate::{
    check::CheckPolicy,
    http_client::{HttpClient, HyperClient},
    scenario::ThinkTime,
};
use std::sync::Arc;

/// Per-run configuration: target variables (base URLs and the like), check
/// policy, and the transport to use. Tests inject a `MockRegistry` through
/// `set_http_client`.
#[derive(Debug, Clone)]
pub struct HarnessConfiguration {
    check_policy: CheckPolicy,
    http_client: Option<Arc<dyn HttpClient>>,
    variables: Vec<(String, String)>,
    think_time_override: Option<ThinkTime>,
}

impl HarnessConfiguration {
    pub fn new(check_policy: CheckPolicy) -> Self {
        Self {
            check_policy,
            http_client: None,
            variables: Vec::new(),
            think_time_override: None,
        }
    }

    pub fn check_policy(&self) -> CheckPolicy {
        self.check_policy
    }

    pub fn set_check_policy(&mut self, check_policy: CheckPolicy) {
        self.check_policy = check_policy;
    }

    /// Seeds a `${name}` variable available to every step template.
    pub fn set_variable<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.variables.push((name.into(), value.into()));
    }

    pub fn variables(&self) -> &[(String, String)] {
        &self.variables
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperClient::new()))
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient>) {
        self.http_client = Some(http_client);
    }

    /// Replaces every step's think time, e.g. to compress a replay in tests.
    pub fn set_think_time_override(&mut self, think_time: ThinkTime) {
        self.think_time_override = Some(think_time);
    }

    pub fn think_time_override(&self) -> Option<&ThinkTime> {
        self.think_time_override.as_ref()
    }
}
