use crate::{
    check,
    data::{RequestData, ResponseData},
    error::Error,
    http_client::HttpClient,
};
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Scripted answer for one URL pattern and method, with the request shape it
/// expects. Selection depends only on method and parsed body so repeated runs
/// are reproducible.
#[derive(Debug, Clone)]
pub struct RouteMock {
    expected_body: Option<Value>,
    required_headers: Vec<(String, String)>,
    response: ResponseData,
}

impl RouteMock {
    /// A mock answering with the given status and JSON body.
    pub fn respond_json(status_code: u16, body: Value) -> Self {
        Self {
            expected_body: None,
            required_headers: Vec::new(),
            response: ResponseData::json(status_code, &body),
        }
    }

    /// The incoming request body, parsed as JSON, must be a superset of
    /// `expected`.
    pub fn expect_body(mut self, expected: Value) -> Self {
        self.expected_body = Some(expected);
        self
    }

    /// The incoming request must carry the named header with a value
    /// containing the given substring.
    pub fn require_header<S1: Into<String>, S2: Into<String>>(
        mut self,
        name: S1,
        contains: S2,
    ) -> Self {
        self.required_headers.push((name.into(), contains.into()));
        self
    }

    fn verify(&self, request_data: &RequestData) -> Result<(), Error> {
        for (name, contains) in &self.required_headers {
            match request_data.header(name) {
                Some(value) if value.contains(contains.as_str()) => {}
                Some(value) => {
                    return Err(Error::assertion(
                        "mocked route header",
                        format!(
                            "header '{}' is '{}', expected it to contain '{}'",
                            name, value, contains
                        ),
                    ))
                }
                None => {
                    return Err(Error::assertion(
                        "mocked route header",
                        format!("header '{}' is missing", name),
                    ))
                }
            }
        }

        if let Some(expected) = &self.expected_body {
            let actual = request_data
                .json()
                .map_err(|_| Error::assertion("mocked route body", "request body is not valid json"))?;
            check::json_subset(expected, &actual)
                .map_err(|detail| Error::assertion("mocked route body", detail))?;
        }

        Ok(())
    }
}

#[derive(Debug)]
struct RegisteredRoute {
    pattern: String,
    pattern_regex: Regex,
    method: String,
    mock: RouteMock,
    hits: AtomicUsize,
}

/// Intercepts outbound calls during a single scenario execution. The first
/// registered route matching pattern and method answers; unmatched calls pass
/// through to the fallback client when one is configured.
#[derive(Debug, Default)]
pub struct MockRegistry {
    routes: Vec<RegisteredRoute>,
    fallback: Option<Arc<dyn HttpClient>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: Arc<dyn HttpClient>) -> Self {
        Self {
            routes: Vec::new(),
            fallback: Some(fallback),
        }
    }

    /// Registers a mock for calls whose URL matches the glob `pattern` (where
    /// `*` spans any characters) with the given method.
    pub fn register<S1: Into<String>, S2: Into<String>>(
        &mut self,
        pattern: S1,
        method: S2,
        mock: RouteMock,
    ) -> Result<(), Error> {
        let pattern = pattern.into();
        let method: String = method.into();
        let pattern_regex = glob_to_regex(&pattern)?;

        self.routes.push(RegisteredRoute {
            pattern,
            pattern_regex,
            method: method.to_uppercase(),
            mock,
            hits: AtomicUsize::new(0),
        });

        Ok(())
    }

    /// How many intercepted calls the route registered under this pattern and
    /// method has answered.
    pub fn hits(&self, pattern: &str, method: &str) -> usize {
        self.routes
            .iter()
            .filter(|route| route.pattern == pattern && route.method.eq_ignore_ascii_case(method))
            .map(|route| route.hits.load(Ordering::SeqCst))
            .sum()
    }

    fn find(&self, request_data: &RequestData) -> Option<&RegisteredRoute> {
        self.routes.iter().find(|route| {
            route.method.eq_ignore_ascii_case(&request_data.method)
                && route.pattern_regex.is_match(&request_data.url)
        })
    }
}

#[async_trait]
impl HttpClient for MockRegistry {
    async fn send(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        match self.find(request_data) {
            Some(route) => {
                debug!(
                    "intercepted {} {} with mock '{}'",
                    request_data.method, request_data.url, route.pattern
                );
                route.mock.verify(request_data)?;
                route.hits.fetch_add(1, Ordering::SeqCst);
                Ok(route.mock.response.clone())
            }
            None => match &self.fallback {
                Some(fallback) => fallback.send(request_data).await,
                None => Err(Error::assertion(
                    "mocked route",
                    format!(
                        "no mock registered for {} {} and no pass-through client configured",
                        request_data.method, request_data.url
                    ),
                )),
            },
        }
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');

    Regex::new(&source)
        .map_err(|e| Error::Configuration(format!("bad url pattern '{}': {}", pattern, e)))
}
