use crate::error::Error;
use serde_json::Value;

/// An outbound HTTP call as it goes on the wire. Headers keep their
/// definition order so a replayed request is reproducible.
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RequestData {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Result<Value, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseData {
    /// A canned JSON response, the way mocked routes answer.
    pub fn json(status_code: u16, body: &Value) -> Self {
        ResponseData {
            status_code,
            headers: vec![(
                String::from("content-type"),
                String::from("application/json"),
            )],
            body: body.to_string(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn parse_body(&self) -> Result<Value, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
