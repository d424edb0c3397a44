use crate::error::Error;
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref VARIABLE_REGEX: Regex =
        Regex::new(r"\$\{(?P<name>[a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap();
}

/// Substitutes every `${name}` occurrence with its captured value.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> Result<String, Error> {
    let mut rendered = String::with_capacity(template.len());
    let mut last_end = 0;

    for captures in VARIABLE_REGEX.captures_iter(template) {
        let whole = captures.get(0).unwrap();
        let name = &captures["name"];
        let value = variables
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.into()))?;

        rendered.push_str(&template[last_end..whole.start()]);
        rendered.push_str(value);
        last_end = whole.end();
    }

    rendered.push_str(&template[last_end..]);
    Ok(rendered)
}

/// Names of every `${name}` reference in a template, in order of appearance.
pub fn template_variables(template: &str) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(template)
        .map(|captures| captures["name"].to_string())
        .collect()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}

pub fn extract_headers(header_map: &HeaderMap) -> Vec<(String, String)> {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (String::from(k.as_str()), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<Vec<_>>()
}
