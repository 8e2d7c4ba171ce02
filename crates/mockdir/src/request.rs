//! Snapshot of an inbound request, as journaled and echoed back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path and raw query of the request URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedUri {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Everything a test might want to assert about a request the server handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub method: String,
    pub request_uri: String,
    pub parsed_uri: ParsedUri,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    /// Decoded body for form and JSON payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_input: Option<serde_json::Value>,
    pub timestamp: String,
}

impl RequestRecord {
    pub fn new<K, V>(
        method: &str,
        uri: &str,
        headers: impl IntoIterator<Item = (K, V)>,
        body: impl Into<String>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut header_map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let value = value.into();
            header_map
                .entry(name.into())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let parsed_uri = parse_uri(uri);
        let query = parsed_uri
            .query
            .as_deref()
            .map(parse_query_string)
            .unwrap_or_default();
        let body = body.into();
        let parsed_input = parse_input(header_value(&header_map, "content-type"), &body);

        Self {
            method: method.to_uppercase(),
            request_uri: uri.to_string(),
            parsed_uri,
            query,
            headers: header_map,
            body,
            parsed_input,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Body-less GET, mostly for tests and tooling.
    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri, Vec::<(String, String)>::new(), "")
    }

    pub fn path(&self) -> &str {
        &self.parsed_uri.path
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn header_value<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Split a request target into path and query. Absolute URIs keep only
/// their path; an empty path becomes `/`.
fn parse_uri(uri: &str) -> ParsedUri {
    let without_fragment = uri.split('#').next().unwrap_or("");
    let (target, query) = match without_fragment.split_once('?') {
        Some((t, q)) => (t, Some(q.to_string())),
        None => (without_fragment, None),
    };

    let path = match target.find("://") {
        Some(idx) => {
            let rest = &target[idx + 3..];
            rest.find('/').map_or("/", |slash| &rest[slash..])
        }
        None => target,
    };

    ParsedUri {
        path: if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        },
        query,
    }
}

pub fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn parse_input(content_type: Option<&str>, body: &str) -> Option<serde_json::Value> {
    if body.is_empty() {
        return None;
    }
    let content_type = content_type?.to_ascii_lowercase();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form = parse_query_string(body)
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        Some(serde_json::Value::Object(form))
    } else if content_type.contains("json") {
        serde_json::from_str(body).ok()
    } else {
        None
    }
}
