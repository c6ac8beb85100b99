//! Loader query-string parsing.
//!
//! Two shapes are accepted, both with an optional leading `?`:
//!
//! | Query                           | Result                                  |
//! |---------------------------------|-----------------------------------------|
//! | `?{"cache":true}`               | JSON object, taken as-is                |
//! | `?cache&maxInstances=2`         | `{"cache": true, "maxInstances": 2}`    |
//! | `?files[]=A.elm&files[]=B.elm`  | `{"files": ["A.elm", "B.elm"]}`         |
//! | `?debug=false&report=json`      | `{"debug": false, "report": "json"}`    |

use percent_encoding::percent_decode_str;
use serde_json::Value;

use super::OptionMap;
use crate::error::{LoaderError, Result};

/// Parse a loader query string into an option map.
pub fn parse_query(query: &str) -> Result<OptionMap> {
    let query = query.trim();
    let query = query.strip_prefix('?').unwrap_or(query);

    if query.is_empty() {
        return Ok(OptionMap::new());
    }

    if query.starts_with('{') {
        return match serde_json::from_str::<Value>(query) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(LoaderError::Configuration(
                "query JSON must be an object".into(),
            )),
            Err(e) => Err(LoaderError::Configuration(format!(
                "invalid query JSON: {e}"
            ))),
        };
    }

    let mut map = OptionMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };

        let key = decode(raw_key)?;
        let value = match raw_value {
            Some(v) => literal(&decode(v)?),
            None => Value::Bool(true),
        };

        if let Some(list_key) = key.strip_suffix("[]") {
            let entry = map
                .entry(list_key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                _ => {
                    return Err(LoaderError::Configuration(format!(
                        "query key `{list_key}` used both as list and scalar"
                    )));
                }
            }
        } else {
            map.insert(key, value);
        }
    }
    Ok(map)
}

fn decode(raw: &str) -> Result<String> {
    // `+` is a space in form encoding
    let raw = raw.replace('+', " ");
    percent_decode_str(&raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| LoaderError::Configuration(format!("invalid query encoding: {e}")))
}

/// Interpret `true`/`false`/integers; everything else stays a string.
fn literal(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
    }
}
