//! Request binding: HTTP body and path parameters into a typed RPC input.
//!
//! # Responsibilities
//! - Decode the JSON body according to the operation's body binding
//! - Overlay path parameters, creating nested objects for dotted names
//! - Coerce path values to numbers or booleans when the field needs it
//! - Deserialize the merged JSON into the request message
//!
//! # Design Decisions
//! - An empty or whitespace-only body means "no body", not an error
//! - Path parameters are applied last, so they win over body fields
//! - Unknown JSON fields are discarded
//! - Every failure is `INVALID_ARGUMENT`; the backend is never reached

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::routing::{BodyBinding, OperationDescriptor, PathParams};
use crate::rpc::CallError;

/// Build the typed input for `descriptor` from the path parameters and raw body.
pub fn bind<Req: DeserializeOwned>(
    descriptor: &OperationDescriptor,
    params: &PathParams,
    body: &[u8],
) -> Result<Req, CallError> {
    let input = match &descriptor.body {
        BodyBinding::None => Map::new(),
        BodyBinding::Message => match decode_body(body)? {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(CallError::invalid_argument(format!(
                    "request body must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        },
        BodyBinding::Field(field) => {
            let mut map = Map::new();
            if let Some(value) = decode_body(body)? {
                map.insert((*field).to_string(), value);
            }
            map
        }
    };

    let bound: Vec<(Vec<&str>, &str, Option<Value>)> = params
        .iter()
        .map(|(name, value)| (name.split('.').collect(), value, scalar(value)))
        .collect();

    // Strings first; then numeric and boolean values in scalar form, one
    // combination at a time. The first message that deserializes wins.
    let coercible: Vec<usize> = (0..bound.len()).filter(|&i| bound[i].2.is_some()).collect();
    let attempts = if coercible.len() > MAX_COERCED_PARAMS {
        1
    } else {
        1u32 << coercible.len()
    };

    let mut first_error = None;
    for mask in 0..attempts {
        let mut merged = input.clone();
        for (i, (path, raw, coerced)) in bound.iter().enumerate() {
            let as_scalar = coercible
                .iter()
                .position(|&c| c == i)
                .is_some_and(|bit| mask & (1 << bit) != 0);
            let value = match coerced {
                Some(value) if as_scalar => value.clone(),
                _ => Value::String((*raw).to_string()),
            };
            set_field(&mut merged, path, value);
        }

        match serde_json::from_value(Value::Object(merged)) {
            Ok(message) => return Ok(message),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    let reason = first_error.map(|e| e.to_string()).unwrap_or_default();
    Err(CallError::invalid_argument(format!("invalid request: {reason}")))
}

/// Path parameters beyond this many are only bound as strings.
const MAX_COERCED_PARAMS: usize = 4;

/// Scalar JSON form of a path value, when it reads as a number or boolean.
fn scalar(value: &str) -> Option<Value> {
    match value {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => value.parse::<serde_json::Number>().ok().map(Value::Number),
    }
}

fn decode_body(body: &[u8]) -> Result<Option<Value>, CallError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| CallError::invalid_argument(format!("malformed request body: {e}")))
}

fn set_field(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(nested) = slot {
                set_field(nested, rest, value);
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
