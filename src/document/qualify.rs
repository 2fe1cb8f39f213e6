//! Fully-qualifying relative ids and defaulting key controllers.
//!
//! Both work on the parsed JSON document rather than its serialized text, and only touch the
//! fields that hold identifiers: `id` and `controller` of any object, and the string entries of the
//! verification relationship arrays. Every other value is left exactly as it was.

use serde_json::{Map, Value};

use crate::error::Err;
use crate::{tracerr, Result};

// Fields whose string entries are references to verification methods.
const RELATIONSHIPS: [&str; 5] = [
    "authentication",
    "assertionMethod",
    "capabilityDelegation",
    "capabilityInvocation",
    "keyAgreement",
];

// Fields holding keys that get a default controller.
const KEY_FIELDS: [&str; 7] = [
    "publicKey",
    "verificationMethod",
    "authentication",
    "assertionMethod",
    "capabilityDelegation",
    "capabilityInvocation",
    "keyAgreement",
];

fn document_id(document: &Value) -> Result<&str> {
    let Some(did) = document.get("id").and_then(Value::as_str) else {
        tracerr!(Err::InvalidInput, "document has no id");
    };
    Ok(did)
}

/// Rewrite every relative id of the form `#fragment` to `<did>#fragment`, where `<did>` is the
/// document's `id`.
///
/// # Errors
///
/// * `Err::InvalidInput` - the document has no string `id`.
pub fn fully_qualify(document: &Value) -> Result<Value> {
    let did = document_id(document)?;
    let mut qualified = document.clone();
    qualify_value(did, &mut qualified);
    Ok(qualified)
}

fn qualify_value(did: &str, value: &mut Value) {
    match value {
        Value::Object(map) => qualify_object(did, map),
        Value::Array(items) => {
            for item in items {
                qualify_value(did, item);
            }
        }
        _ => {}
    }
}

fn qualify_object(did: &str, map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        match (key.as_str(), value) {
            ("id" | "controller", Value::String(s)) => qualify_str(did, s),
            (rel, Value::Array(items)) if RELATIONSHIPS.contains(&rel) => {
                for item in items {
                    match item {
                        Value::String(s) => qualify_str(did, s),
                        other => qualify_value(did, other),
                    }
                }
            }
            (_, other) => qualify_value(did, other),
        }
    }
}

fn qualify_str(did: &str, s: &mut String) {
    if s.starts_with('#') {
        s.insert_str(0, did);
    }
}

/// Default a key's controller. Objects without a (non-empty) `controller` get `controller`;
/// strings and arrays are returned unchanged.
#[must_use]
pub fn add_controller(controller: &str, key: Value) -> Value {
    let Value::Object(mut map) = key else {
        return key;
    };
    let has_controller = map
        .get("controller")
        .is_some_and(|c| !c.is_null() && c.as_str() != Some(""));
    if !has_controller {
        map.insert("controller".to_string(), Value::String(controller.to_string()));
    }
    Value::Object(map)
}

/// Default the controller of every embedded key in the document's key lists and relationships to
/// the document's own `id`. String references are unchanged.
///
/// # Errors
///
/// * `Err::InvalidInput` - the document has no string `id`.
pub fn transform_document(document: &Value) -> Result<Value> {
    let did = document_id(document)?.to_string();
    let mut transformed = document.clone();
    let Some(map) = transformed.as_object_mut() else {
        tracerr!(Err::InvalidInput, "document is not an object");
    };

    for field in KEY_FIELDS {
        if let Some(Value::Array(keys)) = map.get_mut(field) {
            let taken = std::mem::take(keys);
            *keys = taken.into_iter().map(|k| add_controller(&did, k)).collect();
        }
    }
    Ok(transformed)
}
