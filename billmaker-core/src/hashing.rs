//! Rendered-invoice fingerprints.
//!
//! The fingerprint is the SHA-256 of the canonical JSON (sorted keys, no
//! whitespace) of everything that determines the rendered document.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&sorted(v))
}

fn sorted(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// `sha256(canonical_json(payload))` as lowercase hex.
pub fn fingerprint<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(payload)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let a = json!({"z": 1, "a": {"y": [ {"b": 1, "a": 2} ], "x": 0}});
        assert_eq!(
            canonical_json(&a).unwrap(),
            r#"{"a":{"x":0,"y":[{"a":2,"b":1}]},"z":1}"#
        );
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = json!({"invoiceNumber": "INV-7", "template": "corporate"});
        let b = json!({"template": "corporate", "invoiceNumber": "INV-7"});
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
