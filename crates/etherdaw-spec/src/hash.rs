//! Canonical hashing and seed derivation.
//!
//! Scores are hashed as `hex(BLAKE3(JCS(score_json)))` so that two documents
//! differing only in key order or whitespace hash identically. Random streams
//! used by the compiler are derived from the user seed with the same hash.

/// Computes the canonical BLAKE3 hash of a JSON value.
///
/// Returns a 64-character lowercase hexadecimal string.
///
/// ```
/// use etherdaw_spec::canonical_value_hash;
///
/// let a = serde_json::json!({"b": 1, "a": [1, 2]});
/// let b = serde_json::json!({"a": [1, 2], "b": 1});
/// assert_eq!(canonical_value_hash(&a), canonical_value_hash(&b));
/// ```
pub fn canonical_value_hash(value: &serde_json::Value) -> String {
    let canonical = canonicalize_json(value);
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Canonicalizes a JSON value according to RFC 8785 (JCS).
///
/// Object keys are sorted, no whitespace is emitted, integral floats are
/// printed without a fraction and strings use minimal escaping.
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Null => out.push_str("null"),
        serde_json::Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        serde_json::Value::Number(n) => out.push_str(&format_jcs_number(n)),
        serde_json::Value::String(s) => write_jcs_string(s, out),
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        serde_json::Value::Object(obj) => {
            let mut entries: Vec<(&String, &serde_json::Value)> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_jcs_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

fn format_jcs_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            if f == 0.0 {
                "0".to_string()
            } else if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", f as i64)
            } else {
                // Rust's shortest round-trip repr never carries trailing zeros.
                format!("{}", f)
            }
        }
        _ => "null".to_string(),
    }
}

fn write_jcs_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Derives a 64-bit stream seed from a base seed and a list of salt strings.
///
/// ```text
/// derived = truncate_u64(BLAKE3(base_seed_le || 0 || part0 || 0 || part1 ...))
/// ```
///
/// The zero separator keeps `["ab", "c"]` and `["a", "bc"]` distinct.
///
/// ```
/// use etherdaw_spec::derive_seed;
///
/// let a = derive_seed(42, &["0", "verse"]);
/// let b = derive_seed(42, &["1", "verse"]);
/// assert_ne!(a, b);
/// assert_eq!(a, derive_seed(42, &["0", "verse"]));
/// ```
pub fn derive_seed(base_seed: u32, parts: &[&str]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base_seed.to_le_bytes());
    for part in parts {
        hasher.update(&[0]);
        hasher.update(part.as_bytes());
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_canonical_key_order() {
        let value = json!({"z": 1, "a": {"y": true, "b": null}});
        assert_eq!(canonicalize_json(&value), r#"{"a":{"b":null,"y":true},"z":1}"#);
    }

    #[test]
    fn test_canonical_numbers() {
        assert_eq!(canonicalize_json(&json!(1.0)), "1");
        assert_eq!(canonicalize_json(&json!(0.5)), "0.5");
        assert_eq!(canonicalize_json(&json!(-0.0)), "0");
        assert_eq!(canonicalize_json(&json!(-3)), "-3");
        assert_eq!(canonicalize_json(&json!(120.25)), "120.25");
    }

    #[test]
    fn test_canonical_string_escapes() {
        let value = json!("a\"b\\c\nd\u{01}");
        assert_eq!(canonicalize_json(&value), r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn test_hash_format() {
        let hash = canonical_value_hash(&json!({"tempo": 120}));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_derive_seed_separates_parts() {
        assert_ne!(derive_seed(7, &["ab", "c"]), derive_seed(7, &["a", "bc"]));
        assert_ne!(derive_seed(7, &["x"]), derive_seed(8, &["x"]));
        assert_eq!(derive_seed(7, &[]), derive_seed(7, &[]));
    }
}
