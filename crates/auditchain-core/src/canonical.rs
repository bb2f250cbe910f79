//! Deterministic byte encoding of JSON payloads.
//!
//! The same logical payload must always produce the same bytes, whatever the
//! key order or whitespace it arrived with. Every value is prefixed with a
//! one-byte type tag so that, for example, the string `"1"` and the integer
//! `1` never collide:
//!
//! | tag | value                                                     |
//! |-----|-----------------------------------------------------------|
//! | `n` | null                                                      |
//! | `T` / `F` | true / false                                        |
//! | `u` | non-negative integer, u64 big-endian                      |
//! | `i` | negative integer, i64 big-endian                          |
//! | `d` | float, IEEE-754 bits big-endian (`-0.0` folded to `0.0`)  |
//! | `s` | string: u64 byte length, then UTF-8                       |
//! | `a` | array: u64 element count, then elements                   |
//! | `o` | object: u64 entry count, then (key, value) sorted by key bytes |

use serde_json::Value;

use auditchain_contracts::error::{LedgerError, LedgerResult};

/// Hard nesting limit of the encoder, independent of configured payload limits.
pub const MAX_ENCODE_DEPTH: usize = 128;

/// Encode `value` canonically.
///
/// Fails with `LedgerError::Validation` if nesting exceeds `MAX_ENCODE_DEPTH`
/// or a number cannot be represented.
pub fn canonical_bytes(value: &Value) -> LedgerResult<Vec<u8>> {
    let mut out = Vec::new();
    encode_value(value, 0, &mut out)?;
    Ok(out)
}

/// Nesting depth of a JSON value. Scalars have depth 0.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Append a u64-length-prefixed byte string.
pub(crate) fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn encode_value(value: &Value, level: usize, out: &mut Vec<u8>) -> LedgerResult<()> {
    if level > MAX_ENCODE_DEPTH {
        return Err(LedgerError::validation(format!(
            "payload nesting exceeds {} levels",
            MAX_ENCODE_DEPTH
        )));
    }

    match value {
        Value::Null => out.push(b'n'),
        Value::Bool(true) => out.push(b'T'),
        Value::Bool(false) => out.push(b'F'),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                out.push(b'u');
                out.extend_from_slice(&u.to_be_bytes());
            } else if let Some(i) = n.as_i64() {
                out.push(b'i');
                out.extend_from_slice(&i.to_be_bytes());
            } else if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(LedgerError::validation("payload contains a non-finite number"));
                }
                let f = if f == 0.0 { 0.0 } else { f };
                out.push(b'd');
                out.extend_from_slice(&f.to_bits().to_be_bytes());
            } else {
                return Err(LedgerError::validation(format!(
                    "payload number {} cannot be canonicalized",
                    n
                )));
            }
        }
        Value::String(s) => {
            out.push(b's');
            write_bytes(out, s.as_bytes());
        }
        Value::Array(items) => {
            out.push(b'a');
            out.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                encode_value(item, level + 1, out)?;
            }
        }
        Value::Object(map) => {
            // Sort explicitly: the map's own iteration order depends on
            // serde_json features enabled elsewhere in the build.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'o');
            out.extend_from_slice(&(entries.len() as u64).to_be_bytes());
            for (key, item) in entries {
                write_bytes(out, key.as_bytes());
                encode_value(item, level + 1, out)?;
            }
        }
    }
    Ok(())
}
