//! Submission codecs.
//!
//! Serialise a submission value onto the wire and parse textual
//! templates back into one. Three encodings: form-urlencoded bodies,
//! semicolon-separated URL path parameters, and JSON. All three are
//! 8-bit clean on the output path — fuzzed bytes must reach the wire
//! untouched, so the JSON encoder is hand-rolled rather than routed
//! through a string type that insists on valid UTF-8.

use std::rc::Rc;

use barrage_core::config::scenario::Codec;
use barrage_core::{EngineError, Node, Value};
use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes escaped in form values: everything except alphanumerics,
/// `_.-` and `/`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

/// Bytes escaped in URL path parameters. Space is left alone here and
/// turned into `+` afterwards.
const URL_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b' ');

/// Encode a submission with the scenario's codec.
pub fn encode(codec: Codec, submission: &Node) -> Vec<u8> {
    match codec {
        Codec::Form => encode_form(submission),
        Codec::UrlParams => encode_urlparams(submission),
        Codec::Json => encode_json(submission, true),
    }
}

/// `&`-joined `key=value` pairs. Sequence values expand into one pair
/// per element; anything else is stringified, so null injects as an
/// empty value.
pub fn encode_form(submission: &Node) -> Vec<u8> {
    let mut pairs: Vec<String> = Vec::new();
    if let Value::Map(entries) = &**submission {
        for (key, value) in entries {
            let enc_key = percent_encode(key, FORM).to_string();
            match &**value {
                Value::Seq(items) => {
                    for item in items {
                        pairs.push(format!(
                            "{enc_key}={}",
                            percent_encode(&item.stringify(), FORM)
                        ));
                    }
                }
                other => {
                    pairs.push(format!(
                        "{enc_key}={}",
                        percent_encode(&other.stringify(), FORM)
                    ));
                }
            }
        }
    }
    pairs.join("&").into_bytes()
}

/// Parse a query string into a mapping of sequences, one entry per
/// distinct key, repeated keys accumulating in order.
pub fn parse_form(query: &str) -> Result<Node, EngineError> {
    let mut entries: IndexMap<Vec<u8>, Vec<Rc<Value>>> = IndexMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| EngineError::Config {
            message: format!("form template pair '{pair}' has no '='"),
        })?;
        entries
            .entry(decode_component(key))
            .or_default()
            .push(Rc::new(Value::Bytes(decode_component(value))));
    }
    Ok(Rc::new(Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k, Rc::new(Value::Seq(v))))
            .collect(),
    )))
}

/// URL path parameters: `;keyword=value1,value2` per key. These are
/// path parameters, not query parameters — the encoded string is
/// appended to the URL path as-is.
pub fn encode_urlparams(submission: &Node) -> Vec<u8> {
    let mut out = String::new();
    if let Value::Map(entries) = &**submission {
        for (key, value) in entries {
            out.push(';');
            out.push_str(&quote_plus(key));
            out.push('=');
            let values: Vec<Vec<u8>> = match &**value {
                Value::Seq(items) => items.iter().map(|i| i.stringify()).collect(),
                other => vec![other.stringify()],
            };
            let encoded: Vec<String> = values.iter().map(|v| quote_plus(v)).collect();
            out.push_str(&encoded.join(","));
        }
    }
    out.into_bytes()
}

/// Parse `keyword1=value1,value2;keyword2=value3` into a mapping of
/// sequences, preserving key order.
pub fn parse_urlparams(params: &str) -> Result<Node, EngineError> {
    let mut entries: IndexMap<Vec<u8>, Node> = IndexMap::new();
    for pair in params.trim_start_matches(';').split(';') {
        let (keyword, values) = pair.split_once('=').ok_or_else(|| EngineError::Config {
            message: format!("url parameter '{pair}' has no '='"),
        })?;
        let items: Vec<Node> = values
            .split(',')
            .map(|v| Rc::new(Value::Bytes(decode_component(v))))
            .collect();
        entries.insert(decode_component(keyword), Rc::new(Value::Seq(items)));
    }
    Ok(Rc::new(Value::Map(entries)))
}

/// JSON encoding. With `ascii` set, every byte outside printable ASCII
/// is emitted as a byte-wise `\u00XX` escape, which gives an 8-bit
/// clean output path even for fuzzed garbage; with it unset, bytes
/// above 0x7F pass through raw. Non-finite floats are spelled
/// `NaN`/`Infinity`/`-Infinity`.
pub fn encode_json(submission: &Node, ascii: bool) -> Vec<u8> {
    let mut out = Vec::new();
    write_json(&mut out, submission, ascii);
    out
}

fn write_json(out: &mut Vec<u8>, node: &Node, ascii: bool) {
    match &**node {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Value::Float(f) => out.extend_from_slice(json_float(*f).as_bytes()),
        Value::Bytes(bytes) => write_json_string(out, bytes, ascii),
        Value::Seq(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                write_json(out, item, ascii);
            }
            out.push(b']');
        }
        Value::Map(entries) => {
            out.push(b'{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                write_json_string(out, key, ascii);
                out.extend_from_slice(b": ");
                write_json(out, value, ascii);
            }
            out.push(b'}');
        }
    }
}

fn write_json_string(out: &mut Vec<u8>, bytes: &[u8], ascii: bool) {
    out.push(b'"');
    for &byte in bytes {
        match byte {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            0x00..=0x1f => {
                out.extend_from_slice(format!("\\u{byte:04x}").as_bytes());
            }
            0x80.. if ascii => {
                out.extend_from_slice(format!("\\u{byte:04x}").as_bytes());
            }
            _ => out.push(byte),
        }
    }
    out.push(b'"');
}

fn json_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{f}")
    }
}

/// Parse a JSON template into a submission value, preserving member
/// order.
pub fn parse_json(text: &str) -> Result<Node, EngineError> {
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|e| EngineError::Config {
            message: format!("invalid JSON template: {e}"),
        })?;
    Ok(from_serde(&parsed))
}

fn from_serde(value: &serde_json::Value) -> Node {
    Rc::new(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Bytes(s.as_bytes().to_vec()),
        serde_json::Value::Array(items) => Value::Seq(items.iter().map(from_serde).collect()),
        serde_json::Value::Object(members) => Value::Map(
            members
                .iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), from_serde(v)))
                .collect(),
        ),
    })
}

fn quote_plus(bytes: &[u8]) -> String {
    percent_encode(bytes, URL_PARAM).to_string().replace(' ', "+")
}

fn decode_component(text: &str) -> Vec<u8> {
    let unplussed = text.replace('+', " ");
    percent_decode_str(&unplussed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_expands_sequences_and_percent_encodes() {
        let submission = Rc::new(Value::map([
            ("a", Value::text("x y")),
            ("b", Value::seq([Value::text("1"), Value::text("2")])),
            ("n", Value::Null),
        ]));
        let encoded = String::from_utf8(encode_form(&submission)).unwrap();
        assert_eq!(encoded, "a=x%20y&b=1&b=2&n=");
    }

    #[test]
    fn form_round_trip_preserves_pairs() {
        let template = parse_form("a=1&b=2&b=3").unwrap();
        let encoded = String::from_utf8(encode_form(&template)).unwrap();
        assert_eq!(encoded, "a=1&b=2&b=3");
    }

    #[test]
    fn urlparams_join_values_with_commas() {
        let template = parse_urlparams("eka=1,2,3;toka=auto").unwrap();
        let encoded = String::from_utf8(encode_urlparams(&template)).unwrap();
        assert_eq!(encoded, ";eka=1,2,3;toka=auto");
    }

    #[test]
    fn urlparams_null_serialises_as_empty() {
        let submission = Rc::new(Value::map([(
            "k",
            Value::seq([Value::text("auto"), Value::Null, Value::Int(66)]),
        )]));
        let encoded = String::from_utf8(encode_urlparams(&submission)).unwrap();
        assert_eq!(encoded, ";k=auto,,66");
    }

    #[test]
    fn urlparams_round_trip_preserves_key_order() {
        let text = "zz=1;aa=2;mm=3";
        let template = parse_urlparams(text).unwrap();
        let encoded = String::from_utf8(encode_urlparams(&template)).unwrap();
        assert_eq!(encoded, ";zz=1;aa=2;mm=3");
    }

    #[test]
    fn json_escapes_bytewise_in_ascii_mode() {
        let submission = Rc::new(Value::map([("k", Value::bytes(vec![0xff, b'a', 0x00]))]));
        let encoded = String::from_utf8(encode_json(&submission, true)).unwrap();
        assert_eq!(encoded, "{\"k\": \"\\u00ffa\\u0000\"}");
    }

    #[test]
    fn json_raw_mode_is_8bit_clean() {
        let submission = Rc::new(Value::map([("k", Value::bytes(vec![0xff, 0xfe]))]));
        let encoded = encode_json(&submission, false);
        assert!(encoded.windows(2).any(|w| w == [0xff, 0xfe]));
    }

    #[test]
    fn json_spells_non_finite_floats_like_a_dynamic_encoder() {
        let submission = Rc::new(Value::seq([
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
        ]));
        let encoded = String::from_utf8(encode_json(&submission, true)).unwrap();
        assert_eq!(encoded, "[NaN, Infinity, -Infinity]");
    }

    #[test]
    fn json_template_parses_with_member_order() {
        let template = parse_json(r#"{"b": 1, "a": [true, null, 1.5]}"#).unwrap();
        let Value::Map(entries) = &*template else {
            panic!("expected a mapping");
        };
        let keys: Vec<&[u8]> = entries.keys().map(|k| k.as_slice()).collect();
        assert_eq!(keys, vec![b"b".as_slice(), b"a".as_slice()]);
        let encoded = String::from_utf8(encode_json(&template, true)).unwrap();
        assert_eq!(encoded, r#"{"b": 1, "a": [true, null, 1.5]}"#);
    }

    #[test]
    fn malformed_templates_are_config_errors() {
        assert!(parse_form("novalue").is_err());
        assert!(parse_urlparams("broken").is_err());
        assert!(parse_json("{nope").is_err());
    }
}
