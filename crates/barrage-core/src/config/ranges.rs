//! Status-code range specs.
//!
//! Scenario options that name sets of HTTP status codes accept compact
//! specs like `"200,205-207"`. Malformed specs are a configuration
//! error, caught at startup.

use std::collections::BTreeSet;

use crate::errors::EngineError;

/// Expand a range spec like `"200,205-207"` into a sorted status set.
pub fn unpack_integer_range(spec: &str) -> Result<BTreeSet<u16>, EngineError> {
    if spec.is_empty() || !spec.chars().all(|c| c.is_ascii_digit() || "-, ".contains(c)) {
        return Err(bad_spec(spec, "must contain just numbers, commas, and hyphens"));
    }

    let mut codes = BTreeSet::new();
    for part in spec.replace(' ', "").split(',') {
        let bounds: Vec<&str> = part.split('-').collect();
        match bounds.as_slice() {
            [single] => {
                codes.insert(parse_code(spec, single)?);
            }
            [low, high] => {
                let low = parse_code(spec, low)?;
                let high = parse_code(spec, high)?;
                if low >= high {
                    return Err(bad_spec(spec, "range minimum is more than maximum"));
                }
                codes.extend(low..=high);
            }
            _ => return Err(bad_spec(spec, "incorrect range specifier")),
        }
    }
    Ok(codes)
}

fn parse_code(spec: &str, text: &str) -> Result<u16, EngineError> {
    text.parse::<u16>()
        .map_err(|_| bad_spec(spec, "must be integers separated with commas and hyphens"))
}

fn bad_spec(spec: &str, reason: &str) -> EngineError {
    EngineError::Config {
        message: format!("status range '{spec}' is invalid: {reason}"),
    }
}
