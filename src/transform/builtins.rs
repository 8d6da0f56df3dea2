//! Built-in transforms installed by [`Transforms::standard`].
//!
//! | name | subject | arguments | result |
//! |---|---|---|---|
//! | `stableSample` | sampling input | rate | boolean |
//! | `bucketSample` | sampling input | start, count, total | boolean |
//! | `ratioSample` | sampling input | array of ratios | index |
//! | `keys` | object | | array of keys |
//! | `length` | string, array, object | | integer |
//! | `mapToProperty` | array of objects | property name | array |
//! | `regExpMatch` | string | pattern, flags | array of captures |
//! | `date` | date string | | epoch milliseconds |

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::RegexBuilder;

use crate::{
    evaluator::EvalError,
    output::to_json,
    sampling::{bucket_sample, ratio_sample, stable_sample},
    transform::Transforms,
    value::Value,
};

pub const STABLE_SAMPLE: &str = "stableSample";
pub const BUCKET_SAMPLE: &str = "bucketSample";
pub const RATIO_SAMPLE: &str = "ratioSample";
pub const KEYS: &str = "keys";
pub const LENGTH: &str = "length";
pub const MAP_TO_PROPERTY: &str = "mapToProperty";
pub const REGEXP_MATCH: &str = "regExpMatch";
pub const DATE: &str = "date";

/// Compiled size limit for `regExpMatch` patterns
const MAX_REGEX_SIZE: usize = 1 << 20;

pub fn register(transforms: &mut Transforms) {
    transforms
        .register_fn(STABLE_SAMPLE, stable_sample_transform)
        .register_fn(BUCKET_SAMPLE, bucket_sample_transform)
        .register_fn(RATIO_SAMPLE, ratio_sample_transform)
        .register_fn(KEYS, keys)
        .register_fn(LENGTH, length)
        .register_fn(MAP_TO_PROPERTY, map_to_property)
        .register_fn(REGEXP_MATCH, regexp_match)
        .register_fn(DATE, date);
}

/// String form hashed by the sampling transforms. Strings are used as they
/// are; anything else is rendered as compact JSON, so `["a", 1]` hashes the
/// text `["a",1]`.
///
/// Strings are never JSON-quoted: `"user-1"|stableSample(r)` hashes
/// `user-1`, the same input `stable_sample("user-1", r)` sees. Quoting them
/// would move every string-keyed client to a different bucket.
pub fn sampling_input(subject: &Value) -> String {
    match subject {
        Value::String(s) => s.clone(),
        other => to_json(other),
    }
}

// ========================================
// Sampling
// ========================================

fn stable_sample_transform(subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let rate = number_arg(STABLE_SAMPLE, &args, 0)?;
    let sampled = stable_sample(&sampling_input(&subject), rate)?;
    Ok(Value::Boolean(sampled))
}

fn bucket_sample_transform(subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let start = count_arg(BUCKET_SAMPLE, &args, 0)?;
    let count = count_arg(BUCKET_SAMPLE, &args, 1)?;
    let total = count_arg(BUCKET_SAMPLE, &args, 2)?;
    let sampled = bucket_sample(&sampling_input(&subject), start, count, total)?;
    Ok(Value::Boolean(sampled))
}

fn ratio_sample_transform(subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let Value::Array(items) = arg(RATIO_SAMPLE, &args, 0)? else {
        return Err(EvalError::TypeError(format!(
            "{} expects an array of ratios",
            RATIO_SAMPLE
        )));
    };
    let ratios = items
        .iter()
        .map(|item| non_negative(RATIO_SAMPLE, item))
        .collect::<Result<Vec<_>, _>>()?;

    let index = ratio_sample(&sampling_input(&subject), &ratios)?;
    Ok(Value::Integer(index as i64))
}

// ========================================
// Structure
// ========================================

fn keys(subject: Value, _args: Vec<Value>) -> Result<Value, EvalError> {
    Ok(match subject {
        Value::Object(map) => Value::Array(map.into_keys().map(Value::String).collect()),
        _ => Value::Null,
    })
}

fn length(subject: Value, _args: Vec<Value>) -> Result<Value, EvalError> {
    let len = match &subject {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => return Ok(Value::Null),
    };
    Ok(Value::Integer(len as i64))
}

fn map_to_property(subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let name = string_arg(MAP_TO_PROPERTY, &args, 0)?;
    match subject {
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| item.get(name).cloned().unwrap_or_default())
                .collect(),
        )),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::TypeError(format!(
            "{} requires an array, got {}",
            MAP_TO_PROPERTY,
            other.type_name()
        ))),
    }
}

// ========================================
// Text
// ========================================

/// Captures of the first match, whole match first. Groups that did not
/// take part in the match are `null`.
fn regexp_match(subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let pattern = string_arg(REGEXP_MATCH, &args, 0)?;
    let flags = match args.get(1) {
        None | Some(Value::Null) => "",
        Some(Value::String(flags)) => flags.as_str(),
        Some(other) => {
            return Err(EvalError::TypeError(format!(
                "{} flags must be a string, got {}",
                REGEXP_MATCH,
                other.type_name()
            )));
        }
    };

    let mut builder = RegexBuilder::new(pattern);
    builder.size_limit(MAX_REGEX_SIZE);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            // No effect on the first match
            'g' | 'u' => &mut builder,
            other => {
                return Err(EvalError::Transform {
                    name: REGEXP_MATCH.to_string(),
                    message: format!("unsupported flag '{}'", other),
                });
            }
        };
    }
    let regex = builder.build().map_err(|e| EvalError::Transform {
        name: REGEXP_MATCH.to_string(),
        message: e.to_string(),
    })?;

    let Value::String(text) = subject else {
        return Ok(Value::Null);
    };
    Ok(match regex.captures(&text) {
        Some(captures) => Value::Array(
            captures
                .iter()
                .map(|group| group.map(|m| Value::from(m.as_str())).unwrap_or_default())
                .collect(),
        ),
        None => Value::Null,
    })
}

/// Milliseconds since the epoch for an RFC 3339 timestamp, a
/// `YYYY-MM-DDTHH:MM:SS` local-less timestamp (read as UTC) or a bare date.
fn date(subject: Value, _args: Vec<Value>) -> Result<Value, EvalError> {
    let Value::String(text) = subject else {
        return Ok(Value::Null);
    };
    let text = text.trim();

    let millis = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        });

    Ok(millis.map(Value::Integer).unwrap_or_default())
}

// ========================================
// Argument helpers
// ========================================

fn arg<'v>(transform: &str, args: &'v [Value], index: usize) -> Result<&'v Value, EvalError> {
    args.get(index).ok_or_else(|| {
        EvalError::TypeError(format!(
            "{} expects at least {} argument(s), got {}",
            transform,
            index + 1,
            args.len()
        ))
    })
}

fn number_arg(transform: &str, args: &[Value], index: usize) -> Result<f64, EvalError> {
    let value = arg(transform, args, index)?;
    value.as_float().ok_or_else(|| {
        EvalError::TypeError(format!(
            "{} argument {} must be a number, got {}",
            transform,
            index + 1,
            value.type_name()
        ))
    })
}

fn count_arg(transform: &str, args: &[Value], index: usize) -> Result<u64, EvalError> {
    non_negative(transform, arg(transform, args, index)?)
}

/// Whole, non-negative numbers only; `10.0` is accepted, `10.9` is not.
fn non_negative(transform: &str, value: &Value) -> Result<u64, EvalError> {
    let whole = match value {
        Value::Integer(n) => Some(*n),
        Value::Float(n) if n.fract() == 0.0 => value.as_int(),
        _ => None,
    };
    whole
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| {
            EvalError::TypeError(format!(
                "{} expects non-negative integers, got {}",
                transform,
                value.to_display_string()
            ))
        })
}

fn string_arg<'v>(transform: &str, args: &'v [Value], index: usize) -> Result<&'v str, EvalError> {
    let value = arg(transform, args, index)?;
    value.as_str().ok_or_else(|| {
        EvalError::TypeError(format!(
            "{} argument {} must be a string, got {}",
            transform,
            index + 1,
            value.type_name()
        ))
    })
}
