use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;
use warp::{hyper::body::Bytes, Filter, Rejection};

use crate::error::{AppError, ValidationFailure};

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A hyphenated UUID string.
    Uuid,
    Text { min_len: usize },
    /// Coerced from an RFC 3339 string, a date-time without offset (`YYYY-MM-DDTHH:MM[:SS[.fff]]`,
    /// read as UTC), a `YYYY-MM-DD` date, or epoch milliseconds (fractions truncated).
    DateTime,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Returns the validated (possibly coerced) value, or the message describing the first
    /// constraint it breaks.
    fn check(&self, value: Option<&Value>) -> Result<Value, String> {
        let value = match value {
            None => return Err("Required".to_owned()),
            Some(Value::Null) if self.nullable => return Ok(Value::Null),
            Some(value) => value,
        };

        match self.kind {
            FieldKind::Uuid => {
                let s = expect_string(value)?;
                if s.len() == 36 && Uuid::parse_str(s).is_ok() {
                    Ok(value.clone())
                } else {
                    Err("Invalid uuid".to_owned())
                }
            }
            FieldKind::Text { min_len } => {
                let s = expect_string(value)?;
                if s.chars().count() < min_len {
                    Err(format!(
                        "String must contain at least {} character(s)",
                        min_len
                    ))
                } else {
                    Ok(value.clone())
                }
            }
            FieldKind::DateTime => coerce_date(value)
                .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(|| "Invalid date".to_owned()),
            FieldKind::Enum(options) => {
                let expected = options
                    .iter()
                    .map(|option| format!("'{}'", option))
                    .collect::<Vec<_>>()
                    .join(" | ");
                match value {
                    Value::String(s) if options.contains(&s.as_str()) => Ok(value.clone()),
                    Value::String(s) => Err(format!(
                        "Invalid enum value. Expected {}, received '{}'",
                        expected, s
                    )),
                    other => Err(format!(
                        "Expected {}, received {}",
                        expected,
                        type_name(other)
                    )),
                }
            }
        }
    }
}

fn expect_string(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("Expected string, received {}", type_name(value)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|date| date.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NAIVE_DATE_TIME_FORMATS
                        .iter()
                        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                        .map(|date| Utc.from_utc_datetime(&date))
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|date| Utc.from_utc_datetime(&date))
                })
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|millis| millis.is_finite() && millis.abs() < i64::MAX as f64)
                    .map(|millis| millis.trunc() as i64)
            })
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub message: String,
}

/// Statically declared shape of an entity.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Validate `input` against the shape restricted to `fields`. Keys of `input` outside that
    /// subset are ignored and never appear in the result.
    pub fn validate(
        &self,
        fields: &[&str],
        input: &Map<String, Value>,
    ) -> Result<Map<String, Value>, Vec<ValidationIssue>> {
        let mut validated = Map::new();
        let mut issues = Vec::new();

        for &name in fields {
            let outcome = match self.field(name) {
                Some(spec) => spec.check(input.get(name)),
                None => Err(format!("Unrecognized key in {} shape", self.name)),
            };

            match outcome {
                Ok(value) => {
                    validated.insert(name.to_owned(), value);
                }
                Err(message) => issues.push(ValidationIssue {
                    path: vec![name.to_owned()],
                    message,
                }),
            }
        }

        if issues.is_empty() {
            Ok(validated)
        } else {
            Err(issues)
        }
    }
}

/// Key every issue by its first path segment. Later issues for a field replace earlier ones.
pub fn field_errors(issues: Vec<ValidationIssue>) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    for issue in issues {
        if let Some(field) = issue.path.into_iter().next() {
            errors.insert(field, issue.message);
        }
    }
    errors
}

/// The untouched request body, alongside the validated subset of its fields.
#[derive(Debug, Clone)]
pub struct ValidatedBody {
    pub body: Value,
    pub validated: Map<String, Value>,
}

/// Validate the single `field` of the JSON body. Rejects with the first issue's message.
pub fn validate_one(
    schema: &'static Schema,
    field: &'static str,
) -> impl Filter<Extract = (ValidatedBody,), Error = Rejection> + Clone {
    json_body().and_then(move |body: Value| async move {
        let input = project(&body, &[field]);

        match schema.validate(&[field], &input) {
            Ok(validated) => Ok(ValidatedBody { body, validated }),
            Err(issues) => {
                let message = issues
                    .into_iter()
                    .next()
                    .map(|issue| issue.message)
                    .unwrap_or_default();
                Err(reject_invalid(schema, ValidationFailure::Single(message)))
            }
        }
    })
}

/// Validate the `fields` subset of the JSON body. Rejects with a field to message map.
pub fn validate_many(
    schema: &'static Schema,
    fields: &'static [&'static str],
) -> impl Filter<Extract = (ValidatedBody,), Error = Rejection> + Clone {
    json_body().and_then(move |body: Value| async move {
        let input = project(&body, fields);

        match schema.validate(fields, &input) {
            Ok(validated) => Ok(ValidatedBody { body, validated }),
            Err(issues) => Err(reject_invalid(
                schema,
                ValidationFailure::Many(field_errors(issues)),
            )),
        }
    })
}

fn reject_invalid(schema: &Schema, failure: ValidationFailure) -> Rejection {
    tracing::debug!(schema = schema.name, ?failure, "request body failed validation");
    warp::reject::custom(AppError::ValidationFailed(failure))
}

fn project(body: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|&field| body.get(field).map(|value| (field.to_owned(), value.clone())))
        .collect()
}

pub(crate) fn json_body() -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|bytes: Bytes| async move {
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|_| warp::reject::custom(AppError::InvalidBody))
        })
}
