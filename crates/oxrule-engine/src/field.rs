use oxrule_common::types::Event;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A resolved field or operand value, tagged by type.
///
/// `Absent` means the path did not resolve; it never equals anything,
/// not even another `Absent` or JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
    /// The event's tag list.
    Tags(&'a [String]),
    List(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> FieldValue<'a> {
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
            },
            Value::String(s) => FieldValue::Str(s),
            Value::Array(items) => FieldValue::List(items),
            Value::Object(map) => FieldValue::Map(map),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Int(i) => Some(i as f64),
            FieldValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::Float(_) | FieldValue::Str(_)
        )
    }

    /// Elements of a list-tagged value, `None` for every other tag.
    pub fn elements(&self) -> Option<Vec<FieldValue<'a>>> {
        match *self {
            FieldValue::Tags(tags) => Some(tags.iter().map(|t| FieldValue::Str(t)).collect()),
            FieldValue::List(items) => Some(items.iter().map(FieldValue::from_json).collect()),
            _ => None,
        }
    }

    /// Typed equality.
    ///
    /// Numbers compare by value across integer and float representations.
    /// Values of unrelated tags are never equal.
    pub fn equals(&self, other: &FieldValue<'_>) -> bool {
        match (*self, *other) {
            (FieldValue::Absent, _) | (_, FieldValue::Absent) => false,
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Str(a), FieldValue::Str(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (
                FieldValue::Int(_) | FieldValue::Float(_),
                FieldValue::Int(_) | FieldValue::Float(_),
            ) => self.as_f64() == other.as_f64(),
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.get(k).is_some_and(|w| {
                            FieldValue::from_json(v).equals(&FieldValue::from_json(w))
                        })
                    })
            }
            _ => match (self.elements(), other.elements()) {
                (Some(a), Some(b)) => {
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
                }
                _ => false,
            },
        }
    }

    /// Ordering used by `gt`/`gte`/`lt`/`lte`.
    ///
    /// Numeric coercion is tried first; two strings compare
    /// lexicographically; anything else is indeterminate.
    pub fn compare(&self, other: &FieldValue<'_>) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            if let (FieldValue::Int(x), FieldValue::Int(y)) = (*self, *other) {
                return Some(x.cmp(&y));
            }
            return a.partial_cmp(&b);
        }
        match (*self, *other) {
            (FieldValue::Str(a), FieldValue::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Resolves a dot-separated condition path against an event.
///
/// A fixed attribute only resolves as a single segment. Any other path must
/// start with `fields` and walks the nested dynamic bag.
pub fn resolve<'a>(event: &'a Event, path: &str) -> FieldValue<'a> {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();

    if let Some(value) = fixed_attribute(event, head) {
        return if segments.next().is_none() {
            value
        } else {
            FieldValue::Absent
        };
    }
    if head != "fields" {
        return FieldValue::Absent;
    }

    let mut current = FieldValue::Map(&event.fields);
    for segment in segments {
        current = match current {
            FieldValue::Map(map) => match map.get(segment) {
                Some(value) => FieldValue::from_json(value),
                None => return FieldValue::Absent,
            },
            _ => return FieldValue::Absent,
        };
    }
    current
}

fn fixed_attribute<'a>(event: &'a Event, name: &str) -> Option<FieldValue<'a>> {
    let value = match name {
        "user_id" | "tenant_id" => FieldValue::Str(&event.tenant_id),
        "project_id" => FieldValue::Str(&event.project_id),
        "service_name" => FieldValue::Str(&event.service_name),
        "environment" => FieldValue::Str(&event.environment),
        "error_message" => FieldValue::Str(&event.error_message),
        "version" => FieldValue::Str(&event.version),
        "go_version" | "runtime_version" => FieldValue::Str(&event.runtime_version),
        "os" => FieldValue::Str(&event.os),
        "arch" => FieldValue::Str(&event.arch),
        "event_type" => FieldValue::Str(&event.event_type),
        "level" => FieldValue::Str(&event.level),
        "event_message" => FieldValue::Str(&event.event_message),
        "stack_trace" => event
            .stack_trace
            .as_deref()
            .map_or(FieldValue::Absent, FieldValue::Str),
        "tags" => FieldValue::Tags(&event.tags),
        "timestamp" => FieldValue::Str(&event.timestamp),
        "context_json" => FieldValue::Str(&event.context_json),
        "language" => FieldValue::Str(&event.language),
        "repeat_count" => FieldValue::Int(event.repeat_count),
        _ => return None,
    };
    Some(value)
}
