use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{Kind, Literal, Schema, Shape};

/// A single array scan stops collecting once it holds more than this many
/// failures. Objects have no such cap.
pub const MAX_ARRAY_FAILURES: usize = 9;

/// Errors returned by [`Schema::assert`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssertionError {
    #[error("type assertion failed")]
    TypeMismatch,

    #[error("invalid value, expected one of: {}", join(.0))]
    NotAllowed(Vec<Literal>),

    #[error("invalid value, expected one of: {}", join(.0))]
    NoAlternative(Vec<Kind>),
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One step into a value: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A mismatch found by [`Schema::report`].
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Where the mismatch is, from the root of the reported value.
    pub path: Vec<PathSegment>,
    /// The kind the schema expected at `path`.
    pub kind: Kind,
    /// The value found at `path`; `None` when the value was absent.
    pub value: Option<Value>,
    /// For list schemas, the allowed values.
    pub expected: Option<Vec<Literal>>,
}

impl Failure {
    /// The path rendered as `$`, `$.business.id` or `$.scopes[2]`.
    pub fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
            }
        }
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let found = match &self.value {
            Some(v) => v.to_string(),
            None => "nothing".to_string(),
        };
        match &self.expected {
            Some(values) => write!(
                f,
                "{}: expected one of {}, got {found}",
                self.path_string(),
                join(values)
            ),
            None => write!(f, "{}: expected {}, got {found}", self.path_string(), self.kind),
        }
    }
}

impl Schema {
    /// Check `value` against this schema and hand it back unchanged.
    ///
    /// Fails fast on the first mismatch. Nothing is coerced or stripped:
    /// undeclared object keys are kept as they are.
    pub fn assert<'v>(&self, value: &'v Value) -> Result<&'v Value, AssertionError> {
        self.check(Some(value))?;
        Ok(value)
    }

    /// Like [`Schema::assert`], with `None` standing for an absent value.
    /// An optional schema returns `Ok(None)` for it.
    pub fn assert_opt<'v>(
        &self,
        value: Option<&'v Value>,
    ) -> Result<Option<&'v Value>, AssertionError> {
        self.check(value)?;
        Ok(value)
    }

    /// Collect every mismatch in `value`, each annotated with its path.
    ///
    /// Never fails; an empty result means [`Schema::assert`] would succeed.
    pub fn report(&self, value: &Value) -> Vec<Failure> {
        self.collect(Some(value), &mut Vec::new())
    }

    /// Like [`Schema::report`], with `None` standing for an absent value.
    pub fn report_opt(&self, value: Option<&Value>) -> Vec<Failure> {
        self.collect(value, &mut Vec::new())
    }

    fn check(&self, value: Option<&Value>) -> Result<(), AssertionError> {
        let node = self.node();
        match (&node.shape, value) {
            (_, None) if node.optional => Ok(()),
            (Shape::String, Some(Value::String(_))) => Ok(()),
            (Shape::Number, Some(Value::Number(n))) if n.as_f64().is_some_and(|f| !f.is_nan()) => {
                Ok(())
            }
            (Shape::Boolean, Some(Value::Bool(_))) => Ok(()),
            (Shape::Array(of), Some(Value::Array(items))) => {
                for item in items {
                    of.check(Some(item))?;
                }
                Ok(())
            }
            (Shape::Object(props), Some(Value::Object(map))) => {
                for (key, schema) in props {
                    schema.check(map.get(key))?;
                }
                Ok(())
            }
            (Shape::List(values), v) => {
                if v.is_some_and(|v| values.iter().any(|allowed| allowed.matches(v))) {
                    Ok(())
                } else {
                    Err(AssertionError::NotAllowed(values.clone()))
                }
            }
            (Shape::Union(alts), v) => {
                if alts.iter().any(|alt| alt.check(v).is_ok()) {
                    Ok(())
                } else {
                    Err(AssertionError::NoAlternative(
                        alts.iter().map(Schema::kind).collect(),
                    ))
                }
            }
            _ => Err(AssertionError::TypeMismatch),
        }
    }

    fn collect(&self, value: Option<&Value>, path: &mut Vec<PathSegment>) -> Vec<Failure> {
        let node = self.node();
        if value.is_none() && node.optional {
            return Vec::new();
        }
        match (&node.shape, value) {
            (Shape::Array(of), Some(Value::Array(items))) => {
                let mut failures = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    failures.extend(of.collect(Some(item), path));
                    path.pop();
                    if failures.len() > MAX_ARRAY_FAILURES {
                        break;
                    }
                }
                failures
            }
            (Shape::Object(props), Some(Value::Object(map))) => {
                let mut failures = Vec::new();
                for (key, schema) in props {
                    path.push(PathSegment::Key(key.clone()));
                    failures.extend(schema.collect(map.get(key), path));
                    path.pop();
                }
                failures
            }
            (Shape::Union(alts), v) if !alts.is_empty() => {
                let mut failures = Vec::new();
                for alt in alts {
                    let found = alt.collect(v, path);
                    if found.is_empty() {
                        return Vec::new();
                    }
                    failures.extend(found);
                }
                failures
            }
            _ => match self.check(value) {
                Ok(()) => Vec::new(),
                Err(_) => vec![Failure {
                    path: path.clone(),
                    kind: self.kind(),
                    value: value.cloned(),
                    expected: self.allowed().map(<[Literal]>::to_vec),
                }],
            },
        }
    }
}

// --- tests -------------------------------------------------------------------
