//! Schema nodes: immutable, declarative descriptions of a value's shape.
//!
//! A [`Schema`] is a cheap handle to a shared node. Every combinator
//! ([`optional`], [`Schema::describe`], embedding in [`object`], [`array`] or
//! [`union`]) returns a new handle and leaves its inputs untouched, so the
//! same node can be reused across any number of route definitions.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

/// The discriminator of a [`Schema`] node.
///
/// Displays as the lowercase name used in diagnostics (e.g. `"object"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// An enumerated list of allowed primitive values.
    List,
    Union,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::String => write!(f, "string"),
            Kind::Number => write!(f, "number"),
            Kind::Boolean => write!(f, "boolean"),
            Kind::Array => write!(f, "array"),
            Kind::Object => write!(f, "object"),
            Kind::List => write!(f, "list"),
            Kind::Union => write!(f, "union"),
        }
    }
}

/// One allowed value of a [`list`] schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
}

impl Literal {
    /// Value equality against a JSON value. Numbers compare by `f64` value,
    /// so `1` and `1.0` are the same member.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Literal::Str(s) => value.as_str() == Some(s.as_str()),
            Literal::Num(n) => value.as_f64() == Some(*n),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.clone()),
            Literal::Num(n) => json!(n),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s}"),
            Literal::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Num(n as f64)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Num(n)
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub(crate) enum Shape {
    String,
    Number,
    Boolean,
    Array(Schema),
    Object(Vec<(String, Schema)>),
    List(Vec<Literal>),
    Union(Vec<Schema>),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) shape: Shape,
    pub(crate) optional: bool,
    pub(crate) description: Option<String>,
}

/// An immutable schema node.
///
/// Cloning a `Schema` clones a reference, not the tree.
#[derive(Debug, Clone)]
pub struct Schema(Arc<Node>);

impl Schema {
    fn from_shape(shape: Shape) -> Self {
        Schema(Arc::new(Node {
            shape,
            optional: false,
            description: None,
        }))
    }

    fn derive(&self, optional: bool, description: Option<String>) -> Self {
        Schema(Arc::new(Node {
            shape: self.0.shape.clone(),
            optional,
            description,
        }))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// Return a copy of this node carrying `description`.
    pub fn describe(&self, description: impl Into<String>) -> Self {
        self.derive(self.0.optional, Some(description.into()))
    }

    pub fn kind(&self) -> Kind {
        match self.0.shape {
            Shape::String => Kind::String,
            Shape::Number => Kind::Number,
            Shape::Boolean => Kind::Boolean,
            Shape::Array(_) => Kind::Array,
            Shape::Object(_) => Kind::Object,
            Shape::List(_) => Kind::List,
            Shape::Union(_) => Kind::Union,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.0.optional
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Element schema of an array node.
    pub fn element(&self) -> Option<&Schema> {
        match &self.0.shape {
            Shape::Array(of) => Some(of),
            _ => None,
        }
    }

    /// Declared properties of an object node, in declaration order.
    pub fn properties(&self) -> Option<&[(String, Schema)]> {
        match &self.0.shape {
            Shape::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Look up one declared property of an object node.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties()?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }

    /// Allowed values of a list node.
    pub fn allowed(&self) -> Option<&[Literal]> {
        match &self.0.shape {
            Shape::List(values) => Some(values),
            _ => None,
        }
    }

    /// Alternatives of a union node, in the order they are tried.
    pub fn alternatives(&self) -> Option<&[Schema]> {
        match &self.0.shape {
            Shape::Union(alts) => Some(alts),
            _ => None,
        }
    }

    /// `true` if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Render this node as a JSON documentation tree.
    ///
    /// ```json
    /// { "type": "object", "description": "request body",
    ///   "properties": { "phone": { "type": "string" } } }
    /// ```
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("type".into(), json!(self.kind()));
        if let Some(description) = self.description() {
            doc.insert("description".into(), json!(description));
        }
        if self.is_optional() {
            doc.insert("optional".into(), Value::Bool(true));
        }
        match &self.0.shape {
            Shape::String | Shape::Number | Shape::Boolean => {}
            Shape::Array(of) => {
                doc.insert("of".into(), of.to_document());
            }
            Shape::Object(props) => {
                let props: Map<String, Value> = props
                    .iter()
                    .map(|(key, schema)| (key.clone(), schema.to_document()))
                    .collect();
                doc.insert("properties".into(), Value::Object(props));
            }
            Shape::List(values) => {
                doc.insert(
                    "of".into(),
                    Value::Array(values.iter().map(Literal::to_value).collect()),
                );
            }
            Shape::Union(alts) => {
                doc.insert(
                    "of".into(),
                    Value::Array(alts.iter().map(Schema::to_document).collect()),
                );
            }
        }
        Value::Object(doc)
    }
}

// --- constructors ------------------------------------------------------------

pub fn string() -> Schema {
    Schema::from_shape(Shape::String)
}

pub fn number() -> Schema {
    Schema::from_shape(Shape::Number)
}

pub fn boolean() -> Schema {
    Schema::from_shape(Shape::Boolean)
}

/// An array whose every element matches `of`.
pub fn array(of: Schema) -> Schema {
    Schema::from_shape(Shape::Array(of))
}

/// An object with the given properties. Order is preserved for reporting and
/// documentation; duplicate keys keep their first declaration.
pub fn object<K, I>(properties: I) -> Schema
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Schema)>,
{
    let mut props: Vec<(String, Schema)> = Vec::new();
    for (key, schema) in properties {
        let key = key.into();
        if !props.iter().any(|(existing, _)| *existing == key) {
            props.push((key, schema));
        }
    }
    Schema::from_shape(Shape::Object(props))
}

/// A fixed set of allowed primitive values.
pub fn list<L, I>(values: I) -> Schema
where
    L: Into<Literal>,
    I: IntoIterator<Item = L>,
{
    Schema::from_shape(Shape::List(values.into_iter().map(Into::into).collect()))
}

/// Alternatives tried in order.
pub fn union<I>(alternatives: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    Schema::from_shape(Shape::Union(alternatives.into_iter().collect()))
}

/// Derive a node that also accepts an absent value. Every other field,
/// description included, is carried over from `schema`.
pub fn optional(schema: &Schema) -> Schema {
    schema.derive(true, schema.0.description.clone())
}
