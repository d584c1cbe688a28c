//! Declarative schema nodes for the Wave Pool portal API.
//!
//! One description of a value's shape serves three purposes: documentation,
//! a fail-fast runtime gate ([`Schema::assert`]) and path-annotated
//! diagnostics that list every mismatch at once ([`Schema::report`]).
//! Both validation modes are plain recursive functions over the same node,
//! so they always agree on what is valid.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`schema`] | The immutable [`Schema`] node and its constructors |
//! | [`validation`] | [`Schema::assert`], [`Schema::report`], [`Failure`] |
//! | [`described`] | The [`Described`] trait and the [`described_struct!`] macro |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use wavepool_schema::{number, object, optional, string};
//!
//! let user = object([
//!     ("name", string().describe("user name")),
//!     ("age", optional(&number())),
//! ]);
//!
//! let value = serde_json::json!({ "name": "John" });
//! assert!(user.assert(&value).is_ok());
//! assert!(user.report(&serde_json::json!({ "age": "x" })).len() == 2);
//! ```

pub mod described;
pub mod schema;
pub mod validation;

pub use described::Described;
pub use schema::{
    array, boolean, list, number, object, optional, string, union, Kind, Literal, Schema,
};
pub use validation::{AssertionError, Failure, PathSegment, MAX_ARRAY_FAILURES};
