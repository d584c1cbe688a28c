//! Pairing Rust types with their schema.
//!
//! [`Described`] ties a compile-time type to the runtime [`Schema`] that
//! validates its JSON form. Structs declared through [`described_struct!`]
//! get both the serde derive and the `Described` impl from one field list,
//! so the two can never disagree.

use std::collections::BTreeSet;

use crate::schema::{array, boolean, number, optional, string, Schema};

/// A type whose JSON representation is described by a [`Schema`].
pub trait Described {
    fn schema() -> Schema;
}

impl Described for String {
    fn schema() -> Schema {
        string()
    }
}

impl Described for bool {
    fn schema() -> Schema {
        boolean()
    }
}

macro_rules! numeric {
    ($($t:ty),*) => {
        $(
            impl Described for $t {
                fn schema() -> Schema {
                    number()
                }
            }
        )*
    };
}

numeric!(i32, i64, u32, u64, usize, f32, f64);

impl<T: Described> Described for Vec<T> {
    fn schema() -> Schema {
        array(T::schema())
    }
}

impl<T: Described> Described for BTreeSet<T> {
    fn schema() -> Schema {
        array(T::schema())
    }
}

impl<T: Described> Described for Option<T> {
    fn schema() -> Schema {
        optional(&T::schema())
    }
}

/// Declare a serde struct together with its [`Described`] impl.
///
/// Each field may carry a description after `=>`; the struct itself may
/// carry one after its name. `Option<T>` fields become optional properties.
///
/// ```rust,ignore
/// described_struct! {
///     /// Login form.
///     pub struct Credentials: "request body" {
///         pub phone: String => "user phone number",
///         pub pin: String => "user pin code",
///     }
/// }
/// ```
#[macro_export]
macro_rules! described_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $desc:literal)? {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $fdesc:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Described for $name {
            fn schema() -> $crate::Schema {
                let properties: ::std::vec::Vec<(&'static str, $crate::Schema)> = ::std::vec![
                    $(
                        (
                            stringify!($field),
                            <$ty as $crate::Described>::schema() $(.describe($fdesc))?,
                        ),
                    )*
                ];
                let schema = $crate::object(properties);
                $( let schema = schema.describe($desc); )?
                schema
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;
    use serde_json::json;

    described_struct! {
        /// A sample record.
        pub struct Article: "article record" {
            pub id: u64 => "unique identifier",
            pub title: String,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub draft: Option<bool> => "draft flag",
            pub tags: Vec<String> => "tag names",
        }
    }

    #[test]
    fn derived_schema_matches_fields() {
        let schema = Article::schema();
        assert_eq!(schema.description(), Some("article record"));
        let names: Vec<&str> = schema
            .properties()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(names, ["id", "title", "draft", "tags"]);
        assert_eq!(schema.property("id").unwrap().description(), Some("unique identifier"));
        assert!(schema.property("draft").unwrap().is_optional());
        assert_eq!(schema.property("tags").unwrap().kind(), Kind::Array);
    }

    #[test]
    fn serialized_value_satisfies_its_schema() {
        let article = Article {
            id: 5,
            title: "hello".into(),
            draft: None,
            tags: vec![],
        };
        let value = serde_json::to_value(&article).unwrap();
        assert!(value.get("draft").is_none());
        assert!(Article::schema().assert(&value).is_ok());
    }

    #[test]
    fn schema_rejects_what_serde_would_reject() {
        let bad = json!({ "id": "5", "title": "hello", "tags": [] });
        assert!(Article::schema().assert(&bad).is_err());
        assert!(serde_json::from_value::<Article>(bad).is_err());
    }

    #[test]
    fn option_is_optional() {
        assert!(<Option<String>>::schema().is_optional());
        assert!(!String::schema().is_optional());
    }
}
