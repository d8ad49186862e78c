//! Structural query encoding.
//!
//! [`QueryEncoder`] flattens any `Serialize` value into an ordered list of
//! [`QueryItem`]s. Keys are the dot-joined [`FieldPath`] of each leaf, list
//! positions are plain zero-based numbers:
//!
//! ```text
//! { user: { name: "ann", tags: ["a", "b"] }, page: None }
//!   -> user.name=ann & user.tags.0=a & user.tags.1=b & page=nil
//! ```
//!
//! Absent values are emitted with the literal value `nil` rather than being
//! dropped. Use `#[serde(skip_serializing_if = "Option::is_none")]` on fields
//! that should disappear instead.
//!
//! Values are not percent-escaped here; escaping happens when the items are
//! appended to a URL.

use crate::path::FieldPath;
use crate::value::{EncodedValue, to_value};
use crate::{Error, Result};

/// Value emitted for `Nil` leaves.
pub const NIL_SENTINEL: &str = "nil";

/// A single flattened key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryItem {
    key: String,
    value: String,
}

impl QueryItem {
    /// Create a query item.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Item key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Item value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume into `(key, value)`.
    #[must_use]
    pub fn into_pair(self) -> (String, String) {
        (self.key, self.value)
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for QueryItem {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Ordered, append-only collection of [`QueryItem`]s.
///
/// Duplicate keys are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryItems {
    items: Vec<QueryItem>,
}

impl QueryItems {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append an item.
    pub fn push(&mut self, item: impl Into<QueryItem>) {
        self.items.push(item.into());
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no item was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, QueryItem> {
        self.items.iter()
    }

    /// Consume into the underlying items.
    #[must_use]
    pub fn into_vec(self) -> Vec<QueryItem> {
        self.items
    }

    /// Consume into `(key, value)` pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.items.into_iter().map(QueryItem::into_pair).collect()
    }

    /// Render as an `application/x-www-form-urlencoded` query string.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_core::QueryItems;
    ///
    /// let mut items = QueryItems::new();
    /// items.push(("q", "rust lang"));
    /// items.push(("tags.0", "a&b"));
    /// assert_eq!(items.to_query_string(), "q=rust+lang&tags.0=a%26b");
    /// ```
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for item in &self.items {
            serializer.append_pair(&item.key, &item.value);
        }
        serializer.finish()
    }
}

impl IntoIterator for QueryItems {
    type Item = QueryItem;
    type IntoIter = std::vec::IntoIter<QueryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryItems {
    type Item = &'a QueryItem;
    type IntoIter = std::slice::Iter<'a, QueryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<QueryItem> for QueryItems {
    fn from_iter<I: IntoIterator<Item = QueryItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Flattens values into [`QueryItem`]s.
///
/// # Example
///
/// ```
/// use courier_core::{QueryEncoder, QueryItem};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Out { int: i32, string: String, list: Vec<u8> }
///
/// let items = QueryEncoder::new()
///     .encode(&Out { int: 1, string: "two".into(), list: vec![3, 4] })
///     .expect("encode");
///
/// assert_eq!(items, vec![
///     QueryItem::new("int", "1"),
///     QueryItem::new("string", "two"),
///     QueryItem::new("list.0", "3"),
///     QueryItem::new("list.1", "4"),
/// ]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEncoder;

impl QueryEncoder {
    /// Create an encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a value into query items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryEncoding`] if the value cannot be reduced.
    pub fn encode<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<Vec<QueryItem>> {
        let reduced = to_value(value).map_err(Error::QueryEncoding)?;
        Ok(self.flatten(&reduced).into_vec())
    }

    /// Flatten an already reduced value.
    #[must_use]
    pub fn flatten(&self, value: &EncodedValue) -> QueryItems {
        let mut items = QueryItems::new();
        visit(value, &FieldPath::root(), &mut items);
        items
    }
}

fn visit(node: &EncodedValue, path: &FieldPath, items: &mut QueryItems) {
    match node {
        EncodedValue::Keyed(children) => {
            for (name, child) in children {
                visit(child, &path.child(name.as_str()), items);
            }
        }
        EncodedValue::Indexed(children) => {
            for (index, child) in children.iter().enumerate() {
                visit(child, &path.child(index), items);
            }
        }
        EncodedValue::Scalar(value) => items.push(QueryItem::new(path.to_key(), value.as_str())),
        EncodedValue::Nil => items.push(QueryItem::new(path.to_key(), NIL_SENTINEL)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::{check, let_assert};
    use serde::Serialize;

    use super::*;

    fn pairs(items: Vec<QueryItem>) -> Vec<(String, String)> {
        items.into_iter().map(QueryItem::into_pair).collect()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[derive(Serialize)]
    struct Out {
        int: i32,
        string: String,
    }

    #[test]
    fn flat_struct() {
        let items = QueryEncoder::new()
            .encode(&Out {
                int: 1,
                string: "two".to_string(),
            })
            .expect("encode");

        check!(pairs(items) == vec![pair("int", "1"), pair("string", "two")]);
    }

    #[test]
    fn list_field_uses_numeric_indices() {
        #[derive(Serialize)]
        struct WithList {
            list: Vec<i32>,
        }

        let items = QueryEncoder::new()
            .encode(&WithList { list: vec![1, 2] })
            .expect("encode");

        check!(pairs(items) == vec![pair("list.0", "1"), pair("list.1", "2")]);
    }

    #[test]
    fn none_field_emits_nil_sentinel() {
        #[derive(Serialize)]
        struct Optional {
            field: Option<String>,
        }

        let items = QueryEncoder::new()
            .encode(&Optional { field: None })
            .expect("encode");

        check!(pairs(items) == vec![pair("field", "nil")]);
    }

    #[test]
    fn skipped_none_field_is_absent() {
        #[derive(Serialize)]
        struct Optional {
            #[serde(skip_serializing_if = "Option::is_none")]
            field: Option<String>,
            page: u32,
        }

        let items = QueryEncoder::new()
            .encode(&Optional {
                field: None,
                page: 3,
            })
            .expect("encode");

        check!(pairs(items) == vec![pair("page", "3")]);
    }

    #[test]
    fn nested_structures_in_pre_order() {
        #[derive(Serialize)]
        struct Filter {
            tags: Vec<String>,
            owner: Owner,
        }

        #[derive(Serialize)]
        struct Owner {
            name: &'static str,
            aliases: Vec<Option<&'static str>>,
        }

        #[derive(Serialize)]
        struct Search {
            q: &'static str,
            filter: Filter,
            matrix: Vec<Vec<u8>>,
        }

        let items = QueryEncoder::new()
            .encode(&Search {
                q: "rust",
                filter: Filter {
                    tags: vec!["a".to_string(), "b".to_string()],
                    owner: Owner {
                        name: "ann",
                        aliases: vec![None, Some("annie")],
                    },
                },
                matrix: vec![vec![1], vec![], vec![2, 3]],
            })
            .expect("encode");

        check!(
            pairs(items)
                == vec![
                    pair("q", "rust"),
                    pair("filter.tags.0", "a"),
                    pair("filter.tags.1", "b"),
                    pair("filter.owner.name", "ann"),
                    pair("filter.owner.aliases.0", "nil"),
                    pair("filter.owner.aliases.1", "annie"),
                    pair("matrix.0.0", "1"),
                    pair("matrix.2.0", "2"),
                    pair("matrix.2.1", "3"),
                ]
        );
    }

    #[test]
    fn bare_root_values_use_empty_key() {
        let encoder = QueryEncoder::new();

        check!(pairs(encoder.encode(&42).expect("scalar")) == vec![pair("", "42")]);
        check!(pairs(encoder.encode(&None::<u8>).expect("nil")) == vec![pair("", "nil")]);
        check!(
            pairs(encoder.encode(&vec!["x", "y"]).expect("list"))
                == vec![pair("0", "x"), pair("1", "y")]
        );
    }

    #[test]
    fn booleans_and_floats_use_canonical_forms() {
        #[derive(Serialize)]
        struct Flags {
            enabled: bool,
            ratio: f64,
            whole: f32,
        }

        let items = QueryEncoder::new()
            .encode(&Flags {
                enabled: false,
                ratio: 0.25,
                whole: 2.0,
            })
            .expect("encode");

        check!(
            pairs(items) == vec![pair("enabled", "false"), pair("ratio", "0.25"), pair("whole", "2")]
        );
    }

    #[test]
    fn map_entries_follow_iteration_order() {
        let mut map = BTreeMap::new();
        map.insert("b", vec![1]);
        map.insert("a", vec![2]);

        let items = QueryEncoder::new().encode(&map).expect("encode");

        check!(pairs(items) == vec![pair("a.0", "2"), pair("b.0", "1")]);
    }

    #[test]
    fn empty_containers_emit_nothing() {
        #[derive(Serialize)]
        struct Empty {}

        #[derive(Serialize)]
        struct Marker;

        let encoder = QueryEncoder::new();
        check!(encoder.encode(&Empty {}).expect("struct").is_empty());
        check!(encoder.encode(&Marker).expect("unit struct").is_empty());
        check!(encoder.encode(&Vec::<u8>::new()).expect("vec").is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let value = Out {
            int: 7,
            string: "same".to_string(),
        };
        let encoder = QueryEncoder::new();

        let first = encoder.encode(&value).expect("first");
        let second = encoder.encode(&value).expect("second");

        check!(first == second);
    }

    #[test]
    fn reduction_failure_is_a_query_encoding_error() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "pair key");

        let result = QueryEncoder::new().encode(&bad);

        let_assert!(Err(Error::QueryEncoding(inner)) = result);
        check!(inner.message() == "map key must be a scalar");
    }

    #[test]
    fn deep_nesting_has_no_fixed_limit() {
        let mut value = EncodedValue::scalar("leaf");
        for _ in 0..512 {
            value = EncodedValue::Indexed(vec![value]);
        }

        let items = QueryEncoder::new().flatten(&value);

        let_assert!(Some(item) = items.iter().next());
        check!(item.key().split('.').count() == 512);
        check!(item.value() == "leaf");
    }

    #[test]
    fn query_string_escapes_values() {
        #[derive(Serialize)]
        struct Search {
            q: &'static str,
            empty: Option<u8>,
        }

        let items: QueryItems = QueryEncoder::new()
            .encode(&Search {
                q: "a b&c",
                empty: None,
            })
            .expect("encode")
            .into_iter()
            .collect();

        insta::assert_snapshot!(items.to_query_string(), @"q=a+b%26c&empty=nil");
    }
}
